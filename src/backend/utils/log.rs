// src/backend/utils/log.rs
// Debug console output. Inside the canister this is the replica debug log;
// host-side test builds print to stdout instead.

pub fn info(message: impl AsRef<str>) {
    emit("📝 INFO", message.as_ref());
}

pub fn warn(message: impl AsRef<str>) {
    emit("⚠️ WARN", message.as_ref());
}

fn emit(level: &str, message: &str) {
    #[cfg(target_family = "wasm")]
    ic_cdk::println!("{}: {}", level, message);
    #[cfg(not(target_family = "wasm"))]
    println!("{}: {}", level, message);
}

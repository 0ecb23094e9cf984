// src/backend/utils/rng.rs
// Canister-local randomness for record and upload ids.

use crate::services::ingestion::IdSource;
use crate::utils::{log, time::get_current_time_ns};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::cell::RefCell;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
pub const ID_LENGTH: usize = 9;

thread_local! {
    static RNG: RefCell<Option<StdRng>> = const { RefCell::new(None) };
}

// No OS entropy inside a canister. Anything reaching getrandom directly fails
// loudly instead of returning predictable bytes.
#[cfg(target_family = "wasm")]
fn unsupported_getrandom(_buf: &mut [u8]) -> Result<(), getrandom::Error> {
    Err(getrandom::Error::UNSUPPORTED)
}

#[cfg(target_family = "wasm")]
getrandom::register_custom_getrandom!(unsupported_getrandom);

/// Reseeds the generator from the management canister's `raw_rand`. Until
/// that completes, ids come from a time-seeded generator.
pub async fn seed_from_raw_rand() {
    #[cfg(target_family = "wasm")]
    match ic_cdk::api::management_canister::main::raw_rand().await {
        Ok((bytes,)) => match <[u8; 32]>::try_from(bytes.as_slice()) {
            Ok(seed) => {
                RNG.with(|rng| *rng.borrow_mut() = Some(StdRng::from_seed(seed)));
                log::info("RNG seeded from raw_rand");
            }
            Err(_) => log::warn(format!("raw_rand returned {} bytes, keeping time seed", bytes.len())),
        },
        Err((code, msg)) => log::warn(format!("raw_rand failed: code={:?}, msg={}", code, msg)),
    }
    #[cfg(not(target_family = "wasm"))]
    log::info("raw_rand unavailable off-chain, keeping time seed");
}

/// Schedules `seed_from_raw_rand` right after the current message, since
/// init hooks cannot make inter-canister calls.
pub fn schedule_seeding() {
    ic_cdk_timers::set_timer(std::time::Duration::ZERO, || {
        ic_cdk::spawn(seed_from_raw_rand())
    });
}

fn with_rng<R>(f: impl FnOnce(&mut StdRng) -> R) -> R {
    RNG.with(|cell| {
        let mut slot = cell.borrow_mut();
        let rng = slot.get_or_insert_with(|| StdRng::seed_from_u64(get_current_time_ns()));
        f(rng)
    })
}

/// Random lowercase base-36 string of `len` characters.
pub fn random_id(len: usize) -> String {
    with_rng(|rng| {
        (0..len)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect()
    })
}

/// Id source backed by the canister generator.
#[derive(Clone, Copy, Debug, Default)]
pub struct CanisterIds;

impl IdSource for CanisterIds {
    fn candidate(&self) -> String {
        random_id(ID_LENGTH)
    }
}

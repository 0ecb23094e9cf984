// src/backend/storage/config.rs
use crate::models::init::InitArgs;
use crate::storage::memory::{get_config_memory, Memory};
use crate::storage::storable::Cbor;
use crate::utils::log;
use ic_stable_structures::StableCell;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

pub const DEFAULT_SHARE_BASE_URL: &str = "https://library.local";
pub const DEFAULT_STORE_QUOTA_BYTES: u64 = 5 * 1024 * 1024; // 5 MiB

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LibraryConfig {
    pub share_base_url: String,
    pub store_quota_bytes: u64,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            share_base_url: DEFAULT_SHARE_BASE_URL.to_string(),
            store_quota_bytes: DEFAULT_STORE_QUOTA_BYTES,
        }
    }
}

impl LibraryConfig {
    /// Defaults overridden by whatever the init arguments provide.
    pub fn from_args(args: &InitArgs) -> Self {
        let defaults = Self::default();
        Self {
            share_base_url: args
                .share_base_url
                .clone()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(defaults.share_base_url),
            store_quota_bytes: args
                .store_quota_bytes
                .filter(|quota| *quota > 0)
                .unwrap_or(defaults.store_quota_bytes),
        }
    }
}

thread_local! {
    static CONFIG: RefCell<StableCell<Cbor<LibraryConfig>, Memory>> = RefCell::new(
        StableCell::init(get_config_memory(), Cbor(LibraryConfig::default()))
            .expect("Failed to initialize library config stable cell")
    );
}

/// Stores the configuration. Called from canister init.
pub fn init_config(config: LibraryConfig) {
    CONFIG.with(|cell| {
        if let Err(e) = cell.borrow_mut().set(Cbor(config.clone())) {
            log::warn(format!("Failed to store configuration: {:?}", e));
        }
    });
    log::info(format!(
        "Configuration initialized: share_base_url={}, store_quota_bytes={}",
        config.share_base_url, config.store_quota_bytes
    ));
}

pub fn get_config() -> LibraryConfig {
    CONFIG.with(|cell| cell.borrow().get().0.clone())
}

// src/backend/models/init.rs
use candid::CandidType;
use serde::Deserialize;

#[derive(CandidType, Deserialize, Debug, Default)]
pub struct InitArgs {
    /// Origin that share links are built on, e.g. `https://library.example.com`.
    pub share_base_url: Option<String>,
    /// Capacity of the record store in bytes.
    pub store_quota_bytes: Option<u64>,
}

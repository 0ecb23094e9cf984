// src/backend/lib.rs

pub mod api;
pub mod error;
pub mod metrics;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

use crate::api::*;
use crate::error::LibraryError;
use crate::metrics::LibraryMetrics;
use crate::models::audit_log::AuditLogEntry;
use crate::models::common::{ContentId, UploadId};
use crate::models::content_record::{ContentSummary, DownloadChunk, DownloadPayload};
use crate::models::init::InitArgs;
use crate::models::share::SharedView;
use crate::models::upload_session::UploadSession;
use crate::storage::config::{init_config, LibraryConfig};

fn start(args: Option<InitArgs>) {
    if let Some(args) = args {
        init_config(LibraryConfig::from_args(&args));
    }
    utils::rng::schedule_seeding();
    services::scheduler::start();
    let records = api::registry_handle().borrow().list().len();
    utils::log::info(format!("Collateral library ready with {} record(s).", records));
}

#[ic_cdk::init]
fn init(args: Option<InitArgs>) {
    start(Some(args.unwrap_or_default()));
}

/// Configuration is kept across upgrades unless new arguments are passed.
#[ic_cdk::post_upgrade]
fn post_upgrade(args: Option<InitArgs>) {
    start(args);
}

// Export Candid interface
ic_cdk::export_candid!();

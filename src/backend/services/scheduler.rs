// src/backend/services/scheduler.rs
// Periodic maintenance driven by a canister timer.

use crate::{
    models::audit_log::LogAction,
    models::common::Timestamp,
    services::upload_service,
    storage::audit_logs,
    utils::{log, time::get_current_time_ns},
};
use std::time::Duration;

const NANOS_PER_HOUR: u64 = 60 * 60 * 1_000_000_000;
pub const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60 * 60);
/// Upload sessions idle for longer than this are dropped.
pub const UPLOAD_IDLE_LIMIT_NS: u64 = 24 * NANOS_PER_HOUR;

/// Registers the hourly maintenance timer. Timers do not survive upgrades,
/// so this runs from both init and post_upgrade.
pub fn start() {
    ic_cdk_timers::set_timer_interval(MAINTENANCE_INTERVAL, || {
        perform_maintenance(get_current_time_ns());
    });
}

/// Runs every maintenance task once. Returns the number of upload sessions removed.
pub fn perform_maintenance(now: Timestamp) -> usize {
    log::info(format!("⚙️ SCHEDULER: Starting maintenance at {}", now));
    let removed = cleanup_stale_uploads(now);
    log::info("⚙️ SCHEDULER: Maintenance completed.");
    removed
}

fn cleanup_stale_uploads(now: Timestamp) -> usize {
    let removed = upload_service::cleanup_stale_uploads(now, UPLOAD_IDLE_LIMIT_NS);
    for upload_id in &removed {
        log::warn(format!("Dropping stale upload session {}", upload_id));
        audit_logs::add_entry(LogAction::UploadExpired, Some(upload_id.clone()));
    }
    removed.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::upload_session::FileMeta;
    use crate::utils::rng::CanisterIds;

    #[test]
    fn maintenance_drops_day_old_sessions_and_logs_them() {
        let meta = FileMeta {
            file_name: "stale.pdf".to_string(),
            size_bytes: 10,
            title: None,
            tags: vec![],
            expiry_date: None,
        };
        let started = 1_000;
        let session = upload_service::begin_chunked_upload(meta, &CanisterIds, started).unwrap();

        assert_eq!(perform_maintenance(started + UPLOAD_IDLE_LIMIT_NS), 0);
        assert_eq!(perform_maintenance(started + UPLOAD_IDLE_LIMIT_NS + 1), 1);
        assert_eq!(upload_service::get_upload_session(&session.upload_id), None);

        let latest = audit_logs::get_recent_entries(1);
        assert_eq!(latest[0].action, LogAction::UploadExpired);
        assert_eq!(latest[0].details.as_deref(), Some(session.upload_id.as_str()));
    }
}

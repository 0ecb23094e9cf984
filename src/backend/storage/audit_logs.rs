use crate::models::audit_log::{AuditLogEntry, LogAction};
use crate::storage::memory::{get_audit_log_memory, Memory};
use crate::storage::storable::Cbor;
use crate::utils::time::get_current_time_ns;
use ic_stable_structures::StableBTreeMap;
use std::cell::RefCell;

/// Oldest entries are dropped once the log grows past this.
pub const MAX_AUDIT_LOG_ENTRIES: u64 = 500;

type StorableAuditLogEntry = Cbor<AuditLogEntry>;

thread_local! {
    /// Audit log: Key = sequence number, Value = entry.
    static LOGS: RefCell<StableBTreeMap<u64, StorableAuditLogEntry, Memory>> = RefCell::new(
        StableBTreeMap::init(get_audit_log_memory())
    );
}

/// Appends an entry stamped with the current time, evicting the oldest one
/// when the log is full.
pub fn add_entry(action: LogAction, details: Option<String>) {
    let entry = AuditLogEntry {
        timestamp: get_current_time_ns(),
        action,
        details,
    };
    LOGS.with(|map_ref| {
        let mut map = map_ref.borrow_mut();
        let next_seq = map.last_key_value().map_or(0, |(seq, _)| seq + 1);
        map.insert(next_seq, Cbor(entry));
        while map.len() > MAX_AUDIT_LOG_ENTRIES {
            match map.first_key_value() {
                Some((oldest, _)) => {
                    map.remove(&oldest);
                }
                None => break,
            }
        }
    });
}

/// Most recent entries, newest first.
pub fn get_recent_entries(limit: usize) -> Vec<AuditLogEntry> {
    if limit == 0 {
        return Vec::new();
    }
    LOGS.with(|map_ref| {
        let map = map_ref.borrow();
        let Some((last, _)) = map.last_key_value() else {
            return Vec::new();
        };
        let first = last.saturating_sub(limit.saturating_sub(1) as u64);
        let mut entries: Vec<AuditLogEntry> =
            map.range(first..).map(|(_, cbor)| cbor.0).collect();
        entries.reverse();
        entries
    })
}

// src/backend/storage/persistence.rs
// Reads and writes the whole record set under a single key, shedding large
// payloads when the store runs out of room.

use crate::metrics;
use crate::models::audit_log::LogAction;
use crate::models::content_record::{ContentRecord, PersistedLibrary, StoredLibrary};
use crate::storage::audit_logs;
use crate::storage::kv_store::{KvStore, StoreError};
use crate::utils::log;

/// Key holding the serialized record set.
pub const LIBRARY_KEY: &str = "collateral_library.records";

/// Payloads longer than this many characters are dropped when a save has to
/// be retried in reduced form.
pub const PAYLOAD_ELISION_THRESHOLD: usize = 100_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The full record set was written.
    Saved,
    /// The first write hit the quota; a copy without large payloads was written.
    Degraded { elided: usize },
    /// Nothing was written; the previously stored value is unchanged.
    Failed { reason: String },
}

pub struct PersistenceAdapter<S: KvStore> {
    store: S,
}

impl<S: KvStore> PersistenceAdapter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Reads the stored record set. Missing or malformed data reads as `None`.
    pub fn load(&self) -> Option<Vec<ContentRecord>> {
        let bytes = self.store.get(LIBRARY_KEY)?;
        match serde_json::from_slice::<StoredLibrary>(&bytes) {
            Ok(stored) => Some(stored.into_records()),
            Err(e) => {
                log::warn(format!("Ignoring unreadable library data: {}", e));
                None
            }
        }
    }

    /// Writes the record set. Never fails the caller: quota pressure is
    /// handled by one reduced retry, anything else is reported and dropped.
    pub fn save(&mut self, records: &[ContentRecord]) -> SaveOutcome {
        let outcome = match self.write(records) {
            Ok(()) => SaveOutcome::Saved,
            Err(StoreError::QuotaExceeded { requested, quota }) => {
                log::warn(format!(
                    "Library save needs {} bytes but quota is {}; retrying without large payloads",
                    requested, quota
                ));
                self.save_reduced(records)
            }
            Err(e) => SaveOutcome::Failed {
                reason: e.to_string(),
            },
        };
        self.report(&outcome);
        outcome
    }

    fn save_reduced(&mut self, records: &[ContentRecord]) -> SaveOutcome {
        let (reduced, elided) = without_large_payloads(records);
        match self.write(&reduced) {
            Ok(()) => SaveOutcome::Degraded { elided },
            Err(e) => SaveOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }

    fn write(&mut self, records: &[ContentRecord]) -> Result<(), StoreError> {
        let doc = PersistedLibrary::new(records.to_vec());
        let bytes =
            serde_json::to_vec(&doc).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.set(LIBRARY_KEY, bytes)
    }

    fn report(&self, outcome: &SaveOutcome) {
        metrics::record_save(outcome);
        match outcome {
            SaveOutcome::Saved => {}
            SaveOutcome::Degraded { elided } => {
                log::warn(format!(
                    "Library saved without {} large payload(s); they remain available until the next reload",
                    elided
                ));
                audit_logs::add_entry(
                    LogAction::PersistenceDegraded,
                    Some(format!("{} payload(s) elided", elided)),
                );
            }
            SaveOutcome::Failed { reason } => {
                log::warn(format!(
                    "Library save failed, keeping previously stored state: {}",
                    reason
                ));
                audit_logs::add_entry(LogAction::PersistenceFailed, Some(reason.clone()));
            }
        }
    }
}

/// Copy of `records` with every payload above the threshold removed, plus
/// the number of payloads removed.
pub fn without_large_payloads(records: &[ContentRecord]) -> (Vec<ContentRecord>, usize) {
    let mut elided = 0;
    let reduced = records
        .iter()
        .map(|record| {
            let mut copy = record.clone();
            if record.payload_len() > PAYLOAD_ELISION_THRESHOLD {
                copy.payload = None;
                elided += 1;
            }
            copy
        })
        .collect();
    (reduced, elided)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audit_log::LogAction;
    use crate::storage::kv_store::StableKvStore;
    use ic_stable_structures::DefaultMemoryImpl;
    use pretty_assertions::assert_eq;

    fn adapter(quota: u64) -> PersistenceAdapter<StableKvStore<DefaultMemoryImpl>> {
        PersistenceAdapter::new(StableKvStore::init(DefaultMemoryImpl::default(), quota))
    }

    fn record(id: &str, payload_chars: Option<usize>) -> ContentRecord {
        ContentRecord {
            id: id.to_string(),
            title: format!("{id}.pdf"),
            media_type: "pdf".to_string(),
            size_display: "1.2 MB".to_string(),
            owner: "You".to_string(),
            created_date: "2026-10-17".to_string(),
            tags: vec!["Sales".to_string()],
            folder: "Unsorted".to_string(),
            version: "v1.0".to_string(),
            expiry_date: Some("2027-01-01".to_string()),
            payload: payload_chars.map(|n| "x".repeat(n)),
        }
    }

    #[test]
    fn load_of_empty_store_is_absent() {
        assert_eq!(adapter(1024).load(), None);
    }

    #[test]
    fn load_of_malformed_data_is_absent() {
        let mut a = adapter(1024);
        a.store.set(LIBRARY_KEY, b"{not json".to_vec()).unwrap();
        assert_eq!(a.load(), None);
    }

    #[test]
    fn saved_records_load_back() {
        let mut a = adapter(1024 * 1024);
        let records = vec![record("b", Some(10)), record("a", None)];
        assert_eq!(a.save(&records), SaveOutcome::Saved);
        assert_eq!(a.load(), Some(records));
    }

    #[test]
    fn quota_failure_drops_large_payloads_and_retries() {
        let mut a = adapter(64 * 1024);
        let big = record("big", Some(150_000));
        let small = record("small", Some(2_000));
        let records = vec![big.clone(), small.clone()];

        assert_eq!(a.save(&records), SaveOutcome::Degraded { elided: 1 });

        let stored = a.load().unwrap();
        let mut expected_big = big.clone();
        expected_big.payload = None;
        assert_eq!(stored, vec![expected_big, small]);
        // The caller's copy keeps its payload.
        assert_eq!(records[0].payload_len(), 150_000);

        let log = audit_logs::get_recent_entries(1);
        assert_eq!(log[0].action, LogAction::PersistenceDegraded);
    }

    #[test]
    fn failed_retry_keeps_previous_state() {
        let mut a = adapter(2 * 1024);
        let first = vec![record("a", None)];
        assert_eq!(a.save(&first), SaveOutcome::Saved);

        // Too many metadata-only records to fit even after shedding payloads.
        let crowded: Vec<ContentRecord> =
            (0..50).map(|i| record(&format!("r{i}"), None)).collect();
        let outcome = a.save(&crowded);
        assert!(matches!(outcome, SaveOutcome::Failed { .. }));
        assert_eq!(a.load(), Some(first));

        let log = audit_logs::get_recent_entries(1);
        assert_eq!(log[0].action, LogAction::PersistenceFailed);
    }

    #[test]
    fn payloads_at_threshold_are_kept() {
        let records = vec![
            record("edge", Some(PAYLOAD_ELISION_THRESHOLD)),
            record("over", Some(PAYLOAD_ELISION_THRESHOLD + 1)),
        ];
        let (reduced, elided) = without_large_payloads(&records);
        assert_eq!(elided, 1);
        assert!(reduced[0].payload.is_some());
        assert!(reduced[1].payload.is_none());
    }
}

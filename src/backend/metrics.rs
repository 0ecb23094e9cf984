// src/backend/metrics.rs
use crate::storage::metrics::{get_metrics, update_metrics};
use crate::storage::persistence::SaveOutcome;
use crate::utils::log;
use candid::CandidType;
use serde::{Deserialize, Serialize};

#[derive(CandidType, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct LibraryMetrics {
    pub saves_total: u64,
    pub saves_degraded: u64,
    pub saves_failed: u64,
    pub payloads_elided_total: u64,
    pub ingestions_total: u64,
    pub ingestion_failures: u64,
    pub removals_total: u64,
    pub share_links_issued: u64,
    pub share_links_resolved: u64,
    pub downloads_total: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Counter {
    Ingestion,
    IngestionFailure,
    Removal,
    ShareLinkIssued,
    ShareLinkResolved,
    Download,
}

fn apply(update: impl FnOnce(&mut LibraryMetrics)) {
    if let Err(e) = update_metrics(update) {
        log::warn(e);
    }
}

pub fn increment(counter: Counter) {
    apply(|m| {
        let slot = match counter {
            Counter::Ingestion => &mut m.ingestions_total,
            Counter::IngestionFailure => &mut m.ingestion_failures,
            Counter::Removal => &mut m.removals_total,
            Counter::ShareLinkIssued => &mut m.share_links_issued,
            Counter::ShareLinkResolved => &mut m.share_links_resolved,
            Counter::Download => &mut m.downloads_total,
        };
        *slot = slot.saturating_add(1);
    });
}

pub fn record_save(outcome: &SaveOutcome) {
    apply(|m| {
        m.saves_total = m.saves_total.saturating_add(1);
        match outcome {
            SaveOutcome::Saved => {}
            SaveOutcome::Degraded { elided } => {
                m.saves_degraded = m.saves_degraded.saturating_add(1);
                m.payloads_elided_total = m.payloads_elided_total.saturating_add(*elided as u64);
            }
            SaveOutcome::Failed { .. } => m.saves_failed = m.saves_failed.saturating_add(1),
        }
    });
}

pub fn get_library_metrics() -> LibraryMetrics {
    get_metrics()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_outcomes_feed_their_counters() {
        let before = get_library_metrics();
        record_save(&SaveOutcome::Saved);
        record_save(&SaveOutcome::Degraded { elided: 2 });
        record_save(&SaveOutcome::Failed {
            reason: "full".to_string(),
        });
        increment(Counter::Download);
        let after = get_library_metrics();
        assert_eq!(after.saves_total - before.saves_total, 3);
        assert_eq!(after.saves_degraded - before.saves_degraded, 1);
        assert_eq!(after.saves_failed - before.saves_failed, 1);
        assert_eq!(after.payloads_elided_total - before.payloads_elided_total, 2);
        assert_eq!(after.downloads_total - before.downloads_total, 1);
    }
}

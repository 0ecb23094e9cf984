use serde::{Deserialize, Serialize};
use candid::CandidType;

/// A single entry in the library audit log.
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AuditLogEntry {
    /// Nanoseconds since epoch.
    pub timestamp: u64,
    /// What happened.
    pub action: LogAction,
    /// Optional details (target content id, failure reason, ...).
    pub details: Option<String>,
}

#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum LogAction {
    LibrarySeeded,
    ContentIngested,
    ContentDeleted,
    ContentDownloaded,
    IngestionFailed,
    ShareLinkIssued,
    ShareLinkResolved,
    PersistenceDegraded,
    PersistenceFailed,
    UploadExpired,
}

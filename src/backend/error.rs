// src/backend/error.rs
use candid::CandidType;
use serde::Deserialize;
use thiserror::Error;

use crate::storage::kv_store::StoreError;

#[derive(CandidType, Deserialize, Error, Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    #[error("Could not read uploaded content: {0}")]
    IngestionReadFailure(String),

    #[error("Storage quota exceeded: {requested} bytes requested, {quota} bytes available")]
    StorageQuotaExceeded { requested: u64, quota: u64 },

    #[error("Content not found: {0}")]
    RecordNotFound(String),

    #[error("Content has no stored payload to download: {0}")]
    DownloadUnavailable(String),

    #[error("Content of {size} bytes exceeds the {limit} byte reply limit; download it in chunks")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("Content id already present: {0}")]
    DuplicateId(String),

    #[error("Invalid share link: {0}")]
    InvalidShareLink(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Content expired on {0}")]
    ContentExpired(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upload error: {0}")]
    UploadError(String),

    #[error("Upload chunk out of order or invalid index")]
    UploadChunkOutOfOrder,

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<StoreError> for LibraryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::QuotaExceeded { requested, quota } => {
                LibraryError::StorageQuotaExceeded { requested, quota }
            }
            StoreError::Serialization(msg) => LibraryError::StorageError(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_failures_keep_their_sizes() {
        let err: LibraryError = StoreError::QuotaExceeded {
            requested: 10,
            quota: 4,
        }
        .into();
        assert_eq!(
            err,
            LibraryError::StorageQuotaExceeded {
                requested: 10,
                quota: 4
            }
        );
        assert_eq!(
            err.to_string(),
            "Storage quota exceeded: 10 bytes requested, 4 bytes available"
        );
    }
}

// src/backend/models/content_record.rs
use crate::models::common::{ContentId, IsoDate};
use candid::CandidType;
use serde::{Deserialize, Serialize};

/// Current version of the persisted library document.
pub const SCHEMA_VERSION: u32 = 1;

/// One stored asset. Records are never edited in place; they are created by
/// ingestion (or the seed set) and leave the registry only through removal.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub id: ContentId,
    pub title: String,
    pub media_type: String,
    pub size_display: String,
    pub owner: String,
    pub created_date: IsoDate,
    #[serde(default)]
    pub tags: Vec<String>,
    pub folder: String,
    pub version: String,
    #[serde(default)]
    pub expiry_date: Option<IsoDate>,
    /// Data URL of the content. Absent for seed records and for records whose
    /// payload was dropped to fit the store.
    #[serde(default)]
    pub payload: Option<String>,
}

impl ContentRecord {
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Length of the payload in characters, 0 when absent.
    pub fn payload_len(&self) -> usize {
        self.payload.as_deref().map_or(0, |p| p.chars().count())
    }
}

/// Versioned envelope written to the store.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PersistedLibrary {
    pub schema: u32,
    pub records: Vec<ContentRecord>,
}

impl PersistedLibrary {
    pub fn new(records: Vec<ContentRecord>) -> Self {
        Self {
            schema: SCHEMA_VERSION,
            records,
        }
    }
}

/// Shapes accepted when reading the store: the versioned envelope, or the
/// bare record array written before the envelope existed.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum StoredLibrary {
    Versioned(PersistedLibrary),
    Legacy(Vec<ContentRecord>),
}

impl StoredLibrary {
    pub fn into_records(self) -> Vec<ContentRecord> {
        match self {
            StoredLibrary::Versioned(doc) => doc.records,
            StoredLibrary::Legacy(records) => records,
        }
    }
}

/// Record as returned by listing endpoints: everything but the payload.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ContentSummary {
    pub id: ContentId,
    pub title: String,
    pub media_type: String,
    pub size_display: String,
    pub owner: String,
    pub created_date: IsoDate,
    pub tags: Vec<String>,
    pub folder: String,
    pub version: String,
    pub expiry_date: Option<IsoDate>,
    pub has_payload: bool,
    pub expired: bool,
}

impl ContentSummary {
    pub fn from_record(record: &ContentRecord, expired: bool) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            media_type: record.media_type.clone(),
            size_display: record.size_display.clone(),
            owner: record.owner.clone(),
            created_date: record.created_date.clone(),
            tags: record.tags.clone(),
            folder: record.folder.clone(),
            version: record.version.clone(),
            expiry_date: record.expiry_date.clone(),
            has_payload: record.has_payload(),
            expired,
        }
    }
}

/// Decoded payload handed back for a download.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DownloadPayload {
    pub file_name: String,
    pub mime_type: String,
    #[serde(with = "serde_bytes")]
    pub bytes: Vec<u8>,
}

/// One slice of a decoded payload, for content too large for a single reply.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DownloadChunk {
    pub file_name: String,
    pub mime_type: String,
    pub total_size_bytes: u64,
    pub chunk_index: u32,
    pub chunk_count: u32,
    #[serde(with = "serde_bytes")]
    pub bytes: Vec<u8>,
}

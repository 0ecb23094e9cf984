// src/backend/models/upload_session.rs
use crate::models::common::{IsoDate, StorageBytes, Timestamp, UploadId};
use candid::CandidType;
use serde::{Deserialize, Serialize};

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Copy)]
pub enum UploadStatus {
    Initiated, // Session created, waiting for chunks
    Uploading, // Chunks are being received
}

/// Metadata supplied when an upload begins.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct FileMeta {
    pub file_name: String,
    pub size_bytes: StorageBytes,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub expiry_date: Option<IsoDate>,
}

/// Public view of an in-flight upload session.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct UploadSession {
    pub upload_id: UploadId,
    pub file_name: String,
    pub expected_size_bytes: StorageBytes,
    pub received_bytes: StorageBytes,
    pub expected_chunk_count: u64,
    pub received_chunk_count: u64,
    pub status: UploadStatus,
    pub created_at: Timestamp,
    pub last_chunk_received_at: Option<Timestamp>,
}

// src/backend/services/upload_service.rs
// Chunked upload sessions feeding the ingestion pipeline.

use crate::{
    error::LibraryError,
    models::{
        common::{Timestamp, UploadId},
        upload_session::{FileMeta, UploadSession, UploadStatus},
    },
    services::ingestion::{BlobSource, IdSource, IngestMetadata},
    utils::{crypto::calculate_sha256_hex, log, time::is_iso_date},
};
use std::cell::RefCell;
use std::collections::HashMap;

pub const MAX_CHUNK_SIZE_BYTES: usize = 512 * 1024; // 512 KB
pub const MAX_TOTAL_UPLOAD_SIZE_BYTES: u64 = 10 * 1024 * 1024; // 10 MB per file

// In-memory state for an ongoing chunked upload
#[derive(Clone, Debug)]
struct UploadState {
    upload_id: UploadId,
    file_meta: FileMeta,
    chunks: Vec<Vec<u8>>,
    expected_chunks: usize,
    received_bytes: u64,
    created_at: Timestamp,
    last_chunk_received_at: Option<Timestamp>,
}

impl UploadState {
    fn session(&self) -> UploadSession {
        UploadSession {
            upload_id: self.upload_id.clone(),
            file_name: self.file_meta.file_name.clone(),
            expected_size_bytes: self.file_meta.size_bytes,
            received_bytes: self.received_bytes,
            expected_chunk_count: self.expected_chunks as u64,
            received_chunk_count: self.chunks.len() as u64,
            status: if self.chunks.is_empty() {
                UploadStatus::Initiated
            } else {
                UploadStatus::Uploading
            },
            created_at: self.created_at,
            last_chunk_received_at: self.last_chunk_received_at,
        }
    }

    fn last_activity(&self) -> Timestamp {
        self.last_chunk_received_at.unwrap_or(self.created_at)
    }
}

thread_local! {
    // Ongoing uploads. Cleared on upgrade.
    static ACTIVE_UPLOADS: RefCell<HashMap<UploadId, UploadState>> = RefCell::new(HashMap::new());
}

/// A fully received upload. Reading it checks that the chunks add up to the
/// announced file before handing the bytes over.
#[derive(Debug)]
pub struct CompletedUpload {
    file_name: String,
    expected_size_bytes: u64,
    expected_chunks: usize,
    chunks: Vec<Vec<u8>>,
    sha256_hex: String,
}

impl BlobSource for CompletedUpload {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    async fn read(self) -> Result<Vec<u8>, LibraryError> {
        if self.chunks.len() != self.expected_chunks {
            return Err(LibraryError::IngestionReadFailure(format!(
                "Upload not complete. Received {} out of {} expected chunks.",
                self.chunks.len(),
                self.expected_chunks
            )));
        }
        let bytes = self.chunks.concat();
        if bytes.len() as u64 != self.expected_size_bytes {
            return Err(LibraryError::IngestionReadFailure(format!(
                "Total size mismatch. Reconstructed {} vs expected {}",
                bytes.len(),
                self.expected_size_bytes
            )));
        }
        if calculate_sha256_hex(&bytes) != self.sha256_hex.to_lowercase() {
            return Err(LibraryError::IngestionReadFailure(
                "Checksum mismatch between received content and provided checksum".to_string(),
            ));
        }
        Ok(bytes)
    }
}

fn validate_file_meta(meta: &FileMeta) -> Result<(), LibraryError> {
    if meta.file_name.trim().is_empty() {
        return Err(LibraryError::InvalidInput("File name cannot be empty".to_string()));
    }
    if meta.size_bytes == 0 {
        return Err(LibraryError::UploadError("File size cannot be zero".to_string()));
    }
    if meta.size_bytes > MAX_TOTAL_UPLOAD_SIZE_BYTES {
        return Err(LibraryError::UploadError(format!(
            "Upload size {} exceeds limit {}",
            meta.size_bytes, MAX_TOTAL_UPLOAD_SIZE_BYTES
        )));
    }
    if let Some(date) = &meta.expiry_date {
        if !is_iso_date(date) {
            return Err(LibraryError::InvalidInput(format!(
                "Expiry date {} is not a YYYY-MM-DD date",
                date
            )));
        }
    }
    Ok(())
}

/// Begins a new chunked upload session.
pub fn begin_chunked_upload(
    file_meta: FileMeta,
    ids: &impl IdSource,
    now: Timestamp,
) -> Result<UploadSession, LibraryError> {
    validate_file_meta(&file_meta)?;

    let expected_chunks =
        (file_meta.size_bytes as usize).div_ceil(MAX_CHUNK_SIZE_BYTES);

    let session = ACTIVE_UPLOADS.with(|map| {
        let mut active = map.borrow_mut();
        let upload_id = loop {
            let candidate = format!("upl-{}", ids.candidate());
            if !active.contains_key(&candidate) {
                break candidate;
            }
        };
        let state = UploadState {
            upload_id: upload_id.clone(),
            file_meta,
            chunks: Vec::with_capacity(expected_chunks),
            expected_chunks,
            received_bytes: 0,
            created_at: now,
            last_chunk_received_at: None,
        };
        let session = state.session();
        active.insert(upload_id, state);
        session
    });

    log::info(format!(
        "Begin upload {} for {}. Expecting {} chunks.",
        session.upload_id, session.file_name, expected_chunks
    ));
    Ok(session)
}

/// Accepts the next chunk of an ongoing session. Chunks arrive in order.
pub fn upload_next_chunk(
    upload_id: &str,
    chunk_index: u32,
    data: Vec<u8>,
    now: Timestamp,
) -> Result<UploadSession, LibraryError> {
    ACTIVE_UPLOADS.with(|map| {
        let mut active = map.borrow_mut();
        let state = active
            .get_mut(upload_id)
            .ok_or_else(|| LibraryError::UploadError("Upload session not found".to_string()))?;

        if chunk_index as usize != state.chunks.len() {
            return Err(LibraryError::UploadChunkOutOfOrder);
        }
        if chunk_index as usize >= state.expected_chunks {
            return Err(LibraryError::UploadError(
                "Chunk index exceeds expected count".to_string(),
            ));
        }
        if data.is_empty() || data.len() > MAX_CHUNK_SIZE_BYTES {
            return Err(LibraryError::UploadError(format!(
                "Chunk size {} outside 1..={}",
                data.len(),
                MAX_CHUNK_SIZE_BYTES
            )));
        }
        if state.received_bytes + data.len() as u64 > state.file_meta.size_bytes {
            return Err(LibraryError::UploadError(
                "Chunk exceeds the announced file size".to_string(),
            ));
        }

        state.received_bytes += data.len() as u64;
        state.chunks.push(data);
        state.last_chunk_received_at = Some(now);
        Ok(state.session())
    })
}

/// Closes a session and returns its content for ingestion, together with the
/// metadata given when it began. The session is gone afterwards, whether or
/// not the content turns out to be readable.
pub fn take_completed_upload(
    upload_id: &str,
    sha256_hex: String,
) -> Result<(CompletedUpload, IngestMetadata), LibraryError> {
    let state = ACTIVE_UPLOADS
        .with(|map| map.borrow_mut().remove(upload_id))
        .ok_or_else(|| {
            LibraryError::UploadError("Upload session not found or already finished".to_string())
        })?;

    let metadata = IngestMetadata {
        title: state.file_meta.title,
        tags: state.file_meta.tags,
        expiry_date: state.file_meta.expiry_date,
    };
    let upload = CompletedUpload {
        file_name: state.file_meta.file_name,
        expected_size_bytes: state.file_meta.size_bytes,
        expected_chunks: state.expected_chunks,
        chunks: state.chunks,
        sha256_hex,
    };
    Ok((upload, metadata))
}

pub fn get_upload_session(upload_id: &str) -> Option<UploadSession> {
    ACTIVE_UPLOADS.with(|map| map.borrow().get(upload_id).map(UploadState::session))
}

/// Drops sessions with no activity for longer than `max_idle_ns`.
pub fn cleanup_stale_uploads(now: Timestamp, max_idle_ns: u64) -> Vec<UploadId> {
    ACTIVE_UPLOADS.with(|map| {
        let mut active = map.borrow_mut();
        let stale: Vec<UploadId> = active
            .values()
            .filter(|state| now.saturating_sub(state.last_activity()) > max_idle_ns)
            .map(|state| state.upload_id.clone())
            .collect();
        for id in &stale {
            active.remove(id);
        }
        stale
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::cell::Cell;

    struct CountingIds(Cell<u32>);

    impl IdSource for CountingIds {
        fn candidate(&self) -> String {
            self.0.set(self.0.get() + 1);
            self.0.get().to_string()
        }
    }

    fn meta(name: &str, size: u64) -> FileMeta {
        FileMeta {
            file_name: name.to_string(),
            size_bytes: size,
            title: None,
            tags: vec!["Sales".to_string()],
            expiry_date: None,
        }
    }

    #[test]
    fn full_upload_reads_back_its_bytes() {
        let ids = CountingIds(Cell::new(0));
        let content: Vec<u8> = (0..(MAX_CHUNK_SIZE_BYTES + 10)).map(|i| (i % 251) as u8).collect();
        let session = begin_chunked_upload(meta("deck.pptx", content.len() as u64), &ids, 1).unwrap();
        assert_eq!(session.expected_chunk_count, 2);
        assert_eq!(session.status, UploadStatus::Initiated);

        upload_next_chunk(&session.upload_id, 0, content[..MAX_CHUNK_SIZE_BYTES].to_vec(), 2).unwrap();
        let progress =
            upload_next_chunk(&session.upload_id, 1, content[MAX_CHUNK_SIZE_BYTES..].to_vec(), 3).unwrap();
        assert_eq!(progress.received_bytes, content.len() as u64);
        assert_eq!(progress.status, UploadStatus::Uploading);

        let (upload, metadata) =
            take_completed_upload(&session.upload_id, calculate_sha256_hex(&content)).unwrap();
        assert_eq!(metadata.tags, vec!["Sales".to_string()]);
        assert_eq!(upload.file_name(), "deck.pptx");
        assert_eq!(block_on(upload.read()).unwrap(), content);
        assert_eq!(get_upload_session(&session.upload_id), None);
    }

    #[test]
    fn chunks_must_arrive_in_order() {
        let ids = CountingIds(Cell::new(0));
        let session = begin_chunked_upload(meta("a.pdf", 4), &ids, 1).unwrap();
        assert_eq!(
            upload_next_chunk(&session.upload_id, 1, vec![1], 2),
            Err(LibraryError::UploadChunkOutOfOrder)
        );
        assert!(matches!(
            upload_next_chunk(&session.upload_id, 0, vec![1; 5], 2),
            Err(LibraryError::UploadError(_))
        ));
    }

    #[test]
    fn incomplete_or_tampered_uploads_fail_to_read() {
        let ids = CountingIds(Cell::new(0));
        let session = begin_chunked_upload(meta("a.pdf", 4), &ids, 1).unwrap();
        let (upload, _) = take_completed_upload(&session.upload_id, String::new()).unwrap();
        assert!(matches!(
            block_on(upload.read()),
            Err(LibraryError::IngestionReadFailure(_))
        ));

        let session = begin_chunked_upload(meta("b.pdf", 4), &ids, 1).unwrap();
        upload_next_chunk(&session.upload_id, 0, vec![1, 2, 3, 4], 2).unwrap();
        let (upload, _) =
            take_completed_upload(&session.upload_id, calculate_sha256_hex(b"other")).unwrap();
        assert!(matches!(
            block_on(upload.read()),
            Err(LibraryError::IngestionReadFailure(_))
        ));
    }

    #[test]
    fn rejects_bad_metadata() {
        let ids = CountingIds(Cell::new(0));
        assert!(begin_chunked_upload(meta("empty.pdf", 0), &ids, 1).is_err());
        assert!(begin_chunked_upload(meta(" ", 10), &ids, 1).is_err());
        assert!(begin_chunked_upload(meta("huge.mov", MAX_TOTAL_UPLOAD_SIZE_BYTES + 1), &ids, 1).is_err());
        let mut bad_date = meta("a.pdf", 10);
        bad_date.expiry_date = Some("31/12/2026".to_string());
        assert!(matches!(
            begin_chunked_upload(bad_date, &ids, 1),
            Err(LibraryError::InvalidInput(_))
        ));
    }

    #[test]
    fn idle_sessions_are_cleaned_up() {
        let ids = CountingIds(Cell::new(0));
        let idle = begin_chunked_upload(meta("idle.pdf", 4), &ids, 100).unwrap();
        let busy = begin_chunked_upload(meta("busy.pdf", 8), &ids, 100).unwrap();
        upload_next_chunk(&busy.upload_id, 0, vec![0; 4], 900).unwrap();

        let removed = cleanup_stale_uploads(1_000, 500);
        assert_eq!(removed, vec![idle.upload_id.clone()]);
        assert_eq!(get_upload_session(&idle.upload_id), None);
        assert!(get_upload_session(&busy.upload_id).is_some());
    }
}

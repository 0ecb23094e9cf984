// src/backend/services/registry.rs
// The authoritative in-memory table of content records.

use crate::error::LibraryError;
use crate::models::audit_log::LogAction;
use crate::models::content_record::{ContentRecord, DownloadChunk, DownloadPayload};
use crate::services::expiry::is_expired;
use crate::services::ingestion::decode_data_url;
use crate::storage::audit_logs;
use crate::storage::kv_store::KvStore;
use crate::storage::persistence::{PersistenceAdapter, SaveOutcome};
use crate::utils::log;

/// Largest decoded payload returned whole by `download`. Leaves headroom
/// under the 2 MiB reply limit for Candid framing.
pub const MAX_SINGLE_REPLY_BYTES: usize = 1536 * 1024;
/// Slice size served by `download_chunk`.
pub const DOWNLOAD_CHUNK_SIZE_BYTES: usize = 512 * 1024;

/// Records are kept newest first. Every mutation is followed by a save of
/// the full set, so the store always reflects the last committed state.
pub struct ContentRegistry<S: KvStore> {
    records: Vec<ContentRecord>,
    persistence: PersistenceAdapter<S>,
}

impl<S: KvStore> ContentRegistry<S> {
    /// Loads the persisted record set, or seeds and persists the default
    /// library when nothing readable is stored.
    pub fn load_or_seed(persistence: PersistenceAdapter<S>) -> Self {
        if let Some(records) = persistence.load() {
            log::info(format!("Loaded {} content record(s)", records.len()));
            return Self {
                records,
                persistence,
            };
        }

        let mut registry = Self {
            records: seed_records(),
            persistence,
        };
        registry.persist();
        audit_logs::add_entry(LogAction::LibrarySeeded, None);
        log::info(format!(
            "No stored library found; seeded {} record(s)",
            registry.records.len()
        ));
        registry
    }

    pub fn list(&self) -> &[ContentRecord] {
        &self.records
    }

    pub fn get_by_id(&self, id: &str) -> Result<&ContentRecord, LibraryError> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| LibraryError::RecordNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    /// Prepends `record` and persists. Ids must be unique.
    pub fn add(&mut self, record: ContentRecord) -> Result<SaveOutcome, LibraryError> {
        if self.contains(&record.id) {
            return Err(LibraryError::DuplicateId(record.id));
        }
        self.records.insert(0, record);
        Ok(self.persist())
    }

    /// Removes the record with `id` and persists. Removing an unknown id
    /// changes nothing and returns `None`.
    pub fn remove(&mut self, id: &str) -> Option<SaveOutcome> {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        if self.records.len() == before {
            return None;
        }
        Some(self.persist())
    }

    /// Records whose title or any tag contains `term`, ignoring case. A blank
    /// term matches everything.
    pub fn search(&self, term: &str) -> Vec<&ContentRecord> {
        let needle = term.trim().to_lowercase();
        self.records
            .iter()
            .filter(|r| {
                needle.is_empty()
                    || r.title.to_lowercase().contains(&needle)
                    || r.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Up to `limit` records, most recent `created_date` first. Records from
    /// the same day keep their registry order.
    pub fn recent(&self, limit: usize) -> Vec<&ContentRecord> {
        let mut sorted: Vec<&ContentRecord> = self.records.iter().collect();
        sorted.sort_by(|a, b| b.created_date.cmp(&a.created_date));
        sorted.truncate(limit);
        sorted
    }

    /// Decoded content of a record, for download. Content larger than one
    /// reply must go through `download_chunk`.
    pub fn download(&self, id: &str, today: &str) -> Result<DownloadPayload, LibraryError> {
        let payload = self.decoded(id, today)?;
        if payload.bytes.len() > MAX_SINGLE_REPLY_BYTES {
            return Err(LibraryError::PayloadTooLarge {
                size: payload.bytes.len() as u64,
                limit: MAX_SINGLE_REPLY_BYTES as u64,
            });
        }
        Ok(payload)
    }

    /// Slice `chunk_index` of a record's decoded content. Empty content is a
    /// single empty chunk.
    pub fn download_chunk(
        &self,
        id: &str,
        chunk_index: u32,
        today: &str,
    ) -> Result<DownloadChunk, LibraryError> {
        let DownloadPayload {
            file_name,
            mime_type,
            bytes,
        } = self.decoded(id, today)?;
        let chunk_count = bytes.len().div_ceil(DOWNLOAD_CHUNK_SIZE_BYTES).max(1);
        let index = chunk_index as usize;
        if index >= chunk_count {
            return Err(LibraryError::InvalidInput(format!(
                "Chunk {} requested but {} has {} chunk(s)",
                chunk_index, id, chunk_count
            )));
        }
        let start = index * DOWNLOAD_CHUNK_SIZE_BYTES;
        let end = (start + DOWNLOAD_CHUNK_SIZE_BYTES).min(bytes.len());
        Ok(DownloadChunk {
            file_name,
            mime_type,
            total_size_bytes: bytes.len() as u64,
            chunk_index,
            chunk_count: chunk_count as u32,
            bytes: bytes[start..end].to_vec(),
        })
    }

    fn decoded(&self, id: &str, today: &str) -> Result<DownloadPayload, LibraryError> {
        let record = self.get_by_id(id)?;
        if is_expired(record.expiry_date.as_deref(), today) {
            return Err(LibraryError::ContentExpired(
                record.expiry_date.clone().unwrap_or_default(),
            ));
        }
        let payload = record
            .payload
            .as_deref()
            .ok_or_else(|| LibraryError::DownloadUnavailable(record.id.clone()))?;
        let (mime_type, bytes) = decode_data_url(payload)?;
        Ok(DownloadPayload {
            file_name: record.title.clone(),
            mime_type,
            bytes,
        })
    }

    pub fn persistence(&self) -> &PersistenceAdapter<S> {
        &self.persistence
    }

    fn persist(&mut self) -> SaveOutcome {
        self.persistence.save(&self.records)
    }
}

/// Illustrative records shown on first run. None of them carries content.
pub fn seed_records() -> Vec<ContentRecord> {
    let seed = |id: &str,
                title: &str,
                media_type: &str,
                size: &str,
                owner: &str,
                date: &str,
                tags: &[&str],
                folder: &str,
                version: &str| ContentRecord {
        id: id.to_string(),
        title: title.to_string(),
        media_type: media_type.to_string(),
        size_display: size.to_string(),
        owner: owner.to_string(),
        created_date: date.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        folder: folder.to_string(),
        version: version.to_string(),
        expiry_date: None,
        payload: None,
    };

    vec![
        seed(
            "1",
            "Q4 2025 Sales Deck",
            "pptx",
            "2.5 MB",
            "Sarah Jenkins",
            "2025-10-15",
            &["Sales", "Q4"],
            "Presentations",
            "v1.2",
        ),
        seed(
            "2",
            "Competitor Analysis - Enterprise",
            "pdf",
            "1.2 MB",
            "Mike Ross",
            "2025-10-20",
            &["Strategy", "Competitive"],
            "Internal",
            "v2.0",
        ),
        seed(
            "3",
            "Product Pricing Sheet",
            "xlsx",
            "45 KB",
            "Alice Chen",
            "2025-11-01",
            &["Sales", "Pricing"],
            "Resources",
            "v1.0",
        ),
        seed(
            "4",
            "Brand Logo Pack",
            "image",
            "15 MB",
            "Design Team",
            "2025-09-10",
            &["Brand", "Assets"],
            "Marketing",
            "v1.0",
        ),
    ]
}

// src/backend/services/ingestion.rs
// Turns a raw upload into a committed content record.

use crate::error::LibraryError;
use crate::metrics::{self, Counter};
use crate::models::audit_log::LogAction;
use crate::models::common::IsoDate;
use crate::models::content_record::ContentRecord;
use crate::services::registry::ContentRegistry;
use crate::storage::audit_logs;
use crate::storage::kv_store::KvStore;
use crate::utils::log;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::cell::RefCell;

pub const LOCAL_OWNER: &str = "You";
pub const DEFAULT_FOLDER: &str = "Unsorted";
pub const INITIAL_VERSION: &str = "v1.0";
/// Media type of files whose name has no extension.
pub const GENERIC_MEDIA_TYPE: &str = "file";

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Raw content waiting to be ingested. `read` resolves exactly once.
#[allow(async_fn_in_trait)]
pub trait BlobSource {
    fn file_name(&self) -> &str;
    async fn read(self) -> Result<Vec<u8>, LibraryError>;
}

/// Supplies candidate record ids. Candidates may collide; the pipeline
/// checks them against the registry.
pub trait IdSource {
    fn candidate(&self) -> String;
}

/// Caller-supplied metadata for an upload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestMetadata {
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub expiry_date: Option<IsoDate>,
}

/// Human-readable size: bytes below 1 KiB, then KB and MB to one decimal,
/// with ties rounded up.
pub fn size_display(n: u64) -> String {
    if n < KIB {
        return format!("{} B", n);
    }
    let (unit, suffix) = if n < MIB { (KIB, "KB") } else { (MIB, "MB") };
    let tenths = (n as u128 * 10 + unit as u128 / 2) / unit as u128;
    format!("{}.{} {}", tenths / 10, tenths % 10, suffix)
}

/// Lowercased text after the last `.` of `file_name`.
pub fn media_type(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_lowercase(),
        _ => GENERIC_MEDIA_TYPE.to_string(),
    }
}

/// Self-contained data URL embedding `bytes`, typed after `file_name`.
pub fn to_data_url(file_name: &str, bytes: &[u8]) -> String {
    let mime = mime_guess::from_path(file_name).first_or_octet_stream();
    format!("data:{};base64,{}", mime.essence_str(), BASE64.encode(bytes))
}

/// Splits a base64 data URL into its MIME type and decoded bytes.
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>), LibraryError> {
    let malformed = || LibraryError::StorageError("Stored payload is not a base64 data URL".to_string());
    let rest = url.strip_prefix("data:").ok_or_else(malformed)?;
    let (header, data) = rest.split_once(',').ok_or_else(malformed)?;
    let mime = header.strip_suffix(";base64").ok_or_else(malformed)?;
    let bytes = BASE64
        .decode(data)
        .map_err(|e| LibraryError::StorageError(format!("Stored payload is not valid base64: {}", e)))?;
    let mime = if mime.is_empty() {
        "application/octet-stream".to_string()
    } else {
        mime.to_string()
    };
    Ok((mime, bytes))
}

/// Reads, transcodes and commits uploads into a shared registry.
///
/// The registry is borrowed only between suspension points, so concurrent
/// ingestions each commit against the latest state.
pub struct IngestionPipeline<'a, S: KvStore, I: IdSource> {
    registry: &'a RefCell<ContentRegistry<S>>,
    ids: &'a I,
}

impl<'a, S: KvStore, I: IdSource> IngestionPipeline<'a, S, I> {
    pub fn new(registry: &'a RefCell<ContentRegistry<S>>, ids: &'a I) -> Self {
        Self { registry, ids }
    }

    /// Ingests `source` and returns the record as committed. A failed read
    /// commits nothing.
    pub async fn ingest<B: BlobSource>(
        &self,
        source: B,
        metadata: IngestMetadata,
        today: IsoDate,
    ) -> Result<ContentRecord, LibraryError> {
        let file_name = source.file_name().to_string();
        let bytes = match source.read().await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn(format!("Ingestion of {} failed: {}", file_name, e));
                metrics::increment(Counter::IngestionFailure);
                audit_logs::add_entry(LogAction::IngestionFailed, Some(file_name));
                return Err(e);
            }
        };
        let payload = to_data_url(&file_name, &bytes);

        let record = {
            let mut registry = self.registry.borrow_mut();
            let record = ContentRecord {
                id: self.fresh_id(&registry),
                title: metadata
                    .title
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| file_name.clone()),
                media_type: media_type(&file_name),
                size_display: size_display(bytes.len() as u64),
                owner: LOCAL_OWNER.to_string(),
                created_date: today,
                tags: metadata.tags,
                folder: DEFAULT_FOLDER.to_string(),
                version: INITIAL_VERSION.to_string(),
                expiry_date: metadata.expiry_date,
                payload: Some(payload),
            };
            registry.add(record.clone())?;
            record
        };

        metrics::increment(Counter::Ingestion);
        audit_logs::add_entry(LogAction::ContentIngested, Some(record.id.clone()));
        log::info(format!(
            "Ingested {} as {} ({})",
            file_name, record.id, record.size_display
        ));
        Ok(record)
    }

    fn fresh_id(&self, registry: &ContentRegistry<S>) -> String {
        loop {
            let candidate = self.ids.candidate();
            if !candidate.is_empty() && !registry.contains(&candidate) {
                return candidate;
            }
        }
    }
}

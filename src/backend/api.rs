// src/backend/api.rs
// Candid endpoints of the collateral library canister.

use crate::{
    error::LibraryError,
    metrics::{self, Counter, LibraryMetrics},
    models::{
        audit_log::{AuditLogEntry, LogAction},
        common::{Audience, ContentId, IsoDate, Permission, UploadId},
        content_record::{ContentRecord, ContentSummary, DownloadChunk, DownloadPayload},
        share::{ShareDescriptor, SharedView},
        upload_session::{FileMeta, UploadSession},
    },
    services::{
        expiry::is_expired,
        ingestion::IngestionPipeline,
        registry::ContentRegistry,
        share_link,
        upload_service,
    },
    storage::{
        audit_logs,
        config::get_config,
        kv_store::StableKvStore,
        memory::{get_library_store_memory, Memory},
        persistence::PersistenceAdapter,
    },
    utils::{
        log,
        rng::CanisterIds,
        time::{get_current_time_ns, is_iso_date, today},
    },
};
use candid::{CandidType, Deserialize};
use ic_cdk_macros::{query, update};
use std::cell::RefCell;
use std::rc::Rc;
use validator::{Validate, ValidationError};

const MAX_RECENT_EVENTS: u32 = 100;

pub type LibraryRegistry = ContentRegistry<StableKvStore<Memory>>;

thread_local! {
    // Loaded from stable memory on first use, seeded if nothing is stored.
    static REGISTRY: Rc<RefCell<LibraryRegistry>> = Rc::new(RefCell::new(
        ContentRegistry::load_or_seed(PersistenceAdapter::new(StableKvStore::init(
            get_library_store_memory(),
            get_config().store_quota_bytes,
        )))
    ));
}

/// Shared handle on the registry, for callers that must hold it across an await.
pub fn registry_handle() -> Rc<RefCell<LibraryRegistry>> {
    REGISTRY.with(Rc::clone)
}

fn with_registry<R>(f: impl FnOnce(&LibraryRegistry) -> R) -> R {
    REGISTRY.with(|registry| f(&registry.borrow()))
}

fn with_registry_mut<R>(f: impl FnOnce(&mut LibraryRegistry) -> R) -> R {
    REGISTRY.with(|registry| f(&mut registry.borrow_mut()))
}

fn summarize(record: &ContentRecord, today: &str) -> ContentSummary {
    ContentSummary::from_record(record, is_expired(record.expiry_date.as_deref(), today))
}

// --- Validation Helpers ---

fn validate_request<T: Validate>(req: &T) -> Result<(), LibraryError> {
    req.validate().map_err(|e| LibraryError::InvalidInput(e.to_string()))
}

fn validate_iso_date(value: &str) -> Result<(), ValidationError> {
    if is_iso_date(value) {
        Ok(())
    } else {
        Err(ValidationError::new("iso_date"))
    }
}

fn validate_hex(value: &str) -> Result<(), ValidationError> {
    if value.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(ValidationError::new("hex"))
    }
}

// --- Request Structs ---

#[derive(CandidType, Deserialize, Clone, Debug, Validate)]
pub struct BeginUploadRequest {
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[validate(range(min = 1, max = 10_485_760))]
    pub size_bytes: u64,
    #[validate(length(max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 20))]
    pub tags: Vec<String>,
    #[validate(custom(function = "validate_iso_date"))]
    pub expiry_date: Option<IsoDate>,
}

impl From<BeginUploadRequest> for FileMeta {
    fn from(req: BeginUploadRequest) -> Self {
        FileMeta {
            file_name: req.file_name,
            size_bytes: req.size_bytes,
            title: req.title,
            tags: req
                .tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            expiry_date: req.expiry_date,
        }
    }
}

#[derive(CandidType, Deserialize, Clone, Debug, Validate)]
pub struct UploadChunkRequest {
    #[validate(length(min = 1))]
    pub upload_id: UploadId,
    pub chunk_index: u32,
    #[serde(with = "serde_bytes")]
    #[validate(length(min = 1, max = 524_288))]
    pub data: Vec<u8>,
}

#[derive(CandidType, Deserialize, Clone, Debug, Validate)]
pub struct FinishUploadRequest {
    #[validate(length(min = 1))]
    pub upload_id: UploadId,
    #[validate(length(min = 64, max = 64), custom(function = "validate_hex"))]
    pub sha256_checksum_hex: String,
}

#[derive(CandidType, Deserialize, Clone, Debug, Validate)]
pub struct CreateShareLinkRequest {
    #[validate(length(min = 1))]
    pub content_id: ContentId,
    pub audience: Audience,
    pub permission: Permission,
}

// --- Library Queries ---

#[query]
fn list_content() -> Vec<ContentSummary> {
    let today = today();
    with_registry(|registry| registry.list().iter().map(|r| summarize(r, &today)).collect())
}

#[query]
fn get_content(id: ContentId) -> Result<ContentSummary, LibraryError> {
    let today = today();
    with_registry(|registry| registry.get_by_id(&id).map(|r| summarize(r, &today)))
}

#[query]
fn search_content(term: String) -> Vec<ContentSummary> {
    let today = today();
    with_registry(|registry| {
        registry
            .search(&term)
            .into_iter()
            .map(|r| summarize(r, &today))
            .collect()
    })
}

#[query]
fn recent_content(limit: u32) -> Vec<ContentSummary> {
    let today = today();
    with_registry(|registry| {
        registry
            .recent(limit as usize)
            .into_iter()
            .map(|r| summarize(r, &today))
            .collect()
    })
}

// --- Library Updates ---

/// Returns false when no record had that id.
#[update]
fn delete_content(id: ContentId) -> bool {
    let removed = with_registry_mut(|registry| registry.remove(&id)).is_some();
    if removed {
        metrics::increment(Counter::Removal);
        audit_logs::add_entry(LogAction::ContentDeleted, Some(id.clone()));
        log::info(format!("Deleted content {}", id));
    }
    removed
}

// --- Sharing & Downloads ---
// These record metrics and audit entries, so they run as updates.

#[update]
fn create_share_link(req: CreateShareLinkRequest) -> Result<String, LibraryError> {
    validate_request(&req)?;
    let link = issue_share_link(&req, &today())?;
    metrics::increment(Counter::ShareLinkIssued);
    audit_logs::add_entry(
        LogAction::ShareLinkIssued,
        Some(format!("{} ({})", req.content_id, req.permission.as_str())),
    );
    Ok(link)
}

fn issue_share_link(req: &CreateShareLinkRequest, today: &str) -> Result<String, LibraryError> {
    with_registry(|registry| {
        let record = registry.get_by_id(&req.content_id)?;
        if is_expired(record.expiry_date.as_deref(), today) {
            return Err(LibraryError::ContentExpired(
                record.expiry_date.clone().unwrap_or_default(),
            ));
        }
        Ok(())
    })?;
    let descriptor = ShareDescriptor {
        target_id: req.content_id.clone(),
        audience: req.audience,
        permission: req.permission,
    };
    share_link::encode(&get_config().share_base_url, &descriptor)
}

#[update]
fn resolve_share_link(link: String) -> Result<SharedView, LibraryError> {
    let view = with_registry(|registry| share_link::resolve(registry, &link, &today()))?;
    metrics::increment(Counter::ShareLinkResolved);
    audit_logs::add_entry(LogAction::ShareLinkResolved, Some(view.content.id.clone()));
    Ok(view)
}

#[update]
fn download_content(id: ContentId) -> Result<DownloadPayload, LibraryError> {
    let payload = with_registry(|registry| registry.download(&id, &today()))?;
    record_download(&id);
    Ok(payload)
}

/// Slice of a record's content. Content over the single-reply limit is only
/// available this way.
#[update]
fn download_content_chunk(id: ContentId, chunk_index: u32) -> Result<DownloadChunk, LibraryError> {
    let chunk = with_registry(|registry| registry.download_chunk(&id, chunk_index, &today()))?;
    if chunk_index == 0 {
        record_download(&id);
    }
    Ok(chunk)
}

/// Downloads through a share link. View-only links are refused.
#[update]
fn download_shared(link: String) -> Result<DownloadPayload, LibraryError> {
    let id = downloadable_target(&link)?;
    let payload = with_registry(|registry| registry.download(&id, &today()))?;
    record_download(&id);
    Ok(payload)
}

#[update]
fn download_shared_chunk(link: String, chunk_index: u32) -> Result<DownloadChunk, LibraryError> {
    let id = downloadable_target(&link)?;
    let chunk = with_registry(|registry| registry.download_chunk(&id, chunk_index, &today()))?;
    if chunk_index == 0 {
        record_download(&id);
    }
    Ok(chunk)
}

/// Record id behind a share link that grants download access.
fn downloadable_target(link: &str) -> Result<ContentId, LibraryError> {
    let target = share_link::decode(link)?;
    if target.permission != Permission::Download {
        return Err(LibraryError::PermissionDenied(format!(
            "Link for {} only grants view access",
            target.id
        )));
    }
    Ok(target.id)
}

fn record_download(id: &str) {
    metrics::increment(Counter::Download);
    audit_logs::add_entry(LogAction::ContentDownloaded, Some(id.to_string()));
}

// --- Content Upload Endpoints ---

#[update]
fn begin_upload(req: BeginUploadRequest) -> Result<UploadSession, LibraryError> {
    validate_request(&req)?;
    upload_service::begin_chunked_upload(req.into(), &CanisterIds, get_current_time_ns())
}

#[update]
fn upload_chunk(req: UploadChunkRequest) -> Result<UploadSession, LibraryError> {
    validate_request(&req)?;
    upload_service::upload_next_chunk(&req.upload_id, req.chunk_index, req.data, get_current_time_ns())
}

#[query]
fn get_upload(upload_id: UploadId) -> Option<UploadSession> {
    upload_service::get_upload_session(&upload_id)
}

/// Closes the session and ingests its content into the library.
#[update]
async fn finish_upload(req: FinishUploadRequest) -> Result<ContentSummary, LibraryError> {
    validate_request(&req)?;
    let (upload, metadata) =
        upload_service::take_completed_upload(&req.upload_id, req.sha256_checksum_hex)?;
    let registry = registry_handle();
    let today = today();
    let record = IngestionPipeline::new(&*registry, &CanisterIds)
        .ingest(upload, metadata, today.clone())
        .await?;
    Ok(summarize(&record, &today))
}

// --- Observability ---

#[query]
fn get_metrics() -> LibraryMetrics {
    metrics::get_library_metrics()
}

/// Newest audit entries first.
#[query]
fn recent_events(limit: Option<u32>) -> Vec<AuditLogEntry> {
    let limit = limit.unwrap_or(MAX_RECENT_EVENTS).min(MAX_RECENT_EVENTS);
    audit_logs::get_recent_entries(limit as usize)
}

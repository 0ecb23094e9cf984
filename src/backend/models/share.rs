// src/backend/models/share.rs
use crate::models::common::{Audience, ContentId, Permission};
use crate::models::content_record::ContentSummary;
use candid::CandidType;
use serde::{Deserialize, Serialize};

/// Settings chosen when sharing a record. Built only to produce a link.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ShareDescriptor {
    pub target_id: ContentId,
    pub audience: Audience,
    pub permission: Permission,
}

/// What a share link carries once decoded.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ShareTarget {
    pub id: ContentId,
    pub permission: Permission,
}

/// A resolved share link, ready for the viewer to render.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SharedView {
    pub content: ContentSummary,
    pub permission: Permission,
    pub can_download: bool,
    pub expired: bool,
    /// Inline preview data URL, present for images that still carry content.
    pub preview: Option<String>,
}

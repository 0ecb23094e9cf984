// src/backend/models/common.rs
use candid::CandidType;
use serde::{Deserialize, Serialize};

pub type ContentId = String; // Opaque, unique within the registry
pub type UploadId = String; // Exposed id of a chunked upload session
pub type IsoDate = String; // Calendar date, `YYYY-MM-DD`

pub type Timestamp = u64; // Nanoseconds since epoch
pub type StorageBytes = u64;

/// What a share link lets its holder do.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    #[default]
    View,
    Download,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::View => "view",
            Permission::Download => "download",
        }
    }

    /// Parses a query value. Anything unrecognized is `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "view" => Some(Permission::View),
            "download" => Some(Permission::Download),
            _ => None,
        }
    }
}

/// Who a link is meant for. Advisory only: there is no authentication layer.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    #[default]
    Internal,
    External,
}

pub mod expiry;
pub mod ingestion;
pub mod registry;
pub mod scheduler;
pub mod share_link;
pub mod upload_service;

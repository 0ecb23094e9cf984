pub mod audit_log;
pub mod common;
pub mod content_record;
pub mod init;
pub mod share;
pub mod upload_session;

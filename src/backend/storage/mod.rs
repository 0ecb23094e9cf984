// src/backend/storage/mod.rs
// Stable memory: config, the bounded record store, audit log and metrics.

pub mod audit_logs;
pub mod config;
pub mod kv_store;
pub mod memory;
pub mod metrics;
pub mod persistence;
pub mod storable;

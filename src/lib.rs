// src/lib.rs
//! Bulk content ingestion: turn a batch of source URIs into imported assets,
//! skipped duplicates and per-item failures.

pub mod api;
pub mod config;
pub mod ingest;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::ingest::{
    BatchReport, ImportCandidate, ImportOptions, Importer, IngestError, ItemResult, ItemStatus,
    TenantScope,
};

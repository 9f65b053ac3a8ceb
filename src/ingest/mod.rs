// src/ingest/mod.rs
pub mod aggregate;
pub mod known;
pub mod normalize;
pub mod orchestrator;
pub mod pipeline;
pub mod providers;
pub mod store;
pub mod types;
pub mod validate;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

pub use pipeline::{Importer, PipelineSettings};
pub use types::{BatchReport, ImportCandidate, ImportOptions, ItemResult, ItemStatus, TenantScope};

/// Batch-level failures. Per-item problems never surface here.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("import batch is empty")]
    EmptyBatch,

    #[error("import batch has {len} items, maximum is {max}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("existing-record index unavailable: {0:#}")]
    KnownIndexUnavailable(anyhow::Error),
}

impl IngestError {
    /// Input errors are the caller's fault; the rest is ours.
    pub fn is_input_error(&self) -> bool {
        matches!(self, IngestError::EmptyBatch | IngestError::BatchTooLarge { .. })
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_batches_total", "Import batches run, by execution mode.");
        describe_counter!("ingest_items_total", "Final item results, by status.");
        describe_counter!(
            "ingest_provider_errors_total",
            "Provider errors, timeouts and empty replies."
        );
        describe_counter!(
            "ingest_provider_fallthrough_total",
            "Times an item moved on to the next provider."
        );
        describe_histogram!("ingest_retrieve_ms", "Provider call time in milliseconds.");
        describe_gauge!("ingest_last_batch_ts", "Unix ts when the last import batch finished.");
    });
}

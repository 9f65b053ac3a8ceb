// src/ingest/aggregate.rs
use std::sync::Mutex;

use metrics::counter;

use crate::ingest::known::SeenSet;
use crate::ingest::orchestrator::ExecutionMode;
use crate::ingest::store::AssetSink;
use crate::ingest::types::{
    BatchReport, ImportCandidate, ItemResult, ProviderUsed, RetrievalOutcome, TenantScope,
};
use crate::ingest::validate::Verdict;

/// Collects per-item outcomes and is the only caller of the persistence sink.
/// Each result carries its input position; sequential reports come back in
/// input order, grouped reports in completion order.
pub struct Aggregator<'a> {
    sink: &'a dyn AssetSink,
    tenant: &'a TenantScope,
    seen: SeenSet,
    items: Mutex<Vec<(usize, ItemResult)>>,
}

impl<'a> Aggregator<'a> {
    pub fn new(sink: &'a dyn AssetSink, tenant: &'a TenantScope) -> Self {
        Self {
            sink,
            tenant,
            seen: SeenSet::new(),
            items: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, idx: usize, result: ItemResult) {
        counter!("ingest_items_total", "status" => result.status().as_str()).increment(1);
        self.items
            .lock()
            .expect("aggregator mutex poisoned")
            .push((idx, result));
    }

    /// Turn a validated outcome into a final result, persisting it when it passed.
    pub async fn settle(
        &self,
        idx: usize,
        cand: &ImportCandidate,
        outcome: RetrievalOutcome,
        verdict: Verdict,
    ) {
        let uri = cand.source_uri.as_str();
        let warning = match verdict {
            Verdict::Fail(detail) => {
                tracing::info!(target: "ingest", uri, %detail, "item failed validation");
                self.push(
                    idx,
                    ItemResult::Failed {
                        source_uri: uri.to_string(),
                        detail,
                    },
                );
                return;
            }
            Verdict::Pass => None,
            Verdict::PassWithWarning(w) => Some(w),
        };

        // Claimed before the write so two workers on the same URI cannot both import it.
        if !self.seen.claim(uri) {
            self.push(
                idx,
                ItemResult::SkippedDuplicateInBatch {
                    source_uri: uri.to_string(),
                },
            );
            return;
        }

        let provider = outcome.provider_used.unwrap_or(ProviderUsed::PreSupplied);
        match self.sink.create_record(cand, &outcome, self.tenant).await {
            Ok(asset_id) => {
                tracing::debug!(target: "ingest", uri, %asset_id, %provider, "item imported");
                self.push(
                    idx,
                    ItemResult::Imported {
                        source_uri: uri.to_string(),
                        asset_id,
                        provider,
                        warning,
                    },
                );
            }
            Err(e) => {
                self.seen.release(uri);
                tracing::warn!(target: "ingest", uri, error = %format!("{e:#}"), "persistence failed");
                self.push(
                    idx,
                    ItemResult::Failed {
                        source_uri: uri.to_string(),
                        detail: format!("persistence failed: {e:#}"),
                    },
                );
            }
        }
    }

    pub fn finish(self, mode: ExecutionMode) -> BatchReport {
        let mut slots = self
            .items
            .into_inner()
            .expect("aggregator mutex poisoned");
        if matches!(mode, ExecutionMode::Sequential { .. }) {
            slots.sort_by_key(|(idx, _)| *idx);
        }
        BatchReport {
            items: slots.into_iter().map(|(_, r)| r).collect(),
            mode,
        }
    }
}

// src/ingest/orchestrator.rs
//! Drives candidates through the provider chain and the validator, either one
//! at a time (rate-limited primary) or in bounded concurrent groups.

use std::time::Duration;

use futures::future::join_all;
use serde::{Serialize, Serializer};
use tokio::time::Instant;

use crate::ingest::aggregate::Aggregator;
use crate::ingest::providers::ProviderChain;
use crate::ingest::types::{
    ImportCandidate, ImportOptions, ItemResult, ProviderUsed, RetrievalOutcome,
};
use crate::ingest::validate::ContentValidator;

pub const DEFAULT_GROUP_WIDTH: usize = 5;
/// Keeps a 10 req/min provider at roughly 8.5 req/min.
pub const DEFAULT_RATE_LIMITED_DELAY: Duration = Duration::from_millis(7_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Sequential { delay: Duration },
    Grouped { width: usize },
}

impl ExecutionMode {
    pub fn label(&self) -> &'static str {
        match self {
            ExecutionMode::Sequential { .. } => "sequential",
            ExecutionMode::Grouped { .. } => "grouped",
        }
    }
}

impl Serialize for ExecutionMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(tag = "kind", rename_all = "camelCase")]
        enum Wire {
            #[serde(rename_all = "camelCase")]
            Sequential { delay_ms: u64 },
            Grouped { width: usize },
        }
        match *self {
            ExecutionMode::Sequential { delay } => Wire::Sequential {
                delay_ms: delay.as_millis() as u64,
            },
            ExecutionMode::Grouped { width } => Wire::Grouped { width },
        }
        .serialize(serializer)
    }
}

/// Decided once per batch: sequential only when the chain leads with a
/// rate-limited provider and something actually has to be fetched.
pub fn choose_mode(
    primary_rate_limited: bool,
    needs_live: usize,
    group_width: usize,
    rate_limited_delay: Duration,
) -> ExecutionMode {
    if primary_rate_limited && needs_live > 0 {
        ExecutionMode::Sequential {
            delay: rate_limited_delay,
        }
    } else {
        ExecutionMode::Grouped {
            width: group_width.max(1),
        }
    }
}

pub struct Orchestrator<'a> {
    chain: &'a ProviderChain,
    validator: ContentValidator,
    options: ImportOptions,
    deadline: Option<Instant>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        chain: &'a ProviderChain,
        validator: ContentValidator,
        options: ImportOptions,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            chain,
            validator,
            options,
            deadline,
        }
    }

    /// Pre-fetched content is only trusted when it clears the length bar.
    fn pre_fetched_usable(&self, cand: &ImportCandidate) -> bool {
        cand.pre_fetched_content
            .as_deref()
            .is_some_and(|c| self.validator.long_enough(c))
    }

    pub fn needs_live(&self, cand: &ImportCandidate) -> bool {
        self.options.allow_live_retrieval && !self.pre_fetched_usable(cand)
    }

    /// `candidates` carry their position in the original batch.
    pub async fn run(
        &self,
        mode: ExecutionMode,
        candidates: &[(usize, ImportCandidate)],
        agg: &Aggregator<'_>,
    ) {
        match mode {
            ExecutionMode::Sequential { delay } => {
                for (i, (idx, cand)) in candidates.iter().enumerate() {
                    let went_live = self.process(*idx, cand, agg).await;
                    if went_live && i + 1 < candidates.len() && !self.past_deadline() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
            ExecutionMode::Grouped { width } => {
                for group in candidates.chunks(width.max(1)) {
                    join_all(group.iter().map(|(idx, cand)| self.process(*idx, cand, agg))).await;
                }
            }
        }
    }

    fn past_deadline(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Returns whether the item hit the network.
    async fn process(&self, idx: usize, cand: &ImportCandidate, agg: &Aggregator<'_>) -> bool {
        if self.past_deadline() {
            agg.push(
                idx,
                ItemResult::Failed {
                    source_uri: cand.source_uri.clone(),
                    detail: "batch deadline exceeded".to_string(),
                },
            );
            return false;
        }

        let (outcome, went_live) = self.retrieve(cand).await;
        let verdict = self.validator.check(&outcome);
        agg.settle(idx, cand, outcome, verdict).await;
        went_live
    }

    async fn retrieve(&self, cand: &ImportCandidate) -> (RetrievalOutcome, bool) {
        let pre = cand
            .pre_fetched_content
            .as_deref()
            .filter(|c| !c.trim().is_empty());
        if let Some(content) = pre {
            if self.pre_fetched_usable(cand) || !self.options.allow_live_retrieval {
                let outcome = RetrievalOutcome {
                    content: content.to_string(),
                    published_at: cand.pre_fetched_published_at,
                    provider_used: Some(ProviderUsed::PreSupplied),
                    warning: None,
                    error: None,
                };
                return (outcome, false);
            }
        }

        if !self.options.allow_live_retrieval {
            return (
                RetrievalOutcome::failed("live retrieval disabled and no pre-fetched content"),
                false,
            );
        }

        (self.chain.retrieve(&cand.source_uri).await, true)
    }
}

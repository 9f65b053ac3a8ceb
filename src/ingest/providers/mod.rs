// src/ingest/providers/mod.rs
pub mod direct_http;
pub mod reader_proxy;
pub mod scrape_api;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use metrics::{counter, histogram};

use crate::ingest::types::{Fetched, ProviderUsed, RetrievalOutcome};

/// A content-extraction service. Implementations must be safe to call concurrently.
#[async_trait::async_trait]
pub trait ContentProvider: Send + Sync {
    async fn retrieve(&self, uri: &str, timeout: Duration) -> Result<Fetched>;
    fn name(&self) -> &'static str;
    /// Strict published rate limit; forces sequential batches when this provider leads the chain.
    fn is_rate_limited(&self) -> bool {
        false
    }
}

/// Ordered providers, tried first to last for each item.
#[derive(Clone)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn ContentProvider>>,
    timeout: Duration,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn ContentProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn primary_rate_limited(&self) -> bool {
        self.providers
            .first()
            .map(|p| p.is_rate_limited())
            .unwrap_or(false)
    }

    /// Walk the chain for one URI. No retries: a failure (error, timeout or
    /// empty body) only moves on to the next provider, for this item alone.
    pub async fn retrieve(&self, uri: &str) -> RetrievalOutcome {
        if self.providers.is_empty() {
            return RetrievalOutcome::failed("no content providers configured");
        }

        let mut failures: Vec<String> = Vec::with_capacity(self.providers.len());
        for (idx, provider) in self.providers.iter().enumerate() {
            let name = provider.name();
            let t0 = Instant::now();
            let res = tokio::time::timeout(self.timeout, provider.retrieve(uri, self.timeout)).await;
            histogram!("ingest_retrieve_ms", "provider" => name)
                .record(t0.elapsed().as_secs_f64() * 1_000.0);

            let reason = match res {
                Ok(Ok(fetched)) if !fetched.content.trim().is_empty() => {
                    if idx > 0 {
                        tracing::info!(target: "ingest", provider = name, uri, "fallback provider succeeded");
                    }
                    return RetrievalOutcome::fetched(fetched, ProviderUsed::from_chain_index(idx));
                }
                Ok(Ok(_)) => "empty content".to_string(),
                Ok(Err(e)) => format!("{e:#}"),
                Err(_) => format!("timed out after {}s", self.timeout.as_secs_f32()),
            };

            tracing::warn!(target: "ingest", provider = name, uri, error = %reason, "provider failed");
            counter!("ingest_provider_errors_total", "provider" => name).increment(1);
            if idx + 1 < self.providers.len() {
                counter!("ingest_provider_fallthrough_total").increment(1);
            }
            failures.push(format!("{name}: {reason}"));
        }

        RetrievalOutcome::failed(format!("all providers failed ({})", failures.join("; ")))
    }
}

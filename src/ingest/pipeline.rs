// src/ingest/pipeline.rs
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use metrics::{counter, gauge};
use tokio::time::Instant;
use tracing::info;

use crate::config::ingest::IngestSettings;
use crate::ingest::aggregate::Aggregator;
use crate::ingest::known::{KnownIndex, KnownSources};
use crate::ingest::normalize::normalize_batch;
use crate::ingest::orchestrator::{
    choose_mode, Orchestrator, DEFAULT_GROUP_WIDTH, DEFAULT_RATE_LIMITED_DELAY,
};
use crate::ingest::providers::{
    direct_http::DirectHttpProvider, reader_proxy::ReaderProxyProvider,
    scrape_api::ScrapeApiProvider, ContentProvider, ProviderChain,
};
use crate::ingest::store::AssetSink;
use crate::ingest::types::{BatchReport, ImportCandidate, ImportOptions, ItemResult, TenantScope};
use crate::ingest::validate::{ContentValidator, DEFAULT_MIN_CONTENT_CHARS};
use crate::ingest::{ensure_metrics_described, IngestError};

pub const MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub max_batch_size: usize,
    pub group_width: usize,
    pub min_content_chars: usize,
    pub rate_limited_delay: Duration,
    pub batch_timeout: Option<Duration>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_batch_size: MAX_BATCH_SIZE,
            group_width: DEFAULT_GROUP_WIDTH,
            min_content_chars: DEFAULT_MIN_CONTENT_CHARS,
            rate_limited_delay: DEFAULT_RATE_LIMITED_DELAY,
            batch_timeout: None,
        }
    }
}

impl From<&IngestSettings> for PipelineSettings {
    fn from(cfg: &IngestSettings) -> Self {
        Self {
            max_batch_size: cfg.max_batch_size,
            group_width: cfg.group_width,
            min_content_chars: cfg.min_content_chars,
            rate_limited_delay: cfg.rate_limited_delay(),
            batch_timeout: cfg.batch_timeout(),
        }
    }
}

/// Build the provider chain in priority order: scrape API, reader proxy, direct fetch.
pub fn chain_from_settings(cfg: &IngestSettings) -> Result<ProviderChain> {
    let mut providers: Vec<Arc<dyn ContentProvider>> = Vec::new();
    if let Some(sa) = cfg.scrape_api.as_ref().filter(|s| s.enabled) {
        providers.push(Arc::new(ScrapeApiProvider::new(&sa.base_url, sa.api_key.clone())?));
    }
    if let Some(rp) = cfg.reader_proxy.as_ref().filter(|r| r.enabled) {
        providers.push(Arc::new(ReaderProxyProvider::new(&rp.base_url)?));
    }
    if cfg.direct_http.enabled {
        providers.push(Arc::new(DirectHttpProvider::new(&cfg.direct_http.user_agent)?));
    }
    let chain = ProviderChain::new(providers, cfg.provider_timeout());
    info!(target: "ingest", providers = ?chain.names(), rate_limited = chain.primary_rate_limited(), "provider chain ready");
    Ok(chain)
}

/// Turns a list of source URIs into classified outcomes.
pub struct Importer {
    chain: ProviderChain,
    known: Arc<dyn KnownSources>,
    sink: Arc<dyn AssetSink>,
    settings: PipelineSettings,
}

impl Importer {
    pub fn new(chain: ProviderChain, known: Arc<dyn KnownSources>, sink: Arc<dyn AssetSink>) -> Self {
        Self {
            chain,
            known,
            sink,
            settings: PipelineSettings::default(),
        }
    }

    pub fn from_settings(
        cfg: &IngestSettings,
        known: Arc<dyn KnownSources>,
        sink: Arc<dyn AssetSink>,
    ) -> Result<Self> {
        let chain = chain_from_settings(cfg)?;
        Ok(Self::new(chain, known, sink).with_settings(PipelineSettings::from(cfg)))
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Only input errors and an unreachable existing-record index fail the batch;
    /// everything else ends up as a per-item result.
    pub async fn run_import_batch(
        &self,
        candidates: Vec<ImportCandidate>,
        tenant: &TenantScope,
        options: ImportOptions,
    ) -> Result<BatchReport, IngestError> {
        ensure_metrics_described();
        let started = Instant::now();
        let deadline = self.settings.batch_timeout.map(|d| started + d);

        let normalized = normalize_batch(candidates, self.settings.max_batch_size)?;
        let known = KnownIndex::load(self.known.as_ref(), tenant).await?;

        let agg = Aggregator::new(self.sink.as_ref(), tenant);
        for (idx, r) in normalized.rejected {
            agg.push(idx, r);
        }

        let mut pending = Vec::with_capacity(normalized.accepted.len());
        for (idx, cand) in normalized.accepted {
            if known.contains(&cand.source_uri) {
                agg.push(
                    idx,
                    ItemResult::SkippedAlreadyImported {
                        source_uri: cand.source_uri,
                    },
                );
            } else {
                pending.push((idx, cand));
            }
        }

        let validator = ContentValidator::new(self.settings.min_content_chars);
        let orch = Orchestrator::new(&self.chain, validator, options, deadline);
        let needs_live = pending.iter().filter(|(_, c)| orch.needs_live(c)).count();
        let mode = choose_mode(
            self.chain.primary_rate_limited(),
            needs_live,
            self.settings.group_width,
            self.settings.rate_limited_delay,
        );

        info!(
            target: "ingest",
            %tenant,
            pending = pending.len(),
            needs_live,
            mode = mode.label(),
            "import batch started"
        );
        orch.run(mode, &pending, &agg).await;

        let report = agg.finish(mode);
        counter!("ingest_batches_total", "mode" => mode.label()).increment(1);
        gauge!("ingest_last_batch_ts").set(chrono::Utc::now().timestamp() as f64);
        info!(
            target: "ingest",
            %tenant,
            total = report.total(),
            succeeded = report.succeeded(),
            with_warning = report.succeeded_with_warning(),
            failed = report.failed(),
            skipped = report.skipped(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "import batch finished"
        );
        Ok(report)
    }
}

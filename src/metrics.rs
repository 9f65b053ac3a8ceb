use anyhow::{Context, Result};
use axum::{extract::State, routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::ingest::IngestSettings;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the static pipeline limits.
    pub fn init(cfg: &IngestSettings) -> Result<Self> {
        // Use default buckets to avoid API differences across crate versions.
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        gauge!("ingest_max_batch_size").set(cfg.max_batch_size as f64);
        gauge!("ingest_group_width").set(cfg.group_width as f64);
        gauge!("ingest_rate_limited_delay_ms").set(cfg.rate_limited_delay_ms as f64);

        Ok(Self { handle })
    }

    /// `/metrics` in Prometheus text format.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(render))
            .with_state(self.handle.clone())
    }
}

async fn render(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

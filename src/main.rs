//! Asset ingest service — binary entrypoint.
//! Boots the Axum HTTP server in front of the import pipeline.

use std::sync::Arc;

use asset_ingest::api::{self, AppState};
use asset_ingest::config::ingest::IngestSettings;
use asset_ingest::ingest::store::MemoryStore;
use asset_ingest::ingest::Importer;
use asset_ingest::metrics::Metrics;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Structured logs; `LOG_FORMAT=json` switches to JSON lines.
/// Shuttle may already have installed a subscriber, so this is best-effort.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ingest=info,asset_ingest=info,warn"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = IngestSettings::load_default()?;

    // The in-memory store stands in for the asset database in this deployment.
    let store = Arc::new(MemoryStore::new());
    let importer = Importer::from_settings(&cfg, store.clone(), store)?;

    let mut router = api::router(AppState::new(importer));
    match Metrics::init(&cfg) {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!(error = %format!("{e:#}"), "metrics endpoint disabled"),
    }

    Ok(router.into())
}

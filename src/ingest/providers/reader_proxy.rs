// src/ingest/providers/reader_proxy.rs
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use crate::ingest::providers::ContentProvider;
use crate::ingest::types::Fetched;

/// Fallback provider: a reader proxy that answers `GET {base}/{uri}` with the
/// page's main text. No rate limit, no metadata.
pub struct ReaderProxyProvider {
    http: reqwest::Client,
    base_url: String,
}

impl ReaderProxyProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("asset-ingest/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("building reader proxy http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn target(&self, uri: &str) -> String {
        format!("{}/{}", self.base_url, uri)
    }
}

#[async_trait]
impl ContentProvider for ReaderProxyProvider {
    async fn retrieve(&self, uri: &str, timeout: Duration) -> Result<Fetched> {
        let resp = self
            .http
            .get(self.target(uri))
            .header("accept", "text/plain")
            .timeout(timeout)
            .send()
            .await
            .context("reader proxy request")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("reader proxy HTTP {status}"));
        }
        let text = resp.text().await.context("reader proxy .text()")?;
        Ok(Fetched::text(text.trim()))
    }

    fn name(&self) -> &'static str {
        "reader_proxy"
    }
}

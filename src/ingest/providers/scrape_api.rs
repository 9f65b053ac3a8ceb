// src/ingest/providers/scrape_api.rs
//! Primary provider: a hosted scrape API with good metadata extraction and a
//! strict requests-per-minute ceiling.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest::providers::ContentProvider;
use crate::ingest::types::Fetched;

#[derive(Serialize)]
struct ScrapeReq<'a> {
    url: &'a str,
    formats: [&'a str; 1],
    #[serde(rename = "onlyMainContent")]
    only_main_content: bool,
}

#[derive(Debug, Deserialize)]
struct ScrapeResp {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<ScrapeData>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    metadata: Option<ScrapeMeta>,
    #[serde(default)]
    warning: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ScrapeMeta {
    #[serde(default, rename = "publishedTime")]
    published_time: Option<String>,
    #[serde(default, rename = "statusCode")]
    status_code: Option<u16>,
}

pub struct ScrapeApiProvider {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ScrapeApiProvider {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("asset-ingest/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("building scrape api http client")?;
        Ok(Self {
            http,
            endpoint: format!("{}/v1/scrape", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        })
    }

    fn parse(resp: ScrapeResp) -> Result<Fetched> {
        if !resp.success {
            return Err(anyhow!(
                "scrape api reported failure: {}",
                resp.error.unwrap_or_else(|| "unknown error".into())
            ));
        }
        let data = resp.data.ok_or_else(|| anyhow!("scrape api returned no data"))?;
        let meta = data.metadata.unwrap_or_default();
        if let Some(code) = meta.status_code.filter(|c| *c >= 400) {
            return Err(anyhow!("source page answered HTTP {code}"));
        }
        Ok(Fetched {
            content: data.markdown.unwrap_or_default(),
            published_at: meta.published_time.as_deref().and_then(parse_timestamp),
            warning: data.warning.filter(|w| !w.trim().is_empty()),
        })
    }
}

#[async_trait]
impl ContentProvider for ScrapeApiProvider {
    async fn retrieve(&self, uri: &str, timeout: Duration) -> Result<Fetched> {
        let req = ScrapeReq {
            url: uri,
            formats: ["markdown"],
            only_main_content: true,
        };
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&req)
            .send()
            .await
            .context("scrape api request")?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(anyhow!("scrape api rate limit hit (429)"));
        }
        if !status.is_success() {
            return Err(anyhow!("scrape api HTTP {status}"));
        }
        let body: ScrapeResp = resp.json().await.context("decoding scrape api response")?;
        Self::parse(body)
    }

    fn name(&self) -> &'static str {
        "scrape_api"
    }

    fn is_rate_limited(&self) -> bool {
        true
    }
}

/// RFC 3339 first, then a bare `YYYY-MM-DD`.
pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}

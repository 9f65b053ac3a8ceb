// src/config/ingest.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PATH: &str = "INGEST_CONFIG_PATH";
pub const ENV_SCRAPE_API_KEY: &str = "SCRAPE_API_KEY";

fn default_max_batch_size() -> usize {
    100
}
fn default_group_width() -> usize {
    5
}
fn default_min_content_chars() -> usize {
    100
}
fn default_provider_timeout_secs() -> u64 {
    30
}
fn default_rate_limited_delay_ms() -> u64 {
    7_000
}
fn default_true() -> bool {
    true
}
fn default_user_agent() -> String {
    concat!("asset-ingest/", env!("CARGO_PKG_VERSION")).to_string()
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScrapeApiCfg {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub base_url: String,
    /// "ENV" means: read from SCRAPE_API_KEY
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ReaderProxyCfg {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DirectHttpCfg {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DirectHttpCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IngestSettings {
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    #[serde(default = "default_group_width")]
    pub group_width: usize,
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,
    #[serde(default = "default_rate_limited_delay_ms")]
    pub rate_limited_delay_ms: u64,
    /// No batch-wide deadline unless set.
    #[serde(default)]
    pub batch_timeout_secs: Option<u64>,
    #[serde(default)]
    pub scrape_api: Option<ScrapeApiCfg>,
    #[serde(default)]
    pub reader_proxy: Option<ReaderProxyCfg>,
    #[serde(default)]
    pub direct_http: DirectHttpCfg,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            group_width: default_group_width(),
            min_content_chars: default_min_content_chars(),
            provider_timeout_secs: default_provider_timeout_secs(),
            rate_limited_delay_ms: default_rate_limited_delay_ms(),
            batch_timeout_secs: None,
            scrape_api: None,
            reader_proxy: None,
            direct_http: DirectHttpCfg::default(),
        }
    }
}

impl IngestSettings {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn rate_limited_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limited_delay_ms)
    }

    pub fn batch_timeout(&self) -> Option<Duration> {
        self.batch_timeout_secs.map(Duration::from_secs)
    }

    /// Load from an explicit path. Supports TOML or JSON.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading ingest config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = if ext == "json" {
            serde_json::from_str::<IngestSettings>(&content).context("parsing ingest json")?
        } else {
            toml::from_str::<IngestSettings>(&content).context("parsing ingest toml")?
        };
        cfg.finish()
    }

    /// Load using env var + fallbacks:
    /// 1) $INGEST_CONFIG_PATH
    /// 2) config/ingest.toml
    /// 3) config/ingest.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("INGEST_CONFIG_PATH points to non-existent path"));
            }
        }
        let toml_p = PathBuf::from("config/ingest.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/ingest.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Self::default().finish()
    }

    /// Resolve secrets and pull nonsense values back to defaults.
    fn finish(mut self) -> Result<Self> {
        if self.max_batch_size == 0 || self.max_batch_size > default_max_batch_size() {
            self.max_batch_size = default_max_batch_size();
        }
        if self.group_width == 0 {
            self.group_width = default_group_width();
        }
        if self.provider_timeout_secs == 0 {
            self.provider_timeout_secs = default_provider_timeout_secs();
        }
        if self.batch_timeout_secs == Some(0) {
            self.batch_timeout_secs = None;
        }

        if let Some(sa) = self.scrape_api.as_mut() {
            if sa.enabled && sa.api_key.trim().eq_ignore_ascii_case("env") {
                sa.api_key = std::env::var(ENV_SCRAPE_API_KEY)
                    .map_err(|_| anyhow!("Missing {ENV_SCRAPE_API_KEY} env var"))?;
            }
            if sa.enabled && sa.base_url.trim().is_empty() {
                anyhow::bail!("scrape_api.enabled requires base_url");
            }
        }
        if let Some(rp) = self.reader_proxy.as_ref() {
            if rp.enabled && rp.base_url.trim().is_empty() {
                anyhow::bail!("reader_proxy.enabled requires base_url");
            }
        }
        Ok(self)
    }
}

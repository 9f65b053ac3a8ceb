// src/ingest/store.rs
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

use crate::ingest::known::KnownSources;
use crate::ingest::types::{ImportCandidate, RetrievalOutcome, TenantScope};

#[async_trait::async_trait]
pub trait AssetSink: Send + Sync {
    /// Materialize one imported item; returns the new asset id.
    async fn create_record(
        &self,
        candidate: &ImportCandidate,
        outcome: &RetrievalOutcome,
        tenant: &TenantScope,
    ) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub asset_id: String,
    pub source_uri: String,
    pub title: String,
    pub kind: Option<String>,
    pub content: String,
    pub published_at: Option<DateTime<Utc>>,
    pub provider: Option<String>,
}

/// In-process store backing both collaborator traits. Used by the binary and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<TenantScope, Vec<StoredAsset>>>,
    fail_lookups: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_lookups(&self, on: bool) {
        self.fail_lookups.store(on, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    pub fn record_count(&self, tenant: &TenantScope) -> usize {
        let g = self.records.lock().expect("store mutex poisoned");
        g.get(tenant).map_or(0, Vec::len)
    }

    pub fn records(&self, tenant: &TenantScope) -> Vec<StoredAsset> {
        let g = self.records.lock().expect("store mutex poisoned");
        g.get(tenant).cloned().unwrap_or_default()
    }
}

/// First 12 hex chars of SHA-256 over `tenant \0 uri`.
pub fn asset_id_for(tenant: &TenantScope, uri: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(tenant.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(uri.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[async_trait::async_trait]
impl KnownSources for MemoryStore {
    async fn list_known_source_uris(&self, tenant: &TenantScope) -> Result<HashSet<String>> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(anyhow!("asset store unreachable"));
        }
        let g = self.records.lock().expect("store mutex poisoned");
        Ok(g.get(tenant)
            .map(|v| v.iter().map(|a| a.source_uri.clone()).collect())
            .unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl AssetSink for MemoryStore {
    async fn create_record(
        &self,
        candidate: &ImportCandidate,
        outcome: &RetrievalOutcome,
        tenant: &TenantScope,
    ) -> Result<String> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("write rejected by asset store"));
        }
        let asset_id = asset_id_for(tenant, &candidate.source_uri);
        let mut g = self.records.lock().expect("store mutex poisoned");
        let rows = g.entry(tenant.clone()).or_default();
        if rows.iter().any(|a| a.source_uri == candidate.source_uri) {
            return Err(anyhow!("record for {} already exists", candidate.source_uri));
        }
        rows.push(StoredAsset {
            asset_id: asset_id.clone(),
            source_uri: candidate.source_uri.clone(),
            title: candidate.display_title.clone(),
            kind: candidate.suggested_kind.clone(),
            content: outcome.content.clone(),
            published_at: outcome.published_at,
            provider: outcome.provider_used.map(|p| p.to_string()),
        });
        Ok(asset_id)
    }
}

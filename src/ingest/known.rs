// src/ingest/known.rs
use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::Result;

use crate::ingest::types::TenantScope;
use crate::ingest::IngestError;

/// Lookup of source URIs already ingested for a tenant.
#[async_trait::async_trait]
pub trait KnownSources: Send + Sync {
    async fn list_known_source_uris(&self, tenant: &TenantScope) -> Result<HashSet<String>>;
}

/// Read-only snapshot loaded once per batch.
#[derive(Debug, Default)]
pub struct KnownIndex {
    uris: HashSet<String>,
}

impl KnownIndex {
    /// One external read per batch. Failure is systemic: without the index
    /// duplicate-safety cannot be guaranteed.
    pub async fn load(lookup: &dyn KnownSources, tenant: &TenantScope) -> Result<Self, IngestError> {
        let uris = lookup
            .list_known_source_uris(tenant)
            .await
            .map_err(IngestError::KnownIndexUnavailable)?;
        tracing::debug!(target: "ingest", %tenant, known = uris.len(), "loaded existing-record index");
        Ok(Self { uris })
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.uris.contains(uri)
    }
}

/// URIs claimed during the current batch. Shared by concurrent workers.
#[derive(Debug, Default)]
pub struct SeenSet {
    inner: Mutex<HashSet<String>>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic check-and-insert. `false` means someone else already holds the URI.
    pub fn claim(&self, uri: &str) -> bool {
        let mut g = self.inner.lock().expect("seen-set mutex poisoned");
        g.insert(uri.to_string())
    }

    /// Give a claim back, e.g. when persistence failed.
    pub fn release(&self, uri: &str) {
        let mut g = self.inner.lock().expect("seen-set mutex poisoned");
        g.remove(uri);
    }

    pub fn contains(&self, uri: &str) -> bool {
        let g = self.inner.lock().expect("seen-set mutex poisoned");
        g.contains(uri)
    }
}

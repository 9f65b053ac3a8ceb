// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use asset_ingest::ingest::pipeline::PipelineSettings;
use asset_ingest::ingest::providers::{ContentProvider, ProviderChain};
use asset_ingest::ingest::store::MemoryStore;
use asset_ingest::ingest::types::Fetched;
use asset_ingest::{ImportCandidate, Importer};

#[derive(Clone)]
pub enum Reply {
    Text(String),
    Warn(String, &'static str),
    Fail(&'static str),
    /// Never answers; only a timeout gets the chain moving again.
    Hang,
}

pub fn body(n: usize) -> String {
    "a".repeat(n)
}

/// Provider with canned per-URI replies that records how it was called.
pub struct ScriptedProvider {
    name: &'static str,
    rate_limited: bool,
    default: Reply,
    per_uri: HashMap<String, Reply>,
    latency: Duration,
    pub calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(name: &'static str, default: Reply) -> Self {
        Self {
            name,
            rate_limited: false,
            default,
            per_uri: HashMap::new(),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn rate_limited(mut self) -> Self {
        self.rate_limited = true;
        self
    }

    pub fn latency(mut self, d: Duration) -> Self {
        self.latency = d;
        self
    }

    pub fn on(mut self, uri: &str, reply: Reply) -> Self {
        self.per_uri.insert(uri.to_string(), reply);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, uri: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == uri).count()
    }

    pub fn peak(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentProvider for ScriptedProvider {
    async fn retrieve(&self, uri: &str, _timeout: Duration) -> Result<Fetched> {
        self.calls.lock().unwrap().push(uri.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let reply = self.per_uri.get(uri).cloned().unwrap_or_else(|| self.default.clone());
        if matches!(reply, Reply::Hang) {
            std::future::pending::<()>().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            Reply::Text(s) => Ok(Fetched::text(s)),
            Reply::Warn(s, w) => Ok(Fetched {
                content: s,
                published_at: None,
                warning: Some(w.to_string()),
            }),
            Reply::Fail(e) => Err(anyhow!(e)),
            Reply::Hang => unreachable!(),
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn is_rate_limited(&self) -> bool {
        self.rate_limited
    }
}

pub fn chain(providers: &[Arc<ScriptedProvider>]) -> ProviderChain {
    ProviderChain::new(
        providers
            .iter()
            .map(|p| p.clone() as Arc<dyn ContentProvider>)
            .collect(),
        Duration::from_secs(10),
    )
}

pub fn importer(providers: &[Arc<ScriptedProvider>], store: &Arc<MemoryStore>) -> Importer {
    Importer::new(chain(providers), store.clone(), store.clone()).with_settings(PipelineSettings {
        rate_limited_delay: Duration::from_secs(7),
        ..PipelineSettings::default()
    })
}

pub fn live(uri: &str) -> ImportCandidate {
    ImportCandidate::new(uri, uri)
}

pub fn prefetched(uri: &str, chars: usize) -> ImportCandidate {
    ImportCandidate::new(uri, uri).with_content(body(chars))
}

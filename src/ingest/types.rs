// src/ingest/types.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::ingest::orchestrator::ExecutionMode;

/// One item submitted for ingestion. `source_uri` is the identity key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportCandidate {
    pub source_uri: String,
    #[serde(default)]
    pub display_title: String,
    #[serde(default)]
    pub suggested_kind: Option<String>,
    #[serde(default)]
    pub pre_fetched_content: Option<String>,
    #[serde(default)]
    pub pre_fetched_published_at: Option<DateTime<Utc>>,
}

impl ImportCandidate {
    pub fn new(source_uri: impl Into<String>, display_title: impl Into<String>) -> Self {
        Self {
            source_uri: source_uri.into(),
            display_title: display_title.into(),
            suggested_kind: None,
            pre_fetched_content: None,
            pre_fetched_published_at: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.pre_fetched_content = Some(content.into());
        self
    }
}

/// Account boundary for duplicate lookup and persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TenantScope(pub String);

impl TenantScope {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    pub allow_live_retrieval: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            allow_live_retrieval: true,
        }
    }
}

/// Which link of the chain produced the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderUsed {
    Primary,
    /// 1-based position after the primary.
    Fallback(usize),
    PreSupplied,
}

impl ProviderUsed {
    pub fn from_chain_index(idx: usize) -> Self {
        if idx == 0 {
            ProviderUsed::Primary
        } else {
            ProviderUsed::Fallback(idx)
        }
    }
}

impl fmt::Display for ProviderUsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderUsed::Primary => f.write_str("primary"),
            ProviderUsed::Fallback(n) => write!(f, "fallback-{n}"),
            ProviderUsed::PreSupplied => f.write_str("pre-supplied"),
        }
    }
}

impl Serialize for ProviderUsed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// What a single provider hands back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fetched {
    pub content: String,
    pub published_at: Option<DateTime<Utc>>,
    pub warning: Option<String>,
}

impl Fetched {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Result of running one candidate through the chain (or its pre-fetched content).
/// Either `content` is non-empty or `error` is set, never both empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalOutcome {
    pub content: String,
    pub published_at: Option<DateTime<Utc>>,
    pub provider_used: Option<ProviderUsed>,
    pub warning: Option<String>,
    pub error: Option<String>,
}

impl RetrievalOutcome {
    pub fn fetched(fetched: Fetched, provider: ProviderUsed) -> Self {
        Self {
            content: fetched.content,
            published_at: fetched.published_at,
            provider_used: Some(provider),
            warning: fetched.warning,
            error: None,
        }
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            published_at: None,
            provider_used: None,
            warning: None,
            error: Some(msg.into()),
        }
    }

    pub fn errored(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Imported,
    SkippedDuplicateInBatch,
    SkippedAlreadyImported,
    Failed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Imported => "imported",
            ItemStatus::SkippedDuplicateInBatch => "skipped_duplicate_in_batch",
            ItemStatus::SkippedAlreadyImported => "skipped_already_imported",
            ItemStatus::Failed => "failed",
        }
    }
}

/// Final classification of one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemResult {
    #[serde(rename_all = "camelCase")]
    Imported {
        source_uri: String,
        asset_id: String,
        provider: ProviderUsed,
        #[serde(skip_serializing_if = "Option::is_none")]
        warning: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SkippedDuplicateInBatch { source_uri: String },
    #[serde(rename_all = "camelCase")]
    SkippedAlreadyImported { source_uri: String },
    #[serde(rename_all = "camelCase")]
    Failed { source_uri: String, detail: String },
}

impl ItemResult {
    pub fn status(&self) -> ItemStatus {
        match self {
            ItemResult::Imported { .. } => ItemStatus::Imported,
            ItemResult::SkippedDuplicateInBatch { .. } => ItemStatus::SkippedDuplicateInBatch,
            ItemResult::SkippedAlreadyImported { .. } => ItemStatus::SkippedAlreadyImported,
            ItemResult::Failed { .. } => ItemStatus::Failed,
        }
    }

    pub fn source_uri(&self) -> &str {
        match self {
            ItemResult::Imported { source_uri, .. }
            | ItemResult::SkippedDuplicateInBatch { source_uri }
            | ItemResult::SkippedAlreadyImported { source_uri }
            | ItemResult::Failed { source_uri, .. } => source_uri,
        }
    }

    /// Warning or error message, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ItemResult::Imported { warning, .. } => warning.as_deref(),
            ItemResult::Failed { detail, .. } => Some(detail),
            _ => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            ItemResult::SkippedDuplicateInBatch { .. } | ItemResult::SkippedAlreadyImported { .. }
        )
    }
}

/// Batch-level report. All counts are derived from `items`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub items: Vec<ItemResult>,
    pub mode: ExecutionMode,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn succeeded(&self) -> usize {
        self.count(ItemStatus::Imported)
    }

    pub fn failed(&self) -> usize {
        self.count(ItemStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.items.iter().filter(|r| r.is_skipped()).count()
    }

    pub fn succeeded_with_warning(&self) -> usize {
        self.items
            .iter()
            .filter(|r| matches!(r, ItemResult::Imported { warning: Some(_), .. }))
            .count()
    }

    pub fn count(&self, status: ItemStatus) -> usize {
        self.items.iter().filter(|r| r.status() == status).count()
    }

    pub fn find(&self, uri: &str) -> Vec<&ItemResult> {
        self.items.iter().filter(|r| r.source_uri() == uri).collect()
    }
}

impl Serialize for BatchReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Wire<'a> {
            total: usize,
            succeeded: usize,
            failed: usize,
            skipped: usize,
            succeeded_with_warning: usize,
            mode: &'a ExecutionMode,
            items: &'a [ItemResult],
        }

        Wire {
            total: self.total(),
            succeeded: self.succeeded(),
            failed: self.failed(),
            skipped: self.skipped(),
            succeeded_with_warning: self.succeeded_with_warning(),
            mode: &self.mode,
            items: &self.items,
        }
        .serialize(serializer)
    }
}

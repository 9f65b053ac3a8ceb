// src/ingest/normalize.rs
use std::collections::HashSet;

use once_cell::sync::OnceCell;
use url::Url;

use crate::ingest::types::{ImportCandidate, ItemResult};
use crate::ingest::IngestError;

/// Candidates that survived validation plus the results already decided
/// (invalid URIs, in-batch duplicates), both in input order and tagged with
/// their input position.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub accepted: Vec<(usize, ImportCandidate)>,
    pub rejected: Vec<(usize, ItemResult)>,
}

/// Validate and de-duplicate a raw batch. Pure; only batch-size violations are fatal.
pub fn normalize_batch(
    raw: Vec<ImportCandidate>,
    max_batch: usize,
) -> Result<NormalizedBatch, IngestError> {
    if raw.is_empty() {
        return Err(IngestError::EmptyBatch);
    }
    if raw.len() > max_batch {
        return Err(IngestError::BatchTooLarge {
            len: raw.len(),
            max: max_batch,
        });
    }

    let mut out = NormalizedBatch {
        accepted: Vec::with_capacity(raw.len()),
        rejected: Vec::new(),
    };
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());

    for (idx, mut cand) in raw.into_iter().enumerate() {
        let trimmed = cand.source_uri.trim();
        if let Err(reason) = check_uri(trimmed) {
            out.rejected.push((
                idx,
                ItemResult::Failed {
                    source_uri: cand.source_uri.clone(),
                    detail: format!("invalid source URI: {reason}"),
                },
            ));
            continue;
        }
        if trimmed.len() != cand.source_uri.len() {
            cand.source_uri = trimmed.to_string();
        }

        if !seen.insert(cand.source_uri.clone()) {
            out.rejected.push((
                idx,
                ItemResult::SkippedDuplicateInBatch {
                    source_uri: cand.source_uri,
                },
            ));
            continue;
        }
        out.accepted.push((idx, cand));
    }

    Ok(out)
}

/// Absolute http(s) URL with a host.
fn check_uri(s: &str) -> Result<(), String> {
    if s.is_empty() {
        return Err("empty".to_string());
    }
    let url = Url::parse(s).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("missing host".to_string());
    }
    Ok(())
}

/// Normalize extracted page text: strip tags, decode entities, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) Strip HTML tags (space, so adjacent blocks don't glue together)
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    let out = re_tags.replace_all(s, " ");

    // 2) HTML entity decode
    let mut out = html_escape::decode_html_entities(&out).to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("ws regex"));
    re_ws.replace_all(&out, " ").trim().to_string()
}

// src/ingest/validate.rs
use crate::ingest::types::RetrievalOutcome;

/// Default minimum content length, in characters.
pub const DEFAULT_MIN_CONTENT_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    /// Imported, but the caller should review it.
    PassWithWarning(String),
    Fail(String),
}

#[derive(Debug, Clone, Copy)]
pub struct ContentValidator {
    min_chars: usize,
}

impl Default for ContentValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CONTENT_CHARS)
    }
}

impl ContentValidator {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    /// Whether a piece of text clears the length bar on its own.
    pub fn long_enough(&self, text: &str) -> bool {
        text.trim().chars().count() >= self.min_chars
    }

    pub fn check(&self, outcome: &RetrievalOutcome) -> Verdict {
        if let Some(err) = &outcome.error {
            return Verdict::Fail(err.clone());
        }
        let n = outcome.content.trim().chars().count();
        if n < self.min_chars {
            return Verdict::Fail(format!(
                "content too short: {n} < {} characters",
                self.min_chars
            ));
        }
        match outcome.warning.as_deref().map(str::trim) {
            Some(w) if !w.is_empty() => Verdict::PassWithWarning(w.to_string()),
            _ => Verdict::Pass,
        }
    }
}

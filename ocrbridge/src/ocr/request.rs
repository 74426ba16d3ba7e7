use std::num::NonZeroU32;

use crate::error::{BridgeError, Result};

pub const DEFAULT_LANGUAGE: &str = "en";

/// DPI the engine rasterizes PDF pages at when no override is given.
pub const ENGINE_DEFAULT_DPI: u32 = 300;

/// How the engine's stdout has to be interpreted for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Human-readable text, returned trimmed.
    PlainText,
    /// One file's JSON report; falls back to raw text if unparseable.
    Structured,
    /// Aggregate JSON report for several files; no fallback.
    Batch,
}

/// A logical "extract text from these files" request.
///
/// Batch mode is not a field: it follows from the number of paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    paths: Vec<String>,
    languages: Vec<String>,
    detail: bool,
    dpi: Option<NonZeroU32>,
}

impl ExtractionRequest {
    pub fn new<I, S>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            return Err(BridgeError::Validation(
                "At least one input path is required".to_string(),
            ));
        }

        Ok(Self {
            paths,
            languages: vec![DEFAULT_LANGUAGE.to_string()],
            detail: false,
            dpi: None,
        })
    }

    pub fn single(path: impl Into<String>) -> Self {
        Self {
            paths: vec![path.into()],
            languages: vec![DEFAULT_LANGUAGE.to_string()],
            detail: false,
            dpi: None,
        }
    }

    /// Replace the language set. Duplicates are dropped (first one wins) and
    /// an empty list restores the default.
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for lang in languages {
            let lang: String = lang.into();
            let lang = lang.trim();
            if !lang.is_empty() && !unique.iter().any(|l| l == lang) {
                unique.push(lang.to_string());
            }
        }
        if unique.is_empty() {
            unique.push(DEFAULT_LANGUAGE.to_string());
        }
        self.languages = unique;
        self
    }

    pub fn with_detail(mut self, detail: bool) -> Self {
        self.detail = detail;
        self
    }

    pub fn with_dpi(mut self, dpi: Option<NonZeroU32>) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn detail(&self) -> bool {
        self.detail
    }

    pub fn dpi(&self) -> Option<NonZeroU32> {
        self.dpi
    }

    pub fn effective_dpi(&self) -> u32 {
        self.dpi.map_or(ENGINE_DEFAULT_DPI, NonZeroU32::get)
    }

    pub fn is_batch(&self) -> bool {
        self.paths.len() > 1
    }

    /// Structured output is wanted for detail requests and for every batch.
    pub fn wants_structured(&self) -> bool {
        self.detail || self.is_batch()
    }

    pub fn mode(&self) -> RequestMode {
        if self.is_batch() {
            RequestMode::Batch
        } else if self.detail {
            RequestMode::Structured
        } else {
            RequestMode::PlainText
        }
    }
}

/// Parse a user-supplied DPI value; zero is rejected.
pub fn parse_dpi(value: u32) -> Result<NonZeroU32> {
    NonZeroU32::new(value)
        .ok_or_else(|| BridgeError::Validation("DPI must be a positive integer".to_string()))
}

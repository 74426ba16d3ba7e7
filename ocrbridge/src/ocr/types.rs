//! OCR Types
//!
//! Raw process outcomes and the typed extraction results decoded from them.

use serde::{Deserialize, Serialize};

/// Terminal result of one engine invocation, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Exit status 0.
    Completed { stdout: Vec<u8>, stderr: Vec<u8> },
    /// Nonzero exit status, or `None` when the child was killed by a signal.
    Failed {
        exit_code: Option<i32>,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
    /// The child could not be started.
    SpawnError { cause: String },
    /// The caller's cancellation token fired; the child was killed.
    Cancelled,
    /// The child started but its pipes or its exit status could not be read.
    IoError { cause: String },
}

impl ProcessOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessOutcome::Completed { .. })
    }
}

/// One recognized text region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    pub confidence: f64,
    /// Corner points as `[x, y]` pixel coordinates.
    #[serde(default)]
    pub bbox: Vec<[i64; 2]>,
}

/// Per-page detail for rasterized multi-page inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub page: u32,
    #[serde(default)]
    pub text_blocks: Vec<TextBlock>,
    #[serde(default)]
    pub page_text: String,
}

/// Text and optional detail for a file the engine processed successfully.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognizedFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default)]
    pub full_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text_blocks: Vec<TextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<PageResult>,
}

impl RecognizedFile {
    /// Every text block, whether reported flat or per page.
    pub fn blocks(&self) -> impl Iterator<Item = &TextBlock> {
        self.text_blocks
            .iter()
            .chain(self.pages.iter().flat_map(|p| p.text_blocks.iter()))
    }

    pub fn mean_confidence(&self) -> Option<f64> {
        let (sum, count) = self
            .blocks()
            .fold((0.0, 0usize), |(sum, count), b| (sum + b.confidence, count + 1));
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }
}

/// A file the engine could not process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: String,
    pub reason: String,
}

/// A single file's structured report, exactly as the engine classified it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status")]
pub enum FileReport {
    #[serde(rename = "success")]
    Recognized(RecognizedFile),
    #[serde(rename = "error")]
    Rejected(FileFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub total_files: usize,
    pub succeeded: Vec<RecognizedFile>,
    pub failed: Vec<FileFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionResult {
    /// Plain-text mode output.
    Text { text: String },
    /// A structured request whose output could not be parsed; the raw text
    /// stands in for the detailed report.
    RawFallback { text: String },
    Detailed { report: FileReport },
    Batch(BatchResult),
}

impl ExtractionResult {
    pub fn text(&self) -> String {
        match self {
            ExtractionResult::Text { text } | ExtractionResult::RawFallback { text } => {
                text.clone()
            }
            ExtractionResult::Detailed { report } => match report {
                FileReport::Recognized(file) => file.full_text.clone(),
                FileReport::Rejected(_) => String::new(),
            },
            ExtractionResult::Batch(batch) => batch
                .succeeded
                .iter()
                .map(|f| f.full_text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ExtractionResult::RawFallback { .. })
    }
}

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{ProcessError, ProcessErrorKind, Result};

use super::decoder::decode;
use super::invocation::{Engine, Invocation};
use super::request::ExtractionRequest;
use super::runner::{ProcessRunner, TokioProcessRunner};
use super::types::{
    BatchResult, ExtractionResult, FileReport, ProcessOutcome, RecognizedFile,
};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Entry point for text extraction: build the invocation, run it, decode it.
///
/// Holds no per-call state; concurrent calls each get their own child process.
#[derive(Clone)]
pub struct OcrService {
    engine: Engine,
    runner: Arc<dyn ProcessRunner>,
    timeout: Option<Duration>,
}

impl OcrService {
    pub fn new(engine: Engine, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            engine,
            runner,
            timeout: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            Engine::from_config(config),
            Arc::new(TokioProcessRunner::new()),
        )
        .with_timeout(config.timeout())
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub async fn extract(
        &self,
        request: &ExtractionRequest,
        cancel: &CancellationToken,
    ) -> Result<ExtractionResult> {
        let invocation = self.engine.build(request);
        info!(
            files = request.paths().len(),
            mode = ?request.mode(),
            languages = ?request.languages(),
            "Running OCR engine"
        );
        debug!(%invocation, "OCR invocation");

        let outcome = self.run_bounded(&invocation, cancel).await?;
        let result = decode(outcome, request);
        if let Err(e) = &result {
            warn!(error = %e, "OCR extraction failed");
        }
        result
    }

    /// Plain text for one file.
    pub async fn quick_extract(&self, path: &str, languages: &[String]) -> Result<String> {
        let request = ExtractionRequest::single(path).with_languages(languages.iter().cloned());
        let result = self.extract(&request, &CancellationToken::new()).await?;
        Ok(result.text())
    }

    /// Confidence scores and bounding boxes for one file.
    pub async fn detailed_extract(
        &self,
        path: &str,
        languages: &[String],
    ) -> Result<ExtractionResult> {
        let request = ExtractionRequest::single(path)
            .with_languages(languages.iter().cloned())
            .with_detail(true);
        self.extract(&request, &CancellationToken::new()).await
    }

    /// Plain text for a PDF rasterized at `dpi`.
    pub async fn extract_from_pdf(
        &self,
        path: &str,
        dpi: NonZeroU32,
        languages: &[String],
    ) -> Result<String> {
        let request = ExtractionRequest::single(path)
            .with_languages(languages.iter().cloned())
            .with_dpi(Some(dpi));
        let result = self.extract(&request, &CancellationToken::new()).await?;
        Ok(result.text())
    }

    /// Per-file success/failure breakdown. A single path is run as a detail
    /// request and reported in the same shape.
    pub async fn extract_batch(
        &self,
        paths: &[String],
        languages: &[String],
        detail: bool,
        dpi: Option<NonZeroU32>,
    ) -> Result<BatchResult> {
        let request = ExtractionRequest::new(paths.iter().cloned())?
            .with_languages(languages.iter().cloned())
            .with_detail(detail || paths.len() == 1)
            .with_dpi(dpi);
        let result = self.extract(&request, &CancellationToken::new()).await?;
        Ok(into_batch(result))
    }

    /// Whether the engine can be started and answers `--help` successfully.
    pub async fn probe(&self) -> bool {
        let invocation = self.engine.help();
        let cancel = CancellationToken::new();
        let run = self.runner.run(&invocation, &cancel);
        match tokio::time::timeout(PROBE_TIMEOUT, run).await {
            Ok(outcome) => outcome.is_success(),
            Err(_) => false,
        }
    }

    async fn run_bounded(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutcome> {
        let Some(limit) = self.timeout else {
            return Ok(self.runner.run(invocation, cancel).await);
        };

        // Dropping the run future on expiry drops the child, which kills it.
        match tokio::time::timeout(limit, self.runner.run(invocation, cancel)).await {
            Ok(outcome) => Ok(outcome),
            Err(_) => Err(ProcessError::new(
                ProcessErrorKind::TimedOut,
                format!(
                    "OCR operation timed out after {} seconds",
                    limit.as_secs()
                ),
            )
            .into()),
        }
    }
}

fn into_batch(result: ExtractionResult) -> BatchResult {
    match result {
        ExtractionResult::Batch(batch) => batch,
        ExtractionResult::Detailed {
            report: FileReport::Recognized(file),
        } => BatchResult {
            total_files: 1,
            succeeded: vec![file],
            failed: Vec::new(),
        },
        ExtractionResult::Detailed {
            report: FileReport::Rejected(failure),
        } => BatchResult {
            total_files: 1,
            succeeded: Vec::new(),
            failed: vec![failure],
        },
        ExtractionResult::Text { text } | ExtractionResult::RawFallback { text } => BatchResult {
            total_files: 1,
            succeeded: vec![RecognizedFile {
                full_text: text,
                ..Default::default()
            }],
            failed: Vec::new(),
        },
    }
}

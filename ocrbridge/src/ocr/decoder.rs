//! Result Decoder
//!
//! Turns a [`ProcessOutcome`] into an [`ExtractionResult`] according to the
//! request's [`RequestMode`]. Single-file structured requests fall back to
//! raw text when the engine's JSON cannot be parsed; batch requests do not.

use serde::Deserialize;
use tracing::warn;

use crate::error::{DecodeError, ProcessError, ProcessErrorKind, Result};

use super::request::{ExtractionRequest, RequestMode};
use super::types::{
    BatchResult, ExtractionResult, FileFailure, FileReport, PageResult, ProcessOutcome,
    RecognizedFile, TextBlock,
};

const DEFAULT_FAILURE_REASON: &str = "Processing failed";

/// One file's report as the engine prints it.
#[derive(Debug, Deserialize)]
struct WireFileReport {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default, alias = "text")]
    full_text: Option<String>,
    #[serde(default)]
    text_blocks: Vec<TextBlock>,
    #[serde(default)]
    total_pages: Option<u32>,
    #[serde(default)]
    pages: Vec<PageResult>,
}

#[derive(Debug, Deserialize)]
struct WireBatch {
    #[serde(default)]
    total_files: Option<usize>,
    files: Vec<WireFileReport>,
}

impl WireFileReport {
    fn is_error(&self) -> bool {
        match self.status.as_deref() {
            Some(status) => status.eq_ignore_ascii_case("error"),
            None => self.error.is_some(),
        }
    }

    /// `fallback_path` names the input when the engine did not.
    fn into_report(self, fallback_path: Option<&str>) -> FileReport {
        if self.is_error() {
            let path = self
                .file
                .or_else(|| fallback_path.map(str::to_string))
                .unwrap_or_default();
            return FileReport::Rejected(FileFailure {
                path,
                reason: self
                    .error
                    .unwrap_or_else(|| DEFAULT_FAILURE_REASON.to_string()),
            });
        }

        let full_text = match self.full_text {
            Some(text) => text,
            None if !self.pages.is_empty() => self
                .pages
                .iter()
                .map(|p| p.page_text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            None => self
                .text_blocks
                .iter()
                .map(|b| b.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        };

        FileReport::Recognized(RecognizedFile {
            file: self.file.or_else(|| fallback_path.map(str::to_string)),
            full_text,
            text_blocks: self.text_blocks,
            total_pages: self.total_pages,
            pages: self.pages,
        })
    }
}

impl WireBatch {
    fn into_result(self, paths: &[String]) -> BatchResult {
        // Entries map to inputs by position only when the counts agree.
        let positional = self.files.len() == paths.len();
        let total_files = self.total_files.unwrap_or(paths.len());

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for (index, wire) in self.files.into_iter().enumerate() {
            let input = paths.get(index).map(String::as_str);
            match wire.into_report(input) {
                FileReport::Recognized(file) => succeeded.push(file),
                FileReport::Rejected(mut failure) => {
                    if positional {
                        if let Some(input) = input {
                            failure.path = input.to_string();
                        }
                    }
                    failed.push(failure);
                }
            }
        }

        BatchResult {
            total_files,
            succeeded,
            failed,
        }
    }
}

/// Interpret one engine run for the request that produced it.
pub fn decode(outcome: ProcessOutcome, request: &ExtractionRequest) -> Result<ExtractionResult> {
    match outcome {
        ProcessOutcome::SpawnError { cause } => {
            Err(ProcessError::new(ProcessErrorKind::SpawnFailure, cause).into())
        }
        ProcessOutcome::Failed {
            exit_code, stderr, ..
        } => Err(ProcessError::new(
            ProcessErrorKind::NonZeroExit,
            failure_message(exit_code, &stderr),
        )
        .into()),
        ProcessOutcome::Cancelled => Err(ProcessError::new(
            ProcessErrorKind::Cancelled,
            "OCR process was cancelled",
        )
        .into()),
        ProcessOutcome::IoError { cause } => {
            Err(ProcessError::new(ProcessErrorKind::Io, cause).into())
        }
        ProcessOutcome::Completed { stdout, .. } => decode_stdout(&stdout, request),
    }
}

fn decode_stdout(stdout: &[u8], request: &ExtractionRequest) -> Result<ExtractionResult> {
    let raw = String::from_utf8_lossy(stdout);

    match request.mode() {
        RequestMode::PlainText => Ok(ExtractionResult::Text {
            text: raw.trim_end().to_string(),
        }),
        RequestMode::Structured => match serde_json::from_str::<WireFileReport>(&raw) {
            Ok(wire) => Ok(ExtractionResult::Detailed {
                report: wire.into_report(request.paths().first().map(String::as_str)),
            }),
            Err(e) => {
                warn!(
                    error = %e,
                    stdout_bytes = stdout.len(),
                    "Engine output is not a structured report, returning raw text"
                );
                Ok(ExtractionResult::RawFallback {
                    text: raw.trim_end().to_string(),
                })
            }
        },
        RequestMode::Batch => {
            let batch: WireBatch =
                serde_json::from_str(&raw).map_err(DecodeError::batch_parse_failure)?;
            Ok(ExtractionResult::Batch(batch.into_result(request.paths())))
        }
    }
}

/// Prefer the engine's own diagnostic; fall back to the exit status.
fn failure_message(exit_code: Option<i32>, stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    match exit_code {
        Some(code) => format!("OCR process exited with code {code}"),
        None => "OCR process was terminated by a signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BridgeError, DecodeErrorKind};
    use pretty_assertions::assert_eq;

    fn completed(stdout: &str) -> ProcessOutcome {
        ProcessOutcome::Completed {
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
        }
    }

    fn plain() -> ExtractionRequest {
        ExtractionRequest::single("/tmp/upload_scan.png")
    }

    fn detailed() -> ExtractionRequest {
        plain().with_detail(true)
    }

    fn batch() -> ExtractionRequest {
        ExtractionRequest::new(["/tmp/a.png", "/tmp/b.pdf", "/tmp/c.gif"]).unwrap()
    }

    fn expect_process_error(result: Result<ExtractionResult>) -> ProcessError {
        match result {
            Err(BridgeError::Process(e)) => e,
            other => panic!("expected process error, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_text_is_trimmed() {
        let result = decode(completed("Hello World\n"), &plain()).unwrap();
        assert_eq!(
            result,
            ExtractionResult::Text {
                text: "Hello World".to_string()
            }
        );
    }

    #[test]
    fn test_plain_text_is_not_parsed() {
        let result = decode(completed("{\"full_text\": \"x\"}\n"), &plain()).unwrap();
        assert_eq!(result.text(), "{\"full_text\": \"x\"}");
    }

    #[test]
    fn test_nonzero_exit_uses_stderr() {
        let outcome = ProcessOutcome::Failed {
            exit_code: Some(2),
            stdout: Vec::new(),
            stderr: b"unsupported format\n".to_vec(),
        };
        let err = expect_process_error(decode(outcome, &plain()));
        assert_eq!(
            err,
            ProcessError::new(ProcessErrorKind::NonZeroExit, "unsupported format")
        );
    }

    #[test]
    fn test_nonzero_exit_without_stderr_reports_code() {
        let outcome = ProcessOutcome::Failed {
            exit_code: Some(3),
            stdout: b"partial".to_vec(),
            stderr: b"  \n".to_vec(),
        };
        let err = expect_process_error(decode(outcome, &plain()));
        assert_eq!(err.message, "OCR process exited with code 3");
    }

    #[test]
    fn test_signal_termination_message() {
        let outcome = ProcessOutcome::Failed {
            exit_code: None,
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        let err = expect_process_error(decode(outcome, &plain()));
        assert_eq!(err.kind, ProcessErrorKind::NonZeroExit);
        assert!(err.message.contains("signal"));
    }

    #[test]
    fn test_spawn_error_skips_parsing() {
        let outcome = ProcessOutcome::SpawnError {
            cause: "Failed to start OCR process: 'python' was not found".to_string(),
        };
        let err = expect_process_error(decode(outcome, &batch()));
        assert_eq!(err.kind, ProcessErrorKind::SpawnFailure);
        assert!(err.message.contains("not found"));
    }

    #[test]
    fn test_cancelled_and_io_map_to_process_errors() {
        let err = expect_process_error(decode(ProcessOutcome::Cancelled, &plain()));
        assert_eq!(err.kind, ProcessErrorKind::Cancelled);

        let err = expect_process_error(decode(
            ProcessOutcome::IoError {
                cause: "broken pipe".into(),
            },
            &plain(),
        ));
        assert_eq!(err.kind, ProcessErrorKind::Io);
    }

    #[test]
    fn test_detailed_image_report() {
        let stdout = r#"{
            "status": "success",
            "file": "upload_scan.png",
            "text_blocks": [
                {"text": "Hello", "confidence": 0.98, "bbox": [[1, 2], [30, 2], [30, 12], [1, 12]]},
                {"text": "World", "confidence": 0.91, "bbox": [[1, 20], [30, 20], [30, 30], [1, 30]]}
            ],
            "full_text": "Hello\nWorld"
        }"#;
        let result = decode(completed(stdout), &detailed()).unwrap();

        let ExtractionResult::Detailed {
            report: FileReport::Recognized(file),
        } = result
        else {
            panic!("expected recognized report");
        };
        assert_eq!(file.file.as_deref(), Some("upload_scan.png"));
        assert_eq!(file.full_text, "Hello\nWorld");
        assert_eq!(file.text_blocks.len(), 2);
        assert_eq!(file.text_blocks[0].bbox[2], [30, 12]);
    }

    #[test]
    fn test_detailed_pdf_report_without_full_text_joins_pages() {
        let stdout = r#"{
            "status": "success",
            "file": "doc.pdf",
            "total_pages": 2,
            "pages": [
                {"page": 1, "text_blocks": [], "page_text": "first"},
                {"page": 2, "text_blocks": [], "page_text": "second"}
            ]
        }"#;
        let result = decode(completed(stdout), &detailed()).unwrap();
        assert_eq!(result.text(), "first\nsecond");
    }

    #[test]
    fn test_in_band_error_is_returned_as_rejected() {
        let stdout = r#"{"status": "error", "error": "Unsupported file type: .txt"}"#;
        let result = decode(completed(stdout), &detailed()).unwrap();
        assert_eq!(
            result,
            ExtractionResult::Detailed {
                report: FileReport::Rejected(FileFailure {
                    path: "/tmp/upload_scan.png".to_string(),
                    reason: "Unsupported file type: .txt".to_string(),
                })
            }
        );
    }

    #[test]
    fn test_structured_parse_failure_falls_back_to_raw_text() {
        let stdout = "Traceback? no, just text\nsecond line\n\n";
        let result = decode(completed(stdout), &detailed()).unwrap();
        assert_eq!(
            result,
            ExtractionResult::RawFallback {
                text: "Traceback? no, just text\nsecond line".to_string()
            }
        );
        assert!(result.is_fallback());
    }

    #[test]
    fn test_structured_fallback_never_errors() {
        for stdout in ["", "null", "[1, 2]", "\"quoted\"", "{not json", "42"] {
            let result = decode(completed(stdout), &detailed());
            assert!(
                matches!(result, Ok(ExtractionResult::RawFallback { .. })),
                "stdout {stdout:?} gave {result:?}"
            );
        }
    }

    #[test]
    fn test_batch_partitions_successes_and_failures() {
        let stdout = r#"{
            "total_files": 3,
            "processed": 2,
            "failed": 1,
            "files": [
                {"status": "success", "file": "a.png", "text_blocks": [], "full_text": "alpha"},
                {"status": "success", "file": "b.pdf", "total_pages": 1, "pages": [], "full_text": "beta"},
                {"status": "error", "file": "c.gif", "error": "cannot identify image file"}
            ]
        }"#;
        let result = decode(completed(stdout), &batch()).unwrap();

        let ExtractionResult::Batch(batch) = result else {
            panic!("expected batch result");
        };
        assert_eq!(batch.total_files, 3);
        assert_eq!(batch.succeeded.len(), 2);
        assert_eq!(batch.failed.len(), 1);
        assert_eq!(
            batch.failed[0],
            FileFailure {
                path: "/tmp/c.gif".to_string(),
                reason: "cannot identify image file".to_string(),
            }
        );
    }

    #[test]
    fn test_batch_failure_without_file_name_uses_input_path() {
        let stdout = r#"{
            "files": [
                {"status": "error", "error": "File does not exist: /tmp/a.png"},
                {"status": "success", "full_text": "b"},
                {"status": "success", "full_text": "c"}
            ]
        }"#;
        let ExtractionResult::Batch(batch) = decode(completed(stdout), &batch()).unwrap() else {
            panic!("expected batch result");
        };
        assert_eq!(batch.total_files, 3);
        assert_eq!(batch.failed[0].path, "/tmp/a.png");
    }

    #[test]
    fn test_batch_success_without_file_name_uses_input_path() {
        let stdout = r#"{
            "files": [
                {"status": "success", "full_text": "a"},
                {"status": "error", "error": "Corrupt image"},
                {"status": "success", "file": "named.png", "full_text": "c"}
            ]
        }"#;
        let ExtractionResult::Batch(batch) = decode(completed(stdout), &batch()).unwrap() else {
            panic!("expected batch result");
        };
        let files: Vec<_> = batch.succeeded.iter().map(|f| f.file.as_deref()).collect();
        assert_eq!(files, vec![Some("/tmp/a.png"), Some("named.png")]);
        assert_eq!(batch.failed[0].path, "/tmp/b.pdf");
    }

    #[test]
    fn test_batch_parse_failure_is_strict() {
        for stdout in ["alpha\nbeta\n", "", "{\"total_files\": 3}", "[]"] {
            match decode(completed(stdout), &batch()) {
                Err(BridgeError::Decode(e)) => {
                    assert_eq!(e.kind, DecodeErrorKind::BatchParseFailure)
                }
                other => panic!("stdout {stdout:?} gave {other:?}"),
            }
        }
    }

    #[test]
    fn test_json_text_payload_alias() {
        let result = decode(completed(r#"{"text": "from --json"}"#), &detailed()).unwrap();
        assert_eq!(result.text(), "from --json");
        assert!(!result.is_fallback());
    }
}

use std::collections::HashMap;
use std::path::Path;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::api::dto::{ProcessData, QuickData};
use crate::api::response::ApiResponse;
use crate::api::state::AppState;
use crate::error::Result;
use crate::ocr::{ExtractionRequest, ExtractionResult, FileReport, RecognizedFile};

pub const ALLOWED_EXTENSIONS: &[&str] =
    &["png", "jpg", "jpeg", "gif", "bmp", "tiff", "webp", "pdf"];

const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Lowercased extension of `file_name` when it is one the engine accepts.
fn allowed_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Parse a form boolean with common truthy/falsy spellings.
fn parse_form_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// An upload written to a temporary file, removed when dropped.
struct StagedUpload {
    original_name: String,
    file: NamedTempFile,
}

impl StagedUpload {
    fn path(&self) -> String {
        self.file.path().to_string_lossy().into_owned()
    }

    /// The engine reports inputs by basename.
    fn staged_name(&self) -> Option<String> {
        self.file
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

#[derive(Default)]
struct UploadForm {
    uploads: Vec<StagedUpload>,
    /// File parts seen under the file field, accepted or not.
    received_files: usize,
    fields: HashMap<String, String>,
}

/// Keeps the extension so the engine can dispatch on it.
async fn stage(bytes: &[u8], ext: &str) -> Result<NamedTempFile> {
    let file = tempfile::Builder::new()
        .prefix("ocrbridge-")
        .suffix(&format!(".{ext}"))
        .tempfile()?;
    tokio::fs::write(file.path(), bytes).await?;
    Ok(file)
}

fn multipart_rejection<T: Serialize>(err: MultipartError, max_bytes: usize) -> ApiResponse<T> {
    let status = err.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiResponse::error(
            status,
            format!(
                "File too large. Maximum size is {}MB.",
                max_bytes / (1024 * 1024)
            ),
        );
    }
    ApiResponse::error(status, format!("Invalid multipart body: {}", err.body_text()))
}

async fn read_form<T: Serialize>(
    multipart: &mut Multipart,
    file_field: &str,
    max_bytes: usize,
) -> std::result::Result<UploadForm, ApiResponse<T>> {
    let mut form = UploadForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(multipart_rejection(e, max_bytes)),
        };
        let name = field.name().unwrap_or("").to_string();

        if name != file_field {
            let value = field
                .text()
                .await
                .map_err(|e| multipart_rejection::<T>(e, max_bytes))?;
            form.fields.insert(name, value);
            continue;
        }

        let file_name = field.file_name().unwrap_or("").to_string();
        if file_name.is_empty() {
            continue;
        }
        form.received_files += 1;

        let Some(ext) = allowed_extension(&file_name) else {
            debug!(file = %file_name, "Skipping upload with unsupported extension");
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_rejection::<T>(e, max_bytes))?;
        let file = stage(&bytes, &ext).await.map_err(ApiResponse::<T>::from)?;
        form.uploads.push(StagedUpload {
            original_name: file_name,
            file,
        });
    }

    Ok(form)
}

#[derive(Debug, PartialEq)]
struct ProcessOptions {
    languages: Vec<String>,
    high_accuracy: bool,
    confidence_threshold: f64,
}

impl ProcessOptions {
    fn from_fields(fields: &HashMap<String, String>) -> std::result::Result<Self, String> {
        let languages = match fields.get("languages") {
            Some(raw) => serde_json::from_str::<Vec<String>>(raw)
                .map_err(|e| format!("Invalid languages: expected a JSON array of codes ({e})"))?,
            None => Vec::new(),
        };

        let high_accuracy = match fields.get("useHighAccuracy") {
            Some(raw) => parse_form_bool(raw)
                .ok_or_else(|| format!("Invalid useHighAccuracy value: {raw}"))?,
            None => true,
        };

        let confidence_threshold = match fields.get("confidenceThreshold") {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|t| (0.0..=1.0).contains(t))
                .ok_or_else(|| {
                    format!("confidenceThreshold must be a number between 0 and 1, got '{raw}'")
                })?,
            None => DEFAULT_CONFIDENCE_THRESHOLD,
        };

        Ok(Self {
            languages,
            high_accuracy,
            confidence_threshold,
        })
    }
}

/// Report uploads under the names the client sent, not their temp paths.
fn restore_names(result: &mut ExtractionResult, uploads: &[StagedUpload]) {
    let mut names: HashMap<String, &str> = HashMap::new();
    for upload in uploads {
        names.insert(upload.path(), upload.original_name.as_str());
        if let Some(staged) = upload.staged_name() {
            names.insert(staged, upload.original_name.as_str());
        }
    }
    let rename = |path: &mut String| {
        if let Some(name) = names.get(path.as_str()) {
            *path = name.to_string();
        }
    };

    match result {
        ExtractionResult::Detailed { report } => match report {
            FileReport::Recognized(file) => {
                if let Some(path) = file.file.as_mut() {
                    rename(path);
                }
            }
            FileReport::Rejected(failure) => rename(&mut failure.path),
        },
        ExtractionResult::Batch(batch) => {
            for file in &mut batch.succeeded {
                if let Some(path) = file.file.as_mut() {
                    rename(path);
                }
            }
            for failure in &mut batch.failed {
                rename(&mut failure.path);
            }
        }
        ExtractionResult::Text { .. } | ExtractionResult::RawFallback { .. } => {}
    }
}

fn summarize(result: ExtractionResult, threshold: f64) -> ProcessData {
    let files: Vec<&RecognizedFile> = match &result {
        ExtractionResult::Detailed {
            report: FileReport::Recognized(file),
        } => vec![file],
        ExtractionResult::Batch(batch) => batch.succeeded.iter().collect(),
        _ => Vec::new(),
    };
    let scores: Vec<f64> = files
        .into_iter()
        .flat_map(RecognizedFile::blocks)
        .map(|b| b.confidence)
        .collect();

    let confidence = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    };
    let low_confidence_blocks = scores.iter().filter(|c| **c < threshold).count();

    ProcessData {
        extracted_text: result.text(),
        method: "engine".to_string(),
        fallback_used: result.is_fallback(),
        confidence,
        low_confidence_blocks,
        details: result,
    }
}

/// `POST /api/process`
///
/// One accepted upload runs a detailed extraction, several run a batch.
/// Uploads with unsupported extensions are skipped.
#[utoipa::path(
    post,
    path = "/api/process",
    tag = "ocr",
    request_body(content_type = "multipart/form-data", content = String, description = "One or more `files`, plus optional `languages` (JSON array), `useHighAccuracy` and `confidenceThreshold`"),
    responses(
        (status = 200, description = "Extracted text and engine detail", body = ProcessData),
        (status = 400, description = "No usable uploads or invalid options"),
        (status = 413, description = "Upload too large"),
        (status = 422, description = "The engine rejected the file"),
        (status = 500, description = "The engine failed"),
        (status = 503, description = "The engine could not be started"),
        (status = 504, description = "The engine timed out"),
    )
)]
pub async fn process_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResponse<ProcessData> {
    let max_bytes = state.config.server.max_upload_bytes;
    let form = match read_form(&mut multipart, "files", max_bytes).await {
        Ok(form) => form,
        Err(resp) => return resp,
    };

    if form.received_files == 0 {
        return ApiResponse::bad_request("No files uploaded");
    }
    if form.uploads.is_empty() {
        return ApiResponse::bad_request("No valid files to process");
    }
    let options = match ProcessOptions::from_fields(&form.fields) {
        Ok(options) => options,
        Err(msg) => return ApiResponse::bad_request(msg),
    };

    info!(
        files = form.uploads.len(),
        skipped = form.received_files - form.uploads.len(),
        high_accuracy = options.high_accuracy,
        "Processing uploads"
    );

    let paths: Vec<String> = form.uploads.iter().map(StagedUpload::path).collect();
    let request = match ExtractionRequest::new(paths) {
        Ok(request) => request.with_languages(options.languages).with_detail(true),
        Err(e) => return e.into(),
    };

    let mut result = match state.ocr.extract(&request, &state.shutdown).await {
        Ok(result) => result,
        Err(e) => return e.into(),
    };
    restore_names(&mut result, &form.uploads);

    if let ExtractionResult::Detailed {
        report: FileReport::Rejected(failure),
    } = &result
    {
        return ApiResponse::error(StatusCode::UNPROCESSABLE_ENTITY, failure.reason.clone());
    }

    ApiResponse::success(summarize(result, options.confidence_threshold))
}

/// `POST /api/quick`
///
/// Plain text for a single `file`; `languages` is comma-separated.
#[utoipa::path(
    post,
    path = "/api/quick",
    tag = "ocr",
    request_body(content_type = "multipart/form-data", content = String, description = "A single `file` and optional comma-separated `languages`"),
    responses(
        (status = 200, description = "Extracted text", body = QuickData),
        (status = 400, description = "Missing or unsupported upload"),
        (status = 500, description = "The engine failed"),
    )
)]
pub async fn quick_extract(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResponse<QuickData> {
    let max_bytes = state.config.server.max_upload_bytes;
    let form = match read_form(&mut multipart, "file", max_bytes).await {
        Ok(form) => form,
        Err(resp) => return resp,
    };

    if form.received_files == 0 {
        return ApiResponse::bad_request("No file uploaded");
    }
    let Some(upload) = form.uploads.first() else {
        return ApiResponse::bad_request("Invalid file type");
    };

    let languages: Vec<String> = form
        .fields
        .get("languages")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let request = ExtractionRequest::single(upload.path()).with_languages(languages);
    match state.ocr.extract(&request, &state.shutdown).await {
        Ok(result) => ApiResponse::success(QuickData {
            text: result.text(),
        }),
        Err(e) => e.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{BatchResult, FileFailure, TextBlock};

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn block(confidence: f64) -> TextBlock {
        TextBlock {
            text: "x".into(),
            confidence,
            bbox: Vec::new(),
        }
    }

    fn staged(name: &str) -> StagedUpload {
        StagedUpload {
            original_name: name.to_string(),
            file: NamedTempFile::new().expect("tempfile"),
        }
    }

    #[test]
    fn allowed_extension_is_case_insensitive() {
        assert_eq!(allowed_extension("Scan.PNG"), Some("png".to_string()));
        assert_eq!(allowed_extension("report.pdf"), Some("pdf".to_string()));
        assert_eq!(allowed_extension("notes.txt"), None);
        assert_eq!(allowed_extension("no_extension"), None);
    }

    #[test]
    fn parse_form_bool_accepts_supported_values() {
        assert_eq!(parse_form_bool("true"), Some(true));
        assert_eq!(parse_form_bool(" ON "), Some(true));
        assert_eq!(parse_form_bool("0"), Some(false));
        assert_eq!(parse_form_bool("maybe"), None);
    }

    #[test]
    fn process_options_defaults() {
        let options = ProcessOptions::from_fields(&HashMap::new()).unwrap();
        assert!(options.languages.is_empty());
        assert!(options.high_accuracy);
        assert_eq!(options.confidence_threshold, DEFAULT_CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn process_options_parse_all_fields() {
        let options = ProcessOptions::from_fields(&fields(&[
            ("languages", r#"["en", "fr"]"#),
            ("useHighAccuracy", "false"),
            ("confidenceThreshold", "0.5"),
        ]))
        .unwrap();
        assert_eq!(options.languages, vec!["en", "fr"]);
        assert!(!options.high_accuracy);
        assert_eq!(options.confidence_threshold, 0.5);
    }

    #[test]
    fn process_options_reject_bad_values() {
        assert!(ProcessOptions::from_fields(&fields(&[("languages", "en,fr")])).is_err());
        assert!(ProcessOptions::from_fields(&fields(&[("confidenceThreshold", "1.5")])).is_err());
        assert!(ProcessOptions::from_fields(&fields(&[("confidenceThreshold", "high")])).is_err());
        assert!(ProcessOptions::from_fields(&fields(&[("useHighAccuracy", "sure")])).is_err());
    }

    #[test]
    fn summarize_counts_low_confidence_blocks() {
        let result = ExtractionResult::Detailed {
            report: FileReport::Recognized(RecognizedFile {
                full_text: "Hello World".into(),
                text_blocks: vec![block(0.9), block(0.5), block(0.7)],
                ..Default::default()
            }),
        };
        let data = summarize(result, 0.7);
        assert_eq!(data.extracted_text, "Hello World");
        assert_eq!(data.low_confidence_blocks, 1);
        assert!((data.confidence.unwrap() - 0.7).abs() < 1e-9);
        assert!(!data.fallback_used);
    }

    #[test]
    fn summarize_flags_fallback() {
        let data = summarize(
            ExtractionResult::RawFallback {
                text: "raw".into(),
            },
            0.7,
        );
        assert!(data.fallback_used);
        assert!(data.confidence.is_none());
        assert_eq!(data.extracted_text, "raw");
    }

    #[test]
    fn restore_names_rewrites_batch_paths() {
        let uploads = vec![staged("a.png"), staged("b.pdf")];
        let mut result = ExtractionResult::Batch(BatchResult {
            total_files: 2,
            succeeded: vec![RecognizedFile {
                file: Some(uploads[0].path()),
                full_text: "a".into(),
                ..Default::default()
            }],
            failed: vec![FileFailure {
                path: uploads[1].path(),
                reason: "corrupt".into(),
            }],
        });

        restore_names(&mut result, &uploads);

        let ExtractionResult::Batch(batch) = result else {
            panic!("expected batch");
        };
        assert_eq!(batch.succeeded[0].file.as_deref(), Some("a.png"));
        assert_eq!(batch.failed[0].path, "b.pdf");
    }

    #[test]
    fn restore_names_matches_engine_basenames() {
        let uploads = vec![staged("a.png"), staged("b.pdf")];
        let basename = |u: &StagedUpload| u.staged_name().unwrap();
        let mut result = ExtractionResult::Batch(BatchResult {
            total_files: 2,
            succeeded: vec![RecognizedFile {
                file: Some(basename(&uploads[0])),
                full_text: "a".into(),
                ..Default::default()
            }],
            failed: vec![FileFailure {
                path: basename(&uploads[1]),
                reason: "corrupt".into(),
            }],
        });

        restore_names(&mut result, &uploads);

        let ExtractionResult::Batch(batch) = result else {
            panic!("expected batch");
        };
        assert_eq!(batch.succeeded[0].file.as_deref(), Some("a.png"));
        assert_eq!(batch.failed[0].path, "b.pdf");
    }

    #[test]
    fn restore_names_matches_rejected_single_file_basename() {
        let uploads = vec![staged("scan.png")];
        let mut result = ExtractionResult::Detailed {
            report: FileReport::Rejected(FileFailure {
                path: uploads[0].staged_name().unwrap(),
                reason: "Unsupported file type".into(),
            }),
        };

        restore_names(&mut result, &uploads);

        let ExtractionResult::Detailed {
            report: FileReport::Rejected(failure),
        } = result
        else {
            panic!("expected rejected report");
        };
        assert_eq!(failure.path, "scan.png");
    }
}

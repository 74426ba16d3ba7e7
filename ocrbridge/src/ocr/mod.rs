//! OCR (Optical Character Recognition) Module
//!
//! Text extraction is delegated to an external engine process. This module
//! owns everything between a caller's request and a typed result.
//!
//! # Architecture
//!
//! - `ExtractionRequest` describes what to extract (paths, languages, detail, DPI)
//! - `Engine` maps a request onto the engine's command line as an `Invocation`
//! - `ProcessRunner` runs one invocation; `TokioProcessRunner` is the real one
//! - `decode` turns the raw `ProcessOutcome` into an `ExtractionResult`
//! - `OcrService` ties the four together and applies the configured timeout
//!
//! # Configuration
//!
//! The engine is controlled via `EngineConfig` (see `config.rs`):
//! - `program`: Executable to spawn (e.g., "python")
//! - `script`: Argument placed before every request (e.g., "ocr.py")
//! - `timeout_secs`: Wall-clock limit per invocation
//!
//! # Usage
//!
//! ```rust,ignore
//! let ocr = OcrService::from_config(&config.engine);
//! let text = ocr.quick_extract("scan.png", &["en".to_string()]).await?;
//! ```

mod decoder;
mod invocation;
mod request;
mod runner;
mod service;
mod types;

pub use decoder::decode;
pub use invocation::{Engine, Invocation};
pub use request::{parse_dpi, ExtractionRequest, RequestMode, DEFAULT_LANGUAGE, ENGINE_DEFAULT_DPI};
pub use runner::{ProcessRunner, TokioProcessRunner};
pub use service::OcrService;
pub use types::{
    BatchResult, ExtractionResult, FileFailure, FileReport, PageResult, ProcessOutcome,
    RecognizedFile, TextBlock,
};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::api::ApiResponse;

/// Why an engine invocation did not produce usable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessErrorKind {
    /// The engine could not be started at all (missing, not executable).
    SpawnFailure,
    /// The engine ran and reported failure through its exit status.
    NonZeroExit,
    /// The caller cancelled the invocation and the child was killed.
    Cancelled,
    /// The configured time limit elapsed and the child was killed.
    TimedOut,
    /// Reading the child's pipes or waiting on it failed after spawn.
    Io,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProcessError {
    pub kind: ProcessErrorKind,
    pub message: String,
}

impl ProcessError {
    pub fn new(kind: ProcessErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeErrorKind {
    /// Batch mode requires the structured aggregate and stdout did not hold one.
    BatchParseFailure,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DecodeError {
    pub kind: DecodeErrorKind,
    pub message: String,
}

impl DecodeError {
    pub fn batch_parse_failure(detail: impl std::fmt::Display) -> Self {
        Self {
            kind: DecodeErrorKind::BatchParseFailure,
            message: format!("Failed to parse batch results: {detail}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("OCR process error: {0}")]
    Process(#[from] ProcessError),

    #[error("OCR decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl BridgeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::Validation(_) | BridgeError::Json(_) => StatusCode::BAD_REQUEST,
            BridgeError::Process(e) => match e.kind {
                ProcessErrorKind::SpawnFailure => StatusCode::SERVICE_UNAVAILABLE,
                ProcessErrorKind::TimedOut => StatusCode::GATEWAY_TIMEOUT,
                ProcessErrorKind::NonZeroExit
                | ProcessErrorKind::Cancelled
                | ProcessErrorKind::Io => StatusCode::INTERNAL_SERVER_ERROR,
            },
            BridgeError::Decode(_) | BridgeError::Io(_) | BridgeError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The process-level failure kind, when this error came from the engine.
    pub fn process_kind(&self) -> Option<ProcessErrorKind> {
        match self {
            BridgeError::Process(e) => Some(e.kind),
            _ => None,
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        ApiResponse::<()>::from(self).into_response()
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

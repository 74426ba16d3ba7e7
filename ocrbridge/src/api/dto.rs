use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::ocr::ExtractionResult;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthData {
    pub status: String,
    pub service: String,
    pub version: String,
    pub engine: EngineStatus,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EngineStatus {
    /// `available` when the engine answered `--help`, `unavailable` otherwise.
    pub status: String,
    pub program: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LanguagesData {
    /// Language code to display name.
    pub languages: BTreeMap<String, String>,
}

/// Result of `POST /api/process`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessData {
    pub extracted_text: String,
    pub method: String,
    /// The engine's structured output could not be parsed and raw text was
    /// returned in its place.
    pub fallback_used: bool,
    /// Mean block confidence, when the engine reported any blocks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Blocks whose confidence is under the requested threshold.
    pub low_confidence_blocks: usize,
    #[schema(value_type = Object)]
    pub details: ExtractionResult,
}

/// Result of `POST /api/quick`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuickData {
    pub text: String,
}

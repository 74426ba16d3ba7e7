use axum::Json;
use utoipa::OpenApi;

use super::dto;
use super::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ocrbridge API",
        version = "0.1.0",
        description = "HTTP front end for an external OCR engine process.",
    ),
    paths(
        handlers::health::health_check,
        handlers::languages::list_languages,
        handlers::process::process_files,
        handlers::process::quick_extract,
    ),
    components(schemas(
        dto::HealthData,
        dto::EngineStatus,
        dto::LanguagesData,
        dto::ProcessData,
        dto::QuickData,
    )),
    tags(
        (name = "health", description = "Service and engine health"),
        (name = "ocr", description = "Text extraction"),
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

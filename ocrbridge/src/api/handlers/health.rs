use axum::extract::State;

use crate::api::dto::{EngineStatus, HealthData};
use crate::api::response::ApiResponse;
use crate::api::state::AppState;

/// `GET /api/health`
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthData> {
    let engine_status = if state.ocr.probe().await {
        "available"
    } else {
        "unavailable"
    };

    ApiResponse::success(HealthData {
        status: "healthy".to_string(),
        service: "ocrbridge".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine: EngineStatus {
            status: engine_status.to_string(),
            program: state.ocr.engine().program().to_string(),
        },
    })
}

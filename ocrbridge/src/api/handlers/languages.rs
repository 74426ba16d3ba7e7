use crate::api::dto::LanguagesData;
use crate::api::response::ApiResponse;

pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("ar", "Arabic"),
    ("zh", "Chinese"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("hi", "Hindi"),
];

/// `GET /api/languages`
#[utoipa::path(
    get,
    path = "/api/languages",
    tag = "ocr",
    responses(
        (status = 200, description = "Languages the engine can recognize", body = LanguagesData),
    )
)]
pub async fn list_languages() -> ApiResponse<LanguagesData> {
    let languages = SUPPORTED_LANGUAGES
        .iter()
        .map(|(code, name)| (code.to_string(), name.to_string()))
        .collect();
    ApiResponse::success(LanguagesData { languages })
}

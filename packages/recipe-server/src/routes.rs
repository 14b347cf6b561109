//! HTTP handlers for the parse endpoint and health check.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use recipe_extraction::{ErrorCode, ParseOutcome, ParseRequest};
use serde::Serialize;

use crate::AppState;

/// HTTP status for a parse outcome.
pub fn status_for(outcome: &ParseOutcome) -> StatusCode {
    match outcome.error_code() {
        None => StatusCode::OK,
        Some(ErrorCode::InvalidInput) => StatusCode::BAD_REQUEST,
        Some(ErrorCode::GenerationEmpty) | Some(ErrorCode::FinalValidationFailed) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        Some(ErrorCode::AmbiguousMatch) => StatusCode::MULTIPLE_CHOICES,
        Some(ErrorCode::FetchFailed) => StatusCode::BAD_GATEWAY,
        Some(ErrorCode::GenerationFailed) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// `POST /api/recipes/parse`
///
/// The parse runs on its own task so a client that disconnects does not
/// cancel generation or the cache write.
pub async fn parse_handler(
    State(state): State<AppState>,
    body: Result<Json<ParseRequest>, JsonRejection>,
) -> (StatusCode, Json<ParseOutcome>) {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let outcome = ParseOutcome::failure(
                "",
                ErrorCode::InvalidInput,
                format!("invalid request body: {}", rejection.body_text()),
            );
            return (StatusCode::BAD_REQUEST, Json(outcome));
        }
    };

    let parser = state.parser.clone();
    match tokio::spawn(async move { parser.parse(request).await }).await {
        Ok(outcome) => (status_for(&outcome), Json(outcome)),
        Err(e) => {
            tracing::error!(error = %e, "Parse task failed");
            let outcome = ParseOutcome::failure(
                "",
                ErrorCode::GenerationFailed,
                "internal error while parsing",
            );
            (StatusCode::INTERNAL_SERVER_ERROR, Json(outcome))
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    prompt_version: String,
}

/// `GET /health`
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        prompt_version: state.parser.prompt_version().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ErrorCode::InvalidInput, 400),
            (ErrorCode::FetchFailed, 502),
            (ErrorCode::GenerationFailed, 503),
            (ErrorCode::GenerationEmpty, 422),
            (ErrorCode::FinalValidationFailed, 422),
            (ErrorCode::AmbiguousMatch, 300),
        ];
        for (code, status) in cases {
            let outcome = ParseOutcome::failure("k", code, "x");
            assert_eq!(status_for(&outcome).as_u16(), status, "{}", code);
        }
    }
}

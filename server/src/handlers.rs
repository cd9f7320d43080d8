// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use axum::{
    extract::{Json, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use board::{DirectClient, SuggestionClient, SuggestionError};
use common::{BreakdownRequest, ErrorDetail, SubTaskSuggestion};
use tracing::{debug, error, info};

/// Handler for the health check.
pub async fn health(State(client): State<DirectClient>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "message": "Task breakdown proxy is running.",
        "model": client.model(),
        "configured": client.has_credential(),
    }))
}

/// Handler for breaking a task down into sub-tasks.
pub async fn breakdown_task(
    State(client): State<DirectClient>,
    payload: Result<Json<BreakdownRequest>, JsonRejection>, // Extracting the request body as JSON
) -> Result<Json<Vec<SubTaskSuggestion>>, AppError> {
    let Json(payload) = payload.map_err(|rejection| {
        error!("Rejected request body: {}", rejection.body_text());
        AppError::new(StatusCode::BAD_REQUEST, &rejection.body_text())
    })?;
    debug!("Received request to break down task: {}", payload.title);

    // Validate the payload: the title is required
    if payload.title.trim().is_empty() {
        error!("Validation failed: Title is empty.");
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "Title cannot be empty.",
        ));
    }

    let suggestions = client.suggest(&payload).await?;

    info!(
        "Generated {} sub-tasks for '{}'.",
        suggestions.len(),
        payload.title
    );
    Ok(Json(suggestions))
}

// --- Custom Error Handling ---

/// Our custom error type for the application.
pub struct AppError {
    code: StatusCode,
    message: String,
}

impl AppError {
    fn new(code: StatusCode, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
        }
    }
}

/// Model call failures become a 500. The full error is logged here, the
/// client only gets the user-facing text in `detail`.
impl From<SuggestionError> for AppError {
    fn from(err: SuggestionError) -> Self {
        error!("Suggestion request failed: {}", err);
        let code = match err {
            SuggestionError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            code,
            message: err.user_message(),
        }
    }
}

/// Allows Axum to convert our `AppError` into an HTTP `Response`.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(
            "Responding with error: status_code={}, message={}",
            self.code.as_u16(),
            self.message
        );
        (
            self.code,
            Json(ErrorDetail {
                detail: self.message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use board::settings::GeminiSettings;
    use std::time::Duration;

    fn unconfigured_client() -> DirectClient {
        DirectClient::new(GeminiSettings::default(), Duration::from_secs(1)).unwrap()
    }

    fn request(title: &str) -> Result<Json<BreakdownRequest>, JsonRejection> {
        Ok(Json(BreakdownRequest::new(title, None)))
    }

    #[tokio::test]
    async fn test_breakdown_validation_empty_title() {
        // Validation fails before any call to the model.
        let result = breakdown_task(State(unconfigured_client()), request("  ")).await;

        let err = result.err().unwrap();
        assert_eq!(err.code, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Title cannot be empty.");
    }

    #[tokio::test]
    async fn test_breakdown_without_key_is_server_error() {
        let result = breakdown_task(State(unconfigured_client()), request("Plan")).await;

        let err = result.err().unwrap();
        assert_eq!(err.code, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message.contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_upstream_detail_is_kept_in_message() {
        let err = AppError::from(SuggestionError::Upstream {
            status: 503,
            detail: Some("model unavailable".to_string()),
        });

        assert_eq!(err.code, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message.contains("model unavailable"));
    }

    #[test]
    fn test_format_error_does_not_leak_model_output() {
        let err = AppError::from(SuggestionError::ResponseFormat(
            "invalid JSON: expected value at line 1 column 1".to_string(),
        ));

        assert_eq!(err.code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.message,
            "The AI returned an unexpected response. Please try again."
        );
    }
}

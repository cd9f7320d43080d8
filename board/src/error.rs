// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use common::TaskId;
use thiserror::Error;

/// Errors raised by board mutations. Neither variant changes any state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    /// Input rejected before anything was touched (e.g. an empty title).
    #[error("{0}")]
    Validation(String),

    #[error("Task with ID {0} not found.")]
    NotFound(TaskId),
}

impl BoardError {
    pub(crate) fn empty_title() -> Self {
        BoardError::Validation("Title cannot be empty.".to_string())
    }
}

/// Failures of a single sub-task suggestion request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SuggestionError {
    /// The request itself was unusable (e.g. an empty title). Nothing was sent.
    #[error("{0}")]
    Validation(String),

    /// No credential or endpoint is available for the configured mode.
    #[error("AI suggestions are not configured: {0}")]
    Configuration(String),

    /// The request never produced an HTTP response (network error, timeout).
    #[error("Could not reach the suggestion service: {0}")]
    Transport(String),

    /// The reply was not a JSON array of `{title, description?}` objects.
    #[error("Unexpected response format: {0}")]
    ResponseFormat(String),

    /// The remote side answered with a non-success status.
    #[error("Suggestion service returned {status}: {}", .detail.as_deref().unwrap_or("no details provided"))]
    Upstream { status: u16, detail: Option<String> },
}

impl SuggestionError {
    /// Text suitable for showing to the end user in the suggestions view.
    pub fn user_message(&self) -> String {
        match self {
            SuggestionError::Validation(reason) => reason.clone(),
            SuggestionError::Configuration(reason) => {
                format!("AI features are unavailable: {reason}")
            }
            SuggestionError::Transport(_) => {
                "Could not reach the AI service. Check your connection and try again.".to_string()
            }
            SuggestionError::ResponseFormat(_) => {
                "The AI returned an unexpected response. Please try again.".to_string()
            }
            SuggestionError::Upstream {
                detail: Some(detail),
                ..
            } => detail.clone(),
            SuggestionError::Upstream { detail: None, .. } => {
                "The AI service failed to generate suggestions.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for SuggestionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SuggestionError::ResponseFormat(err.to_string())
        } else {
            SuggestionError::Transport(err.to_string())
        }
    }
}

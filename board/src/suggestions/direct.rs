// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::time::Duration;

use common::{BreakdownRequest, SubTaskSuggestion};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error, info};

use super::{SuggestionClient, build_prompt, parse_suggestions, validate_request};
use crate::error::SuggestionError;
use crate::settings::GeminiSettings;

/// Calls the Gemini `generateContent` endpoint with the caller's own key,
/// constraining the reply to a JSON array of sub-tasks.
#[derive(Debug, Clone)]
pub struct DirectClient {
    http: reqwest::Client,
    settings: GeminiSettings,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: ProviderError,
}

#[derive(Deserialize)]
struct ProviderError {
    message: String,
}

/// Schema for `[{title: string, description?: string}]` in the provider's dialect.
fn suggestion_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING" },
                "description": { "type": "STRING" }
            },
            "required": ["title"]
        }
    })
}

impl DirectClient {
    pub fn new(settings: GeminiSettings, timeout: Duration) -> Result<Self, SuggestionError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SuggestionError::Configuration(format!("HTTP client: {e}")))?;
        Ok(Self { http, settings })
    }

    pub fn has_credential(&self) -> bool {
        self.settings.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }
}

impl SuggestionClient for DirectClient {
    async fn suggest(
        &self,
        request: &BreakdownRequest,
    ) -> Result<Vec<SubTaskSuggestion>, SuggestionError> {
        validate_request(request)?;
        let api_key = self.settings.api_key.as_deref().ok_or_else(|| {
            SuggestionError::Configuration("GEMINI_API_KEY is not set".to_string())
        })?;

        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: Some(build_prompt(request)),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: suggestion_schema(),
            },
        };

        debug!(
            "Requesting breakdown of '{}' from model {}",
            request.title, self.settings.model
        );
        let resp = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ProviderErrorBody>(&txt)
                .map(|b| b.error.message)
                .ok();
            error!("Model provider error: {} {}", status, txt);
            return Err(SuggestionError::Upstream {
                status: status.as_u16(),
                detail,
            });
        }

        let out: GenerateResponse = resp.json().await?;
        let text: String = out
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(SuggestionError::ResponseFormat(
                "model returned no text".to_string(),
            ));
        }

        let suggestions = parse_suggestions(&text)?;
        info!(
            "Model suggested {} sub-tasks for '{}'.",
            suggestions.len(),
            request.title
        );
        Ok(suggestions)
    }
}

// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
//! Sub-task suggestions: one interface, two transports.
//!
//! [`DirectClient`] calls the model provider with its own credential,
//! [`ProxyClient`] asks a trusted proxy to do it. [`Suggester`] picks one of
//! them from [`Settings`](crate::settings::Settings) at startup.

mod direct;
mod proxy;

use std::future::Future;

use common::{BreakdownRequest, SubTaskSuggestion};
use serde_json::Value;
use tracing::warn;

use crate::error::SuggestionError;
use crate::settings::{Settings, SuggestionMode};

pub use direct::DirectClient;
pub use proxy::{BREAKDOWN_PATH, ProxyClient};

/// Upper bound on the number of suggestions handed back to callers.
pub const MAX_SUGGESTIONS: usize = 5;

/// Turns a task into a list of candidate sub-tasks. One attempt per call.
pub trait SuggestionClient {
    fn suggest(
        &self,
        request: &BreakdownRequest,
    ) -> impl Future<Output = Result<Vec<SubTaskSuggestion>, SuggestionError>> + Send;
}

/// The transport chosen by configuration.
#[derive(Debug, Clone)]
pub enum Suggester {
    Direct(DirectClient),
    Proxied(ProxyClient),
}

impl Suggester {
    /// Builds the configured client, or `None` when suggestions are off.
    pub fn from_settings(settings: &Settings) -> Result<Option<Self>, SuggestionError> {
        let suggester = match settings.suggestion_mode {
            SuggestionMode::Off => return Ok(None),
            SuggestionMode::Direct => Suggester::Direct(DirectClient::new(
                settings.gemini.clone(),
                settings.request_timeout,
            )?),
            SuggestionMode::Proxy => Suggester::Proxied(ProxyClient::new(
                &settings.proxy_url,
                settings.request_timeout,
            )?),
        };
        Ok(Some(suggester))
    }
}

impl SuggestionClient for Suggester {
    async fn suggest(
        &self,
        request: &BreakdownRequest,
    ) -> Result<Vec<SubTaskSuggestion>, SuggestionError> {
        match self {
            Suggester::Direct(client) => client.suggest(request).await,
            Suggester::Proxied(client) => client.suggest(request).await,
        }
    }
}

/// Instruction sent to the model for one task.
pub fn build_prompt(request: &BreakdownRequest) -> String {
    let mut prompt = format!(
        "You are a project planning assistant. Break down the following task into \
         between 2 and 5 smaller, actionable sub-tasks.\n\nTask title: \"{}\"\n",
        request.title.trim()
    );
    if let Some(description) = request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        prompt.push_str(&format!("Task description: \"{description}\"\n"));
    }
    prompt.push_str(
        "\nEach sub-task must have a short \"title\" and may have a one-sentence \
         \"description\". Do not include the original task itself in the list. \
         Respond only with a JSON array of objects of the form \
         {\"title\": string, \"description\": string}.",
    );
    prompt
}

/// Parses model or proxy output text into suggestions.
///
/// A surrounding Markdown code fence is tolerated.
pub fn parse_suggestions(text: &str) -> Result<Vec<SubTaskSuggestion>, SuggestionError> {
    let value: Value = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| SuggestionError::ResponseFormat(format!("invalid JSON: {e}")))?;
    validate_suggestions(value)
}

/// Checks that `value` is an array of `{title: string, description?: string}`.
pub fn validate_suggestions(value: Value) -> Result<Vec<SubTaskSuggestion>, SuggestionError> {
    let Value::Array(items) = value else {
        return Err(SuggestionError::ResponseFormat(
            "expected a JSON array".to_string(),
        ));
    };

    let mut suggestions = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(mut fields) = item else {
            return Err(SuggestionError::ResponseFormat(format!(
                "item {index} is not an object"
            )));
        };
        let title = match fields.remove("title") {
            Some(Value::String(title)) if !title.trim().is_empty() => title.trim().to_string(),
            _ => {
                return Err(SuggestionError::ResponseFormat(format!(
                    "item {index} has no string title"
                )));
            }
        };
        let description = match fields.remove("description") {
            None | Some(Value::Null) => None,
            Some(Value::String(d)) => Some(d.trim().to_string()).filter(|d| !d.is_empty()),
            Some(_) => {
                return Err(SuggestionError::ResponseFormat(format!(
                    "item {index} has a non-string description"
                )));
            }
        };
        suggestions.push(SubTaskSuggestion { title, description });
    }

    if suggestions.len() > MAX_SUGGESTIONS {
        warn!(
            "Model returned {} suggestions, keeping the first {}.",
            suggestions.len(),
            MAX_SUGGESTIONS
        );
        suggestions.truncate(MAX_SUGGESTIONS);
    }
    Ok(suggestions)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.strip_suffix("```").unwrap_or(rest);
    // Drop an optional language tag such as `json`.
    let body = body.strip_prefix("json").unwrap_or(body);
    body.trim()
}

pub(crate) fn validate_request(request: &BreakdownRequest) -> Result<(), SuggestionError> {
    if request.title.trim().is_empty() {
        return Err(SuggestionError::Validation(
            "Title cannot be empty.".to_string(),
        ));
    }
    Ok(())
}

// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::time::Duration;

use common::{BreakdownRequest, ErrorDetail, SubTaskSuggestion};
use serde_json::Value;
use tracing::{debug, error, info};

use super::{SuggestionClient, validate_request, validate_suggestions};
use crate::error::SuggestionError;

/// Path of the breakdown endpoint on the proxy.
pub const BREAKDOWN_PATH: &str = "/api/breakdown-task";

/// Sends `{title, description}` to a proxy that holds the provider key.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    http: reqwest::Client,
    base_url: String,
}

impl ProxyClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SuggestionError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(SuggestionError::Configuration(
                "proxy URL is empty".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SuggestionError::Configuration(format!("HTTP client: {e}")))?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /` on the proxy; returns its status payload.
    pub async fn health(&self) -> Result<Value, SuggestionError> {
        let resp = self.http.get(format!("{}/", self.base_url)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SuggestionError::Upstream {
                status: status.as_u16(),
                detail: None,
            });
        }
        Ok(resp.json().await?)
    }
}

impl SuggestionClient for ProxyClient {
    async fn suggest(
        &self,
        request: &BreakdownRequest,
    ) -> Result<Vec<SubTaskSuggestion>, SuggestionError> {
        validate_request(request)?;
        debug!("Posting breakdown of '{}' to {}", request.title, self.base_url);

        let resp = self
            .http
            .post(format!("{}{}", self.base_url, BREAKDOWN_PATH))
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorDetail>(&txt)
                .map(|body| body.detail)
                .ok();
            error!("Proxy returned {}: {}", status, txt);
            return Err(SuggestionError::Upstream {
                status: status.as_u16(),
                detail,
            });
        }

        let body: Value = resp.json().await?;
        let suggestions = validate_suggestions(body)?;
        info!("Proxy returned {} suggestions.", suggestions.len());
        Ok(suggestions)
    }
}

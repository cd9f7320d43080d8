// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_PROXY_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Which transport the suggestion client uses. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionMode {
    Direct,
    Proxy,
    Off,
}

/// Provider settings for direct mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiSettings {
    /// Missing key means AI features are unavailable in direct mode.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub suggestion_mode: SuggestionMode,
    pub gemini: GeminiSettings,
    pub proxy_url: String,
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            suggestion_mode: SuggestionMode::Off,
            gemini: GeminiSettings::default(),
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from any variable source (the environment, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let gemini = GeminiSettings {
            api_key: var("GEMINI_API_KEY"),
            model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: var("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
        };
        let proxy_url = var("TASKBOARD_PROXY_URL");

        let suggestion_mode = match var("TASKBOARD_SUGGESTIONS").as_deref() {
            Some("direct") => SuggestionMode::Direct,
            Some("proxy") => SuggestionMode::Proxy,
            Some("off") => SuggestionMode::Off,
            other => {
                if let Some(other) = other {
                    warn!("Unknown TASKBOARD_SUGGESTIONS value '{}', inferring mode.", other);
                }
                if gemini.api_key.is_some() {
                    SuggestionMode::Direct
                } else if proxy_url.is_some() {
                    SuggestionMode::Proxy
                } else {
                    SuggestionMode::Off
                }
            }
        };

        let timeout_secs = match var("TASKBOARD_REQUEST_TIMEOUT_SECS") {
            None => DEFAULT_TIMEOUT_SECS,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    warn!(
                        "Invalid TASKBOARD_REQUEST_TIMEOUT_SECS '{}', using {}s.",
                        raw, DEFAULT_TIMEOUT_SECS
                    );
                    DEFAULT_TIMEOUT_SECS
                }
            },
        };

        Self {
            data_dir: var("TASKBOARD_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            suggestion_mode,
            gemini,
            proxy_url: proxy_url.unwrap_or_else(|| DEFAULT_PROXY_URL.to_string()),
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }
}

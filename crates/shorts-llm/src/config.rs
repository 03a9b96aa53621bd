//! LLM client configuration.

use std::time::Duration;

use crate::error::{LlmError, LlmResult};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o-mini";

/// Client configuration.
#[derive(Clone)]
pub struct LlmClientConfig {
    /// Bearer token for the API
    pub api_key: String,
    /// API base URL, without a trailing slash
    pub base_url: String,
    /// Text models, tried in order until one succeeds
    pub models: Vec<String>,
    /// Model used for image description
    pub vision_model: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Sampling temperature
    pub temperature: f32,
    /// Token cap for vision descriptions
    pub vision_max_tokens: u32,
}

impl std::fmt::Debug for LlmClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("models", &self.models)
            .field("vision_model", &self.vision_model)
            .field("timeout", &self.timeout)
            .field("temperature", &self.temperature)
            .field("vision_max_tokens", &self.vision_max_tokens)
            .finish()
    }
}

impl Default for LlmClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            models: vec![DEFAULT_MODEL.to_string()],
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            timeout: Duration::from_secs(120),
            temperature: 0.0,
            vision_max_tokens: 512,
        }
    }
}

impl LlmClientConfig {
    /// Create config from environment variables. `OPENAI_API_KEY` is required.
    pub fn from_env() -> LlmResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::config("OPENAI_API_KEY not set"))?;

        let defaults = Self::default();
        Ok(Self {
            api_key,
            base_url: std::env::var("OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            models: std::env::var("OPENAI_MODELS")
                .ok()
                .map(|list| parse_model_list(&list))
                .filter(|models| !models.is_empty())
                .unwrap_or(defaults.models),
            vision_model: std::env::var("OPENAI_VISION_MODEL").unwrap_or(defaults.vision_model),
            timeout: Duration::from_secs(
                std::env::var("OPENAI_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            temperature: std::env::var("OPENAI_TEMPERATURE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.temperature),
            vision_max_tokens: std::env::var("OPENAI_VISION_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.vision_max_tokens),
        })
    }

    /// Config pointing at `base_url`, as used against local or mock servers.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

fn parse_model_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

//! Claude API client configuration.

use std::fmt;

use banter_common::GatewayError;

/// Model identifier used for every request.
pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Claude API client configuration.
#[derive(Clone)]
pub struct ClaudeConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl fmt::Debug for ClaudeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaudeConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ClaudeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create config from the `ANTHROPIC_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, GatewayError> {
        let key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| GatewayError::Api("ANTHROPIC_API_KEY not set".into()))?;
        Ok(Self::new(key))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_the_key() {
        let config = ClaudeConfig::new("sk-ant-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-ant-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn builders_override_defaults() {
        let config = ClaudeConfig::new("k")
            .with_model("claude-test")
            .with_base_url("http://localhost:9999");
        assert_eq!(config.model, "claude-test");
        assert_eq!(config.base_url, "http://localhost:9999");
    }
}

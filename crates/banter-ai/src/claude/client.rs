//! Claude client struct, request building, and response parsing.

use banter_common::GatewayError;

use crate::{ModelSettings, Reply, TokenUsage, Turn};

use super::config::ClaudeConfig;

pub(crate) const ANTHROPIC_VERSION: &str = "2023-06-01";
pub(crate) const ANTHROPIC_BETA: &str = "output-128k-2025-02-19";

/// Claude API client.
pub struct ClaudeClient {
    pub(crate) config: ClaudeConfig,
    pub(crate) http: reqwest::Client,
}

impl ClaudeClient {
    pub fn new(config: ClaudeConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    pub(crate) fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }

    /// Build the JSON request body for the Messages API.
    ///
    /// Thinking mode attaches an enabled reasoning block with its token
    /// budget and overrides the sampling temperature to 1.0; otherwise
    /// reasoning is explicitly disabled.
    pub(crate) fn build_request_body(
        &self,
        turns: &[Turn],
        settings: &ModelSettings,
        stream: bool,
    ) -> serde_json::Value {
        let thinking = if settings.thinking {
            serde_json::json!({
                "type": "enabled",
                "budget_tokens": settings.thinking_budget,
            })
        } else {
            serde_json::json!({"type": "disabled"})
        };

        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": settings.max_tokens,
            "temperature": settings.effective_temperature(),
            "messages": turns,
            "thinking": thinking,
        });

        if stream {
            body["stream"] = serde_json::json!(true);
        }

        body
    }

    /// POST the body and normalize transport/status failures.
    pub(crate) async fn post(
        &self,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, GatewayError> {
        let response = self
            .http
            .post(self.messages_url())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("anthropic-beta", ANTHROPIC_BETA)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout
                } else {
                    GatewayError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GatewayError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text = text.chars().take(200).collect::<String>();
            return Err(GatewayError::Api(format!("HTTP {status}: {text}")));
        }

        Ok(response)
    }

    /// Parse a non-streaming response: ordered content parts, thinking
    /// first when reasoning was requested, then the answer text.
    pub(crate) fn parse_response(&self, json: serde_json::Value) -> Result<Reply, GatewayError> {
        let blocks = json["content"]
            .as_array()
            .ok_or_else(|| GatewayError::Parse("response has no content array".into()))?;

        let mut thinking: Option<String> = None;
        let mut text = String::new();
        for block in blocks {
            match block["type"].as_str().unwrap_or("") {
                "thinking" => {
                    if let Some(t) = block["thinking"].as_str() {
                        thinking = Some(t.to_string());
                    }
                }
                "text" => {
                    if let Some(t) = block["text"].as_str() {
                        text.push_str(t);
                    }
                }
                _ => {}
            }
        }

        let usage = TokenUsage {
            input_tokens: json["usage"]["input_tokens"].as_u64().unwrap_or(0),
            output_tokens: json["usage"]["output_tokens"].as_u64().unwrap_or(0),
        };

        Ok(Reply {
            text,
            thinking,
            usage,
        })
    }
}

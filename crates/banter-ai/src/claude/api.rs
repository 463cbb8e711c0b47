//! ChatClient trait implementation for ClaudeClient (batch + streaming).

use async_trait::async_trait;
use tracing::debug;

use banter_common::GatewayError;

use crate::streaming::SseStream;
use crate::{ChatClient, ModelSettings, Reply, ReplyStream, Turn};

use super::client::ClaudeClient;

#[async_trait]
impl ChatClient for ClaudeClient {
    async fn send_message(
        &self,
        turns: &[Turn],
        settings: &ModelSettings,
    ) -> Result<Reply, GatewayError> {
        let body = self.build_request_body(turns, settings, false);

        debug!(model = %self.config.model, turns = turns.len(), "Claude API request");

        let response = self.post(&body).await?;
        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        self.parse_response(json)
    }

    async fn open_stream(
        &self,
        turns: &[Turn],
        settings: &ModelSettings,
    ) -> Result<ReplyStream, GatewayError> {
        let body = self.build_request_body(turns, settings, true);

        debug!(model = %self.config.model, turns = turns.len(), "Claude API streaming request");

        let response = self.post(&body).await?;
        Ok(ReplyStream::from_sse(SseStream::from_response(response)))
    }
}

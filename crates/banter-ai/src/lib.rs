//! Chat core for banter.
//!
//! Provides the Claude Messages API client with:
//! - Batch and streaming (SSE) replies
//! - Extended-reasoning ("thinking") mode
//! - Attachment normalization into multi-part message content
//! - Named session management with pluggable persistence

pub mod claude;
pub mod content;
pub mod session;
pub mod streaming;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use banter_common::{AttachmentError, BanterError, GatewayError, SessionId, StoreError};
pub use claude::{ClaudeClient, ClaudeConfig};
pub use content::{normalize, Attachment};
pub use session::{FileBackend, HttpBackend, MemoryBackend, SessionRecord, SessionStore, StoreBackend};
pub use streaming::{ReplyStream, StreamEvent};

/// Outbound chat gateway: ships the full turn history and yields the
/// reply either whole or as a pull-based fragment stream.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send the turn history and wait for the complete reply.
    async fn send_message(
        &self,
        turns: &[Turn],
        settings: &ModelSettings,
    ) -> Result<Reply, GatewayError>;

    /// Send the turn history and open a fragment stream over the reply.
    async fn open_stream(
        &self,
        turns: &[Turn],
        settings: &ModelSettings,
    ) -> Result<ReplyStream, GatewayError>;
}

/// One message in a conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: TurnContent,
}

impl Turn {
    pub fn user(content: impl Into<TurnContent>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: TurnContent::Text(text.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Turn content: a bare string, or an ordered block list when
/// attachments are present (attachments first, text last).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl TurnContent {
    /// The display text of this turn: the bare string, or the trailing
    /// text block when the turn carries attachments.
    pub fn text(&self) -> &str {
        match self {
            TurnContent::Text(text) => text,
            TurnContent::Blocks(blocks) => blocks
                .iter()
                .rev()
                .find_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .unwrap_or(""),
        }
    }

    pub fn attachment_count(&self) -> usize {
        match self {
            TurnContent::Text(_) => 0,
            TurnContent::Blocks(blocks) => blocks
                .iter()
                .filter(|block| !matches!(block, ContentBlock::Text { .. }))
                .count(),
        }
    }
}

impl From<String> for TurnContent {
    fn from(text: String) -> Self {
        TurnContent::Text(text)
    }
}

impl From<&str> for TurnContent {
    fn from(text: &str) -> Self {
        TurnContent::Text(text.to_string())
    }
}

/// One unit of turn content, serialized in the Messages API wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
    Document { source: AttachmentSource },
    Image { source: AttachmentSource },
}

/// Base64 payload of a document or image block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

impl AttachmentSource {
    pub fn base64(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            source_type: "base64".into(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }
}

/// Output token bounds accepted by the request builder.
pub const MAX_TOKENS_RANGE: std::ops::RangeInclusive<u32> = 100..=4096;
/// Reasoning-trace token budget bounds.
pub const THINKING_BUDGET_RANGE: std::ops::RangeInclusive<u32> = 1024..=4096;

/// Per-request model knobs. Recomputed from current control values
/// before every call; never persisted with a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub max_tokens: u32,
    pub temperature: f64,
    pub thinking: bool,
    pub thinking_budget: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            max_tokens: 1700,
            temperature: 0.7,
            thinking: true,
            thinking_budget: 1048,
        }
    }
}

impl ModelSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens.clamp(*MAX_TOKENS_RANGE.start(), *MAX_TOKENS_RANGE.end());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature.clamp(0.0, 1.0);
        self
    }

    pub fn with_thinking(mut self, thinking: bool) -> Self {
        self.thinking = thinking;
        self
    }

    pub fn with_thinking_budget(mut self, budget: u32) -> Self {
        self.thinking_budget =
            budget.clamp(*THINKING_BUDGET_RANGE.start(), *THINKING_BUDGET_RANGE.end());
        self
    }

    /// The sampling temperature actually sent on the wire. The API
    /// requires temperature 1.0 while thinking is enabled.
    pub fn effective_temperature(&self) -> f64 {
        if self.thinking {
            1.0
        } else {
            self.temperature
        }
    }
}

/// A complete model reply. Only `text` ever goes back into a session;
/// the reasoning trace is display-only.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub thinking: Option<String>,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

//! Anthropic Claude API client.
//!
//! Implements the `ChatClient` trait for Claude models via the
//! Anthropic Messages API (https://api.anthropic.com/v1/messages),
//! in both batch and SSE streaming modes, with optional
//! extended-reasoning ("thinking") requests.

mod api;
mod client;
mod config;

pub use client::ClaudeClient;
pub use config::{ClaudeConfig, DEFAULT_MODEL};

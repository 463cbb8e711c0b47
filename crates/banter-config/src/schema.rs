//! Configuration schema types for banter.
//!
//! All structs use `serde(default)` so partial configs work correctly.
//! Defaults mirror what a fresh install should do: thinking mode on,
//! sessions persisted to a local file.

use serde::{Deserialize, Serialize};

/// Top-level settings file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BanterConfig {
    pub model: ModelDefaults,
    pub store: StoreConfig,
}

/// Default model knobs applied at startup. CLI flags override these
/// per run; they are never persisted alongside sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelDefaults {
    /// Maximum output tokens per reply (100..=4096).
    pub max_tokens: u32,
    /// Sampling temperature (0.0..=1.0). Ignored while thinking mode
    /// is on; the API requires temperature 1.0 there.
    pub temperature: f64,
    /// Extended-reasoning ("thinking") mode.
    pub thinking: bool,
    /// Token budget for the reasoning trace (1024..=4096).
    pub thinking_budget: u32,
}

impl Default for ModelDefaults {
    fn default() -> Self {
        Self {
            max_tokens: 1700,
            temperature: 0.7,
            thinking: true,
            thinking_budget: 1048,
        }
    }
}

/// Which persistence backend holds the sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendKind {
    /// Process lifetime only.
    Memory,
    /// One JSON document on disk.
    File,
    /// Remote document collection over REST.
    Http,
}

/// Session persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackendKind,
    /// Override for the sessions file path (file backend).
    pub path: Option<String>,
    /// Base URL of the document service (http backend).
    pub base_url: Option<String>,
    /// Collection name under the base URL (http backend).
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackendKind::File,
            path: None,
            base_url: None,
            collection: "sessions".into(),
        }
    }
}

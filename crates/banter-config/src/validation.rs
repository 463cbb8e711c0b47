//! Range and consistency checks for a loaded config.

use crate::schema::{BanterConfig, StoreBackendKind};
use banter_common::ConfigError;

pub const MAX_TOKENS_RANGE: std::ops::RangeInclusive<u32> = 100..=4096;
pub const THINKING_BUDGET_RANGE: std::ops::RangeInclusive<u32> = 1024..=4096;

/// Validate a parsed config. Returns the first problem found.
pub fn validate(config: &BanterConfig) -> Result<(), ConfigError> {
    let model = &config.model;

    if !MAX_TOKENS_RANGE.contains(&model.max_tokens) {
        return Err(ConfigError::ValidationError(format!(
            "model.max_tokens {} outside {}..={}",
            model.max_tokens,
            MAX_TOKENS_RANGE.start(),
            MAX_TOKENS_RANGE.end()
        )));
    }

    if !(0.0..=1.0).contains(&model.temperature) {
        return Err(ConfigError::ValidationError(format!(
            "model.temperature {} outside 0.0..=1.0",
            model.temperature
        )));
    }

    if !THINKING_BUDGET_RANGE.contains(&model.thinking_budget) {
        return Err(ConfigError::ValidationError(format!(
            "model.thinking_budget {} outside {}..={}",
            model.thinking_budget,
            THINKING_BUDGET_RANGE.start(),
            THINKING_BUDGET_RANGE.end()
        )));
    }

    if config.store.backend == StoreBackendKind::Http && config.store.base_url.is_none() {
        return Err(ConfigError::ValidationError(
            "store.backend = \"http\" requires store.base_url".into(),
        ));
    }

    if config.store.collection.is_empty() {
        return Err(ConfigError::ValidationError(
            "store.collection must not be empty".into(),
        ));
    }

    Ok(())
}

//! Settings file handling for banter.
//!
//! Loads `config.toml` from the platform config directory (creating a
//! commented default on first run), fills missing fields with serde
//! defaults, and validates ranges before handing the config to the app.
//! Credentials never live here; those come from the environment.

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{BanterConfig, ModelDefaults, StoreBackendKind, StoreConfig};
pub use toml_loader::{default_config_path, load_default, load_from_path};

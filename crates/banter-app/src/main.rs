//! banter: a terminal chat client for Claude.
//!
//! Loads settings, connects the gateway and the session store, then
//! hands control to the interactive loop in `repl`.

mod repl;

use clap::Parser;

use banter_ai::claude::{ClaudeClient, ClaudeConfig};
use banter_ai::session::{FileBackend, HttpBackend, MemoryBackend, SessionStore, StoreBackend};
use banter_ai::ModelSettings;
use banter_common::{BanterError, ConfigError};
use banter_config::{BanterConfig, StoreBackendKind};

#[derive(Parser)]
#[command(name = "banter", about = "Terminal chat client for Claude")]
struct Args {
    /// Path to an alternate config file.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Wait for complete replies instead of streaming.
    #[arg(long)]
    no_stream: bool,

    /// Override the store backend: memory | file | http.
    #[arg(long)]
    backend: Option<String>,

    /// Maximum output tokens per reply.
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Sampling temperature (ignored while thinking is on).
    #[arg(long)]
    temperature: Option<f64>,

    /// Disable extended reasoning for this run.
    #[arg(long)]
    no_thinking: bool,

    /// Token budget for the reasoning trace.
    #[arg(long)]
    thinking_budget: Option<u32>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "banter=info".into()),
        )
        .init();

    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => exit_with(e.into()),
    };

    let claude = match ClaudeConfig::from_env() {
        Ok(claude) => claude,
        Err(e) => exit_with(e.into()),
    };
    let client = ClaudeClient::new(claude);

    let backend = match build_backend(&config, args.backend.as_deref()) {
        Ok(backend) => backend,
        Err(e) => exit_with(e),
    };
    let mut store = SessionStore::new(backend);
    if let Err(e) = store.load().await {
        exit_with(e.into());
    }

    let settings = build_settings(&config, &args);
    if let Err(e) = repl::run(&mut store, &client, &settings, !args.no_stream).await {
        exit_with(e);
    }
}

fn exit_with(e: BanterError) -> ! {
    eprintln!("banter: {e}");
    std::process::exit(1);
}

fn load_config(args: &Args) -> Result<BanterConfig, ConfigError> {
    match &args.config {
        Some(path) => banter_config::load_from_path(path),
        None => banter_config::load_default(),
    }
}

fn build_settings(config: &BanterConfig, args: &Args) -> ModelSettings {
    let model = &config.model;
    ModelSettings::new()
        .with_max_tokens(args.max_tokens.unwrap_or(model.max_tokens))
        .with_temperature(args.temperature.unwrap_or(model.temperature))
        .with_thinking(model.thinking && !args.no_thinking)
        .with_thinking_budget(args.thinking_budget.unwrap_or(model.thinking_budget))
}

fn build_backend(
    config: &BanterConfig,
    backend_override: Option<&str>,
) -> Result<Box<dyn StoreBackend>, BanterError> {
    let kind = match backend_override {
        Some("memory") => StoreBackendKind::Memory,
        Some("file") => StoreBackendKind::File,
        Some("http") => StoreBackendKind::Http,
        Some(other) => {
            return Err(
                ConfigError::ValidationError(format!("unknown backend: {other}")).into(),
            )
        }
        None => config.store.backend,
    };

    match kind {
        StoreBackendKind::Memory => Ok(Box::new(MemoryBackend::new())),
        StoreBackendKind::File => {
            let path = match &config.store.path {
                Some(path) => path.into(),
                None => FileBackend::default_path()?,
            };
            Ok(Box::new(FileBackend::new(path)))
        }
        StoreBackendKind::Http => {
            let base_url = config.store.base_url.as_deref().ok_or_else(|| {
                ConfigError::ValidationError("http backend requires store.base_url".into())
            })?;
            let token = std::env::var("BANTER_STORE_TOKEN").ok();
            Ok(Box::new(HttpBackend::new(
                base_url,
                config.store.collection.clone(),
                token,
            )?))
        }
    }
}

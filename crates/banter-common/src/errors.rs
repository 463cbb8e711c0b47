use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("unsupported attachment type: {0}")]
    UnsupportedType(String),
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("API error: {0}")]
    Api(String),

    #[error("rate limited")]
    RateLimited,

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("request timed out")]
    Timeout,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unknown session: {0}")]
    UnknownSession(String),

    #[error("no active session")]
    NoActiveSession,

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("remote store error: {0}")]
    Remote(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BanterError {
    #[error(transparent)]
    Attachment(#[from] AttachmentError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

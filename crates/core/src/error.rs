use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("Malformed amount: {0:?}")]
    MalformedAmount(String),
}

/// Failure reported by a feed collaborator while producing a page or a
/// receipt response.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Feed transport error: {0}")]
    Transport(String),
    #[error("Failed to decode feed payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Malformed feed record {id}: {reason}")]
    Record { id: String, reason: String },
    #[error("Unknown receipt key: {0}")]
    UnknownReceipt(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

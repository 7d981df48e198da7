use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Error, Debug)]
pub enum AgencyError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Credential error: {0}")]
    CredentialError(String),

    #[error("Registry error: {0}")]
    RegistryError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Failure taxonomy carried inside agent results. Nothing in a batch is
/// ever raised with one of these; they are recorded as data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownAgent,
    MissingParam,
    InvalidParam,
    RateLimited,
    Timeout,
    ProviderError,
    ParseError,
    DeadlineExceeded,
    UpstreamFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownAgent => "unknown_agent",
            ErrorKind::MissingParam => "missing_param",
            ErrorKind::InvalidParam => "invalid_param",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ProviderError => "provider_error",
            ErrorKind::ParseError => "parse_error",
            ErrorKind::DeadlineExceeded => "deadline_exceeded",
            ErrorKind::UpstreamFailed => "upstream_failed",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Conversion implementations for common error types
impl From<std::io::Error> for AgencyError {
    fn from(err: std::io::Error) -> Self {
        AgencyError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for AgencyError {
    fn from(err: serde_json::Error) -> Self {
        AgencyError::ParseError(err.to_string())
    }
}

impl From<toml::de::Error> for AgencyError {
    fn from(err: toml::de::Error) -> Self {
        AgencyError::ConfigError(err.to_string())
    }
}

impl From<reqwest::Error> for AgencyError {
    fn from(err: reqwest::Error) -> Self {
        AgencyError::NetworkError(err.to_string())
    }
}

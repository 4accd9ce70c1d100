use thiserror::Error;

use crate::descriptor::Format;

/// Errors that abort a single fetch. None of them leave a partial cache write.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Missing template parameter, unknown data kind, missing fixture file, or
    /// a data kind asked for an origin it has no location for.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The payload does not match the format the data kind declares.
    #[error("Parse error ({format}): {reason}")]
    Parse { format: Format, reason: String },

    /// The upstream call failed. `status` is `None` when no response arrived.
    #[error("Transport error (status {}): {body}", .status.map_or_else(|| "none".to_string(), |s| s.to_string()))]
    Transport { status: Option<u16>, body: String },

    /// The cache backend rejected a command.
    #[error("Cache store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        CacheError::Store(e.to_string())
    }
}

// The request URL carries the auth token in its query string.
impl From<reqwest::Error> for CacheError {
    fn from(e: reqwest::Error) -> Self {
        CacheError::Transport {
            status: e.status().map(|s| s.as_u16()),
            body: e.without_url().to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

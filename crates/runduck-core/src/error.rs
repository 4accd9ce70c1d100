use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunduckError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown environment: {name}")]
    UnknownEnvironment { name: String },
}

impl RunduckError {
    /// Short error code string, stable across message wording changes.
    pub fn code(&self) -> &'static str {
        match self {
            RunduckError::Config(_) => "CONFIG_ERROR",
            RunduckError::UnknownEnvironment { .. } => "UNKNOWN_ENVIRONMENT",
        }
    }
}

pub type Result<T> = std::result::Result<T, RunduckError>;

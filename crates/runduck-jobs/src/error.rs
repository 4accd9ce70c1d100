use runduck_cache::{CacheError, DataKind};
use runduck_core::RunduckError;
use runduck_schedule::ScheduleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobsError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Config(#[from] RunduckError),

    /// The payload parsed but does not have the shape the typed model needs.
    #[error("Decode error ({kind}): {reason}")]
    Decode { kind: DataKind, reason: String },
}

impl JobsError {
    pub(crate) fn decode(kind: DataKind, reason: impl std::fmt::Display) -> Self {
        JobsError::Decode {
            kind,
            reason: reason.to_string(),
        }
    }

    /// Short error code string for callers that map errors onto responses.
    pub fn code(&self) -> &'static str {
        match self {
            JobsError::Cache(CacheError::Configuration(_)) => "CONFIG_ERROR",
            JobsError::Cache(CacheError::Parse { .. }) | JobsError::Decode { .. } => "PARSE_ERROR",
            JobsError::Cache(CacheError::Transport { .. }) => "TRANSPORT_ERROR",
            JobsError::Cache(CacheError::Store(_)) | JobsError::Cache(CacheError::Io(_)) => {
                "STORE_ERROR"
            }
            JobsError::Schedule(_) => "NORMALIZATION_ERROR",
            JobsError::Config(e) => e.code(),
        }
    }
}

pub type Result<T> = std::result::Result<T, JobsError>;

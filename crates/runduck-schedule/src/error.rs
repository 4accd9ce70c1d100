use thiserror::Error;

/// Errors raised while turning a job schedule into something displayable.
///
/// None of these are fatal to a reconciliation pass: callers log them with
/// the job's context and keep going with a degraded record.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The cron expression could not be described in words.
    #[error("Cannot describe cron expression '{cron}': {reason}")]
    Description { cron: String, reason: String },

    /// The cron expression could not be evaluated.
    #[error("Invalid cron expression '{cron}': {reason}")]
    InvalidCron { cron: String, reason: String },

    /// A timestamp could not be parsed or the range is inverted.
    #[error("Invalid timestamp: {0}")]
    Timestamp(String),
}

pub type Result<T> = std::result::Result<T, ScheduleError>;

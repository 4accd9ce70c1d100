pub mod config;
pub mod error;
pub mod lookup;
pub mod types;

pub use config::{EnvironmentConfig, RunduckConfig, SourceMode};
pub use error::{Result, RunduckError};
pub use types::{DayField, Execution, Job, JobRecord, Origin, Project, ScheduleSpec, ScheduleTime};

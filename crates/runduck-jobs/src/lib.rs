//! `runduck-jobs`: reads every environment and reconciles the jobs into
//! one listing.
//!
//! [`JobService`] is the entry point: it walks each configured environment
//! through the cache ([`reader`]), links the same logical job across
//! environments ([`reconcile`]) and serves the stored result along with
//! per-job details and the last execution.

pub mod error;
pub mod reader;
pub mod reconcile;
pub mod service;

pub use error::{JobsError, Result};
pub use reader::{read_all_environments, read_environment, EnvironmentSnapshot, ReadOptions};
pub use reconcile::{find_parent, project_job, reconcile};
pub use service::{JobDetails, JobService};

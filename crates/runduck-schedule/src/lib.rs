//! `runduck-schedule`: turns orchestrator schedules into standard cron.
//!
//! # Overview
//!
//! The orchestrator exports schedules as a nested structure rather than a
//! cron string. [`cron::to_cron`] flattens it into a 5-field expression,
//! splitting hour ranges that wrap past midnight, and the rest of the crate
//! derives what the listing shows next to each job.
//!
//! | Function                        | Produces                                  |
//! |---------------------------------|-------------------------------------------|
//! | [`to_cron`]                     | `minute hour dayofmonth month weekday`    |
//! | [`convert_hour_range`]          | `"9-8"` → `"9-23,0-8"`                    |
//! | [`describe`]                    | English sentence, or the raw cron         |
//! | [`next_execution`]              | Next UTC instant after a reference time   |
//! | [`elapsed`]                     | `"1h 07m 12s"` between two instants       |

pub mod cron;
pub mod describe;
pub mod error;
pub mod schedule;

pub use cron::{convert_hour_range, to_cron};
pub use describe::{describe, CronDescriber, EnglishDescriber};
pub use error::{Result, ScheduleError};
pub use schedule::{elapsed, next_execution, parse_instant};

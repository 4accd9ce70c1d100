use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Where the data returned by one read was actually produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// The orchestrator HTTP API.
    Live,
    /// Sample files on the local filesystem.
    Fixture,
    /// The shared cache.
    Cache,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Origin::Live => "live",
            Origin::Fixture => "fixture",
            Origin::Cache => "cache",
        };
        write!(f, "{s}")
    }
}

/// A project as listed by one environment, with its merged jobs attached by
/// the environment reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
    #[serde(default)]
    pub jobs: Vec<Job>,
}

/// A job as seen by one environment: list entry, metadata and definition
/// merged into a single record.
///
/// `id` is local to the environment; `uuid` survives promotion between
/// environments. Fields the reconciliation does not use stay in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub group: String,
    pub name: String,
    #[serde(default)]
    pub schedule_enabled: Option<bool>,
    #[serde(default)]
    pub execution_enabled: Option<bool>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default)]
    pub schedule: Option<ScheduleSpec>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Structured schedule as exported by the orchestrator.
///
/// Values are kept as raw strings and are not validated here; a malformed
/// field only surfaces once the cron expression is described or evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSpec {
    #[serde(default)]
    pub time: Option<ScheduleTime>,
    #[serde(default, deserialize_with = "opt_scalar")]
    pub month: Option<String>,
    #[serde(default)]
    pub dayofmonth: Option<DayField>,
    #[serde(default)]
    pub weekday: Option<DayField>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTime {
    #[serde(default, deserialize_with = "opt_scalar")]
    pub minute: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar")]
    pub hour: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar")]
    pub seconds: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayField {
    #[serde(default, deserialize_with = "opt_scalar")]
    pub day: Option<String>,
}

/// One reconciled job in the combined listing.
///
/// Only a fixed whitelist of [`Job`] fields is carried over; everything else
/// from the upstream payload is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// `{env}.{native_id}`, unique across all environments.
    pub id: String,
    pub uuid: Option<String>,
    pub group: String,
    pub name: String,
    #[serde(rename = "scheduleEnabled")]
    pub schedule_enabled: Option<bool>,
    #[serde(rename = "executionEnabled")]
    pub execution_enabled: Option<bool>,
    pub description: String,
    pub permalink: Option<String>,
    pub project_name: String,
    pub project_description: String,
    pub project_url: String,
    pub env: String,
    pub env_order: usize,
    pub cron: String,
    pub schedule_description: String,
    /// `id` of the earlier record this one was matched to, or `None` for a
    /// lineage root.
    #[serde(rename = "parentId")]
    pub parent_id: Option<String>,
    pub sortkey: String,
}

/// Summary of the most recent run of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    #[serde(rename = "startedAt")]
    pub started_at: String,
    #[serde(rename = "endedAt")]
    pub ended_at: Option<String>,
    /// `None` while the execution is still running.
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// YAML exports quote most schedule fields but not all of them; accept bare
// numbers too. Anything else is kept as its JSON text so that it surfaces when
// the cron is described or evaluated, not while reading.
fn opt_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Ok(Some(other.to_string())),
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CacheError, Result};

/// Serialization format of a data kind, for both the upstream and fixtures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Parse raw bytes into a loose JSON value.
    pub fn parse(self, bytes: &[u8]) -> Result<Value> {
        match self {
            Format::Json => serde_json::from_slice(bytes).map_err(|e| CacheError::Parse {
                format: self,
                reason: e.to_string(),
            }),
            Format::Yaml => serde_yaml::from_slice(bytes).map_err(|e| CacheError::Parse {
                format: self,
                reason: e.to_string(),
            }),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Json => write!(f, "json"),
            Format::Yaml => write!(f, "yaml"),
        }
    }
}

/// Where one data kind lives in each origin.
///
/// Templates take `{env}`, `{project}` and `{jobid}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub format: Format,
    /// API path appended to the environment's base URL.
    pub live: Option<&'static str>,
    /// File name under the sample-data root.
    pub fixture: Option<&'static str>,
    pub cache_key: &'static str,
    pub cache_field: &'static str,
}

const PROJECTS: Descriptor = Descriptor {
    format: Format::Json,
    live: Some("/api/1/projects"),
    fixture: Some("{env}.projects.json"),
    cache_key: "runduck:{env}",
    cache_field: "projects",
};

const JOBS: Descriptor = Descriptor {
    format: Format::Json,
    live: Some("/api/14/project/{project}/jobs"),
    fixture: Some("{env}.project.{project}.jobs.json"),
    cache_key: "runduck:{env}:projects:{project}",
    cache_field: "jobs",
};

const JOB_METADATA: Descriptor = Descriptor {
    format: Format::Json,
    live: Some("/api/18/job/{jobid}/info"),
    fixture: Some("{env}.job.{jobid}.metadata.json"),
    cache_key: "runduck:{env}:jobs:{jobid}",
    cache_field: "metadata",
};

const JOB_DEFINITION: Descriptor = Descriptor {
    format: Format::Yaml,
    live: Some("/api/1/job/{jobid}"),
    fixture: Some("{env}.job.{jobid}.definition.yaml"),
    cache_key: "runduck:{env}:jobs:{jobid}",
    cache_field: "definition",
};

const JOB_EXECUTIONS: Descriptor = Descriptor {
    format: Format::Json,
    live: Some("/api/18/job/{jobid}/executions"),
    fixture: Some("{env}.job.{jobid}.executions.json"),
    cache_key: "runduck:{env}:jobs:{jobid}",
    cache_field: "executions",
};

const PROJECT_MERGED: Descriptor = Descriptor {
    format: Format::Json,
    live: None,
    fixture: None,
    cache_key: "runduck:{env}:projects:{project}",
    cache_field: "merged",
};

// Cache only: written by a reconciliation pass.
const COMBINED: Descriptor = Descriptor {
    format: Format::Json,
    live: None,
    fixture: None,
    cache_key: "runduck:all",
    cache_field: "combined",
};

/// A named category of fetchable data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Projects,
    Jobs,
    JobMetadata,
    JobDefinition,
    JobExecutions,
    /// Per-project job list with metadata and definition merged in.
    ProjectMerged,
    /// The reconciled listing across all environments.
    Combined,
}

impl DataKind {
    pub const ALL: [DataKind; 7] = [
        DataKind::Projects,
        DataKind::Jobs,
        DataKind::JobMetadata,
        DataKind::JobDefinition,
        DataKind::JobExecutions,
        DataKind::ProjectMerged,
        DataKind::Combined,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DataKind::Projects => "projects",
            DataKind::Jobs => "jobs",
            DataKind::JobMetadata => "job.metadata",
            DataKind::JobDefinition => "job.definition",
            DataKind::JobExecutions => "job.executions",
            DataKind::ProjectMerged => "project.merged",
            DataKind::Combined => "combined",
        }
    }

    pub fn descriptor(self) -> &'static Descriptor {
        match self {
            DataKind::Projects => &PROJECTS,
            DataKind::Jobs => &JOBS,
            DataKind::JobMetadata => &JOB_METADATA,
            DataKind::JobDefinition => &JOB_DEFINITION,
            DataKind::JobExecutions => &JOB_EXECUTIONS,
            DataKind::ProjectMerged => &PROJECT_MERGED,
            DataKind::Combined => &COMBINED,
        }
    }

    /// Kinds that can be filled from the upstream or fixtures on a miss.
    pub fn is_fetchable(self) -> bool {
        !matches!(self, DataKind::ProjectMerged | DataKind::Combined)
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        DataKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| CacheError::Configuration(format!("unknown data kind '{s}'")))
    }
}

/// Check the registry once at startup: every kind needs a cache location,
/// and every fetchable kind needs both a live and a fixture location.
pub fn validate_registry() -> Result<()> {
    for kind in DataKind::ALL {
        let d = kind.descriptor();
        if d.cache_key.is_empty() || d.cache_field.is_empty() {
            return Err(CacheError::Configuration(format!(
                "data kind '{kind}' has no cache location"
            )));
        }
        if kind.is_fetchable() && (d.live.is_none() || d.fixture.is_none()) {
            return Err(CacheError::Configuration(format!(
                "data kind '{kind}' is fetchable but lacks a live or fixture location"
            )));
        }
    }
    Ok(())
}

use runduck_cache::{DataAccessor, DataKind, Params};
use runduck_core::{Job, Project};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{JobsError, Result};

/// How an environment read treats the cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Skip cached values for every fetch in the walk, project list included.
    pub force_refresh: bool,
    /// Write each project's merged job list back under its project key.
    pub persist_merged: bool,
}

/// One environment's project tree, tagged with its precedence.
#[derive(Debug, Clone)]
pub struct EnvironmentSnapshot {
    pub env: String,
    pub env_order: usize,
    pub projects: Vec<Project>,
}

/// Walk projects → jobs → metadata → definition for one environment.
///
/// Each fetch is awaited before the next one; the first failure aborts the
/// walk and nothing partial is returned.
pub async fn read_environment(accessor: &DataAccessor, options: ReadOptions) -> Result<Vec<Project>> {
    let env = accessor.env().map(|e| e.name.as_str()).unwrap_or_default();
    let listing = accessor
        .get(DataKind::Projects, &Params::new(), options.force_refresh)
        .await?
        .data;
    let entries = as_array(DataKind::Projects, listing)?;
    let total = entries.len();

    let mut projects = Vec::with_capacity(total);
    for (i, entry) in entries.into_iter().enumerate() {
        let mut project: Project = serde_json::from_value(entry)
            .map_err(|e| JobsError::decode(DataKind::Projects, e))?;
        info!(env, project = %project.name, index = i + 1, total, "reading project jobs");

        let params = Params::new().project(&project.name);
        let listing = accessor.get(DataKind::Jobs, &params, options.force_refresh).await?.data;

        for base in as_array(DataKind::Jobs, listing)? {
            let job = read_job(accessor, base, options.force_refresh).await?;
            project.jobs.push(job);
        }

        if options.persist_merged {
            accessor.set(DataKind::ProjectMerged, &project.jobs, &params).await?;
        }
        projects.push(project);
    }

    info!(env, projects = projects.len(), "environment read");
    Ok(projects)
}

/// Read every accessor in order; the position of an accessor is its
/// environment's `env_order`.
pub async fn read_all_environments(
    accessors: &[DataAccessor],
    options: ReadOptions,
) -> Result<Vec<EnvironmentSnapshot>> {
    let mut snapshots = Vec::with_capacity(accessors.len());
    for (env_order, accessor) in accessors.iter().enumerate() {
        let env = accessor
            .env()
            .map(|e| e.name.clone())
            .unwrap_or_default();
        let projects = read_environment(accessor, options).await?;
        snapshots.push(EnvironmentSnapshot {
            env,
            env_order,
            projects,
        });
    }
    Ok(snapshots)
}

/// Fetch metadata and definition for one job and merge them onto `base`.
async fn read_job(accessor: &DataAccessor, base: Value, force_refresh: bool) -> Result<Job> {
    let Value::Object(merged) = base else {
        return Err(JobsError::decode(DataKind::Jobs, "job entry is not an object"));
    };
    let jobid = match merged.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => return Err(JobsError::decode(DataKind::Jobs, "job entry has no id")),
    };
    debug!(jobid = %jobid, "reading job details");

    let merged = merge_details(accessor, merged, &jobid, force_refresh).await?;
    serde_json::from_value(Value::Object(merged))
        .map_err(|e| JobsError::decode(DataKind::JobDefinition, e))
}

/// Merge metadata then definition for `jobid` onto `target`. Used by both
/// the environment walk and job details.
pub(crate) async fn merge_details(
    accessor: &DataAccessor,
    mut target: Map<String, Value>,
    jobid: &str,
    force_refresh: bool,
) -> Result<Map<String, Value>> {
    let params = Params::new().job(jobid);
    let metadata = accessor.get(DataKind::JobMetadata, &params, force_refresh).await?.data;
    merge_into(&mut target, DataKind::JobMetadata, metadata)?;

    let definition = accessor.get(DataKind::JobDefinition, &params, force_refresh).await?.data;
    merge_into(&mut target, DataKind::JobDefinition, first_document(definition))?;

    // Numeric ids from YAML would not decode into the string field.
    if let Some(Value::Number(id)) = target.get("id") {
        let id = id.to_string();
        target.insert("id".to_string(), Value::String(id));
    }
    Ok(target)
}

/// Shallow merge: keys of `source` overwrite keys of `target`.
pub fn merge_into(target: &mut Map<String, Value>, kind: DataKind, source: Value) -> Result<()> {
    match source {
        Value::Object(fields) => {
            target.extend(fields);
            Ok(())
        }
        Value::Null => Ok(()),
        other => Err(JobsError::decode(
            kind,
            format!("expected an object to merge, got {}", type_name(&other)),
        )),
    }
}

/// A definition export is a list of documents; only the first describes the
/// job. An empty list contributes nothing.
fn first_document(definition: Value) -> Value {
    match definition {
        Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
        other => other,
    }
}

fn as_array(kind: DataKind, value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(JobsError::decode(
            kind,
            format!("expected a list, got {}", type_name(&other)),
        )),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

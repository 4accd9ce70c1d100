use std::sync::Arc;

use chrono::Utc;
use runduck_cache::{
    validate_registry, CacheStore, DataAccessor, DataKind, Fetched, LiveSource, Params,
};
use runduck_core::lookup::{get_path, get_str};
use runduck_core::{Execution, Job, JobRecord, RunduckConfig};
use runduck_schedule::{elapsed, next_execution, to_cron, CronDescriber};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::{JobsError, Result};
use crate::reader::{merge_details, read_all_environments, ReadOptions};
use crate::reconcile::reconcile;

/// One job in one environment with everything the orchestrator knows about
/// it, plus the derived schedule fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobDetails {
    pub env: String,
    #[serde(flatten)]
    pub job: Job,
    pub cron: String,
    pub schedule_description: String,
    /// RFC 3339, `None` for unscheduled jobs or unparseable schedules.
    pub next_execution: Option<String>,
}

const DERIVED_FIELDS: [&str; 4] = ["env", "cron", "schedule_description", "next_execution"];

/// Entry point for everything runduck exposes.
///
/// Holds the immutable config and the shared store, source and describer;
/// accessors are built per call from those.
pub struct JobService {
    config: RunduckConfig,
    store: Arc<dyn CacheStore>,
    source: Arc<dyn LiveSource>,
    describer: Arc<dyn CronDescriber>,
    persist_merged: bool,
}

impl JobService {
    pub fn new(
        config: RunduckConfig,
        store: Arc<dyn CacheStore>,
        source: Arc<dyn LiveSource>,
        describer: Arc<dyn CronDescriber>,
    ) -> Result<Self> {
        validate_registry()?;
        config.validate()?;
        Ok(Self {
            config,
            store,
            source,
            describer,
            persist_merged: false,
        })
    }

    /// Also write each project's merged job list to the cache while reading.
    pub fn with_merged_projection(mut self, enabled: bool) -> Self {
        self.persist_merged = enabled;
        self
    }

    pub fn config(&self) -> &RunduckConfig {
        &self.config
    }

    /// Accessor bound to a configured environment.
    pub fn accessor(&self, env: &str) -> Result<DataAccessor> {
        let (_, environment) = self.config.environment(env)?;
        Ok(DataAccessor::new(
            environment.clone(),
            self.store.clone(),
            self.source.clone(),
        ))
    }

    fn global(&self) -> DataAccessor {
        DataAccessor::global(self.store.clone(), self.source.clone())
    }

    /// Raw cache-or-fetch of one data kind. `env` may only be `None` for
    /// cross-environment kinds.
    pub async fn get_data(
        &self,
        env: Option<&str>,
        kind: DataKind,
        params: &Params,
        force_refresh: bool,
    ) -> Result<Fetched> {
        let accessor = match env {
            Some(env) => self.accessor(env)?,
            None => self.global(),
        };
        Ok(accessor.get(kind, params, force_refresh).await?)
    }

    /// Read every environment, reconcile, and store the listing as the
    /// combined document.
    pub async fn combine_data(&self, force_refresh: bool) -> Result<Vec<JobRecord>> {
        let accessors = self
            .config
            .environments
            .iter()
            .map(|env| DataAccessor::new(env.clone(), self.store.clone(), self.source.clone()))
            .collect::<Vec<_>>();
        let options = ReadOptions {
            force_refresh,
            persist_merged: self.persist_merged,
        };

        let snapshots = read_all_environments(&accessors, options).await?;
        let records = reconcile(&snapshots, self.describer.as_ref());
        self.global()
            .set(DataKind::Combined, &records, &Params::new())
            .await?;

        info!(
            environments = snapshots.len(),
            jobs = records.len(),
            force_refresh,
            "combined listing stored"
        );
        Ok(records)
    }

    /// The last stored combined listing, if a combine pass has run.
    pub async fn get_jobs(&self) -> Result<Option<Vec<JobRecord>>> {
        let Some(value) = self.global().cached(DataKind::Combined, &Params::new()).await? else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| JobsError::decode(DataKind::Combined, e))
    }

    /// Metadata and definition of one job merged, with its schedule derived.
    pub async fn get_job_details(
        &self,
        env: &str,
        job_id: &str,
        force_refresh: bool,
    ) -> Result<JobDetails> {
        let accessor = self.accessor(env)?;
        let merged = merge_details(&accessor, Map::new(), job_id, force_refresh).await?;
        let mut job: Job = serde_json::from_value(Value::Object(merged))
            .map_err(|e| JobsError::decode(DataKind::JobDefinition, e))?;
        // Upstream keys must not shadow the derived fields once flattened.
        for key in DERIVED_FIELDS {
            job.extra.remove(key);
        }

        let cron = to_cron(job.schedule.as_ref());
        let schedule_description = if cron.is_empty() {
            String::new()
        } else {
            runduck_schedule::describe(self.describer.as_ref(), &cron)
        };
        let next_execution = match next_execution(&cron, Utc::now()) {
            Ok(next) => next.map(|dt| dt.to_rfc3339()),
            Err(e) => {
                warn!(env, job_id, error = %e, "cannot compute next execution");
                None
            }
        };

        Ok(JobDetails {
            env: env.to_string(),
            job,
            cron,
            schedule_description,
            next_execution,
        })
    }

    /// Start, end and duration of the newest execution of a job.
    ///
    /// `None` when the job never ran. A running execution has no end and no
    /// duration.
    pub async fn get_last_execution(
        &self,
        env: &str,
        job_id: &str,
        force_refresh: bool,
    ) -> Result<Option<Execution>> {
        let accessor = self.accessor(env)?;
        let params = Params::new().job(job_id).query("max", "1");
        let history = accessor
            .get(DataKind::JobExecutions, &params, force_refresh)
            .await?
            .data;
        last_execution(&history)
    }

    /// Delete every cache key matching a glob, e.g. `runduck:qa*`.
    pub async fn clear_cache(&self, pattern: &str) -> Result<usize> {
        let removed = self.global().clear_pattern(pattern).await?;
        info!(pattern, removed, "cache cleared");
        Ok(removed)
    }
}

fn last_execution(history: &Value) -> Result<Option<Execution>> {
    if get_path(history, "executions.0").is_none() {
        return Ok(None);
    }
    let started_at = get_str(history, "executions.0.date-started.date").ok_or_else(|| {
        JobsError::decode(DataKind::JobExecutions, "execution has no start date")
    })?;
    let ended_at = get_str(history, "executions.0.date-ended.date");
    let duration = ended_at.map(|end| elapsed(started_at, end)).transpose()?;

    Ok(Some(Execution {
        started_at: started_at.to_string(),
        ended_at: ended_at.map(String::from),
        duration,
        status: get_str(history, "executions.0.status").map(String::from),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use runduck_cache::{CacheError, FixtureSource, MemoryStore};
    use runduck_core::{EnvironmentConfig, Origin};
    use runduck_schedule::EnglishDescriber;
    use serde_json::json;

    const QA_CLEANUP: &str = "a694aa5e-5b1c-4d2e-9f00-3c1d2b7e8f01";

    fn sample_data() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../sampledata")
    }

    fn config() -> RunduckConfig {
        RunduckConfig {
            environments: vec![
                EnvironmentConfig::new("qa", "", ""),
                EnvironmentConfig::new("prod", "", ""),
            ],
            ..Default::default()
        }
    }

    fn service_with(root: &Path, store: Arc<MemoryStore>) -> JobService {
        JobService::new(
            config(),
            store,
            Arc::new(FixtureSource::new(root)),
            Arc::new(EnglishDescriber),
        )
        .unwrap()
    }

    fn service() -> JobService {
        service_with(&sample_data(), Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn qa_and_prod_cleanup_form_one_lineage() {
        let service = service();
        let records = service.combine_data(false).await.unwrap();

        let cleanup: Vec<_> = records.iter().filter(|r| r.name == "cleanup").collect();
        assert_eq!(cleanup.len(), 2);
        let (qa, prod) = (cleanup[0], cleanup[1]);
        assert_eq!((qa.env.as_str(), qa.env_order), ("qa", 0));
        assert_eq!((prod.env.as_str(), prod.env_order), ("prod", 1));
        assert_ne!(qa.uuid, prod.uuid);
        assert_eq!(qa.parent_id, None);
        assert_eq!(prod.parent_id.as_deref(), Some(qa.id.as_str()));
        assert_eq!(qa.sortkey, "Admin maintenance cleanup 0");
        assert_eq!(prod.sortkey, "Admin maintenance cleanup 1");
    }

    #[tokio::test]
    async fn combine_stores_the_listing() {
        let service = service();
        assert_eq!(service.get_jobs().await.unwrap(), None);

        let records = service.combine_data(false).await.unwrap();
        assert_eq!(service.get_jobs().await.unwrap(), Some(records.clone()));

        let raw = service
            .get_data(None, DataKind::Combined, &Params::new(), false)
            .await
            .unwrap();
        assert_eq!(raw.origin, Origin::Cache);
        assert_eq!(raw.data.as_array().map(Vec::len), Some(records.len()));
    }

    #[tokio::test]
    async fn combine_derives_schedules() {
        let records = service().combine_data(false).await.unwrap();
        let qa = records.iter().find(|r| r.id == format!("qa.{QA_CLEANUP}")).unwrap();
        assert_eq!(qa.cron, "0 7-23/1,0-2/1 * * *");
        assert!(!qa.schedule_description.is_empty());
        assert_eq!(qa.project_url, "http://rundeck.qa.example.com/api/14/project/Admin");

        let backup = records.iter().find(|r| r.name == "nightly-backup").unwrap();
        assert_eq!(backup.cron, "30 23 * * *");
        assert_eq!(backup.sortkey, "Admin maintenance backup 1");

        let report = records.iter().find(|r| r.name == "weekly-report").unwrap();
        assert_eq!(report.parent_id, None);
        assert_eq!(report.project_description, "");
    }

    #[tokio::test]
    async fn malformed_schedule_does_not_abort_combine() {
        let dir = tempfile::tempdir().unwrap();
        let files = [
            ("qa.projects.json", r#"[{"name": "Ops", "description": "Ops jobs"}]"#),
            (
                "qa.project.Ops.jobs.json",
                r#"[{"id": "good", "name": "good", "group": "g"},
                    {"id": "bad", "name": "bad", "group": "g"}]"#,
            ),
            ("qa.job.good.metadata.json", r#"{"uuid": "good"}"#),
            (
                "qa.job.good.definition.yaml",
                "- name: good\n  schedule:\n    time:\n      hour: '6'\n      minute: '0'\n",
            ),
            ("qa.job.bad.metadata.json", r#"{"uuid": "bad"}"#),
            (
                "qa.job.bad.definition.yaml",
                "- name: bad\n  schedule:\n    time:\n      hour: [1, 2]\n      minute: '0'\n",
            ),
            ("prod.projects.json", "[]"),
        ];
        for (name, body) in files {
            std::fs::write(dir.path().join(name), body).unwrap();
        }

        let service = service_with(dir.path(), Arc::new(MemoryStore::new()));
        let records = service.combine_data(false).await.unwrap();
        assert_eq!(records.len(), 2);

        let good = records.iter().find(|r| r.name == "good").unwrap();
        assert_eq!(good.cron, "0 6 * * *");
        assert_ne!(good.schedule_description, good.cron);

        let bad = records.iter().find(|r| r.name == "bad").unwrap();
        assert_eq!(bad.cron, "0 [1,2] * * *");
        assert_eq!(bad.schedule_description, bad.cron);

        assert_eq!(service.get_jobs().await.unwrap(), Some(records));
    }

    #[tokio::test]
    async fn merged_projection_is_written_when_enabled() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with(&sample_data(), store.clone()).with_merged_projection(true);
        service.combine_data(false).await.unwrap();
        assert!(store.hget("runduck:prod:projects:Admin", "merged").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn job_details_merge_and_derive() {
        let details = service()
            .get_job_details("qa", QA_CLEANUP, false)
            .await
            .unwrap();
        assert_eq!(details.env, "qa");
        assert_eq!(details.job.name, "cleanup");
        assert_eq!(details.cron, "0 7-23/1,0-2/1 * * *");
        assert!(details.next_execution.is_some());

        let value = serde_json::to_value(&details).unwrap();
        assert_eq!(value["name"], "cleanup");
        assert_eq!(value["loglevel"], "INFO");
    }

    #[tokio::test]
    async fn job_details_fields_win_over_upstream_keys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("qa.job.j1.metadata.json"),
            r#"{"id": "j1", "name": "sync", "env": "upstream", "cron": "bogus"}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("qa.job.j1.definition.yaml"),
            "- name: sync\n  next_execution: never\n  schedule:\n    time:\n      hour: '4'\n      minute: '15'\n",
        )
        .unwrap();

        let service = service_with(dir.path(), Arc::new(MemoryStore::new()));
        let details = service.get_job_details("qa", "j1", false).await.unwrap();
        for key in DERIVED_FIELDS {
            assert!(!details.job.extra.contains_key(key), "{key} left in extra");
        }

        let text = serde_json::to_string(&details).unwrap();
        assert_eq!(text.matches("\"env\":").count(), 1);
        assert_eq!(text.matches("\"cron\":").count(), 1);
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["env"], "qa");
        assert_eq!(value["cron"], "15 4 * * *");
        assert_ne!(value["next_execution"], "never");
    }

    #[tokio::test]
    async fn last_execution_comes_from_history() {
        let execution = service()
            .get_last_execution("qa", QA_CLEANUP, true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(execution.started_at, "2020-04-19T22:05:00Z");
        assert_eq!(execution.ended_at.as_deref(), Some("2020-04-19T23:12:12Z"));
        assert_eq!(execution.duration.as_deref(), Some("1h 07m 12s"));
        assert_eq!(execution.status.as_deref(), Some("succeeded"));
    }

    #[test]
    fn last_execution_shapes() {
        assert_eq!(last_execution(&json!({"executions": []})).unwrap(), None);

        let running = last_execution(&json!({
            "executions": [{"status": "running", "date-started": {"date": "2020-04-19T22:05:00Z"}}]
        }))
        .unwrap()
        .unwrap();
        assert_eq!(running.ended_at, None);
        assert_eq!(running.duration, None);

        let err = last_execution(&json!({"executions": [{"status": "running"}]})).unwrap_err();
        assert!(matches!(err, JobsError::Decode { .. }));
    }

    #[tokio::test]
    async fn clear_cache_forces_the_next_read_to_the_source() {
        let service = service();
        service.combine_data(false).await.unwrap();
        assert!(service.clear_cache("runduck:*").await.unwrap() > 0);
        assert_eq!(service.get_jobs().await.unwrap(), None);

        let fetched = service
            .get_data(Some("qa"), DataKind::Projects, &Params::new(), false)
            .await
            .unwrap();
        assert_eq!(fetched.origin, Origin::Fixture);
    }

    #[tokio::test]
    async fn unknown_environment_is_rejected() {
        let err = service()
            .get_job_details("staging", "x", false)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_ENVIRONMENT");
    }

    #[tokio::test]
    async fn get_data_reports_origin() {
        let service = service();
        let first = service
            .get_data(Some("prod"), DataKind::Projects, &Params::new(), false)
            .await
            .unwrap();
        assert_eq!(first.origin, Origin::Fixture);
        let second = service
            .get_data(Some("prod"), DataKind::Projects, &Params::new(), false)
            .await
            .unwrap();
        assert_eq!(second.origin, Origin::Cache);

        let err = service
            .get_data(Some("prod"), DataKind::Jobs, &Params::new(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, JobsError::Cache(CacheError::Configuration(_))));
    }
}

use std::sync::Arc;

use runduck_core::{EnvironmentConfig, Origin};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::descriptor::{DataKind, Format};
use crate::error::{CacheError, Result};
use crate::source::LiveSource;
use crate::store::CacheStore;
use crate::template::{render, Params};

/// Data returned by one read, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fetched {
    pub origin: Origin,
    pub data: Value,
}

/// Cache-or-fetch access to one environment's data.
///
/// Cheap to clone: the store and source are shared.
#[derive(Clone)]
pub struct DataAccessor {
    env: Option<EnvironmentConfig>,
    store: Arc<dyn CacheStore>,
    source: Arc<dyn LiveSource>,
}

impl DataAccessor {
    pub fn new(
        env: EnvironmentConfig,
        store: Arc<dyn CacheStore>,
        source: Arc<dyn LiveSource>,
    ) -> Self {
        Self {
            env: Some(env),
            store,
            source,
        }
    }

    /// Accessor for cross-environment kinds such as [`DataKind::Combined`].
    /// Any template that needs `{env}` fails to resolve through it.
    pub fn global(store: Arc<dyn CacheStore>, source: Arc<dyn LiveSource>) -> Self {
        Self {
            env: None,
            store,
            source,
        }
    }

    pub fn env(&self) -> Option<&EnvironmentConfig> {
        self.env.as_ref()
    }

    fn env_name(&self) -> Option<&str> {
        self.env.as_ref().map(|e| e.name.as_str())
    }

    /// Resolve the cache key and field of `kind` for `params`.
    pub fn location(&self, kind: DataKind, params: &Params) -> Result<(String, String)> {
        let d = kind.descriptor();
        let key = render(d.cache_key, self.env_name(), params)?;
        let field = render(d.cache_field, self.env_name(), params)?;
        Ok((key, field))
    }

    /// Cache-or-fetch.
    ///
    /// Unless `force_refresh` is set, a present non-null cached value wins.
    /// Otherwise the live source is asked and its answer written through to
    /// the cache before being returned, forced refresh included.
    pub async fn get(&self, kind: DataKind, params: &Params, force_refresh: bool) -> Result<Fetched> {
        if !force_refresh {
            if let Some(data) = self.cached(kind, params).await? {
                debug!(env = ?self.env_name(), %kind, "cache hit");
                return Ok(Fetched {
                    origin: Origin::Cache,
                    data,
                });
            }
        }

        // Resolve the cache location first so a bad parameter fails before
        // any upstream traffic.
        let (key, field) = self.location(kind, params)?;
        let data = self.source.fetch(kind, self.env.as_ref(), params).await?;
        self.write(&key, &field, &data).await?;

        let origin = self.source.origin();
        debug!(env = ?self.env_name(), %kind, %origin, force_refresh, "fetched and cached");
        Ok(Fetched { origin, data })
    }

    /// Cache-only read. Absent, empty and `null` values are all a miss.
    pub async fn cached(&self, kind: DataKind, params: &Params) -> Result<Option<Value>> {
        let (key, field) = self.location(kind, params)?;
        let Some(raw) = self.store.hget(&key, &field).await? else {
            return Ok(None);
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Null) => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                // Unreadable entries are refetched rather than surfaced.
                warn!(%key, %field, error = %e, "discarding unreadable cache entry");
                Ok(None)
            }
        }
    }

    /// Unconditional cache write.
    pub async fn set<T>(&self, kind: DataKind, value: &T, params: &Params) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let (key, field) = self.location(kind, params)?;
        self.write(&key, &field, value).await
    }

    /// Remove the resolved key of `kind`, including the other kinds cached
    /// as fields under it.
    pub async fn clear(&self, kind: DataKind, params: &Params) -> Result<()> {
        let (key, _) = self.location(kind, params)?;
        self.store.delete(&key).await?;
        debug!(%key, "cache key cleared");
        Ok(())
    }

    /// Remove every key matching a glob pattern, e.g. `runduck:qa*`.
    pub async fn clear_pattern(&self, pattern: &str) -> Result<usize> {
        self.store.delete_matching(pattern).await
    }

    async fn write<T>(&self, key: &str, field: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let encoded = serde_json::to_string(value).map_err(|e| CacheError::Parse {
            format: Format::Json,
            reason: e.to_string(),
        })?;
        self.store.hset(key, field, &encoded).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureSource;
    use crate::store::MemoryStore;
    use serde_json::json;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<MemoryStore>,
        accessor: DataAccessor,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("qa.projects.json"),
            r#"[{"name": "Admin", "description": "Admin jobs"}]"#,
        )
        .unwrap();
        let store = Arc::new(MemoryStore::new());
        let accessor = DataAccessor::new(
            EnvironmentConfig::new("qa", "", ""),
            store.clone(),
            Arc::new(FixtureSource::new(dir.path())),
        );
        Fixture {
            _dir: dir,
            store,
            accessor,
        }
    }

    #[tokio::test]
    async fn miss_fetches_then_hits_cache() {
        let f = fixture();
        f.accessor.clear(DataKind::Projects, &Params::new()).await.unwrap();

        let first = f.accessor.get(DataKind::Projects, &Params::new(), false).await.unwrap();
        assert_eq!(first.origin, Origin::Fixture);

        let second = f.accessor.get(DataKind::Projects, &Params::new(), false).await.unwrap();
        assert_eq!(second.origin, Origin::Cache);
        assert_eq!(first.data, second.data);
    }

    #[tokio::test]
    async fn set_then_get_returns_cached_value() {
        let f = fixture();
        let value = json!([{"name": "Ops"}]);
        f.accessor.set(DataKind::Projects, &value, &Params::new()).await.unwrap();

        let got = f.accessor.get(DataKind::Projects, &Params::new(), false).await.unwrap();
        assert_eq!(got, Fetched { origin: Origin::Cache, data: value });

        f.accessor.clear(DataKind::Projects, &Params::new()).await.unwrap();
        let got = f.accessor.get(DataKind::Projects, &Params::new(), false).await.unwrap();
        assert_ne!(got.origin, Origin::Cache);
        assert_eq!(got.data[0]["name"], "Admin");
    }

    #[tokio::test]
    async fn force_refresh_bypasses_and_rewrites_cache() {
        let f = fixture();
        f.accessor
            .set(DataKind::Projects, &json!([{"name": "Stale"}]), &Params::new())
            .await
            .unwrap();

        let got = f.accessor.get(DataKind::Projects, &Params::new(), true).await.unwrap();
        assert_eq!(got.origin, Origin::Fixture);
        assert_eq!(got.data[0]["name"], "Admin");

        let cached = f.accessor.cached(DataKind::Projects, &Params::new()).await.unwrap();
        assert_eq!(cached, Some(got.data));
    }

    #[tokio::test]
    async fn tombstones_are_misses() {
        let f = fixture();
        for tombstone in ["", "null", "  "] {
            f.store.hset("runduck:qa", "projects", tombstone).await.unwrap();
            let got = f.accessor.get(DataKind::Projects, &Params::new(), false).await.unwrap();
            assert_eq!(got.origin, Origin::Fixture);
        }
    }

    #[tokio::test]
    async fn failed_fetch_leaves_cache_untouched() {
        let f = fixture();
        let params = Params::new().project("Missing");
        let err = f.accessor.get(DataKind::Jobs, &params, false).await.unwrap_err();
        assert!(matches!(err, CacheError::Configuration(_)));
        assert!(f.store.hget("runduck:qa:projects:Missing", "jobs").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_parameter_fails_before_fetching() {
        let f = fixture();
        let err = f.accessor.get(DataKind::JobMetadata, &Params::new(), true).await.unwrap_err();
        assert!(matches!(err, CacheError::Configuration(ref m) if m.contains("jobid")));
    }

    #[tokio::test]
    async fn clear_removes_the_whole_job_key() {
        let f = fixture();
        let job = Params::new().job("abc");
        let other = Params::new().job("def");
        f.accessor.set(DataKind::JobMetadata, &json!({"id": "abc"}), &job).await.unwrap();
        f.accessor.set(DataKind::JobDefinition, &json!([{"id": "abc"}]), &job).await.unwrap();
        f.accessor.set(DataKind::JobMetadata, &json!({"id": "def"}), &other).await.unwrap();

        f.accessor.clear(DataKind::JobMetadata, &job).await.unwrap();
        assert!(f.accessor.cached(DataKind::JobMetadata, &job).await.unwrap().is_none());
        assert!(f.accessor.cached(DataKind::JobDefinition, &job).await.unwrap().is_none());
        assert!(f.store.hget("runduck:qa:jobs:abc", "definition").await.unwrap().is_none());
        assert!(f.accessor.cached(DataKind::JobMetadata, &other).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn clear_pattern_removes_environment_keys() {
        let f = fixture();
        f.accessor.get(DataKind::Projects, &Params::new(), false).await.unwrap();
        let removed = f.accessor.clear_pattern("runduck:qa*").await.unwrap();
        assert_eq!(removed, 1);
        assert!(f.accessor.cached(DataKind::Projects, &Params::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn global_accessor_reads_combined_only_from_cache() {
        let f = fixture();
        let global = DataAccessor::global(f.store.clone(), Arc::new(FixtureSource::new("/nowhere")));
        assert_eq!(global.location(DataKind::Combined, &Params::new()).unwrap().0, "runduck:all");

        let err = global.get(DataKind::Combined, &Params::new(), false).await.unwrap_err();
        assert!(matches!(err, CacheError::Configuration(_)));

        global.set(DataKind::Combined, &json!([]), &Params::new()).await.unwrap();
        let got = global.get(DataKind::Combined, &Params::new(), false).await.unwrap();
        assert_eq!(got.origin, Origin::Cache);
        assert!(global.location(DataKind::Projects, &Params::new()).is_err());
    }
}

use std::collections::HashSet;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RunduckError};

pub const DEFAULT_CACHE_URL: &str = "redis://127.0.0.1:6379/0";
pub const DEFAULT_SAMPLE_DATA: &str = "sampledata";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Top-level config (runduck.toml + RUNDUCK_* env overrides).
///
/// Built once at startup and passed by reference into every accessor and
/// reader; nothing in the core looks configuration up on its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunduckConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub http: HttpConfig,
    /// Ordered: the index of an environment is its `env_order`, which decides
    /// lineage direction during reconciliation.
    #[serde(default)]
    pub environments: Vec<EnvironmentConfig>,
}

/// One job-orchestrator instance (e.g. `qa`, `prod`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub name: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub auth_token: String,
}

impl EnvironmentConfig {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            auth_token: auth_token.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_url")]
    pub url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: default_cache_url(),
        }
    }
}

/// Where cache misses are filled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    /// The orchestrator HTTP API of each environment.
    #[default]
    Api,
    /// Sample files under `source.sample_data`, for offline work and tests.
    Fixture,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub mode: SourceMode,
    #[serde(default = "default_sample_data")]
    pub sample_data: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::default(),
            sample_data: default_sample_data(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

fn default_cache_url() -> String {
    DEFAULT_CACHE_URL.to_string()
}
fn default_sample_data() -> String {
    DEFAULT_SAMPLE_DATA.to_string()
}
fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl RunduckConfig {
    /// Load config from a TOML file with RUNDUCK_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.runduck/runduck.toml
    ///
    /// Nested keys use a double underscore, e.g. `RUNDUCK_SOURCE__SAMPLE_DATA`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: RunduckConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("RUNDUCK_").split("__"))
            .extract()
            .map_err(|e| RunduckError::Config(e.to_string()))?;

        config.validate()?;
        debug!(%path, environments = config.environments.len(), "config loaded");
        Ok(config)
    }

    /// Reject environment lists that would make `{env}` keys ambiguous.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for env in &self.environments {
            if env.name.trim().is_empty() {
                return Err(RunduckError::Config(
                    "environment name must not be empty".to_string(),
                ));
            }
            if !seen.insert(env.name.as_str()) {
                return Err(RunduckError::Config(format!(
                    "environment '{}' is configured more than once",
                    env.name
                )));
            }
        }
        Ok(())
    }

    /// Look up an environment and its precedence index by name.
    pub fn environment(&self, name: &str) -> Result<(usize, &EnvironmentConfig)> {
        self.environments
            .iter()
            .enumerate()
            .find(|(_, env)| env.name == name)
            .ok_or_else(|| RunduckError::UnknownEnvironment {
                name: name.to_string(),
            })
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.runduck/runduck.toml", home)
}

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use runduck_core::{EnvironmentConfig, Origin};
use serde_json::Value;
use tracing::debug;

use crate::descriptor::DataKind;
use crate::error::{CacheError, Result};
use crate::source::LiveSource;
use crate::template::{render, Params};

/// Reads sample files named after the fixture template, e.g.
/// `qa.job.<id>.definition.yaml`, from a single root directory.
pub struct FixtureSource {
    root: PathBuf,
}

impl FixtureSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl LiveSource for FixtureSource {
    fn origin(&self) -> Origin {
        Origin::Fixture
    }

    async fn fetch(
        &self,
        kind: DataKind,
        env: Option<&EnvironmentConfig>,
        params: &Params,
    ) -> Result<Value> {
        let descriptor = kind.descriptor();
        let template = descriptor.fixture.ok_or_else(|| {
            CacheError::Configuration(format!("data kind '{kind}' has no fixture location"))
        })?;
        let file_name = render(template, env.map(|e| e.name.as_str()), params)?;
        let path = self.root.join(file_name);

        debug!(%kind, path = %path.display(), "reading fixture");

        let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CacheError::Configuration(format!(
                "fixture file {} not found",
                path.display()
            )),
            _ => CacheError::Io(e),
        })?;
        descriptor.format.parse(&bytes)
    }
}

use async_trait::async_trait;
use runduck_core::{EnvironmentConfig, Origin};
use serde_json::Value;

use crate::descriptor::DataKind;
use crate::error::Result;
use crate::template::Params;

/// Where cache misses are filled from.
///
/// One source serves every environment; the environment to read is passed
/// per call. `env` is `None` only for cross-environment kinds, which no live
/// source can produce.
#[async_trait]
pub trait LiveSource: Send + Sync {
    /// Origin tag attached to everything this source returns.
    fn origin(&self) -> Origin;

    async fn fetch(
        &self,
        kind: DataKind,
        env: Option<&EnvironmentConfig>,
        params: &Params,
    ) -> Result<Value>;
}

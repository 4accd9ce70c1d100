use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use runduck_core::{EnvironmentConfig, Origin};
use serde_json::Value;
use tracing::{debug, warn};

use crate::descriptor::{DataKind, Format};
use crate::error::{CacheError, Result};
use crate::source::LiveSource;
use crate::template::{render, Params};

/// Reads from the orchestrator HTTP API of each environment.
///
/// Timeouts belong to the client; there is no retry here.
pub struct ApiSource {
    client: reqwest::Client,
}

impl ApiSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::Configuration(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LiveSource for ApiSource {
    fn origin(&self) -> Origin {
        Origin::Live
    }

    async fn fetch(
        &self,
        kind: DataKind,
        env: Option<&EnvironmentConfig>,
        params: &Params,
    ) -> Result<Value> {
        let descriptor = kind.descriptor();
        let template = descriptor.live.ok_or_else(|| {
            CacheError::Configuration(format!("data kind '{kind}' has no API location"))
        })?;
        let env = env.ok_or_else(|| {
            CacheError::Configuration(format!("data kind '{kind}' needs an environment"))
        })?;

        let path = render(template, Some(&env.name), params)?;
        let url = format!("{}{}", env.base_url.trim_end_matches('/'), path);

        let mut query = params.query.clone();
        query.push(("authtoken".to_string(), env.auth_token.clone()));
        let mut request = self.client.get(&url);
        match descriptor.format {
            Format::Json => request = request.header(ACCEPT, "application/json"),
            Format::Yaml => query.push(("format".to_string(), "yaml".to_string())),
        }

        debug!(env = %env.name, %kind, %url, "fetching from upstream");

        let resp = request.query(&query).send().await?;
        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(env = %env.name, %kind, status, body = %body, "upstream API error");
            return Err(CacheError::Transport {
                status: Some(status),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        descriptor.format.parse(&bytes)
    }
}

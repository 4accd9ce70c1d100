use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use runduck_cache::{ApiSource, CacheStore, FixtureSource, LiveSource, MemoryStore, Params, RedisStore};
use runduck_core::{RunduckConfig, SourceMode};
use runduck_jobs::JobService;
use runduck_schedule::EnglishDescriber;
use serde::Serialize;
use tracing::info;

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the JSON output; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "runduck=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // explicit path > RUNDUCK_CONFIG env > ~/.runduck/runduck.toml
    let mut config = RunduckConfig::load(cli.config.as_deref()).context("loading config")?;
    if cli.fixtures {
        config.source.mode = SourceMode::Fixture;
    }

    let store = build_store(&config, cli.memory).await?;
    let source = build_source(&config)?;
    let merged = matches!(cli.command, Commands::Combine { merged: true, .. });
    let service = JobService::new(config, store, source, Arc::new(EnglishDescriber))?
        .with_merged_projection(merged);

    match cli.command {
        Commands::Combine { force_refresh, .. } => {
            let records = service.combine_data(force_refresh).await?;
            print_json(&serde_json::json!({
                "message": "Data successfully combined",
                "jobs": records.len(),
            }))
        }
        Commands::Jobs => match service.get_jobs().await? {
            Some(records) => print_json(&records),
            None => anyhow::bail!("no combined listing cached yet; run `runduck combine` first"),
        },
        Commands::Job {
            env,
            job_id,
            force_refresh,
        } => print_json(&service.get_job_details(&env, &job_id, force_refresh).await?),
        Commands::Execution { env, job_id } => {
            print_json(&service.get_last_execution(&env, &job_id, true).await?)
        }
        Commands::Get {
            kind,
            env,
            project,
            jobid,
            query,
            force_refresh,
        } => {
            let params = Params {
                project,
                jobid,
                query,
            };
            let fetched = service
                .get_data(env.as_deref(), kind, &params, force_refresh)
                .await?;
            print_json(&fetched)
        }
        Commands::Clear { pattern } => {
            let removed = service.clear_cache(&pattern).await?;
            print_json(&serde_json::json!({ "removed": removed }))
        }
    }
}

async fn build_store(config: &RunduckConfig, memory: bool) -> anyhow::Result<Arc<dyn CacheStore>> {
    if memory {
        info!("using in-process cache");
        return Ok(Arc::new(MemoryStore::new()));
    }
    info!(url = %config.cache.url, "connecting to cache");
    let store = RedisStore::connect(&config.cache.url)
        .await
        .with_context(|| format!("connecting to {}", config.cache.url))?;
    Ok(Arc::new(store))
}

fn build_source(config: &RunduckConfig) -> anyhow::Result<Arc<dyn LiveSource>> {
    Ok(match config.source.mode {
        SourceMode::Api => Arc::new(ApiSource::new(Duration::from_secs(
            config.http.request_timeout_secs,
        ))?),
        SourceMode::Fixture => {
            info!(root = %config.source.sample_data, "reading from sample data");
            Arc::new(FixtureSource::new(&config.source.sample_data))
        }
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

use clap::{Parser, Subcommand};
use runduck_cache::DataKind;

#[derive(Debug, Parser)]
#[command(name = "runduck")]
#[command(version)]
#[command(
    about = "Aggregate and reconcile job schedules across orchestrator environments",
    long_about = None
)]
pub struct Cli {
    /// Config file (defaults to ~/.runduck/runduck.toml)
    #[arg(long, global = true, env = "RUNDUCK_CONFIG")]
    pub config: Option<String>,

    /// Fill cache misses from the sample-data directory instead of the API
    #[arg(long, global = true)]
    pub fixtures: bool,

    /// Keep the cache in process memory instead of Redis
    #[arg(long, global = true)]
    pub memory: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Read all environments, reconcile and store the combined listing
    Combine {
        #[arg(short, long)]
        force_refresh: bool,
        /// Also store each project's merged job list
        #[arg(long)]
        merged: bool,
    },
    /// Print the stored combined listing
    Jobs,
    /// Details of one job in one environment
    Job {
        env: String,
        job_id: String,
        #[arg(short, long)]
        force_refresh: bool,
    },
    /// Last execution of a job, always read from the source
    Execution { env: String, job_id: String },
    /// Raw cache-or-fetch of one data kind
    Get {
        /// projects, jobs, job.metadata, job.definition, job.executions,
        /// project.merged or combined
        #[arg(value_parser = parse_kind)]
        kind: DataKind,
        /// Environment; omit for combined
        #[arg(short, long)]
        env: Option<String>,
        #[arg(short, long)]
        project: Option<String>,
        #[arg(short, long)]
        jobid: Option<String>,
        /// Extra upstream query parameter as key=value; repeatable
        #[arg(short, long, value_parser = parse_query)]
        query: Vec<(String, String)>,
        #[arg(short, long)]
        force_refresh: bool,
    },
    /// Delete every cache key matching a glob, e.g. 'runduck:qa*'
    Clear { pattern: String },
}

fn parse_kind(raw: &str) -> Result<DataKind, String> {
    raw.parse().map_err(|e: runduck_cache::CacheError| e.to_string())
}

fn parse_query(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_get_with_repeated_queries() {
        let cli = Cli::try_parse_from([
            "runduck", "--fixtures", "get", "job.executions", "-e", "qa", "-j", "abc", "-q",
            "max=1", "-q", "offset=0",
        ])
        .unwrap();
        assert!(cli.fixtures);
        match cli.command {
            Commands::Get {
                kind, env, jobid, query, ..
            } => {
                assert_eq!(kind, DataKind::JobExecutions);
                assert_eq!(env.as_deref(), Some("qa"));
                assert_eq!(jobid.as_deref(), Some("abc"));
                assert_eq!(
                    query,
                    vec![
                        ("max".to_string(), "1".to_string()),
                        ("offset".to_string(), "0".to_string())
                    ]
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_kind_and_bad_query() {
        assert!(Cli::try_parse_from(["runduck", "get", "job.history"]).is_err());
        assert!(Cli::try_parse_from(["runduck", "get", "projects", "-q", "max"]).is_err());
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["runduck", "combine", "-f", "--memory", "--config", "x.toml"])
            .unwrap();
        assert!(cli.memory);
        assert_eq!(cli.config.as_deref(), Some("x.toml"));
        assert!(matches!(
            cli.command,
            Commands::Combine {
                force_refresh: true,
                merged: false
            }
        ));
    }
}

#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use octoquest_lib::config::{load_from_path, validate_config, Config};
use octoquest_lib::leaderboard::{
    aggregate_top_users, rank_entries, AggregateOptions, LeaderboardEntry,
};
use octoquest_lib::telemetry::{init_metrics, init_tracing, start_observability_server};
use octoquest_lib::{GitHubClient, ServiceError};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "OctoQuest: gamified GitHub leaderboard API")]
struct Cli {
    /// Path to configuration TOML file (built-in defaults when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// GitHub token, overrides `github.token`
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Address to listen on, overrides `listen`
    #[arg(long, value_name = "ADDR")]
    listen: Option<SocketAddr>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Fetch the leaderboard once and print it
    Leaderboard {
        /// Number of rows to print
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) =
        init_tracing(&cfg.logging.level, cfg.logging.show_target, &cfg.telemetry.otel_log_level)
    {
        eprintln!("failed to initialize logging: {err}");
        std::process::exit(1);
    }

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cfg).await,
        Command::Leaderboard { limit, json } => print_leaderboard(&cfg, limit, json).await,
    };

    if let Err(err) = result {
        error!(%err, "octoquest exited with error");
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<Config, ServiceError> {
    let mut cfg = match &cli.config {
        Some(path) => load_from_path(path)?,
        None => Config::default(),
    };
    if let Some(token) = &cli.github_token {
        cfg.github.token = Some(token.clone());
    }
    if let Some(listen) = cli.listen {
        cfg.listen = listen;
    }
    validate_config(&cfg)?;
    Ok(cfg)
}

async fn serve(cfg: Config) -> Result<(), ServiceError> {
    info!(listen = ?cfg.listen, rate_limit = cfg.rate_limit.enabled, "configuration loaded");

    let metrics = match cfg.telemetry.metrics_port {
        Some(port) => {
            let (metrics, registry) =
                init_metrics().map_err(|e| ServiceError::Telemetry(e.to_string()))?;
            let token_configured = cfg.github.has_token();
            tokio::spawn(async move {
                if let Err(e) = start_observability_server(port, registry, token_configured).await {
                    warn!(error = %e, "observability server failed");
                }
            });
            Some(metrics)
        }
        None => None,
    };

    octoquest_lib::run(Arc::new(cfg), metrics).await
}

async fn print_leaderboard(cfg: &Config, limit: usize, json: bool) -> Result<(), ServiceError> {
    let client = GitHubClient::new(&cfg.github)?;
    let options = AggregateOptions::from(&cfg.github);
    let top = aggregate_top_users(&client, &options, None)
        .await
        .map_err(|e| ServiceError::Client(e.to_string()))?;
    let entries = rank_entries(&top.items, limit);

    if json {
        let out = serde_json::to_string_pretty(&entries)
            .map_err(|e| ServiceError::Http(format!("Failed to serialize leaderboard: {e}")))?;
        println!("{out}");
    } else {
        print_table(&entries);
    }
    Ok(())
}

fn print_table(entries: &[LeaderboardEntry]) {
    println!(
        "{:>4}  {:<39}  {:>6}  {:>8}  {:>6}  {:>6}",
        "RANK", "LOGIN", "LEVEL", "COMMITS", "PRS", "ISSUES"
    );
    for entry in entries {
        match entry.stats {
            Some(s) => println!(
                "{:>4}  {:<39}  {:>6}  {:>8}  {:>6}  {:>6}",
                entry.rank, entry.login, s.level, s.commits, s.pull_requests, s.issues
            ),
            None => println!("{:>4}  {:<39}  {:>6}", entry.rank, entry.login, "n/a"),
        }
    }
}

//! cf-ddns - Cloudflare dynamic DNS updater.

use anyhow::Context;
use cf_ddns::config::{Config, FileStateStore};
use cf_ddns::detector::HttpFetcher;
use cf_ddns::providers::CloudflareClient;
use cf_ddns::reconciler::{Reconciler, RunOutcome};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "cf-ddns")]
#[command(about = "Update Cloudflare A/AAAA records when the public IP changes")]
#[command(version)]
struct Cli {
    /// Update records even if the IP address has not changed
    #[arg(short, long)]
    force: bool,

    /// Path to config file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Directory for the rotating log files
    #[arg(long, default_value = ".")]
    log_dir: PathBuf,

    /// Print an example config file and exit
    #[arg(long)]
    print_example: bool,
}

/// Daily log files kept on disk (four weeks).
const MAX_LOG_FILES: usize = 28;

fn init_logging(log_dir: &Path) -> anyhow::Result<WorkerGuard> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("ddns")
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(log_dir)
        .with_context(|| format!("cannot open log directory {}", log_dir.display()))?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    Ok(guard)
}

async fn run(cli: &Cli) -> cf_ddns::Result<RunOutcome> {
    let store = FileStateStore::new(&cli.config);
    let mut config = store.load()?;

    let reconciler = Reconciler::new(
        Box::new(HttpFetcher::new()?),
        Box::new(store),
        Box::new(CloudflareClient::new(config.credentials.clone())?),
    );

    reconciler.run(&mut config, cli.force).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.print_example {
        return match serde_json::to_string_pretty(&Config::example()) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to render example config: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let _guard = match init_logging(&cli.log_dir) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialise logging: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("{}", "-".repeat(50));
    tracing::info!("Starting Cloudflare DDNS update");

    match run(&cli).await {
        Ok(RunOutcome::Unchanged) => ExitCode::SUCCESS,
        Ok(RunOutcome::Updated { updated, skipped }) => {
            tracing::info!("Done: {} record(s) updated, {} skipped", updated, skipped);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

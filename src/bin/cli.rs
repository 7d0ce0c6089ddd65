//! Harvester CLI
//!
//! Publishes or unpublishes a remote metadata repository, or retracts a
//! single record by id.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use harvester::{
    error::{AppError, Result},
    models::Config,
    pipeline::{Invocation, PublishingService, USAGE},
};

/// Harvest remote metadata repositories into a search index
#[derive(Parser, Debug)]
#[command(name = "harvester", version, about, after_help = USAGE)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "harvester.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// `<id>` or `<uri> <type> true|false`
    #[arg(value_name = "ARGS", allow_hyphen_values = true)]
    args: Vec<String>,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

async fn run(cli: &Cli, invocation: &Invocation) -> Result<usize> {
    let mut config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::load_or_default(&cli.config)
    };
    config.apply_env();
    log::info!("Index: {}", config.index.url);

    let service = PublishingService::from_config(&config)?;
    invocation.run(&service).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let invocation = match Invocation::from_args(&cli.args) {
        Ok(invocation) => invocation,
        Err(AppError::Usage(message)) => {
            eprintln!("{message}\n\n{USAGE}");
            return ExitCode::from(2);
        }
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    log::info!("Harvester starting: {:?}", invocation);
    match run(&cli, &invocation).await {
        Ok(count) => {
            log::info!("Done, {} records processed", count);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{} (retryable: {})", e, e.is_retryable());
            ExitCode::FAILURE
        }
    }
}

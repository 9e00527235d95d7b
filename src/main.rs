//! querykit CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use querykit::cli::{Cli, Commands};
use querykit::config::ConfigManager;
use querykit::error::QueryKitResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> QueryKitResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    // 0 = warn, 1 = info, 2+ = debug; `general.verbose` counts as -v
    let level = match cli.verbose.max(u8::from(config.general.verbose)) {
        0 => "querykit=warn",
        1 => "querykit=info",
        _ => "querykit=debug",
    };
    let filter = EnvFilter::new(level);

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }

    debug!("Loaded config from {}", config_manager.path().display());

    match cli.command {
        Commands::Text(args) => querykit::cli::commands::text(args).await,
        Commands::Gate(args) => querykit::cli::commands::gate(args, &config).await,
        Commands::Config(args) => {
            querykit::cli::commands::config(args, &config_manager, &config).await
        }
    }
}

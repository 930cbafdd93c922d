//! Command-line interface.

pub mod bootstrap;
pub mod commands;
pub mod output;
pub mod types;

use anyhow::{Context, Result};

pub use types::{Cli, Commands};

use crate::infrastructure::logging::{LogConfig, LoggerImpl};

/// Load configuration, initialise logging, and run one command.
pub async fn run(cli: Cli) -> Result<()> {
    let Cli {
        command,
        json,
        config: config_path,
        offline,
    } = cli;

    let config = bootstrap::load_config(config_path.as_deref())?;
    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging))
        .context("Failed to initialize logging")?;

    let command = match command {
        Commands::Config(args) => return commands::config::execute(&args, &config, json),
        other => other,
    };

    let pipeline = bootstrap::open_pipeline(config, offline).await?;
    let result = match command {
        Commands::Plan(args) => commands::plan::execute(args, &pipeline, json).await,
        Commands::Search(args) => commands::search::execute(args, &pipeline, json).await,
        Commands::Ingest(args) => commands::ingest::execute(args, &pipeline, json).await,
        Commands::Rerank(args) => commands::rerank::execute(args, &pipeline, json).await,
        Commands::Graph(args) => commands::graph::execute(args, &pipeline, json).await,
        Commands::Analyze(args) => commands::analyze::execute(args, &pipeline, json).await,
        Commands::Config(args) => commands::config::execute(&args, pipeline.config(), json),
    };

    pipeline
        .shutdown()
        .await
        .context("Failed to flush pipeline state")?;
    result
}

/// Report a command failure and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}

//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::commands::{
    analyze::AnalyzeArgs, config::ConfigArgs, graph::GraphArgs, ingest::IngestArgs,
    plan::PlanArgs, rerank::RerankArgs, search::SearchArgs,
};

#[derive(Parser, Debug)]
#[command(name = "switchyard")]
#[command(about = "Switchyard - adaptive task routing and retrieval for LLM requests", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .switchyard/config.yaml plus overrides)
    #[arg(long, global = true, env = "SWITCHYARD_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Do not call the generation service; extraction and scoring degrade
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify a request and show its routing plan
    Plan(PlanArgs),

    /// Search ingested knowledge
    Search(SearchArgs),

    /// Add an entry to the knowledge store
    Ingest(IngestArgs),

    /// Rerank documents against a query
    Rerank(RerankArgs),

    /// Knowledge graph commands
    Graph(GraphArgs),

    /// Analyze routing telemetry and suggest optimizations
    Analyze(AnalyzeArgs),

    /// Show or generate configuration
    Config(ConfigArgs),
}

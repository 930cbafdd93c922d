//! Implementation of the `switchyard ingest` command.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::json;

use crate::cli::output::{degradation_lines, output, CommandOutput};
use crate::domain::models::IngestOutcome;
use crate::services::Pipeline;

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Text to ingest (omit when using --file)
    pub text: Option<String>,

    /// Read the text from a file
    #[arg(short, long, conflicts_with = "text")]
    pub file: Option<PathBuf>,

    /// Source label stored with the entry
    #[arg(short, long, default_value = "cli")]
    pub source: String,

    /// Collection to file the entry under
    #[arg(short, long)]
    pub collection: Option<String>,

    /// Also extract entities and relations into the knowledge graph
    #[arg(long)]
    pub graph: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct IngestOutput {
    #[serde(flatten)]
    pub outcome: IngestOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<crate::domain::models::GraphUpdate>,
}

impl CommandOutput for IngestOutput {
    fn to_human(&self) -> String {
        let entry = &self.outcome.entry;
        let mut lines = vec![format!(
            "Ingested {} ({} chars from '{}'){}",
            entry.id,
            entry.text.chars().count(),
            entry.source,
            if self.outcome.indexed { ", indexed" } else { "" }
        )];
        lines.extend(degradation_lines(&self.outcome.degradations));
        if let Some(update) = &self.graph {
            lines.push(format!(
                "Graph: +{} nodes, {} updated, +{} edges",
                update.nodes_added, update.nodes_updated, update.edges_added
            ));
            lines.extend(degradation_lines(&update.degradations));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: IngestArgs, pipeline: &Pipeline, json_mode: bool) -> Result<()> {
    let text = match (&args.text, &args.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => bail!("Provide the text to ingest or --file"),
    };

    let metadata = match &args.collection {
        Some(collection) => json!({ "collection": collection }),
        None => json!({}),
    };
    let outcome = pipeline
        .ingest(&text, &args.source, metadata)
        .await
        .context("Failed to ingest knowledge")?;

    let graph = if args.graph {
        Some(
            pipeline
                .graph_add(&text, &args.source)
                .await
                .context("Failed to update knowledge graph")?,
        )
    } else {
        None
    };

    output(&IngestOutput { outcome, graph }, json_mode);
    Ok(())
}

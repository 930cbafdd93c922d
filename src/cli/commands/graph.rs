//! Implementation of the `switchyard graph` commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde::Serialize;

use crate::cli::output::{degradation_lines, list_table, output, CommandOutput};
use crate::domain::models::{EntityHit, GraphStats, GraphUpdate};
use crate::services::Pipeline;

#[derive(Args, Debug)]
pub struct GraphArgs {
    #[command(subcommand)]
    pub command: GraphCommands,
}

#[derive(Subcommand, Debug)]
pub enum GraphCommands {
    /// Extract entities and relations from text into the graph
    Add {
        /// Source text
        text: String,

        /// Source label stored on new nodes and edges
        #[arg(short, long, default_value = "cli")]
        source: String,
    },

    /// Find entities related to a query
    Query {
        query: String,

        /// Maximum traversal distance from matched entities
        #[arg(long)]
        max_hops: Option<usize>,

        /// Maximum number of entities
        #[arg(short = 'k', long, default_value = "10")]
        top_k: usize,
    },

    /// Render the prompt context block for a query
    Context { query: String },

    /// Show node and edge counts
    Stats,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum GraphOutput {
    Update(GraphUpdate),
    Entities { entities: Vec<EntityHit> },
    Context { context: String },
    Stats(GraphStats),
}

impl CommandOutput for GraphOutput {
    fn to_human(&self) -> String {
        match self {
            Self::Update(update) => {
                let mut lines = vec![format!(
                    "Graph updated: +{} nodes, {} updated, +{} edges",
                    update.nodes_added, update.nodes_updated, update.edges_added
                )];
                lines.extend(degradation_lines(&update.degradations));
                lines.join("\n")
            }
            Self::Entities { entities } => {
                if entities.is_empty() {
                    return "No matching entities.".to_string();
                }
                let mut table = list_table(&["Hop", "Entity", "Type", "Source"]);
                for hit in entities {
                    table.add_row(vec![
                        Cell::new(hit.hop),
                        Cell::new(&hit.name),
                        Cell::new(&hit.entity_type),
                        Cell::new(&hit.source),
                    ]);
                }
                table.to_string()
            }
            Self::Context { context } if context.is_empty() => "No graph context.".to_string(),
            Self::Context { context } => context.clone(),
            Self::Stats(stats) => format!("Nodes: {}\nEdges: {}", stats.nodes, stats.edges),
        }
    }
}

pub async fn execute(args: GraphArgs, pipeline: &Pipeline, json_mode: bool) -> Result<()> {
    let result = match args.command {
        GraphCommands::Add { text, source } => GraphOutput::Update(
            pipeline
                .graph_add(&text, &source)
                .await
                .context("Failed to update knowledge graph")?,
        ),
        GraphCommands::Query {
            query,
            max_hops,
            top_k,
        } => {
            let entities = match max_hops {
                Some(hops) => pipeline.graph_query_hops(&query, hops, top_k).await,
                None => pipeline.graph_query(&query, top_k).await,
            };
            GraphOutput::Entities { entities }
        }
        GraphCommands::Context { query } => GraphOutput::Context {
            context: pipeline.graph_context(&query).await,
        },
        GraphCommands::Stats => GraphOutput::Stats(pipeline.graph_stats().await),
    };

    output(&result, json_mode);
    Ok(())
}

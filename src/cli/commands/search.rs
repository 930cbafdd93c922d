//! Implementation of the `switchyard search` command.

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::Cell;

use crate::cli::output::{degradation_lines, list_table, output, truncate, CommandOutput};
use crate::domain::models::{RetrievalTier, SearchOutcome};
use crate::services::Pipeline;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Maximum number of results
    #[arg(short, long, default_value = "5")]
    pub limit: usize,

    /// Only search entries filed under this collection
    #[arg(short, long)]
    pub collection: Option<String>,

    /// Print the rendered context block instead of a table
    #[arg(long)]
    pub raw: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct SearchOutput {
    #[serde(flatten)]
    pub outcome: SearchOutcome,
    #[serde(skip)]
    pub raw: bool,
}

impl CommandOutput for SearchOutput {
    fn to_human(&self) -> String {
        if self.raw {
            return self.outcome.text.clone();
        }
        let mut lines = degradation_lines(&self.outcome.degradations);
        if self.outcome.tier == RetrievalTier::None {
            lines.push("No results found.".to_string());
            return lines.join("\n");
        }

        let mut table = list_table(&["#", "Score", "Source", "Text"]);
        for (i, doc) in self.outcome.documents.iter().enumerate() {
            table.add_row(vec![
                Cell::new(i + 1),
                Cell::new(format!("{:.3}", doc.score)),
                Cell::new(&doc.source),
                Cell::new(truncate(&doc.text.replace('\n', " "), 80)),
            ]);
        }
        lines.push(format!(
            "{} result{} (tier: {:?}):",
            self.outcome.documents.len(),
            if self.outcome.documents.len() == 1 { "" } else { "s" },
            self.outcome.tier
        ));
        lines.push(table.to_string());
        lines.join("\n")
    }
}

pub async fn execute(args: SearchArgs, pipeline: &Pipeline, json_mode: bool) -> Result<()> {
    let outcome = match &args.collection {
        Some(collection) => pipeline
            .search_collection(collection, &args.query, args.limit)
            .await
            .context("Failed to search collection")?,
        None => pipeline.search(&args.query, args.limit).await,
    };

    output(&SearchOutput { outcome, raw: args.raw }, json_mode);
    Ok(())
}

//! Implementation of the `switchyard rerank` command.

use anyhow::{bail, Result};
use clap::Args;
use comfy_table::Cell;

use crate::cli::output::{degradation_lines, list_table, output, truncate, CommandOutput};
use crate::domain::models::RerankOutcome;
use crate::services::Pipeline;

#[derive(Args, Debug)]
pub struct RerankArgs {
    /// Query to rank against
    pub query: String,

    /// Candidate documents
    #[arg(required = true)]
    pub documents: Vec<String>,

    /// Number of documents to keep
    #[arg(short = 'k', long, default_value = "3")]
    pub top_k: usize,
}

#[derive(Debug, serde::Serialize)]
pub struct RerankOutput(pub RerankOutcome);

impl CommandOutput for RerankOutput {
    fn to_human(&self) -> String {
        let mut lines = degradation_lines(&self.0.degradations);
        let mut table = list_table(&["Rank", "Score", "Input #", "Document"]);
        for (rank, result) in self.0.results.iter().enumerate() {
            table.add_row(vec![
                Cell::new(rank + 1),
                Cell::new(format!("{:.1}", result.score)),
                Cell::new(result.original_index + 1),
                Cell::new(truncate(&result.document, 80)),
            ]);
        }
        lines.push(table.to_string());
        lines.join("\n")
    }
}

pub async fn execute(args: RerankArgs, pipeline: &Pipeline, json_mode: bool) -> Result<()> {
    if args.top_k == 0 {
        bail!("--top-k must be at least 1");
    }
    let outcome = pipeline.rerank(&args.query, &args.documents, args.top_k, None).await;
    output(&RerankOutput(outcome), json_mode);
    Ok(())
}

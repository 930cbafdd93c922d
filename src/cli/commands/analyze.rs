//! Implementation of the `switchyard analyze` command.

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::Cell;

use crate::cli::output::{list_table, output, CommandOutput};
use crate::domain::models::AnalysisReport;
use crate::services::Pipeline;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {}

#[derive(Debug, serde::Serialize)]
pub struct AnalyzeOutput(pub AnalysisReport);

impl CommandOutput for AnalyzeOutput {
    fn to_human(&self) -> String {
        let report = &self.0;
        if report.total_calls == 0 {
            return format!("No logged requests in the last {} days.", report.window_days);
        }

        let mut table = list_table(&["Domain", "Calls", "Avg ms", "Models"]);
        for stats in &report.domains {
            let models: Vec<String> = stats
                .models
                .iter()
                .map(|(model, calls)| format!("{model} ({calls})"))
                .collect();
            table.add_row(vec![
                Cell::new(&stats.domain),
                Cell::new(stats.calls),
                Cell::new(format!("{:.0}", stats.avg_duration_ms)),
                Cell::new(models.join(", ")),
            ]);
        }

        let mut lines = vec![
            format!(
                "{} logged requests in the last {} days:",
                report.total_calls, report.window_days
            ),
            table.to_string(),
        ];
        if report.suggestions.is_empty() {
            lines.push("\nNo suggestions.".to_string());
        } else {
            lines.push("\nSuggestions:".to_string());
            lines.extend(report.suggestions.iter().map(|s| format!("  - {s}")));
        }
        lines.join("\n")
    }
}

pub async fn execute(_args: AnalyzeArgs, pipeline: &Pipeline, json_mode: bool) -> Result<()> {
    let report = pipeline
        .analyze()
        .await
        .context("Failed to analyze task log")?;
    output(&AnalyzeOutput(report), json_mode);
    Ok(())
}

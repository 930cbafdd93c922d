//! Implementation of the `switchyard plan` command.

use anyhow::Result;
use clap::Args;
use comfy_table::Cell;
use serde::Serialize;

use crate::cli::output::{degradation_lines, list_table, output, truncate, CommandOutput};
use crate::domain::models::{ChatMessage, TaskPlan};
use crate::services::{Pipeline, PreparedRequest};

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Request text (the final user message)
    pub text: String,

    /// Earlier user turns, oldest first
    #[arg(long = "history")]
    pub history: Vec<String>,

    /// Retrieve context and print the assembled prompt messages
    #[arg(long)]
    pub prepare: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PlanOutput {
    Plan(TaskPlan),
    Prepared(PreparedRequest),
}

fn plan_lines(plan: &TaskPlan) -> Vec<String> {
    let collections: Vec<&str> = plan.rag_collections().iter().map(String::as_str).collect();
    let mut lines = vec![
        format!("Level:        {} ({})", plan.level(), plan.label()),
        format!("Domain:       {}", plan.domain()),
        format!("Model chain:  {}", plan.model_chain().join(" -> ")),
        format!("Temperature:  {}", plan.temperature()),
        format!(
            "Retrieval:    {}",
            if plan.needs_retrieval() {
                format!("yes [{}]", collections.join(", "))
            } else {
                "no".to_string()
            }
        ),
    ];
    if plan.quality_gate() {
        lines.push(format!(
            "Quality gate: min {} ({} retr{}, escalation {})",
            plan.quality_min_score(),
            plan.max_retries(),
            if plan.max_retries() == 1 { "y" } else { "ies" },
            if plan.escalation() { "on" } else { "off" }
        ));
    }
    if let Some(format) = plan.output_format() {
        lines.push(format!("Output:       {format:?}"));
    }
    lines.push(format!(
        "Flags:        thinking={} log_for_training={}",
        plan.thinking(),
        plan.log_for_training()
    ));
    lines
}

impl CommandOutput for PlanOutput {
    fn to_human(&self) -> String {
        match self {
            Self::Plan(plan) => plan_lines(plan).join("\n"),
            Self::Prepared(prepared) => {
                let mut lines = plan_lines(&prepared.plan);
                lines.extend(degradation_lines(&prepared.degradations));

                let mut table = list_table(&["#", "Role", "Content"]);
                for (i, message) in prepared.messages.iter().enumerate() {
                    table.add_row(vec![
                        Cell::new(i + 1),
                        Cell::new(message.role),
                        Cell::new(truncate(&message.content.replace('\n', " "), 100)),
                    ]);
                }
                lines.push(String::new());
                lines.push(table.to_string());
                lines.join("\n")
            }
        }
    }
}

pub async fn execute(args: PlanArgs, pipeline: &Pipeline, json_mode: bool) -> Result<()> {
    let mut messages: Vec<ChatMessage> = args.history.iter().map(ChatMessage::user).collect();
    messages.push(ChatMessage::user(&args.text));

    let result = if args.prepare {
        PlanOutput::Prepared(pipeline.prepare(&messages).await)
    } else {
        PlanOutput::Plan(pipeline.plan(&messages))
    };
    output(&result, json_mode);
    Ok(())
}

//! Append-only routing telemetry.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::errors::DomainResult;
use crate::domain::models::{TaskLogEntry, TaskPlan};
use crate::domain::ports::AppendOnlySink;
use crate::domain::text::truncate_chars;
use crate::infrastructure::logging::SecretScrubber;

/// Writes one [`TaskLogEntry`] per completed request to a durable sink.
pub struct TaskLog {
    sink: Arc<dyn AppendOnlySink>,
    preview_chars: usize,
    scrubber: SecretScrubber,
}

impl TaskLog {
    pub fn new(sink: Arc<dyn AppendOnlySink>, preview_chars: usize) -> Self {
        Self {
            sink,
            preview_chars,
            scrubber: SecretScrubber::new(),
        }
    }

    fn preview(&self, text: &str) -> String {
        truncate_chars(&self.scrubber.scrub(text), self.preview_chars)
    }

    /// Record a completed request. Returns `false` without writing when the
    /// plan is not marked for training.
    pub async fn record(
        &self,
        plan: &TaskPlan,
        query: &str,
        response: &str,
        model_used: &str,
        duration_ms: u64,
    ) -> DomainResult<bool> {
        if !plan.log_for_training() {
            return Ok(false);
        }

        let entry = TaskLogEntry {
            timestamp: Utc::now(),
            level: plan.level().to_string(),
            label: plan.label().to_string(),
            domain: plan.domain().to_string(),
            model_used: model_used.to_string(),
            duration_ms,
            query: self.preview(query),
            response: self.preview(response),
            quality_gate: plan.quality_gate(),
        };

        self.sink.append(&serde_json::to_value(&entry)?).await?;
        tracing::debug!(
            level = %entry.level,
            domain = %entry.domain,
            model = %entry.model_used,
            duration_ms,
            "task logged"
        );
        Ok(true)
    }

    /// Every readable entry, oldest first. Records that do not match the
    /// entry shape are skipped.
    pub async fn entries(&self) -> DomainResult<Vec<TaskLogEntry>> {
        let records = self.sink.read_all().await?;
        let total = records.len();
        let entries: Vec<TaskLogEntry> = records
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect();
        if entries.len() < total {
            tracing::warn!(
                skipped = total - entries.len(),
                "Skipping task log records with unexpected shape"
            );
        }
        Ok(entries)
    }

    pub async fn flush(&self) -> DomainResult<()> {
        self.sink.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sinks::JsonlSink;
    use crate::domain::models::{ChatMessage, ModelsConfig, PlannerConfig};
    use crate::services::task_planner::TaskPlanner;
    use tempfile::TempDir;

    fn plan_for(text: &str) -> TaskPlan {
        TaskPlanner::new(ModelsConfig::default(), PlannerConfig::default())
            .plan(&[ChatMessage::user(text)])
    }

    #[tokio::test]
    async fn test_records_training_plans_with_bounded_previews() {
        let dir = TempDir::new().unwrap();
        let log = TaskLog::new(Arc::new(JsonlSink::new(dir.path().join("log.jsonl"))), 10);
        let plan = plan_for("請幫我分析這棟建築的鋼筋配置並寫一份報告");
        assert!(plan.log_for_training());

        let written = log
            .record(&plan, "請幫我分析這棟建築的鋼筋配置並寫一份報告", "好的，以下是分析", "qwen2.5:32b", 1200)
            .await
            .unwrap();
        assert!(written);

        let entries = log.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].query.chars().count(), 10);
        assert_eq!(entries[0].model_used, "qwen2.5:32b");
        assert_eq!(entries[0].domain, "construction");
    }

    #[tokio::test]
    async fn test_skips_non_training_plans() {
        let dir = TempDir::new().unwrap();
        let log = TaskLog::new(Arc::new(JsonlSink::new(dir.path().join("log.jsonl"))), 200);
        let plan = plan_for("hello");
        assert!(!plan.log_for_training());

        assert!(!log.record(&plan, "hello", "hi!", "qwen2.5:3b", 5).await.unwrap());
        assert!(log.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_previews_are_scrubbed() {
        let dir = TempDir::new().unwrap();
        let log = TaskLog::new(Arc::new(JsonlSink::new(dir.path().join("log.jsonl"))), 200);
        let plan = plan_for("analyze and compare the deployment report for our server");

        log.record(&plan, "my password=hunter2 broke the deploy", "ok", "m", 1)
            .await
            .unwrap();
        let entries = log.entries().await.unwrap();
        assert!(!entries[0].query.contains("hunter2"));
    }
}

//! Offline analysis of routing telemetry.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    AnalysisReport, DomainStats, Suggestion, SuggestionPriority, TaskLogEntry, TelemetryConfig,
};
use crate::services::task_log::TaskLog;

/// Aggregates the task log into per-domain statistics and suggestions.
///
/// Read-only: suggestions are reported, never applied.
pub struct TrainingAnalyzer {
    log: Arc<TaskLog>,
    config: TelemetryConfig,
}

#[derive(Default)]
struct Accumulator {
    calls: usize,
    total_duration_ms: u64,
    models: BTreeMap<String, usize>,
}

impl TrainingAnalyzer {
    pub fn new(log: Arc<TaskLog>, config: TelemetryConfig) -> Self {
        Self { log, config }
    }

    /// Analyze entries from the last `analysis_window_days` before `now`.
    pub async fn analyze(&self, now: DateTime<Utc>) -> DomainResult<AnalysisReport> {
        let entries = self.log.entries().await?;
        let report = self.analyze_entries(&entries, now);
        tracing::info!(
            total_calls = report.total_calls,
            domains = report.domains.len(),
            suggestions = report.suggestions.len(),
            "telemetry analyzed"
        );
        Ok(report)
    }

    pub fn analyze_entries(&self, entries: &[TaskLogEntry], now: DateTime<Utc>) -> AnalysisReport {
        let cutoff = now - Duration::days(i64::from(self.config.analysis_window_days));

        let mut by_domain: HashMap<&str, Accumulator> = HashMap::new();
        for entry in entries.iter().filter(|e| e.timestamp >= cutoff && e.timestamp <= now) {
            let acc = by_domain.entry(entry.domain.as_str()).or_default();
            acc.calls += 1;
            acc.total_duration_ms = acc.total_duration_ms.saturating_add(entry.duration_ms);
            *acc.models.entry(entry.model_used.clone()).or_default() += 1;
        }

        let mut domains: Vec<DomainStats> = by_domain
            .into_iter()
            .map(|(domain, acc)| DomainStats {
                domain: domain.to_string(),
                calls: acc.calls,
                avg_duration_ms: acc.total_duration_ms as f64 / acc.calls as f64,
                models: acc.models,
            })
            .collect();
        domains.sort_by(|a, b| b.calls.cmp(&a.calls).then_with(|| a.domain.cmp(&b.domain)));

        let suggestions = domains.iter().flat_map(|stats| self.suggest(stats)).collect();

        AnalysisReport {
            generated_at: now,
            window_days: self.config.analysis_window_days,
            total_calls: domains.iter().map(|d| d.calls).sum(),
            domains,
            suggestions,
        }
    }

    fn suggest(&self, stats: &DomainStats) -> Vec<Suggestion> {
        let mut suggestions = Vec::new();

        if stats.calls >= self.config.fine_tune_min_calls {
            let priority = if stats.calls >= self.config.fine_tune_high_priority_calls {
                SuggestionPriority::High
            } else {
                SuggestionPriority::Medium
            };
            suggestions.push(Suggestion::FineTune {
                domain: stats.domain.clone(),
                calls: stats.calls,
                priority,
            });
        }

        if stats.avg_duration_ms > self.config.slow_avg_duration_ms
            && stats.calls >= self.config.slow_min_calls
        {
            suggestions.push(Suggestion::RouteToFasterModel {
                domain: stats.domain.clone(),
                avg_duration_ms: stats.avg_duration_ms,
                calls: stats.calls,
            });
        }

        suggestions
    }
}

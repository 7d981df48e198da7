use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::agents::{AgentResult, Batch, ResultStatus};
use crate::error::ErrorKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_latency_ms: u64,
    pub overall_success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub position: usize,
    #[serde(flatten)]
    pub result: AgentResult,
}

/// Final, ordered view of a batch. Every requested agent appears exactly
/// once, including the ones that failed or were skipped.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub batch_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub summary: ReportSummary,
    pub failures_by_kind: BTreeMap<ErrorKind, usize>,
    pub entries: Vec<ReportEntry>,
}

pub fn aggregate(batch: &Batch) -> Report {
    let mut failures_by_kind = BTreeMap::new();
    for kind in batch.results().iter().filter_map(AgentResult::error_kind) {
        *failures_by_kind.entry(kind).or_insert(0) += 1;
    }

    let entries = batch
        .results()
        .iter()
        .enumerate()
        .map(|(position, result)| ReportEntry {
            position,
            result: result.clone(),
        })
        .collect();

    Report {
        batch_id: batch.id,
        started_at: batch.started_at,
        summary: ReportSummary {
            total: batch.len(),
            succeeded: batch.succeeded_count,
            failed: batch.failed_count,
            skipped: batch.skipped_count,
            total_latency_ms: batch.total_latency_ms,
            overall_success: batch.succeeded_count > 0,
        },
        failures_by_kind,
        entries,
    }
}

impl Report {
    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = &self.summary;

        writeln!(f, "Batch {} ({})", self.batch_id, self.started_at.to_rfc3339())?;
        writeln!(
            f,
            "{} agents: {} succeeded, {} failed, {} skipped in {}ms",
            summary.total, summary.succeeded, summary.failed, summary.skipped, summary.total_latency_ms
        )?;
        if !self.failures_by_kind.is_empty() {
            let kinds: Vec<String> = self
                .failures_by_kind
                .iter()
                .map(|(kind, count)| format!("{}={}", kind, count))
                .collect();
            writeln!(f, "Failures: {}", kinds.join(", "))?;
        }

        for entry in &self.entries {
            writeln!(f)?;
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = &self.result;
        match result.status {
            ResultStatus::Ok => {
                writeln!(
                    f,
                    "[{}] {} ok ({}ms, {} attempts)",
                    self.position, result.agent_name, result.latency_ms, result.attempts
                )?;
                if let Some(data) = &result.data {
                    for (key, value) in data {
                        writeln!(f, "  {}: {}", key, render_value(value))?;
                    }
                }
            }
            ResultStatus::Failed | ResultStatus::Skipped => {
                let label = if result.status == ResultStatus::Failed {
                    "failed"
                } else {
                    "skipped"
                };
                let (kind, message) = match &result.error {
                    Some(failure) => (failure.kind.as_str(), failure.message.as_str()),
                    None => ("unknown", ""),
                };
                writeln!(
                    f,
                    "[{}] {} {} ({}): {}",
                    self.position, result.agent_name, label, kind, message
                )?;
            }
        }
        Ok(())
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) if text.contains('\n') => {
            let indented: Vec<String> = text.lines().map(|line| format!("    {}", line)).collect();
            format!("\n{}", indented.join("\n"))
        }
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

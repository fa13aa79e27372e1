//! JSON output formatting

use chrono::Utc;
use serde::Serialize;

use crate::orchestrator::RunSummary;

/// Wrapper for JSON output with metadata
#[derive(Debug, Serialize)]
pub struct JsonOutput<'a, T> {
    /// The run summary
    pub data: &'a T,

    /// Metadata about the run
    pub meta: Metadata,
}

/// Metadata included in JSON output
#[derive(Debug, Serialize)]
pub struct Metadata {
    /// When the summary was produced (RFC 3339)
    pub timestamp: String,

    /// CLI version
    pub version: String,

    /// `dry-run`, `submitted` or `completed`
    pub outcome: &'static str,
}

impl<'a> JsonOutput<'a, RunSummary> {
    pub fn new(summary: &'a RunSummary) -> Self {
        let outcome = if summary.dry_run {
            "dry-run"
        } else if summary.final_status.is_some() {
            "completed"
        } else {
            "submitted"
        };

        Self {
            data: summary,
            meta: Metadata {
                timestamp: Utc::now().to_rfc3339(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                outcome,
            },
        }
    }
}

/// Format a run summary as pretty-printed JSON
pub fn format_json(summary: &RunSummary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonOutput::new(summary))
}

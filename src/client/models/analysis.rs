//! Analysis submission and job models

use serde::{Deserialize, Serialize};

/// Handle returned by a successful analysis submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    /// Analysis ID (numeric on most servers)
    #[serde(deserialize_with = "deserialize_id")]
    pub analysis_id: String,

    /// Job ID used for status polling
    #[serde(deserialize_with = "deserialize_id")]
    pub job_id: String,
}

/// Accepts IDs sent either as JSON integers or strings
fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdValue {
        Integer(i64),
        String(String),
    }

    match IdValue::deserialize(deserializer)? {
        IdValue::Integer(i) => Ok(i.to_string()),
        IdValue::String(s) => Ok(s),
    }
}

/// Server-side job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    /// Any status this client does not know; treated as still in progress
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Completed and failed jobs will not change state again
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

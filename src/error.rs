//! Error types for srm-analyze

use std::time::Duration;
use thiserror::Error;

/// Result type alias for srm-analyze operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0} Is this an SRM instance?")]
    Connectivity(String),

    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error(transparent)]
    Packaging(#[from] PackagingError),

    #[error(
        "Analysis job {job_id} finished with status 'failed'. Check the job logs on the SRM server for details."
    )]
    JobFailed { job_id: String },

    #[error("Analysis job {job_id} did not finish within {timeout:?}")]
    PollTimeout { job_id: String, timeout: Duration },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors returned by the remote platform or the transport beneath it
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response. `status` is the status line, `detail` is the body's
    /// `error` field when present, otherwise the raw body.
    #[error("{status}{}", .detail.as_ref().map(|d| format!(": {}", d)).unwrap_or_default())]
    Remote {
        status: String,
        detail: Option<String>,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Build a remote error from a status code and response body
    pub fn from_response(status: reqwest::StatusCode, body: &str) -> Self {
        let status_line = format!(
            "{} (HTTP {})",
            status.canonical_reason().unwrap_or("Unknown Status"),
            status.as_u16()
        );

        let detail = if body.trim().is_empty() {
            None
        } else {
            match serde_json::from_str::<serde_json::Value>(body) {
                Ok(serde_json::Value::Object(map)) if map.contains_key("error") => {
                    Some(match &map["error"] {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                }
                _ => Some(format!("received response {}", body.trim())),
            }
        };

        ApiError::Remote {
            status: status_line,
            detail,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network(format!("Failed to connect to server: {}", err))
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Invalid or contradictory configuration. Messages name the offending field.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required option '{0}'")]
    Missing(&'static str),

    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),

    #[error("Specify exactly one of 'project-id' or 'project-name', not both")]
    ConflictingProject,

    #[error("No project specified. Set 'project-id' or 'project-name'")]
    MissingProject,

    #[error("No project named '{0}' exists. Set 'auto-create-project' to create it")]
    ProjectNotFound(String),

    #[error("Ambiguous 'project-name': {count} projects are named '{name}'. Use 'project-id' instead")]
    AmbiguousProject { name: String, count: usize },

    #[error(
        "Project creation needs both 'base-branch-name' and 'target-branch-name', or neither"
    )]
    IncompleteBranchConfig,

    #[error("'base-branch-name' is required because target branch '{0}' does not exist yet")]
    MissingBaseBranch(String),

    #[error("'base-branch-name' refers to branch '{0}', which does not exist")]
    BaseBranchNotFound(String),

    #[error("Cannot pick a default target branch: {0}")]
    DefaultBranch(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// API key permission failures
#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("Permissions check responded with HTTP 403, is the API key valid?")]
    Forbidden,

    #[error("The following permissions were missing for the given API key: {}", .0.join(", "))]
    Missing(Vec<String>),
}

/// Failures while collecting or packaging input files
#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("No files matched '{field}'")]
    NoFilesMatched { field: &'static str },

    #[error("Nothing to upload: no source archive and no tool output files")]
    NothingToUpload,

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write archive: {0}")]
    Write(String),
}

impl From<zip::result::ZipError> for PackagingError {
    fn from(err: zip::result::ZipError) -> Self {
        PackagingError::Write(err.to_string())
    }
}

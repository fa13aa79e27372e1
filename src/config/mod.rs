//! Configuration management for srm-analyze
//!
//! Options arrive in layers: command-line flags and `SRM_*` environment
//! variables (handled by clap), then an optional YAML config file, then
//! built-in defaults. Each layer is a [`ConfigLayer`]; the merged layer is
//! validated once into a strongly typed [`AnalysisConfig`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ConfigError, Result};

/// Default delay between job status polls
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

/// Parse a boolean-like string.
///
/// Accepts `true/false`, `yes/no`, `on/off` and `1/0`, case-insensitive.
/// This is the only place string values are coerced to booleans.
pub fn parse_bool(value: &str) -> std::result::Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(format!(
            "'{}' is not a boolean (expected true/false, yes/no, on/off or 1/0)",
            other
        )),
    }
}

/// Accepts either a YAML boolean or a boolean-like string
fn deserialize_bool_like<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolValue {
        Bool(bool),
        String(String),
    }

    match Option::<BoolValue>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolValue::Bool(b)) => Ok(Some(b)),
        Some(BoolValue::String(s)) => parse_bool(&s).map(Some).map_err(serde::de::Error::custom),
    }
}

/// Accepts a project id written as a YAML integer or as a string
fn deserialize_id_like<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdValue {
        Integer(u64),
        String(String),
    }

    Ok(Option::<IdValue>::deserialize(deserializer)?.map(|v| match v {
        IdValue::Integer(n) => n.to_string(),
        IdValue::String(s) => s,
    }))
}

/// What to do when a required input glob matches no files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EmptyInputPolicy {
    /// Abort the run
    #[default]
    Fail,
    /// Log a warning and skip the archive
    Warn,
}

/// One layer of partially specified options.
///
/// Field names match the long CLI flags so a YAML file reads the same way
/// the command line does.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigLayer {
    pub server_url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default, deserialize_with = "deserialize_id_like")]
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub base_branch_name: Option<String>,
    pub target_branch_name: Option<String>,
    pub source_and_binaries_glob: Option<String>,
    pub tool_outputs_glob: Option<String>,
    #[serde(default, deserialize_with = "deserialize_bool_like")]
    pub wait_for_completion: Option<bool>,
    pub ca_cert: Option<String>,
    #[serde(default, deserialize_with = "deserialize_bool_like")]
    pub dry_run: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_bool_like")]
    pub auto_create_project: Option<bool>,
    pub empty_inputs: Option<EmptyInputPolicy>,
    pub working_dir: Option<PathBuf>,
    pub scratch_dir: Option<PathBuf>,
    pub poll_interval: Option<u64>,
    pub poll_timeout: Option<u64>,
}

impl ConfigLayer {
    /// Load a layer from a YAML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Invalid {
            field: "config",
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        let layer: ConfigLayer = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        Ok(layer)
    }

    /// Fill every unset option in `self` from `lower`
    pub fn or(self, lower: ConfigLayer) -> Self {
        Self {
            server_url: self.server_url.or(lower.server_url),
            api_key: self.api_key.or(lower.api_key),
            project_id: self.project_id.or(lower.project_id),
            project_name: self.project_name.or(lower.project_name),
            base_branch_name: self.base_branch_name.or(lower.base_branch_name),
            target_branch_name: self.target_branch_name.or(lower.target_branch_name),
            source_and_binaries_glob: self
                .source_and_binaries_glob
                .or(lower.source_and_binaries_glob),
            tool_outputs_glob: self.tool_outputs_glob.or(lower.tool_outputs_glob),
            wait_for_completion: self.wait_for_completion.or(lower.wait_for_completion),
            ca_cert: self.ca_cert.or(lower.ca_cert),
            dry_run: self.dry_run.or(lower.dry_run),
            auto_create_project: self.auto_create_project.or(lower.auto_create_project),
            empty_inputs: self.empty_inputs.or(lower.empty_inputs),
            working_dir: self.working_dir.or(lower.working_dir),
            scratch_dir: self.scratch_dir.or(lower.scratch_dir),
            poll_interval: self.poll_interval.or(lower.poll_interval),
            poll_timeout: self.poll_timeout.or(lower.poll_timeout),
        }
    }
}

/// How the orchestrator waits for a submitted job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Fixed delay before every status request
    pub interval: Duration,
    /// Optional deadline; `None` polls until the job reaches a terminal state
    pub timeout: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            timeout: None,
        }
    }
}

/// Validated configuration for one analysis run
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Base URL of the SRM server, without trailing slash
    pub server_url: String,
    pub api_key: String,
    pub project_id: Option<u64>,
    pub project_name: Option<String>,
    pub base_branch_name: Option<String>,
    pub target_branch_name: Option<String>,
    /// Raw comma-separated globs for the source/binaries archive
    pub source_globs: String,
    /// Raw comma-separated globs for individually attached tool outputs
    pub tool_output_globs: String,
    pub wait_for_completion: bool,
    /// PEM bytes of an extra trust anchor
    pub ca_cert_pem: Option<Vec<u8>>,
    pub dry_run: bool,
    pub auto_create_project: bool,
    pub empty_inputs: EmptyInputPolicy,
    pub working_dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub poll: PollSettings,
}

impl AnalysisConfig {
    /// Validate a fully merged layer
    pub fn from_layer(layer: ConfigLayer) -> Result<Self> {
        let server_url = required(layer.server_url, "server-url")?
            .trim_end_matches('/')
            .to_string();
        if !(server_url.starts_with("http://") || server_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "server-url",
                reason: format!("'{}' is not an http(s) URL", server_url),
            }
            .into());
        }

        let api_key = required(layer.api_key, "api-key")?;
        let source_globs = required(layer.source_and_binaries_glob, "source-and-binaries-glob")?;

        let ca_cert_pem = match layer.ca_cert.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(pem) if pem.starts_with("-----BEGIN") => Some(pem.as_bytes().to_vec()),
            Some(path) => Some(std::fs::read(path).map_err(|e| ConfigError::Invalid {
                field: "ca-cert",
                reason: format!("cannot read {}: {}", path, e),
            })?),
        };

        let working_dir = match layer.working_dir {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };
        let scratch_dir = layer.scratch_dir.unwrap_or_else(std::env::temp_dir);

        let interval = layer.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        if interval == 0 {
            return Err(ConfigError::Invalid {
                field: "poll-interval",
                reason: "must be at least 1 second".to_string(),
            }
            .into());
        }

        Ok(Self {
            server_url,
            api_key,
            project_id: parse_project_id(layer.project_id)?,
            project_name: non_empty(layer.project_name),
            base_branch_name: non_empty(layer.base_branch_name),
            target_branch_name: non_empty(layer.target_branch_name),
            source_globs,
            tool_output_globs: layer.tool_outputs_glob.unwrap_or_default(),
            wait_for_completion: layer.wait_for_completion.unwrap_or(false),
            ca_cert_pem,
            dry_run: layer.dry_run.unwrap_or(false),
            auto_create_project: layer.auto_create_project.unwrap_or(false),
            empty_inputs: layer.empty_inputs.unwrap_or_default(),
            working_dir,
            scratch_dir,
            poll: PollSettings {
                interval: Duration::from_secs(interval),
                timeout: layer.poll_timeout.map(Duration::from_secs),
            },
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String> {
    non_empty(value).ok_or_else(|| ConfigError::Missing(field).into())
}

/// A blank id counts as unset
fn parse_project_id(value: Option<String>) -> Result<Option<u64>> {
    non_empty(value)
        .map(|id| {
            id.parse::<u64>().map_err(|_| {
                ConfigError::Invalid {
                    field: "project-id",
                    reason: format!("'{}' is not a numeric project id", id),
                }
                .into()
            })
        })
        .transpose()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

//! Command-line interface definition

use std::path::PathBuf;

use clap::Parser;

use crate::config::{ConfigLayer, EmptyInputPolicy, parse_bool};

/// Output format for the run summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty format - human-optimized rich formatting
    #[default]
    Pretty,
    /// JSON format - structured for scripts/APIs
    Json,
}

/// srm-analyze - Submit sources, binaries and tool outputs to Software Risk Manager
///
/// Every option can also be set through its SRM_* environment variable or a
/// YAML file passed with --config. Flags override environment variables,
/// which override the config file.
#[derive(Parser, Debug)]
#[command(name = "srm-analyze")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the SRM server
    #[arg(long, env = "SRM_SERVER_URL", hide_env = true)]
    pub server_url: Option<String>,

    /// API key used for every authenticated request
    #[arg(long, env = "SRM_API_KEY", hide_env = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Numeric ID of the target project
    #[arg(long, env = "SRM_PROJECT_ID", hide_env = true)]
    pub project_id: Option<String>,

    /// Name of the target project (must be unique on the server)
    #[arg(long, env = "SRM_PROJECT_NAME", hide_env = true)]
    pub project_name: Option<String>,

    /// Branch a new target branch is created from
    #[arg(long, env = "SRM_BASE_BRANCH_NAME", hide_env = true)]
    pub base_branch_name: Option<String>,

    /// Branch the analysis is stored on (default: the project's default branch)
    #[arg(long, env = "SRM_TARGET_BRANCH_NAME", hide_env = true)]
    pub target_branch_name: Option<String>,

    /// Comma-separated globs of files to pack into the source/binaries archive
    #[arg(long, env = "SRM_SOURCE_AND_BINARIES_GLOB", hide_env = true)]
    pub source_and_binaries_glob: Option<String>,

    /// Comma-separated globs of tool output files to attach individually
    #[arg(long, env = "SRM_TOOL_OUTPUTS_GLOB", hide_env = true)]
    pub tool_outputs_glob: Option<String>,

    /// Wait until the analysis job finishes
    #[arg(
        long,
        env = "SRM_WAIT_FOR_COMPLETION",
        hide_env = true,
        value_parser = parse_bool,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub wait_for_completion: Option<bool>,

    /// Extra trusted CA certificate (PEM file path or inline PEM)
    #[arg(long, env = "SRM_CA_CERT", hide_env = true)]
    pub ca_cert: Option<String>,

    /// Validate configuration and server state without uploading
    #[arg(
        long,
        env = "SRM_DRY_RUN",
        hide_env = true,
        value_parser = parse_bool,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub dry_run: Option<bool>,

    /// Create the project when no project has the given name
    #[arg(
        long,
        env = "SRM_AUTO_CREATE_PROJECT",
        hide_env = true,
        value_parser = parse_bool,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub auto_create_project: Option<bool>,

    /// What to do when the source/binaries globs match nothing
    #[arg(long, env = "SRM_EMPTY_INPUTS", hide_env = true, value_enum)]
    pub empty_inputs: Option<EmptyInputPolicy>,

    /// Directory relative globs are resolved against (default: current directory)
    #[arg(long, env = "SRM_WORKING_DIR", hide_env = true)]
    pub working_dir: Option<PathBuf>,

    /// Directory for the transient archive (default: system temp directory)
    #[arg(long, env = "SRM_SCRATCH_DIR", hide_env = true)]
    pub scratch_dir: Option<PathBuf>,

    /// Seconds between job status requests
    #[arg(long, env = "SRM_POLL_INTERVAL", hide_env = true)]
    pub poll_interval: Option<u64>,

    /// Give up waiting after this many seconds (default: wait indefinitely)
    #[arg(long, env = "SRM_POLL_TIMEOUT", hide_env = true)]
    pub poll_timeout: Option<u64>,

    /// YAML file supplying defaults for any of the options above
    #[arg(long, env = "SRM_CONFIG", hide_env = true)]
    pub config: Option<PathBuf>,

    /// Summary format (pretty, json)
    #[arg(
        long,
        env = "SRM_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Enable debug logging
    #[arg(long, env = "SRM_DEBUG", hide_env = true)]
    pub debug: bool,
}

impl Cli {
    /// The flag and environment layer of the configuration
    pub fn to_layer(&self) -> ConfigLayer {
        ConfigLayer {
            server_url: self.server_url.clone(),
            api_key: self.api_key.clone(),
            project_id: self.project_id.clone(),
            project_name: self.project_name.clone(),
            base_branch_name: self.base_branch_name.clone(),
            target_branch_name: self.target_branch_name.clone(),
            source_and_binaries_glob: self.source_and_binaries_glob.clone(),
            tool_outputs_glob: self.tool_outputs_glob.clone(),
            wait_for_completion: self.wait_for_completion,
            ca_cert: self.ca_cert.clone(),
            dry_run: self.dry_run,
            auto_create_project: self.auto_create_project,
            empty_inputs: self.empty_inputs,
            working_dir: self.working_dir.clone(),
            scratch_dir: self.scratch_dir.clone(),
            poll_interval: self.poll_interval,
            poll_timeout: self.poll_timeout,
        }
    }
}

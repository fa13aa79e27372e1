//! Submission orchestrator
//!
//! Runs one analysis end to end. Every stage depends on the one before it:
//!
//! 1. connectivity probe and dialect selection
//! 2. project resolution
//! 3. permission check
//! 4. branch resolution (branching servers only)
//! 5. dry-run exit
//! 6. packaging and payload assembly
//! 7. submission
//! 8. optional polling

pub mod poll;

use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use serde::Serialize;

use crate::client::SrmApi;
use crate::client::models::{ApiDialect, JobStatus, PlatformVersion};
use crate::config::AnalysisConfig;
use crate::error::{ConfigError, PackagingError, Result};
use crate::packaging::{GlobSpec, UploadPayload, build_archive, glob::archive_relative, resolve};
use crate::resolve::{BranchSelection, ProjectQuery, ResolvedProject, resolve_project};

pub use poll::poll_to_completion;

/// File name of the transient archive inside the scratch directory
const ARCHIVE_FILE_NAME: &str = "srm-inputfiles.zip";

const SOURCE_GLOB_FIELD: &str = "source-and-binaries-glob";
const TOOL_OUTPUTS_GLOB_FIELD: &str = "tool-outputs-glob";

/// What a run did, for the final report
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub server_version: String,
    pub branching: bool,
    pub project_id: Option<u64>,
    pub project_name: Option<String>,
    pub project_created: bool,
    pub target_branch: Option<String>,
    pub base_branch: Option<String>,
    /// The target branch is created from `base_branch` by this submission
    pub target_branch_created: bool,
    pub dry_run: bool,
    pub files_archived: usize,
    pub scan_files_attached: usize,
    pub analysis_id: Option<String>,
    pub job_id: Option<String>,
    pub final_status: Option<JobStatus>,
}

/// Drives the stages of one analysis run against an SRM server
pub struct Orchestrator<'a, C: SrmApi> {
    config: &'a AnalysisConfig,
    client: &'a C,
    progress: Option<ProgressBar>,
}

impl<'a, C: SrmApi> Orchestrator<'a, C> {
    pub fn new(config: &'a AnalysisConfig, client: &'a C) -> Self {
        Self {
            config,
            client,
            progress: None,
        }
    }

    /// Show a spinner with the job status while polling
    pub fn with_spinner(mut self) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            bar.set_style(style);
        }
        self.progress = Some(bar);
        self
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let config = self.config;
        let mut summary = RunSummary {
            dry_run: config.dry_run,
            project_name: config.project_name.clone(),
            ..Default::default()
        };

        // Connectivity
        let version = PlatformVersion::parse(&self.client.test_connection().await?);
        info!("Connected to SRM {}", version);
        summary.server_version = version.as_str().to_string();
        let dialect = version.dialect();
        summary.branching = dialect == ApiDialect::Branching;

        // Project
        let project = resolve_project(
            ProjectQuery::from_config(config),
            self.client,
            config.dry_run,
        )
        .await?;
        summary.project_id = project.id();
        if let ResolvedProject::Created(ref created) = project {
            summary.project_created = true;
            summary.project_name = Some(created.name.clone());
        }

        // Permissions
        match project.id() {
            Some(id) => {
                self.client.validate_permissions(id).await?;
                debug!("API key may create analyses in project {}", id);
            }
            None => info!("Skipping permission check for a project that does not exist yet"),
        }

        // Branches
        let selection = self.select_branches(dialect, &project).await?;
        summary.target_branch = selection.target.clone();
        summary.base_branch = selection.base.clone();
        summary.target_branch_created = selection.creates_target;

        if config.dry_run {
            info!("Dry run: configuration is valid, nothing was uploaded");
            return Ok(summary);
        }

        let project_id = project.id().ok_or(ConfigError::MissingProject)?;

        // Packaging
        let source_spec = GlobSpec::parse(SOURCE_GLOB_FIELD, &config.source_globs);
        source_spec.require_non_empty()?;
        let sources = resolve(&source_spec, &config.working_dir)?;

        let tool_spec = GlobSpec::parse(TOOL_OUTPUTS_GLOB_FIELD, &config.tool_output_globs);
        let tool_outputs = if tool_spec.is_empty() {
            info!("No '{}' given, no tool output files will be attached", tool_spec.field());
            Vec::new()
        } else {
            resolve(&tool_spec, &config.working_dir)?
        };

        let scratch = tempfile::Builder::new()
            .prefix("srm-analyze")
            .tempdir_in(&config.scratch_dir)?;
        let target = absolute(&scratch.path().join(ARCHIVE_FILE_NAME))?;
        let working_dir = absolute(&config.working_dir)?;
        let self_exclude = target
            .starts_with(&working_dir)
            .then(|| archive_relative(&target, &working_dir));

        info!("Packaging {} files", sources.len());
        let archive_target = target.clone();
        let archive = tokio::task::spawn_blocking(move || {
            build_archive(&sources, &archive_target, self_exclude.as_deref())
        })
        .await
        .map_err(|e| PackagingError::Write(format!("archive task failed: {}", e)))??;

        // Payload
        let mut payload = UploadPayload::new();
        payload.attach_archive(&archive, config.empty_inputs, SOURCE_GLOB_FIELD)?;
        payload.attach_scan_files(&tool_outputs);
        if payload.has_archive() {
            summary.files_archived = archive.files_written;
        }
        summary.scan_files_attached = payload.scan_files().len();
        if payload.is_empty() {
            return Err(PackagingError::NothingToUpload.into());
        }

        // Submission
        let handle = self
            .client
            .submit_analysis(
                project_id,
                selection.base.as_deref(),
                selection.target.as_deref(),
                &payload,
            )
            .await?;
        info!(
            "Analysis {} submitted, job id {}",
            handle.analysis_id, handle.job_id
        );
        summary.analysis_id = Some(handle.analysis_id.clone());
        summary.job_id = Some(handle.job_id.clone());

        // The archive is no longer needed once uploaded
        drop(scratch);

        if config.wait_for_completion {
            if let Some(ref bar) = self.progress {
                bar.enable_steady_tick(Duration::from_millis(120));
            }
            let result =
                poll_to_completion(self.client, &handle.job_id, config.poll, self.progress.as_ref())
                    .await;
            if let Some(ref bar) = self.progress {
                bar.finish_and_clear();
            }
            summary.final_status = Some(result?);
        }

        Ok(summary)
    }

    async fn select_branches(
        &self,
        dialect: ApiDialect,
        project: &ResolvedProject,
    ) -> Result<BranchSelection> {
        let config = self.config;
        let requested = BranchSelection::new(
            config.target_branch_name.as_deref(),
            config.base_branch_name.as_deref(),
        );

        if dialect == ApiDialect::Legacy {
            if requested.target.is_some() || requested.base.is_some() {
                info!("This SRM version does not support branches; branch options are ignored");
            }
            return Ok(BranchSelection::default());
        }

        match project.id() {
            Some(id) => {
                let branches = self.client.get_branches(id).await?;
                debug!("Project {} has {} branches", id, branches.len());
                requested.resolve(&branches)
            }
            None => {
                info!("Skipping branch check for a project that does not exist yet");
                Ok(requested)
            }
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

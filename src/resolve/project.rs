//! Project selection by id or by name

use log::{debug, info};

use crate::client::ProjectApi;
use crate::client::models::{CreateProjectRequest, Project};
use crate::config::AnalysisConfig;
use crate::error::{ConfigError, Result};

/// The project-related options of a run
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectQuery<'a> {
    pub id: Option<u64>,
    pub name: Option<&'a str>,
    pub auto_create: bool,
    pub base_branch: Option<&'a str>,
    pub target_branch: Option<&'a str>,
}

impl<'a> ProjectQuery<'a> {
    pub fn from_config(config: &'a AnalysisConfig) -> Self {
        Self {
            id: config.project_id,
            name: config.project_name.as_deref(),
            auto_create: config.auto_create_project,
            base_branch: config.base_branch_name.as_deref(),
            target_branch: config.target_branch_name.as_deref(),
        }
    }

    /// Default branch for a newly created project.
    ///
    /// Both branch names or neither must be given; with both, the base
    /// branch becomes the project's default.
    fn default_branch_for_new_project(&self) -> Result<Option<&'a str>> {
        match (self.base_branch, self.target_branch) {
            (Some(base), Some(_)) => Ok(Some(base)),
            (None, None) => Ok(None),
            _ => Err(ConfigError::IncompleteBranchConfig.into()),
        }
    }
}

/// Outcome of project resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedProject {
    /// Selected by id or by a unique name match
    Existing(u64),
    /// Created because no project had the requested name
    Created(Project),
    /// Would be created, but this is a dry run
    Pending { name: String },
}

impl ResolvedProject {
    /// Id of the project, unless it only exists hypothetically
    pub fn id(&self) -> Option<u64> {
        match self {
            ResolvedProject::Existing(id) => Some(*id),
            ResolvedProject::Created(project) => Some(project.id),
            ResolvedProject::Pending { .. } => None,
        }
    }
}

/// Turn the project options into a concrete project.
///
/// Names are compared exactly. When `dry_run` is set a missing project is
/// never created; the result is [`ResolvedProject::Pending`] instead.
pub async fn resolve_project<C: ProjectApi + ?Sized>(
    query: ProjectQuery<'_>,
    client: &C,
    dry_run: bool,
) -> Result<ResolvedProject> {
    let name = match (query.id, query.name) {
        (Some(_), Some(_)) => return Err(ConfigError::ConflictingProject.into()),
        (None, None) => return Err(ConfigError::MissingProject.into()),
        (Some(id), None) => {
            debug!("Using project id {}", id);
            return Ok(ResolvedProject::Existing(id));
        }
        (None, Some(name)) => name,
    };

    let projects = client.list_projects().await?;
    let matches: Vec<&Project> = projects.iter().filter(|p| p.name == name).collect();

    match matches.as_slice() {
        [project] => {
            debug!("Project '{}' has id {}", name, project.id);
            Ok(ResolvedProject::Existing(project.id))
        }
        [] if query.auto_create => {
            let default_branch = query.default_branch_for_new_project()?;
            if dry_run {
                info!("Project '{}' does not exist and would be created", name);
                return Ok(ResolvedProject::Pending {
                    name: name.to_string(),
                });
            }

            let project = client
                .create_project(CreateProjectRequest {
                    name: name.to_string(),
                    default_branch_name: default_branch.map(str::to_string),
                })
                .await?;
            info!("Created project '{}' with id {}", project.name, project.id);
            Ok(ResolvedProject::Created(project))
        }
        [] => Err(ConfigError::ProjectNotFound(name.to_string()).into()),
        many => Err(ConfigError::AmbiguousProject {
            name: name.to_string(),
            count: many.len(),
        }
        .into()),
    }
}

//! Project and branch models

use serde::{Deserialize, Serialize};

/// Project as returned by the project listing and creation endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Numeric project ID
    pub id: u64,

    /// Project name (not guaranteed unique on the server)
    pub name: String,
}

/// Body of a project creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,

    /// Name given to the new project's default branch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_branch_name: Option<String>,
}

/// Branch of a project. Read-only snapshot fetched once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub name: String,

    #[serde(default)]
    pub is_default: bool,
}

impl Branch {
    /// Whether `branches` contains a branch named exactly `name`
    pub fn is_present(branches: &[Branch], name: &str) -> bool {
        branches.iter().any(|b| b.name == name)
    }
}

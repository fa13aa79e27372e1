//! Project API trait

use async_trait::async_trait;

use crate::client::models::{Branch, CreateProjectRequest, Project};
use crate::error::Result;

/// Project and branch operations
#[async_trait]
pub trait ProjectApi: Send + Sync {
    /// List all projects visible to the API key
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Create a new project
    async fn create_project(&self, request: CreateProjectRequest) -> Result<Project>;

    /// List the branches of a project
    async fn get_branches(&self, project_id: u64) -> Result<Vec<Branch>>;
}

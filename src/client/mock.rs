//! Mock SRM API client for testing
//!
//! Provides a mock implementation of the API traits for unit testing
//! without making real API calls.

use std::collections::VecDeque;
use std::fs::File;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::api::{AnalysisApi, ProjectApi, SystemApi};
use super::models::{Branch, CreateProjectRequest, JobHandle, JobStatus, Project};
use crate::error::{ApiError, PermissionError, Result};
use crate::packaging::UploadPayload;

/// Mock API client for testing.
///
/// Configure expected responses via builder methods, then use in tests.
///
/// # Example
/// ```ignore
/// let mock = MockSrmClient::new()
///     .with_projects(vec![Project { id: 1, name: "demo".into() }])
///     .await
///     .with_job_statuses(vec![JobStatus::Running, JobStatus::Completed])
///     .await;
/// ```
pub struct MockSrmClient {
    /// Version reported by test_connection
    version: Arc<Mutex<String>>,
    /// Projects returned by list_projects; create_project appends here
    projects: Arc<Mutex<Vec<Project>>>,
    /// Branches returned by get_branches
    branches: Arc<Mutex<Vec<Branch>>>,
    /// Permissions reported as not granted
    missing_permissions: Arc<Mutex<Vec<String>>>,
    /// Statuses returned by successive get_job_status calls; the last one repeats
    job_statuses: Arc<Mutex<VecDeque<JobStatus>>>,
    /// Handle returned by submit_analysis
    job_handle: Arc<Mutex<JobHandle>>,
    /// Error to return (if any) - consumed on first use
    error: Arc<Mutex<Option<ApiError>>>,
    /// Track number of calls for verification
    call_count: Arc<Mutex<CallCounts>>,
    /// Captured project creation requests
    created_projects: Arc<Mutex<Vec<CreateProjectRequest>>>,
    /// Captured analysis submissions
    submissions: Arc<Mutex<Vec<CapturedSubmission>>>,
}

impl Default for MockSrmClient {
    fn default() -> Self {
        Self {
            version: Arc::new(Mutex::new("2024.3.0".to_string())),
            projects: Arc::new(Mutex::new(Vec::new())),
            branches: Arc::new(Mutex::new(Vec::new())),
            missing_permissions: Arc::new(Mutex::new(Vec::new())),
            job_statuses: Arc::new(Mutex::new(VecDeque::from([JobStatus::Completed]))),
            job_handle: Arc::new(Mutex::new(JobHandle {
                analysis_id: "1".to_string(),
                job_id: "mock-job".to_string(),
            })),
            error: Arc::new(Mutex::new(None)),
            call_count: Arc::new(Mutex::new(CallCounts::default())),
            created_projects: Arc::new(Mutex::new(Vec::new())),
            submissions: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Tracks API call counts for test verification
#[derive(Default, Debug, Clone)]
pub struct CallCounts {
    pub test_connection: usize,
    pub validate_permissions: usize,
    pub list_projects: usize,
    pub create_project: usize,
    pub get_branches: usize,
    pub submit_analysis: usize,
    pub get_job_status: usize,
}

impl CallCounts {
    /// Get total number of API calls made.
    pub fn total(&self) -> usize {
        self.test_connection
            + self.validate_permissions
            + self.list_projects
            + self.create_project
            + self.get_branches
            + self.submit_analysis
            + self.get_job_status
    }
}

/// A captured analysis submission for test assertions.
#[derive(Debug, Clone)]
pub struct CapturedSubmission {
    pub project_id: u64,
    pub base_branch: Option<String>,
    pub target_branch: Option<String>,
    /// Form field names in upload order
    pub part_names: Vec<String>,
    /// Entry names of the attached archive, read at submission time
    pub archive_entries: Vec<String>,
}

impl MockSrmClient {
    /// Create a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the version reported by test_connection.
    pub async fn with_version(self, version: &str) -> Self {
        *self.version.lock().await = version.to_string();
        self
    }

    /// Configure projects to return from list_projects.
    pub async fn with_projects(self, projects: Vec<Project>) -> Self {
        *self.projects.lock().await = projects;
        self
    }

    /// Configure branches to return from get_branches.
    pub async fn with_branches(self, branches: Vec<Branch>) -> Self {
        *self.branches.lock().await = branches;
        self
    }

    /// Configure permissions the API key lacks.
    pub async fn with_missing_permissions(self, missing: Vec<&str>) -> Self {
        *self.missing_permissions.lock().await = missing.into_iter().map(String::from).collect();
        self
    }

    /// Configure the sequence of statuses returned by get_job_status.
    pub async fn with_job_statuses(self, statuses: Vec<JobStatus>) -> Self {
        *self.job_statuses.lock().await = statuses.into();
        self
    }

    /// Configure an error to return on the next API call.
    /// The error is consumed after one use.
    pub async fn with_error(self, error: ApiError) -> Self {
        *self.error.lock().await = Some(error);
        self
    }

    /// Get the call counts for verification in tests.
    pub async fn call_counts(&self) -> CallCounts {
        self.call_count.lock().await.clone()
    }

    /// Get all captured project creation requests.
    pub async fn created_projects(&self) -> Vec<CreateProjectRequest> {
        self.created_projects.lock().await.clone()
    }

    /// Get all captured submissions.
    pub async fn submissions(&self) -> Vec<CapturedSubmission> {
        self.submissions.lock().await.clone()
    }

    /// Check if there's a pending error and consume it.
    async fn check_error(&self) -> Result<()> {
        let mut error = self.error.lock().await;
        if let Some(e) = error.take() {
            return Err(e.into());
        }
        Ok(())
    }
}

// ============================================================================
// SystemApi Implementation
// ============================================================================

#[async_trait]
impl SystemApi for MockSrmClient {
    async fn test_connection(&self) -> Result<String> {
        self.call_count.lock().await.test_connection += 1;
        self.check_error().await?;
        Ok(self.version.lock().await.clone())
    }

    async fn validate_permissions(&self, _project_id: u64) -> Result<()> {
        self.call_count.lock().await.validate_permissions += 1;
        self.check_error().await?;

        let missing = self.missing_permissions.lock().await.clone();
        if !missing.is_empty() {
            return Err(PermissionError::Missing(missing).into());
        }
        Ok(())
    }
}

// ============================================================================
// ProjectApi Implementation
// ============================================================================

#[async_trait]
impl ProjectApi for MockSrmClient {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.call_count.lock().await.list_projects += 1;
        self.check_error().await?;
        Ok(self.projects.lock().await.clone())
    }

    async fn create_project(&self, request: CreateProjectRequest) -> Result<Project> {
        self.call_count.lock().await.create_project += 1;
        self.check_error().await?;

        let mut projects = self.projects.lock().await;
        let project = Project {
            id: projects.iter().map(|p| p.id).max().unwrap_or(99) + 1,
            name: request.name.clone(),
        };
        projects.push(project.clone());
        drop(projects);

        self.created_projects.lock().await.push(request);
        Ok(project)
    }

    async fn get_branches(&self, _project_id: u64) -> Result<Vec<Branch>> {
        self.call_count.lock().await.get_branches += 1;
        self.check_error().await?;
        Ok(self.branches.lock().await.clone())
    }
}

// ============================================================================
// AnalysisApi Implementation
// ============================================================================

#[async_trait]
impl AnalysisApi for MockSrmClient {
    async fn submit_analysis(
        &self,
        project_id: u64,
        base_branch: Option<&str>,
        target_branch: Option<&str>,
        payload: &UploadPayload,
    ) -> Result<JobHandle> {
        self.call_count.lock().await.submit_analysis += 1;
        self.check_error().await?;

        let archive_entries = match payload.archive_path() {
            Some(path) => {
                let archive = zip::ZipArchive::new(File::open(path)?)
                    .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
                archive.file_names().map(str::to_string).collect()
            }
            None => Vec::new(),
        };

        self.submissions.lock().await.push(CapturedSubmission {
            project_id,
            base_branch: base_branch.map(String::from),
            target_branch: target_branch.map(String::from),
            part_names: payload.part_names(),
            archive_entries,
        });

        Ok(self.job_handle.lock().await.clone())
    }

    async fn get_job_status(&self, _job_id: &str) -> Result<JobStatus> {
        self.call_count.lock().await.get_job_status += 1;
        self.check_error().await?;

        let mut statuses = self.job_statuses.lock().await;
        let status = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().copied()
        };
        Ok(status.unwrap_or(JobStatus::Completed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_mock_client_defaults() {
        let mock = MockSrmClient::new();

        assert_eq!(mock.test_connection().await.unwrap(), "2024.3.0");
        assert!(mock.list_projects().await.unwrap().is_empty());
        assert!(mock.validate_permissions(1).await.is_ok());
        assert_eq!(mock.get_job_status("j").await.unwrap(), JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_mock_client_create_appends_project() {
        let mock = MockSrmClient::new()
            .with_projects(vec![Project {
                id: 4,
                name: "existing".to_string(),
            }])
            .await;

        let created = mock
            .create_project(CreateProjectRequest {
                name: "fresh".to_string(),
                default_branch_name: None,
            })
            .await
            .unwrap();
        assert_eq!(created.id, 5);
        assert_eq!(mock.list_projects().await.unwrap().len(), 2);
        assert_eq!(mock.created_projects().await.len(), 1);
    }

    #[tokio::test]
    async fn test_mock_client_status_sequence_repeats_last() {
        let mock = MockSrmClient::new()
            .with_job_statuses(vec![JobStatus::Queued, JobStatus::Running])
            .await;

        assert_eq!(mock.get_job_status("j").await.unwrap(), JobStatus::Queued);
        assert_eq!(mock.get_job_status("j").await.unwrap(), JobStatus::Running);
        assert_eq!(mock.get_job_status("j").await.unwrap(), JobStatus::Running);
        assert_eq!(mock.call_counts().await.get_job_status, 3);
    }

    #[tokio::test]
    async fn test_mock_client_with_error() {
        let mock = MockSrmClient::new()
            .with_error(ApiError::Network("Connection refused".to_string()))
            .await;

        let result = mock.list_projects().await;
        assert!(matches!(result, Err(Error::Api(ApiError::Network(_)))));

        // Error is consumed after first use
        assert!(mock.list_projects().await.is_ok());
        assert_eq!(mock.call_counts().await.total(), 2);
    }

    #[tokio::test]
    async fn test_mock_client_missing_permissions() {
        let mock = MockSrmClient::new()
            .with_missing_permissions(vec!["analysis:create"])
            .await;

        let err = mock.validate_permissions(1).await.unwrap_err();
        assert!(err.to_string().contains("analysis:create"));
    }
}

//! Analysis API trait

use async_trait::async_trait;

use crate::client::models::{JobHandle, JobStatus};
use crate::error::Result;
use crate::packaging::UploadPayload;

/// Analysis submission and job tracking
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// Upload the payload and start an analysis.
    ///
    /// With `target_branch` set the analysis lands on that branch; a missing
    /// target is created from `base_branch`. Both `None` targets the default
    /// branch (or a server without branch support).
    async fn submit_analysis(
        &self,
        project_id: u64,
        base_branch: Option<&str>,
        target_branch: Option<&str>,
        payload: &UploadPayload,
    ) -> Result<JobHandle>;

    /// Fetch the current status of a job
    async fn get_job_status(&self, job_id: &str) -> Result<JobStatus>;
}

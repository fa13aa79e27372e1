//! System API trait

use async_trait::async_trait;

use crate::error::Result;

/// Server-level checks performed before any project work
#[async_trait]
pub trait SystemApi: Send + Sync {
    /// Probe the server anonymously and return its reported version.
    ///
    /// Fails with a connectivity error unless the response is a JSON object
    /// holding exactly the expected system-info fields.
    async fn test_connection(&self) -> Result<String>;

    /// Check that the API key may create analyses in the given project
    async fn validate_permissions(&self, project_id: u64) -> Result<()>;
}

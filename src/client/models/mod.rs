//! SRM API data models
//!
//! Types exchanged with the SRM server, organized by resource.

mod analysis;
mod project;
mod system;

pub use analysis::{JobHandle, JobStatus};
pub use project::{Branch, CreateProjectRequest, Project};
pub use system::{ApiDialect, PlatformVersion};

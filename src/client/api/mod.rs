//! API trait definitions split by responsibility
//!
//! - [`SystemApi`] - Connectivity probe and API key permission checks
//! - [`ProjectApi`] - Project lookup/creation and branch listing
//! - [`AnalysisApi`] - Analysis submission and job status
//!
//! The [`SrmApi`](super::SrmApi) super-trait combines all three.

mod analysis;
mod project;
mod system;

pub use analysis::AnalysisApi;
pub use project::ProjectApi;
pub use system::SystemApi;

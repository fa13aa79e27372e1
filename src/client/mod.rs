//! SRM API client

pub mod api;
#[cfg(test)]
pub mod mock;
pub mod models;
pub mod srm;

pub use api::{AnalysisApi, ProjectApi, SystemApi};
#[cfg(test)]
pub use mock::MockSrmClient;
pub use srm::SrmClient;

/// Combined SRM API surface used by the orchestrator.
///
/// Implemented automatically for any type providing all three sub-traits.
pub trait SrmApi: SystemApi + ProjectApi + AnalysisApi {}

impl<T: SystemApi + ProjectApi + AnalysisApi> SrmApi for T {}

//! Project and branch resolution
//!
//! Everything here runs before any upload so configuration mistakes surface
//! with a message naming the option instead of an opaque server error.

pub mod branch;
pub mod project;

pub use branch::BranchSelection;
pub use project::{ProjectQuery, ResolvedProject, resolve_project};

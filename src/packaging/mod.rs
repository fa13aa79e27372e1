//! Input collection and upload packaging
//!
//! - [`glob`] - Comma-separated glob lists to ordered file sets
//! - [`archive`] - ZIP archive of source and binary inputs
//! - [`payload`] - Multi-part upload assembly

pub mod archive;
pub mod glob;
pub mod payload;

pub use archive::{ArchiveSummary, build_archive};
pub use glob::{GlobSpec, ResolvedFile, resolve};
pub use payload::{ARCHIVE_PART_NAME, UploadPayload};

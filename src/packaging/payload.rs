//! Multi-part upload assembly
//!
//! The payload holds at most one source/binaries archive and any number of
//! tool output files, each uploaded as its own part.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use reqwest::Body;
use reqwest::multipart::{Form, Part};
use tokio_util::io::ReaderStream;

use super::archive::ArchiveSummary;
use super::glob::ResolvedFile;
use crate::config::EmptyInputPolicy;
use crate::error::{PackagingError, Result};

/// Form field name of the source/binaries archive
pub const ARCHIVE_PART_NAME: &str = "source-and-binaries.zip";

/// A tool output file and the unique form key it is uploaded under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFilePart {
    pub key: String,
    pub path: PathBuf,
}

/// Upload payload for one analysis submission
#[derive(Debug, Clone, Default)]
pub struct UploadPayload {
    archive: Option<PathBuf>,
    scan_files: Vec<ScanFilePart>,
}

impl UploadPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a built archive.
    ///
    /// An archive with no entries is never attached: under
    /// [`EmptyInputPolicy::Fail`] it is an error, under
    /// [`EmptyInputPolicy::Warn`] it is skipped with a warning. Returns
    /// whether the archive was attached.
    pub fn attach_archive(
        &mut self,
        archive: &ArchiveSummary,
        policy: EmptyInputPolicy,
        field: &'static str,
    ) -> std::result::Result<bool, PackagingError> {
        if archive.files_written == 0 {
            return match policy {
                EmptyInputPolicy::Fail => Err(PackagingError::NoFilesMatched { field }),
                EmptyInputPolicy::Warn => {
                    warn!("No files matched '{}'; the source archive will not be uploaded", field);
                    Ok(false)
                }
            };
        }

        debug!("Attaching archive {}", archive.path.display());
        self.archive = Some(archive.path.clone());
        Ok(true)
    }

    /// Attach each tool output as its own part.
    ///
    /// Keys are `"{n}-{base name}"` with `n` counting from 1 across all scan
    /// files in the payload, so files sharing a base name never collide.
    pub fn attach_scan_files(&mut self, files: &[ResolvedFile]) -> usize {
        if files.is_empty() {
            info!("No tool output files to attach");
            return 0;
        }

        for file in files {
            let key = format!("{}-{}", self.scan_files.len() + 1, file.base_name());
            debug!("Attaching {} as {}", file.absolute.display(), key);
            self.scan_files.push(ScanFilePart {
                key,
                path: file.absolute.clone(),
            });
        }
        files.len()
    }

    pub fn has_archive(&self) -> bool {
        self.archive.is_some()
    }

    pub fn archive_path(&self) -> Option<&Path> {
        self.archive.as_deref()
    }

    pub fn scan_files(&self) -> &[ScanFilePart] {
        &self.scan_files
    }

    pub fn is_empty(&self) -> bool {
        self.archive.is_none() && self.scan_files.is_empty()
    }

    /// Form field names in upload order
    pub fn part_names(&self) -> Vec<String> {
        self.archive
            .iter()
            .map(|_| ARCHIVE_PART_NAME.to_string())
            .chain(self.scan_files.iter().map(|p| p.key.clone()))
            .collect()
    }

    /// Build the multipart form; file contents are streamed when the form is sent
    pub async fn to_form(&self) -> Result<Form> {
        let mut form = Form::new();

        if let Some(ref archive) = self.archive {
            form = form.part(ARCHIVE_PART_NAME, file_part(archive).await?);
        }
        for scan in &self.scan_files {
            form = form.part(scan.key.clone(), file_part(&scan.path).await?);
        }

        Ok(form)
    }
}

/// Stream a file into a form part without buffering it in memory
async fn file_part(path: &Path) -> Result<Part> {
    let read_error = |source| PackagingError::Read {
        path: path.display().to_string(),
        source,
    };

    let file = tokio::fs::File::open(path).await.map_err(read_error)?;
    let length = file.metadata().await.map_err(read_error)?.len();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let body = Body::wrap_stream(ReaderStream::new(file));
    Ok(Part::stream_with_length(body, length).file_name(name))
}

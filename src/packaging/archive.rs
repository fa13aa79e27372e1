//! ZIP archive of source and binary inputs

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::glob::ResolvedFile;
use crate::error::PackagingError;

/// Files at or above this size need ZIP64 entry headers
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Result of a finished archive build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    /// Entries actually added, after self-exclusion
    pub files_written: usize,
}

/// Write `files` into a new ZIP archive at `target`.
///
/// Entries are added in the given order under their archive-relative path.
/// A file whose relative path equals `self_exclude` is skipped so a broad
/// pattern never packs the archive into itself. Any read or write failure
/// aborts the build; the file left at `target` must then be discarded.
pub fn build_archive(
    files: &[ResolvedFile],
    target: &Path,
    self_exclude: Option<&str>,
) -> Result<ArchiveSummary, PackagingError> {
    let sink = File::create(target).map_err(|e| {
        PackagingError::Write(format!("cannot create {}: {}", target.display(), e))
    })?;
    let mut zip = ZipWriter::new(BufWriter::new(sink));
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut files_written = 0;

    for file in files {
        if self_exclude == Some(file.relative.as_str()) {
            debug!("Skipping the archive itself: {}", file.relative);
            continue;
        }

        if let Err(e) = add_entry(&mut zip, file, &mut buffer) {
            warn!("Archive error on {}: {}", file.relative, e);
            return Err(e);
        }
        files_written += 1;
    }

    let mut inner = zip.finish().map_err(|e| {
        warn!("Archive error while finishing: {}", e);
        PackagingError::from(e)
    })?;
    inner
        .flush()
        .map_err(|e| PackagingError::Write(e.to_string()))?;

    info!(
        "Finished writing archive {} ({} files)",
        target.display(),
        files_written
    );

    Ok(ArchiveSummary {
        path: target.to_path_buf(),
        files_written,
    })
}

fn add_entry<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    file: &ResolvedFile,
    buffer: &mut [u8],
) -> Result<(), PackagingError> {
    let read_error = |source| PackagingError::Read {
        path: file.absolute.display().to_string(),
        source,
    };

    let mut source = File::open(&file.absolute).map_err(read_error)?;
    let size = source.metadata().map_err(read_error)?.len();

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(size >= ZIP64_THRESHOLD);
    zip.start_file(file.relative.as_str(), options)?;

    loop {
        let n = source.read(buffer).map_err(read_error)?;
        if n == 0 {
            break;
        }
        zip.write_all(&buffer[..n])
            .map_err(|e| PackagingError::Write(e.to_string()))?;
    }

    debug!("Added {} ({} bytes)", file.relative, size);
    Ok(())
}

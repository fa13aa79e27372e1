//! Glob resolution for input file lists
//!
//! Patterns are given as one comma-separated string. Relative patterns are
//! anchored at the working directory; a leading `!` turns a pattern into an
//! exclusion that removes matches of earlier or later patterns.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern};
use log::debug;

use crate::error::{ConfigError, PackagingError, Result};

/// `*` stays within one path segment, `**` crosses segments, dotfiles match
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Ordered, trimmed, non-empty patterns parsed from a comma-separated string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobSpec {
    /// Option name the patterns came from, used in error messages
    field: &'static str,
    patterns: Vec<String>,
}

impl GlobSpec {
    /// Split on commas, trim each entry and drop empty ones
    pub fn parse(field: &'static str, source: &str) -> Self {
        let patterns = source
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { field, patterns }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// True when no patterns remain after trimming
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Fail with a configuration error naming the field when empty
    pub fn require_non_empty(&self) -> Result<&Self> {
        if self.is_empty() {
            return Err(ConfigError::Missing(self.field).into());
        }
        Ok(self)
    }
}

/// A matched file and its path inside the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub absolute: PathBuf,
    /// Working-directory-relative path with `/` separators, or the absolute
    /// path unchanged when the file lies outside the working directory
    pub relative: String,
}

impl ResolvedFile {
    /// Final path component, used to name individually attached files
    pub fn base_name(&self) -> String {
        self.absolute
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.relative.clone())
    }
}

/// Expand a spec into an ordered file set.
///
/// Files keep the order in which patterns produced them; a file matched by
/// several patterns appears once. Directories are never included. A path the
/// walk cannot read fails the whole resolution.
pub fn resolve(spec: &GlobSpec, working_dir: &Path) -> Result<Vec<ResolvedFile>> {
    let base = if working_dir.is_absolute() {
        normalize(working_dir)
    } else {
        normalize(&std::env::current_dir()?.join(working_dir))
    };

    let mut includes = Vec::new();
    let mut excludes = Vec::new();
    for raw in spec.patterns() {
        match raw.strip_prefix('!') {
            Some(negated) => excludes.push(compile(spec.field, &anchor(&base, negated.trim()))?),
            None => includes.push(anchor(&base, raw)),
        }
    }

    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for pattern in &includes {
        debug!("Expanding glob {}", pattern);
        let paths = glob::glob_with(pattern, MATCH_OPTIONS).map_err(|e| ConfigError::Invalid {
            field: spec.field,
            reason: format!("bad glob pattern '{}': {}", pattern, e),
        })?;

        for entry in paths {
            let path = match entry {
                Ok(path) => normalize(&path),
                Err(e) => {
                    let path = e.path().display().to_string();
                    return Err(PackagingError::Read {
                        path,
                        source: e.into_error(),
                    }
                    .into());
                }
            };

            if path.is_dir() {
                continue;
            }
            if excludes.iter().any(|p| p.matches_path_with(&path, MATCH_OPTIONS)) {
                debug!("Excluded {}", path.display());
                continue;
            }
            if !seen.insert(path.clone()) {
                continue;
            }

            let relative = archive_relative(&path, &base);
            files.push(ResolvedFile {
                absolute: path,
                relative,
            });
        }
    }

    debug!("{} matched {} files", spec.field, files.len());
    Ok(files)
}

/// Path of `path` as stored in the archive, relative to `base` when inside it
pub fn archive_relative(path: &Path, base: &Path) -> String {
    let path = normalize(path);
    match path.strip_prefix(base) {
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

/// Anchor a relative pattern at `base`, escaping any glob syntax in `base`
fn anchor(base: &Path, pattern: &str) -> String {
    if Path::new(pattern).is_absolute() {
        return pattern.to_string();
    }
    let escaped = Pattern::escape(&base.to_string_lossy());
    let pattern = pattern.trim_start_matches("./");
    format!("{}/{}", escaped.trim_end_matches('/'), pattern)
}

fn compile(field: &'static str, pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|e| {
        ConfigError::Invalid {
            field,
            reason: format!("bad glob pattern '{}': {}", pattern, e),
        }
        .into()
    })
}

/// Lexically resolve `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

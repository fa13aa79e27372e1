//! Server version and API dialect

use semver::Version;

/// Oldest server version that understands branches on analysis submission
pub const MIN_BRANCHING_VERSION: Version = Version::new(2022, 4, 0);

/// Which flavour of the analysis API to speak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiDialect {
    /// Project addressed by ID only; branch options are ignored
    Legacy,
    /// Project plus target/base branch
    Branching,
}

/// Version string reported by the connectivity probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformVersion {
    raw: String,
    parsed: Option<Version>,
}

impl PlatformVersion {
    /// Parse a server version.
    ///
    /// Servers report calendar versions such as `2023.8.3`, `2023.08` or
    /// `2024.3.0-SNAPSHOT`. Strict semver is tried first, then the leading
    /// numeric components are read with missing parts as zero.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim().trim_start_matches('v');
        let parsed = Version::parse(trimmed).ok().or_else(|| lenient(trimmed));
        Self {
            raw: raw.to_string(),
            parsed,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Dialect for this server. Unparseable versions fall back to legacy.
    pub fn dialect(&self) -> ApiDialect {
        match &self.parsed {
            Some(v) if *v >= MIN_BRANCHING_VERSION => ApiDialect::Branching,
            _ => ApiDialect::Legacy,
        }
    }
}

fn lenient(raw: &str) -> Option<Version> {
    let core = raw.split(['-', '+']).next()?;
    let mut parts = core.split('.').map(|p| p.parse::<u64>());
    let major = parts.next()?.ok()?;
    let minor = parts.next().unwrap_or(Ok(0)).ok()?;
    let patch = parts.next().unwrap_or(Ok(0)).ok()?;
    Some(Version::new(major, minor, patch))
}

impl std::fmt::Display for PlatformVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

//! Change version parsing and ordering.
//!
//! Migration files are named after versions such as `1.0.0`, `v2.1` or
//! `1.3.0-rc1`. Parsing is deliberately lenient: a leading `v`/`V` is
//! stripped and short versions are padded to three segments, so `v1.2`
//! orders like `1.2.0`. The string as written is kept around because the
//! change-log table records it verbatim.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{MigrateError, Result};

/// A parsed change version with total ordering.
///
/// Ordering and equality compare the normalized semantic version only; the
/// original spelling does not participate. `v1.0` and `1.0.0` are equal.
#[derive(Debug, Clone)]
pub struct ChangeVersion {
    version: semver::Version,
    original: String,
}

impl ChangeVersion {
    /// Parse a version string.
    ///
    /// Accepts an optional leading `v`/`V`, one to three dot-separated
    /// numeric segments and an optional pre-release/build suffix. More than
    /// three numeric segments is an error.
    pub fn parse(input: &str) -> Result<Self> {
        let raw = input.trim();
        let stripped = raw.strip_prefix(['v', 'V']).unwrap_or(raw);
        if stripped.is_empty() {
            return Err(MigrateError::version(input, "empty version"));
        }

        let (core, suffix) = match stripped.find(['-', '+']) {
            Some(idx) => (&stripped[..idx], &stripped[idx..]),
            None => (stripped, ""),
        };

        let segments: Vec<&str> = core.split('.').collect();
        if segments.len() > 3 {
            return Err(MigrateError::version(
                input,
                "more than three numeric segments",
            ));
        }
        let mut numbers = Vec::with_capacity(3);
        for segment in &segments {
            let number: u64 = segment.parse().map_err(|_| {
                MigrateError::version(input, format!("segment {:?} is not numeric", segment))
            })?;
            numbers.push(number);
        }
        while numbers.len() < 3 {
            numbers.push(0);
        }

        let normalized = format!("{}.{}.{}{}", numbers[0], numbers[1], numbers[2], suffix);
        let version = semver::Version::parse(&normalized)
            .map_err(|e| MigrateError::version(input, e.to_string()))?;

        Ok(Self {
            version,
            original: raw.to_string(),
        })
    }

    /// The version string exactly as written, used for change-log rows.
    pub fn original(&self) -> &str {
        &self.original
    }
}

impl fmt::Display for ChangeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl PartialEq for ChangeVersion {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for ChangeVersion {}

impl PartialOrd for ChangeVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ChangeVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version.cmp(&other.version)
    }
}

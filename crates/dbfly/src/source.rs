//! Change descriptor sources.
//!
//! A source enumerates the available migration versions without reading
//! their content, then hands out raw descriptor bytes by uid. File names
//! determine everything: `<version>.xml` is a structured descriptor,
//! `<version>.sql` a raw script; anything else is ignored.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::{MigrateError, Result};
use crate::version::ChangeVersion;

/// One discovered unit of migration content.
#[derive(Debug, Clone)]
pub struct ChangeDescriptor {
    /// Version parsed from the file stem (or map key).
    pub version: ChangeVersion,
    /// Identifier passed back to [`Source::read`].
    pub uid: String,
    /// Raw SQL script (executed verbatim, dialect-filtered) versus a
    /// structured descriptor (decoded into nodes).
    pub raw_script: bool,
}

/// Enumerates and reads change descriptors.
pub trait Source: Send + Sync {
    /// List the available descriptors without reading content.
    fn scan(&self) -> Result<Vec<ChangeDescriptor>>;

    /// Read the raw bytes of one descriptor.
    fn read(&self, uid: &str) -> Result<Vec<u8>>;
}

/// Filesystem source scanning one or more directories.
///
/// A directory that does not exist is skipped rather than treated as an
/// error, so a project can list optional per-dialect directories.
#[derive(Debug, Clone)]
pub struct DirSource {
    paths: Vec<PathBuf>,
}

impl DirSource {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl Source for DirSource {
    fn scan(&self) -> Result<Vec<ChangeDescriptor>> {
        let mut descriptors = Vec::new();
        for path in &self.paths {
            let entries = match fs::read_dir(path) {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            for entry in entries {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    continue;
                }
                let file_name = entry.file_name().to_string_lossy().into_owned();
                let (stem, raw_script) = if let Some(stem) = file_name.strip_suffix(".xml") {
                    (stem, false)
                } else if let Some(stem) = file_name.strip_suffix(".sql") {
                    (stem, true)
                } else {
                    continue;
                };
                if stem.is_empty() {
                    continue;
                }
                descriptors.push(ChangeDescriptor {
                    version: ChangeVersion::parse(stem)?,
                    uid: entry.path().to_string_lossy().into_owned(),
                    raw_script,
                });
            }
        }
        Ok(descriptors)
    }

    fn read(&self, uid: &str) -> Result<Vec<u8>> {
        match fs::read(uid) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(MigrateError::NotFound(uid.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory source for content embedded in the binary.
///
/// Keys are version strings; scan order is the map's key order, which the
/// orchestrator re-sorts by parsed version anyway.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    changes: BTreeMap<String, MemoryChange>,
}

#[derive(Debug, Clone)]
struct MemoryChange {
    raw_script: bool,
    content: Vec<u8>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a structured descriptor under a version string.
    pub fn with_descriptor(mut self, version: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.changes.insert(
            version.into(),
            MemoryChange {
                raw_script: false,
                content: content.into(),
            },
        );
        self
    }

    /// Register a raw SQL script under a version string.
    pub fn with_script(mut self, version: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.changes.insert(
            version.into(),
            MemoryChange {
                raw_script: true,
                content: content.into(),
            },
        );
        self
    }
}

impl Source for MemorySource {
    fn scan(&self) -> Result<Vec<ChangeDescriptor>> {
        self.changes
            .iter()
            .map(|(version, change)| {
                Ok(ChangeDescriptor {
                    version: ChangeVersion::parse(version)?,
                    uid: version.clone(),
                    raw_script: change.raw_script,
                })
            })
            .collect()
    }

    fn read(&self, uid: &str) -> Result<Vec<u8>> {
        self.changes
            .get(uid)
            .map(|change| change.content.clone())
            .ok_or_else(|| MigrateError::NotFound(uid.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_scan_and_read() {
        let source = MemorySource::new()
            .with_descriptor("1.0.0", "<changes/>")
            .with_script("1.1.0", "SELECT 1;");
        let descriptors = source.scan().unwrap();
        assert_eq!(descriptors.len(), 2);
        let script = descriptors.iter().find(|d| d.raw_script).unwrap();
        assert_eq!(script.uid, "1.1.0");
        assert_eq!(source.read("1.1.0").unwrap(), b"SELECT 1;");
    }

    #[test]
    fn test_memory_source_read_unknown_uid() {
        let source = MemorySource::new();
        assert!(matches!(
            source.read("9.9.9"),
            Err(MigrateError::NotFound(_))
        ));
    }

    #[test]
    fn test_memory_source_rejects_bad_version_on_scan() {
        let source = MemorySource::new().with_descriptor("not-a-version", "<changes/>");
        assert!(source.scan().is_err());
    }

    #[test]
    fn test_dir_source_missing_directory_is_empty() {
        let source = DirSource::new(["/nonexistent/dbfly-migrations"]);
        assert!(source.scan().unwrap().is_empty());
    }

    #[test]
    fn test_dir_source_scans_xml_and_sql() {
        let dir = std::env::temp_dir().join(format!("dbfly-src-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("1.0.0.xml"), "<changes/>").unwrap();
        fs::write(dir.join("v1.1.0.sql"), "SELECT 1;").unwrap();
        fs::write(dir.join("README.md"), "ignored").unwrap();

        let source = DirSource::new([dir.clone()]);
        let mut descriptors = source.scan().unwrap();
        descriptors.sort_by(|a, b| a.version.cmp(&b.version));
        assert_eq!(descriptors.len(), 2);
        assert!(!descriptors[0].raw_script);
        assert!(descriptors[1].raw_script);
        assert_eq!(source.read(&descriptors[1].uid).unwrap(), b"SELECT 1;");

        fs::remove_dir_all(&dir).unwrap();
    }
}

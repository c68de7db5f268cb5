// src/storage/mod.rs

//! Cloud destinations for a run's outputs. Each strategy receives the chart
//! file by path, takes ownership of it, and removes it (plus anything it
//! staged itself) once the upload attempt is over, whether it succeeded or not.

pub mod direct;
pub mod staged;

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

use crate::data::{DataExtension, GroupedResult};
use crate::error::{Error, Result};

pub use direct::{BlobClient, DirectPathStore, GcsBlobClient};
pub use staged::{DriveFolderClient, FolderClient, StagedFolderStore};

/// What ended up where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub folder: String,
    /// Remote location of every object written, figure first.
    pub objects: Vec<String>,
}

pub trait StorageStrategy {
    fn name(&self) -> &'static str;

    /// Upload the chart at `figure` and `grouped` (serialized per `ext`) into
    /// `folder`. The local figure file is consumed.
    fn upload(
        &self,
        grouped: &GroupedResult,
        ext: DataExtension,
        folder: &str,
        figure: &Path,
    ) -> Result<UploadReport>;
}

/// A run-temporary local file, removed when the guard drops.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    /// Take ownership of an existing (or about to be written) file.
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> Result<String> {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::io(
                    &self.path,
                    std::io::Error::new(ErrorKind::InvalidInput, "path has no file name"),
                )
            })
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).map_err(|e| Error::io(&self.path, e))
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed local file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove local file"),
        }
    }
}

/// `prefix/folder/file`, skipping empty parts and stray slashes.
pub fn remote_path(prefix: Option<&str>, folder: &str, file: &str) -> String {
    prefix
        .into_iter()
        .chain([folder, file])
        .map(|part| part.trim_matches('/'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::CountryCounts;
    use tempfile::tempdir;

    pub(crate) fn grouped_mapping() -> GroupedResult {
        GroupedResult::Mapping(CountryCounts::sorted(vec![
            ("usa".to_string(), 2),
            ("uk".to_string(), 1),
        ]))
    }

    pub(crate) fn grouped_table() -> GroupedResult {
        let counts = CountryCounts::sorted(vec![("usa".to_string(), 2), ("uk".to_string(), 1)]);
        GroupedResult::Table(counts.to_batch().unwrap())
    }

    /// A stand-in chart file.
    pub(crate) fn write_figure(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"\x89PNG fake").unwrap();
        path
    }

    pub(crate) fn leftover_files(dir: &Path) -> Vec<PathBuf> {
        glob::glob(&format!("{}/*", dir.display()))
            .unwrap()
            .filter_map(std::result::Result::ok)
            .collect()
    }

    #[test]
    fn artifact_is_removed_on_drop() {
        let dir = tempdir().unwrap();
        let path = write_figure(dir.path(), "a.png");
        {
            let artifact = TempArtifact::adopt(&path);
            assert_eq!(artifact.file_name().unwrap(), "a.png");
            assert_eq!(artifact.read().unwrap(), b"\x89PNG fake");
        }
        assert!(!path.exists());
    }

    #[test]
    fn nameless_path_is_an_io_error() {
        let artifact = TempArtifact::adopt("");
        assert!(matches!(
            artifact.file_name(),
            Err(Error::Io { source, .. }) if source.kind() == ErrorKind::InvalidInput
        ));
    }

    #[test]
    fn artifact_tolerates_missing_file() {
        let dir = tempdir().unwrap();
        drop(TempArtifact::adopt(dir.path().join("never-written.csv")));
        assert!(leftover_files(dir.path()).is_empty());
    }

    #[test]
    fn remote_path_joins_non_empty_parts() {
        assert_eq!(remote_path(None, "run1", "a.png"), "run1/a.png");
        assert_eq!(remote_path(Some("data/"), "/run1", "a.png"), "data/run1/a.png");
        assert_eq!(remote_path(Some(""), "run1", "a.png"), "run1/a.png");
    }
}

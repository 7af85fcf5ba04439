//! Walking the source tree to produce the "current" side of a diff.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use walkdir::WalkDir;

use crate::error::ScanError;

/// Size and modification time observed on disk for one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiskEntry {
    /// File size in bytes.
    pub size: u64,
    /// Modification time, as seconds since the UNIX epoch.
    pub mtime: u64,
}

/// Everything one scan of the source tree observes: every regular file,
/// keyed by its path relative to the scan root, and every directory's
/// relative path, reported regardless of whether it holds any files — an
/// empty directory is a first-class entity, not merely the absence of a
/// file beneath it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Files found, keyed by path relative to the scan root.
    pub files: BTreeMap<PathBuf, DiskEntry>,
    /// Directories found, relative to the scan root.
    pub dirs: BTreeSet<PathBuf>,
}

/// Walks `root`, recording every file and every directory beneath it,
/// relative to `root`.
pub fn scan(root: &Path) -> Result<ScanResult, ScanError> {
    let mut result = ScanResult::default();
    for entry in WalkDir::new(root).min_depth(1).into_iter() {
        let entry = entry.map_err(|err| ScanError::Walk {
            path: err
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
            source: err.into(),
        })?;
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_path_buf();
        if entry.file_type().is_dir() {
            result.dirs.insert(relative);
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }
        let metadata = entry.metadata().map_err(|err| ScanError::Walk {
            path: entry.path().to_path_buf(),
            source: err.into(),
        })?;
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_secs());
        result.files.insert(
            relative,
            DiskEntry {
                size: metadata.len(),
                mtime,
            },
        );
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scan_finds_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/b/c.txt"), b"hello").unwrap();
        fs::write(dir.path().join("top.txt"), b"hi").unwrap();

        let scanned = scan(dir.path()).unwrap();
        assert_eq!(scanned.files.len(), 2);
        assert_eq!(scanned.files[Path::new("a/b/c.txt")].size, 5);
        assert_eq!(scanned.files[Path::new("top.txt")].size, 2);
        assert!(scanned.dirs.contains(Path::new("a")));
        assert!(scanned.dirs.contains(Path::new("a/b")));
    }

    #[test]
    fn scan_of_empty_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let scanned = scan(dir.path()).unwrap();
        assert!(scanned.files.is_empty());
        assert!(scanned.dirs.is_empty());
    }

    #[test]
    fn scan_records_an_empty_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();

        let scanned = scan(dir.path()).unwrap();
        assert!(scanned.files.is_empty());
        assert_eq!(scanned.dirs, BTreeSet::from([PathBuf::from("empty")]));
    }
}

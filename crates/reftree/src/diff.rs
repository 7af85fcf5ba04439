//! Classifying a freshly scanned directory against the persisted reference
//! tree into the disjoint sets a synchronization pass acts on.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::scan::ScanResult;
use crate::tree::ReferenceTree;

/// The classification of every file and directory path seen on either
/// side.
#[derive(Debug, Default)]
pub struct DiffResult {
    /// Present on both sides with matching size and mtime.
    pub same: Vec<PathBuf>,
    /// Present on both sides with a differing size or mtime.
    pub different: Vec<PathBuf>,
    /// Tracked in the reference tree but absent from the current scan.
    pub only_in_reference: Vec<PathBuf>,
    /// Present in the current scan but not yet tracked.
    pub only_on_disk: Vec<PathBuf>,
    /// Directories tracked in the reference tree but absent from the
    /// current scan. Mirrors `only_in_reference`, but for directories: a
    /// directory is reported here even if it never held a file.
    pub dirs_vanished: Vec<PathBuf>,
    /// Directories present in the current scan but not yet tracked.
    pub dirs_new: Vec<PathBuf>,
}

/// Compares `tree`'s tracked files and directories against `disk`, the
/// result of a fresh [`crate::scan::scan`].
#[must_use]
pub fn classify(tree: &ReferenceTree, disk: &ScanResult) -> DiffResult {
    let mut result = DiffResult::default();

    for (path, attrs) in tree.files() {
        match disk.files.get(path) {
            Some(entry) if entry.size == attrs.size && entry.mtime == attrs.mtime => {
                result.same.push(path.to_path_buf());
            }
            Some(_) => result.different.push(path.to_path_buf()),
            None => result.only_in_reference.push(path.to_path_buf()),
        }
    }

    for path in disk.files.keys() {
        if tree.file_attrs(path).is_none() {
            result.only_on_disk.push(path.clone());
        }
    }

    let tracked_dirs: BTreeSet<&Path> = tree.dirs().collect();
    for path in &tracked_dirs {
        if !disk.dirs.contains(*path) {
            result.dirs_vanished.push(path.to_path_buf());
        }
    }
    for path in &disk.dirs {
        if !tracked_dirs.contains(path.as_path()) {
            result.dirs_new.push(path.clone());
        }
    }

    result
}

//! Persisting the reference tree as a structured XML document between
//! synchronization passes.
//!
//! The document shape is a single root element carrying the pass's
//! scan-time, nested directory elements carrying only a name, and file
//! elements carrying the six synchronization attributes. Only the listed
//! attributes need to round-trip exactly; the element nesting exists so the
//! document stays human-inspectable next to the mirrored directory, not
//! because any reader depends on its shape.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PersistError;
use crate::tree::{DocNode, FileAttrs, ReferenceTree};

/// Canonical filename for the persisted reference document.
pub const DEFAULT_FILENAME: &str = "BFTPsynchro.xml";

/// Suffix applied to the prior version before a new one is written.
pub const BACKUP_SUFFIX: &str = ".bak";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "synchro")]
struct RootXml {
    #[serde(rename = "@scan_time")]
    scan_time: u64,
    #[serde(rename = "$value", default)]
    children: Vec<NodeXml>,
}

#[derive(Debug, Serialize, Deserialize)]
enum NodeXml {
    #[serde(rename = "dir")]
    Dir(DirXml),
    #[serde(rename = "file")]
    File(FileXml),
}

#[derive(Debug, Serialize, Deserialize)]
struct DirXml {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "$value", default)]
    children: Vec<NodeXml>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FileXml {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@size")]
    size: u64,
    #[serde(rename = "@mtime")]
    mtime: u64,
    #[serde(rename = "@crc")]
    crc: u32,
    #[serde(rename = "@NbSend")]
    nb_send: i32,
    #[serde(rename = "@LastSend")]
    last_send: u64,
    #[serde(rename = "@LastView")]
    last_view: u64,
}

fn doc_to_xml(node: &DocNode) -> NodeXml {
    match node {
        DocNode::Dir { name, children } => NodeXml::Dir(DirXml {
            name: name.clone(),
            children: children.iter().map(doc_to_xml).collect(),
        }),
        DocNode::File { name, attrs } => NodeXml::File(FileXml {
            name: name.clone(),
            size: attrs.size,
            mtime: attrs.mtime,
            crc: attrs.crc,
            nb_send: attrs.nb_send,
            last_send: attrs.last_send,
            last_view: attrs.last_view,
        }),
    }
}

fn xml_to_doc(node: NodeXml) -> DocNode {
    match node {
        NodeXml::Dir(dir) => DocNode::Dir {
            name: dir.name,
            children: dir.children.into_iter().map(xml_to_doc).collect(),
        },
        NodeXml::File(file) => DocNode::File {
            name: file.name,
            attrs: FileAttrs {
                size: file.size,
                mtime: file.mtime,
                crc: file.crc,
                nb_send: file.nb_send,
                last_send: file.last_send,
                last_view: file.last_view,
            },
        },
    }
}

/// Loads the reference tree from `path`. A missing file is not an error at
/// this layer — callers that want "fresh tree if absent" semantics (the
/// default, non-`--resume` behavior) should check [`Path::exists`] first and
/// call [`ReferenceTree::empty`] instead of calling this function.
pub fn load(path: &Path) -> Result<ReferenceTree, PersistError> {
    let raw = fs::read_to_string(path).map_err(|source| PersistError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let root: RootXml = quick_xml::de::from_str(&raw).map_err(|source| PersistError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    let children = root.children.into_iter().map(xml_to_doc).collect();
    Ok(ReferenceTree::from_doc_children(root.scan_time, children))
}

/// Persists `tree` to `path`: the prior version (if any) is renamed to a
/// `.bak` sibling, then the new document is written to a temporary file in
/// the same directory and renamed into place, so a reader never observes a
/// half-written document at `path`.
pub fn save(tree: &ReferenceTree, path: &Path) -> Result<(), PersistError> {
    let root = RootXml {
        scan_time: tree.scan_time(),
        children: tree.to_doc_children().iter().map(doc_to_xml).collect(),
    };
    let xml = quick_xml::se::to_string(&root)?;

    if path.exists() {
        let backup = backup_path(path);
        fs::rename(path, &backup).map_err(|source| PersistError::Rename {
            from: path.to_path_buf(),
            to: backup,
            source,
        })?;
    }

    let tmp = tmp_path(path);
    fs::write(&tmp, xml.as_bytes()).map_err(|source| PersistError::Write {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| PersistError::Rename {
        from: tmp,
        to: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path as StdPath;

    fn attrs(nb_send: i32) -> FileAttrs {
        FileAttrs {
            size: 10,
            mtime: 100,
            crc: 0xDEAD_BEEF,
            nb_send,
            last_send: 5,
            last_view: 6,
        }
    }

    #[test]
    fn save_then_load_round_trips_tree_shape_and_attrs() {
        let dir = tempfile::tempdir().unwrap();
        let doc_path = dir.path().join(DEFAULT_FILENAME);

        let mut tree = ReferenceTree::empty(1_700_000_000);
        tree.insert_file(StdPath::new("a/b/c.txt"), attrs(3));
        tree.insert_file(StdPath::new("top.txt"), attrs(-2));

        save(&tree, &doc_path).unwrap();
        let loaded = load(&doc_path).unwrap();

        assert_eq!(loaded.scan_time(), 1_700_000_000);
        assert_eq!(
            loaded.file_attrs(StdPath::new("a/b/c.txt")),
            Some(&attrs(3))
        );
        assert_eq!(loaded.file_attrs(StdPath::new("top.txt")), Some(&attrs(-2)));
        assert_eq!(loaded.file_count(), 2);
    }

    #[test]
    fn save_renames_prior_version_to_backup() {
        let dir = tempfile::tempdir().unwrap();
        let doc_path = dir.path().join(DEFAULT_FILENAME);
        let backup = backup_path(&doc_path);

        let first = ReferenceTree::empty(1);
        save(&first, &doc_path).unwrap();
        assert!(!backup.exists());

        let second = ReferenceTree::empty(2);
        save(&second, &doc_path).unwrap();
        assert!(backup.exists());

        let reloaded = load(&doc_path).unwrap();
        assert_eq!(reloaded.scan_time(), 2);
    }

    #[test]
    fn save_does_not_leave_a_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let doc_path = dir.path().join(DEFAULT_FILENAME);
        save(&ReferenceTree::empty(1), &doc_path).unwrap();
        assert!(!tmp_path(&doc_path).exists());
    }

    #[test]
    fn load_of_missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("nope.xml")).unwrap_err();
        assert!(matches!(err, PersistError::Read { .. }));
    }
}

//! The arena-backed directory tree the sender persists between passes.
//!
//! Nodes live in a flat `Vec` addressed by [`NodeId`]; directories hold
//! child ids rather than owning their children, so the tree has no cycles
//! and no need for reference counting. The path→node lookups used by
//! [`ReferenceTree::file_attrs`] and [`ReferenceTree::dirs`] are derived
//! indices, kept in sync on every insert or remove, never hand patched in
//! place. Directories are tracked in their own index independent of the
//! files they hold, so a directory with no files in it is still a
//! first-class, individually addressable entity.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Per-file synchronization attributes, independent of filesystem metadata.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FileAttrs {
    /// Declared file size in bytes, as of the last scan that saw this file.
    pub size: u64,
    /// Declared modification time, as of the last scan that saw this file.
    pub mtime: u64,
    /// IEEE CRC32 of the file's content, cached from the last send.
    pub crc: u32,
    /// Non-negative: successful emissions of the current content. Negative:
    /// the deletion countdown for a vanished file, from -1 down to -10.
    pub nb_send: i32,
    /// UNIX timestamp of the last successful emission.
    pub last_send: u64,
    /// UNIX timestamp of the last scan that saw this file present.
    pub last_view: u64,
}

impl FileAttrs {
    /// Whether this file is mid deletion-countdown after vanishing from disk.
    #[must_use]
    pub const fn is_vanishing(&self) -> bool {
        self.nb_send < 0
    }
}

/// Opaque index into a [`ReferenceTree`]'s arena.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
enum NodeKind {
    Dir { children: Vec<NodeId> },
    File { attrs: FileAttrs },
}

#[derive(Debug)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    kind: NodeKind,
}

/// A directory tree rooted at the synchronized directory, carrying
/// per-file synchronization attributes alongside ordinary tree shape.
#[derive(Debug)]
pub struct ReferenceTree {
    nodes: Vec<Node>,
    root: NodeId,
    scan_time: u64,
    index: HashMap<PathBuf, NodeId>,
    dir_index: HashMap<PathBuf, NodeId>,
}

impl ReferenceTree {
    /// Builds an empty tree, as used for a fresh (non-resumed) synchronization
    /// run.
    #[must_use]
    pub fn empty(scan_time: u64) -> Self {
        let root = Node {
            name: String::new(),
            parent: None,
            kind: NodeKind::Dir {
                children: Vec::new(),
            },
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            scan_time,
            index: HashMap::new(),
            dir_index: HashMap::new(),
        }
    }

    /// The timestamp this tree was last scanned at.
    #[must_use]
    pub const fn scan_time(&self) -> u64 {
        self.scan_time
    }

    /// Records a new scan timestamp for this tree.
    pub fn set_scan_time(&mut self, scan_time: u64) {
        self.scan_time = scan_time;
    }

    /// Attributes for the file at `path`, if tracked.
    #[must_use]
    pub fn file_attrs(&self, path: &Path) -> Option<&FileAttrs> {
        let id = *self.index.get(path)?;
        match &self.nodes[id.0].kind {
            NodeKind::File { attrs } => Some(attrs),
            NodeKind::Dir { .. } => None,
        }
    }

    /// Mutable attributes for the file at `path`, if tracked.
    pub fn file_attrs_mut(&mut self, path: &Path) -> Option<&mut FileAttrs> {
        let id = *self.index.get(path)?;
        match &mut self.nodes[id.0].kind {
            NodeKind::File { attrs } => Some(attrs),
            NodeKind::Dir { .. } => None,
        }
    }

    /// All tracked files as `(relative path, attributes)` pairs.
    pub fn files(&self) -> impl Iterator<Item = (&Path, &FileAttrs)> {
        self.index.iter().filter_map(move |(path, id)| {
            match &self.nodes[id.0].kind {
                NodeKind::File { attrs } => Some((path.as_path(), attrs)),
                NodeKind::Dir { .. } => None,
            }
        })
    }

    /// Number of files currently tracked in this tree.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.index.len()
    }

    /// All tracked directory paths, excluding the implicit root.
    pub fn dirs(&self) -> impl Iterator<Item = &Path> {
        self.dir_index.keys().map(PathBuf::as_path)
    }

    /// Records `path` as a tracked directory, creating any missing
    /// ancestors. A no-op if `path` is already tracked.
    pub fn insert_dir(&mut self, path: &Path) {
        self.ensure_dir_path(Some(path));
    }

    /// Whether the directory tracked at `path` currently has no children.
    /// `false` if `path` is not a tracked directory.
    #[must_use]
    pub fn dir_is_empty(&self, path: &Path) -> bool {
        let Some(&id) = self.dir_index.get(path) else {
            return false;
        };
        matches!(&self.nodes[id.0].kind, NodeKind::Dir { children } if children.is_empty())
    }

    /// Removes the tracked directory at `path`, provided it currently has
    /// no children. Returns whether the directory was removed.
    pub fn remove_empty_dir(&mut self, path: &Path) -> bool {
        let Some(&id) = self.dir_index.get(path) else {
            return false;
        };
        if !matches!(&self.nodes[id.0].kind, NodeKind::Dir { children } if children.is_empty()) {
            return false;
        }
        self.dir_index.remove(path);
        if let Some(parent) = self.nodes[id.0].parent {
            self.remove_child(parent, id);
        }
        true
    }

    /// Inserts or replaces the file at `path`, creating any missing
    /// ancestor directory nodes.
    pub fn insert_file(&mut self, path: &Path, attrs: FileAttrs) {
        if let Some(existing) = self.index.get(path).copied() {
            if let NodeKind::File { attrs: slot } = &mut self.nodes[existing.0].kind {
                *slot = attrs;
                return;
            }
        }
        let parent = self.ensure_dir_path(path.parent());
        let name = component_name(path);
        let id = self.push_node(Node {
            name,
            parent: Some(parent),
            kind: NodeKind::File { attrs },
        });
        self.add_child(parent, id);
        self.index.insert(path.to_path_buf(), id);
    }

    /// Removes the file at `path`, if tracked. Does not prune any
    /// now-empty ancestor directories; call [`Self::prune_empty_dirs`]
    /// separately once a pass's removals are complete.
    pub fn remove_file(&mut self, path: &Path) {
        let Some(id) = self.index.remove(path) else {
            return;
        };
        if let Some(parent) = self.nodes[id.0].parent {
            self.remove_child(parent, id);
        }
    }

    /// Removes every tracked directory with no remaining children,
    /// repeating until no change occurs (so emptying a leaf directory also
    /// empties its now-childless parent, and so on up to the root).
    ///
    /// This discards tracking of directories regardless of whether they
    /// are still present on disk; callers that only want to drop
    /// directories that have actually vanished from a scan should use
    /// [`Self::remove_empty_dir`] against that scan's vanished set instead.
    pub fn prune_empty_dirs(&mut self) {
        loop {
            let empty: Vec<PathBuf> = self
                .dir_index
                .iter()
                .filter(|(_, &id)| {
                    matches!(&self.nodes[id.0].kind, NodeKind::Dir { children } if children.is_empty())
                })
                .map(|(path, _)| path.clone())
                .collect();
            if empty.is_empty() {
                break;
            }
            for path in empty {
                self.remove_empty_dir(&path);
            }
        }
    }

    /// Walks (creating as needed) the chain of directory nodes for
    /// `relative_dir`, returning the id of the final directory.
    fn ensure_dir_path(&mut self, relative_dir: Option<&Path>) -> NodeId {
        let mut current = self.root;
        let Some(dir) = relative_dir else {
            return current;
        };
        let mut accumulated = PathBuf::new();
        for component in dir.components() {
            let name = component.as_os_str().to_string_lossy().into_owned();
            accumulated.push(&name);
            if let Some(existing) = self.find_child_dir(current, &name) {
                current = existing;
                continue;
            }
            let id = self.push_node(Node {
                name,
                parent: Some(current),
                kind: NodeKind::Dir {
                    children: Vec::new(),
                },
            });
            self.add_child(current, id);
            self.dir_index.insert(accumulated.clone(), id);
            current = id;
        }
        current
    }

    fn find_child_dir(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        let NodeKind::Dir { children } = &self.nodes[parent.0].kind else {
            return None;
        };
        children.iter().copied().find(|child| {
            self.nodes[child.0].name == name && matches!(self.nodes[child.0].kind, NodeKind::Dir { .. })
        })
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn add_child(&mut self, parent: NodeId, child: NodeId) {
        if let NodeKind::Dir { children } = &mut self.nodes[parent.0].kind {
            children.push(child);
        }
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        if let NodeKind::Dir { children } = &mut self.nodes[parent.0].kind {
            children.retain(|c| *c != child);
        }
    }
}

fn component_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A directory- or file-shaped node in the persisted document's shape,
/// independent of any concrete serialization format. Bridges the arena's
/// `NodeId` addressing (an implementation detail) and `crate::persist`'s
/// serde-derived XML structs (a serialization detail) without either one
/// needing to know about the other.
#[derive(Debug, Clone)]
pub(crate) enum DocNode {
    Dir { name: String, children: Vec<DocNode> },
    File { name: String, attrs: FileAttrs },
}

impl ReferenceTree {
    /// Renders the tree (excluding the root itself) as a nested [`DocNode`]
    /// list, for `persist::save` to serialize.
    pub(crate) fn to_doc_children(&self) -> Vec<DocNode> {
        self.doc_children_of(self.root)
    }

    fn doc_children_of(&self, id: NodeId) -> Vec<DocNode> {
        let NodeKind::Dir { children } = &self.nodes[id.0].kind else {
            return Vec::new();
        };
        children
            .iter()
            .map(|&child| match &self.nodes[child.0].kind {
                NodeKind::Dir { .. } => DocNode::Dir {
                    name: self.nodes[child.0].name.clone(),
                    children: self.doc_children_of(child),
                },
                NodeKind::File { attrs } => DocNode::File {
                    name: self.nodes[child.0].name.clone(),
                    attrs: *attrs,
                },
            })
            .collect()
    }

    /// Builds a tree from a nested [`DocNode`] list, the inverse of
    /// [`Self::to_doc_children`], for `persist::load`.
    pub(crate) fn from_doc_children(scan_time: u64, children: Vec<DocNode>) -> Self {
        let mut tree = Self::empty(scan_time);
        tree.insert_doc_children(PathBuf::new(), children);
        tree
    }

    fn insert_doc_children(&mut self, prefix: PathBuf, children: Vec<DocNode>) {
        for child in children {
            match child {
                DocNode::File { name, attrs } => {
                    self.insert_file(&prefix.join(&name), attrs);
                }
                DocNode::Dir { name, children } => {
                    let dir_path = prefix.join(&name);
                    self.ensure_dir_path(Some(&dir_path));
                    self.insert_doc_children(dir_path, children);
                }
            }
        }
    }
}

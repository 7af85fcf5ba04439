#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! The sender's reference tree: an in-memory mirror of the last synchronized
//! directory, diffed against a fresh scan each pass and persisted to disk as
//! a structured XML document between passes.
//!
//! This crate is the sender's only writer of synchronization state — no
//! other component reads or mutates [`ReferenceTree`]. The submodules map
//! directly onto one pass of the synchronization loop: [`scan`] walks the
//! source tree, [`diff`] classifies the result against the tree, callers
//! mutate [`tree::ReferenceTree`] per the classification, and [`persist`]
//! writes the updated tree back out. [`reset`] is the odd one out: an
//! administrative operation run outside the normal pass loop to rewind a
//! persisted tree's emission bookkeeping by hand.

mod diff;
mod error;
mod persist;
mod reset;
mod scan;
mod tree;

pub use diff::{classify, DiffResult};
pub use error::{PersistError, ResetError, ScanError};
pub use persist::{load, save, BACKUP_SUFFIX, DEFAULT_FILENAME};
pub use reset::{reset, ResetOutcome, ResetSelector};
pub use scan::{scan, DiskEntry, ScanResult};
pub use tree::{FileAttrs, NodeId, ReferenceTree};

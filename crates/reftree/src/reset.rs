//! Rewinding emission bookkeeping in a persisted reference tree, so a
//! sender can be told to resend files without a full resynchronization.
//!
//! A data-diode link can go down for reasons the sender never learns
//! about — the receiver never complains, because there is no reverse
//! channel. When an operator discovers after the fact that a window of
//! emissions never arrived, these selectors let them rewind `nb_send`/
//! `last_send` on exactly the files affected, so the next synchronization
//! pass resends them without re-scanning or forgetting what was already
//! correctly delivered.
//!
//! The four selection criteria mirror the standalone reset tool this
//! system's design traces back to: reset everything sent after a given
//! time, everything matching a path pattern, everything that diverges
//! from a scan of what the receiver actually has on disk, or one exact
//! path.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::diff::classify;
use crate::error::ResetError;
use crate::scan::scan;
use crate::tree::ReferenceTree;

/// Which tracked files have their `nb_send`/`last_send` rewound to zero.
#[derive(Debug)]
pub enum ResetSelector {
    /// Every file last sent strictly after `since` (UNIX seconds).
    SentAfter(u64),
    /// Every file whose relative path matches `pattern`.
    MatchingPath(Regex),
    /// The single file at this exact relative path.
    ExactPath(PathBuf),
    /// Every file that is missing or differs when `received_root` (a scan
    /// of what the receiver actually holds) is compared against the
    /// reference tree.
    DivergingFrom(PathBuf),
}

impl ResetSelector {
    /// Builds [`Self::MatchingPath`] from a regular expression pattern,
    /// surfacing a compile failure as [`ResetError::InvalidPattern`].
    pub fn matching_path(pattern: &str) -> Result<Self, ResetError> {
        Ok(Self::MatchingPath(Regex::new(pattern)?))
    }
}

/// How many files a [`reset`] call touched, out of how many are tracked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetOutcome {
    /// Total files tracked in the reference tree at the time of the call.
    pub total_files: usize,
    /// Files whose `nb_send`/`last_send` were rewound.
    pub reset_files: usize,
}

/// Rewinds every file `selector` matches in `tree` to `nb_send = 0`,
/// `last_send = 0`, forcing the next synchronization pass to treat them
/// as unsent. Leaves `size`/`mtime`/`crc`/`last_view` untouched — the
/// file's content on disk hasn't changed, only its delivery bookkeeping
/// has.
pub fn reset(tree: &mut ReferenceTree, selector: &ResetSelector) -> Result<ResetOutcome, ResetError> {
    let total_files = tree.file_count();
    let targets = select(tree, selector)?;
    for path in &targets {
        if let Some(attrs) = tree.file_attrs_mut(path) {
            attrs.last_send = 0;
            attrs.nb_send = 0;
        }
    }
    Ok(ResetOutcome {
        total_files,
        reset_files: targets.len(),
    })
}

fn select(tree: &ReferenceTree, selector: &ResetSelector) -> Result<Vec<PathBuf>, ResetError> {
    match selector {
        ResetSelector::SentAfter(since) => Ok(tree
            .files()
            .filter(|(_, attrs)| attrs.last_send > *since)
            .map(|(path, _)| path.to_path_buf())
            .collect()),
        ResetSelector::MatchingPath(pattern) => Ok(tree
            .files()
            .filter(|(path, _)| pattern.is_match(&path.to_string_lossy()))
            .map(|(path, _)| path.to_path_buf())
            .collect()),
        ResetSelector::ExactPath(path) => Ok(if tree.file_attrs(path).is_some() {
            vec![path.clone()]
        } else {
            Vec::new()
        }),
        ResetSelector::DivergingFrom(received_root) => {
            let received = scan(received_root)?;
            let diff = classify(tree, &received);
            let mut targets = diff.different;
            targets.extend(diff.only_in_reference);
            Ok(targets)
        }
    }
}

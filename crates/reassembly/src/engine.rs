//! The receive loop's single per-destination state: a map from
//! destination-relative path to live [`ReceivingFile`], plus the
//! skip-on-match and supersede rules that decide whether an incoming chunk
//! starts, continues, replaces, or is dropped against that map.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::{PublishError, ReassemblyError};
use crate::publish::publish;
use crate::record::{FileIdentity, ReceivingFile};

/// What happened to one incoming chunk, for the receive loop to log at the
/// appropriate level.
#[derive(Debug)]
pub enum ChunkOutcome {
    /// No live record existed for this path; one was started.
    Started,
    /// A live record existed but declared a different file identity; it was
    /// discarded and a fresh record started from this chunk.
    Superseded,
    /// Folded into an already-live record; the file is not yet complete.
    Accepted,
    /// This chunk index had already been received; nothing changed.
    Duplicate,
    /// No live record exists and the destination already holds a file with
    /// identical size and mtime; the chunk is ignored entirely.
    SkippedAlreadyPresent,
    /// `offset + data_len` exceeded the declared `file_size`; dropped.
    OutOfBounds,
    /// This chunk completed the file; it was published to `path`.
    Published(PathBuf),
}

/// Owns every in-progress receiving file for one destination directory.
/// Only the receive loop mutates this — no other component reads or writes
/// the live-file map, per the single-owner discipline the design relies on
/// instead of locking.
pub struct ReassemblyEngine {
    dest_root: PathBuf,
    scratch_dir: PathBuf,
    live: HashMap<PathBuf, ReceivingFile>,
}

impl ReassemblyEngine {
    /// Builds an engine publishing into `dest_root`, scratching chunks into
    /// the system temp directory by default (see [`Self::with_scratch_dir`]
    /// to override).
    #[must_use]
    pub fn new(dest_root: impl Into<PathBuf>) -> Self {
        Self {
            dest_root: dest_root.into(),
            scratch_dir: std::env::temp_dir(),
            live: HashMap::new(),
        }
    }

    /// Overrides the scratch directory used to stage in-progress files.
    #[must_use]
    pub fn with_scratch_dir(mut self, scratch_dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = scratch_dir.into();
        self
    }

    /// The directory completed files are published into.
    #[must_use]
    pub fn dest_root(&self) -> &Path {
        &self.dest_root
    }

    /// Number of files currently in progress.
    #[must_use]
    pub fn live_file_count(&self) -> usize {
        self.live.len()
    }

    /// Whether `rel_path` has an in-progress record.
    #[must_use]
    pub fn is_live(&self, rel_path: &Path) -> bool {
        self.live.contains_key(rel_path)
    }

    /// Applies one file-chunk's fields to the engine's state, performing
    /// skip-on-match, supersede, duplicate-drop, bounds-checking, and
    /// publish-on-completion in that order.
    pub fn handle_chunk(
        &mut self,
        rel_path: &Path,
        identity: FileIdentity,
        chunk_index: i32,
        chunk_count: i32,
        offset: u64,
        data: &[u8],
    ) -> Result<ChunkOutcome, ReassemblyError> {
        let end = offset.checked_add(data.len() as u64);
        if end.map_or(true, |end| end > identity.size) {
            return Ok(ChunkOutcome::OutOfBounds);
        }

        let mut outcome_hint = ChunkOutcome::Accepted;
        match self.live.get(rel_path) {
            None => {
                if self.destination_matches(rel_path, identity) {
                    return Ok(ChunkOutcome::SkippedAlreadyPresent);
                }
                self.start_record(rel_path, identity, chunk_count)?;
                outcome_hint = ChunkOutcome::Started;
            }
            Some(existing) if existing.is_superseded_by(identity) => {
                self.start_record(rel_path, identity, chunk_count)?;
                outcome_hint = ChunkOutcome::Superseded;
            }
            Some(_) => {}
        }

        let record = self
            .live
            .get_mut(rel_path)
            .expect("a record was just started or already live");
        if record.is_bit_set(chunk_index) {
            return Ok(ChunkOutcome::Duplicate);
        }
        record.accept_chunk(chunk_index, offset, data)?;

        if !record.is_complete() {
            return Ok(outcome_hint);
        }

        let mut record = self
            .live
            .remove(rel_path)
            .expect("record completed above and is still keyed");
        match publish(&mut record, &self.dest_root, rel_path) {
            Ok(dest_path) => Ok(ChunkOutcome::Published(dest_path)),
            Err(err) => Err(ReassemblyError::Publish(err)),
        }
    }

    /// Drops the live record for `rel_path`, if any, without publishing —
    /// used by the delete handler so a file mid-transfer doesn't resurrect
    /// itself from buffered chunks after its delete notification lands.
    pub fn cancel(&mut self, rel_path: &Path) {
        self.live.remove(rel_path);
    }

    fn start_record(
        &mut self,
        rel_path: &Path,
        identity: FileIdentity,
        chunk_count: i32,
    ) -> Result<(), ReassemblyError> {
        let record = ReceivingFile::new(identity, chunk_count, &self.scratch_dir)?;
        self.live.insert(rel_path.to_path_buf(), record);
        Ok(())
    }

    fn destination_matches(&self, rel_path: &Path, identity: FileIdentity) -> bool {
        let full = self.dest_root.join(rel_path);
        let Ok(meta) = std::fs::metadata(&full) else {
            return false;
        };
        if !meta.is_file() || meta.len() != identity.size {
            return false;
        }
        meta.modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .is_some_and(|d| d.as_secs() == identity.mtime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn identity(size: u64, mtime: u64, crc32: u32) -> FileIdentity {
        FileIdentity { size, mtime, crc32 }
    }

    #[test]
    fn single_chunk_file_publishes_immediately() {
        let dest = tempfile::tempdir().unwrap();
        let mut engine = ReassemblyEngine::new(dest.path());
        let data = b"hello";
        let id = identity(5, 1000, checksums::crc32_bytes(data));

        let outcome = engine
            .handle_chunk(Path::new("a.txt"), id, 0, 1, 0, data)
            .unwrap();
        assert!(matches!(outcome, ChunkOutcome::Published(_)));
        assert_eq!(engine.live_file_count(), 0);
        assert_eq!(fs::read(dest.path().join("a.txt")).unwrap(), data);
    }

    #[test]
    fn partial_file_stays_live_until_all_chunks_arrive() {
        let dest = tempfile::tempdir().unwrap();
        let mut engine = ReassemblyEngine::new(dest.path());
        let data = b"helloworld";
        let id = identity(10, 1000, checksums::crc32_bytes(data));

        let first = engine
            .handle_chunk(Path::new("a.txt"), id, 0, 2, 0, &data[..5])
            .unwrap();
        assert!(matches!(first, ChunkOutcome::Started));
        assert_eq!(engine.live_file_count(), 1);
        assert!(!dest.path().join("a.txt").exists());

        let second = engine
            .handle_chunk(Path::new("a.txt"), id, 1, 2, 5, &data[5..])
            .unwrap();
        assert!(matches!(second, ChunkOutcome::Published(_)));
        assert_eq!(fs::read(dest.path().join("a.txt")).unwrap(), data);
    }

    #[test]
    fn duplicate_chunk_is_dropped() {
        let dest = tempfile::tempdir().unwrap();
        let mut engine = ReassemblyEngine::new(dest.path());
        let data = b"helloworld";
        let id = identity(10, 1000, checksums::crc32_bytes(data));

        engine
            .handle_chunk(Path::new("a.txt"), id, 0, 2, 0, &data[..5])
            .unwrap();
        let dup = engine
            .handle_chunk(Path::new("a.txt"), id, 0, 2, 0, &data[..5])
            .unwrap();
        assert!(matches!(dup, ChunkOutcome::Duplicate));
        assert_eq!(engine.live_file_count(), 1);
    }

    #[test]
    fn chunk_beyond_declared_file_size_is_out_of_bounds() {
        let dest = tempfile::tempdir().unwrap();
        let mut engine = ReassemblyEngine::new(dest.path());
        let id = identity(5, 1000, 0);
        let outcome = engine
            .handle_chunk(Path::new("a.txt"), id, 0, 1, 3, b"xyz")
            .unwrap();
        assert!(matches!(outcome, ChunkOutcome::OutOfBounds));
        assert_eq!(engine.live_file_count(), 0);
    }

    #[test]
    fn mid_transfer_supersede_discards_old_record_and_starts_fresh() {
        let dest = tempfile::tempdir().unwrap();
        let mut engine = ReassemblyEngine::new(dest.path());
        let old = identity(10, 1000, 0xAAAA);
        let new = identity(8, 1100, 0xBBBB);

        engine
            .handle_chunk(Path::new("a.txt"), old, 0, 2, 0, &[0u8; 5])
            .unwrap();
        assert_eq!(engine.live_file_count(), 1);

        let outcome = engine
            .handle_chunk(Path::new("a.txt"), new, 0, 2, 0, &[1u8; 4])
            .unwrap();
        assert!(matches!(outcome, ChunkOutcome::Superseded));
        assert_eq!(engine.live_file_count(), 1);
    }

    #[test]
    fn skip_on_match_never_creates_a_record_for_an_identical_existing_file() {
        let dest = tempfile::tempdir().unwrap();
        fs::write(dest.path().join("x.bin"), vec![0u8; 50]).unwrap();
        filetime::set_file_mtime(
            dest.path().join("x.bin"),
            filetime::FileTime::from_unix_time(999, 0),
        )
        .unwrap();

        let mut engine = ReassemblyEngine::new(dest.path());
        let id = identity(50, 999, 0);
        let outcome = engine
            .handle_chunk(Path::new("x.bin"), id, 0, 1, 0, &[9u8; 10])
            .unwrap();
        assert!(matches!(outcome, ChunkOutcome::SkippedAlreadyPresent));
        assert_eq!(engine.live_file_count(), 0);
        // Destination untouched.
        assert_eq!(
            fs::read(dest.path().join("x.bin")).unwrap(),
            vec![0u8; 50]
        );
    }

    #[test]
    fn cancel_drops_a_live_record_without_publishing() {
        let dest = tempfile::tempdir().unwrap();
        let mut engine = ReassemblyEngine::new(dest.path());
        let id = identity(10, 1000, 0);
        engine
            .handle_chunk(Path::new("a.txt"), id, 0, 2, 0, &[0u8; 5])
            .unwrap();
        engine.cancel(Path::new("a.txt"));
        assert_eq!(engine.live_file_count(), 0);
        assert!(!dest.path().join("a.txt").exists());
    }
}

//! One synchronization pass: scan the source tree, diff it against the
//! persisted reference tree, mutate that tree according to what changed,
//! persist it, then transmit the least-emitted files under the pass's
//! transmit-time budget.

use std::fs;
use std::net::{SocketAddr, UdpSocket};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use bandwidth::RateLimiter;
use protocol::{DeletePacket, Packet};
use reftree::{DiskEntry, FileAttrs, ReferenceTree};

use crate::error::SyncError;
use crate::single_file::send_file;

/// Minimum wall-clock budget for a pass's transmit phase, regardless of how
/// quickly scanning completed.
pub const MIN_TRANSMIT_DELAY: Duration = Duration::from_secs(300);

/// Configuration held constant across every pass of one sender lifetime.
#[derive(Debug, Clone)]
pub struct PassConfig {
    /// Directory being synchronized.
    pub source_root: PathBuf,
    /// Path to the persisted reference document.
    pub reference_doc: PathBuf,
    /// Destination address chunks and notifications are sent to.
    pub dest_addr: SocketAddr,
    /// Session identifier carried on every packet this pass sends.
    pub session_id: i32,
    /// Propagate deletes for files that have aged out (strict-synchronize
    /// mode); a plain synchronize pass only ever adds or updates files.
    pub strict_mirror: bool,
    /// Emission count a file must exceed before it stops being selected for
    /// resend ahead of less-sent files.
    pub min_redundancy: i32,
    /// How long a vanished file is left alone before its deletion countdown
    /// starts.
    pub retention: Duration,
}

/// Summary of one pass, for the sync loop to log and for termination to
/// check against.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassOutcome {
    /// Files found on disk this pass.
    pub files_scanned: usize,
    /// Files present on disk but not yet tracked before this pass.
    pub files_new: usize,
    /// Tracked files whose size or modification time changed since last
    /// seen.
    pub files_changed: usize,
    /// Tracked files absent from this pass's scan.
    pub files_vanished: usize,
    /// Vanished files whose deletion countdown expired this pass.
    pub files_pruned: usize,
    /// Tracked empty directories removed this pass because they vanished
    /// from disk.
    pub dirs_pruned: usize,
    /// Files actually transmitted this pass.
    pub files_sent: usize,
    /// Every tracked file currently exceeds `min_redundancy` emissions —
    /// the sync loop's unbounded-termination condition.
    pub min_redundancy_achieved: bool,
}

/// Runs one full pass, mutating `tree` and `*session_seq` in place.
pub fn run_pass(
    tree: &mut ReferenceTree,
    socket: &UdpSocket,
    limiter: &mut RateLimiter,
    config: &PassConfig,
    session_seq: &mut i32,
) -> Result<PassOutcome, SyncError> {
    let pass_start = Instant::now();
    let scan_time = now_secs();
    let mut outcome = PassOutcome::default();

    let disk = reftree::scan(&config.source_root)?;
    outcome.files_scanned = disk.files.len();
    let diff = reftree::classify(tree, &disk);

    handle_vanished(tree, &diff.only_in_reference, scan_time, config, socket, &mut outcome);
    outcome.dirs_pruned = remove_vanished_dirs(tree, &diff.dirs_vanished);

    for path in &diff.dirs_new {
        tree.insert_dir(path);
    }

    for path in &diff.only_on_disk {
        let entry = disk.files[path];
        tree.insert_file(
            path,
            FileAttrs {
                size: entry.size,
                mtime: entry.mtime,
                crc: 0,
                nb_send: 0,
                last_send: 0,
                last_view: scan_time,
            },
        );
    }
    outcome.files_new = diff.only_on_disk.len();

    for path in &diff.different {
        let entry = disk.files[path];
        if let Some(attrs) = tree.file_attrs_mut(path) {
            attrs.size = entry.size;
            attrs.mtime = entry.mtime;
            attrs.crc = 0;
            attrs.nb_send = 0;
            attrs.last_send = 0;
            attrs.last_view = scan_time;
        }
    }
    outcome.files_changed = diff.different.len();

    for path in &diff.same {
        if let Some(attrs) = tree.file_attrs_mut(path) {
            attrs.last_view = scan_time;
        }
    }

    tree.set_scan_time(scan_time);
    reftree::save(tree, &config.reference_doc)?;

    outcome.files_sent = transmit(tree, socket, limiter, config, session_seq, pass_start, &disk.files);

    outcome.min_redundancy_achieved = tree
        .files()
        .all(|(_, attrs)| attrs.nb_send > config.min_redundancy);

    reftree::save(tree, &config.reference_doc)?;

    tracing::info!(
        scanned = outcome.files_scanned,
        new = outcome.files_new,
        changed = outcome.files_changed,
        vanished = outcome.files_vanished,
        pruned = outcome.files_pruned,
        dirs_pruned = outcome.dirs_pruned,
        sent = outcome.files_sent,
        "synchronization pass complete"
    );
    Ok(outcome)
}

/// Untracks every directory in `vanished` that is currently empty,
/// processing deepest paths first so that emptying a leaf directory makes
/// its now-childless parent eligible within the same pass. A directory
/// that still holds tracked files (their own deletion countdown not yet
/// expired) is left alone and reported again on a future pass once it
/// actually empties out.
fn remove_vanished_dirs(tree: &mut ReferenceTree, vanished: &[PathBuf]) -> usize {
    let mut ordered = vanished.to_vec();
    ordered.sort_by_key(|path| std::cmp::Reverse(path.components().count()));
    ordered.iter().filter(|path| tree.remove_empty_dir(path)).count()
}

fn handle_vanished(
    tree: &mut ReferenceTree,
    vanished: &[PathBuf],
    scan_time: u64,
    config: &PassConfig,
    socket: &UdpSocket,
    outcome: &mut PassOutcome,
) {
    outcome.files_vanished = vanished.len();
    let retention_secs = config.retention.as_secs();
    for path in vanished {
        let Some(attrs) = tree.file_attrs(path).copied() else {
            continue;
        };
        let age = scan_time.saturating_sub(attrs.last_view);
        if age <= retention_secs {
            continue;
        }

        if config.strict_mirror {
            send_delete(socket, config.dest_addr, path);
        }

        let next_nb_send = if attrs.is_vanishing() {
            attrs.nb_send - 1
        } else {
            -1
        };
        if next_nb_send <= -10 {
            tree.remove_file(path);
            outcome.files_pruned += 1;
        } else if let Some(slot) = tree.file_attrs_mut(path) {
            slot.nb_send = next_nb_send;
            slot.last_send = 0;
            slot.crc = 0;
        }
    }
}

fn send_delete(socket: &UdpSocket, dest: SocketAddr, path: &Path) {
    let name = crate::single_file::to_wire_name(path);
    let encoded = Packet::Delete(DeletePacket { path: name }).encode();
    match socket.send_to(&encoded, dest) {
        Ok(_) => tracing::info!(path = %path.display(), "delete notification sent"),
        Err(err) => tracing::error!(path = %path.display(), error = %err, "failed to send delete notification"),
    }
}

fn transmit(
    tree: &mut ReferenceTree,
    socket: &UdpSocket,
    limiter: &mut RateLimiter,
    config: &PassConfig,
    session_seq: &mut i32,
    pass_start: Instant,
    disk: &std::collections::BTreeMap<PathBuf, DiskEntry>,
) -> usize {
    let transmit_delay = MIN_TRANSMIT_DELAY.max(pass_start.elapsed());
    let deadline = pass_start + transmit_delay;

    let mut selected: Vec<(PathBuf, i32)> = tree
        .files()
        .map(|(path, attrs)| (path.to_path_buf(), attrs.nb_send))
        .collect();
    selected.sort_by_key(|(_, nb_send)| *nb_send);

    let mut sent = 0;
    for (path, _) in selected {
        if Instant::now() >= deadline {
            break;
        }
        let Some(entry) = disk.get(&path) else {
            continue;
        };

        let source_path = config.source_root.join(&path);
        let stable = fs::metadata(&source_path)
            .map(|meta| meta.len() == entry.size)
            .unwrap_or(false)
            && current_mtime(&source_path) == Some(entry.mtime);
        if !stable {
            if let Some(attrs) = tree.file_attrs_mut(&path) {
                attrs.crc = 0;
                attrs.nb_send = 0;
            }
            continue;
        }

        let cached_crc = tree.file_attrs(&path).map(|a| a.crc).filter(|crc| *crc != 0);
        let cached_crc = match cached_crc {
            Some(crc) => Some(crc),
            None => match checksums::crc32_file(&source_path) {
                Ok(crc) => {
                    if let Some(attrs) = tree.file_attrs_mut(&path) {
                        attrs.crc = crc;
                    }
                    Some(crc)
                }
                Err(err) => {
                    tracing::error!(path = %path.display(), error = %err, "failed to checksum file");
                    continue;
                }
            },
        };

        match send_file(
            socket,
            config.dest_addr,
            &source_path,
            &path,
            limiter,
            config.session_id,
            *session_seq,
            cached_crc,
        ) {
            Ok(result) => {
                *session_seq = result.next_session_seq;
                if let Some(attrs) = tree.file_attrs_mut(&path) {
                    attrs.last_send = now_secs();
                    attrs.nb_send += 1;
                }
                sent += 1;
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to send file; will retry next pass");
            }
        }
    }
    sent
}

fn current_mtime(path: &Path) -> Option<u64> {
    fs::metadata(path)
        .ok()?
        .modified()
        .ok()?
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket;

    fn config(source_root: PathBuf, reference_doc: PathBuf, dest: SocketAddr) -> PassConfig {
        PassConfig {
            source_root,
            reference_doc,
            dest_addr: dest,
            session_id: 1,
            strict_mirror: false,
            min_redundancy: 5,
            retention: Duration::from_secs(7 * 24 * 3600),
        }
    }

    #[test]
    fn first_pass_discovers_and_sends_a_new_file() {
        let source = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("a.txt"), b"hello world").unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver.set_nonblocking(true).unwrap();

        let mut tree = ReferenceTree::empty(0);
        let mut limiter = RateLimiter::from_bytes_per_sec(0);
        let mut seq = 0;
        let cfg = config(
            source.path().to_path_buf(),
            state.path().join("ref.xml"),
            receiver.local_addr().unwrap(),
        );

        let outcome = run_pass(&mut tree, &sender, &mut limiter, &cfg, &mut seq).unwrap();
        assert_eq!(outcome.files_new, 1);
        assert_eq!(outcome.files_sent, 1);
        assert_eq!(tree.file_attrs(Path::new("a.txt")).unwrap().nb_send, 1);
    }

    #[test]
    fn unchanged_file_is_resent_and_its_redundancy_count_climbs() {
        let source = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("a.txt"), b"hello world").unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver.set_nonblocking(true).unwrap();

        let mut tree = ReferenceTree::empty(0);
        let mut limiter = RateLimiter::from_bytes_per_sec(0);
        let mut seq = 0;
        let cfg = config(
            source.path().to_path_buf(),
            state.path().join("ref.xml"),
            receiver.local_addr().unwrap(),
        );

        run_pass(&mut tree, &sender, &mut limiter, &cfg, &mut seq).unwrap();
        let first_send_count = tree.file_attrs(Path::new("a.txt")).unwrap().nb_send;

        run_pass(&mut tree, &sender, &mut limiter, &cfg, &mut seq).unwrap();
        let attrs = tree.file_attrs(Path::new("a.txt")).unwrap();
        assert_eq!(attrs.nb_send, first_send_count + 1);
    }

    #[test]
    fn vanished_file_within_retention_window_is_left_untouched() {
        let source = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();

        let mut tree = ReferenceTree::empty(0);
        tree.insert_file(
            Path::new("gone.txt"),
            FileAttrs {
                size: 5,
                mtime: 1,
                crc: 0xABCD,
                nb_send: 3,
                last_send: 1,
                last_view: now_secs(),
            },
        );
        let mut limiter = RateLimiter::from_bytes_per_sec(0);
        let mut seq = 0;
        let cfg = config(
            source.path().to_path_buf(),
            state.path().join("ref.xml"),
            receiver.local_addr().unwrap(),
        );

        run_pass(&mut tree, &sender, &mut limiter, &cfg, &mut seq).unwrap();
        assert_eq!(tree.file_attrs(Path::new("gone.txt")).unwrap().nb_send, 3);
    }

    #[test]
    fn vanished_file_past_retention_starts_the_deletion_countdown() {
        let source = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();

        let mut tree = ReferenceTree::empty(0);
        tree.insert_file(
            Path::new("gone.txt"),
            FileAttrs {
                size: 5,
                mtime: 1,
                crc: 0xABCD,
                nb_send: 3,
                last_send: 1,
                last_view: 0,
            },
        );
        let mut limiter = RateLimiter::from_bytes_per_sec(0);
        let mut seq = 0;
        let cfg = config(
            source.path().to_path_buf(),
            state.path().join("ref.xml"),
            receiver.local_addr().unwrap(),
        );

        run_pass(&mut tree, &sender, &mut limiter, &cfg, &mut seq).unwrap();
        assert_eq!(tree.file_attrs(Path::new("gone.txt")).unwrap().nb_send, -1);
    }

    #[test]
    fn vanished_file_prunes_after_ten_countdown_passes() {
        let source = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();

        let mut tree = ReferenceTree::empty(0);
        tree.insert_file(
            Path::new("gone.txt"),
            FileAttrs {
                size: 5,
                mtime: 1,
                crc: 0xABCD,
                nb_send: -9,
                last_send: 0,
                last_view: 0,
            },
        );
        let mut limiter = RateLimiter::from_bytes_per_sec(0);
        let mut seq = 0;
        let cfg = config(
            source.path().to_path_buf(),
            state.path().join("ref.xml"),
            receiver.local_addr().unwrap(),
        );

        run_pass(&mut tree, &sender, &mut limiter, &cfg, &mut seq).unwrap();
        assert!(tree.file_attrs(Path::new("gone.txt")).is_none());
    }

    #[test]
    fn strict_mirror_sends_a_delete_notification_for_vanished_files() {
        let source = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        let mut tree = ReferenceTree::empty(0);
        tree.insert_file(
            Path::new("gone.txt"),
            FileAttrs {
                size: 5,
                mtime: 1,
                crc: 0xABCD,
                nb_send: 3,
                last_send: 1,
                last_view: 0,
            },
        );
        let mut limiter = RateLimiter::from_bytes_per_sec(0);
        let mut seq = 0;
        let mut cfg = config(
            source.path().to_path_buf(),
            state.path().join("ref.xml"),
            receiver.local_addr().unwrap(),
        );
        cfg.strict_mirror = true;

        run_pass(&mut tree, &sender, &mut limiter, &cfg, &mut seq).unwrap();

        let mut buf = [0u8; 4096];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        let Packet::Delete(delete) = Packet::decode(&buf[..len]).unwrap() else {
            panic!("expected a delete packet");
        };
        assert_eq!(delete.path, "gone.txt");
    }

    #[test]
    fn empty_directory_is_tracked_then_removed_once_it_vanishes_from_disk() {
        let source = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(source.path().join("empty")).unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver.set_nonblocking(true).unwrap();

        let mut tree = ReferenceTree::empty(0);
        let mut limiter = RateLimiter::from_bytes_per_sec(0);
        let mut seq = 0;
        let cfg = config(
            source.path().to_path_buf(),
            state.path().join("ref.xml"),
            receiver.local_addr().unwrap(),
        );

        run_pass(&mut tree, &sender, &mut limiter, &cfg, &mut seq).unwrap();
        assert!(tree.dirs().any(|p| p == Path::new("empty")));

        std::fs::remove_dir(source.path().join("empty")).unwrap();
        let outcome = run_pass(&mut tree, &sender, &mut limiter, &cfg, &mut seq).unwrap();
        assert_eq!(outcome.dirs_pruned, 1);
        assert_eq!(tree.dirs().count(), 0);
    }

    #[test]
    fn min_redundancy_is_not_yet_achieved_after_a_single_send() {
        let source = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("a.txt"), b"hello world").unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver.set_nonblocking(true).unwrap();

        let mut tree = ReferenceTree::empty(0);
        let mut limiter = RateLimiter::from_bytes_per_sec(0);
        let mut seq = 0;
        let cfg = config(
            source.path().to_path_buf(),
            state.path().join("ref.xml"),
            receiver.local_addr().unwrap(),
        );

        let outcome = run_pass(&mut tree, &sender, &mut limiter, &cfg, &mut seq).unwrap();
        assert!(!outcome.min_redundancy_achieved);
    }
}

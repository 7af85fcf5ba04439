//! The publish (commit) step: stream a completed scratch file to its
//! destination path, verifying size and CRC as the copy proceeds, then
//! apply the declared mtime. A verification failure discards the partial
//! destination file rather than leaving it in place for a later redundant
//! emission to quietly overwrite.

use std::fs::{self, File};
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

use filetime::{set_file_mtime, FileTime};

use crate::error::PublishError;
use crate::record::ReceivingFile;

pub(crate) fn publish(
    record: &mut ReceivingFile,
    dest_root: &Path,
    rel_path: &Path,
) -> Result<PathBuf, PublishError> {
    let dest_path = dest_root.join(rel_path);
    ensure_parent_dir(&dest_path)?;

    let identity = record.identity();
    let scratch_path = record.scratch_path().to_path_buf();
    let scratch = record.scratch_file_mut();
    scratch
        .seek(SeekFrom::Start(0))
        .map_err(|source| PublishError::SeekScratch {
            path: scratch_path,
            source,
        })?;

    let copied = File::create(&dest_path)
        .map_err(|source| PublishError::WriteDestination {
            path: dest_path.clone(),
            source,
        })
        .and_then(|mut out| {
            checksums::copy_with_crc32(scratch, &mut out).map_err(|source| {
                PublishError::WriteDestination {
                    path: dest_path.clone(),
                    source,
                }
            })
        });

    let (written, crc) = match copied {
        Ok(pair) => pair,
        Err(err) => {
            let _ = fs::remove_file(&dest_path);
            return Err(err);
        }
    };

    if written != identity.size {
        let _ = fs::remove_file(&dest_path);
        return Err(PublishError::SizeMismatch {
            path: dest_path,
            declared: identity.size,
            actual: written,
        });
    }
    if crc != identity.crc32 {
        let _ = fs::remove_file(&dest_path);
        return Err(PublishError::CrcMismatch {
            path: dest_path,
            declared: identity.crc32,
            actual: crc,
        });
    }

    set_file_mtime(
        &dest_path,
        FileTime::from_unix_time(identity.mtime as i64, 0),
    )
    .map_err(|source| PublishError::SetMtime {
        path: dest_path.clone(),
        source,
    })?;

    Ok(dest_path)
}

/// Creates every missing ancestor directory of `dest_path`, replacing any
/// non-directory that happens to occupy an ancestor's position (a stale
/// placeholder left by an earlier, differently-shaped transfer).
fn ensure_parent_dir(dest_path: &Path) -> Result<(), PublishError> {
    let Some(parent) = dest_path.parent() else {
        return Ok(());
    };
    let mut built = PathBuf::new();
    for component in parent.components() {
        built.push(component);
        if built.as_os_str().is_empty() {
            continue;
        }
        match fs::symlink_metadata(&built) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                fs::remove_file(&built).map_err(|source| PublishError::ReplaceAncestor {
                    path: built.clone(),
                    source,
                })?;
                fs::create_dir(&built).map_err(|source| PublishError::CreateDir {
                    path: built.clone(),
                    source,
                })?;
            }
            Err(_) => {
                fs::create_dir(&built).map_err(|source| PublishError::CreateDir {
                    path: built.clone(),
                    source,
                })?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FileIdentity;
    use std::path::Path as StdPath;

    fn write_record(data: &[u8], dir: &StdPath) -> (ReceivingFile, FileIdentity) {
        let identity = FileIdentity {
            size: data.len() as u64,
            mtime: 1_700_000_000,
            crc32: checksums::crc32_bytes(data),
        };
        let mut record = ReceivingFile::new(identity, 1, dir).unwrap();
        record.accept_chunk(0, 0, data).unwrap();
        (record, identity)
    }

    #[test]
    fn publish_streams_scratch_to_destination_and_sets_mtime() {
        let scratch_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        let (mut record, identity) = write_record(b"hello world", scratch_dir.path());

        let dest_path = publish(&mut record, dest_dir.path(), StdPath::new("docs/a.txt")).unwrap();
        assert_eq!(fs::read(&dest_path).unwrap(), b"hello world");

        let meta = fs::metadata(&dest_path).unwrap();
        assert_eq!(meta.len(), identity.size);
    }

    #[test]
    fn publish_creates_missing_ancestor_directories() {
        let scratch_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        let (mut record, _) = write_record(b"x", scratch_dir.path());

        let dest_path = publish(&mut record, dest_dir.path(), StdPath::new("a/b/c.txt")).unwrap();
        assert!(dest_path.exists());
    }

    #[test]
    fn publish_replaces_non_directory_ancestor() {
        let scratch_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        fs::write(dest_dir.path().join("a"), b"stale file where a dir should be").unwrap();
        let (mut record, _) = write_record(b"x", scratch_dir.path());

        let dest_path = publish(&mut record, dest_dir.path(), StdPath::new("a/b.txt")).unwrap();
        assert!(dest_path.exists());
        assert!(dest_dir.path().join("a").is_dir());
    }

    #[test]
    fn crc_mismatch_discards_partial_destination_file() {
        let scratch_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        let mut identity = FileIdentity {
            size: 5,
            mtime: 1,
            crc32: 0,
        };
        identity.crc32 = checksums::crc32_bytes(b"hello") ^ 1;
        let mut record = ReceivingFile::new(identity, 1, scratch_dir.path()).unwrap();
        record.accept_chunk(0, 0, b"hello").unwrap();

        let err = publish(&mut record, dest_dir.path(), StdPath::new("x.bin")).unwrap_err();
        assert!(matches!(err, PublishError::CrcMismatch { .. }));
        assert!(!dest_dir.path().join("x.bin").exists());
    }

    #[test]
    fn size_mismatch_discards_partial_destination_file() {
        let scratch_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        let identity = FileIdentity {
            size: 999,
            mtime: 1,
            crc32: checksums::crc32_bytes(b"hello"),
        };
        let mut record = ReceivingFile::new(identity, 1, scratch_dir.path()).unwrap();
        record.accept_chunk(0, 0, b"hello").unwrap();

        let err = publish(&mut record, dest_dir.path(), StdPath::new("x.bin")).unwrap_err();
        assert!(matches!(err, PublishError::SizeMismatch { .. }));
        assert!(!dest_dir.path().join("x.bin").exists());
    }
}

//! Sidecar version scan
//!
//! Before staging a write, the pipeline scans the sibling sidecars across all
//! disks to pick the next partial-write generation. A sidecar only carries
//! `file.version` when its write landed on fewer than all disks, so the scan
//! finds the highest partial generation and moves past it; a fully-written
//! object contributes zero. The caller holds the shared namespace lock for
//! the duration of the scan.

use crate::disk::StorageDisk;
use crate::metadata::{sidecar_path, FileMetadata};
use ecstore_common::{Error, Result};
use std::sync::Arc;
use tracing::{debug, error};

/// Derive the next file version for (volume, path)
///
/// Reads every disk's sidecar. Errors other than not-found count against the
/// read quorum; more than `read_quorum` of them fails the scan. Returns the
/// highest `file.version` seen (absent reads as 0) plus one.
pub(crate) fn next_file_version(
    disks: &[Arc<dyn StorageDisk>],
    read_quorum: usize,
    volume: &str,
    path: &str,
) -> Result<u64> {
    let sidecar = sidecar_path(path);
    let mut highest = 0u64;
    let mut read_errors = 0usize;

    for (index, disk) in disks.iter().enumerate() {
        let meta = match disk.read_file(volume, &sidecar) {
            Ok(data) => FileMetadata::read_from(&data),
            Err(e) if e.is_not_found() => continue,
            Err(e) => Err(e),
        };
        match meta {
            Ok(meta) => {
                if let Some(version) = meta.file_version() {
                    highest = highest.max(version);
                }
            }
            Err(e) => {
                error!(volume, path, disk = index, "sidecar read failed: {}", e);
                read_errors += 1;
                if read_errors > read_quorum {
                    return Err(Error::ReadQuorum {
                        errors: read_errors,
                        quorum: read_quorum,
                    });
                }
            }
        }
    }

    debug!(volume, path, next_version = highest + 1, "version scan done");
    Ok(highest + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::FileWriter;
    use crate::metadata::keys;
    use std::io;

    /// Disk stub returning a canned sidecar response
    struct StubDisk {
        response: Result<Vec<u8>>,
    }

    impl StubDisk {
        fn with_version(version: Option<u64>) -> Arc<dyn StorageDisk> {
            let mut meta = FileMetadata::new();
            if let Some(v) = version {
                meta.set(keys::FILE_VERSION, v.to_string());
            }
            let mut buf = Vec::new();
            meta.write_to(&mut buf).unwrap();
            Arc::new(Self { response: Ok(buf) })
        }

        fn failing(err: Error) -> Arc<dyn StorageDisk> {
            Arc::new(Self { response: Err(err) })
        }
    }

    impl StorageDisk for StubDisk {
        fn create_file(&self, _: &str, _: &str) -> Result<Box<dyn FileWriter>> {
            Err(Error::internal("not supported"))
        }

        fn read_file(&self, _: &str, _: &str) -> Result<Vec<u8>> {
            self.response.clone()
        }

        fn delete_file(&self, _: &str, _: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_fresh_key_starts_at_one() {
        let disks = vec![
            StubDisk::failing(Error::FileNotFound),
            StubDisk::failing(Error::FileNotFound),
        ];
        assert_eq!(next_file_version(&disks, 1, "vol", "obj").unwrap(), 1);
    }

    #[test]
    fn test_highest_version_wins() {
        let disks = vec![
            StubDisk::with_version(None),
            StubDisk::with_version(Some(3)),
            StubDisk::with_version(Some(5)),
        ];
        assert_eq!(next_file_version(&disks, 2, "vol", "obj").unwrap(), 6);
    }

    #[test]
    fn test_read_errors_within_quorum_tolerated() {
        let disks = vec![
            StubDisk::failing(Error::DiskIo("offline".into())),
            StubDisk::with_version(Some(2)),
            StubDisk::with_version(None),
        ];
        assert_eq!(next_file_version(&disks, 1, "vol", "obj").unwrap(), 3);
    }

    #[test]
    fn test_read_quorum_violation() {
        let disks = vec![
            StubDisk::failing(Error::DiskIo("offline".into())),
            StubDisk::failing(Error::DiskIo("offline".into())),
            StubDisk::with_version(None),
        ];
        let err = next_file_version(&disks, 1, "vol", "obj").unwrap_err();
        assert!(matches!(err, Error::ReadQuorum { errors: 2, quorum: 1 }));
    }

    #[test]
    fn test_garbled_sidecar_counts_as_error() {
        let garbled = Arc::new(StubDisk {
            response: Ok(b"not json".to_vec()),
        });
        let disks: Vec<Arc<dyn StorageDisk>> = vec![garbled, StubDisk::with_version(Some(1))];
        assert_eq!(next_file_version(&disks, 1, "vol", "obj").unwrap(), 2);
    }

    #[test]
    fn test_io_error_message() {
        let e = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(Error::from(e), Error::DiskIo(_)));
    }
}

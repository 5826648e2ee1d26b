//! POSIX filesystem disk backend
//!
//! One directory per disk. Staged writes land in `.staging/<uuid>` under the
//! disk root; commit flushes, fsyncs, renames into the final location and
//! fsyncs the parent directory so the promotion is atomic and durable.

use crate::disk::{FileWriter, StorageDisk};
use ecstore_common::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

const STAGING_DIR: &str = ".staging";

/// Filesystem-backed storage disk
pub struct PosixDisk {
    root: PathBuf,
}

impl PosixDisk {
    /// Open a disk rooted at `root`, creating the root and staging area
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(STAGING_DIR))?;
        Ok(Self { root })
    }

    /// The disk's root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn final_path(&self, volume: &str, path: &str) -> PathBuf {
        self.root.join(volume).join(path)
    }

    fn staging_path(&self) -> PathBuf {
        self.root
            .join(STAGING_DIR)
            .join(Uuid::new_v4().to_string())
    }
}

impl StorageDisk for PosixDisk {
    fn create_file(&self, volume: &str, path: &str) -> Result<Box<dyn FileWriter>> {
        let staging = self.staging_path();
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staging)?;
        Ok(Box::new(PosixFileWriter {
            file: Some(file),
            staging,
            target: self.final_path(volume, path),
        }))
    }

    fn read_file(&self, volume: &str, path: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.final_path(volume, path))?)
    }

    fn delete_file(&self, volume: &str, path: &str) -> Result<()> {
        let target = self.final_path(volume, path);
        let meta = fs::symlink_metadata(&target)?;
        if meta.is_dir() {
            fs::remove_dir_all(&target)?;
        } else {
            fs::remove_file(&target)?;
        }
        Ok(())
    }
}

/// Staged writer backed by a temp file under `.staging/`
struct PosixFileWriter {
    file: Option<File>,
    staging: PathBuf,
    target: PathBuf,
}

impl PosixFileWriter {
    fn remove_staging(&self) {
        if let Err(e) = fs::remove_file(&self.staging) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(staging = %self.staging.display(), "removing staged file failed: {}", e);
            }
        }
    }
}

impl Write for PosixFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => file.write(buf),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "writer already closed",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl FileWriter for PosixFileWriter {
    fn commit(mut self: Box<Self>) -> Result<()> {
        let file = self
            .file
            .take()
            .ok_or_else(|| Error::internal("writer already closed"))?;
        file.sync_all()?;
        drop(file);

        let parent = self
            .target
            .parent()
            .ok_or_else(|| Error::internal("target path has no parent"))?;
        fs::create_dir_all(parent)?;
        if let Err(e) = fs::rename(&self.staging, &self.target) {
            self.remove_staging();
            return Err(e.into());
        }
        // Persist the rename itself.
        File::open(parent)?.sync_all()?;
        Ok(())
    }

    fn discard(mut self: Box<Self>) -> Result<()> {
        self.file.take();
        fs::remove_file(&self.staging).or_else(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Ok(())
            } else {
                Err(e)
            }
        })?;
        Ok(())
    }
}

impl Drop for PosixFileWriter {
    fn drop(&mut self) {
        // Neither commit nor discard ran; don't leak the staged file.
        if self.file.take().is_some() {
            self.remove_staging();
        }
    }
}

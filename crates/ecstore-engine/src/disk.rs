//! Disk abstraction
//!
//! The engine stripes an object across an ordered set of disks, addressing
//! each by (volume, path). A disk hands out staged writers: bytes written
//! through a [`FileWriter`] are invisible at the final path until `commit`
//! promotes them atomically; `discard` drops the staged bytes instead.

use ecstore_common::Result;
use std::io::Write;

/// Staged file writer
///
/// Bytes go to a staging location. Exactly one of `commit` or `discard`
/// consumes the writer; a writer dropped without either must clean up its
/// staging artifact on a best-effort basis.
pub trait FileWriter: Write + Send {
    /// Promote the staged bytes to the final (volume, path) atomically and
    /// durably.
    fn commit(self: Box<Self>) -> Result<()>;

    /// Remove the staging artifact without promoting.
    fn discard(self: Box<Self>) -> Result<()>;
}

/// A single storage disk
pub trait StorageDisk: Send + Sync {
    /// Open a staged writer for (volume, path).
    fn create_file(&self, volume: &str, path: &str) -> Result<Box<dyn FileWriter>>;

    /// Read the full contents of the file at (volume, path).
    ///
    /// Returns [`ecstore_common::Error::FileNotFound`] when absent.
    fn read_file(&self, volume: &str, path: &str) -> Result<Vec<u8>>;

    /// Delete the file or object directory at (volume, path).
    ///
    /// Returns [`ecstore_common::Error::FileNotFound`] when there is nothing
    /// to delete.
    fn delete_file(&self, volume: &str, path: &str) -> Result<()>;
}

//! ecstore Engine - Erasure-coded striped object writes
//!
//! The engine stripes a streaming byte input for a named (volume, path)
//! object across N = D + P disks as D data shards plus P parity shards,
//! with per-shard SHA-512 checksums and a sidecar metadata record per disk.
//! Staged writes become visible only through an atomic commit under an
//! exclusive namespace lock; any failure aborts the transaction and sweeps
//! all disks clean. Up to N - W disks may fail staging, where W is the
//! configured write quorum.
//!
//! ```no_run
//! use ecstore_common::EngineConfig;
//! use ecstore_engine::{PosixDisk, StorageDisk, StripeEngine};
//! use std::io::Write;
//! use std::sync::Arc;
//!
//! # fn main() -> ecstore_common::Result<()> {
//! let disks: Vec<Arc<dyn StorageDisk>> = (0..4)
//!     .map(|i| {
//!         Ok(Arc::new(PosixDisk::open(format!("/mnt/disk{i}"))?) as Arc<dyn StorageDisk>)
//!     })
//!     .collect::<ecstore_common::Result<_>>()?;
//!
//! let engine = StripeEngine::new(disks, EngineConfig::EC_2_2)?;
//! let mut handle = engine.create_file("media", "videos/intro.mp4")?;
//! handle.write_all(b"object bytes")?;
//! handle.close()?;
//! # Ok(())
//! # }
//! ```

pub mod disk;
pub mod engine;
pub mod metadata;
pub mod nslock;
pub mod posix;
mod pipe;
mod version;

pub use disk::{FileWriter, StorageDisk};
pub use engine::{FileWriteHandle, StripeEngine};
pub use metadata::{FileMetadata, METADATA_FILE};
pub use nslock::{ExclusiveNsGuard, NamespaceLocks, SharedNsGuard};
pub use posix::PosixDisk;

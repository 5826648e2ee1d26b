//! Erasure-coded write pipeline
//!
//! [`StripeEngine::create_file`] returns a write handle backed by a bounded
//! byte pipe; a dedicated producer thread drains the pipe through the
//! pipeline: version scan, staged open on every disk, 4 MiB block loop
//! (split, encode, fan out shard i to disk i, hash), sidecar write, then an
//! exclusive-locked commit that atomically promotes every staged file. Any
//! failure in any phase aborts the transaction: all staged writers are
//! discarded and every disk is swept for leftovers.

use crate::disk::{FileWriter, StorageDisk};
use crate::metadata::{self, keys, FileMetadata};
use crate::nslock::NamespaceLocks;
use crate::pipe::{byte_pipe, PipeReader, PipeWriter};
use crate::version;
use chrono::Utc;
use ecstore_common::{
    EngineConfig, Error, ObjectPath, Result, ShardHasher, VolumeName, ERASURE_BLOCK_SIZE,
};
use ecstore_erasure::ErasureCodec;
use std::io::{self, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// Erasure-coded striped write engine over a fixed disk set
///
/// Disk order is fixed for the engine's lifetime: disk i always receives
/// shard i.
pub struct StripeEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for StripeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeEngine")
            .field("config", &self.inner.config)
            .finish()
    }
}

struct EngineInner {
    disks: Vec<Arc<dyn StorageDisk>>,
    config: EngineConfig,
    codec: ErasureCodec,
    ns: Arc<NamespaceLocks>,
}

impl StripeEngine {
    /// Create an engine over `disks`, which must number exactly D + P
    pub fn new(disks: Vec<Arc<dyn StorageDisk>>, config: EngineConfig) -> Result<Self> {
        config.validate().map_err(Error::InvalidArgument)?;
        if disks.len() != config.total_shards() {
            return Err(Error::invalid_argument(format!(
                "engine needs {} disks, got {}",
                config.total_shards(),
                disks.len()
            )));
        }
        let codec = ErasureCodec::new(config.data_shards, config.parity_shards)?;
        Ok(Self {
            inner: Arc::new(EngineInner {
                disks,
                config,
                codec,
                ns: Arc::new(NamespaceLocks::new()),
            }),
        })
    }

    /// The engine's striping configuration
    #[must_use]
    pub fn config(&self) -> EngineConfig {
        self.inner.config
    }

    /// Start an erasure-coded write of (volume, path)
    ///
    /// Returns a handle implementing [`io::Write`]. Bytes written into the
    /// handle stream through the pipeline; `close` waits for the pipeline to
    /// reach a terminal state and surfaces its error, if any.
    pub fn create_file(&self, volume: &str, path: &str) -> Result<FileWriteHandle> {
        let volume = VolumeName::new(volume)?;
        let path = ObjectPath::new(path)?;

        let (pipe, reader) = byte_pipe(ERASURE_BLOCK_SIZE);
        let inner = Arc::clone(&self.inner);
        let producer = thread::Builder::new()
            .name("ecstore-write".into())
            .spawn(move || inner.write_erasure(volume.as_str(), path.as_str(), reader))
            .map_err(|e| Error::internal(format!("spawning write pipeline: {e}")))?;

        Ok(FileWriteHandle {
            pipe,
            producer: Some(producer),
        })
    }
}

/// Caller-side handle for one in-flight write
///
/// Dropping the handle without [`Self::close`] aborts the transaction.
pub struct FileWriteHandle {
    pipe: PipeWriter,
    producer: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for FileWriteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWriteHandle").finish_non_exhaustive()
    }
}

impl FileWriteHandle {
    /// Finish the stream and wait for the pipeline to commit or abort
    pub fn close(mut self) -> Result<()> {
        self.pipe.close();
        if let Some(producer) = self.producer.take() {
            producer
                .join()
                .map_err(|_| Error::internal("write pipeline panicked"))?;
        }
        match self.pipe.abort_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Write for FileWriteHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pipe.write_all(buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl EngineInner {
    fn write_erasure(&self, volume: &str, path: &str, mut reader: PipeReader) {
        if let Err(err) = self.run_write(volume, path, &mut reader) {
            reader.fail(err);
        }
    }

    fn run_write(&self, volume: &str, path: &str, reader: &mut PipeReader) -> Result<()> {
        let next_version = {
            let _scan_lock = self.ns.shared(volume, path);
            version::next_file_version(&self.disks, self.config.read_quorum(), volume, path)?
        };

        let mut txn = self.stage(volume, path, next_version)?;
        if let Err(err) = txn.stream(reader).and_then(|()| txn.write_sidecars()) {
            txn.abort();
            return Err(err);
        }
        txn.commit()
    }

    /// Open staged shard and sidecar writers on every disk
    ///
    /// Disks failing either open are tolerated up to N - W; one more fails
    /// the transaction with a write-quorum error.
    fn stage<'a>(
        &'a self,
        volume: &'a str,
        path: &'a str,
        next_version: u64,
    ) -> Result<WriteTransaction<'a>> {
        let allowance = self.disks.len() - self.config.write_quorum;
        let mut txn = WriteTransaction {
            engine: self,
            volume,
            path,
            next_version,
            total_size: 0,
            shards: Vec::with_capacity(self.disks.len()),
        };

        let mut create_errors = 0usize;
        for (index, disk) in self.disks.iter().enumerate() {
            let part = match disk.create_file(volume, &metadata::part_path(path, index)) {
                Ok(writer) => Some(writer),
                Err(e) => {
                    error!(volume, path, disk = index, "staging shard writer failed: {}", e);
                    None
                }
            };
            let sidecar = match &part {
                Some(_) => match disk.create_file(volume, &metadata::sidecar_path(path)) {
                    Ok(writer) => Some(writer),
                    Err(e) => {
                        error!(
                            volume,
                            path,
                            disk = index,
                            "staging sidecar writer failed: {}",
                            e
                        );
                        None
                    }
                },
                None => None,
            };

            match (part, sidecar) {
                (Some(part), Some(sidecar)) => txn.shards.push(LiveShard {
                    index,
                    part: Some(part),
                    sidecar: Some(sidecar),
                    hasher: ShardHasher::new(),
                }),
                (part, _) => {
                    // A shard writer without a sidecar writer is useless.
                    if let Some(writer) = part {
                        if let Err(e) = writer.discard() {
                            warn!(volume, path, disk = index, "discard failed: {}", e);
                        }
                    }
                    create_errors += 1;
                    if create_errors > allowance {
                        let err = Error::WriteQuorum {
                            failed: create_errors,
                            quorum: self.config.write_quorum,
                        };
                        error!(volume, path, "{}", err);
                        txn.abort();
                        return Err(err);
                    }
                }
            }
        }
        Ok(txn)
    }
}

/// One live disk's staged writers and checksum state
struct LiveShard {
    index: usize,
    part: Option<Box<dyn FileWriter>>,
    sidecar: Option<Box<dyn FileWriter>>,
    hasher: ShardHasher,
}

/// State of one in-flight write across its live disks
struct WriteTransaction<'a> {
    engine: &'a EngineInner,
    volume: &'a str,
    path: &'a str,
    next_version: u64,
    total_size: u64,
    shards: Vec<LiveShard>,
}

impl WriteTransaction<'_> {
    /// Drain the input pipe one erasure block at a time
    fn stream(&mut self, reader: &mut PipeReader) -> Result<()> {
        let mut block = vec![0u8; ERASURE_BLOCK_SIZE];
        loop {
            let (n, eof) = reader.read_full(&mut block)?;
            if n > 0 {
                self.encode_block(&block[..n])?;
                self.total_size += n as u64;
            }
            if eof {
                return Ok(());
            }
        }
    }

    /// Split + encode one block and fan the shards out to the live disks
    fn encode_block(&mut self, block: &[u8]) -> Result<()> {
        let mut shards = self.engine.codec.split(block)?;
        self.engine.codec.encode(&mut shards)?;

        for live in &mut self.shards {
            let encoded = &shards[live.index];
            if let Some(writer) = live.part.as_mut() {
                if let Err(e) = writer.write_all(encoded) {
                    error!(
                        volume = self.volume,
                        path = self.path,
                        disk = live.index,
                        "writing encoded shard failed: {}",
                        e
                    );
                    return Err(e.into());
                }
                live.hasher.update(encoded);
            }
        }
        Ok(())
    }

    /// Build the sidecar record once and write it to every live disk,
    /// overriding the shard checksum per disk
    fn write_sidecars(&mut self) -> Result<()> {
        let mut meta = FileMetadata::new();
        meta.set(keys::VERSION, metadata::ENGINE_VERSION);
        meta.set(keys::FORMAT_MAJOR, metadata::FORMAT_MAJOR);
        meta.set(keys::FORMAT_MINOR, metadata::FORMAT_MINOR);
        meta.set(keys::FORMAT_PATCH, metadata::FORMAT_PATCH);
        meta.set(keys::FILE_SIZE, self.total_size.to_string());
        meta.set(keys::FILE_MOD_TIME, metadata::format_mod_time(Utc::now()));
        meta.set(keys::BLOCK_SIZE, ERASURE_BLOCK_SIZE.to_string());
        meta.set(keys::DATA_BLOCKS, self.engine.config.data_shards.to_string());
        meta.set(
            keys::PARITY_BLOCKS,
            self.engine.config.parity_shards.to_string(),
        );
        // Only a partial write records its generation; a write that landed
        // on all disks leaves it out.
        if self.shards.len() < self.engine.disks.len() {
            meta.set(keys::FILE_VERSION, self.next_version.to_string());
        }

        for live in &mut self.shards {
            let hasher = std::mem::take(&mut live.hasher);
            meta.set(keys::BLOCK_512_SUM, hasher.finalize_hex());
            if let Some(writer) = live.sidecar.as_mut() {
                if let Err(e) = meta.write_to(writer) {
                    error!(
                        volume = self.volume,
                        path = self.path,
                        disk = live.index,
                        "writing sidecar failed: {}",
                        e
                    );
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Promote every staged file under the exclusive namespace lock
    fn commit(mut self) -> Result<()> {
        let _commit_lock = self.engine.ns.exclusive(self.volume, self.path);
        for i in 0..self.shards.len() {
            let index = self.shards[i].index;
            if let Some(part) = self.shards[i].part.take() {
                if let Err(e) = part.commit() {
                    error!(
                        volume = self.volume,
                        path = self.path,
                        disk = index,
                        "committing shard failed: {}",
                        e
                    );
                    self.abort();
                    return Err(e);
                }
            }
            if let Some(sidecar) = self.shards[i].sidecar.take() {
                if let Err(e) = sidecar.commit() {
                    error!(
                        volume = self.volume,
                        path = self.path,
                        disk = index,
                        "committing sidecar failed: {}",
                        e
                    );
                    self.abort();
                    return Err(e);
                }
            }
        }
        debug!(
            volume = self.volume,
            path = self.path,
            size = self.total_size,
            disks = self.shards.len(),
            "object committed"
        );
        Ok(())
    }

    /// Discard all remaining staged writers and sweep every disk
    ///
    /// Safe for any mixture of missing, staged, and already-committed
    /// writers; staged files may exist on disks whose later step failed, so
    /// the delete sweep covers the whole disk set, not just live disks.
    fn abort(mut self) {
        for live in &mut self.shards {
            if let Some(writer) = live.part.take() {
                if let Err(e) = writer.discard() {
                    warn!(
                        volume = self.volume,
                        path = self.path,
                        disk = live.index,
                        "discarding shard writer failed: {}",
                        e
                    );
                }
            }
            if let Some(writer) = live.sidecar.take() {
                if let Err(e) = writer.discard() {
                    warn!(
                        volume = self.volume,
                        path = self.path,
                        disk = live.index,
                        "discarding sidecar writer failed: {}",
                        e
                    );
                }
            }
        }
        for (index, disk) in self.engine.disks.iter().enumerate() {
            if let Err(e) = disk.delete_file(self.volume, self.path) {
                if !e.is_not_found() {
                    warn!(
                        volume = self.volume,
                        path = self.path,
                        disk = index,
                        "cleanup delete failed: {}",
                        e
                    );
                }
            }
        }
    }
}

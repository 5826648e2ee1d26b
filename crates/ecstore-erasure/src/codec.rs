//! Reed-Solomon encoder/decoder
//!
//! Wraps the `reed-solomon-erasure` crate behind the split/encode surface the
//! write pipeline consumes. Shard sizes are per call: every block of n bytes
//! yields D shards of ceil(n / D) bytes (the last one zero-padded), so the
//! final short block of a stream simply produces shorter shards. The decoder
//! side recovers the exact object length by truncating to the recorded size.

use ecstore_common::{Error as CommonError, Result};
use reed_solomon_erasure::galois_8::ReedSolomon;
use thiserror::Error;

/// Errors specific to erasure coding operations
#[derive(Debug, Error)]
pub enum ErasureError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("reconstruction failed: {0}")]
    ReconstructionFailed(String),

    #[error("insufficient shards: have {available}, need {required}")]
    InsufficientShards { available: usize, required: usize },

    #[error("cannot encode an empty block")]
    EmptyBlock,
}

impl From<ErasureError> for CommonError {
    fn from(e: ErasureError) -> Self {
        CommonError::ErasureCoding(e.to_string())
    }
}

/// Reed-Solomon codec for a fixed D + P geometry
pub struct ErasureCodec {
    rs: ReedSolomon,
    data_shards: usize,
    parity_shards: usize,
}

impl ErasureCodec {
    /// Create a new codec for the given number of data and parity shards
    pub fn new(data_shards: usize, parity_shards: usize) -> Result<Self> {
        if data_shards == 0 {
            return Err(ErasureError::InvalidConfig("data_shards must be > 0".into()).into());
        }
        if parity_shards == 0 {
            return Err(ErasureError::InvalidConfig("parity_shards must be > 0".into()).into());
        }
        let rs = ReedSolomon::new(data_shards, parity_shards)
            .map_err(|e| ErasureError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            rs,
            data_shards,
            parity_shards,
        })
    }

    /// Number of data shards (D)
    #[must_use]
    pub const fn data_shards(&self) -> usize {
        self.data_shards
    }

    /// Number of parity shards (P)
    #[must_use]
    pub const fn parity_shards(&self) -> usize {
        self.parity_shards
    }

    /// Total number of shards (N = D + P)
    #[must_use]
    pub const fn total_shards(&self) -> usize {
        self.data_shards + self.parity_shards
    }

    /// Split a block into D equal-length data shards
    ///
    /// Shard size is ceil(n / D); the last shard is zero-padded up to it.
    pub fn split(&self, data: &[u8]) -> Result<Vec<Vec<u8>>> {
        if data.is_empty() {
            return Err(ErasureError::EmptyBlock.into());
        }
        let shard_size = (data.len() + self.data_shards - 1) / self.data_shards;
        let mut shards = Vec::with_capacity(self.data_shards);
        for chunk in data.chunks(shard_size) {
            let mut shard = vec![0u8; shard_size];
            shard[..chunk.len()].copy_from_slice(chunk);
            shards.push(shard);
        }
        // A short input can leave fewer than D chunks; pad with zero shards.
        while shards.len() < self.data_shards {
            shards.push(vec![0u8; shard_size]);
        }
        Ok(shards)
    }

    /// Compute parity over D data shards, appending P parity shards in place
    pub fn encode(&self, shards: &mut Vec<Vec<u8>>) -> Result<()> {
        if shards.len() != self.data_shards {
            return Err(ErasureError::EncodingFailed(format!(
                "expected {} data shards, got {}",
                self.data_shards,
                shards.len()
            ))
            .into());
        }
        let shard_size = shards[0].len();
        for _ in 0..self.parity_shards {
            shards.push(vec![0u8; shard_size]);
        }
        self.rs
            .encode(shards)
            .map_err(|e| ErasureError::EncodingFailed(e.to_string()))?;
        Ok(())
    }

    /// Reconstruct missing shards in place
    ///
    /// `shards[i]` is `None` for a missing shard. At least D shards must be
    /// present.
    pub fn reconstruct(&self, shards: &mut [Option<Vec<u8>>]) -> Result<()> {
        let available = shards.iter().filter(|s| s.is_some()).count();
        if available < self.data_shards {
            return Err(ErasureError::InsufficientShards {
                available,
                required: self.data_shards,
            }
            .into());
        }
        self.rs
            .reconstruct(shards)
            .map_err(|e| ErasureError::ReconstructionFailed(e.to_string()))?;
        Ok(())
    }

    /// Decode one encoded block back to its original bytes
    ///
    /// Reconstructs any missing shards, concatenates the D data shards and
    /// truncates to `original_len`.
    pub fn decode(&self, shards: &mut [Option<Vec<u8>>], original_len: usize) -> Result<Vec<u8>> {
        self.reconstruct(shards)?;
        let mut data = Vec::with_capacity(original_len);
        for shard in shards.iter().take(self.data_shards) {
            match shard {
                Some(bytes) => data.extend_from_slice(bytes),
                None => {
                    return Err(ErasureError::ReconstructionFailed(
                        "data shard still missing after reconstruction".into(),
                    )
                    .into())
                }
            }
        }
        data.truncate(original_len);
        Ok(data)
    }
}

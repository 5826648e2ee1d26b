//! ecstore Erasure Coding - Reed-Solomon codec
//!
//! Splits an input block into D data shards, computes P parity shards over
//! them, and reconstructs the block from any D surviving shards.

pub mod codec;

pub use codec::{ErasureCodec, ErasureError};

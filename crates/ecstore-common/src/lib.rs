//! ecstore Common - Shared types and utilities
//!
//! This crate provides the common types, error definitions and utilities
//! used across the ecstore components.

pub mod checksum;
pub mod config;
pub mod error;
pub mod types;

pub use checksum::{hex_encode, sha512_hex, ShardHasher};
pub use config::{EngineConfig, ERASURE_BLOCK_SIZE};
pub use error::{Error, Result};
pub use types::{ObjectPath, ObjectPathError, VolumeName, VolumeNameError};

//! Error types for ecstore
//!
//! This module defines the common error type used throughout the engine.
//! The enum is `Clone` because a producer-side failure must be observable
//! both at the caller's next `write` and at `close` of the write handle;
//! I/O errors are therefore carried as rendered strings.

use crate::types::{ObjectPathError, VolumeNameError};
use thiserror::Error;

/// Common result type for ecstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for ecstore
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid volume name: {0}")]
    InvalidVolumeName(#[from] VolumeNameError),

    #[error("invalid object path: {0}")]
    InvalidObjectPath(#[from] ObjectPathError),

    #[error("file not found")]
    FileNotFound,

    #[error("read quorum not met: {errors} disks failed, quorum is {quorum}")]
    ReadQuorum { errors: usize, quorum: usize },

    #[error("write quorum not met: {failed} disks failed, quorum is {quorum}")]
    WriteQuorum { failed: usize, quorum: usize },

    #[error("disk I/O error: {0}")]
    DiskIo(String),

    #[error("erasure coding error: {0}")]
    ErasureCoding(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("write pipeline closed")]
    PipeClosed,

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Check if this is a not found error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound)
    }

    /// Check if this is an invalid argument error
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_) | Self::InvalidVolumeName(_) | Self::InvalidObjectPath(_)
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound
        } else {
            Self::DiskIo(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_not_found() {
        assert!(Error::FileNotFound.is_not_found());
        assert!(!Error::PipeClosed.is_not_found());

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(Error::from(io).is_not_found());
    }

    #[test]
    fn test_error_invalid_argument() {
        assert!(Error::invalid_argument("bad").is_invalid_argument());
        assert!(!Error::FileNotFound.is_invalid_argument());
    }

    #[test]
    fn test_error_clone_preserves_message() {
        let err = Error::WriteQuorum {
            failed: 2,
            quorum: 3,
        };
        assert_eq!(err.to_string(), err.clone().to_string());
    }
}

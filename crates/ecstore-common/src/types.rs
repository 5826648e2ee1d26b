//! Core type definitions for ecstore
//!
//! Validated name newtypes for the two halves of an object key. A key is a
//! (volume, path) pair; both sides are checked up front so the disk layer
//! never sees empty, traversing, or reserved names.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a storage volume
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct VolumeName(String);

impl VolumeName {
    /// Create a new volume name, validating it
    pub fn new(name: impl Into<String>) -> Result<Self, VolumeNameError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// Get the volume name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(name: &str) -> Result<(), VolumeNameError> {
        if name.is_empty() {
            return Err(VolumeNameError::Empty);
        }
        if name.len() < 3 {
            return Err(VolumeNameError::TooShort);
        }
        if name.len() > 63 {
            return Err(VolumeNameError::TooLong);
        }
        if name == "." || name == ".." {
            return Err(VolumeNameError::Traversal);
        }
        // Dot-prefixed names are reserved for engine-internal directories
        // such as the staging area.
        if name.starts_with('.') {
            return Err(VolumeNameError::Reserved);
        }
        for c in name.chars() {
            if c == '/' || c == '\\' {
                return Err(VolumeNameError::PathSeparator);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' && c != '_' && c != '.' {
                return Err(VolumeNameError::InvalidChar(c));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for VolumeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VolumeName({:?})", self.0)
    }
}

/// Errors that can occur when creating a volume name
#[derive(Debug, Clone, thiserror::Error)]
pub enum VolumeNameError {
    #[error("volume name cannot be empty")]
    Empty,
    #[error("volume name must be at least 3 characters")]
    TooShort,
    #[error("volume name must be at most 63 characters")]
    TooLong,
    #[error("volume name cannot be a traversal component")]
    Traversal,
    #[error("volume name is reserved")]
    Reserved,
    #[error("volume name cannot contain path separators")]
    PathSeparator,
    #[error("volume name contains invalid character: {0}")]
    InvalidChar(char),
}

/// Object path within a volume
///
/// Slash-separated; each component is checked so the path can be mapped
/// onto a filesystem without escaping the volume root.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct ObjectPath(String);

impl ObjectPath {
    /// Create a new object path, validating it
    pub fn new(path: impl Into<String>) -> Result<Self, ObjectPathError> {
        let path = path.into();
        Self::validate(&path)?;
        Ok(Self(path))
    }

    /// Get the object path as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(path: &str) -> Result<(), ObjectPathError> {
        if path.is_empty() {
            return Err(ObjectPathError::Empty);
        }
        if path.len() > 1024 {
            return Err(ObjectPathError::TooLong);
        }
        if path.contains('\0') {
            return Err(ObjectPathError::InvalidChar('\0'));
        }
        if path.contains('\\') {
            return Err(ObjectPathError::InvalidChar('\\'));
        }
        if path.starts_with('/') {
            return Err(ObjectPathError::Absolute);
        }
        for component in path.split('/') {
            if component.is_empty() {
                return Err(ObjectPathError::EmptyComponent);
            }
            if component == "." || component == ".." {
                return Err(ObjectPathError::Traversal);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectPath({:?})", self.0)
    }
}

/// Errors that can occur when creating an object path
#[derive(Debug, Clone, thiserror::Error)]
pub enum ObjectPathError {
    #[error("object path cannot be empty")]
    Empty,
    #[error("object path cannot exceed 1024 bytes")]
    TooLong,
    #[error("object path cannot be absolute")]
    Absolute,
    #[error("object path cannot contain empty components")]
    EmptyComponent,
    #[error("object path cannot contain traversal components")]
    Traversal,
    #[error("object path contains invalid character: {0:?}")]
    InvalidChar(char),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_name_valid() {
        assert!(VolumeName::new("my-volume").is_ok());
        assert!(VolumeName::new("vol123").is_ok());
        assert!(VolumeName::new("a.b.c").is_ok());
    }

    #[test]
    fn test_volume_name_invalid() {
        assert!(VolumeName::new("").is_err());
        assert!(VolumeName::new("ab").is_err()); // Too short
        assert!(VolumeName::new("..").is_err()); // Traversal
        assert!(VolumeName::new(".staging").is_err()); // Reserved
        assert!(VolumeName::new("a/b").is_err()); // Separator
        assert!(VolumeName::new("Volume").is_err()); // Uppercase
        assert!(VolumeName::new(&"x".repeat(64)).is_err()); // Too long
    }

    #[test]
    fn test_object_path_valid() {
        assert!(ObjectPath::new("object").is_ok());
        assert!(ObjectPath::new("a/b/c.bin").is_ok());
    }

    #[test]
    fn test_object_path_invalid() {
        assert!(ObjectPath::new("").is_err());
        assert!(ObjectPath::new("/abs").is_err());
        assert!(ObjectPath::new("a//b").is_err());
        assert!(ObjectPath::new("a/../b").is_err());
        assert!(ObjectPath::new("a\\b").is_err());
        assert!(ObjectPath::new(&"p/".repeat(600)).is_err());
    }
}

//! Sidecar metadata record
//!
//! Every disk that holds a shard of an object also holds a small sidecar
//! record next to it, describing the erasure geometry, the decoded object
//! size and the checksum of that disk's shard stream. The record is a flat
//! string-to-string map serialized as JSON: round-trip faithful and tolerant
//! of keys written by newer engines.

use chrono::{DateTime, SecondsFormat, Utc};
use ecstore_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

/// Sidecar file name, identical on every disk
pub const METADATA_FILE: &str = "file.json";

/// Engine version tag stored under [`keys::VERSION`]
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sidecar format version
pub const FORMAT_MAJOR: &str = "1";
/// Sidecar format version
pub const FORMAT_MINOR: &str = "0";
/// Sidecar format version
pub const FORMAT_PATCH: &str = "0";

/// Well-known sidecar keys
pub mod keys {
    pub const VERSION: &str = "version";
    pub const FORMAT_MAJOR: &str = "format.major";
    pub const FORMAT_MINOR: &str = "format.minor";
    pub const FORMAT_PATCH: &str = "format.patch";
    pub const FILE_SIZE: &str = "file.size";
    pub const FILE_MOD_TIME: &str = "file.modTime";
    pub const FILE_VERSION: &str = "file.version";
    pub const BLOCK_SIZE: &str = "file.xl.blockSize";
    pub const DATA_BLOCKS: &str = "file.xl.dataBlocks";
    pub const PARITY_BLOCKS: &str = "file.xl.parityBlocks";
    pub const BLOCK_512_SUM: &str = "file.xl.block512Sum";
}

/// Shard file name for the given disk index
#[must_use]
pub fn part_name(index: usize) -> String {
    format!("part.{index}")
}

/// Path of the shard file for disk `index` under the object path
#[must_use]
pub fn part_path(path: &str, index: usize) -> String {
    format!("{path}/part.{index}")
}

/// Path of the sidecar record under the object path
#[must_use]
pub fn sidecar_path(path: &str) -> String {
    format!("{path}/{METADATA_FILE}")
}

/// Format a modification time the way the sidecar stores it (UTC, millisecond
/// precision)
#[must_use]
pub fn format_mod_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// In-memory sidecar record
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileMetadata {
    entries: BTreeMap<String, String>,
}

impl FileMetadata {
    /// Create an empty record
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key to a value, replacing any previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Get a value by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// The partial-write generation, when present
    ///
    /// Absent or unparsable values read as `None`; the version scanner
    /// treats both as generation zero.
    #[must_use]
    pub fn file_version(&self) -> Option<u64> {
        self.get(keys::FILE_VERSION).and_then(|v| v.parse().ok())
    }

    /// Serialize the record to a byte sink
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        serde_json::to_writer(&mut *writer, self)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// Deserialize a record previously produced by [`Self::write_to`]
    pub fn read_from(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut meta = FileMetadata::new();
        meta.set(keys::VERSION, ENGINE_VERSION);
        meta.set(keys::FILE_SIZE, "10485760");
        meta.set(keys::BLOCK_512_SUM, "deadbeef");

        let mut buf = Vec::new();
        meta.write_to(&mut buf).unwrap();

        let parsed = FileMetadata::read_from(&buf).unwrap();
        assert_eq!(parsed, meta);
        assert_eq!(parsed.get(keys::FILE_SIZE), Some("10485760"));
    }

    #[test]
    fn test_unknown_keys_tolerated() {
        let parsed =
            FileMetadata::read_from(br#"{"file.size":"1","future.key":"kept"}"#).unwrap();
        assert_eq!(parsed.get("future.key"), Some("kept"));
    }

    #[test]
    fn test_file_version_parsing() {
        let mut meta = FileMetadata::new();
        assert_eq!(meta.file_version(), None);

        meta.set(keys::FILE_VERSION, "7");
        assert_eq!(meta.file_version(), Some(7));

        meta.set(keys::FILE_VERSION, "not-a-number");
        assert_eq!(meta.file_version(), None);
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(part_name(3), "part.3");
        assert_eq!(part_path("a/b", 0), "a/b/part.0");
        assert_eq!(sidecar_path("a/b"), "a/b/file.json");
    }

    #[test]
    fn test_mod_time_format() {
        let time = DateTime::parse_from_rfc3339("2016-05-04T03:02:01.123Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_mod_time(time), "2016-05-04T03:02:01.123Z");
    }
}

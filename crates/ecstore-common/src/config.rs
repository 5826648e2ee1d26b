//! Configuration types for ecstore
//!
//! The engine stripes each object across N = data + parity disks. The write
//! quorum bounds how many disks may fail staging before a write is refused;
//! the read quorum bounds how many sidecar reads may fail before a version
//! scan is refused.

use serde::{Deserialize, Serialize};

/// Erasure block size in bytes. Input is consumed and encoded in windows of
/// this size; the final window may be shorter.
pub const ERASURE_BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Erasure striping and quorum configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of data shards (D)
    pub data_shards: usize,
    /// Number of parity shards (P)
    pub parity_shards: usize,
    /// Write quorum (W): minimum disks that must stage successfully
    pub write_quorum: usize,
}

impl EngineConfig {
    /// Create a config with the default write quorum of D + 1
    #[must_use]
    pub const fn new(data_shards: usize, parity_shards: usize) -> Self {
        Self {
            data_shards,
            parity_shards,
            write_quorum: data_shards + 1,
        }
    }

    /// Override the write quorum
    #[must_use]
    pub const fn with_write_quorum(mut self, write_quorum: usize) -> Self {
        self.write_quorum = write_quorum;
        self
    }

    /// Total number of disks (N = D + P)
    #[must_use]
    pub const fn total_shards(&self) -> usize {
        self.data_shards + self.parity_shards
    }

    /// Read quorum (R = D)
    #[must_use]
    pub const fn read_quorum(&self) -> usize {
        self.data_shards
    }

    /// Validate the configuration
    ///
    /// Requires D >= 1, P >= 1, N <= 255 and D + 1 <= W <= N. The lower
    /// bound on W guarantees that any quorum of committed shards is
    /// decodable.
    pub fn validate(&self) -> Result<(), String> {
        if self.data_shards == 0 {
            return Err("data_shards must be > 0".into());
        }
        if self.parity_shards == 0 {
            return Err("parity_shards must be > 0".into());
        }
        if self.total_shards() > 255 {
            return Err("total shards must be <= 255".into());
        }
        if self.write_quorum < self.data_shards + 1 {
            return Err(format!(
                "write_quorum {} must be at least data_shards + 1 ({})",
                self.write_quorum,
                self.data_shards + 1
            ));
        }
        if self.write_quorum > self.total_shards() {
            return Err(format!(
                "write_quorum {} exceeds total shards {}",
                self.write_quorum,
                self.total_shards()
            ));
        }
        Ok(())
    }

    /// 2 data + 2 parity, write quorum 3
    pub const EC_2_2: Self = Self::new(2, 2);

    /// 4 data + 2 parity, write quorum 5
    pub const EC_4_2: Self = Self::new(4, 2);

    /// 8 data + 4 parity, write quorum 9
    pub const EC_8_4: Self = Self::new(8, 4);
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::EC_4_2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.data_shards, 4);
        assert_eq!(config.parity_shards, 2);
        assert_eq!(config.write_quorum, 5);
        assert_eq!(config.read_quorum(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_quorum_bounds() {
        assert!(EngineConfig::new(2, 2).validate().is_ok());
        assert!(EngineConfig::new(0, 2).validate().is_err());
        assert!(EngineConfig::new(2, 0).validate().is_err());

        // W below D + 1 breaks decodability of a quorum.
        let low = EngineConfig::new(2, 2).with_write_quorum(2);
        assert!(low.validate().is_err());

        // W above N can never be met.
        let high = EngineConfig::new(2, 2).with_write_quorum(5);
        assert!(high.validate().is_err());

        let max = EngineConfig::new(2, 2).with_write_quorum(4);
        assert!(max.validate().is_ok());
    }
}

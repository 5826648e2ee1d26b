//! Checksum utilities for ecstore
//!
//! Each erasure shard stream gets its own SHA-512 accumulator; the finalized
//! digest is stored hex-encoded in the per-disk sidecar record.

use sha2::{Digest, Sha512};

/// Streaming SHA-512 accumulator for one shard stream
pub struct ShardHasher {
    inner: Sha512,
}

impl ShardHasher {
    /// Create a new hasher
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Sha512::new(),
        }
    }

    /// Feed more shard bytes into the hasher
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalize and return the raw 64-byte digest
    #[must_use]
    pub fn finalize(self) -> [u8; 64] {
        self.inner.finalize().into()
    }

    /// Finalize and return the digest as lowercase hex
    #[must_use]
    pub fn finalize_hex(self) -> String {
        hex_encode(&self.finalize())
    }
}

impl Default for ShardHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot SHA-512 of a byte slice, as lowercase hex
#[must_use]
pub fn sha512_hex(data: &[u8]) -> String {
    let digest: [u8; 64] = Sha512::digest(data).into();
    hex_encode(&digest)
}

/// Hex encode bytes (lowercase)
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";
    let mut result = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        result.push(HEX_CHARS[(byte >> 4) as usize] as char);
        result.push(HEX_CHARS[(byte & 0x0f) as usize] as char);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    // SHA-512 of the empty string.
    const EMPTY_SHA512: &str = "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce\
                                47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e";

    #[test]
    fn test_empty_digest() {
        assert_eq!(sha512_hex(b""), EMPTY_SHA512);
        assert_eq!(ShardHasher::new().finalize_hex(), EMPTY_SHA512);
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let mut hasher = ShardHasher::new();
        hasher.update(b"hello, ");
        hasher.update(b"world!");
        assert_eq!(hasher.finalize_hex(), sha512_hex(b"hello, world!"));
    }

    #[test]
    fn test_hex_encode() {
        assert_eq!(hex_encode(&[0x12, 0xab, 0xcd]), "12abcd");
        assert_eq!(hex_encode(&[0x00, 0xff]), "00ff");
    }
}

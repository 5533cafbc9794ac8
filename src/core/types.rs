// Basic types for the ledger

use crate::error::{LedgerError, Result};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// 256-bit hash type (32 bytes)
/// Used for block hashes, transaction IDs, and merkle roots.
/// The all-zero value stands for "no hash" (genesis prev-hash, coinbase input).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// Create a new Hash256 from a byte array
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a Hash256 from a slice
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; 32] = slice.try_into().map_err(|_| {
            LedgerError::Serialization(format!(
                "Invalid hash length: expected 32, got {}",
                slice.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Get the hash as a byte slice
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The empty hash
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Hex string, most significant byte first
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| LedgerError::Serialization(format!("Invalid hex string: {}", e)))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// RIPEMD160(SHA256(pubkey)) - the identity an output is locked to
pub type PubKeyHash = [u8; 20];

/// Seconds since the Unix epoch (0 if the clock is before it)
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash256_zero() {
        let zero = Hash256::zero();
        assert_eq!(zero.as_bytes(), &[0u8; 32]);
        assert!(zero.is_zero());
        assert!(!Hash256::new([1u8; 32]).is_zero());
    }

    #[test]
    fn test_hash256_hex_is_big_endian() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xab;
        let hash = Hash256::new(bytes);
        assert!(hash.to_hex().starts_with("ab00"));
        assert_eq!(Hash256::from_hex(&hash.to_hex()).unwrap(), hash);
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        assert!(Hash256::from_slice(&[0u8; 31]).is_err());
        assert!(Hash256::from_hex("abcd").is_err());
    }
}

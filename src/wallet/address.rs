// Base58Check addresses

use crate::core::{PubKeyHash, checksum, hash160};
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version byte prepended to the key hash
pub const ADDRESS_VERSION: u8 = 0x00;

const CHECKSUM_LEN: usize = 4;
const PAYLOAD_LEN: usize = 1 + 20;

/// Base58Check(version || RIPEMD160(SHA256(pubkey)) || checksum)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    /// Derive the address of a raw X || Y public key
    pub fn from_pubkey(pubkey: &[u8]) -> Self {
        Self::from_pubkey_hash(&hash160(pubkey))
    }

    /// Encode a key hash as an address
    pub fn from_pubkey_hash(hash: &PubKeyHash) -> Self {
        let mut payload = Vec::with_capacity(PAYLOAD_LEN + CHECKSUM_LEN);
        payload.push(ADDRESS_VERSION);
        payload.extend_from_slice(hash);

        let check = checksum(&payload);
        payload.extend_from_slice(&check);

        Self(bs58::encode(payload).into_string())
    }

    /// Get address string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the key hash: strip the version byte and the trailing
    /// checksum. The checksum is not recomputed here; see `is_valid`.
    pub fn to_pubkey_hash(&self) -> Result<PubKeyHash> {
        let decoded = self.decode()?;
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&decoded[1..PAYLOAD_LEN]);
        Ok(hash)
    }

    /// Full Base58Check validation: length, version byte and checksum
    pub fn is_valid(&self) -> bool {
        match self.decode() {
            Ok(decoded) => {
                let (payload, check) = decoded.split_at(PAYLOAD_LEN);
                payload[0] == ADDRESS_VERSION && checksum(payload) == check
            }
            Err(_) => false,
        }
    }

    fn decode(&self) -> Result<Vec<u8>> {
        let decoded = bs58::decode(&self.0)
            .into_vec()
            .map_err(|e| LedgerError::InvalidAddress(format!("{}: {}", self.0, e)))?;

        if decoded.len() != PAYLOAD_LEN + CHECKSUM_LEN {
            return Err(LedgerError::InvalidAddress(format!(
                "{}: decodes to {} bytes, expected {}",
                self.0,
                decoded.len(),
                PAYLOAD_LEN + CHECKSUM_LEN
            )));
        }
        Ok(decoded)
    }
}

/// Whether `address` is a well-formed Base58Check address
pub fn is_valid_address(address: &str) -> bool {
    Address::from(address).is_valid()
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

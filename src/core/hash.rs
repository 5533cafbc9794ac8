// Hashing utilities

use crate::core::{Hash256, PubKeyHash};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Single SHA256, used for block hashes, txids and the merkle digest
pub fn sha256(data: &[u8]) -> Hash256 {
    Hash256::new(Sha256::digest(data).into())
}

/// RIPEMD160(SHA256(data)) - used for address generation
pub fn hash160(data: &[u8]) -> PubKeyHash {
    let sha = Sha256::digest(data);
    Ripemd160::digest(sha).into()
}

/// First 4 bytes of SHA256(SHA256(payload)) - Base58Check checksum
pub fn checksum(payload: &[u8]) -> [u8; 4] {
    let first = Sha256::digest(payload);
    let second = Sha256::digest(first);
    let mut result = [0u8; 4];
    result.copy_from_slice(&second[..4]);
    result
}

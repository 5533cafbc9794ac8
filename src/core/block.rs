// Block data structures

use crate::consensus::{MiningResult, ProofOfWork};
use crate::core::{Hash256, Serializable, Transaction, sha256, unix_now};
use crate::error::{LedgerError, Result};
use std::io::Cursor;
use super::serialize::{read_array, read_hash, read_varint, write_varint};

/// Serialized header length: five u64 fields and two hashes
pub const HEADER_SIZE: usize = 96;

/// Block header - the bytes proof-of-work is computed over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block version
    pub version: u64,
    /// Hash of the previous block (zero for genesis)
    pub prev_block_hash: Hash256,
    /// SHA256 over the concatenated transaction IDs
    pub merkle_root: Hash256,
    /// Block timestamp (Unix epoch)
    pub timestamp: u64,
    /// Leading zero bits required of the block hash
    pub difficulty: u64,
    /// Nonce for proof-of-work
    pub nonce: u64,
}

impl BlockHeader {
    /// Create a new block header
    pub fn new(
        version: u64,
        prev_block_hash: Hash256,
        merkle_root: Hash256,
        timestamp: u64,
        difficulty: u64,
        nonce: u64,
    ) -> Self {
        Self {
            version,
            prev_block_hash,
            merkle_root,
            timestamp,
            difficulty,
            nonce,
        }
    }

    /// Calculate the hash of this block header
    pub fn hash(&self) -> Hash256 {
        sha256(&self.serialize())
    }

    /// Serialize the header, integers big-endian
    pub fn serialize(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..8].copy_from_slice(&self.version.to_be_bytes());
        buf[8..40].copy_from_slice(self.prev_block_hash.as_bytes());
        buf[40..72].copy_from_slice(self.merkle_root.as_bytes());
        buf[72..80].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[80..88].copy_from_slice(&self.difficulty.to_be_bytes());
        buf[88..96].copy_from_slice(&self.nonce.to_be_bytes());
        buf
    }

    /// Deserialize a block header
    pub fn deserialize(data: &[u8; HEADER_SIZE]) -> Self {
        let u64_at = |at: usize| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&data[at..at + 8]);
            u64::from_be_bytes(bytes)
        };
        let hash_at = |at: usize| {
            let mut bytes = [0u8; 32];
            bytes.copy_from_slice(&data[at..at + 32]);
            Hash256::new(bytes)
        };

        Self {
            version: u64_at(0),
            prev_block_hash: hash_at(8),
            merkle_root: hash_at(40),
            timestamp: u64_at(72),
            difficulty: u64_at(80),
            nonce: u64_at(88),
        }
    }
}

/// Block - mined header, its hash, and the transactions it commits to
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub header: BlockHeader,
    /// Header hash found by mining
    pub hash: Hash256,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub const VERSION: u64 = 0;

    /// Mine a block on top of `prev_block_hash`.
    ///
    /// Blocks the calling thread until a nonce satisfying the target is found.
    pub fn mine(
        transactions: Vec<Transaction>,
        prev_block_hash: Hash256,
        pow: &ProofOfWork,
    ) -> (Self, MiningResult) {
        let mut header = BlockHeader::new(
            Self::VERSION,
            prev_block_hash,
            Self::calculate_merkle_root(&transactions),
            unix_now(),
            pow.target().zero_bits() as u64,
            0,
        );

        let result = pow.mine(&mut header);
        let block = Self {
            header,
            hash: result.hash,
            transactions,
        };
        (block, result)
    }

    /// Flat digest: SHA256 over the concatenation of all transaction IDs
    pub fn calculate_merkle_root(transactions: &[Transaction]) -> Hash256 {
        let mut ids = Vec::with_capacity(transactions.len() * 32);
        for tx in transactions {
            ids.extend_from_slice(tx.id.as_bytes());
        }
        sha256(&ids)
    }

    pub fn prev_block_hash(&self) -> Hash256 {
        self.header.prev_block_hash
    }

    /// Check if this is the genesis block
    pub fn is_genesis(&self) -> bool {
        self.header.prev_block_hash.is_zero()
    }
}

impl Serializable for Block {
    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        buf.extend_from_slice(&self.header.serialize());
        buf.extend_from_slice(self.hash.as_bytes());

        let _ = write_varint(&mut buf, self.transactions.len() as u64);
        for tx in &self.transactions {
            tx.write_to(&mut buf);
        }

        buf
    }

    fn deserialize(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);

        let header_bytes: [u8; HEADER_SIZE] = read_array(&mut cursor)?;
        let header = BlockHeader::deserialize(&header_bytes);
        let hash = read_hash(&mut cursor)?;

        let tx_count = read_varint(&mut cursor)?;
        let mut transactions = Vec::new();
        for _ in 0..tx_count {
            transactions.push(Transaction::from_reader(&mut cursor)?);
        }

        if cursor.position() != data.len() as u64 {
            return Err(LedgerError::Serialization(format!(
                "{} trailing bytes after block {}",
                data.len() as u64 - cursor.position(),
                hash
            )));
        }

        Ok(Self {
            header,
            hash,
            transactions,
        })
    }
}

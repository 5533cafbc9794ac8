// Ledger configuration

use crate::consensus::{ProofOfWork, Target};
use std::path::PathBuf;

/// Everything the ledger needs to open its store and mine blocks
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Directory of the sled database
    pub data_dir: PathBuf,
    /// Use a throwaway in-memory store instead of `data_dir`
    pub temporary: bool,
    /// Tree (namespace) holding blocks and the tail key
    pub bucket: String,
    /// Reserved key whose value is the tail block hash
    pub tail_key: String,
    /// Leading zero bits of the fixed proof-of-work target
    pub target_bits: u32,
    /// Coinbase reward per block
    pub reward: f64,
    /// Receiver of the genesis coinbase; only read when the store is empty
    pub genesis_address: Option<String>,
    /// Miner data carried by the genesis coinbase input
    pub genesis_data: String,
}

impl LedgerConfig {
    /// Default configuration rooted at `data_dir`
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// In-memory store with an easy target (for testing)
    pub fn temporary() -> Self {
        Self {
            temporary: true,
            target_bits: 8,
            ..Self::default()
        }
    }

    pub fn with_genesis_address(mut self, address: impl Into<String>) -> Self {
        self.genesis_address = Some(address.into());
        self
    }

    pub fn target(&self) -> Target {
        Target::from_zero_bits(self.target_bits)
    }

    pub fn proof_of_work(&self) -> ProofOfWork {
        ProofOfWork::new(self.target())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            temporary: false,
            bucket: "blockBucket".to_string(),
            tail_key: "LastHashKey".to_string(),
            target_bits: Target::DEFAULT_ZERO_BITS,
            reward: 12.5,
            genesis_address: None,
            genesis_data: "genesis block".to_string(),
        }
    }
}

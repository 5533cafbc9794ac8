// Educational single-node UTXO ledger

pub mod cli;
pub mod config;
pub mod consensus;
pub mod core;
pub mod error;
pub mod storage;
pub mod wallet;

// Re-exports for convenience
pub use cli::{Cli, CliHandler, Commands};
pub use config::LedgerConfig;
pub use consensus::{BlockValidator, MiningResult, ProofOfWork, Target};
pub use crate::core::{Block, BlockHeader, Hash256, PubKeyHash, Transaction, TxInput, TxOutput};
pub use error::{LedgerError, Result};
pub use storage::{Ledger, LedgerIterator, OutPoint, SpendableOutputs, UtxoIndex};
pub use wallet::{Address, KeyPair, Keystore, TransactionBuilder};

// Ledger error types

use crate::core::Hash256;
use thiserror::Error;

/// Errors produced by the ledger engine
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("Insufficient funds: have {available}, need {needed}")]
    InsufficientFunds { needed: f64, available: f64 },

    #[error("Address not found in keystore: {0}")]
    UnknownAddress(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(Hash256),

    #[error("Output {vout} of transaction {txid} does not exist")]
    OutputNotFound { txid: Hash256, vout: i64 },

    #[error("Invalid signature in transaction {0}")]
    InvalidSignature(Hash256),

    #[error("Transaction ID {0} does not match its content")]
    TransactionIdMismatch(Hash256),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid block {hash}: {reason}")]
    InvalidBlock { hash: Hash256, reason: String },

    #[error("Block not found: {0}")]
    BlockNotFound(Hash256),

    #[error("No chain in store and no genesis address configured")]
    ChainNotFound,

    #[error("Serialization failure: {0}")]
    Serialization(String),

    #[error("Storage unavailable: {0}")]
    Storage(#[from] sled::Error),

    #[error("Storage unavailable: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    /// Whether the caller can reasonably retry with different input.
    ///
    /// Integrity failures (bad signatures, corrupt records, storage errors)
    /// abort the current operation and are never recoverable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidAddress(_)
                | LedgerError::InvalidAmount(_)
                | LedgerError::InsufficientFunds { .. }
                | LedgerError::UnknownAddress(_)
                | LedgerError::TransactionNotFound(_)
                | LedgerError::OutputNotFound { .. }
                | LedgerError::ChainNotFound
        )
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_split() {
        assert!(LedgerError::InsufficientFunds { needed: 2.0, available: 1.0 }.is_recoverable());
        assert!(LedgerError::InvalidAddress("x".into()).is_recoverable());
        assert!(LedgerError::TransactionNotFound(Hash256::zero()).is_recoverable());

        assert!(!LedgerError::Serialization("truncated".into()).is_recoverable());
        assert!(!LedgerError::InvalidSignature(Hash256::zero()).is_recoverable());
        assert!(!LedgerError::TransactionIdMismatch(Hash256::zero()).is_recoverable());
        assert!(!LedgerError::BlockNotFound(Hash256::zero()).is_recoverable());
    }

    #[test]
    fn test_display() {
        let err = LedgerError::InsufficientFunds { needed: 5.0, available: 1.5 };
        assert_eq!(err.to_string(), "Insufficient funds: have 1.5, need 5");
    }
}

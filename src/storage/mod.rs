// Storage layer: the persisted chain and scans over it

mod iterator;
mod ledger;
mod utxo_index;

pub use iterator::LedgerIterator;
pub use ledger::Ledger;
pub use utxo_index::{OutPoint, SpendableOutputs, UtxoIndex};

// Wallet, addresses and transaction building

mod address;
mod keystore;
mod tx_builder;

pub use address::{ADDRESS_VERSION, Address, is_valid_address};
pub use keystore::{CURVE_NAME, FileWalletStore, KeyPair, Keystore, MemoryWalletStore, WalletStore};
pub use tx_builder::{TransactionBuilder, sign_transaction};

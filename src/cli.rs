// CLI commands

use crate::config::LedgerConfig;
use crate::core::{Block, Transaction};
use crate::error::{LedgerError, Result};
use crate::storage::{Ledger, UtxoIndex};
use crate::wallet::{Address, FileWalletStore, Keystore, TransactionBuilder, is_valid_address};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ledger")]
#[command(about = "Educational single-node UTXO ledger", long_about = None)]
pub struct Cli {
    /// Directory of the chain database
    #[arg(long, global = true, default_value = "./data")]
    pub data_dir: PathBuf,

    /// Wallet file holding the key pairs
    #[arg(long, global = true, default_value = "./wallet.json")]
    pub wallet: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a chain whose genesis reward goes to ADDRESS
    CreateChain {
        address: String,
    },

    /// Generate a new key pair and store it in the wallet
    CreateWallet,

    /// List the wallet's addresses
    ListAddresses,

    /// Sum of the unspent outputs locked to ADDRESS
    GetBalance {
        address: String,
    },

    /// Send coins and mine them into a new block
    Send {
        /// Sender address (must be in the wallet)
        #[arg(long)]
        from: String,
        /// Recipient address
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: f64,
        /// Receiver of the block reward (defaults to the sender)
        #[arg(long)]
        miner: Option<String>,
    },

    /// Print every block from newest to genesis
    PrintChain,

    /// Check hashes, proof-of-work, merkle roots and signatures of every block
    VerifyChain,
}

/// CLI handler
pub struct CliHandler {
    config: LedgerConfig,
    wallet_store: FileWalletStore,
}

impl CliHandler {
    pub fn new(data_dir: PathBuf, wallet_path: PathBuf) -> Self {
        Self {
            config: LedgerConfig::new(data_dir),
            wallet_store: FileWalletStore::new(wallet_path),
        }
    }

    /// Handle CLI command
    pub fn handle(&self, command: Commands) -> Result<()> {
        match command {
            Commands::CreateChain { address } => self.create_chain(&address),
            Commands::CreateWallet => self.create_wallet(),
            Commands::ListAddresses => self.list_addresses(),
            Commands::GetBalance { address } => self.get_balance(&address),
            Commands::Send {
                from,
                to,
                amount,
                miner,
            } => self.send(&from, &to, amount, miner.as_deref()),
            Commands::PrintChain => self.print_chain(),
            Commands::VerifyChain => self.verify_chain(),
        }
    }

    fn create_chain(&self, address: &str) -> Result<()> {
        let address = parse_address(address)?;

        match Ledger::open(&self.config) {
            Ok(ledger) => {
                println!("Chain already exists");
                println!("  Tail: {}", ledger.tail());
                return Ok(());
            }
            Err(LedgerError::ChainNotFound) => {}
            Err(e) => return Err(e),
        }

        let config = self.config.clone().with_genesis_address(address.as_str());
        let ledger = Ledger::open(&config)?;

        println!("✓ Genesis block created");
        println!("  Hash: {}", ledger.tail());
        println!("  Reward: {} to {}", ledger.reward(), address);
        Ok(())
    }

    fn create_wallet(&self) -> Result<()> {
        let mut keystore = Keystore::load(&self.wallet_store)?;
        let address = keystore.create(&self.wallet_store)?;
        println!("New address: {}", address);
        Ok(())
    }

    fn list_addresses(&self) -> Result<()> {
        let keystore = Keystore::load(&self.wallet_store)?;
        let addresses = keystore.list_addresses();

        println!("Addresses ({}):", addresses.len());
        for address in addresses {
            if keystore.default_address() == Some(&address) {
                println!("  {} (default)", address);
            } else {
                println!("  {}", address);
            }
        }
        Ok(())
    }

    fn get_balance(&self, address: &str) -> Result<()> {
        let address = parse_address(address)?;
        let ledger = Ledger::open(&self.config)?;

        let balance = UtxoIndex::new(&ledger).balance(&address.to_pubkey_hash()?)?;
        println!("Balance of {}: {}", address, balance);
        Ok(())
    }

    fn send(&self, from: &str, to: &str, amount: f64, miner: Option<&str>) -> Result<()> {
        let from = parse_address(from)?;
        let to = parse_address(to)?;
        let miner = match miner {
            Some(miner) => parse_address(miner)?,
            None => from.clone(),
        };

        let keystore = Keystore::load(&self.wallet_store)?;
        let keypair = keystore.require_keypair(&from)?;

        let mut ledger = Ledger::open(&self.config)?;
        let tx = TransactionBuilder::new(&ledger).send(keypair, &to, amount)?;

        // Reward data names the transfer so two rewards never share an ID
        let reward = Transaction::coinbase(
            miner.to_pubkey_hash()?,
            format!("reward for {}", tx.id).into_bytes(),
            ledger.reward(),
        );
        let txid = tx.id;
        let block = ledger.add_block(vec![reward, tx])?;

        println!("✓ Sent {} from {} to {}", amount, from, to);
        println!("  Transaction: {}", txid);
        println!("  Block: {}", block.hash);
        Ok(())
    }

    fn print_chain(&self) -> Result<()> {
        let ledger = Ledger::open(&self.config)?;
        for block in ledger.iter() {
            let block = block?;
            print_block(&block, ledger.proof_of_work().verify(&block.header));
        }
        Ok(())
    }

    fn verify_chain(&self) -> Result<()> {
        let ledger = Ledger::open(&self.config)?;
        let count = ledger.verify_chain()?;
        println!("✓ Chain is valid ({} blocks)", count);
        Ok(())
    }
}

fn parse_address(address: &str) -> Result<Address> {
    if !is_valid_address(address) {
        return Err(LedgerError::InvalidAddress(address.to_string()));
    }
    Ok(Address::from(address))
}

fn print_block(block: &Block, pow_valid: bool) {
    println!("Block {}", block.hash);
    println!("  Previous: {}", block.header.prev_block_hash);
    println!("  Merkle root: {}", block.header.merkle_root);
    println!("  Timestamp: {}", block.header.timestamp);
    println!("  Difficulty: {}", block.header.difficulty);
    println!("  Nonce: {}", block.header.nonce);
    println!("  PoW: {}", pow_valid);
    println!("  Transactions: {}", block.transactions.len());

    for tx in &block.transactions {
        println!("    Transaction {} (outputs total {})", tx.id, tx.total_output_value());
        for (i, input) in tx.inputs.iter().enumerate() {
            if input.is_coinbase() {
                println!("      Input {}: coinbase ({})", i, String::from_utf8_lossy(&input.pubkey));
            } else {
                println!("      Input {}: {}:{}", i, input.prev_txid, input.vout);
            }
        }
        for (i, output) in tx.outputs.iter().enumerate() {
            println!(
                "      Output {}: {} to {}",
                i,
                output.value,
                Address::from_pubkey_hash(&output.pubkey_hash)
            );
        }
    }
    println!();
}

// Block chain persisted in sled

use crate::config::LedgerConfig;
use crate::consensus::{BlockValidator, ProofOfWork, verify_transaction};
use crate::core::{Block, Hash256, Serializable, Transaction};
use crate::error::{LedgerError, Result};
use crate::storage::LedgerIterator;
use crate::wallet::Address;
use sled::{Batch, Db, Tree};

/// The chain: blocks keyed by hash plus one reserved key naming the tail.
///
/// Single writer. Both writes of an append go through one `sled::Batch`.
pub struct Ledger {
    db: Db,
    blocks: Tree,
    tail_key: Vec<u8>,
    tail: Hash256,
    pow: ProofOfWork,
    reward: f64,
}

impl Ledger {
    /// Open the store; mine and persist a genesis block if it holds no chain
    pub fn open(config: &LedgerConfig) -> Result<Self> {
        let db = if config.temporary {
            sled::Config::new().temporary(true).open()?
        } else {
            sled::open(&config.data_dir)?
        };
        let blocks = db.open_tree(config.bucket.as_bytes())?;

        let mut ledger = Self {
            db,
            blocks,
            tail_key: config.tail_key.as_bytes().to_vec(),
            tail: Hash256::zero(),
            pow: config.proof_of_work(),
            reward: config.reward,
        };

        match ledger.blocks.get(&ledger.tail_key)? {
            Some(tail) => {
                ledger.tail = Hash256::from_slice(&tail)?;
                log::debug!("Opened chain with tail {}", ledger.tail);
            }
            None => {
                let address = config
                    .genesis_address
                    .as_deref()
                    .ok_or(LedgerError::ChainNotFound)?;
                let to = Address::from(address).to_pubkey_hash()?;

                let coinbase = Transaction::coinbase(
                    to,
                    config.genesis_data.as_bytes().to_vec(),
                    config.reward,
                );
                let (genesis, _) = Block::mine(vec![coinbase], Hash256::zero(), &ledger.pow);
                ledger.append(&genesis)?;
                log::info!("Created genesis block {} paying {}", genesis.hash, address);
            }
        }

        Ok(ledger)
    }

    /// Hash of the newest block
    pub fn tail(&self) -> Hash256 {
        self.tail
    }

    pub fn reward(&self) -> f64 {
        self.reward
    }

    pub fn proof_of_work(&self) -> &ProofOfWork {
        &self.pow
    }

    /// Get a block by hash
    pub fn get_block(&self, hash: &Hash256) -> Result<Option<Block>> {
        load_block(&self.blocks, hash)
    }

    /// Verify, mine and persist a block holding `transactions`.
    ///
    /// Every transaction ID must match its content and every non-coinbase
    /// transaction must verify; otherwise nothing is written and the chain
    /// is unchanged.
    pub fn add_block(&mut self, transactions: Vec<Transaction>) -> Result<Block> {
        for tx in &transactions {
            if !tx.has_valid_id() {
                log::warn!("Rejecting block: transaction {} has a stale or forged ID", tx.id);
                return Err(LedgerError::TransactionIdMismatch(tx.id));
            }
            if !verify_transaction(tx, |id| self.find_transaction(id))? {
                log::warn!("Rejecting block: transaction {} failed verification", tx.id);
                return Err(LedgerError::InvalidSignature(tx.id));
            }
        }

        let (block, result) = Block::mine(transactions, self.tail, &self.pow);
        self.append(&block)?;
        log::info!(
            "Appended block {} with {} transactions after {} attempts",
            block.hash,
            block.transactions.len(),
            result.attempts
        );
        Ok(block)
    }

    /// Blocks from the tail back to genesis. Each call starts a fresh walk.
    pub fn iter(&self) -> LedgerIterator<'_> {
        LedgerIterator::new(&self.blocks, self.tail)
    }

    /// Linear scan of the whole chain for `txid`
    pub fn find_transaction(&self, txid: &Hash256) -> Result<Transaction> {
        for block in self.iter() {
            if let Some(tx) = block?.transactions.into_iter().find(|tx| tx.id == *txid) {
                return Ok(tx);
            }
        }
        Err(LedgerError::TransactionNotFound(*txid))
    }

    /// Validate every stored block and the back-links between them.
    /// Returns the number of blocks checked.
    pub fn verify_chain(&self) -> Result<usize> {
        let validator = BlockValidator::new(self.pow.clone());
        let mut count = 0;

        for block in self.iter() {
            let block = block?;
            validator.validate_block(&block)?;
            for tx in &block.transactions {
                if !verify_transaction(tx, |id| self.find_transaction(id))? {
                    return Err(LedgerError::InvalidSignature(tx.id));
                }
            }
            count += 1;
        }

        log::debug!("Verified {} blocks", count);
        Ok(count)
    }

    /// Write `block` and move the tail to it in one atomic batch
    fn append(&mut self, block: &Block) -> Result<()> {
        let mut batch = Batch::default();
        batch.insert(block.hash.as_bytes().as_slice(), block.serialize());
        batch.insert(self.tail_key.as_slice(), block.hash.as_bytes().as_slice());

        self.blocks.apply_batch(batch)?;
        self.db.flush()?;

        self.tail = block.hash;
        Ok(())
    }
}

/// Read and decode one block
pub(crate) fn load_block(blocks: &Tree, hash: &Hash256) -> Result<Option<Block>> {
    match blocks.get(hash.as_bytes())? {
        Some(data) => Ok(Some(Block::deserialize(&data)?)),
        None => Ok(None),
    }
}

// Backward walk over the stored chain

use crate::core::{Block, Hash256};
use crate::error::{LedgerError, Result};
use crate::storage::ledger::load_block;
use sled::Tree;

/// Yields blocks from a starting hash back to genesis, reading each one
/// from the store on demand. Stops after genesis or after the first error.
pub struct LedgerIterator<'a> {
    blocks: &'a Tree,
    current: Option<Hash256>,
}

impl<'a> LedgerIterator<'a> {
    pub(crate) fn new(blocks: &'a Tree, start: Hash256) -> Self {
        Self {
            blocks,
            current: Some(start),
        }
    }
}

impl Iterator for LedgerIterator<'_> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.current.take()?;

        let block = match load_block(self.blocks, &hash) {
            Ok(Some(block)) => block,
            Ok(None) => return Some(Err(LedgerError::BlockNotFound(hash))),
            Err(e) => return Some(Err(e)),
        };

        if !block.is_genesis() {
            self.current = Some(block.prev_block_hash());
        }
        Some(Ok(block))
    }
}

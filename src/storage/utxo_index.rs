// Unspent output discovery by chain scan

use crate::core::{Hash256, PubKeyHash, TxOutput};
use crate::error::Result;
use crate::storage::Ledger;
use std::collections::{BTreeMap, HashSet};

/// Output identifier - transaction ID + output index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutPoint {
    pub txid: Hash256,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Hash256, vout: u32) -> Self {
        Self { txid, vout }
    }
}

/// Outputs selected to cover an amount, in scan order (newest block first)
#[derive(Debug, Clone, Default)]
pub struct SpendableOutputs {
    pub outpoints: Vec<OutPoint>,
    /// Sum of the selected outputs; may fall short of the requested amount
    pub total: f64,
}

impl SpendableOutputs {
    /// Selected output indices grouped by transaction
    pub fn by_transaction(&self) -> BTreeMap<Hash256, Vec<u32>> {
        let mut grouped: BTreeMap<Hash256, Vec<u32>> = BTreeMap::new();
        for outpoint in &self.outpoints {
            grouped.entry(outpoint.txid).or_default().push(outpoint.vout);
        }
        grouped
    }
}

/// Stateless view computing unspent outputs from the chain on every call.
/// No index is materialized; each query rescans from the tail.
pub struct UtxoIndex<'a> {
    ledger: &'a Ledger,
}

impl<'a> UtxoIndex<'a> {
    pub fn new(ledger: &'a Ledger) -> Self {
        Self { ledger }
    }

    /// Collect unspent outputs owned by `pubkey_hash` until they cover `amount`.
    /// A total below `amount` means the owner cannot afford it.
    pub fn find_spendable(&self, pubkey_hash: &PubKeyHash, amount: f64) -> Result<SpendableOutputs> {
        let found = self.scan(pubkey_hash, Some(amount))?;

        let spendable = SpendableOutputs {
            total: found.iter().map(|(_, output)| output.value).sum(),
            outpoints: found.into_iter().map(|(outpoint, _)| outpoint).collect(),
        };
        log::debug!(
            "Found {} spendable outputs totalling {} (wanted {})",
            spendable.outpoints.len(),
            spendable.total,
            amount
        );
        Ok(spendable)
    }

    /// Every unspent output owned by `pubkey_hash`
    pub fn find_all_unspent(&self, pubkey_hash: &PubKeyHash) -> Result<Vec<TxOutput>> {
        Ok(self
            .scan(pubkey_hash, None)?
            .into_iter()
            .map(|(_, output)| output)
            .collect())
    }

    /// Sum of every unspent output owned by `pubkey_hash`
    pub fn balance(&self, pubkey_hash: &PubKeyHash) -> Result<f64> {
        Ok(self
            .find_all_unspent(pubkey_hash)?
            .iter()
            .map(|output| output.value)
            .sum())
    }

    // Walks tail to genesis. Spends are always newer than what they spend,
    // so an output's spend has been recorded by the time the output is seen.
    // Within one block all inputs are recorded before any output is checked.
    fn scan(&self, pubkey_hash: &PubKeyHash, limit: Option<f64>) -> Result<Vec<(OutPoint, TxOutput)>> {
        let mut spent: HashSet<OutPoint> = HashSet::new();
        let mut found = Vec::new();
        let mut total = 0.0;

        for block in self.ledger.iter() {
            let block = block?;

            for tx in block.transactions.iter().filter(|tx| !tx.is_coinbase()) {
                for input in tx.inputs.iter().filter(|input| input.uses_key(pubkey_hash)) {
                    if let Ok(vout) = u32::try_from(input.vout) {
                        spent.insert(OutPoint::new(input.prev_txid, vout));
                    }
                }
            }

            for tx in &block.transactions {
                for (vout, output) in tx.outputs.iter().enumerate() {
                    let outpoint = OutPoint::new(tx.id, vout as u32);
                    if !output.is_locked_with(pubkey_hash) || spent.contains(&outpoint) {
                        continue;
                    }

                    total += output.value;
                    found.push((outpoint, output.clone()));

                    if limit.is_some_and(|amount| total >= amount) {
                        return Ok(found);
                    }
                }
            }
        }

        Ok(found)
    }
}

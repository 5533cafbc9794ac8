// Transaction builder

use crate::core::{Hash256, PubKeyHash, Transaction, TxInput, TxOutput};
use crate::consensus::referenced_output;
use crate::error::{LedgerError, Result};
use crate::storage::{Ledger, UtxoIndex};
use crate::wallet::{Address, KeyPair};

/// Builds and signs spending transactions against a ledger
pub struct TransactionBuilder<'a> {
    ledger: &'a Ledger,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(ledger: &'a Ledger) -> Self {
        Self { ledger }
    }

    /// Build an unsigned transaction moving `amount` from the owner of
    /// `sender_pubkey` to `recipient`, returning any surplus as change
    pub fn build(
        &self,
        sender_pubkey: &[u8],
        sender_pubkey_hash: &PubKeyHash,
        recipient: &Address,
        amount: f64,
    ) -> Result<Transaction> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let recipient_hash = recipient.to_pubkey_hash()?;

        let spendable = UtxoIndex::new(self.ledger).find_spendable(sender_pubkey_hash, amount)?;
        if spendable.total < amount {
            return Err(LedgerError::InsufficientFunds {
                needed: amount,
                available: spendable.total,
            });
        }

        let inputs: Vec<TxInput> = spendable
            .by_transaction()
            .into_iter()
            .flat_map(|(txid, vouts)| {
                vouts
                    .into_iter()
                    .map(move |vout| TxInput::new(txid, vout, sender_pubkey.to_vec()))
            })
            .collect();

        // Payment first, change second
        let mut outputs = vec![TxOutput::new(amount, recipient_hash)];
        if spendable.total > amount {
            outputs.push(TxOutput::new(spendable.total - amount, *sender_pubkey_hash));
        }

        let tx = Transaction::new(inputs, outputs);
        log::debug!(
            "Built transaction {} spending {} outputs ({} to {})",
            tx.id,
            tx.inputs.len(),
            amount,
            recipient
        );
        Ok(tx)
    }

    /// Build and sign a transaction paying `amount` from `keypair` to `to`
    pub fn send(&self, keypair: &KeyPair, to: &Address, amount: f64) -> Result<Transaction> {
        let mut tx = self.build(keypair.pubkey_bytes(), &keypair.pubkey_hash(), to, amount)?;
        self.sign(&mut tx, keypair)?;
        Ok(tx)
    }

    /// Sign every input of `tx`, resolving sources from the ledger
    pub fn sign(&self, tx: &mut Transaction, keypair: &KeyPair) -> Result<()> {
        sign_transaction(tx, keypair, |id| self.ledger.find_transaction(id))
    }
}

/// Sign each input of `tx` over its own message.
///
/// `resolve` looks up the transaction an input spends from. Coinbase
/// transactions carry no signatures and are left as they are. The ID is
/// not recomputed.
pub fn sign_transaction<F>(tx: &mut Transaction, keypair: &KeyPair, mut resolve: F) -> Result<()>
where
    F: FnMut(&Hash256) -> Result<Transaction>,
{
    if tx.is_coinbase() {
        return Ok(());
    }

    for index in 0..tx.inputs.len() {
        let prev_tx = resolve(&tx.inputs[index].prev_txid)?;
        let referenced = referenced_output(&tx.inputs[index], &prev_tx)?;

        let message = tx.signable_message(index, referenced);
        tx.inputs[index].signature = keypair.sign_digest(&message)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::consensus::verify_transaction;

    fn funded_ledger() -> (Ledger, KeyPair) {
        let alice = KeyPair::generate();
        let config = LedgerConfig::temporary().with_genesis_address(alice.address.as_str());
        (Ledger::open(&config).unwrap(), alice)
    }

    #[test]
    fn test_build_with_change() {
        let (ledger, alice) = funded_ledger();
        let bob = KeyPair::generate();

        let builder = TransactionBuilder::new(&ledger);
        let tx = builder
            .build(&alice.public_key, &alice.pubkey_hash(), &bob.address, 1.0)
            .unwrap();

        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.outputs.len(), 2);
        assert_eq!(tx.outputs[0], TxOutput::new(1.0, bob.pubkey_hash()));
        assert_eq!(tx.outputs[1], TxOutput::new(11.5, alice.pubkey_hash()));
        assert!(tx.inputs.iter().all(|input| input.signature.is_empty()));
        assert_eq!(tx.id, tx.hash());
    }

    #[test]
    fn test_exact_amount_has_no_change() {
        let (ledger, alice) = funded_ledger();
        let bob = KeyPair::generate();

        let tx = TransactionBuilder::new(&ledger)
            .send(&alice, &bob.address, 12.5)
            .unwrap();
        assert_eq!(tx.outputs, vec![TxOutput::new(12.5, bob.pubkey_hash())]);
    }

    #[test]
    fn test_send_is_signed_and_verifies() {
        let (ledger, alice) = funded_ledger();
        let bob = KeyPair::generate();

        let tx = TransactionBuilder::new(&ledger)
            .send(&alice, &bob.address, 3.0)
            .unwrap();

        // Signing leaves the ID untouched
        assert_eq!(tx.id, tx.hash());
        assert!(verify_transaction(&tx, |id| ledger.find_transaction(id)).unwrap());
    }

    #[test]
    fn test_insufficient_funds() {
        let (ledger, alice) = funded_ledger();
        let bob = KeyPair::generate();

        let err = TransactionBuilder::new(&ledger)
            .send(&alice, &bob.address, 13.0)
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds { needed, available } if needed == 13.0 && available == 12.5
        ));
        assert!(err.is_recoverable());

        // No funds at all
        let err = TransactionBuilder::new(&ledger)
            .send(&bob, &alice.address, 1.0)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { available, .. } if available == 0.0));
    }

    #[test]
    fn test_invalid_amounts() {
        let (ledger, alice) = funded_ledger();
        let builder = TransactionBuilder::new(&ledger);

        for amount in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                builder.send(&alice, &alice.address, amount),
                Err(LedgerError::InvalidAmount(_))
            ));
        }
    }

    #[test]
    fn test_send_then_balances() {
        let (mut ledger, alice) = funded_ledger();
        let bob = KeyPair::generate();

        let tx = TransactionBuilder::new(&ledger)
            .send(&alice, &bob.address, 1.0)
            .unwrap();
        let reward = Transaction::coinbase(alice.pubkey_hash(), b"miner".to_vec(), 12.5);
        ledger.add_block(vec![reward, tx]).unwrap();

        let index = UtxoIndex::new(&ledger);
        assert_eq!(index.balance(&bob.pubkey_hash()).unwrap(), 1.0);
        assert_eq!(index.balance(&alice.pubkey_hash()).unwrap(), 24.0);

        // Spend the change and the new reward together
        let tx = TransactionBuilder::new(&ledger)
            .send(&alice, &bob.address, 20.0)
            .unwrap();
        assert_eq!(tx.inputs.len(), 2);
        ledger.add_block(vec![tx]).unwrap();

        let index = UtxoIndex::new(&ledger);
        assert_eq!(index.balance(&bob.pubkey_hash()).unwrap(), 21.0);
        assert_eq!(index.balance(&alice.pubkey_hash()).unwrap(), 4.0);
        assert_eq!(ledger.verify_chain().unwrap(), 3);
    }

    #[test]
    fn test_sign_coinbase_is_noop() {
        let alice = KeyPair::generate();
        let mut cb = Transaction::coinbase(alice.pubkey_hash(), b"data".to_vec(), 12.5);
        let before = cb.clone();

        sign_transaction(&mut cb, &alice, |id| Err(LedgerError::TransactionNotFound(*id))).unwrap();
        assert_eq!(cb, before);
    }
}

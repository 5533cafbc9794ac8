// Transaction and block validation

use crate::consensus::ProofOfWork;
use crate::core::{Block, Hash256, Transaction, TxInput, TxOutput};
use crate::error::{LedgerError, Result};
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::FieldBytes;

/// Raw public key width: X || Y
pub const PUBKEY_LEN: usize = 64;
/// Signature width: r || s
pub const SIGNATURE_LEN: usize = 64;

/// Find the output `input` spends inside its (already resolved) source transaction
pub fn referenced_output<'a>(input: &TxInput, prev_tx: &'a Transaction) -> Result<&'a TxOutput> {
    usize::try_from(input.vout)
        .ok()
        .and_then(|vout| prev_tx.outputs.get(vout))
        .ok_or(LedgerError::OutputNotFound {
            txid: input.prev_txid,
            vout: input.vout,
        })
}

/// Verify an ECDSA P-256 signature `r || s` over a 32-byte digest
/// with a raw `X || Y` public key
pub fn verify_digest(pubkey: &[u8], signature: &[u8], digest: &Hash256) -> bool {
    if pubkey.len() != PUBKEY_LEN || signature.len() != SIGNATURE_LEN {
        return false;
    }

    let mut sec1 = Vec::with_capacity(1 + PUBKEY_LEN);
    sec1.push(0x04);
    sec1.extend_from_slice(pubkey);
    let Ok(verifying_key) = VerifyingKey::from_sec1_bytes(&sec1) else {
        return false;
    };

    let (r, s) = signature.split_at(SIGNATURE_LEN / 2);
    let Ok(signature) = Signature::from_scalars(
        FieldBytes::clone_from_slice(r),
        FieldBytes::clone_from_slice(s),
    ) else {
        return false;
    };

    verifying_key
        .verify_prehash(digest.as_bytes(), &signature)
        .is_ok()
}

/// Verify every input signature of `tx`.
///
/// `resolve` looks up the transaction an input spends from. Coinbase
/// transactions are always valid. A single failing input invalidates the
/// whole transaction; lookup failures are returned as errors.
pub fn verify_transaction<F>(tx: &Transaction, mut resolve: F) -> Result<bool>
where
    F: FnMut(&Hash256) -> Result<Transaction>,
{
    if tx.is_coinbase() {
        return Ok(true);
    }

    for (index, input) in tx.inputs.iter().enumerate() {
        let prev_tx = resolve(&input.prev_txid)?;
        let Ok(referenced) = referenced_output(input, &prev_tx) else {
            log::warn!("Input {} of {} spends a missing output", index, tx.id);
            return Ok(false);
        };

        // The carried key must own the output it claims
        if !input.uses_key(&referenced.pubkey_hash) {
            log::warn!("Input {} of {} is not signed by the output owner", index, tx.id);
            return Ok(false);
        }

        let message = tx.signable_message(index, referenced);
        if !verify_digest(&input.pubkey, &input.signature, &message) {
            log::warn!("Input {} of {} has an invalid signature", index, tx.id);
            return Ok(false);
        }
    }

    Ok(true)
}

/// Block validator
pub struct BlockValidator {
    pow: ProofOfWork,
}

impl BlockValidator {
    pub fn new(pow: ProofOfWork) -> Self {
        Self { pow }
    }

    /// Check the stored hash, the recorded difficulty, the proof-of-work,
    /// every transaction ID and the merkle root.
    ///
    /// The target is fixed per store, so a header recording any other
    /// difficulty is rejected.
    pub fn validate_block(&self, block: &Block) -> Result<()> {
        let invalid = |reason: &str| LedgerError::InvalidBlock {
            hash: block.hash,
            reason: reason.to_string(),
        };

        if block.header.hash() != block.hash {
            return Err(invalid("stored hash does not match header"));
        }

        if block.header.difficulty != u64::from(self.pow.target().zero_bits()) {
            return Err(invalid("difficulty does not match the store's target"));
        }

        if !self.pow.target().is_met_by(&block.hash) {
            return Err(invalid("hash does not meet target"));
        }

        if let Some(tx) = block.transactions.iter().find(|tx| !tx.has_valid_id()) {
            return Err(LedgerError::TransactionIdMismatch(tx.id));
        }

        if Block::calculate_merkle_root(&block.transactions) != block.header.merkle_root {
            return Err(invalid("merkle root mismatch"));
        }

        let coinbase_count = block.transactions.iter().filter(|tx| tx.is_coinbase()).count();
        if coinbase_count > 1 {
            return Err(invalid("more than one coinbase transaction"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::Target;
    use crate::wallet::{KeyPair, sign_transaction};
    use std::collections::HashMap;

    struct Fixture {
        owner: KeyPair,
        funding: Transaction,
        spend: Transaction,
    }

    impl Fixture {
        fn new() -> Self {
            let owner = KeyPair::generate();
            let recipient = KeyPair::generate();

            let funding = Transaction::new(
                vec![TxInput::coinbase(b"fund".to_vec())],
                vec![
                    TxOutput::new(5.0, owner.pubkey_hash()),
                    TxOutput::new(7.5, owner.pubkey_hash()),
                ],
            );

            let mut spend = Transaction::new(
                vec![
                    TxInput::new(funding.id, 0, owner.public_key.clone()),
                    TxInput::new(funding.id, 1, owner.public_key.clone()),
                ],
                vec![
                    TxOutput::new(10.0, recipient.pubkey_hash()),
                    TxOutput::new(2.5, owner.pubkey_hash()),
                ],
            );

            let chain = Self::chain(&funding);
            sign_transaction(&mut spend, &owner, |id| lookup(&chain, id)).unwrap();

            Self {
                owner,
                funding,
                spend,
            }
        }

        fn chain(funding: &Transaction) -> HashMap<Hash256, Transaction> {
            HashMap::from([(funding.id, funding.clone())])
        }

        fn verify(&self, tx: &Transaction) -> Result<bool> {
            let chain = Self::chain(&self.funding);
            verify_transaction(tx, |id| lookup(&chain, id))
        }
    }

    fn lookup(chain: &HashMap<Hash256, Transaction>, id: &Hash256) -> Result<Transaction> {
        chain
            .get(id)
            .cloned()
            .ok_or(LedgerError::TransactionNotFound(*id))
    }

    #[test]
    fn test_sign_then_verify() {
        let fx = Fixture::new();
        assert!(fx.verify(&fx.spend).unwrap());
        assert!(fx.spend.inputs.iter().all(|i| i.signature.len() == SIGNATURE_LEN));
    }

    #[test]
    fn test_coinbase_always_valid() {
        let cb = Transaction::coinbase([1; 20], vec![], 12.5);
        assert!(verify_transaction(&cb, |id| Err(LedgerError::TransactionNotFound(*id))).unwrap());
    }

    #[test]
    fn test_any_signature_bit_flip_fails() {
        let fx = Fixture::new();
        for input in 0..fx.spend.inputs.len() {
            for byte in [0, 17, 31, 32, 50, 63] {
                for bit in [0u8, 3, 7] {
                    let mut tampered = fx.spend.clone();
                    tampered.inputs[input].signature[byte] ^= 1 << bit;
                    assert!(!fx.verify(&tampered).unwrap());
                }
            }
        }
    }

    #[test]
    fn test_changed_amount_fails() {
        let fx = Fixture::new();

        let mut tampered = fx.spend.clone();
        tampered.outputs[0].value = 12.0;
        assert!(!fx.verify(&tampered).unwrap());

        let mut tampered = fx.spend.clone();
        tampered.outputs[1].value = 2.0;
        assert!(!fx.verify(&tampered).unwrap());
    }

    #[test]
    fn test_swapped_claims_fail() {
        let fx = Fixture::new();

        // Point input 0 at output 1: its signature committed to output 0
        let mut tampered = fx.spend.clone();
        tampered.inputs[0].vout = 1;
        tampered.inputs[1].vout = 0;
        // Both outputs are owned by the same key, so ownership still holds;
        // the claimed outpoints are part of every input's message
        assert!(!fx.verify(&tampered).unwrap());
    }

    #[test]
    fn test_foreign_key_fails_ownership() {
        let fx = Fixture::new();
        let thief = KeyPair::generate();

        let mut stolen = Transaction::new(
            vec![TxInput::new(fx.funding.id, 0, thief.public_key.clone())],
            vec![TxOutput::new(5.0, thief.pubkey_hash())],
        );
        let chain = Fixture::chain(&fx.funding);
        sign_transaction(&mut stolen, &thief, |id| lookup(&chain, id)).unwrap();

        assert!(!fx.verify(&stolen).unwrap());
        assert_ne!(thief.pubkey_hash(), fx.owner.pubkey_hash());
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let fx = Fixture::new();
        let mut orphan = fx.spend.clone();
        orphan.inputs[0].prev_txid = Hash256::new([0xee; 32]);

        assert!(matches!(
            fx.verify(&orphan),
            Err(LedgerError::TransactionNotFound(_))
        ));
    }

    #[test]
    fn test_out_of_range_vout_is_invalid() {
        let fx = Fixture::new();
        let mut tampered = fx.spend.clone();
        tampered.inputs[1].vout = 9;
        assert!(!fx.verify(&tampered).unwrap());
    }

    #[test]
    fn test_malformed_key_or_signature() {
        let digest = Hash256::new([1; 32]);
        assert!(!verify_digest(&[0u8; 64], &[1u8; 64], &digest));
        assert!(!verify_digest(&[0u8; 10], &[1u8; 64], &digest));

        let kp = KeyPair::generate();
        let sig = kp.sign_digest(&digest).unwrap();
        assert!(verify_digest(&kp.public_key, &sig, &digest));
        assert!(!verify_digest(&kp.public_key, &sig[..63], &digest));
        assert!(!verify_digest(&kp.public_key, &[0u8; 64], &digest));
    }

    #[test]
    fn test_validate_block() {
        let pow = ProofOfWork::new(Target::from_zero_bits(8));
        let validator = BlockValidator::new(pow.clone());
        let cb = Transaction::coinbase([1; 20], b"x".to_vec(), 12.5);
        let (block, _) = Block::mine(vec![cb], Hash256::zero(), &pow);

        assert!(validator.validate_block(&block).is_ok());

        let mut bad_merkle = block.clone();
        bad_merkle.transactions[0].outputs[0].value = 99.0;
        bad_merkle.transactions[0].id = bad_merkle.transactions[0].hash();
        assert!(matches!(
            validator.validate_block(&bad_merkle),
            Err(LedgerError::InvalidBlock { .. })
        ));

        let mut bad_hash = block.clone();
        bad_hash.header.nonce += 1;
        assert!(validator.validate_block(&bad_hash).is_err());
    }

    #[test]
    fn test_validate_block_rejects_stale_id() {
        let pow = ProofOfWork::new(Target::from_zero_bits(8));
        let validator = BlockValidator::new(pow.clone());

        // ID copied from another transaction; merkle root and PoW still hold
        let mut forged = Transaction::coinbase([1; 20], b"x".to_vec(), 12.5);
        forged.id = Transaction::coinbase([2; 20], b"y".to_vec(), 12.5).id;
        let (block, _) = Block::mine(vec![forged], Hash256::zero(), &pow);

        assert!(matches!(
            validator.validate_block(&block),
            Err(LedgerError::TransactionIdMismatch(_))
        ));
    }

    #[test]
    fn test_validate_block_rejects_other_difficulty() {
        let cb = Transaction::coinbase([1; 20], b"x".to_vec(), 12.5);
        let (block, _) = Block::mine(vec![cb], Hash256::zero(), &ProofOfWork::new(Target::from_zero_bits(9)));

        // The hash also meets the easier 8-bit target, only the recorded difficulty differs
        let validator = BlockValidator::new(ProofOfWork::new(Target::from_zero_bits(8)));
        assert!(matches!(
            validator.validate_block(&block),
            Err(LedgerError::InvalidBlock { .. })
        ));
        assert!(BlockValidator::new(ProofOfWork::new(Target::from_zero_bits(9)))
            .validate_block(&block)
            .is_ok());
    }
}

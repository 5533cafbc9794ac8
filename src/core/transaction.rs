// Transaction data structures

use crate::core::{Hash256, PubKeyHash, Serializable, hash160, sha256, unix_now};
use crate::error::{LedgerError, Result};
use std::io::{Cursor, Read};
use super::serialize::{
    CodecError, read_array, read_f64, read_hash, read_i64, read_u64, read_var_bytes, read_varint,
    write_var_bytes, write_varint,
};

/// Output index carried by a coinbase input
pub const COINBASE_VOUT: i64 = -1;

/// Transaction input - references a previous transaction output
#[derive(Debug, Clone, PartialEq)]
pub struct TxInput {
    /// ID of the transaction holding the spent output (zero for coinbase)
    pub prev_txid: Hash256,
    /// Index of the output in that transaction (-1 for coinbase)
    pub vout: i64,
    /// r || s, fixed width
    pub signature: Vec<u8>,
    /// Spender's raw X || Y public key; arbitrary miner data for coinbase
    pub pubkey: Vec<u8>,
}

impl TxInput {
    /// Create an unsigned input spending `prev_txid:vout`
    pub fn new(prev_txid: Hash256, vout: u32, pubkey: Vec<u8>) -> Self {
        Self {
            prev_txid,
            vout: i64::from(vout),
            signature: Vec::new(),
            pubkey,
        }
    }

    /// Create a coinbase input (for mining rewards)
    pub fn coinbase(data: Vec<u8>) -> Self {
        Self {
            prev_txid: Hash256::zero(),
            vout: COINBASE_VOUT,
            signature: Vec::new(),
            pubkey: data,
        }
    }

    /// Check if this is a coinbase input
    pub fn is_coinbase(&self) -> bool {
        self.prev_txid.is_zero() && self.vout == COINBASE_VOUT
    }

    /// Whether the key carried by this input hashes to `pubkey_hash`
    pub fn uses_key(&self, pubkey_hash: &PubKeyHash) -> bool {
        hash160(&self.pubkey) == *pubkey_hash
    }

    fn write_to(&self, buf: &mut Vec<u8>, with_signature: bool) {
        buf.extend_from_slice(self.prev_txid.as_bytes());
        buf.extend_from_slice(&self.vout.to_le_bytes());
        if with_signature {
            write_var(buf, &self.signature);
        } else {
            write_var(buf, &[]);
        }
        write_var(buf, &self.pubkey);
    }

    fn read_from(reader: &mut dyn Read) -> std::result::Result<Self, CodecError> {
        Ok(Self {
            prev_txid: read_hash(reader)?,
            vout: read_i64(reader)?,
            signature: read_var_bytes(reader)?,
            pubkey: read_var_bytes(reader)?,
        })
    }
}

/// Transaction output - an amount locked to one key hash
#[derive(Debug, Clone, PartialEq)]
pub struct TxOutput {
    pub value: f64,
    pub pubkey_hash: PubKeyHash,
}

impl TxOutput {
    pub fn new(value: f64, pubkey_hash: PubKeyHash) -> Self {
        Self { value, pubkey_hash }
    }

    pub fn is_locked_with(&self, pubkey_hash: &PubKeyHash) -> bool {
        self.pubkey_hash == *pubkey_hash
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.value.to_le_bytes());
        buf.extend_from_slice(&self.pubkey_hash);
    }

    fn read_from(reader: &mut dyn Read) -> std::result::Result<Self, CodecError> {
        Ok(Self {
            value: read_f64(reader)?,
            pubkey_hash: read_array(reader)?,
        })
    }
}

/// Transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// SHA256 of the content, fixed when the transaction is built
    pub id: Hash256,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub timestamp: u64,
}

impl Transaction {
    /// Create a transaction and compute its ID
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        let mut tx = Self {
            id: Hash256::zero(),
            inputs,
            outputs,
            timestamp: unix_now(),
        };
        tx.id = tx.hash();
        tx
    }

    /// Create a coinbase transaction paying `reward` to `to`
    pub fn coinbase(to: PubKeyHash, data: Vec<u8>, reward: f64) -> Self {
        Self::new(vec![TxInput::coinbase(data)], vec![TxOutput::new(reward, to)])
    }

    /// Exactly one input, with the empty txid and index -1
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_coinbase()
    }

    /// SHA256 of the serialized content with every signature left empty,
    /// so signing does not move the ID
    pub fn hash(&self) -> Hash256 {
        let mut buf = Vec::new();
        self.write_content(&mut buf, false);
        sha256(&buf)
    }

    /// Whether `id` still matches the content
    pub fn has_valid_id(&self) -> bool {
        self.id == self.hash()
    }

    /// Digest signed for input `input_index`.
    ///
    /// Every input's signature and pubkey are cleared, then the pubkey of
    /// `input_index` alone is set to the hash locking the output it spends.
    pub fn signable_message(&self, input_index: usize, referenced: &TxOutput) -> Hash256 {
        let inputs = self
            .inputs
            .iter()
            .enumerate()
            .map(|(i, input)| TxInput {
                prev_txid: input.prev_txid,
                vout: input.vout,
                signature: Vec::new(),
                pubkey: if i == input_index {
                    referenced.pubkey_hash.to_vec()
                } else {
                    Vec::new()
                },
            })
            .collect();

        Transaction {
            id: Hash256::zero(),
            inputs,
            outputs: self.outputs.clone(),
            timestamp: self.timestamp,
        }
        .hash()
    }

    /// Calculate total output value
    pub fn total_output_value(&self) -> f64 {
        self.outputs.iter().map(|out| out.value).sum()
    }

    fn write_content(&self, buf: &mut Vec<u8>, with_signatures: bool) {
        buf.extend_from_slice(&self.timestamp.to_le_bytes());

        write_count(buf, self.inputs.len());
        for input in &self.inputs {
            input.write_to(buf, with_signatures);
        }

        write_count(buf, self.outputs.len());
        for output in &self.outputs {
            output.write_to(buf);
        }
    }

    /// Deserialize from a reader positioned at the start of a transaction
    pub fn from_reader(reader: &mut dyn Read) -> std::result::Result<Self, CodecError> {
        let id = read_hash(reader)?;
        let timestamp = read_u64(reader)?;

        let input_count = read_varint(reader)?;
        let mut inputs = Vec::new();
        for _ in 0..input_count {
            inputs.push(TxInput::read_from(reader)?);
        }

        let output_count = read_varint(reader)?;
        let mut outputs = Vec::new();
        for _ in 0..output_count {
            outputs.push(TxOutput::read_from(reader)?);
        }

        Ok(Self {
            id,
            inputs,
            outputs,
            timestamp,
        })
    }

    pub(crate) fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.id.as_bytes());
        self.write_content(buf, true);
    }
}

impl Serializable for Transaction {
    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_to(&mut buf);
        buf
    }

    fn deserialize(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let tx = Self::from_reader(&mut cursor)?;

        if cursor.position() != data.len() as u64 {
            return Err(LedgerError::Serialization(format!(
                "{} trailing bytes after transaction {}",
                data.len() as u64 - cursor.position(),
                tx.id
            )));
        }
        Ok(tx)
    }
}

// Writes into a Vec cannot fail
fn write_var(buf: &mut Vec<u8>, data: &[u8]) {
    let _ = write_var_bytes(buf, data);
}

fn write_count(buf: &mut Vec<u8>, count: usize) {
    let _ = write_varint(buf, count as u64);
}

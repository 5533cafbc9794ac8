// Binary codec for persisted ledger records

use crate::core::Hash256;
use crate::error::{LedgerError, Result};
use std::io::{self, Read, Write};

/// Types stored as opaque records in the block store
pub trait Serializable: Sized {
    fn serialize(&self) -> Vec<u8>;
    fn deserialize(data: &[u8]) -> Result<Self>;
}

/// Decode failure; always surfaces as `LedgerError::Serialization`
#[derive(Debug)]
pub struct CodecError(pub String);

impl From<io::Error> for CodecError {
    fn from(e: io::Error) -> Self {
        CodecError(e.to_string())
    }
}

impl From<CodecError> for LedgerError {
    fn from(e: CodecError) -> Self {
        LedgerError::Serialization(e.0)
    }
}

/// Write a variable-length integer (VarInt)
pub fn write_varint<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    match value {
        0..=0xfc => writer.write_all(&[value as u8]),
        0xfd..=0xffff => {
            writer.write_all(&[0xfd])?;
            writer.write_all(&(value as u16).to_le_bytes())
        }
        0x10000..=0xffff_ffff => {
            writer.write_all(&[0xfe])?;
            writer.write_all(&(value as u32).to_le_bytes())
        }
        _ => {
            writer.write_all(&[0xff])?;
            writer.write_all(&value.to_le_bytes())
        }
    }
}

/// Read a variable-length integer (VarInt)
pub fn read_varint<R: Read + ?Sized>(reader: &mut R) -> std::result::Result<u64, CodecError> {
    let mut first_byte = [0u8; 1];
    reader.read_exact(&mut first_byte)?;

    let value = match first_byte[0] {
        0..=0xfc => first_byte[0] as u64,
        0xfd => u16::from_le_bytes(read_array(reader)?) as u64,
        0xfe => u32::from_le_bytes(read_array(reader)?) as u64,
        0xff => u64::from_le_bytes(read_array(reader)?),
    };
    Ok(value)
}

/// Write bytes with length prefix (VarInt length + data)
pub fn write_var_bytes<W: Write>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    write_varint(writer, data.len() as u64)?;
    writer.write_all(data)
}

/// Read bytes with length prefix
pub fn read_var_bytes<R: Read + ?Sized>(reader: &mut R) -> std::result::Result<Vec<u8>, CodecError> {
    let len = read_varint(reader)?;
    // Refuse lengths that cannot be backed by the remaining record
    let mut data = Vec::new();
    reader.take(len).read_to_end(&mut data)?;
    if data.len() as u64 != len {
        return Err(CodecError(format!(
            "Truncated field: expected {} bytes, got {}",
            len,
            data.len()
        )));
    }
    Ok(data)
}

pub fn read_array<const N: usize, R: Read + ?Sized>(
    reader: &mut R,
) -> std::result::Result<[u8; N], CodecError> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn read_u64<R: Read + ?Sized>(reader: &mut R) -> std::result::Result<u64, CodecError> {
    Ok(u64::from_le_bytes(read_array(reader)?))
}

pub fn read_i64<R: Read + ?Sized>(reader: &mut R) -> std::result::Result<i64, CodecError> {
    Ok(i64::from_le_bytes(read_array(reader)?))
}

pub fn read_f64<R: Read + ?Sized>(reader: &mut R) -> std::result::Result<f64, CodecError> {
    Ok(f64::from_le_bytes(read_array(reader)?))
}

pub fn read_hash<R: Read + ?Sized>(reader: &mut R) -> std::result::Result<Hash256, CodecError> {
    Ok(Hash256::new(read_array(reader)?))
}

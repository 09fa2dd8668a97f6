//! Binary stream reader/writer used for consensus wire encoding
//!
//! Integers are little-endian unless a `_be` method is used. Variable-length
//! byte strings carry a compact-size length prefix.

use crate::error::{ConsensusError, Result};
use crate::factory::ConsensusFactory;
use crate::uint::UInt256;

/// Objects that write themselves to a [`StreamWriter`]
pub trait Serializable {
    fn serialize(&self, writer: &mut StreamWriter);

    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = StreamWriter::new();
        self.serialize(&mut writer);
        writer.into_inner()
    }
}

/// Objects read back from a [`StreamReader`].
///
/// The factory decides which concrete variant (plain or proof-of-stake) the
/// stream holds.
pub trait Deserializable: Sized {
    fn deserialize(reader: &mut StreamReader<'_>, factory: &dyn ConsensusFactory) -> Result<Self>;

    fn from_bytes(bytes: &[u8], factory: &dyn ConsensusFactory) -> Result<Self> {
        let mut reader = StreamReader::new(bytes);
        let value = Self::deserialize(&mut reader, factory)?;
        if !reader.is_empty() {
            return Err(ConsensusError::Serialization(format!(
                "{} trailing bytes after object",
                reader.remaining()
            )));
        }
        Ok(value)
    }
}

#[derive(Debug, Default, Clone)]
pub struct StreamWriter {
    buf: Vec<u8>,
}

impl StreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        StreamWriter { buf: Vec::with_capacity(capacity) }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32_be(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_uint256(&mut self, value: &UInt256) {
        self.buf.extend_from_slice(&value.to_bytes(true));
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bitcoin CompactSize: 1, 3, 5 or 9 bytes
    pub fn write_compact_size(&mut self, value: u64) {
        match value {
            0..=0xfc => self.write_u8(value as u8),
            0xfd..=0xffff => {
                self.write_u8(0xfd);
                self.write_u16(value as u16);
            }
            0x1_0000..=0xffff_ffff => {
                self.write_u8(0xfe);
                self.write_u32(value as u32);
            }
            _ => {
                self.write_u8(0xff);
                self.write_u64(value);
            }
        }
    }

    pub fn write_var_bytes(&mut self, bytes: &[u8]) {
        self.write_compact_size(bytes.len() as u64);
        self.write_bytes(bytes);
    }

    pub fn write<T: Serializable + ?Sized>(&mut self, value: &T) {
        value.serialize(self);
    }

    pub fn write_vec<T: Serializable>(&mut self, items: &[T]) {
        self.write_compact_size(items.len() as u64);
        for item in items {
            item.serialize(self);
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Bounds-checked cursor over a byte slice
#[derive(Debug, Clone)]
pub struct StreamReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> StreamReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        StreamReader { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(ConsensusError::Serialization(format!(
                "unexpected end of stream: need {} bytes at offset {}, have {}",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_uint256(&mut self) -> Result<UInt256> {
        UInt256::from_bytes(self.read_bytes(32)?, true)
    }

    /// Rejects non-canonical encodings (a value that fits a shorter form).
    pub fn read_compact_size(&mut self) -> Result<u64> {
        let first = self.read_u8()?;
        let (value, min) = match first {
            0xfd => (self.read_u16()? as u64, 0xfd),
            0xfe => (self.read_u32()? as u64, 0x1_0000),
            0xff => (self.read_u64()?, 0x1_0000_0000),
            n => return Ok(n as u64),
        };
        if value < min {
            return Err(ConsensusError::Serialization(format!(
                "non-canonical compact size {}",
                value
            )));
        }
        Ok(value)
    }

    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_length()?;
        Ok(self.read_bytes(len)?.to_vec())
    }

    /// Compact-size length that must fit in the rest of the stream.
    pub fn read_length(&mut self) -> Result<usize> {
        let len = self.read_compact_size()?;
        if len > self.remaining() as u64 {
            return Err(ConsensusError::Serialization(format!(
                "declared length {} exceeds remaining {} bytes",
                len,
                self.remaining()
            )));
        }
        Ok(len as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_size_boundaries() {
        let cases: [(u64, &str); 6] = [
            (0, "00"),
            (0xfc, "fc"),
            (0xfd, "fdfd00"),
            (0xffff, "fdffff"),
            (0x10000, "fe00000100"),
            (0x1_0000_0000, "ff0000000001000000"),
        ];
        for (value, expected) in cases {
            let mut w = StreamWriter::new();
            w.write_compact_size(value);
            assert_eq!(hex::encode(w.as_slice()), expected);
            let bytes = w.into_inner();
            let mut r = StreamReader::new(&bytes);
            assert_eq!(r.read_compact_size().unwrap(), value);
            assert!(r.is_empty());
        }
    }

    #[test]
    fn test_non_canonical_compact_size_rejected() {
        let bytes = hex::decode("fd0500").unwrap();
        let mut r = StreamReader::new(&bytes);
        assert!(matches!(r.read_compact_size(), Err(ConsensusError::Serialization(_))));
    }

    #[test]
    fn test_truncated_reads_fail() {
        let mut r = StreamReader::new(&[1, 2, 3]);
        assert!(r.read_u32().is_err());
        let mut r = StreamReader::new(&[0x05, 1, 2]);
        assert!(r.read_var_bytes().is_err());
    }

    #[test]
    fn test_endianness() {
        let mut w = StreamWriter::new();
        w.write_u32(0x01020304);
        w.write_u32_be(0x01020304);
        assert_eq!(w.as_slice(), &[4, 3, 2, 1, 1, 2, 3, 4]);
        let bytes = w.into_inner();
        let mut r = StreamReader::new(&bytes);
        assert_eq!(r.read_u32().unwrap(), 0x01020304);
        assert_eq!(r.read_u32_be().unwrap(), 0x01020304);
    }
}

//! Script parsing, templates and numeric encoding

use crate::interpreter::ScriptError;
use crate::opcodes::*;
use crate::types::ByteString;
use crate::uint::UInt160;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// One parsed script element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction<'a> {
    pub opcode: u8,
    /// Pushed bytes for OP_0 and the push opcodes, `None` for everything else
    pub push: Option<&'a [u8]>,
    /// Offset of the opcode byte
    pub offset: usize,
}

impl Instruction<'_> {
    pub fn is_push(&self) -> bool {
        self.opcode <= MAX_PUSH_OPCODE
    }
}

/// Iterator over the instructions of a script. A truncated push yields
/// `BadOpCode` once and then ends.
#[derive(Debug, Clone)]
pub struct ScriptReader<'a> {
    script: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> ScriptReader<'a> {
    pub fn new(script: &'a [u8]) -> Self {
        ScriptReader { script, pos: 0, failed: false }
    }

    /// Offset just past the last instruction returned
    pub fn position(&self) -> usize {
        self.pos
    }

    fn read_len(&mut self, width: usize) -> Option<usize> {
        let bytes = self.script.get(self.pos..self.pos + width)?;
        self.pos += width;
        let mut len = 0usize;
        for (i, byte) in bytes.iter().enumerate() {
            len |= (*byte as usize) << (8 * i);
        }
        Some(len)
    }

    fn read_instruction(&mut self) -> Option<Instruction<'a>> {
        let offset = self.pos;
        let opcode = *self.script.get(self.pos)?;
        self.pos += 1;

        let len = match opcode {
            0x00..=0x4b => opcode as usize,
            OP_PUSHDATA1 => self.read_len(1)?,
            OP_PUSHDATA2 => self.read_len(2)?,
            OP_PUSHDATA4 => self.read_len(4)?,
            _ => return Some(Instruction { opcode, push: None, offset }),
        };
        let end = self.pos.checked_add(len)?;
        let data = self.script.get(self.pos..end)?;
        self.pos = end;
        Some(Instruction { opcode, push: Some(data), offset })
    }
}

impl<'a> Iterator for ScriptReader<'a> {
    type Item = Result<Instruction<'a>, ScriptError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.script.len() {
            return None;
        }
        match self.read_instruction() {
            Some(instruction) => Some(Ok(instruction)),
            None => {
                self.failed = true;
                self.pos = self.script.len();
                Some(Err(ScriptError::BadOpCode))
            }
        }
    }
}

/// Only push opcodes (OP_0..OP_16) and every push well formed
pub fn is_push_only(script: &[u8]) -> bool {
    ScriptReader::new(script).all(|ins| matches!(ins, Ok(ins) if ins.is_push()))
}

/// `OP_HASH160 <20 bytes> OP_EQUAL`
pub fn is_p2sh(script: &[u8]) -> bool {
    script.len() == 23 && script[0] == OP_HASH160 && script[1] == 0x14 && script[22] == OP_EQUAL
}

/// A version byte (OP_0 or OP_1..OP_16) followed by one direct push of 2..=40 bytes
pub fn witness_program(script: &[u8]) -> Option<(u8, &[u8])> {
    if script.len() < 4 || script.len() > 42 {
        return None;
    }
    let version = match script[0] {
        OP_0 => 0,
        op @ OP_1..=OP_16 => op - OP_1 + 1,
        _ => return None,
    };
    if script[1] as usize + 2 == script.len() {
        Some((version, &script[2..]))
    } else {
        None
    }
}

/// Remove every occurrence of `pattern` that starts on an instruction boundary.
/// Returns the new script and the number of occurrences removed.
pub fn find_and_delete(script: &[u8], pattern: &[u8]) -> (ByteString, usize) {
    if pattern.is_empty() {
        return (script.to_vec(), 0);
    }

    let mut result = Vec::with_capacity(script.len());
    let mut found = 0usize;
    let mut reader = ScriptReader::new(script);
    let mut pc = 0usize;
    let mut kept_from = 0usize;
    loop {
        result.extend_from_slice(&script[kept_from..pc]);
        while script.len() - pc >= pattern.len() && &script[pc..pc + pattern.len()] == pattern {
            pc += pattern.len();
            found += 1;
        }
        kept_from = pc;

        reader.pos = pc;
        match reader.read_instruction() {
            Some(_) => pc = reader.pos,
            None => break,
        }
    }

    if found == 0 {
        return (script.to_vec(), 0);
    }
    result.extend_from_slice(&script[kept_from..]);
    (result, found)
}

/// Strip every OP_CODESEPARATOR (used by the legacy signature hash)
pub fn remove_code_separators(script: &[u8]) -> ByteString {
    let mut result = Vec::with_capacity(script.len());
    let mut reader = ScriptReader::new(script);
    let mut last = 0usize;
    while let Some(Ok(ins)) = reader.next() {
        if ins.opcode != OP_CODESEPARATOR {
            result.extend_from_slice(&script[ins.offset..reader.position()]);
        }
        last = reader.position();
    }
    result.extend_from_slice(&script[last..]);
    result
}

/// Human readable disassembly
pub fn to_asm(script: &[u8]) -> String {
    let mut out = String::new();
    for ins in ScriptReader::new(script) {
        if !out.is_empty() {
            out.push(' ');
        }
        match ins {
            Ok(Instruction { push: Some(data), opcode, .. }) if opcode != OP_0 => {
                out.push_str(&hex::encode(data));
            }
            Ok(Instruction { opcode, .. }) => match opcode_name(opcode) {
                Some(name) => out.push_str(name),
                None => {
                    let _ = write!(out, "OP_UNKNOWN<0x{:02x}>", opcode);
                }
            },
            Err(_) => out.push_str("[error]"),
        }
    }
    out
}

/// Incremental script construction with minimal push encodings
#[derive(Debug, Default, Clone)]
pub struct ScriptBuilder {
    bytes: ByteString,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_opcode(mut self, opcode: u8) -> Self {
        self.bytes.push(opcode);
        self
    }

    /// Length-prefixed push (never rewritten to OP_N)
    pub fn push_data(mut self, data: &[u8]) -> Self {
        let len = data.len();
        if len < OP_PUSHDATA1 as usize {
            self.bytes.push(len as u8);
        } else if len <= 0xff {
            self.bytes.push(OP_PUSHDATA1);
            self.bytes.push(len as u8);
        } else if len <= 0xffff {
            self.bytes.push(OP_PUSHDATA2);
            self.bytes.extend_from_slice(&(len as u16).to_le_bytes());
        } else {
            self.bytes.push(OP_PUSHDATA4);
            self.bytes.extend_from_slice(&(len as u32).to_le_bytes());
        }
        self.bytes.extend_from_slice(data);
        self
    }

    /// Small integers use OP_0/OP_1NEGATE/OP_1..OP_16, others a ScriptNum push
    pub fn push_int(self, value: i64) -> Self {
        match value {
            -1 => self.push_opcode(OP_1NEGATE),
            0..=16 => self.push_opcode(encode_small_int(value as u8)),
            _ => self.push_data(&ScriptNum::new(value).encode()),
        }
    }

    pub fn into_bytes(self) -> ByteString {
        self.bytes
    }
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(data).into()
}

/// RIPEMD160(SHA256(x))
pub fn hash160(data: &[u8]) -> UInt160 {
    UInt160::from_bytes(&ripemd160(&sha256(data)), true).unwrap_or_default()
}

/// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
pub fn p2pkh_script(key_hash: &UInt160) -> ByteString {
    ScriptBuilder::new()
        .push_opcode(OP_DUP)
        .push_opcode(OP_HASH160)
        .push_data(&key_hash.to_bytes(true))
        .push_opcode(OP_EQUALVERIFY)
        .push_opcode(OP_CHECKSIG)
        .into_bytes()
}

pub fn p2sh_script(script_hash: &UInt160) -> ByteString {
    ScriptBuilder::new()
        .push_opcode(OP_HASH160)
        .push_data(&script_hash.to_bytes(true))
        .push_opcode(OP_EQUAL)
        .into_bytes()
}

pub fn p2wpkh_script(key_hash: &UInt160) -> ByteString {
    ScriptBuilder::new().push_opcode(OP_0).push_data(&key_hash.to_bytes(true)).into_bytes()
}

pub fn p2wsh_script(witness_script: &[u8]) -> ByteString {
    ScriptBuilder::new().push_opcode(OP_0).push_data(&sha256(witness_script)).into_bytes()
}

/// Numeric stack value: little-endian sign-magnitude, sign in the top bit of the last byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScriptNum(i64);

impl ScriptNum {
    pub fn new(value: i64) -> Self {
        ScriptNum(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Clamp to i32 the way OP_PICK and friends read their argument
    pub fn get_int(&self) -> i32 {
        self.0.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    /// Decode at most `max_size` bytes; under `require_minimal` reject
    /// encodings with an unnecessary trailing zero byte.
    pub fn decode(bytes: &[u8], require_minimal: bool, max_size: usize) -> Result<Self, ScriptNumError> {
        if bytes.len() > max_size {
            return Err(ScriptNumError::Overflow(bytes.len()));
        }
        if require_minimal && !Self::is_minimally_encoded(bytes) {
            return Err(ScriptNumError::NonMinimal);
        }
        if bytes.is_empty() {
            return Ok(ScriptNum(0));
        }

        let mut result: i64 = 0;
        for (i, byte) in bytes.iter().enumerate() {
            result |= (*byte as i64) << (8 * i);
        }
        let last = bytes[bytes.len() - 1];
        if last & 0x80 != 0 {
            let mask = !(0x80i64 << (8 * (bytes.len() - 1)));
            Ok(ScriptNum(-(result & mask)))
        } else {
            Ok(ScriptNum(result))
        }
    }

    pub fn is_minimally_encoded(bytes: &[u8]) -> bool {
        match bytes.last() {
            None => true,
            // The last byte may only be 0x00/0x80 if the one before needs its top bit
            Some(last) if last & 0x7f == 0 => bytes.len() > 1 && bytes[bytes.len() - 2] & 0x80 != 0,
            Some(_) => true,
        }
    }

    pub fn encode(&self) -> ByteString {
        let value = self.0;
        if value == 0 {
            return Vec::new();
        }
        let negative = value < 0;
        let mut magnitude = value.unsigned_abs();
        let mut result = Vec::with_capacity(9);
        while magnitude > 0 {
            result.push((magnitude & 0xff) as u8);
            magnitude >>= 8;
        }
        let last = result.len() - 1;
        if result[last] & 0x80 != 0 {
            result.push(if negative { 0x80 } else { 0x00 });
        } else if negative {
            result[last] |= 0x80;
        }
        result
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptNumError {
    #[error("script number overflow: {0} bytes")]
    Overflow(usize),
    #[error("non-minimally encoded script number")]
    NonMinimal,
}

/// Truthiness of a stack element: any non-zero byte, except a lone sign bit (negative zero)
pub fn cast_to_bool(bytes: &[u8]) -> bool {
    for (i, byte) in bytes.iter().enumerate() {
        if *byte != 0 {
            return !(i == bytes.len() - 1 && *byte == 0x80);
        }
    }
    false
}

/// Whether a push uses the shortest encoding available for its data
pub fn is_minimal_push(opcode: u8, data: &[u8]) -> bool {
    match data.len() {
        0 => opcode == OP_0,
        1 if (1..=16).contains(&data[0]) => false,
        1 if data[0] == 0x81 => false,
        len if len <= 75 => opcode as usize == len,
        len if len <= 255 => opcode == OP_PUSHDATA1,
        len if len <= 65535 => opcode == OP_PUSHDATA2,
        _ => true,
    }
}

//! Script interpreter
//!
//! [`ScriptEvaluationContext`] runs a scriptSig / scriptPubKey pair (plus P2SH
//! redeem scripts and witness v0 programs) and reports the outcome as a
//! boolean together with a [`ScriptError`] code. Consensus failures never
//! surface as `Err` or panics to the caller.

use crate::checker::SignatureChecker;
use crate::constants::{
    LOCKTIME_NUM_MAX_SIZE, MAX_PUBKEYS_PER_MULTISIG, MAX_SCRIPT_ELEMENT_SIZE, MAX_SCRIPT_OPS, MAX_SCRIPT_SIZE,
    MAX_STACK_SIZE, SCRIPT_NUM_MAX_SIZE, SEQUENCE_LOCKTIME_DISABLE_FLAG,
};
use crate::opcodes::*;
use crate::script::{
    cast_to_bool, find_and_delete, hash160, is_minimal_push, is_p2sh, is_push_only, p2pkh_script, ripemd160,
    sha256, witness_program, ScriptBuilder, ScriptNum, ScriptNumError, ScriptReader,
};
use crate::sighash::{HashVersion, SigHash};
use crate::stack::{ContextStack, StackError};
use crate::types::{double_sha256, ByteString};
use crate::uint::UInt160;
use bitcoin_hashes::{sha1, Hash as BitcoinHash};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::ops::{BitOr, BitOrAssign};
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tracing::{debug, trace};

/// Script verification flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptVerify(u32);

impl ScriptVerify {
    pub const NONE: ScriptVerify = ScriptVerify(0);
    /// Evaluate P2SH subscripts (BIP16)
    pub const P2SH: ScriptVerify = ScriptVerify(1 << 0);
    /// Strict signature hash type and pubkey encoding
    pub const STRICTENC: ScriptVerify = ScriptVerify(1 << 1);
    /// Strict DER signatures (BIP66)
    pub const DERSIG: ScriptVerify = ScriptVerify(1 << 2);
    /// Signatures must use the low S value
    pub const LOW_S: ScriptVerify = ScriptVerify(1 << 3);
    /// The extra OP_CHECKMULTISIG stack element must be empty (BIP147)
    pub const NULLDUMMY: ScriptVerify = ScriptVerify(1 << 4);
    /// scriptSig may only push data
    pub const SIGPUSHONLY: ScriptVerify = ScriptVerify(1 << 5);
    /// Pushes and numbers must be minimally encoded
    pub const MINIMALDATA: ScriptVerify = ScriptVerify(1 << 6);
    pub const DISCOURAGE_UPGRADABLE_NOPS: ScriptVerify = ScriptVerify(1 << 7);
    /// Exactly one element left after evaluation. Needs P2SH and WITNESS.
    pub const CLEANSTACK: ScriptVerify = ScriptVerify(1 << 8);
    /// BIP65
    pub const CHECKLOCKTIMEVERIFY: ScriptVerify = ScriptVerify(1 << 9);
    /// BIP112
    pub const CHECKSEQUENCEVERIFY: ScriptVerify = ScriptVerify(1 << 10);
    /// Segregated witness (BIP141)
    pub const WITNESS: ScriptVerify = ScriptVerify(1 << 11);
    pub const DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM: ScriptVerify = ScriptVerify(1 << 12);
    /// OP_IF/OP_NOTIF arguments in witness scripts must be empty or exactly 0x01
    pub const MINIMALIF: ScriptVerify = ScriptVerify(1 << 13);
    /// Failed signature checks must use an empty signature
    pub const NULLFAIL: ScriptVerify = ScriptVerify(1 << 14);
    /// Witness v0 scripts may only use compressed pubkeys
    pub const WITNESS_PUBKEYTYPE: ScriptVerify = ScriptVerify(1 << 15);
    /// Enforce OP_CHECKCOLDSTAKEVERIFY instead of treating it as OP_NOP10
    pub const CHECKCOLDSTAKEVERIFY: ScriptVerify = ScriptVerify(1 << 16);

    /// Flags every block must satisfy
    pub const MANDATORY: ScriptVerify = ScriptVerify::P2SH;

    /// Flags relay policy applies on top of the mandatory ones
    pub const STANDARD: ScriptVerify = ScriptVerify(
        ScriptVerify::MANDATORY.0
            | ScriptVerify::DERSIG.0
            | ScriptVerify::STRICTENC.0
            | ScriptVerify::MINIMALDATA.0
            | ScriptVerify::NULLDUMMY.0
            | ScriptVerify::DISCOURAGE_UPGRADABLE_NOPS.0
            | ScriptVerify::CLEANSTACK.0
            | ScriptVerify::MINIMALIF.0
            | ScriptVerify::NULLFAIL.0
            | ScriptVerify::CHECKLOCKTIMEVERIFY.0
            | ScriptVerify::CHECKSEQUENCEVERIFY.0
            | ScriptVerify::LOW_S.0
            | ScriptVerify::WITNESS.0
            | ScriptVerify::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM.0
            | ScriptVerify::WITNESS_PUBKEYTYPE.0,
    );

    pub const fn from_bits(bits: u32) -> Self {
        ScriptVerify(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: ScriptVerify) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn remove(&mut self, other: ScriptVerify) {
        self.0 &= !other.0;
    }
}

impl BitOr for ScriptVerify {
    type Output = ScriptVerify;

    fn bitor(self, rhs: ScriptVerify) -> ScriptVerify {
        ScriptVerify(self.0 | rhs.0)
    }
}

impl BitOrAssign for ScriptVerify {
    fn bitor_assign(&mut self, rhs: ScriptVerify) {
        self.0 |= rhs.0;
    }
}

/// Outcome codes of script verification
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptError {
    #[error("No error")]
    Ok,
    #[error("unknown error")]
    UnknownError,
    #[error("Script evaluated without error but finished with a false/empty top stack element")]
    EvalFalse,
    #[error("OP_RETURN was encountered")]
    OpReturn,

    // Size limits
    #[error("Script is too big")]
    ScriptSize,
    #[error("Push value size limit exceeded")]
    PushSize,
    #[error("Operation limit exceeded")]
    OpCount,
    #[error("Stack size limit exceeded")]
    StackSize,
    #[error("Signature count negative or greater than pubkey count")]
    SigCount,
    #[error("Pubkey count negative or limit exceeded")]
    PubkeyCount,

    // Failed verify operations
    #[error("Script failed an OP_VERIFY operation")]
    Verify,
    #[error("Script failed an OP_EQUALVERIFY operation")]
    EqualVerify,
    #[error("Script failed an OP_CHECKMULTISIGVERIFY operation")]
    CheckMultiSigVerify,
    #[error("Script failed an OP_CHECKSIGVERIFY operation")]
    CheckSigVerify,
    #[error("Script failed an OP_NUMEQUALVERIFY operation")]
    NumEqualVerify,

    // Logical and stack errors
    #[error("Opcode missing or not understood")]
    BadOpCode,
    #[error("Attempted to use a disabled opcode")]
    DisabledOpCode,
    #[error("Operation not valid with the current stack size")]
    InvalidStackOperation,
    #[error("Operation not valid with the current altstack size")]
    InvalidAltStackOperation,
    #[error("Invalid OP_IF construction")]
    UnbalancedConditional,

    // Lock times
    #[error("Negative locktime")]
    NegativeLockTime,
    #[error("Locktime requirement not satisfied")]
    UnsatisfiedLockTime,

    // Malleability
    #[error("Signature hash type missing or not understood")]
    SigHashType,
    #[error("Non-canonical DER signature")]
    SigDer,
    #[error("Data push larger than necessary")]
    MinimalData,
    #[error("Only non-push operators allowed in signatures")]
    SigPushOnly,
    #[error("Non-canonical signature: S value is unnecessarily high")]
    SigHighS,
    #[error("Dummy CHECKMULTISIG argument must be zero")]
    SigNullDummy,
    #[error("Public key is neither compressed or uncompressed")]
    PubKeyType,
    #[error("Extra items left on stack after execution")]
    CleanStack,
    #[error("OP_IF/NOTIF argument must be minimal")]
    MinimalIf,
    #[error("Signature must be zero for failed CHECK(MULTI)SIG operation")]
    NullFail,

    // Soft fork safeness
    #[error("NOPx reserved for soft-fork upgrades")]
    DiscourageUpgradableNops,
    #[error("Witness version reserved for soft-fork upgrades")]
    DiscourageUpgradableWitnessProgram,

    // Segregated witness
    #[error("Witness program has incorrect length")]
    WitnessProgramWrongLength,
    #[error("Witness program was passed an empty witness")]
    WitnessProgramEmpty,
    #[error("Witness program hash mismatch")]
    WitnessProgramMismatch,
    #[error("Witness requires empty scriptSig")]
    WitnessMalleated,
    #[error("Witness requires only-redeemscript scriptSig")]
    WitnessMalleatedP2SH,
    #[error("Witness provided for non-witness script")]
    WitnessUnexpected,
    #[error("Using non-compressed keys in segwit")]
    WitnessPubkeyType,

    #[error("OP_CHECKCOLDSTAKEVERIFY used outside a coinstake transaction")]
    CheckColdStakeVerify,
}

impl From<StackError> for ScriptError {
    fn from(_: StackError) -> Self {
        ScriptError::InvalidStackOperation
    }
}

impl From<ScriptNumError> for ScriptError {
    fn from(err: ScriptNumError) -> Self {
        trace!(%err, "script number rejected");
        ScriptError::UnknownError
    }
}

type Stack = ContextStack<ByteString>;
type EvalResult = Result<(), ScriptError>;

fn push_bool(stack: &mut Stack, value: bool) {
    stack.push(if value { vec![1] } else { Vec::new() });
}

/// Strict DER (BIP66) including the trailing hash type byte
pub fn is_valid_signature_encoding(sig: &[u8]) -> bool {
    // 0x30 [total-length] 0x02 [R-length] [R] 0x02 [S-length] [S] [sighash]
    if sig.len() < 9 || sig.len() > 73 {
        return false;
    }
    if sig[0] != 0x30 || sig[1] as usize != sig.len() - 3 {
        return false;
    }
    let len_r = sig[3] as usize;
    if 5 + len_r >= sig.len() {
        return false;
    }
    let len_s = sig[5 + len_r] as usize;
    if len_r + len_s + 7 != sig.len() {
        return false;
    }

    if sig[2] != 0x02 || len_r == 0 || sig[4] & 0x80 != 0 {
        return false;
    }
    if len_r > 1 && sig[4] == 0x00 && sig[5] & 0x80 == 0 {
        return false;
    }

    if sig[len_r + 4] != 0x02 || len_s == 0 || sig[len_r + 6] & 0x80 != 0 {
        return false;
    }
    !(len_s > 1 && sig[len_r + 6] == 0x00 && sig[len_r + 7] & 0x80 == 0)
}

fn is_low_der_signature(sig: &[u8]) -> bool {
    let der = &sig[..sig.len().saturating_sub(1)];
    match secp256k1::ecdsa::Signature::from_der_lax(der) {
        Ok(signature) => {
            let mut normalized = signature;
            normalized.normalize_s();
            normalized == signature
        }
        Err(_) => false,
    }
}

fn is_compressed_or_uncompressed_pubkey(pubkey: &[u8]) -> bool {
    match pubkey.first() {
        Some(0x04) => pubkey.len() == 65,
        Some(0x02) | Some(0x03) => pubkey.len() == 33,
        _ => false,
    }
}

fn is_compressed_pubkey(pubkey: &[u8]) -> bool {
    pubkey.len() == 33 && matches!(pubkey[0], 0x02 | 0x03)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Stateless half of the interpreter: flags plus the transaction checker
struct Evaluator<'c> {
    flags: ScriptVerify,
    checker: &'c dyn SignatureChecker,
}

impl Evaluator<'_> {
    fn has(&self, flag: ScriptVerify) -> bool {
        self.flags.contains(flag)
    }

    fn check_signature_encoding(&self, sig: &[u8]) -> EvalResult {
        // Empty signatures are a compact way to fail CHECK(MULTI)SIG
        if sig.is_empty() {
            return Ok(());
        }
        if (self.has(ScriptVerify::DERSIG) || self.has(ScriptVerify::LOW_S) || self.has(ScriptVerify::STRICTENC))
            && !is_valid_signature_encoding(sig)
        {
            return Err(ScriptError::SigDer);
        }
        if self.has(ScriptVerify::LOW_S) && !is_low_der_signature(sig) {
            return Err(ScriptError::SigHighS);
        }
        if self.has(ScriptVerify::STRICTENC) && !SigHash::from(sig[sig.len() - 1]).is_defined() {
            return Err(ScriptError::SigHashType);
        }
        Ok(())
    }

    fn check_pubkey_encoding(&self, pubkey: &[u8], version: HashVersion) -> EvalResult {
        if self.has(ScriptVerify::STRICTENC) && !is_compressed_or_uncompressed_pubkey(pubkey) {
            return Err(ScriptError::PubKeyType);
        }
        if self.has(ScriptVerify::WITNESS_PUBKEYTYPE)
            && version == HashVersion::WitnessV0
            && !is_compressed_pubkey(pubkey)
        {
            return Err(ScriptError::WitnessPubkeyType);
        }
        Ok(())
    }

    fn num(&self, bytes: &[u8], max_size: usize) -> Result<ScriptNum, ScriptError> {
        Ok(ScriptNum::decode(bytes, self.has(ScriptVerify::MINIMALDATA), max_size)?)
    }

    fn top_num(&self, stack: &Stack, index: isize) -> Result<ScriptNum, ScriptError> {
        self.num(stack.top(index)?, SCRIPT_NUM_MAX_SIZE)
    }

    fn eval(&self, stack: &mut Stack, script: &[u8], version: HashVersion) -> EvalResult {
        if script.len() > MAX_SCRIPT_SIZE {
            return Err(ScriptError::ScriptSize);
        }

        let mut reader = ScriptReader::new(script);
        let mut alt_stack: Stack = ContextStack::new();
        let mut exec: Vec<bool> = Vec::new();
        let mut op_count = 0usize;
        let mut code_start = 0usize;

        while let Some(instruction) = reader.next() {
            let instruction = instruction?;
            let opcode = instruction.opcode;
            let executing = !exec.contains(&false);

            let step = self.step(
                stack,
                &mut alt_stack,
                &mut exec,
                &mut op_count,
                &mut code_start,
                script,
                &reader,
                instruction.push,
                opcode,
                executing,
                version,
            );
            if let Err(err) = step {
                debug!(
                    error = ?err,
                    offset = instruction.offset,
                    opcode = opcode_name(opcode).unwrap_or("OP_PUSHBYTES"),
                    "script evaluation failed"
                );
                return Err(err);
            }

            if stack.count() + alt_stack.count() > MAX_STACK_SIZE {
                return Err(ScriptError::StackSize);
            }
        }

        if !exec.is_empty() {
            return Err(ScriptError::UnbalancedConditional);
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn step(
        &self,
        stack: &mut Stack,
        alt_stack: &mut Stack,
        exec: &mut Vec<bool>,
        op_count: &mut usize,
        code_start: &mut usize,
        script: &[u8],
        reader: &ScriptReader<'_>,
        push: Option<&[u8]>,
        opcode: u8,
        executing: bool,
        version: HashVersion,
    ) -> EvalResult {
        if let Some(data) = push {
            if data.len() > MAX_SCRIPT_ELEMENT_SIZE {
                return Err(ScriptError::PushSize);
            }
        }

        if opcode > OP_16 {
            *op_count += 1;
            if *op_count > MAX_SCRIPT_OPS {
                return Err(ScriptError::OpCount);
            }
        }

        // Disabled even in unexecuted branches
        if is_disabled(opcode) {
            return Err(ScriptError::DisabledOpCode);
        }

        if let Some(data) = push {
            if executing {
                if self.has(ScriptVerify::MINIMALDATA) && !is_minimal_push(opcode, data) {
                    return Err(ScriptError::MinimalData);
                }
                stack.push(data.to_vec());
            }
            return Ok(());
        }

        if !executing && !(OP_IF..=OP_ENDIF).contains(&opcode) {
            return Ok(());
        }

        match opcode {
            OP_1NEGATE | OP_1..=OP_16 => {
                let value = opcode as i64 - (OP_1 as i64 - 1);
                stack.push(ScriptNum::new(value).encode());
            }

            // Control
            OP_NOP => {}

            OP_CHECKLOCKTIMEVERIFY => {
                if !self.has(ScriptVerify::CHECKLOCKTIMEVERIFY) {
                    return self.upgradable_nop();
                }
                if stack.count() < 1 {
                    return Err(ScriptError::InvalidStackOperation);
                }
                // Five bytes so lock times past 2^31 stay representable
                let lock_time = self.num(stack.top(-1)?, LOCKTIME_NUM_MAX_SIZE)?;
                if lock_time.value() < 0 {
                    return Err(ScriptError::NegativeLockTime);
                }
                if !self.checker.check_lock_time(lock_time.value()) {
                    return Err(ScriptError::UnsatisfiedLockTime);
                }
            }

            OP_CHECKSEQUENCEVERIFY => {
                if !self.has(ScriptVerify::CHECKSEQUENCEVERIFY) {
                    return self.upgradable_nop();
                }
                if stack.count() < 1 {
                    return Err(ScriptError::InvalidStackOperation);
                }
                let sequence = self.num(stack.top(-1)?, LOCKTIME_NUM_MAX_SIZE)?;
                if sequence.value() < 0 {
                    return Err(ScriptError::NegativeLockTime);
                }
                if sequence.value() & SEQUENCE_LOCKTIME_DISABLE_FLAG as i64 != 0 {
                    return Ok(());
                }
                if !self.checker.check_sequence(sequence.value()) {
                    return Err(ScriptError::UnsatisfiedLockTime);
                }
            }

            OP_CHECKCOLDSTAKEVERIFY => {
                if !self.has(ScriptVerify::CHECKCOLDSTAKEVERIFY) {
                    return self.upgradable_nop();
                }
                match self.checker.transaction() {
                    Some(tx) if tx.is_coinstake() => tx.is_cold_coin_stake.set(),
                    _ => return Err(ScriptError::CheckColdStakeVerify),
                }
            }

            OP_NOP1 | OP_NOP4 | OP_NOP5 | OP_NOP6 | OP_NOP7 | OP_NOP8 | OP_NOP9 => {
                return self.upgradable_nop();
            }

            OP_IF | OP_NOTIF => {
                let mut value = false;
                if executing {
                    let top = stack.top(-1).map_err(|_| ScriptError::UnbalancedConditional)?;
                    if version == HashVersion::WitnessV0
                        && self.has(ScriptVerify::MINIMALIF)
                        && (top.len() > 1 || (top.len() == 1 && top[0] != 1))
                    {
                        return Err(ScriptError::MinimalIf);
                    }
                    value = cast_to_bool(top);
                    if opcode == OP_NOTIF {
                        value = !value;
                    }
                    stack.pop()?;
                }
                exec.push(value);
            }

            OP_ELSE => match exec.last_mut() {
                Some(branch) => *branch = !*branch,
                None => return Err(ScriptError::UnbalancedConditional),
            },

            OP_ENDIF => {
                exec.pop().ok_or(ScriptError::UnbalancedConditional)?;
            }

            OP_VERIFY => {
                if stack.count() < 1 {
                    return Err(ScriptError::InvalidStackOperation);
                }
                if !cast_to_bool(stack.top(-1)?) {
                    return Err(ScriptError::Verify);
                }
                stack.pop()?;
            }

            OP_RETURN => return Err(ScriptError::OpReturn),

            // Stack
            OP_TOALTSTACK => {
                if stack.count() < 1 {
                    return Err(ScriptError::InvalidStackOperation);
                }
                alt_stack.push(stack.pop()?);
            }

            OP_FROMALTSTACK => {
                let value = alt_stack.pop().map_err(|_| ScriptError::InvalidAltStackOperation)?;
                stack.push(value);
            }

            OP_2DROP => {
                self.require(stack, 2)?;
                stack.pop()?;
                stack.pop()?;
            }

            OP_2DUP => {
                self.require(stack, 2)?;
                let a = stack.top(-2)?.clone();
                let b = stack.top(-1)?.clone();
                stack.push(a);
                stack.push(b);
            }

            OP_3DUP => {
                self.require(stack, 3)?;
                let a = stack.top(-3)?.clone();
                let b = stack.top(-2)?.clone();
                let c = stack.top(-1)?.clone();
                stack.push(a);
                stack.push(b);
                stack.push(c);
            }

            OP_2OVER => {
                self.require(stack, 4)?;
                let a = stack.top(-4)?.clone();
                let b = stack.top(-3)?.clone();
                stack.push(a);
                stack.push(b);
            }

            OP_2ROT => {
                self.require(stack, 6)?;
                let a = stack.top(-6)?.clone();
                let b = stack.top(-5)?.clone();
                stack.remove_range(-6, -4)?;
                stack.push(a);
                stack.push(b);
            }

            OP_2SWAP => {
                self.require(stack, 4)?;
                stack.swap(-4, -2)?;
                stack.swap(-3, -1)?;
            }

            OP_IFDUP => {
                self.require(stack, 1)?;
                let top = stack.top(-1)?;
                if cast_to_bool(top) {
                    let copy = top.clone();
                    stack.push(copy);
                }
            }

            OP_DEPTH => {
                let depth = ScriptNum::new(stack.count() as i64).encode();
                stack.push(depth);
            }

            OP_DROP => {
                self.require(stack, 1)?;
                stack.pop()?;
            }

            OP_DUP => {
                self.require(stack, 1)?;
                let top = stack.top(-1)?.clone();
                stack.push(top);
            }

            OP_NIP => {
                self.require(stack, 2)?;
                stack.remove(-2)?;
            }

            OP_OVER => {
                self.require(stack, 2)?;
                let second = stack.top(-2)?.clone();
                stack.push(second);
            }

            OP_PICK | OP_ROLL => {
                self.require(stack, 2)?;
                let n = self.top_num(stack, -1)?.get_int();
                stack.pop()?;
                if n < 0 || n as usize >= stack.count() {
                    return Err(ScriptError::InvalidStackOperation);
                }
                let index = -(n as isize) - 1;
                let value = if opcode == OP_ROLL { stack.remove(index)? } else { stack.top(index)?.clone() };
                stack.push(value);
            }

            OP_ROT => {
                self.require(stack, 3)?;
                stack.swap(-3, -2)?;
                stack.swap(-2, -1)?;
            }

            OP_SWAP => {
                self.require(stack, 2)?;
                stack.swap(-2, -1)?;
            }

            OP_TUCK => {
                self.require(stack, 2)?;
                let top = stack.top(-1)?.clone();
                stack.insert(-3, top)?;
            }

            OP_SIZE => {
                self.require(stack, 1)?;
                let size = ScriptNum::new(stack.top(-1)?.len() as i64).encode();
                stack.push(size);
            }

            // Bitwise logic
            OP_EQUAL | OP_EQUALVERIFY => {
                self.require(stack, 2)?;
                let equal = stack.top(-2)? == stack.top(-1)?;
                stack.pop()?;
                stack.pop()?;
                push_bool(stack, equal);
                if opcode == OP_EQUALVERIFY {
                    if !equal {
                        return Err(ScriptError::EqualVerify);
                    }
                    stack.pop()?;
                }
            }

            // Numeric
            OP_1ADD | OP_1SUB | OP_NEGATE | OP_ABS | OP_NOT | OP_0NOTEQUAL => {
                self.require(stack, 1)?;
                let n = self.top_num(stack, -1)?.value();
                let result = match opcode {
                    OP_1ADD => n + 1,
                    OP_1SUB => n - 1,
                    OP_NEGATE => -n,
                    OP_ABS => n.abs(),
                    OP_NOT => (n == 0) as i64,
                    _ => (n != 0) as i64,
                };
                stack.pop()?;
                stack.push(ScriptNum::new(result).encode());
            }

            OP_ADD | OP_SUB | OP_BOOLAND | OP_BOOLOR | OP_NUMEQUAL | OP_NUMEQUALVERIFY | OP_NUMNOTEQUAL
            | OP_LESSTHAN | OP_GREATERTHAN | OP_LESSTHANOREQUAL | OP_GREATERTHANOREQUAL | OP_MIN | OP_MAX => {
                self.require(stack, 2)?;
                let a = self.top_num(stack, -2)?.value();
                let b = self.top_num(stack, -1)?.value();
                let result = match opcode {
                    OP_ADD => a + b,
                    OP_SUB => a - b,
                    OP_BOOLAND => (a != 0 && b != 0) as i64,
                    OP_BOOLOR => (a != 0 || b != 0) as i64,
                    OP_NUMEQUAL | OP_NUMEQUALVERIFY => (a == b) as i64,
                    OP_NUMNOTEQUAL => (a != b) as i64,
                    OP_LESSTHAN => (a < b) as i64,
                    OP_GREATERTHAN => (a > b) as i64,
                    OP_LESSTHANOREQUAL => (a <= b) as i64,
                    OP_GREATERTHANOREQUAL => (a >= b) as i64,
                    OP_MIN => a.min(b),
                    _ => a.max(b),
                };
                stack.pop()?;
                stack.pop()?;
                stack.push(ScriptNum::new(result).encode());

                if opcode == OP_NUMEQUALVERIFY {
                    if !cast_to_bool(stack.top(-1)?) {
                        return Err(ScriptError::NumEqualVerify);
                    }
                    stack.pop()?;
                }
            }

            OP_WITHIN => {
                self.require(stack, 3)?;
                let x = self.top_num(stack, -3)?;
                let min = self.top_num(stack, -2)?;
                let max = self.top_num(stack, -1)?;
                stack.remove_range(-3, 0)?;
                push_bool(stack, min <= x && x < max);
            }

            // Crypto
            OP_RIPEMD160 | OP_SHA1 | OP_SHA256 | OP_HASH160 | OP_HASH256 => {
                self.require(stack, 1)?;
                let data = stack.pop()?;
                let digest = match opcode {
                    OP_RIPEMD160 => ripemd160(&data).to_vec(),
                    OP_SHA1 => sha1::Hash::hash(&data).into_inner().to_vec(),
                    OP_SHA256 => sha256(&data).to_vec(),
                    OP_HASH160 => hash160(&data).to_bytes(true).to_vec(),
                    _ => double_sha256(&data).to_bytes(true).to_vec(),
                };
                stack.push(digest);
            }

            OP_CODESEPARATOR => {
                *code_start = reader.position();
            }

            OP_CHECKSIG | OP_CHECKSIGVERIFY => {
                self.require(stack, 2)?;
                let sig = stack.top(-2)?.clone();
                let pubkey = stack.top(-1)?.clone();

                let mut script_code = script[*code_start..].to_vec();
                if version == HashVersion::Original {
                    let pattern = ScriptBuilder::new().push_data(&sig).into_bytes();
                    script_code = find_and_delete(&script_code, &pattern).0;
                }

                self.check_signature_encoding(&sig)?;
                self.check_pubkey_encoding(&pubkey, version)?;
                let success = self.checker.check_sig(&sig, &pubkey, &script_code, version);
                if !success && self.has(ScriptVerify::NULLFAIL) && !sig.is_empty() {
                    return Err(ScriptError::NullFail);
                }

                stack.pop()?;
                stack.pop()?;
                push_bool(stack, success);
                if opcode == OP_CHECKSIGVERIFY {
                    if !success {
                        return Err(ScriptError::CheckSigVerify);
                    }
                    stack.pop()?;
                }
            }

            OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
                let success = self.check_multisig(stack, op_count, &script[*code_start..], version)?;
                push_bool(stack, success);
                if opcode == OP_CHECKMULTISIGVERIFY {
                    if !success {
                        return Err(ScriptError::CheckMultiSigVerify);
                    }
                    stack.pop()?;
                }
            }

            _ => return Err(ScriptError::BadOpCode),
        }
        Ok(())
    }

    fn require(&self, stack: &Stack, depth: usize) -> EvalResult {
        if stack.count() < depth {
            return Err(ScriptError::InvalidStackOperation);
        }
        Ok(())
    }

    fn upgradable_nop(&self) -> EvalResult {
        if self.has(ScriptVerify::DISCOURAGE_UPGRADABLE_NOPS) {
            return Err(ScriptError::DiscourageUpgradableNops);
        }
        Ok(())
    }

    /// Consumes keys, signatures and the dummy element; returns whether every
    /// signature matched a key in order.
    fn check_multisig(
        &self,
        stack: &mut Stack,
        op_count: &mut usize,
        script_code: &[u8],
        version: HashVersion,
    ) -> Result<bool, ScriptError> {
        let mut i: usize = 1;
        self.require(stack, i)?;

        let mut keys_count = self.top_num(stack, -(i as isize))?.get_int();
        if keys_count < 0 || keys_count as usize > MAX_PUBKEYS_PER_MULTISIG {
            return Err(ScriptError::PubkeyCount);
        }
        *op_count += keys_count as usize;
        if *op_count > MAX_SCRIPT_OPS {
            return Err(ScriptError::OpCount);
        }
        i += 1;
        let mut key_index = i;
        // Keys still to be popped under NULLFAIL bookkeeping
        let mut keys_left = keys_count as usize + 2;
        i += keys_count as usize;
        self.require(stack, i)?;

        let mut sigs_count = self.top_num(stack, -(i as isize))?.get_int();
        if sigs_count < 0 || sigs_count > keys_count {
            return Err(ScriptError::SigCount);
        }
        i += 1;
        let mut sig_index = i;
        i += sigs_count as usize;
        self.require(stack, i)?;

        let mut script_code = script_code.to_vec();
        if version == HashVersion::Original {
            for k in 0..sigs_count as usize {
                let sig = stack.top(-((sig_index + k) as isize))?;
                let pattern = ScriptBuilder::new().push_data(sig).into_bytes();
                script_code = find_and_delete(&script_code, &pattern).0;
            }
        }

        let mut success = true;
        while success && sigs_count > 0 {
            let sig = stack.top(-(sig_index as isize))?;
            let pubkey = stack.top(-(key_index as isize))?;

            self.check_signature_encoding(sig)?;
            self.check_pubkey_encoding(pubkey, version)?;
            if self.checker.check_sig(sig, pubkey, &script_code, version) {
                sig_index += 1;
                sigs_count -= 1;
            }
            key_index += 1;
            keys_count -= 1;

            // More signatures left than keys means some cannot match
            if sigs_count > keys_count {
                success = false;
            }
        }

        // Everything but the dummy
        while i > 1 {
            i -= 1;
            if !success && self.has(ScriptVerify::NULLFAIL) && keys_left == 0 && !stack.top(-1)?.is_empty() {
                return Err(ScriptError::NullFail);
            }
            keys_left = keys_left.saturating_sub(1);
            stack.pop()?;
        }

        // The extra element consumed by the historical off-by-one
        self.require(stack, 1)?;
        if self.has(ScriptVerify::NULLDUMMY) && !stack.top(-1)?.is_empty() {
            return Err(ScriptError::SigNullDummy);
        }
        stack.pop()?;
        Ok(success)
    }

    fn verify_witness_program(&self, witness: &[ByteString], version: u8, program: &[u8]) -> EvalResult {
        let (mut stack, script) = match (version, program.len()) {
            (0, 32) => {
                let (script, items) = witness.split_last().ok_or(ScriptError::WitnessProgramEmpty)?;
                if sha256(script)[..] != *program {
                    return Err(ScriptError::WitnessProgramMismatch);
                }
                (ContextStack::from(items.to_vec()), script.clone())
            }
            (0, 20) => {
                if witness.len() != 2 {
                    return Err(ScriptError::WitnessProgramMismatch);
                }
                let key_hash = UInt160::from_bytes(program, true).map_err(|_| ScriptError::WitnessProgramMismatch)?;
                (ContextStack::from(witness.to_vec()), p2pkh_script(&key_hash))
            }
            (0, _) => return Err(ScriptError::WitnessProgramWrongLength),
            _ => {
                if self.has(ScriptVerify::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM) {
                    return Err(ScriptError::DiscourageUpgradableWitnessProgram);
                }
                // Unknown versions stay anyone-can-spend for future soft forks
                return Ok(());
            }
        };

        if stack.iter().any(|item| item.len() > MAX_SCRIPT_ELEMENT_SIZE) {
            return Err(ScriptError::PushSize);
        }

        trace!(version, program_len = program.len(), "evaluating witness program");
        self.eval(&mut stack, &script, HashVersion::WitnessV0)?;

        // Witness scripts implicitly require a clean stack
        if stack.count() != 1 {
            return Err(ScriptError::EvalFalse);
        }
        if !cast_to_bool(stack.top(-1)?) {
            return Err(ScriptError::EvalFalse);
        }
        Ok(())
    }

    fn verify(
        &self,
        stack: &mut Stack,
        script_sig: &[u8],
        script_pubkey: &[u8],
        witness: &[ByteString],
    ) -> EvalResult {
        if self.has(ScriptVerify::SIGPUSHONLY) && !is_push_only(script_sig) {
            return Err(ScriptError::SigPushOnly);
        }

        let mut had_witness = false;
        self.eval(stack, script_sig, HashVersion::Original)?;
        let p2sh_stack = if self.has(ScriptVerify::P2SH) { Some(stack.clone()) } else { None };

        self.eval(stack, script_pubkey, HashVersion::Original)?;
        if stack.is_empty() || !cast_to_bool(stack.top(-1)?) {
            return Err(ScriptError::EvalFalse);
        }

        if self.has(ScriptVerify::WITNESS) {
            if let Some((version, program)) = witness_program(script_pubkey) {
                had_witness = true;
                if !script_sig.is_empty() {
                    return Err(ScriptError::WitnessMalleated);
                }
                self.verify_witness_program(witness, version, program)?;
                // The witness stack was checked on its own, keep cleanstack from firing
                *stack = ContextStack::from(vec![vec![1]]);
            }
        }

        if let Some(mut p2sh_stack) = p2sh_stack.filter(|_| is_p2sh(script_pubkey)) {
            if !is_push_only(script_sig) {
                return Err(ScriptError::SigPushOnly);
            }
            let redeem_script = p2sh_stack.pop().map_err(|_| ScriptError::EvalFalse)?;

            trace!(len = redeem_script.len(), "evaluating P2SH redeem script");
            self.eval(&mut p2sh_stack, &redeem_script, HashVersion::Original)?;
            if p2sh_stack.is_empty() || !cast_to_bool(p2sh_stack.top(-1)?) {
                return Err(ScriptError::EvalFalse);
            }

            if self.has(ScriptVerify::WITNESS) {
                if let Some((version, program)) = witness_program(&redeem_script) {
                    had_witness = true;
                    let expected = ScriptBuilder::new().push_data(&redeem_script).into_bytes();
                    if script_sig != expected.as_slice() {
                        return Err(ScriptError::WitnessMalleatedP2SH);
                    }
                    self.verify_witness_program(witness, version, program)?;
                    p2sh_stack = ContextStack::from(vec![vec![1]]);
                }
            }
            *stack = p2sh_stack;
        }

        if self.has(ScriptVerify::CLEANSTACK)
            && self.has(ScriptVerify::P2SH)
            && self.has(ScriptVerify::WITNESS)
            && stack.count() != 1
        {
            return Err(ScriptError::CleanStack);
        }

        if self.has(ScriptVerify::WITNESS) && !had_witness && !witness.is_empty() {
            return Err(ScriptError::WitnessUnexpected);
        }
        Ok(())
    }
}

/// One script evaluation: flags in, stack and error code out.
///
/// A context is cheap to clone; clones evaluate independently.
#[derive(Debug, Clone)]
pub struct ScriptEvaluationContext {
    flags: ScriptVerify,
    stack: ContextStack<ByteString>,
    error: ScriptError,
    unexpected_failure: Option<String>,
}

impl Default for ScriptEvaluationContext {
    fn default() -> Self {
        ScriptEvaluationContext::new(ScriptVerify::STANDARD)
    }
}

impl ScriptEvaluationContext {
    pub fn new(flags: ScriptVerify) -> Self {
        ScriptEvaluationContext {
            flags,
            stack: ContextStack::new(),
            error: ScriptError::Ok,
            unexpected_failure: None,
        }
    }

    pub fn flags(&self) -> ScriptVerify {
        self.flags
    }

    pub fn stack(&self) -> &ContextStack<ByteString> {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut ContextStack<ByteString> {
        &mut self.stack
    }

    /// Code of the last evaluation, `Ok` after success
    pub fn error(&self) -> ScriptError {
        self.error
    }

    /// Panic message captured when the last evaluation hit `UnknownError` unexpectedly
    pub fn unexpected_failure(&self) -> Option<&str> {
        self.unexpected_failure.as_deref()
    }

    /// Full input verification starting from an empty stack.
    pub fn verify_script(
        &mut self,
        script_sig: &[u8],
        script_pubkey: &[u8],
        witness: &[ByteString],
        checker: &dyn SignatureChecker,
    ) -> bool {
        self.stack.clear();
        self.run(checker, |evaluator, stack| evaluator.verify(stack, script_sig, script_pubkey, witness))
    }

    /// Run a single script against the current stack
    pub fn eval_script(&mut self, script: &[u8], checker: &dyn SignatureChecker, version: HashVersion) -> bool {
        self.run(checker, |evaluator, stack| evaluator.eval(stack, script, version))
    }

    fn run<F>(&mut self, checker: &dyn SignatureChecker, body: F) -> bool
    where
        F: FnOnce(&Evaluator<'_>, &mut Stack) -> EvalResult,
    {
        self.unexpected_failure = None;
        let evaluator = Evaluator { flags: self.flags, checker };
        let stack = &mut self.stack;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&evaluator, stack)));
        self.error = match outcome {
            Ok(Ok(())) => ScriptError::Ok,
            Ok(Err(err)) => err,
            Err(payload) => {
                let message = panic_message(payload);
                debug!(%message, "unexpected failure during script evaluation");
                self.unexpected_failure = Some(message);
                ScriptError::UnknownError
            }
        };
        self.error == ScriptError::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{BaseSignatureChecker, TransactionChecker};
    use crate::types::{OutPoint, Transaction, TransactionInput, TransactionOutput};
    use crate::uint::UInt256;

    fn run(script: &[u8], flags: ScriptVerify) -> (bool, ScriptError, Vec<ByteString>) {
        let mut ctx = ScriptEvaluationContext::new(flags);
        let ok = ctx.eval_script(script, &BaseSignatureChecker, HashVersion::Original);
        (ok, ctx.error(), ctx.stack().as_slice().to_vec())
    }

    fn eval(script: &[u8]) -> (bool, ScriptError, Vec<ByteString>) {
        run(script, ScriptVerify::NONE)
    }

    #[test]
    fn test_arithmetic() {
        let (ok, _, stack) = eval(&[OP_2, OP_3, OP_ADD, OP_5, OP_NUMEQUAL]);
        assert!(ok);
        assert_eq!(stack, vec![vec![1]]);

        let (_, _, stack) = eval(&[OP_1, OP_NEGATE, OP_ABS, OP_1SUB]);
        assert_eq!(stack, vec![Vec::<u8>::new()]);

        let (_, _, stack) = eval(&[OP_3, OP_2, OP_5, OP_WITHIN]);
        assert_eq!(stack, vec![vec![1]]);
        let (_, _, stack) = eval(&[OP_5, OP_2, OP_5, OP_WITHIN]);
        assert_eq!(stack, vec![Vec::<u8>::new()]);

        let (_, _, stack) = eval(&[OP_7, OP_4, OP_MIN, OP_9, OP_MAX]);
        assert_eq!(stack, vec![vec![9]]);
    }

    #[test]
    fn test_numeric_operand_limits() {
        // Five byte operands are too big for arithmetic
        let (ok, err, _) = eval(&[0x05, 1, 2, 3, 4, 5, OP_1ADD]);
        assert!(!ok);
        assert_eq!(err, ScriptError::UnknownError);

        // Non-minimal numbers are script number errors, non-minimal pushes are MinimalData
        let (ok, err, _) = run(&[0x02, 0x01, 0x00, OP_1ADD], ScriptVerify::MINIMALDATA);
        assert!(!ok);
        assert_eq!(err, ScriptError::UnknownError);
        let (ok, err, _) = run(&[0x01, 0x05], ScriptVerify::MINIMALDATA);
        assert!(!ok);
        assert_eq!(err, ScriptError::MinimalData);
    }

    #[test]
    fn test_conditionals() {
        let (ok, _, stack) = eval(&[OP_1, OP_IF, OP_2, OP_ELSE, OP_3, OP_ENDIF]);
        assert!(ok);
        assert_eq!(stack, vec![vec![2]]);

        let (_, _, stack) = eval(&[OP_0, OP_NOTIF, OP_2, OP_ELSE, OP_3, OP_ENDIF]);
        assert_eq!(stack, vec![vec![2]]);

        // Unexecuted branches skip everything except disabled opcodes
        let (ok, _, _) = eval(&[OP_0, OP_IF, OP_RETURN, OP_RESERVED, OP_ENDIF, OP_1]);
        assert!(ok);
        let (ok, err, _) = eval(&[OP_0, OP_IF, OP_CAT, OP_ENDIF, OP_1]);
        assert!(!ok);
        assert_eq!(err, ScriptError::DisabledOpCode);
        let (_, err, _) = eval(&[OP_0, OP_IF, OP_VERIF, OP_ENDIF]);
        assert_eq!(err, ScriptError::BadOpCode);

        assert_eq!(eval(&[OP_1, OP_IF]).1, ScriptError::UnbalancedConditional);
        assert_eq!(eval(&[OP_ENDIF]).1, ScriptError::UnbalancedConditional);
        assert_eq!(eval(&[OP_ELSE]).1, ScriptError::UnbalancedConditional);
        assert_eq!(eval(&[OP_IF, OP_ENDIF]).1, ScriptError::UnbalancedConditional);
    }

    #[test]
    fn test_stack_manipulation() {
        let (_, _, stack) = eval(&[OP_1, OP_2, OP_3, OP_ROT]);
        assert_eq!(stack, vec![vec![2], vec![3], vec![1]]);

        let (_, _, stack) = eval(&[OP_1, OP_2, OP_TUCK]);
        assert_eq!(stack, vec![vec![2], vec![1], vec![2]]);

        let (_, _, stack) = eval(&[OP_1, OP_2, OP_3, OP_4, OP_5, OP_6, OP_2ROT]);
        assert_eq!(stack, vec![vec![3], vec![4], vec![5], vec![6], vec![1], vec![2]]);

        let (_, _, stack) = eval(&[OP_1, OP_2, OP_3, OP_2, OP_PICK]);
        assert_eq!(stack, vec![vec![1], vec![2], vec![3], vec![1]]);

        let (_, _, stack) = eval(&[OP_1, OP_2, OP_3, OP_2, OP_ROLL]);
        assert_eq!(stack, vec![vec![2], vec![3], vec![1]]);

        let (_, _, stack) = eval(&[OP_1, OP_2, OP_3, OP_4, OP_2SWAP]);
        assert_eq!(stack, vec![vec![3], vec![4], vec![1], vec![2]]);

        let (_, _, stack) = eval(&[OP_0, OP_IFDUP, OP_1, OP_IFDUP, OP_DEPTH]);
        assert_eq!(stack, vec![vec![], vec![1], vec![1], vec![3]]);

        assert_eq!(eval(&[OP_1, OP_1, OP_PICK]).1, ScriptError::InvalidStackOperation);
        assert_eq!(eval(&[OP_DROP]).1, ScriptError::InvalidStackOperation);
        assert_eq!(eval(&[OP_1, OP_2ROT]).1, ScriptError::InvalidStackOperation);
        assert_eq!(eval(&[OP_FROMALTSTACK]).1, ScriptError::InvalidAltStackOperation);

        let (_, _, stack) = eval(&[OP_7, OP_TOALTSTACK, OP_1, OP_FROMALTSTACK]);
        assert_eq!(stack, vec![vec![1], vec![7]]);
    }

    #[test]
    fn test_hash_opcodes() {
        let (_, _, stack) = eval(&[OP_0, OP_SHA256]);
        assert_eq!(
            hex::encode(&stack[0]),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        let (_, _, stack) = eval(&[OP_0, OP_SHA1]);
        assert_eq!(hex::encode(&stack[0]), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        let (_, _, stack) = eval(&[OP_0, OP_RIPEMD160]);
        assert_eq!(hex::encode(&stack[0]), "9c1185a5c5e9fc54612808977ee8f548b2258d31");
        let (_, _, stack) = eval(&[OP_0, OP_HASH256]);
        assert_eq!(
            hex::encode(&stack[0]),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
        let (_, _, stack) = eval(&[OP_0, OP_HASH160]);
        assert_eq!(hex::encode(&stack[0]), "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb");
    }

    #[test]
    fn test_limits() {
        let (ok, err, _) = eval(&vec![OP_NOP; MAX_SCRIPT_OPS + 1]);
        assert!(!ok);
        assert_eq!(err, ScriptError::OpCount);
        assert!(eval(&vec![OP_NOP; MAX_SCRIPT_OPS]).0);

        assert_eq!(eval(&vec![OP_0; MAX_SCRIPT_SIZE + 1]).1, ScriptError::ScriptSize);

        let push = ScriptBuilder::new().push_data(&[0u8; MAX_SCRIPT_ELEMENT_SIZE + 1]).into_bytes();
        assert_eq!(eval(&push).1, ScriptError::PushSize);

        let mut deep = vec![OP_1; MAX_STACK_SIZE];
        deep.push(OP_DUP);
        assert_eq!(eval(&deep).1, ScriptError::StackSize);
    }

    #[test]
    fn test_verify_family() {
        assert_eq!(eval(&[OP_0, OP_VERIFY]).1, ScriptError::Verify);
        assert_eq!(eval(&[OP_1, OP_2, OP_EQUALVERIFY]).1, ScriptError::EqualVerify);
        assert_eq!(eval(&[OP_1, OP_2, OP_NUMEQUALVERIFY]).1, ScriptError::NumEqualVerify);
        assert_eq!(eval(&[OP_RETURN]).1, ScriptError::OpReturn);
        assert!(eval(&[OP_2, OP_2, OP_EQUALVERIFY]).0);
    }

    #[test]
    fn test_minimal_if_only_in_witness() {
        let script = [0x01, 0x02, OP_IF, OP_ENDIF];
        let mut ctx = ScriptEvaluationContext::new(ScriptVerify::MINIMALIF);
        assert!(ctx.eval_script(&script, &BaseSignatureChecker, HashVersion::Original));
        let mut ctx = ScriptEvaluationContext::new(ScriptVerify::MINIMALIF);
        assert!(!ctx.eval_script(&script, &BaseSignatureChecker, HashVersion::WitnessV0));
        assert_eq!(ctx.error(), ScriptError::MinimalIf);
    }

    #[test]
    fn test_upgradable_nops() {
        assert!(eval(&[OP_NOP5, OP_1]).0);
        let (ok, err, _) = run(&[OP_NOP5], ScriptVerify::DISCOURAGE_UPGRADABLE_NOPS);
        assert!(!ok);
        assert_eq!(err, ScriptError::DiscourageUpgradableNops);
        // Without the CLTV flag the opcode is still OP_NOP2
        assert!(eval(&[OP_CHECKLOCKTIMEVERIFY]).0);
    }

    #[test]
    fn test_lock_time_operands() {
        let input = TransactionInput::new(OutPoint::new(UInt256::from_u64(1), 0), Vec::new(), 0);
        let tx = Transaction::new(2, vec![input], vec![TransactionOutput::new(1, Vec::new())], 100);
        let checker = TransactionChecker::new(&tx, 0, 0);
        let check = |flags: ScriptVerify, script: &[u8]| {
            let mut ctx = ScriptEvaluationContext::new(flags);
            ctx.eval_script(script, &checker, HashVersion::Original);
            ctx.error()
        };

        let cltv = ScriptVerify::CHECKLOCKTIMEVERIFY;
        assert_eq!(check(cltv, &[0x01, 100, OP_CHECKLOCKTIMEVERIFY]), ScriptError::Ok);
        assert_eq!(check(cltv, &[0x01, 101, OP_CHECKLOCKTIMEVERIFY]), ScriptError::UnsatisfiedLockTime);
        assert_eq!(check(cltv, &[OP_1NEGATE, OP_CHECKLOCKTIMEVERIFY]), ScriptError::NegativeLockTime);
        assert_eq!(check(cltv, &[OP_CHECKLOCKTIMEVERIFY]), ScriptError::InvalidStackOperation);

        let csv = ScriptVerify::CHECKSEQUENCEVERIFY;
        assert_eq!(check(csv, &[OP_1, OP_CHECKSEQUENCEVERIFY]), ScriptError::UnsatisfiedLockTime);
        assert_eq!(check(csv, &[OP_0, OP_CHECKSEQUENCEVERIFY]), ScriptError::Ok);
        // Disable flag set on the operand: no-op
        let disabled = [0x05, 0x00, 0x00, 0x00, 0x80, 0x00, OP_CHECKSEQUENCEVERIFY];
        assert_eq!(check(csv, &disabled), ScriptError::Ok);
    }

    #[test]
    fn test_cold_stake_opcode() {
        let mut ctx = ScriptEvaluationContext::new(ScriptVerify::CHECKCOLDSTAKEVERIFY);
        assert!(!ctx.eval_script(&[OP_CHECKCOLDSTAKEVERIFY], &BaseSignatureChecker, HashVersion::Original));
        assert_eq!(ctx.error(), ScriptError::CheckColdStakeVerify);

        let input = TransactionInput::new(OutPoint::new(UInt256::from_u64(1), 0), Vec::new(), 0);
        let outputs = vec![TransactionOutput::new(0, Vec::new()), TransactionOutput::new(10, vec![OP_1])];
        let coinstake = Transaction::new(1, vec![input], outputs, 0);
        let checker = TransactionChecker::new(&coinstake, 0, 0);
        assert!(ctx.eval_script(&[OP_CHECKCOLDSTAKEVERIFY], &checker, HashVersion::Original));
        assert!(coinstake.is_cold_coin_stake());

        // Plain NOP10 without the flag
        assert!(eval(&[OP_CHECKCOLDSTAKEVERIFY, OP_1]).0);
    }

    #[test]
    fn test_multisig_counts_and_dummy() {
        // 0-of-0 with the dummy
        let (ok, _, stack) = eval(&[OP_0, OP_0, OP_0, OP_CHECKMULTISIG]);
        assert!(ok);
        assert_eq!(stack, vec![vec![1]]);

        // Missing dummy
        assert_eq!(eval(&[OP_0, OP_0, OP_CHECKMULTISIG]).1, ScriptError::InvalidStackOperation);

        let (ok, err, _) = run(&[OP_1, OP_0, OP_0, OP_CHECKMULTISIG], ScriptVerify::NULLDUMMY);
        assert!(!ok);
        assert_eq!(err, ScriptError::SigNullDummy);
    }

    #[test]
    fn test_signature_encoding_rules() {
        // r = 1, s = 1, SIGHASH_ALL
        let sig = [0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01, 0x01];
        assert!(is_valid_signature_encoding(&sig));
        assert!(!is_valid_signature_encoding(&sig[..8]));
        let mut negative_r = sig;
        negative_r[4] = 0x81;
        assert!(!is_valid_signature_encoding(&negative_r));

        let evaluator = Evaluator { flags: ScriptVerify::STRICTENC, checker: &BaseSignatureChecker };
        assert!(evaluator.check_signature_encoding(&[]).is_ok());
        assert_eq!(evaluator.check_signature_encoding(&[0x30]), Err(ScriptError::SigDer));
        let mut bad_type = sig;
        bad_type[8] = 0x04;
        assert_eq!(evaluator.check_signature_encoding(&bad_type), Err(ScriptError::SigHashType));

        assert_eq!(evaluator.check_pubkey_encoding(&[0x05; 33], HashVersion::Original), Err(ScriptError::PubKeyType));
        let mut uncompressed = vec![0x04];
        uncompressed.extend_from_slice(&[0x11; 64]);
        assert!(evaluator.check_pubkey_encoding(&uncompressed, HashVersion::WitnessV0).is_ok());
        let witness = Evaluator { flags: ScriptVerify::WITNESS_PUBKEYTYPE, checker: &BaseSignatureChecker };
        assert_eq!(
            witness.check_pubkey_encoding(&uncompressed, HashVersion::WitnessV0),
            Err(ScriptError::WitnessPubkeyType)
        );
    }

    #[test]
    fn test_verify_script_plain() {
        let mut ctx = ScriptEvaluationContext::new(ScriptVerify::STANDARD);
        assert!(ctx.verify_script(&[OP_1], &[OP_1, OP_EQUAL], &[], &BaseSignatureChecker));
        assert_eq!(ctx.error(), ScriptError::Ok);

        assert!(!ctx.verify_script(&[OP_1], &[OP_2, OP_EQUAL], &[], &BaseSignatureChecker));
        assert_eq!(ctx.error(), ScriptError::EvalFalse);

        assert!(!ctx.verify_script(&[OP_1, OP_1], &[OP_NOP], &[], &BaseSignatureChecker));
        assert_eq!(ctx.error(), ScriptError::CleanStack);

        let mut ctx = ScriptEvaluationContext::new(ScriptVerify::SIGPUSHONLY);
        assert!(!ctx.verify_script(&[OP_1, OP_DUP], &[OP_1], &[], &BaseSignatureChecker));
        assert_eq!(ctx.error(), ScriptError::SigPushOnly);
    }

    #[test]
    fn test_verify_script_witness_rules() {
        let flags = ScriptVerify::P2SH | ScriptVerify::WITNESS;
        let witness_script = vec![OP_1];
        let script_pubkey = crate::script::p2wsh_script(&witness_script);

        let mut ctx = ScriptEvaluationContext::new(flags);
        assert!(ctx.verify_script(&[], &script_pubkey, &[witness_script.clone()], &BaseSignatureChecker));

        assert!(!ctx.verify_script(&[OP_1], &script_pubkey, &[witness_script.clone()], &BaseSignatureChecker));
        assert_eq!(ctx.error(), ScriptError::WitnessMalleated);

        assert!(!ctx.verify_script(&[], &script_pubkey, &[], &BaseSignatureChecker));
        assert_eq!(ctx.error(), ScriptError::WitnessProgramEmpty);

        assert!(!ctx.verify_script(&[], &script_pubkey, &[vec![OP_2]], &BaseSignatureChecker));
        assert_eq!(ctx.error(), ScriptError::WitnessProgramMismatch);

        let bad_len = [OP_0, 0x03, 1, 2, 3];
        assert!(!ctx.verify_script(&[], &bad_len, &[], &BaseSignatureChecker));
        assert_eq!(ctx.error(), ScriptError::WitnessProgramWrongLength);

        assert!(!ctx.verify_script(&[OP_1], &[OP_1], &[vec![1]], &BaseSignatureChecker));
        assert_eq!(ctx.error(), ScriptError::WitnessUnexpected);

        let future = [OP_2, 0x02, 0xaa, 0xbb];
        assert!(ctx.verify_script(&[], &future, &[], &BaseSignatureChecker));
        let mut strict = ScriptEvaluationContext::new(flags | ScriptVerify::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM);
        assert!(!strict.verify_script(&[], &future, &[], &BaseSignatureChecker));
        assert_eq!(strict.error(), ScriptError::DiscourageUpgradableWitnessProgram);
    }

    #[test]
    fn test_flag_sets() {
        assert!(ScriptVerify::STANDARD.contains(ScriptVerify::MANDATORY));
        assert!(ScriptVerify::STANDARD.contains(ScriptVerify::WITNESS | ScriptVerify::CLEANSTACK));
        assert!(!ScriptVerify::STANDARD.contains(ScriptVerify::CHECKCOLDSTAKEVERIFY));
        let mut flags = ScriptVerify::STANDARD;
        flags.remove(ScriptVerify::LOW_S);
        assert!(!flags.contains(ScriptVerify::LOW_S));
    }

    #[derive(Debug)]
    struct PanickingChecker;

    impl SignatureChecker for PanickingChecker {
        fn check_lock_time(&self, _: i64) -> bool {
            panic!("checker blew up")
        }
    }

    #[test]
    fn test_panics_become_unknown_error() {
        let mut ctx = ScriptEvaluationContext::new(ScriptVerify::CHECKLOCKTIMEVERIFY);
        assert!(!ctx.eval_script(&[OP_1, OP_CHECKLOCKTIMEVERIFY], &PanickingChecker, HashVersion::Original));
        assert_eq!(ctx.error(), ScriptError::UnknownError);
        assert_eq!(ctx.unexpected_failure(), Some("checker blew up"));
    }
}

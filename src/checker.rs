//! Signature and lock-time checks against the spending transaction

use crate::constants::{
    LOCKTIME_THRESHOLD, SEQUENCE_FINAL, SEQUENCE_LOCKTIME_DISABLE_FLAG, SEQUENCE_LOCKTIME_MASK,
    SEQUENCE_LOCKTIME_TYPE_FLAG,
};
use crate::sighash::{signature_hash, HashVersion, PrecomputedTransactionData, SigHash};
use crate::types::Transaction;
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, VerifyOnly};
use std::sync::OnceLock;
use tracing::trace;

static SECP256K1: OnceLock<Secp256k1<VerifyOnly>> = OnceLock::new();

fn verification_context() -> &'static Secp256k1<VerifyOnly> {
    SECP256K1.get_or_init(Secp256k1::verification_only)
}

/// What the interpreter needs to know about the spending transaction
pub trait SignatureChecker {
    /// `signature` still carries its trailing hash type byte
    fn check_sig(&self, signature: &[u8], pubkey: &[u8], script_code: &[u8], version: HashVersion) -> bool {
        let _ = (signature, pubkey, script_code, version);
        false
    }

    fn check_lock_time(&self, lock_time: i64) -> bool {
        let _ = lock_time;
        false
    }

    fn check_sequence(&self, sequence: i64) -> bool {
        let _ = sequence;
        false
    }

    /// The spending transaction, when there is one
    fn transaction(&self) -> Option<&Transaction> {
        None
    }
}

/// Checker with no transaction: every signature and lock-time check fails
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseSignatureChecker;

impl SignatureChecker for BaseSignatureChecker {}

/// Checks input `input_index` of `tx`, which spends an output worth `amount`
#[derive(Debug, Clone)]
pub struct TransactionChecker<'a> {
    tx: &'a Transaction,
    input_index: usize,
    amount: i64,
    precomputed: Option<&'a PrecomputedTransactionData>,
}

impl<'a> TransactionChecker<'a> {
    pub fn new(tx: &'a Transaction, input_index: usize, amount: i64) -> Self {
        TransactionChecker { tx, input_index, amount, precomputed: None }
    }

    pub fn with_precomputed(mut self, precomputed: &'a PrecomputedTransactionData) -> Self {
        self.precomputed = Some(precomputed);
        self
    }

    pub fn input_index(&self) -> usize {
        self.input_index
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    fn input_sequence(&self) -> Option<u32> {
        self.tx.inputs.get(self.input_index).map(|input| input.sequence)
    }
}

impl SignatureChecker for TransactionChecker<'_> {
    fn check_sig(&self, signature: &[u8], pubkey: &[u8], script_code: &[u8], version: HashVersion) -> bool {
        let pubkey = match PublicKey::from_slice(pubkey) {
            Ok(pubkey) => pubkey,
            Err(_) => return false,
        };
        let (hash_type, der) = match signature.split_last() {
            Some((hash_type, der)) => (SigHash::from(*hash_type), der),
            None => return false,
        };

        // Non-strict DER is still accepted by consensus, like OpenSSL used to
        let mut signature = match Signature::from_der_lax(der) {
            Ok(signature) => signature,
            Err(_) => return false,
        };
        signature.normalize_s();

        let digest = match signature_hash(
            script_code,
            self.tx,
            self.input_index,
            hash_type,
            self.amount,
            version,
            self.precomputed,
        ) {
            Ok(digest) => digest,
            Err(err) => {
                trace!(%err, "signature hash unavailable");
                return false;
            }
        };
        let message = Message::from_digest(digest.to_bytes(true));
        verification_context().verify_ecdsa(&message, &signature, &pubkey).is_ok()
    }

    fn check_lock_time(&self, lock_time: i64) -> bool {
        if lock_time < 0 || lock_time > u32::MAX as i64 {
            return false;
        }
        let lock_time = lock_time as u32;
        let tx_lock_time = self.tx.lock_time;

        // Heights compare with heights, timestamps with timestamps
        if (tx_lock_time < LOCKTIME_THRESHOLD) != (lock_time < LOCKTIME_THRESHOLD) {
            return false;
        }
        if lock_time > tx_lock_time {
            return false;
        }

        // A final input disables nLockTime for the whole transaction
        matches!(self.input_sequence(), Some(sequence) if sequence != SEQUENCE_FINAL)
    }

    fn check_sequence(&self, sequence: i64) -> bool {
        if sequence < 0 || sequence > u32::MAX as i64 {
            return false;
        }
        let sequence = sequence as u32;
        let tx_sequence = match self.input_sequence() {
            Some(tx_sequence) => tx_sequence,
            None => return false,
        };

        // BIP68 only applies from version 2 on, comparing the version unsigned
        if (self.tx.version as u32) < 2 {
            return false;
        }
        if tx_sequence & SEQUENCE_LOCKTIME_DISABLE_FLAG != 0 {
            return false;
        }

        let mask = SEQUENCE_LOCKTIME_TYPE_FLAG | SEQUENCE_LOCKTIME_MASK;
        let tx_masked = tx_sequence & mask;
        let masked = sequence & mask;
        if (tx_masked < SEQUENCE_LOCKTIME_TYPE_FLAG) != (masked < SEQUENCE_LOCKTIME_TYPE_FLAG) {
            return false;
        }
        masked <= tx_masked
    }

    fn transaction(&self) -> Option<&Transaction> {
        Some(self.tx)
    }
}

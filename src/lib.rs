//! # Chain-Consensus
//!
//! Consensus core for Bitcoin-derived proof-of-work and proof-of-stake chains:
//! fixed-width hash integers, compact difficulty targets, the chained-header
//! index with its retarget rule, and the transaction script interpreter.
//!
//! ## Architecture
//!
//! - Value layer: [`uint`], [`target`], [`types`], [`header`], [`serialization`]
//! - Chain layer: [`chain`], [`pow`], [`params`], [`factory`]
//! - Script layer: [`opcodes`], [`script`], [`stack`], [`sighash`], [`checker`], [`interpreter`]
//!
//! Everything is synchronous and free of I/O. [`chain::ChainedHeader`] values are
//! immutable once linked and can be shared across threads; a
//! [`interpreter::ScriptEvaluationContext`] belongs to one evaluation at a time.
//!
//! ## Usage
//!
//! ```rust
//! use chain_consensus::{ChainConsensus, ConsensusParams, ScriptVerify};
//! use chain_consensus::opcodes::{OP_1, OP_EQUAL};
//! use chain_consensus::types::{OutPoint, Transaction, TransactionInput, TransactionOutput};
//! use chain_consensus::uint::UInt256;
//!
//! let consensus = ChainConsensus::new(ConsensusParams::bitcoin_regtest());
//! let input = TransactionInput::new(OutPoint::new(UInt256::one(), 0), vec![OP_1], 0xffffffff);
//! let tx = Transaction::new(1, vec![input], vec![TransactionOutput::new(1000, vec![])], 0);
//!
//! let result = consensus.verify_script(&tx, 0, &[OP_1, OP_EQUAL], 5000, ScriptVerify::STANDARD);
//! assert!(result.is_ok());
//! ```

pub mod chain;
pub mod checker;
pub mod constants;
pub mod error;
pub mod factory;
pub mod header;
pub mod interpreter;
pub mod opcodes;
pub mod params;
pub mod pow;
pub mod script;
pub mod serialization;
pub mod sighash;
pub mod stack;
pub mod target;
pub mod types;
pub mod uint;

// Re-export commonly used types
pub use chain::ChainedHeader;
pub use error::{ConsensusError, Result};
pub use factory::{ConsensusFactory, HeaderKind, PosConsensusFactory, PowConsensusFactory};
pub use header::{BlockHeader, Header, ProvenBlockHeader};
pub use interpreter::{ScriptError, ScriptEvaluationContext, ScriptVerify};
pub use params::ConsensusParams;
pub use target::Target;
pub use types::*;
pub use uint::{UInt160, UInt256};

use checker::TransactionChecker;
use sighash::PrecomputedTransactionData;
use tracing::debug;

/// Entry point bundling one network's parameters with the consensus checks
#[derive(Debug, Clone, Default)]
pub struct ChainConsensus {
    params: ConsensusParams,
}

impl ChainConsensus {
    pub fn new(params: ConsensusParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    /// Verify input `input_index` of `tx` against the output it spends.
    ///
    /// Script failures come back as [`ConsensusError::ScriptExecution`] carrying
    /// the [`ScriptError`] text.
    pub fn verify_script(
        &self,
        tx: &Transaction,
        input_index: usize,
        script_pubkey: &[u8],
        amount: i64,
        flags: ScriptVerify,
    ) -> Result<()> {
        let input = tx.inputs.get(input_index).ok_or_else(|| {
            ConsensusError::InvalidArgument(format!(
                "input index {} out of range for {} inputs",
                input_index,
                tx.inputs.len()
            ))
        })?;

        let precomputed = PrecomputedTransactionData::new(tx);
        let checker = TransactionChecker::new(tx, input_index, amount).with_precomputed(&precomputed);
        let mut context = ScriptEvaluationContext::new(flags);
        if context.verify_script(&input.script_sig, script_pubkey, &input.witness, &checker) {
            return Ok(());
        }

        let error = context.error();
        debug!(txid = %tx.txid(), input_index, ?error, "input script rejected");
        Err(ConsensusError::ScriptExecution(match context.unexpected_failure() {
            Some(detail) => format!("input {}: {} ({})", input_index, error, detail),
            None => format!("input {}: {}", input_index, error),
        }))
    }

    /// Header hash meets the target its own bits encode
    pub fn check_proof_of_work(&self, header: &BlockHeader) -> bool {
        header.check_proof_of_work()
    }

    /// Bits required of the block that follows `tip` with timestamp `new_block_time`
    pub fn get_work_required(&self, tip: &ChainedHeader, new_block_time: u32) -> Result<Target> {
        pow::get_next_work_required(Some(tip), new_block_time, &self.params)
    }

    pub fn validate_header(&self, header: &ChainedHeader) -> bool {
        header.validate(&self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes::*;

    fn spend(script_sig: Vec<u8>) -> Transaction {
        let input = TransactionInput::new(OutPoint::new(UInt256::one(), 0), script_sig, 0xffffffff);
        Transaction::new(1, vec![input], vec![TransactionOutput::new(1000, Vec::new())], 0)
    }

    #[test]
    fn test_verify_script_reports_error_code() {
        let consensus = ChainConsensus::default();
        let tx = spend(vec![OP_2]);
        assert!(consensus.verify_script(&tx, 0, &[OP_2, OP_EQUAL], 0, ScriptVerify::STANDARD).is_ok());

        match consensus.verify_script(&tx, 0, &[OP_3, OP_EQUAL], 0, ScriptVerify::STANDARD) {
            Err(ConsensusError::ScriptExecution(msg)) => assert!(msg.contains("false/empty top stack")),
            other => panic!("unexpected result {:?}", other),
        }
        assert!(matches!(
            consensus.verify_script(&tx, 3, &[OP_1], 0, ScriptVerify::STANDARD),
            Err(ConsensusError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_facade_work_required() {
        let consensus = ChainConsensus::new(ConsensusParams::bitcoin_regtest());
        let genesis = BlockHeader::new(1, UInt256::zero(), UInt256::zero(), 1_296_688_602, Target::new(0x207fffff), 2);
        let tip = ChainedHeader::genesis(Header::Plain(genesis), 0).unwrap();
        assert_eq!(consensus.get_work_required(&tip, 1_296_689_202).unwrap(), Target::new(0x207fffff));
        assert_eq!(consensus.params().pow_limit, Target::new(0x207fffff));
    }
}

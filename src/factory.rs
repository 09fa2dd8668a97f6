//! Network-specific type creation
//!
//! Generic code (deserialization, tests, chain building) asks a factory for
//! new headers, transactions and blocks instead of naming concrete types.
//! The factory is passed explicitly to every call site that needs it.

use crate::header::{BlockHeader, Header, ProvenBlockHeader};
use crate::target::Target;
use crate::types::{Block, Transaction};
use crate::uint::UInt256;
use std::fmt::Debug;

/// Which header variant a network's streams carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderKind {
    ProofOfWork,
    Proven,
}

pub trait ConsensusFactory: Debug + Send + Sync {
    fn header_kind(&self) -> HeaderKind;

    /// Transaction template: proof-of-stake networks give it a `time` field.
    fn create_transaction(&self) -> Transaction {
        Transaction::new(1, Vec::new(), Vec::new(), 0)
    }

    /// Empty header of the network's variant
    fn create_block_header(&self) -> Header {
        let base = BlockHeader::new(1, UInt256::zero(), UInt256::zero(), 0, Target::default(), 0);
        match self.header_kind() {
            HeaderKind::ProofOfWork => Header::Plain(base),
            HeaderKind::Proven => Header::from(ProvenBlockHeader::new(
                base,
                Vec::new(),
                Vec::new(),
                self.create_transaction(),
            )),
        }
    }

    fn create_block(&self) -> Block {
        Block { header: self.create_block_header(), transactions: Vec::new() }
    }
}

/// Plain 80-byte headers, transactions without a timestamp
#[derive(Debug, Clone, Copy, Default)]
pub struct PowConsensusFactory;

impl ConsensusFactory for PowConsensusFactory {
    fn header_kind(&self) -> HeaderKind {
        HeaderKind::ProofOfWork
    }
}

/// Proven headers and timestamped transactions
#[derive(Debug, Clone, Copy, Default)]
pub struct PosConsensusFactory;

impl ConsensusFactory for PosConsensusFactory {
    fn header_kind(&self) -> HeaderKind {
        HeaderKind::Proven
    }

    fn create_transaction(&self) -> Transaction {
        let mut tx = Transaction::new(1, Vec::new(), Vec::new(), 0);
        tx.time = Some(0);
        tx
    }
}

//! Block headers: the 80-byte proof-of-work header and the proof-of-stake
//! "proven" header that carries its own coinstake and block signature.

use crate::constants::BLOCK_HEADER_SIZE;
use crate::error::{ConsensusError, Result};
use crate::factory::{ConsensusFactory, HeaderKind};
use crate::pow;
use crate::serialization::{Deserializable, Serializable, StreamReader, StreamWriter};
use crate::target::Target;
use crate::types::{double_sha256, ByteString, Hash, Transaction};
use std::sync::OnceLock;

/// Block Header: ℋ = ℤ × ℍ × ℍ × ℕ × ℕ × ℕ
///
/// Fields are fixed at construction so the memoized hash can never go stale.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BlockHeader {
    version: i32,
    hash_prev_block: Hash,
    hash_merkle_root: Hash,
    time: u32,
    bits: Target,
    nonce: u32,
    #[serde(skip)]
    hash_cache: OnceLock<Hash>,
}

impl BlockHeader {
    pub fn new(
        version: i32,
        hash_prev_block: Hash,
        hash_merkle_root: Hash,
        time: u32,
        bits: Target,
        nonce: u32,
    ) -> Self {
        BlockHeader {
            version,
            hash_prev_block,
            hash_merkle_root,
            time,
            bits,
            nonce,
            hash_cache: OnceLock::new(),
        }
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn hash_prev_block(&self) -> &Hash {
        &self.hash_prev_block
    }

    pub fn hash_merkle_root(&self) -> &Hash {
        &self.hash_merkle_root
    }

    pub fn time(&self) -> u32 {
        self.time
    }

    pub fn bits(&self) -> Target {
        self.bits
    }

    pub fn nonce(&self) -> u32 {
        self.nonce
    }

    /// Copy with a different nonce (and an empty hash cache)
    pub fn with_nonce(&self, nonce: u32) -> Self {
        BlockHeader::new(
            self.version,
            self.hash_prev_block,
            self.hash_merkle_root,
            self.time,
            self.bits,
            nonce,
        )
    }

    /// Double SHA-256 of the 80-byte encoding, computed once
    pub fn hash(&self) -> Hash {
        *self.hash_cache.get_or_init(|| double_sha256(&self.to_bytes()))
    }

    pub fn check_proof_of_work(&self) -> bool {
        pow::check_proof_of_work(&self.hash(), self.bits)
    }

    fn read(reader: &mut StreamReader<'_>) -> Result<Self> {
        Ok(BlockHeader::new(
            reader.read_i32()?,
            reader.read_uint256()?,
            reader.read_uint256()?,
            reader.read_u32()?,
            Target::new(reader.read_u32()?),
            reader.read_u32()?,
        ))
    }
}

impl PartialEq for BlockHeader {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.hash_prev_block == other.hash_prev_block
            && self.hash_merkle_root == other.hash_merkle_root
            && self.time == other.time
            && self.bits == other.bits
            && self.nonce == other.nonce
    }
}

impl Eq for BlockHeader {}

impl Serializable for BlockHeader {
    fn serialize(&self, writer: &mut StreamWriter) {
        writer.write_i32(self.version);
        writer.write_uint256(&self.hash_prev_block);
        writer.write_uint256(&self.hash_merkle_root);
        writer.write_u32(self.time);
        writer.write_u32(self.bits.to_compact());
        writer.write_u32(self.nonce);
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = StreamWriter::with_capacity(BLOCK_HEADER_SIZE);
        self.serialize(&mut writer);
        writer.into_inner()
    }
}

/// Proof-of-stake header: the plain header plus the evidence needed to check
/// the stake without the full block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenBlockHeader {
    pub header: BlockHeader,
    /// Partial merkle tree proving the coinstake is in the block
    pub merkle_proof: ByteString,
    /// Block signature by the staker's key
    pub signature: ByteString,
    pub coinstake: Transaction,
}

impl ProvenBlockHeader {
    pub fn new(header: BlockHeader, merkle_proof: ByteString, signature: ByteString, coinstake: Transaction) -> Self {
        ProvenBlockHeader { header, merkle_proof, signature, coinstake }
    }

    /// Proven headers are identified by the hash of their 80-byte base.
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }
}

impl Serializable for ProvenBlockHeader {
    fn serialize(&self, writer: &mut StreamWriter) {
        self.header.serialize(writer);
        writer.write_var_bytes(&self.merkle_proof);
        writer.write_var_bytes(&self.signature);
        self.coinstake.serialize(writer);
    }
}

/// The header variants a network can use. Selected by the [`ConsensusFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Header {
    Plain(BlockHeader),
    Proven(Box<ProvenBlockHeader>),
}

impl Header {
    pub fn kind(&self) -> HeaderKind {
        match self {
            Header::Plain(_) => HeaderKind::ProofOfWork,
            Header::Proven(_) => HeaderKind::Proven,
        }
    }

    /// The 80-byte header shared by every variant
    pub fn base(&self) -> &BlockHeader {
        match self {
            Header::Plain(header) => header,
            Header::Proven(proven) => &proven.header,
        }
    }

    pub fn hash(&self) -> Hash {
        self.base().hash()
    }

    pub fn previous_hash(&self) -> &Hash {
        self.base().hash_prev_block()
    }

    pub fn time(&self) -> u32 {
        self.base().time()
    }

    pub fn bits(&self) -> Target {
        self.base().bits()
    }

    pub fn is_proven(&self) -> bool {
        matches!(self, Header::Proven(_))
    }
}

impl From<BlockHeader> for Header {
    fn from(header: BlockHeader) -> Self {
        Header::Plain(header)
    }
}

impl From<ProvenBlockHeader> for Header {
    fn from(header: ProvenBlockHeader) -> Self {
        Header::Proven(Box::new(header))
    }
}

impl Serializable for Header {
    fn serialize(&self, writer: &mut StreamWriter) {
        match self {
            Header::Plain(header) => header.serialize(writer),
            Header::Proven(proven) => proven.serialize(writer),
        }
    }
}

impl Deserializable for Header {
    fn deserialize(reader: &mut StreamReader<'_>, factory: &dyn ConsensusFactory) -> Result<Self> {
        let header = BlockHeader::read(reader)?;
        match factory.header_kind() {
            HeaderKind::ProofOfWork => Ok(Header::Plain(header)),
            HeaderKind::Proven => {
                let merkle_proof = reader.read_var_bytes()?;
                let signature = reader.read_var_bytes()?;
                let coinstake = Transaction::deserialize(reader, factory)?;
                if !coinstake.is_coinstake() {
                    return Err(ConsensusError::Serialization(format!(
                        "proven header {} does not carry a coinstake",
                        header.hash()
                    )));
                }
                Ok(Header::Proven(Box::new(ProvenBlockHeader::new(
                    header,
                    merkle_proof,
                    signature,
                    coinstake,
                ))))
            }
        }
    }
}

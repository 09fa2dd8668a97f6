//! Error types for consensus validation

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    /// Malformed textual or binary input for a fixed-width value
    #[error("Format error: {0}")]
    Format(String),

    /// A caller broke a construction invariant (wrong parent hash, wrong height, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The retarget look-back needs an ancestor that is not linked into the chain.
    /// Unrecoverable: the caller is validating against an incomplete history.
    #[error("Cannot calculate work of a partial chain: {0}")]
    PartialChain(String),

    #[error("Invalid proof of work: {0}")]
    InvalidProofOfWork(String),

    #[error("Script execution failed: {0}")]
    ScriptExecution(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ConsensusError>;

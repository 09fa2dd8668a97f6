//! Consensus constants used by the script interpreter and the header chain

/// Maximum script length in bytes
pub const MAX_SCRIPT_SIZE: usize = 10_000;

/// Maximum size of a single stack element (and of a single push)
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Maximum combined size of main stack and alt stack during script execution
pub const MAX_STACK_SIZE: usize = 1000;

/// Maximum number of non-push operations in script
pub const MAX_SCRIPT_OPS: usize = 201;

/// Maximum number of public keys per OP_CHECKMULTISIG
pub const MAX_PUBKEYS_PER_MULTISIG: usize = 20;

/// Default byte width of an arithmetic operand
pub const SCRIPT_NUM_MAX_SIZE: usize = 4;

/// Byte width allowed for OP_CHECKLOCKTIMEVERIFY / OP_CHECKSEQUENCEVERIFY operands.
/// Five bytes keep lock times past 2^31 representable.
pub const LOCKTIME_NUM_MAX_SIZE: usize = 5;

/// Lock time threshold: lock times below this are block heights, above are timestamps
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

/// Sequence number for final transaction input
pub const SEQUENCE_FINAL: u32 = 0xffffffff;

/// BIP68: if set, the sequence number is not interpreted as a relative lock time
pub const SEQUENCE_LOCKTIME_DISABLE_FLAG: u32 = 1 << 31;

/// BIP68: if set, the relative lock time is in units of 512 seconds
pub const SEQUENCE_LOCKTIME_TYPE_FLAG: u32 = 1 << 22;

/// BIP68: mask extracting the relative lock time value
pub const SEQUENCE_LOCKTIME_MASK: u32 = 0x0000ffff;

/// Number of blocks whose timestamps form the median time past
pub const MEDIAN_TIME_SPAN: usize = 11;

/// Size of a serialized block header
pub const BLOCK_HEADER_SIZE: usize = 80;

/// Difficulty-1 target in compact form (Bitcoin genesis bits)
pub const DIFFICULTY_ONE_BITS: u32 = 0x1d00ffff;

/// Difficulty adjustment interval on Bitcoin main: 2016 blocks
pub const DIFFICULTY_ADJUSTMENT_INTERVAL: u64 = 2016;

/// Target time per block on Bitcoin main: 10 minutes
pub const TARGET_TIME_PER_BLOCK: u64 = 600;

/// Target timespan of one retarget period on Bitcoin main: two weeks
pub const TARGET_TIMESPAN: u64 = DIFFICULTY_ADJUSTMENT_INTERVAL * TARGET_TIME_PER_BLOCK;

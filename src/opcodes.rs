//! Script opcode constants
//!
//! Values follow Bitcoin Core `script/script.h`. `OP_NOP10` is repurposed as
//! `OP_CHECKCOLDSTAKEVERIFY` on cold-staking networks.

macro_rules! opcodes {
    ($($(#[$doc:meta])* $name:ident = $value:literal,)*) => {
        $(
            $(#[$doc])*
            pub const $name: u8 = $value;
        )*

        /// Canonical name of an opcode, `None` for undefined values.
        /// Direct pushes 0x01..=0x4b have no name of their own.
        pub fn opcode_name(opcode: u8) -> Option<&'static str> {
            match opcode {
                $($value => Some(stringify!($name)),)*
                _ => None,
            }
        }
    };
}

opcodes! {
    // push value
    /// Push empty array
    OP_0 = 0x00,
    /// Next byte is the push length
    OP_PUSHDATA1 = 0x4c,
    /// Next 2 bytes (little-endian) are the push length
    OP_PUSHDATA2 = 0x4d,
    /// Next 4 bytes (little-endian) are the push length
    OP_PUSHDATA4 = 0x4e,
    OP_1NEGATE = 0x4f,
    OP_RESERVED = 0x50,
    OP_1 = 0x51,
    OP_2 = 0x52,
    OP_3 = 0x53,
    OP_4 = 0x54,
    OP_5 = 0x55,
    OP_6 = 0x56,
    OP_7 = 0x57,
    OP_8 = 0x58,
    OP_9 = 0x59,
    OP_10 = 0x5a,
    OP_11 = 0x5b,
    OP_12 = 0x5c,
    OP_13 = 0x5d,
    OP_14 = 0x5e,
    OP_15 = 0x5f,
    OP_16 = 0x60,

    // control
    OP_NOP = 0x61,
    OP_VER = 0x62,
    OP_IF = 0x63,
    OP_NOTIF = 0x64,
    OP_VERIF = 0x65,
    OP_VERNOTIF = 0x66,
    OP_ELSE = 0x67,
    OP_ENDIF = 0x68,
    OP_VERIFY = 0x69,
    OP_RETURN = 0x6a,

    // stack ops
    OP_TOALTSTACK = 0x6b,
    OP_FROMALTSTACK = 0x6c,
    OP_2DROP = 0x6d,
    OP_2DUP = 0x6e,
    OP_3DUP = 0x6f,
    OP_2OVER = 0x70,
    OP_2ROT = 0x71,
    OP_2SWAP = 0x72,
    OP_IFDUP = 0x73,
    OP_DEPTH = 0x74,
    OP_DROP = 0x75,
    OP_DUP = 0x76,
    OP_NIP = 0x77,
    OP_OVER = 0x78,
    OP_PICK = 0x79,
    OP_ROLL = 0x7a,
    OP_ROT = 0x7b,
    OP_SWAP = 0x7c,
    OP_TUCK = 0x7d,

    // splice ops
    OP_CAT = 0x7e,
    OP_SUBSTR = 0x7f,
    OP_LEFT = 0x80,
    OP_RIGHT = 0x81,
    OP_SIZE = 0x82,

    // bit logic
    OP_INVERT = 0x83,
    OP_AND = 0x84,
    OP_OR = 0x85,
    OP_XOR = 0x86,
    OP_EQUAL = 0x87,
    OP_EQUALVERIFY = 0x88,
    OP_RESERVED1 = 0x89,
    OP_RESERVED2 = 0x8a,

    // numeric
    OP_1ADD = 0x8b,
    OP_1SUB = 0x8c,
    OP_2MUL = 0x8d,
    OP_2DIV = 0x8e,
    OP_NEGATE = 0x8f,
    OP_ABS = 0x90,
    OP_NOT = 0x91,
    OP_0NOTEQUAL = 0x92,
    OP_ADD = 0x93,
    OP_SUB = 0x94,
    OP_MUL = 0x95,
    OP_DIV = 0x96,
    OP_MOD = 0x97,
    OP_LSHIFT = 0x98,
    OP_RSHIFT = 0x99,
    OP_BOOLAND = 0x9a,
    OP_BOOLOR = 0x9b,
    OP_NUMEQUAL = 0x9c,
    OP_NUMEQUALVERIFY = 0x9d,
    OP_NUMNOTEQUAL = 0x9e,
    OP_LESSTHAN = 0x9f,
    OP_GREATERTHAN = 0xa0,
    OP_LESSTHANOREQUAL = 0xa1,
    OP_GREATERTHANOREQUAL = 0xa2,
    OP_MIN = 0xa3,
    OP_MAX = 0xa4,
    OP_WITHIN = 0xa5,

    // crypto
    OP_RIPEMD160 = 0xa6,
    OP_SHA1 = 0xa7,
    OP_SHA256 = 0xa8,
    OP_HASH160 = 0xa9,
    OP_HASH256 = 0xaa,
    /// Later signature checks only commit to the script after this point
    OP_CODESEPARATOR = 0xab,
    OP_CHECKSIG = 0xac,
    OP_CHECKSIGVERIFY = 0xad,
    OP_CHECKMULTISIG = 0xae,
    OP_CHECKMULTISIGVERIFY = 0xaf,

    // expansion
    OP_NOP1 = 0xb0,
    /// BIP65, formerly OP_NOP2
    OP_CHECKLOCKTIMEVERIFY = 0xb1,
    /// BIP112, formerly OP_NOP3
    OP_CHECKSEQUENCEVERIFY = 0xb2,
    OP_NOP4 = 0xb3,
    OP_NOP5 = 0xb4,
    OP_NOP6 = 0xb5,
    OP_NOP7 = 0xb6,
    OP_NOP8 = 0xb7,
    OP_NOP9 = 0xb8,
    /// Cold staking, formerly OP_NOP10
    OP_CHECKCOLDSTAKEVERIFY = 0xb9,

    OP_INVALIDOPCODE = 0xff,
}

pub const OP_FALSE: u8 = OP_0;
pub const OP_TRUE: u8 = OP_1;
pub const OP_NOP2: u8 = OP_CHECKLOCKTIMEVERIFY;
pub const OP_NOP3: u8 = OP_CHECKSEQUENCEVERIFY;
pub const OP_NOP10: u8 = OP_CHECKCOLDSTAKEVERIFY;

/// Highest opcode that only pushes data
pub const MAX_PUSH_OPCODE: u8 = OP_16;

/// Opcodes that fail a script wherever they appear, even in unexecuted branches
pub fn is_disabled(opcode: u8) -> bool {
    matches!(
        opcode,
        OP_CAT
            | OP_SUBSTR
            | OP_LEFT
            | OP_RIGHT
            | OP_INVERT
            | OP_AND
            | OP_OR
            | OP_XOR
            | OP_2MUL
            | OP_2DIV
            | OP_MUL
            | OP_DIV
            | OP_MOD
            | OP_LSHIFT
            | OP_RSHIFT
    )
}

/// Decode OP_0, OP_1..OP_16 into their small integer
pub fn decode_small_int(opcode: u8) -> Option<u8> {
    match opcode {
        OP_0 => Some(0),
        OP_1..=OP_16 => Some(opcode - OP_1 + 1),
        _ => None,
    }
}

/// Inverse of [`decode_small_int`]; `n` must be at most 16.
pub fn encode_small_int(n: u8) -> u8 {
    debug_assert!(n <= 16);
    if n == 0 {
        OP_0
    } else {
        OP_1 + n - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(opcode_name(OP_CHECKSIG), Some("OP_CHECKSIG"));
        assert_eq!(opcode_name(0xb9), Some("OP_CHECKCOLDSTAKEVERIFY"));
        assert_eq!(opcode_name(0x14), None);
        assert_eq!(opcode_name(0xc0), None);
    }

    #[test]
    fn test_small_ints() {
        for n in 0..=16u8 {
            assert_eq!(decode_small_int(encode_small_int(n)), Some(n));
        }
        assert_eq!(decode_small_int(OP_1NEGATE), None);
    }

    #[test]
    fn test_disabled_set() {
        assert!(is_disabled(OP_CAT));
        assert!(is_disabled(OP_RSHIFT));
        assert!(!is_disabled(OP_SIZE));
        assert!(!is_disabled(OP_EQUAL));
    }
}

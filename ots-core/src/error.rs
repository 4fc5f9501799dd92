//! Error taxonomy for the proof engine
//!
//! Codec and evaluation errors are fatal to the parse/evaluation they occur
//! in; network and calendar failures never surface here — they are captured
//! as attestation verdicts instead (see [`crate::attestation::AttestationVerdict`]).

use std::fmt;
use std::string::FromUtf8Error;

/// Recursion depth allowed while decoding a timestamp tree
pub const RECURSION_LIMIT: usize = 256;

/// Maximum length of a pending attestation URI, in bytes
pub const MAX_URI_LEN: usize = 1000;

/// Maximum length of APPEND/PREPEND/XOR/AND/OR immediate data, in bytes
pub const MAX_OP_DATA_LEN: usize = 1024;

/// Errors produced while decoding or encoding the wire format
#[derive(Debug)]
pub enum OtsError {
    /// File doesn't start with the expected magic bytes
    BadMagic,
    /// Envelope version outside the set this crate understands
    UnknownVersion(u8),
    /// Reader ran out of bytes mid-structure
    UnexpectedEof,
    /// A varuint carried more than 9 continuation bytes
    VarUintTooLong,
    /// An operation tag outside the closed set this crate understands
    UnknownOpTag(u8),
    /// An attestation tag outside the closed set this crate understands, and
    /// not wrapped in the forward-compatible skip encoding
    UnknownAttestationTag(u8),
    /// A length-prefixed body exceeded its allowed maximum
    BodyTooLong {
        /// Maximum allowed length
        max: usize,
        /// Length actually encountered
        got: usize,
    },
    /// Recursion limit exceeded while decoding a tree
    StackOverflow,
    /// Pending attestation URI contained a character outside the safe set
    InvalidUriChar(char),
    /// Extra bytes remained after a structure was fully parsed
    TrailingBytes,
    /// UTF-8 decoding failed (pending attestation URI)
    Utf8(FromUtf8Error),
}

impl fmt::Display for OtsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic => write!(f, "invalid magic bytes, is this a timestamp file?"),
            Self::UnknownVersion(v) => write!(f, "unsupported envelope version: {v}"),
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::VarUintTooLong => write!(f, "varuint exceeded 9 continuation bytes"),
            Self::UnknownOpTag(tag) => write!(f, "unrecognized operation tag: 0x{tag:02x}"),
            Self::UnknownAttestationTag(tag) => {
                write!(f, "unrecognized attestation tag: 0x{tag:02x}")
            }
            Self::BodyTooLong { max, got } => {
                write!(f, "body length {got} exceeds maximum of {max}")
            }
            Self::StackOverflow => write!(f, "recursion limit of {RECURSION_LIMIT} exceeded"),
            Self::InvalidUriChar(c) => write!(f, "invalid character '{c}' in pending URI"),
            Self::TrailingBytes => write!(f, "unexpected data after end of timestamp"),
            Self::Utf8(e) => write!(f, "UTF-8 decoding error: {e}"),
        }
    }
}

impl std::error::Error for OtsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Utf8(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FromUtf8Error> for OtsError {
    fn from(e: FromUtf8Error) -> Self {
        Self::Utf8(e)
    }
}

/// Errors produced while evaluating a Merkle path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// An op such as SUBSTR/LEFT/RIGHT requested bytes beyond the message
    MessageTooShort {
        /// Bytes the operation required
        needed: usize,
        /// Bytes actually available
        available: usize,
    },
    /// UNHEXLIFY saw an odd-length or non-hex input
    BadHex,
    /// The document's recomputed commitment didn't match the tree's root message
    CommitmentMismatch,
    /// SUBSTR was given `len == 0` without using the `u32::MAX` "to end" sentinel
    ZeroLengthSubstr,
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MessageTooShort { needed, available } => {
                write!(f, "operation needs {needed} bytes but only {available} are available")
            }
            Self::BadHex => write!(f, "invalid hexadecimal input"),
            Self::CommitmentMismatch => {
                write!(f, "recomputed commitment does not match the timestamp's root message")
            }
            Self::ZeroLengthSubstr => {
                write!(f, "SUBSTR length of 0 is not the to-end sentinel and is invalid")
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// Result alias for codec operations
pub type Result<T> = std::result::Result<T, OtsError>;

/// Result alias for Merkle evaluation
pub type EvalResult<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants() {
        assert_eq!(RECURSION_LIMIT, 256);
        assert_eq!(MAX_URI_LEN, 1000);
        assert_eq!(MAX_OP_DATA_LEN, 1024);
    }

    #[test]
    fn display_messages_are_nonempty() {
        let errs: Vec<OtsError> = vec![
            OtsError::BadMagic,
            OtsError::UnknownVersion(9),
            OtsError::UnexpectedEof,
            OtsError::VarUintTooLong,
            OtsError::UnknownOpTag(0xAB),
            OtsError::UnknownAttestationTag(0xCD),
            OtsError::BodyTooLong { max: 10, got: 20 },
            OtsError::StackOverflow,
            OtsError::InvalidUriChar('$'),
            OtsError::TrailingBytes,
        ];
        for e in errs {
            assert!(!e.to_string().is_empty());
        }
    }

    #[test]
    fn eval_error_display() {
        assert!(EvalError::MessageTooShort { needed: 4, available: 1 }.to_string().contains('4'));
        assert_eq!(EvalError::BadHex.to_string(), "invalid hexadecimal input");
        assert!(EvalError::CommitmentMismatch.to_string().contains("commitment"));
        assert!(EvalError::ZeroLengthSubstr.to_string().contains("SUBSTR"));
    }

    #[test]
    fn utf8_error_wraps() {
        let utf8_err = String::from_utf8(vec![0xFF, 0xFE]).unwrap_err();
        let err = OtsError::from(utf8_err);
        assert!(err.to_string().contains("UTF-8"));
    }
}

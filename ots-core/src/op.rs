//! Operations: pure message-to-message functions
//!
//! Every variant has a one-byte wire tag, optional immediate parameters,
//! and a total `apply` function. Hash ops never fail; the slicing ops
//! (SUBSTR/LEFT/RIGHT) fail with [`EvalError::MessageTooShort`] rather than
//! panicking, and UNHEXLIFY fails with [`EvalError::BadHex`] on malformed
//! input — both are evaluation-time errors, not codec errors, since a
//! well-formed *encoding* of e.g. `SUBSTR(10, 5)` is perfectly valid even
//! though applying it to a 3-byte message isn't.

use std::fmt;

use bitcoin_hashes::{ripemd160, sha1, sha256, Hash as _};
use sha3::{Digest as _, Keccak256};

use super::bytes::{Reader, Writer};
use super::error::{EvalError, EvalResult, OtsError, Result, MAX_OP_DATA_LEN};

/// Sentinel `len` value for SUBSTR meaning "to the end of the message"
pub const SUBSTR_TO_END: u32 = u32::MAX;

/// The closed set of operations a timestamp tree edge may carry
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Op {
    /// 20-byte SHA-1 digest
    Sha1,
    /// 20-byte RIPEMD-160 digest
    Ripemd160,
    /// 32-byte SHA-256 digest
    Sha256,
    /// 32-byte Keccak-256 digest
    Keccak256,
    /// `msg ‖ data`
    Append(Vec<u8>),
    /// `data ‖ msg`
    Prepend(Vec<u8>),
    /// Byte-reverse
    Reverse,
    /// Binary to lowercase-hex ASCII
    Hexlify,
    /// Hex ASCII to binary
    Unhexlify,
    /// `msg[start..start+len]`; `len == SUBSTR_TO_END` means "to end"
    Substr {
        /// Start offset
        start: u32,
        /// Length, or [`SUBSTR_TO_END`]
        len: u32,
    },
    /// `msg[..len]`
    Left(u32),
    /// `msg[msg.len()-len..]`
    Right(u32),
    /// Per-byte XOR, key cycled
    Xor(Vec<u8>),
    /// Per-byte AND, key cycled
    And(Vec<u8>),
    /// Per-byte OR, key cycled
    Or(Vec<u8>),
}

impl Op {
    /// The one-byte tag identifying this operation on the wire
    #[must_use]
    pub fn tag(&self) -> u8 {
        match self {
            Self::Sha1 => 0x02,
            Self::Ripemd160 => 0x03,
            Self::Sha256 => 0x08,
            Self::Keccak256 => 0x67,
            Self::Append(_) => 0xf0,
            Self::Prepend(_) => 0xf1,
            Self::Reverse => 0x0a,
            Self::Hexlify => 0x0b,
            Self::Unhexlify => 0x0c,
            Self::Substr { .. } => 0x0d,
            Self::Left(_) => 0x0e,
            Self::Right(_) => 0x0f,
            Self::Xor(_) => 0x10,
            Self::And(_) => 0x11,
            Self::Or(_) => 0x12,
        }
    }

    /// Apply the operation to `msg`, producing a freshly owned output
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::MessageTooShort`] if SUBSTR/LEFT/RIGHT request
    /// bytes beyond `msg`'s length, or [`EvalError::BadHex`] if UNHEXLIFY
    /// is applied to malformed hex.
    pub fn apply(&self, msg: &[u8]) -> EvalResult<Vec<u8>> {
        match self {
            Self::Sha1 => Ok(sha1::Hash::hash(msg).to_byte_array().to_vec()),
            Self::Ripemd160 => Ok(ripemd160::Hash::hash(msg).to_byte_array().to_vec()),
            Self::Sha256 => Ok(sha256::Hash::hash(msg).to_byte_array().to_vec()),
            Self::Keccak256 => {
                let mut hasher = Keccak256::new();
                hasher.update(msg);
                Ok(hasher.finalize().to_vec())
            }
            Self::Append(data) => {
                let mut out = msg.to_vec();
                out.extend_from_slice(data);
                Ok(out)
            }
            Self::Prepend(data) => {
                let mut out = data.clone();
                out.extend_from_slice(msg);
                Ok(out)
            }
            Self::Reverse => Ok(msg.iter().rev().copied().collect()),
            Self::Hexlify => Ok(hex::encode(msg).into_bytes()),
            Self::Unhexlify => {
                let s = std::str::from_utf8(msg).map_err(|_| EvalError::BadHex)?;
                hex::decode(s).map_err(|_| EvalError::BadHex)
            }
            Self::Substr { start, len } => {
                let start = *start as usize;
                let end = if *len == SUBSTR_TO_END {
                    msg.len()
                } else if *len == 0 {
                    return Err(EvalError::ZeroLengthSubstr);
                } else {
                    start.checked_add(*len as usize).ok_or(EvalError::MessageTooShort {
                        needed: usize::MAX,
                        available: msg.len(),
                    })?
                };
                slice_checked(msg, start, end)
            }
            Self::Left(len) => slice_checked(msg, 0, *len as usize),
            Self::Right(len) => {
                let len = *len as usize;
                if len > msg.len() {
                    return Err(EvalError::MessageTooShort { needed: len, available: msg.len() });
                }
                Ok(msg[msg.len() - len..].to_vec())
            }
            Self::Xor(key) => Ok(cycle_apply(msg, key, |a, b| a ^ b)),
            Self::And(key) => Ok(cycle_apply(msg, key, |a, b| a & b)),
            Self::Or(key) => Ok(cycle_apply(msg, key, |a, b| a | b)),
        }
    }

    /// Decode an operation whose tag byte has already been read
    ///
    /// # Errors
    ///
    /// Returns [`OtsError::UnknownOpTag`] for an unrecognized tag, or a
    /// codec error if immediate parameters can't be read.
    pub fn decode(tag: u8, r: &mut Reader<'_>) -> Result<Self> {
        match tag {
            0x02 => Ok(Self::Sha1),
            0x03 => Ok(Self::Ripemd160),
            0x08 => Ok(Self::Sha256),
            0x67 => Ok(Self::Keccak256),
            0xf0 => Ok(Self::Append(r.read_varbytes(MAX_OP_DATA_LEN)?)),
            0xf1 => Ok(Self::Prepend(r.read_varbytes(MAX_OP_DATA_LEN)?)),
            0x0a => Ok(Self::Reverse),
            0x0b => Ok(Self::Hexlify),
            0x0c => Ok(Self::Unhexlify),
            0x0d => {
                let start = r.read_varuint()? as u32;
                let len = r.read_varuint()? as u32;
                Ok(Self::Substr { start, len })
            }
            0x0e => Ok(Self::Left(r.read_varuint()? as u32)),
            0x0f => Ok(Self::Right(r.read_varuint()? as u32)),
            0x10 => Ok(Self::Xor(r.read_varbytes(MAX_OP_DATA_LEN)?)),
            0x11 => Ok(Self::And(r.read_varbytes(MAX_OP_DATA_LEN)?)),
            0x12 => Ok(Self::Or(r.read_varbytes(MAX_OP_DATA_LEN)?)),
            x => Err(OtsError::UnknownOpTag(x)),
        }
    }

    /// Encode the tag byte and any immediate parameters
    pub fn encode(&self, w: &mut Writer) {
        w.write_u8(self.tag());
        match self {
            Self::Append(data) | Self::Prepend(data) => w.write_varbytes(data),
            Self::Substr { start, len } => {
                w.write_varuint(u64::from(*start));
                w.write_varuint(u64::from(*len));
            }
            Self::Left(len) | Self::Right(len) => w.write_varuint(u64::from(*len)),
            Self::Xor(key) | Self::And(key) | Self::Or(key) => w.write_varbytes(key),
            Self::Sha1
            | Self::Ripemd160
            | Self::Sha256
            | Self::Keccak256
            | Self::Reverse
            | Self::Hexlify
            | Self::Unhexlify => {}
        }
    }
}

fn slice_checked(msg: &[u8], start: usize, end: usize) -> EvalResult<Vec<u8>> {
    if end > msg.len() || start > end {
        return Err(EvalError::MessageTooShort {
            needed: end.saturating_sub(start),
            available: msg.len().saturating_sub(start.min(msg.len())),
        });
    }
    Ok(msg[start..end].to_vec())
}

fn cycle_apply(msg: &[u8], key: &[u8], f: impl Fn(u8, u8) -> u8) -> Vec<u8> {
    if key.is_empty() {
        return msg.to_vec();
    }
    msg.iter().enumerate().map(|(i, &b)| f(b, key[i % key.len()])).collect()
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1 => f.write_str("SHA1()"),
            Self::Ripemd160 => f.write_str("RIPEMD160()"),
            Self::Sha256 => f.write_str("SHA256()"),
            Self::Keccak256 => f.write_str("KECCAK256()"),
            Self::Append(data) => write!(f, "Append({})", hex::encode(data)),
            Self::Prepend(data) => write!(f, "Prepend({})", hex::encode(data)),
            Self::Reverse => f.write_str("Reverse()"),
            Self::Hexlify => f.write_str("Hexlify()"),
            Self::Unhexlify => f.write_str("Unhexlify()"),
            Self::Substr { start, len } => write!(f, "Substr({start}, {len})"),
            Self::Left(len) => write!(f, "Left({len})"),
            Self::Right(len) => write!(f, "Right({len})"),
            Self::Xor(key) => write!(f, "Xor({})", hex::encode(key)),
            Self::And(key) => write!(f, "And({})", hex::encode(key)),
            Self::Or(key) => write!(f, "Or({})", hex::encode(key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(op: &Op) -> Op {
        let mut w = Writer::new();
        op.encode(&mut w);
        let buf = w.into_inner();
        let mut r = Reader::new(&buf);
        let tag = r.read_u8().unwrap();
        let decoded = Op::decode(tag, &mut r).unwrap();
        assert!(r.eof());
        decoded
    }

    #[test]
    fn tags_match_protocol_table() {
        assert_eq!(Op::Sha1.tag(), 0x02);
        assert_eq!(Op::Ripemd160.tag(), 0x03);
        assert_eq!(Op::Sha256.tag(), 0x08);
        assert_eq!(Op::Keccak256.tag(), 0x67);
        assert_eq!(Op::Append(vec![]).tag(), 0xf0);
        assert_eq!(Op::Prepend(vec![]).tag(), 0xf1);
        assert_eq!(Op::Reverse.tag(), 0x0a);
        assert_eq!(Op::Hexlify.tag(), 0x0b);
        assert_eq!(Op::Unhexlify.tag(), 0x0c);
        assert_eq!(Op::Substr { start: 0, len: 0 }.tag(), 0x0d);
        assert_eq!(Op::Left(0).tag(), 0x0e);
        assert_eq!(Op::Right(0).tag(), 0x0f);
        assert_eq!(Op::Xor(vec![]).tag(), 0x10);
        assert_eq!(Op::And(vec![]).tag(), 0x11);
        assert_eq!(Op::Or(vec![]).tag(), 0x12);
    }

    #[test]
    fn hash_lengths() {
        assert_eq!(Op::Sha256.apply(b"hello").unwrap().len(), 32);
        assert_eq!(Op::Sha1.apply(b"hello").unwrap().len(), 20);
        assert_eq!(Op::Ripemd160.apply(b"hello").unwrap().len(), 20);
        assert_eq!(Op::Keccak256.apply(b"hello").unwrap().len(), 32);
    }

    #[test]
    fn sha256_known_vector() {
        let got = Op::Sha256.apply(b"hello").unwrap();
        let want = hex::decode("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
            .unwrap();
        assert_eq!(got, want);
    }

    #[test]
    fn append_and_prepend() {
        assert_eq!(Op::Append(vec![1, 2, 3]).apply(b"hello").unwrap(), b"hello\x01\x02\x03");
        assert_eq!(Op::Prepend(vec![1, 2, 3]).apply(b"world").unwrap(), b"\x01\x02\x03world");
    }

    #[test]
    fn reverse_is_involution() {
        let once = Op::Reverse.apply(b"hello").unwrap();
        let twice = Op::Reverse.apply(&once).unwrap();
        assert_eq!(twice, b"hello");
    }

    #[test]
    fn xor_is_involution() {
        let key = vec![0xaa, 0x55];
        let once = Op::Xor(key.clone()).apply(b"hello world").unwrap();
        let twice = Op::Xor(key).apply(&once).unwrap();
        assert_eq!(twice, b"hello world");
    }

    #[test]
    fn hexlify_and_unhexlify_round_trip() {
        let data = b"\x01\x02\x03\xff";
        let hexed = Op::Hexlify.apply(data).unwrap();
        assert_eq!(hexed, b"010203ff");
        let back = Op::Unhexlify.apply(&hexed).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn unhexlify_bad_hex_errors() {
        assert_eq!(Op::Unhexlify.apply(b"xyz").unwrap_err(), EvalError::BadHex);
        assert_eq!(Op::Unhexlify.apply(b"abc").unwrap_err(), EvalError::BadHex); // odd length
    }

    #[test]
    fn substr_basic() {
        let out = Op::Substr { start: 1, len: 3 }.apply(b"hello").unwrap();
        assert_eq!(out, b"ell");
    }

    #[test]
    fn substr_to_end_sentinel() {
        let out = Op::Substr { start: 2, len: SUBSTR_TO_END }.apply(b"hello").unwrap();
        assert_eq!(out, b"llo");
    }

    #[test]
    fn substr_zero_len_errors() {
        let err = Op::Substr { start: 2, len: 0 }.apply(b"hello").unwrap_err();
        assert_eq!(err, EvalError::ZeroLengthSubstr);
    }

    #[test]
    fn left_and_right() {
        assert_eq!(Op::Left(3).apply(b"hello").unwrap(), b"hel");
        assert_eq!(Op::Right(3).apply(b"hello").unwrap(), b"llo");
    }

    #[test]
    fn left_too_long_errors() {
        let err = Op::Left(10).apply(b"hi").unwrap_err();
        assert!(matches!(err, EvalError::MessageTooShort { .. }));
    }

    #[test]
    fn right_too_long_errors() {
        let err = Op::Right(10).apply(b"hi").unwrap_err();
        assert!(matches!(err, EvalError::MessageTooShort { .. }));
    }

    #[test]
    fn substr_out_of_range_errors() {
        let err = Op::Substr { start: 10, len: 5 }.apply(b"hi").unwrap_err();
        assert!(matches!(err, EvalError::MessageTooShort { .. }));
    }

    #[test]
    fn and_or_cycle_key() {
        let msg = [0xffu8, 0x00, 0xff];
        let key = vec![0x0f];
        assert_eq!(Op::And(key.clone()).apply(&msg).unwrap(), vec![0x0f, 0x00, 0x0f]);
        assert_eq!(Op::Or(key).apply(&msg).unwrap(), vec![0xff, 0x0f, 0xff]);
    }

    #[test]
    fn empty_key_is_identity() {
        let msg = b"hello";
        assert_eq!(Op::Xor(vec![]).apply(msg).unwrap(), msg);
    }

    #[test]
    fn round_trip_all_unary_ops() {
        for op in [
            Op::Sha1,
            Op::Ripemd160,
            Op::Sha256,
            Op::Keccak256,
            Op::Reverse,
            Op::Hexlify,
            Op::Unhexlify,
        ] {
            assert_eq!(round_trip(&op), op);
        }
    }

    #[test]
    fn round_trip_parametrized_ops() {
        let ops = vec![
            Op::Append(vec![0xaa, 0xbb]),
            Op::Prepend(vec![1, 2, 3]),
            Op::Substr { start: 5, len: SUBSTR_TO_END },
            Op::Substr { start: 0, len: 10 },
            Op::Left(7),
            Op::Right(7),
            Op::Xor(vec![0xff]),
            Op::And(vec![0x0f, 0xf0]),
            Op::Or(vec![0x01]),
        ];
        for op in ops {
            assert_eq!(round_trip(&op), op);
        }
    }

    #[test]
    fn decode_unknown_tag_errors() {
        let buf: &[u8] = &[];
        let mut r = Reader::new(buf);
        assert!(matches!(Op::decode(0xAB, &mut r), Err(OtsError::UnknownOpTag(0xAB))));
    }

    #[test]
    fn append_data_over_max_rejected() {
        let mut w = Writer::new();
        w.write_varbytes(&vec![0u8; MAX_OP_DATA_LEN + 1]);
        let buf = w.into_inner();
        let mut r = Reader::new(&buf);
        let err = Op::decode(0xf0, &mut r).unwrap_err();
        assert!(matches!(err, OtsError::BodyTooLong { .. }));
    }

    #[test]
    fn display_formats() {
        assert_eq!(format!("{}", Op::Sha256), "SHA256()");
        assert_eq!(format!("{}", Op::Append(vec![1, 2])), "Append(0102)");
        assert_eq!(format!("{}", Op::Left(4)), "Left(4)");
    }
}

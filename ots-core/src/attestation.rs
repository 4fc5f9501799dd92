//! Attestations: typed anchors a commitment can be verified against
//!
//! Every variant carries a one-byte wire tag and a varuint length-prefixed
//! body, so a reader that doesn't recognize a future tag can still skip
//! past it (the actual skip path lives in [`crate::codec`] — an unknown
//! tag never becomes a value of this enum).

use std::fmt;

use super::bytes::{Reader, Writer};
use super::error::{OtsError, Result, MAX_URI_LEN};

/// Bitcoin block-header attestation
pub const TAG_BITCOIN: u8 = 0x08;
/// Pending calendar attestation
pub const TAG_PENDING: u8 = 0x09;
/// Ethereum transaction attestation
pub const TAG_ETHEREUM: u8 = 0x20;
/// Litecoin block-header attestation
pub const TAG_LITECOIN: u8 = 0x30;

const MAX_BLOCKHEIGHT_BODY: usize = 16;
const ETHEREUM_BODY_LEN: usize = 40; // 32-byte tx hash + up to 8-byte varuint block number, capped below

/// A claim that some message existed at some point, anchored to an external system
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Attestation {
    /// Anchored in the Bitcoin block at `height`
    Bitcoin {
        /// Bitcoin block height
        height: u64,
    },
    /// Anchored in the Litecoin block at `height`
    Litecoin {
        /// Litecoin block height
        height: u64,
    },
    /// Anchored in an Ethereum transaction's input data
    Ethereum {
        /// Transaction hash, 32 raw bytes, no length prefix
        tx_hash: [u8; 32],
        /// Block the transaction was mined in
        block_number: u64,
    },
    /// A calendar's promise to anchor this commitment later
    Pending {
        /// The calendar's upgrade URI
        uri: String,
    },
}

impl Attestation {
    /// The one-byte tag identifying this attestation on the wire
    #[must_use]
    pub fn tag(&self) -> u8 {
        match self {
            Self::Bitcoin { .. } => TAG_BITCOIN,
            Self::Litecoin { .. } => TAG_LITECOIN,
            Self::Ethereum { .. } => TAG_ETHEREUM,
            Self::Pending { .. } => TAG_PENDING,
        }
    }

    /// Decode an attestation whose tag byte has already been read
    ///
    /// # Errors
    ///
    /// Returns [`OtsError::UnknownAttestationTag`] for an unrecognized tag,
    /// or a codec error if the body is malformed.
    pub fn decode(tag: u8, r: &mut Reader<'_>) -> Result<Self> {
        match tag {
            TAG_BITCOIN => {
                let body = r.read_varbytes(MAX_BLOCKHEIGHT_BODY)?;
                let mut br = Reader::new(&body);
                let height = br.read_varuint()?;
                br.expect_eof()?;
                Ok(Self::Bitcoin { height })
            }
            TAG_LITECOIN => {
                let body = r.read_varbytes(MAX_BLOCKHEIGHT_BODY)?;
                let mut br = Reader::new(&body);
                let height = br.read_varuint()?;
                br.expect_eof()?;
                Ok(Self::Litecoin { height })
            }
            TAG_ETHEREUM => {
                let body = r.read_varbytes(ETHEREUM_BODY_LEN)?;
                let mut br = Reader::new(&body);
                let tx_hash_vec = br.read_bytes(32)?;
                let block_number = br.read_varuint()?;
                br.expect_eof()?;
                let mut tx_hash = [0u8; 32];
                tx_hash.copy_from_slice(&tx_hash_vec);
                Ok(Self::Ethereum { tx_hash, block_number })
            }
            TAG_PENDING => {
                let body = r.read_varbytes(MAX_URI_LEN)?;
                let uri = String::from_utf8(body)?;
                for ch in uri.chars() {
                    match ch {
                        'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' | '/' | ':' => {}
                        x => return Err(OtsError::InvalidUriChar(x)),
                    }
                }
                Ok(Self::Pending { uri })
            }
            x => Err(OtsError::UnknownAttestationTag(x)),
        }
    }

    /// Encode the tag byte and length-prefixed body
    pub fn encode(&self, w: &mut Writer) {
        w.write_u8(self.tag());
        let mut body = Writer::new();
        match self {
            Self::Bitcoin { height } | Self::Litecoin { height } => {
                body.write_varuint(*height);
            }
            Self::Ethereum { tx_hash, block_number } => {
                body.write_bytes(tx_hash);
                body.write_varuint(*block_number);
            }
            Self::Pending { uri } => {
                body.write_bytes(uri.as_bytes());
            }
        }
        w.write_varbytes(&body.into_inner());
    }

    /// The consensus weight this attestation's chain contributes when `Verified`
    #[must_use]
    pub fn weight(&self) -> f64 {
        match self {
            Self::Bitcoin { .. } => 1.0,
            Self::Litecoin { .. } => 0.8,
            Self::Ethereum { .. } => 0.7,
            Self::Pending { .. } => 0.1,
        }
    }
}

impl fmt::Display for Attestation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bitcoin { height } => write!(f, "Bitcoin block {height}"),
            Self::Litecoin { height } => write!(f, "Litecoin block {height}"),
            Self::Ethereum { tx_hash, block_number } => {
                write!(f, "Ethereum tx {} (block {block_number})", hex::encode(tx_hash))
            }
            Self::Pending { uri } => write!(f, "Pending: update URI {uri}"),
        }
    }
}

/// Why an attestation failed verification
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum FailureReason {
    /// The commitment wasn't found where the attestation claimed it would be
    CommitmentNotFound,
    /// The named block/transaction doesn't exist on the chain
    AnchorNotFound,
    /// The calendar reported the commitment was never submitted
    NotRecognizedByCalendar,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommitmentNotFound => f.write_str("commitment not found in anchor"),
            Self::AnchorNotFound => f.write_str("anchor not found"),
            Self::NotRecognizedByCalendar => f.write_str("calendar does not recognize commitment"),
        }
    }
}

/// The outcome of checking one attestation against its anchor
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum AttestationVerdict {
    /// The commitment was found in the claimed anchor
    Verified {
        /// The anchor's timestamp, if known
        anchor_time: Option<u64>,
        /// A human-readable identifier for the anchor (block hash, tx id, ...)
        anchor_id: String,
        /// Whether the commitment was found in the canonical commitment slot
        /// (coinbase OP_RETURN) rather than merely somewhere in the anchor bytes
        canonical_slot: bool,
    },
    /// Only meaningful for `Pending`: the calendar hasn't anchored it yet
    Pending {
        /// Where to check again later
        upgrade_hint: String,
    },
    /// The fetch succeeded but the commitment wasn't where it should be
    Failed {
        /// Why verification failed
        reason: FailureReason,
    },
    /// The fetch itself failed (network, rate limit, unreachable node)
    Unknown {
        /// Description of the fetch failure; caller may retry
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(a: &Attestation) -> Attestation {
        let mut w = Writer::new();
        a.encode(&mut w);
        let buf = w.into_inner();
        let mut r = Reader::new(&buf);
        let tag = r.read_u8().unwrap();
        let decoded = Attestation::decode(tag, &mut r).unwrap();
        assert!(r.eof());
        decoded
    }

    #[test]
    fn tags_match_protocol_table() {
        assert_eq!(Attestation::Bitcoin { height: 1 }.tag(), 0x08);
        assert_eq!(Attestation::Pending { uri: String::new() }.tag(), 0x09);
        assert_eq!(
            Attestation::Ethereum { tx_hash: [0; 32], block_number: 0 }.tag(),
            0x20
        );
        assert_eq!(Attestation::Litecoin { height: 1 }.tag(), 0x30);
    }

    #[test]
    fn round_trip_bitcoin() {
        let a = Attestation::Bitcoin { height: 800_000 };
        assert_eq!(round_trip(&a), a);
    }

    #[test]
    fn round_trip_litecoin() {
        let a = Attestation::Litecoin { height: 2_500_000 };
        assert_eq!(round_trip(&a), a);
    }

    #[test]
    fn round_trip_ethereum() {
        let a = Attestation::Ethereum { tx_hash: [0xab; 32], block_number: 18_000_000 };
        assert_eq!(round_trip(&a), a);
    }

    #[test]
    fn round_trip_pending() {
        let a = Attestation::Pending {
            uri: "https://alice.btc.calendar.opentimestamps.org".to_string(),
        };
        assert_eq!(round_trip(&a), a);
    }

    #[test]
    fn pending_rejects_invalid_uri_char() {
        let mut w = Writer::new();
        let mut body = Writer::new();
        body.write_bytes(b"https://x.com/$bad");
        w.write_varbytes(&body.into_inner());
        let buf = w.into_inner();
        let mut r = Reader::new(&buf);
        let err = Attestation::decode(TAG_PENDING, &mut r).unwrap_err();
        assert!(matches!(err, OtsError::InvalidUriChar('$')));
    }

    #[test]
    fn pending_accepts_empty_uri() {
        let a = Attestation::Pending { uri: String::new() };
        assert_eq!(round_trip(&a), a);
    }

    #[test]
    fn decode_unknown_tag_errors() {
        let buf: &[u8] = &[];
        let mut r = Reader::new(buf);
        assert!(matches!(
            Attestation::decode(0x99, &mut r),
            Err(OtsError::UnknownAttestationTag(0x99))
        ));
    }

    #[test]
    fn weights_match_consensus_table() {
        assert_eq!(Attestation::Bitcoin { height: 0 }.weight(), 1.0);
        assert_eq!(Attestation::Litecoin { height: 0 }.weight(), 0.8);
        assert_eq!(
            Attestation::Ethereum { tx_hash: [0; 32], block_number: 0 }.weight(),
            0.7
        );
        assert_eq!(Attestation::Pending { uri: String::new() }.weight(), 0.1);
    }

    #[test]
    fn display_formats() {
        assert_eq!(format!("{}", Attestation::Bitcoin { height: 100 }), "Bitcoin block 100");
        assert_eq!(
            format!("{}", Attestation::Pending { uri: "https://x".to_string() }),
            "Pending: update URI https://x"
        );
    }
}

//! Tree grammar, detached/attached file envelopes
//!
//! Wire grammar for a single tree node, read at that node's message:
//!
//! ```text
//! Node := (0x00 OpTag OpBody Node | AttestationTag AttestationBody | 0xF1 SkipBody)* 0xF0
//! ```
//!
//! `0x00` introduces an operation (its literal tag byte follows, not
//! varuint-encoded); `0xF0` terminates the node; `0xF1` marks a future
//! attestation type this reader doesn't know, whose body is a
//! varuint-length-prefixed blob to discard. Any other byte at node-start
//! position is an attestation tag read directly — tag `0x08`
//! is shared between the SHA256 operation and the Bitcoin attestation;
//! disambiguation is purely positional; this implementation must not
//! attempt to unify them into a single tag space.

use bitcoin_hashes::{sha256, Hash};

use super::attestation::Attestation;
use super::bytes::{Reader, Writer};
use super::error::{EvalError, EvalResult, OtsError, Result, RECURSION_LIMIT};
use super::op::Op;
use super::tree::TimestampTree;

const OP_INTRODUCER: u8 = 0x00;
const TERMINATOR: u8 = 0xf0;
const SKIP_MARKER: u8 = 0xf1;
const MAX_SKIP_LEN: usize = 65_536;

/// Magic bytes every envelope starts with: `0x00 "OpenTimestamps" 0x00`
pub const MAGIC: &[u8] = b"\x00OpenTimestamps\x00";
/// Legacy envelope version: no privacy nonce
pub const VERSION_LEGACY: u8 = 0x00;
/// Envelope version carrying a privacy nonce
pub const VERSION_NONCE: u8 = 0x01;

fn decode_node(r: &mut Reader<'_>, recursion_limit: usize) -> Result<TimestampTree> {
    let mut node = TimestampTree::leaf();
    loop {
        let selector = r.read_u8()?;
        match selector {
            TERMINATOR => break,
            OP_INTRODUCER => {
                if recursion_limit == 0 {
                    return Err(OtsError::StackOverflow);
                }
                let op_tag = r.read_u8()?;
                let op = Op::decode(op_tag, r)?;
                let child = decode_node(r, recursion_limit - 1)?;
                node.ops.push((op, Box::new(child)));
            }
            SKIP_MARKER => {
                r.read_varbytes(MAX_SKIP_LEN)?;
            }
            tag => {
                node.attestations.push(Attestation::decode(tag, r)?);
            }
        }
    }
    Ok(node)
}

fn encode_node(node: &TimestampTree, w: &mut Writer) {
    for attestation in &node.attestations {
        attestation.encode(w);
    }
    for (op, child) in &node.ops {
        w.write_u8(OP_INTRODUCER);
        op.encode(w);
        encode_node(child, w);
    }
    w.write_u8(TERMINATOR);
}

impl TimestampTree {
    /// Decode a tree from its wire grammar, starting at the tree's root node
    ///
    /// # Errors
    ///
    /// Returns [`OtsError::StackOverflow`] past [`RECURSION_LIMIT`] nested
    /// operations, or any other codec error for malformed bytes.
    pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
        decode_node(r, RECURSION_LIMIT)
    }

    /// Encode this tree into `w` following the wire grammar
    pub fn encode(&self, w: &mut Writer) {
        encode_node(self, w);
    }
}

/// A standalone `.ots` file: the envelope plus the proof tree
///
/// The envelope stores the document's raw SHA256 digest right after the
/// nonce (if any) and before the tree. A literal envelope without this
/// field would leave a `CommitmentMismatch` check with nothing stored to
/// compare a presented document against. This crate carries the digest
/// explicitly, the way the original OpenTimestamps format does, and
/// documents that layout choice in DESIGN.md.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DetachedTimestampFile {
    /// Privacy nonce generated at stamp time, if this envelope carries one
    pub nonce: Option<[u8; 16]>,
    /// SHA256 digest of the original document, before any nonce is prepended
    pub digest: [u8; 32],
    /// The proof tree, rooted at the commitment `nonce ‖ digest` (or just
    /// `digest` when `nonce` is `None`)
    pub tree: TimestampTree,
}

impl DetachedTimestampFile {
    /// The commitment this file's tree is rooted at
    #[must_use]
    pub fn commitment(&self) -> Vec<u8> {
        match &self.nonce {
            Some(nonce) => {
                let mut out = nonce.to_vec();
                out.extend_from_slice(&self.digest);
                out
            }
            None => self.digest.to_vec(),
        }
    }

    /// Check a presented document against the stored digest before any
    /// attestation is fetched
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::CommitmentMismatch`] if the document's SHA256
    /// digest doesn't match the one this file was stamped against.
    pub fn check_commitment(&self, document: &[u8]) -> EvalResult<()> {
        let actual = sha256::Hash::hash(document).to_byte_array();
        if actual == self.digest {
            Ok(())
        } else {
            Err(EvalError::CommitmentMismatch)
        }
    }

    /// Parse a detached timestamp file from its raw bytes
    ///
    /// # Errors
    ///
    /// Returns [`OtsError::BadMagic`] if the magic bytes don't match,
    /// [`OtsError::UnknownVersion`] for a version outside `{0, 1}`, or
    /// [`OtsError::TrailingBytes`] if bytes remain after the tree.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let mut r = Reader::new(buf);
        let magic = r.read_bytes(MAGIC.len())?;
        if magic != MAGIC {
            return Err(OtsError::BadMagic);
        }
        let version = r.read_u8()?;
        let nonce = match version {
            VERSION_LEGACY => None,
            VERSION_NONCE => {
                let len = r.read_u8()? as usize;
                let bytes = r.read_bytes(len)?;
                let mut nonce = [0u8; 16];
                if len == 16 {
                    nonce.copy_from_slice(&bytes);
                    Some(nonce)
                } else {
                    return Err(OtsError::BodyTooLong { max: 16, got: len });
                }
            }
            v => return Err(OtsError::UnknownVersion(v)),
        };
        let digest_vec = r.read_bytes(32)?;
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&digest_vec);
        let tree = TimestampTree::decode(&mut r)?;
        r.expect_eof()?;
        Ok(Self { nonce, digest, tree })
    }

    /// Serialize this file to its raw byte representation
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_bytes(MAGIC);
        match &self.nonce {
            Some(nonce) => {
                w.write_u8(VERSION_NONCE);
                w.write_u8(nonce.len() as u8);
                w.write_bytes(nonce);
            }
            None => w.write_u8(VERSION_LEGACY),
        }
        w.write_bytes(&self.digest);
        self.tree.encode(&mut w);
        w.into_inner()
    }
}

/// A file carrying the original document bytes followed by the envelope
///
/// The document and the envelope share one byte stream; the magic bytes
/// are searched for at the trailing position to split the two.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AttachedTimestampFile {
    /// The original document's bytes
    pub document: Vec<u8>,
    /// The envelope following the document
    pub detached: DetachedTimestampFile,
}

impl AttachedTimestampFile {
    /// Split `buf` into document bytes and envelope at the last occurrence of [`MAGIC`]
    ///
    /// # Errors
    ///
    /// Returns [`OtsError::BadMagic`] if the magic bytes never occur.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let split = find_last(buf, MAGIC).ok_or(OtsError::BadMagic)?;
        let document = buf[..split].to_vec();
        let detached = DetachedTimestampFile::from_bytes(&buf[split..])?;
        Ok(Self { document, detached })
    }

    /// Reassemble the document bytes followed by the serialized envelope
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.document.clone();
        out.extend(self.detached.to_bytes());
        out
    }
}

fn find_last(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).rev().find(|&i| &haystack[i..i + needle.len()] == needle)
}

//! `ots-core`: the OpenTimestamps proof engine
//!
//! This crate owns the data model (a [`tree::TimestampTree`] built from
//! [`op::Op`]s and [`attestation::Attestation`]s), the wire [`codec`], the
//! pure [`evaluator`], and the collaborator-trait-based [`verifier`] and
//! [`consensus`] scorer built on top of it. It performs no process I/O
//! itself — every external call (a chain lookup, a calendar fetch, the
//! clock, a cache) goes through a trait in [`collaborators`], implemented
//! by the `ots-cli` binary crate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod attestation;
pub mod bytes;
pub mod codec;
pub mod collaborators;
pub mod consensus;
pub mod error;
pub mod evaluator;
pub mod op;
pub mod tree;
pub mod verifier;

pub use attestation::{Attestation, AttestationVerdict, FailureReason};
pub use codec::{AttachedTimestampFile, DetachedTimestampFile};
pub use consensus::{ConsensusReport, SecurityLevel, TimeConsistency};
pub use error::{EvalError, EvalResult, OtsError, Result};
pub use evaluator::{evaluate, EvaluatedAttestation};
pub use op::Op;
pub use tree::TimestampTree;
pub use verifier::{verify_attestation, verify_detached, VerifyContext, VerifyOutcome};

//! Merkle-path evaluator: rewrites a leaf message under every path to every
//! attestation

use super::attestation::Attestation;
use super::error::EvalResult;
use super::tree::TimestampTree;

/// One `(evaluated_msg, attestation)` pair reachable from a tree's root
pub type EvaluatedAttestation = (Vec<u8>, Attestation);

/// Walk `tree`, rewriting `msg` under each operation, collecting every
/// attestation reached along with the message it applies to
///
/// The function is pure and never mutates `tree`. Ordering is determined
/// entirely by `tree`: a node's own attestations are emitted before its
/// children are visited, and children are visited in `ops` order.
///
/// # Errors
///
/// Propagates the first [`crate::error::EvalError`] raised by an operation
/// along any path (e.g. a SUBSTR requesting bytes beyond the message).
pub fn evaluate(tree: &TimestampTree, msg: &[u8]) -> EvalResult<Vec<EvaluatedAttestation>> {
    let mut out = Vec::new();
    evaluate_into(tree, msg, &mut out)?;
    Ok(out)
}

fn evaluate_into(
    tree: &TimestampTree,
    msg: &[u8],
    out: &mut Vec<EvaluatedAttestation>,
) -> EvalResult<()> {
    for attestation in &tree.attestations {
        out.push((msg.to_vec(), attestation.clone()));
    }
    for (op, child) in &tree.ops {
        let next_msg = op.apply(msg)?;
        evaluate_into(child, &next_msg, out)?;
    }
    Ok(())
}

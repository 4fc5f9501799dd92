//! The timestamp tree: the recursive proof structure itself
//!
//! A node owns a set of attestations that apply to its message, plus an
//! ordered list of `(operation, child)` pairs — the child's message is
//! `operation.apply(this node's message)`. There are no parent pointers;
//! every algorithm here recurses top-down carrying the message along.

use super::attestation::Attestation;
use super::op::Op;

/// One node of a timestamp tree
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct TimestampTree {
    /// Attestations that apply to this node's message
    pub attestations: Vec<Attestation>,
    /// Operations leading to child nodes, in insertion order
    pub ops: Vec<(Op, Box<TimestampTree>)>,
}

impl TimestampTree {
    /// An empty leaf: no attestations, no further operations
    #[must_use]
    pub fn leaf() -> Self {
        Self::default()
    }

    /// True if this node (and everything below it) carries no attestations
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attestations.is_empty() && self.ops.iter().all(|(_, c)| c.is_empty())
    }

    /// Merge `other`, which must describe the same message as `self`, into `self`
    ///
    /// Attestations are unioned (deduped by equality, which for well-formed
    /// values coincides with equal encodings). Operations are matched by
    /// equality and merged recursively; unmatched operations from `other`
    /// are appended, preserving insertion order.
    pub fn merge(&mut self, other: Self) {
        for attestation in other.attestations {
            if !self.attestations.contains(&attestation) {
                self.attestations.push(attestation);
            }
        }
        for (op, child) in other.ops {
            if let Some((_, existing)) = self.ops.iter_mut().find(|(existing_op, _)| *existing_op == op) {
                existing.merge(*child);
            } else {
                self.ops.push((op, child));
            }
        }
    }

    /// Visit every node in the tree, passing the message that applies at it
    ///
    /// `msg` is the message at `self`. Children are visited with their
    /// message computed by applying the connecting operation; a child
    /// whose operation fails to apply (e.g. a SUBSTR out of range) is
    /// skipped rather than panicking.
    pub fn walk<F: FnMut(&[u8], &TimestampTree)>(&self, msg: &[u8], f: &mut F) {
        f(msg, self);
        for (op, child) in &self.ops {
            if let Ok(next_msg) = op.apply(msg) {
                child.walk(&next_msg, f);
            }
        }
    }

    /// Mutable counterpart of [`Self::walk`], used by calendar upgrade logic
    /// to locate and replace pending attestations in place.
    pub fn walk_mut<F: FnMut(&[u8], &mut TimestampTree)>(&mut self, msg: &[u8], f: &mut F) {
        f(msg, self);
        for (op, child) in &mut self.ops {
            if let Ok(next_msg) = op.apply(msg) {
                child.walk_mut(&next_msg, f);
            }
        }
    }

    /// Count of nodes in the tree, including `self`
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.ops.iter().map(|(_, c)| c.node_count()).sum::<usize>()
    }
}

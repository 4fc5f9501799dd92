//! `ots info`: print a timestamp file's digest, nonce, and attestations
//! without contacting any collaborator

use std::path::Path;

use ots_core::codec::DetachedTimestampFile;
use ots_core::evaluate;
use ots_core::op::Op;
use ots_core::tree::TimestampTree;

use crate::error::Result;

/// Print a summary of `file`'s envelope and reachable attestations
///
/// With `detailed`, also prints the full operation tree.
///
/// # Errors
///
/// Returns an error if `file` can't be read or parsed as a detached
/// timestamp.
pub fn execute(file: &Path, detailed: bool) -> Result<()> {
    let raw = std::fs::read(file)?;
    let detached = DetachedTimestampFile::from_bytes(&raw)?;

    println!("File:       {}", file.display());
    println!("Digest:     {}", hex::encode(detached.digest));
    match &detached.nonce {
        Some(nonce) => println!("Nonce:      {}", hex::encode(nonce)),
        None => println!("Nonce:      (none, legacy envelope)"),
    }
    println!("Commitment: {}", hex::encode(detached.commitment()));
    println!("Tree nodes: {}", detached.tree.node_count());

    let commitment = detached.commitment();
    match evaluate(&detached.tree, &commitment) {
        Ok(reached) if reached.is_empty() => println!("Attestations: none (still to be submitted, or empty proof)"),
        Ok(reached) => {
            println!("Attestations:");
            for (_, attestation) in &reached {
                println!("  - {attestation}");
            }
        }
        Err(e) => println!("Attestations: could not evaluate tree ({e})"),
    }

    if detailed {
        println!();
        println!("Tree:");
        print_node(&detached.tree, 1);
    }

    Ok(())
}

fn print_node(node: &TimestampTree, depth: usize) {
    let indent = "  ".repeat(depth);
    for attestation in &node.attestations {
        println!("{indent}- attestation: {attestation}");
    }
    for (op, child) in &node.ops {
        println!("{indent}- {op}");
        print_node(child, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ots_core::attestation::Attestation;

    #[test]
    fn print_node_does_not_panic_on_empty_tree() {
        print_node(&TimestampTree::leaf(), 0);
    }

    #[test]
    fn print_node_does_not_panic_with_attestations_and_ops() {
        let mut child = TimestampTree::leaf();
        child.attestations.push(Attestation::Bitcoin { height: 1 });
        let mut root = TimestampTree::leaf();
        root.ops.push((Op::Sha256, Box::new(child)));
        print_node(&root, 0);
    }
}

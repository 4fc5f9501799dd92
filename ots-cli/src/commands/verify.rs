//! `ots verify`: check a timestamp's commitment and attestations, printing
//! a full breakdown of every chain reached

use std::path::Path;

use ots_core::attestation::{Attestation, AttestationVerdict};

use crate::config::Config;
use crate::error::Result;
use crate::verifier::Collaborators;

/// Verify `file` (a detached `.ots` proof or an attached file) against its
/// target document, printing a per-attestation breakdown and the overall
/// consensus verdict
///
/// # Errors
///
/// Returns an error if the files can't be read, the proof can't be parsed,
/// or the document's digest doesn't match the stored commitment.
///
/// Returns `Ok(true)` if the timestamp is `overall_valid`, `Ok(false)` otherwise.
pub async fn execute(file: &Path, target: Option<&Path>, config: &Config) -> Result<bool> {
    let raw = std::fs::read(file)?;
    let (detached, document) = super::load_detached_and_document(file, target, &raw)?;

    let collaborators = Collaborators::new(config)?;
    let ctx = collaborators.context(config.min_score);

    let outcome = ots_core::verifier::verify_detached(&detached, &document, &ctx).await?;

    println!("Verifying {}", file.display());
    if outcome.verdicts.is_empty() {
        println!("  no attestations reachable in this timestamp");
    }
    for (_, attestation, verdict) in &outcome.verdicts {
        print_verdict(attestation, verdict);
    }

    println!();
    println!("Score:              {:.2}", outcome.report.score);
    println!("Distinct chains:     {}", outcome.report.distinct_verified_chains);
    println!("Security level:      {}", outcome.report.security_level);
    println!("Time consistency:    {}", outcome.report.time_consistency);
    println!("Overall valid:       {}", outcome.report.overall_valid);

    Ok(outcome.report.overall_valid)
}

fn format_unix_time(secs: u64) -> String {
    chrono::DateTime::from_timestamp(secs as i64, 0)
        .map_or_else(|| "unknown".to_string(), |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

fn print_verdict(attestation: &Attestation, verdict: &AttestationVerdict) {
    match verdict {
        AttestationVerdict::Verified { anchor_time, anchor_id, canonical_slot } => {
            let slot = if *canonical_slot { "canonical slot" } else { "raw bytes, non-canonical" };
            let time = anchor_time.map_or_else(|| "unknown".to_string(), format_unix_time);
            println!("  [verified]  {attestation} -- anchor {anchor_id} ({slot}), time {time}");
        }
        AttestationVerdict::Pending { upgrade_hint } => {
            println!("  [pending]   {attestation} -- check again at {upgrade_hint}");
        }
        AttestationVerdict::Failed { reason } => {
            println!("  [failed]    {attestation} -- {reason}");
        }
        AttestationVerdict::Unknown { reason } => {
            println!("  [unknown]   {attestation} -- {reason}");
        }
    }
}

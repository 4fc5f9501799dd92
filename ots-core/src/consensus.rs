//! Weighted confidence scoring across a timestamp's attestation verdicts
//!
//! A timestamp can carry several attestations (a Bitcoin anchor, a Litecoin
//! anchor, a still-pending calendar promise...). The consensus scorer turns
//! the per-attestation [`AttestationVerdict`]s collected during evaluation
//! into one security level and one time-consistency judgment, so a caller
//! doesn't have to reason about the individual chains itself.

use std::fmt;

use super::attestation::AttestationVerdict;

/// How confident the aggregated evidence is
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SecurityLevel {
    /// At least two distinct chains verified and the combined score is high
    Strong,
    /// At least one chain verified with a reasonable combined score
    Moderate,
    /// Some evidence, but too thin to call moderate
    Weak,
    /// No verified attestation at all
    None,
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strong => "strong",
            Self::Moderate => "moderate",
            Self::Weak => "weak",
            Self::None => "none",
        })
    }
}

/// How well the verified anchors' timestamps agree with each other
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimeConsistency {
    /// Every verified anchor's time falls within two hours of the others
    Consistent,
    /// Anchors agree within four hours but not two
    ModeratelyConsistent,
    /// Anchors disagree by more than four hours, or there's nothing to compare
    Inconsistent,
    /// Fewer than two verified anchors carried a known time
    NotApplicable,
}

impl fmt::Display for TimeConsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Consistent => "consistent",
            Self::ModeratelyConsistent => "moderately consistent",
            Self::Inconsistent => "inconsistent",
            Self::NotApplicable => "not applicable",
        })
    }
}

const CONSISTENT_WINDOW_SECS: u64 = 7_200;
const MODERATE_WINDOW_SECS: u64 = 14_400;

/// Default minimum combined score for a timestamp to be considered valid overall
pub const DEFAULT_MIN_SCORE: f64 = 0.6;

/// The result of scoring one timestamp's full set of attestation verdicts
#[derive(Clone, PartialEq, Debug)]
pub struct ConsensusReport {
    /// Sum of verified chains' weights, halved for non-canonical-slot matches
    pub score: f64,
    /// Number of distinct chains (by attestation kind) that verified
    pub distinct_verified_chains: usize,
    /// Derived security level
    pub security_level: SecurityLevel,
    /// Agreement between verified anchors' timestamps
    pub time_consistency: TimeConsistency,
    /// True if Merkle evaluation succeeded, at least one chain verified, and
    /// `score` meets the configured minimum
    pub overall_valid: bool,
}

/// One verdict plus the chain weight and canonical-slot flag used to score it
pub struct ScoredVerdict<'a> {
    /// The verdict itself
    pub verdict: &'a AttestationVerdict,
    /// The owning attestation's consensus weight
    pub weight: f64,
    /// A label identifying the chain this verdict came from, used to count
    /// distinct verified chains (e.g. `"bitcoin"`, `"litecoin"`)
    pub chain: &'static str,
}

/// Score a set of attestation verdicts into one [`ConsensusReport`]
///
/// `evaluation_succeeded` should be `false` if the Merkle path for this
/// timestamp failed to evaluate at all; in that case the report is always
/// invalid regardless of any verdicts collected so far.
#[must_use]
pub fn score(
    verdicts: &[ScoredVerdict<'_>],
    evaluation_succeeded: bool,
    min_score: f64,
) -> ConsensusReport {
    let mut total_score = 0.0;
    let mut verified_chains = std::collections::HashSet::new();
    let mut anchor_times = Vec::new();

    for sv in verdicts {
        if let AttestationVerdict::Verified { anchor_time, canonical_slot, .. } = sv.verdict {
            let factor = if *canonical_slot { 1.0 } else { 0.5 };
            total_score += sv.weight * factor;
            verified_chains.insert(sv.chain);
            if let Some(t) = anchor_time {
                anchor_times.push(*t);
            }
        }
    }

    let distinct_verified_chains = verified_chains.len();

    let security_level = if distinct_verified_chains == 0 {
        SecurityLevel::None
    } else if distinct_verified_chains >= 2 && total_score >= 0.8 {
        SecurityLevel::Strong
    } else if distinct_verified_chains >= 1 && total_score >= 0.6 {
        SecurityLevel::Moderate
    } else if total_score >= 0.3 {
        SecurityLevel::Weak
    } else {
        SecurityLevel::None
    };

    let time_consistency = time_consistency(&anchor_times);

    let overall_valid = evaluation_succeeded && distinct_verified_chains >= 1 && total_score >= min_score;

    ConsensusReport {
        score: total_score,
        distinct_verified_chains,
        security_level,
        time_consistency,
        overall_valid,
    }
}

fn time_consistency(times: &[u64]) -> TimeConsistency {
    if times.len() < 2 {
        return TimeConsistency::NotApplicable;
    }
    let min = *times.iter().min().unwrap();
    let max = *times.iter().max().unwrap();
    let spread = max - min;
    if spread <= CONSISTENT_WINDOW_SECS {
        TimeConsistency::Consistent
    } else if spread <= MODERATE_WINDOW_SECS {
        TimeConsistency::ModeratelyConsistent
    } else {
        TimeConsistency::Inconsistent
    }
}

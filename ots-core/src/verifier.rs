//! Attestation verification and whole-timestamp orchestration
//!
//! [`verify_attestation`] checks one attestation against its chain or
//! calendar collaborator. [`verify_detached`] ties the whole pipeline
//! together: commitment check, Merkle evaluation, per-attestation
//! verification, and consensus scoring, short-circuiting on a commitment
//! mismatch before any collaborator is ever called.

use super::attestation::{Attestation, AttestationVerdict, FailureReason};
use super::codec::DetachedTimestampFile;
use super::collaborators::{Calendar, ChainRpc, Cache, CollabResult, CommitmentLocation, EthereumRpc};
use super::consensus::{self, ConsensusReport, ScoredVerdict};
use super::error::EvalResult;
use super::evaluator::evaluate;

/// The collaborators one whole-timestamp verification needs
///
/// Any field left `None` means that chain/calendar simply isn't checked —
/// attestations of that kind resolve to `Unknown` rather than failing the
/// whole run, since a missing backend isn't evidence the commitment is bad.
pub struct VerifyContext<'a> {
    /// Bitcoin block lookups
    pub bitcoin: Option<&'a (dyn ChainRpc + Sync)>,
    /// Litecoin block lookups
    pub litecoin: Option<&'a (dyn ChainRpc + Sync)>,
    /// Ethereum transaction lookups
    pub ethereum: Option<&'a (dyn EthereumRpc + Sync)>,
    /// Calendar upgrade/submit access
    pub calendar: Option<&'a (dyn Calendar + Sync)>,
    /// Verification-result cache, consulted before any network call
    pub cache: Option<&'a (dyn Cache + Sync)>,
    /// Minimum combined score for `overall_valid`; use
    /// [`consensus::DEFAULT_MIN_SCORE`] absent an operator override
    pub min_score: f64,
}

/// Everything collected while verifying one detached timestamp
#[derive(Debug)]
pub struct VerifyOutcome {
    /// Every attestation reached, with the message it was checked against and its verdict
    pub verdicts: Vec<(Vec<u8>, Attestation, AttestationVerdict)>,
    /// The aggregated consensus judgment
    pub report: ConsensusReport,
}

/// Check one attestation against its chain or calendar collaborator
pub async fn verify_attestation(
    attestation: &Attestation,
    msg: &[u8],
    ctx: &VerifyContext<'_>,
) -> AttestationVerdict {
    let cache_key = cache_key(attestation, msg);
    if let Some(cache) = ctx.cache {
        if let Some(cached) = cache.get(&cache_key).await {
            if let Some(verdict) = decode_cached_verdict(&cached) {
                return verdict;
            }
        }
    }

    let verdict = match attestation {
        Attestation::Bitcoin { height } => match ctx.bitcoin {
            Some(rpc) => verify_chain(*height, msg, rpc).await,
            None => unreachable_backend(),
        },
        Attestation::Litecoin { height } => match ctx.litecoin {
            Some(rpc) => verify_chain(*height, msg, rpc).await,
            None => unreachable_backend(),
        },
        Attestation::Ethereum { tx_hash, block_number } => match ctx.ethereum {
            Some(rpc) => verify_ethereum(*tx_hash, *block_number, msg, rpc).await,
            None => unreachable_backend(),
        },
        Attestation::Pending { uri } => match ctx.calendar {
            Some(calendar) => verify_pending(uri, msg, calendar).await,
            None => unreachable_backend(),
        },
    };

    if let Some(cache) = ctx.cache {
        if let Some(encoded) = encode_cached_verdict(&verdict) {
            cache.put(&cache_key, encoded, cache_ttl_secs(&verdict)).await;
        }
    }

    verdict
}

async fn verify_chain(height: u64, commitment: &[u8], rpc: &(dyn ChainRpc + Sync)) -> AttestationVerdict {
    match rpc.find_commitment(height, commitment).await {
        Ok(CommitmentLocation::CanonicalSlot) => build_verified(height, rpc, true).await,
        Ok(CommitmentLocation::RawBytes) => build_verified(height, rpc, false).await,
        Ok(CommitmentLocation::NotFound) => {
            AttestationVerdict::Failed { reason: FailureReason::CommitmentNotFound }
        }
        Err(reason) => AttestationVerdict::Unknown { reason },
    }
}

async fn build_verified(height: u64, rpc: &(dyn ChainRpc + Sync), canonical_slot: bool) -> AttestationVerdict {
    let anchor_time = rpc.block_time(height).await.ok();
    let anchor_id = rpc.block_id(height).await.unwrap_or_else(|_| format!("height {height}"));
    AttestationVerdict::Verified { anchor_time, anchor_id, canonical_slot }
}

async fn verify_ethereum(
    tx_hash: [u8; 32],
    block_number: u64,
    commitment: &[u8],
    rpc: &(dyn EthereumRpc + Sync),
) -> AttestationVerdict {
    match rpc.find_commitment(tx_hash, commitment).await {
        Ok(CommitmentLocation::CanonicalSlot | CommitmentLocation::RawBytes) => {
            let anchor_time = rpc.block_time(block_number).await.ok();
            AttestationVerdict::Verified {
                anchor_time,
                anchor_id: hex::encode(tx_hash),
                canonical_slot: true,
            }
        }
        Ok(CommitmentLocation::NotFound) => {
            AttestationVerdict::Failed { reason: FailureReason::CommitmentNotFound }
        }
        Err(reason) => AttestationVerdict::Unknown { reason },
    }
}

async fn verify_pending(uri: &str, commitment: &[u8], calendar: &(dyn Calendar + Sync)) -> AttestationVerdict {
    match calendar.fetch_upgrade(uri, commitment).await {
        Ok(Some(_)) | Ok(None) => AttestationVerdict::Pending { upgrade_hint: uri.to_string() },
        Err(reason) => AttestationVerdict::Unknown { reason },
    }
}

fn unreachable_backend() -> AttestationVerdict {
    AttestationVerdict::Unknown { reason: "no collaborator configured for this chain".to_string() }
}

fn cache_key(attestation: &Attestation, msg: &[u8]) -> String {
    format!("verify:{:02x}:{}", attestation.tag(), hex::encode(msg))
}

const VERDICT_CACHE_OK: u8 = 0x01;
const VERDICT_CACHE_FAILED: u8 = 0x02;

fn encode_cached_verdict(verdict: &AttestationVerdict) -> Option<Vec<u8>> {
    match verdict {
        AttestationVerdict::Verified { anchor_time, anchor_id, canonical_slot } => {
            let mut out = vec![VERDICT_CACHE_OK, u8::from(*canonical_slot)];
            out.extend_from_slice(&anchor_time.unwrap_or(0).to_le_bytes());
            out.extend_from_slice(anchor_id.as_bytes());
            Some(out)
        }
        AttestationVerdict::Failed { .. } => Some(vec![VERDICT_CACHE_FAILED]),
        // Pending and Unknown verdicts are never cached: both may change on
        // the very next check and caching them defeats the point of retrying.
        AttestationVerdict::Pending { .. } | AttestationVerdict::Unknown { .. } => None,
    }
}

fn decode_cached_verdict(bytes: &[u8]) -> Option<AttestationVerdict> {
    match bytes.first()? {
        &VERDICT_CACHE_OK if bytes.len() >= 10 => {
            let canonical_slot = bytes[1] != 0;
            let mut time_bytes = [0u8; 8];
            time_bytes.copy_from_slice(&bytes[2..10]);
            let anchor_time = u64::from_le_bytes(time_bytes);
            let anchor_id = String::from_utf8(bytes[10..].to_vec()).ok()?;
            Some(AttestationVerdict::Verified {
                anchor_time: if anchor_time == 0 { None } else { Some(anchor_time) },
                anchor_id,
                canonical_slot,
            })
        }
        &VERDICT_CACHE_FAILED => Some(AttestationVerdict::Failed { reason: FailureReason::CommitmentNotFound }),
        _ => None,
    }
}

fn cache_ttl_secs(verdict: &AttestationVerdict) -> u64 {
    match verdict {
        AttestationVerdict::Verified { .. } => 30 * 24 * 3600,
        AttestationVerdict::Failed { .. } => 3600,
        AttestationVerdict::Pending { .. } | AttestationVerdict::Unknown { .. } => 0,
    }
}

fn chain_label(attestation: &Attestation) -> &'static str {
    match attestation {
        Attestation::Bitcoin { .. } => "bitcoin",
        Attestation::Litecoin { .. } => "litecoin",
        Attestation::Ethereum { .. } => "ethereum",
        Attestation::Pending { .. } => "pending",
    }
}

/// Verify a whole detached timestamp file against a presented document
///
/// Checks the stored digest against `document` before touching the tree or
/// any collaborator. Past that point, every
/// reachable attestation is checked and the results are handed to
/// [`consensus::score`].
///
/// # Errors
///
/// Returns [`crate::error::EvalError::CommitmentMismatch`] if the document
/// doesn't match, or any other [`crate::error::EvalError`] raised while
/// walking the tree's operations.
pub async fn verify_detached(
    file: &DetachedTimestampFile,
    document: &[u8],
    ctx: &VerifyContext<'_>,
) -> EvalResult<VerifyOutcome> {
    file.check_commitment(document)?;
    let commitment = file.commitment();
    let reached = evaluate(&file.tree, &commitment)?;

    let mut verdicts = Vec::with_capacity(reached.len());
    for (msg, attestation) in reached {
        let verdict = verify_attestation(&attestation, &msg, ctx).await;
        verdicts.push((msg, attestation, verdict));
    }

    let scored: Vec<ScoredVerdict<'_>> = verdicts
        .iter()
        .map(|(_, attestation, verdict)| ScoredVerdict {
            verdict,
            weight: attestation.weight(),
            chain: chain_label(attestation),
        })
        .collect();
    let report = consensus::score(&scored, true, ctx.min_score);

    Ok(VerifyOutcome { verdicts, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TimestampTree;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedChain {
        location: CommitmentLocation,
        time: u64,
    }

    #[async_trait]
    impl ChainRpc for FixedChain {
        async fn find_commitment(&self, _height: u64, _commitment: &[u8]) -> CollabResult<CommitmentLocation> {
            Ok(self.location)
        }
        async fn block_time(&self, _height: u64) -> CollabResult<u64> {
            Ok(self.time)
        }
        async fn block_id(&self, height: u64) -> CollabResult<String> {
            Ok(format!("block-{height}"))
        }
    }

    struct FailingChain;

    #[async_trait]
    impl ChainRpc for FailingChain {
        async fn find_commitment(&self, _height: u64, _commitment: &[u8]) -> CollabResult<CommitmentLocation> {
            Err("connection refused".to_string())
        }
        async fn block_time(&self, _height: u64) -> CollabResult<u64> {
            Err("connection refused".to_string())
        }
        async fn block_id(&self, _height: u64) -> CollabResult<String> {
            Err("connection refused".to_string())
        }
    }

    struct AlwaysPendingCalendar;

    #[async_trait]
    impl Calendar for AlwaysPendingCalendar {
        async fn fetch_upgrade(&self, _uri: &str, _commitment: &[u8]) -> CollabResult<Option<Vec<u8>>> {
            Ok(None)
        }
        async fn submit(&self, _uri: &str, _digest: &[u8]) -> CollabResult<Vec<u8>> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct MemCache {
        store: Mutex<std::collections::HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl Cache for MemCache {
        async fn get(&self, key: &str) -> Option<Vec<u8>> {
            self.store.lock().unwrap().get(key).cloned()
        }
        async fn put(&self, key: &str, value: Vec<u8>, _ttl_secs: u64) {
            self.store.lock().unwrap().insert(key.to_string(), value);
        }
        async fn delete(&self, key: &str) {
            self.store.lock().unwrap().remove(key);
        }
    }

    fn ctx_with_bitcoin(rpc: &(dyn ChainRpc + Sync)) -> VerifyContext<'_> {
        VerifyContext {
            bitcoin: Some(rpc),
            litecoin: None,
            ethereum: None,
            calendar: None,
            cache: None,
            min_score: consensus::DEFAULT_MIN_SCORE,
        }
    }

    #[tokio::test]
    async fn canonical_slot_match_is_verified() {
        let chain = FixedChain { location: CommitmentLocation::CanonicalSlot, time: 1_700_000_000 };
        let attestation = Attestation::Bitcoin { height: 800_000 };
        let verdict = verify_attestation(&attestation, b"commitment", &ctx_with_bitcoin(&chain)).await;
        assert!(matches!(
            verdict,
            AttestationVerdict::Verified { canonical_slot: true, .. }
        ));
    }

    #[tokio::test]
    async fn raw_bytes_match_is_verified_but_not_canonical() {
        let chain = FixedChain { location: CommitmentLocation::RawBytes, time: 1_700_000_000 };
        let attestation = Attestation::Bitcoin { height: 800_000 };
        let verdict = verify_attestation(&attestation, b"commitment", &ctx_with_bitcoin(&chain)).await;
        assert!(matches!(
            verdict,
            AttestationVerdict::Verified { canonical_slot: false, .. }
        ));
    }

    #[tokio::test]
    async fn not_found_is_failed() {
        let chain = FixedChain { location: CommitmentLocation::NotFound, time: 0 };
        let attestation = Attestation::Bitcoin { height: 800_000 };
        let verdict = verify_attestation(&attestation, b"commitment", &ctx_with_bitcoin(&chain)).await;
        assert!(matches!(verdict, AttestationVerdict::Failed { .. }));
    }

    #[tokio::test]
    async fn rpc_error_is_unknown_not_failed() {
        let chain = FailingChain;
        let attestation = Attestation::Bitcoin { height: 800_000 };
        let verdict = verify_attestation(&attestation, b"commitment", &ctx_with_bitcoin(&chain)).await;
        assert!(matches!(verdict, AttestationVerdict::Unknown { .. }));
    }

    #[tokio::test]
    async fn missing_backend_is_unknown() {
        let attestation = Attestation::Litecoin { height: 1 };
        let ctx = VerifyContext {
            bitcoin: None,
            litecoin: None,
            ethereum: None,
            calendar: None,
            cache: None,
            min_score: consensus::DEFAULT_MIN_SCORE,
        };
        let verdict = verify_attestation(&attestation, b"x", &ctx).await;
        assert!(matches!(verdict, AttestationVerdict::Unknown { .. }));
    }

    #[tokio::test]
    async fn pending_attestation_reports_upgrade_hint() {
        let calendar = AlwaysPendingCalendar;
        let attestation = Attestation::Pending { uri: "https://cal.example".to_string() };
        let ctx = VerifyContext {
            bitcoin: None,
            litecoin: None,
            ethereum: None,
            calendar: Some(&calendar),
            cache: None,
            min_score: consensus::DEFAULT_MIN_SCORE,
        };
        let verdict = verify_attestation(&attestation, b"x", &ctx).await;
        assert!(matches!(
            verdict,
            AttestationVerdict::Pending { upgrade_hint } if upgrade_hint == "https://cal.example"
        ));
    }

    #[tokio::test]
    async fn verified_result_is_cached_and_reused() {
        let chain = FixedChain { location: CommitmentLocation::CanonicalSlot, time: 42 };
        let cache = MemCache::default();
        let ctx = VerifyContext {
            bitcoin: Some(&chain),
            litecoin: None,
            ethereum: None,
            calendar: None,
            cache: Some(&cache),
            min_score: consensus::DEFAULT_MIN_SCORE,
        };
        let attestation = Attestation::Bitcoin { height: 5 };
        let first = verify_attestation(&attestation, b"m", &ctx).await;
        let second = verify_attestation(&attestation, b"m", &ctx).await;
        assert_eq!(first, second);
        assert_eq!(cache.store.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn commitment_mismatch_short_circuits_before_any_collaborator() {
        let mut tree = TimestampTree::leaf();
        tree.attestations.push(Attestation::Bitcoin { height: 1 });
        let digest = {
            use bitcoin_hashes::{sha256, Hash};
            sha256::Hash::hash(b"hello").to_byte_array()
        };
        let file = DetachedTimestampFile { nonce: None, digest, tree };

        struct PanicsOnCall;
        #[async_trait]
        impl ChainRpc for PanicsOnCall {
            async fn find_commitment(&self, _: u64, _: &[u8]) -> CollabResult<CommitmentLocation> {
                panic!("must not be called after a commitment mismatch")
            }
            async fn block_time(&self, _: u64) -> CollabResult<u64> {
                panic!("must not be called after a commitment mismatch")
            }
            async fn block_id(&self, _: u64) -> CollabResult<String> {
                panic!("must not be called after a commitment mismatch")
            }
        }
        let guard = PanicsOnCall;
        let ctx = ctx_with_bitcoin(&guard);

        let err = verify_detached(&file, b"goodbye", &ctx).await.unwrap_err();
        assert!(matches!(err, crate::error::EvalError::CommitmentMismatch));
    }

    #[tokio::test]
    async fn full_verification_produces_scored_outcome() {
        let mut tree = TimestampTree::leaf();
        tree.attestations.push(Attestation::Bitcoin { height: 9 });
        let digest = {
            use bitcoin_hashes::{sha256, Hash};
            sha256::Hash::hash(b"hello").to_byte_array()
        };
        let file = DetachedTimestampFile { nonce: None, digest, tree };

        let chain = FixedChain { location: CommitmentLocation::CanonicalSlot, time: 1 };
        let ctx = ctx_with_bitcoin(&chain);

        let outcome = verify_detached(&file, b"hello", &ctx).await.unwrap();
        assert_eq!(outcome.verdicts.len(), 1);
        assert!(outcome.report.overall_valid);
    }
}

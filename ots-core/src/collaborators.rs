//! Collaborator interfaces the attestation verifier is built against
//!
//! `ots-core` performs no process I/O of its own: every chain lookup,
//! calendar fetch, cache read, or clock read happens through one of these
//! traits. Concrete implementations (an HTTP client, an Electrum or RPC
//! backend, a file-backed cache) live in the binary crate, mirroring how
//! [`crate::consensus`] and [`crate::verifier`] decide things but never
//! fetch them.

use async_trait::async_trait;

/// Where a commitment was found while scanning an anchor
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CommitmentLocation {
    /// Not found anywhere in the anchor
    NotFound,
    /// Found in the anchor's canonical commitment slot (a coinbase OP_RETURN
    /// output, or an Ethereum transaction's input data)
    CanonicalSlot,
    /// Found somewhere in the anchor's raw bytes, but not in the canonical
    /// slot — a degraded match
    RawBytes,
}

/// Result alias for collaborator calls: failures are always transient or
/// environmental (network, rate limit, unreachable node), never a proof
/// error, so they're carried as plain strings rather than [`crate::error::OtsError`]
pub type CollabResult<T> = std::result::Result<T, String>;

/// Block-anchored chain lookups, shared by Bitcoin and Litecoin verification
///
/// A concrete implementation is free to reach a block via RPC, Electrum, or
/// a block explorer API; this crate only needs the commitment search result
/// and the block's timestamp.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Search the block at `height` for `commitment`
    async fn find_commitment(&self, height: u64, commitment: &[u8]) -> CollabResult<CommitmentLocation>;

    /// The block's Unix timestamp, if the anchor was found
    async fn block_time(&self, height: u64) -> CollabResult<u64>;

    /// A human-readable identifier for the block (its hash)
    async fn block_id(&self, height: u64) -> CollabResult<String>;
}

/// Ethereum transaction lookups
#[async_trait]
pub trait EthereumRpc: Send + Sync {
    /// Search `tx_hash`'s input data for `commitment`
    async fn find_commitment(&self, tx_hash: [u8; 32], commitment: &[u8]) -> CollabResult<CommitmentLocation>;

    /// The block's Unix timestamp that mined this transaction
    async fn block_time(&self, block_number: u64) -> CollabResult<u64>;
}

/// A calendar server's upgrade endpoint
#[async_trait]
pub trait Calendar: Send + Sync {
    /// Ask `uri` whether `commitment` has been upgraded yet
    ///
    /// Returns `Ok(Some(bytes))` with a serialized proof-tree fragment if
    /// the calendar has concrete attestations now, `Ok(None)` if it's still
    /// pending, and `Err` on any transport failure.
    async fn fetch_upgrade(&self, uri: &str, commitment: &[u8]) -> CollabResult<Option<Vec<u8>>>;

    /// Submit a digest to `uri`, returning the serialized pending proof tree
    async fn submit(&self, uri: &str, digest: &[u8]) -> CollabResult<Vec<u8>>;
}

/// Generic HTTP access for collaborators that don't warrant their own trait
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue a GET request, returning the response body
    async fn get(&self, url: &str) -> CollabResult<Vec<u8>>;

    /// Issue a POST request with `body` and `content_type`, returning the response body
    async fn post(&self, url: &str, body: Vec<u8>, content_type: &str) -> CollabResult<Vec<u8>>;
}

/// Wall-clock access, abstracted so verification logic is testable with a fixed time
pub trait Clock: Send + Sync {
    /// Current Unix time, in seconds
    fn now(&self) -> u64;
}

/// Cryptographically secure randomness, used only to mint privacy nonces
pub trait Rng: Send + Sync {
    /// 16 random bytes, suitable as a stamp-time privacy nonce
    fn random_nonce(&self) -> [u8; 16];
}

/// A small cache for verification results and upgrade cooldowns
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetch a previously stored value, if present and not expired
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store `value` under `key`, expiring after `ttl_secs` seconds
    async fn put(&self, key: &str, value: Vec<u8>, ttl_secs: u64);

    /// Remove a stored value
    async fn delete(&self, key: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitment_location_variants_are_distinct() {
        assert_ne!(CommitmentLocation::NotFound, CommitmentLocation::CanonicalSlot);
        assert_ne!(CommitmentLocation::CanonicalSlot, CommitmentLocation::RawBytes);
    }
}

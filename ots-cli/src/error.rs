use thiserror::Error;

/// Main error type for the `OpenTimestamps` client
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid OTS file format or codec failure
    #[error("invalid timestamp file: {0}")]
    Codec(#[from] ots_core::error::OtsError),

    /// Merkle evaluation failed, or the document's digest didn't match
    #[error("verification error: {0}")]
    Eval(#[from] ots_core::error::EvalError),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Calendar server error
    #[error("calendar error: {0}")]
    Calendar(String),

    /// Verification failed for a reason outside the proof engine's own errors
    #[error("verification failed: {0}")]
    Verification(String),

    /// No attestation reachable in the timestamp at all
    #[error("no attestation found in timestamp")]
    NoAttestation,

    /// Configuration file or environment overlay could not be parsed
    #[error("configuration error: {0}")]
    Config(String),

    /// Cache backend failure (file-backed cache I/O, malformed entry)
    #[error("cache error: {0}")]
    Cache(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

//! Scanner error taxonomy (§7).

/// Errors the scanner can surface to its caller.
///
/// Per-leaf cryptographic failures never reach here: the scanner classifies
/// those leaves as "not ours" internally (§4.I, §7 policy).
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The indexer returned HTTP 429 and retries were exhausted.
    #[error("indexer rate limited after exhausting retries")]
    IndexerRateLimited,
    /// The indexer was unreachable or returned a server error; not retried.
    #[error("indexer unavailable: {0}")]
    IndexerUnavailable(String),
    /// The requested pool or viewing key is not recognized by the caller's
    /// configuration.
    #[error("unknown pool: {0}")]
    UnknownPool(String),
    /// A background decryption task panicked or was cancelled.
    #[error("trial-decryption task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
    /// A cryptographic primitive failed outside the per-leaf decryption path
    /// (e.g. while deriving a nullifier for `scan_with_status`).
    #[error("cryptographic operation failed: {0}")]
    Crypto(String),
}

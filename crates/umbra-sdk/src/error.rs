//! Settlement orchestrator error taxonomy (§7).

/// Errors the orchestrator and its workflows can surface.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// The settlement program rejected phase 1 (proof verification failed,
    /// or the witness's public inputs were stale against current pool
    /// state).
    #[error("settlement rejected phase 1: {0}")]
    SettlementRejected(String),
    /// A phase-2/3 transaction for `(operation_id, index)` failed and the
    /// caller must resume before retrying.
    #[error("operation {operation_id} index {index} requires resume before retrying")]
    OperationResumeRequired {
        /// The operation in progress.
        operation_id: String,
        /// The nullifier or commitment index that failed.
        index: u8,
    },
    /// The pending-operation record could not be found externally (already
    /// closed, or never created).
    #[error("pending operation {0} not found")]
    OperationNotFound(String),
    /// A state transition was attempted out of order (§4.J only allows
    /// forward transitions).
    #[error("invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// The phase the operation was in.
        from: String,
        /// The phase transition was attempted into.
        to: String,
    },
    /// Persisting or loading the local pending-operation record failed.
    #[error("pending-operation store error: {0}")]
    Store(String),
    /// A scan required by a workflow failed.
    #[error(transparent)]
    Scan(#[from] umbra_scan::ScanError),
    /// A cryptographic primitive failed while building a witness.
    #[error("cryptographic operation failed: {0}")]
    Crypto(String),
    /// The external proof backend failed to produce a proof.
    #[error("proof generation failed: {0}")]
    ProofBackend(String),
    /// An AMM computation rejected the requested operation.
    #[error(transparent)]
    Amm(#[from] umbra_core::amm::AmmError),
}

//! The external zk prover, modeled as an injected boundary (§4.J Non-goals).
//!
//! The orchestrator never compiles a circuit or runs a prover itself: it
//! builds the public witness and hands it to whatever [`ProofBackend`] the
//! caller supplies, which may be a remote proving service, a local prover
//! binary, or — in tests — a mock that always succeeds.

use async_trait::async_trait;

use crate::error::SdkError;

/// The public inputs a phase-1 transaction submits alongside the proof:
/// merkle root, spent-note nullifiers, output commitments, and the AMM
/// old/new state hashes where applicable (§4.J).
#[derive(Debug, Clone, Default)]
pub struct PublicWitness {
    /// Merkle root the proof is relative to.
    pub merkle_root: [u8; 32],
    /// Nullifiers of notes this operation spends.
    pub nullifiers: Vec<[u8; 32]>,
    /// Commitments this operation will emit.
    pub commitments: Vec<[u8; 32]>,
    /// Pool state hash before the operation, if this touches a pool.
    pub old_state_hash: Option<[u8; 32]>,
    /// Pool state hash after the operation, if this touches a pool.
    pub new_state_hash: Option<[u8; 32]>,
    /// Public amounts disclosed by the operation (e.g. swap input/output).
    pub amounts: Vec<u64>,
}

/// An opaque proof as the backend returns it; the orchestrator never
/// inspects its bytes.
#[derive(Debug, Clone)]
pub struct ProofBytes(pub Vec<u8>);

/// The external prover's contract.
#[async_trait]
pub trait ProofBackend: Send + Sync {
    /// Produce a proof for `witness`, or fail with a backend-specific
    /// message.
    async fn prove(&self, witness: &PublicWitness) -> Result<ProofBytes, SdkError>;
}

/// A backend that always succeeds with an empty proof, for tests and
/// workflow wiring that does not exercise the real prover.
#[derive(Debug, Default)]
pub struct MockProofBackend;

#[async_trait]
impl ProofBackend for MockProofBackend {
    async fn prove(&self, _witness: &PublicWitness) -> Result<ProofBytes, SdkError> {
        Ok(ProofBytes(Vec::new()))
    }
}

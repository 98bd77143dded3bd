//! Settlement orchestration and end-user workflows (§4.J) over the
//! cryptographic primitives in `umbra-core` and the scanner in
//! `umbra-scan`.
//!
//! `umbra-sdk` never touches a real settlement chain or prover: both are
//! injected traits ([`orchestrator::SettlementClient`],
//! [`proof_backend::ProofBackend`]) so a caller can point the same
//! workflow logic at a live RPC endpoint or a test double.

/// Orchestrator error taxonomy.
pub mod error;
/// The four-phase settlement state machine.
pub mod orchestrator;
/// Local persistence for in-flight operations.
pub mod pending_store;
/// The injected zk proof backend.
pub mod proof_backend;
/// Swap/transfer/liquidity workflow composers.
pub mod workflows;

pub use error::SdkError;
pub use orchestrator::{Orchestrator, Phase, PendingOperation, SettlementClient, DEFAULT_FANOUT, MAX_INPUTS, MAX_OUTPUTS};
pub use pending_store::{FilePendingStore, InMemoryPendingStore, PendingStore};
pub use proof_backend::{MockProofBackend, ProofBackend, ProofBytes, PublicWitness};
pub use workflows::{PlannedOutput, WorkflowContext};

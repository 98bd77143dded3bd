//! The four-phase settlement orchestrator (§4.J).
//!
//! A single logical operation is split across a verify-and-reserve
//! transaction and a bounded number of per-nullifier/per-commitment
//! transactions, tracked locally and externally by completion bitmasks so
//! any party can resume a crashed client from the public pending record.

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{info, warn};

use crate::error::SdkError;
use crate::pending_store::PendingStore;
use crate::proof_backend::{ProofBackend, ProofBytes, PublicWitness};

/// Maximum spent-note inputs a single operation may bind (§4.J; mirrors the
/// settlement program's fixed-size pending-operation record).
pub const MAX_INPUTS: usize = 3;
/// Maximum output commitments a single operation may emit.
pub const MAX_OUTPUTS: usize = 8;
/// Default fan-out for parallel phase-2/3 dispatch (§5 recommends ≤ 4).
pub const DEFAULT_FANOUT: usize = 4;

/// The operation's position in the forward-only state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Freshly constructed, nothing submitted yet.
    Init,
    /// Phase 1 confirmed: proof verified, pool state updated, pending
    /// record created.
    VerifyReserve,
    /// All phase-2 nullifier transactions confirmed.
    EmitNullifiers,
    /// All phase-3 commitment transactions confirmed.
    EmitCommitments,
    /// Phase 4 confirmed: the pending record is retired.
    Closed,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::VerifyReserve => "verify_reserve",
            Self::EmitNullifiers => "emit_nullifiers",
            Self::EmitCommitments => "emit_commitments",
            Self::Closed => "closed",
        }
    }
}

/// One in-flight operation: the fields a phase-2/3 transaction must
/// reference, plus completion bitmasks recorded both locally and (per §4.J)
/// externally by the settlement program.
#[derive(Debug, Clone)]
pub struct PendingOperation {
    /// Unique operation identifier.
    pub operation_id: [u8; 32],
    /// Current phase.
    pub phase: Phase,
    /// Nullifiers this operation must emit.
    pub nullifiers: Vec<[u8; 32]>,
    /// `nullifiers[i]` materialized, by index.
    pub nullifier_completed: Vec<bool>,
    /// Commitments this operation must emit.
    pub commitments: Vec<[u8; 32]>,
    /// `commitments[i]` materialized, by index.
    pub commitment_completed: Vec<bool>,
}

impl PendingOperation {
    fn new(operation_id: [u8; 32], nullifiers: Vec<[u8; 32]>, commitments: Vec<[u8; 32]>) -> Self {
        let nullifier_completed = vec![false; nullifiers.len()];
        let commitment_completed = vec![false; commitments.len()];
        Self { operation_id, phase: Phase::VerifyReserve, nullifiers, nullifier_completed, commitments, commitment_completed }
    }

    /// All pending nullifiers have been materialized.
    #[must_use]
    pub fn all_nullifiers_created(&self) -> bool {
        self.nullifier_completed.iter().all(|done| *done)
    }

    /// All pending commitments have been materialized.
    #[must_use]
    pub fn all_commitments_created(&self) -> bool {
        self.commitment_completed.iter().all(|done| *done)
    }

    /// Indices of nullifiers not yet materialized, in order.
    #[must_use]
    pub fn uncreated_nullifier_indices(&self) -> Vec<usize> {
        self.nullifier_completed.iter().enumerate().filter(|(_, done)| !**done).map(|(index, _)| index).collect()
    }

    /// Indices of commitments not yet materialized, in order.
    #[must_use]
    pub fn uncreated_commitment_indices(&self) -> Vec<usize> {
        self.commitment_completed.iter().enumerate().filter(|(_, done)| !**done).map(|(index, _)| index).collect()
    }

    fn mark_nullifier_created(&mut self, index: usize) {
        if let Some(slot) = self.nullifier_completed.get_mut(index) {
            *slot = true;
        }
    }

    fn mark_commitment_created(&mut self, index: usize) {
        if let Some(slot) = self.commitment_completed.get_mut(index) {
            *slot = true;
        }
    }
}

/// The settlement chain's consumed RPC surface: one call per phase.
#[async_trait]
pub trait SettlementClient: Send + Sync {
    /// Phase 1: submit the proof and public witness, returning the fresh
    /// `operation_id` and the externally-recorded pending nullifiers and
    /// commitments.
    async fn submit_verify_reserve(
        &self,
        witness: &PublicWitness,
        proof: &ProofBytes,
    ) -> Result<([u8; 32], Vec<[u8; 32]>, Vec<[u8; 32]>), SdkError>;

    /// Phase 2: materialize nullifier `index` as a compressed leaf.
    async fn submit_emit_nullifier(&self, operation_id: [u8; 32], index: usize, nullifier: [u8; 32]) -> Result<(), SdkError>;

    /// Phase 3: materialize commitment `index` as an encrypted-note leaf.
    async fn submit_emit_commitment(&self, operation_id: [u8; 32], index: usize, commitment: [u8; 32]) -> Result<(), SdkError>;

    /// Phase 4: retire the pending-operation record.
    async fn submit_close(&self, operation_id: [u8; 32]) -> Result<(), SdkError>;

    /// Read back the publicly readable pending-operation record, used to
    /// resume after a crash (§4.J recovery).
    async fn get_pending_operation(&self, operation_id: [u8; 32]) -> Result<Option<PendingOperation>, SdkError>;
}

/// Drives one operation through its four phases, persisting progress
/// locally so a crash can resume instead of replaying from scratch.
pub struct Orchestrator<S, P> {
    settlement: S,
    proof_backend: P,
    store: Box<dyn PendingStore>,
    fanout: usize,
}

impl<S, P> Orchestrator<S, P>
where
    S: SettlementClient,
    P: ProofBackend,
{
    /// Build an orchestrator over a settlement client, proof backend, and
    /// local pending-operation store.
    #[must_use]
    pub fn new(settlement: S, proof_backend: P, store: Box<dyn PendingStore>) -> Self {
        Self { settlement, proof_backend, store, fanout: DEFAULT_FANOUT }
    }

    /// Override the phase-2/3 dispatch fan-out (default [`DEFAULT_FANOUT`]).
    #[must_use]
    pub fn with_fanout(mut self, fanout: usize) -> Self {
        self.fanout = fanout.max(1);
        self
    }

    /// Run phase 1 through phase 4 for a freshly built witness, persisting
    /// progress after every phase so a crash can resume via
    /// [`Orchestrator::resume_pending`].
    pub async fn run(&self, witness: PublicWitness) -> Result<[u8; 32], SdkError> {
        let proof = self.proof_backend.prove(&witness).await?;
        let (operation_id, nullifiers, commitments) = self.settlement.submit_verify_reserve(&witness, &proof).await?;

        let mut pending = PendingOperation::new(operation_id, nullifiers, commitments);
        self.store.save(&pending).await.map_err(SdkError::Store)?;
        info!(operation_id = %hex::encode(operation_id), "phase 1 confirmed");

        self.drive_to_close(&mut pending).await?;
        Ok(operation_id)
    }

    /// Enumerate and finish any operation left incomplete by a prior crash.
    /// Returns the phase it resumed from and the remaining index counts, not
    /// merely a boolean, so a caller can report precise progress.
    pub async fn resume_pending(&self, operation_id: [u8; 32]) -> Result<(Phase, usize, usize), SdkError> {
        let mut pending = match self.store.load(operation_id).await.map_err(SdkError::Store)? {
            Some(pending) => pending,
            None => self
                .settlement
                .get_pending_operation(operation_id)
                .await?
                .ok_or_else(|| SdkError::OperationNotFound(hex::encode(operation_id)))?,
        };

        let resumed_phase = pending.phase;
        self.drive_to_close(&mut pending).await?;
        Ok((resumed_phase, pending.uncreated_nullifier_indices().len(), pending.uncreated_commitment_indices().len()))
    }

    async fn drive_to_close(&self, pending: &mut PendingOperation) -> Result<(), SdkError> {
        if pending.phase == Phase::VerifyReserve {
            self.emit_nullifiers(pending).await?;
            pending.phase = Phase::EmitNullifiers;
            self.store.save(pending).await.map_err(SdkError::Store)?;
            info!(operation_id = %hex::encode(pending.operation_id), phase = pending.phase.label(), "phase advanced");
        }

        if pending.phase == Phase::EmitNullifiers {
            self.emit_commitments(pending).await?;
            pending.phase = Phase::EmitCommitments;
            self.store.save(pending).await.map_err(SdkError::Store)?;
            info!(operation_id = %hex::encode(pending.operation_id), phase = pending.phase.label(), "phase advanced");
        }

        if pending.phase == Phase::EmitCommitments {
            self.settlement.submit_close(pending.operation_id).await?;
            pending.phase = Phase::Closed;
            self.store.save(pending).await.map_err(SdkError::Store)?;
            info!(operation_id = %hex::encode(pending.operation_id), phase = pending.phase.label(), "operation closed");
        }

        Ok(())
    }

    async fn emit_nullifiers(&self, pending: &mut PendingOperation) -> Result<(), SdkError> {
        let indices = pending.uncreated_nullifier_indices();
        for chunk in indices.chunks(self.fanout) {
            let futures = chunk.iter().map(|&index| {
                let nullifier = pending.nullifiers.get(index).copied().unwrap_or_default();
                let operation_id = pending.operation_id;
                async move { (index, self.settlement.submit_emit_nullifier(operation_id, index, nullifier).await) }
            });
            for (index, result) in join_all(futures).await {
                match result {
                    Ok(()) => pending.mark_nullifier_created(index),
                    Err(err) => warn!(index, error = %err, "nullifier emission failed, will retry on resume"),
                }
            }
        }
        if !pending.all_nullifiers_created() {
            let index = pending.uncreated_nullifier_indices().first().copied().unwrap_or(0);
            return Err(SdkError::OperationResumeRequired {
                operation_id: hex::encode(pending.operation_id),
                index: u8::try_from(index).unwrap_or(u8::MAX),
            });
        }
        Ok(())
    }

    async fn emit_commitments(&self, pending: &mut PendingOperation) -> Result<(), SdkError> {
        let indices = pending.uncreated_commitment_indices();
        for chunk in indices.chunks(self.fanout) {
            let futures = chunk.iter().map(|&index| {
                let commitment = pending.commitments.get(index).copied().unwrap_or_default();
                let operation_id = pending.operation_id;
                async move { (index, self.settlement.submit_emit_commitment(operation_id, index, commitment).await) }
            });
            for (index, result) in join_all(futures).await {
                match result {
                    Ok(()) => pending.mark_commitment_created(index),
                    Err(err) => warn!(index, error = %err, "commitment emission failed, will retry on resume"),
                }
            }
        }
        if !pending.all_commitments_created() {
            let index = pending.uncreated_commitment_indices().first().copied().unwrap_or(0);
            return Err(SdkError::OperationResumeRequired {
                operation_id: hex::encode(pending.operation_id),
                index: u8::try_from(index).unwrap_or(u8::MAX),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use std::sync::Mutex;

    use crate::pending_store::InMemoryPendingStore;

    use super::*;

    struct FakeSettlement {
        fail_nullifier_once: Mutex<bool>,
    }

    #[async_trait]
    impl SettlementClient for FakeSettlement {
        async fn submit_verify_reserve(
            &self,
            _witness: &PublicWitness,
            _proof: &ProofBytes,
        ) -> Result<([u8; 32], Vec<[u8; 32]>, Vec<[u8; 32]>), SdkError> {
            Ok(([1_u8; 32], vec![[2_u8; 32]], vec![[3_u8; 32], [4_u8; 32]]))
        }

        async fn submit_emit_nullifier(&self, _operation_id: [u8; 32], _index: usize, _nullifier: [u8; 32]) -> Result<(), SdkError> {
            let mut fail_once = self.fail_nullifier_once.lock().unwrap();
            if *fail_once {
                *fail_once = false;
                return Err(SdkError::SettlementRejected("simulated transient failure".to_owned()));
            }
            Ok(())
        }

        async fn submit_emit_commitment(&self, _operation_id: [u8; 32], _index: usize, _commitment: [u8; 32]) -> Result<(), SdkError> {
            Ok(())
        }

        async fn submit_close(&self, _operation_id: [u8; 32]) -> Result<(), SdkError> {
            Ok(())
        }

        async fn get_pending_operation(&self, _operation_id: [u8; 32]) -> Result<Option<PendingOperation>, SdkError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn full_operation_runs_to_close() {
        let orchestrator = Orchestrator::new(
            FakeSettlement { fail_nullifier_once: Mutex::new(false) },
            crate::proof_backend::MockProofBackend,
            Box::new(InMemoryPendingStore::default()),
        );
        let operation_id = orchestrator.run(PublicWitness::default()).await.unwrap();
        assert_eq!(operation_id, [1_u8; 32]);
    }

    #[tokio::test]
    async fn transient_nullifier_failure_requires_resume() {
        let orchestrator = Orchestrator::new(
            FakeSettlement { fail_nullifier_once: Mutex::new(true) },
            crate::proof_backend::MockProofBackend,
            Box::new(InMemoryPendingStore::default()),
        );
        let result = orchestrator.run(PublicWitness::default()).await;
        assert!(matches!(result, Err(SdkError::OperationResumeRequired { .. })));

        let (phase, remaining_nullifiers, remaining_commitments) =
            orchestrator.resume_pending([1_u8; 32]).await.unwrap();
        assert_eq!(phase, Phase::VerifyReserve);
        assert_eq!(remaining_nullifiers, 0);
        assert_eq!(remaining_commitments, 0);
    }
}

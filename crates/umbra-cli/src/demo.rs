//! A local, in-memory [`SettlementClient`] standing in for the settlement
//! chain's RPC surface.
//!
//! `umbra-cli` demonstrates and integration-tests the SDK; it never talks
//! to a live settlement program. `DemoSettlementClient` accepts every
//! phase-1 submission immediately and derives a deterministic
//! `operation_id` from the witness, in the same spirit as the fixture
//! indexer in `fixtures.rs`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tiny_keccak::{Hasher as _, Keccak};
use umbra_sdk::{PendingOperation, ProofBytes, PublicWitness, SdkError, SettlementClient};

/// Deterministically derives `operation_id` from the witness so repeated
/// demo runs are reproducible, and tracks pending records purely in memory.
#[derive(Default)]
pub struct DemoSettlementClient {
    pending: Mutex<HashMap<[u8; 32], PendingOperation>>,
}

fn operation_id_of(witness: &PublicWitness) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(b"demo_operation");
    hasher.update(&witness.merkle_root);
    for nullifier in &witness.nullifiers {
        hasher.update(nullifier);
    }
    for commitment in &witness.commitments {
        hasher.update(commitment);
    }
    let mut out = [0_u8; 32];
    hasher.finalize(&mut out);
    out
}

#[async_trait]
impl SettlementClient for DemoSettlementClient {
    async fn submit_verify_reserve(
        &self,
        witness: &PublicWitness,
        _proof: &ProofBytes,
    ) -> Result<([u8; 32], Vec<[u8; 32]>, Vec<[u8; 32]>), SdkError> {
        let operation_id = operation_id_of(witness);
        Ok((operation_id, witness.nullifiers.clone(), witness.commitments.clone()))
    }

    async fn submit_emit_nullifier(&self, _operation_id: [u8; 32], _index: usize, _nullifier: [u8; 32]) -> Result<(), SdkError> {
        Ok(())
    }

    async fn submit_emit_commitment(&self, _operation_id: [u8; 32], _index: usize, _commitment: [u8; 32]) -> Result<(), SdkError> {
        Ok(())
    }

    async fn submit_close(&self, _operation_id: [u8; 32]) -> Result<(), SdkError> {
        Ok(())
    }

    async fn get_pending_operation(&self, operation_id: [u8; 32]) -> Result<Option<PendingOperation>, SdkError> {
        let pending = self.pending.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(pending.get(&operation_id).cloned())
    }
}

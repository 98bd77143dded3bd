//! Simulates a client crash mid-settlement: phase 1 and part of phase 2
//! commit, the process "restarts" with a fresh `Orchestrator` pointed at
//! the same on-disk store, and `resume_pending` finishes the operation.

use std::sync::Mutex;

use async_trait::async_trait;
use umbra_sdk::{
    FilePendingStore, MockProofBackend, Orchestrator, PendingOperation, Phase, ProofBytes, PublicWitness, SdkError,
    SettlementClient,
};

struct FlakySettlement {
    fail_nullifier_index: Mutex<Option<usize>>,
}

#[async_trait]
impl SettlementClient for FlakySettlement {
    async fn submit_verify_reserve(
        &self,
        _witness: &PublicWitness,
        _proof: &ProofBytes,
    ) -> Result<([u8; 32], Vec<[u8; 32]>, Vec<[u8; 32]>), SdkError> {
        Ok(([5_u8; 32], vec![[1_u8; 32], [2_u8; 32]], vec![[3_u8; 32]]))
    }

    async fn submit_emit_nullifier(&self, _operation_id: [u8; 32], index: usize, _nullifier: [u8; 32]) -> Result<(), SdkError> {
        let mut fail_index = self.fail_nullifier_index.lock().expect("lock");
        if *fail_index == Some(index) {
            *fail_index = None;
            return Err(SdkError::SettlementRejected("simulated restart before confirmation".to_owned()));
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
async fn crashed_operation_resumes_from_the_file_store() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let store = FilePendingStore::new(tmp.path()).expect("create store");

    let first_run = Orchestrator::new(
        FlakySettlement { fail_nullifier_index: Mutex::new(Some(1)) },
        MockProofBackend,
        Box::new(store),
    );
    let result = first_run.run(PublicWitness::default()).await;
    assert!(matches!(result, Err(SdkError::OperationResumeRequired { .. })));

    // A fresh orchestrator, as a restarted process would build, backed by
    // the same directory.
    let store_after_restart = FilePendingStore::new(tmp.path()).expect("reopen store");
    let resumed = Orchestrator::new(
        FlakySettlement { fail_nullifier_index: Mutex::new(None) },
        MockProofBackend,
        Box::new(store_after_restart),
    );
    let (phase, remaining_nullifiers, remaining_commitments) =
        resumed.resume_pending([5_u8; 32]).await.expect("resume");
    assert_eq!(phase, Phase::VerifyReserve);
    assert_eq!(remaining_nullifiers, 0);
    assert_eq!(remaining_commitments, 0);
}

#[tokio::test]
async fn resuming_an_unknown_operation_fails() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let store = FilePendingStore::new(tmp.path()).expect("create store");
    let orchestrator = Orchestrator::new(
        FlakySettlement { fail_nullifier_index: Mutex::new(None) },
        MockProofBackend,
        Box::new(store),
    );
    let result = orchestrator.resume_pending([0xAB_u8; 32]).await;
    assert!(matches!(result, Err(SdkError::OperationNotFound(_))));
}

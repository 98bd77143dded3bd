//! Local persistence for in-flight operations (§4.J recovery, §6 ambient
//! stack).
//!
//! The settlement program keeps its own externally-readable pending record,
//! but a client that crashes mid-operation should not have to fall back to
//! a full chain scan to find it: [`PendingStore`] is the client-local cache
//! of the same record, keyed by `operation_id`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::orchestrator::PendingOperation;

/// Persists and retrieves [`PendingOperation`] records by id.
#[async_trait]
pub trait PendingStore: Send + Sync {
    /// Persist (or overwrite) `operation`.
    async fn save(&self, operation: &PendingOperation) -> Result<(), String>;
    /// Load a previously saved operation, if any.
    async fn load(&self, operation_id: [u8; 32]) -> Result<Option<PendingOperation>, String>;
    /// Remove a closed operation's record.
    async fn remove(&self, operation_id: [u8; 32]) -> Result<(), String>;
}

/// An in-process store, useful for tests and short-lived CLI invocations
/// that do not need to survive a restart.
#[derive(Debug, Default)]
pub struct InMemoryPendingStore {
    operations: Mutex<HashMap<[u8; 32], PendingOperation>>,
}

#[async_trait]
impl PendingStore for InMemoryPendingStore {
    async fn save(&self, operation: &PendingOperation) -> Result<(), String> {
        let mut operations = self.operations.lock().map_err(|err| err.to_string())?;
        operations.insert(operation.operation_id, operation.clone());
        Ok(())
    }

    async fn load(&self, operation_id: [u8; 32]) -> Result<Option<PendingOperation>, String> {
        let operations = self.operations.lock().map_err(|err| err.to_string())?;
        Ok(operations.get(&operation_id).cloned())
    }

    async fn remove(&self, operation_id: [u8; 32]) -> Result<(), String> {
        let mut operations = self.operations.lock().map_err(|err| err.to_string())?;
        operations.remove(&operation_id);
        Ok(())
    }
}

/// A store backed by one JSON file per operation under a directory, so a
/// restarted CLI process can find operations left by a crashed one.
#[derive(Debug)]
pub struct FilePendingStore {
    dir: PathBuf,
}

impl FilePendingStore {
    /// Use `dir` as the record directory, creating it if missing.
    pub fn new(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, operation_id: [u8; 32]) -> PathBuf {
        self.dir.join(format!("{}.json", hex::encode(operation_id)))
    }
}

/// On-disk representation; [`PendingOperation::phase`] is stringified since
/// `Phase` carries no serde impl of its own (it is not part of any wire
/// protocol, only this local cache).
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StoredOperation {
    operation_id: String,
    phase: String,
    nullifiers: Vec<String>,
    nullifier_completed: Vec<bool>,
    commitments: Vec<String>,
    commitment_completed: Vec<bool>,
}

fn phase_to_str(phase: crate::orchestrator::Phase) -> &'static str {
    use crate::orchestrator::Phase;
    match phase {
        Phase::Init => "init",
        Phase::VerifyReserve => "verify_reserve",
        Phase::EmitNullifiers => "emit_nullifiers",
        Phase::EmitCommitments => "emit_commitments",
        Phase::Closed => "closed",
    }
}

fn phase_from_str(value: &str) -> Option<crate::orchestrator::Phase> {
    use crate::orchestrator::Phase;
    match value {
        "init" => Some(Phase::Init),
        "verify_reserve" => Some(Phase::VerifyReserve),
        "emit_nullifiers" => Some(Phase::EmitNullifiers),
        "emit_commitments" => Some(Phase::EmitCommitments),
        "closed" => Some(Phase::Closed),
        _ => None,
    }
}

fn hash32_from_hex(value: &str) -> Result<[u8; 32], String> {
    let bytes = hex::decode(value).map_err(|err| err.to_string())?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| "expected 32-byte hash".to_owned())
}

#[async_trait]
impl PendingStore for FilePendingStore {
    async fn save(&self, operation: &PendingOperation) -> Result<(), String> {
        let stored = StoredOperation {
            operation_id: hex::encode(operation.operation_id),
            phase: phase_to_str(operation.phase).to_owned(),
            nullifiers: operation.nullifiers.iter().map(hex::encode).collect(),
            nullifier_completed: operation.nullifier_completed.clone(),
            commitments: operation.commitments.iter().map(hex::encode).collect(),
            commitment_completed: operation.commitment_completed.clone(),
        };
        let json = serde_json::to_vec_pretty(&stored).map_err(|err| err.to_string())?;
        std::fs::write(self.path_for(operation.operation_id), json).map_err(|err| err.to_string())
    }

    async fn load(&self, operation_id: [u8; 32]) -> Result<Option<PendingOperation>, String> {
        let path = self.path_for(operation_id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(path).map_err(|err| err.to_string())?;
        let stored: StoredOperation = serde_json::from_slice(&bytes).map_err(|err| err.to_string())?;

        let nullifiers = stored.nullifiers.iter().map(|hex_str| hash32_from_hex(hex_str)).collect::<Result<Vec<_>, _>>()?;
        let commitments = stored.commitments.iter().map(|hex_str| hash32_from_hex(hex_str)).collect::<Result<Vec<_>, _>>()?;
        let phase = phase_from_str(&stored.phase).ok_or_else(|| format!("unknown phase {}", stored.phase))?;

        Ok(Some(PendingOperation {
            operation_id: hash32_from_hex(&stored.operation_id)?,
            phase,
            nullifiers,
            nullifier_completed: stored.nullifier_completed,
            commitments,
            commitment_completed: stored.commitment_completed,
        }))
    }

    async fn remove(&self, operation_id: [u8; 32]) -> Result<(), String> {
        let path = self.path_for(operation_id);
        if path.exists() {
            std::fs::remove_file(path).map_err(|err| err.to_string())?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;
    use crate::orchestrator::Phase;

    fn sample() -> PendingOperation {
        PendingOperation {
            operation_id: [7_u8; 32],
            phase: Phase::EmitNullifiers,
            nullifiers: vec![[1_u8; 32], [2_u8; 32]],
            nullifier_completed: vec![true, false],
            commitments: vec![[3_u8; 32]],
            commitment_completed: vec![false],
        }
    }

    #[tokio::test]
    async fn in_memory_round_trips() {
        let store = InMemoryPendingStore::default();
        let op = sample();
        store.save(&op).await.unwrap();
        let loaded = store.load(op.operation_id).await.unwrap().unwrap();
        assert_eq!(loaded.operation_id, op.operation_id);
        assert_eq!(loaded.nullifier_completed, op.nullifier_completed);

        store.remove(op.operation_id).await.unwrap();
        assert!(store.load(op.operation_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FilePendingStore::new(tmp.path()).unwrap();
        let op = sample();
        store.save(&op).await.unwrap();

        let loaded = store.load(op.operation_id).await.unwrap().unwrap();
        assert_eq!(loaded.phase, Phase::EmitNullifiers);
        assert_eq!(loaded.commitments, op.commitments);
    }
}

//! A file-backed [`IndexerClient`] for `scan`/`balance` demonstrations.
//!
//! The CLI is a thin harness over the SDK, not a product surface (see the
//! crate's top-level docs): rather than speaking to a live compressed-account
//! indexer over RPC, `scan`/`balance` read a JSON snapshot of accounts from
//! disk, in the same spirit as the teacher CLI's snapshot-file arguments.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use umbra_scan::{
    AccountPage, AccountProof, IndexedAccount, IndexerClient, OwnerFilters, ScanError, ValidityProof, ValidityProofRequest,
};

/// One account entry as stored in a fixture file: hex-encoded so the file
/// is human-editable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureAccount {
    /// Hex-encoded account address.
    pub address: String,
    /// Hex-encoded leaf bytes, or `None` for an emptied slot.
    pub data: Option<String>,
    /// Creation slot.
    pub slot: i64,
}

/// The on-disk fixture format: a flat list of accounts, all owned by the
/// program under test.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    /// Accounts the fixture's single indexed program owns.
    pub accounts: Vec<FixtureAccount>,
}

impl Fixture {
    /// Load a fixture from a JSON file on disk.
    pub fn load(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let bytes = std::fs::read(path)?;
        let fixture = serde_json::from_slice(&bytes)?;
        Ok(fixture)
    }
}

fn to_indexed_account(account: &FixtureAccount) -> eyre::Result<IndexedAccount> {
    let address = hex::decode(&account.address)?;
    let data = account.data.as_deref().map(hex::decode).transpose()?;
    Ok(IndexedAccount { address, data, slot: account.slot })
}

/// Serves [`IndexerClient`] calls out of a loaded [`Fixture`]; nullifier
/// checks always report "not found" since fixtures carry no settlement
/// state.
pub struct FixtureIndexerClient {
    accounts: Vec<IndexedAccount>,
}

impl FixtureIndexerClient {
    /// Build a client over `fixture`'s accounts.
    pub fn new(fixture: &Fixture) -> eyre::Result<Self> {
        let accounts = fixture.accounts.iter().map(to_indexed_account).collect::<eyre::Result<Vec<_>>>()?;
        Ok(Self { accounts })
    }
}

#[async_trait]
impl IndexerClient for FixtureIndexerClient {
    async fn get_compressed_account(&self, address: &[u8]) -> Result<Option<IndexedAccount>, ScanError> {
        Ok(self.accounts.iter().find(|account| account.address == address).cloned())
    }

    async fn get_multiple_compressed_accounts(&self, addresses: &[Vec<u8>]) -> Result<Vec<Option<IndexedAccount>>, ScanError> {
        Ok(addresses
            .iter()
            .map(|address| self.accounts.iter().find(|account| &account.address == address).cloned())
            .collect())
    }

    async fn get_compressed_accounts_by_owner(&self, _program_id: &str, _filters: OwnerFilters) -> Result<AccountPage, ScanError> {
        Ok(AccountPage { items: self.accounts.clone() })
    }

    async fn get_validity_proof(&self, _request: ValidityProofRequest) -> Result<ValidityProof, ScanError> {
        Ok(ValidityProof { a: Vec::new(), b: Vec::new(), c: Vec::new(), root_indices: Vec::new(), merkle_trees: Vec::new() })
    }

    async fn get_compressed_account_proof(&self, _hash: [u8; 32]) -> Result<AccountProof, ScanError> {
        Ok(AccountProof { root: [0_u8; 32], merkle_proof: Vec::new(), leaf_index: 0 })
    }

    async fn batch_check_nullifiers(&self, addresses: &[Vec<u8>]) -> Result<Vec<bool>, ScanError> {
        Ok(vec![false; addresses.len()])
    }
}

//! The compressed-account indexer's consumed RPC surface (§6).
//!
//! Modeled as an owned trait object passed to the scanner and orchestrator
//! (§9 "global RPC client" re-architecture note) rather than a process-wide
//! singleton, so tests can substitute an in-memory fake.

use async_trait::async_trait;

use crate::error::ScanError;

/// One compressed account as the indexer returns it: the raw leaf bytes plus
/// the creation slot the scanner needs for cursoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedAccount {
    /// The account's address under the indexer's address-tree scheme.
    pub address: Vec<u8>,
    /// Raw leaf bytes in the §6 fixed layout, or `None` for an emptied slot.
    pub data: Option<Vec<u8>>,
    /// The slot this account was last written at.
    pub slot: i64,
}

/// Filters accepted by [`IndexerClient::get_compressed_accounts_by_owner`].
#[derive(Debug, Clone, Default)]
pub struct OwnerFilters {
    /// Restrict results to a single pool id, if set.
    pub pool_id: Option<[u8; 32]>,
}

/// A page of owner-filtered accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountPage {
    /// The accounts in this page.
    pub items: Vec<IndexedAccount>,
}

/// An opaque validity (inclusion) proof as returned by the indexer.
#[derive(Debug, Clone)]
pub struct ValidityProof {
    /// Proof component `a`.
    pub a: Vec<u8>,
    /// Proof component `b`.
    pub b: Vec<u8>,
    /// Proof component `c`.
    pub c: Vec<u8>,
    /// Merkle root indices the proof is relative to.
    pub root_indices: Vec<u32>,
    /// Identifiers of the merkle trees the proof spans.
    pub merkle_trees: Vec<[u8; 32]>,
}

/// A single account's merkle inclusion proof.
#[derive(Debug, Clone)]
pub struct AccountProof {
    /// The tree root the proof is relative to.
    pub root: [u8; 32],
    /// Sibling hashes from leaf to root.
    pub merkle_proof: Vec<[u8; 32]>,
    /// The leaf's position in the tree.
    pub leaf_index: u64,
}

/// Batch request describing the witnesses a settlement needs proven.
#[derive(Debug, Clone, Default)]
pub struct ValidityProofRequest {
    /// Existing leaf hashes to prove inclusion for (spent nullifiers' prior
    /// commitments, etc.).
    pub hashes: Vec<[u8; 32]>,
    /// New addresses the proof must also certify non-existence for, paired
    /// with their address-tree id.
    pub new_addresses_with_trees: Vec<([u8; 32], [u8; 32])>,
}

/// The compressed-account indexer's RPC surface the engine consumes (§6).
#[async_trait]
pub trait IndexerClient: Send + Sync {
    /// `get_compressed_account(address) -> account?`
    async fn get_compressed_account(&self, address: &[u8]) -> Result<Option<IndexedAccount>, ScanError>;

    /// `get_multiple_compressed_accounts(addresses[]) -> (account|null)[]`
    async fn get_multiple_compressed_accounts(
        &self,
        addresses: &[Vec<u8>],
    ) -> Result<Vec<Option<IndexedAccount>>, ScanError>;

    /// `get_compressed_accounts_by_owner(program, filters?) -> {items: account[]}`
    async fn get_compressed_accounts_by_owner(
        &self,
        program_id: &str,
        filters: OwnerFilters,
    ) -> Result<AccountPage, ScanError>;

    /// `get_validity_proof({hashes, new_addresses_with_trees}) -> {proof, root_indices, merkle_trees}`
    async fn get_validity_proof(&self, request: ValidityProofRequest) -> Result<ValidityProof, ScanError>;

    /// `get_compressed_account_proof(hash) -> {root, merkle_proof, leaf_index}`
    async fn get_compressed_account_proof(&self, hash: [u8; 32]) -> Result<AccountProof, ScanError>;

    /// Batch nullifier-address lookup used by `scan_with_status` to
    /// classify discovered notes as spent/unspent in a single round trip.
    async fn batch_check_nullifiers(&self, addresses: &[Vec<u8>]) -> Result<Vec<bool>, ScanError>;
}

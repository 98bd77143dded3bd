//! Trial-decryption scanner over the compressed-leaf indexer (§4.I).
//!
//! `umbra-scan` turns the opaque leaf stream exposed by an external indexer
//! into a viewing key's classified notes: owned vs. not-ours, spent vs.
//! unspent, with a process-local cache and per-pool cursor so repeat scans
//! only pay for new leaves.

/// Per-viewing-key note cache and per-pool scan cursor.
pub mod cache;
/// Scanner error taxonomy.
pub mod error;
/// The indexer's consumed RPC surface.
pub mod indexer;
/// The scanner itself.
pub mod scanner;

pub use cache::{CacheEntry, ScannerCache, ViewKeyCache};
pub use error::ScanError;
pub use indexer::{
    AccountPage, AccountProof, IndexedAccount, IndexerClient, OwnerFilters, ValidityProof, ValidityProofRequest,
};
pub use scanner::{ScanOptions, ScannedNote, Scanner};

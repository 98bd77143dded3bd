//! Wire and persisted-state schemas (§6): the compressed leaf binary layout,
//! pool state, configuration, and the exported scanner cache format.

mod cache;
mod config;
mod leaf;
mod pool;

pub use cache::{CachedNote, ExportedCache};
pub use config::{Config, NetworkKind, RetryConfig, ScannerConfig};
pub use leaf::{CommitmentLeaf, LeafError, LEAF_SIZE};
pub use pool::PoolState;

//! Exported/imported scanner cache format (§6).
//!
//! Big-ints become decimal strings, byte-arrays become hex, and points
//! become base58 of their encoded form, so the export is readable and
//! diffable without a binary tool.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};

/// A cached note, in the persisted export's string-friendly encoding.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CachedNote {
    /// Hex-encoded commitment.
    pub commitment_hex: String,
    /// Base58-encoded stealth public key `x` coordinate, or empty for an
    /// internal (non-stealth) note.
    pub stealth_pub_base58: String,
    /// Decimal-string amount (fungible/LP notes) or `0` for positions,
    /// which carry their balance in `margin`/`size` instead.
    #[serde_as(as = "DisplayFromStr")]
    pub amount: u64,
    /// `true` once this leaf's spending nullifier has been observed as
    /// spent in the chain view, via `scan_with_status`.
    pub spent: bool,
}

/// The full exported/importable scanner state for one or more viewing keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ExportedCache {
    /// `view_key_id -> account_hash -> serialized note`.
    pub notes: HashMap<String, HashMap<String, CachedNote>>,
    /// `pool_id -> last-scanned slot`.
    pub slots: HashMap<String, i64>,
}

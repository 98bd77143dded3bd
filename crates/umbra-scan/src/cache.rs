//! Per-viewing-key note cache and per-pool scan cursor (§4.I, §5, §6).
//!
//! The cache is process-local and owned by one [`crate::scanner::Scanner`]
//! instance; notes are immutable once cached, only "not ours" classification
//! may later be confirmed or left untouched.

use std::collections::HashMap;

use umbra_core::group::SubgroupElement;
use umbra_core::note::Note;
use umbra_core::schema::{CachedNote, ExportedCache};

/// One cached classification of a leaf-account hash.
#[derive(Debug, Clone)]
pub enum CacheEntry {
    /// A successfully decrypted, commitment-verified note.
    Owned {
        /// The decrypted note.
        note: Note,
        /// Position in the pool's merkle tree.
        leaf_index: u64,
        /// Set once `scan_with_status` observes the spending nullifier as
        /// already present externally.
        spent: bool,
        /// The key that decrypted this note: either the viewing key or the
        /// derived stealth spending key, needed to re-derive the spending
        /// nullifier later.
        spend_sk: SubgroupElement,
    },
    /// Decryption or commitment verification failed; not this viewing key's
    /// note.
    NotOurs,
}

/// The note cache and cursor set for a single viewing key.
#[derive(Debug, Default)]
pub struct ViewKeyCache {
    /// `account_hash -> classification`.
    entries: HashMap<String, CacheEntry>,
}

impl ViewKeyCache {
    /// Look up a cached classification by account hash.
    #[must_use]
    pub fn get(&self, account_hash: &str) -> Option<&CacheEntry> {
        self.entries.get(account_hash)
    }

    /// Record a classification. Notes are write-once: re-inserting the same
    /// hash with a different note is a caller bug, but the cache does not
    /// enforce it (the scanner never revisits a hash once resolved).
    pub fn insert(&mut self, account_hash: String, entry: CacheEntry) {
        self.entries.insert(account_hash, entry);
    }

    /// All currently owned (non-dust, non-"not ours") notes.
    pub fn owned_notes(&self) -> impl Iterator<Item = (&str, &Note, u64, bool)> {
        self.entries.iter().filter_map(|(hash, entry)| match entry {
            CacheEntry::Owned { note, leaf_index, spent, .. } => Some((hash.as_str(), note, *leaf_index, *spent)),
            CacheEntry::NotOurs => None,
        })
    }

    /// Mark a previously cached owned note as spent.
    pub fn mark_spent(&mut self, account_hash: &str) {
        if let Some(CacheEntry::Owned { spent, .. }) = self.entries.get_mut(account_hash) {
            *spent = true;
        }
    }
}

/// The full scanner cache: one [`ViewKeyCache`] per viewing key id, plus
/// per-pool scan cursors.
#[derive(Debug, Default)]
pub struct ScannerCache {
    view_keys: HashMap<String, ViewKeyCache>,
    /// `pool_id_hex -> last-scanned slot`.
    cursors: HashMap<String, i64>,
}

impl ScannerCache {
    /// Get or create the cache for a viewing key id.
    pub fn view_key_mut(&mut self, view_key_id: &str) -> &mut ViewKeyCache {
        self.view_keys.entry(view_key_id.to_owned()).or_default()
    }

    /// Read-only access to a viewing key's cache, if it has scanned before.
    #[must_use]
    pub fn view_key(&self, view_key_id: &str) -> Option<&ViewKeyCache> {
        self.view_keys.get(view_key_id)
    }

    /// The last-scanned slot recorded for a pool, if any.
    #[must_use]
    pub fn cursor(&self, pool_id_hex: &str) -> Option<i64> {
        self.cursors.get(pool_id_hex).copied()
    }

    /// Advance a pool's cursor to `slot` if it is newer than what is stored.
    pub fn advance_cursor(&mut self, pool_id_hex: &str, slot: i64) {
        let entry = self.cursors.entry(pool_id_hex.to_owned()).or_insert(slot);
        if slot > *entry {
            *entry = slot;
        }
    }

    /// Export the cache in the persisted, string-friendly format (§6).
    #[must_use]
    pub fn export(&self) -> ExportedCache {
        let mut notes = HashMap::new();
        for (view_key_id, cache) in &self.view_keys {
            let mut per_account = HashMap::new();
            for (hash, entry) in &cache.entries {
                if let CacheEntry::Owned { note, spent, .. } = entry {
                    per_account.insert(hash.clone(), cached_note_from(note, *spent));
                }
            }
            notes.insert(view_key_id.clone(), per_account);
        }
        ExportedCache { notes, slots: self.cursors.clone() }
    }

    /// Rebuild cursor state from a previously exported cache. Note contents
    /// are not restored (callers must re-derive notes since the exported
    /// format is lossy for the purposes of resuming decryption), but cursors
    /// let a rescan skip already-seen slots when combined with `since_slot`.
    pub fn import_cursors(&mut self, exported: &ExportedCache) {
        for (pool_id_hex, slot) in &exported.slots {
            self.advance_cursor(pool_id_hex, *slot);
        }
    }
}

fn cached_note_from(note: &Note, spent: bool) -> CachedNote {
    let commitment = note.commitment().map(|field| hex::encode(field.to_bytes_be())).unwrap_or_default();
    let amount = match note {
        Note::Fungible(fungible) => fungible.amount,
        Note::Liquidity(liquidity) => liquidity.lp_amount,
        Note::Position(position) => position.margin,
    };
    CachedNote {
        commitment_hex: commitment,
        stealth_pub_base58: bs58_like(&note.stealth_pub_x().to_bytes_be()),
        amount,
        spent,
    }
}

/// Base58 is only used for the exported cache's point encoding; since
/// `umbra-core` does not carry a base58 dependency, hex stands in as the
/// string-friendly encoding here.
fn bs58_like(bytes: &[u8; 32]) -> String {
    hex::encode(bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use umbra_core::field::FieldElement;
    use umbra_core::note::{FungibleNote, Note};

    use super::*;

    fn sample_note() -> Note {
        Note::Fungible(FungibleNote {
            stealth_pub_x: FieldElement::from_u64(7),
            token_mint: FieldElement::from_u64(1000),
            amount: 500,
            randomness: FieldElement::from_u64(111),
        })
    }

    fn test_sk() -> SubgroupElement {
        SubgroupElement::from_bytes_be_mod_order(&FieldElement::from_u64(1).to_bytes_be())
    }

    #[test]
    fn insert_and_get_round_trips() {
        let mut cache = ScannerCache::default();
        cache.view_key_mut("vk1").insert(
            "hash1".to_owned(),
            CacheEntry::Owned { note: sample_note(), leaf_index: 3, spent: false, spend_sk: test_sk() },
        );
        assert!(matches!(cache.view_key("vk1").unwrap().get("hash1"), Some(CacheEntry::Owned { .. })));
    }

    #[test]
    fn cursor_only_advances_forward() {
        let mut cache = ScannerCache::default();
        cache.advance_cursor("pool1", 100);
        cache.advance_cursor("pool1", 50);
        assert_eq!(cache.cursor("pool1"), Some(100));
        cache.advance_cursor("pool1", 200);
        assert_eq!(cache.cursor("pool1"), Some(200));
    }

    #[test]
    fn export_includes_only_owned_notes() {
        let mut cache = ScannerCache::default();
        cache.view_key_mut("vk1").insert("hash1".to_owned(), CacheEntry::NotOurs);
        cache.view_key_mut("vk1").insert(
            "hash2".to_owned(),
            CacheEntry::Owned { note: sample_note(), leaf_index: 0, spent: false, spend_sk: test_sk() },
        );
        let exported = cache.export();
        let per_account = exported.notes.get("vk1").unwrap();
        assert_eq!(per_account.len(), 1);
        assert!(per_account.contains_key("hash2"));
    }
}

//! The trial-decryption scanner (§4.I).

use std::sync::Arc;
use std::time::Duration;

use tiny_keccak::{Hasher as _, Keccak};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use umbra_core::field::FieldElement;
use umbra_core::group::{CurvePoint, SubgroupElement};
use umbra_core::note::Note;
use umbra_core::nullifier::{NullifierKey, spending_nullifier};
use umbra_core::schema::{CommitmentLeaf, ExportedCache};
use umbra_core::stealth::stealth_spending_key;
use umbra_core::{encryption, retry};

use crate::cache::{CacheEntry, ScannerCache};
use crate::error::ScanError;
use crate::indexer::{IndexerClient, OwnerFilters};

/// Options controlling one [`Scanner::scan`] call.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Restrict to a single pool.
    pub pool: Option<[u8; 32]>,
    /// Skip leaves whose creation slot is at or below this cursor.
    pub since_slot: Option<i64>,
    /// Cap the number of accounts fetched this call.
    pub max_accounts: Option<u32>,
    /// Trial-decryption concurrency; defaults to 10 (§4.I).
    pub parallel_batch_size: usize,
}

impl ScanOptions {
    fn batch_size(&self) -> usize {
        if self.parallel_batch_size == 0 { 10 } else { self.parallel_batch_size }
    }
}

/// One note the scanner has attributed to the caller's viewing key.
#[derive(Debug, Clone)]
pub struct ScannedNote {
    /// The indexer's account hash/address, as a hex string.
    pub account_hash: String,
    /// The decrypted, commitment-verified note.
    pub note: Note,
    /// Position in the pool's merkle tree.
    pub leaf_index: u64,
    /// Slot the leaf was created at.
    pub created_at_slot: i64,
    /// The key that actually decrypted this note: the viewing key itself for
    /// an internal leaf, or the derived stealth spending key otherwise
    /// (§4.E). Spending-nullifier derivation must use this, not the bare
    /// viewing key.
    pub spend_sk: SubgroupElement,
    /// Populated only by [`Scanner::scan_with_status`].
    pub spent: Option<bool>,
}

/// The scanner: owns the note cache, cursors, and the indexer client used to
/// discover and decrypt leaves.
pub struct Scanner {
    indexer: Arc<dyn IndexerClient>,
    retry_config: umbra_core::schema::RetryConfig,
    cache: tokio::sync::Mutex<ScannerCache>,
}

impl Scanner {
    /// Build a scanner over `indexer`, applying `retry_config` to every
    /// indexer call.
    #[must_use]
    pub fn new(indexer: Arc<dyn IndexerClient>, retry_config: umbra_core::schema::RetryConfig) -> Self {
        Self { indexer, retry_config, cache: tokio::sync::Mutex::new(ScannerCache::default()) }
    }

    /// Scan for notes owned by `sk` (the viewing key, identical to the
    /// spending key per §9's Open Question resolution).
    pub async fn scan(
        &self,
        sk: SubgroupElement,
        program_id: &str,
        view_key_id: &str,
        opts: ScanOptions,
    ) -> Result<Vec<ScannedNote>, ScanError> {
        let accounts = self.fetch_accounts_with_retry(program_id, opts.pool).await?;
        let accounts = match opts.max_accounts {
            Some(max) => accounts.into_iter().take(usize::try_from(max).unwrap_or(usize::MAX)).collect(),
            None => accounts,
        };

        let mut pending = Vec::new();
        let mut max_slot = None;
        let mut results = Vec::new();

        {
            let mut cache = self.cache.lock().await;
            let view_cache = cache.view_key_mut(view_key_id);

            for account in accounts {
                let Some(data) = account.data else { continue };
                max_slot = Some(max_slot.map_or(account.slot, |current: i64| current.max(account.slot)));

                let account_hash = hex::encode(&account.address);
                let below_cursor = opts.since_slot.is_some_and(|since| account.slot <= since);

                if let Some(entry) = view_cache.get(&account_hash) {
                    if let CacheEntry::Owned { note, leaf_index, spent, spend_sk } = entry {
                        results.push(ScannedNote {
                            account_hash: account_hash.clone(),
                            note: *note,
                            leaf_index: *leaf_index,
                            created_at_slot: account.slot,
                            spend_sk: *spend_sk,
                            spent: if *spent { Some(true) } else { None },
                        });
                    }
                    continue;
                }
                if below_cursor {
                    continue;
                }
                pending.push((account_hash, data, account.slot));
            }
        }

        let decrypted = self.decrypt_batch(sk, pending, opts.batch_size()).await?;

        {
            let mut cache = self.cache.lock().await;
            let view_cache = cache.view_key_mut(view_key_id);
            for outcome in decrypted {
                match outcome.note {
                    Some(note) if !note.is_zero_amount() => {
                        view_cache.insert(
                            outcome.account_hash.clone(),
                            CacheEntry::Owned {
                                note,
                                leaf_index: outcome.leaf_index,
                                spent: false,
                                spend_sk: outcome.spend_sk,
                            },
                        );
                        results.push(ScannedNote {
                            account_hash: outcome.account_hash,
                            note,
                            leaf_index: outcome.leaf_index,
                            created_at_slot: outcome.created_at_slot,
                            spend_sk: outcome.spend_sk,
                            spent: None,
                        });
                    }
                    Some(note) => {
                        view_cache.insert(
                            outcome.account_hash,
                            CacheEntry::Owned {
                                note,
                                leaf_index: outcome.leaf_index,
                                spent: false,
                                spend_sk: outcome.spend_sk,
                            },
                        );
                    }
                    None => {
                        view_cache.insert(outcome.account_hash, CacheEntry::NotOurs);
                    }
                }
            }

            if let (Some(pool), Some(slot)) = (opts.pool, max_slot) {
                cache.advance_cursor(&hex::encode(pool), slot);
            }
        }

        Ok(results)
    }

    /// Like [`Scanner::scan`], additionally deriving each note's spending
    /// nullifier and batching one external lookup to classify spent/unspent.
    pub async fn scan_with_status(
        &self,
        sk: SubgroupElement,
        nk: NullifierKey,
        program_id: &str,
        view_key_id: &str,
        pool_id: [u8; 32],
        opts: ScanOptions,
    ) -> Result<Vec<ScannedNote>, ScanError> {
        let mut notes = self.scan(sk, program_id, view_key_id, opts).await?;

        let mut nullifiers = Vec::with_capacity(notes.len());
        for scanned in &notes {
            let commitment = scanned.note.commitment().map_err(|err| ScanError::Crypto(err.to_string()))?;
            let nullifier = spending_nullifier(nk, commitment, Some(scanned.leaf_index))
                .map_err(|err| ScanError::Crypto(err.to_string()))?;
            nullifiers.push(nullifier_address(&pool_id, &nullifier));
        }

        if nullifiers.is_empty() {
            return Ok(notes);
        }

        let spent_flags = self.batch_check_nullifiers_with_retry(&nullifiers).await?;

        let mut cache = self.cache.lock().await;
        let view_cache = cache.view_key_mut(view_key_id);
        for (note, spent) in notes.iter_mut().zip(spent_flags) {
            note.spent = Some(spent);
            if spent {
                view_cache.mark_spent(&note.account_hash);
            }
        }

        Ok(notes)
    }

    /// Unspent notes only.
    pub async fn unspent(
        &self,
        sk: SubgroupElement,
        nk: NullifierKey,
        program_id: &str,
        view_key_id: &str,
        pool_id: [u8; 32],
        opts: ScanOptions,
    ) -> Result<Vec<ScannedNote>, ScanError> {
        let notes = self.scan_with_status(sk, nk, program_id, view_key_id, pool_id, opts).await?;
        Ok(notes.into_iter().filter(|note| note.spent != Some(true)).collect())
    }

    /// Sum of unspent fungible-note amounts for one token mint.
    pub async fn balance(
        &self,
        sk: SubgroupElement,
        nk: NullifierKey,
        program_id: &str,
        view_key_id: &str,
        pool_id: [u8; 32],
        token_mint: FieldElement,
        opts: ScanOptions,
    ) -> Result<u64, ScanError> {
        let notes = self.unspent(sk, nk, program_id, view_key_id, pool_id, opts).await?;
        let mut total: u64 = 0;
        for scanned in notes {
            if let Note::Fungible(fungible) = scanned.note {
                if fungible.token_mint == token_mint {
                    total = total.saturating_add(fungible.amount);
                }
            }
        }
        Ok(total)
    }

    /// The last-scanned slot cursor for `pool_id`, if this scanner has seen
    /// it before.
    pub async fn cursor(&self, pool_id: [u8; 32]) -> Option<i64> {
        self.cache.lock().await.cursor(&hex::encode(pool_id))
    }

    /// Export the cache in the persisted, string-friendly format (§6).
    pub async fn export_cache(&self) -> ExportedCache {
        self.cache.lock().await.export()
    }

    /// Restore cursor state from a previously exported cache.
    pub async fn import_cache(&self, exported: &ExportedCache) {
        self.cache.lock().await.import_cursors(exported);
    }

    async fn fetch_accounts_with_retry(
        &self,
        program_id: &str,
        pool: Option<[u8; 32]>,
    ) -> Result<Vec<crate::indexer::IndexedAccount>, ScanError> {
        let mut attempt = 0_u32;
        loop {
            match self.indexer.get_compressed_accounts_by_owner(program_id, OwnerFilters { pool_id: pool }).await {
                Ok(page) => return Ok(page.items),
                Err(ScanError::IndexerRateLimited) => {
                    let decision = retry::decide(
                        &self.retry_config,
                        attempt,
                        retry::RetryOutcome::RateLimited { retry_after_secs: None },
                        0.0,
                    );
                    match decision {
                        retry::RetryDecision::RetryAfter(delay) => {
                            warn!(attempt, delay_ms = duration_millis(delay), "retrying rate-limited indexer call");
                            tokio::time::sleep(delay).await;
                            attempt = attempt.saturating_add(1);
                        }
                        retry::RetryDecision::GiveUp => return Err(ScanError::IndexerRateLimited),
                    }
                }
                Err(other) => return Err(other),
            }
        }
    }

    async fn batch_check_nullifiers_with_retry(&self, addresses: &[Vec<u8>]) -> Result<Vec<bool>, ScanError> {
        self.indexer.batch_check_nullifiers(addresses).await
    }

    async fn decrypt_batch(
        &self,
        sk: SubgroupElement,
        pending: Vec<(String, Vec<u8>, i64)>,
        batch_size: usize,
    ) -> Result<Vec<DecryptOutcome>, ScanError> {
        let semaphore = Arc::new(Semaphore::new(batch_size.max(1)));
        let mut join_set = JoinSet::new();

        for (account_hash, data, slot) in pending {
            let permit = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let _permit = permit.acquire_owned().await.ok();
                decrypt_one(sk, account_hash, data, slot)
            });
        }

        let mut out = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            out.push(joined?);
        }
        Ok(out)
    }
}

fn duration_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

struct DecryptOutcome {
    account_hash: String,
    note: Option<Note>,
    leaf_index: u64,
    created_at_slot: i64,
    spend_sk: SubgroupElement,
}

fn decrypt_one(sk: SubgroupElement, account_hash: String, data: Vec<u8>, slot: i64) -> DecryptOutcome {
    let Ok(leaf) = CommitmentLeaf::from_bytes(&data) else {
        debug!(account_hash, "rejecting leaf with malformed layout");
        return DecryptOutcome { account_hash, note: None, leaf_index: 0, created_at_slot: slot, spend_sk: sk };
    };

    let Ok(encrypted) = encryption::EncryptedNote::from_wire_bytes(&leaf.encrypted_note) else {
        return DecryptOutcome {
            account_hash,
            note: None,
            leaf_index: leaf.leaf_index,
            created_at_slot: slot,
            spend_sk: sk,
        };
    };

    let decryption_key = if leaf.is_internal_ephemeral() {
        sk
    } else {
        let Ok(ephemeral_pub) = CurvePoint::from_xy(
            FieldElement::from_bytes_be(&leaf.stealth_ephemeral.0).unwrap_or(FieldElement::ZERO),
            FieldElement::from_bytes_be(&leaf.stealth_ephemeral.1).unwrap_or(FieldElement::ZERO),
        ) else {
            return DecryptOutcome {
                account_hash,
                note: None,
                leaf_index: leaf.leaf_index,
                created_at_slot: slot,
                spend_sk: sk,
            };
        };
        let Ok(stealth_sk) = stealth_spending_key(sk, ephemeral_pub) else {
            return DecryptOutcome {
                account_hash,
                note: None,
                leaf_index: leaf.leaf_index,
                created_at_slot: slot,
                spend_sk: sk,
            };
        };
        stealth_sk
    };

    match encryption::try_decrypt_any(&encrypted, decryption_key, leaf.commitment) {
        Ok(note) => DecryptOutcome {
            account_hash,
            note: Some(note),
            leaf_index: leaf.leaf_index,
            created_at_slot: slot,
            spend_sk: decryption_key,
        },
        Err(_) => DecryptOutcome {
            account_hash,
            note: None,
            leaf_index: leaf.leaf_index,
            created_at_slot: slot,
            spend_sk: decryption_key,
        },
    }
}

/// Deterministic nullifier-address derivation from `["spend_nullifier",
/// pool_id, nullifier]` (§6). The indexer's actual address-tree scheme is
/// external and opaque; this hashes the same seed triple with the stack's
/// existing keccak primitive so repeated calls are stable and collision-free
/// across pools.
fn nullifier_address(pool_id: &[u8; 32], nullifier: &FieldElement) -> Vec<u8> {
    let mut hasher = Keccak::v256();
    hasher.update(b"spend_nullifier");
    hasher.update(pool_id);
    hasher.update(&nullifier.to_bytes_be());
    let mut out = [0_u8; 32];
    hasher.finalize(&mut out);
    out.to_vec()
}

//! Exercises the scanner's cache across process boundaries: a second
//! `Scanner` built from an exported cache should skip re-decrypting leaves
//! its cursor has already passed.

use std::sync::Arc;

use async_trait::async_trait;
use rand::rngs::OsRng;
use umbra_core::encryption::encrypt_note;
use umbra_core::field::FieldElement;
use umbra_core::group::{CurvePoint, SubgroupElement};
use umbra_core::note::{FungibleNote, Note};
use umbra_core::schema::{CommitmentLeaf, RetryConfig};
use umbra_scan::{
    AccountPage, IndexedAccount, IndexerClient, OwnerFilters, ScanError, ScanOptions, Scanner,
};

struct StaticIndexer {
    accounts: Vec<IndexedAccount>,
}

#[async_trait]
impl IndexerClient for StaticIndexer {
    async fn get_compressed_account(&self, _address: &[u8]) -> Result<Option<IndexedAccount>, ScanError> {
        Ok(None)
    }

    async fn get_multiple_compressed_accounts(&self, _addresses: &[Vec<u8>]) -> Result<Vec<Option<IndexedAccount>>, ScanError> {
        Ok(Vec::new())
    }

    async fn get_compressed_accounts_by_owner(&self, _program_id: &str, _filters: OwnerFilters) -> Result<AccountPage, ScanError> {
        Ok(AccountPage { items: self.accounts.clone() })
    }

    async fn get_validity_proof(&self, _request: umbra_scan::ValidityProofRequest) -> Result<umbra_scan::ValidityProof, ScanError> {
        unimplemented!("not exercised by this test")
    }

    async fn get_compressed_account_proof(&self, _hash: [u8; 32]) -> Result<umbra_scan::AccountProof, ScanError> {
        unimplemented!("not exercised by this test")
    }

    async fn batch_check_nullifiers(&self, addresses: &[Vec<u8>]) -> Result<Vec<bool>, ScanError> {
        Ok(vec![false; addresses.len()])
    }
}

fn sk_of(seed: u64) -> SubgroupElement {
    SubgroupElement::from_bytes_be_mod_order(&FieldElement::from_u64(seed).to_bytes_be())
}

fn leaf_account(pool_id: [u8; 32], sk: SubgroupElement, amount: u64, leaf_index: u64, slot: i64) -> IndexedAccount {
    let pub_key = CurvePoint::derive_public_key(sk);
    let note = Note::Fungible(FungibleNote {
        stealth_pub_x: pub_key.x(),
        token_mint: FieldElement::from_u64(1000),
        amount,
        randomness: FieldElement::from_u64(leaf_index.wrapping_add(1)),
    });
    let commitment = note.commitment().expect("commitment");
    let encrypted = encrypt_note(&note, pub_key, &mut OsRng).expect("encrypt");
    let leaf = CommitmentLeaf {
        pool_id,
        commitment,
        leaf_index,
        stealth_ephemeral: ([0_u8; 32], [0_u8; 32]),
        encrypted_note: encrypted.to_wire_bytes(),
        created_at_slot: slot,
    };
    IndexedAccount {
        address: format!("leaf-{leaf_index}").into_bytes(),
        data: Some(leaf.to_bytes().expect("leaf fits the fixed layout").to_vec()),
        slot,
    }
}

#[tokio::test]
async fn exported_cursor_lets_a_fresh_scanner_skip_already_scanned_slots() {
    let pool_id = [9_u8; 32];
    let sk = sk_of(42);
    let account = leaf_account(pool_id, sk, 777, 0, 5);

    let first = Scanner::new(Arc::new(StaticIndexer { accounts: vec![account.clone()] }), RetryConfig::default());
    let opts = ScanOptions { pool: Some(pool_id), ..ScanOptions::default() };
    let found = first.scan(sk, "umbra-program", "vk", opts.clone()).await.expect("scan");
    assert_eq!(found.len(), 1);
    assert_eq!(first.cursor(pool_id).await, Some(5));

    let exported = first.export_cache().await;
    let per_account = exported.notes.get("vk").expect("viewing key present");
    assert_eq!(per_account.len(), 1);

    // A brand new scanner, as a restarted process would build, replays the
    // same indexer page but restores only the cursor from the export — the
    // cache format is lossy for note contents (see `ScannerCache::import_cursors`),
    // so it re-decrypts the leaf rather than reusing the exported entry.
    let second = Scanner::new(Arc::new(StaticIndexer { accounts: vec![account] }), RetryConfig::default());
    second.import_cache(&exported).await;
    assert_eq!(second.cursor(pool_id).await, Some(5));

    let rescanned = second.scan(sk, "umbra-program", "vk", ScanOptions { since_slot: Some(5), ..opts }).await.expect("scan");
    assert!(rescanned.is_empty(), "leaf at slot 5 is at or below the restored cursor and should be skipped");
}

#[tokio::test]
async fn second_scan_of_the_same_scanner_hits_the_cache() {
    let pool_id = [3_u8; 32];
    let sk = sk_of(11);
    let account = leaf_account(pool_id, sk, 200, 1, 10);

    let scanner = Scanner::new(Arc::new(StaticIndexer { accounts: vec![account] }), RetryConfig::default());
    let opts = ScanOptions { pool: Some(pool_id), ..ScanOptions::default() };

    let first = scanner.scan(sk, "umbra-program", "vk", opts.clone()).await.expect("scan");
    assert_eq!(first.len(), 1);

    let second = scanner.scan(sk, "umbra-program", "vk", opts).await.expect("scan");
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].note.commitment().expect("commitment"), first[0].note.commitment().expect("commitment"));
}

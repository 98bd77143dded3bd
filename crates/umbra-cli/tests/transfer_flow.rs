//! End-to-end CLI smoke tests: build a fixture with one owned note, then
//! drive `scan`, `balance`, and `transfer` against it through the compiled
//! binary.

use assert_cmd::Command;
use rand::rngs::OsRng;
use serde_json::json;
use umbra_core::encryption::encrypt_note;
use umbra_core::field::FieldElement;
use umbra_core::group::{CurvePoint, SubgroupElement};
use umbra_core::note::{FungibleNote, Note};
use umbra_core::schema::CommitmentLeaf;

const SEED: &str = "0000000000000000000000000000000000000000000000000000000000007b";
const RECIPIENT_SEED: &str = "0000000000000000000000000000000000000000000000000000000000002a";
const TOKEN_MINT: u64 = 1000;

fn pool_id_hex() -> String {
    "07".repeat(32)
}

fn seed_bytes(seed_hex: &str) -> [u8; 32] {
    let mut bytes = [0_u8; 32];
    hex::decode_to_slice(seed_hex, &mut bytes).expect("valid hex seed");
    bytes
}

fn write_fixture(dir: &std::path::Path, amount: u64) -> std::path::PathBuf {
    let sk = SubgroupElement::from_bytes_be_mod_order(&seed_bytes(SEED));
    let pub_key = CurvePoint::derive_public_key(sk);
    let pool_id: [u8; 32] = hex::decode(pool_id_hex()).expect("valid hex pool id").try_into().expect("32 bytes");

    let note = Note::Fungible(FungibleNote {
        stealth_pub_x: pub_key.x(),
        token_mint: FieldElement::from_u64(TOKEN_MINT),
        amount,
        randomness: FieldElement::from_u64(11),
    });
    let commitment = note.commitment().expect("commitment");
    let encrypted = encrypt_note(&note, pub_key, &mut OsRng).expect("encrypt");
    let leaf = CommitmentLeaf {
        pool_id,
        commitment,
        leaf_index: 0,
        stealth_ephemeral: ([0_u8; 32], [0_u8; 32]),
        encrypted_note: encrypted.to_wire_bytes(),
        created_at_slot: 1,
    };
    let leaf_bytes = leaf.to_bytes().expect("leaf fits the fixed layout");

    let fixture = json!({
        "accounts": [{
            "address": hex::encode("leaf-0"),
            "data": hex::encode(leaf_bytes),
            "slot": 1,
        }]
    });

    let path = dir.join("fixture.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&fixture).expect("serializable fixture")).expect("write fixture");
    path
}

#[test]
fn scan_finds_the_fixtures_note() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let fixture_path = write_fixture(tmp.path(), 500);
    let pool_id = pool_id_hex();

    let mut cmd = Command::cargo_bin("umbra").expect("binary built");
    cmd.args(["scan", "--fixture", fixture_path.to_str().expect("utf8 path"), "--seed", SEED, "--pool-id", &pool_id]);
    let output = cmd.output().expect("ran umbra scan");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("fungible amount=500"));
}

#[test]
fn balance_sums_the_fixtures_note() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let fixture_path = write_fixture(tmp.path(), 500);
    let pool_id = pool_id_hex();

    let mut cmd = Command::cargo_bin("umbra").expect("binary built");
    cmd.args([
        "balance",
        "--fixture",
        fixture_path.to_str().expect("utf8 path"),
        "--seed",
        SEED,
        "--pool-id",
        &pool_id,
        "--token-mint",
        &TOKEN_MINT.to_string(),
    ]);
    let output = cmd.output().expect("ran umbra balance");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("500"));
}

#[test]
fn transfer_settles_to_a_closed_operation() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let fixture_path = write_fixture(tmp.path(), 500);
    let pool_id = pool_id_hex();
    let pending_dir = tmp.path().join("pending");

    let mut cmd = Command::cargo_bin("umbra").expect("binary built");
    cmd.args([
        "transfer",
        "--fixture",
        fixture_path.to_str().expect("utf8 path"),
        "--seed",
        SEED,
        "--pool-id",
        &pool_id,
        "--token-mint",
        &TOKEN_MINT.to_string(),
        "--amount",
        "200",
        "--recipient-seed",
        RECIPIENT_SEED,
        "--pending-dir",
        pending_dir.to_str().expect("utf8 path"),
    ]);
    let output = cmd.output().expect("ran umbra transfer");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("operation closed"));
}

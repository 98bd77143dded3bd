//! Implementations backing each CLI subcommand.

use std::sync::Arc;

use rand::rngs::OsRng;
use umbra_core::field::FieldElement;
use umbra_core::group::CurvePoint;
use umbra_core::note::Note;
use umbra_core::nullifier::NullifierKey;
use umbra_core::schema::RetryConfig;
use umbra_sdk::{FilePendingStore, MockProofBackend, Orchestrator, WorkflowContext};
use umbra_scan::{ScanOptions, Scanner};

use crate::cli::{AddLiquidityArgs, BalanceArgs, RemoveLiquidityArgs, ScanArgs, SwapArgs, TransferArgs};
use crate::demo::DemoSettlementClient;
use crate::fixtures::{Fixture, FixtureIndexerClient};

fn parse_seed(seed_hex: &str) -> eyre::Result<umbra_core::group::SubgroupElement> {
    let bytes = hex::decode(seed_hex)?;
    let array: [u8; 32] =
        bytes.try_into().map_err(|_| eyre::eyre!("seed must be exactly 32 bytes (64 hex chars)"))?;
    Ok(umbra_core::group::SubgroupElement::from_bytes_be_mod_order(&array))
}

fn parse_hash32(hex_str: &str, what: &str) -> eyre::Result<[u8; 32]> {
    let bytes = hex::decode(hex_str)?;
    bytes.try_into().map_err(|_| eyre::eyre!("{what} must be exactly 32 bytes (64 hex chars)"))
}

async fn build_scanner(args: &ScanArgs) -> eyre::Result<Scanner> {
    let fixture = Fixture::load(&args.fixture)?;
    let indexer = Arc::new(FixtureIndexerClient::new(&fixture)?);
    Ok(Scanner::new(indexer, RetryConfig::default()))
}

fn build_orchestrator(pending_dir: &std::path::Path, fanout: usize) -> eyre::Result<Orchestrator<DemoSettlementClient, MockProofBackend>> {
    let store = FilePendingStore::new(pending_dir)?;
    Ok(Orchestrator::new(DemoSettlementClient::default(), MockProofBackend, Box::new(store)).with_fanout(fanout))
}

/// Derive and print a spending key, public key, and nullifier key.
#[allow(clippy::print_stdout, reason = "key material the user explicitly asked to derive")]
pub fn key_derive(seed_hex: &str) -> eyre::Result<()> {
    let sk = parse_seed(seed_hex)?;
    let public_key = CurvePoint::derive_public_key(sk);
    let nullifier_key = NullifierKey::derive(sk)?;
    println!("public_key.x:  {}", hex::encode(public_key.x().to_bytes_be()));
    println!("public_key.y:  {}", hex::encode(public_key.y().to_bytes_be()));
    println!("nullifier_key: {}", hex::encode(nullifier_key.as_field().to_bytes_be()));
    Ok(())
}

fn describe_note(note: &Note) -> String {
    match note {
        Note::Fungible(fungible) => format!("fungible amount={}", fungible.amount),
        Note::Position(position) => format!("position size={} leverage={}", position.size, position.leverage),
        Note::Liquidity(liquidity) => format!("liquidity lp_amount={}", liquidity.lp_amount),
    }
}

/// Scan a fixture for owned notes and print each one's status.
#[allow(clippy::print_stdout, reason = "scan results are the command's output")]
pub async fn scan(args: &ScanArgs) -> eyre::Result<()> {
    let scanner = build_scanner(args).await?;
    let sk = parse_seed(&args.seed)?;
    let nk = NullifierKey::derive(sk)?;
    let pool_id = parse_hash32(&args.pool_id, "pool id")?;
    let notes = scanner
        .scan_with_status(sk, nk, &args.program_id, &args.view_key_id, pool_id, ScanOptions { pool: Some(pool_id), ..ScanOptions::default() })
        .await?;

    if notes.is_empty() {
        println!("no owned notes found");
        return Ok(());
    }
    for scanned in &notes {
        let status = if scanned.spent == Some(true) { "spent" } else { "unspent" };
        println!("{} leaf_index={} slot={} status={} {}", scanned.account_hash, scanned.leaf_index, scanned.created_at_slot, status, describe_note(&scanned.note));
    }
    Ok(())
}

/// Sum unspent balance for one token mint.
#[allow(clippy::print_stdout, reason = "balance is the command's output")]
pub async fn balance(args: &BalanceArgs) -> eyre::Result<()> {
    let scanner = build_scanner(&args.scan).await?;
    let sk = parse_seed(&args.scan.seed)?;
    let nk = NullifierKey::derive(sk)?;
    let pool_id = parse_hash32(&args.scan.pool_id, "pool id")?;
    let token_mint = FieldElement::from_u64(args.token_mint);
    let total = scanner
        .balance(sk, nk, &args.scan.program_id, &args.scan.view_key_id, pool_id, token_mint, ScanOptions { pool: Some(pool_id), ..ScanOptions::default() })
        .await?;
    println!("{total}");
    Ok(())
}

/// Demonstrate a private transfer, settling it end-to-end against the demo
/// settlement client.
#[allow(clippy::print_stdout, reason = "the closed operation id is the command's output")]
pub async fn transfer(args: &TransferArgs) -> eyre::Result<()> {
    let scanner = build_scanner(&args.scan).await?;
    let sk = parse_seed(&args.scan.seed)?;
    let nk = NullifierKey::derive(sk)?;
    let pool_id = parse_hash32(&args.scan.pool_id, "pool id")?;
    let token_mint = FieldElement::from_u64(args.token_mint);
    let sender_pub = CurvePoint::derive_public_key(sk);
    let recipient_pub = CurvePoint::derive_public_key(parse_seed(&args.recipient_seed)?);

    let orchestrator = build_orchestrator(&args.pending_dir, args.fanout)?;
    let context = WorkflowContext { scanner, orchestrator };
    let mut rng = OsRng;
    let operation_id = context
        .transfer(sk, nk, &args.scan.program_id, &args.scan.view_key_id, pool_id, token_mint, args.amount, recipient_pub, sender_pub, &mut rng)
        .await?;
    println!("operation closed: {}", hex::encode(operation_id));
    Ok(())
}

/// Demonstrate a constant-product swap, settling it end-to-end against the
/// demo settlement client.
#[allow(clippy::print_stdout, reason = "the closed operation id is the command's output")]
pub async fn swap(args: &SwapArgs) -> eyre::Result<()> {
    let scanner = build_scanner(&args.scan).await?;
    let sk = parse_seed(&args.scan.seed)?;
    let nk = NullifierKey::derive(sk)?;
    let pool_id = parse_hash32(&args.scan.pool_id, "pool id")?;
    let token_in = FieldElement::from_u64(args.token_in);
    let token_out = FieldElement::from_u64(args.token_out);
    let sender_pub = CurvePoint::derive_public_key(sk);

    let orchestrator = build_orchestrator(&args.pending_dir, umbra_sdk::DEFAULT_FANOUT)?;
    let context = WorkflowContext { scanner, orchestrator };
    let mut rng = OsRng;
    let operation_id = context
        .swap(
            sk,
            nk,
            &args.scan.program_id,
            &args.scan.view_key_id,
            pool_id,
            token_in,
            token_out,
            args.amount_in,
            args.reserve_in,
            args.reserve_out,
            args.fee_bps,
            args.slippage_bps,
            sender_pub,
            &mut rng,
        )
        .await?;
    println!("operation closed: {}", hex::encode(operation_id));
    Ok(())
}

/// Demonstrate adding liquidity, settling it end-to-end against the demo
/// settlement client.
#[allow(clippy::print_stdout, reason = "the closed operation id is the command's output")]
pub async fn add_liquidity(args: &AddLiquidityArgs) -> eyre::Result<()> {
    let scanner = build_scanner(&args.scan).await?;
    let sk = parse_seed(&args.scan.seed)?;
    let nk = NullifierKey::derive(sk)?;
    let pool_id = parse_hash32(&args.scan.pool_id, "pool id")?;
    let token_a = FieldElement::from_u64(args.token_a);
    let token_b = FieldElement::from_u64(args.token_b);
    let sender_pub = CurvePoint::derive_public_key(sk);

    let orchestrator = build_orchestrator(&args.pending_dir, umbra_sdk::DEFAULT_FANOUT)?;
    let context = WorkflowContext { scanner, orchestrator };
    let mut rng = OsRng;
    let operation_id = context
        .add_liquidity(
            sk,
            nk,
            &args.scan.program_id,
            &args.scan.view_key_id,
            pool_id,
            token_a,
            token_b,
            args.deposit_a,
            args.deposit_b,
            args.reserve_a,
            args.reserve_b,
            args.lp_supply,
            sender_pub,
            &mut rng,
        )
        .await?;
    println!("operation closed: {}", hex::encode(operation_id));
    Ok(())
}

/// Demonstrate removing liquidity, settling it end-to-end against the demo
/// settlement client.
#[allow(clippy::print_stdout, reason = "the closed operation id is the command's output")]
pub async fn remove_liquidity(args: &RemoveLiquidityArgs) -> eyre::Result<()> {
    let scanner = build_scanner(&args.scan).await?;
    let sk = parse_seed(&args.scan.seed)?;
    let nk = NullifierKey::derive(sk)?;
    let pool_id = parse_hash32(&args.scan.pool_id, "pool id")?;
    let token_a = FieldElement::from_u64(args.token_a);
    let token_b = FieldElement::from_u64(args.token_b);
    let sender_pub = CurvePoint::derive_public_key(sk);

    let orchestrator = build_orchestrator(&args.pending_dir, umbra_sdk::DEFAULT_FANOUT)?;
    let context = WorkflowContext { scanner, orchestrator };
    let mut rng = OsRng;
    let operation_id = context
        .remove_liquidity(
            sk,
            nk,
            &args.scan.program_id,
            &args.scan.view_key_id,
            pool_id,
            token_a,
            token_b,
            args.lp_amount,
            args.reserve_a,
            args.reserve_b,
            args.lp_supply,
            sender_pub,
            &mut rng,
        )
        .await?;
    println!("operation closed: {}", hex::encode(operation_id));
    Ok(())
}

/// Resume a crashed operation from its locally persisted record.
#[allow(clippy::print_stdout, reason = "resume status is the command's output")]
pub async fn pending_resume(operation_id_hex: &str, pending_dir: &std::path::Path) -> eyre::Result<()> {
    let operation_id = parse_hash32(operation_id_hex, "operation id")?;
    let orchestrator = build_orchestrator(pending_dir, umbra_sdk::DEFAULT_FANOUT)?;
    let (phase, remaining_nullifiers, remaining_commitments) = orchestrator.resume_pending(operation_id).await?;
    println!("resumed from {phase:?}, {remaining_nullifiers} nullifiers and {remaining_commitments} commitments were outstanding");
    Ok(())
}

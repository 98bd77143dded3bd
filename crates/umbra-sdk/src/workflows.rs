//! End-to-end workflow composers: scan for spendable notes, build the
//! public witness, and drive it through the orchestrator.
//!
//! Each workflow picks its own inputs by balance (no coin selection
//! strategy beyond "oldest first among unspent") and leaves proof
//! generation to the injected [`ProofBackend`]; see [`crate::orchestrator`].

use rand_core::{CryptoRng, RngCore};
use umbra_core::amm::{self, AmmError};
use umbra_core::encryption::encrypt_note;
use umbra_core::group::{CurvePoint, SubgroupElement};
use umbra_core::note::{FungibleNote, LiquidityNote, Note};
use umbra_core::nullifier::{spending_nullifier, NullifierKey};
use umbra_core::schema::CommitmentLeaf;
use umbra_core::stealth::{derive_stealth_output, internal_ephemeral};
use umbra_scan::{ScanOptions, ScannedNote, Scanner};

use crate::error::SdkError;
use crate::orchestrator::{Orchestrator, SettlementClient};
use crate::proof_backend::{ProofBackend, PublicWitness};

/// A newly built, not-yet-encrypted output and the leaf it will settle to,
/// kept alongside the note so a workflow can hand it to a recipient
/// out-of-band if needed (e.g. change notes returning to the sender).
pub struct PlannedOutput {
    /// The note fields.
    pub note: Note,
    /// Its commitment, the public value carried in the witness.
    pub commitment: [u8; 32],
    /// The encrypted leaf bytes a phase-3 transaction submits.
    pub leaf: CommitmentLeaf,
}

fn field_to_bytes(value: umbra_core::field::FieldElement) -> [u8; 32] {
    value.to_bytes_be()
}

/// Select unspent notes (oldest leaf first) whose total meets `target`.
/// Errors with [`AmmError::InsufficientLiquidity`] if the owned set cannot
/// cover it — reusing that variant since "not enough of this token" and
/// "not enough pool liquidity" are the same caller-facing condition.
fn select_inputs(mut notes: Vec<ScannedNote>, target: u64, amount_of: impl Fn(&Note) -> u64) -> Result<Vec<ScannedNote>, SdkError> {
    notes.sort_by_key(|scanned| scanned.leaf_index);
    let mut picked = Vec::new();
    let mut total: u64 = 0;
    for scanned in notes {
        if total >= target {
            break;
        }
        total = total.saturating_add(amount_of(&scanned.note));
        picked.push(scanned);
    }
    if total < target {
        return Err(SdkError::Amm(AmmError::InsufficientLiquidity));
    }
    Ok(picked)
}

/// Fungible balance of `note` in `token_mint`, `0` for any other note
/// variant or mint. Named per-variant (not a wildcard arm) per the
/// workspace's enum-exhaustiveness lint.
fn fungible_amount_of(note: &Note, token_mint: umbra_core::field::FieldElement) -> u64 {
    match note {
        Note::Fungible(fungible) if fungible.token_mint == token_mint => fungible.amount,
        Note::Fungible(_) | Note::Position(_) | Note::Liquidity(_) => 0,
    }
}

/// LP-share balance of `note`, `0` for any other note variant.
fn liquidity_amount_of(note: &Note) -> u64 {
    match note {
        Note::Liquidity(liquidity) => liquidity.lp_amount,
        Note::Fungible(_) | Note::Position(_) => 0,
    }
}

fn build_output(
    note: Note,
    pool_id: [u8; 32],
    recipient: CurvePoint,
    internal: bool,
    created_at_slot: i64,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<PlannedOutput, SdkError> {
    let commitment = note.commitment().map_err(|err| SdkError::Crypto(err.to_string()))?;
    let encrypted = encrypt_note(&note, recipient, rng).map_err(|err| SdkError::Crypto(err.to_string()))?;
    let stealth_ephemeral = if internal {
        (field_to_bytes(internal_ephemeral().x()), field_to_bytes(internal_ephemeral().y()))
    } else {
        (field_to_bytes(encrypted.ephemeral_pub.x()), field_to_bytes(encrypted.ephemeral_pub.y()))
    };
    let leaf = CommitmentLeaf {
        pool_id,
        commitment,
        leaf_index: 0,
        stealth_ephemeral,
        encrypted_note: encrypted.to_wire_bytes(),
        created_at_slot,
    };
    Ok(PlannedOutput { note, commitment: field_to_bytes(commitment), leaf })
}

fn input_nullifiers(nk: NullifierKey, inputs: &[ScannedNote]) -> Result<Vec<[u8; 32]>, SdkError> {
    inputs
        .iter()
        .map(|scanned| {
            let commitment = scanned.note.commitment().map_err(|err| SdkError::Crypto(err.to_string()))?;
            let nullifier = spending_nullifier(nk, commitment, Some(scanned.leaf_index)).map_err(|err| SdkError::Crypto(err.to_string()))?;
            Ok(field_to_bytes(nullifier))
        })
        .collect()
}

/// Bundles the pieces every workflow needs: a scanner to find spendable
/// notes and an orchestrator to settle the resulting witness.
pub struct WorkflowContext<S, P> {
    /// Finds this account's owned, unspent notes.
    pub scanner: Scanner,
    /// Drives the four-phase settlement protocol.
    pub orchestrator: Orchestrator<S, P>,
}

impl<S, P> WorkflowContext<S, P>
where
    S: SettlementClient,
    P: ProofBackend,
{
    /// Private transfer: spend `amount` of `token_mint` from `pool_id` to
    /// `recipient`, with any excess returned to the sender as a change
    /// note whose ephemeral key is the identity (§4.E internal operation).
    #[allow(clippy::too_many_arguments, reason = "workflow entrypoint mirrors the settlement witness shape")]
    pub async fn transfer(
        &self,
        sk: SubgroupElement,
        nk: NullifierKey,
        program_id: &str,
        view_key_id: &str,
        pool_id: [u8; 32],
        token_mint: umbra_core::field::FieldElement,
        amount: u64,
        recipient: CurvePoint,
        sender_pub: CurvePoint,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<[u8; 32], SdkError> {
        let unspent = self.scanner.unspent(sk, nk, program_id, view_key_id, pool_id, ScanOptions { pool: Some(pool_id), ..Default::default() }).await?;
        let amount_of = |note: &Note| fungible_amount_of(note, token_mint);
        let inputs = select_inputs(unspent, amount, amount_of)?;
        let spent_total: u64 = inputs.iter().map(|scanned| amount_of(&scanned.note)).fold(0_u64, u64::saturating_add);
        let change = spent_total.saturating_sub(amount);

        let mut outputs = vec![build_output(
            Note::Fungible(FungibleNote { stealth_pub_x: recipient.x(), token_mint, amount, randomness: fresh_randomness(rng) }),
            pool_id,
            recipient,
            false,
            0,
            rng,
        )?];
        if change > 0 {
            outputs.push(build_output(
                Note::Fungible(FungibleNote { stealth_pub_x: sender_pub.x(), token_mint, amount: change, randomness: fresh_randomness(rng) }),
                pool_id,
                sender_pub,
                true,
                0,
                rng,
            )?);
        }

        let witness = PublicWitness {
            merkle_root: [0_u8; 32],
            nullifiers: input_nullifiers(nk, &inputs)?,
            commitments: outputs.iter().map(|output| output.commitment).collect(),
            old_state_hash: None,
            new_state_hash: None,
            amounts: vec![amount],
        };
        self.orchestrator.run(witness).await
    }

    /// Constant-product swap within `pool_id`: spend `amount_in` of
    /// `token_in`, emit the swapped output note plus any AMM fee accrual
    /// the caller's reserves reflect.
    #[allow(clippy::too_many_arguments, reason = "swap witness needs both reserves and both mints")]
    pub async fn swap(
        &self,
        sk: SubgroupElement,
        nk: NullifierKey,
        program_id: &str,
        view_key_id: &str,
        pool_id: [u8; 32],
        token_in: umbra_core::field::FieldElement,
        token_out: umbra_core::field::FieldElement,
        amount_in: u64,
        reserve_in: u64,
        reserve_out: u64,
        fee_bps: u16,
        slippage_bps: u16,
        sender_pub: CurvePoint,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<[u8; 32], SdkError> {
        let unspent = self.scanner.unspent(sk, nk, program_id, view_key_id, pool_id, ScanOptions { pool: Some(pool_id), ..Default::default() }).await?;
        let amount_of = |note: &Note| fungible_amount_of(note, token_in);
        let inputs = select_inputs(unspent, amount_in, amount_of)?;

        let swap_result = amm::swap_output(reserve_in, reserve_out, amount_in, fee_bps)?;
        let min_out = amm::min_out_with_slippage(swap_result.amount_out, slippage_bps)?;
        amm::check_slippage(swap_result.amount_out, min_out)?;

        let old_state_hash = amm::state_hash(reserve_in, reserve_out, 0, pool_id);
        let new_state_hash = amm::state_hash(swap_result.new_reserve_in, swap_result.new_reserve_out, 0, pool_id);

        let output = build_output(
            Note::Fungible(FungibleNote { stealth_pub_x: sender_pub.x(), token_mint: token_out, amount: swap_result.amount_out, randomness: fresh_randomness(rng) }),
            pool_id,
            sender_pub,
            true,
            0,
            rng,
        )?;

        let witness = PublicWitness {
            merkle_root: [0_u8; 32],
            nullifiers: input_nullifiers(nk, &inputs)?,
            commitments: vec![output.commitment],
            old_state_hash: Some(old_state_hash),
            new_state_hash: Some(new_state_hash),
            amounts: vec![amount_in, swap_result.amount_out],
        };
        self.orchestrator.run(witness).await
    }

    /// Add liquidity: spend `deposit_a`/`deposit_b` and mint LP shares,
    /// using the proportional formula once the pool has existing supply.
    #[allow(clippy::too_many_arguments, reason = "liquidity witness needs both deposits and both reserves")]
    pub async fn add_liquidity(
        &self,
        sk: SubgroupElement,
        nk: NullifierKey,
        program_id: &str,
        view_key_id: &str,
        pool_id: [u8; 32],
        token_a: umbra_core::field::FieldElement,
        token_b: umbra_core::field::FieldElement,
        deposit_a: u64,
        deposit_b: u64,
        reserve_a: u64,
        reserve_b: u64,
        lp_supply: u64,
        sender_pub: CurvePoint,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<[u8; 32], SdkError> {
        let unspent = self.scanner.unspent(sk, nk, program_id, view_key_id, pool_id, ScanOptions { pool: Some(pool_id), ..Default::default() }).await?;
        let amount_a_of = |note: &Note| fungible_amount_of(note, token_a);
        let amount_b_of = |note: &Note| fungible_amount_of(note, token_b);
        let mut inputs = select_inputs(unspent.clone(), deposit_a, amount_a_of)?;
        inputs.extend(select_inputs(unspent, deposit_b, amount_b_of)?);

        let lp_minted = if lp_supply == 0 {
            amm::calculate_initial_lp(deposit_a, deposit_b)?
        } else {
            amm::calculate_proportional_lp(deposit_a, deposit_b, reserve_a, reserve_b, lp_supply)?
        };

        let new_reserve_a = reserve_a.checked_add(deposit_a).ok_or(AmmError::AmountOverflow)?;
        let new_reserve_b = reserve_b.checked_add(deposit_b).ok_or(AmmError::AmountOverflow)?;
        let new_lp_supply = lp_supply.checked_add(lp_minted).ok_or(AmmError::AmountOverflow)?;
        let old_state_hash = amm::state_hash(reserve_a, reserve_b, lp_supply, pool_id);
        let new_state_hash = amm::state_hash(new_reserve_a, new_reserve_b, new_lp_supply, pool_id);

        let pool_id_field = umbra_core::field::FieldElement::reduce_bytes_be(&pool_id);
        let output = build_output(
            Note::Liquidity(LiquidityNote { stealth_pub_x: sender_pub.x(), pool_id: pool_id_field, lp_amount: lp_minted, randomness: fresh_randomness(rng) }),
            pool_id,
            sender_pub,
            true,
            0,
            rng,
        )?;

        let witness = PublicWitness {
            merkle_root: [0_u8; 32],
            nullifiers: input_nullifiers(nk, &inputs)?,
            commitments: vec![output.commitment],
            old_state_hash: Some(old_state_hash),
            new_state_hash: Some(new_state_hash),
            amounts: vec![deposit_a, deposit_b, lp_minted],
        };
        self.orchestrator.run(witness).await
    }

    /// Remove liquidity: burn an owned LP note and emit the two
    /// proportional withdrawal notes.
    #[allow(clippy::too_many_arguments, reason = "withdrawal witness needs both reserves and the mints they output")]
    pub async fn remove_liquidity(
        &self,
        sk: SubgroupElement,
        nk: NullifierKey,
        program_id: &str,
        view_key_id: &str,
        pool_id: [u8; 32],
        token_a: umbra_core::field::FieldElement,
        token_b: umbra_core::field::FieldElement,
        lp_amount: u64,
        reserve_a: u64,
        reserve_b: u64,
        lp_supply: u64,
        sender_pub: CurvePoint,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<[u8; 32], SdkError> {
        let unspent = self.scanner.unspent(sk, nk, program_id, view_key_id, pool_id, ScanOptions { pool: Some(pool_id), ..Default::default() }).await?;
        let inputs = select_inputs(unspent, lp_amount, liquidity_amount_of)?;

        let (delta_a, delta_b) = amm::calculate_withdrawal(lp_amount, reserve_a, reserve_b, lp_supply)?;
        let new_reserve_a = reserve_a.checked_sub(delta_a).ok_or(AmmError::InsufficientLiquidity)?;
        let new_reserve_b = reserve_b.checked_sub(delta_b).ok_or(AmmError::InsufficientLiquidity)?;
        let new_lp_supply = lp_supply.checked_sub(lp_amount).ok_or(AmmError::InsufficientLiquidity)?;
        let old_state_hash = amm::state_hash(reserve_a, reserve_b, lp_supply, pool_id);
        let new_state_hash = amm::state_hash(new_reserve_a, new_reserve_b, new_lp_supply, pool_id);

        let output_a = build_output(
            Note::Fungible(FungibleNote { stealth_pub_x: sender_pub.x(), token_mint: token_a, amount: delta_a, randomness: fresh_randomness(rng) }),
            pool_id,
            sender_pub,
            true,
            0,
            rng,
        )?;
        let output_b = build_output(
            Note::Fungible(FungibleNote { stealth_pub_x: sender_pub.x(), token_mint: token_b, amount: delta_b, randomness: fresh_randomness(rng) }),
            pool_id,
            sender_pub,
            true,
            0,
            rng,
        )?;

        let witness = PublicWitness {
            merkle_root: [0_u8; 32],
            nullifiers: input_nullifiers(nk, &inputs)?,
            commitments: vec![output_a.commitment, output_b.commitment],
            old_state_hash: Some(old_state_hash),
            new_state_hash: Some(new_state_hash),
            amounts: vec![lp_amount, delta_a, delta_b],
        };
        self.orchestrator.run(witness).await
    }
}

fn fresh_randomness(rng: &mut (impl RngCore + CryptoRng)) -> umbra_core::field::FieldElement {
    let mut bytes = [0_u8; 32];
    rng.fill_bytes(&mut bytes);
    umbra_core::field::FieldElement::reduce_bytes_be(&bytes)
}

/// Build a one-time stealth output for a fresh recipient, for workflows
/// that need to hand a freshly derived address to a counterparty before
/// composing the settlement witness.
pub fn derive_recipient_output<R: RngCore + CryptoRng>(
    recipient_pub: CurvePoint,
    rng: &mut R,
) -> Result<(CurvePoint, CurvePoint), SdkError> {
    let (output, ephemeral_scalar) = derive_stealth_output(recipient_pub, rng).map_err(|err| SdkError::Crypto(err.to_string()))?;
    let ephemeral_pub = CurvePoint::generator().scalar_mul(ephemeral_scalar);
    Ok((output.stealth_pub, ephemeral_pub))
}

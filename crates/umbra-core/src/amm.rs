//! Constant-product AMM math (§4.H): swap output, fee accounting, LP
//! issuance/redemption, and pool state-hash integrity.

use thiserror::Error;
use tiny_keccak::{Hasher as _, Keccak};

/// Errors raised by AMM math. All arithmetic is checked; any overflow or
/// division by zero surfaces here rather than panicking.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmmError {
    /// An intermediate product or sum exceeded the available integer width.
    #[error("amount overflow")]
    AmountOverflow,
    /// A division would have divided by zero (e.g. empty reserves).
    #[error("insufficient liquidity")]
    InsufficientLiquidity,
    /// `provided_lp` did not equal the independently recomputed amount.
    #[error("lp amount mismatch: provided {provided}, calculated {calculated}")]
    LpAmountMismatch {
        /// LP amount claimed by the caller.
        provided: u64,
        /// LP amount recomputed from current reserves.
        calculated: u64,
    },
    /// The calculated output fell below the caller's slippage floor.
    #[error("slippage exceeded: got {got}, minimum {minimum}")]
    SlippageExceeded {
        /// Amount actually produced.
        got: u64,
        /// Caller's minimum acceptable amount.
        minimum: u64,
    },
}

const BPS_DENOMINATOR: u128 = 10_000;

/// Output of a constant-product swap: `Δ_eff`, `Δ_out`, and the resulting
/// reserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapResult {
    /// Input amount after the fee is deducted.
    pub effective_input: u64,
    /// Output amount delivered to the trader.
    pub amount_out: u64,
    /// Reserve of the input token after the swap.
    pub new_reserve_in: u64,
    /// Reserve of the output token after the swap.
    pub new_reserve_out: u64,
}

/// Compute a constant-product swap output for input `delta` against
/// reserves `(reserve_in, reserve_out)` with a fee in basis points.
pub fn swap_output(
    reserve_in: u64,
    reserve_out: u64,
    delta: u64,
    fee_bps: u16,
) -> Result<SwapResult, AmmError> {
    if reserve_in == 0 || reserve_out == 0 {
        return Err(AmmError::InsufficientLiquidity);
    }
    if delta == 0 {
        return Ok(SwapResult {
            effective_input: 0,
            amount_out: 0,
            new_reserve_in: reserve_in,
            new_reserve_out: reserve_out,
        });
    }

    let fee_bps_u128 = u128::from(fee_bps);
    let delta_u128 = u128::from(delta);
    let reserve_in_u128 = u128::from(reserve_in);
    let reserve_out_u128 = u128::from(reserve_out);

    let fee_multiplier = BPS_DENOMINATOR.checked_sub(fee_bps_u128).ok_or(AmmError::AmountOverflow)?;
    let effective_input = delta_u128
        .checked_mul(fee_multiplier)
        .ok_or(AmmError::AmountOverflow)?
        .checked_div(BPS_DENOMINATOR)
        .ok_or(AmmError::InsufficientLiquidity)?;

    let scaled_reserve_in = reserve_in_u128.checked_mul(BPS_DENOMINATOR).ok_or(AmmError::AmountOverflow)?;
    let scaled_delta = delta_u128.checked_mul(fee_multiplier).ok_or(AmmError::AmountOverflow)?;
    let numerator = reserve_out_u128.checked_mul(scaled_delta).ok_or(AmmError::AmountOverflow)?;
    let denominator = scaled_reserve_in.checked_add(scaled_delta).ok_or(AmmError::AmountOverflow)?;
    let amount_out = numerator.checked_div(denominator).ok_or(AmmError::InsufficientLiquidity)?;

    let new_reserve_in = reserve_in_u128.checked_add(delta_u128).ok_or(AmmError::AmountOverflow)?;
    let new_reserve_out = reserve_out_u128.checked_sub(amount_out).ok_or(AmmError::AmountOverflow)?;

    Ok(SwapResult {
        effective_input: u64::try_from(effective_input).map_err(|_| AmmError::AmountOverflow)?,
        amount_out: u64::try_from(amount_out).map_err(|_| AmmError::AmountOverflow)?,
        new_reserve_in: u64::try_from(new_reserve_in).map_err(|_| AmmError::AmountOverflow)?,
        new_reserve_out: u64::try_from(new_reserve_out).map_err(|_| AmmError::AmountOverflow)?,
    })
}

/// `min_out = floor(amount_out * (10000 - slippage_bps) / 10000)`.
pub fn min_out_with_slippage(amount_out: u64, slippage_bps: u16) -> Result<u64, AmmError> {
    let tolerance = BPS_DENOMINATOR.checked_sub(u128::from(slippage_bps)).ok_or(AmmError::AmountOverflow)?;
    let scaled = u128::from(amount_out).checked_mul(tolerance).ok_or(AmmError::AmountOverflow)?;
    let min_out = scaled.checked_div(BPS_DENOMINATOR).ok_or(AmmError::InsufficientLiquidity)?;
    u64::try_from(min_out).map_err(|_| AmmError::AmountOverflow)
}

/// Reject the trade if `amount_out` falls below `min_out`.
pub fn check_slippage(amount_out: u64, min_out: u64) -> Result<(), AmmError> {
    if amount_out < min_out {
        return Err(AmmError::SlippageExceeded { got: amount_out, minimum: min_out });
    }
    Ok(())
}

/// `lp_minted = floor(sqrt(deposit_a * deposit_b))`, for the pool's first
/// liquidity deposit.
pub fn calculate_initial_lp(deposit_a: u64, deposit_b: u64) -> Result<u64, AmmError> {
    let product = u128::from(deposit_a).checked_mul(u128::from(deposit_b)).ok_or(AmmError::AmountOverflow)?;
    u64::try_from(integer_sqrt(product)).map_err(|_| AmmError::AmountOverflow)
}

/// `lp_minted = min(deposit_a * supply / reserve_a, deposit_b * supply / reserve_b)`,
/// for deposits into a non-empty pool.
pub fn calculate_proportional_lp(
    deposit_a: u64,
    deposit_b: u64,
    reserve_a: u64,
    reserve_b: u64,
    lp_supply: u64,
) -> Result<u64, AmmError> {
    let lp_from_a = u128::from(deposit_a)
        .checked_mul(u128::from(lp_supply))
        .ok_or(AmmError::AmountOverflow)?
        .checked_div(u128::from(reserve_a))
        .ok_or(AmmError::InsufficientLiquidity)?;
    let lp_from_b = u128::from(deposit_b)
        .checked_mul(u128::from(lp_supply))
        .ok_or(AmmError::AmountOverflow)?
        .checked_div(u128::from(reserve_b))
        .ok_or(AmmError::InsufficientLiquidity)?;
    u64::try_from(lp_from_a.min(lp_from_b)).map_err(|_| AmmError::AmountOverflow)
}

/// Exact-match check preventing LP-token inflation: the claimed LP amount
/// must equal the independently calculated one.
pub fn validate_lp_amount(provided_lp: u64, calculated_lp: u64) -> Result<(), AmmError> {
    if provided_lp != calculated_lp {
        return Err(AmmError::LpAmountMismatch { provided: provided_lp, calculated: calculated_lp });
    }
    Ok(())
}

/// Withdrawal amounts for burning `lp` shares: `Δ_a = floor(lp * R_a / L)`,
/// `Δ_b = floor(lp * R_b / L)`.
pub fn calculate_withdrawal(lp: u64, reserve_a: u64, reserve_b: u64, lp_supply: u64) -> Result<(u64, u64), AmmError> {
    if lp_supply == 0 {
        return Err(AmmError::InsufficientLiquidity);
    }
    let delta_a = u128::from(lp)
        .checked_mul(u128::from(reserve_a))
        .ok_or(AmmError::AmountOverflow)?
        .checked_div(u128::from(lp_supply))
        .ok_or(AmmError::InsufficientLiquidity)?;
    let delta_b = u128::from(lp)
        .checked_mul(u128::from(reserve_b))
        .ok_or(AmmError::AmountOverflow)?
        .checked_div(u128::from(lp_supply))
        .ok_or(AmmError::InsufficientLiquidity)?;
    Ok((
        u64::try_from(delta_a).map_err(|_| AmmError::AmountOverflow)?,
        u64::try_from(delta_b).map_err(|_| AmmError::AmountOverflow)?,
    ))
}

/// `floor(sqrt(n))` via Newton's (Babylonian) method.
#[allow(
    clippy::arithmetic_side_effects,
    reason = "halving a checked_add result is always well-defined for u128"
)]
fn integer_sqrt(n: u128) -> u128 {
    if n == 0 {
        return 0;
    }
    if n <= 3 {
        return 1;
    }
    let mut x = n;
    let mut y = x.checked_add(1).unwrap_or(x) / 2;
    while y < x {
        x = y;
        y = x.checked_add(n.checked_div(x).unwrap_or(0)).unwrap_or(x) / 2;
    }
    x
}

/// `keccak256(reserve_a_le(8) || reserve_b_le(8) || lp_supply_le(8) || pool_id(32))`.
#[must_use]
pub fn state_hash(reserve_a: u64, reserve_b: u64, lp_supply: u64, pool_id: [u8; 32]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(&reserve_a.to_le_bytes());
    hasher.update(&reserve_b.to_le_bytes());
    hasher.update(&lp_supply.to_le_bytes());
    hasher.update(&pool_id);
    let mut out = [0_u8; 32];
    hasher.finalize(&mut out);
    out
}

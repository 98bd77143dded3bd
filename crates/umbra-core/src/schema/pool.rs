//! AMM pool state (§3, §4.H).

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::amm::state_hash;

/// The mutable state of one constant-product pool.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    /// Pool identifier.
    #[serde_as(as = "serde_with::hex::Hex")]
    pub pool_id: [u8; 32],
    /// Token A mint.
    #[serde_as(as = "serde_with::hex::Hex")]
    pub mint_a: [u8; 32],
    /// Token B mint.
    #[serde_as(as = "serde_with::hex::Hex")]
    pub mint_b: [u8; 32],
    /// LP share mint.
    #[serde_as(as = "serde_with::hex::Hex")]
    pub lp_mint: [u8; 32],
    /// Token A reserve.
    pub reserve_a: u64,
    /// Token B reserve.
    pub reserve_b: u64,
    /// Total LP share supply.
    pub lp_supply: u64,
    /// Swap fee, in basis points.
    pub fee_bps: u16,
    /// The pool's current integrity hash.
    #[serde_as(as = "serde_with::hex::Hex")]
    pub state_hash: [u8; 32],
}

impl PoolState {
    /// Recompute [`PoolState::state_hash`] from the current reserves.
    #[must_use]
    pub fn recompute_state_hash(&self) -> [u8; 32] {
        state_hash(self.reserve_a, self.reserve_b, self.lp_supply, self.pool_id)
    }

    /// True if `state_hash` matches what the current reserves produce.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.state_hash == self.recompute_state_hash()
    }
}

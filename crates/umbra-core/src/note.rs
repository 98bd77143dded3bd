//! Note variants and their commitment formulas.
//!
//! A commitment is a pure function of a note's fields and its randomness; the
//! per-variant domain tag keeps commitments of different note kinds from
//! colliding even if their field values happen to coincide.

use crate::field::FieldElement;
use crate::hash::{Domain, HashError, hash_with_domain};

/// A shielded fungible-token note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FungibleNote {
    /// `x` coordinate of the owning stealth public key.
    pub stealth_pub_x: FieldElement,
    /// Token mint, reduced modulo `p`.
    pub token_mint: FieldElement,
    /// Token amount.
    pub amount: u64,
    /// Uniform 32-byte randomness, drawn fresh per note.
    pub randomness: FieldElement,
}

/// A perpetual position note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionNote {
    /// `x` coordinate of the owning stealth public key.
    pub stealth_pub_x: FieldElement,
    /// Market identifier, reduced modulo `p`.
    pub market_id: FieldElement,
    /// `true` for a long position, `false` for short.
    pub is_long: bool,
    /// Posted margin.
    pub margin: u64,
    /// Position size.
    pub size: u64,
    /// Leverage multiplier.
    pub leverage: u32,
    /// Entry price.
    pub entry_price: u64,
    /// Uniform 32-byte randomness, drawn fresh per note.
    pub randomness: FieldElement,
}

/// A liquidity-share note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityNote {
    /// `x` coordinate of the owning stealth public key.
    pub stealth_pub_x: FieldElement,
    /// Pool identifier, reduced modulo `p`.
    pub pool_id: FieldElement,
    /// LP share amount.
    pub lp_amount: u64,
    /// Uniform 32-byte randomness, drawn fresh per note.
    pub randomness: FieldElement,
}

/// The tagged union of all note variants the scanner must be able to decrypt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Note {
    /// See [`FungibleNote`].
    Fungible(FungibleNote),
    /// See [`PositionNote`].
    Position(PositionNote),
    /// See [`LiquidityNote`].
    Liquidity(LiquidityNote),
}

impl Note {
    /// Dispatch to the variant-specific commitment formula.
    pub fn commitment(&self) -> Result<FieldElement, HashError> {
        match self {
            Self::Fungible(note) => fungible_commitment(note),
            Self::Position(note) => position_commitment(note),
            Self::Liquidity(note) => liquidity_commitment(note),
        }
    }

    /// The note's balance-bearing amount, for dust filtering (§4.I step 6).
    #[must_use]
    pub fn is_zero_amount(&self) -> bool {
        match self {
            Self::Fungible(note) => note.amount == 0,
            Self::Position(note) => note.margin == 0 && note.size == 0,
            Self::Liquidity(note) => note.lp_amount == 0,
        }
    }

    /// The note's owning stealth public key `x` coordinate.
    #[must_use]
    pub fn stealth_pub_x(&self) -> FieldElement {
        match self {
            Self::Fungible(note) => note.stealth_pub_x,
            Self::Position(note) => note.stealth_pub_x,
            Self::Liquidity(note) => note.stealth_pub_x,
        }
    }
}

fn fungible_commitment(note: &FungibleNote) -> Result<FieldElement, HashError> {
    hash_with_domain(
        Domain::CommitFungible,
        &[
            note.stealth_pub_x,
            note.token_mint,
            FieldElement::from_u64(note.amount),
            note.randomness,
        ],
    )
}

fn position_commitment(note: &PositionNote) -> Result<FieldElement, HashError> {
    hash_with_domain(
        Domain::CommitPosition,
        &[
            note.stealth_pub_x,
            note.market_id,
            pack_is_long_leverage(note.is_long, note.leverage),
            FieldElement::from_u64(note.margin),
            FieldElement::from_u64(note.size),
            FieldElement::from_u64(note.entry_price),
            note.randomness,
        ],
    )
}

fn liquidity_commitment(note: &LiquidityNote) -> Result<FieldElement, HashError> {
    hash_with_domain(
        Domain::CommitLp,
        &[
            note.stealth_pub_x,
            note.pool_id,
            FieldElement::from_u64(note.lp_amount),
            note.randomness,
        ],
    )
}

/// Pack `(is_long, leverage)` into a single field element: the low bit holds
/// the side, the remaining bits hold the leverage multiplier.
#[allow(
    clippy::arithmetic_side_effects,
    reason = "leverage is a u32 and the shift by one bit cannot overflow a u64"
)]
fn pack_is_long_leverage(is_long: bool, leverage: u32) -> FieldElement {
    let packed = (u64::from(leverage) << 1) | u64::from(is_long);
    FieldElement::from_u64(packed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fungible(amount: u64, randomness: u64) -> FungibleNote {
        FungibleNote {
            stealth_pub_x: FieldElement::from_u64(999),
            token_mint: FieldElement::from_u64(1000),
            amount,
            randomness: FieldElement::from_u64(randomness),
        }
    }

    #[test]
    fn commitment_is_pure_function_of_fields() {
        let n1 = Note::Fungible(fungible(500, 111));
        let n2 = Note::Fungible(fungible(500, 111));
        assert_eq!(n1.commitment().unwrap(), n2.commitment().unwrap());
    }

    #[test]
    fn commitment_changes_with_any_field() {
        let base = Note::Fungible(fungible(500, 111));
        let changed_amount = Note::Fungible(fungible(501, 111));
        let changed_randomness = Note::Fungible(fungible(500, 112));
        assert_ne!(base.commitment().unwrap(), changed_amount.commitment().unwrap());
        assert_ne!(base.commitment().unwrap(), changed_randomness.commitment().unwrap());
    }

    #[test]
    fn different_variants_do_not_collide() {
        let fungible_note = Note::Fungible(fungible(0, 0));
        let liquidity_note = Note::Liquidity(LiquidityNote {
            stealth_pub_x: FieldElement::from_u64(999),
            pool_id: FieldElement::from_u64(1000),
            lp_amount: 0,
            randomness: FieldElement::from_u64(0),
        });
        assert_ne!(
            fungible_note.commitment().unwrap(),
            liquidity_note.commitment().unwrap()
        );
    }

    #[test]
    fn zero_amount_notes_are_flagged() {
        assert!(Note::Fungible(fungible(0, 1)).is_zero_amount());
        assert!(!Note::Fungible(fungible(1, 1)).is_zero_amount());
    }

    #[test]
    fn commitment_vector_from_scenario_one() {
        // sk = 123, P = 123.G, note { stealth_pub_x = P.x, mint = 1000, amount = 500, randomness = 111 }
        use crate::group::{CurvePoint, SubgroupElement};
        let sk = SubgroupElement::from_bytes_be_mod_order(&FieldElement::from_u64(123).to_bytes_be());
        let p = CurvePoint::derive_public_key(sk);
        let note = Note::Fungible(FungibleNote {
            stealth_pub_x: p.x(),
            token_mint: FieldElement::from_u64(1000),
            amount: 500,
            randomness: FieldElement::from_u64(111),
        });
        let expected = hash_with_domain(
            Domain::CommitFungible,
            &[p.x(), FieldElement::from_u64(1000), FieldElement::from_u64(500), FieldElement::from_u64(111)],
        )
        .unwrap();
        assert_eq!(note.commitment().unwrap(), expected);
    }
}

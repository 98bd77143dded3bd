//! Nullifier key and nullifier derivation.

use crate::field::FieldElement;
use crate::group::SubgroupElement;
use crate::hash::{Domain, HashError, hash_with_domain};

/// A nullifier key, derived once per spending key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NullifierKey(FieldElement);

impl NullifierKey {
    /// `nk = H(NULLIFIER_KEY, sk, 0)`.
    pub fn derive(sk: SubgroupElement) -> Result<Self, HashError> {
        let sk_field = FieldElement::reduce_bytes_be(&sk.to_bytes_be());
        let nk = hash_with_domain(Domain::NullifierKey, &[sk_field, FieldElement::ZERO])?;
        Ok(Self(nk))
    }

    #[must_use]
    pub fn as_field(self) -> FieldElement {
        self.0
    }
}

/// An error raised when deriving a spending nullifier without a bound leaf
/// position, which the spec forbids outright (§4.D).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NullifierError {
    /// A spending nullifier was requested with no `leaf_index` available.
    #[error("spending nullifier requires a bound leaf_index")]
    MissingLeafIndex,
    /// The underlying hash failed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

/// `N_spend = H(SPEND_NULL, nk, commitment, leaf_index)`.
///
/// `leaf_index` is required: the spend path must never emit a spending
/// nullifier that is not bound to the commitment's tree position.
pub fn spending_nullifier(
    nk: NullifierKey,
    commitment: FieldElement,
    leaf_index: Option<u64>,
) -> Result<FieldElement, NullifierError> {
    let leaf_index = leaf_index.ok_or(NullifierError::MissingLeafIndex)?;
    let nullifier = hash_with_domain(
        Domain::SpendNull,
        &[nk.as_field(), commitment, FieldElement::from_u64(leaf_index)],
    )?;
    Ok(nullifier)
}

/// `N_action = H(ACTION_NULL, nk, commitment, action_domain)`.
///
/// Unlike [`spending_nullifier`], this does not consume the note: it is
/// spent independently per action (e.g. one vote per proposal).
pub fn action_nullifier(
    nk: NullifierKey,
    commitment: FieldElement,
    action_domain: FieldElement,
) -> Result<FieldElement, HashError> {
    hash_with_domain(Domain::ActionNull, &[nk.as_field(), commitment, action_domain])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sk_123() -> SubgroupElement {
        SubgroupElement::from_bytes_be_mod_order(&FieldElement::from_u64(123).to_bytes_be())
    }

    #[test]
    fn spending_nullifier_requires_leaf_index() {
        let nk = NullifierKey::derive(sk_123()).unwrap();
        let commitment = FieldElement::from_u64(7);
        assert_eq!(
            spending_nullifier(nk, commitment, None),
            Err(NullifierError::MissingLeafIndex)
        );
    }

    #[test]
    fn different_leaf_index_yields_different_nullifier() {
        let nk = NullifierKey::derive(sk_123()).unwrap();
        let commitment = FieldElement::from_u64(7);
        let n5 = spending_nullifier(nk, commitment, Some(5)).unwrap();
        let n6 = spending_nullifier(nk, commitment, Some(6)).unwrap();
        assert_ne!(n5, n6);
    }

    #[test]
    fn deterministic_for_fixed_inputs() {
        let nk = NullifierKey::derive(sk_123()).unwrap();
        let commitment = FieldElement::from_u64(7);
        let a = spending_nullifier(nk, commitment, Some(5)).unwrap();
        let b = spending_nullifier(nk, commitment, Some(5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn boundary_leaf_indices_produce_valid_nullifiers() {
        let nk = NullifierKey::derive(sk_123()).unwrap();
        let commitment = FieldElement::from_u64(7);
        assert!(spending_nullifier(nk, commitment, Some(0)).is_ok());
        assert!(spending_nullifier(nk, commitment, Some(u64::MAX >> 1)).is_ok());
    }

    #[test]
    fn scenario_three_commitment_and_nullifier_vector() {
        use crate::group::CurvePoint;
        use crate::note::{FungibleNote, Note};

        let sk = sk_123();
        let p = CurvePoint::derive_public_key(sk);
        let note = Note::Fungible(FungibleNote {
            stealth_pub_x: p.x(),
            token_mint: FieldElement::from_u64(1000),
            amount: 500,
            randomness: FieldElement::from_u64(111),
        });
        let commitment = note.commitment().unwrap();
        let nk = NullifierKey::derive(sk).unwrap();
        let n_5 = spending_nullifier(nk, commitment, Some(5)).unwrap();
        let n_6 = spending_nullifier(nk, commitment, Some(6)).unwrap();
        assert_ne!(n_5, n_6);
    }
}

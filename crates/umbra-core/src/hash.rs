//! Domain-separated Poseidon hashing over the BN254 scalar field.
//!
//! A single circom-compatible Poseidon permutation backs every hash in the
//! workspace. Callers never invoke the permutation directly; they go through
//! [`hash_with_domain`], which always prepends a 31-bit domain tag as the
//! first absorbed element so that hashes computed for different purposes can
//! never collide even on identical remaining inputs.

use ark_bn254::Fr as Bn254Fr;
use light_poseidon::{Poseidon, PoseidonHasher};
use thiserror::Error;

use crate::field::FieldElement;

/// Domain separation tags, one per public hashing use in the engine.
///
/// Values are arbitrary but fixed and distinct; they must never be reused or
/// reordered once notes exist under them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Domain {
    /// Fungible note commitment.
    CommitFungible = 1,
    /// Perpetual position note commitment.
    CommitPosition = 2,
    /// Liquidity-share note commitment.
    CommitLp = 3,
    /// Nullifier key derivation from the spending key.
    NullifierKey = 4,
    /// Spending nullifier.
    SpendNull = 5,
    /// Action nullifier.
    ActionNull = 6,
    /// Stealth address blinding factor.
    StealthFactor = 7,
    /// Note encryption key derivation.
    NoteEncryption = 8,
    /// Fiat-Shamir challenges (DLEQ proofs, MAC tags).
    Mac = 9,
}

impl Domain {
    fn tag_field(self) -> FieldElement {
        FieldElement::from_u64(u64::from(self as u32))
    }
}

/// Errors from the hashing layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
    /// `light-poseidon` rejected the requested arity (must be 1..=16 inputs).
    #[error("unsupported poseidon arity: {0}")]
    UnsupportedArity(usize),
}

/// Absorb `domain` followed by `inputs` and squeeze a single field element.
///
/// The Poseidon arity is `inputs.len() + 1` (the domain tag occupies the
/// first slot); `light-poseidon`'s circom parameterization supports up to 16
/// inputs, so at most 15 additional field elements may be passed here.
pub fn hash_with_domain(domain: Domain, inputs: &[FieldElement]) -> Result<FieldElement, HashError> {
    let arity = inputs
        .len()
        .checked_add(1)
        .ok_or(HashError::UnsupportedArity(inputs.len()))?;
    let mut hasher: Poseidon<Bn254Fr> =
        Poseidon::new_circom(arity).map_err(|_| HashError::UnsupportedArity(arity))?;

    let mut absorbed: Vec<Bn254Fr> = Vec::with_capacity(arity);
    absorbed.push(domain.tag_field().inner());
    absorbed.extend(inputs.iter().map(|field| field.inner()));

    let digest = hasher
        .hash(&absorbed)
        .map_err(|_| HashError::UnsupportedArity(arity))?;
    Ok(FieldElement::from_inner(digest))
}

//! ECDH-based stealth address derivation (§4.E).

use rand_core::{CryptoRng, RngCore};

use crate::group::{CurvePoint, SubgroupElement};
use crate::hash::{Domain, HashError, hash_with_domain};

/// What a sender publishes alongside a commitment leaf so its recipient can
/// recognize and spend the note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StealthOutput {
    /// The one-time stealth public key `P'`.
    pub stealth_pub: CurvePoint,
    /// The ephemeral public key `E`. All-zero coordinates mean "internal
    /// operation" (§4.E); recipients then use their canonical key unchanged.
    pub ephemeral_pub: CurvePoint,
}

/// Draw a fresh ephemeral scalar and derive the stealth output for `recipient`.
pub fn derive_stealth_output<R: RngCore + CryptoRng>(
    recipient: CurvePoint,
    rng: &mut R,
) -> Result<(StealthOutput, SubgroupElement), HashError> {
    let mut scalar_bytes = [0_u8; 32];
    rng.fill_bytes(&mut scalar_bytes);
    let ephemeral_scalar = SubgroupElement::from_bytes_be_mod_order(&scalar_bytes);
    let output = derive_stealth_output_with_ephemeral(recipient, ephemeral_scalar)?;
    Ok((output, ephemeral_scalar))
}

/// Deterministic variant of [`derive_stealth_output`] taking an explicit
/// ephemeral scalar, used by tests and by callers replaying a known `e`.
pub fn derive_stealth_output_with_ephemeral(
    recipient: CurvePoint,
    ephemeral_scalar: SubgroupElement,
) -> Result<StealthOutput, HashError> {
    let ephemeral_pub = CurvePoint::generator().scalar_mul(ephemeral_scalar);
    let shared = recipient.scalar_mul(ephemeral_scalar);
    let f = stealth_factor(shared)?;
    let stealth_pub = recipient.add(CurvePoint::generator().scalar_mul(f));
    Ok(StealthOutput { stealth_pub, ephemeral_pub })
}

/// An all-zero ephemeral public key, used for internal operations such as
/// change outputs returning to the same owner (§4.E).
#[must_use]
pub fn internal_ephemeral() -> CurvePoint {
    CurvePoint::identity()
}

/// Recipient-side: recover the stealth spending key for a leaf's ephemeral
/// public key, or `sk` unchanged when the ephemeral is the identity.
pub fn stealth_spending_key(
    sk: SubgroupElement,
    ephemeral_pub: CurvePoint,
) -> Result<SubgroupElement, HashError> {
    if ephemeral_pub.is_identity() {
        return Ok(sk);
    }
    let shared = ephemeral_pub.scalar_mul(sk);
    let f = stealth_factor(shared)?;
    Ok(sk.add_mod_l(f))
}

fn stealth_factor(shared: CurvePoint) -> Result<SubgroupElement, HashError> {
    let f_field = hash_with_domain(Domain::StealthFactor, &[shared.x()])?;
    Ok(SubgroupElement::from_field_mod_order(f_field))
}

/// Verify the ownership predicate `sk' . G == P'` (§8 "stealth ownership").
#[must_use]
pub fn is_owned_by(stealth_pub: CurvePoint, sk_prime: SubgroupElement) -> bool {
    CurvePoint::generator().scalar_mul(sk_prime) == stealth_pub
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldElement;

    #[test]
    fn stealth_round_trip_matches_scenario_two() {
        let sk = SubgroupElement::from_bytes_be_mod_order(&FieldElement::from_u64(42).to_bytes_be());
        let p = CurvePoint::derive_public_key(sk);
        let e = SubgroupElement::from_bytes_be_mod_order(&FieldElement::from_u64(9).to_bytes_be());

        let output = derive_stealth_output_with_ephemeral(p, e).unwrap();
        let sk_prime = stealth_spending_key(sk, output.ephemeral_pub).unwrap();
        assert!(is_owned_by(output.stealth_pub, sk_prime));
    }

    #[test]
    fn internal_ephemeral_leaves_key_unchanged() {
        let sk = SubgroupElement::from_bytes_be_mod_order(&FieldElement::from_u64(42).to_bytes_be());
        let sk_prime = stealth_spending_key(sk, internal_ephemeral()).unwrap();
        assert_eq!(sk_prime.to_bytes_be(), sk.to_bytes_be());
    }

    #[test]
    fn ownership_predicate_rejects_wrong_key() {
        let sk = SubgroupElement::from_bytes_be_mod_order(&FieldElement::from_u64(42).to_bytes_be());
        let p = CurvePoint::derive_public_key(sk);
        let e = SubgroupElement::from_bytes_be_mod_order(&FieldElement::from_u64(9).to_bytes_be());
        let output = derive_stealth_output_with_ephemeral(p, e).unwrap();

        let wrong_sk = SubgroupElement::from_bytes_be_mod_order(&FieldElement::from_u64(43).to_bytes_be());
        assert!(!is_owned_by(output.stealth_pub, wrong_sk));
    }
}

//! ElGamal encryption over BabyJubJub with homomorphic addition and
//! DLEQ-proved threshold decryption (§4.G).

use rand_core::{CryptoRng, RngCore};
use thiserror::Error;

use crate::field::FieldElement;
use crate::group::{CurvePoint, SubgroupElement};
use crate::hash::{Domain, HashError, hash_with_domain};

/// An ElGamal ciphertext `(c1, c2) = (r.G, m.G + r.Y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ciphertext {
    /// `c1 = r.G`.
    pub c1: CurvePoint,
    /// `c2 = m.G + r.Y`.
    pub c2: CurvePoint,
}

impl Ciphertext {
    /// Pointwise (homomorphic) addition of two ciphertexts.
    #[must_use]
    pub fn add(self, other: Self) -> Self {
        Self { c1: self.c1.add(other.c1), c2: self.c2.add(other.c2) }
    }
}

/// Encrypt `m.G` under election public key `y_pub = y.G`.
#[must_use]
pub fn encrypt(message: FieldElement, y_pub: CurvePoint, randomness: SubgroupElement) -> Ciphertext {
    let message_scalar = SubgroupElement::from_field_mod_order(message);
    let c1 = CurvePoint::generator().scalar_mul(randomness);
    let c2 = CurvePoint::generator().scalar_mul(message_scalar).add(y_pub.scalar_mul(randomness));
    Ciphertext { c1, c2 }
}

/// Encrypt with a freshly drawn random scalar.
pub fn encrypt_fresh<R: RngCore + CryptoRng>(message: FieldElement, y_pub: CurvePoint, rng: &mut R) -> Ciphertext {
    let mut bytes = [0_u8; 32];
    rng.fill_bytes(&mut bytes);
    let randomness = SubgroupElement::from_bytes_be_mod_order(&bytes);
    encrypt(message, y_pub, randomness)
}

/// A three-option ballot: one ciphertext encrypts the voter's power, the
/// other two encrypt zero, at the chosen option's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ballot {
    /// Per-option ciphertexts, index 0, 1, 2.
    pub options: [Ciphertext; 3],
}

/// Errors raised when casting a ballot or combining it into a tally.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoteError {
    /// `option` was not 0, 1, or 2.
    #[error("option index out of range: {0}")]
    InvalidOption(usize),
}

/// Build a ballot casting `power` for `option` (0, 1, or 2).
pub fn cast_ballot<R: RngCore + CryptoRng>(
    option: usize,
    power: u64,
    y_pub: CurvePoint,
    rng: &mut R,
) -> Result<Ballot, VoteError> {
    if option >= 3 {
        return Err(VoteError::InvalidOption(option));
    }
    let mut options = [Ciphertext {
        c1: CurvePoint::identity(),
        c2: CurvePoint::identity(),
    }; 3];
    for (index, slot) in options.iter_mut().enumerate() {
        let value = if index == option { FieldElement::from_u64(power) } else { FieldElement::ZERO };
        *slot = encrypt_fresh(value, y_pub, rng);
    }
    Ok(Ballot { options })
}

/// Sum ballots pointwise into a running tally, one ciphertext per option.
#[must_use]
pub fn tally_ballots(ballots: &[Ballot]) -> [Ciphertext; 3] {
    let mut tally = [Ciphertext { c1: CurvePoint::identity(), c2: CurvePoint::identity() }; 3];
    for ballot in ballots {
        for (slot, option) in tally.iter_mut().zip(ballot.options.iter()) {
            *slot = slot.add(*option);
        }
    }
    tally
}

/// A Fiat-Shamir DLEQ proof that `log_G(y_pub) == log_{c1}(share)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DleqProof {
    /// Commitment to the prover's randomness w.r.t. `G`.
    pub a1: CurvePoint,
    /// Commitment to the prover's randomness w.r.t. `c1`.
    pub a2: CurvePoint,
    /// The response scalar.
    pub z: SubgroupElement,
}

/// A committee member's decryption share for one ciphertext, with its proof
/// that `share = y_i . c1` for the same `y_i` behind `y_i_pub = y_i . G`.
#[derive(Debug, Clone, Copy)]
pub struct DecryptionShare {
    /// The committee member's index, `1..=n`, used for Lagrange interpolation.
    pub index: u64,
    /// `D_i = y_i . c1`.
    pub share: CurvePoint,
    /// Proof that the share is well-formed.
    pub proof: DleqProof,
}

/// Prove `log_G(y_i_pub) == log_{c1}(d_i)` for secret `y_i`.
pub fn prove_dleq<R: RngCore + CryptoRng>(
    y_i: SubgroupElement,
    c1: CurvePoint,
    rng: &mut R,
) -> Result<(CurvePoint, DleqProof), HashError> {
    let y_i_pub = CurvePoint::derive_public_key(y_i);
    let d_i = c1.scalar_mul(y_i);

    let mut k_bytes = [0_u8; 32];
    rng.fill_bytes(&mut k_bytes);
    let k = SubgroupElement::from_bytes_be_mod_order(&k_bytes);
    let a1 = CurvePoint::generator().scalar_mul(k);
    let a2 = c1.scalar_mul(k);

    let challenge = fiat_shamir_challenge(y_i_pub, d_i, a1, a2)?;
    let z = k.add_mod_l(SubgroupElement::from_field_mod_order(challenge).mul_mod_l(y_i));

    Ok((d_i, DleqProof { a1, a2, z }))
}

fn fiat_shamir_challenge(
    y_i_pub: CurvePoint,
    d_i: CurvePoint,
    a1: CurvePoint,
    a2: CurvePoint,
) -> Result<FieldElement, HashError> {
    hash_with_domain(Domain::Mac, &[y_i_pub.x(), d_i.x(), a1.x(), a2.x()])
}

/// Verify a committee member's DLEQ proof.
pub fn verify_dleq(y_i_pub: CurvePoint, c1: CurvePoint, d_i: CurvePoint, proof: &DleqProof) -> Result<bool, HashError> {
    let challenge = fiat_shamir_challenge(y_i_pub, d_i, proof.a1, proof.a2)?;
    let challenge_scalar = SubgroupElement::from_field_mod_order(challenge);

    let lhs1 = CurvePoint::generator().scalar_mul(proof.z);
    let rhs1 = proof.a1.add(y_i_pub.scalar_mul(challenge_scalar));

    let lhs2 = c1.scalar_mul(proof.z);
    let rhs2 = proof.a2.add(d_i.scalar_mul(challenge_scalar));

    Ok(lhs1 == rhs1 && lhs2 == rhs2)
}

/// Errors from threshold finalization.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThresholdError {
    /// Fewer than `threshold` shares had a valid DLEQ proof.
    #[error("insufficient valid shares: need {needed}, have {have}")]
    InsufficientShares {
        /// Required threshold.
        needed: usize,
        /// Valid shares collected.
        have: usize,
    },
    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Combine `threshold`-of-`n` shares into the tally point `m.G`, disqualifying
/// any share whose DLEQ proof fails to verify against its public key.
pub fn combine_shares(
    ciphertext: Ciphertext,
    shares: &[(CurvePoint, DecryptionShare)],
    threshold: usize,
) -> Result<CurvePoint, ThresholdError> {
    let mut valid: Vec<(u64, CurvePoint)> = Vec::new();
    for (y_i_pub, share) in shares {
        if verify_dleq(*y_i_pub, ciphertext.c1, share.share, &share.proof).unwrap_or(false) {
            valid.push((share.index, share.share));
        }
    }
    if valid.len() < threshold {
        return Err(ThresholdError::InsufficientShares { needed: threshold, have: valid.len() });
    }
    valid.truncate(threshold);

    let indices: Vec<u64> = valid.iter().map(|(index, _)| *index).collect();
    let mut weighted_sum = CurvePoint::identity();
    for (index, share_point) in &valid {
        let lambda = lagrange_coefficient_at_zero(*index, &indices);
        weighted_sum = weighted_sum.add(share_point.scalar_mul(lambda));
    }

    // m.G = c2 - sum(lambda_i . D_i)
    Ok(point_sub(ciphertext.c2, weighted_sum))
}

fn point_sub(a: CurvePoint, b: CurvePoint) -> CurvePoint {
    // BabyJubJub is a twisted Edwards curve: negation flips the x coordinate.
    let neg_b = CurvePoint::from_xy(b.x().mul(FieldElement::from_u64(1)).negate(), b.y()).unwrap_or(b);
    a.add(neg_b)
}

impl FieldElement {
    fn negate(self) -> Self {
        Self::ZERO.sub(self)
    }
}

/// Lagrange coefficient for committee member `index` evaluated at `x = 0`,
/// over the BabyJubJub subgroup scalar field. The whole interpolation —
/// numerator, denominator, and the final inverse — stays in the subgroup
/// ring (`SubgroupElement`, mod `l`); the subgroup order is smaller than the
/// curve's base field, so doing this arithmetic in `FieldElement` (mod `p`)
/// instead would silently compute a different scalar.
fn lagrange_coefficient_at_zero(index: u64, all_indices: &[u64]) -> SubgroupElement {
    let index_scalar = SubgroupElement::from_u64(index);
    let mut numerator = SubgroupElement::one();
    let mut denominator = SubgroupElement::one();
    for &other in all_indices {
        if other == index {
            continue;
        }
        let other_scalar = SubgroupElement::from_u64(other);
        numerator = numerator.mul_mod_l(other_scalar);
        denominator = denominator.mul_mod_l(other_scalar.sub_mod_l(index_scalar));
    }
    let inv = denominator.inverse_mod_l().unwrap_or_else(SubgroupElement::one);
    numerator.mul_mod_l(inv)
}

/// Recover `m` from the tally point `m.G` by linear search over `0..=max_m`.
///
/// Committees choose `max_m` consistent with their electorate's total
/// voting power; a baby-step giant-step search is an implementation
/// freedom for larger ranges (§4.G).
#[must_use]
pub fn recover_plaintext(tally_point: CurvePoint, max_m: u64) -> Option<u64> {
    let mut candidate = CurvePoint::identity();
    if candidate == tally_point {
        return Some(0);
    }
    let generator = CurvePoint::generator();
    for m in 1..=max_m {
        candidate = candidate.add(generator);
        if candidate == tally_point {
            return Some(m);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn homomorphic_addition_sums_plaintexts() {
        let y = SubgroupElement::from_bytes_be_mod_order(&FieldElement::from_u64(55).to_bytes_be());
        let y_pub = CurvePoint::derive_public_key(y);

        let mut rng = OsRng;
        let c1 = encrypt_fresh(FieldElement::from_u64(3), y_pub, &mut rng);
        let c2 = encrypt_fresh(FieldElement::from_u64(4), y_pub, &mut rng);
        let sum = c1.add(c2);

        // Decrypt directly with the (non-threshold) secret key for this check.
        let m_point = point_sub(sum.c2, sum.c1.scalar_mul(y));
        let recovered = recover_plaintext(m_point, 100).expect("within search range");
        assert_eq!(recovered, 7);
    }

    #[test]
    fn dleq_proof_round_trips() {
        let y_i = SubgroupElement::from_bytes_be_mod_order(&FieldElement::from_u64(11).to_bytes_be());
        let y_i_pub = CurvePoint::derive_public_key(y_i);
        let c1 = CurvePoint::generator().scalar_mul(SubgroupElement::from_bytes_be_mod_order(
            &FieldElement::from_u64(6).to_bytes_be(),
        ));

        let mut rng = OsRng;
        let (d_i, proof) = prove_dleq(y_i, c1, &mut rng).expect("proof");
        assert!(verify_dleq(y_i_pub, c1, d_i, &proof).expect("verify"));
    }

    #[test]
    fn dleq_proof_rejects_wrong_share() {
        let y_i = SubgroupElement::from_bytes_be_mod_order(&FieldElement::from_u64(11).to_bytes_be());
        let y_i_pub = CurvePoint::derive_public_key(y_i);
        let c1 = CurvePoint::generator().scalar_mul(SubgroupElement::from_bytes_be_mod_order(
            &FieldElement::from_u64(6).to_bytes_be(),
        ));

        let mut rng = OsRng;
        let (_, proof) = prove_dleq(y_i, c1, &mut rng).expect("proof");
        let wrong_share = CurvePoint::generator();
        assert!(!verify_dleq(y_i_pub, c1, wrong_share, &proof).expect("verify"));
    }

    #[test]
    fn threshold_below_minimum_is_rejected() {
        let ciphertext = Ciphertext { c1: CurvePoint::identity(), c2: CurvePoint::identity() };
        let result = combine_shares(ciphertext, &[], 2);
        assert!(matches!(result, Err(ThresholdError::InsufficientShares { needed: 2, have: 0 })));
    }

    #[test]
    fn threshold_combine_recovers_plaintext_from_any_quorum() {
        let mut rng = OsRng;
        // A degree-1 Shamir polynomial f(x) = secret + coefficient . x, so any
        // 2 of the 3 evaluations f(1), f(2), f(3) reconstruct f(0) = secret via
        // Lagrange interpolation at zero.
        let secret = SubgroupElement::from_bytes_be_mod_order(&FieldElement::from_u64(9_999).to_bytes_be());
        let coefficient = SubgroupElement::from_bytes_be_mod_order(&FieldElement::from_u64(424_242).to_bytes_be());
        let members: Vec<SubgroupElement> = (1_u64..=3)
            .map(|index| secret.add_mod_l(coefficient.mul_mod_l(SubgroupElement::from_u64(index))))
            .collect();

        let y_pub = CurvePoint::derive_public_key(secret);
        let ciphertext = encrypt_fresh(FieldElement::from_u64(9), y_pub, &mut rng);

        let mut shares = Vec::new();
        for (offset, y_i) in members.iter().enumerate() {
            let index = u64::try_from(offset).expect("small committee") + 1;
            let y_i_pub = CurvePoint::derive_public_key(*y_i);
            let (d_i, proof) = prove_dleq(*y_i, ciphertext.c1, &mut rng).expect("proof");
            shares.push((y_i_pub, DecryptionShare { index, share: d_i, proof }));
        }

        // Any 2-of-3 quorum must reconstruct the same plaintext.
        let first_two = &shares[0..2];
        let last_two = &shares[1..3];
        let from_first_two = combine_shares(ciphertext, first_two, 2).expect("combine");
        let from_last_two = combine_shares(ciphertext, last_two, 2).expect("combine");
        assert_eq!(from_first_two, from_last_two);

        let recovered = recover_plaintext(from_first_two, 100).expect("within search range");
        assert_eq!(recovered, 9);
    }
}

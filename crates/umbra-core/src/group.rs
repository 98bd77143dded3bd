//! BabyJubJub twisted-Edwards group operations.
//!
//! BabyJubJub's base field is the BN254 scalar field, so curve points and
//! [`FieldElement`] share the same underlying prime. Scalar multiplication
//! goes through `ark_ec`'s constant-time double-and-add ladder.

use ark_ec::{AffineRepr, CurveGroup, twisted_edwards::Affine};
use ark_ed_on_bn254::{EdwardsConfig, Fq, Fr as SubgroupScalar};
use ark_ff::{BigInteger, Field, PrimeField};
use thiserror::Error;

use crate::field::FieldElement;

/// Errors raised by curve point parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GroupError {
    /// The coordinates do not satisfy the curve equation.
    #[error("point is not on the BabyJubJub curve")]
    NotOnCurve,
    /// The point is on the curve but outside the prime-order subgroup.
    #[error("point is not in the prime-order subgroup")]
    NotInSubgroup,
}

/// A BabyJubJub point, always represented in affine coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurvePoint(Affine<EdwardsConfig>);

/// A scalar reduced modulo the subgroup order `l`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubgroupElement(SubgroupScalar);

impl SubgroupElement {
    /// Reduce 32 big-endian bytes modulo the subgroup order `l`.
    #[must_use]
    pub fn from_bytes_be_mod_order(bytes: &[u8; 32]) -> Self {
        let mut le = *bytes;
        le.reverse();
        Self(SubgroupScalar::from_le_bytes_mod_order(&le))
    }

    /// Build from a [`FieldElement`], reducing modulo `l`.
    #[must_use]
    pub fn from_field_mod_order(value: FieldElement) -> Self {
        Self::from_bytes_be_mod_order(&value.to_bytes_be())
    }

    /// `self + other mod l`.
    #[must_use]
    pub fn add_mod_l(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }

    /// Build from a small integer (e.g. a committee index), reduced mod `l`.
    #[must_use]
    pub fn from_u64(value: u64) -> Self {
        Self(SubgroupScalar::from(value))
    }

    /// The multiplicative identity, `1 mod l`.
    #[must_use]
    pub fn one() -> Self {
        Self(SubgroupScalar::from(1_u64))
    }

    /// `self - other mod l`.
    #[must_use]
    pub fn sub_mod_l(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }

    /// `self * other mod l`.
    #[must_use]
    pub fn mul_mod_l(self, other: Self) -> Self {
        Self(self.0 * other.0)
    }

    /// Multiplicative inverse mod `l`. `None` only for the zero element.
    #[must_use]
    pub fn inverse_mod_l(self) -> Option<Self> {
        self.0.inverse().map(Self)
    }

    /// Serialize as 32 big-endian bytes.
    #[must_use]
    pub fn to_bytes_be(self) -> [u8; 32] {
        let mut le = self.0.into_bigint().to_bytes_le();
        le.resize(32, 0);
        le.reverse();
        le.try_into().unwrap_or([0_u8; 32])
    }
}

impl CurvePoint {
    /// The SDK-standard generator `G`.
    #[must_use]
    pub fn generator() -> Self {
        Self(Affine::<EdwardsConfig>::generator())
    }

    /// The identity element, `(0, 1)` in affine twisted-Edwards coordinates.
    #[must_use]
    pub fn identity() -> Self {
        Self(Affine::<EdwardsConfig>::zero())
    }

    /// True if this is the identity.
    #[must_use]
    pub fn is_identity(self) -> bool {
        self.0.is_zero()
    }

    /// Build a point from field coordinates, checking curve membership and
    /// prime-order subgroup membership.
    pub fn from_xy(x: FieldElement, y: FieldElement) -> Result<Self, GroupError> {
        let x = fq_from_field(x);
        let y = fq_from_field(y);
        let point = Affine::<EdwardsConfig>::new_unchecked(x, y);
        if !point.is_on_curve() {
            return Err(GroupError::NotOnCurve);
        }
        if !point.is_in_correct_subgroup_assuming_on_curve() {
            return Err(GroupError::NotInSubgroup);
        }
        Ok(Self(point))
    }

    /// The `x` coordinate as a [`FieldElement`].
    #[must_use]
    pub fn x(self) -> FieldElement {
        field_from_fq(self.0.x)
    }

    /// The `y` coordinate as a [`FieldElement`].
    #[must_use]
    pub fn y(self) -> FieldElement {
        field_from_fq(self.0.y)
    }

    /// Point addition.
    #[must_use]
    pub fn add(self, other: Self) -> Self {
        Self((self.0 + other.0).into_affine())
    }

    /// Point doubling.
    #[must_use]
    pub fn double(self) -> Self {
        Self((self.0 + self.0).into_affine())
    }

    /// Constant-time scalar multiplication via `ark_ec`'s windowed ladder.
    #[must_use]
    pub fn scalar_mul(self, scalar: SubgroupElement) -> Self {
        Self((self.0 * scalar.0).into_affine())
    }

    /// `sk . G`, the public key for a spending key.
    #[must_use]
    pub fn derive_public_key(sk: SubgroupElement) -> Self {
        Self::generator().scalar_mul(sk)
    }
}

fn fq_from_field(value: FieldElement) -> Fq {
    let mut le = value.to_bytes_be();
    le.reverse();
    Fq::from_le_bytes_mod_order(&le)
}

fn field_from_fq(value: Fq) -> FieldElement {
    let mut le = value.into_bigint().to_bytes_le();
    le.resize(32, 0);
    le.reverse();
    let arr: [u8; 32] = le.try_into().unwrap_or([0_u8; 32]);
    FieldElement::reduce_bytes_be(&arr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_is_on_curve_and_in_subgroup() {
        let g = CurvePoint::generator();
        assert!(CurvePoint::from_xy(g.x(), g.y()).is_ok());
    }

    #[test]
    fn scalar_mul_123_matches_repeated_addition() {
        let g = CurvePoint::generator();
        let sk = SubgroupElement::from_bytes_be_mod_order(&FieldElement::from_u64(123).to_bytes_be());
        let by_scalar = g.scalar_mul(sk);

        let mut by_addition = CurvePoint::identity();
        for _ in 0_u32..123 {
            by_addition = by_addition.add(g);
        }
        assert_eq!(by_scalar, by_addition);
    }

    #[test]
    fn identity_is_neutral() {
        let g = CurvePoint::generator();
        assert_eq!(g.add(CurvePoint::identity()), g);
    }

    #[test]
    fn off_curve_point_is_rejected() {
        let bad_x = FieldElement::from_u64(1);
        let bad_y = FieldElement::from_u64(1);
        assert_eq!(CurvePoint::from_xy(bad_x, bad_y), Err(GroupError::NotOnCurve));
    }
}

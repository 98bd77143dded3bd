//! BN254 scalar field arithmetic.
//!
//! All note and hash arithmetic happens modulo the BN254 scalar prime. Byte
//! conversions are always big-endian per the spec, so hashes stay stable
//! across platforms regardless of the in-memory limb order `ark-ff` uses.

use ark_bn254::Fr as Bn254Fr;
use ark_ff::{BigInteger, PrimeField};
use thiserror::Error;

/// Errors raised by field element conversions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    /// The byte input did not represent a canonical field element (`>= p`).
    #[error("byte input is not a canonical field element")]
    NonCanonical,
}

/// A BN254 scalar field element.
///
/// Thin wrapper so the rest of the workspace never imports `ark_bn254`
/// directly; only this module knows which arkworks curve backs the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldElement(Bn254Fr);

impl FieldElement {
    /// The additive identity.
    pub const ZERO: Self = Self(Bn254Fr::ZERO);

    /// The multiplicative identity.
    #[must_use]
    pub fn one() -> Self {
        Self(Bn254Fr::from(1_u64))
    }

    /// Wrap a raw `u64`, reducing modulo `p`.
    #[must_use]
    pub fn from_u64(value: u64) -> Self {
        Self(Bn254Fr::from(value))
    }

    pub(crate) fn inner(self) -> Bn254Fr {
        self.0
    }

    pub(crate) fn from_inner(inner: Bn254Fr) -> Self {
        Self(inner)
    }

    /// Parse 32 big-endian bytes as a field element.
    ///
    /// Rejects non-canonical encodings (`value >= p`) per §4.A.
    pub fn from_bytes_be(bytes: &[u8; 32]) -> Result<Self, FieldError> {
        let mut le = *bytes;
        le.reverse();
        let candidate = Bn254Fr::from_le_bytes_mod_order(&le);
        let mut roundtrip = candidate.into_bigint().to_bytes_le();
        roundtrip.reverse();
        if roundtrip.as_slice() != bytes.as_slice() {
            return Err(FieldError::NonCanonical);
        }
        Ok(Self(candidate))
    }

    /// Reduce arbitrary big-endian bytes modulo `p` (used for mint/pool ids,
    /// which the spec defines as "32 raw bytes reduced modulo p").
    #[must_use]
    pub fn reduce_bytes_be(bytes: &[u8]) -> Self {
        let mut le = bytes.to_vec();
        le.reverse();
        Self(Bn254Fr::from_le_bytes_mod_order(&le))
    }

    /// Serialize as 32 big-endian bytes.
    #[must_use]
    pub fn to_bytes_be(self) -> [u8; 32] {
        let mut le = self.0.into_bigint().to_bytes_le();
        le.resize(32, 0);
        le.reverse();
        le.try_into().unwrap_or([0_u8; 32])
    }

    /// `self + other`.
    #[must_use]
    pub fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }

    /// `self - other`.
    #[must_use]
    pub fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }

    /// `self * other`.
    #[must_use]
    pub fn mul(self, other: Self) -> Self {
        Self(self.0 * other.0)
    }

    /// Multiplicative inverse, or `None` for zero.
    #[must_use]
    pub fn inverse(self) -> Option<Self> {
        ark_ff::Field::inverse(&self.0).map(Self)
    }

    /// True if this is the additive identity.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == Bn254Fr::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_canonical_bytes() {
        let f = FieldElement::from_u64(123);
        let bytes = f.to_bytes_be();
        let back = FieldElement::from_bytes_be(&bytes).expect("canonical");
        assert_eq!(f, back);
    }

    #[test]
    fn rejects_non_canonical_encoding() {
        // p itself, big-endian, is not a canonical representative of 0.
        let p_bytes: [u8; 32] = [
            0x30, 0x64, 0x4e, 0x72, 0xe1, 0x31, 0xa0, 0x29, 0xb8, 0x50, 0x45, 0xb6, 0x81, 0x81,
            0x58, 0x5d, 0x97, 0x81, 0x6a, 0x91, 0x68, 0x71, 0xca, 0x8d, 0x3c, 0x20, 0x8c, 0x16,
            0xd8, 0x7c, 0xfd, 0x47,
        ];
        assert_eq!(
            FieldElement::from_bytes_be(&p_bytes),
            Err(FieldError::NonCanonical)
        );
    }

    #[test]
    fn arithmetic_matches_integers() {
        let a = FieldElement::from_u64(7);
        let b = FieldElement::from_u64(5);
        assert_eq!(a.add(b), FieldElement::from_u64(12));
        assert_eq!(a.sub(b), FieldElement::from_u64(2));
        assert_eq!(a.mul(b), FieldElement::from_u64(35));
    }

    #[test]
    fn zero_has_no_inverse() {
        assert_eq!(FieldElement::ZERO.inverse(), None);
    }
}

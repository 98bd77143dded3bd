//! Authenticated note encryption (§4.F).
//!
//! Each leaf carries a fresh ephemeral key; the shared secret's `x`
//! coordinate keys a Poseidon sponge that both derives a keystream and a
//! 16-byte tag over the absorbed note fields.

use rand_core::{CryptoRng, RngCore};
use thiserror::Error;

use crate::field::FieldElement;
use crate::group::{CurvePoint, GroupError, SubgroupElement};
use crate::hash::{Domain, HashError, hash_with_domain};
use crate::note::{FungibleNote, LiquidityNote, Note, PositionNote};

/// Errors from encryption/decryption.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncryptionError {
    /// The authentication tag did not match.
    #[error("decryption tag mismatch")]
    TagMismatch,
    /// Decryption succeeded but the recomputed commitment did not match the
    /// one stored beside the ciphertext; the leaf is not ours.
    #[error("decrypted note commitment does not match the stored commitment")]
    CommitmentMismatch,
    /// The wire encoding was structurally invalid.
    #[error("malformed ciphertext")]
    Malformed,
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error(transparent)]
    Group(#[from] GroupError),
}

const TAG_LEN: usize = 16;

/// The decoded wire layout from §4.F / §6: ephemeral key, ciphertext, tag.
#[derive(Debug, Clone)]
pub struct EncryptedNote {
    /// The per-note ephemeral public key `E`.
    pub ephemeral_pub: CurvePoint,
    /// Opaque ciphertext bytes (one field element per 32-byte chunk).
    pub ciphertext: Vec<u8>,
    /// 16-byte authentication tag.
    pub tag: [u8; TAG_LEN],
}

impl EncryptedNote {
    /// `ephemeral.x (32) || ephemeral.y (32) || ciphertext_len (4 LE) || ciphertext || tag (16)`.
    #[must_use]
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 + 32 + 4 + self.ciphertext.len() + TAG_LEN);
        out.extend_from_slice(&self.ephemeral_pub.x().to_bytes_be());
        out.extend_from_slice(&self.ephemeral_pub.y().to_bytes_be());
        #[allow(
            clippy::as_conversions,
            reason = "ciphertext length is bounded by the 250-byte leaf buffer, always fits u32"
        )]
        let len = self.ciphertext.len() as u32;
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.tag);
        out
    }

    /// Parse the wire layout, rejecting truncated or oversized buffers.
    pub fn from_wire_bytes(bytes: &[u8]) -> Result<Self, EncryptionError> {
        if bytes.len() < 32 + 32 + 4 + TAG_LEN {
            return Err(EncryptionError::Malformed);
        }
        let x_bytes: [u8; 32] = bytes
            .get(0..32)
            .and_then(|s| s.try_into().ok())
            .ok_or(EncryptionError::Malformed)?;
        let y_bytes: [u8; 32] = bytes
            .get(32..64)
            .and_then(|s| s.try_into().ok())
            .ok_or(EncryptionError::Malformed)?;
        let len_bytes: [u8; 4] = bytes
            .get(64..68)
            .and_then(|s| s.try_into().ok())
            .ok_or(EncryptionError::Malformed)?;
        let ciphertext_len = u32::from_le_bytes(len_bytes);
        let ciphertext_len_usize = usize::try_from(ciphertext_len).map_err(|_| EncryptionError::Malformed)?;

        let ciphertext_start = 68_usize;
        let ciphertext_end = ciphertext_start
            .checked_add(ciphertext_len_usize)
            .ok_or(EncryptionError::Malformed)?;
        let tag_end = ciphertext_end.checked_add(TAG_LEN).ok_or(EncryptionError::Malformed)?;
        if bytes.len() < tag_end {
            return Err(EncryptionError::Malformed);
        }

        let ephemeral_x = FieldElement::from_bytes_be(&x_bytes).map_err(|_| EncryptionError::Malformed)?;
        let ephemeral_y = FieldElement::from_bytes_be(&y_bytes).map_err(|_| EncryptionError::Malformed)?;
        let ephemeral_pub = if ephemeral_x.is_zero() && ephemeral_y.is_zero() {
            CurvePoint::identity()
        } else {
            CurvePoint::from_xy(ephemeral_x, ephemeral_y)?
        };

        let ciphertext = bytes
            .get(ciphertext_start..ciphertext_end)
            .ok_or(EncryptionError::Malformed)?
            .to_vec();
        let tag: [u8; TAG_LEN] = bytes
            .get(ciphertext_end..tag_end)
            .and_then(|s| s.try_into().ok())
            .ok_or(EncryptionError::Malformed)?;

        Ok(Self { ephemeral_pub, ciphertext, tag })
    }
}

/// Note fields packed into the fixed-arity absorption used for every variant.
/// The variant tag is absorbed first so ciphertexts of different note kinds
/// never share a keystream offset by coincidence.
fn note_to_fields(note: &Note) -> Vec<FieldElement> {
    match note {
        Note::Fungible(FungibleNote { stealth_pub_x, token_mint, amount, randomness }) => vec![
            FieldElement::from_u64(0),
            *stealth_pub_x,
            *token_mint,
            FieldElement::from_u64(*amount),
            *randomness,
        ],
        Note::Position(PositionNote {
            stealth_pub_x,
            market_id,
            is_long,
            margin,
            size,
            leverage,
            entry_price,
            randomness,
        }) => vec![
            FieldElement::from_u64(1),
            *stealth_pub_x,
            *market_id,
            FieldElement::from_u64(u64::from(*is_long)),
            FieldElement::from_u64(*margin),
            FieldElement::from_u64(*size),
            FieldElement::from_u64(u64::from(*leverage)),
            FieldElement::from_u64(*entry_price),
            *randomness,
        ],
        Note::Liquidity(LiquidityNote { stealth_pub_x, pool_id, lp_amount, randomness }) => vec![
            FieldElement::from_u64(2),
            *stealth_pub_x,
            *pool_id,
            FieldElement::from_u64(*lp_amount),
            *randomness,
        ],
    }
}

fn fields_to_fungible(fields: &[FieldElement]) -> Result<FungibleNote, EncryptionError> {
    Ok(FungibleNote {
        stealth_pub_x: *fields.get(1).ok_or(EncryptionError::Malformed)?,
        token_mint: *fields.get(2).ok_or(EncryptionError::Malformed)?,
        amount: field_to_u64_truncated(*fields.get(3).ok_or(EncryptionError::Malformed)?),
        randomness: *fields.get(4).ok_or(EncryptionError::Malformed)?,
    })
}

fn fields_to_position(fields: &[FieldElement]) -> Result<PositionNote, EncryptionError> {
    Ok(PositionNote {
        stealth_pub_x: *fields.get(1).ok_or(EncryptionError::Malformed)?,
        market_id: *fields.get(2).ok_or(EncryptionError::Malformed)?,
        is_long: field_to_u64_truncated(*fields.get(3).ok_or(EncryptionError::Malformed)?) != 0,
        margin: field_to_u64_truncated(*fields.get(4).ok_or(EncryptionError::Malformed)?),
        size: field_to_u64_truncated(*fields.get(5).ok_or(EncryptionError::Malformed)?),
        leverage: u32::try_from(field_to_u64_truncated(*fields.get(6).ok_or(EncryptionError::Malformed)?))
            .unwrap_or(u32::MAX),
        entry_price: field_to_u64_truncated(*fields.get(7).ok_or(EncryptionError::Malformed)?),
        randomness: *fields.get(8).ok_or(EncryptionError::Malformed)?,
    })
}

fn fields_to_liquidity(fields: &[FieldElement]) -> Result<LiquidityNote, EncryptionError> {
    Ok(LiquidityNote {
        stealth_pub_x: *fields.get(1).ok_or(EncryptionError::Malformed)?,
        pool_id: *fields.get(2).ok_or(EncryptionError::Malformed)?,
        lp_amount: field_to_u64_truncated(*fields.get(3).ok_or(EncryptionError::Malformed)?),
        randomness: *fields.get(4).ok_or(EncryptionError::Malformed)?,
    })
}

/// AMM/note quantities round-trip through `u64`, so we reconstruct the low
/// 8 bytes of the field's canonical big-endian encoding.
fn field_to_u64_truncated(field: FieldElement) -> u64 {
    let bytes = field.to_bytes_be();
    let low: [u8; 8] = bytes.get(24..32).and_then(|s| s.try_into().ok()).unwrap_or([0_u8; 8]);
    u64::from_be_bytes(low)
}

fn derive_shared_key(domain_x: FieldElement) -> Result<FieldElement, HashError> {
    hash_with_domain(Domain::NoteEncryption, &[domain_x])
}

/// Encrypt `note` for `recipient`, drawing a fresh ephemeral key.
pub fn encrypt_note<R: RngCore + CryptoRng>(
    note: &Note,
    recipient: CurvePoint,
    rng: &mut R,
) -> Result<EncryptedNote, EncryptionError> {
    let mut scalar_bytes = [0_u8; 32];
    rng.fill_bytes(&mut scalar_bytes);
    let ephemeral_scalar = SubgroupElement::from_bytes_be_mod_order(&scalar_bytes);
    encrypt_note_with_ephemeral(note, recipient, ephemeral_scalar)
}

/// Deterministic variant taking an explicit ephemeral scalar.
pub fn encrypt_note_with_ephemeral(
    note: &Note,
    recipient: CurvePoint,
    ephemeral_scalar: SubgroupElement,
) -> Result<EncryptedNote, EncryptionError> {
    let ephemeral_pub = CurvePoint::generator().scalar_mul(ephemeral_scalar);
    let shared = recipient.scalar_mul(ephemeral_scalar);
    let key = derive_shared_key(shared.x())?;

    let fields = note_to_fields(note);
    let mut ciphertext = Vec::with_capacity(32_usize.saturating_mul(fields.len()));
    let mut absorbed_for_tag = vec![key];
    for (index, field) in fields.iter().enumerate() {
        let pad = hash_with_domain(
            Domain::NoteEncryption,
            &[key, FieldElement::from_u64(u64::try_from(index).unwrap_or(0))],
        )?;
        let encrypted = field.add(pad);
        ciphertext.extend_from_slice(&encrypted.to_bytes_be());
        absorbed_for_tag.push(encrypted);
    }

    let tag_field = hash_with_domain(Domain::Mac, &absorbed_for_tag)?;
    let tag_bytes = tag_field.to_bytes_be();
    let mut tag = [0_u8; TAG_LEN];
    tag.copy_from_slice(tag_bytes.get(0..TAG_LEN).unwrap_or(&[0_u8; TAG_LEN]));

    Ok(EncryptedNote { ephemeral_pub, ciphertext, tag })
}

/// Decrypt assuming the note is a [`FungibleNote`]; callers should prefer
/// [`try_decrypt_any`] unless the variant is already known.
pub fn decrypt_note(encrypted: &EncryptedNote, sk: SubgroupElement) -> Result<Note, EncryptionError> {
    let fields = decrypt_fields(encrypted, sk)?;
    note_from_fields(&fields)
}

fn decrypt_fields(encrypted: &EncryptedNote, sk: SubgroupElement) -> Result<Vec<FieldElement>, EncryptionError> {
    let shared = if encrypted.ephemeral_pub.is_identity() {
        CurvePoint::derive_public_key(sk)
    } else {
        encrypted.ephemeral_pub.scalar_mul(sk)
    };
    let key = derive_shared_key(shared.x())?;

    let mut fields = Vec::new();
    let mut absorbed_for_tag = vec![key];
    for (index, chunk) in encrypted.ciphertext.chunks(32).enumerate() {
        let chunk_bytes: [u8; 32] = chunk.try_into().map_err(|_| EncryptionError::Malformed)?;
        let encrypted_field = FieldElement::from_bytes_be(&chunk_bytes).map_err(|_| EncryptionError::Malformed)?;
        let pad = hash_with_domain(
            Domain::NoteEncryption,
            &[key, FieldElement::from_u64(u64::try_from(index).unwrap_or(0))],
        )?;
        absorbed_for_tag.push(encrypted_field);
        fields.push(encrypted_field.sub(pad));
    }

    let tag_field = hash_with_domain(Domain::Mac, &absorbed_for_tag)?;
    let tag_bytes = tag_field.to_bytes_be();
    let expected_tag = tag_bytes.get(0..TAG_LEN).unwrap_or(&[0_u8; TAG_LEN]);
    if expected_tag != encrypted.tag {
        return Err(EncryptionError::TagMismatch);
    }
    Ok(fields)
}

fn note_from_fields(fields: &[FieldElement]) -> Result<Note, EncryptionError> {
    let variant_tag = field_to_u64_truncated(*fields.first().ok_or(EncryptionError::Malformed)?);
    match variant_tag {
        0 => Ok(Note::Fungible(fields_to_fungible(fields)?)),
        1 => Ok(Note::Position(fields_to_position(fields)?)),
        2 => Ok(Note::Liquidity(fields_to_liquidity(fields)?)),
        _ => Err(EncryptionError::TagMismatch),
    }
}

/// Try every note variant in a fixed order, returning the first whose tag
/// verifies and whose recomputed commitment matches `stored_commitment`.
///
/// A tag match with a commitment mismatch means the leaf is corrupted or
/// malicious, not ours: treat it identically to a decrypt failure.
pub fn try_decrypt_any(
    encrypted: &EncryptedNote,
    sk: SubgroupElement,
    stored_commitment: FieldElement,
) -> Result<Note, EncryptionError> {
    let fields = decrypt_fields(encrypted, sk)?;
    let note = note_from_fields(&fields)?;
    let commitment = note.commitment()?;
    if commitment != stored_commitment {
        return Err(EncryptionError::CommitmentMismatch);
    }
    Ok(note)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::CurvePoint;

    fn sk_of(value: u64) -> SubgroupElement {
        SubgroupElement::from_bytes_be_mod_order(&FieldElement::from_u64(value).to_bytes_be())
    }

    #[test]
    fn scenario_one_encrypt_decrypt_fungible_note() {
        let sk = sk_of(123);
        let p = CurvePoint::derive_public_key(sk);
        let note = Note::Fungible(FungibleNote {
            stealth_pub_x: p.x(),
            token_mint: FieldElement::from_u64(1000),
            amount: 500,
            randomness: FieldElement::from_u64(111),
        });
        let ephemeral = sk_of(777);
        let encrypted = encrypt_note_with_ephemeral(&note, p, ephemeral).unwrap();

        let decrypted = decrypt_note(&encrypted, sk).unwrap();
        assert_eq!(decrypted, note);

        let wrong_sk = sk_of(124);
        let failure = decrypt_note(&encrypted, wrong_sk);
        assert!(matches!(failure, Err(EncryptionError::TagMismatch)));
    }

    #[test]
    fn wire_round_trips() {
        let sk = sk_of(123);
        let p = CurvePoint::derive_public_key(sk);
        let note = Note::Fungible(FungibleNote {
            stealth_pub_x: p.x(),
            token_mint: FieldElement::from_u64(1000),
            amount: 500,
            randomness: FieldElement::from_u64(111),
        });
        let encrypted = encrypt_note_with_ephemeral(&note, p, sk_of(777)).unwrap();
        let wire = encrypted.to_wire_bytes();
        let parsed = EncryptedNote::from_wire_bytes(&wire).unwrap();
        assert_eq!(parsed.ciphertext, encrypted.ciphertext);
        assert_eq!(parsed.tag, encrypted.tag);
    }

    #[test]
    fn try_decrypt_any_rejects_commitment_mismatch() {
        let sk = sk_of(123);
        let p = CurvePoint::derive_public_key(sk);
        let note = Note::Fungible(FungibleNote {
            stealth_pub_x: p.x(),
            token_mint: FieldElement::from_u64(1000),
            amount: 500,
            randomness: FieldElement::from_u64(111),
        });
        let encrypted = encrypt_note_with_ephemeral(&note, p, sk_of(777)).unwrap();
        let wrong_commitment = FieldElement::from_u64(999_999);
        let result = try_decrypt_any(&encrypted, sk, wrong_commitment);
        assert!(matches!(result, Err(EncryptionError::CommitmentMismatch)));
    }

    #[test]
    fn try_decrypt_any_succeeds_on_matching_commitment() {
        let sk = sk_of(123);
        let p = CurvePoint::derive_public_key(sk);
        let note = Note::Fungible(FungibleNote {
            stealth_pub_x: p.x(),
            token_mint: FieldElement::from_u64(1000),
            amount: 500,
            randomness: FieldElement::from_u64(111),
        });
        let commitment = note.commitment().unwrap();
        let encrypted = encrypt_note_with_ephemeral(&note, p, sk_of(777)).unwrap();
        let decrypted = try_decrypt_any(&encrypted, sk, commitment).unwrap();
        assert_eq!(decrypted, note);
    }
}

//! The compressed commitment leaf's fixed binary layout (§6).

use thiserror::Error;

use crate::field::FieldElement;

/// Total size in bytes of a serialized [`CommitmentLeaf`]; shorter records
/// are rejected outright.
pub const LEAF_SIZE: usize = 396;

const ENCRYPTED_NOTE_BUFFER_LEN: usize = 250;

/// Errors raised while parsing a leaf's binary layout.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LeafError {
    /// The input was shorter than [`LEAF_SIZE`].
    #[error("leaf record shorter than {LEAF_SIZE} bytes")]
    Truncated,
    /// A 32-byte field did not decode to a canonical field element.
    #[error("malformed field in leaf layout")]
    MalformedField,
    /// `encrypted_note_len` exceeded the fixed 250-byte buffer.
    #[error("encrypted note length {0} exceeds the 250-byte buffer")]
    NoteTooLong(u16),
}

/// A compressed leaf as stored by the external indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitmentLeaf {
    /// Pool this leaf belongs to.
    pub pool_id: [u8; 32],
    /// The note or nullifier commitment.
    pub commitment: FieldElement,
    /// Position of this leaf within the pool's merkle tree.
    pub leaf_index: u64,
    /// Stealth ephemeral public key, or the identity when this is an
    /// internal operation (§4.E).
    pub stealth_ephemeral: ([u8; 32], [u8; 32]),
    /// The encrypted note wire bytes, exactly `encrypted_note_len` long.
    pub encrypted_note: Vec<u8>,
    /// Slot at which this leaf was created.
    pub created_at_slot: i64,
}

impl CommitmentLeaf {
    /// Serialize per the exact byte offsets in §6.
    pub fn to_bytes(&self) -> Result<[u8; LEAF_SIZE], LeafError> {
        let note_len = u16::try_from(self.encrypted_note.len()).map_err(|_| LeafError::NoteTooLong(u16::MAX))?;
        if self.encrypted_note.len() > ENCRYPTED_NOTE_BUFFER_LEN {
            return Err(LeafError::NoteTooLong(note_len));
        }

        let mut out = [0_u8; LEAF_SIZE];
        out.get_mut(0..32).ok_or(LeafError::Truncated)?.copy_from_slice(&self.pool_id);
        out.get_mut(32..64).ok_or(LeafError::Truncated)?.copy_from_slice(&self.commitment.to_bytes_be());
        out.get_mut(64..72).ok_or(LeafError::Truncated)?.copy_from_slice(&self.leaf_index.to_le_bytes());
        out.get_mut(72..104).ok_or(LeafError::Truncated)?.copy_from_slice(&self.stealth_ephemeral.0);
        out.get_mut(104..136).ok_or(LeafError::Truncated)?.copy_from_slice(&self.stealth_ephemeral.1);
        out.get_mut(136..136 + self.encrypted_note.len())
            .ok_or(LeafError::Truncated)?
            .copy_from_slice(&self.encrypted_note);
        out.get_mut(386..388).ok_or(LeafError::Truncated)?.copy_from_slice(&note_len.to_le_bytes());
        out.get_mut(388..396).ok_or(LeafError::Truncated)?.copy_from_slice(&self.created_at_slot.to_le_bytes());
        Ok(out)
    }

    /// Parse per the exact byte offsets in §6, rejecting truncated records
    /// and malformed field encodings (never a panic).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LeafError> {
        if bytes.len() < LEAF_SIZE {
            return Err(LeafError::Truncated);
        }

        let pool_id: [u8; 32] = bytes.get(0..32).and_then(|s| s.try_into().ok()).ok_or(LeafError::Truncated)?;
        let commitment_bytes: [u8; 32] =
            bytes.get(32..64).and_then(|s| s.try_into().ok()).ok_or(LeafError::Truncated)?;
        let commitment = FieldElement::from_bytes_be(&commitment_bytes).map_err(|_| LeafError::MalformedField)?;

        let leaf_index_bytes: [u8; 8] =
            bytes.get(64..72).and_then(|s| s.try_into().ok()).ok_or(LeafError::Truncated)?;
        let leaf_index = u64::from_le_bytes(leaf_index_bytes);

        let ephemeral_x: [u8; 32] = bytes.get(72..104).and_then(|s| s.try_into().ok()).ok_or(LeafError::Truncated)?;
        let ephemeral_y: [u8; 32] =
            bytes.get(104..136).and_then(|s| s.try_into().ok()).ok_or(LeafError::Truncated)?;

        let note_len_bytes: [u8; 2] =
            bytes.get(386..388).and_then(|s| s.try_into().ok()).ok_or(LeafError::Truncated)?;
        let note_len = u16::from_le_bytes(note_len_bytes);
        let note_len_usize = usize::from(note_len);
        if note_len_usize > ENCRYPTED_NOTE_BUFFER_LEN {
            return Err(LeafError::NoteTooLong(note_len));
        }
        let encrypted_note = bytes
            .get(136..136 + note_len_usize)
            .ok_or(LeafError::Truncated)?
            .to_vec();

        let slot_bytes: [u8; 8] = bytes.get(388..396).and_then(|s| s.try_into().ok()).ok_or(LeafError::Truncated)?;
        let created_at_slot = i64::from_le_bytes(slot_bytes);

        Ok(Self {
            pool_id,
            commitment,
            leaf_index,
            stealth_ephemeral: (ephemeral_x, ephemeral_y),
            encrypted_note,
            created_at_slot,
        })
    }

    /// True when the stealth ephemeral is all-zero, i.e. an internal op.
    #[must_use]
    pub fn is_internal_ephemeral(&self) -> bool {
        self.stealth_ephemeral.0 == [0_u8; 32] && self.stealth_ephemeral.1 == [0_u8; 32]
    }
}

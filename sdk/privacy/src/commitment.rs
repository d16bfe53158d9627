//! Note Commitments
//!
//! ```text
//! cm = Poseidon(NCMT, a_pk, value, rho, r)
//! ```
//!
//! The commitment is the only trace a note leaves in the accumulator. It
//! binds every note field and hides them behind the trapdoor `r`.

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

use crate::note::Note;
use crate::poseidon::{self, domain, fr_from_bytes, fr_to_bytes};

/// A note commitment (32 bytes, canonical field encoding)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Commitment(pub [u8; 32]);

impl Commitment {
    /// Create commitment from field element
    pub fn from_field(f: Fr) -> Self {
        Self(fr_to_bytes(&f))
    }

    /// Convert to field element
    pub fn to_field(&self) -> Fr {
        fr_from_bytes(&self.0)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl AsRef<[u8]> for Commitment {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Commit to every field of a note.
pub fn derive_commitment(note: &Note) -> Commitment {
    let result = poseidon::hash(&[
        Fr::from(domain::COMMITMENT),
        fr_from_bytes(&note.owner_pk),
        Fr::from(note.value.as_u64()),
        fr_from_bytes(&note.rho),
        fr_from_bytes(&note.randomness),
    ]);
    Commitment::from_field(result)
}

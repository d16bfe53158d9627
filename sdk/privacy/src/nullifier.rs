//! Nullifiers
//!
//! ```text
//! nf = PRF_nf(a_sk, rho) = Poseidon(NULL, a_sk, rho)
//! ```
//!
//! Once a nullifier is published, the corresponding note cannot be spent
//! again. It reveals nothing about which commitment it belongs to.

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

use crate::note::SpendingKey;
use crate::poseidon::{self, domain, fr_from_bytes, fr_to_bytes};

/// A nullifier (32 bytes) - unique tag for a spent note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Nullifier(pub [u8; 32]);

impl Nullifier {
    /// Create from field element
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

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Nullifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Derive the nullifier of the note with seed `rho` owned by `spending_key`.
pub fn derive_nullifier(spending_key: &SpendingKey, rho: &[u8; 32]) -> Nullifier {
    let result = poseidon::hash(&[
        Fr::from(domain::NULLIFIER),
        spending_key.to_field(),
        fr_from_bytes(rho),
    ]);
    Nullifier::from_field(result)
}

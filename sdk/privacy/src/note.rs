//! Shielded Notes and Keys
//!
//! A Note represents value held privately in the shielded pool.
//!
//! ```text
//! Note = {
//!     owner_pk:   [u8; 32], // paying key a_pk of the recipient
//!     value:      u64,      // amount in the smallest unit
//!     rho:        [u8; 32], // nullifier seed
//!     randomness: [u8; 32], // commitment trapdoor r
//! }
//!
//! SpendingKey a_sk ──► ViewingKey sk_enc ──► PaymentAddress { a_pk, pk_enc }
//! ```

use ark_bn254::Fr;
use ark_std::rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey, StaticSecret};

use crate::commitment::{Commitment, derive_commitment};
use crate::nullifier::{Nullifier, derive_nullifier};
use crate::poseidon::{fr_from_bytes, random_field_bytes};
use crate::prf::prf_addr;

const SK_ENC_CONTEXT: &str = "shade 2026-01-01 viewing key sk_enc";

/// A shielded note representing privately held value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Paying key of the owner (who can spend this note)
    pub owner_pk: [u8; 32],
    /// The value (amount) held in this note
    pub value: NoteValue,
    /// Nullifier seed
    pub rho: [u8; 32],
    /// Commitment trapdoor
    pub randomness: [u8; 32],
}

/// Note value with overflow protection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NoteValue(pub u64);

impl NoteValue {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u64::MAX);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Checked addition
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked subtraction
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }
}

impl Note {
    pub fn new(owner_pk: [u8; 32], value: NoteValue, rho: [u8; 32], randomness: [u8; 32]) -> Self {
        Self {
            owner_pk,
            value,
            rho,
            randomness,
        }
    }

    /// A zero-valued note with fresh `rho` and trapdoor, used to pad an
    /// input slot. On the wire it is indistinguishable from a real note.
    pub fn dummy<R: RngCore + CryptoRng>(owner_pk: [u8; 32], rng: &mut R) -> Self {
        Self {
            owner_pk,
            value: NoteValue::ZERO,
            rho: random_field_bytes(rng),
            randomness: random_field_bytes(rng),
        }
    }

    /// Compute the commitment for this note
    pub fn commitment(&self) -> Commitment {
        derive_commitment(self)
    }

    /// Derive the nullifier revealed when spending this note
    pub fn nullifier(&self, spending_key: &SpendingKey) -> Nullifier {
        derive_nullifier(spending_key, &self.rho)
    }
}

/// Spending key - allows spending notes
///
/// This is the most sensitive key. Loss = loss of funds.
/// Compromise = theft of funds.
#[derive(Clone)]
pub struct SpendingKey {
    key: [u8; 32],
}

impl std::fmt::Debug for SpendingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SpendingKey(..)")
    }
}

impl SpendingKey {
    /// Generate a random 252-bit spending key
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            key: random_field_bytes(rng),
        }
    }

    /// Create from raw bytes
    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    /// The key as a circuit witness.
    pub fn to_field(&self) -> Fr {
        fr_from_bytes(&self.key)
    }

    /// Derive the viewing key. One-way: BLAKE3 in key derivation mode.
    pub fn viewing_key(&self) -> ViewingKey {
        ViewingKey {
            key: blake3::derive_key(SK_ENC_CONTEXT, &self.key),
        }
    }

    /// Derive the paying key `a_pk`.
    pub fn paying_key(&self) -> [u8; 32] {
        prf_addr(self)
    }

    /// Derive the public payment address
    pub fn address(&self) -> PaymentAddress {
        PaymentAddress {
            a_pk: self.paying_key(),
            pk_enc: self.viewing_key().pk_enc(),
        }
    }
}

/// Viewing key - decrypts notes sent to the address, cannot spend them.
#[derive(Clone)]
pub struct ViewingKey {
    key: [u8; 32],
}

impl std::fmt::Debug for ViewingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ViewingKey(..)")
    }
}

impl ViewingKey {
    /// Create from raw bytes
    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    /// X25519 secret used for note decryption
    pub(crate) fn secret(&self) -> StaticSecret {
        StaticSecret::from(self.key)
    }

    /// Transmission key published in the payment address
    pub fn pk_enc(&self) -> [u8; 32] {
        *PublicKey::from(&self.secret()).as_bytes()
    }
}

/// Public payment address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentAddress {
    /// Paying key, bound into note commitments
    pub a_pk: [u8; 32],
    /// X25519 transmission key, used to encrypt notes
    pub pk_enc: [u8; 32],
}

/// Full key bundle for a shielded address
#[derive(Debug, Clone)]
pub struct ShieldedKeyBundle {
    /// Spending key (secret - allows spending)
    pub spending_key: SpendingKey,
    /// Viewing key (allows viewing but not spending)
    pub viewing_key: ViewingKey,
    /// Address (can be shared publicly)
    pub address: PaymentAddress,
}

impl ShieldedKeyBundle {
    /// Generate a new random key bundle
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::from_spending_key(SpendingKey::random(rng))
    }

    /// Restore from spending key
    pub fn from_spending_key(spending_key: SpendingKey) -> Self {
        let viewing_key = spending_key.viewing_key();
        let address = spending_key.address();

        Self {
            spending_key,
            viewing_key,
            address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_note_commitment_and_nullifier() {
        let mut rng = OsRng;
        let bundle = ShieldedKeyBundle::random(&mut rng);

        let note = Note::new(
            bundle.address.a_pk,
            NoteValue::new(1000),
            random_field_bytes(&mut rng),
            random_field_bytes(&mut rng),
        );

        assert_eq!(note.commitment(), note.commitment());
        assert_eq!(
            note.nullifier(&bundle.spending_key),
            note.nullifier(&bundle.spending_key)
        );
    }

    #[test]
    fn test_key_derivation() {
        let mut rng = OsRng;
        let bundle = ShieldedKeyBundle::random(&mut rng);

        // Same spending key should derive same viewing key and address
        let bundle2 = ShieldedKeyBundle::from_spending_key(SpendingKey::from_bytes(
            *bundle.spending_key.as_bytes(),
        ));

        assert_eq!(bundle.address, bundle2.address);
        assert_eq!(
            bundle.viewing_key.as_bytes(),
            bundle2.viewing_key.as_bytes()
        );
        assert_ne!(bundle.viewing_key.as_bytes(), bundle.spending_key.as_bytes());
    }

    #[test]
    fn test_dummy_note_has_zero_value() {
        let mut rng = OsRng;
        let a = Note::dummy([3u8; 32], &mut rng);
        let b = Note::dummy([3u8; 32], &mut rng);
        assert_eq!(a.value, NoteValue::ZERO);
        assert_ne!(a.rho, b.rho);
        assert_ne!(a.commitment(), b.commitment());
    }

    #[test]
    fn test_note_value_checked_ops() {
        let v1 = NoteValue::new(100);
        let v2 = NoteValue::new(50);

        assert_eq!(v1.checked_add(v2), Some(NoteValue::new(150)));
        assert_eq!(v1.checked_sub(v2), Some(NoteValue::new(50)));
        assert_eq!(v2.checked_sub(v1), None); // Underflow
        assert_eq!(NoteValue::MAX.checked_add(NoteValue::new(1)), None); // Overflow
    }
}

//! Note Encryption
//!
//! Encrypts note plaintexts for recipients using X25519 + ChaCha20-Poly1305,
//! keyed by the binding tag of the enclosing JoinSplit.
//!
//! ```text
//! Flow (per JoinSplit):
//! 1. Sender samples one ephemeral keypair (esk, epk) for both outputs
//! 2. dh_i  = X25519(esk, pk_enc_i)
//! 3. k_i   = BLAKE3-derive-key(h_sig || dh_i || epk || pk_enc_i || i)
//! 4. ct_i  = ChaCha20-Poly1305(k_i, nonce = 0, plaintext_i)
//! ```
//!
//! Every key is used exactly once, so the all-zero nonce is safe.

use ark_std::rand::{CryptoRng, RngCore};
use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit},
};
use x25519_dalek::{PublicKey, StaticSecret};

use crate::commitment::Commitment;
use crate::error::{PrivacyError, Result};
use crate::note::{Note, NoteValue, ViewingKey};
use crate::prf::HSig;

const KDF_CONTEXT: &str = "shade 2026-01-01 note encryption kdf";

/// Size of the opaque memo field
pub const MEMO_SIZE: usize = 512;
/// owner_pk | value | rho | r | memo
pub const NOTE_PLAINTEXT_SIZE: usize = 32 + 8 + 32 + 32 + MEMO_SIZE;
/// Plaintext plus the Poly1305 tag
pub const NOTE_CIPHERTEXT_SIZE: usize = NOTE_PLAINTEXT_SIZE + 16;

/// Caller-supplied memo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memo(pub [u8; MEMO_SIZE]);

impl Memo {
    /// Conventional "no memo": 0xF6 followed by zeros.
    pub fn empty() -> Self {
        let mut bytes = [0u8; MEMO_SIZE];
        bytes[0] = 0xF6;
        Self(bytes)
    }

    /// Zero-padded memo from at most `MEMO_SIZE` bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() > MEMO_SIZE {
            return Err(PrivacyError::MalformedPlaintext("memo longer than 512 bytes"));
        }
        let mut bytes = [0u8; MEMO_SIZE];
        bytes[..data.len()].copy_from_slice(data);
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; MEMO_SIZE] {
        &self.0
    }
}

impl Default for Memo {
    fn default() -> Self {
        Self::empty()
    }
}

/// An encrypted note as published in a JoinSplit description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteCiphertext(pub [u8; NOTE_CIPHERTEXT_SIZE]);

impl NoteCiphertext {
    pub fn as_bytes(&self) -> &[u8; NOTE_CIPHERTEXT_SIZE] {
        &self.0
    }
}

/// Decrypted contents of a note ciphertext
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotePlaintext {
    pub note: Note,
    pub memo: Memo,
}

impl NotePlaintext {
    pub fn new(note: Note, memo: Memo) -> Self {
        Self { note, memo }
    }

    /// Fixed little-endian layout.
    pub fn to_bytes(&self) -> [u8; NOTE_PLAINTEXT_SIZE] {
        let mut bytes = [0u8; NOTE_PLAINTEXT_SIZE];
        bytes[0..32].copy_from_slice(&self.note.owner_pk);
        bytes[32..40].copy_from_slice(&self.note.value.as_u64().to_le_bytes());
        bytes[40..72].copy_from_slice(&self.note.rho);
        bytes[72..104].copy_from_slice(&self.note.randomness);
        bytes[104..].copy_from_slice(&self.memo.0);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != NOTE_PLAINTEXT_SIZE {
            return Err(PrivacyError::MalformedPlaintext("wrong plaintext length"));
        }
        let field = |range: std::ops::Range<usize>| -> [u8; 32] {
            let mut out = [0u8; 32];
            out.copy_from_slice(&bytes[range]);
            out
        };
        let mut value = [0u8; 8];
        value.copy_from_slice(&bytes[32..40]);
        let mut memo = [0u8; MEMO_SIZE];
        memo.copy_from_slice(&bytes[104..]);

        Ok(Self {
            note: Note::new(
                field(0..32),
                NoteValue::new(u64::from_le_bytes(value)),
                field(40..72),
                field(72..104),
            ),
            memo: Memo(memo),
        })
    }

    /// Encrypt to `pk_enc` at the encryptor's next output index.
    pub fn encrypt(
        &self,
        encryptor: &mut NoteEncryptor,
        pk_enc: &[u8; 32],
    ) -> Result<NoteCiphertext> {
        encryptor.encrypt(pk_enc, &self.to_bytes())
    }

    /// Authenticate and decrypt the ciphertext of output `index`.
    pub fn decrypt(
        decryptor: &NoteDecryptor,
        ciphertext: &NoteCiphertext,
        epk: &[u8; 32],
        h_sig: &HSig,
        index: usize,
    ) -> Result<Self> {
        let bytes = decryptor.decrypt(ciphertext, epk, h_sig, index)?;
        Self::from_bytes(&bytes)
    }
}

/// Sender side: one ephemeral key for all outputs of a JoinSplit.
pub struct NoteEncryptor {
    h_sig: HSig,
    esk: StaticSecret,
    epk: [u8; 32],
    next_index: u8,
}

impl NoteEncryptor {
    pub fn new<R: RngCore + CryptoRng>(h_sig: HSig, rng: &mut R) -> Self {
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        let esk = StaticSecret::from(seed);
        let epk = *PublicKey::from(&esk).as_bytes();
        Self {
            h_sig,
            esk,
            epk,
            next_index: 0,
        }
    }

    /// Ephemeral public key published alongside the ciphertexts.
    pub fn epk(&self) -> [u8; 32] {
        self.epk
    }

    pub fn h_sig(&self) -> &HSig {
        &self.h_sig
    }

    fn encrypt(
        &mut self,
        pk_enc: &[u8; 32],
        plaintext: &[u8; NOTE_PLAINTEXT_SIZE],
    ) -> Result<NoteCiphertext> {
        let index = self.next_index;
        self.next_index = index.checked_add(1).ok_or(PrivacyError::EncryptionFailed)?;

        let dh = self.esk.diffie_hellman(&PublicKey::from(*pk_enc));
        let key = derive_note_key(&self.h_sig, dh.as_bytes(), &self.epk, pk_enc, index);

        let cipher = ChaCha20Poly1305::new_from_slice(&key)
            .map_err(|_| PrivacyError::EncryptionFailed)?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&[0u8; 12]), plaintext.as_slice())
            .map_err(|_| PrivacyError::EncryptionFailed)?;

        let bytes: [u8; NOTE_CIPHERTEXT_SIZE] = ciphertext
            .try_into()
            .map_err(|_| PrivacyError::EncryptionFailed)?;
        Ok(NoteCiphertext(bytes))
    }
}

/// Recipient side.
pub struct NoteDecryptor {
    sk_enc: StaticSecret,
    pk_enc: [u8; 32],
}

impl NoteDecryptor {
    pub fn new(viewing_key: &ViewingKey) -> Self {
        Self {
            sk_enc: viewing_key.secret(),
            pk_enc: viewing_key.pk_enc(),
        }
    }

    pub fn decrypt(
        &self,
        ciphertext: &NoteCiphertext,
        epk: &[u8; 32],
        h_sig: &HSig,
        index: usize,
    ) -> Result<Vec<u8>> {
        let index = u8::try_from(index).map_err(|_| PrivacyError::DecryptionFailed)?;

        let dh = self.sk_enc.diffie_hellman(&PublicKey::from(*epk));
        if !dh.was_contributory() {
            return Err(PrivacyError::DecryptionFailed);
        }
        let key = derive_note_key(h_sig, dh.as_bytes(), epk, &self.pk_enc, index);

        let cipher = ChaCha20Poly1305::new_from_slice(&key)
            .map_err(|_| PrivacyError::DecryptionFailed)?;
        cipher
            .decrypt(Nonce::from_slice(&[0u8; 12]), ciphertext.0.as_slice())
            .map_err(|_| PrivacyError::DecryptionFailed)
    }
}

/// Decrypt output `index` of a JoinSplit with a viewing key.
pub fn decrypt_note(
    ciphertext: &NoteCiphertext,
    epk: &[u8; 32],
    h_sig: &HSig,
    viewing_key: &ViewingKey,
    index: usize,
) -> Result<NotePlaintext> {
    NotePlaintext::decrypt(&NoteDecryptor::new(viewing_key), ciphertext, epk, h_sig, index)
}

/// Try to decrypt a note (scan mode - for wallet scanning)
///
/// Returns the plaintext if decryption succeeds and the recovered note
/// matches the published commitment.
pub fn try_decrypt_note(
    ciphertext: &NoteCiphertext,
    epk: &[u8; 32],
    h_sig: &HSig,
    viewing_key: &ViewingKey,
    index: usize,
    expected_commitment: &Commitment,
) -> Option<NotePlaintext> {
    let plaintext = decrypt_note(ciphertext, epk, h_sig, viewing_key, index).ok()?;
    (plaintext.note.commitment() == *expected_commitment).then_some(plaintext)
}

fn derive_note_key(
    h_sig: &HSig,
    dh: &[u8; 32],
    epk: &[u8; 32],
    pk_enc: &[u8; 32],
    index: u8,
) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT);
    hasher.update(h_sig.as_bytes());
    hasher.update(dh);
    hasher.update(epk);
    hasher.update(pk_enc);
    hasher.update(&[index]);
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::ShieldedKeyBundle;
    use crate::poseidon::random_field_bytes;
    use rand::rngs::OsRng;

    fn note_for(bundle: &ShieldedKeyBundle, value: u64) -> Note {
        let mut rng = OsRng;
        Note::new(
            bundle.address.a_pk,
            NoteValue::new(value),
            random_field_bytes(&mut rng),
            random_field_bytes(&mut rng),
        )
    }

    #[test]
    fn test_encrypt_decrypt_note() {
        let mut rng = OsRng;
        let recipient = ShieldedKeyBundle::random(&mut rng);
        let h_sig = HSig([5u8; 32]);

        let plaintext = NotePlaintext::new(
            note_for(&recipient, 1000),
            Memo::from_bytes(b"test memo").unwrap(),
        );
        let mut encryptor = NoteEncryptor::new(h_sig, &mut rng);
        let ct = plaintext.encrypt(&mut encryptor, &recipient.address.pk_enc).unwrap();

        let decrypted = decrypt_note(&ct, &encryptor.epk(), &h_sig, &recipient.viewing_key, 0)
            .expect("decryption should succeed");
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_index_and_hsig_bound() {
        let mut rng = OsRng;
        let recipient = ShieldedKeyBundle::random(&mut rng);
        let h_sig = HSig([5u8; 32]);

        let mut encryptor = NoteEncryptor::new(h_sig, &mut rng);
        let first = NotePlaintext::new(note_for(&recipient, 1), Memo::empty());
        let second = NotePlaintext::new(note_for(&recipient, 2), Memo::empty());
        let ct0 = first.encrypt(&mut encryptor, &recipient.address.pk_enc).unwrap();
        let ct1 = second.encrypt(&mut encryptor, &recipient.address.pk_enc).unwrap();
        let epk = encryptor.epk();
        let vk = &recipient.viewing_key;

        assert_eq!(decrypt_note(&ct1, &epk, &h_sig, vk, 1).unwrap(), second);
        assert_eq!(decrypt_note(&ct0, &epk, &h_sig, vk, 1), Err(PrivacyError::DecryptionFailed));
        assert_eq!(
            decrypt_note(&ct0, &epk, &HSig([6u8; 32]), vk, 0),
            Err(PrivacyError::DecryptionFailed)
        );
    }

    #[test]
    fn test_wrong_key_fails() {
        let mut rng = OsRng;
        let recipient = ShieldedKeyBundle::random(&mut rng);
        let other = ShieldedKeyBundle::random(&mut rng);
        let h_sig = HSig([5u8; 32]);

        let mut encryptor = NoteEncryptor::new(h_sig, &mut rng);
        let ct = NotePlaintext::new(note_for(&recipient, 1000), Memo::empty())
            .encrypt(&mut encryptor, &recipient.address.pk_enc)
            .unwrap();

        let result = decrypt_note(&ct, &encryptor.epk(), &h_sig, &other.viewing_key, 0);
        assert_eq!(result, Err(PrivacyError::DecryptionFailed), "wrong key should fail decryption");
    }

    #[test]
    fn test_low_order_epk_rejected() {
        let mut rng = OsRng;
        let recipient = ShieldedKeyBundle::random(&mut rng);
        let ct = NoteCiphertext([0u8; NOTE_CIPHERTEXT_SIZE]);

        let result = decrypt_note(&ct, &[0u8; 32], &HSig([5u8; 32]), &recipient.viewing_key, 0);
        assert_eq!(result, Err(PrivacyError::DecryptionFailed));
    }

    #[test]
    fn test_commitment_verification() {
        let mut rng = OsRng;
        let recipient = ShieldedKeyBundle::random(&mut rng);
        let h_sig = HSig([5u8; 32]);

        let note = note_for(&recipient, 1000);
        let commitment = note.commitment();

        let mut encryptor = NoteEncryptor::new(h_sig, &mut rng);
        let ct = NotePlaintext::new(note, Memo::empty())
            .encrypt(&mut encryptor, &recipient.address.pk_enc)
            .unwrap();
        let epk = encryptor.epk();

        // Should succeed with correct commitment
        let result = try_decrypt_note(&ct, &epk, &h_sig, &recipient.viewing_key, 0, &commitment);
        assert!(result.is_some());

        // Should fail with wrong commitment
        let wrong_commitment = Commitment([0u8; 32]);
        let result = try_decrypt_note(
            &ct,
            &epk,
            &h_sig,
            &recipient.viewing_key,
            0,
            &wrong_commitment,
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_memo_too_long() {
        assert!(Memo::from_bytes(&[1u8; MEMO_SIZE]).is_ok());
        assert!(Memo::from_bytes(&[1u8; MEMO_SIZE + 1]).is_err());
        assert_eq!(Memo::empty().0[0], 0xF6);
    }
}

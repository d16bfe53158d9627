//! JoinSplit description: the public record of one JoinSplit.
//!
//! ```text
//! Wire layout (1696 bytes, little-endian integers):
//!   anchor[32] | nf0[32] | nf1[32] | cm0[32] | cm1[32] | ephemeral_key[32] |
//!   random_seed[32] | mac0[32] | mac1[32] | proof[128] | ct0[632] | ct1[632] |
//!   value_in[8] | value_out[8]
//! ```

use ark_std::rand::{CryptoRng, RngCore};
use shade_privacy::{
    Anchor, Commitment, HSig, Mac, NOTE_CIPHERTEXT_SIZE, Note, NoteCiphertext, Nullifier,
    poseidon::fr_from_canonical_bytes,
};

use crate::backend::Proof;
use crate::circuit::PublicInputs;
use crate::constants::{JS_DESCRIPTION_SIZE, NUM_INPUTS, NUM_OUTPUTS, PROOF_SIZE};
use crate::error::{ProtocolError, Result};
use crate::joinsplit::{JSInput, JSOutput, JoinSplit};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JSDescription {
    pub anchor: Anchor,
    pub nullifiers: [Nullifier; NUM_INPUTS],
    pub commitments: [Commitment; NUM_OUTPUTS],
    pub ephemeral_key: [u8; 32],
    pub random_seed: [u8; 32],
    pub macs: [Mac; NUM_INPUTS],
    pub proof: Proof,
    pub ciphertexts: [NoteCiphertext; NUM_OUTPUTS],
    pub value_in: u64,
    pub value_out: u64,
}

impl JSDescription {
    /// Prepare and prove in one step. Also returns the output notes so the
    /// sender can track them.
    #[allow(clippy::too_many_arguments)]
    pub fn new<R: RngCore + CryptoRng>(
        params: &JoinSplit,
        pubkey_hash: &[u8; 32],
        anchor: &Anchor,
        inputs: &[JSInput; NUM_INPUTS],
        outputs: &[JSOutput; NUM_OUTPUTS],
        value_in: u64,
        value_out: u64,
        rng: &mut R,
    ) -> Result<(Self, [Note; NUM_OUTPUTS])> {
        let prepared = params.prepare(
            inputs,
            outputs,
            anchor,
            pubkey_hash,
            value_in,
            value_out,
            rng,
        )?;
        let proof = params.prove(&prepared.witness)?;
        let notes = prepared.output_notes.clone();
        Ok((prepared.into_description(proof), notes))
    }

    /// Recompute the binding tag for the key that authorizes the enclosing
    /// transaction.
    pub fn h_sig(&self, pubkey_hash: &[u8; 32]) -> HSig {
        HSig::compute(&self.random_seed, &self.nullifiers, pubkey_hash)
    }

    pub fn verify(&self, params: &JoinSplit, pubkey_hash: &[u8; 32]) -> Result<bool> {
        params.verify(self, pubkey_hash)
    }

    /// Public inputs of the proof. `None` if any published field element
    /// is not canonically encoded.
    pub fn public_inputs(&self, h_sig: &HSig) -> Option<PublicInputs> {
        let field = |bytes: &[u8; 32]| fr_from_canonical_bytes(bytes);
        Some(PublicInputs {
            anchor: field(self.anchor.as_bytes())?,
            h_sig: h_sig.to_field(),
            nullifiers: [
                field(self.nullifiers[0].as_bytes())?,
                field(self.nullifiers[1].as_bytes())?,
            ],
            commitments: [
                field(self.commitments[0].as_bytes())?,
                field(self.commitments[1].as_bytes())?,
            ],
            macs: [field(self.macs[0].as_bytes())?, field(self.macs[1].as_bytes())?],
            value_in: self.value_in,
            value_out: self.value_out,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(JS_DESCRIPTION_SIZE);
        bytes.extend_from_slice(self.anchor.as_bytes());
        for nf in &self.nullifiers {
            bytes.extend_from_slice(nf.as_bytes());
        }
        for cm in &self.commitments {
            bytes.extend_from_slice(cm.as_bytes());
        }
        bytes.extend_from_slice(&self.ephemeral_key);
        bytes.extend_from_slice(&self.random_seed);
        for mac in &self.macs {
            bytes.extend_from_slice(mac.as_bytes());
        }
        bytes.extend_from_slice(self.proof.as_bytes());
        for ct in &self.ciphertexts {
            bytes.extend_from_slice(ct.as_bytes());
        }
        bytes.extend_from_slice(&self.value_in.to_le_bytes());
        bytes.extend_from_slice(&self.value_out.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != JS_DESCRIPTION_SIZE {
            return Err(ProtocolError::MalformedDescription("wrong length").into());
        }
        let mut reader = Reader { bytes };

        let anchor = Anchor(reader.take()?);
        let nullifiers = [Nullifier(reader.take()?), Nullifier(reader.take()?)];
        let commitments = [Commitment(reader.take()?), Commitment(reader.take()?)];
        let ephemeral_key = reader.take()?;
        let random_seed = reader.take()?;
        let macs = [Mac(reader.take()?), Mac(reader.take()?)];
        let proof = Proof(reader.take::<PROOF_SIZE>()?);
        let ciphertexts = [
            NoteCiphertext(reader.take::<NOTE_CIPHERTEXT_SIZE>()?),
            NoteCiphertext(reader.take::<NOTE_CIPHERTEXT_SIZE>()?),
        ];
        let value_in = u64::from_le_bytes(reader.take()?);
        let value_out = u64::from_le_bytes(reader.take()?);

        Ok(Self {
            anchor,
            nullifiers,
            commitments,
            ephemeral_key,
            random_seed,
            macs,
            proof,
            ciphertexts,
            value_in,
            value_out,
        })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let (head, rest) = self
            .bytes
            .split_first_chunk::<N>()
            .ok_or(ProtocolError::MalformedDescription("truncated"))?;
        self.bytes = rest;
        Ok(*head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> JSDescription {
        JSDescription {
            anchor: Anchor::empty(),
            nullifiers: [Nullifier([1; 32]), Nullifier([2; 32])],
            commitments: [Commitment([3; 32]), Commitment([4; 32])],
            ephemeral_key: [5; 32],
            random_seed: [6; 32],
            macs: [Mac([7; 32]), Mac([8; 32])],
            proof: Proof([9; PROOF_SIZE]),
            ciphertexts: [
                NoteCiphertext([10; NOTE_CIPHERTEXT_SIZE]),
                NoteCiphertext([11; NOTE_CIPHERTEXT_SIZE]),
            ],
            value_in: 12,
            value_out: 13,
        }
    }

    #[test]
    fn test_wire_layout() {
        let desc = sample();
        let bytes = desc.to_bytes();
        assert_eq!(bytes.len(), JS_DESCRIPTION_SIZE);
        assert_eq!(&bytes[32..64], &[1u8; 32]);
        assert_eq!(&bytes[288..288 + PROOF_SIZE], &[9u8; PROOF_SIZE]);
        assert_eq!(&bytes[JS_DESCRIPTION_SIZE - 16..JS_DESCRIPTION_SIZE - 8], &12u64.to_le_bytes());
        assert_eq!(JSDescription::from_bytes(&bytes).unwrap(), desc);
    }

    #[test]
    fn test_from_bytes_rejects_wrong_length() {
        let bytes = sample().to_bytes();
        assert!(JSDescription::from_bytes(&bytes[..bytes.len() - 1]).is_err());
        let mut long = bytes.clone();
        long.push(0);
        assert!(JSDescription::from_bytes(&long).is_err());
    }

    #[test]
    fn test_h_sig_depends_on_pubkey_hash() {
        let desc = sample();
        assert_ne!(desc.h_sig(&[0u8; 32]), desc.h_sig(&[1u8; 32]));
    }

    #[test]
    fn test_public_inputs_reject_non_canonical() {
        let mut desc = sample();
        let h_sig = desc.h_sig(&[0u8; 32]);
        assert!(desc.public_inputs(&h_sig).is_some());

        desc.commitments[1] = Commitment([0xff; 32]);
        assert!(desc.public_inputs(&h_sig).is_none());
    }
}

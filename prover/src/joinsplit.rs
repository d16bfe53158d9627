//! JoinSplit Protocol Engine
//!
//! Spends two notes and creates two notes in one zero-knowledge proof.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        prepare()                                 │
//! │                                                                  │
//! │  inputs ──► nullifiers ──► h_sig(seed, nf, pubkey_hash)          │
//! │                              │                                   │
//! │  outputs ──► rho_i = PRF_rho(phi, i, h_sig) ──► commitments      │
//! │                              │                                   │
//! │                              ├──► ciphertexts (one epk)          │
//! │                              └──► mac_i = PRF_pk(a_sk, i, h_sig) │
//! │                                                                  │
//! │  ──► PreparedWitness ──► prove() ──► JSDescription               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::time::Instant;

use ark_std::rand::{CryptoRng, RngCore};
use log::{debug, error, info};
use shade_config::{ParamsConfig, ProverMode};
use shade_privacy::{
    Anchor, Commitment, CommitmentTree, CommitmentWitness, HSig, Mac, Memo, Note, NoteCiphertext,
    NoteEncryptor, NotePlaintext, NoteValue, Nullifier, PaymentAddress, SpendingKey,
    derive_output_rho, prf_mac,
    poseidon::{fr_from_bytes, fr_from_canonical_bytes, random_field_bytes},
};

use crate::backend::{Backend, Groth16Backend, MockBackend, Proof, ProofBackend};
use crate::circuit::{InputAssignment, JoinSplitCircuit, OutputAssignment, PublicInputs};
use crate::constants::{NUM_INPUTS, NUM_OUTPUTS};
use crate::description::JSDescription;
use crate::error::{JoinSplitError, KeyKind, ProtocolError, Result};
use crate::params::initialize;
use crate::witness::PreparedWitness;

/// Proving context: a backend plus the location of a lazily loaded
/// proving key.
pub struct JoinSplit {
    pub(crate) backend: Box<dyn ProofBackend>,
    pub(crate) proving_key_path: Option<PathBuf>,
}

impl std::fmt::Debug for JoinSplit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinSplit")
            .field("backend", &self.backend.name())
            .field("has_proving_key", &self.backend.has_proving_key())
            .field("has_verifying_key", &self.backend.has_verifying_key())
            .field("proving_key_path", &self.proving_key_path)
            .finish()
    }
}

impl JoinSplit {
    /// Run trusted setup. Bootstrap and test use only: whoever runs this
    /// learns the setup randomness.
    pub fn generate<B: Backend>() -> Result<Self> {
        initialize();
        let mut backend = B::default();
        let start = Instant::now();
        backend.setup(JoinSplitCircuit::blank())?;
        info!(
            "{} trusted setup complete in {:?}",
            backend.name(),
            start.elapsed()
        );
        Ok(Self {
            backend: Box::new(backend),
            proving_key_path: None,
        })
    }

    /// A context with no keys. Load them with `load_verifying_key` and
    /// `preload_proving_key`.
    pub fn unopened<B: Backend>() -> Self {
        initialize();
        Self {
            backend: Box::new(B::default()),
            proving_key_path: None,
        }
    }

    /// Open the key files named by the configuration. The verifying key is
    /// read now, the proving key on `load_proving_key`.
    pub fn from_config(config: &ParamsConfig) -> Result<Self> {
        let mut params = match config.prover_mode {
            ProverMode::Mock => Self::unopened::<MockBackend>(),
            ProverMode::Groth16 => Self::unopened::<Groth16Backend>(),
        };
        params.load_verifying_key(config.verifying_key_path())?;
        params.preload_proving_key(config.proving_key_path());
        Ok(params)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn has_proving_key(&self) -> bool {
        self.backend.has_proving_key()
    }

    pub fn has_verifying_key(&self) -> bool {
        self.backend.has_verifying_key()
    }

    /// Derive everything a JoinSplit publishes and build the circuit
    /// assignment. No proof is produced yet.
    #[allow(clippy::too_many_arguments)]
    pub fn prepare<R: RngCore + CryptoRng>(
        &self,
        inputs: &[JSInput; NUM_INPUTS],
        outputs: &[JSOutput; NUM_OUTPUTS],
        anchor: &Anchor,
        pubkey_hash: &[u8; 32],
        value_in: u64,
        value_out: u64,
        rng: &mut R,
    ) -> Result<PreparedJoinSplit> {
        let anchor_field =
            fr_from_canonical_bytes(anchor.as_bytes()).ok_or(ProtocolError::NonCanonicalAnchor)?;
        check_inputs(inputs, anchor)?;
        check_outputs(outputs)?;
        check_balance(inputs, outputs, value_in, value_out)?;

        // Nullifiers of the spent notes.
        let nullifiers: [Nullifier; NUM_INPUTS] = std::array::from_fn(|i| inputs[i].nullifier());

        // Binding tag.
        let mut random_seed = [0u8; 32];
        rng.fill_bytes(&mut random_seed);
        let h_sig = HSig::compute(&random_seed, &nullifiers, pubkey_hash);

        // Output notes and their commitments.
        let phi = random_field_bytes(rng);
        let output_notes: [Note; NUM_OUTPUTS] = std::array::from_fn(|i| {
            let r = random_field_bytes(rng);
            outputs[i].note(&phi, r, i, &h_sig)
        });
        let commitments: [Commitment; NUM_OUTPUTS] =
            std::array::from_fn(|i| output_notes[i].commitment());

        // Ciphertexts under one ephemeral key.
        let mut encryptor = NoteEncryptor::new(h_sig, rng);
        let ciphertexts: [NoteCiphertext; NUM_OUTPUTS] = try_array(|i| {
            let plaintext = NotePlaintext::new(output_notes[i].clone(), outputs[i].memo.clone());
            Ok(plaintext.encrypt(&mut encryptor, &outputs[i].addr.pk_enc)?)
        })?;

        // Spend authority tags.
        let macs: [Mac; NUM_INPUTS] = std::array::from_fn(|i| prf_mac(&inputs[i].key, i, &h_sig));

        // Circuit assignment.
        let input_assignments: [InputAssignment; NUM_INPUTS] = try_array(|i| {
            let input = &inputs[i];
            let path = input.witness.path()?;
            Ok(InputAssignment {
                a_sk: input.key.to_field(),
                value: input.note.value.as_u64(),
                rho: fr_from_bytes(&input.note.rho),
                r: fr_from_bytes(&input.note.randomness),
                authentication_path: path.to_field_elements(),
                index: path.index,
            })
        })?;
        let output_assignments: [OutputAssignment; NUM_OUTPUTS] =
            std::array::from_fn(|i| OutputAssignment {
                a_pk: fr_from_bytes(&output_notes[i].owner_pk),
                value: output_notes[i].value.as_u64(),
                r: fr_from_bytes(&output_notes[i].randomness),
            });

        let circuit = JoinSplitCircuit {
            public: PublicInputs {
                anchor: anchor_field,
                h_sig: h_sig.to_field(),
                nullifiers: nullifiers.map(|nf| nf.to_field()),
                commitments: commitments.map(|cm| cm.to_field()),
                macs: macs.map(|mac| mac.to_field()),
                value_in,
                value_out,
            },
            phi: fr_from_bytes(&phi),
            inputs: input_assignments,
            outputs: output_assignments,
        };

        debug!(
            "Prepared joinsplit: anchor {}, value_in {}, value_out {}",
            hex::encode(anchor.as_bytes()),
            value_in,
            value_out
        );

        Ok(PreparedJoinSplit {
            anchor: *anchor,
            nullifiers,
            commitments,
            output_notes,
            ciphertexts,
            ephemeral_key: encryptor.epk(),
            random_seed,
            h_sig,
            macs,
            value_in,
            value_out,
            witness: PreparedWitness::new(circuit),
        })
    }

    /// Prove a prepared witness.
    pub fn prove(&self, witness: &PreparedWitness) -> Result<Proof> {
        if !self.backend.has_proving_key() {
            return Err(JoinSplitError::KeyNotLoaded(KeyKind::Proving));
        }
        if !witness.is_satisfied()? {
            error!("JoinSplit witness does not satisfy the constraint system");
            return Err(JoinSplitError::UnsatisfiedWitness);
        }

        let start = Instant::now();
        let proof = self.backend.prove(witness.circuit().clone())?;
        debug!("{} proof generated in {:?}", self.backend.name(), start.elapsed());
        Ok(proof)
    }

    /// Check a description's proof against its public data.
    ///
    /// `Ok(false)` covers any mismatch, including non-canonical field
    /// encodings. `Err` means the verifier could not run.
    pub fn verify(&self, description: &JSDescription, pubkey_hash: &[u8; 32]) -> Result<bool> {
        if !self.backend.has_verifying_key() {
            return Err(JoinSplitError::KeyNotLoaded(KeyKind::Verifying));
        }
        let h_sig = description.h_sig(pubkey_hash);
        let Some(public) = description.public_inputs(&h_sig) else {
            debug!("Rejecting joinsplit with non-canonical public inputs");
            return Ok(false);
        };
        self.backend
            .verify(&public.to_field_elements(), &description.proof)
    }
}

fn check_inputs(inputs: &[JSInput; NUM_INPUTS], anchor: &Anchor) -> Result<()> {
    for (index, input) in inputs.iter().enumerate() {
        if input.note.owner_pk != input.key.paying_key() {
            return Err(ProtocolError::OwnerMismatch { index }.into());
        }
        if input.witness.element() != input.note.commitment() {
            return Err(ProtocolError::WitnessMismatch { index }.into());
        }
        if input.note.value != NoteValue::ZERO && input.witness.root() != *anchor {
            return Err(ProtocolError::AnchorMismatch { index }.into());
        }
    }
    Ok(())
}

fn check_outputs(outputs: &[JSOutput; NUM_OUTPUTS]) -> Result<()> {
    for (index, output) in outputs.iter().enumerate() {
        // A reduced paying key would commit to a different owner.
        if fr_from_canonical_bytes(&output.addr.a_pk).is_none() {
            return Err(ProtocolError::NonCanonicalAddress { index }.into());
        }
    }
    Ok(())
}

fn check_balance(
    inputs: &[JSInput; NUM_INPUTS],
    outputs: &[JSOutput; NUM_OUTPUTS],
    value_in: u64,
    value_out: u64,
) -> Result<()> {
    let lhs = inputs
        .iter()
        .try_fold(NoteValue::new(value_in), |acc, i| acc.checked_add(i.note.value))
        .ok_or(ProtocolError::ValueOverflow)?;
    let rhs = outputs
        .iter()
        .try_fold(NoteValue::new(value_out), |acc, o| acc.checked_add(o.value))
        .ok_or(ProtocolError::ValueOverflow)?;

    if lhs != rhs {
        return Err(ProtocolError::Unbalanced {
            inputs: lhs.as_u64(),
            outputs: rhs.as_u64(),
        }
        .into());
    }
    Ok(())
}

fn try_array<U, const N: usize>(mut f: impl FnMut(usize) -> Result<U>) -> Result<[U; N]> {
    let mut items = Vec::with_capacity(N);
    for i in 0..N {
        items.push(f(i)?);
    }
    items
        .try_into()
        .map_err(|_| JoinSplitError::Synthesis("fixed arity violated".into()))
}

/// A note being spent.
#[derive(Clone, Debug)]
pub struct JSInput {
    pub witness: CommitmentWitness,
    pub note: Note,
    pub key: SpendingKey,
}

impl JSInput {
    pub fn new(witness: CommitmentWitness, note: Note, key: SpendingKey) -> Self {
        Self { witness, note, key }
    }

    /// A zero-valued input under a fresh key, witnessed in a throwaway
    /// one-leaf tree. Exempt from the anchor check.
    pub fn dummy<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self> {
        let key = SpendingKey::random(rng);
        let note = Note::dummy(key.paying_key(), rng);
        let mut tree = CommitmentTree::new();
        tree.append(note.commitment())?;
        Ok(Self {
            witness: tree.witness()?,
            note,
            key,
        })
    }

    pub fn nullifier(&self) -> Nullifier {
        self.note.nullifier(&self.key)
    }
}

/// A note being created.
#[derive(Clone, Debug)]
pub struct JSOutput {
    pub addr: PaymentAddress,
    pub value: NoteValue,
    pub memo: Memo,
}

impl JSOutput {
    pub fn new(addr: PaymentAddress, value: u64) -> Self {
        Self {
            addr,
            value: NoteValue::new(value),
            memo: Memo::empty(),
        }
    }

    pub fn with_memo(mut self, memo: Memo) -> Self {
        self.memo = memo;
        self
    }

    /// A zero-valued output to a fresh, unknown address.
    pub fn dummy<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let addr = SpendingKey::random(rng).address();
        Self::new(addr, 0)
    }

    /// The note this output creates at slot `index`.
    pub fn note(&self, phi: &[u8; 32], r: [u8; 32], index: usize, h_sig: &HSig) -> Note {
        Note::new(
            self.addr.a_pk,
            self.value,
            derive_output_rho(phi, index, h_sig),
            r,
        )
    }
}

/// Everything `prepare` derived, waiting for a proof.
#[derive(Clone, Debug)]
pub struct PreparedJoinSplit {
    pub anchor: Anchor,
    pub nullifiers: [Nullifier; NUM_INPUTS],
    pub commitments: [Commitment; NUM_OUTPUTS],
    pub output_notes: [Note; NUM_OUTPUTS],
    pub ciphertexts: [NoteCiphertext; NUM_OUTPUTS],
    pub ephemeral_key: [u8; 32],
    pub random_seed: [u8; 32],
    pub h_sig: HSig,
    pub macs: [Mac; NUM_INPUTS],
    pub value_in: u64,
    pub value_out: u64,
    pub witness: PreparedWitness,
}

impl PreparedJoinSplit {
    pub fn into_description(self, proof: Proof) -> JSDescription {
        JSDescription {
            anchor: self.anchor,
            nullifiers: self.nullifiers,
            commitments: self.commitments,
            ephemeral_key: self.ephemeral_key,
            random_seed: self.random_seed,
            macs: self.macs,
            proof,
            ciphertexts: self.ciphertexts,
            value_in: self.value_in,
            value_out: self.value_out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use shade_privacy::ShieldedKeyBundle;

    fn params() -> JoinSplit {
        JoinSplit::generate::<MockBackend>().unwrap()
    }

    fn dummies() -> [JSInput; NUM_INPUTS] {
        [
            JSInput::dummy(&mut OsRng).unwrap(),
            JSInput::dummy(&mut OsRng).unwrap(),
        ]
    }

    #[test]
    fn test_prepare_dummy_is_satisfied() {
        let params = params();
        let outputs = [JSOutput::dummy(&mut OsRng), JSOutput::dummy(&mut OsRng)];
        let prepared = params
            .prepare(&dummies(), &outputs, &Anchor::empty(), &[7u8; 32], 0, 0, &mut OsRng)
            .unwrap();
        assert!(prepared.witness.is_satisfied().unwrap());
        assert_ne!(prepared.nullifiers[0], prepared.nullifiers[1]);
        assert_ne!(prepared.commitments[0], prepared.commitments[1]);
    }

    #[test]
    fn test_output_rhos_differ() {
        let params = params();
        let addr = ShieldedKeyBundle::random(&mut OsRng).address;
        let outputs = [JSOutput::new(addr, 3), JSOutput::new(addr, 3)];
        let prepared = params
            .prepare(&dummies(), &outputs, &Anchor::empty(), &[0u8; 32], 6, 0, &mut OsRng)
            .unwrap();
        assert_ne!(prepared.output_notes[0].rho, prepared.output_notes[1].rho);
    }

    #[test]
    fn test_owner_mismatch() {
        let params = params();
        let mut inputs = dummies();
        inputs[1].key = SpendingKey::random(&mut OsRng);
        let outputs = [JSOutput::dummy(&mut OsRng), JSOutput::dummy(&mut OsRng)];
        let err = params
            .prepare(&inputs, &outputs, &Anchor::empty(), &[0u8; 32], 0, 0, &mut OsRng)
            .unwrap_err();
        assert!(matches!(
            err,
            JoinSplitError::Protocol(ProtocolError::OwnerMismatch { index: 1 })
        ));
    }

    #[test]
    fn test_value_overflow() {
        let params = params();
        let addr = ShieldedKeyBundle::random(&mut OsRng).address;
        let outputs = [JSOutput::new(addr, u64::MAX), JSOutput::new(addr, 1)];
        let err = params
            .prepare(&dummies(), &outputs, &Anchor::empty(), &[0u8; 32], u64::MAX, 0, &mut OsRng)
            .unwrap_err();
        assert!(matches!(err, JoinSplitError::Protocol(ProtocolError::ValueOverflow)));
    }

    #[test]
    fn test_non_canonical_anchor() {
        let params = params();
        let outputs = [JSOutput::dummy(&mut OsRng), JSOutput::dummy(&mut OsRng)];
        let err = params
            .prepare(&dummies(), &outputs, &Anchor([0xff; 32]), &[0u8; 32], 0, 0, &mut OsRng)
            .unwrap_err();
        assert!(matches!(
            err,
            JoinSplitError::Protocol(ProtocolError::NonCanonicalAnchor)
        ));
    }

    #[test]
    fn test_non_canonical_output_address() {
        let params = params();
        let mut outputs = [JSOutput::dummy(&mut OsRng), JSOutput::dummy(&mut OsRng)];
        outputs[1].addr.a_pk = [0xff; 32];
        let err = params
            .prepare(&dummies(), &outputs, &Anchor::empty(), &[0u8; 32], 0, 0, &mut OsRng)
            .unwrap_err();
        assert!(matches!(
            err,
            JoinSplitError::Protocol(ProtocolError::NonCanonicalAddress { index: 1 })
        ));
    }

    #[test]
    fn test_prove_without_key() {
        let params = JoinSplit::unopened::<MockBackend>();
        let outputs = [JSOutput::dummy(&mut OsRng), JSOutput::dummy(&mut OsRng)];
        let prepared = params
            .prepare(&dummies(), &outputs, &Anchor::empty(), &[0u8; 32], 0, 0, &mut OsRng)
            .unwrap();
        assert!(matches!(
            params.prove(&prepared.witness),
            Err(JoinSplitError::KeyNotLoaded(KeyKind::Proving))
        ));
    }

    #[test]
    fn test_prove_rejects_tampered_witness() {
        let params = params();
        let outputs = [JSOutput::dummy(&mut OsRng), JSOutput::dummy(&mut OsRng)];
        let mut prepared = params
            .prepare(&dummies(), &outputs, &Anchor::empty(), &[0u8; 32], 0, 0, &mut OsRng)
            .unwrap();
        prepared.witness.circuit.public.value_out = 1;
        assert!(matches!(
            params.prove(&prepared.witness),
            Err(JoinSplitError::UnsatisfiedWitness)
        ));
    }
}

//! Proving Backends
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    ProofBackend (sealed)                      │
//! │                                                               │
//! │  Groth16Backend   arkworks Groth16 over BN254, real proofs   │
//! │  MockBackend      keyed BLAKE3 over the public inputs,        │
//! │                   for tests and local development             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both backends consume the same [`JoinSplitCircuit`] assignment, and the
//! engine refuses to prove an assignment that does not satisfy it, so the
//! mock backend enforces the same statement as Groth16. Only soundness
//! against a malicious prover differs.

use ark_bn254::{Bn254, Fr};
use ark_ff::{BigInteger, PrimeField};
use ark_groth16::{Groth16, PreparedVerifyingKey, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::circuit::JoinSplitCircuit;
use crate::constants::PROOF_SIZE;
use crate::error::{JoinSplitError, KeyKind, ProtocolError, Result};

/// A serialized proof.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Proof(pub [u8; PROOF_SIZE]);

impl Proof {
    pub fn as_bytes(&self) -> &[u8; PROOF_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for Proof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Proof({}..)", hex::encode(&self.0[..8]))
    }
}

mod private {
    pub trait Sealed {}
}

/// A proving system for the JoinSplit statement.
pub trait ProofBackend: private::Sealed + Send + Sync {
    fn name(&self) -> &'static str;

    fn has_proving_key(&self) -> bool;

    fn has_verifying_key(&self) -> bool;

    /// Trusted setup over the circuit shape. Replaces both keys.
    fn setup(&mut self, circuit: JoinSplitCircuit) -> Result<()>;

    fn prove(&self, circuit: JoinSplitCircuit) -> Result<Proof>;

    /// `Ok(false)` for an invalid proof, `Err` when the verifier itself
    /// cannot run.
    fn verify(&self, public_inputs: &[Fr], proof: &Proof) -> Result<bool>;

    fn proving_key_bytes(&self) -> Result<Option<Vec<u8>>>;

    fn verifying_key_bytes(&self) -> Result<Option<Vec<u8>>>;

    /// Replace the proving key. `None` when `bytes` is not a key of this
    /// backend.
    fn load_proving_key(&mut self, bytes: &[u8]) -> Option<()>;

    fn load_verifying_key(&mut self, bytes: &[u8]) -> Option<()>;
}

/// Backends selectable by type in [`crate::JoinSplit::generate`].
pub trait Backend: ProofBackend + Default + 'static {}

impl<T: ProofBackend + Default + 'static> Backend for T {}

// ============================================================================
// Groth16
// ============================================================================

#[derive(Default)]
pub struct Groth16Backend {
    proving_key: Option<ProvingKey<Bn254>>,
    verifying_key: Option<VerifyingKey<Bn254>>,
    prepared: Option<PreparedVerifyingKey<Bn254>>,
}

impl private::Sealed for Groth16Backend {}

impl Groth16Backend {
    fn set_verifying_key(&mut self, vk: VerifyingKey<Bn254>) -> Result<()> {
        let pvk = Groth16::<Bn254>::process_vk(&vk)
            .map_err(|e| JoinSplitError::Synthesis(e.to_string()))?;
        self.verifying_key = Some(vk);
        self.prepared = Some(pvk);
        Ok(())
    }
}

fn serialize<T: CanonicalSerialize>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    value
        .serialize_compressed(&mut bytes)
        .map_err(|e| JoinSplitError::Synthesis(format!("serialization failed: {}", e)))?;
    Ok(bytes)
}

impl ProofBackend for Groth16Backend {
    fn name(&self) -> &'static str {
        "groth16"
    }

    fn has_proving_key(&self) -> bool {
        self.proving_key.is_some()
    }

    fn has_verifying_key(&self) -> bool {
        self.prepared.is_some()
    }

    fn setup(&mut self, circuit: JoinSplitCircuit) -> Result<()> {
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(circuit, &mut OsRng)
            .map_err(|e| JoinSplitError::Synthesis(e.to_string()))?;
        self.proving_key = Some(pk);
        self.set_verifying_key(vk)
    }

    fn prove(&self, circuit: JoinSplitCircuit) -> Result<Proof> {
        let pk = self
            .proving_key
            .as_ref()
            .ok_or(JoinSplitError::KeyNotLoaded(KeyKind::Proving))?;
        let proof = Groth16::<Bn254>::prove(pk, circuit, &mut OsRng)
            .map_err(|e| JoinSplitError::Synthesis(e.to_string()))?;

        let bytes = serialize(&proof)?;
        let bytes: [u8; PROOF_SIZE] = bytes
            .try_into()
            .map_err(|_| JoinSplitError::Synthesis("unexpected proof size".into()))?;
        Ok(Proof(bytes))
    }

    fn verify(&self, public_inputs: &[Fr], proof: &Proof) -> Result<bool> {
        let pvk = self
            .prepared
            .as_ref()
            .ok_or(JoinSplitError::KeyNotLoaded(KeyKind::Verifying))?;
        let proof = ark_groth16::Proof::<Bn254>::deserialize_compressed(&proof.0[..])
            .map_err(|_| ProtocolError::MalformedProof)?;

        Groth16::<Bn254>::verify_with_processed_vk(pvk, public_inputs, &proof)
            .map_err(|e| JoinSplitError::Synthesis(e.to_string()))
    }

    fn proving_key_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.proving_key.as_ref().map(serialize).transpose()
    }

    fn verifying_key_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.verifying_key.as_ref().map(serialize).transpose()
    }

    fn load_proving_key(&mut self, bytes: &[u8]) -> Option<()> {
        let pk = ProvingKey::<Bn254>::deserialize_compressed(bytes).ok()?;
        self.proving_key = Some(pk);
        Some(())
    }

    fn load_verifying_key(&mut self, bytes: &[u8]) -> Option<()> {
        let vk = VerifyingKey::<Bn254>::deserialize_compressed(bytes).ok()?;
        self.set_verifying_key(vk).ok()
    }
}

// ============================================================================
// Mock
// ============================================================================

const MOCK_PK_MAGIC: &[u8; 4] = b"SHMP";
const MOCK_VK_MAGIC: &[u8; 4] = b"SHMV";

/// Keyed-hash "proofs". Anyone holding the verifying key can forge one, so
/// this backend is only for tests and local development.
#[derive(Default)]
pub struct MockBackend {
    proving_key: Option<[u8; 32]>,
    verifying_key: Option<[u8; 32]>,
}

impl private::Sealed for MockBackend {}

impl MockBackend {
    fn tag(key: &[u8; 32], public_inputs: &[Fr]) -> Proof {
        let mut hasher = blake3::Hasher::new_keyed(key);
        for input in public_inputs {
            hasher.update(&input.into_bigint().to_bytes_le());
        }
        let mut out = [0u8; PROOF_SIZE];
        hasher.finalize_xof().fill(&mut out);
        Proof(out)
    }

    fn encode(magic: &[u8; 4], key: &[u8; 32]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(36);
        bytes.extend_from_slice(magic);
        bytes.extend_from_slice(key);
        bytes
    }

    fn decode(magic: &[u8; 4], bytes: &[u8]) -> Option<[u8; 32]> {
        let key = bytes.strip_prefix(magic.as_slice())?;
        key.try_into().ok()
    }
}

impl ProofBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn has_proving_key(&self) -> bool {
        self.proving_key.is_some()
    }

    fn has_verifying_key(&self) -> bool {
        self.verifying_key.is_some()
    }

    fn setup(&mut self, _circuit: JoinSplitCircuit) -> Result<()> {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        self.proving_key = Some(key);
        self.verifying_key = Some(key);
        Ok(())
    }

    fn prove(&self, circuit: JoinSplitCircuit) -> Result<Proof> {
        let key = self
            .proving_key
            .as_ref()
            .ok_or(JoinSplitError::KeyNotLoaded(KeyKind::Proving))?;
        Ok(Self::tag(key, &circuit.public.to_field_elements()))
    }

    fn verify(&self, public_inputs: &[Fr], proof: &Proof) -> Result<bool> {
        let key = self
            .verifying_key
            .as_ref()
            .ok_or(JoinSplitError::KeyNotLoaded(KeyKind::Verifying))?;
        Ok(Self::tag(key, public_inputs) == *proof)
    }

    fn proving_key_bytes(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.proving_key.map(|k| Self::encode(MOCK_PK_MAGIC, &k)))
    }

    fn verifying_key_bytes(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.verifying_key.map(|k| Self::encode(MOCK_VK_MAGIC, &k)))
    }

    fn load_proving_key(&mut self, bytes: &[u8]) -> Option<()> {
        self.proving_key = Some(Self::decode(MOCK_PK_MAGIC, bytes)?);
        Some(())
    }

    fn load_verifying_key(&mut self, bytes: &[u8]) -> Option<()> {
        self.verifying_key = Some(Self::decode(MOCK_VK_MAGIC, bytes)?);
        Some(())
    }
}

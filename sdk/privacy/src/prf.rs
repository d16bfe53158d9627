//! Keyed derivations of the JoinSplit protocol.
//!
//! ```text
//! a_pk  = Poseidon(ADDR, a_sk)
//! mac_i = Poseidon(PKAU, a_sk, i, h_sig)
//! rho_i = Poseidon(RHO_, phi, i, h_sig)
//! h_sig = BLAKE3-derive-key(random_seed || nf_0 || nf_1 || pubkey_hash)
//! ```
//!
//! The Poseidon PRFs are re-derived inside the circuit. `h_sig` is not: it is
//! recomputed by every verifier from public data and fed in as a public input.

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

use crate::note::SpendingKey;
use crate::nullifier::Nullifier;
use crate::poseidon::{self, domain, fr_from_bytes, fr_to_bytes};

const HSIG_CONTEXT: &str = "shade 2026-01-01 JoinSplit hSig";

/// Transaction binding tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HSig(pub [u8; 32]);

impl HSig {
    /// Bind the random seed, the revealed nullifiers and the hash of the
    /// authorizing public key together.
    pub fn compute(
        random_seed: &[u8; 32],
        nullifiers: &[Nullifier],
        pubkey_hash: &[u8; 32],
    ) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(HSIG_CONTEXT);
        hasher.update(random_seed);
        for nf in nullifiers {
            hasher.update(nf.as_bytes());
        }
        hasher.update(pubkey_hash);
        Self(*hasher.finalize().as_bytes())
    }

    /// The tag as a circuit input (reduced mod r).
    pub fn to_field(&self) -> Fr {
        fr_from_bytes(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Per-input authentication tag proving knowledge of `a_sk`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mac(pub [u8; 32]);

impl Mac {
    pub fn to_field(&self) -> Fr {
        fr_from_bytes(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Paying key of a spending key.
pub fn prf_addr(a_sk: &SpendingKey) -> [u8; 32] {
    fr_to_bytes(&poseidon::hash(&[Fr::from(domain::ADDR), a_sk.to_field()]))
}

/// Authentication tag for input slot `index`.
pub fn prf_mac(a_sk: &SpendingKey, index: usize, h_sig: &HSig) -> Mac {
    let result = poseidon::hash(&[
        Fr::from(domain::MAC),
        a_sk.to_field(),
        Fr::from(index as u64),
        h_sig.to_field(),
    ]);
    Mac(fr_to_bytes(&result))
}

/// Nullifier seed of output slot `index`. `phi` is sampled once per
/// JoinSplit, so the index keeps the two outputs apart.
pub fn derive_output_rho(phi: &[u8; 32], index: usize, h_sig: &HSig) -> [u8; 32] {
    let result = poseidon::hash(&[
        Fr::from(domain::RHO),
        fr_from_bytes(phi),
        Fr::from(index as u64),
        h_sig.to_field(),
    ]);
    fr_to_bytes(&result)
}

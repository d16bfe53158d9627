//! Poseidon over BN254
//!
//! Every native hash in the note model goes through this module so that the
//! JoinSplit circuit can recompute the same values with `PoseidonSpongeVar`.
//!
//! ```text
//! Field:    BN254 Fr (254 bits)
//! Rate:     2, Capacity: 1
//! Rounds:   8 full, 57 partial, alpha = 5
//! ```

use std::sync::OnceLock;

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    CryptographicSponge,
    poseidon::{PoseidonConfig, PoseidonSponge, find_poseidon_ark_and_mds},
};
use ark_ff::{BigInt, BigInteger, PrimeField};
use ark_std::rand::RngCore;

/// Domain separation tags, absorbed as the first element of every PRF.
pub mod domain {
    /// "ADDR": paying key derivation `a_pk = PRF_addr(a_sk)`
    pub const ADDR: u64 = 0x41444452;
    /// "NULL": nullifier derivation `nf = PRF_nf(a_sk, rho)`
    pub const NULLIFIER: u64 = 0x4e554c4c;
    /// "PKAU": per-input authentication tag `mac = PRF_pk(a_sk, i, h_sig)`
    pub const MAC: u64 = 0x504b4155;
    /// "RHO_": output nullifier seed `rho = PRF_rho(phi, i, h_sig)`
    pub const RHO: u64 = 0x52484f5f;
    /// "NCMT": note commitment
    pub const COMMITMENT: u64 = 0x4e434d54;
}

static CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();

/// Shared Poseidon parameters. Round constants are derived once per process.
pub fn poseidon_config() -> &'static PoseidonConfig<Fr> {
    CONFIG.get_or_init(|| {
        let prime_bits: u64 = 254;
        let rate: usize = 2;
        let capacity: usize = 1;
        let full_rounds: u64 = 8;
        let partial_rounds: u64 = 57;
        let alpha: u64 = 5;
        let skip_matrices: u64 = 0;

        let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
            prime_bits,
            rate,
            full_rounds,
            partial_rounds,
            skip_matrices,
        );

        PoseidonConfig::new(
            full_rounds as usize,
            partial_rounds as usize,
            alpha,
            mds,
            ark,
            rate,
            capacity,
        )
    })
}

/// Absorb `inputs` in order and squeeze one element.
pub fn hash(inputs: &[Fr]) -> Fr {
    let mut sponge = PoseidonSponge::new(poseidon_config());
    for input in inputs {
        sponge.absorb(input);
    }
    sponge.squeeze_field_elements::<Fr>(1)[0]
}

/// Merkle node hash.
pub fn hash_pair(left: Fr, right: Fr) -> Fr {
    hash(&[left, right])
}

/// Canonical little-endian encoding of a field element.
pub fn fr_to_bytes(f: &Fr) -> [u8; 32] {
    let bytes = f.into_bigint().to_bytes_le();
    let mut arr = [0u8; 32];
    arr[..bytes.len()].copy_from_slice(&bytes);
    arr
}

/// Reduce arbitrary bytes into the field.
pub fn fr_from_bytes(bytes: &[u8; 32]) -> Fr {
    Fr::from_le_bytes_mod_order(bytes)
}

/// Parse a canonical encoding, rejecting values at or above the modulus.
pub fn fr_from_canonical_bytes(bytes: &[u8; 32]) -> Option<Fr> {
    let mut limbs = [0u64; 4];
    for (limb, chunk) in limbs.iter_mut().zip(bytes.chunks_exact(8)) {
        *limb = u64::from_le_bytes(chunk.try_into().ok()?);
    }
    Fr::from_bigint(BigInt(limbs))
}

/// 252 uniformly random bits, always a canonical field encoding.
pub fn random_field_bytes<R: RngCore>(rng: &mut R) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    bytes[31] &= 0x0f;
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_std::rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_hash_deterministic() {
        let a = hash(&[Fr::from(1u64), Fr::from(2u64)]);
        let b = hash(&[Fr::from(1u64), Fr::from(2u64)]);
        assert_eq!(a, b);
        assert_ne!(a, hash(&[Fr::from(2u64), Fr::from(1u64)]));
    }

    #[test]
    fn test_bytes_roundtrip() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..16 {
            let bytes = random_field_bytes(&mut rng);
            let f = fr_from_canonical_bytes(&bytes).expect("252-bit values are canonical");
            assert_eq!(fr_to_bytes(&f), bytes);
        }
    }

    #[test]
    fn test_non_canonical_rejected() {
        assert!(fr_from_canonical_bytes(&[0xff; 32]).is_none());
        assert_eq!(fr_from_canonical_bytes(&[0u8; 32]), Some(Fr::from(0u64)));
    }
}

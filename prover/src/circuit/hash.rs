use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    constraints::CryptographicSpongeVar, poseidon::constraints::PoseidonSpongeVar,
};
use ark_r1cs_std::fields::{FieldVar, fp::FpVar};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use shade_privacy::poseidon::{domain, poseidon_config};

/// Poseidon hash INSIDE the circuit. Absorbs in order, like
/// `shade_privacy::poseidon::hash`.
pub fn hash(
    cs: ConstraintSystemRef<Fr>,
    inputs: &[FpVar<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut sponge = PoseidonSpongeVar::new(cs, poseidon_config());
    for input in inputs {
        sponge.absorb(input)?;
    }
    Ok(sponge.squeeze_field_elements(1)?.remove(0))
}

/// Merkle node hash
pub fn hash2(
    cs: ConstraintSystemRef<Fr>,
    a: &FpVar<Fr>,
    b: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash(cs, &[a.clone(), b.clone()])
}

fn tag(value: u64) -> FpVar<Fr> {
    FpVar::constant(Fr::from(value))
}

pub fn prf_addr(
    cs: ConstraintSystemRef<Fr>,
    a_sk: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash(cs, &[tag(domain::ADDR), a_sk.clone()])
}

pub fn prf_nf(
    cs: ConstraintSystemRef<Fr>,
    a_sk: &FpVar<Fr>,
    rho: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash(cs, &[tag(domain::NULLIFIER), a_sk.clone(), rho.clone()])
}

pub fn prf_mac(
    cs: ConstraintSystemRef<Fr>,
    a_sk: &FpVar<Fr>,
    index: usize,
    h_sig: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash(
        cs,
        &[tag(domain::MAC), a_sk.clone(), tag(index as u64), h_sig.clone()],
    )
}

pub fn prf_rho(
    cs: ConstraintSystemRef<Fr>,
    phi: &FpVar<Fr>,
    index: usize,
    h_sig: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash(
        cs,
        &[tag(domain::RHO), phi.clone(), tag(index as u64), h_sig.clone()],
    )
}

pub fn note_commitment(
    cs: ConstraintSystemRef<Fr>,
    a_pk: &FpVar<Fr>,
    value: &FpVar<Fr>,
    rho: &FpVar<Fr>,
    r: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash(
        cs,
        &[
            tag(domain::COMMITMENT),
            a_pk.clone(),
            value.clone(),
            rho.clone(),
            r.clone(),
        ],
    )
}

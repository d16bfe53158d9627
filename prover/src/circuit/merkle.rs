use ark_bn254::Fr;
use ark_r1cs_std::{alloc::AllocVar, boolean::Boolean, fields::fp::FpVar, select::CondSelectGadget};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::circuit::hash::hash2;

/// Fold `leaf` up an authentication path and return the root.
///
/// `index[i]` is true when the running node is the right child at level `i`.
pub fn compute_root(
    cs: ConstraintSystemRef<Fr>,
    leaf: &FpVar<Fr>,
    authentication_path: &[Fr],
    index: &[bool],
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut current = leaf.clone();

    for (sibling, is_right) in authentication_path.iter().zip(index) {
        let sibling_var = FpVar::new_witness(cs.clone(), || Ok(*sibling))?;
        let is_right = Boolean::new_witness(cs.clone(), || Ok(*is_right))?;

        let left = FpVar::conditionally_select(&is_right, &sibling_var, &current)?;
        let right = FpVar::conditionally_select(&is_right, &current, &sibling_var)?;

        current = hash2(cs.clone(), &left, &right)?;
    }

    Ok(current)
}

//! JoinSplit Circuit
//!
//! ZK proof that a 2-in/2-out shielded transfer is valid:
//! 1. Each input is either zero-valued or its commitment is in the tree at `anchor`
//! 2. Each input note is owned by the witnessed spending key
//! 3. Nullifiers and authentication tags are derived from that key
//! 4. Output nullifier seeds are derived from `phi` and `h_sig`
//! 5. Output commitments are correctly formed
//! 6. Balance: sum(inputs) + value_in = sum(outputs) + value_out, all in 64 bits
//!
//! ```text
//! Public Inputs (allocation order):
//!   anchor, h_sig, nf_0, nf_1, cm_0, cm_1, mac_0, mac_1, value_in, value_out
//!
//! Private Witness:
//!   inputs[]:  a_sk, value, rho, r, authentication path
//!   outputs[]: a_pk, value, r
//!   phi
//! ```
//!
//! The constraint layout never depends on the assignment, so [`JoinSplitCircuit::blank`]
//! is a valid setup circuit.

use ark_bn254::Fr;
use ark_r1cs_std::{
    alloc::AllocVar,
    boolean::Boolean,
    eq::EqGadget,
    fields::{FieldVar, fp::FpVar},
};
use ark_relations::r1cs::{
    ConstraintSynthesizer, ConstraintSystem, ConstraintSystemRef, SynthesisError,
};
use shade_privacy::TREE_DEPTH;

use crate::circuit::{hash, merkle};
use crate::constants::{NUM_INPUTS, NUM_OUTPUTS, NUM_PUBLIC_INPUTS};

/// Values the verifier sees.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicInputs {
    pub anchor: Fr,
    pub h_sig: Fr,
    pub nullifiers: [Fr; NUM_INPUTS],
    pub commitments: [Fr; NUM_OUTPUTS],
    pub macs: [Fr; NUM_INPUTS],
    pub value_in: u64,
    pub value_out: u64,
}

impl PublicInputs {
    /// The backend's public input vector, in allocation order.
    pub fn to_field_elements(&self) -> Vec<Fr> {
        let mut out = Vec::with_capacity(NUM_PUBLIC_INPUTS);
        out.push(self.anchor);
        out.push(self.h_sig);
        out.extend_from_slice(&self.nullifiers);
        out.extend_from_slice(&self.commitments);
        out.extend_from_slice(&self.macs);
        out.push(Fr::from(self.value_in));
        out.push(Fr::from(self.value_out));
        out
    }
}

/// Private data of one input slot.
#[derive(Clone, Debug)]
pub struct InputAssignment {
    pub a_sk: Fr,
    pub value: u64,
    pub rho: Fr,
    pub r: Fr,
    /// Exactly `TREE_DEPTH` siblings, leaf first
    pub authentication_path: Vec<Fr>,
    pub index: Vec<bool>,
}

impl InputAssignment {
    fn blank() -> Self {
        Self {
            a_sk: Fr::from(0u64),
            value: 0,
            rho: Fr::from(0u64),
            r: Fr::from(0u64),
            authentication_path: vec![Fr::from(0u64); TREE_DEPTH],
            index: vec![false; TREE_DEPTH],
        }
    }
}

/// Private data of one output slot.
#[derive(Clone, Debug)]
pub struct OutputAssignment {
    pub a_pk: Fr,
    pub value: u64,
    pub r: Fr,
}

impl OutputAssignment {
    fn blank() -> Self {
        Self {
            a_pk: Fr::from(0u64),
            value: 0,
            r: Fr::from(0u64),
        }
    }
}

/// Full assignment of the JoinSplit constraint system.
#[derive(Clone, Debug)]
pub struct JoinSplitCircuit {
    pub public: PublicInputs,
    pub phi: Fr,
    pub inputs: [InputAssignment; NUM_INPUTS],
    pub outputs: [OutputAssignment; NUM_OUTPUTS],
}

impl JoinSplitCircuit {
    /// All-zero assignment used for key generation.
    pub fn blank() -> Self {
        Self {
            public: PublicInputs {
                anchor: Fr::from(0u64),
                h_sig: Fr::from(0u64),
                nullifiers: [Fr::from(0u64); NUM_INPUTS],
                commitments: [Fr::from(0u64); NUM_OUTPUTS],
                macs: [Fr::from(0u64); NUM_INPUTS],
                value_in: 0,
                value_out: 0,
            },
            phi: Fr::from(0u64),
            inputs: std::array::from_fn(|_| InputAssignment::blank()),
            outputs: std::array::from_fn(|_| OutputAssignment::blank()),
        }
    }

    /// Synthesize into a fresh constraint system and check every constraint.
    pub fn is_satisfied(&self) -> Result<bool, SynthesisError> {
        let cs = ConstraintSystem::<Fr>::new_ref();
        self.clone().generate_constraints(cs.clone())?;
        if cs.is_satisfied()? {
            return Ok(true);
        }
        if let Some(name) = cs.which_is_unsatisfied()? {
            log::debug!("first unsatisfied constraint: {}", name);
        }
        Ok(false)
    }

    fn total_in(&self) -> u64 {
        let sum = self.inputs.iter().map(|i| i.value as u128).sum::<u128>()
            + self.public.value_in as u128;
        // Out-of-range totals make the range check below unsatisfiable.
        u64::try_from(sum).unwrap_or(u64::MAX)
    }
}

/// Allocate a witness constrained to 64 bits.
fn alloc_u64(cs: &ConstraintSystemRef<Fr>, value: u64) -> Result<FpVar<Fr>, SynthesisError> {
    let mut acc = FpVar::zero();
    let mut coeff = Fr::from(1u64);
    for i in 0..64 {
        let bit = Boolean::new_witness(cs.clone(), || Ok((value >> i) & 1 == 1))?;
        acc = acc + FpVar::from(bit) * coeff;
        coeff = coeff + coeff;
    }
    Ok(acc)
}

/// Allocate a public input constrained to 64 bits.
fn alloc_u64_input(cs: &ConstraintSystemRef<Fr>, value: u64) -> Result<FpVar<Fr>, SynthesisError> {
    let input = FpVar::new_input(cs.clone(), || Ok(Fr::from(value)))?;
    alloc_u64(cs, value)?.enforce_equal(&input)?;
    Ok(input)
}

fn alloc_inputs<const N: usize>(
    cs: &ConstraintSystemRef<Fr>,
    values: &[Fr; N],
) -> Result<Vec<FpVar<Fr>>, SynthesisError> {
    values
        .iter()
        .map(|v| FpVar::new_input(cs.clone(), || Ok(*v)))
        .collect()
}

impl ConstraintSynthesizer<Fr> for JoinSplitCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let total_in = self.total_in();

        // ===== PUBLIC INPUTS =====
        let anchor = FpVar::new_input(cs.clone(), || Ok(self.public.anchor))?;
        let h_sig = FpVar::new_input(cs.clone(), || Ok(self.public.h_sig))?;
        let nullifiers = alloc_inputs(&cs, &self.public.nullifiers)?;
        let commitments = alloc_inputs(&cs, &self.public.commitments)?;
        let macs = alloc_inputs(&cs, &self.public.macs)?;
        let value_in = alloc_u64_input(&cs, self.public.value_in)?;
        let value_out = alloc_u64_input(&cs, self.public.value_out)?;

        // ===== INPUTS =====
        let mut lhs = value_in;
        for (i, input) in self.inputs.iter().enumerate() {
            let a_sk = FpVar::new_witness(cs.clone(), || Ok(input.a_sk))?;
            let rho = FpVar::new_witness(cs.clone(), || Ok(input.rho))?;
            let r = FpVar::new_witness(cs.clone(), || Ok(input.r))?;
            let value = alloc_u64(&cs, input.value)?;

            let a_pk = hash::prf_addr(cs.clone(), &a_sk)?;
            let cm = hash::note_commitment(cs.clone(), &a_pk, &value, &rho, &r)?;

            // Zero-valued inputs are exempt from membership.
            let root = merkle::compute_root(
                cs.clone(),
                &cm,
                &input.authentication_path,
                &input.index,
            )?;
            (&root - &anchor).mul_equals(&value, &FpVar::zero())?;

            hash::prf_nf(cs.clone(), &a_sk, &rho)?.enforce_equal(&nullifiers[i])?;
            hash::prf_mac(cs.clone(), &a_sk, i, &h_sig)?.enforce_equal(&macs[i])?;

            lhs = lhs + &value;
        }

        // ===== OUTPUTS =====
        let phi = FpVar::new_witness(cs.clone(), || Ok(self.phi))?;
        let mut rhs = value_out;
        for (i, output) in self.outputs.iter().enumerate() {
            let a_pk = FpVar::new_witness(cs.clone(), || Ok(output.a_pk))?;
            let r = FpVar::new_witness(cs.clone(), || Ok(output.r))?;
            let value = alloc_u64(&cs, output.value)?;

            let rho = hash::prf_rho(cs.clone(), &phi, i, &h_sig)?;
            hash::note_commitment(cs.clone(), &a_pk, &value, &rho, &r)?
                .enforce_equal(&commitments[i])?;

            rhs = rhs + &value;
        }

        // ===== BALANCE =====
        lhs.enforce_equal(&rhs)?;
        alloc_u64(&cs, total_in)?.enforce_equal(&lhs)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_input_order() {
        let mut circuit = JoinSplitCircuit::blank();
        circuit.public.anchor = Fr::from(1u64);
        circuit.public.h_sig = Fr::from(2u64);
        circuit.public.nullifiers = [Fr::from(3u64), Fr::from(4u64)];
        circuit.public.commitments = [Fr::from(5u64), Fr::from(6u64)];
        circuit.public.macs = [Fr::from(7u64), Fr::from(8u64)];
        circuit.public.value_in = 9;
        circuit.public.value_out = 10;

        let expected: Vec<Fr> = (1..=10u64).map(Fr::from).collect();
        assert_eq!(circuit.public.to_field_elements(), expected);
    }

    #[test]
    fn test_blank_circuit_shape() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        JoinSplitCircuit::blank()
            .generate_constraints(cs.clone())
            .unwrap();
        // +1 for the constant "one" variable
        assert_eq!(cs.num_instance_variables(), NUM_PUBLIC_INPUTS + 1);
        assert!(cs.num_constraints() > 0);
    }

    #[test]
    fn test_blank_circuit_unsatisfied() {
        // Zero public nullifiers cannot match a Poseidon output.
        assert!(!JoinSplitCircuit::blank().is_satisfied().unwrap());
    }
}

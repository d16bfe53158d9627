//! Prepared witness: one complete assignment of the JoinSplit circuit.
//!
//! Every backend consumes the same assignment, so switching from the mock
//! backend to Groth16 never touches witness construction.

use ark_bn254::Fr;

use crate::circuit::{JoinSplitCircuit, PublicInputs};
use crate::error::{JoinSplitError, Result};

#[derive(Clone, Debug)]
pub struct PreparedWitness {
    pub(crate) circuit: JoinSplitCircuit,
}

impl PreparedWitness {
    pub fn new(circuit: JoinSplitCircuit) -> Self {
        Self { circuit }
    }

    pub fn public_inputs(&self) -> &PublicInputs {
        &self.circuit.public
    }

    /// Public inputs in the order the verifier expects them.
    pub fn public_field_elements(&self) -> Vec<Fr> {
        self.circuit.public.to_field_elements()
    }

    pub fn circuit(&self) -> &JoinSplitCircuit {
        &self.circuit
    }

    /// Run the constraint system over this assignment.
    pub fn is_satisfied(&self) -> Result<bool> {
        self.circuit
            .is_satisfied()
            .map_err(|e| JoinSplitError::Synthesis(e.to_string()))
    }
}

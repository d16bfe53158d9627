//! Shade JoinSplit Prover
//!
//! Circuit, proving backends and key lifecycle for 2-in/2-out shielded
//! transfers.
//!
//! ```text
//! JoinSplit::generate::<B>() / JoinSplit::from_config(..)
//!        │
//!        ├── prepare(inputs, outputs, anchor, pubkey_hash, ..) ──► PreparedJoinSplit
//!        ├── prove(&prepared.witness)                          ──► Proof
//!        └── verify(&JSDescription, pubkey_hash)               ──► bool
//! ```

pub mod backend;
pub mod circuit;
pub mod constants;
pub mod description;
pub mod error;
pub mod joinsplit;
pub mod params;
pub mod witness;

pub use backend::{Backend, Groth16Backend, MockBackend, Proof, ProofBackend};
pub use circuit::{JoinSplitCircuit, PublicInputs};
pub use constants::{JS_DESCRIPTION_SIZE, NUM_INPUTS, NUM_OUTPUTS, NUM_PUBLIC_INPUTS, PROOF_SIZE};
pub use description::JSDescription;
pub use error::{JoinSplitError, KeyKind, ProtocolError, Result};
pub use joinsplit::{JSInput, JSOutput, JoinSplit, PreparedJoinSplit};
pub use params::initialize;
pub use witness::PreparedWitness;

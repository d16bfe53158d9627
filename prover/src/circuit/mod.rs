pub mod hash;
pub mod joinsplit;
pub mod merkle;

pub use joinsplit::{InputAssignment, JoinSplitCircuit, OutputAssignment, PublicInputs};

use shade_privacy::NOTE_CIPHERTEXT_SIZE;

/// Input slots per JoinSplit. Unused slots carry dummy notes.
pub const NUM_INPUTS: usize = 2;

/// Output slots per JoinSplit. Unused slots carry zero-valued notes.
pub const NUM_OUTPUTS: usize = 2;

/// Compressed Groth16 proof over BN254: A (G1, 32) | B (G2, 64) | C (G1, 32).
pub const PROOF_SIZE: usize = 128;

/// Public inputs in circuit allocation order:
/// anchor, h_sig, nf[2], cm[2], mac[2], value_in, value_out.
pub const NUM_PUBLIC_INPUTS: usize = 2 + NUM_INPUTS * 2 + NUM_OUTPUTS + 2;

/// Serialized `JSDescription` length.
pub const JS_DESCRIPTION_SIZE: usize =
    32 + 32 * NUM_INPUTS + 32 * NUM_OUTPUTS + 32 + 32 + 32 * NUM_INPUTS + PROOF_SIZE
        + NOTE_CIPHERTEXT_SIZE * NUM_OUTPUTS
        + 8
        + 8;

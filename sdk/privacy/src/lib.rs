//! Shade Privacy SDK
//!
//! Note model, commitment accumulator and note encryption underneath the
//! JoinSplit protocol.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        JoinSplit                                │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐ │
//! │  │  Nullifiers  │  │ Commitments  │  │   Note ciphertexts    │ │
//! │  │  (spent)     │  │  (new notes) │  │   (for recipients)    │ │
//! │  └──────────────┘  └──────────────┘  └───────────────────────┘ │
//! │         │                 │                     │               │
//! │     PRF_nf(a_sk,rho)  Poseidon(note)     X25519 + ChaCha20      │
//! │         │                 │                keyed by h_sig       │
//! │         ▼                 ▼                                     │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │        Incremental Merkle tree (anchors, witnesses)      │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod commitment;
pub mod encryption;
pub mod error;
pub mod merkle;
pub mod note;
pub mod nullifier;
pub mod poseidon;
pub mod prf;

pub use commitment::{Commitment, derive_commitment};
pub use encryption::{
    MEMO_SIZE, Memo, NOTE_CIPHERTEXT_SIZE, NOTE_PLAINTEXT_SIZE, NoteCiphertext, NoteDecryptor,
    NoteEncryptor, NotePlaintext, decrypt_note, try_decrypt_note,
};
pub use error::PrivacyError;
pub use merkle::{
    Anchor, CommitmentTree, CommitmentWitness, IncrementalMerkleTree, IncrementalWitness,
    MerklePath, RootHistory, TREE_DEPTH, empty_root,
};
pub use note::{Note, NoteValue, PaymentAddress, ShieldedKeyBundle, SpendingKey, ViewingKey};
pub use nullifier::{Nullifier, derive_nullifier};
pub use prf::{HSig, Mac, derive_output_rho, prf_addr, prf_mac};

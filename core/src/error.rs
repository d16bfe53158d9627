use shade_privacy::{Anchor, Nullifier, PrivacyError};
use thiserror::Error;

/// Why a set of JoinSplits cannot enter the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("unknown anchor {}", hex::encode(.0.as_bytes()))]
    UnknownAnchor(Anchor),

    #[error("nullifier {} is already spent", hex::encode(.0.as_bytes()))]
    NullifierSpent(Nullifier),

    #[error("nullifier {} appears twice", hex::encode(.0.as_bytes()))]
    DuplicateNullifier(Nullifier),

    #[error("commitment tree: {0}")]
    Tree(#[from] PrivacyError),

    #[error("ledger storage: {0:#}")]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

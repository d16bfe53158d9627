//! Ledger binding interface.
//!
//! The JoinSplit engine never touches storage directly. Block assembly reads
//! anchors and nullifiers through [`LedgerView`] and writes back a
//! [`LedgerChanges`] set in one atomic `commit`.

use std::collections::HashMap;

use anyhow::Result;
use shade_privacy::{Anchor, CommitmentTree, Nullifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullifierStatus {
    Spent,
    Unspent,
}

/// A pending anchor. `entered == false` rolls the anchor back out.
#[derive(Debug, Clone)]
pub struct AnchorEntry {
    pub tree: CommitmentTree,
    pub entered: bool,
}

/// A pending nullifier. `entered == false` marks it unspent again.
#[derive(Debug, Clone, Copy)]
pub struct NullifierEntry {
    pub entered: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LedgerChanges {
    pub anchors: HashMap<Anchor, AnchorEntry>,
    pub nullifiers: HashMap<Nullifier, NullifierEntry>,
    pub best_anchor: Option<Anchor>,
}

impl LedgerChanges {
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty() && self.nullifiers.is_empty() && self.best_anchor.is_none()
    }
}

/// decoupling block assembly from the db
pub trait LedgerView: Send + Sync {
    /// Tree snapshot at `anchor`. The empty root always resolves.
    fn get_anchor_snapshot(&self, anchor: &Anchor) -> Result<Option<CommitmentTree>>;

    fn get_nullifier_status(&self, nullifier: &Nullifier) -> Result<NullifierStatus>;

    fn current_best_anchor(&self) -> Result<Anchor>;

    /// Apply `changes` atomically with respect to readers.
    fn commit(&self, changes: LedgerChanges) -> Result<()>;
}

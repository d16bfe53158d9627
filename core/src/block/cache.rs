//! Ledger cache and JoinSplit admission.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ LedgerCache (pending changes)                                │
//! │   push_anchor / pop_anchor / set_nullifier                   │
//! │        │                                                     │
//! │        ▼ reads fall through                                  │
//! │ LedgerView (MemoryLedger | RocksLedger)                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! `flush` hands the whole pending set to `LedgerView::commit` at once, so a
//! block either enters completely or not at all.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use shade_privacy::{Anchor, CommitmentTree, Nullifier};
use shade_prover::JSDescription;

use crate::error::{LedgerError, Result};
use crate::storage::{AnchorEntry, LedgerChanges, LedgerView, NullifierEntry, NullifierStatus};

pub struct LedgerCache<'a> {
    base: &'a dyn LedgerView,
    pending: LedgerChanges,
    best_anchor: Anchor,
}

impl<'a> LedgerCache<'a> {
    pub fn new(base: &'a dyn LedgerView) -> Result<Self> {
        let best_anchor = base.current_best_anchor()?;
        Ok(Self {
            base,
            pending: LedgerChanges::default(),
            best_anchor,
        })
    }

    pub fn get_anchor_snapshot(&self, anchor: &Anchor) -> Result<Option<CommitmentTree>> {
        match self.pending.anchors.get(anchor) {
            Some(entry) if entry.entered => Ok(Some(entry.tree.clone())),
            Some(_) => Ok(None),
            None => Ok(self.base.get_anchor_snapshot(anchor)?),
        }
    }

    pub fn get_nullifier_status(&self, nullifier: &Nullifier) -> Result<NullifierStatus> {
        match self.pending.nullifiers.get(nullifier) {
            Some(entry) if entry.entered => Ok(NullifierStatus::Spent),
            Some(_) => Ok(NullifierStatus::Unspent),
            None => Ok(self.base.get_nullifier_status(nullifier)?),
        }
    }

    pub fn current_best_anchor(&self) -> Anchor {
        self.best_anchor
    }

    /// Make `tree` the best tree.
    pub fn push_anchor(&mut self, tree: CommitmentTree) {
        let anchor = tree.current_root();
        self.pending.anchors.insert(
            anchor,
            AnchorEntry {
                tree,
                entered: true,
            },
        );
        self.best_anchor = anchor;
    }

    /// Undo the latest `push_anchor`, making `previous` the best anchor.
    pub fn pop_anchor(&mut self, previous: Anchor) -> Result<()> {
        let current = self.best_anchor;
        if current == previous {
            return Ok(());
        }
        // The empty root is implicit and never stored.
        if current != Anchor::empty() {
            let tree = self
                .get_anchor_snapshot(&current)?
                .ok_or(LedgerError::UnknownAnchor(current))?;
            self.pending.anchors.insert(
                current,
                AnchorEntry {
                    tree,
                    entered: false,
                },
            );
        }
        self.best_anchor = previous;
        Ok(())
    }

    pub fn set_nullifier(&mut self, nullifier: Nullifier, spent: bool) {
        self.pending
            .nullifiers
            .insert(nullifier, NullifierEntry { entered: spent });
    }

    /// Check that `descriptions` could enter the ledger in order.
    ///
    /// Anchors may name trees produced by earlier descriptions of the same
    /// batch. Nothing is modified.
    pub fn have_joinsplit_requirements(&self, descriptions: &[JSDescription]) -> Result<()> {
        let mut seen = HashSet::new();
        let mut intermediates: HashMap<Anchor, CommitmentTree> = HashMap::new();

        for desc in descriptions {
            for nf in &desc.nullifiers {
                if !seen.insert(*nf) {
                    return Err(LedgerError::DuplicateNullifier(*nf));
                }
                if self.get_nullifier_status(nf)? == NullifierStatus::Spent {
                    return Err(LedgerError::NullifierSpent(*nf));
                }
            }

            let mut tree = match intermediates.get(&desc.anchor) {
                Some(tree) => tree.clone(),
                None => self
                    .get_anchor_snapshot(&desc.anchor)?
                    .ok_or(LedgerError::UnknownAnchor(desc.anchor))?,
            };
            for cm in &desc.commitments {
                tree.append(*cm)?;
            }
            intermediates.insert(tree.current_root(), tree);
        }
        Ok(())
    }

    /// Check `descriptions`, then spend their nullifiers and append their
    /// commitments to the best tree. Returns the new best anchor.
    pub fn admit_joinsplits(&mut self, descriptions: &[JSDescription]) -> Result<Anchor> {
        if let Err(e) = self.have_joinsplit_requirements(descriptions) {
            warn!("Rejected {} joinsplits: {}", descriptions.len(), e);
            return Err(e);
        }

        let best = self.best_anchor;
        let mut tree = self
            .get_anchor_snapshot(&best)?
            .ok_or(LedgerError::UnknownAnchor(best))?;

        for cm in descriptions.iter().flat_map(|desc| &desc.commitments) {
            tree.append(*cm)?;
        }
        for nf in descriptions.iter().flat_map(|desc| &desc.nullifiers) {
            self.set_nullifier(*nf, true);
        }

        if !descriptions.is_empty() {
            self.push_anchor(tree);
        }
        debug!(
            "Admitted {} joinsplits, best anchor {}",
            descriptions.len(),
            hex::encode(self.best_anchor.as_bytes())
        );
        Ok(self.best_anchor)
    }

    /// Write every pending change to the base ledger in one commit.
    pub fn flush(mut self) -> Result<()> {
        self.pending.best_anchor = Some(self.best_anchor);
        self.base.commit(self.pending)?;
        Ok(())
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Result, anyhow};
use log::{debug, info};
use shade_privacy::{Anchor, CommitmentTree, Nullifier, RootHistory};

use crate::storage::state::{LedgerChanges, LedgerView, NullifierStatus};

struct MemoryState {
    anchors: HashMap<Anchor, CommitmentTree>,
    history: RootHistory,
    nullifiers: HashSet<Nullifier>,
    best_anchor: Anchor,
}

impl MemoryState {
    /// Record `anchor` as the newest root and drop whatever falls out of
    /// the window, except `keep`.
    fn remember(&mut self, anchor: Anchor, keep: Anchor) {
        if let Some(evicted) = self.history.push(anchor) {
            if evicted != keep {
                debug!("Evicting anchor {}", hex::encode(evicted.as_bytes()));
                self.anchors.remove(&evicted);
            }
        }
    }
}

/// In-process ledger. Keeps the most recent `anchor_history` anchors; older
/// ones are evicted as new ones arrive.
pub struct MemoryLedger {
    state: RwLock<MemoryState>,
}

impl MemoryLedger {
    pub fn new(anchor_history: usize) -> Self {
        Self {
            state: RwLock::new(MemoryState {
                anchors: HashMap::new(),
                history: RootHistory::new(anchor_history),
                nullifiers: HashSet::new(),
                best_anchor: Anchor::empty(),
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| anyhow!("memory ledger lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| anyhow!("memory ledger lock poisoned"))
    }

    pub fn anchor_count(&self) -> Result<usize> {
        Ok(self.read()?.anchors.len())
    }
}

impl LedgerView for MemoryLedger {
    fn get_anchor_snapshot(&self, anchor: &Anchor) -> Result<Option<CommitmentTree>> {
        if *anchor == Anchor::empty() {
            return Ok(Some(CommitmentTree::new()));
        }
        Ok(self.read()?.anchors.get(anchor).cloned())
    }

    fn get_nullifier_status(&self, nullifier: &Nullifier) -> Result<NullifierStatus> {
        Ok(if self.read()?.nullifiers.contains(nullifier) {
            NullifierStatus::Spent
        } else {
            NullifierStatus::Unspent
        })
    }

    fn current_best_anchor(&self) -> Result<Anchor> {
        Ok(self.read()?.best_anchor)
    }

    fn commit(&self, changes: LedgerChanges) -> Result<()> {
        let LedgerChanges {
            anchors,
            nullifiers,
            best_anchor,
        } = changes;
        let mut state = self.write()?;
        let best = best_anchor.unwrap_or(state.best_anchor);

        let (mut entered, rolled_back): (Vec<_>, Vec<_>) =
            anchors.into_iter().partition(|(_, entry)| entry.entered);
        let removed = rolled_back.len();
        for (anchor, _) in rolled_back {
            state.history.remove(&anchor);
            state.anchors.remove(&anchor);
        }

        // Trees only grow, so size orders the anchors of one batch. The best
        // anchor goes last so it is the newest entry in the history.
        entered.sort_by_key(|(anchor, entry)| (*anchor == best, entry.tree.size()));
        let added = entered.len();
        for (anchor, entry) in entered {
            state.anchors.insert(anchor, entry.tree);
            state.remember(anchor, best);
        }
        // An unchanged best anchor may have been pushed out by this batch.
        if state.anchors.contains_key(&best) && !state.history.is_valid(&best) {
            state.remember(best, best);
        }

        for (nullifier, entry) in nullifiers {
            if entry.entered {
                state.nullifiers.insert(nullifier);
            } else {
                state.nullifiers.remove(&nullifier);
            }
        }

        state.best_anchor = best;

        info!(
            "Committed ledger changes: +{} anchors, -{} anchors, best {}",
            added,
            removed,
            hex::encode(state.best_anchor.as_bytes())
        );
        Ok(())
    }
}

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, bail};
use rand::rngs::OsRng;
use shade_core::{LedgerChanges, LedgerView, MemoryLedger, NullifierStatus};
use shade_privacy::{
    Anchor, CommitmentTree, CommitmentWitness, Note, PaymentAddress, ShieldedKeyBundle, TREE_DEPTH,
};
use shade_prover::{JSDescription, JSInput, JSOutput, JoinSplit, MockBackend};

pub const PUBKEY_HASH: [u8; 32] = [0x17; 32];

pub fn mock_params() -> JoinSplit {
    JoinSplit::generate::<MockBackend>().unwrap()
}

/// Shield `value` to `addr` against the empty anchor.
pub fn shield(params: &JoinSplit, addr: PaymentAddress, value: u64) -> (JSDescription, Note) {
    let inputs = [
        JSInput::dummy(&mut OsRng).unwrap(),
        JSInput::dummy(&mut OsRng).unwrap(),
    ];
    let outputs = [JSOutput::new(addr, value), JSOutput::dummy(&mut OsRng)];
    let (desc, [note, _]) = JSDescription::new(
        params,
        &PUBKEY_HASH,
        &Anchor::empty(),
        &inputs,
        &outputs,
        value,
        0,
        &mut OsRng,
    )
    .unwrap();
    (desc, note)
}

/// Spend `note` entirely to `to`.
pub fn spend(
    params: &JoinSplit,
    owner: &ShieldedKeyBundle,
    witness: CommitmentWitness,
    note: Note,
    to: PaymentAddress,
) -> JSDescription {
    let anchor = witness.root();
    let value = note.value.as_u64();
    let inputs = [
        JSInput::new(witness, note, owner.spending_key.clone()),
        JSInput::dummy(&mut OsRng).unwrap(),
    ];
    let outputs = [JSOutput::new(to, value), JSOutput::dummy(&mut OsRng)];
    let (desc, _) = JSDescription::new(
        params,
        &PUBKEY_HASH,
        &anchor,
        &inputs,
        &outputs,
        0,
        0,
        &mut OsRng,
    )
    .unwrap();
    desc
}

/// Append both output commitments of `desc`, returning a witness for
/// output `index`.
pub fn append_outputs(
    tree: &mut CommitmentTree,
    desc: &JSDescription,
    index: usize,
) -> CommitmentWitness {
    let mut witness: Option<CommitmentWitness> = None;
    for (i, cm) in desc.commitments.iter().enumerate() {
        tree.append(*cm).unwrap();
        if let Some(w) = witness.as_mut() {
            w.advance(*cm).unwrap();
        }
        if i == index {
            witness = Some(tree.witness().unwrap());
        }
    }
    witness.unwrap()
}

/// Ledger double that fails on demand.
pub struct FaultyLedger {
    pub inner: MemoryLedger,
    pub fail_reads: AtomicBool,
    pub fail_commits: AtomicBool,
}

impl FaultyLedger {
    pub fn new() -> Self {
        Self {
            inner: MemoryLedger::new(16),
            fail_reads: AtomicBool::new(false),
            fail_commits: AtomicBool::new(false),
        }
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("injected read failure");
        }
        Ok(())
    }
}

impl LedgerView for FaultyLedger {
    fn get_anchor_snapshot(&self, anchor: &Anchor) -> Result<Option<CommitmentTree>> {
        self.check_read()?;
        self.inner.get_anchor_snapshot(anchor)
    }

    fn get_nullifier_status(
        &self,
        nullifier: &shade_privacy::Nullifier,
    ) -> Result<NullifierStatus> {
        self.check_read()?;
        self.inner.get_nullifier_status(nullifier)
    }

    fn current_best_anchor(&self) -> Result<Anchor> {
        self.check_read()?;
        self.inner.current_best_anchor()
    }

    fn commit(&self, changes: LedgerChanges) -> Result<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            bail!("injected commit failure");
        }
        self.inner.commit(changes)
    }
}

/// A depth-`TREE_DEPTH` tree with every leaf slot taken.
pub fn saturated_tree() -> CommitmentTree {
    let node = Some([7u8; 32]);
    let frontier = (node, node, vec![node; TREE_DEPTH - 1]);
    bincode::deserialize(&bincode::serialize(&frontier).unwrap()).unwrap()
}

#![allow(dead_code)]

use rand::rngs::OsRng;
use shade_privacy::{Anchor, CommitmentTree, CommitmentWitness, Note, PaymentAddress};
use shade_prover::{JSDescription, JSInput, JSOutput, JoinSplit, MockBackend};

pub const PUBKEY_HASH: [u8; 32] = [0x42; 32];

pub fn mock_params() -> JoinSplit {
    JoinSplit::generate::<MockBackend>().unwrap()
}

pub fn dummy_inputs() -> [JSInput; 2] {
    [
        JSInput::dummy(&mut OsRng).unwrap(),
        JSInput::dummy(&mut OsRng).unwrap(),
    ]
}

/// Shield `value` into a note for `addr` with public input only.
pub fn shield(params: &JoinSplit, addr: PaymentAddress, value: u64) -> (JSDescription, Note) {
    let outputs = [JSOutput::new(addr, value), JSOutput::dummy(&mut OsRng)];
    let (desc, notes) = JSDescription::new(
        params,
        &PUBKEY_HASH,
        &Anchor::empty(),
        &dummy_inputs(),
        &outputs,
        value,
        0,
        &mut OsRng,
    )
    .unwrap();
    let [note, _] = notes;
    (desc, note)
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

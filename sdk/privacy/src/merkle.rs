//! Incremental Merkle Tree for Note Commitments
//!
//! An append-only frontier tree: it stores only the rightmost path (`left`,
//! `right` and one optional node per level above them), which is enough to
//! compute the root in O(depth) and to append in amortized O(1).
//!
//! ```text
//!                    Root
//!                   /    \
//!           parents[1]    .
//!              /    \
//!      parents[0]    .
//!        /    \
//!     (..)    (left, right)   <- most recent leaves
//! ```
//!
//! An [`IncrementalWitness`] snapshots the tree at the moment its leaf was
//! appended and then follows every later append, keeping only the roots of
//! completed subtrees to the right of the leaf (`filled`) plus one partial
//! subtree under construction (`cursor`).

use std::collections::VecDeque;
use std::sync::OnceLock;

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

use crate::commitment::Commitment;
use crate::error::{PrivacyError, Result};
use crate::poseidon::{fr_from_bytes, fr_to_bytes, hash_pair};

/// Depth of the protocol commitment tree (2^29 notes).
pub const TREE_DEPTH: usize = 29;

/// Deepest tree this module supports.
pub const MAX_DEPTH: usize = 32;

/// The commitment tree every JoinSplit is anchored in.
pub type CommitmentTree = IncrementalMerkleTree<TREE_DEPTH>;

/// Witness into a [`CommitmentTree`].
pub type CommitmentWitness = IncrementalWitness<TREE_DEPTH>;

type Node = [u8; 32];

fn combine(left: &Node, right: &Node) -> Node {
    fr_to_bytes(&hash_pair(fr_from_bytes(left), fr_from_bytes(right)))
}

static EMPTY_ROOTS: OnceLock<Vec<Node>> = OnceLock::new();

fn empty_roots() -> &'static [Node] {
    EMPTY_ROOTS.get_or_init(|| {
        // The empty leaf is the zero field element.
        let mut roots = vec![[0u8; 32]];
        for depth in 0..MAX_DEPTH {
            let prev = roots[depth];
            roots.push(combine(&prev, &prev));
        }
        roots
    })
}

/// Root of an empty subtree of the given height.
pub fn empty_root(depth: usize) -> Anchor {
    Anchor(empty_roots()[depth])
}

/// A commitment tree root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Anchor(pub [u8; 32]);

impl Anchor {
    /// Root of the empty protocol tree. Always a valid anchor.
    pub fn empty() -> Self {
        empty_root(TREE_DEPTH)
    }

    pub fn from_field(f: Fr) -> Self {
        Self(fr_to_bytes(&f))
    }

    pub fn to_field(&self) -> Fr {
        fr_from_bytes(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl AsRef<[u8]> for Anchor {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A Merkle path proving inclusion of a leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    /// Sibling hashes from leaf to root
    pub authentication_path: Vec<[u8; 32]>,
    /// Position bits from leaf to root (true = current node is the right child)
    pub index: Vec<bool>,
}

impl MerklePath {
    /// Fold `leaf` up the path.
    pub fn root(&self, leaf: &Commitment) -> Anchor {
        let mut current = leaf.0;
        for (sibling, is_right) in self.authentication_path.iter().zip(&self.index) {
            current = if *is_right {
                combine(sibling, &current)
            } else {
                combine(&current, sibling)
            };
        }
        Anchor(current)
    }

    /// Verify that this path proves inclusion of `leaf` under `anchor`
    pub fn verify(&self, leaf: &Commitment, anchor: &Anchor) -> bool {
        &self.root(leaf) == anchor
    }

    /// Leaf position encoded by the index bits.
    pub fn position(&self) -> u64 {
        self.index
            .iter()
            .enumerate()
            .filter(|(_, bit)| **bit)
            .fold(0u64, |acc, (level, _)| acc | (1u64 << level))
    }

    /// Get the authentication path as field elements (for ZK circuits)
    pub fn to_field_elements(&self) -> Vec<Fr> {
        self.authentication_path.iter().map(fr_from_bytes).collect()
    }
}

/// Supplies the right-hand siblings that are not part of the frontier:
/// first whatever a witness recorded, then empty subtree roots.
struct PathFiller {
    queue: VecDeque<Node>,
}

impl PathFiller {
    fn empty() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    fn new(queue: VecDeque<Node>) -> Self {
        Self { queue }
    }

    fn next(&mut self, depth: usize) -> Node {
        self.queue
            .pop_front()
            .unwrap_or_else(|| empty_roots()[depth])
    }
}

/// Append-only commitment tree of fixed depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementalMerkleTree<const DEPTH: usize> {
    left: Option<Node>,
    right: Option<Node>,
    parents: Vec<Option<Node>>,
}

impl<const DEPTH: usize> Default for IncrementalMerkleTree<DEPTH> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const DEPTH: usize> IncrementalMerkleTree<DEPTH> {
    const VALID_DEPTH: () = assert!(DEPTH >= 1 && DEPTH <= MAX_DEPTH);

    /// Create a new empty tree
    pub fn new() -> Self {
        let () = Self::VALID_DEPTH;
        Self {
            left: None,
            right: None,
            parents: Vec::new(),
        }
    }

    /// Root of the empty tree of this depth.
    pub fn empty_root() -> Anchor {
        empty_root(DEPTH)
    }

    /// Maximum number of leaves.
    pub fn capacity() -> u64 {
        1u64 << DEPTH
    }

    /// Number of leaves appended so far.
    pub fn size(&self) -> u64 {
        let mut size = self.left.is_some() as u64 + self.right.is_some() as u64;
        for (level, parent) in self.parents.iter().enumerate() {
            if parent.is_some() {
                size += 1u64 << (level + 1);
            }
        }
        size
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_none()
    }

    /// Most recently appended leaf.
    pub fn last(&self) -> Option<Commitment> {
        self.right.or(self.left).map(Commitment)
    }

    /// Append a commitment at the next free position.
    pub fn append(&mut self, commitment: Commitment) -> Result<()> {
        if self.is_complete(DEPTH) {
            return Err(PrivacyError::CapacityExceeded {
                capacity: Self::capacity(),
            });
        }
        self.append_unchecked(commitment.0);
        Ok(())
    }

    fn append_unchecked(&mut self, leaf: Node) {
        let (Some(left), Some(right)) = (self.left, self.right) else {
            if self.left.is_none() {
                self.left = Some(leaf);
            } else {
                self.right = Some(leaf);
            }
            return;
        };

        // Both leaves are occupied: carry their hash up the frontier.
        let mut combined = combine(&left, &right);
        self.left = Some(leaf);
        self.right = None;

        for parent in self.parents.iter_mut() {
            match parent.take() {
                Some(node) => combined = combine(&node, &combined),
                None => {
                    *parent = Some(combined);
                    return;
                }
            }
        }
        self.parents.push(Some(combined));
    }

    /// Root of the tree as it stands.
    pub fn current_root(&self) -> Anchor {
        Anchor(self.root_with(DEPTH, PathFiller::empty()))
    }

    /// Witness for the most recently appended leaf.
    pub fn witness(&self) -> Result<IncrementalWitness<DEPTH>> {
        if self.is_empty() {
            return Err(PrivacyError::EmptyTree);
        }
        Ok(IncrementalWitness::new(self.clone()))
    }

    /// Witness for the leaf at `position`. A frontier tree only knows the
    /// path of its latest leaf; earlier leaves must have been witnessed when
    /// they were appended.
    pub fn witness_for(&self, position: u64) -> Result<IncrementalWitness<DEPTH>> {
        let latest = self.size().checked_sub(1);
        if latest != Some(position) {
            return Err(PrivacyError::UntrackedPosition { position, latest });
        }
        self.witness()
    }

    fn is_complete(&self, depth: usize) -> bool {
        self.left.is_some()
            && self.right.is_some()
            && self.parents.len() == depth - 1
            && self.parents.iter().all(Option::is_some)
    }

    /// Height of the next empty subtree slot, skipping `skip` of them.
    fn next_depth(&self, mut skip: usize) -> usize {
        if self.left.is_none() {
            if skip == 0 {
                return 0;
            }
            skip -= 1;
        }
        if self.right.is_none() {
            if skip == 0 {
                return 0;
            }
            skip -= 1;
        }

        let mut depth = 1;
        for parent in &self.parents {
            if parent.is_none() {
                if skip == 0 {
                    return depth;
                }
                skip -= 1;
            }
            depth += 1;
        }
        depth + skip
    }

    fn root_with(&self, depth: usize, mut filler: PathFiller) -> Node {
        let left = self.left.unwrap_or_else(|| filler.next(0));
        let right = self.right.unwrap_or_else(|| filler.next(0));
        let mut root = combine(&left, &right);

        let mut d = 1;
        for parent in &self.parents {
            root = match parent {
                Some(node) => combine(node, &root),
                None => combine(&root, &filler.next(d)),
            };
            d += 1;
        }
        while d < depth {
            root = combine(&root, &filler.next(d));
            d += 1;
        }
        root
    }

    fn path_with(&self, mut filler: PathFiller) -> Result<MerklePath> {
        let left = self.left.ok_or(PrivacyError::EmptyTree)?;

        let mut authentication_path = Vec::with_capacity(DEPTH);
        let mut index = Vec::with_capacity(DEPTH);

        if self.right.is_some() {
            index.push(true);
            authentication_path.push(left);
        } else {
            index.push(false);
            authentication_path.push(filler.next(0));
        }

        let mut d = 1;
        for parent in &self.parents {
            match parent {
                Some(node) => {
                    index.push(true);
                    authentication_path.push(*node);
                }
                None => {
                    index.push(false);
                    authentication_path.push(filler.next(d));
                }
            }
            d += 1;
        }
        while d < DEPTH {
            index.push(false);
            authentication_path.push(filler.next(d));
            d += 1;
        }

        Ok(MerklePath {
            authentication_path,
            index,
        })
    }
}

/// Updatable membership witness for one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementalWitness<const DEPTH: usize> {
    tree: IncrementalMerkleTree<DEPTH>,
    filled: Vec<Node>,
    cursor: Option<IncrementalMerkleTree<DEPTH>>,
    cursor_depth: usize,
}

impl<const DEPTH: usize> IncrementalWitness<DEPTH> {
    fn new(tree: IncrementalMerkleTree<DEPTH>) -> Self {
        Self {
            tree,
            filled: Vec::new(),
            cursor: None,
            cursor_depth: 0,
        }
    }

    /// Position of the witnessed leaf.
    pub fn position(&self) -> u64 {
        self.tree.size() - 1
    }

    /// The witnessed leaf.
    pub fn element(&self) -> Commitment {
        // A witness is only ever built from a non-empty tree.
        self.tree.last().unwrap_or(Commitment([0u8; 32]))
    }

    /// Root of the tree this witness currently tracks.
    pub fn root(&self) -> Anchor {
        Anchor(self.tree.root_with(DEPTH, self.filler()))
    }

    /// Authentication path of the leaf under [`Self::root`].
    pub fn path(&self) -> Result<MerklePath> {
        self.tree.path_with(self.filler())
    }

    /// Follow one append to the underlying tree.
    pub fn advance(&mut self, commitment: Commitment) -> Result<()> {
        if let Some(cursor) = self.cursor.as_mut() {
            cursor.append_unchecked(commitment.0);
            if cursor.is_complete(self.cursor_depth) {
                self.filled
                    .push(cursor.root_with(self.cursor_depth, PathFiller::empty()));
                self.cursor = None;
            }
            return Ok(());
        }

        self.cursor_depth = self.tree.next_depth(self.filled.len());
        if self.cursor_depth >= DEPTH {
            return Err(PrivacyError::CapacityExceeded {
                capacity: IncrementalMerkleTree::<DEPTH>::capacity(),
            });
        }

        if self.cursor_depth == 0 {
            self.filled.push(commitment.0);
        } else {
            let mut cursor = IncrementalMerkleTree::new();
            cursor.append_unchecked(commitment.0);
            self.cursor = Some(cursor);
        }
        Ok(())
    }

    fn filler(&self) -> PathFiller {
        let mut queue: VecDeque<Node> = self.filled.iter().copied().collect();
        if let Some(cursor) = &self.cursor {
            queue.push_back(cursor.root_with(self.cursor_depth, PathFiller::empty()));
        }
        PathFiller::new(queue)
    }
}

/// Root history
///
/// Stores recent anchors so that transactions may reference slightly stale
/// tree states.
#[derive(Debug, Default)]
pub struct RootHistory {
    /// Recent roots (most recent first)
    roots: VecDeque<Anchor>,
    /// Maximum history size
    max_size: usize,
}

impl RootHistory {
    pub fn new(max_size: usize) -> Self {
        Self {
            roots: VecDeque::new(),
            max_size,
        }
    }

    /// Add a new root, returning the one that fell out of the window.
    pub fn push(&mut self, root: Anchor) -> Option<Anchor> {
        self.roots.retain(|r| r != &root);
        self.roots.push_front(root);
        if self.roots.len() > self.max_size {
            self.roots.pop_back()
        } else {
            None
        }
    }

    /// Forget a root (after a rollback).
    pub fn remove(&mut self, root: &Anchor) {
        self.roots.retain(|r| r != root);
    }

    /// Check if a root is valid (current or recent)
    pub fn is_valid(&self, root: &Anchor) -> bool {
        self.roots.contains(root)
    }

    /// Get the most recent root
    pub fn current(&self) -> Option<&Anchor> {
        self.roots.front()
    }
}

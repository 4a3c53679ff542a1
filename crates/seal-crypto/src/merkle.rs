use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use seal_types::Hash;

use crate::hasher::ContentHasher;

/// Where a hash sits in the tree: its pairing partner and their parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub sibling: Hash,
    pub parent: Hash,
}

/// Flat lookup table describing a Merkle tree.
///
/// Every hash that was paired in some layer has exactly one entry. The root,
/// and any hash still being carried forward unpaired, has none. A hash paired
/// more than once keeps the entry from its highest layer, so a walk from it
/// still climbs to the root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelationMap {
    entries: HashMap<Hash, Relation>,
}

impl RelationMap {
    pub fn get(&self, hash: &Hash) -> Option<&Relation> {
        self.entries.get(hash)
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Follow parent links from `start`, collecting siblings leaf to root.
    ///
    /// Returns the proof and the hash where the walk stopped.
    pub fn walk(&self, start: Hash) -> (Vec<Hash>, Hash) {
        let mut proof = Vec::new();
        let mut candidate = start;
        while let Some(relation) = self.entries.get(&candidate) {
            proof.push(relation.sibling);
            candidate = relation.parent;
        }
        (proof, candidate)
    }

    /// Later layers overwrite earlier entries for the same hash.
    fn record(&mut self, a: Hash, b: Hash, parent: Hash) {
        self.entries.insert(a, Relation { sibling: b, parent });
        self.entries.insert(b, Relation { sibling: a, parent });
    }
}

/// Errors from building a Merkle tree.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("cannot build a Merkle tree from zero leaves")]
    Empty,
}

/// Combine two hashes into their parent.
///
/// The inputs are put into byte order before hashing, so
/// `combine(a, b) == combine(b, a)`. Pairing in [`MerkleTree::build`] stays
/// positional; only the node hash ignores which side a child was on, which is
/// what lets a proof be replayed as a plain fold.
pub fn combine(a: &Hash, b: &Hash) -> Hash {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    ContentHasher::NODE.hash_parts(&[lo.as_bytes(), hi.as_bytes()])
}

/// Fold `proof` onto `target`, returning the root it derives.
pub fn fold_proof(target: &Hash, proof: &[Hash]) -> Hash {
    proof
        .iter()
        .fold(*target, |current, sibling| combine(&current, sibling))
}

/// Check that folding `proof` onto `target` reproduces `root`.
pub fn verify_proof(target: &Hash, proof: &[Hash], root: &Hash) -> bool {
    fold_proof(target, proof) == *root
}

/// A Merkle tree over an ordered leaf set, held as a [`RelationMap`].
#[derive(Clone, Debug)]
pub struct MerkleTree {
    root: Hash,
    leaf_count: usize,
    relations: RelationMap,
}

impl MerkleTree {
    /// Build the tree by layer-synchronous pairwise reduction.
    ///
    /// Each layer is paired left to right. An odd layer carries its last
    /// element forward unchanged. A single leaf is its own root.
    pub fn build(leaves: &[Hash]) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::Empty);
        }

        let mut relations = RelationMap::default();
        let mut layer = leaves.to_vec();
        let mut depth = 0usize;

        while layer.len() > 1 {
            let mut next = Vec::with_capacity(layer.len().div_ceil(2));
            for pair in layer.chunks(2) {
                match pair {
                    [a, b] => {
                        let parent = combine(a, b);
                        relations.record(*a, *b, parent);
                        next.push(parent);
                    }
                    // Odd layer: carry the last element up untouched.
                    [carry] => next.push(*carry),
                    _ => unreachable!("chunks(2) yields one or two elements"),
                }
            }
            depth += 1;
            layer = next;
        }

        let root = layer[0];
        debug!(leaves = leaves.len(), depth, root = %root.short_hex(), "merkle tree built");

        Ok(Self {
            root,
            leaf_count: leaves.len(),
            relations,
        })
    }

    pub fn root(&self) -> Hash {
        self.root
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn relations(&self) -> &RelationMap {
        &self.relations
    }

    /// Proof for `leaf`, or `None` if the walk from `leaf` does not end at
    /// this tree's root.
    pub fn proof(&self, leaf: &Hash) -> Option<Vec<Hash>> {
        let (proof, end) = self.relations.walk(*leaf);
        (end == self.root).then_some(proof)
    }
}

//! Merkle proof generation and verification.
//!
//! Proofs address nodes by [`GIndex`], so a proof for any field, element, packed
//! chunk or length chunk of a value can be checked against its hash tree root
//! without the rest of the tree.

use alloy_primitives::B256;
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    error::Result,
    gindex::GIndex,
    hash::Hasher,
    node::{self, NodeRef},
    SszError,
};

/// A single-node merkle proof.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Proof {
    /// Position of the proven node.
    pub gindex: GIndex,
    /// Hash (or chunk, for leaves) of the proven node.
    pub leaf: B256,
    /// Sibling hashes from the proven node up to the root.
    pub branch: Vec<B256>,
}

impl Proof {
    /// Fold the branch into a root.
    pub fn compute_root<H: Hasher>(&self, hasher: &H) -> Result<B256> {
        if self.branch.len() != self.gindex.depth() {
            return Err(SszError::InvalidProof(format!(
                "branch of {} hashes for a node at depth {}",
                self.branch.len(),
                self.gindex.depth()
            )));
        }
        let mut current = self.leaf;
        for (g, sibling) in self.gindex.path_indices().into_iter().zip(&self.branch) {
            current = if g.is_left() {
                hasher.hash_64(&current, sibling)
            } else {
                hasher.hash_64(sibling, &current)
            };
        }
        Ok(current)
    }

    /// Verify this proof against an expected root hash.
    pub fn verify<H: Hasher>(&self, hasher: &H, expected_root: &B256) -> Result<bool> {
        Ok(self.compute_root(hasher)? == *expected_root)
    }

    /// Size of the proof in bytes.
    pub fn size(&self) -> usize {
        8 + 32 + self.branch.len() * 32
    }
}

/// Build a proof for the node at `gindex` below `root`.
pub fn generate_proof(root: &NodeRef, gindex: GIndex) -> Result<Proof> {
    let leaf = node::get(root, gindex)?.hash();
    let branch = gindex
        .branch_indices()
        .into_iter()
        .map(|sibling| node::get(root, sibling).map(|n| n.hash()))
        .collect::<Result<Vec<_>>>()?;
    Ok(Proof {
        gindex,
        leaf,
        branch,
    })
}

/// A proof for several nodes sharing one set of helper hashes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MultiProof {
    /// Positions of the proven nodes.
    pub gindices: Vec<GIndex>,
    /// Hashes of the proven nodes, in the order of `gindices`.
    pub leaves: Vec<B256>,
    /// Hashes of the nodes at [`helper_indices`] of `gindices`.
    pub helpers: Vec<B256>,
}

impl MultiProof {
    /// Number of proven nodes.
    pub fn len(&self) -> usize {
        self.gindices.len()
    }

    /// Whether the proof proves nothing.
    pub fn is_empty(&self) -> bool {
        self.gindices.is_empty()
    }

    /// Fold leaves and helpers into a root.
    pub fn compute_root<H: Hasher>(&self, hasher: &H) -> Result<B256> {
        if self.gindices.len() != self.leaves.len() {
            return Err(SszError::InvalidProof(format!(
                "{} leaves for {} indices",
                self.leaves.len(),
                self.gindices.len()
            )));
        }
        let helper_indices = helper_indices(&self.gindices);
        if helper_indices.len() != self.helpers.len() {
            return Err(SszError::InvalidProof(format!(
                "{} helpers where {} are needed",
                self.helpers.len(),
                helper_indices.len()
            )));
        }

        let mut objects: BTreeMap<u64, B256> = self
            .gindices
            .iter()
            .zip(&self.leaves)
            .chain(helper_indices.iter().zip(&self.helpers))
            .map(|(g, hash)| (g.get(), *hash))
            .collect();
        let mut keys: Vec<u64> = objects.keys().rev().copied().collect();

        let mut pos = 0;
        while pos < keys.len() {
            let k = keys[pos];
            if k > 1 && !objects.contains_key(&(k / 2)) {
                if let (Some(left), Some(right)) = (objects.get(&(k & !1)), objects.get(&(k | 1))) {
                    let parent = hasher.hash_64(left, right);
                    objects.insert(k / 2, parent);
                    keys.push(k / 2);
                }
            }
            pos += 1;
        }

        objects
            .get(&1)
            .copied()
            .ok_or_else(|| SszError::InvalidProof("proof does not reach the root".to_string()))
    }

    /// Verify this proof against an expected root hash.
    pub fn verify<H: Hasher>(&self, hasher: &H, expected_root: &B256) -> Result<bool> {
        Ok(self.compute_root(hasher)? == *expected_root)
    }

    /// Size of the proof in bytes.
    pub fn size(&self) -> usize {
        self.gindices.len() * (8 + 32) + self.helpers.len() * 32
    }
}

/// Nodes whose hashes a multiproof for `gindices` must carry, deepest first.
///
/// These are the siblings along every proven path that are neither proven
/// themselves nor computable from proven nodes.
pub fn helper_indices(gindices: &[GIndex]) -> Vec<GIndex> {
    let mut siblings = BTreeSet::new();
    let mut on_path = BTreeSet::new();
    for g in gindices {
        siblings.extend(g.branch_indices());
        on_path.extend(g.path_indices());
    }
    siblings
        .iter()
        .rev()
        .filter(|g| !on_path.contains(*g))
        .copied()
        .collect()
}

/// Build a multiproof for the nodes at `gindices` below `root`.
pub fn generate_multiproof(root: &NodeRef, gindices: &[GIndex]) -> Result<MultiProof> {
    let hash_at = |g: &GIndex| node::get(root, *g).map(|n| n.hash());
    let leaves = gindices.iter().map(hash_at).collect::<Result<Vec<_>>>()?;
    let helpers = helper_indices(gindices)
        .iter()
        .map(hash_at)
        .collect::<Result<Vec<_>>>()?;
    Ok(MultiProof {
        gindices: gindices.to_vec(),
        leaves,
        helpers,
    })
}

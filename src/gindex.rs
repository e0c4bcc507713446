//! Generalized indices.
//!
//! A generalized index numbers the nodes of a binary tree breadth-first: the root is
//! `1` and the children of node `g` are `2g` (left) and `2g + 1` (right). The bits of
//! an index below its leading one spell out the path from the root, MSB first.

use std::fmt;

use crate::{error::Result, SszError};

/// Generalized index of a node within a tree.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GIndex(u64);

impl GIndex {
    /// The root of a tree.
    pub const ROOT: Self = Self(1);

    /// Wrap a raw generalized index. Returns `None` for `0`, which addresses nothing.
    pub const fn new(value: u64) -> Option<Self> {
        if value == 0 {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Index of the `index`-th node at `depth` levels below the root.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `depth >= 64` or `index >= 2^depth`.
    pub fn from_depth_index(depth: usize, index: u64) -> Self {
        debug_assert!(depth < 64);
        debug_assert!(index >> depth == 0);
        Self((1u64 << depth) | index)
    }

    /// The raw integer.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Number of edges between the root and this node.
    pub const fn depth(self) -> usize {
        (63 - self.0.leading_zeros()) as usize
    }

    /// Position of this node among the nodes of the same depth.
    pub const fn index_at_depth(self) -> u64 {
        self.0 ^ (1u64 << self.depth())
    }

    /// Left child.
    pub fn left(self) -> Result<Self> {
        self.0.checked_mul(2).map(Self).ok_or(SszError::GIndexOverflow)
    }

    /// Right child.
    pub fn right(self) -> Result<Self> {
        self.left().map(|g| Self(g.0 | 1))
    }

    /// Parent, or `None` for the root.
    pub const fn parent(self) -> Option<Self> {
        if self.0 == 1 {
            None
        } else {
            Some(Self(self.0 >> 1))
        }
    }

    /// The other child of this node's parent. The root is its own sibling.
    pub const fn sibling(self) -> Self {
        if self.0 == 1 {
            self
        } else {
            Self(self.0 ^ 1)
        }
    }

    /// Whether this node is the left child of its parent.
    pub const fn is_left(self) -> bool {
        self.0 & 1 == 0
    }

    /// Address `other` relative to the subtree rooted at `self`.
    pub fn concat(self, other: Self) -> Result<Self> {
        let shift = other.depth();
        if shift > 0 && self.0.leading_zeros() < shift as u32 {
            return Err(SszError::GIndexOverflow);
        }
        Ok(Self((self.0 << shift) | other.index_at_depth()))
    }

    /// Directions from the root to this node; `true` means "go right".
    pub fn path_bits(self) -> impl Iterator<Item = bool> {
        let depth = self.depth();
        let value = self.0;
        (0..depth).rev().map(move |bit| (value >> bit) & 1 == 1)
    }

    /// Generalized indices of the siblings along the path to the root, deepest first.
    pub fn branch_indices(self) -> Vec<Self> {
        let mut out = Vec::with_capacity(self.depth());
        let mut current = self;
        while let Some(parent) = current.parent() {
            out.push(current.sibling());
            current = parent;
        }
        out
    }

    /// This node and all its ancestors except the root, deepest first.
    pub fn path_indices(self) -> Vec<Self> {
        let mut out = Vec::with_capacity(self.depth());
        let mut current = self;
        while let Some(parent) = current.parent() {
            out.push(current);
            current = parent;
        }
        out
    }
}

impl fmt::Debug for GIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GIndex({})", self.0)
    }
}

impl fmt::Display for GIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of levels needed to hold `count` leaves: `ceil(log2(count))`, and `0` for
/// zero or one leaf.
pub const fn ceil_log2(count: usize) -> usize {
    if count <= 1 {
        0
    } else {
        (usize::BITS - (count - 1).leading_zeros()) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_and_index() {
        let g = GIndex::from_depth_index(3, 5);
        assert_eq!(g.get(), 13);
        assert_eq!(g.depth(), 3);
        assert_eq!(g.index_at_depth(), 5);
        assert_eq!(GIndex::ROOT.depth(), 0);
    }

    #[test]
    fn test_children_and_parent() {
        let g = GIndex::from_depth_index(2, 1);
        assert_eq!(g.left().unwrap().get(), 10);
        assert_eq!(g.right().unwrap().get(), 11);
        assert_eq!(g.left().unwrap().parent(), Some(g));
        assert_eq!(GIndex::ROOT.parent(), None);
        assert_eq!(g.sibling().get(), 4);
        assert!(!g.is_left());
    }

    #[test]
    fn test_concat() {
        // Field 1 of a 4-field container (gindex 5), then the left child of that.
        let field = GIndex::from_depth_index(2, 1);
        let inner = GIndex::new(2).unwrap();
        assert_eq!(field.concat(inner).unwrap().get(), 10);
        assert_eq!(field.concat(GIndex::ROOT).unwrap(), field);
    }

    #[test]
    fn test_concat_overflow() {
        let deep = GIndex::from_depth_index(60, 0);
        let other = GIndex::from_depth_index(8, 0);
        assert_eq!(deep.concat(other), Err(SszError::GIndexOverflow));
    }

    #[test]
    fn test_path_bits() {
        let g = GIndex::new(0b1101).unwrap();
        let bits: Vec<_> = g.path_bits().collect();
        assert_eq!(bits, vec![true, false, true]);
    }

    #[test]
    fn test_branch_and_path_indices() {
        let g = GIndex::new(13).unwrap();
        let branch: Vec<u64> = g.branch_indices().into_iter().map(GIndex::get).collect();
        let path: Vec<u64> = g.path_indices().into_iter().map(GIndex::get).collect();
        assert_eq!(branch, vec![12, 7, 2]);
        assert_eq!(path, vec![13, 6, 3]);
    }

    #[test]
    fn test_ceil_log2() {
        assert_eq!(ceil_log2(0), 0);
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(3), 2);
        assert_eq!(ceil_log2(4), 2);
        assert_eq!(ceil_log2(5), 3);
        assert_eq!(ceil_log2(1 << 40), 40);
    }
}

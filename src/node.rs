//! Immutable tree nodes.
//!
//! Two node types:
//! - `Leaf`: a 32-byte chunk. Its hash is the chunk itself.
//! - `Branch`: two children and a lazily computed hash, `sha256(left || right)`.
//!
//! Nodes are never mutated after construction. "Changing" a tree means building new
//! branches along the paths to the changed leaves and reusing every other subtree,
//! so any number of trees can share nodes through [`NodeRef`] handles. Empty regions
//! of a tree (list capacity beyond its length, padding to a power of two) are
//! represented by the globally shared subtrees returned from [`zero_node`].

use alloy_primitives::B256;
use std::{
    fmt,
    sync::{Arc, LazyLock, OnceLock},
};

use crate::{
    error::Result,
    hash::{zero_hash, Hasher, Sha256Hasher, MAX_TREE_DEPTH},
    GIndex, SszError,
};

/// Shared handle to an immutable node.
pub type NodeRef = Arc<Node>;

/// A node of the merkle tree.
pub enum Node {
    /// A 32-byte chunk.
    Leaf(B256),
    /// Internal node with exactly two children.
    Branch(BranchNode),
}

/// Internal node with two children.
///
/// Hash formula:
/// `hash = sha256(left.hash || right.hash)`
///
/// The hash is memoized on first use. Computation is pure, so two threads racing on
/// a cold node both produce the same value and the first write wins.
pub struct BranchNode {
    left: NodeRef,
    right: NodeRef,
    hash: OnceLock<B256>,
}

static ZERO_NODES: LazyLock<Vec<NodeRef>> = LazyLock::new(|| {
    let mut nodes: Vec<NodeRef> = Vec::with_capacity(MAX_TREE_DEPTH + 1);
    nodes.push(Arc::new(Node::Leaf(B256::ZERO)));
    for depth in 1..=MAX_TREE_DEPTH {
        let below = nodes[depth - 1].clone();
        nodes.push(Arc::new(Node::Branch(BranchNode {
            left: below.clone(),
            right: below,
            hash: OnceLock::from(zero_hash(depth)),
        })));
    }
    nodes
});

/// The shared all-zero subtree with `depth` levels below its root.
///
/// # Panics
///
/// Panics if `depth > MAX_TREE_DEPTH`.
pub fn zero_node(depth: usize) -> NodeRef {
    ZERO_NODES[depth].clone()
}

impl Node {
    /// Create a leaf holding `chunk`.
    pub fn leaf(chunk: B256) -> NodeRef {
        Arc::new(Self::Leaf(chunk))
    }

    /// Create a branch over two children.
    pub fn branch(left: NodeRef, right: NodeRef) -> NodeRef {
        Arc::new(Self::Branch(BranchNode {
            left,
            right,
            hash: OnceLock::new(),
        }))
    }

    /// The merkle root of the subtree rooted at this node.
    pub fn hash(&self) -> B256 {
        match self {
            Self::Leaf(chunk) => *chunk,
            Self::Branch(branch) => *branch.hash.get_or_init(|| {
                Sha256Hasher.hash_64(&branch.left.hash(), &branch.right.hash())
            }),
        }
    }

    /// Hash with the top `levels` levels of the tree split across the rayon pool.
    ///
    /// Only pays off for trees that have never been hashed; nodes whose hash is
    /// already cached return immediately.
    #[cfg(feature = "parallel")]
    pub fn hash_parallel(&self, levels: usize) -> B256 {
        match self {
            Self::Leaf(chunk) => *chunk,
            Self::Branch(branch) => {
                if let Some(hash) = branch.hash.get() {
                    return *hash;
                }
                if levels == 0 {
                    return self.hash();
                }
                let (left, right) = rayon::join(
                    || branch.left.hash_parallel(levels - 1),
                    || branch.right.hash_parallel(levels - 1),
                );
                *branch
                    .hash
                    .get_or_init(|| Sha256Hasher.hash_64(&left, &right))
            }
        }
    }

    /// Whether the hash of this node is already known.
    pub fn is_hashed(&self) -> bool {
        match self {
            Self::Leaf(_) => true,
            Self::Branch(branch) => branch.hash.get().is_some(),
        }
    }

    /// The chunk of a leaf.
    pub fn chunk(&self) -> Option<&B256> {
        match self {
            Self::Leaf(chunk) => Some(chunk),
            Self::Branch(_) => None,
        }
    }

    /// Left child of a branch.
    pub fn left(&self) -> Option<&NodeRef> {
        match self {
            Self::Leaf(_) => None,
            Self::Branch(branch) => Some(&branch.left),
        }
    }

    /// Right child of a branch.
    pub fn right(&self) -> Option<&NodeRef> {
        match self {
            Self::Leaf(_) => None,
            Self::Branch(branch) => Some(&branch.right),
        }
    }

    /// Check if this node is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }
}

/// Navigate from `root` to the node at `gindex`.
pub fn get(root: &NodeRef, gindex: GIndex) -> Result<&NodeRef> {
    let mut node = root;
    for go_right in gindex.path_bits() {
        node = match node.as_ref() {
            Node::Branch(branch) if go_right => &branch.right,
            Node::Branch(branch) => &branch.left,
            Node::Leaf(_) => return Err(SszError::InvalidGIndex(gindex)),
        };
    }
    Ok(node)
}

/// Replace the node at `gindex`, rebuilding only its ancestors.
pub fn set(root: &NodeRef, gindex: GIndex, new: NodeRef) -> Result<NodeRef> {
    fn rebuild(
        node: &NodeRef,
        mut bits: impl Iterator<Item = bool>,
        new: NodeRef,
        gindex: GIndex,
    ) -> Result<NodeRef> {
        let Some(go_right) = bits.next() else {
            return Ok(new);
        };
        let Node::Branch(branch) = node.as_ref() else {
            return Err(SszError::InvalidGIndex(gindex));
        };
        if go_right {
            let right = rebuild(&branch.right, bits, new, gindex)?;
            Ok(Node::branch(branch.left.clone(), right))
        } else {
            let left = rebuild(&branch.left, bits, new, gindex)?;
            Ok(Node::branch(left, branch.right.clone()))
        }
    }
    rebuild(root, gindex.path_bits(), new, gindex)
}

/// Replace several nodes at `depth` levels below `root`.
///
/// `updates` must be sorted by index with no duplicates, and every index must be
/// below `2^depth`. Each branch shared by several changed paths is rebuilt once;
/// every subtree without a change is reused as is.
pub fn update_many(root: &NodeRef, depth: usize, updates: &[(u64, NodeRef)]) -> Result<NodeRef> {
    debug_assert!(updates.windows(2).all(|w| w[0].0 < w[1].0));
    if updates.is_empty() {
        return Ok(root.clone());
    }
    if depth == 0 {
        return Ok(updates[0].1.clone());
    }

    let Node::Branch(branch) = root.as_ref() else {
        let index = updates[0].0;
        return Err(SszError::InvalidGIndex(GIndex::from_depth_index(depth, index)));
    };

    // Indices whose bit `depth - 1` is clear go left. Sorted order means they
    // form a prefix of `updates`.
    let bit = depth - 1;
    let split_point = updates.partition_point(|(index, _)| (index >> bit) & 1 == 0);
    let (left_updates, right_updates) = updates.split_at(split_point);

    let left = update_many(&branch.left, depth - 1, left_updates)?;
    let right = update_many(&branch.right, depth - 1, right_updates)?;
    Ok(Node::branch(left, right))
}

/// Build a balanced tree of `depth` levels whose first leaves are `nodes` and whose
/// remaining positions are zero subtrees.
///
/// Returns an error if more than `2^depth` nodes are given.
pub fn from_chunks(depth: usize, nodes: Vec<NodeRef>) -> Result<NodeRef> {
    if depth < usize::BITS as usize && nodes.len() > 1usize << depth {
        return Err(SszError::TooManyElements {
            count: nodes.len(),
            max: 1usize << depth,
        });
    }
    if nodes.is_empty() {
        return Ok(zero_node(depth));
    }

    let mut level = nodes;
    for d in 0..depth {
        if level.len() % 2 == 1 {
            level.push(zero_node(d));
        }
        let mut next = Vec::with_capacity(level.len() / 2);
        let mut pairs = level.into_iter();
        while let (Some(left), Some(right)) = (pairs.next(), pairs.next()) {
            next.push(Node::branch(left, right));
        }
        level = next;
    }

    debug_assert_eq!(level.len(), 1);
    Ok(level.swap_remove(0))
}

/// Build a tree of `depth` levels whose first `count` leaves are `node`.
///
/// Full subtrees made of the same node are shared, so this costs `O(depth)`
/// allocations regardless of `count`.
pub fn fill(depth: usize, count: usize, node: &NodeRef) -> NodeRef {
    let mut uniform = Vec::with_capacity(depth + 1);
    uniform.push(node.clone());
    for d in 1..=depth {
        let below: NodeRef = uniform[d - 1].clone();
        uniform.push(Node::branch(below.clone(), below));
    }

    fn build(depth: usize, count: usize, uniform: &[NodeRef]) -> NodeRef {
        if count == 0 {
            return zero_node(depth);
        }
        if depth == 0 || count >= 1usize << depth {
            return uniform[depth].clone();
        }
        let half = 1usize << (depth - 1);
        if count <= half {
            Node::branch(build(depth - 1, count, uniform), zero_node(depth - 1))
        } else {
            Node::branch(uniform[depth - 1].clone(), build(depth - 1, count - half, uniform))
        }
    }

    build(depth, count, &uniform)
}

/// The first `count` nodes at `depth` levels below `root`, left to right.
pub fn collect(root: &NodeRef, depth: usize, count: usize) -> Result<Vec<&NodeRef>> {
    fn walk<'a>(
        node: &'a NodeRef,
        depth: usize,
        count: usize,
        out: &mut Vec<&'a NodeRef>,
    ) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        if depth == 0 {
            out.push(node);
            return Ok(());
        }
        let Node::Branch(branch) = node.as_ref() else {
            return Err(SszError::InvalidGIndex(GIndex::from_depth_index(depth, 0)));
        };
        let half = 1usize << (depth - 1);
        walk(&branch.left, depth - 1, count.min(half), out)?;
        if count > half {
            walk(&branch.right, depth - 1, count - half, out)?;
        }
        Ok(())
    }

    let mut out = Vec::with_capacity(count);
    walk(root, depth, count, &mut out)?;
    Ok(out)
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(chunk) => write!(f, "Leaf({chunk})"),
            Self::Branch(branch) => match branch.hash.get() {
                Some(hash) => write!(f, "Branch({hash})"),
                None => f.write_str("Branch(<unhashed>)"),
            },
        }
    }
}

//! Hash function abstraction for merkleization.
//!
//! SSZ fixes SHA-256 as the merkleization hash. Unlike sparse-trie schemes there is
//! no special case for zero input: an all-zero pair of chunks hashes to
//! `sha256(0^64)`, and the roots of all-zero subtrees are tabulated in
//! [`zero_hash`].

use alloy_primitives::B256;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

/// Deepest subtree the engine will build. A list data tree of this depth plus its
/// length mix-in level still fits in a 64-bit generalized index.
pub const MAX_TREE_DEPTH: usize = 62;

/// Size of a merkle chunk in bytes.
pub const BYTES_PER_CHUNK: usize = 32;

/// Trait for hash functions used to combine tree nodes.
///
/// # Thread Safety
///
/// This trait is always `Send + Sync` so that hashers can be shared by threads hashing
/// disjoint subtrees (see the `"parallel"` feature).
pub trait Hasher: Clone + Default + Send + Sync {
    /// Hash two 32-byte chunks: `H(left || right)`.
    fn hash_64(&self, left: &B256, right: &B256) -> B256;

    /// Raw hash of arbitrary input.
    fn hash_raw(&self, input: &[u8]) -> B256;
}

/// SHA-256 hasher, the only hash function SSZ defines.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn hash_64(&self, left: &B256, right: &B256) -> B256 {
        let mut hasher = Sha256::new();
        hasher.update(left.as_slice());
        hasher.update(right.as_slice());
        B256::from_slice(&hasher.finalize())
    }

    fn hash_raw(&self, input: &[u8]) -> B256 {
        B256::from_slice(&Sha256::digest(input))
    }
}

static ZERO_HASHES: LazyLock<Vec<B256>> = LazyLock::new(|| {
    let hasher = Sha256Hasher;
    let mut hashes = Vec::with_capacity(MAX_TREE_DEPTH + 1);
    hashes.push(B256::ZERO);
    for depth in 1..=MAX_TREE_DEPTH {
        let below = hashes[depth - 1];
        hashes.push(hasher.hash_64(&below, &below));
    }
    hashes
});

/// Root of an all-zero subtree with `depth` levels below it.
///
/// # Panics
///
/// Panics if `depth > MAX_TREE_DEPTH`; schemas never produce such depths.
pub fn zero_hash(depth: usize) -> B256 {
    ZERO_HASHES[depth]
}

//! Value-level merkleization helpers.
//!
//! These compute hash tree roots straight from byte strings and chunk lists,
//! without building a tree. They are the reference the tree-backed
//! [`View::hash_tree_root`](crate::View::hash_tree_root) is checked against, and are
//! handy for hashing one-off values.

use alloy_primitives::B256;

use crate::{
    error::Result,
    gindex::ceil_log2,
    hash::{zero_hash, Hasher, Sha256Hasher, BYTES_PER_CHUNK, MAX_TREE_DEPTH},
    SszError,
};

/// Split `bytes` into 32-byte chunks, zero-padding the last one.
pub fn pack(bytes: &[u8]) -> Vec<B256> {
    bytes
        .chunks(BYTES_PER_CHUNK)
        .map(|piece| {
            let mut chunk = B256::ZERO;
            chunk[..piece.len()].copy_from_slice(piece);
            chunk
        })
        .collect()
}

/// Root of a balanced tree over `chunks`, padded with zero chunks up to the next
/// power of two of `limit` (or of the chunk count when no limit is given).
pub fn merkleize(chunks: &[B256], limit: Option<usize>) -> Result<B256> {
    let limit = limit.unwrap_or(chunks.len());
    if chunks.len() > limit {
        return Err(SszError::TooManyElements {
            count: chunks.len(),
            max: limit,
        });
    }
    let depth = ceil_log2(limit);
    if depth > MAX_TREE_DEPTH {
        return Err(SszError::InvalidSchema(format!(
            "merkleizing {limit} chunks needs depth {depth}"
        )));
    }
    if chunks.is_empty() {
        return Ok(zero_hash(depth));
    }

    let hasher = Sha256Hasher;
    let mut layer = chunks.to_vec();
    for d in 0..depth {
        if layer.len() % 2 == 1 {
            layer.push(zero_hash(d));
        }
        layer = layer
            .chunks_exact(2)
            .map(|pair| hasher.hash_64(&pair[0], &pair[1]))
            .collect();
    }
    Ok(layer[0])
}

/// `hash(root, length_chunk(len))`, the root of a list or bitlist.
pub fn mix_in_length(root: &B256, len: usize) -> B256 {
    Sha256Hasher.hash_64(root, &length_chunk(len))
}

/// The chunk holding a list length: little-endian `uint64`, zero-padded.
pub fn length_chunk(len: usize) -> B256 {
    let mut chunk = B256::ZERO;
    chunk[..8].copy_from_slice(&(len as u64).to_le_bytes());
    chunk
}

/// Bits packed least significant bit first, without a delimiter.
pub fn bitfield_bytes(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, _) in bits.iter().enumerate().filter(|(_, bit)| **bit) {
        bytes[i / 8] |= 1 << (i % 8);
    }
    bytes
}

//! # SSZ tree
//!
//! Typed SSZ values backed by an immutable, structurally shared merkle tree.
//!
//! Consensus objects (blocks, states, attestations) are declared once as
//! [`Schema`]s and stored as binary trees of 32-byte chunks. A value is a [`View`]:
//! a schema plus a tree root. Reading a field navigates the tree; writing goes
//! through a [`MutableView`] that buffers changes and commits them into a new root
//! which shares every untouched subtree with the old one. Hash tree roots are cached
//! per node, so re-hashing a large value after a small change only hashes the
//! nodes on the changed paths.
//!
//! ## Layers
//!
//! - [`node`]: immutable nodes with a memoized hash, shared zero subtrees, and
//!   navigation by [`GIndex`]
//! - [`Schema`]: type descriptors for primitives, containers, vectors, lists,
//!   bitvectors and bitlists
//! - [`View`] / [`MutableView`]: typed reads and batched, persistent writes
//! - [`serialize`] / [`deserialize`]: the SSZ wire format, decoded directly into trees
//! - [`merkle`]: value-level merkleization helpers
//! - [`proof`]: single and multi merkle proofs by generalized index
//! - [`ssz_container!`]: statically typed containers, see [`types`]
//!
//! ## Example
//!
//! ```
//! use ssz_tree::{Schema, View, B256};
//!
//! let checkpoint = Schema::container(
//!     "Checkpoint",
//!     vec![("epoch", Schema::uint64()), ("root", Schema::bytes32())],
//! )
//! .unwrap();
//!
//! let mut m = View::default_for(&checkpoint).to_mutable();
//! m.set(0, 5u64).unwrap();
//! m.set(1, B256::with_last_byte(1)).unwrap();
//! let view = m.commit().unwrap();
//!
//! assert_eq!(view.serialize().len(), 40);
//! let decoded = ssz_tree::deserialize(&checkpoint, &view.serialize()).unwrap();
//! assert_eq!(decoded.hash_tree_root(), view.hash_tree_root());
//! ```
//!
//! ## Features
//!
//! - `parallel`: hash large unhashed trees on the rayon thread pool
//! - `serde`: serde derives for [`GIndex`], [`Proof`] and [`MultiProof`]

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod codec;
pub mod container;
mod error;
mod gindex;
mod hash;
pub mod merkle;
mod mutable;
pub mod node;
mod primitive;
pub mod proof;
mod schema;
pub mod types;
mod view;

pub use codec::{deserialize, serialize, BYTES_PER_LENGTH_OFFSET};
pub use container::{BitList, ByteList, ByteVector, SszField};
pub use error::{Result, SszError};
pub use gindex::GIndex;
pub use hash::{zero_hash, Hasher, Sha256Hasher, BYTES_PER_CHUNK, MAX_TREE_DEPTH};
pub use mutable::MutableView;
pub use node::{zero_node, Node, NodeRef};
pub use primitive::{PrimitiveKind, Value};
pub use proof::{MultiProof, Proof};
pub use schema::{
    same_schema, CollectionSchema, ContainerSchema, Field, Schema, SchemaKind, SchemaRef,
    BITS_PER_CHUNK,
};
pub use view::{Element, View};

#[doc(hidden)]
pub use paste;

/// Re-export alloy primitives for convenience
pub use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};

//! Buffered writes over an immutable tree.
//!
//! A [`MutableView`] records writes in a pending-change map keyed by logical index
//! and leaves the backing tree alone. [`MutableView::commit`] folds all pending
//! changes into the tree at once:
//!
//! 1. Changes are grouped by the data-tree chunk they fall into; several packed
//!    primitives or bits sharing a chunk produce a single new leaf.
//! 2. All new leaves and subtrees are written with one [`node::update_many`] pass,
//!    which rebuilds each ancestor shared by several changed paths only once and
//!    reuses every untouched sibling subtree.
//! 3. For lists, the length chunk is replaced only if the length changed.
//!
//! New nodes start with an empty hash cache; reused subtrees keep theirs.

use alloy_primitives::B256;
use std::collections::{btree_map::Entry, BTreeMap};
use tracing::trace;

use crate::{
    error::Result,
    merkle::length_chunk,
    node::{self, zero_node, Node, NodeRef},
    schema::{same_schema, SchemaKind, SchemaRef, Slot},
    view::{self, chunk_at, Element, View},
    SszError,
};

/// A working copy of a composite value.
///
/// Owned by a single writer; the views it was created from, and the views it
/// returns from [`commit`](Self::commit), are never affected by later writes.
#[derive(Clone, Debug)]
pub struct MutableView {
    base: View,
    length: usize,
    cleared: bool,
    changes: BTreeMap<usize, Element>,
}

impl MutableView {
    pub(crate) fn new(base: View) -> Self {
        let length = base.len().unwrap_or_default();
        Self {
            base,
            length,
            cleared: false,
            changes: BTreeMap::new(),
        }
    }

    /// The schema of the value being edited.
    pub fn schema(&self) -> &SchemaRef {
        self.base.schema()
    }

    /// Current logical length, including pending appends.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the current logical length is zero.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Whether there are uncommitted changes.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty() || self.cleared
    }

    /// Element at `index`, reflecting pending changes.
    pub fn get(&self, index: usize) -> Result<Element> {
        if index >= self.length {
            return Err(SszError::IndexOutOfBounds {
                index,
                len: self.length,
            });
        }
        match self.changes.get(&index) {
            Some(element) => Ok(element.clone()),
            None => self.base.get(index),
        }
    }

    /// Replace the element at `index`. A later write to the same index replaces this
    /// one.
    pub fn set(&mut self, index: usize, element: impl Into<Element>) -> Result<()> {
        let element = element.into();
        if index >= self.length {
            return Err(SszError::IndexOutOfBounds {
                index,
                len: self.length,
            });
        }
        self.check_element(index, &element)?;
        self.changes.insert(index, element);
        Ok(())
    }

    /// Set bit `index` of a bitvector or bitlist.
    pub fn set_bit(&mut self, index: usize, bit: bool) -> Result<()> {
        if !matches!(self.schema().kind(), SchemaKind::Bitvector(_) | SchemaKind::Bitlist(_)) {
            return Err(self.unsupported("set_bit"));
        }
        self.set(index, bit)
    }

    /// Append an element to a list or bitlist.
    ///
    /// Fails with [`SszError::CapacityExceeded`] when the list is already at its
    /// maximum length; the list is left unchanged in that case.
    pub fn append(&mut self, element: impl Into<Element>) -> Result<()> {
        let max = self
            .schema()
            .max_length()
            .ok_or_else(|| self.unsupported("append"))?;
        if self.length >= max {
            return Err(SszError::CapacityExceeded { max });
        }
        let element = element.into();
        self.check_element(self.length, &element)?;
        self.changes.insert(self.length, element);
        self.length += 1;
        Ok(())
    }

    /// Remove every element of a list or bitlist.
    pub fn clear(&mut self) -> Result<()> {
        if !self.schema().has_length_mixin() {
            return Err(self.unsupported("clear"));
        }
        self.changes.clear();
        self.length = 0;
        self.cleared = true;
        Ok(())
    }

    /// Edit the composite child at `index` in place: `f` receives a mutable copy of
    /// the child, which is committed and written back when `f` succeeds.
    pub fn update<F>(&mut self, index: usize, f: F) -> Result<()>
    where
        F: FnOnce(&mut MutableView) -> Result<()>,
    {
        let child = match self.get(index)? {
            Element::View(view) => view,
            Element::Value(value) => {
                return Err(SszError::TypeMismatch {
                    expected: "composite".to_string(),
                    actual: value.type_name(),
                })
            }
        };
        let mut child = child.to_mutable();
        f(&mut child)?;
        let committed = child.commit()?;
        self.set(index, committed)
    }

    /// Fold all pending changes into a new tree and return a view of it.
    ///
    /// The tree this working copy was created from stays valid and unchanged, and
    /// shares every subtree without a change with the returned one.
    pub fn commit(&mut self) -> Result<View> {
        if !self.has_changes() {
            return Ok(self.base.clone());
        }

        let schema = self.base.schema().clone();
        let depth = schema.tree_depth();
        let old_data: NodeRef = if self.cleared {
            zero_node(depth)
        } else {
            self.base.data_root()?.clone()
        };

        let mut subtrees: Vec<(u64, NodeRef)> = Vec::new();
        let mut chunks: BTreeMap<usize, B256> = BTreeMap::new();
        for (&index, element) in &self.changes {
            let slot = schema.slot(index).ok_or_else(|| self.unsupported("commit"))?;
            match (slot, element) {
                (Slot::Packed { kind, chunk, offset }, Element::Value(value)) => {
                    let bytes = patch_chunk(&mut chunks, &old_data, depth, chunk)?;
                    kind.write_to_chunk(value, bytes, offset)?;
                }
                (Slot::Bit { chunk, bit }, Element::Value(value)) => {
                    let set = bool::try_from(value.clone())?;
                    let bytes = patch_chunk(&mut chunks, &old_data, depth, chunk)?;
                    let mask = 1u8 << (bit % 8);
                    if set {
                        bytes.0[bit / 8] |= mask;
                    } else {
                        bytes.0[bit / 8] &= !mask;
                    }
                }
                (Slot::Subtree { schema: child, chunk }, Element::Value(value)) => {
                    let kind = child.primitive_kind().ok_or_else(|| mismatch(child, element))?;
                    subtrees.push((chunk as u64, Node::leaf(kind.to_chunk(value)?)));
                }
                (Slot::Subtree { chunk, .. }, Element::View(view)) => {
                    subtrees.push((chunk as u64, view.root().clone()));
                }
                (_, Element::View(view)) => {
                    return Err(SszError::TypeMismatch {
                        expected: "primitive".to_string(),
                        actual: view.schema().to_string(),
                    })
                }
            }
        }

        // A schema places either packed chunks or subtrees, never both.
        let updates: Vec<(u64, NodeRef)> = if chunks.is_empty() {
            subtrees
        } else {
            chunks
                .into_iter()
                .map(|(chunk, bytes)| (chunk as u64, Node::leaf(bytes)))
                .collect()
        };
        let new_data = node::update_many(&old_data, depth, &updates)?;

        let new_root = if schema.has_length_mixin() {
            let old_length = if self.cleared {
                None
            } else {
                Some(view::read_length(self.base.root())?)
            };
            let length_node = match (old_length, self.base.root().right()) {
                (Some(len), Some(node)) if len == self.length => node.clone(),
                _ => Node::leaf(length_chunk(self.length)),
            };
            Node::branch(new_data, length_node)
        } else {
            new_data
        };

        trace!(
            target: "ssz::commit",
            schema = %schema,
            changes = self.changes.len(),
            rebuilt_chunks = updates.len(),
            length = self.length,
            "Committed changes"
        );

        self.base = View::new_unchecked(schema, new_root);
        self.changes.clear();
        self.cleared = false;
        Ok(self.base.clone())
    }

    fn check_element(&self, index: usize, element: &Element) -> Result<()> {
        let slot = self
            .schema()
            .slot(index)
            .ok_or_else(|| self.unsupported("set"))?;
        match (slot, element) {
            (Slot::Packed { kind, .. }, Element::Value(value)) => kind.check(value),
            (Slot::Bit { .. }, Element::Value(value)) => {
                bool::try_from(value.clone()).map(|_| ())
            }
            (Slot::Subtree { schema, .. }, Element::Value(value)) => match schema.primitive_kind() {
                Some(kind) => kind.check(value),
                None => Err(mismatch(schema, element)),
            },
            (Slot::Subtree { schema, .. }, Element::View(view)) => {
                if same_schema(schema, view.schema()) {
                    Ok(())
                } else {
                    Err(mismatch(schema, element))
                }
            }
            (Slot::Packed { kind, .. }, Element::View(view)) => Err(SszError::TypeMismatch {
                expected: kind.to_string(),
                actual: view.schema().to_string(),
            }),
            (Slot::Bit { .. }, Element::View(view)) => Err(SszError::TypeMismatch {
                expected: "boolean".to_string(),
                actual: view.schema().to_string(),
            }),
        }
    }

    fn unsupported(&self, operation: &'static str) -> SszError {
        SszError::UnsupportedOperation {
            operation,
            schema: self.schema().to_string(),
        }
    }
}

fn patch_chunk<'a>(
    chunks: &'a mut BTreeMap<usize, B256>,
    data_root: &NodeRef,
    depth: usize,
    chunk: usize,
) -> Result<&'a mut B256> {
    Ok(match chunks.entry(chunk) {
        Entry::Occupied(entry) => entry.into_mut(),
        Entry::Vacant(entry) => entry.insert(*chunk_at(data_root, depth, chunk)?),
    })
}

fn mismatch(expected: &SchemaRef, element: &Element) -> SszError {
    let actual = match element {
        Element::Value(value) => value.type_name(),
        Element::View(view) => view.schema().to_string(),
    };
    SszError::TypeMismatch {
        expected: expected.to_string(),
        actual,
    }
}

//! Read-only typed access to a tree.
//!
//! A [`View`] pairs a schema with a tree root. It is cheap to clone and carries no
//! state beyond that pair, so any number of views may alias the same root, and views
//! of consecutive versions of a value share every subtree they have in common.

use alloy_primitives::{Bytes, FixedBytes, B256, U256};
use std::fmt;

use crate::{
    codec,
    error::Result,
    gindex::GIndex,
    mutable::MutableView,
    node::{self, NodeRef},
    primitive::Value,
    proof::{self, MultiProof, Proof},
    schema::{same_schema, SchemaKind, SchemaRef, Slot},
    SszError,
};

/// Generalized index of the length chunk below a list root.
pub(crate) const LENGTH_GINDEX: GIndex = match GIndex::new(3) {
    Some(g) => g,
    None => unreachable!(),
};

/// What a position of a composite holds: a primitive value or a nested view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Element {
    Value(Value),
    View(View),
}

/// A schema bound to a tree root.
#[derive(Clone)]
pub struct View {
    schema: SchemaRef,
    root: NodeRef,
}

impl View {
    /// The default value of `schema`.
    pub fn default_for(schema: &SchemaRef) -> Self {
        Self {
            schema: schema.clone(),
            root: schema.default_tree(),
        }
    }

    /// Bind a root to a schema. The caller guarantees the tree has the schema's shape.
    pub(crate) fn new_unchecked(schema: SchemaRef, root: NodeRef) -> Self {
        Self { schema, root }
    }

    /// The schema of this view.
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// The backing tree root.
    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    /// The 32-byte hash tree root of the value.
    ///
    /// Cached per node: calling this again on an unmodified tree, or on a tree that
    /// shares subtrees with an already hashed one, only hashes the new nodes.
    pub fn hash_tree_root(&self) -> B256 {
        #[cfg(feature = "parallel")]
        {
            self.root.hash_parallel(PARALLEL_HASH_LEVELS)
        }
        #[cfg(not(feature = "parallel"))]
        {
            self.root.hash()
        }
    }

    /// Number of fields (container), elements (vector, list) or bits.
    pub fn len(&self) -> Result<usize> {
        match self.schema.kind() {
            SchemaKind::Primitive(_) => Err(self.unsupported("len")),
            SchemaKind::Container(container) => Ok(container.field_count()),
            SchemaKind::Vector(_) | SchemaKind::Bitvector(_) => {
                Ok(self.schema.length().unwrap_or_default())
            }
            SchemaKind::List(_) | SchemaKind::Bitlist(_) => read_length(&self.root),
        }
    }

    /// Whether the view has no elements.
    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    /// Root of the tree holding the elements, below the length mix-in for lists.
    pub(crate) fn data_root(&self) -> Result<&NodeRef> {
        data_root(&self.schema, &self.root)
    }

    /// Element at `index`: a declared field position for containers, an element
    /// position for vectors and lists, a bit position for bit collections.
    pub fn get(&self, index: usize) -> Result<Element> {
        let len = self.len()?;
        if index >= len {
            return Err(SszError::IndexOutOfBounds { index, len });
        }
        let slot = self.schema.slot(index).ok_or_else(|| self.unsupported("get"))?;
        read_slot(self.data_root()?, self.schema.tree_depth(), slot)
    }

    /// Primitive value at `index`.
    pub fn get_value(&self, index: usize) -> Result<Value> {
        match self.get(index)? {
            Element::Value(value) => Ok(value),
            Element::View(view) => Err(SszError::TypeMismatch {
                expected: "primitive".to_string(),
                actual: view.schema.to_string(),
            }),
        }
    }

    /// Composite child at `index`.
    pub fn get_view(&self, index: usize) -> Result<View> {
        match self.get(index)? {
            Element::View(view) => Ok(view),
            Element::Value(value) => Err(SszError::TypeMismatch {
                expected: "composite".to_string(),
                actual: value.type_name(),
            }),
        }
    }

    /// Bit at `index` of a bitvector or bitlist.
    pub fn get_bit(&self, index: usize) -> Result<bool> {
        if !matches!(self.schema.kind(), SchemaKind::Bitvector(_) | SchemaKind::Bitlist(_)) {
            return Err(self.unsupported("get_bit"));
        }
        bool::try_from(self.get_value(index)?)
    }

    /// Container field by name.
    pub fn field(&self, name: &str) -> Result<Element> {
        let container = self
            .schema
            .as_container()
            .ok_or_else(|| self.unsupported("field"))?;
        let index = container
            .field_index(name)
            .ok_or_else(|| SszError::UnknownField {
                container: container.name().to_string(),
                name: name.to_string(),
            })?;
        self.get(index)
    }

    /// The value of a primitive-schema view.
    pub fn as_value(&self) -> Result<Value> {
        let kind = self
            .schema
            .primitive_kind()
            .ok_or_else(|| self.unsupported("as_value"))?;
        let chunk = self
            .root
            .chunk()
            .ok_or(SszError::InvalidGIndex(GIndex::ROOT))?;
        kind.read_from_chunk(chunk, 0)
    }

    /// Iterate over all elements in order.
    pub fn iter(&self) -> Result<impl Iterator<Item = Result<Element>> + '_> {
        let len = self.len()?;
        Ok((0..len).map(move |i| self.get(i)))
    }

    /// A mutable working copy. The view itself is unaffected by any change made
    /// through the copy.
    pub fn to_mutable(&self) -> MutableView {
        MutableView::new(self.clone())
    }

    /// SSZ encoding of the value.
    pub fn serialize(&self) -> Vec<u8> {
        codec::serialize(self)
    }

    /// Generalized index, relative to this view's root, of the subtree (or packed
    /// chunk) holding position `index`.
    pub fn child_gindex(&self, index: usize) -> Result<GIndex> {
        let len = self.len()?;
        if index >= len {
            return Err(SszError::IndexOutOfBounds { index, len });
        }
        let slot = self.schema.slot(index).ok_or_else(|| self.unsupported("child_gindex"))?;
        let chunk = match slot {
            Slot::Packed { chunk, .. } | Slot::Bit { chunk, .. } => chunk,
            Slot::Subtree { chunk, .. } => chunk,
        };
        let in_data = GIndex::from_depth_index(self.schema.tree_depth(), chunk as u64);
        if self.schema.has_length_mixin() {
            GIndex::new(2)
                .ok_or(SszError::GIndexOverflow)?
                .concat(in_data)
        } else {
            Ok(in_data)
        }
    }

    /// Generalized index of a nested position, e.g. `[field, element, field]`.
    pub fn gindex_of(&self, path: &[usize]) -> Result<GIndex> {
        let mut gindex = GIndex::ROOT;
        let mut current = self.clone();
        for (depth, &index) in path.iter().enumerate() {
            gindex = gindex.concat(current.child_gindex(index)?)?;
            if depth + 1 < path.len() {
                current = current.get_view(index)?;
            }
        }
        Ok(gindex)
    }

    /// Merkle proof for the chunk at a nested position.
    pub fn prove(&self, path: &[usize]) -> Result<Proof> {
        proof::generate_proof(&self.root, self.gindex_of(path)?)
    }

    /// Merkle multiproof for several nested positions.
    pub fn prove_many(&self, paths: &[&[usize]]) -> Result<MultiProof> {
        let gindices = paths
            .iter()
            .map(|path| self.gindex_of(path))
            .collect::<Result<Vec<_>>>()?;
        proof::generate_multiproof(&self.root, &gindices)
    }

    /// Convert a container to an adjacent fork version of itself.
    ///
    /// The shorter field list must be a prefix of the longer one. Upgrading keeps
    /// every existing field subtree and defaults the added fields. Downgrading drops
    /// trailing fields and fails unless all of them still hold their default value,
    /// so no information is ever silently lost.
    pub fn convert(&self, target: &SchemaRef) -> Result<View> {
        if same_schema(&self.schema, target) {
            return Ok(self.clone());
        }
        let (Some(from), Some(to)) = (self.schema.as_container(), target.as_container()) else {
            return Err(SszError::IncompatibleSchema(format!(
                "cannot convert {} to {}",
                self.schema, target
            )));
        };

        let shared = from.field_count().min(to.field_count());
        for (a, b) in from.fields()[..shared].iter().zip(&to.fields()[..shared]) {
            if a.name() != b.name() || !same_schema(a.schema(), b.schema()) {
                return Err(SszError::IncompatibleSchema(format!(
                    "field {} of {} does not match field {} of {}",
                    a.name(),
                    from.name(),
                    b.name(),
                    to.name()
                )));
            }
        }

        let existing = node::collect(&self.root, self.schema.tree_depth(), from.field_count())?;
        for (field, subtree) in from.fields()[shared..].iter().zip(&existing[shared..]) {
            if subtree.hash() != field.schema().default_tree().hash() {
                return Err(SszError::IncompatibleSchema(format!(
                    "field {} of {} holds a non-default value and cannot be dropped",
                    field.name(),
                    from.name()
                )));
            }
        }

        let chunks = existing[..shared]
            .iter()
            .map(|n| (*n).clone())
            .chain(to.fields()[shared..].iter().map(|f| f.schema().default_tree()))
            .collect();
        let root = node::from_chunks(target.tree_depth(), chunks)?;
        Ok(View::new_unchecked(target.clone(), root))
    }

    fn unsupported(&self, operation: &'static str) -> SszError {
        SszError::UnsupportedOperation {
            operation,
            schema: self.schema.to_string(),
        }
    }
}

#[cfg(feature = "parallel")]
const PARALLEL_HASH_LEVELS: usize = 4;

pub(crate) fn data_root<'a>(schema: &SchemaRef, root: &'a NodeRef) -> Result<&'a NodeRef> {
    if schema.has_length_mixin() {
        root.left().ok_or(SszError::InvalidGIndex(GIndex::ROOT))
    } else {
        Ok(root)
    }
}

pub(crate) fn read_length(root: &NodeRef) -> Result<usize> {
    let chunk = node::get(root, LENGTH_GINDEX)?
        .chunk()
        .ok_or(SszError::InvalidGIndex(LENGTH_GINDEX))?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&chunk[..8]);
    usize::try_from(u64::from_le_bytes(buf)).map_err(|_| SszError::InvalidGIndex(LENGTH_GINDEX))
}

pub(crate) fn chunk_at(data_root: &NodeRef, depth: usize, chunk: usize) -> Result<&B256> {
    let gindex = GIndex::from_depth_index(depth, chunk as u64);
    node::get(data_root, gindex)?
        .chunk()
        .ok_or(SszError::InvalidGIndex(gindex))
}

pub(crate) fn read_slot(data_root: &NodeRef, depth: usize, slot: Slot<'_>) -> Result<Element> {
    match slot {
        Slot::Packed { kind, chunk, offset } => {
            let bytes = chunk_at(data_root, depth, chunk)?;
            Ok(Element::Value(kind.read_from_chunk(bytes, offset)?))
        }
        Slot::Bit { chunk, bit } => {
            let bytes = chunk_at(data_root, depth, chunk)?;
            Ok(Element::Value(Value::Bool((bytes[bit / 8] >> (bit % 8)) & 1 == 1)))
        }
        Slot::Subtree { schema, chunk } => {
            let gindex = GIndex::from_depth_index(depth, chunk as u64);
            let subtree = node::get(data_root, gindex)?;
            match schema.primitive_kind() {
                Some(kind) => {
                    let bytes = subtree.chunk().ok_or(SszError::InvalidGIndex(gindex))?;
                    Ok(Element::Value(kind.read_from_chunk(bytes, 0)?))
                }
                None => Ok(Element::View(View::new_unchecked(schema.clone(), subtree.clone()))),
            }
        }
    }
}

impl PartialEq for View {
    fn eq(&self, other: &Self) -> bool {
        self.hash_tree_root() == other.hash_tree_root()
    }
}

impl Eq for View {}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("schema", &format_args!("{}", self.schema))
            .field("root", &self.hash_tree_root())
            .finish()
    }
}

impl From<View> for Element {
    fn from(view: View) -> Self {
        Self::View(view)
    }
}

impl From<Value> for Element {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

macro_rules! impl_element_from_primitive {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Element {
                fn from(v: $ty) -> Self {
                    Self::Value(Value::from(v))
                }
            }
        )+
    };
}

impl_element_from_primitive!(bool, u8, u16, u32, u64, U256, Bytes);

impl<const N: usize> From<FixedBytes<N>> for Element {
    fn from(v: FixedBytes<N>) -> Self {
        Self::Value(Value::from(v))
    }
}

//! Schemas describe the shape of SSZ types.
//!
//! A schema is a type descriptor, not a value: it is built once, shared through a
//! [`SchemaRef`] by every value of its type, and answers all layout questions
//! (fixed or variable size, chunk count, tree depth, default value) without looking
//! at any particular value.
//!
//! # Tree layout
//!
//! | Kind        | Chunks                                   | Root                              |
//! |-------------|------------------------------------------|-----------------------------------|
//! | primitive   | 1                                        | the chunk itself                  |
//! | container   | one subtree per field                    | data tree root                    |
//! | vector      | packed elements, or one subtree each     | data tree root                    |
//! | list        | as vector, sized for `max_length`        | `hash(data root, length chunk)`   |
//! | bitvector   | 256 bits per chunk                       | data tree root                    |
//! | bitlist     | 256 bits per chunk, sized for max length | `hash(data root, length chunk)`   |
//!
//! The data tree always has `tree_depth = ceil(log2(chunk_count))` levels, padded
//! with zero subtrees up to the next power of two.

mod build;

use std::{fmt, sync::Arc};

use crate::{
    gindex::ceil_log2, hash::BYTES_PER_CHUNK, node::NodeRef, primitive::PrimitiveKind,
    BYTES_PER_LENGTH_OFFSET,
};

/// Shared handle to an immutable schema.
pub type SchemaRef = Arc<Schema>;

/// Number of bits packed into one chunk of a bitvector or bitlist.
pub const BITS_PER_CHUNK: usize = BYTES_PER_CHUNK * 8;

/// Describes a logical SSZ type.
#[derive(Debug)]
pub struct Schema {
    kind: SchemaKind,
    chunk_count: usize,
    default_tree: NodeRef,
}

/// The composite kinds SSZ defines.
#[derive(Debug, PartialEq, Eq)]
pub enum SchemaKind {
    Primitive(PrimitiveKind),
    Container(ContainerSchema),
    /// Fixed number of elements.
    Vector(CollectionSchema),
    /// Variable number of elements, bounded by a maximum.
    List(CollectionSchema),
    /// Fixed number of bits.
    Bitvector(usize),
    /// Variable number of bits, bounded by a maximum.
    Bitlist(usize),
}

/// Ordered, named fields of a container.
#[derive(Debug, PartialEq, Eq)]
pub struct ContainerSchema {
    name: String,
    fields: Vec<Field>,
}

/// A named field of a container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    name: String,
    schema: SchemaRef,
}

/// Element schema and length (vector) or maximum length (list).
#[derive(Debug, PartialEq, Eq)]
pub struct CollectionSchema {
    element: SchemaRef,
    limit: usize,
}

/// What sits at a position of a composite: a packed primitive, a bit, or a subtree.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Slot<'a> {
    /// A primitive packed into the chunk at `chunk`, starting at byte `offset`.
    Packed {
        kind: PrimitiveKind,
        chunk: usize,
        offset: usize,
    },
    /// Bit `bit` of chunk `chunk`.
    Bit { chunk: usize, bit: usize },
    /// A subtree of its own at chunk position `chunk`.
    Subtree { schema: &'a SchemaRef, chunk: usize },
}

impl Schema {
    /// The kind of this schema.
    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    /// Whether every value of this type encodes to the same number of bytes.
    pub fn is_fixed_size(&self) -> bool {
        match &self.kind {
            SchemaKind::Primitive(_) | SchemaKind::Bitvector(_) => true,
            SchemaKind::Container(container) => {
                container.fields.iter().all(|f| f.schema.is_fixed_size())
            }
            SchemaKind::Vector(vector) => vector.element.is_fixed_size(),
            SchemaKind::List(_) | SchemaKind::Bitlist(_) => false,
        }
    }

    /// Encoded size in bytes, or `None` for variable-size types.
    pub fn fixed_size(&self) -> Option<usize> {
        match &self.kind {
            SchemaKind::Primitive(kind) => Some(kind.size()),
            SchemaKind::Container(container) => container
                .fields
                .iter()
                .map(|f| f.schema.fixed_size())
                .sum::<Option<usize>>(),
            SchemaKind::Vector(vector) => vector
                .element
                .fixed_size()
                .and_then(|size| size.checked_mul(vector.limit)),
            SchemaKind::Bitvector(bits) => Some(bits.div_ceil(8)),
            SchemaKind::List(_) | SchemaKind::Bitlist(_) => None,
        }
    }

    /// Bytes this type takes in the fixed part of an enclosing composite: its own
    /// size when fixed, otherwise one offset.
    pub fn fixed_part_len(&self) -> usize {
        self.fixed_size().unwrap_or(BYTES_PER_LENGTH_OFFSET)
    }

    /// Number of 32-byte leaves of the data tree.
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Depth of the data tree, `ceil(log2(chunk_count))`. Lists and bitlists add one
    /// more level above it for the length mix-in.
    pub fn tree_depth(&self) -> usize {
        ceil_log2(self.chunk_count)
    }

    /// Whether the root mixes in a length (lists and bitlists).
    pub fn has_length_mixin(&self) -> bool {
        matches!(self.kind, SchemaKind::List(_) | SchemaKind::Bitlist(_))
    }

    /// Number of logical elements stored per chunk.
    pub fn elements_per_chunk(&self) -> usize {
        match &self.kind {
            SchemaKind::Vector(c) | SchemaKind::List(c) => match c.element.primitive_kind() {
                Some(kind) => kind.elements_per_chunk(),
                None => 1,
            },
            SchemaKind::Bitvector(_) | SchemaKind::Bitlist(_) => BITS_PER_CHUNK,
            SchemaKind::Primitive(_) | SchemaKind::Container(_) => 1,
        }
    }

    /// The tree of the canonical default value: zeros, empty lists, and containers of
    /// defaults.
    pub fn default_tree(&self) -> NodeRef {
        self.default_tree.clone()
    }

    /// The primitive kind, if this is a primitive schema.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.kind {
            SchemaKind::Primitive(kind) => Some(kind),
            _ => None,
        }
    }

    /// Container details, if this is a container schema.
    pub fn as_container(&self) -> Option<&ContainerSchema> {
        match &self.kind {
            SchemaKind::Container(container) => Some(container),
            _ => None,
        }
    }

    /// Element schema of a vector or list.
    pub fn element_schema(&self) -> Option<&SchemaRef> {
        match &self.kind {
            SchemaKind::Vector(c) | SchemaKind::List(c) => Some(&c.element),
            _ => None,
        }
    }

    /// Fixed length of a vector or bitvector.
    pub fn length(&self) -> Option<usize> {
        match &self.kind {
            SchemaKind::Vector(c) => Some(c.limit),
            SchemaKind::Bitvector(bits) => Some(*bits),
            _ => None,
        }
    }

    /// Maximum length of a list or bitlist.
    pub fn max_length(&self) -> Option<usize> {
        match &self.kind {
            SchemaKind::List(c) => Some(c.limit),
            SchemaKind::Bitlist(bits) => Some(*bits),
            _ => None,
        }
    }

    /// Whether this schema has child positions that can be indexed.
    pub fn is_composite(&self) -> bool {
        !matches!(self.kind, SchemaKind::Primitive(_))
    }

    /// Where position `index` lives in the data tree. Bounds are the caller's concern.
    pub(crate) fn slot(&self, index: usize) -> Option<Slot<'_>> {
        match &self.kind {
            SchemaKind::Primitive(_) => None,
            SchemaKind::Container(container) => container.fields.get(index).map(|field| {
                Slot::Subtree {
                    schema: &field.schema,
                    chunk: index,
                }
            }),
            SchemaKind::Vector(c) | SchemaKind::List(c) => match c.element.primitive_kind() {
                Some(kind) if kind.is_basic() => {
                    let per_chunk = kind.elements_per_chunk();
                    Some(Slot::Packed {
                        kind,
                        chunk: index / per_chunk,
                        offset: (index % per_chunk) * kind.size(),
                    })
                }
                _ => Some(Slot::Subtree {
                    schema: &c.element,
                    chunk: index,
                }),
            },
            SchemaKind::Bitvector(_) | SchemaKind::Bitlist(_) => Some(Slot::Bit {
                chunk: index / BITS_PER_CHUNK,
                bit: index % BITS_PER_CHUNK,
            }),
        }
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for Schema {}

impl ContainerSchema {
    /// Container name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Field at `index`.
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Position of the field called `name`.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

impl CollectionSchema {
    /// Element schema.
    pub fn element(&self) -> &SchemaRef {
        &self.element
    }

    /// Exact length of a vector, maximum length of a list.
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Field {
    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field schema.
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SchemaKind::Primitive(kind) => write!(f, "{kind}"),
            SchemaKind::Container(container) => f.write_str(&container.name),
            SchemaKind::Vector(c) => write!(f, "Vector[{}, {}]", c.element, c.limit),
            SchemaKind::List(c) => write!(f, "List[{}, {}]", c.element, c.limit),
            SchemaKind::Bitvector(bits) => write!(f, "Bitvector[{bits}]"),
            SchemaKind::Bitlist(bits) => write!(f, "Bitlist[{bits}]"),
        }
    }
}

/// Whether two schema handles describe the same type.
pub fn same_schema(a: &SchemaRef, b: &SchemaRef) -> bool {
    Arc::ptr_eq(a, b) || a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::zero_hash;

    fn checkpoint() -> SchemaRef {
        Schema::container(
            "Checkpoint",
            vec![("epoch", Schema::uint64()), ("root", Schema::bytes32())],
        )
        .unwrap()
    }

    #[test]
    fn test_primitive_layout() {
        let schema = Schema::uint64();
        assert!(schema.is_fixed_size());
        assert_eq!(schema.fixed_size(), Some(8));
        assert_eq!(schema.chunk_count(), 1);
        assert_eq!(schema.tree_depth(), 0);
        assert_eq!(schema.default_tree().hash(), zero_hash(0));
    }

    #[test]
    fn test_container_layout() {
        let schema = checkpoint();
        assert!(schema.is_fixed_size());
        assert_eq!(schema.fixed_size(), Some(40));
        assert_eq!(schema.chunk_count(), 2);
        assert_eq!(schema.tree_depth(), 1);
        let container = schema.as_container().unwrap();
        assert_eq!(container.field_index("root"), Some(1));
        assert_eq!(container.field(0).unwrap().name(), "epoch");
        assert_eq!(schema.default_tree().hash(), zero_hash(1));
    }

    #[test]
    fn test_packed_list_layout() {
        let schema = Schema::list(Schema::uint64(), 1 << 40).unwrap();
        assert!(!schema.is_fixed_size());
        assert_eq!(schema.fixed_size(), None);
        assert_eq!(schema.fixed_part_len(), 4);
        assert_eq!(schema.elements_per_chunk(), 4);
        assert_eq!(schema.chunk_count(), 1 << 38);
        assert_eq!(schema.tree_depth(), 38);
        assert!(schema.has_length_mixin());
    }

    #[test]
    fn test_composite_vector_layout() {
        let schema = Schema::vector(checkpoint(), 5).unwrap();
        assert_eq!(schema.fixed_size(), Some(200));
        assert_eq!(schema.chunk_count(), 5);
        assert_eq!(schema.tree_depth(), 3);
    }

    #[test]
    fn test_bit_collections() {
        let bits = Schema::bitvector(512).unwrap();
        assert_eq!(bits.fixed_size(), Some(64));
        assert_eq!(bits.chunk_count(), 2);
        let list = Schema::bitlist(2048).unwrap();
        assert_eq!(list.chunk_count(), 8);
        assert_eq!(list.tree_depth(), 3);
    }

    #[test]
    fn test_variable_container() {
        let schema = Schema::container(
            "Body",
            vec![
                ("slot", Schema::uint64()),
                ("data", Schema::byte_list(32).unwrap()),
            ],
        )
        .unwrap();
        assert!(!schema.is_fixed_size());
        assert_eq!(schema.fixed_part_len(), 4);
    }

    #[test]
    fn test_slot_positions() {
        let schema = Schema::list(Schema::uint16(), 100).unwrap();
        match schema.slot(17) {
            Some(Slot::Packed { chunk, offset, .. }) => {
                assert_eq!(chunk, 1);
                assert_eq!(offset, 2);
            }
            other => panic!("unexpected slot {other:?}"),
        }
        let bits = Schema::bitlist(1000).unwrap();
        assert!(matches!(bits.slot(300), Some(Slot::Bit { chunk: 1, bit: 44 })));
    }

    #[test]
    fn test_structural_equality() {
        assert!(same_schema(&checkpoint(), &checkpoint()));
        assert_ne!(*Schema::uint64(), *Schema::uint32());
        assert_eq!(checkpoint().to_string(), "Checkpoint");
        assert_eq!(
            Schema::list(Schema::uint8(), 4).unwrap().to_string(),
            "List[uint8, 4]"
        );
    }
}

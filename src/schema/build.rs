//! Schema constructors, validation, and default trees.

use std::{
    collections::HashSet,
    sync::{Arc, LazyLock},
};
use tracing::debug;

use super::{
    CollectionSchema, ContainerSchema, Field, Schema, SchemaKind, SchemaRef, BITS_PER_CHUNK,
};
use crate::{
    error::Result,
    gindex::ceil_log2,
    hash::{BYTES_PER_CHUNK, MAX_TREE_DEPTH},
    node::{self, zero_node, Node, NodeRef},
    primitive::PrimitiveKind,
    SszError,
};

macro_rules! primitive_schemas {
    ($($(#[$doc:meta])* $fn_name:ident => $kind:expr),+ $(,)?) => {
        impl Schema {
            $(
                $(#[$doc])*
                pub fn $fn_name() -> SchemaRef {
                    static SCHEMA: LazyLock<SchemaRef> =
                        LazyLock::new(|| Schema::primitive_unchecked($kind));
                    SCHEMA.clone()
                }
            )+
        }
    };
}

primitive_schemas! {
    /// `boolean`
    boolean => PrimitiveKind::Bool,
    /// `uint8`, also used as `byte`
    uint8 => PrimitiveKind::Uint8,
    /// `uint16`
    uint16 => PrimitiveKind::Uint16,
    /// `uint32`
    uint32 => PrimitiveKind::Uint32,
    /// `uint64`
    uint64 => PrimitiveKind::Uint64,
    /// `uint256`
    uint256 => PrimitiveKind::Uint256,
    /// `Bytes4`, e.g. fork versions
    bytes4 => PrimitiveKind::Bytes(4),
    /// `Bytes20`, e.g. execution addresses
    bytes20 => PrimitiveKind::Bytes(20),
    /// `Bytes32`, e.g. roots
    bytes32 => PrimitiveKind::Bytes(32),
}

impl Schema {
    fn primitive_unchecked(kind: PrimitiveKind) -> SchemaRef {
        Arc::new(Self {
            kind: SchemaKind::Primitive(kind),
            chunk_count: 1,
            default_tree: zero_node(0),
        })
    }

    /// A fixed byte string of `len` bytes, `1 <= len <= 32`.
    pub fn bytes(len: usize) -> Result<SchemaRef> {
        if len == 0 || len > BYTES_PER_CHUNK {
            return Err(invalid(format!("byte string length {len} outside 1..=32")));
        }
        Ok(Self::primitive_unchecked(PrimitiveKind::Bytes(len)))
    }

    /// A container with the given ordered `(name, schema)` fields.
    pub fn container<N: Into<String>>(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (N, SchemaRef)>,
    ) -> Result<SchemaRef> {
        let name = name.into();
        let fields: Vec<Field> = fields
            .into_iter()
            .map(|(field_name, schema)| Field {
                name: field_name.into(),
                schema,
            })
            .collect();

        if fields.is_empty() {
            return Err(invalid(format!("container {name} has no fields")));
        }
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(invalid(format!(
                    "container {name} declares field {} twice",
                    field.name
                )));
            }
        }

        fields
            .iter()
            .try_fold(0usize, |acc, f| acc.checked_add(f.schema.fixed_part_len()))
            .ok_or_else(|| invalid(format!("container {name} has an unaddressable fixed part")))?;

        let chunk_count = fields.len();
        check_depth(&name, chunk_count)?;
        let depth = ceil_log2(chunk_count);
        let defaults = fields.iter().map(|f| f.schema.default_tree()).collect();
        let default_tree = node::from_chunks(depth, defaults)?;

        debug!(target: "ssz::schema", %name, fields = chunk_count, "Built container schema");
        Ok(Arc::new(Self {
            kind: SchemaKind::Container(ContainerSchema { name, fields }),
            chunk_count,
            default_tree,
        }))
    }

    /// A vector of exactly `length` elements.
    pub fn vector(element: SchemaRef, length: usize) -> Result<SchemaRef> {
        if length == 0 {
            return Err(invalid(format!("Vector[{element}, 0] has no elements")));
        }
        if element.fixed_part_len().checked_mul(length).is_none() {
            return Err(invalid(format!("Vector[{element}, {length}] encoding overflows")));
        }
        let chunk_count = collection_chunks(&element, length)?;
        let label = format!("Vector[{element}, {length}]");
        check_depth(&label, chunk_count)?;
        let depth = ceil_log2(chunk_count);

        let default_tree = if element.primitive_kind().is_some() {
            zero_node(depth)
        } else {
            node::fill(depth, length, &element.default_tree())
        };

        Ok(Arc::new(Self {
            kind: SchemaKind::Vector(CollectionSchema {
                element,
                limit: length,
            }),
            chunk_count,
            default_tree,
        }))
    }

    /// A list of at most `max_length` elements.
    pub fn list(element: SchemaRef, max_length: usize) -> Result<SchemaRef> {
        let chunk_count = collection_chunks(&element, max_length)?;
        check_depth(&format!("List[{element}, {max_length}]"), chunk_count)?;
        let depth = ceil_log2(chunk_count);

        Ok(Arc::new(Self {
            kind: SchemaKind::List(CollectionSchema {
                element,
                limit: max_length,
            }),
            chunk_count,
            default_tree: empty_list_tree(depth),
        }))
    }

    /// A vector of `length` bits.
    pub fn bitvector(length: usize) -> Result<SchemaRef> {
        if length == 0 {
            return Err(invalid("Bitvector[0] has no bits".to_string()));
        }
        let chunk_count = length.div_ceil(BITS_PER_CHUNK);
        check_depth(&format!("Bitvector[{length}]"), chunk_count)?;
        Ok(Arc::new(Self {
            kind: SchemaKind::Bitvector(length),
            chunk_count,
            default_tree: zero_node(ceil_log2(chunk_count)),
        }))
    }

    /// A list of at most `max_length` bits.
    pub fn bitlist(max_length: usize) -> Result<SchemaRef> {
        let chunk_count = max_length.div_ceil(BITS_PER_CHUNK);
        check_depth(&format!("Bitlist[{max_length}]"), chunk_count)?;
        Ok(Arc::new(Self {
            kind: SchemaKind::Bitlist(max_length),
            chunk_count,
            default_tree: empty_list_tree(ceil_log2(chunk_count)),
        }))
    }

    /// `ByteVector[length]`, a vector of `uint8`.
    pub fn byte_vector(length: usize) -> Result<SchemaRef> {
        Self::vector(Self::uint8(), length)
    }

    /// `ByteList[max_length]`, a list of `uint8`.
    pub fn byte_list(max_length: usize) -> Result<SchemaRef> {
        Self::list(Self::uint8(), max_length)
    }

    /// A successor container: this container's fields followed by `extra` fields.
    ///
    /// Fork upgrades of consensus objects only ever append fields, so a value of
    /// the successor can be built from a value of this schema by keeping its field
    /// subtrees and defaulting the new ones.
    pub fn extend<N: Into<String>>(
        &self,
        name: impl Into<String>,
        extra: impl IntoIterator<Item = (N, SchemaRef)>,
    ) -> Result<SchemaRef> {
        let Some(container) = self.as_container() else {
            return Err(SszError::UnsupportedOperation {
                operation: "extend",
                schema: self.to_string(),
            });
        };
        let fields = container
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.schema.clone()))
            .chain(extra.into_iter().map(|(n, s)| (n.into(), s)));
        Self::container(name, fields)
    }
}

fn invalid(reason: String) -> SszError {
    SszError::InvalidSchema(reason)
}

fn collection_chunks(element: &SchemaRef, limit: usize) -> Result<usize> {
    match element.primitive_kind() {
        Some(kind) if kind.is_basic() => limit
            .checked_mul(kind.size())
            .map(|bytes| bytes.div_ceil(BYTES_PER_CHUNK))
            .ok_or_else(|| invalid(format!("collection of {limit} {kind} overflows"))),
        _ => Ok(limit),
    }
}

fn check_depth(label: &str, chunk_count: usize) -> Result<()> {
    let depth = ceil_log2(chunk_count);
    if depth > MAX_TREE_DEPTH {
        return Err(invalid(format!(
            "{label} needs a tree of depth {depth}, deeper than {MAX_TREE_DEPTH}"
        )));
    }
    Ok(())
}

/// Root of an empty list: a zero data tree next to a zero length chunk.
fn empty_list_tree(depth: usize) -> NodeRef {
    Node::branch(zero_node(depth), zero_node(0))
}

use crate::{
    error::Result,
    gindex::GIndex,
    hash::BYTES_PER_CHUNK,
    node::{self, NodeRef},
    schema::{SchemaKind, SchemaRef},
    view::{data_root, read_length},
    SszError,
};

/// Append the encoding of the value rooted at `root` to `out`.
pub(super) fn encode(schema: &SchemaRef, root: &NodeRef, out: &mut Vec<u8>) -> Result<()> {
    let depth = schema.tree_depth();
    match schema.kind() {
        SchemaKind::Primitive(kind) => {
            let chunk = root.chunk().ok_or(SszError::InvalidGIndex(GIndex::ROOT))?;
            let value = kind.read_from_chunk(chunk, 0)?;
            kind.encode(&value, out)
        }
        SchemaKind::Container(container) => {
            let children = node::collect(root, depth, container.field_count())?;
            let schemas = container.fields().iter().map(|field| field.schema());
            encode_sequence(schemas.zip(children), out)
        }
        SchemaKind::Vector(collection) | SchemaKind::List(collection) => {
            let count = match schema.length() {
                Some(length) => length,
                None => read_length(root)?,
            };
            let data = data_root(schema, root)?;
            let element = collection.element();
            match element.primitive_kind() {
                Some(kind) if kind.is_basic() => {
                    write_chunks(data, depth, count * kind.size(), out)
                }
                Some(kind) => {
                    for leaf in node::collect(data, depth, count)? {
                        let chunk = leaf.chunk().ok_or(SszError::InvalidGIndex(GIndex::ROOT))?;
                        out.extend_from_slice(&chunk[..kind.size()]);
                    }
                    Ok(())
                }
                None => {
                    let children = node::collect(data, depth, count)?;
                    encode_sequence(std::iter::repeat(element).zip(children), out)
                }
            }
        }
        SchemaKind::Bitvector(bits) => write_chunks(root, depth, bits.div_ceil(8), out),
        SchemaKind::Bitlist(_) => {
            let len = read_length(root)?;
            let start = out.len();
            write_chunks(data_root(schema, root)?, depth, len.div_ceil(8), out)?;
            if len % 8 == 0 {
                out.push(1);
            } else {
                out[start + len / 8] |= 1 << (len % 8);
            }
            Ok(())
        }
    }
}

/// Fixed parts inline or as offsets, then the variable parts in the same order.
fn encode_sequence<'a, I>(parts: I, out: &mut Vec<u8>) -> Result<()>
where
    I: IntoIterator<Item = (&'a SchemaRef, &'a NodeRef)>,
{
    let parts: Vec<_> = parts.into_iter().collect();
    let fixed_len: usize = parts.iter().map(|(schema, _)| schema.fixed_part_len()).sum();
    let mut variable = Vec::new();
    for (schema, root) in parts {
        if schema.is_fixed_size() {
            encode(schema, root, out)?;
        } else {
            let offset = fixed_len + variable.len();
            let offset = u32::try_from(offset).map_err(|_| SszError::OffsetOutOfBounds(offset))?;
            out.extend_from_slice(&offset.to_le_bytes());
            encode(schema, root, &mut variable)?;
        }
    }
    out.extend_from_slice(&variable);
    Ok(())
}

/// The first `len` bytes of the leaves of a data tree.
fn write_chunks(data: &NodeRef, depth: usize, len: usize, out: &mut Vec<u8>) -> Result<()> {
    let mut remaining = len;
    for leaf in node::collect(data, depth, len.div_ceil(BYTES_PER_CHUNK))? {
        let chunk = leaf.chunk().ok_or(SszError::InvalidGIndex(GIndex::ROOT))?;
        let take = remaining.min(BYTES_PER_CHUNK);
        out.extend_from_slice(&chunk[..take]);
        remaining -= take;
    }
    Ok(())
}

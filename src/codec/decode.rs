use crate::{
    error::Result,
    merkle::{length_chunk, pack},
    node::{self, Node, NodeRef},
    primitive::PrimitiveKind,
    schema::{SchemaKind, SchemaRef},
    SszError,
};

use super::BYTES_PER_LENGTH_OFFSET;

/// Validate `bytes` against `schema` and build its tree.
pub(super) fn decode(schema: &SchemaRef, bytes: &[u8]) -> Result<NodeRef> {
    let depth = schema.tree_depth();
    match schema.kind() {
        SchemaKind::Primitive(kind) => {
            let value = kind.decode(bytes)?;
            Ok(Node::leaf(kind.to_chunk(&value)?))
        }
        SchemaKind::Container(container) => {
            let schemas: Vec<&SchemaRef> = container.fields().iter().map(|f| f.schema()).collect();
            let parts = split_sequence(&schemas, bytes)?;
            let children = schemas
                .iter()
                .zip(parts)
                .map(|(schema, part)| decode(schema, part))
                .collect::<Result<Vec<_>>>()?;
            node::from_chunks(depth, children)
        }
        SchemaKind::Vector(collection) => {
            let element = collection.element();
            let length = collection.limit();
            if let Some(size) = element.fixed_size() {
                let expected = size * length;
                if bytes.len() != expected {
                    return Err(SszError::InvalidByteLength {
                        expected,
                        actual: bytes.len(),
                    });
                }
                decode_fixed_elements(element, size, depth, bytes)
            } else {
                let schemas = vec![element; length];
                let parts = split_sequence(&schemas, bytes)?;
                decode_variable_elements(element, depth, parts)
            }
        }
        SchemaKind::List(collection) => {
            let element = collection.element();
            let max = collection.limit();
            let (data, count) = if let Some(size) = element.fixed_size() {
                if bytes.len() % size != 0 {
                    return Err(SszError::InvalidListFixedBytesLen {
                        len: bytes.len(),
                        element_size: size,
                    });
                }
                let count = bytes.len() / size;
                check_count(count, max)?;
                (decode_fixed_elements(element, size, depth, bytes)?, count)
            } else {
                let count = variable_element_count(bytes)?;
                check_count(count, max)?;
                let schemas = vec![element; count];
                let parts = split_sequence(&schemas, bytes)?;
                (decode_variable_elements(element, depth, parts)?, count)
            };
            Ok(Node::branch(data, Node::leaf(length_chunk(count))))
        }
        SchemaKind::Bitvector(bits) => {
            let expected = bits.div_ceil(8);
            if bytes.len() != expected {
                return Err(SszError::InvalidByteLength {
                    expected,
                    actual: bytes.len(),
                });
            }
            let used = bits % 8;
            if used != 0 && bytes[expected - 1] >> used != 0 {
                return Err(SszError::InvalidBitvectorPadding);
            }
            leaves(depth, bytes)
        }
        SchemaKind::Bitlist(max) => {
            let last = match bytes.last() {
                Some(&last) if last != 0 => last,
                _ => return Err(SszError::MissingBitlistDelimiter),
            };
            let delimiter = 7 - last.leading_zeros() as usize;
            let len = (bytes.len() - 1) * 8 + delimiter;
            check_count(len, *max)?;

            let mut data = bytes.to_vec();
            if let Some(byte) = data.last_mut() {
                *byte &= !(1 << delimiter);
            }
            data.truncate(len.div_ceil(8));
            let root = leaves(depth, &data)?;
            Ok(Node::branch(root, Node::leaf(length_chunk(len))))
        }
    }
}

fn check_count(count: usize, max: usize) -> Result<()> {
    if count > max {
        return Err(SszError::TooManyElements { count, max });
    }
    Ok(())
}

/// Data tree holding `bytes` packed into chunks.
fn leaves(depth: usize, bytes: &[u8]) -> Result<NodeRef> {
    node::from_chunks(depth, pack(bytes).into_iter().map(Node::leaf).collect())
}

fn decode_fixed_elements(
    element: &SchemaRef,
    size: usize,
    depth: usize,
    bytes: &[u8],
) -> Result<NodeRef> {
    match element.primitive_kind() {
        Some(kind) if kind.is_basic() => {
            if kind == PrimitiveKind::Bool {
                if let Some(&bad) = bytes.iter().find(|&&b| b > 1) {
                    return Err(SszError::InvalidBoolean(bad));
                }
            }
            leaves(depth, bytes)
        }
        _ => {
            let children = bytes
                .chunks_exact(size)
                .map(|part| decode(element, part))
                .collect::<Result<Vec<_>>>()?;
            node::from_chunks(depth, children)
        }
    }
}

fn decode_variable_elements(
    element: &SchemaRef,
    depth: usize,
    parts: Vec<&[u8]>,
) -> Result<NodeRef> {
    let children = parts
        .into_iter()
        .map(|part| decode(element, part))
        .collect::<Result<Vec<_>>>()?;
    node::from_chunks(depth, children)
}

/// Number of elements of a list of variable-size elements, read from its first offset.
fn variable_element_count(bytes: &[u8]) -> Result<usize> {
    if bytes.is_empty() {
        return Ok(0);
    }
    let first = read_offset(bytes, 0)?;
    if first == 0 || first % BYTES_PER_LENGTH_OFFSET != 0 {
        return Err(SszError::InvalidListFixedBytesLen {
            len: first,
            element_size: BYTES_PER_LENGTH_OFFSET,
        });
    }
    if first > bytes.len() {
        return Err(SszError::OffsetOutOfBounds(first));
    }
    Ok(first / BYTES_PER_LENGTH_OFFSET)
}

fn read_offset(bytes: &[u8], at: usize) -> Result<usize> {
    let raw = bytes
        .get(at..at + BYTES_PER_LENGTH_OFFSET)
        .ok_or(SszError::FixedPartTooShort {
            expected: at + BYTES_PER_LENGTH_OFFSET,
            actual: bytes.len(),
        })?;
    let mut buf = [0u8; BYTES_PER_LENGTH_OFFSET];
    buf.copy_from_slice(raw);
    Ok(u32::from_le_bytes(buf) as usize)
}

/// Split the encoding of a sequence of `schemas` into one slice per element.
///
/// The first offset must point exactly at the end of the fixed part, offsets must
/// not decrease, and none may point past the end of the input.
fn split_sequence<'b>(schemas: &[&SchemaRef], bytes: &'b [u8]) -> Result<Vec<&'b [u8]>> {
    let fixed_len: usize = schemas.iter().map(|s| s.fixed_part_len()).sum();
    if bytes.len() < fixed_len {
        return Err(SszError::FixedPartTooShort {
            expected: fixed_len,
            actual: bytes.len(),
        });
    }

    // Fixed parts are sliced directly; variable ones are resolved once all
    // offsets are known.
    let mut parts: Vec<&[u8]> = Vec::with_capacity(schemas.len());
    let mut offsets: Vec<(usize, usize)> = Vec::new();
    let mut position = 0;
    for (i, schema) in schemas.iter().enumerate() {
        match schema.fixed_size() {
            Some(size) => {
                parts.push(&bytes[position..position + size]);
                position += size;
            }
            None => {
                let offset = read_offset(bytes, position)?;
                if offset > bytes.len() {
                    return Err(SszError::OffsetOutOfBounds(offset));
                }
                match offsets.last() {
                    None if offset < fixed_len => {
                        return Err(SszError::OffsetIntoFixedPortion(offset))
                    }
                    None if offset > fixed_len => {
                        return Err(SszError::OffsetSkipsVariableBytes(offset))
                    }
                    Some(&(_, previous)) if offset < previous => {
                        return Err(SszError::OffsetsAreDecreasing(offset))
                    }
                    _ => {}
                }
                offsets.push((i, offset));
                parts.push(&[]);
                position += BYTES_PER_LENGTH_OFFSET;
            }
        }
    }

    if offsets.is_empty() && bytes.len() != fixed_len {
        return Err(SszError::InvalidByteLength {
            expected: fixed_len,
            actual: bytes.len(),
        });
    }

    for (n, &(index, start)) in offsets.iter().enumerate() {
        let end = offsets.get(n + 1).map_or(bytes.len(), |&(_, next)| next);
        parts[index] = &bytes[start..end];
    }
    Ok(parts)
}

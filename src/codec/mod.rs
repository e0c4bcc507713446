//! SSZ serialization straight to and from trees.
//!
//! Encoding walks the tree of a [`View`]; decoding validates the input and builds the
//! tree bottom-up without an intermediate value graph. Decoding never accepts part
//! of a malformed input: every error is returned before a root is produced.

mod decode;
mod encode;

use tracing::debug;

use crate::{error::Result, schema::SchemaRef, view::View};

/// Size of an offset in the fixed part of a variable-size composite.
pub const BYTES_PER_LENGTH_OFFSET: usize = 4;

/// SSZ encoding of `view`.
///
/// # Panics
///
/// Panics if the tree behind `view` does not have the shape of its schema. Views
/// built through this crate always do.
pub fn serialize(view: &View) -> Vec<u8> {
    let mut out = Vec::new();
    if let Err(err) = encode::encode(view.schema(), view.root(), &mut out) {
        panic!("tree does not match schema {}: {err}", view.schema());
    }
    out
}

/// Decode `bytes` as a value of `schema`.
pub fn deserialize(schema: &SchemaRef, bytes: &[u8]) -> Result<View> {
    match decode::decode(schema, bytes) {
        Ok(root) => Ok(View::new_unchecked(schema.clone(), root)),
        Err(err) => {
            debug!(
                target: "ssz::decode",
                %schema,
                len = bytes.len(),
                %err,
                "Rejected malformed input"
            );
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Schema, SszError, Value};
    use alloy_primitives::B256;

    fn body_schema() -> SchemaRef {
        Schema::container(
            "Body",
            vec![
                ("slot", Schema::uint64()),
                ("data", Schema::byte_list(64).unwrap()),
                ("flag", Schema::boolean()),
                ("roots", Schema::list(Schema::bytes32(), 4).unwrap()),
            ],
        )
        .unwrap()
    }

    fn sample_body() -> View {
        let schema = body_schema();
        let mut data = View::default_for(schema.as_container().unwrap().field(1).unwrap().schema())
            .to_mutable();
        for b in [0xaa, 0xbb, 0xcc] {
            data.append(b as u8).unwrap();
        }
        let roots_schema = schema.as_container().unwrap().field(3).unwrap().schema();
        let mut roots = View::default_for(roots_schema).to_mutable();
        roots.append(B256::repeat_byte(7)).unwrap();

        let mut m = View::default_for(&schema).to_mutable();
        m.set(0, 42u64).unwrap();
        m.set(1, data.commit().unwrap()).unwrap();
        m.set(2, true).unwrap();
        m.set(3, roots.commit().unwrap()).unwrap();
        m.commit().unwrap()
    }

    #[test]
    fn test_variable_container_layout() {
        let bytes = serialize(&sample_body());
        // Fixed part: slot (8) + offset (4) + flag (1) + offset (4) = 17.
        assert_eq!(&bytes[..8], &42u64.to_le_bytes());
        assert_eq!(&bytes[8..12], &17u32.to_le_bytes());
        assert_eq!(bytes[12], 1);
        assert_eq!(&bytes[13..17], &20u32.to_le_bytes());
        assert_eq!(&bytes[17..20], &[0xaa, 0xbb, 0xcc]);
        assert_eq!(&bytes[20..], B256::repeat_byte(7).as_slice());
    }

    #[test]
    fn test_round_trip() {
        let view = sample_body();
        let bytes = view.serialize();
        let decoded = deserialize(view.schema(), &bytes).unwrap();
        assert_eq!(decoded, view);
        assert_eq!(decoded.serialize(), bytes);
        assert_eq!(decoded.get_value(0).unwrap(), Value::Uint64(42));
    }

    #[test]
    fn test_first_offset_must_match_fixed_part() {
        let mut bytes = sample_body().serialize();
        bytes[8..12].copy_from_slice(&16u32.to_le_bytes());
        assert_eq!(
            deserialize(&body_schema(), &bytes).unwrap_err(),
            SszError::OffsetIntoFixedPortion(16)
        );
        bytes[8..12].copy_from_slice(&18u32.to_le_bytes());
        assert_eq!(
            deserialize(&body_schema(), &bytes).unwrap_err(),
            SszError::OffsetSkipsVariableBytes(18)
        );
    }

    #[test]
    fn test_decreasing_offsets_rejected() {
        let mut bytes = sample_body().serialize();
        bytes[13..17].copy_from_slice(&10u32.to_le_bytes());
        assert_eq!(
            deserialize(&body_schema(), &bytes).unwrap_err(),
            SszError::OffsetsAreDecreasing(10)
        );
        let len = bytes.len() as u32;
        bytes[13..17].copy_from_slice(&(len + 1).to_le_bytes());
        assert_eq!(
            deserialize(&body_schema(), &bytes).unwrap_err(),
            SszError::OffsetOutOfBounds(len as usize + 1)
        );
    }

    #[test]
    fn test_truncated_fixed_part_rejected() {
        let bytes = sample_body().serialize();
        assert_eq!(
            deserialize(&body_schema(), &bytes[..10]).unwrap_err(),
            SszError::FixedPartTooShort {
                expected: 17,
                actual: 10
            }
        );
    }

    #[test]
    fn test_fixed_container_length_checked() {
        let schema = Schema::container(
            "Checkpoint",
            vec![("epoch", Schema::uint64()), ("root", Schema::bytes32())],
        )
        .unwrap();
        assert_eq!(
            deserialize(&schema, &[0u8; 41]).unwrap_err(),
            SszError::InvalidByteLength {
                expected: 40,
                actual: 41
            }
        );
    }

    #[test]
    fn test_list_limits() {
        let schema = Schema::list(Schema::uint16(), 3).unwrap();
        assert_eq!(
            deserialize(&schema, &[0u8; 5]).unwrap_err(),
            SszError::InvalidListFixedBytesLen {
                len: 5,
                element_size: 2
            }
        );
        assert_eq!(
            deserialize(&schema, &[0u8; 8]).unwrap_err(),
            SszError::TooManyElements { count: 4, max: 3 }
        );
        let view = deserialize(&schema, &[1, 0, 2, 0]).unwrap();
        assert_eq!(view.len().unwrap(), 2);
        assert_eq!(view.get_value(1).unwrap(), Value::Uint16(2));
    }

    #[test]
    fn test_bit_collections() {
        let bits = Schema::bitvector(10).unwrap();
        let view = deserialize(&bits, &[0b0000_0001, 0b0000_0010]).unwrap();
        assert!(view.get_bit(9).unwrap());
        assert_eq!(
            deserialize(&bits, &[0, 0b0000_0100]).unwrap_err(),
            SszError::InvalidBitvectorPadding
        );

        let list = Schema::bitlist(16).unwrap();
        let view = deserialize(&list, &[0b0000_0101, 0b0000_0001]).unwrap();
        assert_eq!(view.len().unwrap(), 8);
        assert!(view.get_bit(2).unwrap());
        assert_eq!(view.serialize(), vec![0b0000_0101, 0b0000_0001]);
        assert_eq!(
            deserialize(&list, &[0b0000_0101, 0]).unwrap_err(),
            SszError::MissingBitlistDelimiter
        );
        assert_eq!(deserialize(&list, &[]).unwrap_err(), SszError::MissingBitlistDelimiter);
        assert_eq!(deserialize(&list, &[0, 0, 1]).unwrap().len().unwrap(), 16);
        assert_eq!(
            deserialize(&list, &[0, 0, 2]).unwrap_err(),
            SszError::TooManyElements { count: 17, max: 16 }
        );
    }

    #[test]
    fn test_list_of_variable_elements() {
        let inner = Schema::byte_list(8).unwrap();
        let schema = Schema::list(inner, 4).unwrap();
        // Two elements: [1, 2] and [].
        let bytes = [8, 0, 0, 0, 10, 0, 0, 0, 1, 2];
        let view = deserialize(&schema, &bytes).unwrap();
        assert_eq!(view.len().unwrap(), 2);
        assert_eq!(view.get_view(0).unwrap().len().unwrap(), 2);
        assert!(view.get_view(1).unwrap().is_empty().unwrap());
        assert_eq!(view.serialize(), bytes.to_vec());

        assert_eq!(
            deserialize(&schema, &[6, 0, 0, 0, 0, 0]).unwrap_err(),
            SszError::InvalidListFixedBytesLen {
                len: 6,
                element_size: BYTES_PER_LENGTH_OFFSET
            }
        );
        assert!(deserialize(&schema, &[]).unwrap().is_empty().unwrap());

        // Five empty elements in a list of at most four.
        let five: Vec<u8> = [20u8, 0, 0, 0].repeat(5);
        assert_eq!(
            deserialize(&schema, &five).unwrap_err(),
            SszError::TooManyElements { count: 5, max: 4 }
        );
    }

    #[test]
    fn test_bytes_vector_and_invalid_bool() {
        let schema = Schema::vector(Schema::bytes4(), 2).unwrap();
        let bytes = [1, 2, 3, 4, 5, 6, 7, 8];
        let view = deserialize(&schema, &bytes).unwrap();
        assert_eq!(view.serialize(), bytes.to_vec());

        let flags = Schema::vector(Schema::boolean(), 2).unwrap();
        assert_eq!(deserialize(&flags, &[1, 2]).unwrap_err(), SszError::InvalidBoolean(2));
    }
}

//! Property-based tests for the SSZ tree engine using proptest.

use std::sync::Arc;

use proptest::prelude::*;
use ssz_tree::{
    deserialize, merkle, node, GIndex, Schema, SchemaRef, SszError, View, B256,
};

// ============================================================================
// Schemas and strategies
// ============================================================================

const LIST_LIMIT: usize = 1024;

fn balances() -> SchemaRef {
    Schema::list(Schema::uint64(), LIST_LIMIT).unwrap()
}

fn record() -> SchemaRef {
    Schema::container(
        "Record",
        vec![
            ("id", Schema::uint32()),
            ("payload", Schema::byte_list(64).unwrap()),
            ("active", Schema::boolean()),
            ("roots", Schema::list(Schema::bytes32(), 8).unwrap()),
            ("bits", Schema::bitlist(100).unwrap()),
        ],
    )
    .unwrap()
}

fn arb_root() -> impl Strategy<Value = B256> {
    prop::array::uniform32(any::<u8>()).prop_map(B256::from)
}

fn arb_values(max_len: usize) -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(any::<u64>(), 0..max_len)
}

#[derive(Clone, Debug)]
struct RecordValue {
    id: u32,
    payload: Vec<u8>,
    active: bool,
    roots: Vec<B256>,
    bits: Vec<bool>,
}

fn arb_record() -> impl Strategy<Value = RecordValue> {
    (
        any::<u32>(),
        prop::collection::vec(any::<u8>(), 0..64),
        any::<bool>(),
        prop::collection::vec(arb_root(), 0..8),
        prop::collection::vec(any::<bool>(), 0..100),
    )
        .prop_map(|(id, payload, active, roots, bits)| RecordValue {
            id,
            payload,
            active,
            roots,
            bits,
        })
}

fn list_view(values: &[u64]) -> View {
    let mut m = View::default_for(&balances()).to_mutable();
    for v in values {
        m.append(*v).unwrap();
    }
    m.commit().unwrap()
}

fn build_record(value: &RecordValue) -> View {
    let schema = record();
    let container = schema.as_container().unwrap();
    let child = |i: usize| View::default_for(container.field(i).unwrap().schema()).to_mutable();

    let mut payload = child(1);
    for b in &value.payload {
        payload.append(*b).unwrap();
    }
    let mut roots = child(3);
    for r in &value.roots {
        roots.append(*r).unwrap();
    }
    let mut bits = child(4);
    for b in &value.bits {
        bits.append(*b).unwrap();
    }

    let mut m = View::default_for(&schema).to_mutable();
    m.set(0, value.id).unwrap();
    m.set(1, payload.commit().unwrap()).unwrap();
    m.set(2, value.active).unwrap();
    m.set(3, roots.commit().unwrap()).unwrap();
    m.set(4, bits.commit().unwrap()).unwrap();
    m.commit().unwrap()
}

// ============================================================================
// Round-trip and determinism
// ============================================================================

proptest! {
    /// deserialize(serialize(v)) == v, and re-serializing gives the same bytes
    #[test]
    fn prop_record_round_trip(value in arb_record()) {
        let view = build_record(&value);
        let bytes = view.serialize();
        let decoded = deserialize(&record(), &bytes).unwrap();
        prop_assert_eq!(decoded.hash_tree_root(), view.hash_tree_root());
        prop_assert_eq!(decoded.serialize(), bytes);
    }

    /// Any input that decodes re-encodes to itself
    #[test]
    fn prop_decoded_bytes_reencode(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        if let Ok(view) = deserialize(&record(), &bytes) {
            prop_assert_eq!(view.serialize(), bytes);
        }
    }

    /// The root depends on the value, not on how it was built
    #[test]
    fn prop_root_independent_of_history(
        initial in arb_values(64),
        target in arb_values(64),
    ) {
        let direct = list_view(&target);

        let mut m = list_view(&initial).to_mutable();
        m.clear().unwrap();
        for v in &target {
            m.append(*v).unwrap();
        }
        let rebuilt = m.commit().unwrap();
        prop_assert_eq!(direct.hash_tree_root(), rebuilt.hash_tree_root());

        let overlap = initial.len().min(target.len());
        let mut m = list_view(&initial[..overlap]).to_mutable();
        for (i, v) in target[..overlap].iter().enumerate() {
            m.set(i, *v).unwrap();
        }
        for v in &target[overlap..] {
            m.append(*v).unwrap();
        }
        prop_assert_eq!(direct.hash_tree_root(), m.commit().unwrap().hash_tree_root());
    }

    /// The tree root agrees with value-level merkleization
    #[test]
    fn prop_root_matches_reference(values in arb_values(200)) {
        let view = list_view(&values);
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let data = merkle::merkleize(&merkle::pack(&bytes), Some(LIST_LIMIT / 4)).unwrap();
        prop_assert_eq!(view.hash_tree_root(), merkle::mix_in_length(&data, values.len()));
    }
}

// ============================================================================
// Structural sharing and bounds
// ============================================================================

proptest! {
    /// After a single set, only the path to the changed chunk is new
    #[test]
    fn prop_structural_sharing(
        values in arb_values(256),
        pick in any::<prop::sample::Index>(),
        new in any::<u64>(),
    ) {
        prop_assume!(!values.is_empty());
        let view = list_view(&values);
        view.hash_tree_root();
        let index = pick.index(values.len());

        let mut m = view.to_mutable();
        m.set(index, new).unwrap();
        let updated = m.commit().unwrap();

        let depth = balances().tree_depth();
        let changed_chunk = (index / 4) as u64;
        let changed = GIndex::from_depth_index(depth, changed_chunk);
        let on_path = changed.path_indices();
        let old_data = view.root().left().unwrap();
        let new_data = updated.root().left().unwrap();
        for sibling in changed.branch_indices() {
            if on_path.contains(&sibling) {
                continue;
            }
            let before = node::get(old_data, sibling).unwrap();
            let after = node::get(new_data, sibling).unwrap();
            prop_assert!(Arc::ptr_eq(before, after));
        }
        prop_assert!(Arc::ptr_eq(view.root().right().unwrap(), updated.root().right().unwrap()));
    }

    /// Appending past the maximum fails and changes nothing
    #[test]
    fn prop_capacity_enforced(
        values in prop::collection::vec(any::<u64>(), 1..16),
        extra in any::<u64>(),
    ) {
        let schema = Schema::list(Schema::uint64(), values.len()).unwrap();
        let mut m = View::default_for(&schema).to_mutable();
        for v in &values {
            m.append(*v).unwrap();
        }
        let full = m.commit().unwrap();

        let mut m = full.to_mutable();
        prop_assert_eq!(
            m.append(extra).unwrap_err(),
            SszError::CapacityExceeded { max: values.len() }
        );
        prop_assert_eq!(m.len(), values.len());
        prop_assert_eq!(m.commit().unwrap().hash_tree_root(), full.hash_tree_root());
    }

    /// A list root differs from the root of a vector with the same content
    #[test]
    fn prop_length_mixin(values in prop::collection::vec(any::<u64>(), 1..32)) {
        let list = list_view(&values);
        let vector_schema = Schema::vector(Schema::uint64(), values.len()).unwrap();
        let mut m = View::default_for(&vector_schema).to_mutable();
        for (i, v) in values.iter().enumerate() {
            m.set(i, *v).unwrap();
        }
        let vector = m.commit().unwrap();
        prop_assert_ne!(list.hash_tree_root(), vector.hash_tree_root());
        prop_assert_eq!(list.serialize(), vector.serialize());
    }

    /// Implicit empty slots past the length never change the root
    #[test]
    fn prop_trailing_slots_ignored(
        values in prop::collection::vec(any::<u64>(), 1..32),
        dropped in any::<u64>(),
    ) {
        let mut m = list_view(&values).to_mutable();
        m.append(dropped).unwrap();
        let longer = m.commit().unwrap();

        // Rewind to the original length through a fresh list of the same content.
        let mut m = longer.to_mutable();
        m.clear().unwrap();
        for v in &values {
            m.append(*v).unwrap();
        }
        prop_assert_eq!(m.commit().unwrap().hash_tree_root(), list_view(&values).hash_tree_root());
    }
}

// ============================================================================
// Offset validation
// ============================================================================

proptest! {
    /// Breaking the first offset of a variable container is always rejected
    #[test]
    fn prop_first_offset_must_match(value in arb_record(), offset in any::<u32>()) {
        let mut bytes = build_record(&value).serialize();
        // id (4) + offset (4) + active (1) + offset (4) + offset (4)
        let fixed_part = 17u32;
        prop_assume!(offset != fixed_part);
        bytes[4..8].copy_from_slice(&offset.to_le_bytes());
        let err = deserialize(&record(), &bytes).unwrap_err();
        prop_assert!(err.is_decode_error());
    }

    /// Swapping two offsets so they decrease is always rejected
    #[test]
    fn prop_decreasing_offsets_rejected(value in arb_record()) {
        let mut bytes = build_record(&value).serialize();
        let roots_offset = u32::from_le_bytes(bytes[9..13].try_into().unwrap());
        let bits_offset = u32::from_le_bytes(bytes[13..17].try_into().unwrap());
        // The bitlist is never empty on the wire, so its offset is always last and
        // strictly inside the buffer.
        prop_assume!(bits_offset > roots_offset);
        bytes[9..13].copy_from_slice(&bits_offset.to_le_bytes());
        bytes[13..17].copy_from_slice(&roots_offset.to_le_bytes());
        prop_assert_eq!(
            deserialize(&record(), &bytes).unwrap_err(),
            SszError::OffsetsAreDecreasing(roots_offset as usize)
        );
    }
}

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ssz_tree::{deserialize, Schema, View};

#[derive(Arbitrary, Debug)]
enum Op {
    Set { index: u16, value: u64 },
    Append { value: u64 },
    Clear,
    Commit,
}

const LIMIT: usize = 300;

/// Fuzz arbitrary mutation sequences on a list
/// The committed tree must always match a plain vector model
fuzz_target!(|ops: Vec<Op>| {
    let schema = Schema::list(Schema::uint64(), LIMIT).unwrap();
    let mut model: Vec<u64> = Vec::new();
    let mut m = View::default_for(&schema).to_mutable();

    for op in ops {
        match op {
            Op::Set { index, value } => {
                let index = index as usize;
                let result = m.set(index, value);
                if index < model.len() {
                    assert!(result.is_ok());
                    model[index] = value;
                } else {
                    assert!(result.is_err());
                }
            }
            Op::Append { value } => {
                let result = m.append(value);
                if model.len() < LIMIT {
                    assert!(result.is_ok());
                    model.push(value);
                } else {
                    assert!(result.is_err());
                }
            }
            Op::Clear => {
                m.clear().unwrap();
                model.clear();
            }
            Op::Commit => {
                m.commit().unwrap();
            }
        }
        assert_eq!(m.len(), model.len());
    }

    let view = m.commit().unwrap();
    let bytes: Vec<u8> = model.iter().flat_map(|v| v.to_le_bytes()).collect();
    assert_eq!(view.serialize(), bytes);
    let expected = deserialize(&schema, &bytes).unwrap();
    assert_eq!(view.hash_tree_root(), expected.hash_tree_root());
});

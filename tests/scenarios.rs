//! End-to-end scenarios over typed consensus containers.

use ssz_tree::{
    deserialize,
    types::{
        execution::{ExecutionPayloadHeader, ExecutionPayloadHeaderBellatrix, PayloadFork},
        phase0::{BeaconBlockHeader, Checkpoint, Fork},
    },
    FixedBytes, Hasher, Schema, Sha256Hasher, SszError, View, B256,
};

fn root_one() -> B256 {
    B256::with_last_byte(1)
}

// ============================================================================
// Checkpoint
// ============================================================================

#[test]
fn checkpoint_encodes_to_40_bytes() {
    let cp = Checkpoint::new(5, root_one()).unwrap();
    let bytes = cp.to_ssz_bytes();

    let mut expected = vec![0x05, 0, 0, 0, 0, 0, 0, 0];
    expected.extend_from_slice(&[0u8; 31]);
    expected.push(0x01);
    assert_eq!(bytes, expected);

    let decoded = Checkpoint::from_ssz_bytes(&bytes).unwrap();
    assert_eq!(decoded.epoch().unwrap(), 5);
    assert_eq!(decoded.root().unwrap(), root_one());
}

#[test]
fn checkpoint_root_is_hash_of_padded_fields() {
    let mut epoch_chunk = B256::ZERO;
    epoch_chunk[0] = 5;
    let expected = Sha256Hasher.hash_64(&epoch_chunk, &root_one());

    let literal = Checkpoint::new(5, root_one()).unwrap();
    let mutated = Checkpoint::default()
        .with_root(root_one())
        .unwrap()
        .with_epoch(7)
        .unwrap()
        .with_epoch(5)
        .unwrap();
    assert_eq!(literal.hash_tree_root(), expected);
    assert_eq!(mutated.hash_tree_root(), expected);
}

#[test]
fn checkpoint_untyped_and_typed_agree() {
    let schema = Schema::container(
        "Checkpoint",
        vec![("epoch", Schema::uint64()), ("root", Schema::bytes32())],
    )
    .unwrap();
    let mut m = View::default_for(&schema).to_mutable();
    m.set(0, 5u64).unwrap();
    m.set(1, root_one()).unwrap();
    let untyped = m.commit().unwrap();

    let typed = Checkpoint::new(5, root_one()).unwrap();
    assert_eq!(untyped.serialize(), typed.to_ssz_bytes());
    assert_eq!(untyped.hash_tree_root(), typed.hash_tree_root());
    // Same shape, so the untyped view is accepted as a typed checkpoint.
    assert_eq!(Checkpoint::from_view(untyped).unwrap(), typed);
}

#[test]
fn checkpoint_rejects_wrong_length() {
    let err = Checkpoint::from_ssz_bytes(&[0u8; 39]).unwrap_err();
    assert!(err.is_decode_error());
    assert_eq!(
        err,
        SszError::FixedPartTooShort {
            expected: 40,
            actual: 39
        }
    );
}

// ============================================================================
// Headers, forks and proofs
// ============================================================================

#[test]
fn block_header_field_proof() {
    let header = BeaconBlockHeader::new(
        100,
        7,
        B256::repeat_byte(1),
        B256::repeat_byte(2),
        B256::repeat_byte(3),
    )
    .unwrap();
    let root = header.hash_tree_root();

    let proof = header.view().prove(&[2]).unwrap();
    assert_eq!(proof.leaf, B256::repeat_byte(1));
    assert!(proof.verify(&Sha256Hasher, &root).unwrap());

    let multi = header.view().prove_many(&[&[0], &[4]]).unwrap();
    assert!(multi.verify(&Sha256Hasher, &root).unwrap());
}

#[test]
fn fork_versions() {
    let fork = Fork::new(
        FixedBytes::from([0, 0, 0, 1]),
        FixedBytes::from([0, 0, 0, 2]),
        74240,
    )
    .unwrap();
    let bytes = fork.to_ssz_bytes();
    assert_eq!(bytes.len(), 16);
    assert_eq!(&bytes[..4], &[0, 0, 0, 1]);
    assert_eq!(Fork::from_ssz_bytes(&bytes).unwrap(), fork);
}

#[test]
fn payload_header_upgrade_chain() {
    let bellatrix = ExecutionPayloadHeaderBellatrix::default()
        .with_block_number(17_000_000)
        .unwrap()
        .with_gas_used(12_345)
        .unwrap();
    let header = ExecutionPayloadHeader::Bellatrix(bellatrix);

    let deneb = header.upgrade().unwrap().upgrade().unwrap();
    assert_eq!(deneb.fork(), PayloadFork::Deneb);

    let bytes = deneb.to_ssz_bytes();
    let decoded = ExecutionPayloadHeader::from_ssz_bytes(PayloadFork::Deneb, &bytes).unwrap();
    assert_eq!(decoded.hash_tree_root(), deneb.hash_tree_root());

    // A Deneb encoding is not a valid Bellatrix encoding.
    assert!(ExecutionPayloadHeader::from_ssz_bytes(PayloadFork::Bellatrix, &bytes).is_err());

    let back = deneb.try_downgrade().unwrap().try_downgrade().unwrap();
    assert_eq!(back, header);
}

#[test]
fn decode_never_accepts_truncated_input() {
    let header = ExecutionPayloadHeader::default_for(PayloadFork::Capella);
    let bytes = header.to_ssz_bytes();
    let schema = header.view().schema().clone();
    for cut in [0, 1, bytes.len() / 2, bytes.len() - 1] {
        let err = deserialize(&schema, &bytes[..cut]).unwrap_err();
        assert!(err.is_decode_error(), "cut at {cut}: {err}");
    }
}

#![no_main]

use libfuzzer_sys::fuzz_target;
use ssz_tree::{
    deserialize,
    types::{
        execution::{ExecutionPayloadHeader, PayloadFork},
        phase0::PendingAttestation,
    },
    Schema,
};

/// Fuzz decoding with arbitrary bytes
/// Anything that decodes must re-encode to the same bytes
fuzz_target!(|data: &[u8]| {
    if let Ok(attestation) = PendingAttestation::from_ssz_bytes(data) {
        assert_eq!(attestation.to_ssz_bytes(), data, "non-canonical attestation accepted");
        let _ = attestation.hash_tree_root();
    }

    for fork in [PayloadFork::Bellatrix, PayloadFork::Capella, PayloadFork::Deneb] {
        if let Ok(header) = ExecutionPayloadHeader::from_ssz_bytes(fork, data) {
            assert_eq!(header.to_ssz_bytes(), data, "non-canonical {fork} header accepted");
        }
    }

    let nested = Schema::list(Schema::byte_list(16).unwrap(), 8).unwrap();
    match deserialize(&nested, data) {
        Ok(view) => assert_eq!(view.serialize(), data),
        Err(err) => assert!(err.is_decode_error(), "unexpected error kind: {err}"),
    }
});

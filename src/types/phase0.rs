//! Phase 0 consensus containers.

use alloy_primitives::{FixedBytes, B256};

use crate::{
    container::{BitList, ByteVector},
    ssz_container,
};

/// `MAX_VALIDATORS_PER_COMMITTEE` of the mainnet preset.
pub const MAX_VALIDATORS_PER_COMMITTEE: usize = 2048;

/// Length of a BLS public key.
pub const BLS_PUBKEY_LEN: usize = 48;

ssz_container! {
    /// An epoch boundary block.
    pub struct Checkpoint {
        epoch: u64,
        root: B256,
    }
}

ssz_container! {
    /// Fork versions and the epoch of the last fork.
    pub struct Fork {
        previous_version: FixedBytes<4>,
        current_version: FixedBytes<4>,
        epoch: u64,
    }
}

ssz_container! {
    /// What an attestation votes for.
    pub struct AttestationData {
        slot: u64,
        index: u64,
        beacon_block_root: B256,
        source: Checkpoint,
        target: Checkpoint,
    }
}

ssz_container! {
    /// A block header with the body replaced by its root.
    pub struct BeaconBlockHeader {
        slot: u64,
        proposer_index: u64,
        parent_root: B256,
        state_root: B256,
        body_root: B256,
    }
}

ssz_container! {
    /// A vote on the deposit contract state.
    pub struct Eth1Data {
        deposit_root: B256,
        deposit_count: u64,
        block_hash: B256,
    }
}

ssz_container! {
    /// A validator registry entry.
    pub struct Validator {
        pubkey: ByteVector<BLS_PUBKEY_LEN>,
        withdrawal_credentials: B256,
        effective_balance: u64,
        slashed: bool,
        activation_eligibility_epoch: u64,
        activation_epoch: u64,
        exit_epoch: u64,
        withdrawable_epoch: u64,
    }
}

ssz_container! {
    /// An attestation included in a block, as kept in the phase 0 state.
    pub struct PendingAttestation {
        aggregation_bits: BitList<MAX_VALIDATORS_PER_COMMITTEE>,
        data: AttestationData,
        inclusion_delay: u64,
        proposer_index: u64,
    }
}

impl Validator {
    /// Whether the validator is active at `epoch`.
    pub fn is_active_at(&self, epoch: u64) -> crate::Result<bool> {
        Ok(self.activation_epoch()? <= epoch && epoch < self.exit_epoch()?)
    }
}

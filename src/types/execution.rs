//! Execution payload headers across forks.
//!
//! Each fork's header is a distinct schema that appends fields to its
//! predecessor's. [`ExecutionPayloadHeader`] tags a header with its fork and moves
//! it between adjacent forks with checked conversions; code that works on any fork
//! goes through [`PayloadHeaderFields`].

use alloy_primitives::{Address, B256, U256};
use std::fmt;

use crate::{
    container::{ByteList, ByteVector},
    error::Result,
    ssz_container, SszError,
};

/// `BYTES_PER_LOGS_BLOOM`.
pub const BYTES_PER_LOGS_BLOOM: usize = 256;

/// `MAX_EXTRA_DATA_BYTES`.
pub const MAX_EXTRA_DATA_BYTES: usize = 32;

ssz_container! {
    /// A withdrawal from the consensus layer to an execution address.
    pub struct Withdrawal {
        index: u64,
        validator_index: u64,
        address: Address,
        amount: u64,
    }
}

ssz_container! {
    /// The Bellatrix execution payload header.
    pub struct ExecutionPayloadHeaderBellatrix {
        parent_hash: B256,
        fee_recipient: Address,
        state_root: B256,
        receipts_root: B256,
        logs_bloom: ByteVector<BYTES_PER_LOGS_BLOOM>,
        prev_randao: B256,
        block_number: u64,
        gas_limit: u64,
        gas_used: u64,
        timestamp: u64,
        extra_data: ByteList<MAX_EXTRA_DATA_BYTES>,
        base_fee_per_gas: U256,
        block_hash: B256,
        transactions_root: B256,
    }
}

ssz_container! {
    /// The Capella execution payload header: Bellatrix plus the withdrawals root.
    pub struct ExecutionPayloadHeaderCapella extends ExecutionPayloadHeaderBellatrix {
        parent_hash: B256,
        fee_recipient: Address,
        state_root: B256,
        receipts_root: B256,
        logs_bloom: ByteVector<BYTES_PER_LOGS_BLOOM>,
        prev_randao: B256,
        block_number: u64,
        gas_limit: u64,
        gas_used: u64,
        timestamp: u64,
        extra_data: ByteList<MAX_EXTRA_DATA_BYTES>,
        base_fee_per_gas: U256,
        block_hash: B256,
        transactions_root: B256,
        withdrawals_root: B256,
    }
}

ssz_container! {
    /// The Deneb execution payload header: Capella plus blob gas accounting.
    pub struct ExecutionPayloadHeaderDeneb extends ExecutionPayloadHeaderCapella {
        parent_hash: B256,
        fee_recipient: Address,
        state_root: B256,
        receipts_root: B256,
        logs_bloom: ByteVector<BYTES_PER_LOGS_BLOOM>,
        prev_randao: B256,
        block_number: u64,
        gas_limit: u64,
        gas_used: u64,
        timestamp: u64,
        extra_data: ByteList<MAX_EXTRA_DATA_BYTES>,
        base_fee_per_gas: U256,
        block_hash: B256,
        transactions_root: B256,
        withdrawals_root: B256,
        blob_gas_used: u64,
        excess_blob_gas: u64,
    }
}

/// Forks that define an execution payload header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PayloadFork {
    Bellatrix,
    Capella,
    Deneb,
}

impl PayloadFork {
    /// The following fork, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Bellatrix => Some(Self::Capella),
            Self::Capella => Some(Self::Deneb),
            Self::Deneb => None,
        }
    }

    /// The preceding fork, if any.
    pub fn previous(self) -> Option<Self> {
        match self {
            Self::Bellatrix => None,
            Self::Capella => Some(Self::Bellatrix),
            Self::Deneb => Some(Self::Capella),
        }
    }
}

impl fmt::Display for PayloadFork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bellatrix => f.write_str("bellatrix"),
            Self::Capella => f.write_str("capella"),
            Self::Deneb => f.write_str("deneb"),
        }
    }
}

/// An execution payload header of any fork.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionPayloadHeader {
    Bellatrix(ExecutionPayloadHeaderBellatrix),
    Capella(ExecutionPayloadHeaderCapella),
    Deneb(ExecutionPayloadHeaderDeneb),
}

impl ExecutionPayloadHeader {
    /// The fork of this header.
    pub fn fork(&self) -> PayloadFork {
        match self {
            Self::Bellatrix(_) => PayloadFork::Bellatrix,
            Self::Capella(_) => PayloadFork::Capella,
            Self::Deneb(_) => PayloadFork::Deneb,
        }
    }

    /// The default header of `fork`.
    pub fn default_for(fork: PayloadFork) -> Self {
        match fork {
            PayloadFork::Bellatrix => Self::Bellatrix(Default::default()),
            PayloadFork::Capella => Self::Capella(Default::default()),
            PayloadFork::Deneb => Self::Deneb(Default::default()),
        }
    }

    /// Decode a header of `fork`.
    pub fn from_ssz_bytes(fork: PayloadFork, bytes: &[u8]) -> Result<Self> {
        Ok(match fork {
            PayloadFork::Bellatrix => {
                Self::Bellatrix(ExecutionPayloadHeaderBellatrix::from_ssz_bytes(bytes)?)
            }
            PayloadFork::Capella => {
                Self::Capella(ExecutionPayloadHeaderCapella::from_ssz_bytes(bytes)?)
            }
            PayloadFork::Deneb => Self::Deneb(ExecutionPayloadHeaderDeneb::from_ssz_bytes(bytes)?),
        })
    }

    /// The underlying view.
    pub fn view(&self) -> &crate::View {
        match self {
            Self::Bellatrix(h) => h.view(),
            Self::Capella(h) => h.view(),
            Self::Deneb(h) => h.view(),
        }
    }

    /// SSZ encoding.
    pub fn to_ssz_bytes(&self) -> Vec<u8> {
        self.view().serialize()
    }

    /// Hash tree root.
    pub fn hash_tree_root(&self) -> B256 {
        self.view().hash_tree_root()
    }

    /// The same header in the next fork, with the new fields at their defaults.
    pub fn upgrade(&self) -> Result<Self> {
        let view = self.view();
        match self {
            Self::Bellatrix(_) => Ok(Self::Capella(ExecutionPayloadHeaderCapella::from_view(
                view.convert(&ExecutionPayloadHeaderCapella::schema())?,
            )?)),
            Self::Capella(_) => Ok(Self::Deneb(ExecutionPayloadHeaderDeneb::from_view(
                view.convert(&ExecutionPayloadHeaderDeneb::schema())?,
            )?)),
            Self::Deneb(_) => Err(SszError::IncompatibleSchema(format!(
                "no fork after {}",
                self.fork()
            ))),
        }
    }

    /// The same header in the previous fork.
    ///
    /// Fails if a field that the previous fork lacks holds a non-default value.
    pub fn try_downgrade(&self) -> Result<Self> {
        let view = self.view();
        match self {
            Self::Bellatrix(_) => Err(SszError::IncompatibleSchema(format!(
                "no fork before {}",
                self.fork()
            ))),
            Self::Capella(_) => Ok(Self::Bellatrix(ExecutionPayloadHeaderBellatrix::from_view(
                view.convert(&ExecutionPayloadHeaderBellatrix::schema())?,
            )?)),
            Self::Deneb(_) => Ok(Self::Capella(ExecutionPayloadHeaderCapella::from_view(
                view.convert(&ExecutionPayloadHeaderCapella::schema())?,
            )?)),
        }
    }
}

/// Fields every execution payload header has, whatever its fork.
pub trait PayloadHeaderFields {
    fn parent_hash(&self) -> Result<B256>;
    fn block_hash(&self) -> Result<B256>;
    fn block_number(&self) -> Result<u64>;
    fn timestamp(&self) -> Result<u64>;
    fn gas_used(&self) -> Result<u64>;

    /// Whether this header directly follows `parent`.
    fn extends(&self, parent: &impl PayloadHeaderFields) -> Result<bool> {
        Ok(self.parent_hash()? == parent.block_hash()?
            && parent.block_number()?.checked_add(1) == Some(self.block_number()?))
    }
}

macro_rules! impl_payload_header_fields {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl PayloadHeaderFields for $ty {
                fn parent_hash(&self) -> Result<B256> {
                    <$ty>::parent_hash(self)
                }

                fn block_hash(&self) -> Result<B256> {
                    <$ty>::block_hash(self)
                }

                fn block_number(&self) -> Result<u64> {
                    <$ty>::block_number(self)
                }

                fn timestamp(&self) -> Result<u64> {
                    <$ty>::timestamp(self)
                }

                fn gas_used(&self) -> Result<u64> {
                    <$ty>::gas_used(self)
                }
            }
        )+
    };
}

impl_payload_header_fields!(
    ExecutionPayloadHeaderBellatrix,
    ExecutionPayloadHeaderCapella,
    ExecutionPayloadHeaderDeneb,
);

impl PayloadHeaderFields for ExecutionPayloadHeader {
    fn parent_hash(&self) -> Result<B256> {
        match self {
            Self::Bellatrix(h) => h.parent_hash(),
            Self::Capella(h) => h.parent_hash(),
            Self::Deneb(h) => h.parent_hash(),
        }
    }

    fn block_hash(&self) -> Result<B256> {
        match self {
            Self::Bellatrix(h) => h.block_hash(),
            Self::Capella(h) => h.block_hash(),
            Self::Deneb(h) => h.block_hash(),
        }
    }

    fn block_number(&self) -> Result<u64> {
        match self {
            Self::Bellatrix(h) => h.block_number(),
            Self::Capella(h) => h.block_number(),
            Self::Deneb(h) => h.block_number(),
        }
    }

    fn timestamp(&self) -> Result<u64> {
        match self {
            Self::Bellatrix(h) => h.timestamp(),
            Self::Capella(h) => h.timestamp(),
            Self::Deneb(h) => h.timestamp(),
        }
    }

    fn gas_used(&self) -> Result<u64> {
        match self {
            Self::Bellatrix(h) => h.gas_used(),
            Self::Capella(h) => h.gas_used(),
            Self::Deneb(h) => h.gas_used(),
        }
    }
}

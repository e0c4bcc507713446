//! Consensus containers declared with [`ssz_container!`](crate::ssz_container).

pub mod execution;
pub mod phase0;

//! Primitive types and their fixed-width codecs.
//!
//! Unsigned integers and booleans are *basic* types: several of them are packed
//! side by side into one 32-byte chunk. Fixed byte strings of up to 32 bytes
//! (`Bytes4`, `Bytes20`, `Bytes32`, ...) always take a chunk of their own, zero-padded
//! on the right, which is how SSZ merkleizes a `Vector[byte, N]` with `N <= 32`.

use alloy_primitives::{Bytes, FixedBytes, B256, U256};
use std::fmt;

use crate::{error::Result, hash::BYTES_PER_CHUNK, SszError};

/// The kind of a primitive schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uint256,
    /// Fixed byte string of 1 to 32 bytes.
    Bytes(usize),
}

/// The value of a primitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    Bool(bool),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Uint256(U256),
    Bytes(Bytes),
}

impl PrimitiveKind {
    /// Encoded size in bytes.
    pub const fn size(&self) -> usize {
        match self {
            Self::Bool | Self::Uint8 => 1,
            Self::Uint16 => 2,
            Self::Uint32 => 4,
            Self::Uint64 => 8,
            Self::Uint256 => 32,
            Self::Bytes(len) => *len,
        }
    }

    /// Whether values of this kind are packed together into shared chunks.
    pub const fn is_basic(&self) -> bool {
        !matches!(self, Self::Bytes(_))
    }

    /// How many values of this kind fit into one chunk of a collection.
    pub const fn elements_per_chunk(&self) -> usize {
        if self.is_basic() {
            BYTES_PER_CHUNK / self.size()
        } else {
            1
        }
    }

    /// The zero value of this kind.
    pub fn default_value(&self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Uint8 => Value::Uint8(0),
            Self::Uint16 => Value::Uint16(0),
            Self::Uint32 => Value::Uint32(0),
            Self::Uint64 => Value::Uint64(0),
            Self::Uint256 => Value::Uint256(U256::ZERO),
            Self::Bytes(len) => Value::Bytes(Bytes::from(vec![0u8; *len])),
        }
    }

    /// Check that `value` is a valid instance of this kind.
    pub fn check(&self, value: &Value) -> Result<()> {
        let ok = match (self, value) {
            (Self::Bool, Value::Bool(_))
            | (Self::Uint8, Value::Uint8(_))
            | (Self::Uint16, Value::Uint16(_))
            | (Self::Uint32, Value::Uint32(_))
            | (Self::Uint64, Value::Uint64(_))
            | (Self::Uint256, Value::Uint256(_)) => true,
            (Self::Bytes(len), Value::Bytes(bytes)) => bytes.len() == *len,
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(SszError::TypeMismatch {
                expected: self.to_string(),
                actual: value.type_name(),
            })
        }
    }

    /// Append the little-endian encoding of `value` to `out`.
    pub fn encode(&self, value: &Value, out: &mut Vec<u8>) -> Result<()> {
        self.check(value)?;
        match value {
            Value::Bool(b) => out.push(u8::from(*b)),
            Value::Uint8(v) => out.push(*v),
            Value::Uint16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Uint32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Uint64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Uint256(v) => out.extend_from_slice(&v.to_le_bytes::<32>()),
            Value::Bytes(bytes) => out.extend_from_slice(bytes),
        }
        Ok(())
    }

    /// Decode a value from exactly [`size`](Self::size) bytes.
    pub fn decode(&self, bytes: &[u8]) -> Result<Value> {
        let expected = self.size();
        if bytes.len() != expected {
            return Err(SszError::InvalidByteLength {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(match self {
            Self::Bool => match bytes[0] {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => return Err(SszError::InvalidBoolean(other)),
            },
            Self::Uint8 => Value::Uint8(bytes[0]),
            Self::Uint16 => Value::Uint16(u16::from_le_bytes([bytes[0], bytes[1]])),
            Self::Uint32 => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(bytes);
                Value::Uint32(u32::from_le_bytes(buf))
            }
            Self::Uint64 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(bytes);
                Value::Uint64(u64::from_le_bytes(buf))
            }
            Self::Uint256 => {
                let mut buf = [0u8; 32];
                buf.copy_from_slice(bytes);
                Value::Uint256(U256::from_le_bytes(buf))
            }
            Self::Bytes(_) => Value::Bytes(Bytes::copy_from_slice(bytes)),
        })
    }

    /// Overwrite the value at byte `offset` of `chunk`.
    pub fn write_to_chunk(&self, value: &Value, chunk: &mut B256, offset: usize) -> Result<()> {
        let mut encoded = Vec::with_capacity(self.size());
        self.encode(value, &mut encoded)?;
        chunk.0[offset..offset + encoded.len()].copy_from_slice(&encoded);
        Ok(())
    }

    /// Read the value at byte `offset` of `chunk`.
    pub fn read_from_chunk(&self, chunk: &B256, offset: usize) -> Result<Value> {
        self.decode(&chunk[offset..offset + self.size()])
    }

    /// The leaf chunk of a value stored alone.
    pub fn to_chunk(&self, value: &Value) -> Result<B256> {
        let mut chunk = B256::ZERO;
        self.write_to_chunk(value, &mut chunk, 0)?;
        Ok(chunk)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("boolean"),
            Self::Uint8 => f.write_str("uint8"),
            Self::Uint16 => f.write_str("uint16"),
            Self::Uint32 => f.write_str("uint32"),
            Self::Uint64 => f.write_str("uint64"),
            Self::Uint256 => f.write_str("uint256"),
            Self::Bytes(len) => write!(f, "Bytes{len}"),
        }
    }
}

impl Value {
    /// Human readable name of the value's type, used in error messages.
    pub fn type_name(&self) -> String {
        match self {
            Self::Bool(_) => "boolean".into(),
            Self::Uint8(_) => "uint8".into(),
            Self::Uint16(_) => "uint16".into(),
            Self::Uint32(_) => "uint32".into(),
            Self::Uint64(_) => "uint64".into(),
            Self::Uint256(_) => "uint256".into(),
            Self::Bytes(bytes) => format!("Bytes{}", bytes.len()),
        }
    }
}

macro_rules! impl_value_conversions {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }

            impl TryFrom<Value> for $ty {
                type Error = SszError;

                fn try_from(value: Value) -> Result<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(SszError::TypeMismatch {
                            expected: stringify!($variant).to_lowercase(),
                            actual: other.type_name(),
                        }),
                    }
                }
            }
        )+
    };
}

impl_value_conversions! {
    bool => Bool,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    U256 => Uint256,
    Bytes => Bytes,
}

impl<const N: usize> From<FixedBytes<N>> for Value {
    fn from(v: FixedBytes<N>) -> Self {
        Self::Bytes(Bytes::copy_from_slice(v.as_slice()))
    }
}

impl<const N: usize> TryFrom<Value> for FixedBytes<N> {
    type Error = SszError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(bytes) if bytes.len() == N => Ok(FixedBytes::from_slice(&bytes)),
            other => Err(SszError::TypeMismatch {
                expected: format!("Bytes{N}"),
                actual: other.type_name(),
            }),
        }
    }
}

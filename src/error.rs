//! Error types for the SSZ engine.

use thiserror::Error;

use crate::GIndex;

/// Errors that can occur while building schemas, decoding bytes, or reading and
/// writing views.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SszError {
    /// Malformed schema definition. Schemas are declared once at startup, so
    /// this indicates a programming error in the declaring code.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// The input length does not match what the schema requires.
    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidByteLength { expected: usize, actual: usize },

    /// The input is shorter than the fixed part of a variable-size composite.
    #[error("input of {actual} bytes is shorter than the fixed part of {expected} bytes")]
    FixedPartTooShort { expected: usize, actual: usize },

    /// The first offset points into the fixed part of the encoding.
    #[error("offset {0} points into the fixed portion")]
    OffsetIntoFixedPortion(usize),

    /// The first offset leaves bytes between the fixed part and the variable part.
    #[error("offset {0} skips variable bytes")]
    OffsetSkipsVariableBytes(usize),

    /// An offset is smaller than the one preceding it.
    #[error("offset {0} is smaller than the previous offset")]
    OffsetsAreDecreasing(usize),

    /// An offset points past the end of the input.
    #[error("offset {0} is out of bounds")]
    OffsetOutOfBounds(usize),

    /// A fixed-element list whose byte length is not a multiple of the element size.
    #[error("list byte length {len} is not a multiple of element size {element_size}")]
    InvalidListFixedBytesLen { len: usize, element_size: usize },

    /// A collection holds more elements than its declared maximum.
    #[error("element count {count} exceeds maximum {max}")]
    TooManyElements { count: usize, max: usize },

    /// A boolean byte other than 0x00 or 0x01.
    #[error("invalid boolean byte {0:#04x}")]
    InvalidBoolean(u8),

    /// A bitlist without its terminating delimiter bit.
    #[error("bitlist is missing its delimiter bit")]
    MissingBitlistDelimiter,

    /// Bits beyond the declared bitvector length are set.
    #[error("bitvector has non-zero padding bits")]
    InvalidBitvectorPadding,

    /// Index out of range on a read or write.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Append on a list that is already at its maximum length.
    #[error("capacity exceeded: list is already at its maximum length {max}")]
    CapacityExceeded { max: usize },

    /// A field name that the container does not declare.
    #[error("unknown field {name} in container {container}")]
    UnknownField { container: String, name: String },

    /// A value or view whose type does not match the target schema.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// The operation is not defined for this kind of schema.
    #[error("operation {operation} is not supported by {schema}")]
    UnsupportedOperation {
        operation: &'static str,
        schema: String,
    },

    /// A generalized index that does not address a node of the tree.
    #[error("generalized index {0} does not address a node of this tree")]
    InvalidGIndex(GIndex),

    /// Concatenating generalized indices overflowed 64 bits.
    #[error("generalized index overflow")]
    GIndexOverflow,

    /// Two schemas that cannot be converted into one another.
    #[error("incompatible schemas: {0}")]
    IncompatibleSchema(String),

    /// Malformed merkle proof.
    #[error("invalid proof: {0}")]
    InvalidProof(String),
}

impl SszError {
    /// Whether this error was caused by malformed wire input.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidByteLength { .. }
                | Self::FixedPartTooShort { .. }
                | Self::OffsetIntoFixedPortion(_)
                | Self::OffsetSkipsVariableBytes(_)
                | Self::OffsetsAreDecreasing(_)
                | Self::OffsetOutOfBounds(_)
                | Self::InvalidListFixedBytesLen { .. }
                | Self::TooManyElements { .. }
                | Self::InvalidBoolean(_)
                | Self::MissingBitlistDelimiter
                | Self::InvalidBitvectorPadding
        )
    }
}

/// Result type alias for SSZ operations.
pub type Result<T> = std::result::Result<T, SszError>;

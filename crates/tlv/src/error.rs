//! Decode error taxonomy
//!
//! Every way a byte stream can fail to be valid BER-TLV gets its own
//! variant, with the input offset where decoding stopped.

use thiserror::Error;

/// Result type for TLV operations
pub type Result<T> = core::result::Result<T, TlvError>;

/// Error type for TLV decoding
///
/// All variants describe malformed input; none of them are recoverable
/// by the codec itself. Offsets are relative to the start of the buffer
/// handed to [`decode`](crate::decode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TlvError {
    /// A tag or length declared more bytes than the input holds
    #[error("unexpected end of input at offset {offset}: {needed} more byte(s) declared")]
    UnexpectedEnd {
        /// Offset at which the missing bytes were expected
        offset: usize,
        /// Number of bytes missing
        needed: usize,
    },

    /// Tag byte is not a valid BER tag at this position
    #[error("invalid tag encoding at offset {offset}")]
    InvalidTag {
        /// Offset of the offending tag
        offset: usize,
    },

    /// Tag continuation ran past the 4-byte limit EMV tags fit in
    #[error("tag at offset {offset} exceeds 4 bytes")]
    TagTooLong {
        /// Offset of the offending tag
        offset: usize,
    },

    /// Indefinite-length form (0x80), which EMV forbids
    #[error("indefinite length at offset {offset}")]
    IndefiniteLength {
        /// Offset of the length byte
        offset: usize,
    },

    /// Long-form length with more octets than a usize can carry
    #[error("length field at offset {offset} is too large")]
    LengthOverflow {
        /// Offset of the length field
        offset: usize,
    },

    /// Nesting exceeded the configured depth bound
    #[error("nesting depth exceeds the configured maximum of {max}")]
    DepthExceeded {
        /// The depth bound in effect
        max: usize,
    },
}

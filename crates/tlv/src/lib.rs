//! BER-TLV codec for EMV data objects
//!
//! EMV cards speak BER-TLV (ISO/IEC 8825): every data object is a tag,
//! a length, and a value, and constructed objects nest further TLV
//! objects inside their value. This crate decodes raw card bytes into
//! [`TlvNode`] trees and encodes them back, byte for byte.
//!
//! The codec is deliberately ignorant of EMV semantics: it knows the
//! encoding rules and nothing about what any particular tag means.
//! Card input is adversarial, so decoding is bounded in every
//! dimension: declared lengths are checked against the remaining
//! input, nesting depth is capped, and traversal uses an explicit
//! stack rather than recursion.
//!
//! ```
//! use emv_tlv::{decode, Tag, TlvNode};
//!
//! let (nodes, consumed) = decode(&[0x8F, 0x01, 0x05]).unwrap();
//! assert_eq!(consumed, 3);
//! assert_eq!(nodes[0].tag(), Tag::from_raw(0x8F));
//! assert_eq!(nodes[0].value(), Some(&[0x05][..]));
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

mod codec;
mod error;
mod tag;

pub use codec::{
    decode, decode_header, decode_with_limit, find, find_value, Content, TlvNode,
    DEFAULT_MAX_DEPTH,
};
pub use error::{Result, TlvError};
pub use tag::{Class, Tag};

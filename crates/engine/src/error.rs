//! Error types for EMV transaction processing
//!
//! Every stage fails fast with a tagged error; nothing downgrades a
//! verification failure to a partial result. Chain and signature
//! failures name the specific check that failed so callers can
//! diagnose a rejection without re-running the verification.

use derive_more::Display;
use emv_tlv::{Tag, TlvError};
use thiserror::Error;

use crate::response::StatusWord;

/// Result type for EMV engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Which certificate of the trust chain a failure refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ChainStep {
    /// The issuer public key certificate, recovered with the CA key
    #[display("issuer")]
    Issuer,
    /// The ICC public key certificate, recovered with the issuer key
    #[display("ICC")]
    Icc,
}

/// The specific check a certificate failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ChainCheck {
    /// Certificate length does not match the recovering key's modulus
    #[display("length")]
    Length,
    /// Recovered data is not framed by the 6A header / BC trailer
    #[display("recovery frame")]
    Frame,
    /// Certificate format byte is wrong for this chain step
    #[display("certificate format")]
    Format,
    /// Hash algorithm indicator is not a supported algorithm
    #[display("hash algorithm")]
    HashAlgorithm,
    /// Public key algorithm indicator is not RSA
    #[display("public key algorithm")]
    KeyAlgorithm,
    /// Recovered hash does not match the computed digest
    #[display("checksum")]
    Checksum,
    /// Issuer identifier is not a prefix of the application PAN
    #[display("issuer identifier")]
    IssuerIdentifier,
    /// Recovered PAN does not match the application PAN
    #[display("PAN binding")]
    Pan,
    /// Certificate expiry date has passed
    #[display("expiry")]
    Expired,
    /// Unused key positions are not filled with the padding byte
    #[display("padding")]
    Padding,
    /// Public key modulus could not be assembled or is not a valid key
    #[display("modulus assembly")]
    Modulus,
    /// Stated exponent length disagrees with the supplied exponent
    #[display("exponent")]
    Exponent,
    /// The trusted CA key entry itself is not a usable RSA key
    #[display("CA key")]
    CaKey,
}

/// The specific check that failed during signed-data verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SignatureCheck {
    /// Signed data length does not match the signing key's modulus
    #[display("length")]
    Length,
    /// Recovered data is not framed by the 6A header / BC trailer
    #[display("recovery frame")]
    Frame,
    /// Signed data format byte is wrong
    #[display("format")]
    Format,
    /// Hash algorithm indicator is not a supported algorithm
    #[display("hash algorithm")]
    HashAlgorithm,
    /// Unused data positions are not filled with the padding byte
    #[display("padding")]
    Padding,
    /// Recovered hash does not match the digest over the signed input
    #[display("digest")]
    Digest,
    /// ICC dynamic data does not fit the recovered payload
    #[display("dynamic data")]
    DynamicData,
    /// Cryptogram information in the signature disagrees with the response
    #[display("cryptogram information")]
    CryptogramInfo,
    /// Recovered transaction data hash does not match the reconstruction
    #[display("transaction data hash")]
    TransactionHash,
}

/// Error type for EMV engine operations
#[derive(Debug, Error)]
pub enum Error {
    /// Structural TLV decode failure in card data
    #[error(transparent)]
    MalformedTlv(#[from] TlvError),

    /// A data object required in this context has no value
    #[error("missing data object {tag}")]
    MissingDataObject {
        /// The absent tag
        tag: Tag,
    },

    /// An AFL-designated record was not supplied by the reader
    #[error("missing record {number} of file {sfi}")]
    MissingRecord {
        /// Short file identifier
        sfi: u8,
        /// Record number within the file
        number: u8,
    },

    /// A data object's value violates its dictionary format
    #[error("data object {tag} failed format validation")]
    InvalidDataObject {
        /// The offending tag
        tag: Tag,
    },

    /// Malformed Application File Locator
    #[error("invalid AFL: {reason}")]
    InvalidAfl {
        /// What was wrong with the AFL
        reason: &'static str,
    },

    /// No trusted CA key for the card's (RID, index) pair
    #[error("unknown CA public key (RID {rid:02X?}, index {index:#04x})")]
    UnknownCaKey {
        /// Registered application provider identifier
        rid: [u8; 5],
        /// CA public key index from the card
        index: u8,
    },

    /// A certificate in the trust chain failed a specific check
    #[error("{step} certificate rejected: {check} check failed")]
    ChainFailed {
        /// The chain step that failed
        step: ChainStep,
        /// The check that failed
        check: ChainCheck,
    },

    /// Signed application data failed verification
    #[error("signature verification failed: {check} check failed")]
    SignatureInvalid {
        /// The check that failed
        check: SignatureCheck,
    },

    /// The AIP declares methods, but none this engine is configured for
    #[error("no supported authentication method (AIP {aip:02X?})")]
    UnsupportedMethod {
        /// The card's Application Interchange Profile
        aip: [u8; 2],
    },

    /// A response was too short to carry a status word
    #[error("response shorter than a status word")]
    TruncatedResponse,

    /// The card returned an error status word
    #[error("card returned error status {0}")]
    CardStatus(StatusWord),
}

//! Offline data authentication
//!
//! The card declares which authentication schemes it supports in the
//! Application Interchange Profile; the verifier recovers the public
//! key chain and checks the card's signed data accordingly. Everything
//! here fails closed: a missing key, a decode error or a digest
//! mismatch is always a failure, never a silent pass.

use bytes::Bytes;
use derive_more::Display;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::constants::{aip, cert};
use crate::error::{Error, Result};

pub mod chain;
pub(crate) mod oda;
pub(crate) mod recovery;

pub use chain::{ChainVerifier, KeyOrigin, RecoveredKey};

/// Hash algorithm named by a certificate's indicator byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum HashAlgorithm {
    /// SHA-1, indicator 0x01 (the algorithm EMV Book 2 mandates)
    #[display("SHA-1")]
    Sha1,
    /// SHA-256, indicator 0x02 (accepted for newer CAPK entries)
    #[display("SHA-256")]
    Sha256,
}

impl HashAlgorithm {
    /// Resolve an indicator byte, `None` for unsupported algorithms
    pub const fn from_indicator(indicator: u8) -> Option<Self> {
        match indicator {
            cert::HASH_SHA1 => Some(Self::Sha1),
            cert::HASH_SHA256 => Some(Self::Sha256),
            _ => None,
        }
    }

    /// The indicator byte for this algorithm
    pub const fn indicator(self) -> u8 {
        match self {
            Self::Sha1 => cert::HASH_SHA1,
            Self::Sha256 => cert::HASH_SHA256,
        }
    }

    /// Digest length in bytes
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
        }
    }

    /// Digest the concatenation of `parts`
    pub fn digest(self, parts: &[&[u8]]) -> Vec<u8> {
        match self {
            Self::Sha1 => {
                let mut hasher = Sha1::new();
                for part in parts {
                    hasher.update(part);
                }
                hasher.finalize().to_vec()
            }
            Self::Sha256 => {
                let mut hasher = Sha256::new();
                for part in parts {
                    hasher.update(part);
                }
                hasher.finalize().to_vec()
            }
        }
    }
}

/// Offline data authentication method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AuthMethod {
    /// Static Data Authentication
    #[display("SDA")]
    Sda,
    /// Dynamic Data Authentication
    #[display("DDA")]
    Dda,
    /// Combined DDA / Application Cryptogram Generation
    #[display("CDA")]
    Cda,
}

/// Parsed Application Interchange Profile (tag 82)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aip([u8; 2]);

impl Aip {
    /// Parse the two-byte AIP value
    pub fn parse(value: &[u8]) -> Result<Self> {
        value
            .try_into()
            .map(Self)
            .map_err(|_| Error::InvalidDataObject {
                tag: crate::constants::tags::APPLICATION_INTERCHANGE_PROFILE,
            })
    }

    /// The raw AIP bytes
    pub const fn bytes(self) -> [u8; 2] {
        self.0
    }

    /// Whether the card supports Static Data Authentication
    pub const fn supports_sda(self) -> bool {
        self.0[0] & aip::SDA_SUPPORTED != 0
    }

    /// Whether the card supports Dynamic Data Authentication
    pub const fn supports_dda(self) -> bool {
        self.0[0] & aip::DDA_SUPPORTED != 0
    }

    /// Whether the card supports Combined Data Authentication
    pub const fn supports_cda(self) -> bool {
        self.0[0] & aip::CDA_SUPPORTED != 0
    }

    /// Whether the card supports issuer authentication
    pub const fn supports_issuer_authentication(self) -> bool {
        self.0[0] & aip::ISSUER_AUTHENTICATION != 0
    }

    /// Whether the card supports cardholder verification
    pub const fn supports_cardholder_verification(self) -> bool {
        self.0[0] & aip::CARDHOLDER_VERIFICATION != 0
    }

    /// Strongest authentication method the card declares, if any
    ///
    /// Preference order is CDA over DDA over SDA.
    pub const fn strongest_method(self) -> Option<AuthMethod> {
        if self.supports_cda() {
            Some(AuthMethod::Cda)
        } else if self.supports_dda() {
            Some(AuthMethod::Dda)
        } else if self.supports_sda() {
            Some(AuthMethod::Sda)
        } else {
            None
        }
    }
}

/// Outcome of the authentication stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Outcome {
    /// The card's signed data verified against the recovered chain
    #[display("success")]
    Success,
    /// Verification was attempted and failed
    #[display("failed")]
    Failed,
    /// The card declares no offline authentication method
    #[display("not performed")]
    NotPerformed,
}

/// Terminal verdict of one authentication run
///
/// Immutable once constructed; the failure reason, when present, names
/// the first check that rejected the card.
#[derive(Debug)]
pub struct AuthenticationResult {
    method: Option<AuthMethod>,
    outcome: Outcome,
    failure: Option<Error>,
    data_authentication_code: Option<[u8; 2]>,
    icc_dynamic_number: Option<Bytes>,
}

impl AuthenticationResult {
    pub(crate) fn success(method: AuthMethod) -> Self {
        Self {
            method: Some(method),
            outcome: Outcome::Success,
            failure: None,
            data_authentication_code: None,
            icc_dynamic_number: None,
        }
    }

    pub(crate) fn failed(method: AuthMethod, failure: Error) -> Self {
        Self {
            method: Some(method),
            outcome: Outcome::Failed,
            failure: Some(failure),
            data_authentication_code: None,
            icc_dynamic_number: None,
        }
    }

    pub(crate) fn not_performed() -> Self {
        Self {
            method: None,
            outcome: Outcome::NotPerformed,
            failure: None,
            data_authentication_code: None,
            icc_dynamic_number: None,
        }
    }

    pub(crate) fn with_data_authentication_code(mut self, dac: [u8; 2]) -> Self {
        self.data_authentication_code = Some(dac);
        self
    }

    pub(crate) fn with_icc_dynamic_number(mut self, number: Bytes) -> Self {
        self.icc_dynamic_number = Some(number);
        self
    }

    /// The method that was run, `None` when nothing was performed
    pub const fn method(&self) -> Option<AuthMethod> {
        self.method
    }

    /// The verdict
    pub const fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Whether the card authenticated successfully
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// The first check that failed, when the outcome is `Failed`
    pub const fn failure(&self) -> Option<&Error> {
        self.failure.as_ref()
    }

    /// Data Authentication Code recovered by SDA
    pub const fn data_authentication_code(&self) -> Option<[u8; 2]> {
        self.data_authentication_code
    }

    /// ICC dynamic number recovered by DDA or CDA
    pub fn icc_dynamic_number(&self) -> Option<&[u8]> {
        self.icc_dynamic_number.as_deref()
    }

    /// Whether the verdict rests on static data only
    ///
    /// SDA proves the issuer signed the card's static data but gives
    /// no per-transaction uniqueness: a verbatim copy of the card's
    /// files would verify identically. Callers performing risk
    /// decisions must treat a static-only pass as the weaker evidence
    /// it is.
    pub fn is_static_only(&self) -> bool {
        self.method == Some(AuthMethod::Sda) && self.is_success()
    }
}

/// A calendar date supplied by the caller as "now"
///
/// The engine never reads a clock; certificate expiry is judged
/// against this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Date {
    year: u16,
    month: u8,
    day: u8,
}

impl Date {
    /// Create a date; months and days are 1-based
    pub const fn new(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    /// Calendar year
    pub const fn year(self) -> u16 {
        self.year
    }

    /// Calendar month (1..=12)
    pub const fn month(self) -> u8 {
        self.month
    }

    /// Day of month (1..=31)
    pub const fn day(self) -> u8 {
        self.day
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn aip_method_priority() {
        // CDA beats DDA beats SDA
        assert_eq!(Aip::parse(&hex!("6100")).unwrap().strongest_method(), Some(AuthMethod::Cda));
        assert_eq!(Aip::parse(&hex!("6000")).unwrap().strongest_method(), Some(AuthMethod::Dda));
        assert_eq!(Aip::parse(&hex!("4000")).unwrap().strongest_method(), Some(AuthMethod::Sda));
        assert_eq!(Aip::parse(&hex!("1800")).unwrap().strongest_method(), None);
    }

    #[test]
    fn aip_must_be_two_bytes() {
        assert!(Aip::parse(&hex!("40")).is_err());
        assert!(Aip::parse(&hex!("400000")).is_err());
    }

    #[test]
    fn digest_algorithms() {
        let sha1 = HashAlgorithm::from_indicator(0x01).unwrap();
        assert_eq!(sha1, HashAlgorithm::Sha1);
        assert_eq!(sha1.digest_len(), 20);
        // Split input digests identically to contiguous input
        assert_eq!(sha1.digest(&[b"ab", b"c"]), sha1.digest(&[b"abc"]));
        assert_eq!(
            sha1.digest(&[b"abc"]),
            hex!("A9993E364706816ABA3E25717850C26C9CD0D89D")
        );

        assert_eq!(HashAlgorithm::from_indicator(0x02), Some(HashAlgorithm::Sha256));
        assert_eq!(HashAlgorithm::from_indicator(0x03), None);
    }

    #[test]
    fn static_only_marker() {
        let sda = AuthenticationResult::success(AuthMethod::Sda);
        assert!(sda.is_static_only());
        let dda = AuthenticationResult::success(AuthMethod::Dda);
        assert!(!dda.is_static_only());
    }

    #[test]
    fn date_ordering() {
        assert!(Date::new(2026, 8, 6) > Date::new(2026, 7, 31));
        assert!(Date::new(2026, 8, 6) < Date::new(2027, 1, 1));
    }
}

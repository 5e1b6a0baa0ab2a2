//! Public key certificate chain recovery
//!
//! The trust chain runs CA → Issuer → ICC: the terminal's provisioned
//! CA key recovers the issuer certificate (EMV Book 2 §6.3), and the
//! issuer key recovered from it recovers the ICC certificate (§6.4).
//! Each step is a fallible function whose output type is the only way
//! to reach the next step, so no caller can skip a link or trust a
//! partially-checked key; any failed check names itself in the error.

use derive_more::Display;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use tracing::debug;

use crate::auth::recovery::{self, RecoveryError};
use crate::auth::{Date, HashAlgorithm};
use crate::capk::{CaPublicKey, CapkIndex};
use crate::constants::{cert, tags};
use crate::data::TransactionData;
use crate::error::{ChainCheck, ChainStep, Error, Result};

/// Which link of the chain produced a recovered key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum KeyOrigin {
    /// Issuer public key, recovered with a CA key
    #[display("issuer")]
    Issuer,
    /// ICC public key, recovered with an issuer key
    #[display("ICC")]
    Icc,
}

/// A public key recovered from a verified certificate
///
/// Lives for one transaction: each instance is consumed by the next
/// chain step or the cryptogram verifier and then dropped.
#[derive(Debug, Clone)]
pub struct RecoveredKey {
    origin: KeyOrigin,
    identifier: Vec<u8>,
    expiry_month: u8,
    expiry_year: u16,
    serial: [u8; 3],
    hash: HashAlgorithm,
    key: RsaPublicKey,
}

impl RecoveredKey {
    /// Which certificate this key came from
    pub const fn origin(&self) -> KeyOrigin {
        self.origin
    }

    /// Issuer identifier (issuer) or full PAN (ICC), as BCD bytes
    pub fn identifier(&self) -> &[u8] {
        &self.identifier
    }

    /// Certificate expiry as (year, month); valid through that month
    pub const fn expiry(&self) -> (u16, u8) {
        (self.expiry_year, self.expiry_month)
    }

    /// Certificate serial number
    pub const fn serial(&self) -> [u8; 3] {
        self.serial
    }

    /// Hash algorithm the certificate names for dependent signatures
    pub const fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    pub(crate) const fn key(&self) -> &RsaPublicKey {
        &self.key
    }
}

/// Stepwise verifier over the CA → Issuer → ICC chain
#[derive(Debug)]
pub struct ChainVerifier<'a> {
    capk: &'a CapkIndex,
    now: Date,
}

impl<'a> ChainVerifier<'a> {
    /// Create a verifier over a trusted key index, judging expiry
    /// against `now`
    pub const fn new(capk: &'a CapkIndex, now: Date) -> Self {
        Self { capk, now }
    }

    /// Step 1: look up the CA key the card's data designates
    pub fn ca_key(&self, rid: [u8; 5], index: u8) -> Result<&'a CaPublicKey> {
        self.capk
            .get(rid, index)
            .ok_or(Error::UnknownCaKey { rid, index })
    }

    /// Step 2: recover and validate the issuer public key
    pub fn recover_issuer_key(
        &self,
        ca: &CaPublicKey,
        data: &TransactionData,
    ) -> Result<RecoveredKey> {
        const STEP: ChainStep = ChainStep::Issuer;

        let certificate = data.require(tags::ISSUER_PK_CERTIFICATE)?;
        let exponent = data.require(tags::ISSUER_PK_EXPONENT)?;
        let remainder = data.get(tags::ISSUER_PK_REMAINDER).unwrap_or_default();

        let ca_key = ca.rsa_key()?;
        let recovered = recovery::recover(certificate, &ca_key)
            .map_err(|e| recovery_failure(STEP, e))?;

        let key = self.validate_certificate(STEP, &recovered, exponent, remainder, &[], data)?;
        debug!(origin = %key.origin, bits = key.key.n().bits(), "issuer public key recovered");
        Ok(key)
    }

    /// Step 3: recover and validate the ICC public key
    ///
    /// `static_data` is the concatenated static authentication input
    /// (AFL-designated records plus SDA tag list values); the ICC
    /// certificate's hash covers it, binding the key to the card data.
    pub fn recover_icc_key(
        &self,
        issuer: &RecoveredKey,
        data: &TransactionData,
        static_data: &[u8],
    ) -> Result<RecoveredKey> {
        const STEP: ChainStep = ChainStep::Icc;

        let certificate = data.require(tags::ICC_PK_CERTIFICATE)?;
        let exponent = data.require(tags::ICC_PK_EXPONENT)?;
        let remainder = data.get(tags::ICC_PK_REMAINDER).unwrap_or_default();

        let recovered = recovery::recover(certificate, issuer.key())
            .map_err(|e| recovery_failure(STEP, e))?;

        let key =
            self.validate_certificate(STEP, &recovered, exponent, remainder, static_data, data)?;
        debug!(origin = %key.origin, bits = key.key.n().bits(), "ICC public key recovered");
        Ok(key)
    }

    /// Shared certificate validation over the recovered plaintext
    ///
    /// Certificate layout (Book 2 tables 6 and 14; `id` is 4 bytes of
    /// issuer identifier or 10 bytes of PAN):
    ///
    /// ```text
    /// header(1) format(1) id expiry(2) serial(3) hash-alg(1)
    /// key-alg(1) key-len(1) exp-len(1) leftmost-key-digits
    /// hash(20|32) trailer(1)
    /// ```
    fn validate_certificate(
        &self,
        step: ChainStep,
        recovered: &[u8],
        exponent: &[u8],
        remainder: &[u8],
        static_data: &[u8],
        data: &TransactionData,
    ) -> Result<RecoveredKey> {
        let fail = |check: ChainCheck| Error::ChainFailed { step, check };

        let (expected_format, id_len, origin) = match step {
            ChainStep::Issuer => (cert::ISSUER_FORMAT, 4, KeyOrigin::Issuer),
            ChainStep::Icc => (cert::ICC_FORMAT, 10, KeyOrigin::Icc),
        };
        if recovered.len() < 12 + id_len {
            return Err(fail(ChainCheck::Length));
        }
        if recovered[1] != expected_format {
            return Err(fail(ChainCheck::Format));
        }

        let identifier = &recovered[2..2 + id_len];
        let expiry = [recovered[2 + id_len], recovered[3 + id_len]];
        let serial = [
            recovered[4 + id_len],
            recovered[5 + id_len],
            recovered[6 + id_len],
        ];
        let hash = HashAlgorithm::from_indicator(recovered[7 + id_len])
            .ok_or(fail(ChainCheck::HashAlgorithm))?;
        if recovered[8 + id_len] != cert::KEY_RSA {
            return Err(fail(ChainCheck::KeyAlgorithm));
        }
        let key_len = recovered[9 + id_len] as usize;
        let exponent_len = recovered[10 + id_len] as usize;

        let hash_pos = recovered
            .len()
            .checked_sub(1 + hash.digest_len())
            .filter(|&pos| pos >= 11 + id_len)
            .ok_or(fail(ChainCheck::Length))?;
        let digits = &recovered[11 + id_len..hash_pos];

        if exponent_len != exponent.len() {
            return Err(fail(ChainCheck::Exponent));
        }
        if !matches!(exponent, [0x03] | [0x01, 0x00, 0x01]) {
            return Err(fail(ChainCheck::Exponent));
        }

        // The certificate's hash covers its content plus the key parts
        // the certificate could not carry; for the ICC step it also
        // covers the card's static authentication data.
        let computed = hash.digest(&[&recovered[1..hash_pos], remainder, exponent, static_data]);
        if computed != recovered[hash_pos..recovered.len() - 1] {
            return Err(fail(ChainCheck::Checksum));
        }

        let modulus = assemble_modulus(step, digits, remainder, key_len)?;

        self.check_identity(step, identifier, data)?;

        let expiry_month = bcd(expiry[0]).filter(|m| (1..=12).contains(m));
        let expiry_month = expiry_month.ok_or(fail(ChainCheck::Format))?;
        let expiry_year = 2000 + bcd(expiry[1]).ok_or(fail(ChainCheck::Format))? as u16;
        self.check_expiry(step, expiry_year, expiry_month)?;

        let key = RsaPublicKey::new(
            BigUint::from_bytes_be(&modulus),
            BigUint::from_bytes_be(exponent),
        )
        .map_err(|_| fail(ChainCheck::Modulus))?;

        Ok(RecoveredKey {
            origin,
            identifier: identifier.to_vec(),
            expiry_month,
            expiry_year,
            serial,
            hash,
            key,
        })
    }

    /// Issuer identifiers must prefix the PAN; ICC certificates must
    /// name the PAN exactly
    fn check_identity(&self, step: ChainStep, identifier: &[u8], data: &TransactionData) -> Result<()> {
        let pan = data.require(tags::APPLICATION_PAN)?;
        let pan_digits = digits_of(pan);
        let id_digits = digits_of(identifier);

        let matches = match step {
            ChainStep::Issuer => {
                !id_digits.is_empty() && pan_digits.starts_with(&id_digits)
            }
            ChainStep::Icc => pan_digits == id_digits,
        };
        if matches {
            Ok(())
        } else {
            Err(Error::ChainFailed {
                step,
                check: match step {
                    ChainStep::Issuer => ChainCheck::IssuerIdentifier,
                    ChainStep::Icc => ChainCheck::Pan,
                },
            })
        }
    }

    /// Certificates are valid through the last day of their MMYY month
    fn check_expiry(&self, step: ChainStep, year: u16, month: u8) -> Result<()> {
        if (self.now.year(), self.now.month()) > (year, month) {
            debug!(%step, expiry_year = year, expiry_month = month, "certificate expired");
            return Err(Error::ChainFailed {
                step,
                check: ChainCheck::Expired,
            });
        }
        Ok(())
    }
}

/// Reassemble the full modulus from the certificate's leftmost digits
/// and the remainder data object, checking the padding of any unused
/// positions
fn assemble_modulus(
    step: ChainStep,
    digits: &[u8],
    remainder: &[u8],
    key_len: usize,
) -> Result<Vec<u8>> {
    let fail = |check: ChainCheck| Error::ChainFailed { step, check };

    if key_len == 0 {
        return Err(fail(ChainCheck::Modulus));
    }

    if key_len > digits.len() {
        if remainder.len() != key_len - digits.len() {
            return Err(fail(ChainCheck::Modulus));
        }
        let mut modulus = Vec::with_capacity(key_len);
        modulus.extend_from_slice(digits);
        modulus.extend_from_slice(remainder);
        Ok(modulus)
    } else {
        if !remainder.is_empty() {
            return Err(fail(ChainCheck::Modulus));
        }
        if digits[key_len..].iter().any(|&b| b != cert::PAD) {
            return Err(fail(ChainCheck::Padding));
        }
        Ok(digits[..key_len].to_vec())
    }
}

fn recovery_failure(step: ChainStep, error: RecoveryError) -> Error {
    Error::ChainFailed {
        step,
        check: match error {
            RecoveryError::Length => ChainCheck::Length,
            RecoveryError::Frame => ChainCheck::Frame,
        },
    }
}

fn bcd(byte: u8) -> Option<u8> {
    let (high, low) = (byte >> 4, byte & 0x0F);
    (high <= 9 && low <= 9).then_some(high * 10 + low)
}

/// Unpack compressed-numeric bytes into decimal digits, stopping at
/// the F padding
fn digits_of(bytes: &[u8]) -> Vec<u8> {
    let mut digits = Vec::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        for nibble in [byte >> 4, byte & 0x0F] {
            if nibble == 0xF {
                return digits;
            }
            digits.push(nibble);
        }
    }
    digits
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn bcd_decoding() {
        assert_eq!(bcd(0x26), Some(26));
        assert_eq!(bcd(0x09), Some(9));
        assert_eq!(bcd(0x2A), None);
    }

    #[test]
    fn compressed_digits() {
        assert_eq!(digits_of(&hex!("476173FF")), vec![4, 7, 6, 1, 7, 3]);
        assert_eq!(digits_of(&hex!("40F0")), vec![4, 0]);
        assert_eq!(digits_of(&[]), Vec::<u8>::new());
    }

    #[test]
    fn modulus_with_remainder() {
        let digits = [0xAA; 8];
        let remainder = [0xCC; 4];
        let modulus =
            assemble_modulus(ChainStep::Issuer, &digits, &remainder, 12).unwrap();
        assert_eq!(&modulus[..8], &digits);
        assert_eq!(&modulus[8..], &remainder);
    }

    #[test]
    fn modulus_padding_checked() {
        let mut digits = [0xBB; 8];
        digits[0] = 0xAA;
        digits[1] = 0xAB;
        assert!(assemble_modulus(ChainStep::Issuer, &digits, &[], 2).is_ok());

        digits[5] = 0x00;
        assert!(matches!(
            assemble_modulus(ChainStep::Issuer, &digits, &[], 2),
            Err(Error::ChainFailed { check: ChainCheck::Padding, .. })
        ));
    }

    #[test]
    fn modulus_remainder_mismatch() {
        assert!(matches!(
            assemble_modulus(ChainStep::Icc, &[0xAA; 8], &[0xCC; 3], 12),
            Err(Error::ChainFailed { step: ChainStep::Icc, check: ChainCheck::Modulus })
        ));
    }
}

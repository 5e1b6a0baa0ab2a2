//! Signed application data verification (SDA, DDA, CDA)
//!
//! All three schemes recover a signed payload with a key from the
//! certificate chain and compare a recovered hash against a digest the
//! terminal computes independently. The digest input differs per
//! scheme; reproducing it byte for byte is the whole game.

use bytes::Bytes;
use tracing::debug;

use crate::auth::chain::RecoveredKey;
use crate::auth::recovery::{self, RecoveryError};
use crate::auth::HashAlgorithm;
use crate::constants::{cert, tags};
use crate::data::TransactionData;
use crate::error::{Error, Result, SignatureCheck};

/// Outcome of Static Data Authentication
#[derive(Debug)]
pub(crate) struct SdaOutcome {
    /// Data Authentication Code recovered from the signature
    pub dac: [u8; 2],
}

/// Outcome of Dynamic Data Authentication
#[derive(Debug)]
pub(crate) struct DdaOutcome {
    /// ICC dynamic number recovered from the signature
    pub icc_dynamic_number: Bytes,
}

/// Outcome of Combined Data Authentication
#[derive(Debug)]
pub(crate) struct CdaOutcome {
    /// ICC dynamic number recovered from the signature
    pub icc_dynamic_number: Bytes,
    /// Application cryptogram carried inside the signature
    pub cryptogram: [u8; 8],
}

fn fail(check: SignatureCheck) -> Error {
    Error::SignatureInvalid { check }
}

fn recovery_failure(error: RecoveryError) -> Error {
    fail(match error {
        RecoveryError::Length => SignatureCheck::Length,
        RecoveryError::Frame => SignatureCheck::Frame,
    })
}

/// Verify the Signed Static Application Data (tag 93) with the issuer
/// key (Book 2 §5.4)
///
/// Recovered layout: `header(1) format(1) hash-alg(1) DAC(2) pad
/// hash trailer(1)`; the digest covers the content and the static
/// authentication data.
pub(crate) fn verify_sda(
    issuer: &RecoveredKey,
    data: &TransactionData,
    static_data: &[u8],
) -> Result<SdaOutcome> {
    let signed = data.require(tags::SIGNED_STATIC_APPLICATION_DATA)?;
    let recovered = recovery::recover(signed, issuer.key()).map_err(recovery_failure)?;

    if recovered.len() < 5 {
        return Err(fail(SignatureCheck::Length));
    }
    if recovered[1] != cert::STATIC_FORMAT {
        return Err(fail(SignatureCheck::Format));
    }
    let hash =
        HashAlgorithm::from_indicator(recovered[2]).ok_or(fail(SignatureCheck::HashAlgorithm))?;
    let hash_pos = recovered
        .len()
        .checked_sub(1 + hash.digest_len())
        .filter(|&pos| pos >= 5)
        .ok_or(fail(SignatureCheck::Length))?;

    if recovered[5..hash_pos].iter().any(|&b| b != cert::PAD) {
        return Err(fail(SignatureCheck::Padding));
    }

    let computed = hash.digest(&[&recovered[1..hash_pos], static_data]);
    if computed != recovered[hash_pos..recovered.len() - 1] {
        return Err(fail(SignatureCheck::Digest));
    }

    let dac = [recovered[3], recovered[4]];
    debug!(dac = %hex::encode_upper(dac), "static application data verified");
    Ok(SdaOutcome { dac })
}

/// Verify Signed Dynamic Application Data against the terminal's DDOL
/// bytes (Book 2 §6.5.2)
///
/// The DDOL bytes include the unpredictable number the terminal sent
/// with INTERNAL AUTHENTICATE, so a signature over any other challenge
/// fails the digest check: that is the replay protection.
pub(crate) fn verify_dda(
    icc: &RecoveredKey,
    signed: &[u8],
    ddol_data: &[u8],
) -> Result<DdaOutcome> {
    let recovered = recovery::recover(signed, icc.key()).map_err(recovery_failure)?;
    let (hash_pos, hash, dynamic) = parse_dynamic(&recovered)?;

    let computed = hash.digest(&[&recovered[1..hash_pos], ddol_data]);
    if computed != recovered[hash_pos..recovered.len() - 1] {
        return Err(fail(SignatureCheck::Digest));
    }

    let icc_dynamic_number = dynamic_number(dynamic)?;
    debug!("dynamic application data verified");
    Ok(DdaOutcome { icc_dynamic_number })
}

/// Verify Signed Dynamic Application Data produced by GENERATE AC in
/// CDA mode (Book 2 §6.6.2)
///
/// The ICC dynamic data additionally carries the Cryptogram
/// Information Data, the application cryptogram, and a hash over the
/// transaction data; `transaction_data` must be the exact
/// reconstruction of the input the card hashed (PDOL values, CDOL
/// values, then the GENERATE AC response data objects minus the
/// signature itself).
pub(crate) fn verify_cda(
    icc: &RecoveredKey,
    signed: &[u8],
    unpredictable_number: &[u8],
    cid: u8,
    transaction_data: &[u8],
) -> Result<CdaOutcome> {
    let recovered = recovery::recover(signed, icc.key()).map_err(recovery_failure)?;
    let (hash_pos, hash, dynamic) = parse_dynamic(&recovered)?;

    let computed = hash.digest(&[&recovered[1..hash_pos], unpredictable_number]);
    if computed != recovered[hash_pos..recovered.len() - 1] {
        return Err(fail(SignatureCheck::Digest));
    }

    // ICC dynamic data: idn-len(1) idn cid(1) cryptogram(8) tx-hash
    let idn_len = *dynamic.first().ok_or(fail(SignatureCheck::DynamicData))? as usize;
    if dynamic.len() != 1 + idn_len + 1 + 8 + hash.digest_len() {
        return Err(fail(SignatureCheck::DynamicData));
    }
    let signed_cid = dynamic[1 + idn_len];
    if signed_cid != cid {
        return Err(fail(SignatureCheck::CryptogramInfo));
    }
    let mut cryptogram = [0u8; 8];
    cryptogram.copy_from_slice(&dynamic[2 + idn_len..10 + idn_len]);
    let transaction_hash = &dynamic[10 + idn_len..];

    if hash.digest(&[transaction_data]) != transaction_hash {
        return Err(fail(SignatureCheck::TransactionHash));
    }

    debug!(cid = %hex::encode_upper([cid]), "combined dynamic application data verified");
    Ok(CdaOutcome {
        icc_dynamic_number: Bytes::copy_from_slice(&dynamic[1..1 + idn_len]),
        cryptogram,
    })
}

/// Common layout of signed dynamic data: `header(1) format(1)
/// hash-alg(1) dynamic-len(1) dynamic pad hash trailer(1)`
fn parse_dynamic(recovered: &[u8]) -> Result<(usize, HashAlgorithm, &[u8])> {
    if recovered.len() < 4 {
        return Err(fail(SignatureCheck::DynamicData));
    }
    if recovered[1] != cert::DYNAMIC_FORMAT {
        return Err(fail(SignatureCheck::Format));
    }
    let hash =
        HashAlgorithm::from_indicator(recovered[2]).ok_or(fail(SignatureCheck::HashAlgorithm))?;
    let dynamic_len = recovered[3] as usize;

    let hash_pos = recovered
        .len()
        .checked_sub(1 + hash.digest_len())
        .filter(|&pos| pos >= 4 + dynamic_len)
        .ok_or(fail(SignatureCheck::DynamicData))?;

    if recovered[4 + dynamic_len..hash_pos]
        .iter()
        .any(|&b| b != cert::PAD)
    {
        return Err(fail(SignatureCheck::Padding));
    }

    Ok((hash_pos, hash, &recovered[4..4 + dynamic_len]))
}

/// The first byte of the ICC dynamic data is the length of the ICC
/// dynamic number it carries
fn dynamic_number(dynamic: &[u8]) -> Result<Bytes> {
    if dynamic.is_empty() {
        return Ok(Bytes::new());
    }
    let len = dynamic[0] as usize;
    if 1 + len > dynamic.len() {
        return Err(fail(SignatureCheck::DynamicData));
    }
    Ok(Bytes::copy_from_slice(&dynamic[1..1 + len]))
}

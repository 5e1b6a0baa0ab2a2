//! RSA signature recovery
//!
//! EMV signatures are message-recovering: verification is a single
//! modular exponentiation with the public exponent, after which the
//! plaintext must be framed by the 6A header and BC trailer bytes.
//! What the recovered payload means is the caller's business.

use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};

use crate::constants::cert;

/// Low-level recovery failure, mapped by callers onto the chain or
/// signature error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecoveryError {
    /// Signed data length does not match the key's modulus length,
    /// or its value is not below the modulus
    Length,
    /// Recovered data is not framed by the 6A header / BC trailer
    Frame,
}

/// Recover the signed payload, left-padded to the modulus length
pub(crate) fn recover(signed: &[u8], key: &RsaPublicKey) -> Result<Vec<u8>, RecoveryError> {
    let modulus_len = key.size();
    if signed.len() != modulus_len {
        return Err(RecoveryError::Length);
    }

    let signature = BigUint::from_bytes_be(signed);
    if &signature >= key.n() {
        return Err(RecoveryError::Length);
    }

    let message = signature.modpow(key.e(), key.n());
    let bytes = message.to_bytes_be();
    let mut recovered = vec![0u8; modulus_len - bytes.len()];
    recovered.extend_from_slice(&bytes);

    if recovered[0] != cert::HEADER || recovered[modulus_len - 1] != cert::TRAILER {
        return Err(RecoveryError::Frame);
    }
    Ok(recovered)
}

//! Trusted Certification Authority public key index
//!
//! Payment system CA keys are distributed out of band and provisioned
//! by a key-management process at startup. During verification the
//! index is borrowed read-only; all mutation happens before the engine
//! sees it, so a `&CapkIndex` can be shared freely across concurrent
//! transactions.

use std::collections::HashMap;

use rsa::{BigUint, RsaPublicKey};

use crate::auth::HashAlgorithm;
use crate::error::{ChainCheck, ChainStep, Error, Result};

/// One trusted CA public key, addressed by (RID, index)
#[derive(Debug, Clone)]
pub struct CaPublicKey {
    rid: [u8; 5],
    index: u8,
    modulus: Vec<u8>,
    exponent: Vec<u8>,
    hash: HashAlgorithm,
}

impl CaPublicKey {
    /// Create a CA key entry
    ///
    /// `modulus` and `exponent` are big-endian byte strings as
    /// published by the payment system (moduli run 512 to 1984 bits,
    /// exponents are 3 or 65537).
    pub fn new(
        rid: [u8; 5],
        index: u8,
        modulus: Vec<u8>,
        exponent: Vec<u8>,
        hash: HashAlgorithm,
    ) -> Self {
        Self {
            rid,
            index,
            modulus,
            exponent,
            hash,
        }
    }

    /// Registered application provider identifier
    pub const fn rid(&self) -> [u8; 5] {
        self.rid
    }

    /// CA public key index within the RID
    pub const fn index(&self) -> u8 {
        self.index
    }

    /// Big-endian modulus bytes
    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    /// Big-endian exponent bytes
    pub fn exponent(&self) -> &[u8] {
        &self.exponent
    }

    /// Hash algorithm the payment system published for this key
    pub const fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    /// Materialise the RSA public key for recovery operations
    pub(crate) fn rsa_key(&self) -> Result<RsaPublicKey> {
        RsaPublicKey::new(
            BigUint::from_bytes_be(&self.modulus),
            BigUint::from_bytes_be(&self.exponent),
        )
        .map_err(|_| Error::ChainFailed {
            step: ChainStep::Issuer,
            check: ChainCheck::CaKey,
        })
    }
}

/// Read-only index of trusted CA public keys
#[derive(Debug, Clone, Default)]
pub struct CapkIndex {
    entries: HashMap<([u8; 5], u8), CaPublicKey>,
}

impl CapkIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key during provisioning; replaces any entry under the
    /// same (RID, index)
    pub fn insert(&mut self, key: CaPublicKey) {
        self.entries.insert((key.rid, key.index), key);
    }

    /// Look up the key for `(rid, index)`
    pub fn get(&self, rid: [u8; 5], index: u8) -> Option<&CaPublicKey> {
        self.entries.get(&(rid, index))
    }

    /// Number of provisioned keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no keys are provisioned
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! EMV transaction data engine
//!
//! Decodes a chip card's BER-TLV data objects, validates them against
//! the EMV tag dictionary, assembles DOL- and AFL-driven data sets,
//! and performs the offline data authentication chain (SDA, DDA, CDA)
//! over the card's RSA certificates.
//!
//! The engine is pure computation: raw response bytes arrive from an
//! external reader collaborator, trusted CA keys arrive from an
//! external key-management collaborator, and the caller supplies the
//! current date. Given those, [`Engine::authenticate`] returns the
//! transaction's attribute set and an [`AuthenticationResult`] that
//! either succeeded or names the exact check that rejected the card.
//! Verification failures are never demoted to warnings, and malformed
//! input never reaches the cryptographic stages.
//!
//! ```no_run
//! use emv_engine::{CapkIndex, CardData, Date, Engine, TransactionData};
//!
//! let capk = CapkIndex::new(); // provisioned at startup
//! let engine = Engine::new(&capk);
//!
//! let card = CardData::default(); // collected by the reader
//! let terminal = TransactionData::new();
//! let outcome = engine.authenticate(&card, terminal, Date::new(2026, 8, 6))?;
//! println!("{:?}", outcome.result.outcome());
//! # Ok::<(), emv_engine::Error>(())
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod auth;
pub mod capk;
pub mod commands;
pub mod constants;
pub mod data;
pub mod dictionary;
pub mod dol;
mod engine;
pub mod error;
pub mod response;

pub use auth::{
    Aip, AuthMethod, AuthenticationResult, ChainVerifier, Date, HashAlgorithm, KeyOrigin, Outcome,
    RecoveredKey,
};
pub use capk::{CaPublicKey, CapkIndex};
pub use commands::{Command, CryptogramType};
pub use data::{EmvAttribute, TransactionData};
pub use dol::{Afl, AflEntry, Dol, DolEntry};
pub use engine::{
    unpredictable_number, CardData, Engine, EngineConfig, Record, TransactionOutcome,
};
pub use error::{ChainCheck, ChainStep, Error, Result, SignatureCheck};
pub use response::{Response, Status, StatusWord};

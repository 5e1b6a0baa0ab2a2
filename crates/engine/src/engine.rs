//! Transaction orchestration
//!
//! [`Engine::authenticate`] drives the full read-and-authenticate
//! flow over response bytes an external reader collected: decode the
//! processing options, decode the AFL-designated records into the
//! attribute set, then run the certificate chain and the cryptogram
//! verification the card's AIP calls for. Structural failures abort
//! the transaction with an error; verification failures come back as
//! an explicit `Failed` result. Nothing cryptographic runs over
//! malformed input.

use bytes::{Bytes, BytesMut};
use rand::RngCore;
use tracing::{debug, warn};

use emv_tlv::{decode_with_limit, find_value, Tag};

use crate::auth::oda;
use crate::auth::{Aip, AuthMethod, AuthenticationResult, ChainVerifier, Date};
use crate::capk::CapkIndex;
use crate::constants::tags;
use crate::data::TransactionData;
use crate::dol::{Afl, Dol};
use crate::error::{Error, Result};

/// Engine tuning knobs
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Nesting bound handed to the TLV decoder
    pub max_tlv_depth: usize,
    /// Whether Static Data Authentication may be selected
    pub supports_sda: bool,
    /// Whether Dynamic Data Authentication may be selected
    pub supports_dda: bool,
    /// Whether Combined Data Authentication may be selected
    pub supports_cda: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_tlv_depth: emv_tlv::DEFAULT_MAX_DEPTH,
            supports_sda: true,
            supports_dda: true,
            supports_cda: true,
        }
    }
}

/// One record read per the AFL, as returned by READ RECORD
#[derive(Debug, Clone)]
pub struct Record {
    /// Short file identifier the record was read from
    pub sfi: u8,
    /// Record number within the file
    pub number: u8,
    /// Response payload (status word stripped)
    pub payload: Bytes,
}

/// Raw card responses collected by the reader for one transaction
#[derive(Debug, Clone, Default)]
pub struct CardData {
    /// Selected application identifier
    pub aid: Bytes,
    /// GET PROCESSING OPTIONS response payload
    pub gpo: Bytes,
    /// READ RECORD response payloads
    pub records: Vec<Record>,
    /// INTERNAL AUTHENTICATE response payload, when DDA was run
    pub internal_authenticate: Option<Bytes>,
    /// First GENERATE AC response payload, when CDA was requested
    pub generate_ac: Option<Bytes>,
}

impl CardData {
    /// The registered application provider identifier: the first five
    /// AID bytes
    pub fn rid(&self) -> Result<[u8; 5]> {
        self.aid
            .get(..5)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(Error::InvalidDataObject {
                tag: tags::APPLICATION_IDENTIFIER,
            })
    }
}

/// Everything one transaction produces
#[derive(Debug)]
pub struct TransactionOutcome {
    /// The transaction's full attribute set, for downstream risk
    /// management
    pub attributes: TransactionData,
    /// The authentication verdict
    pub result: AuthenticationResult,
}

/// The transaction engine
///
/// Borrows the trusted key index for its lifetime and never mutates
/// it; one engine may serve any number of concurrent transactions.
#[derive(Debug)]
pub struct Engine<'k> {
    capk: &'k CapkIndex,
    config: EngineConfig,
}

impl<'k> Engine<'k> {
    /// Create an engine over a trusted CA key index
    pub fn new(capk: &'k CapkIndex) -> Self {
        Self::with_config(capk, EngineConfig::default())
    }

    /// Create an engine with explicit configuration
    pub const fn with_config(capk: &'k CapkIndex, config: EngineConfig) -> Self {
        Self { capk, config }
    }

    /// Run the read-and-authenticate flow for one transaction
    ///
    /// `terminal` seeds the attribute set with terminal-sourced data
    /// (unpredictable number, amounts, TVR, ...); `now` is the date
    /// certificate expiry is judged against.
    pub fn authenticate(
        &self,
        card: &CardData,
        terminal: TransactionData,
        now: Date,
    ) -> Result<TransactionOutcome> {
        let mut attributes = terminal;

        let aip = self.processing_options(card, &mut attributes)?;
        let afl = Afl::parse(attributes.require(tags::APPLICATION_FILE_LOCATOR)?)?;
        let static_data = self.read_records(card, &afl, &mut attributes)?;

        let result = match self.select_method(aip)? {
            None => {
                debug!(aip = %hex::encode_upper(aip.bytes()), "card declares no offline authentication");
                AuthenticationResult::not_performed()
            }
            Some(method) => {
                debug!(%method, "running offline data authentication");
                match self.verify(method, card, &mut attributes, aip, &static_data, now) {
                    Ok(result) => result,
                    Err(error) => {
                        warn!(%method, %error, "offline data authentication failed");
                        AuthenticationResult::failed(method, error)
                    }
                }
            }
        };

        Ok(TransactionOutcome { attributes, result })
    }

    /// Decode the GPO response into the attribute set and return the
    /// parsed AIP
    ///
    /// Format 1 (template 80) is the AIP and AFL concatenated; format
    /// 2 (template 77) carries them as discrete data objects.
    fn processing_options(&self, card: &CardData, attributes: &mut TransactionData) -> Result<Aip> {
        let (nodes, _) = decode_with_limit(&card.gpo, self.config.max_tlv_depth)?;
        let first = nodes.first().ok_or(Error::MissingDataObject {
            tag: tags::APPLICATION_INTERCHANGE_PROFILE,
        })?;

        if first.tag() == tags::RESPONSE_TEMPLATE_FORMAT_1 {
            let value = first.value().unwrap_or_default();
            if value.len() < 6 {
                return Err(Error::InvalidDataObject {
                    tag: tags::RESPONSE_TEMPLATE_FORMAT_1,
                });
            }
            attributes.insert(
                tags::APPLICATION_INTERCHANGE_PROFILE,
                Bytes::copy_from_slice(&value[..2]),
            );
            attributes.insert(
                tags::APPLICATION_FILE_LOCATOR,
                Bytes::copy_from_slice(&value[2..]),
            );
        } else {
            let aip = find_value(&nodes, tags::APPLICATION_INTERCHANGE_PROFILE).ok_or(
                Error::MissingDataObject {
                    tag: tags::APPLICATION_INTERCHANGE_PROFILE,
                },
            )?;
            let afl = find_value(&nodes, tags::APPLICATION_FILE_LOCATOR).ok_or(
                Error::MissingDataObject {
                    tag: tags::APPLICATION_FILE_LOCATOR,
                },
            )?;
            attributes.insert(tags::APPLICATION_INTERCHANGE_PROFILE, Bytes::copy_from_slice(aip));
            attributes.insert(tags::APPLICATION_FILE_LOCATOR, Bytes::copy_from_slice(afl));
        }

        Aip::parse(attributes.require(tags::APPLICATION_INTERCHANGE_PROFILE)?)
    }

    /// Decode every AFL-designated record into the attribute set and
    /// accumulate the static authentication input
    ///
    /// Records from files with sfi 1..=10 must be record templates and
    /// contribute their value field; records above contribute their
    /// full encoding as returned (Book 3 §10.3).
    fn read_records(
        &self,
        card: &CardData,
        afl: &Afl,
        attributes: &mut TransactionData,
    ) -> Result<BytesMut> {
        let mut static_data = BytesMut::new();

        for entry in afl.entries() {
            for number in entry.first..=entry.last {
                let record = card
                    .records
                    .iter()
                    .find(|record| record.sfi == entry.sfi && record.number == number)
                    .ok_or(Error::MissingRecord {
                        sfi: entry.sfi,
                        number,
                    })?;

                if entry.unwrapped_for_auth() {
                    let (nodes, _) =
                        decode_with_limit(&record.payload, self.config.max_tlv_depth)?;
                    let template = nodes
                        .first()
                        .filter(|node| node.tag() == tags::RECORD_TEMPLATE)
                        .ok_or(Error::InvalidDataObject {
                            tag: tags::RECORD_TEMPLATE,
                        })?;
                    attributes.absorb(core::slice::from_ref(template));

                    if entry.is_offline_auth(number) {
                        let (_, header, len) = emv_tlv::decode_header(&record.payload)?;
                        static_data.extend_from_slice(&record.payload[header..header + len]);
                    }
                } else {
                    // Proprietary files need not hold BER-TLV records
                    if let Ok((nodes, _)) =
                        decode_with_limit(&record.payload, self.config.max_tlv_depth)
                    {
                        attributes.absorb(&nodes);
                    }
                    if entry.is_offline_auth(number) {
                        static_data.extend_from_slice(&record.payload);
                    }
                }
            }
        }

        Ok(static_data)
    }

    /// Pick the strongest AIP-declared method the configuration
    /// supports
    fn select_method(&self, aip: Aip) -> Result<Option<AuthMethod>> {
        let candidates = [
            (AuthMethod::Cda, aip.supports_cda(), self.config.supports_cda),
            (AuthMethod::Dda, aip.supports_dda(), self.config.supports_dda),
            (AuthMethod::Sda, aip.supports_sda(), self.config.supports_sda),
        ];

        let mut declared = false;
        for (method, card_declares, engine_supports) in candidates {
            if card_declares {
                declared = true;
                if engine_supports {
                    return Ok(Some(method));
                }
            }
        }
        if declared {
            Err(Error::UnsupportedMethod { aip: aip.bytes() })
        } else {
            Ok(None)
        }
    }

    /// Recover the key chain and verify the card's signed data
    fn verify(
        &self,
        method: AuthMethod,
        card: &CardData,
        attributes: &mut TransactionData,
        aip: Aip,
        static_records: &[u8],
        now: Date,
    ) -> Result<AuthenticationResult> {
        let static_data = self.static_auth_data(attributes, aip, static_records)?;

        let index = attributes.require(tags::CA_PUBLIC_KEY_INDEX)?;
        let index = *index.first().ok_or(Error::InvalidDataObject {
            tag: tags::CA_PUBLIC_KEY_INDEX,
        })?;

        let chain = ChainVerifier::new(self.capk, now);
        let ca = chain.ca_key(card.rid()?, index)?;
        let issuer = chain.recover_issuer_key(ca, attributes)?;

        match method {
            AuthMethod::Sda => {
                let outcome = oda::verify_sda(&issuer, attributes, &static_data)?;
                attributes.insert(tags::DATA_AUTHENTICATION_CODE, outcome.dac.to_vec());
                Ok(AuthenticationResult::success(method)
                    .with_data_authentication_code(outcome.dac))
            }
            AuthMethod::Dda => {
                let icc = chain.recover_icc_key(&issuer, attributes, &static_data)?;
                let signed = self.signed_dynamic_data(card.internal_authenticate.as_deref())?;
                let ddol_data = self.ddol_data(attributes)?;
                let outcome = oda::verify_dda(&icc, &signed, &ddol_data)?;
                attributes.insert(tags::ICC_DYNAMIC_NUMBER, outcome.icc_dynamic_number.clone());
                Ok(AuthenticationResult::success(method)
                    .with_icc_dynamic_number(outcome.icc_dynamic_number))
            }
            AuthMethod::Cda => {
                let icc = chain.recover_icc_key(&issuer, attributes, &static_data)?;
                self.verify_combined(card, attributes, &icc)
            }
        }
    }

    /// CDA: the signature lives in the GENERATE AC response and binds
    /// the transaction data
    fn verify_combined(
        &self,
        card: &CardData,
        attributes: &mut TransactionData,
        icc: &crate::auth::RecoveredKey,
    ) -> Result<AuthenticationResult> {
        let response = card.generate_ac.as_deref().ok_or(Error::MissingDataObject {
            tag: tags::SIGNED_DYNAMIC_APPLICATION_DATA,
        })?;
        let (nodes, _) = decode_with_limit(response, self.config.max_tlv_depth)?;
        let template = nodes
            .first()
            .filter(|node| node.tag() == tags::RESPONSE_TEMPLATE_FORMAT_2)
            .ok_or(Error::InvalidDataObject {
                tag: tags::RESPONSE_TEMPLATE_FORMAT_2,
            })?;
        let children = template.children().unwrap_or_default();

        let cid = *find_value(children, tags::CRYPTOGRAM_INFORMATION_DATA)
            .and_then(<[u8]>::first)
            .ok_or(Error::MissingDataObject {
                tag: tags::CRYPTOGRAM_INFORMATION_DATA,
            })?;
        let signed = find_value(children, tags::SIGNED_DYNAMIC_APPLICATION_DATA).ok_or(
            Error::MissingDataObject {
                tag: tags::SIGNED_DYNAMIC_APPLICATION_DATA,
            },
        )?;

        // The card hashed PDOL values, CDOL1 values, then its own
        // response data objects minus the signature; reproduce that
        // concatenation exactly.
        let mut transaction_data = BytesMut::new();
        if let Some(pdol) = attributes.get(tags::PDOL) {
            let pdol = Dol::parse(pdol)?;
            transaction_data.extend_from_slice(&pdol.assemble(attributes)?);
        }
        let cdol1 = Dol::parse(attributes.require(tags::CDOL1)?)?;
        transaction_data.extend_from_slice(&cdol1.assemble(attributes)?);
        for node in children {
            if node.tag() != tags::SIGNED_DYNAMIC_APPLICATION_DATA {
                transaction_data.extend_from_slice(&node.encode());
            }
        }

        let unpredictable = attributes.require(tags::UNPREDICTABLE_NUMBER)?.to_vec();
        let outcome = oda::verify_cda(icc, signed, &unpredictable, cid, &transaction_data)?;

        // The verified signature vouches for the response contents;
        // only now do they enter the attribute set.
        attributes.absorb(children);
        attributes.insert(tags::APPLICATION_CRYPTOGRAM, outcome.cryptogram.to_vec());
        attributes.insert(tags::ICC_DYNAMIC_NUMBER, outcome.icc_dynamic_number.clone());

        Ok(AuthenticationResult::success(AuthMethod::Cda)
            .with_icc_dynamic_number(outcome.icc_dynamic_number))
    }

    /// Static authentication input: AFL-designated records plus the
    /// values the SDA tag list names
    ///
    /// Book 3 restricts the tag list to the AIP; anything else poisons
    /// offline authentication.
    fn static_auth_data(
        &self,
        attributes: &TransactionData,
        aip: Aip,
        static_records: &[u8],
    ) -> Result<Vec<u8>> {
        let mut data = static_records.to_vec();
        if let Some(list) = attributes.get(tags::SDA_TAG_LIST) {
            let mut pos = 0;
            while pos < list.len() {
                let (tag, consumed) = Tag::parse(&list[pos..], pos)?;
                if tag != tags::APPLICATION_INTERCHANGE_PROFILE {
                    return Err(Error::InvalidDataObject {
                        tag: tags::SDA_TAG_LIST,
                    });
                }
                data.extend_from_slice(&aip.bytes());
                pos += consumed;
            }
        }
        Ok(data)
    }

    /// The SDAD from an INTERNAL AUTHENTICATE response (format 1 or 2)
    fn signed_dynamic_data(&self, response: Option<&[u8]>) -> Result<Bytes> {
        let response = response.ok_or(Error::MissingDataObject {
            tag: tags::SIGNED_DYNAMIC_APPLICATION_DATA,
        })?;
        let (nodes, _) = decode_with_limit(response, self.config.max_tlv_depth)?;
        let first = nodes.first().ok_or(Error::MissingDataObject {
            tag: tags::SIGNED_DYNAMIC_APPLICATION_DATA,
        })?;

        let signed = if first.tag() == tags::RESPONSE_TEMPLATE_FORMAT_1 {
            first.value().unwrap_or_default()
        } else {
            find_value(&nodes, tags::SIGNED_DYNAMIC_APPLICATION_DATA).ok_or(
                Error::MissingDataObject {
                    tag: tags::SIGNED_DYNAMIC_APPLICATION_DATA,
                },
            )?
        };
        Ok(Bytes::copy_from_slice(signed))
    }

    /// Terminal dynamic data per the card's DDOL, or the default DDOL
    /// (just the unpredictable number) when the card carries none
    ///
    /// A DDOL that does not request the unpredictable number offers no
    /// replay protection and is rejected outright.
    fn ddol_data(&self, attributes: &TransactionData) -> Result<Bytes> {
        let ddol = match attributes.get(tags::DDOL) {
            Some(raw) => Dol::parse(raw)?,
            None => Dol::parse(&[0x9F, 0x37, 0x04])?,
        };
        if !ddol.requests(tags::UNPREDICTABLE_NUMBER) {
            return Err(Error::InvalidDataObject { tag: tags::DDOL });
        }
        ddol.assemble(attributes)
    }
}

/// Generate a four-byte unpredictable number (tag 9F37)
///
/// Convenience for callers that do not bring their own challenge
/// source; deterministic tests should insert a fixed value instead.
pub fn unpredictable_number() -> [u8; 4] {
    let mut challenge = [0u8; 4];
    rand::rng().fill_bytes(&mut challenge);
    challenge
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use crate::auth::Outcome;

    use super::*;

    fn engine_over(capk: &CapkIndex) -> Engine<'_> {
        Engine::new(capk)
    }

    #[test]
    fn rid_is_first_five_aid_bytes() {
        let card = CardData {
            aid: Bytes::from_static(&hex!("A0000000031010")),
            ..Default::default()
        };
        assert_eq!(card.rid().unwrap(), hex!("A000000003"));

        let short = CardData {
            aid: Bytes::from_static(&hex!("A000")),
            ..Default::default()
        };
        assert!(short.rid().is_err());
    }

    #[test]
    fn gpo_format_1_splits_aip_and_afl() {
        let capk = CapkIndex::new();
        let engine = engine_over(&capk);
        let card = CardData {
            gpo: Bytes::from_static(&hex!("800A 1800 08010100 10010300")),
            ..Default::default()
        };

        let mut attributes = TransactionData::new();
        let aip = engine.processing_options(&card, &mut attributes).unwrap();
        assert!(!aip.supports_sda());
        assert_eq!(
            attributes.get(tags::APPLICATION_FILE_LOCATOR),
            Some(&hex!("08010100 10010300")[..])
        );
    }

    #[test]
    fn gpo_format_2_uses_discrete_objects() {
        let capk = CapkIndex::new();
        let engine = engine_over(&capk);
        let card = CardData {
            gpo: Bytes::from_static(&hex!("770E 82021800 9408 08010100 10010300")),
            ..Default::default()
        };

        let mut attributes = TransactionData::new();
        let aip = engine.processing_options(&card, &mut attributes).unwrap();
        assert!(aip.supports_issuer_authentication());
    }

    #[test]
    fn gpo_without_aip_is_missing_data() {
        let capk = CapkIndex::new();
        let engine = engine_over(&capk);
        let card = CardData {
            gpo: Bytes::from_static(&hex!("7706 9404 08010100")),
            ..Default::default()
        };

        let mut attributes = TransactionData::new();
        assert!(matches!(
            engine.processing_options(&card, &mut attributes),
            Err(Error::MissingDataObject { tag }) if tag == tags::APPLICATION_INTERCHANGE_PROFILE
        ));
    }

    #[test]
    fn method_selection_honours_config() {
        let capk = CapkIndex::new();
        let engine = engine_over(&capk);

        let aip = Aip::parse(&hex!("6000")).unwrap(); // DDA + SDA
        assert_eq!(engine.select_method(aip).unwrap(), Some(AuthMethod::Dda));

        let no_dda = Engine::with_config(
            &capk,
            EngineConfig {
                supports_dda: false,
                ..Default::default()
            },
        );
        assert_eq!(no_dda.select_method(aip).unwrap(), Some(AuthMethod::Sda));

        let static_only_card = Aip::parse(&hex!("4000")).unwrap();
        let no_sda = Engine::with_config(
            &capk,
            EngineConfig {
                supports_sda: false,
                ..Default::default()
            },
        );
        assert!(matches!(
            no_sda.select_method(static_only_card),
            Err(Error::UnsupportedMethod { aip }) if aip == hex!("4000")
        ));
    }

    #[test]
    fn no_method_yields_not_performed() {
        let capk = CapkIndex::new();
        let engine = engine_over(&capk);

        let mut terminal = TransactionData::new();
        terminal.insert(tags::UNPREDICTABLE_NUMBER, hex!("01020304").to_vec());

        let card = CardData {
            aid: Bytes::from_static(&hex!("A0000000031010")),
            gpo: Bytes::from_static(&hex!("8006 0800 08010100")),
            records: vec![Record {
                sfi: 1,
                number: 1,
                payload: Bytes::from_static(&hex!("7006 5A044761739F")),
            }],
            ..Default::default()
        };

        let outcome = engine
            .authenticate(&card, terminal, Date::new(2026, 8, 6))
            .unwrap();
        assert_eq!(outcome.result.outcome(), Outcome::NotPerformed);
        assert_eq!(outcome.result.method(), None);
        assert!(outcome.attributes.contains(tags::APPLICATION_PAN));
    }

    #[test]
    fn missing_record_fails_fast() {
        let capk = CapkIndex::new();
        let engine = engine_over(&capk);

        let card = CardData {
            aid: Bytes::from_static(&hex!("A0000000031010")),
            gpo: Bytes::from_static(&hex!("8006 0800 08010200")),
            records: vec![Record {
                sfi: 1,
                number: 1,
                payload: Bytes::from_static(&hex!("7006 5A044761739F")),
            }],
            ..Default::default()
        };

        assert!(matches!(
            engine.authenticate(&card, TransactionData::new(), Date::new(2026, 8, 6)),
            Err(Error::MissingRecord { sfi: 1, number: 2 })
        ));
    }
}

//! APDU command construction
//!
//! Pure byte-building for the commands whose responses this engine
//! consumes. The reader collaborator owns the transport; these
//! builders only guarantee the command coding matches what the engine
//! expects to decode on the way back.

use bytes::{BufMut, Bytes, BytesMut};
use derive_more::Display;
use emv_tlv::TlvNode;

use crate::constants::{cla, ins, tags};

/// Application cryptogram type requested from GENERATE AC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CryptogramType {
    /// Application Authentication Cryptogram (transaction declined)
    #[display("AAC")]
    Aac,
    /// Authorisation Request Cryptogram (go online)
    #[display("ARQC")]
    Arqc,
    /// Transaction Certificate (approved offline)
    #[display("TC")]
    Tc,
}

impl CryptogramType {
    /// The P1 reference control value for this cryptogram type
    pub const fn reference_control(self) -> u8 {
        match self {
            Self::Aac => 0x00,
            Self::Arqc => 0x80,
            Self::Tc => 0x40,
        }
    }
}

/// An APDU command ready for serialization
#[derive(Debug, Clone)]
pub struct Command {
    cla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    data: Option<Bytes>,
    le: Option<u8>,
}

impl Command {
    /// Create a case-1 command (no data, no expected length)
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Attach a command data field
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Attach an expected response length
    pub const fn with_le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    /// Command class byte
    pub const fn class(&self) -> u8 {
        self.cla
    }

    /// Instruction byte
    pub const fn instruction(&self) -> u8 {
        self.ins
    }

    /// Serialize to raw command bytes
    pub fn to_bytes(&self) -> Bytes {
        let data_len = self.data.as_ref().map_or(0, |d| d.len());
        let mut buf = BytesMut::with_capacity(4 + 1 + data_len + 1);

        buf.put_u8(self.cla);
        buf.put_u8(self.ins);
        buf.put_u8(self.p1);
        buf.put_u8(self.p2);
        if let Some(data) = &self.data {
            buf.put_u8(data.len() as u8);
            buf.put_slice(data);
        }
        if let Some(le) = self.le {
            buf.put_u8(le);
        }
        buf.freeze()
    }
}

/// SELECT the application identified by `aid`
pub fn select(aid: &[u8]) -> Command {
    Command::new(cla::ISO7816, ins::SELECT, 0x04, 0x00)
        .with_data(Bytes::copy_from_slice(aid))
        .with_le(0x00)
}

/// GET PROCESSING OPTIONS with assembled PDOL data
///
/// The PDOL bytes travel wrapped in a command template (tag 83); an
/// empty slice produces the minimal `83 00` data field for cards
/// without a PDOL.
pub fn get_processing_options(pdol_data: &[u8]) -> Command {
    let template = TlvNode::primitive(tags::COMMAND_TEMPLATE, Bytes::copy_from_slice(pdol_data));
    Command::new(cla::PROPRIETARY, ins::GET_PROCESSING_OPTIONS, 0x00, 0x00)
        .with_data(template.encode())
        .with_le(0x00)
}

/// READ RECORD `number` from the file identified by `sfi`
pub fn read_record(sfi: u8, number: u8) -> Command {
    Command::new(cla::ISO7816, ins::READ_RECORD, number, (sfi << 3) | 0x04).with_le(0x00)
}

/// INTERNAL AUTHENTICATE over assembled DDOL data
pub fn internal_authenticate(ddol_data: &[u8]) -> Command {
    Command::new(cla::ISO7816, ins::INTERNAL_AUTHENTICATE, 0x00, 0x00)
        .with_data(Bytes::copy_from_slice(ddol_data))
        .with_le(0x00)
}

/// GENERATE AC requesting `cryptogram` over assembled CDOL data
///
/// `combined` sets the CDA-request bit so the card returns its
/// cryptogram inside Signed Dynamic Application Data.
pub fn generate_ac(cryptogram: CryptogramType, combined: bool, cdol_data: &[u8]) -> Command {
    let p1 = cryptogram.reference_control() | if combined { 0x10 } else { 0x00 };
    Command::new(cla::PROPRIETARY, ins::GENERATE_AC, p1, 0x00)
        .with_data(Bytes::copy_from_slice(cdol_data))
        .with_le(0x00)
}

/// GET DATA for a primitive data object held by the card
pub fn get_data(tag: u16) -> Command {
    Command::new(
        cla::PROPRIETARY,
        ins::GET_DATA,
        (tag >> 8) as u8,
        (tag & 0xFF) as u8,
    )
    .with_le(0x00)
}

/// GET RESPONSE to fetch `length` pending bytes
pub fn get_response(length: u8) -> Command {
    Command::new(cla::ISO7816, ins::GET_RESPONSE, 0x00, 0x00).with_le(length)
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn select_coding() {
        let cmd = select(&hex!("A0000000031010"));
        assert_eq!(cmd.to_bytes().as_ref(), hex!("00A4040007A000000003101000"));
    }

    #[test]
    fn gpo_wraps_pdol_in_command_template() {
        let cmd = get_processing_options(&[]);
        assert_eq!(cmd.to_bytes().as_ref(), hex!("80A80000028300 00"));

        let cmd = get_processing_options(&hex!("0102030405060708"));
        assert_eq!(
            cmd.to_bytes().as_ref(),
            hex!("80A800000A83080102030405060708 00")
        );
    }

    #[test]
    fn read_record_codes_sfi_in_p2() {
        let cmd = read_record(2, 1);
        assert_eq!(cmd.to_bytes().as_ref(), hex!("00B2011400"));
    }

    #[test]
    fn internal_authenticate_carries_challenge() {
        let cmd = internal_authenticate(&hex!("0102030405060708"));
        assert_eq!(cmd.to_bytes().as_ref(), hex!("008800000801020304050607 0800"));
    }

    #[test]
    fn generate_ac_reference_control() {
        let arqc = generate_ac(CryptogramType::Arqc, false, &hex!("AABB"));
        assert_eq!(arqc.to_bytes().as_ref(), hex!("80AE800002AABB00"));

        let tc_cda = generate_ac(CryptogramType::Tc, true, &hex!("AABB"));
        assert_eq!(tc_cda.to_bytes().as_ref(), hex!("80AE500002AABB00"));

        assert_eq!(CryptogramType::Aac.reference_control(), 0x00);
    }

    #[test]
    fn get_data_splits_tag() {
        let cmd = get_data(0x9F36);
        assert_eq!(cmd.to_bytes().as_ref(), hex!("80CA9F3600"));
    }
}

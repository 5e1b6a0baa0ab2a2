//! APDU response handling
//!
//! The engine consumes response payloads the reader collaborator has
//! already collected. This module splits raw response bytes into
//! payload and status word and classifies the status families a
//! terminal acts on (GET RESPONSE chaining, Le correction, the error
//! statuses worth reporting verbatim).

use core::fmt;

use bytes::Bytes;

use crate::error::{Error, Result};

/// An ISO 7816 status word (SW1, SW2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusWord {
    /// First status byte
    pub sw1: u8,
    /// Second status byte
    pub sw2: u8,
}

impl StatusWord {
    /// Normal completion
    pub const SUCCESS: Self = Self::new(0x90, 0x00);

    /// Create a status word from its two bytes
    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    /// The status word as a single 16-bit value
    pub const fn to_u16(self) -> u16 {
        ((self.sw1 as u16) << 8) | self.sw2 as u16
    }

    /// Whether this is the 9000 success status
    pub const fn is_success(self) -> bool {
        self.to_u16() == 0x9000
    }

    /// Classify the status word
    pub const fn status(self) -> Status {
        match self.sw1 {
            0x61 => Status::ResponseAvailable { length: self.sw2 },
            0x6C => Status::WrongLengthLe { length: self.sw2 },
            _ => match self.to_u16() {
                0x9000 => Status::Ok,
                0x6283 => Status::SelectedFileInvalidated,
                0x6700 => Status::WrongLength,
                0x6982 => Status::SecurityConditionNotSatisfied,
                0x6985 => Status::ConditionsOfUseNotSatisfied,
                0x6A81 => Status::FunctionNotSupported,
                0x6A82 => Status::FileNotFound,
                0x6A83 => Status::RecordNotFound,
                0x6A88 => Status::ReferencedDataNotFound,
                0x6D00 => Status::InstructionCodeNotSupported,
                sw => Status::Unknown(sw),
            },
        }
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.sw1, self.sw2)
    }
}

/// Classified response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Normal completion
    Ok,
    /// More response data available via GET RESPONSE
    ResponseAvailable {
        /// Bytes waiting to be fetched
        length: u8,
    },
    /// Wrong Le; reissue the command with the corrected length
    WrongLengthLe {
        /// The length the card expects
        length: u8,
    },
    /// Wrong length, no correction offered
    WrongLength,
    /// Selected file is invalidated
    SelectedFileInvalidated,
    /// Security status not satisfied
    SecurityConditionNotSatisfied,
    /// Conditions of use not satisfied
    ConditionsOfUseNotSatisfied,
    /// Function not supported
    FunctionNotSupported,
    /// File not found
    FileNotFound,
    /// Record not found
    RecordNotFound,
    /// Referenced data not found
    ReferencedDataNotFound,
    /// Instruction code not supported or invalid
    InstructionCodeNotSupported,
    /// Any other status word
    Unknown(u16),
}

/// A card response split into payload and status word
#[derive(Debug, Clone)]
pub struct Response {
    payload: Bytes,
    status: StatusWord,
}

impl Response {
    /// Split raw response bytes into payload and trailing status word
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() < 2 {
            return Err(Error::TruncatedResponse);
        }
        let (payload, trailer) = raw.split_at(raw.len() - 2);
        Ok(Self {
            payload: Bytes::copy_from_slice(payload),
            status: StatusWord::new(trailer[0], trailer[1]),
        })
    }

    /// Response payload without the status word
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The trailing status word
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// The payload, if the card reported success; the status word as
    /// an error otherwise
    pub fn into_payload(self) -> Result<Bytes> {
        if self.status.is_success() {
            Ok(self.payload)
        } else {
            Err(Error::CardStatus(self.status))
        }
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn parse_success_response() {
        let response = Response::parse(&hex!("770E8202198094080801010018010201 9000")).unwrap();
        assert!(response.status().is_success());
        assert_eq!(response.payload().len(), 16);
        assert!(response.into_payload().is_ok());
    }

    #[test]
    fn parse_error_status() {
        let response = Response::parse(&hex!("6A82")).unwrap();
        assert!(response.payload().is_empty());
        assert_eq!(response.status().status(), Status::FileNotFound);
        assert!(matches!(
            response.into_payload(),
            Err(Error::CardStatus(sw)) if sw == StatusWord::new(0x6A, 0x82)
        ));
    }

    #[test]
    fn classify_length_statuses() {
        assert_eq!(
            StatusWord::new(0x61, 0x2B).status(),
            Status::ResponseAvailable { length: 0x2B }
        );
        assert_eq!(
            StatusWord::new(0x6C, 0x14).status(),
            Status::WrongLengthLe { length: 0x14 }
        );
        assert_eq!(StatusWord::new(0x6F, 0x00).status(), Status::Unknown(0x6F00));
    }

    #[test]
    fn truncated_response_rejected() {
        assert!(matches!(
            Response::parse(&hex!("90")),
            Err(Error::TruncatedResponse)
        ));
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(StatusWord::SUCCESS.to_string(), "9000");
        assert_eq!(StatusWord::new(0x61, 0x0B).to_string(), "610B");
    }
}

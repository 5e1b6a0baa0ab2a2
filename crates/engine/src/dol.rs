//! Data object list and application file locator handling
//!
//! A DOL is the card's order form: a sequence of (tag, length) pairs
//! the terminal answers with a plain concatenation of values, no tags
//! and no lengths. Cryptograms are computed over that exact byte
//! string, so the padding and truncation rules of Book 3 §5.4 are
//! load-bearing: get them wrong and every signature check downstream
//! fails for the wrong reason.

use bytes::{BufMut, Bytes, BytesMut};
use emv_tlv::Tag;

use crate::constants::sfi;
use crate::data::TransactionData;
use crate::dictionary::{self, Context, Format};
use crate::error::{Error, Result};

/// One (tag, length) entry of a data object list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DolEntry {
    /// Requested tag
    pub tag: Tag,
    /// Requested value length in bytes
    pub length: usize,
}

/// A parsed data object list (PDOL, CDOL1/2 or DDOL)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dol {
    entries: Vec<DolEntry>,
}

impl Dol {
    /// Parse a DOL from its raw encoding
    ///
    /// Each entry is a BER tag followed by a one-byte length.
    pub fn parse(input: &[u8]) -> Result<Self> {
        let mut entries = Vec::new();
        let mut pos = 0;
        while pos < input.len() {
            let (tag, tag_len) = Tag::parse(&input[pos..], pos)?;
            pos += tag_len;
            let length = *input.get(pos).ok_or(emv_tlv::TlvError::UnexpectedEnd {
                offset: pos,
                needed: 1,
            })? as usize;
            pos += 1;
            entries.push(DolEntry { tag, length });
        }
        Ok(Self { entries })
    }

    /// The list's entries, in card order
    pub fn entries(&self) -> &[DolEntry] {
        &self.entries
    }

    /// Whether the list requests `tag`
    pub fn requests(&self, tag: Tag) -> bool {
        self.entries.iter().any(|entry| entry.tag == tag)
    }

    /// Total length of the assembled data in bytes
    pub fn assembled_len(&self) -> usize {
        self.entries.iter().map(|entry| entry.length).sum()
    }

    /// Assemble the concatenated value string from `data`
    ///
    /// Values are fitted to each entry's declared length per Book 3
    /// §5.4: short numeric values are left-padded with zeros, short
    /// compressed-numeric values right-padded with 0xFF, everything
    /// else right-padded with zeros; long numeric values keep their
    /// rightmost bytes, everything else its leftmost. A tag with no
    /// value zero-fills unless the dictionary marks it mandatory in
    /// DOL context, which is [`Error::MissingDataObject`].
    pub fn assemble(&self, data: &TransactionData) -> Result<Bytes> {
        let mut out = BytesMut::with_capacity(self.assembled_len());
        for entry in &self.entries {
            let info = dictionary::lookup(entry.tag);
            let format = info.map_or(Format::Binary, |info| info.format);

            match data.get(entry.tag) {
                None => {
                    if info.is_some_and(|info| info.mandatory_in(Context::Dol)) {
                        return Err(Error::MissingDataObject { tag: entry.tag });
                    }
                    out.put_bytes(0x00, entry.length);
                }
                Some(value) => fit(&mut out, value, entry.length, format),
            }
        }
        Ok(out.freeze())
    }
}

fn fit(out: &mut BytesMut, value: &[u8], length: usize, format: Format) {
    use core::cmp::Ordering;

    match value.len().cmp(&length) {
        Ordering::Equal => out.put_slice(value),
        Ordering::Greater => match format {
            Format::Numeric => out.put_slice(&value[value.len() - length..]),
            _ => out.put_slice(&value[..length]),
        },
        Ordering::Less => match format {
            Format::Numeric => {
                out.put_bytes(0x00, length - value.len());
                out.put_slice(value);
            }
            Format::CompressedNumeric => {
                out.put_slice(value);
                out.put_bytes(0xFF, length - value.len());
            }
            _ => {
                out.put_slice(value);
                out.put_bytes(0x00, length - value.len());
            }
        },
    }
}

/// One entry of the Application File Locator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AflEntry {
    /// Short file identifier (1..=31)
    pub sfi: u8,
    /// First record number in the range
    pub first: u8,
    /// Last record number in the range
    pub last: u8,
    /// Leading records of the range that enter offline data
    /// authentication
    pub offline_count: u8,
}

impl AflEntry {
    /// Whether `number` is within this entry's record range
    pub const fn contains(&self, number: u8) -> bool {
        self.first <= number && number <= self.last
    }

    /// Whether `number` participates in offline data authentication
    pub const fn is_offline_auth(&self, number: u8) -> bool {
        self.contains(number) && number < self.first + self.offline_count
    }

    /// Whether records of this file enter the authentication input
    /// without their record template wrapper
    pub const fn unwrapped_for_auth(&self) -> bool {
        self.sfi <= sfi::UNWRAPPED_MAX
    }
}

/// A parsed Application File Locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Afl {
    entries: Vec<AflEntry>,
}

impl Afl {
    /// Parse an AFL from its raw four-byte-group encoding
    pub fn parse(input: &[u8]) -> Result<Self> {
        if input.is_empty() || input.len() % 4 != 0 {
            return Err(Error::InvalidAfl {
                reason: "length is not a non-zero multiple of 4",
            });
        }

        let mut entries = Vec::with_capacity(input.len() / 4);
        for group in input.chunks_exact(4) {
            let file_id = group[0] >> 3;
            if group[0] & 0x07 != 0 {
                return Err(Error::InvalidAfl {
                    reason: "reserved bits set in file identifier byte",
                });
            }
            if !(sfi::MIN..=sfi::MAX).contains(&file_id) {
                return Err(Error::InvalidAfl {
                    reason: "file identifier out of range 1-31",
                });
            }
            let (first, last, offline_count) = (group[1], group[2], group[3]);
            if first == 0 {
                return Err(Error::InvalidAfl {
                    reason: "record numbers start at 1",
                });
            }
            if last < first {
                return Err(Error::InvalidAfl {
                    reason: "last record precedes first",
                });
            }
            if offline_count > last - first + 1 {
                return Err(Error::InvalidAfl {
                    reason: "offline authentication count exceeds record range",
                });
            }
            entries.push(AflEntry {
                sfi: file_id,
                first,
                last,
                offline_count,
            });
        }
        Ok(Self { entries })
    }

    /// The locator's entries, in card order
    pub fn entries(&self) -> &[AflEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use crate::constants::tags;

    use super::*;

    #[test]
    fn parse_dol() {
        // Typical CDOL1 prefix: amount, terminal country, TVR, currency
        let dol = Dol::parse(&hex!("9F02069F1A0295055F2A02")).unwrap();
        assert_eq!(dol.entries().len(), 4);
        assert_eq!(dol.entries()[0], DolEntry { tag: tags::AMOUNT_AUTHORISED, length: 6 });
        assert_eq!(dol.assembled_len(), 15);
        assert!(dol.requests(tags::TVR));
    }

    #[test]
    fn parse_truncated_dol_fails() {
        assert!(matches!(
            Dol::parse(&hex!("9F0206 9F1A")),
            Err(Error::MalformedTlv(_))
        ));
    }

    #[test]
    fn assemble_exact_and_padded() {
        let mut data = TransactionData::new();
        data.insert(tags::AMOUNT_AUTHORISED, hex!("1500").to_vec()); // short numeric
        data.insert(tags::UNPREDICTABLE_NUMBER, hex!("01020304").to_vec());
        data.insert(tags::APPLICATION_PAN, hex!("476173").to_vec()); // short cn

        let dol = Dol::parse(&hex!("9F0206 9F3704 5A05")).unwrap();
        let assembled = dol.assemble(&data).unwrap();
        assert_eq!(
            assembled.as_ref(),
            hex!("00000000 1500 01020304 476173FFFF")
        );
    }

    #[test]
    fn assemble_truncates_per_format() {
        let mut data = TransactionData::new();
        data.insert(tags::AMOUNT_AUTHORISED, hex!("000000001500").to_vec());
        data.insert(tags::ISSUER_APPLICATION_DATA, hex!("0102030405").to_vec());

        // Numeric keeps rightmost bytes, binary keeps leftmost
        let dol = Dol::parse(&hex!("9F0203 9F1003")).unwrap();
        let assembled = dol.assemble(&data).unwrap();
        assert_eq!(assembled.as_ref(), hex!("001500 010203"));
    }

    #[test]
    fn missing_optional_tag_zero_fills() {
        let dol = Dol::parse(&hex!("9F4C04")).unwrap();
        let assembled = dol.assemble(&TransactionData::new()).unwrap();
        assert_eq!(assembled.as_ref(), hex!("00000000"));
    }

    #[test]
    fn missing_mandatory_tag_fails() {
        let dol = Dol::parse(&hex!("9F3704")).unwrap();
        match dol.assemble(&TransactionData::new()) {
            Err(Error::MissingDataObject { tag }) => {
                assert_eq!(tag, tags::UNPREDICTABLE_NUMBER)
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parse_afl() {
        let afl = Afl::parse(&hex!("08010100 10010500 18010201")).unwrap();
        assert_eq!(afl.entries().len(), 3);
        assert_eq!(
            afl.entries()[0],
            AflEntry { sfi: 1, first: 1, last: 1, offline_count: 0 }
        );
        assert_eq!(
            afl.entries()[2],
            AflEntry { sfi: 3, first: 1, last: 2, offline_count: 1 }
        );
    }

    #[test]
    fn afl_rejects_malformed_groups() {
        // Offline count exceeding the range
        assert!(matches!(
            Afl::parse(&hex!("08010103")),
            Err(Error::InvalidAfl { .. })
        ));
        // Not a multiple of four
        assert!(matches!(Afl::parse(&hex!("080101")), Err(Error::InvalidAfl { .. })));
        // Record range inverted
        assert!(matches!(
            Afl::parse(&hex!("08050100")),
            Err(Error::InvalidAfl { .. })
        ));
        // File identifier zero
        assert!(matches!(
            Afl::parse(&hex!("00010100")),
            Err(Error::InvalidAfl { .. })
        ));
        // First record zero
        assert!(matches!(
            Afl::parse(&hex!("08000100")),
            Err(Error::InvalidAfl { .. })
        ));
    }

    #[test]
    fn afl_offline_membership() {
        let afl = Afl::parse(&hex!("08010402")).unwrap();
        let entry = afl.entries()[0];
        assert!(entry.is_offline_auth(1));
        assert!(entry.is_offline_auth(2));
        assert!(!entry.is_offline_auth(3));
        assert!(entry.contains(4));
        assert!(entry.unwrapped_for_auth());
    }
}

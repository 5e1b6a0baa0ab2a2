//! EMV tag dictionary
//!
//! Maps tags to their semantic name, data element format, length
//! bounds, and the contexts in which the element is mandatory, per the
//! EMV Book 3 data element tables. Unknown tags are not an error:
//! cards carry proprietary data objects, which are preserved but not
//! interpreted.

use emv_tlv::Tag;

/// Data element format, per EMV Book 3 Annex A
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Raw binary (b)
    Binary,
    /// Numeric, BCD digits, right-justified (n)
    Numeric,
    /// Compressed numeric, BCD digits padded with trailing F (cn)
    CompressedNumeric,
    /// Alphanumeric characters (an)
    Alphanumeric,
    /// Alphanumeric and special characters (ans)
    AlphanumericSpecial,
    /// Constructed template containing further data objects
    Template,
}

/// Context in which a data element is mandatory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// GET PROCESSING OPTIONS response
    ProcessingOptions,
    /// Application records read per the AFL
    Record,
    /// Data object list assembly (terminal-sourced elements)
    Dol,
}

/// Dictionary entry for one EMV tag
#[derive(Debug, Clone, Copy)]
pub struct TagInfo {
    tag: Tag,
    /// Semantic name per the EMV specification
    pub name: &'static str,
    /// Data element format
    pub format: Format,
    /// Smallest legal value length in bytes
    pub min_len: u16,
    /// Largest legal value length in bytes
    pub max_len: u16,
    /// Contexts in which the element must be present
    pub mandatory_in: &'static [Context],
}

impl TagInfo {
    const fn new(
        raw: u32,
        name: &'static str,
        format: Format,
        min_len: u16,
        max_len: u16,
        mandatory_in: &'static [Context],
    ) -> Self {
        Self {
            tag: Tag::from_raw(raw),
            name,
            format,
            min_len,
            max_len,
            mandatory_in,
        }
    }

    /// The tag this entry describes
    pub const fn tag(&self) -> Tag {
        self.tag
    }

    /// Whether the element is mandatory in `context`
    pub fn mandatory_in(&self, context: Context) -> bool {
        self.mandatory_in.contains(&context)
    }

    /// Validate a value against this entry's format and length bounds
    pub fn validate(&self, value: &[u8]) -> bool {
        let len = value.len();
        if len < self.min_len as usize || len > self.max_len as usize {
            return false;
        }
        match self.format {
            Format::Binary | Format::Template => true,
            Format::Numeric => value.iter().all(|b| b >> 4 <= 9 && b & 0x0F <= 9),
            Format::CompressedNumeric => is_compressed_numeric(value),
            Format::Alphanumeric => value
                .iter()
                .all(|b| b.is_ascii_alphanumeric()),
            Format::AlphanumericSpecial => value.iter().all(|b| (0x20..=0x7E).contains(b)),
        }
    }
}

fn is_compressed_numeric(value: &[u8]) -> bool {
    let mut padding = false;
    for &byte in value {
        for nibble in [byte >> 4, byte & 0x0F] {
            match nibble {
                0..=9 if !padding => {}
                0xF => padding = true,
                _ => return false,
            }
        }
    }
    true
}

const PO: &[Context] = &[Context::ProcessingOptions];
const REC: &[Context] = &[Context::Record];
const DOL: &[Context] = &[Context::Dol];
const NONE: &[Context] = &[];

/// The dictionary, sorted by raw tag value for binary search
static DICTIONARY: &[TagInfo] = &[
    TagInfo::new(0x4F, "Application Identifier (AID)", Format::Binary, 5, 16, NONE),
    TagInfo::new(0x50, "Application Label", Format::AlphanumericSpecial, 1, 16, NONE),
    TagInfo::new(0x57, "Track 2 Equivalent Data", Format::CompressedNumeric, 0, 19, NONE),
    TagInfo::new(0x5A, "Application Primary Account Number (PAN)", Format::CompressedNumeric, 0, 10, REC),
    TagInfo::new(0x61, "Application Template", Format::Template, 0, 252, NONE),
    TagInfo::new(0x6F, "File Control Information (FCI) Template", Format::Template, 0, 252, NONE),
    TagInfo::new(0x70, "Record Template", Format::Template, 0, 252, NONE),
    TagInfo::new(0x77, "Response Message Template Format 2", Format::Template, 0, 252, NONE),
    TagInfo::new(0x80, "Response Message Template Format 1", Format::Binary, 0, 253, NONE),
    TagInfo::new(0x82, "Application Interchange Profile", Format::Binary, 2, 2, PO),
    TagInfo::new(0x83, "Command Template", Format::Binary, 0, 253, NONE),
    TagInfo::new(0x84, "Dedicated File (DF) Name", Format::Binary, 5, 16, NONE),
    TagInfo::new(0x87, "Application Priority Indicator", Format::Binary, 1, 1, NONE),
    TagInfo::new(0x8C, "Card Risk Management Data Object List 1 (CDOL1)", Format::Binary, 0, 252, REC),
    TagInfo::new(0x8D, "Card Risk Management Data Object List 2 (CDOL2)", Format::Binary, 0, 252, REC),
    TagInfo::new(0x8E, "Cardholder Verification Method (CVM) List", Format::Binary, 10, 252, NONE),
    TagInfo::new(0x8F, "Certification Authority Public Key Index", Format::Binary, 1, 1, NONE),
    TagInfo::new(0x90, "Issuer Public Key Certificate", Format::Binary, 0, 248, NONE),
    TagInfo::new(0x92, "Issuer Public Key Remainder", Format::Binary, 0, 248, NONE),
    TagInfo::new(0x93, "Signed Static Application Data", Format::Binary, 0, 248, NONE),
    TagInfo::new(0x94, "Application File Locator (AFL)", Format::Binary, 0, 252, PO),
    TagInfo::new(0x95, "Terminal Verification Results", Format::Binary, 5, 5, DOL),
    TagInfo::new(0x9A, "Transaction Date", Format::Numeric, 3, 3, DOL),
    TagInfo::new(0x9C, "Transaction Type", Format::Numeric, 1, 1, DOL),
    TagInfo::new(0xA5, "FCI Proprietary Template", Format::Template, 0, 252, NONE),
    TagInfo::new(0x5F20, "Cardholder Name", Format::AlphanumericSpecial, 2, 26, NONE),
    TagInfo::new(0x5F24, "Application Expiration Date", Format::Numeric, 3, 3, REC),
    TagInfo::new(0x5F25, "Application Effective Date", Format::Numeric, 3, 3, NONE),
    TagInfo::new(0x5F28, "Issuer Country Code", Format::Numeric, 2, 2, NONE),
    TagInfo::new(0x5F2A, "Transaction Currency Code", Format::Numeric, 2, 2, DOL),
    TagInfo::new(0x5F2D, "Language Preference", Format::Alphanumeric, 2, 8, NONE),
    TagInfo::new(0x5F30, "Service Code", Format::Numeric, 2, 2, NONE),
    TagInfo::new(0x5F34, "Application PAN Sequence Number", Format::Numeric, 1, 1, NONE),
    TagInfo::new(0x9F02, "Amount, Authorised (Numeric)", Format::Numeric, 6, 6, DOL),
    TagInfo::new(0x9F03, "Amount, Other (Numeric)", Format::Numeric, 6, 6, NONE),
    TagInfo::new(0x9F07, "Application Usage Control", Format::Binary, 2, 2, NONE),
    TagInfo::new(0x9F08, "Application Version Number", Format::Binary, 2, 2, NONE),
    TagInfo::new(0x9F0D, "Issuer Action Code - Default", Format::Binary, 5, 5, NONE),
    TagInfo::new(0x9F0E, "Issuer Action Code - Denial", Format::Binary, 5, 5, NONE),
    TagInfo::new(0x9F0F, "Issuer Action Code - Online", Format::Binary, 5, 5, NONE),
    TagInfo::new(0x9F10, "Issuer Application Data", Format::Binary, 0, 32, NONE),
    TagInfo::new(0x9F11, "Issuer Code Table Index", Format::Numeric, 1, 1, NONE),
    TagInfo::new(0x9F12, "Application Preferred Name", Format::AlphanumericSpecial, 1, 16, NONE),
    TagInfo::new(0x9F1A, "Terminal Country Code", Format::Numeric, 2, 2, DOL),
    TagInfo::new(0x9F26, "Application Cryptogram", Format::Binary, 8, 8, NONE),
    TagInfo::new(0x9F27, "Cryptogram Information Data", Format::Binary, 1, 1, NONE),
    TagInfo::new(0x9F32, "Issuer Public Key Exponent", Format::Binary, 1, 3, NONE),
    TagInfo::new(0x9F36, "Application Transaction Counter", Format::Binary, 2, 2, NONE),
    TagInfo::new(0x9F37, "Unpredictable Number", Format::Binary, 4, 4, DOL),
    TagInfo::new(0x9F38, "Processing Options Data Object List (PDOL)", Format::Binary, 0, 252, NONE),
    TagInfo::new(0x9F42, "Application Currency Code", Format::Numeric, 2, 2, NONE),
    TagInfo::new(0x9F44, "Application Currency Exponent", Format::Numeric, 1, 1, NONE),
    TagInfo::new(0x9F45, "Data Authentication Code", Format::Binary, 2, 2, NONE),
    TagInfo::new(0x9F46, "ICC Public Key Certificate", Format::Binary, 0, 248, NONE),
    TagInfo::new(0x9F47, "ICC Public Key Exponent", Format::Binary, 1, 3, NONE),
    TagInfo::new(0x9F48, "ICC Public Key Remainder", Format::Binary, 0, 248, NONE),
    TagInfo::new(0x9F49, "Dynamic Data Authentication Data Object List (DDOL)", Format::Binary, 0, 252, NONE),
    TagInfo::new(0x9F4A, "Static Data Authentication Tag List", Format::Binary, 0, 252, NONE),
    TagInfo::new(0x9F4B, "Signed Dynamic Application Data", Format::Binary, 0, 248, NONE),
    TagInfo::new(0x9F4C, "ICC Dynamic Number", Format::Binary, 2, 8, NONE),
    TagInfo::new(0xBF0C, "FCI Issuer Discretionary Data", Format::Template, 0, 222, NONE),
];

/// Look up the dictionary entry for a tag
pub fn lookup(tag: Tag) -> Option<&'static TagInfo> {
    DICTIONARY
        .binary_search_by_key(&tag, TagInfo::tag)
        .ok()
        .map(|i| &DICTIONARY[i])
}

/// Human-readable name for a tag, `"Unknown"` if not in the dictionary
pub fn name(tag: Tag) -> &'static str {
    lookup(tag).map_or("Unknown", |info| info.name)
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn dictionary_is_sorted() {
        for pair in DICTIONARY.windows(2) {
            assert!(pair[0].tag() < pair[1].tag(), "entries out of order at {}", pair[1].tag());
        }
    }

    #[test]
    fn lookup_known_tags() {
        assert_eq!(lookup(Tag::from_raw(0x5A)).unwrap().name, "Application Primary Account Number (PAN)");
        assert_eq!(lookup(Tag::from_raw(0x9F46)).unwrap().name, "ICC Public Key Certificate");
        assert_eq!(name(Tag::from_raw(0x8F)), "Certification Authority Public Key Index");
    }

    #[test]
    fn unknown_tag_is_not_an_error() {
        assert!(lookup(Tag::from_raw(0x9F7F)).is_none());
        assert_eq!(name(Tag::from_raw(0x9F7F)), "Unknown");
    }

    #[test]
    fn mandatory_contexts() {
        let aip = lookup(Tag::from_raw(0x82)).unwrap();
        assert!(aip.mandatory_in(Context::ProcessingOptions));
        assert!(!aip.mandatory_in(Context::Dol));

        let un = lookup(Tag::from_raw(0x9F37)).unwrap();
        assert!(un.mandatory_in(Context::Dol));
    }

    #[test]
    fn numeric_validation() {
        let date = lookup(Tag::from_raw(0x9A)).unwrap();
        assert!(date.validate(&hex!("260806")));
        assert!(!date.validate(&hex!("26A806")));
        assert!(!date.validate(&hex!("2608")));
    }

    #[test]
    fn compressed_numeric_validation() {
        let pan = lookup(Tag::from_raw(0x5A)).unwrap();
        assert!(pan.validate(&hex!("4761739001010010")));
        assert!(pan.validate(&hex!("47617390010100105F")));
        // Digits after padding began
        assert!(!pan.validate(&hex!("4761F39001010010")));
    }

    #[test]
    fn ans_validation() {
        let label = lookup(Tag::from_raw(0x50)).unwrap();
        assert!(label.validate(b"VISA CREDIT"));
        assert!(!label.validate(&hex!("564953410003")));
    }
}

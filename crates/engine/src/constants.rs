//! Constants used in EMV transaction processing
//!
//! Tag numbers, Application Interchange Profile bits, certificate
//! framing bytes and APDU class/instruction codes, as defined by the
//! EMV Books 2 and 3.

/// EMV data object tags
pub mod tags {
    use emv_tlv::Tag;

    // Application metadata
    /// Application Identifier (AID)
    pub const APPLICATION_IDENTIFIER: Tag = Tag::from_raw(0x4F);
    /// Application Label
    pub const APPLICATION_LABEL: Tag = Tag::from_raw(0x50);
    /// Application Priority Indicator
    pub const APPLICATION_PRIORITY_INDICATOR: Tag = Tag::from_raw(0x87);
    /// Application Preferred Name
    pub const APPLICATION_PREFERRED_NAME: Tag = Tag::from_raw(0x9F12);
    /// Application Version Number
    pub const APPLICATION_VERSION_NUMBER: Tag = Tag::from_raw(0x9F08);
    /// Application Usage Control
    pub const APPLICATION_USAGE_CONTROL: Tag = Tag::from_raw(0x9F07);
    /// Dedicated File Name
    pub const DEDICATED_FILE_NAME: Tag = Tag::from_raw(0x84);
    /// Language Preference
    pub const LANGUAGE_PREFERENCE: Tag = Tag::from_raw(0x5F2D);
    /// Issuer Code Table Index
    pub const ISSUER_CODE_TABLE_INDEX: Tag = Tag::from_raw(0x9F11);

    // Cardholder and account data
    /// Application Primary Account Number
    pub const APPLICATION_PAN: Tag = Tag::from_raw(0x5A);
    /// Application PAN Sequence Number
    pub const APPLICATION_PAN_SEQUENCE_NUMBER: Tag = Tag::from_raw(0x5F34);
    /// Cardholder Name
    pub const CARDHOLDER_NAME: Tag = Tag::from_raw(0x5F20);
    /// Application Expiration Date
    pub const APPLICATION_EXPIRATION_DATE: Tag = Tag::from_raw(0x5F24);
    /// Application Effective Date
    pub const APPLICATION_EFFECTIVE_DATE: Tag = Tag::from_raw(0x5F25);
    /// Track 2 Equivalent Data
    pub const TRACK_2_EQUIVALENT_DATA: Tag = Tag::from_raw(0x57);
    /// Service Code
    pub const SERVICE_CODE: Tag = Tag::from_raw(0x5F30);
    /// Issuer Country Code
    pub const ISSUER_COUNTRY_CODE: Tag = Tag::from_raw(0x5F28);

    // Processing
    /// Application Interchange Profile
    pub const APPLICATION_INTERCHANGE_PROFILE: Tag = Tag::from_raw(0x82);
    /// Application File Locator
    pub const APPLICATION_FILE_LOCATOR: Tag = Tag::from_raw(0x94);
    /// Processing Options Data Object List
    pub const PDOL: Tag = Tag::from_raw(0x9F38);
    /// Card Risk Management Data Object List 1
    pub const CDOL1: Tag = Tag::from_raw(0x8C);
    /// Card Risk Management Data Object List 2
    pub const CDOL2: Tag = Tag::from_raw(0x8D);
    /// Dynamic Data Authentication Data Object List
    pub const DDOL: Tag = Tag::from_raw(0x9F49);
    /// Cardholder Verification Method List
    pub const CVM_LIST: Tag = Tag::from_raw(0x8E);
    /// Issuer Action Code - Default
    pub const IAC_DEFAULT: Tag = Tag::from_raw(0x9F0D);
    /// Issuer Action Code - Denial
    pub const IAC_DENIAL: Tag = Tag::from_raw(0x9F0E);
    /// Issuer Action Code - Online
    pub const IAC_ONLINE: Tag = Tag::from_raw(0x9F0F);

    // Certificates and authentication
    /// Certification Authority Public Key Index
    pub const CA_PUBLIC_KEY_INDEX: Tag = Tag::from_raw(0x8F);
    /// Issuer Public Key Certificate
    pub const ISSUER_PK_CERTIFICATE: Tag = Tag::from_raw(0x90);
    /// Issuer Public Key Remainder
    pub const ISSUER_PK_REMAINDER: Tag = Tag::from_raw(0x92);
    /// Issuer Public Key Exponent
    pub const ISSUER_PK_EXPONENT: Tag = Tag::from_raw(0x9F32);
    /// ICC Public Key Certificate
    pub const ICC_PK_CERTIFICATE: Tag = Tag::from_raw(0x9F46);
    /// ICC Public Key Exponent
    pub const ICC_PK_EXPONENT: Tag = Tag::from_raw(0x9F47);
    /// ICC Public Key Remainder
    pub const ICC_PK_REMAINDER: Tag = Tag::from_raw(0x9F48);
    /// Signed Static Application Data
    pub const SIGNED_STATIC_APPLICATION_DATA: Tag = Tag::from_raw(0x93);
    /// Signed Dynamic Application Data
    pub const SIGNED_DYNAMIC_APPLICATION_DATA: Tag = Tag::from_raw(0x9F4B);
    /// Static Data Authentication Tag List
    pub const SDA_TAG_LIST: Tag = Tag::from_raw(0x9F4A);
    /// Data Authentication Code
    pub const DATA_AUTHENTICATION_CODE: Tag = Tag::from_raw(0x9F45);
    /// ICC Dynamic Number
    pub const ICC_DYNAMIC_NUMBER: Tag = Tag::from_raw(0x9F4C);

    // Transaction data
    /// Amount, Authorised
    pub const AMOUNT_AUTHORISED: Tag = Tag::from_raw(0x9F02);
    /// Amount, Other
    pub const AMOUNT_OTHER: Tag = Tag::from_raw(0x9F03);
    /// Terminal Verification Results
    pub const TVR: Tag = Tag::from_raw(0x95);
    /// Transaction Date
    pub const TRANSACTION_DATE: Tag = Tag::from_raw(0x9A);
    /// Transaction Type
    pub const TRANSACTION_TYPE: Tag = Tag::from_raw(0x9C);
    /// Transaction Currency Code
    pub const TRANSACTION_CURRENCY_CODE: Tag = Tag::from_raw(0x5F2A);
    /// Terminal Country Code
    pub const TERMINAL_COUNTRY_CODE: Tag = Tag::from_raw(0x9F1A);
    /// Unpredictable Number
    pub const UNPREDICTABLE_NUMBER: Tag = Tag::from_raw(0x9F37);
    /// Application Cryptogram
    pub const APPLICATION_CRYPTOGRAM: Tag = Tag::from_raw(0x9F26);
    /// Cryptogram Information Data
    pub const CRYPTOGRAM_INFORMATION_DATA: Tag = Tag::from_raw(0x9F27);
    /// Application Transaction Counter
    pub const ATC: Tag = Tag::from_raw(0x9F36);
    /// Issuer Application Data
    pub const ISSUER_APPLICATION_DATA: Tag = Tag::from_raw(0x9F10);
    /// Application Currency Code
    pub const APPLICATION_CURRENCY_CODE: Tag = Tag::from_raw(0x9F42);
    /// Application Currency Exponent
    pub const APPLICATION_CURRENCY_EXPONENT: Tag = Tag::from_raw(0x9F44);

    // Templates
    /// File Control Information Template
    pub const FCI_TEMPLATE: Tag = Tag::from_raw(0x6F);
    /// FCI Proprietary Template
    pub const FCI_PROPRIETARY_TEMPLATE: Tag = Tag::from_raw(0xA5);
    /// FCI Issuer Discretionary Data
    pub const FCI_ISSUER_DISCRETIONARY_DATA: Tag = Tag::from_raw(0xBF0C);
    /// Application Template
    pub const APPLICATION_TEMPLATE: Tag = Tag::from_raw(0x61);
    /// Record Template
    pub const RECORD_TEMPLATE: Tag = Tag::from_raw(0x70);
    /// Response Message Template Format 1
    pub const RESPONSE_TEMPLATE_FORMAT_1: Tag = Tag::from_raw(0x80);
    /// Response Message Template Format 2
    pub const RESPONSE_TEMPLATE_FORMAT_2: Tag = Tag::from_raw(0x77);
    /// Command Template (GET PROCESSING OPTIONS data field)
    pub const COMMAND_TEMPLATE: Tag = Tag::from_raw(0x83);
}

/// Application Interchange Profile bits (first AIP byte)
pub mod aip {
    /// Static Data Authentication is supported
    pub const SDA_SUPPORTED: u8 = 0x40;
    /// Dynamic Data Authentication is supported
    pub const DDA_SUPPORTED: u8 = 0x20;
    /// Combined DDA / Application Cryptogram Generation is supported
    pub const CDA_SUPPORTED: u8 = 0x01;
    /// Cardholder verification is supported
    pub const CARDHOLDER_VERIFICATION: u8 = 0x10;
    /// Terminal risk management is to be performed
    pub const TERMINAL_RISK_MANAGEMENT: u8 = 0x08;
    /// Issuer authentication is supported
    pub const ISSUER_AUTHENTICATION: u8 = 0x04;
}

/// Recovered-certificate framing and indicator bytes (EMV Book 2)
pub mod cert {
    /// Recovered data header
    pub const HEADER: u8 = 0x6A;
    /// Recovered data trailer
    pub const TRAILER: u8 = 0xBC;
    /// Issuer public key certificate format
    pub const ISSUER_FORMAT: u8 = 0x02;
    /// ICC public key certificate format
    pub const ICC_FORMAT: u8 = 0x04;
    /// Signed static application data format
    pub const STATIC_FORMAT: u8 = 0x03;
    /// Signed dynamic application data format
    pub const DYNAMIC_FORMAT: u8 = 0x05;
    /// Padding byte filling unused key and data positions
    pub const PAD: u8 = 0xBB;
    /// Hash algorithm indicator for SHA-1
    pub const HASH_SHA1: u8 = 0x01;
    /// Hash algorithm indicator for SHA-256
    pub const HASH_SHA256: u8 = 0x02;
    /// Public key algorithm indicator for RSA
    pub const KEY_RSA: u8 = 0x01;
}

/// APDU command classes
pub mod cla {
    /// ISO/IEC 7816 inter-industry class
    pub const ISO7816: u8 = 0x00;
    /// EMV proprietary class
    pub const PROPRIETARY: u8 = 0x80;
}

/// APDU instruction codes
pub mod ins {
    /// SELECT command
    pub const SELECT: u8 = 0xA4;
    /// READ RECORD command
    pub const READ_RECORD: u8 = 0xB2;
    /// GET PROCESSING OPTIONS command
    pub const GET_PROCESSING_OPTIONS: u8 = 0xA8;
    /// INTERNAL AUTHENTICATE command
    pub const INTERNAL_AUTHENTICATE: u8 = 0x88;
    /// GENERATE AC command
    pub const GENERATE_AC: u8 = 0xAE;
    /// GET DATA command
    pub const GET_DATA: u8 = 0xCA;
    /// GET RESPONSE command
    pub const GET_RESPONSE: u8 = 0xC0;
}

/// Short file identifier bounds for AFL entries
pub mod sfi {
    /// Lowest legal short file identifier
    pub const MIN: u8 = 1;
    /// Highest legal short file identifier
    pub const MAX: u8 = 31;
    /// Records in files up to this identifier enter the static
    /// authentication input without their template wrapper
    pub const UNWRAPPED_MAX: u8 = 10;
}

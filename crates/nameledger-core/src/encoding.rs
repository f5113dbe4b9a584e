//! Codec: conversion between raw name/value bytes and their text forms.
//!
//! Three encodings are supported:
//!
//! - `ascii`: printable ASCII only (`0x20..=0x7e`). Control characters,
//!   DEL and anything with the high bit set are rejected.
//! - `utf8`: well-formed UTF-8 without control characters. Non-ASCII code
//!   points are allowed, NUL and newlines are not.
//! - `hex`: lowercase hex digits on output, either case on input. Every byte
//!   sequence has a hex rendering, so `hex` is the only total encoding.
//!
//! Validation is a pure function of the bytes and the encoding.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, FieldDecodeError};

/// A text encoding for names and values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Ascii,
    Hex,
    Utf8,
}

impl Encoding {
    /// All supported encodings.
    pub const ALL: [Encoding; 3] = [Encoding::Ascii, Encoding::Hex, Encoding::Utf8];

    /// The name used in configuration and RPC options.
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Ascii => "ascii",
            Encoding::Hex => "hex",
            Encoding::Utf8 => "utf8",
        }
    }

    /// Whether a byte sequence can be rendered in this encoding.
    pub fn is_valid(self, raw: &[u8]) -> bool {
        match self {
            Encoding::Ascii => raw.iter().all(|&b| is_allowed_ascii(b)),
            Encoding::Hex => true,
            Encoding::Utf8 => match std::str::from_utf8(raw) {
                Ok(text) => text.chars().all(is_allowed_char),
                Err(_) => false,
            },
        }
    }

    /// Render raw bytes as text.
    pub fn encode(self, raw: &[u8]) -> Result<String, FieldDecodeError> {
        match self {
            Encoding::Hex => Ok(hex::encode(raw)),
            Encoding::Ascii | Encoding::Utf8 => {
                if !self.is_valid(raw) {
                    return Err(FieldDecodeError::new(self));
                }
                // Both checks above imply well-formed UTF-8.
                String::from_utf8(raw.to_vec()).map_err(|_| FieldDecodeError::new(self))
            }
        }
    }

    /// Parse text back to raw bytes.
    pub fn decode(self, text: &str) -> Result<Vec<u8>, CoreError> {
        match self {
            Encoding::Hex => {
                if text.len() % 2 != 0 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return Err(CoreError::InvalidNameOrValue);
                }
                hex::decode(text).map_err(|_| CoreError::InvalidNameOrValue)
            }
            Encoding::Ascii => {
                if text.bytes().all(is_allowed_ascii) {
                    Ok(text.as_bytes().to_vec())
                } else {
                    Err(CoreError::InvalidNameOrValue)
                }
            }
            Encoding::Utf8 => {
                if text.chars().all(is_allowed_char) {
                    Ok(text.as_bytes().to_vec())
                } else {
                    Err(CoreError::InvalidNameOrValue)
                }
            }
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ascii" => Ok(Encoding::Ascii),
            "hex" => Ok(Encoding::Hex),
            "utf8" => Ok(Encoding::Utf8),
            other => Err(CoreError::UnknownEncoding(other.to_string())),
        }
    }
}

fn is_allowed_ascii(b: u8) -> bool {
    (0x20..0x7f).contains(&b)
}

fn is_allowed_char(c: char) -> bool {
    !c.is_ascii_control()
}

/// Render a name for human-facing messages (wallet annotations, logs).
///
/// ASCII-safe names are quoted, everything else is shown as `0x`-prefixed hex.
pub fn encode_name_for_message(name: &[u8]) -> String {
    match Encoding::Ascii.encode(name) {
        Ok(text) => format!("'{}'", text),
        Err(_) => format!("0x{}", hex::encode(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ascii_accepts_printable() {
        assert_eq!(Encoding::Ascii.decode("d/abc").unwrap(), b"d/abc");
        assert_eq!(
            Encoding::Ascii.decode("{\"foo\":\"bar\"}").unwrap(),
            b"{\"foo\":\"bar\"}"
        );
        assert_eq!(Encoding::Ascii.encode(b"d/abc").unwrap(), "d/abc");
    }

    #[test]
    fn test_ascii_rejects_control_and_high_bytes() {
        assert!(Encoding::Ascii.decode("d/\n").is_err());
        assert!(Encoding::Ascii.decode("d/äöü").is_err());
        assert!(Encoding::Ascii.decode("d/\u{ff}").is_err());
        assert!(Encoding::Ascii.decode("d/\0").is_err());

        assert!(Encoding::Ascii.encode(b"d/\n").is_err());
        assert!(Encoding::Ascii.encode(b"d/\xff").is_err());
        assert!(Encoding::Ascii.encode(b"\x00").is_err());
        assert!(Encoding::Ascii.encode(b"\x7f").is_err());
    }

    #[test]
    fn test_utf8_accepts_multibyte() {
        let text = "d/äöü";
        assert_eq!(Encoding::Utf8.decode(text).unwrap(), text.as_bytes());
        assert_eq!(Encoding::Utf8.encode(text.as_bytes()).unwrap(), text);
    }

    #[test]
    fn test_utf8_rejects_nul_and_newline() {
        assert!(Encoding::Utf8.decode("d/\0äöü\n").is_err());
        assert!(Encoding::Utf8.encode("d/\0äöü\n".as_bytes()).is_err());
        assert!(Encoding::Utf8.decode("{\"foo\":\"\n\"}").is_err());
    }

    #[test]
    fn test_utf8_rejects_ill_formed() {
        assert_eq!(
            Encoding::Utf8.encode(b"d/\xff"),
            Err(FieldDecodeError::new(Encoding::Utf8))
        );
        assert!(!Encoding::Utf8.is_valid(&[0xc3]));
    }

    #[test]
    fn test_hex() {
        assert_eq!(Encoding::Hex.decode("0011ff").unwrap(), vec![0x00, 0x11, 0xff]);
        assert_eq!(Encoding::Hex.decode("0011FF").unwrap(), vec![0x00, 0x11, 0xff]);
        assert_eq!(Encoding::Hex.encode(&[0x00, 0x11, 0xff]).unwrap(), "0011ff");
        assert!(Encoding::Hex.decode("d").is_err());
        assert!(Encoding::Hex.decode("xx").is_err());
        assert!(Encoding::Hex.decode("0x00").is_err());
    }

    #[test]
    fn test_empty_is_valid_everywhere() {
        for enc in Encoding::ALL {
            assert_eq!(enc.decode("").unwrap(), Vec::<u8>::new());
            assert_eq!(enc.encode(&[]).unwrap(), "");
        }
    }

    #[test]
    fn test_encoding_names() {
        for enc in Encoding::ALL {
            assert_eq!(enc.as_str().parse::<Encoding>().unwrap(), enc);
        }
        assert_eq!(
            "latin1".parse::<Encoding>(),
            Err(CoreError::UnknownEncoding("latin1".into()))
        );
        assert_eq!(serde_json::to_string(&Encoding::Utf8).unwrap(), "\"utf8\"");
    }

    #[test]
    fn test_encode_name_for_message() {
        assert_eq!(encode_name_for_message(b"d/test"), "'d/test'");
        assert_eq!(encode_name_for_message(&[0x00, 0xff]), "0x00ff");
        assert_eq!(encode_name_for_message(b""), "''");
    }

    proptest! {
        #[test]
        fn test_roundtrip(raw in prop::collection::vec(any::<u8>(), 0..64)) {
            for enc in Encoding::ALL {
                if let Ok(text) = enc.encode(&raw) {
                    prop_assert_eq!(enc.decode(&text).unwrap(), raw.clone());
                }
            }
        }

        #[test]
        fn test_hex_is_total(raw in prop::collection::vec(any::<u8>(), 0..64)) {
            prop_assert!(Encoding::Hex.encode(&raw).is_ok());
        }

        #[test]
        fn test_ascii_rejects_forbidden_bytes(
            prefix in "[ -~]{0,8}",
            bad in prop_oneof![Just(0x00u8), Just(0x0a), 0x80u8..=0xff],
        ) {
            let mut raw = prefix.into_bytes();
            raw.push(bad);
            prop_assert!(Encoding::Ascii.encode(&raw).is_err());
        }

        #[test]
        fn test_validity_matches_encode(raw in prop::collection::vec(any::<u8>(), 0..32)) {
            for enc in Encoding::ALL {
                prop_assert_eq!(enc.is_valid(&raw), enc.encode(&raw).is_ok());
            }
        }
    }
}

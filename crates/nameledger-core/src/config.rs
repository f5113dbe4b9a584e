//! Encoding configuration and per-call override resolution.

use serde::{Deserialize, Serialize};

use crate::encoding::Encoding;
use crate::error::{CoreError, FieldDecodeError, Result};

/// The pair of encodings applied to one call: one for names, one for values.
///
/// A process-wide default is fixed at startup; each call may override either
/// field independently via [`EncodingOverrides`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EncodingConfig {
    pub name_encoding: Encoding,
    pub value_encoding: Encoding,
}

impl EncodingConfig {
    pub const fn new(name_encoding: Encoding, value_encoding: Encoding) -> Self {
        Self {
            name_encoding,
            value_encoding,
        }
    }

    /// Merge per-call overrides onto these defaults.
    ///
    /// Fields are resolved independently; `self` is never modified.
    pub fn resolve(&self, overrides: &EncodingOverrides) -> EncodingConfig {
        EncodingConfig {
            name_encoding: overrides.name_encoding.unwrap_or(self.name_encoding),
            value_encoding: overrides.value_encoding.unwrap_or(self.value_encoding),
        }
    }

    pub fn decode_name(&self, text: &str) -> Result<Vec<u8>> {
        self.name_encoding.decode(text)
    }

    pub fn decode_value(&self, text: &str) -> Result<Vec<u8>> {
        self.value_encoding.decode(text)
    }

    pub fn encode_name(&self, raw: &[u8]) -> std::result::Result<String, FieldDecodeError> {
        self.name_encoding.encode(raw)
    }

    pub fn encode_value(&self, raw: &[u8]) -> std::result::Result<String, FieldDecodeError> {
        self.value_encoding.encode(raw)
    }
}

/// Optional per-call encoding overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingOverrides {
    pub name_encoding: Option<Encoding>,
    pub value_encoding: Option<Encoding>,
}

impl EncodingOverrides {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn name(encoding: Encoding) -> Self {
        Self {
            name_encoding: Some(encoding),
            value_encoding: None,
        }
    }

    pub fn value(encoding: Encoding) -> Self {
        Self {
            name_encoding: None,
            value_encoding: Some(encoding),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name_encoding.is_none() && self.value_encoding.is_none()
    }
}

/// Consensus parameters for name operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainParams {
    /// Confirmations a `name_new` needs (counting the including block)
    /// before its `name_firstupdate` may be mined.
    pub min_firstupdate_depth: u32,
    /// Maximum length of a name in bytes.
    pub max_name_length: usize,
    /// Maximum length of a value in bytes.
    pub max_value_length: usize,
    /// Amount locked in every name output.
    pub name_locked_amount: u64,
    /// Length of the random salt used for commitments.
    pub rand_length: usize,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            min_firstupdate_depth: 12,
            max_name_length: 255,
            max_value_length: 520,
            name_locked_amount: 1_000_000,
            rand_length: 20,
        }
    }
}

impl ChainParams {
    /// Check decoded name and value against the length limits.
    pub fn check_lengths(&self, name: &[u8], value: Option<&[u8]>) -> Result<()> {
        if name.len() > self.max_name_length {
            return Err(CoreError::NameTooLong);
        }
        if let Some(value) = value {
            if value.len() > self.max_value_length {
                return Err(CoreError::ValueTooLong);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encoding() -> impl Strategy<Value = Encoding> {
        prop_oneof![Just(Encoding::Ascii), Just(Encoding::Hex), Just(Encoding::Utf8)]
    }

    #[test]
    fn test_default_is_ascii() {
        let config = EncodingConfig::default();
        assert_eq!(config.name_encoding, Encoding::Ascii);
        assert_eq!(config.value_encoding, Encoding::Ascii);
    }

    #[test]
    fn test_resolve_single_field() {
        let defaults = EncodingConfig::default();
        let resolved = defaults.resolve(&EncodingOverrides::name(Encoding::Utf8));
        assert_eq!(resolved.name_encoding, Encoding::Utf8);
        assert_eq!(resolved.value_encoding, Encoding::Ascii);

        // Defaults are untouched by the call.
        assert_eq!(defaults, EncodingConfig::default());
    }

    #[test]
    fn test_overrides_deserialize() {
        let overrides: EncodingOverrides =
            serde_json::from_str(r#"{"valueEncoding":"hex"}"#).unwrap();
        assert_eq!(overrides, EncodingOverrides::value(Encoding::Hex));
    }

    #[test]
    fn test_length_limits() {
        let params = ChainParams::default();
        assert!(params.check_lengths(&[0u8; 255], Some(&[0u8; 520])).is_ok());
        assert_eq!(params.check_lengths(&[0u8; 256], None), Err(CoreError::NameTooLong));
        assert_eq!(
            params.check_lengths(b"d/x", Some(&[0u8; 521])),
            Err(CoreError::ValueTooLong)
        );
    }

    proptest! {
        #[test]
        fn test_override_precedence(
            default_name in encoding(),
            default_value in encoding(),
            name in prop::option::of(encoding()),
            value in prop::option::of(encoding()),
        ) {
            let defaults = EncodingConfig::new(default_name, default_value);
            let resolved = defaults.resolve(&EncodingOverrides {
                name_encoding: name,
                value_encoding: value,
            });
            prop_assert_eq!(resolved.name_encoding, name.unwrap_or(default_name));
            prop_assert_eq!(resolved.value_encoding, value.unwrap_or(default_value));
        }
    }
}

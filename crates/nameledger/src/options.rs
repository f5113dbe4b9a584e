//! Per-call options.
//!
//! Every read and write accepts an optional JSON options object:
//!
//! ```json
//! {"nameEncoding": "hex", "valueEncoding": "utf8", "destAddress": "nl1..."}
//! ```
//!
//! Types are checked before anything else happens, so a call with a
//! malformed options object never touches the store, ledger or wallet.

use std::str::FromStr;

use nameledger_core::{Address, Encoding, EncodingOverrides};
use serde_json::Value;

use crate::error::{EngineError, Result};

/// Parsed per-call options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    pub encodings: EncodingOverrides,
    /// Where a write sends the name output. A fresh wallet address if unset.
    pub dest_address: Option<Address>,
}

impl CallOptions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_encodings(encodings: EncodingOverrides) -> Self {
        Self {
            encodings,
            dest_address: None,
        }
    }

    /// Parse an options object. `None` and JSON `null` mean "no options".
    ///
    /// Unknown keys are ignored.
    pub fn from_json(options: Option<&Value>) -> Result<Self> {
        let object = match options {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Object(object)) => object,
            Some(other) => return Err(EngineError::type_mismatch("options", other)),
        };

        // All type checks first, then value checks.
        let name_encoding = string_field(object, "nameEncoding")?;
        let value_encoding = string_field(object, "valueEncoding")?;
        let dest_address = string_field(object, "destAddress")?;

        Ok(Self {
            encodings: EncodingOverrides {
                name_encoding: name_encoding.map(Encoding::from_str).transpose()?,
                value_encoding: value_encoding.map(Encoding::from_str).transpose()?,
            },
            dest_address: dest_address.map(Address::new),
        })
    }
}

fn string_field<'a>(
    object: &'a serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<&'a str>> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(EngineError::type_mismatch(key, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nameledger_core::EncodingConfig;
    use proptest::prelude::*;
    use serde_json::json;

    fn encoding() -> impl Strategy<Value = Encoding> {
        prop::sample::select(Encoding::ALL.to_vec())
    }

    #[test]
    fn test_absent_and_null() {
        assert_eq!(CallOptions::from_json(None).unwrap(), CallOptions::none());
        assert_eq!(
            CallOptions::from_json(Some(&Value::Null)).unwrap(),
            CallOptions::none()
        );
        assert_eq!(
            CallOptions::from_json(Some(&json!({}))).unwrap(),
            CallOptions::none()
        );
    }

    #[test]
    fn test_parses_overrides() {
        let opts = CallOptions::from_json(Some(&json!({
            "nameEncoding": "utf8",
            "destAddress": "nl1dest",
            "somethingElse": 5,
        })))
        .unwrap();
        assert_eq!(opts.encodings, EncodingOverrides::name(Encoding::Utf8));
        assert_eq!(opts.dest_address, Some(Address::new("nl1dest")));
    }

    #[test]
    fn test_type_mismatch() {
        for options in [
            json!({"nameEncoding": 42}),
            json!({"valueEncoding": true}),
            json!({"destAddress": ["x"]}),
            json!("hex"),
        ] {
            let err = CallOptions::from_json(Some(&options)).unwrap_err();
            assert_eq!(err.code(), -3, "{}", options);
            assert!(err.to_string().starts_with("Expected type string"));
        }
    }

    #[test]
    fn test_type_checked_before_values() {
        // The bad encoding name would be -8, but the type error wins.
        let err = CallOptions::from_json(Some(&json!({
            "nameEncoding": "latin1",
            "valueEncoding": 1,
        })))
        .unwrap_err();
        assert_eq!(err.code(), -3);
    }

    #[test]
    fn test_unknown_encoding() {
        let err = CallOptions::from_json(Some(&json!({"valueEncoding": "latin1"}))).unwrap_err();
        assert_eq!(err.code(), -8);
        assert_eq!(err.to_string(), "invalid encoding: latin1");
    }

    proptest! {
        #[test]
        fn test_override_precedence(
            name_default in encoding(),
            value_default in encoding(),
            name_override in prop::option::of(encoding()),
            value_override in prop::option::of(encoding()),
        ) {
            let mut object = serde_json::Map::new();
            if let Some(enc) = name_override {
                object.insert("nameEncoding".into(), json!(enc.as_str()));
            }
            if let Some(enc) = value_override {
                object.insert("valueEncoding".into(), json!(enc.as_str()));
            }
            let opts = CallOptions::from_json(Some(&Value::Object(object))).unwrap();

            let defaults = EncodingConfig::new(name_default, value_default);
            let effective = defaults.resolve(&opts.encodings);
            prop_assert_eq!(effective.name_encoding, name_override.unwrap_or(name_default));
            prop_assert_eq!(effective.value_encoding, value_override.unwrap_or(value_default));
        }
    }
}

//! Node configuration.

use std::str::FromStr;

use nameledger_core::{ChainParams, Encoding, EncodingConfig};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings fixed at node start. Replaced only by [`crate::NameEngine::restart`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Default encoding for names.
    pub name_encoding: Encoding,
    /// Default encoding for values.
    pub value_encoding: Encoding,
    /// Whether `name_history` is served.
    pub name_history: bool,
    /// Consensus parameters.
    pub chain: ChainParams,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name_encoding: Encoding::Ascii,
            value_encoding: Encoding::Ascii,
            name_history: false,
            chain: ChainParams::default(),
        }
    }
}

impl NodeConfig {
    /// The default encodings as a pair.
    pub fn encodings(&self) -> EncodingConfig {
        EncodingConfig::new(self.name_encoding, self.value_encoding)
    }

    /// Build from command-line style arguments.
    ///
    /// Recognized: `-nameencoding=<enc>`, `-valueencoding=<enc>`,
    /// `-namehistory` and `-namehistory=<0|1>`. The encoding flags need a
    /// value. Everything else is left to the rest of the node.
    pub fn from_args<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::default();
        for arg in args {
            let arg = arg.as_ref();
            let Some(flag) = arg.strip_prefix('-') else {
                continue;
            };
            let (key, value) = match flag.split_once('=') {
                Some((key, value)) => (key, Some(value)),
                None => (flag, None),
            };
            match (key, value) {
                ("nameencoding", Some(value)) => config.name_encoding = Encoding::from_str(value)?,
                ("valueencoding", Some(value)) => {
                    config.value_encoding = Encoding::from_str(value)?
                }
                ("nameencoding", None) => return Err(missing_value("nameencoding")),
                ("valueencoding", None) => return Err(missing_value("valueencoding")),
                ("namehistory", None | Some("1")) => config.name_history = true,
                ("namehistory", Some("0")) => config.name_history = false,
                ("namehistory", Some(other)) => {
                    return Err(ConfigError::InvalidValue {
                        key: "namehistory",
                        value: other.to_string(),
                    })
                }
                _ => {}
            }
        }
        Ok(config)
    }

    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn missing_value(key: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nameledger_core::CoreError;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.encodings(), EncodingConfig::default());
        assert!(!config.name_history);
        assert_eq!(config.chain.min_firstupdate_depth, 12);
    }

    #[test]
    fn test_from_args() {
        let config = NodeConfig::from_args([
            "-nameencoding=utf8",
            "-valueencoding=hex",
            "-namehistory",
            "-datadir=/tmp/x",
            "positional",
        ])
        .unwrap();
        assert_eq!(config.name_encoding, Encoding::Utf8);
        assert_eq!(config.value_encoding, Encoding::Hex);
        assert!(config.name_history);

        let config = NodeConfig::from_args(["-namehistory=1", "-namehistory=0"]).unwrap();
        assert!(!config.name_history);
    }

    #[test]
    fn test_bad_encoding_fails() {
        let err = NodeConfig::from_args(["-nameencoding=latin1"]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Encoding(CoreError::UnknownEncoding(ref s)) if s == "latin1"
        ));
        assert!(NodeConfig::from_args(["-namehistory=yes"]).is_err());
    }

    #[test]
    fn test_encoding_flag_needs_value() {
        for flag in ["-nameencoding", "-valueencoding"] {
            let err = NodeConfig::from_args([flag]).unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue { key, ref value } if key == &flag[1..] && value.is_empty()
            ));
        }
        // An empty value is not a known encoding either.
        assert!(matches!(
            NodeConfig::from_args(["-valueencoding="]).unwrap_err(),
            ConfigError::Encoding(_)
        ));
    }

    #[test]
    fn test_from_json() {
        let config =
            NodeConfig::from_json(r#"{"value_encoding":"hex","chain":{"rand_length":8}}"#).unwrap();
        assert_eq!(config.name_encoding, Encoding::Ascii);
        assert_eq!(config.value_encoding, Encoding::Hex);
        assert_eq!(config.chain.rand_length, 8);
        assert_eq!(config.chain.max_name_length, 255);
    }
}

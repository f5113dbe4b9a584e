//! Name records and their encoding-aware rendering.
//!
//! Every read view is built from a [`NameRecord`] (or a bare name/value pair
//! taken from a transaction) through [`RenderedNameValue::render`]. Keeping
//! one constructor is what makes the views agree with each other.

use bytes::Bytes;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::config::EncodingConfig;
use crate::encoding::Encoding;
use crate::error::FieldDecodeError;
use crate::types::{Address, Height, OutPoint, Txid};

/// Whether a record is on chain or only in the mempool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameStatus {
    Pending,
    Confirmed,
}

/// The confirmed state of a name at some height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    pub name: Bytes,
    pub value: Bytes,
    pub txid: Txid,
    pub vout: u32,
    pub address: Address,
    pub height: Height,
}

impl NameRecord {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout)
    }
}

/// One field rendered in one encoding: either the text or the reason it
/// could not be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedField {
    pub encoding: Encoding,
    pub text: Result<String, FieldDecodeError>,
}

impl RenderedField {
    pub fn render(raw: &[u8], encoding: Encoding) -> Self {
        Self {
            encoding,
            text: encoding.encode(raw),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.text.is_ok()
    }
}

/// A name/value pair rendered under an effective encoding configuration.
///
/// Serializes to `name_encoding`, then `name` or `name_error`, then
/// `value_encoding`, then `value` or `value_error`. The two pairs are
/// independent: a bad value never hides a good name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNameValue {
    pub name: RenderedField,
    pub value: RenderedField,
}

impl RenderedNameValue {
    pub fn render(name: &[u8], value: &[u8], encodings: &EncodingConfig) -> Self {
        Self {
            name: RenderedField::render(name, encodings.name_encoding),
            value: RenderedField::render(value, encodings.value_encoding),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.name.is_ok() && self.value.is_ok()
    }
}

impl Serialize for RenderedNameValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        serialize_field(&mut map, "name", &self.name)?;
        serialize_field(&mut map, "value", &self.value)?;
        map.end()
    }
}

fn serialize_field<M: SerializeMap>(
    map: &mut M,
    prefix: &str,
    field: &RenderedField,
) -> Result<(), M::Error> {
    map.serialize_entry(&format!("{}_encoding", prefix), &field.encoding)?;
    match &field.text {
        Ok(text) => map.serialize_entry(prefix, text),
        Err(err) => map.serialize_entry(&format!("{}_error", prefix), &err.to_string()),
    }
}

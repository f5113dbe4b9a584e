//! Namespaces and value conventions layered on top of raw names.
//!
//! None of this is enforced by consensus; it classifies names and values for
//! display and for tools that build well-formed registrations.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

use crate::encoding::{encode_name_for_message, Encoding};

/// Maximum length of a `d/` label.
pub const MAX_DOMAIN_LABEL: usize = 63;

/// Top-level domain for `d/` names.
pub const DOMAIN_SUFFIX: &str = ".bit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// `d/`: domain names.
    Domain,
    /// `dd/`: domain data.
    DomainData,
    /// `id/`: identities.
    Identity,
    /// `idd/`: identity data.
    IdentityData,
    NonStandard,
}

impl Namespace {
    pub fn prefix(self) -> &'static str {
        match self {
            Namespace::Domain => "d/",
            Namespace::DomainData => "dd/",
            Namespace::Identity => "id/",
            Namespace::IdentityData => "idd/",
            Namespace::NonStandard => "",
        }
    }

    fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "d/" => Namespace::Domain,
            "dd/" => Namespace::DomainData,
            "id/" => Namespace::Identity,
            "idd/" => Namespace::IdentityData,
            _ => Namespace::NonStandard,
        }
    }

    /// Classify a raw name.
    ///
    /// Names that are not printable ASCII are always non-standard.
    pub fn of(name: &[u8]) -> Self {
        match Encoding::Ascii.encode(name) {
            Ok(text) => Self::of_str(&text),
            Err(_) => Namespace::NonStandard,
        }
    }

    /// Classify a name given as ASCII text.
    pub fn of_str(name: &str) -> Self {
        let purported = match name.find('/') {
            Some(pos) => Self::from_prefix(&name[..=pos]),
            None => Namespace::NonStandard,
        };
        let label = &name[purported.prefix().len()..];
        if label.is_empty() {
            return Namespace::NonStandard;
        }

        match purported {
            Namespace::Domain => {
                if is_domain_label(label) {
                    Namespace::Domain
                } else {
                    Namespace::NonStandard
                }
            }
            Namespace::Identity => {
                if is_ldh_label(label) {
                    Namespace::Identity
                } else {
                    Namespace::NonStandard
                }
            }
            other => other,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::NonStandard => f.write_str("non-standard"),
            other => f.write_str(other.prefix()),
        }
    }
}

/// `[a-z0-9]+(-[a-z0-9]+)*`
fn is_ldh_label(label: &str) -> bool {
    !label.is_empty()
        && label.split('-').all(|part| {
            !part.is_empty()
                && part
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        })
}

/// `(xn--)?[a-z0-9]+(-[a-z0-9]+)*`, at most 63 chars, not all digits.
fn is_domain_label(label: &str) -> bool {
    if label.len() > MAX_DOMAIN_LABEL {
        return false;
    }
    let body = label.strip_prefix("xn--").unwrap_or(label);
    if !is_ldh_label(body) {
        return false;
    }
    !label.bytes().all(|b| b.is_ascii_digit())
}

/// Short human description of a name: `example.bit` for domains, the
/// message rendering otherwise.
pub fn desc_from_name(name: &[u8]) -> String {
    if Namespace::of(name) == Namespace::Domain {
        if let Ok(text) = Encoding::Ascii.encode(name) {
            let label = &text[Namespace::Domain.prefix().len()..];
            return format!("{}{}", label, DOMAIN_SUFFIX);
        }
    }
    encode_name_for_message(name)
}

/// `example.bit` to `d/example`. Returns `None` for anything that is not a
/// single valid label under `.bit`.
pub fn domain_to_name(domain: &str) -> Option<String> {
    let label = domain.strip_suffix(DOMAIN_SUFFIX)?;
    if label.contains('.') || !is_domain_label(label) {
        return None;
    }
    Some(format!("{}{}", Namespace::Domain.prefix(), label))
}

/// `d/example` to `example.bit`.
pub fn name_to_domain(name: &str) -> Option<String> {
    if Namespace::of_str(name) != Namespace::Domain {
        return None;
    }
    let label = name.strip_prefix(Namespace::Domain.prefix())?;
    Some(format!("{}{}", label, DOMAIN_SUFFIX))
}

/// Convert a name from one text encoding to another.
///
/// `None` if the text is not valid in `from` or the bytes have no rendering
/// in `to`.
pub fn convert_name(text: &str, from: Encoding, to: Encoding) -> Option<String> {
    let raw = from.decode(text).ok()?;
    to.encode(&raw).ok()
}

// ─────────────────────────────────────────────────────────────────────────
// Value conventions
// ─────────────────────────────────────────────────────────────────────────

/// Values are expected to be JSON; an empty value is allowed.
pub fn is_valid_json_or_empty(text: &str) -> bool {
    text.is_empty() || serde_json::from_str::<serde_json::Value>(text).is_ok()
}

/// The compact rendering of a JSON value, keys in their original order.
pub fn minimal_json(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    serde_json::to_string(&value).ok()
}

/// Whether the text is already in compact form.
pub fn is_minimal_json_or_empty(text: &str) -> bool {
    if text.is_empty() {
        return true;
    }
    minimal_json(text).is_some_and(|minimal| minimal == text)
}

pub fn is_valid_ipv4(text: &str) -> bool {
    text.parse::<Ipv4Addr>().is_ok()
}

pub fn is_valid_ipv6(text: &str) -> bool {
    text.parse::<Ipv6Addr>().is_ok()
}

fn is_base32_lower(text: &str) -> bool {
    text.bytes()
        .all(|b| b.is_ascii_lowercase() || (b'2'..=b'7').contains(&b))
}

/// A Tor v3 onion service address.
pub fn is_valid_onion(text: &str) -> bool {
    match text.strip_suffix(".onion") {
        Some(host) => host.len() == 56 && is_base32_lower(host) && host.ends_with('d'),
        None => false,
    }
}

/// An I2P b32 destination.
pub fn is_valid_i2p(text: &str) -> bool {
    match text.strip_suffix(".b32.i2p") {
        Some(host) => host.len() == 52 && is_base32_lower(host),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_prefixes() {
        assert_eq!(Namespace::of(b"d/example"), Namespace::Domain);
        assert_eq!(Namespace::of(b"dd/anything goes"), Namespace::DomainData);
        assert_eq!(Namespace::of(b"id/alice"), Namespace::Identity);
        assert_eq!(Namespace::of(b"idd/x"), Namespace::IdentityData);
        assert_eq!(Namespace::of(b"x/y"), Namespace::NonStandard);
        assert_eq!(Namespace::of(b"noslash"), Namespace::NonStandard);
    }

    #[test]
    fn test_empty_label_is_non_standard() {
        assert_eq!(Namespace::of(b"d/"), Namespace::NonStandard);
        assert_eq!(Namespace::of(b"dd/"), Namespace::NonStandard);
        assert_eq!(Namespace::of(b""), Namespace::NonStandard);
    }

    #[test]
    fn test_domain_labels() {
        assert_eq!(Namespace::of(b"d/a-b-c"), Namespace::Domain);
        assert_eq!(Namespace::of(b"d/xn--bcher-kva"), Namespace::Domain);
        assert_eq!(Namespace::of(b"d/1a"), Namespace::Domain);

        assert_eq!(Namespace::of(b"d/123"), Namespace::NonStandard);
        assert_eq!(Namespace::of(b"d/Upper"), Namespace::NonStandard);
        assert_eq!(Namespace::of(b"d/-lead"), Namespace::NonStandard);
        assert_eq!(Namespace::of(b"d/trail-"), Namespace::NonStandard);
        assert_eq!(Namespace::of(b"d/dou--ble"), Namespace::NonStandard);
        assert_eq!(Namespace::of(b"d/xn--"), Namespace::NonStandard);
        assert_eq!(Namespace::of(b"d/a.b"), Namespace::NonStandard);

        let max = format!("d/{}", "a".repeat(63));
        assert_eq!(Namespace::of(max.as_bytes()), Namespace::Domain);
        let over = format!("d/{}", "a".repeat(64));
        assert_eq!(Namespace::of(over.as_bytes()), Namespace::NonStandard);
    }

    #[test]
    fn test_identity_labels() {
        assert_eq!(Namespace::of(b"id/123"), Namespace::Identity);
        assert_eq!(Namespace::of(b"id/xn--abc"), Namespace::NonStandard);
        assert_eq!(Namespace::of(b"id/a_b"), Namespace::NonStandard);
    }

    #[test]
    fn test_non_ascii_is_non_standard() {
        assert_eq!(Namespace::of("d/äöü".as_bytes()), Namespace::NonStandard);
        assert_eq!(Namespace::of(b"d/\xff"), Namespace::NonStandard);
    }

    #[test]
    fn test_desc_from_name() {
        assert_eq!(desc_from_name(b"d/example"), "example.bit");
        assert_eq!(desc_from_name(b"id/alice"), "'id/alice'");
        assert_eq!(desc_from_name(b"d/\xff"), "0x642fff");
    }

    #[test]
    fn test_domain_conversions() {
        assert_eq!(domain_to_name("example.bit").as_deref(), Some("d/example"));
        assert_eq!(domain_to_name("sub.example.bit"), None);
        assert_eq!(domain_to_name("example.com"), None);
        assert_eq!(name_to_domain("d/example").as_deref(), Some("example.bit"));
        assert_eq!(name_to_domain("id/example"), None);
    }

    #[test]
    fn test_convert_name() {
        assert_eq!(
            convert_name("d/abc", Encoding::Ascii, Encoding::Hex).as_deref(),
            Some("642f616263")
        );
        assert_eq!(
            convert_name("642F616263", Encoding::Hex, Encoding::Ascii).as_deref(),
            Some("d/abc")
        );
        assert_eq!(convert_name("ff", Encoding::Hex, Encoding::Ascii), None);
    }

    #[test]
    fn test_json_helpers() {
        assert!(is_valid_json_or_empty(""));
        assert!(is_valid_json_or_empty(r#"{"ip": "1.2.3.4"}"#));
        assert!(!is_valid_json_or_empty("{"));

        assert!(is_minimal_json_or_empty(""));
        assert!(is_minimal_json_or_empty(r#"{"b":1,"a":[1,2]}"#));
        assert!(!is_minimal_json_or_empty(r#"{"b": 1}"#));
        assert_eq!(minimal_json(r#"{ "b" : 1 , "a" : 2 }"#).as_deref(), Some(r#"{"b":1,"a":2}"#));
        assert_eq!(minimal_json("not json"), None);
    }

    #[test]
    fn test_address_helpers() {
        assert!(is_valid_ipv4("192.168.0.1"));
        assert!(!is_valid_ipv4("256.0.0.1"));
        assert!(is_valid_ipv6("2001:db8::1"));
        assert!(!is_valid_ipv6("2001:db8::g"));

        let onion = format!("{}d.onion", "a".repeat(55));
        assert!(is_valid_onion(&onion));
        assert!(!is_valid_onion("short.onion"));
        assert!(!is_valid_onion(&format!("{}d.com", "a".repeat(55))));

        let i2p = format!("{}.b32.i2p", "b".repeat(52));
        assert!(is_valid_i2p(&i2p));
        assert!(!is_valid_i2p(&format!("{}.b32.i2p", "1".repeat(52))));
    }
}

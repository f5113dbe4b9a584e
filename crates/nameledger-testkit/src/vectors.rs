//! Golden codec vectors.
//!
//! Fixed byte sequences with their expected text in each encoding. Every
//! implementation must render and reject exactly these.

use nameledger_core::{encode_name_for_message, Encoding};

/// A golden codec vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Raw name or value bytes.
    pub raw: &'static [u8],
    /// Expected `ascii` text, `None` if rejected.
    pub ascii: Option<&'static str>,
    /// Expected `utf8` text, `None` if rejected.
    pub utf8: Option<&'static str>,
    /// Expected `hex` text. Always present.
    pub hex: &'static str,
    /// Expected rendering in wallet messages.
    pub message: &'static str,
}

/// Get all golden vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "domain name",
            raw: b"d/abc",
            ascii: Some("d/abc"),
            utf8: Some("d/abc"),
            hex: "642f616263",
            message: "'d/abc'",
        },
        GoldenVector {
            name: "empty",
            raw: b"",
            ascii: Some(""),
            utf8: Some(""),
            hex: "",
            message: "''",
        },
        GoldenVector {
            name: "json value",
            raw: br#"{"foo":"bar"}"#,
            ascii: Some(r#"{"foo":"bar"}"#),
            utf8: Some(r#"{"foo":"bar"}"#),
            hex: "7b22666f6f223a22626172227d",
            message: r#"'{"foo":"bar"}'"#,
        },
        GoldenVector {
            name: "newline",
            raw: b"d/\n",
            ascii: None,
            utf8: None,
            hex: "642f0a",
            message: "0x642f0a",
        },
        GoldenVector {
            name: "umlauts",
            raw: "d/äöü".as_bytes(),
            ascii: None,
            utf8: Some("d/äöü"),
            hex: "642fc3a4c3b6c3bc",
            message: "0x642fc3a4c3b6c3bc",
        },
        GoldenVector {
            name: "nul and newline around umlauts",
            raw: "d/\0äöü\n".as_bytes(),
            ascii: None,
            utf8: None,
            hex: "642f00c3a4c3b6c3bc0a",
            message: "0x642f00c3a4c3b6c3bc0a",
        },
        GoldenVector {
            name: "invalid utf-8",
            raw: b"d/\xff",
            ascii: None,
            utf8: None,
            hex: "642fff",
            message: "0x642fff",
        },
        GoldenVector {
            name: "binary",
            raw: b"\x00\x11\xff",
            ascii: None,
            utf8: None,
            hex: "0011ff",
            message: "0x0011ff",
        },
        GoldenVector {
            name: "delete character",
            raw: b"d/\x7f",
            ascii: None,
            utf8: None,
            hex: "642f7f",
            message: "0x642f7f",
        },
    ]
}

/// Check one vector, returning the first mismatch.
pub fn verify_vector(vector: &GoldenVector) -> Result<(), String> {
    let expectations = [
        (Encoding::Ascii, vector.ascii),
        (Encoding::Utf8, vector.utf8),
        (Encoding::Hex, Some(vector.hex)),
    ];
    for (encoding, expected) in expectations {
        let got = encoding.encode(vector.raw).ok();
        if got.as_deref() != expected {
            return Err(format!(
                "{}: {} rendered {:?}, expected {:?}",
                vector.name, encoding, got, expected
            ));
        }
        if let Some(text) = expected {
            match encoding.decode(text) {
                Ok(raw) if raw == vector.raw => {}
                other => {
                    return Err(format!(
                        "{}: {} decoded {:?}, expected {:?}",
                        vector.name, encoding, other, vector.raw
                    ))
                }
            }
        }
    }
    let message = encode_name_for_message(vector.raw);
    if message != vector.message {
        return Err(format!(
            "{}: message {:?}, expected {:?}",
            vector.name, message, vector.message
        ));
    }
    Ok(())
}

/// Verify all golden vectors.
pub fn verify_all_vectors() -> Vec<(String, Result<(), String>)> {
    all_vectors()
        .iter()
        .map(|v| (v.name.to_string(), verify_vector(v)))
        .collect()
}

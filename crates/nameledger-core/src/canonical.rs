//! Canonical CBOR encoding for scripts and transactions.
//!
//! This module implements RFC 8949 Core Deterministic Encoding for the
//! subset of CBOR the ledger uses:
//! - Map keys are small integers written in ascending order
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats
//!
//! Decoding goes through `ciborium` and then re-encodes: input that is valid
//! CBOR but not in canonical form is rejected, so every transaction has
//! exactly one byte representation and therefore one txid.

use bytes::Bytes;
use ciborium::value::Value;

use crate::crypto::{Ed25519PublicKey, Ed25519Signature};
use crate::error::CoreError;
use crate::operation::{Commitment, NameOpKind, NameOperation};
use crate::transaction::{Script, Transaction, TxIn, TxOut, TX_VERSION};
use crate::types::{Address, OutPoint, Txid};

/// Script field keys.
mod script_keys {
    pub const ADDRESS: u64 = 0;
    pub const OP: u64 = 1;
    /// Commitment for `name_new`, name otherwise.
    pub const NAME: u64 = 2;
    pub const VALUE: u64 = 3;
    pub const RAND: u64 = 4;
}

/// Transaction field keys.
mod tx_keys {
    pub const VERSION: u64 = 0;
    pub const INPUTS: u64 = 1;
    pub const OUTPUTS: u64 = 2;

    pub const IN_TXID: u64 = 0;
    pub const IN_VOUT: u64 = 1;
    pub const IN_PUBKEY: u64 = 2;
    pub const IN_SIGNATURE: u64 = 3;

    pub const OUT_AMOUNT: u64 = 0;
    pub const OUT_SCRIPT: u64 = 1;
}

// ─────────────────────────────────────────────────────────────────────────
// Encoding
// ─────────────────────────────────────────────────────────────────────────

/// Encode a script to canonical bytes.
pub fn script_bytes(script: &Script) -> Vec<u8> {
    let mut buf = Vec::new();
    let entries = match &script.name_op {
        None => 1,
        Some(NameOperation::NameNew { .. }) => 3,
        Some(NameOperation::NameUpdate { .. }) => 4,
        Some(NameOperation::NameFirstUpdate { .. }) => 5,
    };
    encode_uint(&mut buf, 5, entries);

    encode_uint(&mut buf, 0, script_keys::ADDRESS);
    encode_text(&mut buf, script.address.as_str());

    if let Some(op) = &script.name_op {
        encode_uint(&mut buf, 0, script_keys::OP);
        encode_uint(&mut buf, 0, op.kind().to_u8() as u64);

        match op {
            NameOperation::NameNew { commitment } => {
                encode_uint(&mut buf, 0, script_keys::NAME);
                encode_bytes(&mut buf, commitment.0.as_bytes());
            }
            NameOperation::NameFirstUpdate { name, value, rand } => {
                encode_uint(&mut buf, 0, script_keys::NAME);
                encode_bytes(&mut buf, name);
                encode_uint(&mut buf, 0, script_keys::VALUE);
                encode_bytes(&mut buf, value);
                encode_uint(&mut buf, 0, script_keys::RAND);
                encode_bytes(&mut buf, rand);
            }
            NameOperation::NameUpdate { name, value } => {
                encode_uint(&mut buf, 0, script_keys::NAME);
                encode_bytes(&mut buf, name);
                encode_uint(&mut buf, 0, script_keys::VALUE);
                encode_bytes(&mut buf, value);
            }
        }
    }
    buf
}

/// Encode a transaction to canonical bytes.
pub fn transaction_bytes(tx: &Transaction) -> Vec<u8> {
    encode_transaction(tx, true)
}

/// Encode a transaction with every input's key and signature stripped.
///
/// This is the message each input signs.
pub fn unsigned_transaction_bytes(tx: &Transaction) -> Vec<u8> {
    encode_transaction(tx, false)
}

fn encode_transaction(tx: &Transaction, with_witness: bool) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_uint(&mut buf, 5, 3);

    encode_uint(&mut buf, 0, tx_keys::VERSION);
    encode_uint(&mut buf, 0, TX_VERSION as u64);

    encode_uint(&mut buf, 0, tx_keys::INPUTS);
    encode_uint(&mut buf, 4, tx.inputs.len() as u64);
    for input in &tx.inputs {
        encode_uint(&mut buf, 5, 4);
        encode_uint(&mut buf, 0, tx_keys::IN_TXID);
        encode_bytes(&mut buf, input.prevout.txid.as_bytes());
        encode_uint(&mut buf, 0, tx_keys::IN_VOUT);
        encode_uint(&mut buf, 0, input.prevout.vout as u64);

        encode_uint(&mut buf, 0, tx_keys::IN_PUBKEY);
        match (&input.pubkey, with_witness) {
            (Some(key), true) => encode_bytes(&mut buf, key.as_bytes()),
            _ => buf.push(0xf6),
        }
        encode_uint(&mut buf, 0, tx_keys::IN_SIGNATURE);
        match (&input.signature, with_witness) {
            (Some(sig), true) => encode_bytes(&mut buf, sig.as_bytes()),
            _ => buf.push(0xf6),
        }
    }

    encode_uint(&mut buf, 0, tx_keys::OUTPUTS);
    encode_uint(&mut buf, 4, tx.outputs.len() as u64);
    for output in &tx.outputs {
        encode_uint(&mut buf, 5, 2);
        encode_uint(&mut buf, 0, tx_keys::OUT_AMOUNT);
        encode_uint(&mut buf, 0, output.amount);
        encode_uint(&mut buf, 0, tx_keys::OUT_SCRIPT);
        encode_bytes(&mut buf, &script_bytes(&output.script));
    }
    buf
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

// ─────────────────────────────────────────────────────────────────────────
// Decoding
// ─────────────────────────────────────────────────────────────────────────

/// Decode a script from canonical bytes.
pub fn decode_script(bytes: &[u8]) -> Result<Script, CoreError> {
    let value = read_value(bytes).map_err(CoreError::MalformedScript)?;
    let script = script_from_value(&value).map_err(CoreError::MalformedScript)?;
    if script_bytes(&script) != bytes {
        return Err(CoreError::MalformedScript("non-canonical encoding".into()));
    }
    Ok(script)
}

/// Decode a transaction from canonical bytes.
pub fn decode_transaction(bytes: &[u8]) -> Result<Transaction, CoreError> {
    let value = read_value(bytes).map_err(CoreError::MalformedTransaction)?;
    let tx = transaction_from_value(&value).map_err(CoreError::MalformedTransaction)?;
    if transaction_bytes(&tx) != bytes {
        return Err(CoreError::MalformedTransaction(
            "non-canonical encoding".into(),
        ));
    }
    Ok(tx)
}

fn read_value(bytes: &[u8]) -> Result<Value, String> {
    ciborium::from_reader(bytes).map_err(|e| e.to_string())
}

fn as_map(value: &Value) -> Result<&[(Value, Value)], String> {
    match value {
        Value::Map(m) => Ok(m),
        _ => Err("expected map".into()),
    }
}

/// Look up an integer key in a decoded map.
fn get(map: &[(Value, Value)], key: u64) -> Option<&Value> {
    map.iter()
        .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == key as i128))
        .map(|(_, v)| v)
}

fn get_uint(map: &[(Value, Value)], key: u64, field: &str) -> Result<u64, String> {
    match get(map, key) {
        Some(Value::Integer(i)) => u64::try_from(*i).map_err(|_| format!("invalid {}", field)),
        _ => Err(format!("missing {}", field)),
    }
}

fn get_bytes<'a>(map: &'a [(Value, Value)], key: u64, field: &str) -> Result<&'a [u8], String> {
    match get(map, key) {
        Some(Value::Bytes(b)) => Ok(b),
        _ => Err(format!("missing {}", field)),
    }
}

fn get_array<'a>(map: &'a [(Value, Value)], key: u64, field: &str) -> Result<&'a [Value], String> {
    match get(map, key) {
        Some(Value::Array(a)) => Ok(a),
        _ => Err(format!("missing {}", field)),
    }
}

fn script_from_value(value: &Value) -> Result<Script, String> {
    let map = as_map(value)?;

    let address = match get(map, script_keys::ADDRESS) {
        Some(Value::Text(s)) => Address::new(s.clone()),
        _ => return Err("missing address".into()),
    };

    let name_op = match get(map, script_keys::OP) {
        None => None,
        Some(Value::Integer(i)) => {
            let kind = u8::try_from(*i)
                .ok()
                .and_then(NameOpKind::from_u8)
                .ok_or_else(|| format!("invalid op: {}", i128::from(*i)))?;
            let name = get_bytes(map, script_keys::NAME, "name")?;
            Some(match kind {
                NameOpKind::NameNew => NameOperation::NameNew {
                    commitment: Commitment::from_slice(name).map_err(|e| e.to_string())?,
                },
                NameOpKind::NameFirstUpdate => NameOperation::NameFirstUpdate {
                    name: Bytes::copy_from_slice(name),
                    value: Bytes::copy_from_slice(get_bytes(map, script_keys::VALUE, "value")?),
                    rand: Bytes::copy_from_slice(get_bytes(map, script_keys::RAND, "rand")?),
                },
                NameOpKind::NameUpdate => NameOperation::NameUpdate {
                    name: Bytes::copy_from_slice(name),
                    value: Bytes::copy_from_slice(get_bytes(map, script_keys::VALUE, "value")?),
                },
            })
        }
        Some(_) => return Err("invalid op".into()),
    };

    Ok(Script { address, name_op })
}

fn transaction_from_value(value: &Value) -> Result<Transaction, String> {
    let map = as_map(value)?;

    let version = get_uint(map, tx_keys::VERSION, "version")?;
    if version != TX_VERSION as u64 {
        return Err(format!("unsupported version: {}", version));
    }

    let mut inputs = Vec::new();
    for item in get_array(map, tx_keys::INPUTS, "inputs")? {
        let entry = as_map(item)?;
        let txid = Txid::try_from(get_bytes(entry, tx_keys::IN_TXID, "txid")?)
            .map_err(|_| "invalid txid".to_string())?;
        let vout = u32::try_from(get_uint(entry, tx_keys::IN_VOUT, "vout")?)
            .map_err(|_| "invalid vout".to_string())?;

        let pubkey = match get(entry, tx_keys::IN_PUBKEY) {
            Some(Value::Bytes(b)) if b.len() == 32 => {
                let mut arr = [0u8; 32];
                arr.copy_from_slice(b);
                Some(Ed25519PublicKey(arr))
            }
            Some(Value::Null) | None => None,
            _ => return Err("invalid pubkey".into()),
        };
        let signature = match get(entry, tx_keys::IN_SIGNATURE) {
            Some(Value::Bytes(b)) if b.len() == 64 => {
                let mut arr = [0u8; 64];
                arr.copy_from_slice(b);
                Some(Ed25519Signature(arr))
            }
            Some(Value::Null) | None => None,
            _ => return Err("invalid signature".into()),
        };

        inputs.push(TxIn {
            prevout: OutPoint::new(txid, vout),
            pubkey,
            signature,
        });
    }

    let mut outputs = Vec::new();
    for item in get_array(map, tx_keys::OUTPUTS, "outputs")? {
        let entry = as_map(item)?;
        let amount = get_uint(entry, tx_keys::OUT_AMOUNT, "amount")?;
        let script_value = read_value(get_bytes(entry, tx_keys::OUT_SCRIPT, "script")?)?;
        let script = script_from_value(&script_value)?;
        outputs.push(TxOut { amount, script });
    }

    Ok(Transaction { inputs, outputs })
}

//! Transactions, outputs and scripts.
//!
//! A transaction spends outpoints and creates outputs. Each output pays an
//! address and may carry one [`NameOperation`]. The txid is the Blake3 hash
//! of the canonical transaction bytes.

use serde::{Deserialize, Serialize};

use crate::canonical::{
    decode_script, decode_transaction, script_bytes, transaction_bytes,
    unsigned_transaction_bytes,
};
use crate::crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair};
use crate::error::{CoreError, Result};
use crate::operation::NameOperation;
use crate::types::{Address, Amount, OutPoint, Txid};

/// Current transaction format version.
pub const TX_VERSION: u8 = 1;

/// Domain separator for the message each input signs.
const SIGHASH_DOMAIN: &[u8] = b"nameledger-sighash-v0:";

/// The locking part of an output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Script {
    pub address: Address,
    pub name_op: Option<NameOperation>,
}

impl Script {
    /// A plain payment.
    pub fn pay_to(address: Address) -> Self {
        Self {
            address,
            name_op: None,
        }
    }

    /// A name output.
    pub fn with_name_op(address: Address, op: NameOperation) -> Self {
        Self {
            address,
            name_op: Some(op),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        script_bytes(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        decode_script(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CoreError::MalformedScript(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub pubkey: Option<Ed25519PublicKey>,
    pub signature: Option<Ed25519Signature>,
}

impl TxIn {
    /// An unsigned input.
    pub fn new(prevout: OutPoint) -> Self {
        Self {
            prevout,
            pubkey: None,
            signature: None,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.pubkey.is_some() && self.signature.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub amount: Amount,
    pub script: Script,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
}

impl Transaction {
    pub fn new(inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> Self {
        Self { inputs, outputs }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        transaction_bytes(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        decode_transaction(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes =
            hex::decode(s).map_err(|e| CoreError::MalformedTransaction(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Blake3 of the canonical bytes, signatures included.
    pub fn txid(&self) -> Txid {
        Txid::from(Blake3Hash::hash(&self.to_bytes()))
    }

    /// The message every input signs: the transaction without witnesses.
    pub fn sighash(&self) -> Blake3Hash {
        Blake3Hash::hash_parts(&[SIGHASH_DOMAIN, &unsigned_transaction_bytes(self)])
    }

    /// Sign one input with `keypair`.
    pub fn sign_input(&mut self, index: usize, keypair: &Keypair) -> Result<()> {
        let sighash = self.sighash();
        let input = self
            .inputs
            .get_mut(index)
            .ok_or_else(|| CoreError::MalformedTransaction(format!("no input {}", index)))?;
        input.pubkey = Some(keypair.public_key());
        input.signature = Some(keypair.sign(sighash.as_bytes()));
        Ok(())
    }

    /// Verify the signature of one input and return the key that made it.
    pub fn verify_input(&self, index: usize) -> Result<Ed25519PublicKey> {
        let input = self
            .inputs
            .get(index)
            .ok_or_else(|| CoreError::MalformedTransaction(format!("no input {}", index)))?;
        let (pubkey, signature) = match (&input.pubkey, &input.signature) {
            (Some(k), Some(s)) => (k, s),
            _ => return Err(CoreError::InvalidSignature),
        };
        pubkey.verify(self.sighash().as_bytes(), signature)?;
        Ok(*pubkey)
    }

    /// The single name output, if any, with its index.
    pub fn name_output(&self) -> Option<(u32, &TxOut, &NameOperation)> {
        self.outputs.iter().enumerate().find_map(|(i, out)| {
            out.script
                .name_op
                .as_ref()
                .map(|op| (i as u32, out, op))
        })
    }

    /// Structural rules independent of chain state.
    pub fn check_structure(&self) -> Result<()> {
        if self.outputs.is_empty() {
            return Err(CoreError::MalformedTransaction("no outputs".into()));
        }
        let name_outputs = self
            .outputs
            .iter()
            .filter(|o| o.script.name_op.is_some())
            .count();
        if name_outputs > 1 {
            return Err(CoreError::MalformedTransaction(
                "more than one name output".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for input in &self.inputs {
            if !seen.insert(input.prevout) {
                return Err(CoreError::MalformedTransaction(
                    "duplicate input".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn total_output(&self) -> Amount {
        self.outputs.iter().map(|o| o.amount).sum()
    }
}

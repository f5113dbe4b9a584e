//! Response views.
//!
//! Every name/value pair in every response is rendered by
//! [`RenderedNameValue::render`] and flattened into the view, so all views
//! of the same bytes under the same encodings carry identical fields.

use nameledger_core::{
    encode_name_for_message, Amount, EncodingConfig, Height, NameOperation, NameRecord,
    NameStatus, RenderedNameValue, Script, Transaction, TxOut,
};
use serde::Serialize;

use crate::ledger::{TxCategory, WalletDetail, WalletTransaction};

/// A confirmed record as returned by `name_show`, `name_history`,
/// `name_scan`, `name_list` and `name_filter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameInfo {
    #[serde(flatten)]
    pub fields: RenderedNameValue,
    pub txid: String,
    pub vout: u32,
    pub address: String,
    pub height: Height,
    pub status: NameStatus,
    pub ismine: bool,
}

impl NameInfo {
    pub fn from_record(record: &NameRecord, encodings: &EncodingConfig, ismine: bool) -> Self {
        let fields = render(&record.name, &record.value, encodings);
        Self {
            fields,
            txid: record.txid.to_hex(),
            vout: record.vout,
            address: record.address.to_string(),
            height: record.height,
            status: NameStatus::Confirmed,
            ismine,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.fields.name.text.as_deref().ok()
    }

    pub fn value(&self) -> Option<&str> {
        self.fields.value.text.as_deref().ok()
    }
}

/// An update-type operation waiting in the mempool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingInfo {
    pub op: &'static str,
    #[serde(flatten)]
    pub fields: RenderedNameValue,
    pub txid: String,
    pub vout: u32,
    pub status: NameStatus,
    pub ismine: bool,
}

/// `nameOp` of a `name_new` output: the name is still concealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameNewOpView {
    pub op: &'static str,
    pub hash: String,
}

/// `nameOp` of a `name_firstupdate` or `name_update` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameUpdateOpView {
    pub op: &'static str,
    #[serde(flatten)]
    pub fields: RenderedNameValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rand: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NameOpView {
    New(NameNewOpView),
    Update(NameUpdateOpView),
}

impl NameOpView {
    pub fn from_operation(op: &NameOperation, encodings: &EncodingConfig) -> Self {
        let kind = op.kind().as_str();
        match op {
            NameOperation::NameNew { commitment } => NameOpView::New(NameNewOpView {
                op: kind,
                hash: commitment.to_hex(),
            }),
            NameOperation::NameFirstUpdate { name, value, rand } => {
                NameOpView::Update(NameUpdateOpView {
                    op: kind,
                    fields: render(name, value, encodings),
                    rand: Some(hex::encode(rand)),
                })
            }
            NameOperation::NameUpdate { name, value } => NameOpView::Update(NameUpdateOpView {
                op: kind,
                fields: render(name, value, encodings),
                rand: None,
            }),
        }
    }

    pub fn fields(&self) -> Option<&RenderedNameValue> {
        match self {
            NameOpView::New(_) => None,
            NameOpView::Update(view) => Some(&view.fields),
        }
    }
}

/// A decoded script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptView {
    pub hex: String,
    pub address: String,
    #[serde(rename = "nameOp", skip_serializing_if = "Option::is_none")]
    pub name_op: Option<NameOpView>,
}

impl ScriptView {
    pub fn from_script(script: &Script, encodings: &EncodingConfig) -> Self {
        Self {
            hex: script.to_hex(),
            address: script.address.to_string(),
            name_op: script
                .name_op
                .as_ref()
                .map(|op| NameOpView::from_operation(op, encodings)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxInView {
    pub txid: String,
    pub vout: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxOutView {
    pub value: Amount,
    pub n: u32,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptView,
}

/// A decoded transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxView {
    pub txid: String,
    pub hex: String,
    pub vin: Vec<TxInView>,
    pub vout: Vec<TxOutView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Height>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u32>,
}

impl TxView {
    pub fn from_transaction(tx: &Transaction, encodings: &EncodingConfig) -> Self {
        Self {
            txid: tx.txid().to_hex(),
            hex: tx.to_hex(),
            vin: tx
                .inputs
                .iter()
                .map(|input| TxInView {
                    txid: input.prevout.txid.to_hex(),
                    vout: input.prevout.vout,
                })
                .collect(),
            vout: tx
                .outputs
                .iter()
                .enumerate()
                .map(|(n, out)| output_view(n as u32, out, encodings))
                .collect(),
            height: None,
            confirmations: None,
        }
    }
}

fn output_view(n: u32, out: &TxOut, encodings: &EncodingConfig) -> TxOutView {
    TxOutView {
        value: out.amount,
        n,
        script_pub_key: ScriptView::from_script(&out.script, encodings),
    }
}

/// One reported output of a wallet transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletDetailView {
    pub address: String,
    pub category: TxCategory,
    pub amount: Amount,
    pub vout: u32,
    /// Set on the name output: `update: <name>` or `new`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// `gettransaction` view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletTxView {
    pub txid: String,
    pub confirmations: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Height>,
    pub details: Vec<WalletDetailView>,
}

/// One `listtransactions` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListTxEntry {
    pub txid: String,
    #[serde(flatten)]
    pub detail: WalletDetailView,
    pub confirmations: u32,
}

impl WalletTxView {
    pub fn from_wallet_tx(wtx: &WalletTransaction, confirmations: u32) -> Self {
        let name_output = wtx.tx.name_output();
        let details = wtx
            .details
            .iter()
            .map(|detail| detail_view(detail, name_output.map(|(vout, _, op)| (vout, op))))
            .collect();
        Self {
            txid: wtx.txid.to_hex(),
            confirmations,
            height: wtx.height,
            details,
        }
    }

    pub fn into_entries(self) -> Vec<ListTxEntry> {
        let WalletTxView {
            txid,
            confirmations,
            details,
            ..
        } = self;
        details
            .into_iter()
            .map(|detail| ListTxEntry {
                txid: txid.clone(),
                detail,
                confirmations,
            })
            .collect()
    }
}

fn detail_view(detail: &WalletDetail, name_output: Option<(u32, &NameOperation)>) -> WalletDetailView {
    let name = name_output
        .filter(|(vout, _)| *vout == detail.vout)
        .map(|(_, op)| name_annotation(op));
    WalletDetailView {
        address: detail.address.to_string(),
        category: detail.category,
        amount: detail.amount,
        vout: detail.vout,
        name,
    }
}

/// Human label for a name output in wallet views.
pub fn name_annotation(op: &NameOperation) -> String {
    match op.name() {
        Some(name) => format!("update: {}", encode_name_for_message(name)),
        None => "new".to_string(),
    }
}

/// Result of `name_new`: keep `rand` for the reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameNewResult {
    pub txid: String,
    pub rand: String,
    pub commitment: String,
}

/// Result of `name_raw_transaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawTxResult {
    pub hex: String,
    /// Salt of a `name_new`; absent for updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rand: Option<String>,
}

/// `name_filter` with `stat` set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterStat {
    pub blocks: Height,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FilterResult {
    Names(Vec<NameInfo>),
    Stat(FilterStat),
}

fn render(name: &[u8], value: &[u8], encodings: &EncodingConfig) -> RenderedNameValue {
    let fields = RenderedNameValue::render(name, value, encodings);
    if !fields.is_clean() {
        tracing::debug!(
            name = %encode_name_for_message(name),
            name_encoding = %encodings.name_encoding,
            value_encoding = %encodings.value_encoding,
            "stored name data does not render in the requested encoding"
        );
    }
    fields
}

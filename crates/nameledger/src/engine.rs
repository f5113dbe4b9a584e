//! The name engine: every name RPC as an async method.
//!
//! Each call parses its options, snapshots the node configuration once and
//! resolves the effective encodings before doing anything else. Writes
//! validate names and values before any chain or wallet lookup; reads render
//! every record through the same view constructors.

use std::sync::{Arc, PoisonError, RwLock};

use nameledger_core::{
    encode_name_for_message, validate_request, Address, Amount, Commitment, EncodingConfig,
    Height, LifecycleError, NameOpKind, NameOpRequest, NameOperation, NameRecord, NameState,
    NameStatus, OutPoint, RenderedNameValue, Script, Transaction, TxIn, TxOut, Txid,
};
use nameledger_store::{NameStore, StoreExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::NodeConfig;
use crate::error::{EngineError, Result};
use crate::ledger::{Ledger, Wallet};
use crate::options::CallOptions;
use crate::views::{
    FilterResult, FilterStat, ListTxEntry, NameInfo, NameNewResult, PendingInfo, RawTxResult,
    ScriptView, TxView, WalletTxView,
};

/// Default number of records returned by `name_scan`.
pub const DEFAULT_SCAN_COUNT: usize = 500;

/// Default `max_age` of `name_filter`, in blocks.
pub const DEFAULT_FILTER_MAX_AGE: u32 = 36_000;

/// Criteria for [`NameEngine::name_filter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameFilter {
    /// Only names starting with this prefix, in the effective name encoding.
    pub prefix: Option<String>,
    /// Only names updated within this many blocks. 0 means no limit.
    pub max_age: u32,
    /// Skip this many matches.
    pub from: usize,
    /// Return at most this many matches. 0 means all.
    pub count: usize,
    /// Return counts instead of records.
    pub stat: bool,
}

impl Default for NameFilter {
    fn default() -> Self {
        Self {
            prefix: None,
            max_age: DEFAULT_FILTER_MAX_AGE,
            from: 0,
            count: 0,
            stat: false,
        }
    }
}

/// What one call works with: its options and the config snapshot taken at
/// entry.
struct CallContext {
    config: Arc<NodeConfig>,
    options: CallOptions,
    encodings: EncodingConfig,
}

impl CallContext {
    fn decode_name(&self, name: &str) -> Result<Vec<u8>> {
        Ok(self.encodings.decode_name(name)?)
    }
}

/// The name engine.
///
/// Generic over the confirmed name database and the two collaborators. The
/// engine holds no state of its own besides the node configuration.
pub struct NameEngine<S, L, W> {
    store: Arc<S>,
    ledger: Arc<L>,
    wallet: Arc<W>,
    config: RwLock<Arc<NodeConfig>>,
}

impl<S, L, W> NameEngine<S, L, W>
where
    S: NameStore,
    L: Ledger,
    W: Wallet,
{
    pub fn new(store: Arc<S>, ledger: Arc<L>, wallet: Arc<W>, config: NodeConfig) -> Self {
        info!(
            name_encoding = %config.name_encoding,
            value_encoding = %config.value_encoding,
            name_history = config.name_history,
            "name engine started"
        );
        Self {
            store,
            ledger,
            wallet,
            config: RwLock::new(Arc::new(config)),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The active configuration.
    pub fn config(&self) -> Arc<NodeConfig> {
        let guard = self.config.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replace the configuration, as a node restart would.
    ///
    /// Calls already running keep the snapshot they started with.
    pub fn restart(&self, config: NodeConfig) {
        info!(
            name_encoding = %config.name_encoding,
            value_encoding = %config.value_encoding,
            name_history = config.name_history,
            "name engine configuration replaced"
        );
        let mut guard = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(config);
    }

    fn begin(&self, options: Option<&Value>) -> Result<CallContext> {
        let options = CallOptions::from_json(options)?;
        let config = self.config();
        let encodings = config.encodings().resolve(&options.encodings);
        Ok(CallContext {
            config,
            options,
            encodings,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Commit to a name without revealing it.
    pub async fn name_new(&self, name: &str, options: Option<&Value>) -> Result<NameNewResult> {
        logged(NameOpKind::NameNew.as_str(), self.name_new_inner(name, options).await)
    }

    async fn name_new_inner(&self, name: &str, options: Option<&Value>) -> Result<NameNewResult> {
        let ctx = self.begin(options)?;
        let chain = &ctx.config.chain;
        let validated = validate_request(&NameOpRequest::name_new(name), &ctx.encodings, chain)?;

        let raw_name = validated.name.clone();
        let (op, rand) = validated.into_operation(chain);
        let rand = rand.unwrap_or_default();
        let commitment = Commitment::compute(&rand, &raw_name);

        let dest = self.destination(&ctx).await?;
        let tx = name_transaction(None, op, dest, chain.name_locked_amount);
        let txid = self.submit(tx).await?;
        info!(
            op = "name_new",
            %txid,
            commitment = %commitment.to_hex(),
            "name operation broadcast"
        );

        Ok(NameNewResult {
            txid: txid.to_hex(),
            rand: hex::encode(&rand),
            commitment: commitment.to_hex(),
        })
    }

    /// Reveal a committed name and set its first value.
    ///
    /// `txid` is the transaction holding the `name_new` output.
    pub async fn name_firstupdate(
        &self,
        name: &str,
        rand: &str,
        txid: &str,
        value: &str,
        options: Option<&Value>,
    ) -> Result<String> {
        logged(
            NameOpKind::NameFirstUpdate.as_str(),
            self.name_firstupdate_inner(name, rand, txid, value, options)
                .await,
        )
    }

    async fn name_firstupdate_inner(
        &self,
        name: &str,
        rand: &str,
        txid: &str,
        value: &str,
        options: Option<&Value>,
    ) -> Result<String> {
        let ctx = self.begin(options)?;
        let chain = &ctx.config.chain;
        let request = NameOpRequest::name_firstupdate(name, rand, value);
        let validated = validate_request(&request, &ctx.encodings, chain)?;
        let new_txid = parse_txid(txid)?;
        let raw_name = validated.name.clone();
        let rand = validated.rand.clone().unwrap_or_default();
        let shown = encode_name_for_message(&raw_name);

        let new_tx = self
            .ledger
            .get_transaction(&new_txid)
            .await?
            .ok_or(EngineError::UnknownTransaction(new_txid))?;
        let (vout, commitment, owner) = new_tx
            .tx
            .outputs
            .iter()
            .enumerate()
            .find_map(|(vout, out)| match &out.script.name_op {
                Some(NameOperation::NameNew { commitment }) => {
                    Some((vout as u32, *commitment, out.script.address.clone()))
                }
                _ => None,
            })
            .ok_or(LifecycleError::MissingCommitment)?;

        if !commitment.opens(&rand, &raw_name) {
            return Err(LifecycleError::CommitmentMismatch.into());
        }
        if self.store.get_name(&raw_name).await?.is_some() {
            return Err(LifecycleError::AlreadyRegistered.into());
        }
        if self.pending_for(&raw_name).await?.is_some() {
            return Err(EngineError::AlreadyPending);
        }
        if !self.wallet.is_mine(&owner).await? {
            return Err(EngineError::NameNotOwned(shown));
        }

        let (op, _) = validated.into_operation(chain);
        let dest = self.destination(&ctx).await?;
        let input = OutPoint::new(new_txid, vout);
        let tx = name_transaction(Some(input), op, dest, chain.name_locked_amount);
        let txid = self.submit(tx).await?;
        info!(op = "name_firstupdate", name = %shown, %txid, "name operation broadcast");
        Ok(txid.to_hex())
    }

    /// Set a new value for a registered name.
    ///
    /// Spends the latest output of the name: a pending one if there is one,
    /// else the confirmed one.
    pub async fn name_update(
        &self,
        name: &str,
        value: &str,
        options: Option<&Value>,
    ) -> Result<String> {
        logged(
            NameOpKind::NameUpdate.as_str(),
            self.name_update_inner(name, value, options).await,
        )
    }

    async fn name_update_inner(
        &self,
        name: &str,
        value: &str,
        options: Option<&Value>,
    ) -> Result<String> {
        let ctx = self.begin(options)?;
        let chain = &ctx.config.chain;
        let validated =
            validate_request(&NameOpRequest::name_update(name, value), &ctx.encodings, chain)?;
        let raw_name = validated.name.clone();
        let shown = encode_name_for_message(&raw_name);

        let (outpoint, owner) = self
            .latest_output(&raw_name)
            .await?
            .ok_or_else(|| EngineError::NameNotFound(shown.clone()))?;
        if !self.wallet.is_mine(&owner).await? {
            return Err(EngineError::NameNotOwned(shown));
        }

        let (op, _) = validated.into_operation(chain);
        let dest = self.destination(&ctx).await?;
        let tx = name_transaction(Some(outpoint), op, dest, chain.name_locked_amount);
        let txid = self.submit(tx).await?;
        info!(op = "name_update", name = %shown, %txid, "name operation broadcast");
        Ok(txid.to_hex())
    }

    /// Put a name operation into output `vout` of an unsigned transaction.
    ///
    /// `name_op` is `{op, name, value?, rand?}` with `name` and `value` in the
    /// effective encodings. The result still has to be funded, signed and
    /// broadcast by the caller.
    pub async fn name_raw_transaction(
        &self,
        tx_hex: &str,
        vout: u32,
        name_op: &Value,
        options: Option<&Value>,
    ) -> Result<RawTxResult> {
        logged(
            "namerawtransaction",
            self.name_raw_transaction_inner(tx_hex, vout, name_op, options)
                .await,
        )
    }

    async fn name_raw_transaction_inner(
        &self,
        tx_hex: &str,
        vout: u32,
        name_op: &Value,
        options: Option<&Value>,
    ) -> Result<RawTxResult> {
        let ctx = self.begin(options)?;
        let chain = &ctx.config.chain;

        let object = match name_op {
            Value::Object(object) => object,
            other => return Err(EngineError::type_mismatch("nameOp", other)),
        };
        let op_text = op_field(object, "op")?;
        let name = op_field(object, "name")?;
        let value = op_field(object, "value")?;
        let rand = op_field(object, "rand")?;

        let kind: NameOpKind = op_text
            .ok_or_else(|| EngineError::InvalidParameter("missing op".into()))?
            .parse()
            .map_err(EngineError::InvalidParameter)?;
        let name = name.ok_or_else(|| EngineError::InvalidParameter("missing name".into()))?;
        let request = NameOpRequest {
            kind,
            name,
            value,
            rand: if kind == NameOpKind::NameUpdate { None } else { rand },
        };
        let validated = validate_request(&request, &ctx.encodings, chain)?;

        let mut tx = Transaction::from_hex(tx_hex)?;
        let (op, rand) = validated.into_operation(chain);
        let output = tx
            .outputs
            .get_mut(vout as usize)
            .ok_or_else(|| EngineError::InvalidParameter("vout is out of range".into()))?;
        output.amount = chain.name_locked_amount;
        output.script.name_op = Some(op);
        tx.check_structure()?;

        debug!(op = kind.as_str(), vout, "name operation placed in raw transaction");
        Ok(RawTxResult {
            hex: tx.to_hex(),
            rand: match kind {
                NameOpKind::NameNew => rand.map(hex::encode),
                _ => None,
            },
        })
    }

    /// Pay `amount` to the address currently holding `name`.
    pub async fn sendtoname(
        &self,
        name: &str,
        amount: Amount,
        options: Option<&Value>,
    ) -> Result<String> {
        logged("sendtoname", self.sendtoname_inner(name, amount, options).await)
    }

    async fn sendtoname_inner(
        &self,
        name: &str,
        amount: Amount,
        options: Option<&Value>,
    ) -> Result<String> {
        let ctx = self.begin(options)?;
        let raw_name = ctx.decode_name(name)?;
        let record = self
            .store
            .get_name(&raw_name)
            .await?
            .ok_or_else(|| EngineError::NameNotFound(encode_name_for_message(&raw_name)))?;

        let txid = self.wallet.send_to_address(&record.address, amount).await?;
        info!(
            name = %encode_name_for_message(&raw_name),
            address = %record.address,
            amount,
            %txid,
            "sent to name"
        );
        Ok(txid.to_hex())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Name views
    // ─────────────────────────────────────────────────────────────────────────

    /// Update-type operations in the mempool, optionally for one name only.
    pub async fn name_pending(
        &self,
        name: Option<&str>,
        options: Option<&Value>,
    ) -> Result<Vec<PendingInfo>> {
        let ctx = self.begin(options)?;
        let filter = name.map(|n| ctx.decode_name(n)).transpose()?;

        let mut pending = Vec::new();
        for entry in self.ledger.pending_name_ops().await? {
            let (Some(raw_name), Some(raw_value)) = (entry.op.name(), entry.op.value()) else {
                continue;
            };
            if filter.as_deref().is_some_and(|f| f != raw_name.as_ref()) {
                continue;
            }
            pending.push(PendingInfo {
                op: entry.op.kind().as_str(),
                fields: RenderedNameValue::render(raw_name, raw_value, &ctx.encodings),
                txid: entry.txid.to_hex(),
                vout: entry.vout,
                status: NameStatus::Pending,
                ismine: self.wallet.is_mine(&entry.address).await?,
            });
        }
        Ok(pending)
    }

    /// The confirmed record of a name.
    pub async fn name_show(&self, name: &str, options: Option<&Value>) -> Result<NameInfo> {
        let ctx = self.begin(options)?;
        let raw_name = ctx.decode_name(name)?;
        let record = self
            .store
            .get_name(&raw_name)
            .await?
            .ok_or_else(|| EngineError::NameNotFound(encode_name_for_message(&raw_name)))?;
        self.info(&record, &ctx.encodings).await
    }

    /// Every record a name has had, oldest first. Needs `-namehistory`.
    pub async fn name_history(&self, name: &str, options: Option<&Value>) -> Result<Vec<NameInfo>> {
        let ctx = self.begin(options)?;
        if !ctx.config.name_history {
            return Err(EngineError::HistoryDisabled);
        }
        let raw_name = ctx.decode_name(name)?;
        let history = self.store.get_history(&raw_name).await?;
        if history.is_empty() {
            return Err(EngineError::NameNotFound(encode_name_for_message(&raw_name)));
        }
        self.infos(&history, &ctx.encodings).await
    }

    /// Up to `count` names from `start` on, in raw byte order.
    pub async fn name_scan(
        &self,
        start: Option<&str>,
        count: Option<usize>,
        options: Option<&Value>,
    ) -> Result<Vec<NameInfo>> {
        let ctx = self.begin(options)?;
        let start = match start {
            Some(start) => ctx.decode_name(start)?,
            None => Vec::new(),
        };
        let count = count.unwrap_or(DEFAULT_SCAN_COUNT);
        let records = self.store.scan(&start, count).await?;
        self.infos(&records, &ctx.encodings).await
    }

    /// Names held by the wallet, optionally only `name`.
    pub async fn name_list(&self, name: Option<&str>, options: Option<&Value>) -> Result<Vec<NameInfo>> {
        let ctx = self.begin(options)?;
        let records = match name {
            Some(name) => {
                let raw_name = ctx.decode_name(name)?;
                self.store.get_name(&raw_name).await?.into_iter().collect()
            }
            None => self.store.all_names().await?,
        };

        let mut mine = Vec::new();
        for record in &records {
            if self.wallet.is_mine(&record.address).await? {
                mine.push(NameInfo::from_record(record, &ctx.encodings, true));
            }
        }
        Ok(mine)
    }

    /// Names matching `filter`, in raw byte order.
    pub async fn name_filter(
        &self,
        filter: &NameFilter,
        options: Option<&Value>,
    ) -> Result<FilterResult> {
        let ctx = self.begin(options)?;
        let prefix = filter
            .prefix
            .as_deref()
            .map(|p| ctx.decode_name(p))
            .transpose()?
            .unwrap_or_default();
        let best = self.ledger.best_height().await?;

        let take = if filter.count == 0 {
            usize::MAX
        } else {
            filter.count
        };
        let matches: Vec<NameRecord> = self
            .store
            .all_names()
            .await?
            .into_iter()
            .filter(|record| record.name.starts_with(&prefix))
            .filter(|record| {
                filter.max_age == 0 || best.saturating_sub(record.height) < filter.max_age
            })
            .skip(filter.from)
            .take(take)
            .collect();

        if filter.stat {
            return Ok(FilterResult::Stat(FilterStat {
                blocks: best,
                count: matches.len(),
            }));
        }
        Ok(FilterResult::Names(self.infos(&matches, &ctx.encodings).await?))
    }

    /// Whether nobody holds `name`.
    pub async fn name_available(&self, name: &str, options: Option<&Value>) -> Result<bool> {
        match self.name_show(name, options).await {
            Ok(_) => Ok(false),
            Err(EngineError::NameNotFound(_)) => Ok(true),
            Err(err) => Err(err),
        }
    }

    /// Where a name stands: registered on chain, revealed in the mempool,
    /// or unknown. A bare commitment conceals the name and is not visible.
    pub async fn name_state(&self, name: &str, options: Option<&Value>) -> Result<NameState> {
        let ctx = self.begin(options)?;
        let raw_name = ctx.decode_name(name)?;
        let mut state = self.store.confirmed_state(&raw_name).await?;
        for entry in self.ledger.pending_name_ops().await? {
            if !entry.op.name().is_some_and(|n| n.as_ref() == &raw_name[..]) {
                continue;
            }
            let kind = entry.op.kind();
            // The commitment spent by a pending reveal never names the name.
            if kind == NameOpKind::NameFirstUpdate && state == NameState::Uncommitted {
                state = NameState::Committed;
            }
            state = state.apply(kind)?;
        }
        Ok(state)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transactions and scripts
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn decode_script(&self, hex: &str, options: Option<&Value>) -> Result<ScriptView> {
        let ctx = self.begin(options)?;
        let script = Script::from_hex(hex)?;
        Ok(ScriptView::from_script(&script, &ctx.encodings))
    }

    pub async fn decode_raw_transaction(
        &self,
        hex: &str,
        options: Option<&Value>,
    ) -> Result<TxView> {
        let ctx = self.begin(options)?;
        let tx = Transaction::from_hex(hex)?;
        Ok(TxView::from_transaction(&tx, &ctx.encodings))
    }

    /// A mined or pending transaction, decoded.
    pub async fn get_raw_transaction(&self, txid: &str, options: Option<&Value>) -> Result<TxView> {
        let ctx = self.begin(options)?;
        let txid = parse_txid(txid)?;
        let found = self
            .ledger
            .get_transaction(&txid)
            .await?
            .ok_or(EngineError::UnknownTransaction(txid))?;

        let mut view = TxView::from_transaction(&found.tx, &ctx.encodings);
        if let Some(height) = found.height {
            let best = self.ledger.best_height().await?;
            view.height = Some(height);
            view.confirmations = Some(confirmations(height, best));
        }
        Ok(view)
    }

    /// A wallet transaction with its name output annotated.
    pub async fn get_transaction(&self, txid: &str) -> Result<WalletTxView> {
        let txid = parse_txid(txid)?;
        let wtx = self
            .wallet
            .get_transaction(&txid)
            .await?
            .ok_or(EngineError::UnknownTransaction(txid))?;
        let best = self.ledger.best_height().await?;
        let confirmations = wtx.height.map_or(0, |h| confirmations(h, best));
        Ok(WalletTxView::from_wallet_tx(&wtx, confirmations))
    }

    /// All wallet transaction entries, oldest first.
    pub async fn list_transactions(&self) -> Result<Vec<ListTxEntry>> {
        let best = self.ledger.best_height().await?;
        let mut entries = Vec::new();
        for wtx in self.wallet.transactions().await? {
            let confirmations = wtx.height.map_or(0, |h| confirmations(h, best));
            entries.extend(WalletTxView::from_wallet_tx(&wtx, confirmations).into_entries());
        }
        Ok(entries)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    async fn info(&self, record: &NameRecord, encodings: &EncodingConfig) -> Result<NameInfo> {
        let ismine = self.wallet.is_mine(&record.address).await?;
        Ok(NameInfo::from_record(record, encodings, ismine))
    }

    async fn infos(&self, records: &[NameRecord], encodings: &EncodingConfig) -> Result<Vec<NameInfo>> {
        let mut infos = Vec::with_capacity(records.len());
        for record in records {
            infos.push(self.info(record, encodings).await?);
        }
        Ok(infos)
    }

    async fn destination(&self, ctx: &CallContext) -> Result<Address> {
        match &ctx.options.dest_address {
            Some(address) => Ok(address.clone()),
            None => Ok(self.wallet.new_address().await?),
        }
    }

    /// The newest pending update-type output for `name`.
    async fn pending_for(&self, name: &[u8]) -> Result<Option<(OutPoint, Address)>> {
        Ok(self
            .ledger
            .pending_name_ops()
            .await?
            .into_iter()
            .rev()
            .find(|entry| entry.op.name().is_some_and(|n| n.as_ref() == name))
            .map(|entry| (OutPoint::new(entry.txid, entry.vout), entry.address)))
    }

    async fn latest_output(&self, name: &[u8]) -> Result<Option<(OutPoint, Address)>> {
        if let Some(pending) = self.pending_for(name).await? {
            return Ok(Some(pending));
        }
        Ok(self
            .store
            .get_name(name)
            .await?
            .map(|record| (record.outpoint(), record.address)))
    }

    async fn submit(&self, tx: Transaction) -> Result<Txid> {
        let funded = self.wallet.fund(tx).await?;
        let signed = self.wallet.sign(funded).await?;
        Ok(self.ledger.broadcast(signed).await?)
    }
}

fn name_transaction(
    input: Option<OutPoint>,
    op: NameOperation,
    dest: Address,
    locked: Amount,
) -> Transaction {
    Transaction::new(
        input.into_iter().map(TxIn::new).collect(),
        vec![TxOut {
            amount: locked,
            script: Script::with_name_op(dest, op),
        }],
    )
}

fn parse_txid(txid: &str) -> Result<Txid> {
    Txid::from_hex(txid)
        .map_err(|_| EngineError::InvalidParameter("txid must be a 32-byte hex string".into()))
}

fn op_field<'a>(object: &'a serde_json::Map<String, Value>, key: &str) -> Result<Option<&'a str>> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(EngineError::type_mismatch(key, other)),
    }
}

fn confirmations(included: Height, best: Height) -> u32 {
    nameledger_core::lifecycle::confirmations(included, best)
}

fn logged<T>(op: &'static str, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        warn!(op, code = err.code(), error = %err, "name write rejected");
    }
    result
}

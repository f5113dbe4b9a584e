//! An in-process chain and wallet implementing the engine's collaborators.
//!
//! [`SimLedger`] keeps blocks as a height counter plus a transaction table,
//! a mempool in acceptance order and the unspent output set. Mining a block
//! takes every mempool transaction whose name rules hold at the new height
//! and applies its name output to the shared store. A
//! `name_firstupdate` whose `name_new` is not yet deep enough simply waits.
//!
//! [`SimWallet`] holds Ed25519 keys, funds transactions from the unspent set
//! and signs inputs.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use nameledger::{
    Ledger, LedgerError, LedgerTx, PendingNameOp, TxCategory, Wallet, WalletDetail, WalletError,
    WalletTransaction,
};
use nameledger_core::lifecycle::{check_firstupdate, check_update};
use nameledger_core::{
    check_operation, Address, Amount, ChainParams, Height, Keypair, NameOpKind, NameOperation,
    NameState, OutPoint, Script, Transaction, TxIn, TxOut, Txid,
};
use nameledger_store::{MemoryStore, NameStore, StoreExt};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Paid to the miner of every block.
pub const COINBASE_REWARD: Amount = 50 * 100_000_000;

struct TxEntry {
    tx: Transaction,
    height: Option<Height>,
}

#[derive(Default)]
struct ChainState {
    height: Height,
    txs: HashMap<Txid, TxEntry>,
    /// Every known txid in acceptance order.
    order: Vec<Txid>,
    mempool: Vec<Txid>,
    utxos: HashMap<OutPoint, TxOut>,
}

impl ChainState {
    fn output(&self, outpoint: &OutPoint) -> Option<&TxOut> {
        self.txs
            .get(&outpoint.txid)
            .and_then(|entry| entry.tx.outputs.get(outpoint.vout as usize))
    }

    fn height_of(&self, txid: &Txid) -> Option<Height> {
        self.txs.get(txid).and_then(|entry| entry.height)
    }

    fn add(&mut self, tx: Transaction, height: Option<Height>) -> Txid {
        let txid = tx.txid();
        for input in &tx.inputs {
            self.utxos.remove(&input.prevout);
        }
        for (vout, out) in tx.outputs.iter().enumerate() {
            self.utxos.insert(OutPoint::new(txid, vout as u32), out.clone());
        }
        self.txs.insert(txid, TxEntry { tx, height });
        self.order.push(txid);
        txid
    }
}

/// Mempool admission: signatures, value, and the name rules that do not
/// depend on the height the transaction will be mined at.
fn accept(state: &ChainState, tx: &Transaction, params: &ChainParams) -> Result<(), String> {
    if tx.inputs.is_empty() {
        return Err("transaction has no inputs".into());
    }
    tx.check_structure().map_err(|e| e.to_string())?;

    let mut total_in: Amount = 0;
    let mut spent_names = Vec::new();
    for (index, input) in tx.inputs.iter().enumerate() {
        let out = state
            .utxos
            .get(&input.prevout)
            .ok_or_else(|| format!("input {} is missing or spent", index))?;
        let key = tx
            .verify_input(index)
            .map_err(|e| format!("input {}: {}", index, e))?;
        if Address::from_public_key(&key) != out.script.address {
            return Err(format!("input {} is signed by the wrong key", index));
        }
        total_in = total_in.saturating_add(out.amount);
        if let Some(op) = &out.script.name_op {
            spent_names.push(op);
        }
    }
    if total_in < tx.total_output() {
        return Err("outputs exceed inputs".into());
    }

    let name_op = tx.name_output().map(|(_, _, op)| op);
    if let Some(op) = name_op {
        check_operation(op, params).map_err(|e| e.to_string())?;
    }
    match (name_op, spent_names.as_slice()) {
        (None | Some(NameOperation::NameNew { .. }), []) => Ok(()),
        (None | Some(NameOperation::NameNew { .. }), _) => {
            Err("name output spent without a name operation".into())
        }
        (
            Some(NameOperation::NameFirstUpdate { name, rand, .. }),
            [NameOperation::NameNew { commitment }],
        ) if commitment.opens(rand, name) => Ok(()),
        (Some(NameOperation::NameFirstUpdate { .. }), _) => {
            Err("name_firstupdate must spend a matching name_new".into())
        }
        (Some(NameOperation::NameUpdate { name, .. }), [spent])
            if spent.is_any_update() && spent.name() == Some(name) =>
        {
            Ok(())
        }
        (Some(NameOperation::NameUpdate { .. }), _) => {
            Err("name_update must spend the output of the same name".into())
        }
    }
}

/// Simulated chain and mempool.
pub struct SimLedger<S = MemoryStore> {
    state: Mutex<ChainState>,
    store: Arc<S>,
    params: ChainParams,
}

impl<S: NameStore> SimLedger<S> {
    pub fn new(store: Arc<S>, params: ChainParams) -> Self {
        Self {
            state: Mutex::new(ChainState::default()),
            store,
            params,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    pub async fn height(&self) -> Height {
        self.state.lock().await.height
    }

    pub async fn mempool_size(&self) -> usize {
        self.state.lock().await.mempool.len()
    }

    /// An unspent output (confirmed or created in the mempool).
    pub async fn utxo(&self, outpoint: &OutPoint) -> Option<TxOut> {
        self.state.lock().await.utxos.get(outpoint).cloned()
    }

    /// Any output ever created, spent or not.
    pub async fn output(&self, outpoint: &OutPoint) -> Option<TxOut> {
        self.state.lock().await.output(outpoint).cloned()
    }

    /// Unspent outputs, confirmed ones first, then by outpoint.
    pub async fn unspent(&self) -> Vec<(OutPoint, TxOut)> {
        let state = self.state.lock().await;
        let mut unspent: Vec<(bool, OutPoint, TxOut)> = state
            .utxos
            .iter()
            .map(|(outpoint, out)| {
                let pending = state.height_of(&outpoint.txid).is_none();
                (pending, *outpoint, out.clone())
            })
            .collect();
        unspent.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        unspent
            .into_iter()
            .map(|(_, outpoint, out)| (outpoint, out))
            .collect()
    }

    /// Every known transaction in acceptance order.
    pub async fn transactions(&self) -> Vec<LedgerTx> {
        let state = self.state.lock().await;
        state
            .order
            .iter()
            .filter_map(|txid| state.txs.get(txid))
            .map(|entry| LedgerTx {
                tx: entry.tx.clone(),
                height: entry.height,
            })
            .collect()
    }

    /// Mine one block paying the reward to `coinbase_to`.
    pub async fn mine_block(&self, coinbase_to: Address) -> Result<Height, LedgerError> {
        let mut state = self.state.lock().await;
        let height = state.height + 1;

        let coinbase = Transaction::new(
            Vec::new(),
            vec![TxOut {
                amount: COINBASE_REWARD,
                script: Script::pay_to(coinbase_to),
            }],
        );
        state.add(coinbase, Some(height));

        let mut kept = Vec::new();
        let queue = std::mem::take(&mut state.mempool);
        for txid in queue {
            let Some(tx) = state.txs.get(&txid).map(|entry| entry.tx.clone()) else {
                continue;
            };
            let reached = match self.mineable(&state, &tx, height).await {
                Ok(reached) => reached,
                Err(reason) => {
                    debug!(%txid, height, %reason, "transaction stays in the mempool");
                    kept.push(txid);
                    continue;
                }
            };

            if let Some(entry) = state.txs.get_mut(&txid) {
                entry.height = Some(height);
            }
            if let Some((vout, out, op)) = tx.name_output() {
                self.store
                    .apply_name_output(txid, vout, op, &out.script.address, height)
                    .await
                    .map_err(|e| LedgerError::Unavailable(e.to_string()))?;
            }
            if let Some(reached) = reached {
                debug!(%txid, height, state = ?reached.confirm(), "name operation mined");
            }
        }

        state.mempool = kept;
        state.height = height;
        let names = self
            .store
            .names_at_height(height)
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?
            .len();
        info!(height, names, mempool = state.mempool.len(), "block mined");
        Ok(height)
    }

    /// Whether `tx` may go into the block at `height`. For a name operation,
    /// yields the state its name moves into.
    async fn mineable(
        &self,
        state: &ChainState,
        tx: &Transaction,
        height: Height,
    ) -> Result<Option<NameState>, String> {
        if tx
            .inputs
            .iter()
            .any(|input| state.height_of(&input.prevout.txid).is_none())
        {
            return Err("spends an unconfirmed output".into());
        }

        let Some((_, _, op)) = tx.name_output() else {
            return Ok(None);
        };
        let reached = match op {
            NameOperation::NameNew { .. } => NameState::Uncommitted.apply(NameOpKind::NameNew),
            NameOperation::NameFirstUpdate { name, rand, .. } => {
                let (commitment, committed_at) = tx
                    .inputs
                    .iter()
                    .find_map(|input| {
                        match state.output(&input.prevout).and_then(|o| o.script.name_op.as_ref()) {
                            Some(NameOperation::NameNew { commitment }) => {
                                Some((*commitment, state.height_of(&input.prevout.txid)))
                            }
                            _ => None,
                        }
                    })
                    .ok_or("no name_new input")?;
                let current = self.store.get_name(name).await.map_err(|e| e.to_string())?;
                check_firstupdate(
                    &commitment,
                    committed_at,
                    name,
                    rand,
                    current.as_ref(),
                    height,
                    &self.params,
                )
                .map_err(|e| e.to_string())?;
                NameState::Committed.apply(NameOpKind::NameFirstUpdate)
            }
            NameOperation::NameUpdate { name, .. } => {
                let (spent, spent_name) = tx
                    .inputs
                    .iter()
                    .find_map(|input| {
                        state
                            .output(&input.prevout)
                            .and_then(|o| o.script.name_op.as_ref())
                            .and_then(|op| op.name())
                            .map(|n| (input.prevout, n.clone()))
                    })
                    .ok_or("no name input")?;
                let current = self.store.get_name(name).await.map_err(|e| e.to_string())?;
                check_update(name, &spent, Some(&spent_name[..]), current.as_ref())
                    .map_err(|e| e.to_string())?;
                let confirmed = self
                    .store
                    .confirmed_state(name)
                    .await
                    .map_err(|e| e.to_string())?;
                confirmed.apply(NameOpKind::NameUpdate)
            }
        };
        reached.map(Some).map_err(|e| e.to_string())
    }
}

#[async_trait]
impl<S: NameStore> Ledger for SimLedger<S> {
    async fn best_height(&self) -> Result<Height, LedgerError> {
        Ok(self.height().await)
    }

    async fn pending_name_ops(&self) -> Result<Vec<PendingNameOp>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state
            .mempool
            .iter()
            .filter_map(|txid| {
                let entry = state.txs.get(txid)?;
                let (vout, out, op) = entry.tx.name_output()?;
                Some(PendingNameOp {
                    txid: *txid,
                    vout,
                    op: op.clone(),
                    address: out.script.address.clone(),
                })
            })
            .collect())
    }

    async fn get_transaction(&self, txid: &Txid) -> Result<Option<LedgerTx>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state.txs.get(txid).map(|entry| LedgerTx {
            tx: entry.tx.clone(),
            height: entry.height,
        }))
    }

    async fn broadcast(&self, tx: Transaction) -> Result<Txid, LedgerError> {
        let mut state = self.state.lock().await;
        let txid = tx.txid();
        if state.txs.contains_key(&txid) {
            return Err(LedgerError::Rejected("transaction already known".into()));
        }
        if let Err(reason) = accept(&state, &tx, &self.params) {
            debug!(%txid, %reason, "transaction rejected");
            return Err(LedgerError::Rejected(reason));
        }
        state.add(tx, None);
        state.mempool.push(txid);
        debug!(%txid, "transaction accepted to the mempool");
        Ok(txid)
    }
}

#[derive(Default)]
struct WalletKeys {
    keys: HashMap<Address, Keypair>,
    change: HashSet<Address>,
}

/// Simulated key wallet.
pub struct SimWallet<S = MemoryStore> {
    ledger: Arc<SimLedger<S>>,
    keys: Mutex<WalletKeys>,
}

impl<S: NameStore> SimWallet<S> {
    pub fn new(ledger: Arc<SimLedger<S>>) -> Self {
        Self {
            ledger,
            keys: Mutex::new(WalletKeys::default()),
        }
    }

    async fn generate_key(&self, change: bool) -> Address {
        let keypair = Keypair::generate();
        let address = Address::from_public_key(&keypair.public_key());
        let mut keys = self.keys.lock().await;
        keys.keys.insert(address.clone(), keypair);
        if change {
            keys.change.insert(address.clone());
        }
        address
    }

    /// Spendable coins, name outputs excluded.
    pub async fn balance(&self) -> Amount {
        let keys = self.keys.lock().await;
        self.ledger
            .unspent()
            .await
            .into_iter()
            .filter(|(_, out)| out.script.name_op.is_none())
            .filter(|(_, out)| keys.keys.contains_key(&out.script.address))
            .map(|(_, out)| out.amount)
            .sum()
    }

    async fn describe(&self, entry: LedgerTx) -> Option<WalletTransaction> {
        let keys = self.keys.lock().await;

        let mut spends_mine = false;
        for input in &entry.tx.inputs {
            if let Some(out) = self.ledger.output(&input.prevout).await {
                spends_mine |= keys.keys.contains_key(&out.script.address);
            }
        }

        let mut relevant = spends_mine;
        let mut details = Vec::new();
        for (vout, out) in entry.tx.outputs.iter().enumerate() {
            let address = &out.script.address;
            let mine = keys.keys.contains_key(address);
            relevant |= mine;
            let category = match (out.script.name_op.is_some(), mine) {
                (true, true) => Some(TxCategory::Receive),
                (true, false) => Some(TxCategory::Send),
                (false, true) if keys.change.contains(address) => None,
                (false, true) => Some(TxCategory::Receive),
                (false, false) if spends_mine => Some(TxCategory::Send),
                (false, false) => None,
            };
            if let Some(category) = category {
                details.push(WalletDetail {
                    vout: vout as u32,
                    address: address.clone(),
                    amount: out.amount,
                    category,
                });
            }
        }

        relevant.then(|| WalletTransaction {
            txid: entry.tx.txid(),
            tx: entry.tx,
            height: entry.height,
            details,
        })
    }
}

#[async_trait]
impl<S: NameStore> Wallet for SimWallet<S> {
    async fn new_address(&self) -> Result<Address, WalletError> {
        Ok(self.generate_key(false).await)
    }

    async fn is_mine(&self, address: &Address) -> Result<bool, WalletError> {
        Ok(self.keys.lock().await.keys.contains_key(address))
    }

    async fn fund(&self, mut tx: Transaction) -> Result<Transaction, WalletError> {
        let mut have: Amount = 0;
        for input in &tx.inputs {
            let out = self.ledger.utxo(&input.prevout).await.ok_or_else(|| {
                WalletError::Other(format!("output {}:{} is not spendable", input.prevout.txid, input.prevout.vout))
            })?;
            have = have.saturating_add(out.amount);
        }

        let needed = tx.total_output();
        if have < needed {
            let keys = self.keys.lock().await;
            let used: HashSet<OutPoint> = tx.inputs.iter().map(|input| input.prevout).collect();
            for (outpoint, out) in self.ledger.unspent().await {
                if have >= needed {
                    break;
                }
                if out.script.name_op.is_some()
                    || used.contains(&outpoint)
                    || !keys.keys.contains_key(&out.script.address)
                {
                    continue;
                }
                tx.inputs.push(TxIn::new(outpoint));
                have = have.saturating_add(out.amount);
            }
        }
        if have < needed {
            return Err(WalletError::InsufficientFunds {
                needed,
                available: have,
            });
        }

        if have > needed {
            let change = self.generate_key(true).await;
            tx.outputs.push(TxOut {
                amount: have - needed,
                script: Script::pay_to(change),
            });
        }
        Ok(tx)
    }

    async fn sign(&self, mut tx: Transaction) -> Result<Transaction, WalletError> {
        let keys = self.keys.lock().await;
        for index in 0..tx.inputs.len() {
            let prevout = tx.inputs[index].prevout;
            let out = self
                .ledger
                .output(&prevout)
                .await
                .ok_or(WalletError::MissingKey(index))?;
            let keypair = keys
                .keys
                .get(&out.script.address)
                .ok_or(WalletError::MissingKey(index))?;
            tx.sign_input(index, keypair)
                .map_err(|e| WalletError::Other(e.to_string()))?;
        }
        Ok(tx)
    }

    async fn send_to_address(&self, address: &Address, amount: Amount) -> Result<Txid, WalletError> {
        let tx = Transaction::new(
            Vec::new(),
            vec![TxOut {
                amount,
                script: Script::pay_to(address.clone()),
            }],
        );
        let tx = self.sign(self.fund(tx).await?).await?;
        self.ledger
            .broadcast(tx)
            .await
            .map_err(|e| WalletError::Other(e.to_string()))
    }

    async fn transactions(&self) -> Result<Vec<WalletTransaction>, WalletError> {
        let mut found = Vec::new();
        for entry in self.ledger.transactions().await {
            if let Some(wtx) = self.describe(entry).await {
                found.push(wtx);
            }
        }
        Ok(found)
    }

    async fn get_transaction(&self, txid: &Txid) -> Result<Option<WalletTransaction>, WalletError> {
        let entry = Ledger::get_transaction(self.ledger.as_ref(), txid)
            .await
            .map_err(|e| WalletError::Other(e.to_string()))?;
        match entry {
            Some(entry) => Ok(self.describe(entry).await),
            None => Ok(None),
        }
    }
}

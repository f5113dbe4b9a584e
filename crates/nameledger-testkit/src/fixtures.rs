//! Test fixtures and helpers.
//!
//! [`SimNode`] bundles a simulated chain, a wallet and a [`NameEngine`] so
//! scenario tests read like a session against a running node.

use std::sync::Arc;

use anyhow::{anyhow, ensure, Context};
use nameledger::{Ledger, NameEngine, NodeConfig, Wallet};
use nameledger_core::{Address, Amount, Height, OutPoint, Script, Transaction, TxIn, TxOut, Txid};
use nameledger_store::MemoryStore;
use serde_json::Value;

use crate::sim::{SimLedger, SimWallet};

/// The engine type every fixture runs.
pub type SimEngine = NameEngine<MemoryStore, SimLedger, SimWallet>;

/// Blocks mined to a fresh node's wallet so it can pay for operations.
pub const PREMINE_BLOCKS: u32 = 3;

/// A node: engine, wallet, and a view of the shared chain.
pub struct SimNode {
    pub ledger: Arc<SimLedger>,
    pub wallet: Arc<SimWallet>,
    pub store: Arc<MemoryStore>,
    pub engine: SimEngine,
}

/// What [`SimNode::register`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub new_txid: String,
    pub rand: String,
    pub firstupdate_txid: String,
}

impl SimNode {
    /// Start a node on a fresh chain.
    pub async fn start(config: NodeConfig) -> anyhow::Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(SimLedger::new(store.clone(), config.chain.clone()));
        Self::on_chain(ledger, config).await
    }

    /// Start a node with default configuration and `-namehistory`.
    pub async fn with_history() -> anyhow::Result<Self> {
        Self::start(NodeConfig {
            name_history: true,
            ..NodeConfig::default()
        })
        .await
    }

    /// Start another node on the same chain with its own wallet.
    pub async fn join(&self, config: NodeConfig) -> anyhow::Result<Self> {
        Self::on_chain(self.ledger.clone(), config).await
    }

    async fn on_chain(ledger: Arc<SimLedger>, config: NodeConfig) -> anyhow::Result<Self> {
        let store = ledger.store().clone();
        let wallet = Arc::new(SimWallet::new(ledger.clone()));
        let engine = NameEngine::new(store.clone(), ledger.clone(), wallet.clone(), config);
        let node = Self {
            ledger,
            wallet,
            store,
            engine,
        };
        node.generate(PREMINE_BLOCKS).await?;
        Ok(node)
    }

    /// Mine `blocks` blocks paying this node's wallet. Returns the new height.
    pub async fn generate(&self, blocks: u32) -> anyhow::Result<Height> {
        let mut height = self.ledger.height().await;
        for _ in 0..blocks {
            let address = self.wallet.new_address().await?;
            height = self.ledger.mine_block(address).await?;
        }
        Ok(height)
    }

    /// Blocks after which a `name_firstupdate` sent one block after its
    /// `name_new` is mined.
    pub fn firstupdate_wait(&self) -> u32 {
        self.engine.config().chain.min_firstupdate_depth.saturating_sub(1)
    }

    /// Register `name` with `value`: `name_new`, one block, `name_firstupdate`,
    /// then enough blocks for the reveal to be mined.
    pub async fn register(
        &self,
        name: &str,
        value: &str,
        options: Option<&Value>,
    ) -> anyhow::Result<Registration> {
        let new = self.engine.name_new(name, options).await?;
        self.generate(1).await?;
        let firstupdate_txid = self
            .engine
            .name_firstupdate(name, &new.rand, &new.txid, value, options)
            .await?;
        self.generate(self.firstupdate_wait()).await?;

        ensure!(
            self.ledger.mempool_size().await == 0,
            "name_firstupdate for {:?} still pending",
            name
        );
        Ok(Registration {
            new_txid: new.txid,
            rand: new.rand,
            firstupdate_txid,
        })
    }

    /// Fund, sign and broadcast a raw transaction hex, as a wallet RPC would.
    pub async fn send_raw(&self, tx_hex: &str) -> anyhow::Result<Txid> {
        let tx = Transaction::from_hex(tx_hex).context("decoding raw transaction")?;
        let tx = self.wallet.fund(tx).await?;
        let tx = self.wallet.sign(tx).await?;
        Ok(self.ledger.broadcast(tx).await?)
    }

    /// The outpoint a name view points at.
    pub fn outpoint(txid: &str, vout: u32) -> anyhow::Result<OutPoint> {
        let txid = Txid::from_hex(txid).map_err(|e| anyhow!("bad txid {}: {}", txid, e))?;
        Ok(OutPoint::new(txid, vout))
    }
}

/// An unsigned transaction spending `inputs` and paying `outputs`.
pub fn create_raw_transaction(inputs: &[OutPoint], outputs: &[(Address, Amount)]) -> String {
    Transaction::new(
        inputs.iter().copied().map(TxIn::new).collect(),
        outputs
            .iter()
            .map(|(address, amount)| TxOut {
                amount: *amount,
                script: Script::pay_to(address.clone()),
            })
            .collect(),
    )
    .to_hex()
}

/// Install a test-friendly tracing subscriber. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

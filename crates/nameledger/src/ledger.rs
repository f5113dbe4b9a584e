//! Collaborator contracts: the chain and the wallet the engine talks to.
//!
//! The engine never mines, relays or holds keys. It reads chain state and
//! the mempool through [`Ledger`], and funds, signs and pays through
//! [`Wallet`]. Both are async traits so a node can back them with whatever
//! it runs; the testkit provides an in-process simulation.

use async_trait::async_trait;
use nameledger_core::{Address, Amount, Height, NameOperation, Transaction, Txid};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The transaction was refused by the mempool.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Amount, available: Amount },

    /// An input spends an output whose key the wallet does not hold.
    #[error("cannot sign input {0}: key not in wallet")]
    MissingKey(usize),

    #[error("wallet error: {0}")]
    Other(String),
}

/// A transaction as known to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTx {
    pub tx: Transaction,
    /// Height of the including block; `None` while in the mempool.
    pub height: Option<Height>,
}

/// A name operation waiting in the mempool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNameOp {
    pub txid: Txid,
    pub vout: u32,
    pub op: NameOperation,
    pub address: Address,
}

/// Read access to the chain and the mempool, plus broadcast.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Height of the best block.
    async fn best_height(&self) -> Result<Height, LedgerError>;

    /// Name operations in the mempool, in acceptance order.
    async fn pending_name_ops(&self) -> Result<Vec<PendingNameOp>, LedgerError>;

    /// Look up a mined or pending transaction.
    async fn get_transaction(&self, txid: &Txid) -> Result<Option<LedgerTx>, LedgerError>;

    /// Submit a signed transaction to the mempool.
    async fn broadcast(&self, tx: Transaction) -> Result<Txid, LedgerError>;
}

/// How a wallet transaction output relates to the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxCategory {
    Send,
    Receive,
}

/// One wallet-relevant output of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletDetail {
    pub vout: u32,
    pub address: Address,
    pub amount: Amount,
    pub category: TxCategory,
}

/// A transaction the wallet took part in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletTransaction {
    pub txid: Txid,
    pub tx: Transaction,
    pub height: Option<Height>,
    /// Outputs worth reporting; change is left out.
    pub details: Vec<WalletDetail>,
}

/// Keys, coins and payments.
#[async_trait]
pub trait Wallet: Send + Sync {
    async fn new_address(&self) -> Result<Address, WalletError>;

    async fn is_mine(&self, address: &Address) -> Result<bool, WalletError>;

    /// Add coin inputs and a change output so the inputs cover the outputs.
    async fn fund(&self, tx: Transaction) -> Result<Transaction, WalletError>;

    /// Sign every input.
    async fn sign(&self, tx: Transaction) -> Result<Transaction, WalletError>;

    async fn send_to_address(&self, address: &Address, amount: Amount)
        -> Result<Txid, WalletError>;

    /// Wallet transactions, oldest first.
    async fn transactions(&self) -> Result<Vec<WalletTransaction>, WalletError>;

    async fn get_transaction(&self, txid: &Txid) -> Result<Option<WalletTransaction>, WalletError>;
}

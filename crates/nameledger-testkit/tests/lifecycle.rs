//! Registration, updates, transfers and payments on the simulated chain.

use std::sync::Arc;

use nameledger::{
    codes, EngineError, FilterResult, NameEngine, NameFilter, NameState, NameStatus, NodeConfig,
    TxCategory, Wallet,
};
use nameledger_store::{NameStore, SqliteStore};
use nameledger_testkit::{create_raw_transaction, init_tracing, SimLedger, SimNode, SimWallet};
use serde_json::json;

const VALUE: &str = r#"{"ip":"192.0.2.1"}"#;

fn names(result: FilterResult) -> Vec<String> {
    match result {
        FilterResult::Names(infos) => infos
            .iter()
            .filter_map(|info| info.name().map(String::from))
            .collect(),
        FilterResult::Stat(stat) => panic!("unexpected stat {:?}", stat),
    }
}

#[tokio::test]
async fn test_state_progression() -> anyhow::Result<()> {
    init_tracing();
    let node = SimNode::with_history().await?;
    let engine = &node.engine;

    assert_eq!(engine.name_state("d/abc", None).await?, NameState::Uncommitted);
    assert!(engine.name_available("d/abc", None).await?);

    let new = engine.name_new("d/abc", None).await?;
    assert_eq!(new.rand.len(), 40);
    node.generate(1).await?;
    // The commitment hides the name.
    assert_eq!(engine.name_state("d/abc", None).await?, NameState::Uncommitted);

    engine
        .name_firstupdate("d/abc", &new.rand, &new.txid, VALUE, None)
        .await?;
    assert_eq!(engine.name_state("d/abc", None).await?, NameState::Pending);
    assert!(engine.name_available("d/abc", None).await?);

    node.generate(node.firstupdate_wait()).await?;
    assert_eq!(engine.name_state("d/abc", None).await?, NameState::Confirmed);
    assert!(!engine.name_available("d/abc", None).await?);
    Ok(())
}

#[tokio::test]
async fn test_firstupdate_waits_for_depth() -> anyhow::Result<()> {
    let node = SimNode::with_history().await?;
    let engine = &node.engine;

    let new = engine.name_new("d/abc", None).await?;
    node.generate(1).await?;
    engine
        .name_firstupdate("d/abc", &new.rand, &new.txid, VALUE, None)
        .await?;

    node.generate(node.firstupdate_wait() - 1).await?;
    assert_eq!(node.ledger.mempool_size().await, 1);
    let err = engine.name_show("d/abc", None).await.unwrap_err();
    assert!(matches!(err, EngineError::NameNotFound(_)));
    assert_eq!(err.code(), codes::WALLET_ERROR);

    let height = node.generate(1).await?;
    assert_eq!(node.ledger.mempool_size().await, 0);
    let shown = engine.name_show("d/abc", None).await?;
    assert_eq!(shown.height, height);
    assert_eq!(shown.value(), Some(VALUE));
    Ok(())
}

#[tokio::test]
async fn test_firstupdate_rejections() -> anyhow::Result<()> {
    let node = SimNode::with_history().await?;
    let engine = &node.engine;

    let new = engine.name_new("d/abc", None).await?;
    node.generate(1).await?;

    let wrong_rand = "00".repeat(20);
    let err = engine
        .name_firstupdate("d/abc", &wrong_rand, &new.txid, VALUE, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), codes::INVALID_PARAMETER);

    let err = engine
        .name_firstupdate("d/other", &new.rand, &new.txid, VALUE, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), codes::INVALID_PARAMETER);

    let unknown = "11".repeat(32);
    let err = engine
        .name_firstupdate("d/abc", &new.rand, &unknown, VALUE, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), codes::INVALID_ADDRESS_OR_KEY);

    engine
        .name_firstupdate("d/abc", &new.rand, &new.txid, VALUE, None)
        .await?;
    let err = engine
        .name_firstupdate("d/abc", &new.rand, &new.txid, VALUE, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyPending));
    assert_eq!(node.ledger.mempool_size().await, 1);
    Ok(())
}

#[tokio::test]
async fn test_update_chain_in_mempool() -> anyhow::Result<()> {
    let node = SimNode::with_history().await?;
    node.register("d/abc", VALUE, None).await?;
    let engine = &node.engine;

    engine.name_update("d/abc", "1", None).await?;
    engine.name_update("d/abc", "2", None).await?;
    let pending = engine.name_pending(Some("d/abc"), None).await?;
    let values: Vec<_> = pending
        .iter()
        .map(|p| p.fields.value.text.as_deref().ok())
        .collect();
    assert_eq!(values, vec![Some("1"), Some("2")]);
    assert!(pending.iter().all(|p| p.ismine));

    node.generate(1).await?;
    let history = engine.name_history("d/abc", None).await?;
    let values: Vec<_> = history.iter().filter_map(|info| info.value()).collect();
    assert_eq!(values, vec![VALUE, "1", "2"]);
    assert!(engine.name_pending(None, None).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_status_follows_the_record() -> anyhow::Result<()> {
    let node = SimNode::with_history().await?;
    let engine = &node.engine;

    let new = engine.name_new("d/abc", None).await?;
    node.generate(1).await?;
    engine
        .name_firstupdate("d/abc", &new.rand, &new.txid, VALUE, None)
        .await?;
    let pending = engine.name_pending(None, None).await?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].status, NameStatus::Pending);
    assert_eq!(engine.name_state("d/abc", None).await?, NameState::Pending);

    node.generate(node.firstupdate_wait()).await?;
    let shown = engine.name_show("d/abc", None).await?;
    assert_eq!(shown.status, NameStatus::Confirmed);
    let history = engine.name_history("d/abc", None).await?;
    assert!(history.iter().all(|info| info.status == NameStatus::Confirmed));

    // A pending update does not demote the confirmed record.
    engine.name_update("d/abc", "1", None).await?;
    assert_eq!(engine.name_state("d/abc", None).await?, NameState::Confirmed);
    assert_eq!(engine.name_show("d/abc", None).await?.status, NameStatus::Confirmed);
    let pending = engine.name_pending(Some("d/abc"), None).await?;
    assert_eq!(pending[0].status, NameStatus::Pending);
    assert_eq!(pending[0].op, "name_update");

    let json = serde_json::to_value(&shown)?;
    assert_eq!(json["status"], "confirmed");
    Ok(())
}

#[tokio::test]
async fn test_empty_name_lifecycle() -> anyhow::Result<()> {
    let node = SimNode::with_history().await?;
    let hex = json!({ "nameEncoding": "hex", "valueEncoding": "hex" });
    node.register("", "", Some(&hex)).await?;
    let engine = &node.engine;

    let shown = engine.name_show("", Some(&hex)).await?;
    assert_eq!(shown.name(), Some(""));
    assert_eq!(shown.value(), Some(""));

    // The empty name is ASCII-clean too.
    let shown = engine.name_show("", None).await?;
    assert_eq!(shown.name(), Some(""));

    engine.name_update("", "00", Some(&hex)).await?;
    node.generate(1).await?;
    let history = engine.name_history("", Some(&hex)).await?;
    let values: Vec<_> = history.iter().filter_map(|info| info.value()).collect();
    assert_eq!(values, vec!["", "00"]);
    Ok(())
}

#[tokio::test]
async fn test_transfer_with_dest_address() -> anyhow::Result<()> {
    init_tracing();
    let alice = SimNode::with_history().await?;
    let bob = alice.join(NodeConfig::default()).await?;
    alice.register("d/abc", VALUE, None).await?;

    let err = bob.engine.name_update("d/abc", "{}", None).await.unwrap_err();
    assert!(matches!(err, EngineError::NameNotOwned(_)));
    assert_eq!(err.code(), codes::WALLET_ERROR);

    let address = bob.wallet.new_address().await?;
    let opts = json!({ "destAddress": address.to_string() });
    let txid = alice.engine.name_update("d/abc", "{}", Some(&opts)).await?;
    alice.generate(1).await?;

    let seen_by_alice = alice.engine.name_show("d/abc", None).await?;
    let seen_by_bob = bob.engine.name_show("d/abc", None).await?;
    assert!(!seen_by_alice.ismine);
    assert!(seen_by_bob.ismine);
    assert_eq!(seen_by_bob.address, address.to_string());
    assert!(alice.engine.name_list(None, None).await?.is_empty());
    assert_eq!(bob.engine.name_list(None, None).await?.len(), 1);

    let sent = alice.engine.get_transaction(&txid).await?;
    assert_eq!(sent.details.len(), 1);
    assert_eq!(sent.details[0].category, TxCategory::Send);
    assert_eq!(sent.details[0].name.as_deref(), Some("update: 'd/abc'"));

    let received = bob.engine.get_transaction(&txid).await?;
    assert_eq!(received.details.len(), 1);
    assert_eq!(received.details[0].category, TxCategory::Receive);

    bob.engine.name_update("d/abc", "[]", None).await?;
    bob.generate(1).await?;
    assert_eq!(bob.engine.name_show("d/abc", None).await?.value(), Some("[]"));
    Ok(())
}

#[tokio::test]
async fn test_sendtoname() -> anyhow::Result<()> {
    let alice = SimNode::with_history().await?;
    let bob = alice.join(NodeConfig::default()).await?;
    alice.register("d/abc", VALUE, None).await?;

    let txid = bob.engine.sendtoname("d/abc", 12_345, None).await?;
    bob.generate(1).await?;

    let received = alice.engine.get_transaction(&txid).await?;
    assert_eq!(received.details.len(), 1);
    assert_eq!(received.details[0].category, TxCategory::Receive);
    assert_eq!(received.details[0].amount, 12_345);
    assert_eq!(
        received.details[0].address,
        alice.engine.name_show("d/abc", None).await?.address
    );
    assert_eq!(received.confirmations, 1);

    let sent = bob.engine.get_transaction(&txid).await?;
    assert!(sent
        .details
        .iter()
        .any(|d| d.category == TxCategory::Send && d.amount == 12_345));

    let err = bob.engine.sendtoname("d/unknown", 1, None).await.unwrap_err();
    assert!(matches!(err, EngineError::NameNotFound(_)));
    Ok(())
}

#[tokio::test]
async fn test_raw_transaction_flow() -> anyhow::Result<()> {
    init_tracing();
    let node = SimNode::with_history().await?;
    let engine = &node.engine;

    let address = node.wallet.new_address().await?;
    let raw = create_raw_transaction(&[], &[(address, 1)]);
    let name_op = json!({ "op": "name_new", "name": "d/raw" });
    let built = engine.name_raw_transaction(&raw, 0, &name_op, None).await?;
    let rand = built.rand.clone().expect("name_new returns its salt");

    let decoded = engine.decode_raw_transaction(&built.hex, None).await?;
    let json = serde_json::to_value(&decoded)?;
    assert_eq!(json["vout"][0]["scriptPubKey"]["nameOp"]["op"], "name_new");
    assert_eq!(decoded.vout[0].value, node.ledger.params().name_locked_amount);

    let new_txid = node.send_raw(&built.hex).await?;
    node.generate(1).await?;

    let input = SimNode::outpoint(&new_txid.to_hex(), 0)?;
    let address = node.wallet.new_address().await?;
    let raw = create_raw_transaction(&[input], &[(address, 1)]);
    let name_op = json!({
        "op": "name_firstupdate",
        "name": "d/raw",
        "value": VALUE,
        "rand": rand,
    });
    let built = engine.name_raw_transaction(&raw, 0, &name_op, None).await?;
    assert!(built.rand.is_none());
    node.send_raw(&built.hex).await?;
    node.generate(node.firstupdate_wait()).await?;

    let shown = engine.name_show("d/raw", None).await?;
    assert_eq!(shown.value(), Some(VALUE));
    assert!(shown.ismine);
    Ok(())
}

#[tokio::test]
async fn test_raw_transaction_rejections() -> anyhow::Result<()> {
    let node = SimNode::with_history().await?;
    let engine = &node.engine;
    let address = node.wallet.new_address().await?;
    let raw = create_raw_transaction(&[], &[(address, 1)]);
    let update = json!({ "op": "name_update", "name": "d/abc", "value": "{}" });

    let err = engine
        .name_raw_transaction(&raw, 1, &update, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), codes::INVALID_PARAMETER);

    let err = engine
        .name_raw_transaction(&raw, 0, &json!("name_update"), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), codes::TYPE_ERROR);

    let err = engine
        .name_raw_transaction(&raw, 0, &json!({ "op": "name_update", "name": 7 }), None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Expected type string for name, got number");

    let err = engine
        .name_raw_transaction(&raw, 0, &json!({ "op": "name_delete", "name": "d/abc" }), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), codes::INVALID_PARAMETER);

    let err = engine
        .name_raw_transaction("zz", 0, &update, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), codes::DESERIALIZATION_ERROR);
    Ok(())
}

#[tokio::test]
async fn test_scan_and_filter() -> anyhow::Result<()> {
    let node = SimNode::with_history().await?;
    for name in ["x/c", "d/a", "d/b"] {
        node.register(name, VALUE, None).await?;
    }
    let engine = &node.engine;

    let scanned: Vec<_> = engine
        .name_scan(None, None, None)
        .await?
        .into_iter()
        .filter_map(|info| info.name().map(String::from))
        .collect();
    assert_eq!(scanned, vec!["d/a", "d/b", "x/c"]);

    let scanned: Vec<_> = engine
        .name_scan(Some("d/b"), Some(5), None)
        .await?
        .into_iter()
        .filter_map(|info| info.name().map(String::from))
        .collect();
    assert_eq!(scanned, vec!["d/b", "x/c"]);
    assert!(engine.name_scan(Some("y"), None, None).await?.is_empty());

    let d_names = NameFilter {
        prefix: Some("d/".into()),
        ..NameFilter::default()
    };
    assert_eq!(names(engine.name_filter(&d_names, None).await?), vec!["d/a", "d/b"]);

    let paged = NameFilter {
        from: 1,
        count: 1,
        ..d_names.clone()
    };
    assert_eq!(names(engine.name_filter(&paged, None).await?), vec!["d/b"]);

    // d/b was registered last, at the current height.
    let recent = NameFilter {
        max_age: 1,
        ..NameFilter::default()
    };
    assert_eq!(names(engine.name_filter(&recent, None).await?), vec!["d/b"]);

    let stat = NameFilter {
        stat: true,
        ..d_names
    };
    match engine.name_filter(&stat, None).await? {
        FilterResult::Stat(stat) => {
            assert_eq!(stat.count, 2);
            assert_eq!(stat.blocks, node.ledger.height().await);
        }
        FilterResult::Names(names) => panic!("expected stat, got {:?}", names),
    }
    Ok(())
}

#[tokio::test]
async fn test_history_requires_flag() -> anyhow::Result<()> {
    let node = SimNode::start(NodeConfig::default()).await?;
    node.register("d/abc", VALUE, None).await?;

    let err = node.engine.name_history("d/abc", None).await.unwrap_err();
    assert!(matches!(err, EngineError::HistoryDisabled));
    assert_eq!(err.code(), codes::MISC_ERROR);

    node.engine.restart(NodeConfig {
        name_history: true,
        ..NodeConfig::default()
    });
    assert_eq!(node.engine.name_history("d/abc", None).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_restart_switches_default_encodings() -> anyhow::Result<()> {
    let node = SimNode::with_history().await?;
    node.register("d/abc", VALUE, None).await?;

    let config = NodeConfig::from_args(["-namehistory", "-nameencoding=hex", "-valueencoding=utf8"])?;
    node.engine.restart(config);

    let shown = node.engine.name_show("642f616263", None).await?;
    assert_eq!(shown.name(), Some("642f616263"));
    assert_eq!(shown.value(), Some(VALUE));

    let ascii = json!({ "nameEncoding": "ascii" });
    assert!(node.engine.name_show("d/abc", Some(&ascii)).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn test_engine_on_sqlite_store() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let store = Arc::new(SqliteStore::open(dir.path().join("names.db"))?);
    let config = NodeConfig {
        name_history: true,
        ..NodeConfig::default()
    };
    let ledger = Arc::new(SimLedger::new(store.clone(), config.chain.clone()));
    let wallet = Arc::new(SimWallet::new(ledger.clone()));
    let depth = config.chain.min_firstupdate_depth;
    let engine = NameEngine::new(store.clone(), ledger.clone(), wallet.clone(), config);

    let mine = |blocks: u32| {
        let ledger = ledger.clone();
        let wallet = wallet.clone();
        async move {
            for _ in 0..blocks {
                ledger.mine_block(wallet.new_address().await?).await?;
            }
            anyhow::Ok(())
        }
    };

    mine(2).await?;
    let new = engine.name_new("d/abc", None).await?;
    mine(1).await?;
    engine
        .name_firstupdate("d/abc", &new.rand, &new.txid, VALUE, None)
        .await?;
    mine(depth - 1).await?;
    engine.name_update("d/abc", "{}", None).await?;
    mine(1).await?;

    let history = engine.name_history("d/abc", None).await?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1], engine.name_show("d/abc", None).await?);
    assert_eq!(store.name_count().await?, 1);
    store.validate().await?;
    Ok(())
}

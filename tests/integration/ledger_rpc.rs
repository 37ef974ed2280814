//! JSON-RPC ledger client against a mocked EVM node

use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use forecast_ledger::ledger::client::{JsonRpcLedgerClient, LedgerClient};
use forecast_ledger::ledger::error::LedgerError;
use forecast_ledger::ledger::writer::{LedgerWriter, SubmissionState, WriterPolicy};
use forecast_ledger::models::forecast::{ExtremumPoint, PointKind};

use crate::test_utils::{
    descriptor, healthy_node, ledger_config, receipt_json, rpc_client, rpc_result,
    CONTRACT_ADDRESS, SENDER, TX_HASH,
};

#[tokio::test]
async fn available_when_node_answers_chain_id() {
    let node = healthy_node().await;
    let client = rpc_client(&node.uri());

    client.ensure_available().await.unwrap();
    assert_eq!(client.contract().unwrap().address, CONTRACT_ADDRESS);
}

#[tokio::test]
async fn unavailable_without_descriptor_or_account() {
    let node = healthy_node().await;

    let missing_descriptor = JsonRpcLedgerClient::with_descriptor(
        &ledger_config(&node.uri()),
        Err(LedgerError::Unavailable("contract descriptor not found".to_string())),
        reqwest::Client::new(),
    );
    assert!(matches!(
        missing_descriptor.ensure_available().await,
        Err(LedgerError::Unavailable(_))
    ));

    let mut config = ledger_config(&node.uri());
    config.account = None;
    let no_account =
        JsonRpcLedgerClient::with_descriptor(&config, Ok(descriptor()), reqwest::Client::new());
    assert!(matches!(
        no_account.ensure_available().await,
        Err(LedgerError::Unavailable(_))
    ));
}

#[tokio::test]
async fn unavailable_when_node_errors() {
    let node = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&node)
        .await;

    let err = rpc_client(&node.uri()).ensure_available().await.unwrap_err();
    assert!(matches!(err, LedgerError::Unavailable(_)));
}

#[tokio::test]
async fn submit_sends_store_prediction_from_configured_account() {
    let node = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("eth_sendTransaction"))
        .and(body_string_contains("0x38aef05e"))
        .and(body_string_contains(SENDER))
        .and(body_string_contains(CONTRACT_ADDRESS))
        .and(body_string_contains("0x493e0"))
        .respond_with(rpc_result(json!(TX_HASH)))
        .expect(1)
        .mount(&node)
        .await;

    let hash = rpc_client(&node.uri())
        .submit_store_prediction("AAPL", 12345)
        .await
        .unwrap();
    assert_eq!(hash, TX_HASH);
}

#[tokio::test]
async fn rpc_error_surfaces_code_and_message() {
    let node = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("eth_sendTransaction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32000, "message": "sender account not recognized" }
        })))
        .mount(&node)
        .await;

    let err = rpc_client(&node.uri())
        .submit_store_prediction("AAPL", 1)
        .await
        .unwrap_err();
    match err {
        LedgerError::Rpc { code, message } => {
            assert_eq!(code, -32000);
            assert!(message.contains("not recognized"));
        }
        other => panic!("expected rpc error, got {:?}", other),
    }
}

#[tokio::test]
async fn pending_receipt_is_none() {
    let node = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("eth_getTransactionReceipt"))
        .respond_with(rpc_result(json!(null)))
        .mount(&node)
        .await;

    let receipt = rpc_client(&node.uri())
        .transaction_receipt(TX_HASH)
        .await
        .unwrap();
    assert!(receipt.is_none());
}

#[tokio::test]
async fn mined_receipt_quantities_are_decoded() {
    let node = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("eth_getTransactionReceipt"))
        .respond_with(rpc_result(receipt_json("0x0")))
        .mount(&node)
        .await;

    let receipt = rpc_client(&node.uri())
        .transaction_receipt(TX_HASH)
        .await
        .unwrap()
        .expect("mined");
    assert_eq!(receipt.transaction_hash, TX_HASH);
    assert_eq!(receipt.block_number, 436);
    assert_eq!(receipt.gas_used, 48_000);
    assert_eq!(receipt.effective_gas_price, 20_000_000_000);
    assert!(!receipt.is_success());
}

#[tokio::test]
async fn writer_confirms_both_points_through_node() {
    let node = healthy_node().await;
    let config = ledger_config(&node.uri());
    let writer = LedgerWriter::new(Arc::new(rpc_client(&node.uri())), WriterPolicy::from(&config));

    let now = chrono::Utc::now();
    let points = [
        ExtremumPoint {
            timestamp: now,
            price: 142.118,
            kind: PointKind::Buy,
            index: 4,
        },
        ExtremumPoint {
            timestamp: now + chrono::Duration::days(9),
            price: 155.5,
            kind: PointKind::Sell,
            index: 13,
        },
    ];
    let outcome = writer.record("AAPL", &points).await;

    let submissions = outcome.submissions();
    assert_eq!(submissions.len(), 2);
    assert!(submissions
        .iter()
        .all(|s| s.state == SubmissionState::Confirmed));
    assert_eq!(submissions[0].encoded_price, Some(14211));
    assert_eq!(submissions[1].encoded_price, Some(15550));
}

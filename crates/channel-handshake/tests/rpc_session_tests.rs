// Tests for the Tendermint RPC chain session against a mocked node
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ibc_channel_handshake::channel::{
    ChannelRecord, HandshakeIdentity, HandshakeMessage, MsgOpenConfirm, Order, PhaseState,
};
use ibc_channel_handshake::{ChainConfig, ChainError, ChainSession, ErrorKind, RpcChainSession};

fn chain_config(rpc_endpoint: String) -> ChainConfig {
    ChainConfig {
        chain_id: "ibc-0".to_string(),
        rpc_endpoint,
        signer: "cosmos1relayer".to_string(),
        store_key: "ibc".to_string(),
        store_version: 1,
        request_timeout: "2s".to_string(),
    }
}

fn identity() -> HandshakeIdentity {
    HandshakeIdentity::new("connection-0", "channel-0")
}

fn abci_response(value: &str, height: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": -1,
        "result": {
            "response": {
                "code": 0,
                "log": "",
                "value": value,
                "proofOps": { "ops": [{ "type": "ics23:iavl", "key": "a2V5", "data": "cHJvb2Y=" }] },
                "height": height,
            }
        }
    })
}

async fn mount_abci(server: &MockServer, key: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path("/abci_query"))
        .and(query_param("path", "\"/store/ibc/key\""))
        .and(query_param("data", format!("0x{}", hex::encode(key))))
        .and(query_param("prove", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn confirm_msg() -> HandshakeMessage {
    HandshakeMessage::OpenConfirm(MsgOpenConfirm {
        connection_id: "connection-0".to_string(),
        channel_id: "channel-0".to_string(),
        timeout: 2050,
        proofs: vec![],
        signer: "cosmos1relayer".to_string(),
    })
}

#[tokio::test]
async fn test_latest_height_from_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": -1,
            "result": {
                "node_info": { "network": "ibc-0" },
                "sync_info": { "latest_block_height": "4242", "latest_block_time": "2024-01-01T00:00:00Z" }
            }
        })))
        .mount(&server)
        .await;

    let session = RpcChainSession::new(&chain_config(server.uri())).unwrap();
    assert_eq!(session.latest_height().await.unwrap(), 4242);
}

#[tokio::test]
async fn test_state_proof_query() {
    let server = MockServer::start().await;
    mount_abci(&server, "1/channels/connection-0/channel-0/state", abci_response("Ag==", "311")).await;

    let session = RpcChainSession::new(&chain_config(server.uri())).unwrap();
    let (state, proof) = session.query_state_proof(&identity()).await.unwrap();

    assert_eq!(state, PhaseState::OpenTry);
    assert_eq!(proof.height, 311);
    let ops: Value = serde_json::from_slice(&proof.bytes).unwrap();
    assert_eq!(ops["ops"][0]["type"], "ics23:iavl");
}

#[tokio::test]
async fn test_timeout_proof_query() {
    let server = MockServer::start().await;
    mount_abci(&server, "1/channels/connection-0/channel-0/timeout", abci_response("AAAAAAAACAI=", "312")).await;

    let session = RpcChainSession::new(&chain_config(server.uri())).unwrap();
    let (timeout, proof) = session.query_timeout_proof(&identity()).await.unwrap();

    assert_eq!(timeout, 2050);
    assert_eq!(proof.height, 312);
}

#[tokio::test]
async fn test_channel_proof_query() {
    let record = ChannelRecord {
        ordering: Order::Ordered,
        port_id: "ica".to_string(),
        counterparty_port_id: "icahost".to_string(),
        counterparty_channel_id: "channel-3".to_string(),
        connection_hops: vec!["connection-0".to_string()],
        version: "ics27-1".to_string(),
    };
    let encoded = general_purpose::STANDARD.encode(serde_json::to_vec(&record).unwrap());

    let server = MockServer::start().await;
    mount_abci(&server, "1/channels/connection-0/channel-0", abci_response(&encoded, "300")).await;

    let session = RpcChainSession::new(&chain_config(server.uri())).unwrap();
    let (queried, proof) = session.query_channel_proof(&identity()).await.unwrap();

    assert_eq!(queried, record);
    assert_eq!(proof.height, 300);
}

#[tokio::test]
async fn test_empty_value_is_not_found() {
    let server = MockServer::start().await;
    mount_abci(&server, "1/channels/connection-0/channel-0/state", abci_response("", "12")).await;

    let session = RpcChainSession::new(&chain_config(server.uri())).unwrap();
    let err = session.query_state_proof(&identity()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RecordNotFound);
    match err {
        ChainError::NotFound { path, .. } => assert_eq!(path, "1/channels/connection-0/channel-0/state"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_garbled_state_is_a_query_failure() {
    let server = MockServer::start().await;
    // two bytes where one is expected
    mount_abci(&server, "1/channels/connection-0/channel-0/state", abci_response("AgI=", "12")).await;

    let session = RpcChainSession::new(&chain_config(server.uri())).unwrap();
    let err = session.query_state_proof(&identity()).await.unwrap_err();

    assert!(matches!(err, ChainError::Decode { .. }));
    assert_eq!(err.kind(), ErrorKind::QueryFailure);
}

#[tokio::test]
async fn test_http_error_is_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let session = RpcChainSession::new(&chain_config(server.uri())).unwrap();
    let err = session.latest_height().await.unwrap_err();

    assert!(matches!(err, ChainError::Unreachable { .. }));
}

#[tokio::test]
async fn test_closed_port_is_unreachable() {
    let session = RpcChainSession::new(&chain_config("http://127.0.0.1:1".to_string())).unwrap();
    let err = session.latest_height().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::QueryFailure);
}

#[tokio::test]
async fn test_submit_broadcasts_and_returns_hash() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({ "method": "broadcast_tx_commit" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "check_tx": { "code": 0, "log": "" },
                "deliver_tx": { "code": 0, "log": "" },
                "hash": "ABCDEF0123",
                "height": "320"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = RpcChainSession::new(&chain_config(server.uri())).unwrap();
    let tx_hash = session.submit(&confirm_msg()).await.unwrap();
    assert_eq!(tx_hash, "ABCDEF0123");

    // The broadcast tx is the JSON-encoded message
    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let tx = general_purpose::STANDARD.decode(body["params"]["tx"].as_str().unwrap()).unwrap();
    let sent: HandshakeMessage = serde_json::from_slice(&tx).unwrap();
    assert_eq!(sent, confirm_msg());
}

#[tokio::test]
async fn test_submit_rejected_by_check_tx() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "check_tx": { "code": 4, "log": "signature verification failed" },
                "deliver_tx": { "code": 0, "log": "" },
                "hash": "FF",
                "height": "0"
            }
        })))
        .mount(&server)
        .await;

    let session = RpcChainSession::new(&chain_config(server.uri())).unwrap();
    let err = session.submit(&confirm_msg()).await.unwrap_err();

    assert_eq!(
        err,
        ChainError::Rejected {
            chain_id: "ibc-0".to_string(),
            code: 4,
            log: "signature verification failed".to_string(),
        }
    );
}

#[tokio::test]
async fn test_submit_rejected_on_delivery() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "check_tx": { "code": 0, "log": "" },
                "tx_result": { "code": 18, "log": "channel timeout expired" },
                "hash": "AA",
                "height": "330"
            }
        })))
        .mount(&server)
        .await;

    let session = RpcChainSession::new(&chain_config(server.uri())).unwrap();
    let err = session.submit(&confirm_msg()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SubmissionRejected);
}

#[tokio::test]
async fn test_rpc_error_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32603, "message": "Internal error", "data": "timed out waiting for tx" }
        })))
        .mount(&server)
        .await;

    let session = RpcChainSession::new(&chain_config(server.uri())).unwrap();
    let err = session.submit(&confirm_msg()).await.unwrap_err();

    assert!(matches!(err, ChainError::Unreachable { .. }));
}

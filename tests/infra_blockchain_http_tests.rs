//! HTTP-based integration tests for the JSON-RPC client and remote builders.
//!
//! Uses `wiremock` to stand in for the RPC node, the swap aggregator and
//! transaction-request endpoints.

use std::time::Duration;

use serde_json::json;
use solana_sdk::{
    hash::Hash,
    message::{Message, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use solana_system_interface::instruction as system_instruction;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method, path, query_param},
};

use gallery_tx_relayer::domain::{
    ChainClient, Commitment, SendOptions, TransactionBuilder, TransactionError,
};
use gallery_tx_relayer::infra::blockchain::{
    RemoteTransactionBuilder, RpcChainClient, RpcClientConfig, SwapTransactionBuilder,
    encode_transaction,
};

fn sample_transaction(payer: &Pubkey) -> VersionedTransaction {
    let ix = system_instruction::transfer(payer, &Pubkey::new_unique(), 5_000);
    let message =
        Message::new_with_blockhash(&[ix], Some(payer), &Hash::new_from_array([4u8; 32]));
    VersionedTransaction {
        signatures: vec![Signature::default()],
        message: VersionedMessage::Legacy(message),
    }
}

fn fast_config() -> RpcClientConfig {
    RpcClientConfig {
        timeout: Duration::from_secs(5),
        max_retries: 2,
        retry_delay: Duration::from_millis(10),
        commitment: Commitment::Confirmed,
    }
}

fn rpc_result(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": result}))
}

/// Read one HTTP request, including its body
async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= end + 4 + content_length {
            return;
        }
    }
}

/// Server that promises a 500-byte body, sends part of it and hangs up
async fn truncated_body_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_request(&mut socket).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 200 OK\r\n\
                          Content-Type: application/json\r\n\
                          Content-Length: 500\r\n\r\n\
                          {\"jsonrpc\":\"2.0\",\"id\":1,\"resu",
                    )
                    .await;
                let _ = socket.flush().await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{}", addr)
}

// ============================================================================
// JSON-RPC CLIENT TESTS
// ============================================================================

mod rpc_client_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_latest_blockhash() {
        let server = MockServer::start().await;
        let blockhash = Hash::new_from_array([8u8; 32]);

        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "getLatestBlockhash"})))
            .respond_with(rpc_result(json!({
                "context": {"slot": 100},
                "value": {"blockhash": blockhash.to_string(), "lastValidBlockHeight": 150}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RpcChainClient::new(&server.uri(), fast_config()).unwrap();
        assert_eq!(client.get_latest_blockhash().await.unwrap(), blockhash);
    }

    #[tokio::test]
    async fn test_send_transaction_uses_base64_and_preflight_options() {
        let server = MockServer::start().await;
        let signature = Signature::from([5u8; 64]).to_string();
        let tx = sample_transaction(&Pubkey::new_unique());
        let encoded = encode_transaction(&tx).unwrap();

        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "sendTransaction",
                "params": [encoded, {
                    "encoding": "base64",
                    "skipPreflight": false,
                    "preflightCommitment": "confirmed"
                }]
            })))
            .respond_with(rpc_result(json!(signature)))
            .expect(1)
            .mount(&server)
            .await;

        let client = RpcChainClient::new(&server.uri(), fast_config()).unwrap();
        let result = client
            .send_transaction(&tx, &SendOptions::default())
            .await
            .unwrap();
        assert_eq!(result, signature);
    }

    #[tokio::test]
    async fn test_send_transaction_rpc_error_with_logs() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {
                    "code": -32002,
                    "message": "Transaction simulation failed: Attempt to debit an account but found no record of a prior credit.",
                    "data": {
                        "err": "AccountNotFound",
                        "logs": ["Program 11111111111111111111111111111111 invoke [1]"]
                    }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RpcChainClient::new(&server.uri(), fast_config()).unwrap();
        let err = client
            .send_transaction(&sample_transaction(&Pubkey::new_unique()), &SendOptions::default())
            .await
            .unwrap_err();

        match err {
            TransactionError::Rpc {
                code,
                message,
                logs,
            } => {
                assert_eq!(code, -32002);
                assert!(message.contains("simulation failed"));
                assert_eq!(logs.len(), 1);
            }
            other => panic!("Expected RPC error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_transaction_gateway_error_is_network_and_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .expect(1)
            .mount(&server)
            .await;

        let client = RpcChainClient::new(&server.uri(), fast_config()).unwrap();
        let err = client
            .send_transaction(&sample_transaction(&Pubkey::new_unique()), &SendOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_retryable(), "503 should be a network error: {:?}", err);
    }

    #[tokio::test]
    async fn test_read_call_retries_rate_limiting() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(rpc_result(json!(12345)))
            .mount(&server)
            .await;

        let client = RpcChainClient::new(&server.uri(), fast_config()).unwrap();
        assert!(client.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_json_is_serialization_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not valid json"))
            .mount(&server)
            .await;

        let client = RpcChainClient::new(&server.uri(), fast_config()).unwrap();
        let err = client.get_latest_blockhash().await.unwrap_err();
        assert!(matches!(err, TransactionError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_network_error() {
        // Nothing listens on this port
        let client = RpcChainClient::new(
            "http://127.0.0.1:9",
            RpcClientConfig {
                max_retries: 0,
                ..fast_config()
            },
        )
        .unwrap();
        let err = client.get_latest_blockhash().await.unwrap_err();
        assert!(err.is_retryable(), "Expected network error, got {:?}", err);
    }

    #[tokio::test]
    async fn test_connection_dropped_mid_body_is_network_error() {
        let url = truncated_body_server().await;
        let client = RpcChainClient::new(
            &url,
            RpcClientConfig {
                max_retries: 0,
                ..fast_config()
            },
        )
        .unwrap();

        let err = client
            .send_transaction(&sample_transaction(&Pubkey::new_unique()), &SendOptions::default())
            .await
            .unwrap_err();
        assert!(
            matches!(err, TransactionError::Network(_)),
            "Truncated body should be retryable, got {:?}",
            err
        );

        let err = client.get_latest_blockhash().await.unwrap_err();
        assert!(err.is_retryable(), "Expected network error, got {:?}", err);
    }

    #[tokio::test]
    async fn test_get_signature_status_searches_history() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "getSignatureStatuses",
                "params": [["sig"], {"searchTransactionHistory": true}]
            })))
            .respond_with(rpc_result(json!({
                "context": {"slot": 82},
                "value": [{
                    "slot": 72,
                    "confirmations": null,
                    "err": null,
                    "confirmationStatus": "finalized"
                }]
            })))
            .mount(&server)
            .await;

        let client = RpcChainClient::new(&server.uri(), fast_config()).unwrap();
        let status = client.get_signature_status("sig").await.unwrap().unwrap();
        assert_eq!(status.slot, 72);
        assert!(status.reached(Commitment::Finalized));
    }
}

// ============================================================================
// REMOTE TRANSACTION BUILDER TESTS
// ============================================================================

mod remote_builder_tests {
    use super::*;

    #[tokio::test]
    async fn test_remote_builder_posts_account_and_decodes_transaction() {
        let server = MockServer::start().await;
        let payer = Pubkey::new_unique();
        let tx = sample_transaction(&payer);

        Mock::given(method("POST"))
            .and(path("/mint"))
            .and(body_partial_json(json!({
                "account": payer.to_string(),
                "collection": "gallery"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "transaction": encode_transaction(&tx).unwrap(),
                "message": "Mint gallery pass"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let builder = RemoteTransactionBuilder::new(
            reqwest::Client::new(),
            "mint",
            format!("{}/mint", server.uri()),
            json!({"collection": "gallery"}),
        );
        let built = builder.build(&payer).await.unwrap();
        assert_eq!(built.message, tx.message);
    }

    #[tokio::test]
    async fn test_remote_builder_client_error_is_build_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "sold out"})))
            .mount(&server)
            .await;

        let builder = RemoteTransactionBuilder::new(
            reqwest::Client::new(),
            "buy",
            server.uri(),
            json!({}),
        );
        let err = builder.build(&Pubkey::new_unique()).await.unwrap_err();
        match err {
            TransactionError::Build(msg) => assert!(msg.contains("sold out")),
            other => panic!("Expected build error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remote_builder_gateway_error_is_retryable() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let builder =
            RemoteTransactionBuilder::new(reqwest::Client::new(), "borrow", server.uri(), json!({}));
        let err = builder.build(&Pubkey::new_unique()).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_remote_builder_connection_dropped_mid_body_is_retryable() {
        let url = truncated_body_server().await;

        let builder = RemoteTransactionBuilder::new(reqwest::Client::new(), "mint", url, json!({}));
        let err = builder.build(&Pubkey::new_unique()).await.unwrap_err();
        assert!(
            matches!(err, TransactionError::Network(_)),
            "Truncated body should be retryable, got {:?}",
            err
        );
    }

    #[tokio::test]
    async fn test_remote_builder_bad_payload_is_serialization_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"transaction": "%%%not-base64"})),
            )
            .mount(&server)
            .await;

        let builder =
            RemoteTransactionBuilder::new(reqwest::Client::new(), "mint", server.uri(), json!({}));
        let err = builder.build(&Pubkey::new_unique()).await.unwrap_err();
        assert!(matches!(err, TransactionError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_swap_builder_quotes_then_swaps() {
        let server = MockServer::start().await;
        let payer = Pubkey::new_unique();
        let input = Pubkey::new_unique();
        let output = Pubkey::new_unique();
        let tx = sample_transaction(&payer);
        let quote = json!({
            "inputMint": input.to_string(),
            "outputMint": output.to_string(),
            "inAmount": "1000000",
            "outAmount": "998000",
            "slippageBps": 50
        });

        Mock::given(method("GET"))
            .and(path("/quote"))
            .and(query_param("inputMint", input.to_string()))
            .and(query_param("outputMint", output.to_string()))
            .and(query_param("amount", "1000000"))
            .and(query_param("slippageBps", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(quote.clone()))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/swap"))
            .and(body_partial_json(json!({
                "quoteResponse": quote,
                "userPublicKey": payer.to_string(),
                "wrapAndUnwrapSol": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "swapTransaction": encode_transaction(&tx).unwrap(),
                "lastValidBlockHeight": 279632475u64
            })))
            .expect(1)
            .mount(&server)
            .await;

        let builder = SwapTransactionBuilder::new(
            reqwest::Client::new(),
            &server.uri(),
            input,
            output,
            1_000_000,
            50,
        );
        let built = builder.build(&payer).await.unwrap();
        assert_eq!(built.message, tx.message);
    }

    #[tokio::test]
    async fn test_swap_builder_quote_rejection() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"error": "Could not find any route"})),
            )
            .mount(&server)
            .await;

        let builder = SwapTransactionBuilder::new(
            reqwest::Client::new(),
            &server.uri(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            10,
            50,
        );
        let err = builder.build(&Pubkey::new_unique()).await.unwrap_err();
        assert!(matches!(err, TransactionError::Build(_)));
    }
}

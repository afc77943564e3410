//! JSON-RPC client for Solana-compatible chains.
//!
//! Transport failures are classified into retryable network errors and
//! structured RPC rejections. Read-only calls are retried here on network
//! errors; `sendTransaction` is issued exactly once per call because the
//! orchestrator owns retries of the full build-sign-send cycle.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use solana_sdk::{hash::Hash, pubkey::Pubkey, transaction::VersionedTransaction};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::codec::{decode_base64, encode_transaction};
use crate::domain::{
    AccountInfo, AppError, ChainClient, Commitment, ConfigError, SendOptions, SignatureStatus,
    TransactionError, classify_transport_error, parse_env,
};

/// Configuration for the RPC client
#[derive(Debug, Clone)]
pub struct RpcClientConfig {
    pub timeout: Duration,
    /// Extra attempts for read calls that fail with a network error
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub commitment: Commitment,
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            commitment: Commitment::Confirmed,
        }
    }
}

impl RpcClientConfig {
    /// Read `RPC_TIMEOUT_SECS`, `RPC_MAX_RETRIES` and `TX_COMMITMENT`
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let timeout = parse_env::<u64>("RPC_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        if timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "RPC_TIMEOUT_SECS".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        let max_retries = parse_env::<u32>("RPC_MAX_RETRIES")?.unwrap_or(defaults.max_retries);
        let commitment =
            parse_env::<Commitment>("TX_COMMITMENT")?.unwrap_or(defaults.commitment);

        Ok(Self {
            timeout,
            max_retries,
            commitment,
            ..defaults
        })
    }
}

/// Abstract JSON-RPC transport to enable testing
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Send a JSON-RPC request and return its `result`
    async fn send_request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, TransactionError>;
}

/// HTTP-based JSON-RPC transport
pub struct HttpRpcTransport {
    http_client: Client,
    rpc_url: String,
}

impl HttpRpcTransport {
    pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            rpc_url: rpc_url.to_string(),
        })
    }
}

#[async_trait]
impl RpcTransport for HttpRpcTransport {
    async fn send_request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, TransactionError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: method.to_string(),
            params,
        };

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;

        if is_transient_status(status) {
            return Err(TransactionError::Network(format!(
                "HTTP {}: {}",
                status,
                truncate(&body)
            )));
        }

        let rpc_response: JsonRpcResponse<serde_json::Value> = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                let text = format!("HTTP {}: {} ({})", status, truncate(&body), e);
                return Err(classify_transport_error(text, |message| {
                    if status.is_success() {
                        TransactionError::Serialization(message)
                    } else {
                        TransactionError::Rpc {
                            code: i64::from(status.as_u16()),
                            message,
                            logs: Vec::new(),
                        }
                    }
                }));
            }
        };

        if let Some(error) = rpc_response.error {
            return Err(error.into_transaction_error());
        }

        rpc_response
            .result
            .ok_or_else(|| TransactionError::Serialization("Empty response".to_string()))
    }
}

#[async_trait]
impl<T: RpcTransport + ?Sized> RpcTransport for Arc<T> {
    async fn send_request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, TransactionError> {
        (**self).send_request(method, params).await
    }
}

pub(crate) fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

pub(crate) fn truncate(body: &str) -> &str {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Map reqwest failures onto the transaction error taxonomy.
///
/// A body cut off mid-read surfaces as a body or decode error whose own
/// message hides the cause, so classification looks at the whole source chain.
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> TransactionError {
    let text = error_chain_text(&err);
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        return TransactionError::Network(text);
    }
    if err.is_decode() && has_io_source(&err) {
        return TransactionError::Network(text);
    }
    classify_transport_error(text, TransactionError::Serialization)
}

fn sources<'a>(
    err: &'a (dyn std::error::Error + 'static),
) -> impl Iterator<Item = &'a (dyn std::error::Error + 'static)> {
    std::iter::successors(err.source(), |cause| cause.source())
}

/// `err` followed by every cause, joined with `": "`
pub(crate) fn error_chain_text(err: &(dyn std::error::Error + 'static)) -> String {
    sources(err).fold(err.to_string(), |mut text, cause| {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        text
    })
}

fn has_io_source(err: &(dyn std::error::Error + 'static)) -> bool {
    sources(err).any(|cause| cause.is::<std::io::Error>())
}

/// Solana JSON-RPC chain client
pub struct RpcChainClient {
    transport: Box<dyn RpcTransport>,
    config: RpcClientConfig,
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<T: Serialize> {
    jsonrpc: &'static str,
    id: u64,
    method: String,
    params: T,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl JsonRpcError {
    fn into_transaction_error(self) -> TransactionError {
        let logs = self
            .data
            .as_ref()
            .and_then(|data| data.get("logs"))
            .and_then(|logs| logs.as_array())
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(|line| line.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        TransactionError::Rpc {
            code: self.code,
            message: self.message,
            logs,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BlockhashResponse {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
struct BlockhashResult {
    value: BlockhashResponse,
}

#[derive(Debug, Deserialize)]
struct RpcAccount {
    lamports: u64,
    owner: String,
    /// `[payload, encoding]`
    data: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AccountInfoResult {
    value: Option<RpcAccount>,
}

#[derive(Debug, Deserialize)]
struct SignatureStatusResult {
    value: Vec<Option<SignatureStatus>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrioritizationFee {
    #[allow(dead_code)]
    slot: u64,
    prioritization_fee: u64,
}

impl RpcChainClient {
    /// Create a new RPC chain client with custom configuration
    pub fn new(rpc_url: &str, config: RpcClientConfig) -> Result<Self, AppError> {
        let transport = HttpRpcTransport::new(rpc_url, config.timeout)?;
        info!(rpc_url = %rpc_url, commitment = %config.commitment, "Created chain client");
        Ok(Self {
            transport: Box::new(transport),
            config,
        })
    }

    /// Create a new RPC chain client with default configuration
    pub fn with_defaults(rpc_url: &str) -> Result<Self, AppError> {
        Self::new(rpc_url, RpcClientConfig::default())
    }

    /// Create a new client with a specific transport (useful for testing)
    pub fn with_transport(transport: Box<dyn RpcTransport>, config: RpcClientConfig) -> Self {
        Self { transport, config }
    }

    /// Make a read-only RPC call, retrying network errors
    #[instrument(skip(self, params))]
    async fn rpc_call<P: Serialize + Send + Sync, R: DeserializeOwned + Send>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, TransactionError> {
        let params_value = serde_json::to_value(params).map_err(|e| {
            TransactionError::Serialization(format!("Serialization error: {}", e))
        })?;

        let mut attempt = 0;
        loop {
            match self
                .transport
                .send_request(method, params_value.clone())
                .await
            {
                Ok(result_value) => {
                    return serde_json::from_value(result_value).map_err(|e| {
                        TransactionError::Serialization(format!("Deserialization error: {}", e))
                    });
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    warn!(attempt = attempt, error = %e, method = %method, "RPC call failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => {
                    warn!(attempt = attempt, error = %e, method = %method, "RPC call failed");
                    return Err(e);
                }
            }
        }
    }

    fn commitment_config(&self) -> serde_json::Value {
        serde_json::json!({ "commitment": self.config.commitment.as_str() })
    }
}

/// Build the `sendTransaction` configuration object
fn send_config(options: &SendOptions) -> serde_json::Value {
    let mut config = serde_json::json!({
        "encoding": "base64",
        "skipPreflight": options.skip_preflight,
        "preflightCommitment": options.preflight_commitment.as_str(),
    });
    if let Some(max_retries) = options.max_retries {
        config["maxRetries"] = serde_json::json!(max_retries);
    }
    config
}

#[async_trait]
impl ChainClient for RpcChainClient {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        let _: u64 = self.rpc_call("getSlot", Vec::<()>::new()).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_latest_blockhash(&self) -> Result<Hash, TransactionError> {
        let result: BlockhashResult = self
            .rpc_call("getLatestBlockhash", [self.commitment_config()])
            .await?;
        Hash::from_str(&result.value.blockhash).map_err(|e| {
            TransactionError::Serialization(format!(
                "Invalid blockhash {}: {}",
                result.value.blockhash, e
            ))
        })
    }

    #[instrument(skip(self))]
    async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountInfo>, TransactionError> {
        let mut config = self.commitment_config();
        config["encoding"] = serde_json::json!("base64");
        let params = serde_json::json!([address.to_string(), config]);
        let result: AccountInfoResult = self.rpc_call("getAccountInfo", params).await?;

        let Some(account) = result.value else {
            debug!(address = %address, "Account not found");
            return Ok(None);
        };
        let payload = account.data.first().map(String::as_str).unwrap_or_default();
        Ok(Some(AccountInfo {
            owner: account.owner,
            lamports: account.lamports,
            data: decode_base64(payload)?,
        }))
    }

    #[instrument(skip(self, transaction, options))]
    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        options: &SendOptions,
    ) -> Result<String, TransactionError> {
        let encoded = encode_transaction(transaction)?;
        let params = serde_json::json!([encoded, send_config(options)]);

        let result = self.transport.send_request("sendTransaction", params).await?;
        let signature: String = serde_json::from_value(result).map_err(|e| {
            TransactionError::Serialization(format!("Unexpected sendTransaction result: {}", e))
        })?;

        debug!(signature = %signature, "Transaction submitted via sendTransaction");
        Ok(signature)
    }

    #[instrument(skip(self))]
    async fn get_signature_status(
        &self,
        signature: &str,
    ) -> Result<Option<SignatureStatus>, TransactionError> {
        let params = serde_json::json!([[signature], {"searchTransactionHistory": true}]);
        let result: SignatureStatusResult = self.rpc_call("getSignatureStatuses", params).await?;
        Ok(result.value.into_iter().next().flatten())
    }

    #[instrument(skip(self, accounts), fields(accounts = accounts.len()))]
    async fn get_recent_prioritization_fees(
        &self,
        accounts: &[Pubkey],
    ) -> Result<Vec<u64>, TransactionError> {
        let addresses: Vec<String> = accounts.iter().map(ToString::to_string).collect();
        let result: Vec<PrioritizationFee> = self
            .rpc_call("getRecentPrioritizationFees", [addresses])
            .await?;
        Ok(result.into_iter().map(|f| f.prioritization_fee).collect())
    }
}

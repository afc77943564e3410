//! Builders whose transaction is produced by an external HTTP service.
//!
//! Remote endpoints follow the Solana Pay transaction-request convention:
//! the relayer POSTs `{"account": <wallet>, ...payload}` and receives
//! `{"transaction": <base64>}`. Swaps go through a Jupiter-style
//! quote/swap API.

use async_trait::async_trait;
use reqwest::Response;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use solana_sdk::{pubkey::Pubkey, transaction::VersionedTransaction};
use tracing::{debug, instrument, warn};

use super::codec::decode_transaction;
use super::solana::{is_transient_status, map_reqwest_error, truncate};
use crate::domain::{TransactionBuilder, TransactionError};

/// Turn a non-success HTTP response into a transaction error.
///
/// Throttling and gateway failures are retryable; any other rejection means
/// the service refused to build the transaction.
async fn check_status(response: Response, service: &str) -> Result<Response, TransactionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = format!("{} returned HTTP {}: {}", service, status, truncate(&body));
    warn!(status = %status, service = service, "Transaction service rejected request");
    if is_transient_status(status) {
        Err(TransactionError::Network(message))
    } else if status.is_server_error() {
        Err(TransactionError::Rpc {
            code: i64::from(status.as_u16()),
            message,
            logs: Vec::new(),
        })
    } else {
        Err(TransactionError::Build(message))
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: Response,
    service: &str,
) -> Result<T, TransactionError> {
    let response = check_status(response, service).await?;
    let body = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice::<T>(&body).map_err(|e| {
        TransactionError::Serialization(format!("Invalid {} response: {}", service, e))
    })
}

#[derive(Debug, Deserialize)]
struct TransactionRequestResponse {
    transaction: String,
    #[serde(default)]
    message: Option<String>,
}

/// Fetches a ready-made transaction from a configured endpoint
pub struct RemoteTransactionBuilder {
    http_client: reqwest::Client,
    endpoint: String,
    url: String,
    payload: Value,
}

impl RemoteTransactionBuilder {
    pub fn new(
        http_client: reqwest::Client,
        endpoint: impl Into<String>,
        url: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
            url: url.into(),
            payload,
        }
    }

    fn request_body(&self, payer: &Pubkey) -> Value {
        let mut body = match &self.payload {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        body.insert("account".to_string(), Value::String(payer.to_string()));
        Value::Object(body)
    }
}

#[async_trait]
impl TransactionBuilder for RemoteTransactionBuilder {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn build(&self, payer: &Pubkey) -> Result<VersionedTransaction, TransactionError> {
        let response = self
            .http_client
            .post(&self.url)
            .json(&self.request_body(payer))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let body: TransactionRequestResponse = read_json(response, &self.endpoint).await?;
        if let Some(message) = &body.message {
            debug!(message = %message, "Remote endpoint message");
        }
        decode_transaction(&body.transaction)
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapResponse {
    swap_transaction: String,
    #[serde(default)]
    last_valid_block_height: Option<u64>,
}

/// Token swap via quote then swap-transaction requests
pub struct SwapTransactionBuilder {
    http_client: reqwest::Client,
    base_url: String,
    input_mint: Pubkey,
    output_mint: Pubkey,
    amount: u64,
    slippage_bps: u16,
}

impl SwapTransactionBuilder {
    pub fn new(
        http_client: reqwest::Client,
        base_url: &str,
        input_mint: Pubkey,
        output_mint: Pubkey,
        amount: u64,
        slippage_bps: u16,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            input_mint,
            output_mint,
            amount,
            slippage_bps,
        }
    }

    async fn quote(&self) -> Result<Value, TransactionError> {
        let response = self
            .http_client
            .get(format!("{}/quote", self.base_url))
            .query(&[
                ("inputMint", self.input_mint.to_string()),
                ("outputMint", self.output_mint.to_string()),
                ("amount", self.amount.to_string()),
                ("slippageBps", self.slippage_bps.to_string()),
            ])
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let quote: Value = read_json(response, "quote").await?;
        if let Some(error) = quote.get("error").and_then(Value::as_str) {
            return Err(TransactionError::Build(format!("Quote failed: {}", error)));
        }
        Ok(quote)
    }
}

#[async_trait]
impl TransactionBuilder for SwapTransactionBuilder {
    #[instrument(skip(self), fields(
        input_mint = %self.input_mint,
        output_mint = %self.output_mint,
        amount = self.amount
    ))]
    async fn build(&self, payer: &Pubkey) -> Result<VersionedTransaction, TransactionError> {
        let quote = self.quote().await?;
        debug!(out_amount = ?quote.get("outAmount"), "Received swap quote");

        let response = self
            .http_client
            .post(format!("{}/swap", self.base_url))
            .json(&json!({
                "quoteResponse": quote,
                "userPublicKey": payer.to_string(),
                "wrapAndUnwrapSol": true,
                "dynamicComputeUnitLimit": true,
            }))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let swap: SwapResponse = read_json(response, "swap").await?;
        debug!(last_valid_block_height = ?swap.last_valid_block_height, "Received swap transaction");
        decode_transaction(&swap.swap_transaction)
    }

    fn name(&self) -> &'static str {
        "swap"
    }
}

//! Domain types with validation support.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::error::{TransactionError, TransactionErrorKind};

/// How finalized a chain state query must be
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }
}

impl std::str::FromStr for Commitment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processed" => Ok(Self::Processed),
            "confirmed" => Ok(Self::Confirmed),
            "finalized" => Ok(Self::Finalized),
            _ => Err(format!("Invalid commitment level: {}", s)),
        }
    }
}

impl std::fmt::Display for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stage of a transaction in the build-sign-send-confirm workflow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TxStage {
    /// Payload is being built locally or fetched from a remote endpoint
    #[default]
    Building,
    /// Wallet is signing the payload
    Signing,
    /// Signed payload is being broadcast with `sendTransaction`
    Sending,
    /// Waiting for the signature to reach the target commitment
    Confirming,
    /// Signature reached the target commitment
    Confirmed,
    /// Confirmation deadline passed; the transaction may still land
    TimedOut,
    /// Attempt aborted with a typed error
    Failed,
}

impl TxStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Building => "building",
            Self::Signing => "signing",
            Self::Sending => "sending",
            Self::Confirming => "confirming",
            Self::Confirmed => "confirmed",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::TimedOut | Self::Failed)
    }
}

impl std::str::FromStr for TxStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "building" => Ok(Self::Building),
            "signing" => Ok(Self::Signing),
            "sending" => Ok(Self::Sending),
            "confirming" => Ok(Self::Confirming),
            "confirmed" => Ok(Self::Confirmed),
            "timed_out" => Ok(Self::TimedOut),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid transaction stage: {}", s)),
        }
    }
}

impl std::fmt::Display for TxStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Options passed to `sendTransaction`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendOptions {
    pub skip_preflight: bool,
    pub preflight_commitment: Commitment,
    /// Node-side rebroadcast count; `None` leaves the node default
    pub max_retries: Option<usize>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            skip_preflight: false,
            preflight_commitment: Commitment::Confirmed,
            max_retries: None,
        }
    }
}

/// Entry of a `getSignatureStatuses` response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: u64,
    pub confirmations: Option<u64>,
    pub err: Option<serde_json::Value>,
    pub confirmation_status: Option<Commitment>,
}

impl SignatureStatus {
    /// Commitment reached by the signature.
    ///
    /// Nodes that omit `confirmationStatus` report rooted transactions with
    /// `confirmations: null`.
    #[must_use]
    pub fn effective_commitment(&self) -> Commitment {
        match (self.confirmation_status, self.confirmations) {
            (Some(level), _) => level,
            (None, None) => Commitment::Finalized,
            (None, Some(_)) => Commitment::Processed,
        }
    }

    #[must_use]
    pub fn reached(&self, target: Commitment) -> bool {
        self.effective_commitment() >= target
    }
}

/// Account state returned by `getAccountInfo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    /// Owning program (base58)
    pub owner: String,
    pub lamports: u64,
    pub data: Vec<u8>,
}

/// On-chain action requested by the game client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionRequest {
    /// Native SOL payment
    TransferSol { to_address: String, lamports: u64 },
    /// SPL token or NFT transfer; `amount` is in UI units (NFT = 1)
    TransferToken {
        to_address: String,
        mint: String,
        amount: f64,
    },
    /// Stake sent to a game escrow
    Wager {
        escrow_address: String,
        lamports: u64,
    },
    /// Token swap through the aggregator API; `amount` is in raw input units
    Swap {
        input_mint: String,
        output_mint: String,
        amount: u64,
        #[serde(default = "default_slippage_bps")]
        slippage_bps: u16,
    },
    /// Transaction produced by a named, server-configured endpoint
    /// (mint, marketplace buy, borrow, repay ...)
    Remote {
        endpoint: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
}

fn default_slippage_bps() -> u16 {
    50
}

impl ActionRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TransferSol { .. } => "transfer_sol",
            Self::TransferToken { .. } => "transfer_token",
            Self::Wager { .. } => "wager",
            Self::Swap { .. } => "swap",
            Self::Remote { .. } => "remote",
        }
    }
}

/// Request body for `POST /actions`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitActionRequest {
    #[serde(flatten)]
    pub action: ActionRequest,
    /// Opaque reference echoed back to the client (e.g. UI element id)
    #[validate(length(min = 1, max = 64, message = "Client reference must be 1-64 characters"))]
    pub client_reference: Option<String>,
}

impl SubmitActionRequest {
    #[must_use]
    pub fn new(action: ActionRequest) -> Self {
        Self {
            action,
            client_reference: None,
        }
    }
}

/// Persisted view of one action and its transaction lifecycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionRecord {
    pub id: String,
    pub kind: String,
    pub action: ActionRequest,
    pub client_reference: Option<String>,
    pub stage: TxStage,
    /// Signature of the most recent broadcast
    pub signature: Option<String>,
    /// Number of build-sign-send attempts started
    pub attempts: u32,
    pub last_error: Option<String>,
    pub error_kind: Option<TransactionErrorKind>,
    /// Program logs attached to an RPC rejection
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ActionRecord {
    #[must_use]
    pub fn new(id: String, request: &SubmitActionRequest) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind: request.action.kind().to_string(),
            action: request.action.clone(),
            client_reference: request.client_reference.clone(),
            stage: TxStage::Building,
            signature: None,
            attempts: 0,
            last_error: None,
            error_kind: None,
            logs: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a failure on this action
    pub fn fail_with(&mut self, error: &TransactionError) {
        self.stage = TxStage::Failed;
        self.last_error = Some(error.to_string());
        self.error_kind = Some(error.kind());
        self.logs = error.logs().to_vec();
        self.updated_at = Utc::now();
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, has_more: bool) -> Self {
        Self { items, has_more }
    }
}

/// Query parameters for `GET /actions`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ListParams {
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            limit: default_limit(),
        }
    }
}

/// Health status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub rpc: HealthStatus,
    /// Relayer wallet public key (base58)
    pub wallet: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    #[must_use]
    pub fn new(rpc: HealthStatus, wallet: String) -> Self {
        Self {
            status: rpc,
            rpc,
            wallet,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Error response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Error type identifier
    pub r#type: String,
    /// Human-readable error message
    pub message: String,
}

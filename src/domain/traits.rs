//! Domain traits defining contracts for external systems.

use async_trait::async_trait;
use solana_sdk::{hash::Hash, pubkey::Pubkey, transaction::VersionedTransaction};

use super::error::{AppError, TransactionError};
use super::types::{
    AccountInfo, ActionRecord, ActionRequest, SendOptions, SignatureStatus,
};

/// Chain RPC operations used by the workflow
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Check RPC connectivity
    async fn health_check(&self) -> Result<(), AppError>;

    /// Get latest blockhash for transaction construction
    async fn get_latest_blockhash(&self) -> Result<Hash, TransactionError>;

    /// Fetch an account; `Ok(None)` when it does not exist
    async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountInfo>, TransactionError>;

    /// Broadcast a signed transaction and return its signature
    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        options: &SendOptions,
    ) -> Result<String, TransactionError>;

    /// Look up the status of one signature; `Ok(None)` when the node has not seen it
    async fn get_signature_status(
        &self,
        signature: &str,
    ) -> Result<Option<SignatureStatus>, TransactionError>;

    /// Recent per-slot prioritization fees (micro-lamports per compute unit)
    async fn get_recent_prioritization_fees(
        &self,
        accounts: &[Pubkey],
    ) -> Result<Vec<u64>, TransactionError> {
        let _ = accounts;
        Ok(Vec::new())
    }
}

/// Produces the unsigned transaction for one action
#[async_trait]
pub trait TransactionBuilder: Send + Sync {
    /// Build a transaction paid for by `payer`.
    ///
    /// Called once per attempt, so every call must fetch fresh chain state
    /// (blockhash, account existence).
    async fn build(&self, payer: &Pubkey) -> Result<VersionedTransaction, TransactionError>;

    /// Human-readable builder name for logging
    fn name(&self) -> &'static str;
}

/// Wallet abstraction; key material never leaves the implementation
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    /// Return `transaction` with this wallet's signature filled in
    async fn sign_transaction(
        &self,
        transaction: VersionedTransaction,
    ) -> Result<VersionedTransaction, TransactionError>;
}

/// Maps an action request to the builder that produces its transaction
pub trait BuilderFactory: Send + Sync {
    fn builder_for(&self, action: &ActionRequest) -> Result<Box<dyn TransactionBuilder>, AppError>;
}

/// Persistence for action records
#[async_trait]
pub trait ActionStore: Send + Sync {
    async fn insert(&self, record: ActionRecord) -> Result<(), AppError>;

    async fn get(&self, id: &str) -> Result<Option<ActionRecord>, AppError>;

    /// Replace an existing record
    async fn update(&self, record: &ActionRecord) -> Result<(), AppError>;

    /// Most recently created records first
    async fn list_recent(&self, limit: usize) -> Result<Vec<ActionRecord>, AppError>;
}

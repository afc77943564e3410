//! Mock implementations for testing.

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    message::{Message, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use solana_system_interface::instruction as system_instruction;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::app::StageObserver;
use crate::domain::{
    AccountInfo, ActionRequest, AppError, BuilderFactory, ChainClient, Commitment, SendOptions,
    SignatureStatus, TransactionBuilder, TransactionError, TxStage, ValidationError, WalletSigner,
};

/// Configuration for mock behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    pub should_fail: bool,
    pub error_message: Option<String>,
}

impl MockConfig {
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            should_fail: true,
            error_message: Some(message.into()),
        }
    }

    fn message(&self) -> String {
        self.error_message
            .clone()
            .unwrap_or_else(|| "Mock error".to_string())
    }
}

fn confirmed_status() -> SignatureStatus {
    SignatureStatus {
        slot: 1,
        confirmations: Some(1),
        err: None,
        confirmation_status: Some(Commitment::Confirmed),
    }
}

/// Scriptable chain client.
///
/// Queued send results and statuses are consumed first; once a queue is empty
/// sends succeed with a generated signature and status polls return the
/// default status (confirmed unless built with [`MockChainClient::never_confirms`]).
/// Transactions whose send failed are never seen by the node unless a status
/// is queued for them.
pub struct MockChainClient {
    blockhash: Hash,
    blockhash_failures: Mutex<VecDeque<TransactionError>>,
    accounts: Mutex<HashMap<Pubkey, AccountInfo>>,
    send_results: Mutex<VecDeque<Result<String, TransactionError>>>,
    statuses: Mutex<VecDeque<Result<Option<SignatureStatus>, TransactionError>>>,
    default_status: Mutex<Option<SignatureStatus>>,
    prioritization_fees: Mutex<Vec<u64>>,
    unlanded: Mutex<HashSet<String>>,
    send_calls: AtomicU32,
    status_calls: AtomicU32,
    is_healthy: AtomicBool,
}

impl MockChainClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            blockhash: Hash::new_from_array([3u8; 32]),
            blockhash_failures: Mutex::new(VecDeque::new()),
            accounts: Mutex::new(HashMap::new()),
            send_results: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
            default_status: Mutex::new(Some(confirmed_status())),
            prioritization_fees: Mutex::new(Vec::new()),
            unlanded: Mutex::new(HashSet::new()),
            send_calls: AtomicU32::new(0),
            status_calls: AtomicU32::new(0),
            is_healthy: AtomicBool::new(true),
        }
    }

    /// Client whose signatures are never seen by the node
    #[must_use]
    pub fn never_confirms() -> Self {
        let client = Self::new();
        client.set_default_status(None);
        client
    }

    pub fn blockhash(&self) -> Hash {
        self.blockhash
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.is_healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn fail_next_blockhash(&self, error: TransactionError) {
        self.blockhash_failures.lock().unwrap().push_back(error);
    }

    pub fn set_account(&self, address: Pubkey, account: AccountInfo) {
        self.accounts.lock().unwrap().insert(address, account);
    }

    pub fn push_send_result(&self, result: Result<String, TransactionError>) {
        self.send_results.lock().unwrap().push_back(result);
    }

    pub fn push_status(&self, status: Result<Option<SignatureStatus>, TransactionError>) {
        self.statuses.lock().unwrap().push_back(status);
    }

    pub fn set_default_status(&self, status: Option<SignatureStatus>) {
        *self.default_status.lock().unwrap() = status;
    }

    pub fn set_prioritization_fees(&self, fees: Vec<u64>) {
        *self.prioritization_fees.lock().unwrap() = fees;
    }

    pub fn send_calls(&self) -> u32 {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockChainClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn health_check(&self) -> Result<(), AppError> {
        if !self.is_healthy.load(Ordering::Relaxed) {
            return Err(AppError::Transaction(TransactionError::Network(
                "Unhealthy".to_string(),
            )));
        }
        Ok(())
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, TransactionError> {
        if let Some(error) = self.blockhash_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(self.blockhash)
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountInfo>, TransactionError> {
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        _options: &SendOptions,
    ) -> Result<String, TransactionError> {
        let call = self.send_calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.send_results.lock().unwrap().pop_front() {
            Some(Err(error)) => {
                if let Some(signature) = transaction.signatures.first() {
                    self.unlanded.lock().unwrap().insert(signature.to_string());
                }
                Err(error)
            }
            Some(Ok(signature)) => Ok(signature),
            None => Ok(format!("mock_sig_{}", call)),
        }
    }

    async fn get_signature_status(
        &self,
        signature: &str,
    ) -> Result<Option<SignatureStatus>, TransactionError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(result) = self.statuses.lock().unwrap().pop_front() {
            return result;
        }
        if self.unlanded.lock().unwrap().contains(signature) {
            return Ok(None);
        }
        Ok(self.default_status.lock().unwrap().clone())
    }

    async fn get_recent_prioritization_fees(
        &self,
        _accounts: &[Pubkey],
    ) -> Result<Vec<u64>, TransactionError> {
        Ok(self.prioritization_fees.lock().unwrap().clone())
    }
}

/// Signer that fills slot 0 with a fixed signature
pub struct MockSigner {
    pubkey: Pubkey,
    config: MockConfig,
    sign_calls: AtomicU32,
}

impl MockSigner {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MockConfig::success())
    }

    #[must_use]
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            pubkey: Pubkey::new_unique(),
            config,
            sign_calls: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_config(MockConfig::failure(message))
    }

    pub fn sign_calls(&self) -> u32 {
        self.sign_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletSigner for MockSigner {
    fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    async fn sign_transaction(
        &self,
        mut transaction: VersionedTransaction,
    ) -> Result<VersionedTransaction, TransactionError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        if self.config.should_fail {
            return Err(TransactionError::Signing(self.config.message()));
        }
        if transaction.signatures.is_empty() {
            transaction.signatures.push(Signature::default());
        }
        transaction.signatures[0] = Signature::from([7u8; 64]);
        Ok(transaction)
    }
}

/// Builder returning queued results, then a SOL transfer to a fixed address.
///
/// Clones share their queue and call counter.
#[derive(Clone, Default)]
pub struct MockBuilder {
    results: Arc<Mutex<VecDeque<Result<(), TransactionError>>>>,
    build_calls: Arc<AtomicU32>,
}

impl MockBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome of the next build; `Ok(())` builds normally
    pub fn push_result(&self, result: Result<(), TransactionError>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub fn build_calls(&self) -> u32 {
        self.build_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionBuilder for MockBuilder {
    async fn build(&self, payer: &Pubkey) -> Result<VersionedTransaction, TransactionError> {
        self.build_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(Err(error)) = self.results.lock().unwrap().pop_front() {
            return Err(error);
        }
        let ix = system_instruction::transfer(payer, &Pubkey::new_from_array([9u8; 32]), 1_000);
        let message =
            Message::new_with_blockhash(&[ix], Some(payer), &Hash::new_from_array([3u8; 32]));
        Ok(VersionedTransaction {
            signatures: vec![Signature::default()],
            message: VersionedMessage::Legacy(message),
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Factory handing out clones of one [`MockBuilder`]
#[derive(Clone, Default)]
pub struct MockBuilderFactory {
    builder: MockBuilder,
    config: MockConfig,
}

impl MockBuilderFactory {
    #[must_use]
    pub fn new(builder: MockBuilder) -> Self {
        Self {
            builder,
            config: MockConfig::success(),
        }
    }

    /// Factory rejecting every action as invalid
    #[must_use]
    pub fn rejecting(message: impl Into<String>) -> Self {
        Self {
            builder: MockBuilder::new(),
            config: MockConfig::failure(message),
        }
    }
}

impl BuilderFactory for MockBuilderFactory {
    fn builder_for(&self, _action: &ActionRequest) -> Result<Box<dyn TransactionBuilder>, AppError> {
        if self.config.should_fail {
            return Err(AppError::Validation(ValidationError::InvalidField {
                field: "action".to_string(),
                message: self.config.message(),
            }));
        }
        Ok(Box::new(self.builder.clone()))
    }
}

/// Observer collecting every reported stage
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<(TxStage, u32, Option<String>)>>,
}

impl RecordingObserver {
    pub fn stages(&self) -> Vec<TxStage> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(stage, _, _)| *stage)
            .collect()
    }

    pub fn events(&self) -> Vec<(TxStage, u32, Option<String>)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl StageObserver for RecordingObserver {
    async fn on_stage(&self, stage: TxStage, attempt: u32, signature: Option<&str>) {
        self.events
            .lock()
            .unwrap()
            .push((stage, attempt, signature.map(str::to_string)));
    }
}

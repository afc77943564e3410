//! Build → sign → send → confirm state machine with retry on network errors.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    ChainClient, Commitment, ConfigError, SendOptions, TransactionBuilder, TransactionError,
    TxStage, WalletSigner, parse_env,
};

/// Tuning for the transaction workflow
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Total build-sign-send attempts, including the first
    pub max_attempts: u32,
    /// Flat delay between attempts
    pub retry_delay: Duration,
    pub poll_interval: Duration,
    pub confirmation_timeout: Duration,
    pub target_commitment: Commitment,
    pub send_options: SendOptions,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            poll_interval: Duration::from_secs(1),
            confirmation_timeout: Duration::from_secs(30),
            target_commitment: Commitment::Confirmed,
            send_options: SendOptions::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Read the `TX_*` variables, falling back to defaults for unset ones
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_attempts = parse_env::<u32>("TX_MAX_ATTEMPTS")?.unwrap_or(defaults.max_attempts);
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                name: "TX_MAX_ATTEMPTS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        let retry_delay = parse_env::<u64>("TX_RETRY_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_delay);
        let poll_interval = parse_env::<u64>("TX_POLL_INTERVAL_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval);
        if poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "TX_POLL_INTERVAL_MS".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        let confirmation_timeout = parse_env::<u64>("TX_CONFIRMATION_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.confirmation_timeout);
        let target_commitment =
            parse_env::<Commitment>("TX_COMMITMENT")?.unwrap_or(defaults.target_commitment);
        let skip_preflight = parse_env::<bool>("TX_SKIP_PREFLIGHT")?.unwrap_or(false);

        Ok(Self {
            max_attempts,
            retry_delay,
            poll_interval,
            confirmation_timeout,
            target_commitment,
            send_options: SendOptions {
                skip_preflight,
                preflight_commitment: target_commitment.min(Commitment::Confirmed),
                max_retries: defaults.send_options.max_retries,
            },
        })
    }
}

/// Terminal result of one action
#[derive(Debug, Clone, PartialEq)]
pub enum TxOutcome {
    Confirmed {
        signature: String,
        commitment: Commitment,
        attempts: u32,
    },
    /// The deadline passed before the target commitment was observed.
    /// The transaction may still land.
    TimedOut { signature: String, attempts: u32 },
    Failed {
        error: TransactionError,
        signature: Option<String>,
        attempts: u32,
    },
}

impl TxOutcome {
    pub fn stage(&self) -> TxStage {
        match self {
            Self::Confirmed { .. } => TxStage::Confirmed,
            Self::TimedOut { .. } => TxStage::TimedOut,
            Self::Failed { .. } => TxStage::Failed,
        }
    }

    pub fn signature(&self) -> Option<&str> {
        match self {
            Self::Confirmed { signature, .. } | Self::TimedOut { signature, .. } => {
                Some(signature)
            }
            Self::Failed { signature, .. } => signature.as_deref(),
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Confirmed { attempts, .. }
            | Self::TimedOut { attempts, .. }
            | Self::Failed { attempts, .. } => *attempts,
        }
    }
}

/// Result of polling one signature
#[derive(Debug, Clone, PartialEq)]
pub enum Confirmation {
    Reached(Commitment),
    /// The status carried an execution error
    Failed(TransactionError),
    TimedOut,
}

/// Failure of one build-sign-send pass
#[derive(Debug)]
struct AttemptError {
    error: TransactionError,
    /// Signature of a signed transaction whose send reply was lost
    unresolved: Option<String>,
}

impl From<TransactionError> for AttemptError {
    fn from(error: TransactionError) -> Self {
        Self {
            error,
            unresolved: None,
        }
    }
}

/// Receives every stage transition of an execution
#[async_trait]
pub trait StageObserver: Send + Sync {
    async fn on_stage(&self, stage: TxStage, attempt: u32, signature: Option<&str>);
}

/// Observer that ignores transitions
pub struct NoopObserver;

#[async_trait]
impl StageObserver for NoopObserver {
    async fn on_stage(&self, _stage: TxStage, _attempt: u32, _signature: Option<&str>) {}
}

/// Drives a builder through the transaction lifecycle
pub struct TransactionOrchestrator {
    chain: Arc<dyn ChainClient>,
    signer: Arc<dyn WalletSigner>,
    config: OrchestratorConfig,
}

impl TransactionOrchestrator {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        signer: Arc<dyn WalletSigner>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            chain,
            signer,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run `builder` to a terminal outcome.
    ///
    /// Network errors while building or sending restart the cycle with a
    /// fresh build, up to `max_attempts` in total. Once a transaction has been
    /// accepted by the node it is never resent. A send whose reply was lost is
    /// looked up by signature before the next attempt; if every attempt fails
    /// the last such signature is reported, since that transaction may still
    /// land.
    #[instrument(skip(self, builder, observer), fields(builder = builder.name()))]
    pub async fn execute(
        &self,
        builder: &dyn TransactionBuilder,
        observer: &dyn StageObserver,
    ) -> TxOutcome {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        let mut unresolved: Option<String> = None;

        let signature = loop {
            match self.submit_once(builder, observer, attempt).await {
                Ok(signature) => break signature,
                Err(failure) if failure.error.is_retryable() && attempt < max_attempts => {
                    warn!(
                        attempt = attempt,
                        max_attempts = max_attempts,
                        error = %failure.error,
                        "Network error, retrying transaction"
                    );
                    if failure.unresolved.is_some() {
                        unresolved = failure.unresolved;
                    }
                    tokio::time::sleep(self.config.retry_delay).await;
                    attempt += 1;
                }
                Err(AttemptError {
                    error,
                    unresolved: last,
                }) => {
                    let signature = last.or(unresolved);
                    warn!(
                        attempt = attempt,
                        error = %error,
                        kind = %error.kind(),
                        signature = ?signature,
                        "Transaction failed"
                    );
                    observer
                        .on_stage(TxStage::Failed, attempt, signature.as_deref())
                        .await;
                    return TxOutcome::Failed {
                        error,
                        signature,
                        attempts: attempt,
                    };
                }
            }
        };

        observer
            .on_stage(TxStage::Confirming, attempt, Some(&signature))
            .await;

        let outcome = match self.confirm(&signature).await {
            Confirmation::Reached(commitment) => {
                info!(signature = %signature, commitment = %commitment, attempts = attempt, "Transaction confirmed");
                TxOutcome::Confirmed {
                    signature,
                    commitment,
                    attempts: attempt,
                }
            }
            Confirmation::TimedOut => {
                warn!(
                    signature = %signature,
                    timeout_secs = self.config.confirmation_timeout.as_secs(),
                    "Confirmation timed out; transaction may still land"
                );
                TxOutcome::TimedOut {
                    signature,
                    attempts: attempt,
                }
            }
            Confirmation::Failed(error) => {
                warn!(signature = %signature, error = %error, "Transaction failed on chain");
                TxOutcome::Failed {
                    error,
                    signature: Some(signature),
                    attempts: attempt,
                }
            }
        };

        observer
            .on_stage(outcome.stage(), attempt, outcome.signature())
            .await;
        outcome
    }

    /// One build-sign-send pass, returning the broadcast signature
    async fn submit_once(
        &self,
        builder: &dyn TransactionBuilder,
        observer: &dyn StageObserver,
        attempt: u32,
    ) -> Result<String, AttemptError> {
        observer.on_stage(TxStage::Building, attempt, None).await;
        let unsigned = builder.build(&self.signer.pubkey()).await?;

        observer.on_stage(TxStage::Signing, attempt, None).await;
        let signed = self.signer.sign_transaction(unsigned).await?;
        let local_signature = signed.signatures.first().map(ToString::to_string);

        observer.on_stage(TxStage::Sending, attempt, None).await;
        match self
            .chain
            .send_transaction(&signed, &self.config.send_options)
            .await
        {
            Ok(signature) => {
                debug!(signature = %signature, attempt = attempt, "Transaction sent");
                Ok(signature)
            }
            Err(error) if error.is_retryable() => {
                let Some(signature) = local_signature else {
                    return Err(error.into());
                };
                if self.is_known(&signature).await {
                    info!(signature = %signature, error = %error, "Send reply lost but the node has the transaction");
                    return Ok(signature);
                }
                Err(AttemptError {
                    error,
                    unresolved: Some(signature),
                })
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Single status lookup after a send whose outcome is unknown
    async fn is_known(&self, signature: &str) -> bool {
        match self.chain.get_signature_status(signature).await {
            Ok(status) => status.is_some(),
            Err(e) => {
                warn!(signature = %signature, error = %e, "Status lookup after failed send failed");
                false
            }
        }
    }

    /// Poll `signature` until it reaches the target commitment or the
    /// confirmation timeout elapses.
    ///
    /// Poll failures are logged and polling continues.
    #[instrument(skip(self))]
    pub async fn confirm(&self, signature: &str) -> Confirmation {
        let target = self.config.target_commitment;
        let deadline = Instant::now() + self.config.confirmation_timeout;
        let mut polls = 0u32;

        loop {
            polls += 1;
            match self.chain.get_signature_status(signature).await {
                Ok(Some(status)) => {
                    if let Some(err) = &status.err {
                        return Confirmation::Failed(TransactionError::OnChain(err.to_string()));
                    }
                    if status.reached(target) {
                        return Confirmation::Reached(status.effective_commitment());
                    }
                    debug!(
                        polls = polls,
                        current = %status.effective_commitment(),
                        target = %target,
                        "Waiting for commitment"
                    );
                }
                Ok(None) => debug!(polls = polls, "Signature not yet visible"),
                Err(e) => warn!(polls = polls, error = %e, "Status poll failed"),
            }

            let now = Instant::now();
            if now >= deadline {
                return Confirmation::TimedOut;
            }
            tokio::time::sleep(self.config.poll_interval.min(deadline - now)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SignatureStatus;
    use crate::test_utils::{
        EnvScope, MockBuilder, MockChainClient, MockSigner, RecordingObserver,
    };

    const TX_VARS: [&str; 6] = [
        "TX_MAX_ATTEMPTS",
        "TX_RETRY_DELAY_MS",
        "TX_POLL_INTERVAL_MS",
        "TX_CONFIRMATION_TIMEOUT_SECS",
        "TX_COMMITMENT",
        "TX_SKIP_PREFLIGHT",
    ];

    /// Clears every `TX_*` variable, then applies `overrides`
    fn tx_env(overrides: &[(&'static str, &'static str)]) -> EnvScope {
        let mut vars: Vec<(&str, Option<&str>)> =
            TX_VARS.iter().map(|name| (*name, None)).collect();
        vars.extend(overrides.iter().map(|(name, value)| (*name, Some(*value))));
        EnvScope::new(&vars)
    }

    fn status(commitment: Option<Commitment>) -> SignatureStatus {
        // rooted transactions come back without confirmations
        SignatureStatus {
            slot: 10,
            confirmations: commitment.map(|_| 1),
            err: None,
            confirmation_status: commitment,
        }
    }

    /// Signature `MockSigner` puts on every transaction
    fn signed_signature() -> String {
        solana_sdk::signature::Signature::from([7u8; 64]).to_string()
    }

    fn orchestrator(chain: Arc<MockChainClient>) -> TransactionOrchestrator {
        TransactionOrchestrator::new(
            chain,
            Arc::new(MockSigner::new()),
            OrchestratorConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_happy_path_confirms() {
        let chain = Arc::new(MockChainClient::new());
        chain.push_status(Ok(None));
        chain.push_status(Ok(Some(status(Some(Commitment::Processed)))));
        chain.push_status(Ok(Some(status(Some(Commitment::Confirmed)))));
        let builder = MockBuilder::new();
        let observer = RecordingObserver::default();

        let outcome = orchestrator(chain.clone()).execute(&builder, &observer).await;

        match &outcome {
            TxOutcome::Confirmed {
                commitment,
                attempts,
                ..
            } => {
                assert_eq!(*commitment, Commitment::Confirmed);
                assert_eq!(*attempts, 1);
            }
            other => panic!("Expected confirmation, got {:?}", other),
        }
        assert_eq!(chain.status_calls(), 3);
        assert_eq!(
            observer.stages(),
            vec![
                TxStage::Building,
                TxStage::Signing,
                TxStage::Sending,
                TxStage::Confirming,
                TxStage::Confirmed,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_errors_retry_up_to_max_attempts() {
        let chain = Arc::new(MockChainClient::new());
        for _ in 0..3 {
            chain.push_send_result(Err(TransactionError::Network("connection reset".into())));
        }
        let builder = MockBuilder::new();
        let started = Instant::now();

        let outcome = orchestrator(chain.clone())
            .execute(&builder, &NoopObserver)
            .await;

        match outcome {
            TxOutcome::Failed {
                error,
                attempts,
                signature,
            } => {
                assert!(error.is_retryable());
                assert_eq!(attempts, 3);
                assert_eq!(signature, Some(signed_signature()));
            }
            other => panic!("Expected failure, got {:?}", other),
        }
        assert_eq!(builder.build_calls(), 3);
        assert_eq!(chain.send_calls(), 3);
        // one lookup per lost send
        assert_eq!(chain.status_calls(), 3);
        // two flat delays between three attempts
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_error_then_success() {
        let chain = Arc::new(MockChainClient::new());
        let builder = MockBuilder::new();
        builder.push_result(Err(TransactionError::Network("dns failure".into())));

        let outcome = orchestrator(chain.clone())
            .execute(&builder, &NoopObserver)
            .await;

        assert_eq!(outcome.stage(), TxStage::Confirmed);
        assert_eq!(outcome.attempts(), 2);
        assert_eq!(builder.build_calls(), 2);
        assert_eq!(chain.send_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_send_reply_is_not_resent_when_node_has_transaction() {
        let chain = Arc::new(MockChainClient::new());
        chain.push_send_result(Err(TransactionError::Network("connection reset by peer".into())));
        // seen by the lookup after the failed send, then by the first poll
        chain.push_status(Ok(Some(status(Some(Commitment::Processed)))));
        chain.push_status(Ok(Some(status(Some(Commitment::Confirmed)))));
        let builder = MockBuilder::new();
        let signer = Arc::new(MockSigner::new());
        let orchestrator = TransactionOrchestrator::new(
            chain.clone(),
            signer.clone(),
            OrchestratorConfig::default(),
        );

        let outcome = orchestrator.execute(&builder, &NoopObserver).await;

        match &outcome {
            TxOutcome::Confirmed {
                signature,
                attempts,
                ..
            } => {
                assert_eq!(*signature, signed_signature());
                assert_eq!(*attempts, 1);
            }
            other => panic!("Expected confirmation, got {:?}", other),
        }
        assert_eq!(chain.send_calls(), 1);
        assert_eq!(builder.build_calls(), 1);
        assert_eq!(signer.sign_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_send_reply_rebuilds_when_node_has_not_seen_it() {
        let chain = Arc::new(MockChainClient::new());
        chain.push_send_result(Err(TransactionError::Network("connection reset by peer".into())));
        let builder = MockBuilder::new();
        let observer = RecordingObserver::default();

        let outcome = orchestrator(chain.clone()).execute(&builder, &observer).await;

        assert_eq!(outcome.stage(), TxStage::Confirmed);
        assert_eq!(outcome.attempts(), 2);
        assert_eq!(outcome.signature(), Some("mock_sig_2"));
        assert_eq!(chain.send_calls(), 2);
        let attempts: Vec<u32> = observer
            .events()
            .iter()
            .filter(|(stage, _, _)| *stage == TxStage::Sending)
            .map(|(_, attempt, _)| *attempt)
            .collect();
        assert_eq!(attempts, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unresolved_signature_survives_later_failure() {
        let chain = Arc::new(MockChainClient::new());
        chain.push_send_result(Err(TransactionError::Network("broken pipe".into())));
        let builder = MockBuilder::new();
        builder.push_result(Ok(()));
        builder.push_result(Err(TransactionError::Build("mint closed".into())));
        let observer = RecordingObserver::default();

        let outcome = orchestrator(chain.clone()).execute(&builder, &observer).await;

        match &outcome {
            TxOutcome::Failed {
                error: TransactionError::Build(_),
                signature: Some(signature),
                attempts: 2,
            } => assert_eq!(*signature, signed_signature()),
            other => panic!("Expected build failure with signature, got {:?}", other),
        }
        assert_eq!(
            observer.events().last(),
            Some(&(TxStage::Failed, 2, Some(signed_signature())))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rpc_error_fails_without_retry() {
        let chain = Arc::new(MockChainClient::new());
        chain.push_send_result(Err(TransactionError::Rpc {
            code: -32002,
            message: "Transaction simulation failed".into(),
            logs: vec!["Program log: insufficient funds".into()],
        }));
        let builder = MockBuilder::new();

        let outcome = orchestrator(chain.clone())
            .execute(&builder, &NoopObserver)
            .await;

        match outcome {
            TxOutcome::Failed {
                error,
                attempts,
                signature,
            } => {
                assert_eq!(attempts, 1);
                assert!(signature.is_none());
                assert_eq!(error.logs().len(), 1);
            }
            other => panic!("Expected failure, got {:?}", other),
        }
        assert_eq!(builder.build_calls(), 1);
        assert_eq!(chain.send_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_build_and_signing_errors_fail_immediately() {
        let chain = Arc::new(MockChainClient::new());
        let builder = MockBuilder::new();
        builder.push_result(Err(TransactionError::Build("bad input".into())));
        let outcome = orchestrator(chain.clone())
            .execute(&builder, &NoopObserver)
            .await;
        assert_eq!(outcome.stage(), TxStage::Failed);
        assert_eq!(builder.build_calls(), 1);

        let orchestrator = TransactionOrchestrator::new(
            chain.clone(),
            Arc::new(MockSigner::failing("wallet locked")),
            OrchestratorConfig::default(),
        );
        let outcome = orchestrator.execute(&MockBuilder::new(), &NoopObserver).await;
        assert!(matches!(
            outcome,
            TxOutcome::Failed {
                error: TransactionError::Signing(_),
                attempts: 1,
                ..
            }
        ));
        assert_eq!(chain.send_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_not_failure() {
        let chain = Arc::new(MockChainClient::never_confirms());
        let builder = MockBuilder::new();
        let observer = RecordingObserver::default();
        let started = Instant::now();

        let outcome = orchestrator(chain.clone()).execute(&builder, &observer).await;

        match &outcome {
            TxOutcome::TimedOut {
                signature,
                attempts,
            } => {
                assert!(!signature.is_empty());
                assert_eq!(*attempts, 1);
            }
            other => panic!("Expected timeout, got {:?}", other),
        }
        assert_eq!(started.elapsed(), Duration::from_secs(30));
        assert_eq!(chain.send_calls(), 1);
        assert_eq!(observer.stages().last(), Some(&TxStage::TimedOut));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_errors_do_not_abort_confirmation() {
        let chain = Arc::new(MockChainClient::new());
        chain.push_status(Err(TransactionError::Network("timed out".into())));
        chain.push_status(Err(TransactionError::Rpc {
            code: -32005,
            message: "Node is behind".into(),
            logs: vec![],
        }));
        chain.push_status(Ok(Some(status(Some(Commitment::Finalized)))));

        let confirmation = orchestrator(chain.clone()).confirm("sig").await;
        assert_eq!(confirmation, Confirmation::Reached(Commitment::Finalized));
        assert_eq!(chain.status_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_chain_error_fails_with_signature() {
        let chain = Arc::new(MockChainClient::new());
        chain.push_status(Ok(Some(SignatureStatus {
            slot: 5,
            confirmations: Some(0),
            err: Some(serde_json::json!({"InstructionError": [0, "Custom"]})),
            confirmation_status: Some(Commitment::Confirmed),
        })));

        let outcome = orchestrator(chain.clone())
            .execute(&MockBuilder::new(), &NoopObserver)
            .await;

        match outcome {
            TxOutcome::Failed {
                error: TransactionError::OnChain(_),
                signature: Some(_),
                attempts: 1,
            } => {}
            other => panic!("Expected on-chain failure, got {:?}", other),
        }
        assert_eq!(chain.send_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finalized_target_waits_past_confirmed() {
        let chain = Arc::new(MockChainClient::new());
        chain.push_status(Ok(Some(status(Some(Commitment::Confirmed)))));
        chain.push_status(Ok(Some(status(None))));
        let config = OrchestratorConfig {
            target_commitment: Commitment::Finalized,
            ..OrchestratorConfig::default()
        };
        let orchestrator =
            TransactionOrchestrator::new(chain.clone(), Arc::new(MockSigner::new()), config);

        let confirmation = orchestrator.confirm("sig").await;
        assert_eq!(confirmation, Confirmation::Reached(Commitment::Finalized));
        assert_eq!(chain.status_calls(), 2);
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome = TxOutcome::TimedOut {
            signature: "abc".into(),
            attempts: 2,
        };
        assert_eq!(outcome.stage(), TxStage::TimedOut);
        assert_eq!(outcome.signature(), Some("abc"));
        assert_eq!(outcome.attempts(), 2);

        let outcome = TxOutcome::Failed {
            error: TransactionError::Build("x".into()),
            signature: None,
            attempts: 1,
        };
        assert_eq!(outcome.stage(), TxStage::Failed);
        assert_eq!(outcome.signature(), None);
    }

    #[test]
    fn test_config_from_env_defaults() {
        let _env = tx_env(&[]);
        let config = OrchestratorConfig::from_env().unwrap();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(2));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.confirmation_timeout, Duration::from_secs(30));
        assert_eq!(config.target_commitment, Commitment::Confirmed);
        assert!(!config.send_options.skip_preflight);
    }

    #[test]
    fn test_config_from_env_overrides() {
        let _env = tx_env(&[
            ("TX_MAX_ATTEMPTS", "5"),
            ("TX_RETRY_DELAY_MS", "250"),
            ("TX_POLL_INTERVAL_MS", "400"),
            ("TX_CONFIRMATION_TIMEOUT_SECS", "90"),
            ("TX_SKIP_PREFLIGHT", "true"),
        ]);
        let config = OrchestratorConfig::from_env().unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.retry_delay, Duration::from_millis(250));
        assert_eq!(config.poll_interval, Duration::from_millis(400));
        assert_eq!(config.confirmation_timeout, Duration::from_secs(90));
        assert!(config.send_options.skip_preflight);
    }

    #[test]
    fn test_preflight_commitment_capped_at_confirmed() {
        {
            let _env = tx_env(&[("TX_COMMITMENT", "finalized")]);
            let config = OrchestratorConfig::from_env().unwrap();
            assert_eq!(config.target_commitment, Commitment::Finalized);
            assert_eq!(config.send_options.preflight_commitment, Commitment::Confirmed);
        }
        let _env = tx_env(&[("TX_COMMITMENT", "processed")]);
        let config = OrchestratorConfig::from_env().unwrap();
        assert_eq!(config.send_options.preflight_commitment, Commitment::Processed);
    }

    #[test]
    fn test_config_from_env_rejects_invalid_values() {
        for (name, value) in [
            ("TX_MAX_ATTEMPTS", "0"),
            ("TX_MAX_ATTEMPTS", "three"),
            ("TX_POLL_INTERVAL_MS", "0"),
            ("TX_RETRY_DELAY_MS", "-1"),
            ("TX_COMMITMENT", "instant"),
            ("TX_SKIP_PREFLIGHT", "maybe"),
        ] {
            let _env = tx_env(&[(name, value)]);
            match OrchestratorConfig::from_env() {
                Err(ConfigError::InvalidValue { name: reported, .. }) => {
                    assert_eq!(reported, name)
                }
                other => panic!("{}={} should be rejected, got {:?}", name, value, other),
            }
        }
    }
}

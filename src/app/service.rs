//! Application service: persists actions and drives them through the orchestrator.

use async_trait::async_trait;
use chrono::Utc;
use solana_sdk::signature::Signature;
use std::sync::{Arc, Mutex};
use tracing::{Instrument, error, info, info_span, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::orchestrator::{StageObserver, TransactionOrchestrator, TxOutcome};
use crate::domain::{
    ActionRecord, ActionStore, AppError, BuilderFactory, ChainClient, HealthResponse,
    HealthStatus, ListParams, PaginatedResponse, SignatureStatus, SubmitActionRequest,
    TransactionBuilder, TxStage, ValidationError,
};

/// Application service containing business logic
pub struct AppService {
    store: Arc<dyn ActionStore>,
    chain: Arc<dyn ChainClient>,
    factory: Arc<dyn BuilderFactory>,
    orchestrator: Arc<TransactionOrchestrator>,
    wallet: String,
}

impl AppService {
    #[must_use]
    pub fn new(
        store: Arc<dyn ActionStore>,
        chain: Arc<dyn ChainClient>,
        factory: Arc<dyn BuilderFactory>,
        orchestrator: Arc<TransactionOrchestrator>,
        wallet: String,
    ) -> Self {
        Self {
            store,
            chain,
            factory,
            orchestrator,
            wallet,
        }
    }

    /// Validate and persist an action, then execute it in the background.
    ///
    /// Returns the record in its initial `building` stage.
    #[instrument(skip(self, request), fields(kind = request.action.kind()))]
    pub async fn submit_action(
        self: &Arc<Self>,
        request: &SubmitActionRequest,
    ) -> Result<ActionRecord, AppError> {
        let (record, builder) = self.prepare(request).await?;
        info!(id = %record.id, "Action accepted for background execution");

        let service = Arc::clone(self);
        let accepted = record.clone();
        let span = info_span!("action", id = %record.id, kind = %record.kind);
        tokio::spawn(
            async move {
                service.drive(record, builder).await;
            }
            .instrument(span),
        );

        Ok(accepted)
    }

    /// Validate, persist and execute an action to a terminal stage
    #[instrument(skip(self, request), fields(kind = request.action.kind()))]
    pub async fn run_action(&self, request: &SubmitActionRequest) -> Result<ActionRecord, AppError> {
        let (record, builder) = self.prepare(request).await?;
        Ok(self.drive(record, builder).await)
    }

    async fn prepare(
        &self,
        request: &SubmitActionRequest,
    ) -> Result<(ActionRecord, Box<dyn TransactionBuilder>), AppError> {
        request.validate().map_err(|e| {
            warn!(error = %e, "Validation failed");
            AppError::Validation(ValidationError::Multiple(e.to_string()))
        })?;

        // Resolve the builder before persisting so invalid actions never get an id
        let builder = self.factory.builder_for(&request.action)?;

        let record = ActionRecord::new(Uuid::now_v7().to_string(), request);
        self.store.insert(record.clone()).await?;
        Ok((record, builder))
    }

    async fn drive(&self, record: ActionRecord, builder: Box<dyn TransactionBuilder>) -> ActionRecord {
        let observer = RecordObserver::new(Arc::clone(&self.store), record);
        let outcome = self.orchestrator.execute(builder.as_ref(), &observer).await;

        let mut record = observer.into_record();
        apply_outcome(&mut record, &outcome);
        if let Err(e) = self.store.update(&record).await {
            error!(id = %record.id, error = %e, "Failed to persist action outcome");
        }

        info!(
            id = %record.id,
            stage = %record.stage,
            attempts = record.attempts,
            signature = ?record.signature,
            "Action finished"
        );
        record
    }

    /// Get an action by ID
    #[instrument(skip(self))]
    pub async fn get_action(&self, id: &str) -> Result<ActionRecord, AppError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Action {}", id)))
    }

    /// Most recent actions first
    #[instrument(skip(self))]
    pub async fn list_actions(
        &self,
        params: &ListParams,
    ) -> Result<PaginatedResponse<ActionRecord>, AppError> {
        params
            .validate()
            .map_err(|e| AppError::Validation(ValidationError::Multiple(e.to_string())))?;

        let mut items = self.store.list_recent(params.limit + 1).await?;
        let has_more = items.len() > params.limit;
        items.truncate(params.limit);
        Ok(PaginatedResponse::new(items, has_more))
    }

    /// Current chain status of a signature, for callers whose action timed out
    #[instrument(skip(self))]
    pub async fn signature_status(&self, signature: &str) -> Result<SignatureStatus, AppError> {
        signature.parse::<Signature>().map_err(|e| {
            AppError::Validation(ValidationError::InvalidField {
                field: "signature".to_string(),
                message: e.to_string(),
            })
        })?;

        self.chain
            .get_signature_status(signature)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Signature {}", signature)))
    }

    /// Perform health check on the RPC node
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> HealthResponse {
        let rpc = match self.chain.health_check().await {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => {
                warn!(error = %e, "RPC health check failed");
                HealthStatus::Unhealthy
            }
        };
        HealthResponse::new(rpc, self.wallet.clone())
    }
}

fn apply_outcome(record: &mut ActionRecord, outcome: &TxOutcome) {
    record.attempts = outcome.attempts();
    if let Some(signature) = outcome.signature() {
        record.signature = Some(signature.to_string());
    }
    match outcome {
        TxOutcome::Failed { error, .. } => record.fail_with(error),
        TxOutcome::Confirmed { .. } | TxOutcome::TimedOut { .. } => {
            record.stage = outcome.stage();
            record.last_error = None;
            record.error_kind = None;
            record.logs.clear();
            record.updated_at = Utc::now();
        }
    }
}

/// Persists every stage transition of one action
struct RecordObserver {
    store: Arc<dyn ActionStore>,
    record: Mutex<ActionRecord>,
}

impl RecordObserver {
    fn new(store: Arc<dyn ActionStore>, record: ActionRecord) -> Self {
        Self {
            store,
            record: Mutex::new(record),
        }
    }

    fn into_record(self) -> ActionRecord {
        self.record
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl StageObserver for RecordObserver {
    async fn on_stage(&self, stage: TxStage, attempt: u32, signature: Option<&str>) {
        let snapshot = {
            let mut record = self
                .record
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            record.stage = stage;
            record.attempts = attempt;
            if let Some(signature) = signature {
                record.signature = Some(signature.to_string());
            }
            record.updated_at = Utc::now();
            record.clone()
        };

        if let Err(e) = self.store.update(&snapshot).await {
            error!(id = %snapshot.id, stage = %stage, error = %e, "Failed to persist stage");
        }
    }
}

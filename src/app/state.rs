//! Application state management.

use std::sync::Arc;

use crate::domain::{ActionStore, BuilderFactory, ChainClient, WalletSigner};

use super::orchestrator::{OrchestratorConfig, TransactionOrchestrator};
use super::service::AppService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AppService>,
}

impl AppState {
    /// Wire the service from its collaborators
    #[must_use]
    pub fn new(
        store: Arc<dyn ActionStore>,
        chain_client: Arc<dyn ChainClient>,
        signer: Arc<dyn WalletSigner>,
        factory: Arc<dyn BuilderFactory>,
        config: OrchestratorConfig,
    ) -> Self {
        let wallet = signer.pubkey().to_string();
        let orchestrator = Arc::new(TransactionOrchestrator::new(
            Arc::clone(&chain_client),
            signer,
            config,
        ));
        let service = Arc::new(AppService::new(
            store,
            chain_client,
            factory,
            orchestrator,
            wallet,
        ));
        Self { service }
    }
}

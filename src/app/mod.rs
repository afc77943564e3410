//! Application layer containing business logic and shared state.

pub mod orchestrator;
pub mod service;
pub mod state;

pub use orchestrator::{
    Confirmation, NoopObserver, OrchestratorConfig, StageObserver, TransactionOrchestrator,
    TxOutcome,
};
pub use service::AppService;
pub use state::AppState;

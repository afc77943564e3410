//! Domain layer containing core business types, traits, and error definitions.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{
    AppError, ConfigError, TransactionError, TransactionErrorKind, ValidationError,
    classify_transport_error, is_network_error_text, parse_env,
};
pub use traits::{ActionStore, BuilderFactory, ChainClient, TransactionBuilder, WalletSigner};
pub use types::{
    AccountInfo, ActionRecord, ActionRequest, Commitment, ErrorDetail, ErrorResponse,
    HealthResponse, HealthStatus, ListParams, PaginatedResponse, SendOptions, SignatureStatus,
    SubmitActionRequest, TxStage,
};

//! Infrastructure layer implementations.

pub mod blockchain;
pub mod store;

pub use blockchain::{
    DefaultBuilderFactory, KeypairSigner, RecentFeesStrategy, RpcChainClient, RpcClientConfig,
    StaticFeeStrategy, signing_key_from_base58,
};
pub use store::{DEFAULT_MAX_RECORDS, InMemoryActionStore};

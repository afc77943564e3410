//! Blockchain client implementations.
//!
//! JSON-RPC access, the wallet signer, priority fees and the transaction
//! builders for every action kind.

pub mod builders;
pub mod codec;
pub mod fees;
pub mod remote;
pub mod solana;
pub mod wallet;

pub use builders::{
    DefaultBuilderFactory, SolTransferBuilder, TokenTransferBuilder, parse_endpoint_map,
};
pub use codec::{decode_transaction, encode_transaction};
pub use fees::{DEFAULT_PRIORITY_FEE, FeeStrategy, RecentFeesStrategy, StaticFeeStrategy};
pub use remote::{RemoteTransactionBuilder, SwapTransactionBuilder};
pub use solana::{HttpRpcTransport, RpcChainClient, RpcClientConfig, RpcTransport};
pub use wallet::{KeypairSigner, signing_key_from_base58};

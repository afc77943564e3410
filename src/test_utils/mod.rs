//! Test doubles shared by unit and integration tests.

pub mod env;
pub mod mocks;

pub use env::EnvScope;
pub use mocks::{
    MockBuilder, MockBuilderFactory, MockChainClient, MockConfig, MockSigner, RecordingObserver,
};

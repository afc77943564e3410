//! Gallery hub transaction relayer.
//!
//! Builds, signs, sends and confirms the on-chain actions requested by the
//! game client (payments, token and NFT transfers, wagers, swaps and
//! endpoint-built transactions such as mints or loans).

pub mod api;
pub mod app;
pub mod domain;
pub mod infra;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

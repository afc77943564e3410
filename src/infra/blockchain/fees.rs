//! Priority fee strategies.
//!
//! Local builders prepend a compute-unit price instruction. The price either
//! comes from configuration or from the node's recent prioritization fees.

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::debug;

use crate::domain::ChainClient;

/// Fallback compute-unit price (micro-lamports)
pub const DEFAULT_PRIORITY_FEE: u64 = 100;

/// Strategy for estimating priority fees
#[async_trait]
pub trait FeeStrategy: Send + Sync {
    /// Recommended compute-unit price in micro-lamports for a transaction
    /// writing to `accounts`
    async fn get_priority_fee(&self, accounts: &[Pubkey]) -> u64;

    /// Human-readable strategy name for logging
    fn name(&self) -> &'static str;
}

/// Fixed compute-unit price
#[derive(Debug, Clone, Copy)]
pub struct StaticFeeStrategy {
    micro_lamports: u64,
}

impl StaticFeeStrategy {
    pub fn new(micro_lamports: u64) -> Self {
        Self { micro_lamports }
    }
}

impl Default for StaticFeeStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_PRIORITY_FEE)
    }
}

#[async_trait]
impl FeeStrategy for StaticFeeStrategy {
    async fn get_priority_fee(&self, _accounts: &[Pubkey]) -> u64 {
        self.micro_lamports
    }

    fn name(&self) -> &'static str {
        "Static"
    }
}

/// Percentile of `getRecentPrioritizationFees`, falling back to a default
pub struct RecentFeesStrategy {
    chain: Arc<dyn ChainClient>,
    percentile: u8,
    fallback: u64,
}

impl RecentFeesStrategy {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self {
            chain,
            percentile: 75,
            fallback: DEFAULT_PRIORITY_FEE,
        }
    }

    #[must_use]
    pub fn with_percentile(mut self, percentile: u8) -> Self {
        self.percentile = percentile.min(100);
        self
    }
}

#[async_trait]
impl FeeStrategy for RecentFeesStrategy {
    async fn get_priority_fee(&self, accounts: &[Pubkey]) -> u64 {
        match self.chain.get_recent_prioritization_fees(accounts).await {
            Ok(fees) => match percentile(fees, self.percentile) {
                Some(fee) => fee.max(self.fallback),
                None => {
                    debug!("No recent prioritization fees, using fallback");
                    self.fallback
                }
            },
            Err(e) => {
                debug!(error = %e, fallback = self.fallback, "Prioritization fee lookup failed, using fallback");
                self.fallback
            }
        }
    }

    fn name(&self) -> &'static str {
        "Recent prioritization fees"
    }
}

/// Nearest-rank percentile; `None` for an empty sample
fn percentile(mut values: Vec<u64>, pct: u8) -> Option<u64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let rank = (usize::from(pct) * values.len()).div_ceil(100).max(1);
    values.get(rank - 1).copied()
}

//! Integration seams for market data, strategy storage, and order flow.

use anyhow::Result;
use async_trait::async_trait;
use exit_core::types::{ExitStrategy, PricePoint};
use uuid::Uuid;

use crate::monitor::ExitIntent;

/// Source of current prices for watched tokens.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Latest observed price for a token, or an error if the feed has
    /// nothing for it.
    async fn latest_price(&self, token: &str) -> Result<PricePoint>;
}

/// Lookup of strategy definitions by ID.
#[async_trait]
pub trait ExitStrategyStore: Send + Sync {
    async fn get_strategy(&self, strategy_id: Uuid) -> Result<ExitStrategy>;
}

/// Downstream sink for exit intents.
#[async_trait]
pub trait OrderSubmission: Send + Sync {
    async fn submit_exit(&self, intent: &ExitIntent) -> Result<()>;
}

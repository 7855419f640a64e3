//! Exit monitor: retained simulation state per watched position.
//!
//! Each watched position carries its own [`SimulationState`], stepped
//! incrementally as prices arrive. The monitor never replays history on a
//! tick, so per-price work is constant regardless of how long a position
//! has been open.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use exit_core::types::{ExitStrategy, Position, PricePoint, TriggerReason};
use rust_decimal::Decimal;
use sim_engine::{PositionSimulationEngine, SimulationState};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::MonitorConfig;
use crate::traits::{ExitStrategyStore, OrderSubmission, PriceFeed};

/// An exit the monitor wants executed.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExitIntent {
    pub position_id: Uuid,
    pub token: String,
    /// Percentage of the original position to liquidate.
    pub exit_pct: Decimal,
    pub reason: TriggerReason,
    pub price_at_trigger: Decimal,
    pub timestamp: DateTime<Utc>,
}

struct WatchedPosition {
    position: Position,
    strategy: ExitStrategy,
    state: SimulationState,
}

/// Watches open positions and emits exit intents when rules fire.
pub struct ExitMonitor {
    engine: PositionSimulationEngine,
    /// Watched positions keyed by position ID.
    watched: DashMap<Uuid, WatchedPosition>,
    strategies: Arc<dyn ExitStrategyStore>,
    orders: Arc<dyn OrderSubmission>,
    /// Channel for emitted intents.
    intent_tx: mpsc::Sender<ExitIntent>,
    /// Receiver for emitted intents (taken once).
    intent_rx: Option<mpsc::Receiver<ExitIntent>>,
    running: Arc<AtomicBool>,
}

impl ExitMonitor {
    pub fn new(strategies: Arc<dyn ExitStrategyStore>, orders: Arc<dyn OrderSubmission>) -> Self {
        let (intent_tx, intent_rx) = mpsc::channel(1000);
        Self {
            engine: PositionSimulationEngine::new(),
            watched: DashMap::new(),
            strategies,
            orders,
            intent_tx,
            intent_rx: Some(intent_rx),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Take the intent receiver (can only be called once).
    pub fn take_intent_receiver(&mut self) -> Option<mpsc::Receiver<ExitIntent>> {
        self.intent_rx.take()
    }

    /// Start watching a position under the stored strategy.
    pub async fn watch(&self, position: Position, strategy_id: Uuid) -> anyhow::Result<()> {
        let strategy = self.strategies.get_strategy(strategy_id).await?;
        let state = self.engine.begin(&position, &strategy)?;

        info!(
            position_id = %position.id,
            token = %position.token,
            strategy = %strategy.name,
            "watching position"
        );

        self.watched.insert(
            position.id,
            WatchedPosition {
                position,
                strategy,
                state,
            },
        );
        Ok(())
    }

    /// Stop watching a position. Returns its retained state, if any.
    pub fn unwatch(&self, position_id: Uuid) -> Option<SimulationState> {
        let removed = self.watched.remove(&position_id).map(|(_, w)| w.state);
        if removed.is_some() {
            info!(position_id = %position_id, "stopped watching position");
        }
        removed
    }

    pub fn watched_count(&self) -> usize {
        self.watched.len()
    }

    /// Feed one price into a watched position's retained state.
    ///
    /// Fired triggers become exit intents, submitted downstream and
    /// broadcast on the intent channel. A fully exited position is
    /// evicted from the watch set.
    pub async fn on_price(
        &self,
        position_id: Uuid,
        point: PricePoint,
    ) -> anyhow::Result<Vec<ExitIntent>> {
        // Step synchronously under the map guard, then release it before
        // any await.
        let (intents, terminated) = {
            let mut entry = match self.watched.get_mut(&position_id) {
                Some(e) => e,
                None => return Ok(Vec::new()),
            };
            let watched = entry.value_mut();
            let fired = self.engine.step(
                &mut watched.state,
                &watched.position,
                &watched.strategy,
                &point,
            )?;

            let intents: Vec<ExitIntent> = fired
                .iter()
                .map(|t| ExitIntent {
                    position_id,
                    token: watched.position.token.clone(),
                    exit_pct: t.exit_pct_applied,
                    reason: t.reason,
                    price_at_trigger: t.price,
                    timestamp: t.timestamp,
                })
                .collect();
            (intents, watched.state.is_terminated())
        };

        for intent in &intents {
            if let Err(e) = self.orders.submit_exit(intent).await {
                warn!(
                    position_id = %position_id,
                    reason = %intent.reason,
                    error = %e,
                    "exit submission failed"
                );
            }
            if let Err(e) = self.intent_tx.try_send(intent.clone()) {
                warn!(position_id = %position_id, error = %e, "intent channel full, dropping");
            }
        }

        if terminated {
            self.watched.remove(&position_id);
            info!(position_id = %position_id, "position fully exited, evicted from watch set");
        }

        Ok(intents)
    }

    /// Request the polling loop to stop after its current pass.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Poll the price feed on an interval, stepping every watched
    /// position. Runs until [`shutdown`](Self::shutdown) is called.
    pub async fn run(&self, config: MonitorConfig, feed: Arc<dyn PriceFeed>) {
        if !config.enabled {
            info!("exit monitor disabled, not polling");
            return;
        }

        info!(
            poll_interval_secs = config.poll_interval_secs,
            "exit monitor started"
        );
        let mut tick =
            tokio::time::interval(tokio::time::Duration::from_secs(config.poll_interval_secs));

        while self.running.load(Ordering::SeqCst) {
            tick.tick().await;

            let targets: Vec<(Uuid, String)> = self
                .watched
                .iter()
                .map(|e| (e.key().to_owned(), e.value().position.token.clone()))
                .collect();

            for (position_id, token) in targets {
                let point = match feed.latest_price(&token).await {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(token = %token, error = %e, "price poll failed, skipping tick");
                        continue;
                    }
                };
                if let Err(e) = self.on_price(position_id, point).await {
                    warn!(position_id = %position_id, error = %e, "price step rejected");
                }
            }
            debug!("poll pass complete");
        }

        info!("exit monitor stopped");
    }
}

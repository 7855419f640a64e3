//! Simulation output types: triggers, per-run results, batch aggregates.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::strategy::RuleKind;

/// Entry context for one position under simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    /// Token or instrument the position holds.
    pub token: String,
    pub entry_price: Decimal,
    pub entry_time: DateTime<Utc>,
}

impl Position {
    pub fn new(
        token: impl Into<String>,
        entry_price: Decimal,
        entry_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            token: token.into(),
            entry_price,
            entry_time,
        }
    }
}

/// Why an exit fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    StopLoss,
    TakeProfit,
    TrailingStop,
    TimeBased,
    /// Global override: pnl stayed inside the stagnation band past the window.
    Stagnation,
    /// Global override: maximum hold duration reached.
    MaxHold,
}

impl TriggerReason {
    pub fn from_kind(kind: &RuleKind) -> Self {
        match kind {
            RuleKind::StopLoss => TriggerReason::StopLoss,
            RuleKind::TakeProfit => TriggerReason::TakeProfit,
            RuleKind::TrailingStop { .. } => TriggerReason::TrailingStop,
            RuleKind::TimeBased { .. } => TriggerReason::TimeBased,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerReason::StopLoss => "stop_loss",
            TriggerReason::TakeProfit => "take_profit",
            TriggerReason::TrailingStop => "trailing_stop",
            TriggerReason::TimeBased => "time_based",
            TriggerReason::Stagnation => "stagnation",
            TriggerReason::MaxHold => "max_hold",
        }
    }
}

impl std::fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One exit trigger event recorded during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub timestamp: DateTime<Utc>,
    pub reason: TriggerReason,
    /// Threshold of the rule that fired (zero for the max-hold override).
    pub trigger_pct: Decimal,
    pub price: Decimal,
    pub pnl_pct: Decimal,
    /// Percentage of the original position liquidated by this trigger.
    pub exit_pct_applied: Decimal,
    pub cumulative_exit_pct_after: Decimal,
}

/// Lifecycle of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Full position held, no trigger yet.
    Accumulating,
    /// Some but not all of the position has been exited.
    PartiallyExited,
    /// Nothing remains; the run is over.
    Terminated,
}

/// Result of replaying one position under one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub position_id: Uuid,
    pub strategy_id: Uuid,
    pub entry_price: Decimal,
    pub entry_time: DateTime<Utc>,
    pub triggers: Vec<Trigger>,
    /// Weighted average exit price over triggers, or the last observed
    /// price when nothing fired (mark-to-market, position still open).
    pub final_exit_price: Decimal,
    pub final_pnl_pct: Decimal,
    pub cumulative_exit_pct: Decimal,
    pub remaining_position_pct: Decimal,
    pub max_favorable_excursion_pct: Decimal,
    pub max_adverse_excursion_pct: Decimal,
    pub hold_duration_hours: Decimal,
    pub phase: RunPhase,
}

impl SimulationResult {
    /// Whether the run ended with a positive realized pnl.
    pub fn is_win(&self) -> bool {
        self.final_pnl_pct > Decimal::ZERO
    }

    /// Whether the position was fully liquidated.
    pub fn is_terminated(&self) -> bool {
        self.phase == RunPhase::Terminated
    }
}

/// Aggregate statistics over a batch of simulation results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub position_count: usize,
    pub winning_positions: usize,
    pub losing_positions: usize,
    pub win_rate: f64,
    pub total_pnl_pct: Decimal,
    pub avg_pnl_pct: Decimal,
    pub max_gain_pct: Decimal,
    pub max_loss_pct: Decimal,
    pub avg_hold_hours: f64,
}

impl AggregateStats {
    /// Stats for an empty result set.
    pub fn empty() -> Self {
        Self {
            position_count: 0,
            winning_positions: 0,
            losing_positions: 0,
            win_rate: 0.0,
            total_pnl_pct: Decimal::ZERO,
            avg_pnl_pct: Decimal::ZERO,
            max_gain_pct: Decimal::ZERO,
            max_loss_pct: Decimal::ZERO,
            avg_hold_hours: 0.0,
        }
    }
}

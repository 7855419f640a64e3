//! Single-tick what-if projection over hypothetical prices.
//!
//! Answers "if the price were X right now, what would the strategy do"
//! without replaying a path. Only price-level rules (stop-loss and
//! take-profit) participate: trailing stops depend on the run's watermark
//! history and time-based rules on hold duration, neither of which a
//! single hypothetical price can supply.

use exit_core::error::{Error, Result};
use exit_core::types::{ExitStrategy, RuleKind, TriggerReason};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::evaluator::{rule_fires, RuleContext};

/// Default price offsets, in percent relative to entry.
const DEFAULT_OFFSETS_PCT: [i64; 9] = [-50, -25, -10, -5, 5, 10, 25, 50, 100];

/// What the strategy would do at a hypothetical price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectedAction {
    Hold,
    PartialExit,
    FullExit,
}

/// One projected scenario at a hypothetical price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhatIfScenario {
    pub price: Decimal,
    pub pnl_pct: Decimal,
    pub action: ProjectedAction,
    /// Reasons of the rules that would fire, in evaluation order.
    pub reasons: Vec<TriggerReason>,
    /// Total exit percentage, clamped to the remaining position.
    pub total_exit_pct: Decimal,
}

/// Projects strategy behavior across a grid of hypothetical prices.
#[derive(Debug, Clone)]
pub struct WhatIfProjector {
    offsets_pct: Vec<Decimal>,
}

impl Default for WhatIfProjector {
    fn default() -> Self {
        Self::new()
    }
}

impl WhatIfProjector {
    pub fn new() -> Self {
        Self {
            offsets_pct: DEFAULT_OFFSETS_PCT
                .iter()
                .map(|o| Decimal::from(*o))
                .collect(),
        }
    }

    /// Replace the default offset grid.
    pub fn with_offsets(offsets_pct: Vec<Decimal>) -> Self {
        Self { offsets_pct }
    }

    /// Project the strategy across candidate prices around the entry.
    ///
    /// Candidates are the offset grid applied to the entry price, plus the
    /// exact price level of the first enabled stop-loss and take-profit
    /// rule, plus the current price. Duplicates are collapsed and the
    /// scenarios come back sorted by price ascending.
    pub fn project(
        &self,
        strategy: &ExitStrategy,
        entry_price: Decimal,
        current_price: Decimal,
        remaining_position_pct: Decimal,
    ) -> Result<Vec<WhatIfScenario>> {
        if entry_price <= Decimal::ZERO {
            return Err(Error::invalid_input(format!(
                "entry price must be positive, got {entry_price}"
            )));
        }
        if remaining_position_pct < Decimal::ZERO
            || remaining_position_pct > Decimal::ONE_HUNDRED
        {
            return Err(Error::invalid_input(format!(
                "remaining_position_pct must be in [0, 100], got {remaining_position_pct}"
            )));
        }
        strategy.validate()?;

        let mut candidates: Vec<Decimal> = self
            .offsets_pct
            .iter()
            .map(|o| entry_price * (Decimal::ONE + o / Decimal::ONE_HUNDRED))
            .collect();

        // Exact rule levels, so the grid always includes the boundary
        // prices where behavior changes.
        if let Some(stop) = strategy
            .enabled_rules()
            .into_iter()
            .find(|r| r.kind == RuleKind::StopLoss)
        {
            candidates
                .push(entry_price * (Decimal::ONE + stop.trigger_pct / Decimal::ONE_HUNDRED));
        }
        if let Some(tp) = strategy
            .enabled_rules()
            .into_iter()
            .find(|r| r.kind == RuleKind::TakeProfit)
        {
            candidates.push(entry_price * (Decimal::ONE + tp.trigger_pct / Decimal::ONE_HUNDRED));
        }
        candidates.push(current_price);

        candidates.retain(|p| *p > Decimal::ZERO);
        candidates.sort();
        candidates.dedup();

        Ok(candidates
            .into_iter()
            .map(|price| self.project_one(strategy, entry_price, price, remaining_position_pct))
            .collect())
    }

    fn project_one(
        &self,
        strategy: &ExitStrategy,
        entry_price: Decimal,
        price: Decimal,
        remaining_position_pct: Decimal,
    ) -> WhatIfScenario {
        let pnl_pct = (price - entry_price) / entry_price * Decimal::ONE_HUNDRED;
        let ctx = RuleContext {
            pnl_pct,
            current_price: price,
            entry_price,
            trailing_high_watermark: entry_price,
            trailing_activated: false,
            hold_duration_hours: Decimal::ZERO,
        };

        let mut reasons = Vec::new();
        let mut total_exit_pct = Decimal::ZERO;
        for rule in strategy.enabled_rules() {
            if !rule.kind.is_price_level() {
                continue;
            }
            if total_exit_pct >= remaining_position_pct {
                break;
            }
            if rule_fires(rule, &ctx) {
                let applied = rule.exit_pct.min(remaining_position_pct - total_exit_pct);
                total_exit_pct += applied;
                reasons.push(TriggerReason::from_kind(&rule.kind));
            }
        }

        let action = if total_exit_pct <= Decimal::ZERO {
            ProjectedAction::Hold
        } else if total_exit_pct < remaining_position_pct {
            ProjectedAction::PartialExit
        } else {
            ProjectedAction::FullExit
        };

        WhatIfScenario {
            price,
            pnl_pct,
            action,
            reasons,
            total_exit_pct,
        }
    }
}

//! Stateless per-tick rule predicate.

use exit_core::types::{Rule, RuleKind};
use rust_decimal::Decimal;

/// Snapshot of run state handed to the predicate for one tick.
///
/// The caller owns all bookkeeping (watermark updates, trailing
/// activation latching, remainder tracking); this module only answers
/// "does this rule fire right now".
#[derive(Debug, Clone, Copy)]
pub struct RuleContext {
    pub pnl_pct: Decimal,
    pub current_price: Decimal,
    pub entry_price: Decimal,
    pub trailing_high_watermark: Decimal,
    /// Whether any trailing rule's activation threshold has been crossed
    /// at some point during the run.
    pub trailing_activated: bool,
    pub hold_duration_hours: Decimal,
}

/// Evaluate whether a single rule fires against the current tick.
///
/// Pure: no side effects, no state. Disabled rules never fire.
pub fn rule_fires(rule: &Rule, ctx: &RuleContext) -> bool {
    if !rule.enabled {
        return false;
    }

    match &rule.kind {
        RuleKind::StopLoss => ctx.pnl_pct <= rule.trigger_pct,
        RuleKind::TakeProfit => ctx.pnl_pct >= rule.trigger_pct,
        RuleKind::TrailingStop { .. } => {
            if !ctx.trailing_activated || ctx.trailing_high_watermark <= Decimal::ZERO {
                return false;
            }
            let pullback_pct = (ctx.trailing_high_watermark - ctx.current_price)
                / ctx.trailing_high_watermark
                * Decimal::ONE_HUNDRED;
            pullback_pct >= rule.trigger_pct.abs()
        }
        RuleKind::TimeBased { max_hours } => ctx.hold_duration_hours >= *max_hours,
    }
}

//! Position simulation engine: full-path replay and incremental stepping.
//!
//! One engine instance is a plain constructible value with no global
//! state. A run's mutable bookkeeping lives in [`SimulationState`], which
//! live-mode callers retain between ticks so the trailing watermark and
//! cumulative exit never have to be re-derived.

use chrono::{DateTime, Utc};
use exit_core::error::{Error, Result};
use exit_core::types::{
    ExitStrategy, Position, PricePoint, RuleKind, RunPhase, SimulationResult, Trigger,
    TriggerReason,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const SECONDS_PER_HOUR: i64 = 3600;

fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Decimal {
    Decimal::from((end - start).num_seconds()) / Decimal::from(SECONDS_PER_HOUR)
}

/// Mutable per-run state owned by the engine.
///
/// Invariants, held after every tick:
/// - `remaining_position_pct + cumulative_exit_pct == 100`
/// - `cumulative_exit_pct` is non-decreasing and never exceeds 100
/// - `trailing_high_watermark` is non-decreasing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub remaining_position_pct: Decimal,
    pub cumulative_exit_pct: Decimal,
    pub trailing_high_watermark: Decimal,
    pub trailing_activated: bool,
    pub triggers: Vec<Trigger>,
    pub max_favorable_excursion_pct: Decimal,
    pub max_adverse_excursion_pct: Decimal,
    pub phase: RunPhase,
    /// Timestamp of the last processed tick; steps must not go backwards.
    pub last_timestamp: Option<DateTime<Utc>>,
    pub last_price: Option<Decimal>,
}

impl SimulationState {
    fn new(entry_price: Decimal) -> Self {
        Self {
            remaining_position_pct: Decimal::ONE_HUNDRED,
            cumulative_exit_pct: Decimal::ZERO,
            trailing_high_watermark: entry_price,
            trailing_activated: false,
            triggers: Vec::new(),
            max_favorable_excursion_pct: Decimal::ZERO,
            max_adverse_excursion_pct: Decimal::ZERO,
            phase: RunPhase::Accumulating,
            last_timestamp: None,
            last_price: None,
        }
    }

    /// Whether the run has fully liquidated.
    pub fn is_terminated(&self) -> bool {
        self.phase == RunPhase::Terminated
    }
}

/// Replays a price path for one position under one strategy.
///
/// A single run is strictly sequential: tick order is load-bearing for
/// the trailing watermark and cumulative-exit state. Across positions,
/// engines share nothing and may run in parallel freely.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionSimulationEngine;

impl PositionSimulationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Validate inputs and seed a fresh run state.
    pub fn begin(&self, position: &Position, strategy: &ExitStrategy) -> Result<SimulationState> {
        if position.entry_price <= Decimal::ZERO {
            return Err(Error::invalid_input(format!(
                "entry price must be positive, got {}",
                position.entry_price
            )));
        }
        strategy.validate()?;
        Ok(SimulationState::new(position.entry_price))
    }

    /// Feed one new price point into a retained run state.
    ///
    /// Returns the triggers that fired on this tick, in firing order.
    /// Terminal runs accept further points but never fire again.
    pub fn step(
        &self,
        state: &mut SimulationState,
        position: &Position,
        strategy: &ExitStrategy,
        point: &PricePoint,
    ) -> Result<Vec<Trigger>> {
        if state.is_terminated() {
            return Ok(Vec::new());
        }

        if point.timestamp < position.entry_time {
            return Err(Error::invalid_input(format!(
                "price point at {} predates entry at {}",
                point.timestamp, position.entry_time
            )));
        }
        if let Some(last) = state.last_timestamp {
            if point.timestamp < last {
                return Err(Error::invalid_input(format!(
                    "price point at {} is out of order (last tick was {})",
                    point.timestamp, last
                )));
            }
        }

        let entry = position.entry_price;
        let pnl_pct = (point.price - entry) / entry * Decimal::ONE_HUNDRED;
        let hold_hours = hours_between(position.entry_time, point.timestamp);

        state.last_timestamp = Some(point.timestamp);
        state.last_price = Some(point.price);

        if pnl_pct > state.max_favorable_excursion_pct {
            state.max_favorable_excursion_pct = pnl_pct;
        }
        if pnl_pct < state.max_adverse_excursion_pct {
            state.max_adverse_excursion_pct = pnl_pct;
        }
        if point.price > state.trailing_high_watermark {
            state.trailing_high_watermark = point.price;
        }

        // Sorted once per tick; both the latch scan and the rule loop
        // walk the same list.
        let rules = strategy.enabled_rules();

        // Latch trailing activation once pnl reaches any trailing rule's
        // activation threshold; it stays active for the rest of the run.
        if !state.trailing_activated {
            for rule in &rules {
                if let RuleKind::TrailingStop { activation_pct } = &rule.kind {
                    if pnl_pct >= *activation_pct {
                        state.trailing_activated = true;
                        debug!(
                            position_id = %position.id,
                            pnl_pct = %pnl_pct,
                            activation_pct = %activation_pct,
                            "trailing stop activated"
                        );
                        break;
                    }
                }
            }
        }

        let mut fired = Vec::new();

        // Global overrides run before any rule: stagnation, then max-hold.
        // Each exits the full remainder and terminates the run.
        if let (Some(window), Some(threshold)) = (
            strategy.stagnation_window_hours,
            strategy.stagnation_threshold_pct,
        ) {
            if hold_hours >= window && pnl_pct.abs() <= threshold {
                let remainder = state.remaining_position_pct;
                fired.push(self.apply_exit(
                    state,
                    position,
                    point,
                    TriggerReason::Stagnation,
                    threshold,
                    pnl_pct,
                    remainder,
                ));
                return Ok(fired);
            }
        }
        if let Some(max_hold) = strategy.max_hold_hours {
            if hold_hours >= max_hold {
                let remainder = state.remaining_position_pct;
                fired.push(self.apply_exit(
                    state,
                    position,
                    point,
                    TriggerReason::MaxHold,
                    Decimal::ZERO,
                    pnl_pct,
                    remainder,
                ));
                return Ok(fired);
            }
        }

        let ctx = crate::evaluator::RuleContext {
            pnl_pct,
            current_price: point.price,
            entry_price: entry,
            trailing_high_watermark: state.trailing_high_watermark,
            trailing_activated: state.trailing_activated,
            hold_duration_hours: hold_hours,
        };

        // Rules in (priority, declaration) order; each fire reduces the
        // remainder that later rules on the same tick see.
        for rule in &rules {
            if state.remaining_position_pct <= Decimal::ZERO {
                break;
            }
            if crate::evaluator::rule_fires(rule, &ctx) {
                let exit_amount = rule.exit_pct.min(state.remaining_position_pct);
                fired.push(self.apply_exit(
                    state,
                    position,
                    point,
                    TriggerReason::from_kind(&rule.kind),
                    rule.trigger_pct,
                    pnl_pct,
                    exit_amount,
                ));
            }
        }

        Ok(fired)
    }

    /// Replay a full, time-ordered price series.
    pub fn simulate(
        &self,
        position: &Position,
        strategy: &ExitStrategy,
        prices: &[PricePoint],
    ) -> Result<SimulationResult> {
        if prices.is_empty() {
            return Err(Error::data_unavailable(format!(
                "empty price series for position {}",
                position.id
            )));
        }

        info!(
            position_id = %position.id,
            strategy = %strategy.name,
            points = prices.len(),
            "starting simulation"
        );

        let mut state = self.begin(position, strategy)?;
        for point in prices {
            if state.is_terminated() {
                break;
            }
            self.step(&mut state, position, strategy, point)?;
        }

        let result = self.finalize(&state, position, strategy)?;

        info!(
            position_id = %position.id,
            strategy = %strategy.name,
            triggers = result.triggers.len(),
            final_pnl_pct = %result.final_pnl_pct,
            "simulation complete"
        );

        Ok(result)
    }

    /// Fold a run state into its final result.
    ///
    /// If any trigger fired, the final exit price and pnl are the average
    /// over triggers weighted by `exit_pct_applied`; otherwise the last
    /// observed price marks the still-open position to market.
    pub fn finalize(
        &self,
        state: &SimulationState,
        position: &Position,
        strategy: &ExitStrategy,
    ) -> Result<SimulationResult> {
        let last_price = state.last_price.ok_or_else(|| {
            Error::data_unavailable(format!(
                "no price points processed for position {}",
                position.id
            ))
        })?;

        let entry = position.entry_price;
        let (final_exit_price, final_pnl_pct) = if state.triggers.is_empty() {
            let pnl = (last_price - entry) / entry * Decimal::ONE_HUNDRED;
            (last_price, pnl)
        } else {
            let total_weight: Decimal = state.triggers.iter().map(|t| t.exit_pct_applied).sum();
            let price = state
                .triggers
                .iter()
                .map(|t| t.price * t.exit_pct_applied)
                .sum::<Decimal>()
                / total_weight;
            let pnl = state
                .triggers
                .iter()
                .map(|t| t.pnl_pct * t.exit_pct_applied)
                .sum::<Decimal>()
                / total_weight;
            (price, pnl)
        };

        let hold_duration_hours = state
            .last_timestamp
            .map(|ts| hours_between(position.entry_time, ts))
            .unwrap_or(Decimal::ZERO);

        Ok(SimulationResult {
            position_id: position.id,
            strategy_id: strategy.id,
            entry_price: entry,
            entry_time: position.entry_time,
            triggers: state.triggers.clone(),
            final_exit_price,
            final_pnl_pct,
            cumulative_exit_pct: state.cumulative_exit_pct,
            remaining_position_pct: state.remaining_position_pct,
            max_favorable_excursion_pct: state.max_favorable_excursion_pct,
            max_adverse_excursion_pct: state.max_adverse_excursion_pct,
            hold_duration_hours,
            phase: state.phase,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_exit(
        &self,
        state: &mut SimulationState,
        position: &Position,
        point: &PricePoint,
        reason: TriggerReason,
        trigger_pct: Decimal,
        pnl_pct: Decimal,
        exit_amount: Decimal,
    ) -> Trigger {
        state.cumulative_exit_pct += exit_amount;
        state.remaining_position_pct -= exit_amount;
        state.phase = if state.remaining_position_pct <= Decimal::ZERO {
            RunPhase::Terminated
        } else {
            RunPhase::PartiallyExited
        };

        let trigger = Trigger {
            timestamp: point.timestamp,
            reason,
            trigger_pct,
            price: point.price,
            pnl_pct,
            exit_pct_applied: exit_amount,
            cumulative_exit_pct_after: state.cumulative_exit_pct,
        };

        debug!(
            position_id = %position.id,
            reason = %reason,
            price = %point.price,
            pnl_pct = %pnl_pct,
            exit_pct = %exit_amount,
            cumulative_exit_pct = %state.cumulative_exit_pct,
            "exit trigger fired"
        );

        state.triggers.push(trigger.clone());
        trigger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use exit_core::types::Rule;

    fn entry_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn position(entry_price: i64) -> Position {
        Position::new("SOL", Decimal::new(entry_price, 0), entry_time())
    }

    /// Price path with one point per hour starting one hour after entry.
    fn hourly_path(prices: &[i64]) -> Vec<PricePoint> {
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| {
                PricePoint::new(
                    entry_time() + chrono::Duration::hours(i as i64 + 1),
                    Decimal::new(*p, 0),
                )
            })
            .collect()
    }

    #[test]
    fn test_stop_loss_scenario() {
        let engine = PositionSimulationEngine::new();
        let strategy = ExitStrategy::new(
            "stop only",
            vec![Rule::stop_loss(Decimal::new(-10, 0), Decimal::ONE_HUNDRED, 0)],
        );

        let result = engine
            .simulate(&position(100), &strategy, &hourly_path(&[100, 95, 88]))
            .unwrap();

        assert_eq!(result.triggers.len(), 1);
        let trigger = &result.triggers[0];
        assert_eq!(trigger.reason, TriggerReason::StopLoss);
        assert_eq!(trigger.price, Decimal::new(88, 0));
        assert_eq!(trigger.exit_pct_applied, Decimal::ONE_HUNDRED);
        assert_eq!(result.final_pnl_pct, Decimal::new(-12, 0));
        assert_eq!(result.phase, RunPhase::Terminated);
        assert_eq!(result.remaining_position_pct, Decimal::ZERO);
    }

    #[test]
    fn test_tiered_take_profit_scenario() {
        let engine = PositionSimulationEngine::new();
        let strategy = ExitStrategy::new(
            "tiered tp",
            vec![
                Rule::take_profit(Decimal::new(20, 0), Decimal::new(50, 0), 0),
                Rule::take_profit(Decimal::new(50, 0), Decimal::new(50, 0), 1),
            ],
        );

        let result = engine
            .simulate(&position(100), &strategy, &hourly_path(&[100, 121, 151]))
            .unwrap();

        assert_eq!(result.triggers.len(), 2);
        assert_eq!(result.triggers[0].price, Decimal::new(121, 0));
        assert_eq!(result.triggers[0].exit_pct_applied, Decimal::new(50, 0));
        assert_eq!(
            result.triggers[0].cumulative_exit_pct_after,
            Decimal::new(50, 0)
        );
        assert_eq!(result.triggers[1].price, Decimal::new(151, 0));
        assert_eq!(result.triggers[1].exit_pct_applied, Decimal::new(50, 0));

        // Weighted pnl: 0.5 * 21 + 0.5 * 51 = 36
        assert_eq!(result.final_pnl_pct, Decimal::new(36, 0));
        assert_eq!(result.phase, RunPhase::Terminated);
    }

    #[test]
    fn test_trailing_stop_scenario() {
        let engine = PositionSimulationEngine::new();
        let strategy = ExitStrategy::new(
            "trailing",
            vec![Rule::trailing_stop(
                Decimal::new(100, 0),
                Decimal::new(20, 0),
                Decimal::ONE_HUNDRED,
                0,
            )],
        );

        let result = engine
            .simulate(
                &position(100),
                &strategy,
                &hourly_path(&[100, 210, 250, 195]),
            )
            .unwrap();

        // Activates at 210 (pnl 110% >= 100%); watermark rises to 250;
        // fires at 195 since (250 - 195) / 250 = 22% >= 20%.
        assert_eq!(result.triggers.len(), 1);
        let trigger = &result.triggers[0];
        assert_eq!(trigger.reason, TriggerReason::TrailingStop);
        assert_eq!(trigger.price, Decimal::new(195, 0));
        assert_eq!(result.final_pnl_pct, Decimal::new(95, 0));
        assert_eq!(result.phase, RunPhase::Terminated);
    }

    #[test]
    fn test_empty_series_is_data_unavailable() {
        let engine = PositionSimulationEngine::new();
        let strategy = ExitStrategy::new(
            "any",
            vec![Rule::stop_loss(Decimal::new(-10, 0), Decimal::ONE_HUNDRED, 0)],
        );

        let err = engine.simulate(&position(100), &strategy, &[]).unwrap_err();
        assert!(matches!(err, Error::DataUnavailable { .. }));
    }

    #[test]
    fn test_non_positive_entry_is_invalid_input() {
        let engine = PositionSimulationEngine::new();
        let strategy = ExitStrategy::new(
            "any",
            vec![Rule::stop_loss(Decimal::new(-10, 0), Decimal::ONE_HUNDRED, 0)],
        );

        let err = engine
            .simulate(&position(0), &strategy, &hourly_path(&[100]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn test_no_trigger_marks_to_market() {
        let engine = PositionSimulationEngine::new();
        let strategy = ExitStrategy::new(
            "wide stop",
            vec![Rule::stop_loss(Decimal::new(-90, 0), Decimal::ONE_HUNDRED, 0)],
        );

        let result = engine
            .simulate(&position(100), &strategy, &hourly_path(&[100, 104, 103]))
            .unwrap();

        assert!(result.triggers.is_empty());
        assert_eq!(result.final_exit_price, Decimal::new(103, 0));
        assert_eq!(result.final_pnl_pct, Decimal::new(3, 0));
        assert_eq!(result.phase, RunPhase::Accumulating);
        assert_eq!(result.remaining_position_pct, Decimal::ONE_HUNDRED);
    }

    #[test]
    fn test_same_priority_ties_break_by_declaration_order() {
        let engine = PositionSimulationEngine::new();
        // Both rules eligible on the same tick with equal priority: the
        // first-declared rule consumes remainder first.
        let strategy = ExitStrategy::new(
            "tie",
            vec![
                Rule::take_profit(Decimal::new(10, 0), Decimal::new(70, 0), 1),
                Rule::take_profit(Decimal::new(15, 0), Decimal::new(70, 0), 1),
            ],
        );

        let result = engine
            .simulate(&position(100), &strategy, &hourly_path(&[100, 120]))
            .unwrap();

        assert_eq!(result.triggers.len(), 2);
        assert_eq!(result.triggers[0].trigger_pct, Decimal::new(10, 0));
        assert_eq!(result.triggers[0].exit_pct_applied, Decimal::new(70, 0));
        // Second rule sees the reduced remainder
        assert_eq!(result.triggers[1].trigger_pct, Decimal::new(15, 0));
        assert_eq!(result.triggers[1].exit_pct_applied, Decimal::new(30, 0));
        assert_eq!(result.cumulative_exit_pct, Decimal::ONE_HUNDRED);
    }

    #[test]
    fn test_lower_priority_value_fires_first() {
        let engine = PositionSimulationEngine::new();
        let strategy = ExitStrategy::new(
            "priority",
            vec![
                Rule::take_profit(Decimal::new(10, 0), Decimal::new(60, 0), 5),
                Rule::take_profit(Decimal::new(12, 0), Decimal::new(60, 0), 1),
            ],
        );

        let result = engine
            .simulate(&position(100), &strategy, &hourly_path(&[100, 120]))
            .unwrap();

        // Priority 1 rule (declared second) consumes first
        assert_eq!(result.triggers[0].trigger_pct, Decimal::new(12, 0));
        assert_eq!(result.triggers[0].exit_pct_applied, Decimal::new(60, 0));
        assert_eq!(result.triggers[1].exit_pct_applied, Decimal::new(40, 0));
    }

    #[test]
    fn test_invariants_hold_at_every_tick() {
        let engine = PositionSimulationEngine::new();
        let strategy = ExitStrategy::new(
            "mixed",
            vec![
                Rule::take_profit(Decimal::new(5, 0), Decimal::new(20, 0), 0),
                Rule::take_profit(Decimal::new(10, 0), Decimal::new(30, 0), 1),
                Rule::stop_loss(Decimal::new(-15, 0), Decimal::ONE_HUNDRED, 2),
            ],
        );

        let pos = position(100);
        let mut state = engine.begin(&pos, &strategy).unwrap();
        let mut prev_cumulative = Decimal::ZERO;
        let mut prev_watermark = Decimal::ZERO;

        for point in hourly_path(&[100, 103, 107, 111, 104, 96, 84]) {
            engine.step(&mut state, &pos, &strategy, &point).unwrap();

            assert!(state.cumulative_exit_pct >= prev_cumulative);
            assert!(state.cumulative_exit_pct <= Decimal::ONE_HUNDRED);
            assert!(state.trailing_high_watermark >= prev_watermark);
            assert_eq!(
                state.remaining_position_pct + state.cumulative_exit_pct,
                Decimal::ONE_HUNDRED
            );

            prev_cumulative = state.cumulative_exit_pct;
            prev_watermark = state.trailing_high_watermark;
        }
    }

    #[test]
    fn test_incremental_step_matches_batch_replay() {
        let engine = PositionSimulationEngine::new();
        let strategy = ExitStrategy::new(
            "mixed",
            vec![
                Rule::take_profit(Decimal::new(8, 0), Decimal::new(40, 0), 0),
                Rule::trailing_stop(
                    Decimal::new(10, 0),
                    Decimal::new(5, 0),
                    Decimal::new(60, 0),
                    1,
                ),
            ],
        );
        let pos = position(100);
        let path = hourly_path(&[100, 105, 109, 112, 106, 101]);

        let batch = engine.simulate(&pos, &strategy, &path).unwrap();

        let mut state = engine.begin(&pos, &strategy).unwrap();
        for point in &path {
            if state.is_terminated() {
                break;
            }
            engine.step(&mut state, &pos, &strategy, point).unwrap();
        }
        let incremental = engine.finalize(&state, &pos, &strategy).unwrap();

        assert_eq!(batch, incremental);
    }

    #[test]
    fn test_determinism_across_fresh_engines() {
        let strategy = ExitStrategy::new(
            "det",
            vec![
                Rule::take_profit(Decimal::new(6, 0), Decimal::new(33, 0), 0),
                Rule::stop_loss(Decimal::new(-9, 0), Decimal::ONE_HUNDRED, 1),
            ],
        );
        let pos = position(100);
        let path = hourly_path(&[100, 107, 102, 95, 90]);

        let a = PositionSimulationEngine::new()
            .simulate(&pos, &strategy, &path)
            .unwrap();
        let b = PositionSimulationEngine::new()
            .simulate(&pos, &strategy, &path)
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_stagnation_override_exits_in_full() {
        let engine = PositionSimulationEngine::new();
        let strategy = ExitStrategy::new(
            "stagnant",
            vec![Rule::take_profit(
                Decimal::new(50, 0),
                Decimal::ONE_HUNDRED,
                0,
            )],
        )
        .with_stagnation(Decimal::new(3, 0), Decimal::new(2, 0));

        // pnl stays within +/-2% past the 3 hour window
        let result = engine
            .simulate(&position(100), &strategy, &hourly_path(&[100, 101, 99, 101]))
            .unwrap();

        assert_eq!(result.triggers.len(), 1);
        assert_eq!(result.triggers[0].reason, TriggerReason::Stagnation);
        assert_eq!(result.triggers[0].exit_pct_applied, Decimal::ONE_HUNDRED);
        assert_eq!(result.phase, RunPhase::Terminated);
        // Fired on the first tick at or past the window (hour 3)
        assert_eq!(result.triggers[0].price, Decimal::new(99, 0));
    }

    #[test]
    fn test_max_hold_override_terminates() {
        let engine = PositionSimulationEngine::new();
        let strategy = ExitStrategy::new(
            "max hold",
            vec![Rule::take_profit(
                Decimal::new(500, 0),
                Decimal::ONE_HUNDRED,
                0,
            )],
        )
        .with_max_hold(Decimal::new(2, 0));

        let result = engine
            .simulate(&position(100), &strategy, &hourly_path(&[110, 120, 130]))
            .unwrap();

        assert_eq!(result.triggers.len(), 1);
        assert_eq!(result.triggers[0].reason, TriggerReason::MaxHold);
        // Fires at the 2 hour mark, price 120
        assert_eq!(result.triggers[0].price, Decimal::new(120, 0));
        assert_eq!(result.phase, RunPhase::Terminated);
    }

    #[test]
    fn test_stagnation_checked_before_max_hold() {
        let engine = PositionSimulationEngine::new();
        let strategy = ExitStrategy::new("overrides", vec![])
            .with_stagnation(Decimal::new(2, 0), Decimal::new(5, 0))
            .with_max_hold(Decimal::new(2, 0));

        // Both overrides eligible on the same tick; stagnation wins
        let result = engine
            .simulate(&position(100), &strategy, &hourly_path(&[100, 101]))
            .unwrap();

        assert_eq!(result.triggers.len(), 1);
        assert_eq!(result.triggers[0].reason, TriggerReason::Stagnation);
    }

    #[test]
    fn test_out_of_order_step_rejected() {
        let engine = PositionSimulationEngine::new();
        let strategy = ExitStrategy::new(
            "any",
            vec![Rule::stop_loss(Decimal::new(-10, 0), Decimal::ONE_HUNDRED, 0)],
        );
        let pos = position(100);

        let mut state = engine.begin(&pos, &strategy).unwrap();
        let later = PricePoint::new(
            entry_time() + chrono::Duration::hours(2),
            Decimal::new(100, 0),
        );
        let earlier = PricePoint::new(
            entry_time() + chrono::Duration::hours(1),
            Decimal::new(100, 0),
        );

        engine.step(&mut state, &pos, &strategy, &later).unwrap();
        let err = engine
            .step(&mut state, &pos, &strategy, &earlier)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn test_terminated_run_ignores_further_ticks() {
        let engine = PositionSimulationEngine::new();
        let strategy = ExitStrategy::new(
            "stop",
            vec![Rule::stop_loss(Decimal::new(-5, 0), Decimal::ONE_HUNDRED, 0)],
        );
        let pos = position(100);

        let mut state = engine.begin(&pos, &strategy).unwrap();
        for point in hourly_path(&[90, 80, 70]) {
            let fired = engine.step(&mut state, &pos, &strategy, &point).unwrap();
            if state.is_terminated() {
                // first tick terminates; later ticks fire nothing
                if point.price < Decimal::new(90, 0) {
                    assert!(fired.is_empty());
                }
            }
        }
        assert_eq!(state.triggers.len(), 1);
    }

    #[test]
    fn test_excursions_tracked() {
        let engine = PositionSimulationEngine::new();
        let strategy = ExitStrategy::new(
            "wide",
            vec![Rule::stop_loss(Decimal::new(-90, 0), Decimal::ONE_HUNDRED, 0)],
        );

        let result = engine
            .simulate(&position(100), &strategy, &hourly_path(&[100, 130, 85, 102]))
            .unwrap();

        assert_eq!(result.max_favorable_excursion_pct, Decimal::new(30, 0));
        assert_eq!(result.max_adverse_excursion_pct, Decimal::new(-15, 0));
    }
}

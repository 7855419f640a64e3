//! Exit strategy and rule definitions.
//!
//! A strategy is an immutable, versioned snapshot: an ordered set of exit
//! rules plus global stagnation/max-hold overrides. The engine never
//! mutates a strategy it is given.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Lifecycle status of a strategy definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyStatus {
    Draft,
    Active,
    Archived,
}

/// Kind of exit rule, with kind-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    /// Fires when pnl falls to the (negative) trigger threshold.
    StopLoss,
    /// Fires when pnl rises to the (positive) trigger threshold.
    TakeProfit,
    /// Two-phase: inactive until pnl reaches `activation_pct`, then fires
    /// when price pulls back from the high watermark by the trigger distance.
    TrailingStop { activation_pct: Decimal },
    /// Fires once the position has been held for `max_hours`.
    TimeBased { max_hours: Decimal },
}

impl RuleKind {
    /// Whether this kind can be evaluated from a single price, without a
    /// time path (used by the what-if projector).
    pub fn is_price_level(&self) -> bool {
        matches!(self, RuleKind::StopLoss | RuleKind::TakeProfit)
    }
}

/// One exit condition: a trigger threshold and the position percentage it
/// liquidates when fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(flatten)]
    pub kind: RuleKind,
    /// Signed trigger threshold in percent: negative for loss rules,
    /// positive for gain rules. For trailing stops this is the pullback
    /// distance from the watermark (absolute value is used).
    pub trigger_pct: Decimal,
    /// Percentage of the original position to liquidate, in (0, 100].
    pub exit_pct: Decimal,
    /// Evaluation priority; lower fires first. Ties break by declaration order.
    pub priority: u32,
    pub enabled: bool,
}

impl Rule {
    /// Create a stop-loss rule. `trigger_pct` must be negative.
    pub fn stop_loss(trigger_pct: Decimal, exit_pct: Decimal, priority: u32) -> Self {
        Self {
            kind: RuleKind::StopLoss,
            trigger_pct,
            exit_pct,
            priority,
            enabled: true,
        }
    }

    /// Create a take-profit rule. `trigger_pct` must be positive.
    pub fn take_profit(trigger_pct: Decimal, exit_pct: Decimal, priority: u32) -> Self {
        Self {
            kind: RuleKind::TakeProfit,
            trigger_pct,
            exit_pct,
            priority,
            enabled: true,
        }
    }

    /// Create a trailing stop rule with the given activation threshold and
    /// pullback distance (percent of the watermark).
    pub fn trailing_stop(
        activation_pct: Decimal,
        distance_pct: Decimal,
        exit_pct: Decimal,
        priority: u32,
    ) -> Self {
        Self {
            kind: RuleKind::TrailingStop { activation_pct },
            trigger_pct: distance_pct,
            exit_pct,
            priority,
            enabled: true,
        }
    }

    /// Create a time-based exit rule.
    pub fn time_based(max_hours: Decimal, exit_pct: Decimal, priority: u32) -> Self {
        Self {
            kind: RuleKind::TimeBased { max_hours },
            trigger_pct: Decimal::ZERO,
            exit_pct,
            priority,
            enabled: true,
        }
    }

    /// Validate the rule parameters.
    pub fn validate(&self) -> Result<()> {
        if self.exit_pct <= Decimal::ZERO || self.exit_pct > Decimal::ONE_HUNDRED {
            return Err(Error::invalid_input(format!(
                "exit_pct must be in (0, 100], got {}",
                self.exit_pct
            )));
        }

        match &self.kind {
            RuleKind::StopLoss => {
                if self.trigger_pct >= Decimal::ZERO {
                    return Err(Error::invalid_input(format!(
                        "stop_loss trigger_pct must be negative, got {}",
                        self.trigger_pct
                    )));
                }
            }
            RuleKind::TakeProfit => {
                if self.trigger_pct <= Decimal::ZERO {
                    return Err(Error::invalid_input(format!(
                        "take_profit trigger_pct must be positive, got {}",
                        self.trigger_pct
                    )));
                }
            }
            RuleKind::TrailingStop { activation_pct } => {
                if *activation_pct < Decimal::ZERO {
                    return Err(Error::invalid_input(format!(
                        "trailing_stop activation_pct must be non-negative, got {activation_pct}"
                    )));
                }
                if self.trigger_pct == Decimal::ZERO {
                    return Err(Error::invalid_input(
                        "trailing_stop trigger_pct (pullback distance) must be non-zero",
                    ));
                }
            }
            RuleKind::TimeBased { max_hours } => {
                if *max_hours <= Decimal::ZERO {
                    return Err(Error::invalid_input(format!(
                        "time_based max_hours must be positive, got {max_hours}"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Named, versioned, ordered set of exit rules plus global overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitStrategy {
    pub id: Uuid,
    pub name: String,
    pub version: u32,
    pub status: StrategyStatus,
    /// Rules in declaration order. Evaluation order is `(priority asc,
    /// declaration order asc)`.
    pub rules: Vec<Rule>,
    /// Force a full exit once the position has been held this long.
    pub max_hold_hours: Option<Decimal>,
    /// Stagnation window: after this many hours, a position whose pnl has
    /// stayed within the threshold band is exited in full.
    pub stagnation_window_hours: Option<Decimal>,
    /// Absolute pnl band (percent) considered stagnant.
    pub stagnation_threshold_pct: Option<Decimal>,
}

impl ExitStrategy {
    /// Create an active strategy with the given rules and no global overrides.
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            version: 1,
            status: StrategyStatus::Active,
            rules,
            max_hold_hours: None,
            stagnation_window_hours: None,
            stagnation_threshold_pct: None,
        }
    }

    /// Set the max-hold override.
    pub fn with_max_hold(mut self, hours: Decimal) -> Self {
        self.max_hold_hours = Some(hours);
        self
    }

    /// Set the stagnation override.
    pub fn with_stagnation(mut self, window_hours: Decimal, threshold_pct: Decimal) -> Self {
        self.stagnation_window_hours = Some(window_hours);
        self.stagnation_threshold_pct = Some(threshold_pct);
        self
    }

    /// Enabled rules in evaluation order: priority ascending, with ties
    /// broken by declaration order (stable sort).
    pub fn enabled_rules(&self) -> Vec<&Rule> {
        let mut rules: Vec<&Rule> = self.rules.iter().filter(|r| r.enabled).collect();
        rules.sort_by_key(|r| r.priority);
        rules
    }

    /// Validate the strategy definition and every rule in it.
    pub fn validate(&self) -> Result<()> {
        for rule in &self.rules {
            rule.validate()?;
        }

        if let Some(hours) = self.max_hold_hours {
            if hours <= Decimal::ZERO {
                return Err(Error::configuration(format!(
                    "max_hold_hours must be positive, got {hours}"
                )));
            }
        }

        match (self.stagnation_window_hours, self.stagnation_threshold_pct) {
            (None, None) => {}
            (Some(window), Some(threshold)) => {
                if window <= Decimal::ZERO {
                    return Err(Error::configuration(format!(
                        "stagnation_window_hours must be positive, got {window}"
                    )));
                }
                if threshold < Decimal::ZERO {
                    return Err(Error::configuration(format!(
                        "stagnation_threshold_pct must be non-negative, got {threshold}"
                    )));
                }
            }
            _ => {
                return Err(Error::configuration(
                    "stagnation_window_hours and stagnation_threshold_pct must be set together",
                ));
            }
        }

        Ok(())
    }
}

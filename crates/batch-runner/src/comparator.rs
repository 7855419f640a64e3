//! Head-to-head strategy comparison over a shared position set.

use exit_core::error::{Error, Result};
use exit_core::types::{AggregateStats, ExitStrategy, Position, PricePoint};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::runner::{BatchSimulationRunner, SimulationJob};

/// Metric to rank strategies by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMetric {
    WinRate,
    AvgPnlPct,
    TotalPnlPct,
}

/// One strategy's aggregate performance over the shared position set.
#[derive(Debug, Clone)]
pub struct StrategyRanking {
    pub strategy_id: Uuid,
    pub strategy_name: String,
    pub stats: AggregateStats,
    /// Jobs that failed or were skipped under this strategy.
    pub incomplete_jobs: usize,
}

impl StrategyRanking {
    fn metric_value(&self, metric: ComparisonMetric) -> f64 {
        match metric {
            ComparisonMetric::WinRate => self.stats.win_rate,
            ComparisonMetric::AvgPnlPct => self.stats.avg_pnl_pct.to_f64().unwrap_or(0.0),
            ComparisonMetric::TotalPnlPct => self.stats.total_pnl_pct.to_f64().unwrap_or(0.0),
        }
    }
}

/// Full comparison output. `entries` keeps the strategies' input order.
#[derive(Debug, Clone)]
pub struct ComparisonReport {
    pub entries: Vec<StrategyRanking>,
    /// Index into `entries` of the overall winner.
    pub winner: usize,
}

impl ComparisonReport {
    /// Entries ranked by one metric, best first. Stable for ties, so
    /// strategies declared earlier rank ahead.
    pub fn ranked_by(&self, metric: ComparisonMetric) -> Vec<&StrategyRanking> {
        let mut ranked: Vec<&StrategyRanking> = self.entries.iter().collect();
        ranked.sort_by(|a, b| {
            b.metric_value(metric)
                .partial_cmp(&a.metric_value(metric))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }

    pub fn winning_entry(&self) -> &StrategyRanking {
        &self.entries[self.winner]
    }
}

/// Runs each candidate strategy against the same positions and price
/// paths, so differences in outcome come only from the rules.
#[derive(Debug, Clone, Default)]
pub struct StrategyComparator {
    runner: BatchSimulationRunner,
}

impl StrategyComparator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare strategies over the shared positions.
    ///
    /// The winner has the highest total pnl; ties break by win rate, then
    /// by input order.
    pub fn compare(
        &self,
        strategies: &[ExitStrategy],
        positions: &[(Position, Vec<PricePoint>)],
    ) -> Result<ComparisonReport> {
        if strategies.is_empty() {
            return Err(Error::invalid_input("no strategies to compare"));
        }
        if positions.is_empty() {
            return Err(Error::invalid_input("no positions to compare over"));
        }

        let mut entries = Vec::with_capacity(strategies.len());
        for strategy in strategies {
            let jobs: Vec<SimulationJob> = positions
                .iter()
                .map(|(position, prices)| SimulationJob {
                    position: position.clone(),
                    strategy: strategy.clone(),
                    prices: prices.clone(),
                })
                .collect();

            let report = self.runner.run(&jobs);
            info!(
                strategy = %strategy.name,
                win_rate = report.stats.win_rate,
                total_pnl_pct = %report.stats.total_pnl_pct,
                "strategy evaluated"
            );

            entries.push(StrategyRanking {
                strategy_id: strategy.id,
                strategy_name: strategy.name.clone(),
                stats: report.stats,
                incomplete_jobs: report.failures.len() + report.skipped,
            });
        }

        let mut winner = 0;
        for (i, entry) in entries.iter().enumerate().skip(1) {
            let best = &entries[winner];
            if entry.stats.total_pnl_pct > best.stats.total_pnl_pct
                || (entry.stats.total_pnl_pct == best.stats.total_pnl_pct
                    && entry.stats.win_rate > best.stats.win_rate)
            {
                winner = i;
            }
        }

        Ok(ComparisonReport { entries, winner })
    }
}

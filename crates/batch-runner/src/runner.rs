//! Parallel batch execution over independent simulation jobs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use exit_core::types::{AggregateStats, ExitStrategy, Position, PricePoint, SimulationResult};
use rayon::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sim_engine::PositionSimulationEngine;
use tracing::{info, warn};
use uuid::Uuid;

/// One unit of batch work: a position, the strategy to apply, and its
/// price path.
#[derive(Debug, Clone)]
pub struct SimulationJob {
    pub position: Position,
    pub strategy: ExitStrategy,
    pub prices: Vec<PricePoint>,
}

/// A job that could not be simulated. Failures never abort the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionFailure {
    pub position_id: Uuid,
    pub error: String,
}

/// Outcome of one batch run. `results` preserves input job order.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub results: Vec<SimulationResult>,
    pub failures: Vec<PositionFailure>,
    /// Jobs not started because the batch was cancelled.
    pub skipped: usize,
    pub stats: AggregateStats,
}

/// Cooperative cancellation handle for an in-flight batch.
///
/// Cancelling stops jobs that have not yet started; running jobs finish.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

enum JobOutcome {
    Completed(SimulationResult),
    Failed(PositionFailure),
    Skipped,
}

/// Runs simulation jobs across the rayon thread pool.
///
/// Jobs share nothing, so results are identical to a sequential run
/// regardless of thread count or scheduling.
#[derive(Debug, Clone, Default)]
pub struct BatchSimulationRunner {
    engine: PositionSimulationEngine,
    cancel: CancelHandle,
}

impl BatchSimulationRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for cancelling this runner's in-flight batch.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Run every job, in parallel, isolating per-job failures.
    pub fn run(&self, jobs: &[SimulationJob]) -> BatchReport {
        info!(jobs = jobs.len(), "starting batch run");

        let outcomes: Vec<JobOutcome> = jobs
            .par_iter()
            .map(|job| {
                if self.cancel.is_cancelled() {
                    return JobOutcome::Skipped;
                }
                match self.engine.simulate(&job.position, &job.strategy, &job.prices) {
                    Ok(result) => JobOutcome::Completed(result),
                    Err(e) => {
                        warn!(
                            position_id = %job.position.id,
                            error = %e,
                            "simulation failed, continuing batch"
                        );
                        JobOutcome::Failed(PositionFailure {
                            position_id: job.position.id,
                            error: e.to_string(),
                        })
                    }
                }
            })
            .collect();

        let mut results = Vec::new();
        let mut failures = Vec::new();
        let mut skipped = 0;
        for outcome in outcomes {
            match outcome {
                JobOutcome::Completed(r) => results.push(r),
                JobOutcome::Failed(f) => failures.push(f),
                JobOutcome::Skipped => skipped += 1,
            }
        }

        let stats = aggregate_stats(&results);

        info!(
            completed = results.len(),
            failed = failures.len(),
            skipped,
            win_rate = stats.win_rate,
            "batch run finished"
        );

        BatchReport {
            results,
            failures,
            skipped,
            stats,
        }
    }
}

/// Aggregate a set of simulation results. A win is a strictly positive
/// final pnl.
pub fn aggregate_stats(results: &[SimulationResult]) -> AggregateStats {
    if results.is_empty() {
        return AggregateStats::empty();
    }

    let count = results.len();
    let winning = results.iter().filter(|r| r.is_win()).count();
    let losing = results
        .iter()
        .filter(|r| r.final_pnl_pct < Decimal::ZERO)
        .count();

    let total_pnl_pct: Decimal = results.iter().map(|r| r.final_pnl_pct).sum();
    let avg_pnl_pct = total_pnl_pct / Decimal::from(count);

    let max_gain_pct = results
        .iter()
        .map(|r| r.final_pnl_pct)
        .max()
        .unwrap_or(Decimal::ZERO);
    let max_loss_pct = results
        .iter()
        .map(|r| r.final_pnl_pct)
        .min()
        .unwrap_or(Decimal::ZERO);

    let total_hold_hours: Decimal = results.iter().map(|r| r.hold_duration_hours).sum();
    let avg_hold_hours = (total_hold_hours / Decimal::from(count))
        .to_f64()
        .unwrap_or(0.0);

    AggregateStats {
        position_count: count,
        winning_positions: winning,
        losing_positions: losing,
        win_rate: winning as f64 / count as f64,
        total_pnl_pct,
        avg_pnl_pct,
        max_gain_pct,
        max_loss_pct,
        avg_hold_hours,
    }
}

//! Batch Runner
//!
//! Runs many position simulations in parallel, aggregates the results,
//! and compares strategies head to head over a shared position set.

pub mod comparator;
pub mod runner;

pub use comparator::{ComparisonMetric, ComparisonReport, StrategyComparator, StrategyRanking};
pub use runner::{
    aggregate_stats, BatchReport, BatchSimulationRunner, CancelHandle, PositionFailure,
    SimulationJob,
};

//! ExitSim: Exit Strategy Rule Evaluation and Simulation Engine
//!
//! This is the root crate that provides benchmark and integration-test
//! access to the internal modules. For actual functionality, use the
//! individual crates directly:
//!
//! - `exit-core`: Strategy, rule, price, and result types; error types
//! - `sim-engine`: Rule predicates, position replay, what-if projection
//! - `batch-runner`: Parallel batch execution, strategy comparison
//! - `live-monitor`: Live position watching and exit intent emission

// Re-export for benchmarks
pub use batch_runner as batch;
pub use exit_core as core;
pub use sim_engine as sim;

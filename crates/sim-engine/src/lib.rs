//! Simulation Engine
//!
//! Pure, synchronous evaluation core: per-tick rule predicates, full-path
//! and incremental position replay, and single-tick what-if projection.
//! All inputs are materialized immutable values; the engine performs no
//! I/O and keeps no global state, so runs are deterministic and safe to
//! parallelize across positions.

pub mod engine;
pub mod evaluator;
pub mod what_if;

pub use engine::{PositionSimulationEngine, SimulationState};
pub use evaluator::{rule_fires, RuleContext};
pub use what_if::{ProjectedAction, WhatIfProjector, WhatIfScenario};

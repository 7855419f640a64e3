//! Live Monitor
//!
//! Watches open positions against their exit strategies as prices arrive,
//! turning engine triggers into exit intents. All price access, strategy
//! lookup, and order submission go through traits, so the evaluation path
//! stays testable without any market connectivity.

pub mod config;
pub mod monitor;
pub mod traits;

pub use config::MonitorConfig;
pub use monitor::{ExitIntent, ExitMonitor};
pub use traits::{ExitStrategyStore, OrderSubmission, PriceFeed};

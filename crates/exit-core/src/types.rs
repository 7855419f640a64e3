//! Core domain types for the exit strategy simulation engine.

pub mod price;
pub mod simulation;
pub mod strategy;

pub use price::*;
pub use simulation::*;
pub use strategy::*;

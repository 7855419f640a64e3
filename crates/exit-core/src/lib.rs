//! Exit Core Library
//!
//! Shared domain types and the error taxonomy for the exit strategy
//! rule evaluation and simulation engine.

pub mod error;
pub mod types;

pub use error::{Error, Result};

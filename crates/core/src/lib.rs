//! Core types and utilities for the CoinPeek aggregation service
//!
//! This crate provides the pieces shared across all components:
//! - Snapshot, quote and fee-estimate types
//! - Endpoint, interval and fallback configuration
//! - Error taxonomy for fetch and aggregation failures
//! - Pure display formatting and currency conversion

pub mod config;
pub mod errors;
pub mod format;
pub mod types;

pub use config::*;
pub use errors::*;
pub use types::*;

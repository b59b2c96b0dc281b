//! Multi-source price and fee aggregation
//!
//! Features:
//! - Timed HTTP fetch with normalized failure reporting
//! - Ordered provider fallback for bitcoin fee estimates
//! - Confidence-tiered ethereum gas estimation with static fallbacks
//! - Single-slot snapshot cache with rate gating

pub mod aggregator;
pub mod cache;
pub mod fetch;
pub mod gas;
pub mod providers;

#[cfg(test)]
pub(crate) mod testutil;

pub use aggregator::PriceAggregator;
pub use cache::{KeyValueStore, MemoryStore, SnapshotCache};
pub use fetch::{HttpTransport, Transport};
pub use providers::{bitcoin_fee_providers, estimate_bitcoin_fees, FeeParser, FeeProvider};

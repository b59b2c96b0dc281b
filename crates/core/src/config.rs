//! Configuration types

use std::time::Duration;

use crate::FeeEstimate;

/// Storage slot for the cached snapshot
pub const STORAGE_KEY: &str = "cryptoData";

/// Name of the recurring update trigger
pub const UPDATE_TRIGGER: &str = "crypto-update";

/// Base URLs for the external data providers
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    pub coingecko: String,
    pub blocknative: String,
    pub mempool_space: String,
    pub blockchain_info: String,
    pub blockchair: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            coingecko: "https://api.coingecko.com/api/v3".to_string(),
            blocknative: "https://api.blocknative.com".to_string(),
            mempool_space: "https://mempool.space/api/v1".to_string(),
            blockchain_info: "https://api.blockchain.info".to_string(),
            blockchair: "https://api.blockchair.com".to_string(),
        }
    }
}

/// Timing knobs for fetching and refresh
#[derive(Debug, Clone)]
pub struct Intervals {
    /// Timeout for the main spot-price fetch
    pub fetch_timeout: Duration,
    /// Shorter timeout for each fee provider, which runs as one of
    /// several parallel sub-fetches
    pub provider_timeout: Duration,
    /// Minimum wall-clock gap between non-forced outbound fetches
    pub min_request_interval: Duration,
    /// Periodic wake-up interval
    pub refresh_interval: Duration,
    /// Delay before the initial fetch at process start
    pub initial_delay: Duration,
    /// Maximum snapshot age before a fresh fetch is warranted
    pub freshness_threshold: Duration,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            provider_timeout: Duration::from_secs(5),
            min_request_interval: Duration::from_secs(5),
            refresh_interval: Duration::from_secs(60),
            initial_delay: Duration::from_secs(2),
            freshness_threshold: Duration::from_millis(45_000),
        }
    }
}

/// Multipliers used to derive standard/fast tiers when a provider
/// exposes fewer than three fee figures
#[derive(Debug, Clone, Copy)]
pub struct FeeMultipliers {
    pub standard: f64,
    pub fast: f64,
}

impl Default for FeeMultipliers {
    fn default() -> Self {
        Self { standard: 1.5, fast: 2.0 }
    }
}

/// Blocknative confidence level per gas tier
#[derive(Debug, Clone, Copy)]
pub struct GasConfidence {
    pub low: u32,
    pub standard: u32,
    pub fast: u32,
}

impl Default for GasConfidence {
    fn default() -> Self {
        Self { low: 70, standard: 80, fast: 95 }
    }
}

/// Static gas fallbacks for when live data is unavailable
#[derive(Debug, Clone, Copy)]
pub struct DefaultGas {
    pub ethereum: FeeEstimate,
    pub bitcoin: FeeEstimate,
}

impl Default for DefaultGas {
    fn default() -> Self {
        Self {
            ethereum: FeeEstimate::new(15, 20, 25),
            bitcoin: FeeEstimate::new(10, 20, 30),
        }
    }
}

/// Retry knobs, carried for operational tuning. The aggregation path
/// recovers via cache fallback and never re-attempts a request.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub count: u32,
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { count: 3, delay: Duration::from_millis(1_000) }
    }
}

/// Badge rendering settings
#[derive(Debug, Clone)]
pub struct BadgeConfig {
    pub color: String,
    pub tooltip_prefix: String,
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            color: "#667eea".to_string(),
            tooltip_prefix: "Bitcoin: ".to_string(),
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub endpoints: ApiEndpoints,
    pub intervals: Intervals,
    pub fee_multipliers: FeeMultipliers,
    pub gas_confidence: GasConfidence,
    pub default_gas: DefaultGas,
    pub retry: RetryConfig,
    pub badge: BadgeConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.intervals.fetch_timeout, Duration::from_secs(10));
        assert!(config.intervals.provider_timeout < config.intervals.fetch_timeout);
        assert_eq!(config.fee_multipliers.standard, 1.5);
        assert_eq!(config.gas_confidence.fast, 95);
        assert!(config.default_gas.ethereum.is_plausible());
        assert!(config.default_gas.bitcoin.is_plausible());
    }
}

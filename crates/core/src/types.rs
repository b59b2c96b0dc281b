//! Core type definitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Assets tracked by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetId {
    Bitcoin,
    Ethereum,
}

impl AssetId {
    /// Stable identifier, also used as the key in provider payloads
    pub fn id(&self) -> &'static str {
        match self {
            AssetId::Bitcoin => "bitcoin",
            AssetId::Ethereum => "ethereum",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            AssetId::Bitcoin => "BTC",
            AssetId::Ethereum => "ETH",
        }
    }

    pub const ALL: [AssetId; 2] = [AssetId::Bitcoin, AssetId::Ethereum];
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Spot quote for one asset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetQuote {
    /// USD price, positive and finite
    pub price: f64,
    /// 24h change in percent
    #[serde(rename = "change24h")]
    pub change_24h: f64,
}

/// Fee-rate tiers from a single provider.
///
/// Providers are expected to yield ascending tiers but ordering is not
/// enforced; validity only requires every tier to be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
    pub low: u64,
    pub standard: u64,
    pub fast: u64,
}

impl FeeEstimate {
    pub const fn new(low: u64, standard: u64, fast: u64) -> Self {
        Self { low, standard, fast }
    }

    /// All tiers present and positive
    pub fn is_plausible(&self) -> bool {
        self.low > 0 && self.standard > 0 && self.fast > 0
    }
}

/// Fee estimates per network. `bitcoin: None` means every provider
/// failed, which is a valid terminal state rather than an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GasFees {
    pub ethereum: Option<FeeEstimate>,
    pub bitcoin: Option<FeeEstimate>,
}

/// Aggregated result of one successful fetch cycle.
///
/// Immutable value: a snapshot is only ever replaced wholesale by a
/// strictly newer, validated snapshot, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub prices: BTreeMap<AssetId, AssetQuote>,
    pub gas: GasFees,
    /// Milliseconds since epoch, set at successful-fetch completion
    pub timestamp_ms: u64,
}

impl PriceSnapshot {
    pub fn quote(&self, asset: AssetId) -> Option<AssetQuote> {
        self.prices.get(&asset).copied()
    }

    /// Age relative to `now_ms`; future timestamps read as zero age
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.timestamp_ms)
    }

    pub fn is_stale(&self, now_ms: u64, threshold: Duration) -> bool {
        self.age_ms(now_ms) > threshold.as_millis() as u64
    }
}

/// Current wall-clock time in milliseconds since epoch
pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}

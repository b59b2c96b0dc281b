//! Price aggregation with provider fallback and cache-on-failure

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use coinpeek_core::{
    now_ms, AggregateError, AggregateResult, AppConfig, AssetId, AssetQuote, GasFees,
    PriceSnapshot,
};

use crate::cache::SnapshotCache;
use crate::fetch::Transport;
use crate::gas::estimate_ethereum_gas;
use crate::providers::{bitcoin_fee_providers, estimate_bitcoin_fees, FeeProvider};

/// Fetches spot prices and fee estimates from the external providers
/// and reconciles them into one snapshot.
///
/// Failure recovery is entirely via cache fallback: an error only
/// propagates when no fresh and no cached data exists at all.
pub struct PriceAggregator {
    transport: Arc<dyn Transport>,
    cache: Arc<SnapshotCache>,
    config: AppConfig,
    providers: Vec<FeeProvider>,
    spot_url: String,
    gas_url: String,
}

impl PriceAggregator {
    pub fn new(transport: Arc<dyn Transport>, cache: Arc<SnapshotCache>, config: AppConfig) -> Self {
        let providers = bitcoin_fee_providers(&config.endpoints, config.fee_multipliers);
        let spot_url = format!(
            "{}/simple/price?ids=bitcoin,ethereum&vs_currencies=usd&include_24hr_change=true",
            config.endpoints.coingecko
        );
        let gas_url = format!("{}/gasprices/blockprices?chainid=1", config.endpoints.blocknative);

        Self { transport, cache, config, providers, spot_url, gas_url }
    }

    /// Shared cache handle, for callers that persist or read snapshots
    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// One aggregation pass.
    ///
    /// Non-forced calls inside the rate window are served from cache.
    /// Both gas sub-fetches run concurrently after price validation;
    /// their individual failures never abort the pass.
    pub async fn fetch_prices(&self, force_refresh: bool) -> AggregateResult<PriceSnapshot> {
        if !force_refresh && !self.cache.can_fetch(now_ms()) {
            if let Some(cached) = self.cache.read().await {
                debug!("request throttled, serving cached snapshot");
                return Ok(cached);
            }
            // Gate closed but nothing cached: no request has succeeded
            // recently, so fall through to a fresh fetch.
        }

        info!("fetching spot prices and fee estimates");

        let body = match self
            .transport
            .get_json(&self.spot_url, self.config.intervals.fetch_timeout)
            .await
        {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "spot price fetch failed");
                return match self.cache.read().await {
                    Some(cached) => {
                        info!("serving cached snapshot after fetch failure");
                        Ok(cached)
                    }
                    None => Err(e.into()),
                };
            }
        };

        let prices = match validate_spot_payload(&body) {
            Ok(prices) => prices,
            Err(reason) => {
                warn!(%reason, "invalid spot price payload");
                return match self.cache.read().await {
                    Some(cached) => {
                        info!("serving cached snapshot after invalid payload");
                        Ok(cached)
                    }
                    None => Err(AggregateError::InvalidData(reason)),
                };
            }
        };

        // The rate-limit clock advances only on a validated price fetch
        self.cache.mark_fetched(now_ms());

        let (ethereum, bitcoin) = tokio::join!(
            estimate_ethereum_gas(
                self.transport.as_ref(),
                &self.gas_url,
                self.config.intervals.fetch_timeout,
                self.config.gas_confidence,
                self.config.default_gas.ethereum,
            ),
            estimate_bitcoin_fees(
                self.transport.as_ref(),
                &self.providers,
                self.config.intervals.provider_timeout,
            ),
        );

        Ok(PriceSnapshot {
            prices,
            gas: GasFees { ethereum: Some(ethereum), bitcoin },
            timestamp_ms: now_ms(),
        })
    }
}

/// Validates the untrusted spot-price payload: both asset entries must
/// exist with finite positive USD values. A missing 24h change is
/// tolerated and reads as flat.
fn validate_spot_payload(body: &Value) -> Result<BTreeMap<AssetId, AssetQuote>, String> {
    let mut prices = BTreeMap::new();

    for asset in AssetId::ALL {
        let entry = body
            .get(asset.id())
            .ok_or_else(|| format!("missing {} entry", asset.id()))?;

        let price = entry
            .get("usd")
            .and_then(Value::as_f64)
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| format!("missing or non-positive usd value for {}", asset.id()))?;

        let change_24h = entry
            .get("usd_24h_change")
            .and_then(Value::as_f64)
            .filter(|c| c.is_finite())
            .unwrap_or(0.0);

        prices.insert(asset, AssetQuote { price, change_24h });
    }

    Ok(prices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::testutil::MockTransport;
    use coinpeek_core::{FeeEstimate, FetchError};
    use serde_json::json;

    fn spot_body() -> Value {
        json!({
            "bitcoin": { "usd": 97_000.5, "usd_24h_change": 2.5 },
            "ethereum": { "usd": 3_400.25, "usd_24h_change": -1.2 },
        })
    }

    fn fee_body() -> Value {
        json!({ "hourFee": 5, "halfHourFee": 10, "fastestFee": 20 })
    }

    fn gas_body() -> Value {
        json!({ "blockPrices": [{ "estimatedPrices": [
            { "confidence": 70, "price": 11.0 },
            { "confidence": 80, "price": 14.0 },
            { "confidence": 95, "price": 19.0 },
        ]}]})
    }

    fn aggregator(transport: MockTransport) -> PriceAggregator {
        let config = AppConfig::default();
        let cache = Arc::new(SnapshotCache::new(
            Arc::new(MemoryStore::default()),
            config.intervals.min_request_interval,
            config.intervals.freshness_threshold,
        ));
        PriceAggregator::new(Arc::new(transport), cache, config)
    }

    fn happy_transport() -> MockTransport {
        MockTransport::new()
            .route("coingecko", Ok(spot_body()))
            .route("blocknative", Ok(gas_body()))
            .route("mempool.space", Ok(fee_body()))
    }

    #[tokio::test]
    async fn test_snapshot_carries_input_prices_exactly() {
        let agg = aggregator(happy_transport());

        let snapshot = agg.fetch_prices(true).await.unwrap();

        assert_eq!(snapshot.quote(AssetId::Bitcoin).unwrap().price, 97_000.5);
        assert_eq!(snapshot.quote(AssetId::Bitcoin).unwrap().change_24h, 2.5);
        assert_eq!(snapshot.quote(AssetId::Ethereum).unwrap().price, 3_400.25);
        assert_eq!(snapshot.gas.ethereum, Some(FeeEstimate::new(11, 14, 19)));
        assert_eq!(snapshot.gas.bitcoin, Some(FeeEstimate::new(5, 10, 20)));
        assert!(snapshot.timestamp_ms > 0);
    }

    #[tokio::test]
    async fn test_gas_failures_do_not_abort_the_pass() {
        // Spot prices succeed; every fee/gas source fails
        let transport = MockTransport::new().route("coingecko", Ok(spot_body()));
        let agg = aggregator(transport);

        let snapshot = agg.fetch_prices(true).await.unwrap();

        // Ethereum falls back to static defaults, bitcoin to None
        assert_eq!(snapshot.gas.ethereum, Some(FeeEstimate::new(15, 20, 25)));
        assert_eq!(snapshot.gas.bitcoin, None);
    }

    #[tokio::test]
    async fn test_invalid_payload_without_cache_is_invalid_data() {
        for body in [
            json!({ "ethereum": { "usd": 3_400.0 } }),
            json!({ "bitcoin": { "usd": "soon" }, "ethereum": { "usd": 3_400.0 } }),
            json!({ "bitcoin": { "usd": -5.0 }, "ethereum": { "usd": 3_400.0 } }),
            json!(null),
        ] {
            let agg = aggregator(MockTransport::new().route("coingecko", Ok(body)));
            let err = agg.fetch_prices(true).await.unwrap_err();
            assert!(matches!(err, AggregateError::InvalidData(_)), "got {err:?}");
        }
    }

    #[tokio::test]
    async fn test_invalid_payload_with_cache_returns_cached_unchanged() {
        let agg = aggregator(
            MockTransport::new().route("coingecko", Ok(json!({ "status": "down" }))),
        );

        let mut prices = BTreeMap::new();
        prices.insert(AssetId::Bitcoin, AssetQuote { price: 90_000.0, change_24h: 0.1 });
        prices.insert(AssetId::Ethereum, AssetQuote { price: 3_000.0, change_24h: 0.2 });
        let cached = PriceSnapshot { prices, gas: GasFees::default(), timestamp_ms: 1_000 };
        agg.cache().write(&cached).await.unwrap();

        let snapshot = agg.fetch_prices(true).await.unwrap();
        assert_eq!(snapshot, cached);
    }

    #[tokio::test]
    async fn test_fetch_failure_without_cache_propagates() {
        let agg = aggregator(
            MockTransport::new().route("coingecko", Err(FetchError::Timeout(10_000))),
        );

        let err = agg.fetch_prices(true).await.unwrap_err();
        assert_eq!(err, AggregateError::Fetch(FetchError::Timeout(10_000)));
    }

    #[tokio::test]
    async fn test_fetch_failure_with_cache_falls_back() {
        let agg = aggregator(
            MockTransport::new().route("coingecko", Err(FetchError::Http(503))),
        );

        let cached = {
            let mut prices = BTreeMap::new();
            prices.insert(AssetId::Bitcoin, AssetQuote { price: 91_000.0, change_24h: 0.0 });
            prices.insert(AssetId::Ethereum, AssetQuote { price: 3_100.0, change_24h: 0.0 });
            PriceSnapshot { prices, gas: GasFees::default(), timestamp_ms: 2_000 }
        };
        agg.cache().write(&cached).await.unwrap();

        assert_eq!(agg.fetch_prices(true).await.unwrap(), cached);
    }

    #[tokio::test]
    async fn test_rate_gate_serves_cache_without_network_calls() {
        let config = AppConfig::default();
        let transport = Arc::new(happy_transport());
        let cache = Arc::new(SnapshotCache::new(
            Arc::new(MemoryStore::default()),
            config.intervals.min_request_interval,
            config.intervals.freshness_threshold,
        ));
        let agg = PriceAggregator::new(transport.clone(), cache, config);

        let first = agg.fetch_prices(false).await.unwrap();
        agg.cache().write(&first).await.unwrap();

        // Inside the rate window: cached snapshot verbatim, no new calls
        let second = agg.fetch_prices(false).await.unwrap();
        assert_eq!(
            serde_json::to_string(&second).unwrap(),
            serde_json::to_string(&first).unwrap()
        );
        assert_eq!(transport.hits("coingecko"), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_rate_gate() {
        let config = AppConfig::default();
        let transport = Arc::new(happy_transport());
        let cache = Arc::new(SnapshotCache::new(
            Arc::new(MemoryStore::default()),
            config.intervals.min_request_interval,
            config.intervals.freshness_threshold,
        ));
        let agg = PriceAggregator::new(transport.clone(), cache, config);

        let first = agg.fetch_prices(true).await.unwrap();
        agg.cache().write(&first).await.unwrap();

        agg.fetch_prices(true).await.unwrap();
        assert_eq!(transport.hits("coingecko"), 2);
    }

    #[tokio::test]
    async fn test_closed_gate_with_empty_cache_fetches_anyway() {
        let config = AppConfig::default();
        let transport = Arc::new(happy_transport());
        let cache = Arc::new(SnapshotCache::new(
            Arc::new(MemoryStore::default()),
            config.intervals.min_request_interval,
            config.intervals.freshness_threshold,
        ));
        let agg = PriceAggregator::new(transport.clone(), cache, config);

        agg.cache().mark_fetched(now_ms());

        // Nothing cached, so the gate cannot serve a hit
        let snapshot = agg.fetch_prices(false).await.unwrap();
        assert_eq!(snapshot.quote(AssetId::Bitcoin).unwrap().price, 97_000.5);
        assert_eq!(transport.hits("coingecko"), 1);
    }

    #[test]
    fn test_validate_spot_payload_coerces_missing_change() {
        let body = json!({
            "bitcoin": { "usd": 97_000.0 },
            "ethereum": { "usd": 3_400.0, "usd_24h_change": "flat" },
        });

        let prices = validate_spot_payload(&body).unwrap();
        assert_eq!(prices[&AssetId::Bitcoin].change_24h, 0.0);
        assert_eq!(prices[&AssetId::Ethereum].change_24h, 0.0);
    }
}

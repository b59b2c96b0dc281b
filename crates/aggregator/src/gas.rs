//! Ethereum gas estimation from confidence-tiered block prices

use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use coinpeek_core::{FeeEstimate, GasConfidence};

use crate::fetch::Transport;

/// Pick the price quoted at one confidence level, if present and positive
fn price_at_confidence(prices: &[Value], confidence: u32) -> Option<u64> {
    prices
        .iter()
        .find(|p| p.get("confidence").and_then(Value::as_u64) == Some(confidence as u64))
        .and_then(|p| p.get("price").and_then(Value::as_f64))
        .filter(|p| p.is_finite() && *p > 0.0)
        .map(|p| p.round() as u64)
}

/// Parse the nested block-prices payload, filling any missing tier from
/// the static defaults. `None` only when the overall shape is wrong.
pub fn parse_block_prices(
    body: &Value,
    confidence: GasConfidence,
    defaults: FeeEstimate,
) -> Option<FeeEstimate> {
    let prices = body.pointer("/blockPrices/0/estimatedPrices")?.as_array()?;

    Some(FeeEstimate {
        low: price_at_confidence(prices, confidence.low).unwrap_or(defaults.low),
        standard: price_at_confidence(prices, confidence.standard).unwrap_or(defaults.standard),
        fast: price_at_confidence(prices, confidence.fast).unwrap_or(defaults.fast),
    })
}

/// Single-provider estimate that never fails outward: any fetch or
/// shape problem falls back to the static defaults.
pub async fn estimate_ethereum_gas(
    transport: &dyn Transport,
    url: &str,
    timeout: Duration,
    confidence: GasConfidence,
    defaults: FeeEstimate,
) -> FeeEstimate {
    match transport.get_json(url, timeout).await {
        Ok(body) => parse_block_prices(&body, confidence, defaults).unwrap_or_else(|| {
            warn!("unexpected gas payload shape, using default gas");
            defaults
        }),
        Err(e) => {
            warn!(error = %e, "ethereum gas fetch failed, using default gas");
            defaults
        }
    }
}

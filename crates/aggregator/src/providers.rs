//! Bitcoin fee providers and the sequential fallback chain

use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use coinpeek_core::{ApiEndpoints, FeeEstimate, FeeMultipliers};

use crate::fetch::Transport;

/// How a provider's raw payload maps to fee tiers.
///
/// Parsers never fail loudly: malformed input yields `None`, which the
/// chain treats as "try the next provider".
#[derive(Debug, Clone, Copy)]
pub enum FeeParser {
    /// mempool.space recommended fees: hourFee/halfHourFee/fastestFee
    RecommendedFees,
    /// blockchain.info mempool fees: regular/priority figures, with
    /// fast derived from priority via the standard multiplier
    MempoolFees(FeeMultipliers),
    /// Blockchair network stats: one suggested sat/byte figure, with
    /// standard and fast derived via the multipliers
    SuggestedFeeRate(FeeMultipliers),
}

impl FeeParser {
    pub fn parse(&self, body: &Value) -> Option<FeeEstimate> {
        match self {
            FeeParser::RecommendedFees => Some(FeeEstimate {
                low: rate(body.get("hourFee")?)?,
                standard: rate(body.get("halfHourFee")?)?,
                fast: rate(body.get("fastestFee")?)?,
            }),
            FeeParser::MempoolFees(m) => {
                let regular = body.get("regular")?.as_f64()?;
                let priority = body.get("priority")?.as_f64()?;
                Some(FeeEstimate {
                    low: round_rate(regular)?,
                    standard: round_rate(priority)?,
                    fast: round_rate(priority * m.standard)?,
                })
            }
            FeeParser::SuggestedFeeRate(m) => {
                let fee = body
                    .pointer("/data/suggested_transaction_fee_per_byte_sat")?
                    .as_f64()?;
                Some(FeeEstimate {
                    low: round_rate(fee)?,
                    standard: round_rate(fee * m.standard)?,
                    fast: round_rate(fee * m.fast)?,
                })
            }
        }
    }
}

fn rate(value: &Value) -> Option<u64> {
    round_rate(value.as_f64()?)
}

fn round_rate(value: f64) -> Option<u64> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value.round() as u64)
}

/// One entry in the ordered fallback chain
#[derive(Debug, Clone)]
pub struct FeeProvider {
    pub name: &'static str,
    pub url: String,
    pub parser: FeeParser,
}

/// Ordered provider list, most reliable first
pub fn bitcoin_fee_providers(
    endpoints: &ApiEndpoints,
    multipliers: FeeMultipliers,
) -> Vec<FeeProvider> {
    vec![
        FeeProvider {
            name: "mempool.space",
            url: format!("{}/fees/recommended", endpoints.mempool_space),
            parser: FeeParser::RecommendedFees,
        },
        FeeProvider {
            name: "blockchain.info",
            url: format!("{}/mempool/fees", endpoints.blockchain_info),
            parser: FeeParser::MempoolFees(multipliers),
        },
        FeeProvider {
            name: "blockchair.com",
            url: format!("{}/bitcoin/stats", endpoints.blockchair),
            parser: FeeParser::SuggestedFeeRate(multipliers),
        },
    ]
}

/// Try each provider strictly in order, returning the first estimate
/// with all tiers positive. All-providers-failed is a normal terminal
/// outcome and yields `None`; individual failures are logged, never
/// escalated.
pub async fn estimate_bitcoin_fees(
    transport: &dyn Transport,
    providers: &[FeeProvider],
    timeout: Duration,
) -> Option<FeeEstimate> {
    for provider in providers {
        match transport.get_json(&provider.url, timeout).await {
            Ok(body) => match provider.parser.parse(&body) {
                Some(estimate) if estimate.is_plausible() => {
                    info!(provider = provider.name, ?estimate, "bitcoin fees accepted");
                    return Some(estimate);
                }
                Some(estimate) => {
                    warn!(
                        provider = provider.name,
                        ?estimate,
                        "non-positive fee tier, trying next provider"
                    );
                }
                None => {
                    warn!(
                        provider = provider.name,
                        "unparseable fee payload, trying next provider"
                    );
                }
            },
            Err(e) => {
                warn!(provider = provider.name, error = %e, "fee provider fetch failed");
            }
        }
    }

    warn!("all bitcoin fee providers failed");
    None
}

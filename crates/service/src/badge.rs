//! Compact badge derivation for the display surface

use tracing::{info, warn};

use coinpeek_core::format::{format_badge_price, format_price, validate_price};
use coinpeek_core::{AssetId, BadgeConfig, PriceSnapshot};

/// Short string + background color + tooltip rendered as a compact
/// status indicator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub text: String,
    pub color: String,
    pub tooltip: String,
}

/// Derive the badge from the snapshot's bitcoin price.
///
/// Invalid or missing price input is a silent no-op (`None`), never an
/// error.
pub fn badge_for(snapshot: &PriceSnapshot, config: &BadgeConfig) -> Option<Badge> {
    let price = snapshot.quote(AssetId::Bitcoin)?.price;
    if !validate_price(price) {
        warn!(price, "invalid bitcoin price for badge");
        return None;
    }

    Some(Badge {
        text: format_badge_price(price),
        color: config.color.clone(),
        tooltip: format!("{}{}", config.tooltip_prefix, format_price(price)),
    })
}

/// Where badges get rendered. The visual layer lives outside this
/// service and only ever receives this compact representation.
pub trait DisplaySurface: Send + Sync {
    fn update_badge(&self, badge: &Badge);
}

/// Logs badge updates; stands in for a real rendering surface
#[derive(Debug, Default)]
pub struct LogDisplay;

impl DisplaySurface for LogDisplay {
    fn update_badge(&self, badge: &Badge) {
        info!(text = %badge.text, tooltip = %badge.tooltip, "badge updated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinpeek_core::{AssetQuote, GasFees};
    use std::collections::BTreeMap;

    fn snapshot(btc_price: f64) -> PriceSnapshot {
        let mut prices = BTreeMap::new();
        prices.insert(AssetId::Bitcoin, AssetQuote { price: btc_price, change_24h: 0.0 });
        PriceSnapshot { prices, gas: GasFees::default(), timestamp_ms: 0 }
    }

    #[test]
    fn test_badge_from_valid_price() {
        let badge = badge_for(&snapshot(97_250.0), &BadgeConfig::default()).unwrap();

        assert_eq!(badge.text, "97K");
        assert_eq!(badge.color, "#667eea");
        assert_eq!(badge.tooltip, "Bitcoin: $97,250.00");
    }

    #[test]
    fn test_invalid_price_is_silent_noop() {
        assert!(badge_for(&snapshot(0.0), &BadgeConfig::default()).is_none());
        assert!(badge_for(&snapshot(f64::NAN), &BadgeConfig::default()).is_none());

        // No bitcoin quote at all
        let empty = PriceSnapshot {
            prices: BTreeMap::new(),
            gas: GasFees::default(),
            timestamp_ms: 0,
        };
        assert!(badge_for(&empty, &BadgeConfig::default()).is_none());
    }
}

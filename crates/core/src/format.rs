//! Pure display formatting, numeric validation, and currency conversion

use chrono::{Local, TimeZone};

use crate::{AssetId, PriceSnapshot};

/// True iff `n` is a finite number greater than zero
pub fn validate_price(n: f64) -> bool {
    n.is_finite() && n > 0.0
}

pub fn validate_percent_change(n: f64) -> bool {
    n.is_finite()
}

/// Currency-formatted USD string with two decimals, e.g. `$97,250.00`.
/// Non-finite or non-positive input renders as `$0.00`.
pub fn format_price(n: f64) -> String {
    if !validate_price(n) {
        return "$0.00".to_string();
    }

    let cents = (n * 100.0).round() as u64;
    format!("${}.{:02}", group_thousands(cents / 100), cents % 100)
}

/// Signed percentage with two decimals and an explicit prefix.
/// Non-finite input renders as `0.00%`.
pub fn format_percent_change(n: f64) -> String {
    if !validate_percent_change(n) {
        return "0.00%".to_string();
    }

    let sign = if n >= 0.0 { '+' } else { '-' };
    format!("{}{:.2}%", sign, n.abs())
}

/// Compact magnitude string for the badge: `97K`, `2M`, `87`.
/// Non-finite or non-positive input renders as an empty string.
pub fn format_badge_price(n: f64) -> String {
    if !validate_price(n) {
        return String::new();
    }

    if n >= 1_000_000.0 {
        format!("{}M", (n / 1_000_000.0).round() as u64)
    } else if n >= 1_000.0 {
        format!("{}K", (n / 1_000.0).round() as u64)
    } else {
        format!("{}", n.round() as u64)
    }
}

/// Human age of a timestamp relative to `now_ms`.
///
/// `never` for a missing timestamp, `just now` for timestamps in the
/// future (clock-skew tolerance), relative wording under an hour, and
/// the local wall-clock time beyond that.
pub fn format_time_ago(timestamp_ms: u64, now_ms: u64) -> String {
    if timestamp_ms == 0 {
        return "never".to_string();
    }
    if timestamp_ms > now_ms {
        return "just now".to_string();
    }

    let diff_ms = now_ms - timestamp_ms;
    let secs = diff_ms / 1_000;
    let mins = diff_ms / 60_000;

    if secs < 60 {
        format!("{} seconds ago", secs)
    } else if mins < 60 {
        format!("{} min ago", mins)
    } else {
        Local
            .timestamp_millis_opt(timestamp_ms as i64)
            .single()
            .map(|dt| dt.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string())
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Currencies supported by the converter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Bitcoin,
    Ethereum,
    Usd,
}

impl Currency {
    /// Display rounding for converted amounts
    pub fn decimal_places(&self) -> usize {
        match self {
            Currency::Usd => 2,
            Currency::Bitcoin | Currency::Ethereum => 8,
        }
    }

    fn asset(&self) -> Option<AssetId> {
        match self {
            Currency::Bitcoin => Some(AssetId::Bitcoin),
            Currency::Ethereum => Some(AssetId::Ethereum),
            Currency::Usd => None,
        }
    }
}

/// Convert between supported currencies by pivoting through USD.
/// Returns 0.0 when a required price is missing or non-positive.
pub fn convert(amount: f64, from: Currency, to: Currency, snapshot: &PriceSnapshot) -> f64 {
    let price_of = |asset: AssetId| {
        snapshot
            .quote(asset)
            .map(|q| q.price)
            .filter(|p| validate_price(*p))
    };

    let usd = match from.asset() {
        Some(asset) => match price_of(asset) {
            Some(price) => amount * price,
            None => return 0.0,
        },
        None => amount,
    };

    match to.asset() {
        Some(asset) => price_of(asset).map(|price| usd / price).unwrap_or(0.0),
        None => usd,
    }
}

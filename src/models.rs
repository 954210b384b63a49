use serde::Deserialize;

/// One point-in-time price/volume/change reading for an asset.
///
/// Produced fresh on every fetch; never persisted. The optional 24h fields
/// default to zero when the provider omits them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSnapshot {
    /// Current price in USD.
    pub price: f64,
    /// Trading volume over the last 24 hours, in USD.
    pub volume_24h: f64,
    /// Price change over the last 24 hours, in percent.
    pub change_24h: f64,
}

/// Raw per-asset quote as returned by the provider's simple-price endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawQuote {
    pub usd: f64,
    #[serde(default)]
    pub usd_24h_vol: f64,
    #[serde(default)]
    pub usd_24h_change: f64,
}

impl From<RawQuote> for PriceSnapshot {
    fn from(raw: RawQuote) -> Self {
        Self {
            price: raw.usd,
            volume_24h: raw.usd_24h_vol,
            change_24h: raw.usd_24h_change,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_quote_defaults_missing_fields_to_zero() {
        let raw: RawQuote = serde_json::from_str(r#"{"usd": 123.45}"#).unwrap();
        let snapshot = PriceSnapshot::from(raw);
        assert_eq!(snapshot.price, 123.45);
        assert_eq!(snapshot.volume_24h, 0.0);
        assert_eq!(snapshot.change_24h, 0.0);
    }

    #[test]
    fn raw_quote_parses_full_payload() {
        let raw: RawQuote = serde_json::from_str(
            r#"{"usd": 0.0321, "usd_24h_vol": 1523000.0, "usd_24h_change": -4.27}"#,
        )
        .unwrap();
        let snapshot = PriceSnapshot::from(raw);
        assert_eq!(snapshot.price, 0.0321);
        assert_eq!(snapshot.volume_24h, 1_523_000.0);
        assert_eq!(snapshot.change_24h, -4.27);
    }
}

use crate::errors::{Error, Result};
use crate::models::{PriceSnapshot, RawQuote};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

const COINGECKO_BASE_URL: &str = "https://api.coingecko.com";

/// Seam for anything that can produce a price snapshot for an asset.
///
/// Schedulers and commands depend on this trait so tests can substitute a
/// canned source. Implementations must return an `Err` on any transport
/// problem, non-success status, or malformed payload; callers decide how to
/// log and continue.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(&self, asset_id: &str) -> Result<PriceSnapshot>;
}

/// `PriceSource` backed by CoinGecko's simple-price endpoint.
///
/// One GET per fetch, no retry, no internal caching; timeouts are whatever
/// the `reqwest` client defaults to.
#[derive(Debug, Clone)]
pub struct CoinGeckoSource {
    client: reqwest::Client,
    base_url: String,
}

impl CoinGeckoSource {
    pub fn new() -> Self {
        Self::with_base_url(COINGECKO_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

impl Default for CoinGeckoSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceSource for CoinGeckoSource {
    async fn fetch(&self, asset_id: &str) -> Result<PriceSnapshot> {
        let url = format!("{}/api/v3/simple/price", self.base_url);
        debug!("Fetching quote for {} from {}", asset_id, url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("ids", asset_id),
                ("vs_currencies", "usd"),
                ("include_24hr_vol", "true"),
                ("include_24hr_change", "true"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::PriceUnavailable(format!(
                "provider returned HTTP {status}"
            )));
        }

        let payload: HashMap<String, RawQuote> = response.json().await?;
        let quote = payload.get(asset_id).copied().ok_or_else(|| {
            Error::PriceUnavailable(format!("provider response has no quote for {asset_id}"))
        })?;

        Ok(PriceSnapshot::from(quote))
    }
}

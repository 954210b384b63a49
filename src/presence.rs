//! Presence refresh scheduling and status-string formatting.
//!
//! Every tick fetches a fresh snapshot, overwrites the shared price cache,
//! and pushes a (title, state) pair to the gateway. Fetch and mutation
//! failures are logged and the tick becomes a no-op; the cache is only ever
//! written after a successful fetch.

use crate::cache::PriceCache;
use crate::errors::Result;
use crate::fetcher::PriceSource;
use crate::models::PriceSnapshot;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

const TITLE_LABEL: &str = "DEV";
const UP_INDICATOR: char = '↑';
const DOWN_INDICATOR: char = '↓';

/// Seam for the platform call that mutates the bot's displayed activity.
#[async_trait]
pub trait PresenceSink: Send + Sync {
    async fn set_presence(&self, title: &str, state: &str) -> Result<()>;
}

/// What a single presence tick did, for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Snapshot fetched, cache overwritten, presence mutated.
    Updated { price: f64 },
    /// Fetch failed; cache and presence untouched.
    FetchFailed,
    /// Snapshot fetched and cached, but the presence call failed.
    PresenceFailed { price: f64 },
}

/// Activity title: the fixed label plus the price to 5 decimal places.
pub fn presence_title(price: f64) -> String {
    format!("{TITLE_LABEL} ${price:.5}")
}

/// Activity state: direction indicator, 24h change to 2 decimals, and the
/// 24h volume with a magnitude suffix. Zero change counts as up.
pub fn presence_state(snapshot: &PriceSnapshot) -> String {
    let indicator = if snapshot.change_24h >= 0.0 {
        UP_INDICATOR
    } else {
        DOWN_INDICATOR
    };
    format!(
        "{indicator} {:.2}% 24h | Vol ${}",
        snapshot.change_24h,
        abbreviate_volume(snapshot.volume_24h)
    )
}

/// Abbreviates a volume figure with K/M/B suffixes, one decimal of precision.
pub fn abbreviate_volume(volume: f64) -> String {
    if volume >= 1e9 {
        format!("{:.1}B", volume / 1e9)
    } else if volume >= 1e6 {
        format!("{:.1}M", volume / 1e6)
    } else if volume >= 1e3 {
        format!("{:.1}K", volume / 1e3)
    } else {
        format!("{volume:.1}")
    }
}

/// Runs one presence refresh: fetch, cache, mutate.
pub async fn presence_tick(
    source: &dyn PriceSource,
    cache: &PriceCache,
    sink: &dyn PresenceSink,
    asset_id: &str,
) -> TickOutcome {
    let snapshot = match source.fetch(asset_id).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Price fetch for {} failed: {}", asset_id, e);
            return TickOutcome::FetchFailed;
        }
    };

    cache.store(snapshot.price).await;

    let title = presence_title(snapshot.price);
    let state = presence_state(&snapshot);
    match sink.set_presence(&title, &state).await {
        Ok(()) => {
            info!("Presence updated: {} / {}", title, state);
            TickOutcome::Updated {
                price: snapshot.price,
            }
        }
        Err(e) => {
            warn!("Presence update failed: {}", e);
            TickOutcome::PresenceFailed {
                price: snapshot.price,
            }
        }
    }
}

/// Drives `presence_tick` on a fixed interval, forever.
///
/// The first tick fires immediately so the presence is populated before the
/// first interval elapses. Ticks are serialized: each one is awaited before
/// the next trigger, and triggers missed by a slow tick are skipped rather
/// than replayed back-to-back.
pub async fn run_presence_loop(
    interval: Duration,
    source: Arc<dyn PriceSource>,
    cache: PriceCache,
    sink: Arc<dyn PresenceSink>,
    asset_id: String,
) {
    info!(
        "Starting presence updater for {} every {:?}",
        asset_id, interval
    );
    let mut timer = tokio::time::interval(interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        timer.tick().await;
        presence_tick(source.as_ref(), &cache, sink.as_ref(), &asset_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use std::sync::Mutex;

    struct StubSource {
        result: std::result::Result<PriceSnapshot, String>,
    }

    #[async_trait]
    impl PriceSource for StubSource {
        async fn fetch(&self, _asset_id: &str) -> Result<PriceSnapshot> {
            self.result.clone().map_err(Error::PriceUnavailable)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl PresenceSink for RecordingSink {
        async fn set_presence(&self, title: &str, state: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((title.to_string(), state.to_string()));
            if self.fail {
                Err(Error::PriceUnavailable("gateway said no".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn snapshot(price: f64, volume: f64, change: f64) -> PriceSnapshot {
        PriceSnapshot {
            price,
            volume_24h: volume,
            change_24h: change,
        }
    }

    #[test]
    fn title_renders_five_decimals_under_fixed_label() {
        assert_eq!(presence_title(123.45), "DEV $123.45000");
        assert_eq!(presence_title(0.0184299), "DEV $0.01843");
    }

    #[test]
    fn state_uses_up_indicator_for_non_negative_change() {
        let up = presence_state(&snapshot(1.0, 2_500_000.0, 3.456));
        assert_eq!(up, "↑ 3.46% 24h | Vol $2.5M");
        let flat = presence_state(&snapshot(1.0, 500.0, 0.0));
        assert!(flat.starts_with('↑'), "zero change counts as up: {flat}");
    }

    #[test]
    fn state_uses_down_indicator_for_negative_change() {
        let down = presence_state(&snapshot(1.0, 1_200.0, -0.5));
        assert_eq!(down, "↓ -0.50% 24h | Vol $1.2K");
    }

    #[test]
    fn volume_abbreviation_uses_magnitude_suffixes() {
        assert_eq!(abbreviate_volume(950.0), "950.0");
        assert_eq!(abbreviate_volume(1_000.0), "1.0K");
        assert_eq!(abbreviate_volume(84_300.0), "84.3K");
        assert_eq!(abbreviate_volume(2_500_000.0), "2.5M");
        assert_eq!(abbreviate_volume(7_100_000_000.0), "7.1B");
    }

    #[tokio::test]
    async fn successful_tick_caches_price_and_mutates_presence() {
        let source = StubSource {
            result: Ok(snapshot(0.0321, 84_300.0, 1.2)),
        };
        let cache = PriceCache::new();
        let sink = RecordingSink::default();

        let outcome = presence_tick(&source, &cache, &sink, "dev-protocol").await;

        assert_eq!(outcome, TickOutcome::Updated { price: 0.0321 });
        assert_eq!(cache.latest().await, Some(0.0321));
        let calls = sink.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "DEV $0.03210");
    }

    #[tokio::test]
    async fn failed_fetch_leaves_cache_untouched_and_skips_presence() {
        let source = StubSource {
            result: Err("provider down".to_string()),
        };
        let cache = PriceCache::new();
        cache.store(0.5).await;
        let sink = RecordingSink::default();

        let outcome = presence_tick(&source, &cache, &sink, "dev-protocol").await;

        assert_eq!(outcome, TickOutcome::FetchFailed);
        assert_eq!(cache.latest().await, Some(0.5));
        assert!(sink.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_keeps_cache_uninitialized() {
        let source = StubSource {
            result: Err("provider down".to_string()),
        };
        let cache = PriceCache::new();
        let sink = RecordingSink::default();

        presence_tick(&source, &cache, &sink, "dev-protocol").await;

        assert_eq!(cache.latest().await, None);
    }

    #[tokio::test]
    async fn presence_failure_still_caches_the_price() {
        let source = StubSource {
            result: Ok(snapshot(0.0321, 84_300.0, 1.2)),
        };
        let cache = PriceCache::new();
        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };

        let outcome = presence_tick(&source, &cache, &sink, "dev-protocol").await;

        assert_eq!(outcome, TickOutcome::PresenceFailed { price: 0.0321 });
        assert_eq!(cache.latest().await, Some(0.0321));
    }
}

//! Hourly username refresh, off by default behind the `UPDATE_USERNAME`
//! toggle.
//!
//! Discord rate-limits identity changes aggressively, so a rename is only
//! issued when the candidate name actually differs from the current one.

use crate::errors::Result;
use crate::fetcher::PriceSource;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

const USERNAME_LABEL: &str = "DEV";

/// Seam for reading and mutating the bot's platform identity.
#[async_trait]
pub trait IdentitySink: Send + Sync {
    async fn current_username(&self) -> Result<String>;
    async fn rename(&self, username: &str) -> Result<()>;
}

/// What a single username tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum RenameOutcome {
    Renamed { username: String },
    /// Candidate equals the current name; no call issued.
    Unchanged,
    FetchFailed,
    RenameFailed,
}

/// Candidate username: fixed label plus price to 5 decimal places.
pub fn candidate_username(price: f64) -> String {
    format!("{USERNAME_LABEL} ${price:.5}")
}

/// Runs one username refresh: fetch, compare, rename only on difference.
pub async fn username_tick(
    source: &dyn PriceSource,
    identity: &dyn IdentitySink,
    asset_id: &str,
) -> RenameOutcome {
    let snapshot = match source.fetch(asset_id).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Price fetch for {} failed: {}", asset_id, e);
            return RenameOutcome::FetchFailed;
        }
    };

    let candidate = candidate_username(snapshot.price);
    let current = match identity.current_username().await {
        Ok(name) => name,
        Err(e) => {
            warn!("Could not read current username: {}", e);
            return RenameOutcome::RenameFailed;
        }
    };

    if candidate == current {
        info!("Username already up to date ({})", current);
        return RenameOutcome::Unchanged;
    }

    match identity.rename(&candidate).await {
        Ok(()) => {
            info!("Username changed to {}", candidate);
            RenameOutcome::Renamed {
                username: candidate,
            }
        }
        Err(e) => {
            warn!("Username change failed: {}", e);
            RenameOutcome::RenameFailed
        }
    }
}

/// Drives `username_tick` on a fixed interval, forever. Same serialization
/// rules as the presence loop.
pub async fn run_username_loop(
    interval: Duration,
    source: Arc<dyn PriceSource>,
    identity: Arc<dyn IdentitySink>,
    asset_id: String,
) {
    info!(
        "Starting username updater for {} every {:?}",
        asset_id, interval
    );
    let mut timer = tokio::time::interval(interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        timer.tick().await;
        username_tick(source.as_ref(), identity.as_ref(), &asset_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::models::PriceSnapshot;
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

    struct StubIdentity {
        current: String,
        renames: Mutex<Vec<String>>,
    }

    impl StubIdentity {
        fn named(current: &str) -> Self {
            Self {
                current: current.to_string(),
                renames: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl IdentitySink for StubIdentity {
        async fn current_username(&self) -> Result<String> {
            Ok(self.current.clone())
        }

        async fn rename(&self, username: &str) -> Result<()> {
            self.renames.lock().unwrap().push(username.to_string());
            Ok(())
        }
    }

    fn priced(price: f64) -> StubSource {
        StubSource {
            result: Ok(PriceSnapshot {
                price,
                volume_24h: 0.0,
                change_24h: 0.0,
            }),
        }
    }

    #[test]
    fn candidate_embeds_price_to_five_decimals() {
        assert_eq!(candidate_username(0.0321), "DEV $0.03210");
    }

    #[tokio::test]
    async fn renames_when_candidate_differs() {
        let source = priced(0.0321);
        let identity = StubIdentity::named("DEV $0.03000");

        let outcome = username_tick(&source, &identity, "dev-protocol").await;

        assert_eq!(
            outcome,
            RenameOutcome::Renamed {
                username: "DEV $0.03210".to_string()
            }
        );
        assert_eq!(*identity.renames.lock().unwrap(), vec!["DEV $0.03210"]);
    }

    #[tokio::test]
    async fn identical_candidate_issues_no_rename() {
        let source = priced(0.0321);
        let identity = StubIdentity::named("DEV $0.03210");

        let outcome = username_tick(&source, &identity, "dev-protocol").await;

        assert_eq!(outcome, RenameOutcome::Unchanged);
        assert!(identity.renames.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_issues_no_rename() {
        let source = StubSource {
            result: Err("provider down".to_string()),
        };
        let identity = StubIdentity::named("DEV $0.03210");

        let outcome = username_tick(&source, &identity, "dev-protocol").await;

        assert_eq!(outcome, RenameOutcome::FetchFailed);
        assert!(identity.renames.lock().unwrap().is_empty());
    }
}

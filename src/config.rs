use crate::errors::{Error, Result};
use std::env;
use std::time::Duration;

/// CoinGecko asset identifier polled by every scheduler and command.
pub const DEFAULT_ASSET_ID: &str = "dev-protocol";

const DEFAULT_PRESENCE_INTERVAL_SECS: u64 = 480;
const DEFAULT_USERNAME_INTERVAL_SECS: u64 = 3600;

/// Runtime configuration, read once at startup from the environment.
///
/// The intervals and the username-updater toggle are configurable because
/// this bot has run in two shapes: an hourly-rename variant with a 5-minute
/// presence refresh, and the current one with no rename and an 8-minute
/// refresh. Defaults match the current shape.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    /// Legacy prefix variable; read for compatibility, no command uses it.
    #[allow(dead_code)]
    pub command_prefix: Option<String>,
    pub asset_id: String,
    pub presence_interval: Duration,
    pub update_username: bool,
    pub username_interval: Duration,
}

impl BotConfig {
    /// Loads the configuration from process environment variables.
    ///
    /// Fails if `DISCORD_TOKEN` is absent or an interval variable does not
    /// parse; both are fatal startup errors for the caller.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration through a lookup closure, so tests can supply
    /// variables without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("DISCORD_TOKEN")
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Config("DISCORD_TOKEN is not set".to_string()))?;

        let presence_interval = interval_from(
            &lookup,
            "PRESENCE_INTERVAL_SECS",
            DEFAULT_PRESENCE_INTERVAL_SECS,
        )?;
        let username_interval = interval_from(
            &lookup,
            "USERNAME_INTERVAL_SECS",
            DEFAULT_USERNAME_INTERVAL_SECS,
        )?;

        let update_username = lookup("UPDATE_USERNAME")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            token,
            command_prefix: lookup("BOT_PREFIX"),
            asset_id: lookup("PRICE_ASSET_ID").unwrap_or_else(|| DEFAULT_ASSET_ID.to_string()),
            presence_interval,
            update_username,
            username_interval,
        })
    }
}

fn interval_from<F>(lookup: &F, key: &str, default_secs: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| Error::Config(format!("{key} must be a positive integer: {e}")))?,
        None => default_secs,
    };
    if secs == 0 {
        return Err(Error::Config(format!("{key} must be greater than zero")));
    }
    Ok(Duration::from_secs(secs))
}

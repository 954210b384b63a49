use crate::bot::Context;
use crate::errors::Result;
use crate::fetcher::PriceSource;
use tracing::{info, warn};

const UNAVAILABLE_REPLY: &str = "Sorry, I couldn't fetch the price right now. Please try again in a bit.";

/// On-demand price lookup.
///
/// Always fetches fresh, bypassing the presence updater's cache, so the
/// reply reflects this moment rather than the last tick.
#[poise::command(slash_command)]
pub async fn price(ctx: Context<'_>) -> Result<()> {
    info!("Price command received from user: {}", ctx.author().name);
    let data = ctx.data();
    match data.source.fetch(&data.config.asset_id).await {
        Ok(snapshot) => {
            ctx.say(price_reply(snapshot.price)).await?;
        }
        Err(e) => {
            warn!("Price command fetch failed: {}", e);
            ctx.say(UNAVAILABLE_REPLY).await?;
        }
    }
    Ok(())
}

fn price_reply(price: f64) -> String {
    format!("**DEV Token Price:** ${price:.5}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_is_the_exact_announcement_string() {
        assert_eq!(price_reply(123.45), "**DEV Token Price:** $123.45000\n");
    }

    #[test]
    fn reply_pads_short_fractions_to_five_digits() {
        assert_eq!(price_reply(0.03), "**DEV Token Price:** $0.03000\n");
    }
}

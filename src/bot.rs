use crate::cache::PriceCache;
use crate::config::BotConfig;
use crate::errors;
use crate::fetcher::{CoinGeckoSource, PriceSource};
use crate::presence::{self, PresenceSink};
use crate::username::{self, IdentitySink};
use crate::commands;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{info, instrument};

// User data, which is stored and accessible in all command invocations
#[allow(dead_code)]
pub struct Data {
    pub config: Arc<BotConfig>,
    pub cache: PriceCache,
    pub source: Arc<dyn PriceSource>,
}

// Type alias for the error type Poise will use
pub(crate) type Error = errors::Error;
pub(crate) type Context<'a> = poise::Context<'a, Data, Error>;

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            panic!("Failed to start bot: {:?}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!("Error in command `{}`: {:?}", ctx.command().name, error);
            if let Err(e) = ctx.say(format!("An error occurred: {}", error)).await {
                tracing::error!("Failed to send error message: {}", e);
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                tracing::error!("Error while handling error: {}", e)
            }
        }
    }
}

/// Which registry mutations bring the remote command set in line with the
/// local one. Indices refer into the local and remote name slices.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ReconcilePlan {
    pub create: Vec<usize>,
    pub delete: Vec<usize>,
}

/// Diffs the local command descriptors against the platform's registered
/// set. Commands already present on both sides are left alone so startup is
/// idempotent.
pub(crate) fn reconcile_plan(local: &[String], remote: &[String]) -> ReconcilePlan {
    ReconcilePlan {
        create: local
            .iter()
            .enumerate()
            .filter(|(_, name)| !remote.contains(name))
            .map(|(i, _)| i)
            .collect(),
        delete: remote
            .iter()
            .enumerate()
            .filter(|(_, name)| !local.contains(name))
            .map(|(i, _)| i)
            .collect(),
    }
}

/// Presence mutations through the gateway shard.
struct GatewayPresence {
    ctx: serenity::Context,
}

#[async_trait]
impl PresenceSink for GatewayPresence {
    async fn set_presence(&self, title: &str, state: &str) -> errors::Result<()> {
        let mut activity = serenity::ActivityData::watching(title);
        activity.state = Some(state.to_string());
        self.ctx.set_activity(Some(activity));
        Ok(())
    }
}

/// Identity reads and renames through the REST API.
struct HttpIdentity {
    http: Arc<serenity::Http>,
}

#[async_trait]
impl IdentitySink for HttpIdentity {
    async fn current_username(&self) -> errors::Result<String> {
        let user = self.http.get_current_user().await.map_err(Error::from)?;
        Ok(user.name.clone())
    }

    async fn rename(&self, username: &str) -> errors::Result<()> {
        let mut user = self.http.get_current_user().await.map_err(Error::from)?;
        user.edit(&self.http, serenity::EditProfile::new().username(username))
            .await
            .map_err(Error::from)?;
        Ok(())
    }
}

async fn reconcile_commands(
    ctx: &serenity::Context,
    framework: &poise::Framework<Data, Error>,
) -> Result<(), serenity::Error> {
    let local_names: Vec<String> = framework
        .options()
        .commands
        .iter()
        .map(|c| c.name.clone())
        .collect();
    let builders = poise::builtins::create_application_commands(&framework.options().commands);
    let remote = ctx.http.get_global_commands().await?;
    let remote_names: Vec<String> = remote.iter().map(|c| c.name.clone()).collect();

    let plan = reconcile_plan(&local_names, &remote_names);
    for idx in plan.delete {
        info!("Deleting stale remote command `{}`", remote_names[idx]);
        ctx.http.delete_global_command(remote[idx].id).await?;
    }
    for idx in plan.create {
        info!("Registering command `{}`", local_names[idx]);
        ctx.http.create_global_command(&builders[idx]).await?;
    }
    Ok(())
}

#[instrument(skip(config))]
pub async fn run_bot(config: Arc<BotConfig>) -> errors::Result<()> {
    let cache = PriceCache::new();
    let source: Arc<dyn PriceSource> = Arc::new(CoinGeckoSource::new());

    let setup_config = Arc::clone(&config);
    let setup_cache = cache.clone();
    let setup_source = Arc::clone(&source);

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![commands::ping(), commands::price()],
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                reconcile_commands(ctx, framework).await?;

                let presence_sink: Arc<dyn PresenceSink> = Arc::new(GatewayPresence {
                    ctx: ctx.clone(),
                });
                tokio::spawn(presence::run_presence_loop(
                    setup_config.presence_interval,
                    Arc::clone(&setup_source),
                    setup_cache.clone(),
                    presence_sink,
                    setup_config.asset_id.clone(),
                ));

                if setup_config.update_username {
                    let identity: Arc<dyn IdentitySink> = Arc::new(HttpIdentity {
                        http: Arc::clone(&ctx.http),
                    });
                    tokio::spawn(username::run_username_loop(
                        setup_config.username_interval,
                        Arc::clone(&setup_source),
                        identity,
                        setup_config.asset_id.clone(),
                    ));
                }

                Ok(Data {
                    config: setup_config,
                    cache: setup_cache,
                    source: setup_source,
                })
            })
        })
        .build();

    // Guild, message, and member events.
    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::GUILD_MEMBERS;

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(&config.token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| tracing::error!("Error creating client: {:?}", e))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| tracing::error!("Client error: {:?}", e))?;
    Ok(())
}

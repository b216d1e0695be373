//! Bot layer - Discord-specific interface and command handlers
//!
//! This module wires the economy core into a `poise` framework: slash and prefix commands,
//! autocomplete, the message reward listener and the error hook.

/// Discord command implementations grouped by feature
pub mod commands;
/// Discord event and interaction handlers (autocomplete, message rewards)
pub mod handlers;

use crate::{
    config::Settings,
    core::{Economy, rps::RpsTable},
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Shared data available to all bot commands.
pub struct BotData {
    /// Economy handle (database, tuning, wallet locks)
    pub economy: Arc<Economy>,
    /// Pending rock-paper-scissors challenges
    pub rps: RpsTable,
    /// Process settings
    pub settings: Settings,
}

impl BotData {
    /// Creates a new `BotData` around an economy handle.
    #[must_use]
    pub fn new(economy: Arc<Economy>, settings: Settings) -> Self {
        Self {
            economy,
            rps: RpsTable::new(),
            settings,
        }
    }
}

/// Database key of a Discord user.
///
/// # Errors
/// Returns [`Error::Conversion`] for ids above `i64::MAX`, which Discord never issues.
pub fn user_key(id: serenity::UserId) -> Result<i64> {
    Ok(i64::try_from(id.get())?)
}

/// Mention markup for a stored user id.
#[must_use]
pub fn mention(user_id: i64) -> String {
    format!("<@{user_id}>")
}

/// Formats a PrissBucks amount with thousands separators, e.g. `12,345 PB`.
#[must_use]
pub fn format_pb(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}{grouped} PB")
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {:?}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            let reply = if error.is_user_facing() {
                format!("❌ {error}")
            } else {
                error!("Error in command `{}`: {:?}", ctx.command().name, error);
                "❌ Something went wrong. Please try again later.".to_string()
            };
            if let Err(e) = ctx.say(reply).await {
                error!("Failed to send error message: {}", e);
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Starts the Discord client and blocks until it stops.
///
/// # Errors
/// Returns an error if the client cannot be built or the gateway connection fails.
#[instrument(skip_all)]
pub async fn run_bot(settings: Settings, economy: Arc<Economy>) -> Result<()> {
    let token = settings.token.clone();
    let owners = settings
        .owner_id
        .filter(|id| *id != 0)
        .map(serenity::UserId::new)
        .into_iter()
        .collect();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(settings.prefix.clone()),
                ..Default::default()
            },
            owners,
            skip_checks_for_owners: true,
            on_error: |error| Box::pin(on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(handlers::messages::handle_event(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(BotData::new(economy, settings))
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(&token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {:?}", e))?;

    info!("Starting bot client...");
    client.start().await.inspect_err(|e| error!("Client error: {:?}", e))?;
    warn!("Bot client stopped");
    Ok(())
}

pub use commands::*;
pub use handlers::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pb() {
        assert_eq!(format_pb(0), "0 PB");
        assert_eq!(format_pb(999), "999 PB");
        assert_eq!(format_pb(1_000), "1,000 PB");
        assert_eq!(format_pb(1_234_567), "1,234,567 PB");
        assert_eq!(format_pb(-25_000), "-25,000 PB");
    }

    #[test]
    fn test_user_key() {
        assert_eq!(user_key(serenity::UserId::new(42)).unwrap_or_default(), 42);
        assert!(user_key(serenity::UserId::new(u64::MAX)).is_err());
        assert_eq!(mention(7), "<@7>");
    }
}

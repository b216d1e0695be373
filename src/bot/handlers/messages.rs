//! Gateway event handling: every guild message is counted for activity statistics, and
//! qualifying ones earn PrissBucks and XP.

use crate::{
    bot::{BotData, user_key},
    core::{activity, rewards},
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use tracing::{debug, error};

/// Dispatches gateway events the framework does not handle itself.
pub async fn handle_event(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, BotData, Error>,
    data: &BotData,
) -> Result<()> {
    if let serenity::FullEvent::Message { new_message } = event {
        if let Err(e) = count_message(new_message, data).await {
            error!("Failed to record activity for message {}: {}", new_message.id, e);
        }
        if let Err(e) = reward_message(ctx, new_message, data).await {
            error!("Failed to reward message {}: {}", new_message.id, e);
        }
    }
    Ok(())
}

async fn count_message(message: &serenity::Message, data: &BotData) -> Result<()> {
    let Some(guild_id) = message.guild_id.filter(|_| !message.author.bot) else {
        return Ok(());
    };
    activity::record_message(
        &data.economy.db,
        i64::try_from(guild_id.get())?,
        user_key(message.author.id)?,
        chrono::Utc::now(),
    )
    .await
}

async fn reward_message(
    ctx: &serenity::Context,
    message: &serenity::Message,
    data: &BotData,
) -> Result<()> {
    let eco = &data.economy;
    if !rewards::is_rewardable(
        message.author.bot,
        message.guild_id.is_some(),
        &message.content,
        &data.settings.prefix,
        &eco.config.rewards,
    ) {
        return Ok(());
    }

    let user_id = user_key(message.author.id)?;
    let Some(reward) = rewards::reward_message(eco, user_id).await? else {
        return Ok(());
    };
    debug!(user_id, pb = reward.pb, debt_repaid = reward.debt_repaid, "message rewarded");

    if let Some(gain) = reward.xp.filter(|g| g.leveled_up) {
        message
            .channel_id
            .say(
                &ctx.http,
                format!(
                    "🎉 <@{user_id}> reached **level {}**! ({} XP total)",
                    gain.level, gain.total_xp
                ),
            )
            .await?;
    }
    Ok(())
}

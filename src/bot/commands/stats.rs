//! Activity commands - most active members, personal and server message statistics.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, mention, user_key},
        core::activity,
        errors::{Error, Result},
    };
    use chrono::Utc;
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    fn guild_key(ctx: poise::Context<'_, BotData, Error>) -> Result<i64> {
        let guild_id = ctx
            .guild_id()
            .ok_or_else(|| Error::rule("This command only works in a server"))?;
        Ok(i64::try_from(guild_id.get())?)
    }

    /// Ranks the members who sent the most messages.
    #[poise::command(slash_command, prefix_command, guild_only, aliases("topactifs"))]
    pub async fn topactive(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "How many members to show (1-50)"] limit: Option<u64>,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let guild_id = guild_key(ctx)?;
        let limit = limit.unwrap_or(eco.config.activity.top_limit);
        let top = activity::top(eco, guild_id, limit).await?;

        if top.is_empty() {
            ctx.say("📊 No activity tracked yet.").await?;
            return Ok(());
        }

        let mut description = String::new();
        for (rank, row) in top.iter().enumerate() {
            writeln!(
                description,
                "**{}.** {} - {} messages",
                rank + 1,
                mention(row.user_id),
                row.message_count
            )?;
        }

        let embed = serenity::CreateEmbed::default()
            .title(format!("📊 Top {} most active members", top.len()))
            .color(0x0058_65F2)
            .description(description)
            .footer(serenity::CreateEmbedFooter::new(
                "Ranked by total messages tracked",
            ));
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows how many messages you (or another member) sent here.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn mystats(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Member to look up (defaults to you)"] user: Option<serenity::User>,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let guild_id = guild_key(ctx)?;
        let target = user.as_ref().unwrap_or_else(|| ctx.author());
        let user_id = user_key(target.id)?;

        let Some(details) = activity::member(eco, guild_id, user_id).await? else {
            ctx.say(format!("📊 No activity tracked for {} yet.", mention(user_id)))
                .await?;
            return Ok(());
        };

        let window = eco.config.activity.active_window_days;
        let active = details.activity.last_message_at
            >= Utc::now() - chrono::Duration::days(window);
        let embed = serenity::CreateEmbed::default()
            .title(format!("📊 Activity of {}", target.name))
            .color(0x0058_65F2)
            .field("Messages", details.activity.message_count.to_string(), true)
            .field(
                "Rank",
                format!("#{} of {}", details.rank, details.total_tracked),
                true,
            )
            .field(
                "Last message",
                details
                    .activity
                    .last_message_at
                    .format("%Y-%m-%d %H:%M UTC")
                    .to_string(),
                true,
            )
            .footer(serenity::CreateEmbedFooter::new(if active {
                format!("Active within the last {window} days")
            } else {
                format!("Inactive for more than {window} days")
            }));
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows message totals and active members for this server.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn serverstats(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let guild_id = guild_key(ctx)?;
        let overview = activity::overview(eco, guild_id, Utc::now()).await?;

        let embed = serenity::CreateEmbed::default()
            .title("📊 Server activity")
            .color(0x0058_65F2)
            .field("Messages tracked", overview.total_messages.to_string(), true)
            .field(
                format!("Active ({} days)", overview.window_days),
                overview.active_members.to_string(),
                true,
            )
            .field("Members tracked", overview.tracked_members.to_string(), true);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

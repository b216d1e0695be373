//! Clan commands - creation, membership, upgrades and rankings.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, format_pb, mention, user_key},
        core::clan::{self, LeaveOutcome, Upgrade},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Parent command for clans.
    #[poise::command(
        slash_command,
        prefix_command,
        subcommands(
            "clan_create",
            "clan_join",
            "clan_leave",
            "clan_kick",
            "clan_upgrade",
            "clan_boost",
            "clan_info",
            "clan_top"
        ),
        subcommand_required
    )]
    pub async fn clan(_ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        Ok(())
    }

    /// Founds a new clan and makes you its leader.
    #[poise::command(slash_command, prefix_command, rename = "create")]
    pub async fn clan_create(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Clan name"] name: String,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let created = clan::create(eco, user_id, &name).await?;

        ctx.say(format!(
            "🏰 Clan **{}** founded for {}! Invite friends with `/clan join {}`.",
            created.name,
            format_pb(eco.config.clan.create_cost),
            created.name
        ))
        .await?;
        Ok(())
    }

    /// Joins an existing clan.
    #[poise::command(slash_command, prefix_command, rename = "join")]
    pub async fn clan_join(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Clan name"] name: String,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let joined = clan::join(eco, user_id, &name).await?;

        ctx.say(format!(
            "🤝 Welcome to **{}**! The entry fee of {} counts as your contribution.",
            joined.name,
            format_pb(eco.config.clan.join_cost)
        ))
        .await?;
        Ok(())
    }

    /// Leaves your clan. A leader hands over to the top contributor.
    #[poise::command(slash_command, prefix_command, rename = "leave")]
    pub async fn clan_leave(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;

        let message = match clan::leave(eco, user_id).await? {
            LeaveOutcome::Left { clan } => format!("👋 You left **{clan}**."),
            LeaveOutcome::LeadershipTransferred { clan, new_leader } => format!(
                "👋 You left **{clan}**. {} is the new leader.",
                mention(new_leader)
            ),
            LeaveOutcome::Disbanded { clan } => {
                format!("🏚️ You were the last member; **{clan}** has been disbanded.")
            }
        };
        ctx.say(message).await?;
        Ok(())
    }

    /// Removes a member from your clan (leader only).
    #[poise::command(slash_command, prefix_command, rename = "kick")]
    pub async fn clan_kick(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Member to remove"] member: serenity::User,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let leader = user_key(ctx.author().id)?;
        let target = user_key(member.id)?;
        clan::kick(eco, leader, target).await?;

        ctx.say(format!("🥾 {} was removed from the clan.", mention(target)))
            .await?;
        Ok(())
    }

    async fn run_upgrade(ctx: poise::Context<'_, BotData, Error>, upgrade: Upgrade) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let result = clan::upgrade(eco, user_id, upgrade).await?;

        let detail = match upgrade {
            Upgrade::Capacity => format!(
                "now holds **{}** members",
                clan::capacity(&result.clan, &eco.config.clan)
            ),
            Upgrade::Boost => format!(
                "now earns **x{:.2}** PB per message",
                result.clan.pb_boost_multiplier
            ),
        };
        ctx.say(format!(
            "⬆️ **{}** {detail} (spent {}). Wallet: **{}**",
            result.clan.name,
            format_pb(result.cost),
            format_pb(result.balance)
        ))
        .await?;
        Ok(())
    }

    /// Buys more member slots for your clan (leader only).
    #[poise::command(slash_command, prefix_command, rename = "upgrade")]
    pub async fn clan_upgrade(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        run_upgrade(ctx, Upgrade::Capacity).await
    }

    /// Raises your clan's PB boost. Any member can pay for it.
    #[poise::command(slash_command, prefix_command, rename = "boost")]
    pub async fn clan_boost(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        run_upgrade(ctx, Upgrade::Boost).await
    }

    /// Shows a clan profile (yours by default).
    #[poise::command(slash_command, prefix_command, rename = "info")]
    pub async fn clan_info(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Clan name (defaults to yours)"] name: Option<String>,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let profile = clan::profile(eco, user_id, name.as_deref()).await?;

        let mut members = String::new();
        for member in &profile.members {
            let crown = if member.user_id == profile.clan.owner_id { "👑 " } else { "" };
            writeln!(
                members,
                "{crown}{} - {}",
                mention(member.user_id),
                format_pb(member.contribution)
            )?;
        }

        let embed = serenity::CreateEmbed::default()
            .title(format!("🏰 {}", profile.clan.name))
            .color(0x009B_59B6)
            .field("Leader", mention(profile.clan.owner_id), true)
            .field(
                "Members",
                format!("{}/{}", profile.members.len(), profile.capacity),
                true,
            )
            .field(
                "PB boost",
                format!("x{:.2}", profile.clan.pb_boost_multiplier),
                true,
            )
            .field("Investment", format_pb(profile.clan.total_investment), true)
            .field("Roster", members, false);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Ranks clans by total investment.
    #[poise::command(slash_command, prefix_command, rename = "top")]
    pub async fn clan_top(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let clans = clan::leaderboard(eco, eco.config.leaderboard.max_entries).await?;

        if clans.is_empty() {
            ctx.say("No clans yet. Found one with `/clan create`!").await?;
            return Ok(());
        }

        let mut description = String::new();
        for (rank, entry) in clans.iter().enumerate() {
            writeln!(
                description,
                "**{}.** {} - {} invested • x{:.2} boost",
                rank + 1,
                entry.name,
                format_pb(entry.total_investment),
                entry.pb_boost_multiplier
            )?;
        }

        let embed = serenity::CreateEmbed::default()
            .title("🏆 Clan Leaderboard")
            .color(0x009B_59B6)
            .description(description);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

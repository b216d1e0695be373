//! Experience commands - rank cards and the XP leaderboard.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, mention, user_key},
        core::xp::{self, BoostTier},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Renders `filled/total` as a ten-segment bar.
    fn progress_bar(filled: i64, total: i64) -> String {
        let segments = if total > 0 {
            usize::try_from(filled.clamp(0, total) * 10 / total).unwrap_or(0)
        } else {
            0
        };
        format!("{}{}", "▰".repeat(segments), "▱".repeat(10 - segments))
    }

    /// Parent command for experience.
    #[poise::command(
        slash_command,
        prefix_command,
        subcommands("xp_rank", "xp_top"),
        subcommand_required
    )]
    pub async fn xp(_ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        Ok(())
    }

    /// Shows a player's level and progress.
    #[poise::command(slash_command, prefix_command, rename = "rank")]
    pub async fn xp_rank(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Player to look up (defaults to you)"] user: Option<serenity::User>,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let target = user.as_ref().unwrap_or_else(|| ctx.author());
        let rank = xp::rank(eco, user_key(target.id)?).await?;

        let boost = rank
            .profile
            .boost_tier
            .as_deref()
            .and_then(|t| t.parse::<BoostTier>().ok())
            .map_or_else(
                || "None".to_string(),
                |tier| format!("{tier} (+{:.0}%)", tier.boost() * 100.0),
            );

        let embed = serenity::CreateEmbed::default()
            .title(format!("⭐ {}'s rank", target.name))
            .color(0x00F3_9C12)
            .field("Level", rank.progress.level.to_string(), true)
            .field("Position", format!("#{}", rank.position), true)
            .field("Total XP", rank.profile.total_xp.to_string(), true)
            .field(
                "Progress",
                format!(
                    "{} {}/{}",
                    progress_bar(rank.progress.xp_into_level, rank.progress.xp_for_next),
                    rank.progress.xp_into_level,
                    rank.progress.xp_for_next
                ),
                false,
            )
            .field("XP boost", boost, true);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows the players with the most XP.
    #[poise::command(slash_command, prefix_command, rename = "top")]
    pub async fn xp_top(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let top = xp::leaderboard(eco, eco.config.leaderboard.max_entries).await?;

        if top.is_empty() {
            ctx.say("Nobody has earned XP yet.").await?;
            return Ok(());
        }

        let mut description = String::new();
        for (position, entry) in top.iter().enumerate() {
            writeln!(
                description,
                "**{}.** {} - level {} ({} XP)",
                position + 1,
                mention(entry.user_id),
                entry.level,
                entry.total_xp
            )?;
        }

        let embed = serenity::CreateEmbed::default()
            .title("⭐ XP Leaderboard")
            .color(0x00F3_9C12)
            .description(description);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_progress_bar() {
            assert_eq!(progress_bar(0, 150), "▱▱▱▱▱▱▱▱▱▱");
            assert_eq!(progress_bar(75, 150), "▰▰▰▰▰▱▱▱▱▱");
            assert_eq!(progress_bar(500, 150), "▰▰▰▰▰▰▰▰▰▰");
            assert_eq!(progress_bar(5, 0), "▱▱▱▱▱▱▱▱▱▱");
        }
    }
}

// Re-export all commands
pub use inner::*;

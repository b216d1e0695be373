//! Wallet commands - balance, daily, give, leaderboard, history and cooldowns.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, format_pb, mention, user_key},
        core::{
            bank, cooldown, debt, economy, history as tx_history,
            economy::DailyRoll,
        },
        errors::{Error, Result, format_duration},
    };
    use chrono::Utc;
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Shows a wallet together with bank savings and public bank debt.
    #[poise::command(slash_command, prefix_command)]
    pub async fn balance(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Player to look up (defaults to you)"] user: Option<serenity::User>,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let target = user.as_ref().unwrap_or_else(|| ctx.author());
        let user_id = user_key(target.id)?;

        let wallet = economy::balance(eco, user_id).await?;
        let account = bank::account(eco, user_id).await?;
        let status = debt::status(&eco.db, &eco.config.debt, user_id, Utc::now()).await?;

        let mut embed = serenity::CreateEmbed::default()
            .title(format!("💰 {}'s balance", target.name))
            .color(0x00F1_C40F)
            .field("Wallet", format_pb(wallet), true)
            .field("Bank", format_pb(account.balance), true)
            .field("Net worth", format_pb(wallet + account.balance), true);
        if status.total_debt > 0 {
            embed = embed.field(
                "Public bank debt",
                format!("{} ({})", format_pb(status.total_debt), status.effective_level().label()),
                false,
            );
        }

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Claims the daily PrissBucks reward.
    #[poise::command(slash_command, prefix_command)]
    pub async fn daily(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let roll = DailyRoll::random(&eco.config.daily);

        let reward = economy::daily(eco, user_id, roll).await?;

        let mut message = format!("🎁 You claimed **{}**!", format_pb(reward.roll.base));
        if let Some(bonus) = reward.roll.bonus {
            write!(message, "\n🍀 Lucky day! Bonus: **{}**", format_pb(bonus))?;
        }
        write!(message, "\nWallet: **{}**", format_pb(reward.balance))?;
        ctx.say(message).await?;
        Ok(())
    }

    /// Sends PrissBucks to another player. A transfer tax goes to the public bank.
    #[poise::command(slash_command, prefix_command)]
    pub async fn give(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Who receives the PrissBucks"] user: serenity::User,
        #[description = "Amount to send"] amount: i64,
    ) -> Result<()> {
        if user.bot {
            ctx.say("❌ Bots do not need PrissBucks.").await?;
            return Ok(());
        }
        let eco = &ctx.data().economy;
        let from = user_key(ctx.author().id)?;
        let to = user_key(user.id)?;

        let transfer = economy::transfer(eco, from, to, amount).await?;

        ctx.say(format!(
            "💸 Sent **{}** to {} (tax {}).\nYour wallet: **{}**",
            format_pb(transfer.amount),
            mention(to),
            format_pb(transfer.tax),
            format_pb(transfer.sender_balance)
        ))
        .await?;
        Ok(())
    }

    /// Shows the richest wallets.
    #[poise::command(slash_command, prefix_command)]
    pub async fn leaderboard(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let top = economy::leaderboard(eco, eco.config.leaderboard.max_entries).await?;

        if top.is_empty() {
            ctx.say("Nobody has any PrissBucks yet. Start chatting!").await?;
            return Ok(());
        }

        let mut description = String::new();
        for (rank, user) in top.iter().enumerate() {
            writeln!(
                description,
                "**{}.** {} - {}",
                rank + 1,
                mention(user.user_id),
                format_pb(user.balance)
            )?;
        }

        let embed = serenity::CreateEmbed::default()
            .title("🏆 PrissBucks Leaderboard")
            .color(0x00F1_C40F)
            .description(description);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows your transaction history, newest first.
    #[poise::command(slash_command, prefix_command)]
    pub async fn history(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Page number (defaults to 1)"] page: Option<u64>,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let page = tx_history::history(eco, user_id, page.unwrap_or(1)).await?;

        if page.entries.is_empty() {
            ctx.say("📜 No transactions yet.").await?;
            return Ok(());
        }

        let mut description = String::new();
        for entry in &page.entries {
            let sign = if entry.amount >= 0 { "+" } else { "" };
            writeln!(
                description,
                "`{}` **{}{}** {} ({}) → {}",
                entry.created_at.format("%Y-%m-%d %H:%M"),
                sign,
                entry.amount,
                entry.transaction_type,
                entry.description,
                format_pb(entry.balance_after)
            )?;
        }

        let embed = serenity::CreateEmbed::default()
            .title("📜 Transaction history")
            .color(0x0058_65F2)
            .description(description)
            .footer(serenity::CreateEmbedFooter::new(format!(
                "Page {}/{} • {} entries",
                page.page, page.total_pages, page.total_entries
            )));
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        Ok(())
    }

    /// Lists every action you are waiting on.
    #[poise::command(slash_command, prefix_command)]
    pub async fn cooldowns(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let active = cooldown::overview(eco, user_id, Utc::now()).await?;

        if active.is_empty() {
            ctx.say("✅ No cooldowns running, everything is available.").await?;
            return Ok(());
        }

        let mut description = String::new();
        for entry in &active {
            writeln!(
                description,
                "⏳ **{}** - {}",
                entry.action,
                format_duration(entry.remaining_secs)
            )?;
        }

        let embed = serenity::CreateEmbed::default()
            .title("⏱️ Your cooldowns")
            .color(0x0058_65F2)
            .description(description);
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

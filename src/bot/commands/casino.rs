//! Game commands - roulette, rock-paper-scissors duels, stealing and bank heists.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, format_pb, mention, user_key},
        core::{
            roulette::{self, Bet, Color},
            rps::{self, Move, Outcome},
            heist::{self, HeistOutcome},
            steal::{self, StealOutcome},
        },
        errors::{Error, Result, format_duration},
    };
    use chrono::Utc;
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Spins the roulette wheel.
    ///
    /// Bets: `red`, `black`, `even`, `odd`, `low` (1-18), `high` (19-36) pay 2x;
    /// a single number from 0 to 36 pays 36x.
    #[poise::command(slash_command, prefix_command)]
    pub async fn roulette(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "red, black, even, odd, low, high or a number 0-36"] bet: String,
        #[description = "Stake"] amount: i64,
    ) -> Result<()> {
        let bet: Bet = bet.parse()?;
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let pocket = roulette::spin();

        let spin = roulette::play(eco, user_id, bet, amount, pocket).await?;

        let mut message = format!(
            "🎡 The ball lands on {} **{}**",
            Color::of(spin.pocket).emoji(),
            spin.pocket
        );
        if spin.won {
            write!(
                message,
                "\n🎉 Your bet on **{}** wins **{}**!",
                spin.bet,
                format_pb(spin.net)
            )?;
        } else {
            write!(
                message,
                "\n💸 Your bet on **{}** lost {}.",
                spin.bet,
                format_pb(-spin.net)
            )?;
        }
        write!(message, "\nWallet: **{}**", format_pb(spin.balance))?;
        ctx.say(message).await?;
        Ok(())
    }

    /// Parent command for rock-paper-scissors duels.
    #[poise::command(
        slash_command,
        prefix_command,
        subcommands("rps_challenge", "rps_accept", "rps_pending"),
        subcommand_required
    )]
    pub async fn rps(_ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        Ok(())
    }

    /// Challenges another player. Your move stays hidden until they accept.
    #[poise::command(slash_command, prefix_command, rename = "challenge", guild_only)]
    pub async fn rps_challenge(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Who to challenge"] opponent: serenity::User,
        #[description = "Stake each player puts up"] amount: i64,
        #[description = "rock, paper or scissors"] choice: String,
    ) -> Result<()> {
        if opponent.bot {
            ctx.say("❌ Bots do not play rock-paper-scissors.").await?;
            return Ok(());
        }
        let mv: Move = choice.parse()?;
        let data = ctx.data();
        let challenger = user_key(ctx.author().id)?;
        let opponent_id = user_key(opponent.id)?;

        let created =
            rps::challenge(&data.economy, &data.rps, challenger, opponent_id, amount, mv).await?;

        ctx.say(format!(
            "✊✋✌️ {} challenges {} for **{}**! Accept within {} with `/rps accept`.",
            mention(challenger),
            mention(opponent_id),
            format_pb(created.amount),
            crate::errors::format_duration(data.economy.config.casino.rps_expiry_secs)
        ))
        .await?;
        Ok(())
    }

    /// Accepts a pending challenge and plays your move.
    #[poise::command(slash_command, prefix_command, rename = "accept", guild_only)]
    pub async fn rps_accept(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Who challenged you"] challenger: serenity::User,
        #[description = "rock, paper or scissors"] choice: String,
    ) -> Result<()> {
        let mv: Move = choice.parse()?;
        let data = ctx.data();
        let opponent = user_key(ctx.author().id)?;
        let challenger_id = user_key(challenger.id)?;

        let duel = rps::accept(&data.economy, &data.rps, opponent, challenger_id, mv).await?;

        let stake = format_pb(duel.challenge.amount);
        let verdict = match duel.outcome {
            Outcome::ChallengerWins => format!("{} wins **{stake}**!", mention(challenger_id)),
            Outcome::OpponentWins => format!("{} wins **{stake}**!", mention(opponent)),
            Outcome::Tie => format!("It's a tie! Both stakes of {stake} go to the public bank."),
        };
        ctx.say(format!(
            "{} {} vs {} {}\n{verdict}",
            mention(challenger_id),
            duel.challenge.challenger_move.emoji(),
            duel.opponent_move.emoji(),
            mention(opponent)
        ))
        .await?;
        Ok(())
    }

    /// Lists the challenges waiting for you.
    #[poise::command(slash_command, prefix_command, rename = "pending")]
    pub async fn rps_pending(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let user_id = user_key(ctx.author().id)?;
        let pending = data.rps.pending_for(
            user_id,
            Utc::now(),
            data.economy.config.casino.rps_expiry_secs,
        );

        if pending.is_empty() {
            ctx.say("Nobody is waiting for you.").await?;
            return Ok(());
        }
        let mut message = String::from("✊✋✌️ Challenges waiting for you:\n");
        for challenge in &pending {
            writeln!(
                message,
                "• {} for {}",
                mention(challenge.challenger),
                format_pb(challenge.amount)
            )?;
        }
        ctx.send(poise::CreateReply::default().content(message).ephemeral(true))
            .await?;
        Ok(())
    }

    /// Tries to steal from another player's wallet.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn steal(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Who to rob"] target: serenity::User,
    ) -> Result<()> {
        if target.bot {
            ctx.say("❌ Bots keep their wallets empty.").await?;
            return Ok(());
        }
        let eco = &ctx.data().economy;
        let thief = user_key(ctx.author().id)?;
        let target_id = user_key(target.id)?;
        let success = steal::roll_success(eco.config.steal.success_rate);

        let result = steal::attempt(eco, thief, target_id, success).await?;

        let message = match result.outcome {
            StealOutcome::Blocked { fine } => format!(
                "🛡️ {} was protected! Their defense broke, and you paid a fine of **{}**.",
                mention(target_id),
                format_pb(fine)
            ),
            StealOutcome::Success { amount } => format!(
                "🦹 You stole **{}** from {}!",
                format_pb(amount),
                mention(target_id)
            ),
            StealOutcome::Failed { penalty } => format!(
                "🚨 Caught stealing from {}! You paid a fine of **{}** to the public bank.",
                mention(target_id),
                format_pb(penalty)
            ),
        };
        ctx.say(format!(
            "{message}\nWallet: **{}**",
            format_pb(result.thief_balance)
        ))
        .await?;
        Ok(())
    }

    /// Robs the bank for a target amount. Big targets are harder; a fat wallet helps.
    #[poise::command(slash_command, prefix_command)]
    pub async fn heist(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Target amount"] amount: i64,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;

        let result = heist::attempt(eco, user_id, amount, heist::roll()).await?;

        let headline = match result.outcome {
            HeistOutcome::CriticalSuccess => "💎 **Perfect heist!** You found a hidden vault.",
            HeistOutcome::Success => "✅ **Heist successful!** You escaped with the loot.",
            HeistOutcome::Failure => "❌ **Heist failed.** You were spotted and dropped cash.",
            HeistOutcome::CriticalFailure => "💥 **Disaster!** You were arrested and fined.",
        };
        let mut message = format!(
            "{headline}\nx{} • odds were {:.1}%",
            result.outcome.multiplier(&eco.config.heist),
            result.chance
        );
        if result.outcome.is_success() {
            write!(message, "\n💰 Loot: **+{}**", format_pb(result.won))?;
        } else {
            write!(message, "\n💸 Lost **{}** to the public bank", format_pb(result.lost))?;
        }
        write!(
            message,
            "\nWallet: **{}** • heists today {}/{}",
            format_pb(result.balance),
            result.attempts_today,
            eco.config.heist.max_daily
        )?;
        ctx.say(message).await?;
        Ok(())
    }

    /// Shows the heist rules, your cooldown and your heist record.
    #[poise::command(slash_command, prefix_command)]
    pub async fn heistinfo(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let cfg = &eco.config.heist;
        let user_id = user_key(ctx.author().id)?;
        let status = heist::status(eco, user_id, Utc::now()).await?;

        let cooldown = status
            .cooldown_secs
            .map_or_else(|| "✅ ready".to_string(), format_duration);
        let mut description = format!(
            "**Target:** {} - {}\n**Wallet needed:** {}\n**Cooldown:** {}\n\
             **Today:** {}/{} heists • {}",
            format_pb(cfg.min_amount),
            format_pb(cfg.max_amount),
            format_pb(cfg.min_balance),
            format_duration(cfg.cooldown_secs),
            status.attempts_today,
            status.max_daily,
            cooldown
        );
        if let Some(record) = &status.record {
            write!(
                description,
                "\n\n**Your record:** {} heists, {} successful\nWon {} • lost {}",
                record.total_heists,
                record.successes,
                format_pb(record.total_won),
                format_pb(record.total_lost)
            )?;
        }

        let embed = serenity::CreateEmbed::default()
            .title("🏦 Bank heist")
            .color(if status.can_attempt() { 0x002E_CC71 } else { 0x00E7_4C3C })
            .description(description);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

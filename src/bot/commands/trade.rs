//! Trade commands - negotiating PrissBucks and pet exchanges between two players.
//!
//! Every subcommand except `start` works on the caller's open trade.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, format_pb, handlers::autocomplete, mention, user_key},
        core::trade::{self, ConfirmOutcome, TradeDetails},
        entities::trade as trade_entity,
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    async fn open_trade(
        ctx: poise::Context<'_, BotData, Error>,
        user_id: i64,
    ) -> Result<trade_entity::Model> {
        trade::find_pending(&ctx.data().economy, user_id)
            .await?
            .ok_or_else(|| Error::rule("You have no open trade. Start one with `/trade start`"))
    }

    fn side(details: &TradeDetails, owner: i64, pb: i64) -> Result<String> {
        let mut text = format_pb(pb);
        for offered in details.pets.iter().filter(|p| p.owner_id == owner) {
            write!(text, "\nPet `#{}`", offered.user_pet_id)?;
        }
        Ok(text)
    }

    fn trade_embed(details: &TradeDetails, title: &str) -> Result<serenity::CreateEmbed> {
        let t = &details.trade;
        let check = |confirmed: bool| if confirmed { "✅" } else { "⏳" };
        Ok(serenity::CreateEmbed::default()
            .title(format!("{title} #{}", t.id))
            .color(0x00E9_1E63)
            .field(
                format!("{} <@{}>", check(t.initiator_confirmed), t.initiator_id),
                side(details, t.initiator_id, t.initiator_pb)?,
                true,
            )
            .field(
                format!("{} <@{}>", check(t.partner_confirmed), t.partner_id),
                side(details, t.partner_id, t.partner_pb)?,
                true,
            ))
    }

    async fn show(
        ctx: poise::Context<'_, BotData, Error>,
        details: &TradeDetails,
        title: &str,
    ) -> Result<()> {
        let embed = trade_embed(details, title)?;
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Parent command for trades.
    #[poise::command(
        slash_command,
        prefix_command,
        subcommands(
            "trade_start",
            "trade_view",
            "trade_offer",
            "trade_addpet",
            "trade_removepet",
            "trade_confirm",
            "trade_cancel",
            "trade_history"
        ),
        subcommand_required
    )]
    pub async fn trade(_ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        Ok(())
    }

    /// Opens a trade with another player.
    #[poise::command(slash_command, prefix_command, rename = "start", guild_only)]
    pub async fn trade_start(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Who to trade with"] partner: serenity::User,
    ) -> Result<()> {
        if partner.bot {
            ctx.say("❌ Bots cannot trade.").await?;
            return Ok(());
        }
        let eco = &ctx.data().economy;
        let initiator = user_key(ctx.author().id)?;
        let partner_id = user_key(partner.id)?;
        let opened = trade::create(eco, initiator, partner_id).await?;

        ctx.say(format!(
            "🤝 Trade #{} opened between {} and {}. Add PB with `/trade offer` and pets with \
             `/trade addpet`, then both `/trade confirm`.",
            opened.id,
            mention(initiator),
            mention(partner_id)
        ))
        .await?;
        Ok(())
    }

    /// Shows your open trade.
    #[poise::command(slash_command, prefix_command, rename = "view")]
    pub async fn trade_view(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let user_id = user_key(ctx.author().id)?;
        let open = open_trade(ctx, user_id).await?;
        let details = trade::details(&ctx.data().economy, open.id).await?;
        show(ctx, &details, "🤝 Trade").await
    }

    /// Sets how many PrissBucks you put into the trade.
    #[poise::command(slash_command, prefix_command, rename = "offer")]
    pub async fn trade_offer(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "PrissBucks to offer (0 to withdraw your offer)"] amount: i64,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let open = open_trade(ctx, user_id).await?;
        trade::set_pb_offer(eco, open.id, user_id, amount).await?;
        let details = trade::details(eco, open.id).await?;
        show(ctx, &details, "🤝 Offer updated, trade").await
    }

    /// Adds one of your unequipped pets to the trade.
    #[poise::command(slash_command, prefix_command, rename = "addpet")]
    pub async fn trade_addpet(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Pet to offer"]
        #[autocomplete = "autocomplete::autocomplete_owned_pet"]
        pet_id: i64,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let open = open_trade(ctx, user_id).await?;
        let details = trade::add_pet(eco, open.id, user_id, pet_id).await?;
        show(ctx, &details, "🐾 Pet added, trade").await
    }

    /// Takes one of your pets back out of the trade.
    #[poise::command(slash_command, prefix_command, rename = "removepet")]
    pub async fn trade_removepet(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Pet to withdraw"]
        #[autocomplete = "autocomplete::autocomplete_owned_pet"]
        pet_id: i64,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let open = open_trade(ctx, user_id).await?;
        let details = trade::remove_pet(eco, open.id, user_id, pet_id).await?;
        show(ctx, &details, "🐾 Pet removed, trade").await
    }

    /// Confirms the current offers. The trade completes once both sides confirm.
    #[poise::command(slash_command, prefix_command, rename = "confirm")]
    pub async fn trade_confirm(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let open = open_trade(ctx, user_id).await?;

        match trade::confirm(eco, open.id, user_id).await? {
            ConfirmOutcome::Waiting(waiting) => {
                let other = if waiting.initiator_id == user_id {
                    waiting.partner_id
                } else {
                    waiting.initiator_id
                };
                ctx.say(format!(
                    "✅ Confirmed. Waiting for {} to confirm trade #{}.",
                    mention(other),
                    waiting.id
                ))
                .await?;
            }
            ConfirmOutcome::Completed(details) => {
                show(ctx, &details, "🎉 Completed trade").await?;
            }
        }
        Ok(())
    }

    /// Cancels your open trade.
    #[poise::command(slash_command, prefix_command, rename = "cancel")]
    pub async fn trade_cancel(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let open = open_trade(ctx, user_id).await?;
        let cancelled = trade::cancel(eco, open.id, user_id).await?;

        ctx.say(format!("❌ Trade #{} cancelled.", cancelled.id)).await?;
        Ok(())
    }

    /// Shows your finished trades and trading totals.
    #[poise::command(slash_command, prefix_command, rename = "history")]
    pub async fn trade_history(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let trades = trade::history(eco, user_id, 10).await?;
        let stats = trade::stats(eco, user_id).await?;

        if trades.is_empty() {
            ctx.say("📦 You have not finished any trades yet.").await?;
            return Ok(());
        }

        let mut description = String::new();
        for t in &trades {
            let (other, sent, received) = if t.initiator_id == user_id {
                (t.partner_id, t.initiator_pb, t.partner_pb)
            } else {
                (t.initiator_id, t.partner_pb, t.initiator_pb)
            };
            let icon = if t.status == trade::COMPLETED { "✅" } else { "❌" };
            writeln!(
                description,
                "{icon} #{} with {} • sent {} • received {}",
                t.id,
                mention(other),
                format_pb(sent),
                format_pb(received)
            )?;
        }

        let embed = serenity::CreateEmbed::default()
            .title("📦 Trade history")
            .color(0x00E9_1E63)
            .description(description)
            .field(
                "Totals",
                format!(
                    "{} completed • {} cancelled\nPB sent {} • received {}\n\
                     Pets sent {} • received {}",
                    stats.completed,
                    stats.cancelled,
                    format_pb(stats.pb_sent),
                    format_pb(stats.pb_received),
                    stats.pets_sent,
                    stats.pets_received
                ),
                false,
            );
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

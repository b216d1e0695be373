//! Admin commands - wallet adjustments, economy reset, shop stock, debt and heist management.
//!
//! Only the configured owner or guild administrators may run these.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, format_pb, handlers::autocomplete, mention, user_key},
        core::{
            debt, economy, heist,
            shop::{self, ItemKind, NewItem},
            xp::BoostTier,
        },
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use tracing::warn;

    /// Allows the owner and members with the Administrator permission.
    async fn is_admin(ctx: poise::Context<'_, BotData, Error>) -> Result<bool> {
        if ctx.data().settings.owner_id == Some(ctx.author().id.get()) {
            return Ok(true);
        }
        let Some(member) = ctx.author_member().await else {
            return Ok(false);
        };
        if let Some(permissions) = member.permissions {
            return Ok(permissions.administrator());
        }
        let allowed = ctx
            .guild()
            .is_some_and(|guild| guild.member_permissions(&member).administrator());
        if !allowed {
            warn!(user = %ctx.author().id, command = %ctx.command().name, "admin command refused");
        }
        Ok(allowed)
    }

    /// Parent command for economy administration.
    #[poise::command(
        slash_command,
        prefix_command,
        subcommands(
            "admin_add",
            "admin_remove",
            "admin_reset",
            "admin_additem",
            "admin_removeitem",
            "admin_debtstats",
            "admin_debtreset",
            "admin_heiststats",
            "admin_heistreset"
        ),
        subcommand_required,
        check = "is_admin"
    )]
    pub async fn admin(_ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        Ok(())
    }

    /// Gives PrissBucks to a player.
    #[poise::command(slash_command, prefix_command, rename = "add", check = "is_admin")]
    pub async fn admin_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Player to credit"] user: serenity::User,
        #[description = "Amount to add"] amount: i64,
    ) -> Result<()> {
        let target = user_key(user.id)?;
        let balance = economy::admin_add(&ctx.data().economy, target, amount).await?;
        ctx.say(format!(
            "✅ Added {} to {}. New balance: **{}**",
            format_pb(amount),
            mention(target),
            format_pb(balance)
        ))
        .await?;
        Ok(())
    }

    /// Takes PrissBucks from a player (never below zero).
    #[poise::command(slash_command, prefix_command, rename = "remove", check = "is_admin")]
    pub async fn admin_remove(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Player to debit"] user: serenity::User,
        #[description = "Amount to remove"] amount: i64,
    ) -> Result<()> {
        let target = user_key(user.id)?;
        let balance = economy::admin_remove(&ctx.data().economy, target, amount).await?;
        ctx.say(format!(
            "✅ Removed PrissBucks from {}. New balance: **{}**",
            mention(target),
            format_pb(balance)
        ))
        .await?;
        Ok(())
    }

    /// Wipes balances, logs, banks, loans and debts. Requires `confirm: true`.
    #[poise::command(slash_command, prefix_command, rename = "reset", check = "is_admin")]
    pub async fn admin_reset(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Set to true to really reset the economy"] confirm: bool,
    ) -> Result<()> {
        if !confirm {
            ctx.say(
                "⚠️ This wipes every wallet, bank, loan and debt. \
                 Run again with `confirm: true`.",
            )
            .await?;
            return Ok(());
        }
        economy::reset_economy(&ctx.data().economy).await?;
        warn!(admin = %ctx.author().id, "economy reset");
        ctx.say("🧹 The economy has been reset.").await?;
        Ok(())
    }

    /// Adds an item to the shop.
    #[allow(clippy::too_many_arguments)]
    #[poise::command(slash_command, prefix_command, rename = "additem", check = "is_admin")]
    pub async fn admin_additem(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Item name"] name: String,
        #[description = "Price in PB"] price: i64,
        #[description = "role, timeout_token or defense"] kind: String,
        #[description = "Short description"] description: Option<String>,
        #[description = "Role granted by a role item"] role: Option<serenity::Role>,
        #[description = "XP boost tier granted by a role item (E to SSS)"] tier: Option<String>,
        #[description = "Tokens granted by a timeout token item"] tokens: Option<i64>,
    ) -> Result<()> {
        let kind: ItemKind = kind.parse()?;
        let xp_tier = tier.as_deref().map(str::parse::<BoostTier>).transpose()?;
        let role_id = role.map(|r| i64::try_from(r.id.get())).transpose()?;

        let item = shop::add_item(
            &ctx.data().economy,
            NewItem {
                name,
                description: description.unwrap_or_default(),
                price,
                kind,
                role_id,
                xp_tier,
                token_amount: tokens,
            },
        )
        .await?;

        ctx.say(format!(
            "🛒 Added **{}** (#{}) for {}.",
            item.name,
            item.id,
            format_pb(item.price)
        ))
        .await?;
        Ok(())
    }

    /// Takes an item off the shop. Past purchases are kept.
    #[poise::command(slash_command, prefix_command, rename = "removeitem", check = "is_admin")]
    pub async fn admin_removeitem(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Item to remove"]
        #[autocomplete = "autocomplete::autocomplete_item"]
        item: i64,
    ) -> Result<()> {
        let removed = shop::deactivate_item(&ctx.data().economy, item).await?;
        ctx.say(format!("🗑️ **{}** is no longer for sale.", removed.name))
            .await?;
        Ok(())
    }

    /// Summarizes outstanding public bank debt.
    #[poise::command(slash_command, prefix_command, rename = "debtstats", check = "is_admin")]
    pub async fn admin_debtstats(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let stats = debt::stats(&eco.db, &eco.config.debt).await?;

        let embed = serenity::CreateEmbed::default()
            .title("💳 Public bank debt")
            .color(0x00E7_4C3C)
            .field("Debtors", stats.debtors.to_string(), true)
            .field("Total owed", format_pb(stats.total_debt), true)
            .field(
                "By level",
                format!(
                    "🟢 {} • 🟡 {} • 🔴 {}",
                    stats.green, stats.yellow, stats.red
                ),
                false,
            );
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        Ok(())
    }

    /// Forgives a player's public bank debt.
    #[poise::command(slash_command, prefix_command, rename = "debtreset", check = "is_admin")]
    pub async fn admin_debtreset(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Player whose debt is forgiven"] user: serenity::User,
    ) -> Result<()> {
        let target = user_key(user.id)?;
        let message = if debt::reset(&ctx.data().economy.db, target).await? {
            format!("✅ Debt of {} forgiven.", mention(target))
        } else {
            format!("{} has no debt.", mention(target))
        };
        ctx.say(message).await?;
        Ok(())
    }

    /// Summarizes every heist ever attempted.
    #[poise::command(slash_command, prefix_command, rename = "heiststats", check = "is_admin")]
    pub async fn admin_heiststats(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let totals = heist::totals(eco).await?;
        let net = totals.won - totals.lost;
        let sign = if net >= 0 { "+" } else { "-" };

        let embed = serenity::CreateEmbed::default()
            .title("🏦 Heist statistics")
            .color(0x00E7_4C3C)
            .field("Robbers", totals.players.to_string(), true)
            .field(
                "Heists",
                format!("{} ({} successful)", totals.heists, totals.successes),
                true,
            )
            .field(
                "PrissBucks",
                format!(
                    "Won {} • lost {} • net {sign}{}",
                    format_pb(totals.won),
                    format_pb(totals.lost),
                    format_pb(net.abs())
                ),
                false,
            );
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        Ok(())
    }

    /// Clears a player's heist cooldown and today's attempts.
    #[poise::command(slash_command, prefix_command, rename = "heistreset", check = "is_admin")]
    pub async fn admin_heistreset(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Player to reset"] user: serenity::User,
    ) -> Result<()> {
        let target = user_key(user.id)?;
        heist::reset_player(&ctx.data().economy, target).await?;
        ctx.say(format!("✅ Heist limits of {} reset.", mention(target)))
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

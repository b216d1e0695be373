//! Shop commands - browsing, buying and the purchase inventory.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, format_pb, handlers::autocomplete, user_key},
        core::shop::{self, ItemKind},
        entities::shop_item,
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;
    use tracing::warn;

    fn describe_item(item: &shop_item::Model) -> String {
        match item.kind.parse::<ItemKind>() {
            Ok(ItemKind::Role) => item.xp_tier.as_ref().map_or_else(
                || "Role".to_string(),
                |tier| format!("Role • XP boost tier {tier}"),
            ),
            Ok(ItemKind::TimeoutToken) => {
                format!("{} timeout token(s)", item.token_amount.unwrap_or(1))
            }
            Ok(ItemKind::Defense) => "Blocks one steal attempt".to_string(),
            Err(_) => item.kind.clone(),
        }
    }

    /// Browses the items for sale.
    #[poise::command(slash_command, prefix_command)]
    pub async fn shop(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Page number (defaults to 1)"] page: Option<u64>,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let listing = shop::list_items(eco, page.unwrap_or(1)).await?;

        if listing.items.is_empty() {
            ctx.say("🛒 The shop is empty right now.").await?;
            return Ok(());
        }

        let tax_rate = eco.config.shop.tax_rate;
        let mut embed_fields = Vec::new();
        for item in &listing.items {
            let tax = shop::purchase_tax(item.price, tax_rate);
            let field_name = format!("#{} {} - {}", item.id, item.name, format_pb(item.price));
            let mut field_value = String::new();
            if !item.description.is_empty() {
                writeln!(field_value, "{}", item.description)?;
            }
            write!(
                field_value,
                "{} • +{} tax",
                describe_item(item),
                format_pb(tax)
            )?;
            embed_fields.push((field_name, field_value, false));
        }

        let embed = serenity::CreateEmbed::default()
            .title("🛒 PrissBucks Shop")
            .color(0x0058_65F2)
            .fields(embed_fields)
            .footer(serenity::CreateEmbedFooter::new(format!(
                "Page {}/{} • /buy <item>",
                listing.page, listing.total_pages
            )));
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Buys an item from the shop.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn buy(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Item to buy"]
        #[autocomplete = "autocomplete::autocomplete_item"]
        item: i64,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let purchase = shop::purchase(eco, user_id, item).await?;

        let mut message = format!(
            "✅ Bought **{}** for {} (+{} tax).\nWallet: **{}**",
            purchase.item.name,
            format_pb(purchase.item.price),
            format_pb(purchase.tax),
            format_pb(purchase.balance)
        );
        if let Some(tier) = purchase.xp_tier {
            write!(message, "\n⚡ XP boost tier: **{tier}**")?;
        }

        if let Some(role_id) = purchase.role_id {
            let role = serenity::RoleId::new(u64::try_from(role_id)?);
            let assigned = match ctx.author_member().await {
                Some(member) => member.add_role(ctx.http(), role).await.is_ok(),
                None => false,
            };
            if assigned {
                write!(message, "\n🎭 Role <@&{role_id}> assigned.")?;
            } else {
                warn!(user_id, role_id, "failed to assign purchased role");
                message.push_str("\n⚠️ The role could not be assigned; ask a moderator.");
            }
        }

        ctx.say(message).await?;
        Ok(())
    }

    /// Lists everything you have bought.
    #[poise::command(slash_command, prefix_command)]
    pub async fn inventory(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let purchases = shop::inventory(eco, user_id).await?;

        if purchases.is_empty() {
            ctx.say("🎒 You have not bought anything yet. Try `/shop`.").await?;
            return Ok(());
        }

        let mut description = String::new();
        for (purchase, item) in &purchases {
            let name = item.as_ref().map_or("Removed item", |i| i.name.as_str());
            writeln!(
                description,
                "`{}` **{}** - {} (incl. {} tax)",
                purchase.purchased_at.format("%Y-%m-%d"),
                name,
                format_pb(purchase.price_paid),
                format_pb(purchase.tax_paid)
            )?;
        }

        let embed = serenity::CreateEmbed::default()
            .title("🎒 Your purchases")
            .color(0x0058_65F2)
            .description(description);
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

//! Pet commands - eggs and zones, the pet list and index, equipment, income and gold fusion.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, format_pb, handlers::autocomplete, user_key},
        core::pet::{self, EggRoll, OwnedPet},
        errors::{Error, Result, format_duration},
    };
    use chrono::Utc;
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    fn pet_label(owned: &OwnedPet) -> String {
        let mut label = String::new();
        if owned.owned.is_huge {
            label.push_str("🌟 Huge ");
        } else if owned.owned.is_gold {
            label.push_str("✨ Gold ");
        }
        label.push_str(&owned.pet.name);
        label
    }

    /// Parent command for pets.
    #[poise::command(
        slash_command,
        prefix_command,
        subcommands(
            "pets_egg",
            "pets_eggs",
            "pets_list",
            "pets_index",
            "pets_equip",
            "pets_claim",
            "pets_goldify",
            "pets_stats"
        ),
        subcommand_required
    )]
    pub async fn pets(_ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        Ok(())
    }

    /// Buys and hatches a pet egg. The first egg of a paid zone also unlocks the zone.
    #[poise::command(slash_command, prefix_command, rename = "egg")]
    pub async fn pets_egg(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Egg to open (default: the basic egg)"]
        #[autocomplete = "autocomplete::autocomplete_egg"]
        egg: Option<String>,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let definition = pet::resolve_egg(&eco.config.pets, egg.as_deref())?;
        let roll = EggRoll::random(&eco.config.pets, definition)?;

        let hatch = pet::open_egg(eco, user_id, &definition.slug, roll).await?;

        let mut message = String::new();
        if let Some((zone, cost)) = &hatch.zone_unlocked {
            writeln!(message, "🗺️ You unlocked **{zone}** for {}!", format_pb(*cost))?;
        }
        write!(
            message,
            "🥚 The {} cracks open... it's a **{}** ({})! It earns {} per hour when equipped.\n\
             Inventory id: `#{}`",
            hatch.egg,
            pet_label(&hatch.pet),
            hatch.pet.pet.rarity,
            format_pb(hatch.pet.income_per_hour),
            hatch.pet.owned.id
        )?;
        ctx.say(message).await?;
        Ok(())
    }

    /// Shows every zone, its eggs and whether you can open them.
    #[poise::command(slash_command, prefix_command, rename = "eggs")]
    pub async fn pets_eggs(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let zones = pet::egg_overview(eco, user_id).await?;

        let mut description = String::new();
        for access in &zones {
            let status = if access.is_open() { "✅" } else { "🔒" };
            let mut requirements = Vec::new();
            if !access.meets_level {
                requirements.push(format!("level {}", access.zone.level_required));
            }
            if !access.paid {
                requirements.push(format!("entry {}", format_pb(access.zone.entry_cost)));
            }
            let requirements = if requirements.is_empty() {
                "open".to_string()
            } else {
                requirements.join(", ")
            };
            writeln!(description, "**{status} {}** - {requirements}", access.zone.name)?;
            for egg in &access.eggs {
                writeln!(
                    description,
                    "  • {} - {} (`/pets egg {}`)",
                    egg.name,
                    format_pb(egg.price),
                    egg.slug
                )?;
            }
        }

        let embed = serenity::CreateEmbed::default()
            .title("🥚 Eggs & zones")
            .color(0x001A_BC9C)
            .description(description);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Lists your pets.
    #[poise::command(slash_command, prefix_command, rename = "list")]
    pub async fn pets_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let owned = pet::inventory(eco, user_id).await?;

        if owned.is_empty() {
            let price = pet::resolve_egg(&eco.config.pets, None)?.price;
            ctx.say(format!(
                "🐾 You have no pets. Hatch one with `/pets egg` for {}.",
                format_pb(price)
            ))
            .await?;
            return Ok(());
        }

        let active = owned.iter().filter(|p| p.owned.is_active).count();
        let hourly: i64 = owned
            .iter()
            .filter(|p| p.owned.is_active)
            .map(|p| p.income_per_hour)
            .sum();

        let mut description = String::new();
        for entry in owned.iter().take(30) {
            let equipped = if entry.owned.is_active { " ✅" } else { "" };
            writeln!(
                description,
                "`#{}` **{}** ({}) - {}/h{equipped}",
                entry.owned.id,
                pet_label(entry),
                entry.pet.rarity,
                format_pb(entry.income_per_hour)
            )?;
        }
        if owned.len() > 30 {
            writeln!(description, "…and {} more", owned.len() - 30)?;
        }

        let embed = serenity::CreateEmbed::default()
            .title("🐾 Your pets")
            .color(0x001A_BC9C)
            .description(description)
            .footer(serenity::CreateEmbedFooter::new(format!(
                "Equipped {active}/{} • {}/h",
                eco.config.pets.base_slots,
                format_pb(hourly)
            )));
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows which catalog pets you have collected.
    #[poise::command(slash_command, prefix_command, rename = "index")]
    pub async fn pets_index(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let index = pet::pet_index(eco, user_id).await?;

        let found = index.iter().filter(|e| e.owned).count();
        let mut description = String::new();
        for entry in &index {
            let mark = if entry.owned { "✅" } else { "❔" };
            writeln!(
                description,
                "{mark} **{}** ({}) - {}/h",
                entry.pet.name,
                entry.pet.rarity,
                format_pb(entry.pet.base_income_per_hour)
            )?;
        }

        let embed = serenity::CreateEmbed::default()
            .title("📖 Pet index")
            .color(0x001A_BC9C)
            .description(description)
            .footer(serenity::CreateEmbedFooter::new(format!(
                "Collected {found}/{}",
                index.len()
            )));
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows how often each pet hatched compared with its drop rate.
    #[poise::command(slash_command, prefix_command, rename = "stats")]
    pub async fn pets_stats(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let stats = pet::pet_stats(&ctx.data().economy).await?;

        let mut description = format!("**{}** eggs opened\n\n", stats.total_openings);
        for drop in &stats.drops {
            writeln!(
                description,
                "**{}**: {} hatched - {:.2}% (expected {:.2}%)",
                drop.name, drop.obtained, drop.actual_pct, drop.expected_pct
            )?;
        }
        writeln!(
            description,
            "\n🌟 Huge pets owned: {} • ✨ Gold pets owned: {}",
            stats.huge_owned, stats.gold_owned
        )?;

        let embed = serenity::CreateEmbed::default()
            .title("📊 Pet statistics")
            .color(0x001A_BC9C)
            .description(description);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Equips or unequips one of your pets. Changing pets restarts the income timer.
    #[poise::command(slash_command, prefix_command, rename = "equip")]
    pub async fn pets_equip(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Pet to toggle"]
        #[autocomplete = "autocomplete::autocomplete_owned_pet"]
        pet_id: i64,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let result = pet::equip(eco, user_id, pet_id).await?;

        let verb = if result.activated { "equipped" } else { "unequipped" };
        ctx.say(format!(
            "🐾 **{}** {verb}. Active pets: {}/{}",
            pet_label(&result.pet),
            result.active_count,
            eco.config.pets.base_slots
        ))
        .await?;
        Ok(())
    }

    /// Collects the income your equipped pets earned.
    #[poise::command(slash_command, prefix_command, rename = "claim")]
    pub async fn pets_claim(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let claim = pet::claim(eco, user_id, Utc::now()).await?;

        let mut message = format!(
            "💰 Your {} pet(s) earned **{}** over {}.",
            claim.pets,
            format_pb(claim.amount),
            format_duration(claim.elapsed_secs)
        );
        if claim.clan_bonus > 0 {
            write!(message, " (clan bonus {})", format_pb(claim.clan_bonus))?;
        }
        write!(message, "\nWallet: **{}**", format_pb(claim.balance))?;
        ctx.say(message).await?;
        Ok(())
    }

    /// Fuses identical copies of a pet into a gold version.
    #[poise::command(slash_command, prefix_command, rename = "goldify")]
    pub async fn pets_goldify(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Pet name"]
        #[autocomplete = "autocomplete::autocomplete_pet_name"]
        name: String,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let (gold, consumed) = pet::goldify(eco, user_id, &name).await?;

        ctx.say(format!(
            "✨ Fused {consumed} copies into a **{}** earning {}/h! Inventory id: `#{}`",
            pet_label(&gold),
            format_pb(gold.income_per_hour),
            gold.owned.id
        ))
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

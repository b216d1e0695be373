//! Autocomplete handlers for Discord slash command parameters.
//!
//! Suggestions are capped at 25 entries, the most Discord displays.

use crate::{
    bot::{BotData, user_key},
    core::{pet, shop},
    errors::Error,
};

/// Discord autocomplete limit
const MAX_SUGGESTIONS: usize = 25;

/// Suggests active shop items as `"<id>: <name>"`.
///
/// # Arguments
/// * `ctx` - The poise context containing the economy handle
/// * `partial` - The partial string the user has typed so far
pub async fn autocomplete_item(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<poise::serenity_prelude::AutocompleteChoice> {
    let Ok(items) = shop::item_names(&ctx.data().economy, partial).await else {
        return Vec::new();
    };

    items
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(id, name)| poise::serenity_prelude::AutocompleteChoice::new(name, id))
        .collect()
}

/// Suggests pet names from the catalog that match the partial input.
pub async fn autocomplete_pet_name(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let Ok(mut names) = pet::pet_names(&ctx.data().economy, partial).await else {
        return Vec::new();
    };
    names.truncate(MAX_SUGGESTIONS);
    names
}

/// Suggests eggs by slug.
pub async fn autocomplete_egg(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let mut eggs = pet::egg_names(&ctx.data().economy.config.pets, partial);
    eggs.truncate(MAX_SUGGESTIONS);
    eggs
}

/// Suggests the caller's own pets by inventory id.
pub async fn autocomplete_owned_pet(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<poise::serenity_prelude::AutocompleteChoice> {
    let Ok(user_id) = user_key(ctx.author().id) else {
        return Vec::new();
    };
    let Ok(pets) = pet::inventory(&ctx.data().economy, user_id).await else {
        return Vec::new();
    };

    let partial_lower = partial.to_lowercase();
    pets.into_iter()
        .filter(|p| p.pet.name.to_lowercase().contains(&partial_lower))
        .take(MAX_SUGGESTIONS)
        .map(|p| {
            let gold = if p.owned.is_gold { "Gold " } else { "" };
            let equipped = if p.owned.is_active { " (equipped)" } else { "" };
            poise::serenity_prelude::AutocompleteChoice::new(
                format!("#{} {gold}{}{equipped}", p.owned.id, p.pet.name),
                p.owned.id,
            )
        })
        .collect()
}

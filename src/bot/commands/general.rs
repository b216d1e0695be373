//! General Discord commands - ping, help, and other utility commands.
//! This module contains simple commands that don't require database operations.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let prefix = &ctx.data().settings.prefix;
        let help_text = format!(
            "**EcoBot Help**\n\
        Earn PrissBucks (PB) by chatting, then spend, save, gamble and trade them.\n\n\
        **Wallet**\n\
        • `/balance [user]` - Wallet, bank and debt overview.\n\
        • `/daily` - Claim your daily reward.\n\
        • `/give <user> <amount>` - Send PB (5% tax).\n\
        • `/leaderboard` - Richest players.\n\
        • `/history [page]` - Your transaction log.\n\
        • `/cooldowns` - Everything you are waiting on.\n\n\
        **Shop**\n\
        • `/shop [page]`, `/buy <item>`, `/inventory`\n\n\
        **Banking**\n\
        • `/bank deposit|withdraw|info` - Your private bank.\n\
        • `/publicbank withdraw|info` - Borrow from the shared bank (creates debt).\n\
        • `/debt`, `/paydebt <amount>`\n\
        • `/loan take|repay|status`\n\n\
        **Games**\n\
        • `/roulette <bet> <amount>`\n\
        • `/rps challenge|accept`\n\
        • `/steal <user>`\n\
        • `/heist <amount>`, `/heistinfo` - Rob the bank (risky).\n\n\
        **Social**\n\
        • `/clan create|join|leave|kick|upgrade|boost|info|top`\n\
        • `/pets egg|eggs|list|index|equip|claim|goldify|stats`\n\
        • `/trade start|offer|addpet|removepet|confirm|cancel|history`\n\
        • `/xp rank|top`\n\
        • `/topactive [limit]`, `/mystats [user]`, `/serverstats`\n\n\
        Every command also works with the `{prefix}` prefix."
        );

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

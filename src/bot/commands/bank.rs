//! Banking commands - private bank, public bank, debt and loans.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, format_pb, user_key},
        core::{bank, debt, loan, public_bank},
        errors::{Error, Result},
    };
    use chrono::Utc;
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Parent command for your private bank account.
    #[poise::command(
        slash_command,
        prefix_command,
        subcommands("bank_deposit", "bank_withdraw", "bank_info"),
        subcommand_required
    )]
    pub async fn bank(_ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        Ok(())
    }

    /// Moves PrissBucks from your wallet into the bank (2% deposit tax).
    #[poise::command(slash_command, prefix_command, rename = "deposit")]
    pub async fn bank_deposit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Amount to deposit"] amount: i64,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let deposit = bank::deposit(eco, user_id, amount).await?;

        let mut message = format!(
            "🏦 Deposited **{}** ({} tax, {} credited).\nBank: **{}** • Wallet: **{}**",
            format_pb(deposit.gross),
            format_pb(deposit.tax),
            format_pb(deposit.net),
            format_pb(deposit.bank_balance),
            format_pb(deposit.wallet_balance)
        );
        if deposit.maintenance_fee > 0 {
            write!(
                message,
                "\n🧾 Maintenance fee charged: {}",
                format_pb(deposit.maintenance_fee)
            )?;
        }
        ctx.say(message).await?;
        Ok(())
    }

    /// Moves PrissBucks from the bank back into your wallet.
    #[poise::command(slash_command, prefix_command, rename = "withdraw")]
    pub async fn bank_withdraw(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Amount to withdraw"] amount: i64,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let withdrawal = bank::withdraw(eco, user_id, amount).await?;

        let mut message = format!(
            "🏦 Withdrew **{}**.\nBank: **{}** • Wallet: **{}**",
            format_pb(withdrawal.amount),
            format_pb(withdrawal.bank_balance),
            format_pb(withdrawal.wallet_balance)
        );
        if withdrawal.maintenance_fee > 0 {
            write!(
                message,
                "\n🧾 Maintenance fee charged: {}",
                format_pb(withdrawal.maintenance_fee)
            )?;
        }
        ctx.say(message).await?;
        Ok(())
    }

    /// Shows your bank account.
    #[poise::command(slash_command, prefix_command, rename = "info")]
    pub async fn bank_info(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let cfg = &eco.config.bank;
        let user_id = user_key(ctx.author().id)?;
        let account = bank::account(eco, user_id).await?;

        let embed = serenity::CreateEmbed::default()
            .title("🏦 Your bank account")
            .color(0x002E_CC71)
            .field(
                "Balance",
                format!("{} / {}", format_pb(account.balance), format_pb(cfg.max_balance)),
                true,
            )
            .field(
                "Deposited today",
                format!(
                    "{} / {}",
                    format_pb(account.daily_deposit),
                    format_pb(cfg.daily_deposit_limit)
                ),
                true,
            )
            .field("Total deposited", format_pb(account.total_deposited), true)
            .field("Total withdrawn", format_pb(account.total_withdrawn), true)
            .field("Fees paid", format_pb(account.total_fees_paid), true);
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        Ok(())
    }

    /// Parent command for the shared public bank.
    #[poise::command(
        slash_command,
        prefix_command,
        subcommands("publicbank_withdraw", "publicbank_info"),
        subcommand_required
    )]
    pub async fn publicbank(_ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        Ok(())
    }

    /// Borrows from the public bank. The amount becomes debt.
    #[poise::command(slash_command, prefix_command, rename = "withdraw")]
    pub async fn publicbank_withdraw(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Amount to withdraw"] amount: i64,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let withdrawal = public_bank::withdraw(eco, user_id, amount).await?;

        ctx.say(format!(
            "🏛️ Withdrew **{}** from the public bank.\nWallet: **{}** • Debt: **{}** ({})",
            format_pb(withdrawal.amount),
            format_pb(withdrawal.wallet_balance),
            format_pb(withdrawal.total_debt),
            withdrawal.debt_level.label()
        ))
        .await?;
        Ok(())
    }

    /// Shows the public bank's balance and totals.
    #[poise::command(slash_command, prefix_command, rename = "info")]
    pub async fn publicbank_info(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let stats = public_bank::stats(&eco.db).await?;
        let cfg = &eco.config.public_bank;

        let embed = serenity::CreateEmbed::default()
            .title("🏛️ Public bank")
            .color(0x0034_98DB)
            .field("Balance", format_pb(stats.balance), true)
            .field("Total received", format_pb(stats.total_deposited), true)
            .field("Total lent", format_pb(stats.total_withdrawn), true)
            .field(
                "Withdrawals",
                format!(
                    "{} to {} per withdrawal, {} per day",
                    format_pb(cfg.withdraw_min),
                    format_pb(cfg.withdraw_max),
                    format_pb(cfg.daily_limit)
                ),
                false,
            );
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows your public bank debt and what it limits.
    #[poise::command(slash_command, prefix_command)]
    pub async fn debt(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let now = Utc::now();
        let status = debt::status(&eco.db, &eco.config.debt, user_id, now).await?;

        if status.total_debt == 0 {
            ctx.say("✅ You owe nothing to the public bank.").await?;
            return Ok(());
        }

        let level = status.effective_level();
        let rules = level.rules(&eco.config.debt);
        let mut message = format!(
            "💳 Debt: **{}** • Level: **{}**\n\
             Max withdrawal: {} • Cooldown x{:.1} • Interest {:.1}%/day",
            format_pb(status.total_debt),
            level.label(),
            format_pb(rules.max_withdraw),
            rules.cooldown_factor,
            rules.daily_interest_rate * 100.0
        );
        if let Some(grace_end) = status.grace_end.filter(|end| *end > now) {
            write!(message, "\n🕊️ Grace period until <t:{}:f>", grace_end.timestamp())?;
        }
        ctx.say(message).await?;
        Ok(())
    }

    /// Pays back public bank debt from your wallet.
    #[poise::command(slash_command, prefix_command)]
    pub async fn paydebt(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Amount to pay"] amount: i64,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let payment = debt::pay_debt(eco, user_id, amount).await?;

        ctx.say(format!(
            "💳 Paid **{}**. Remaining debt: **{}** • Wallet: **{}**",
            format_pb(payment.paid),
            format_pb(payment.remaining),
            format_pb(payment.wallet_balance)
        ))
        .await?;
        Ok(())
    }

    /// Parent command for personal loans.
    #[poise::command(
        slash_command,
        prefix_command,
        subcommands("loan_take", "loan_repay", "loan_status"),
        subcommand_required
    )]
    pub async fn loan(_ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        Ok(())
    }

    /// Takes out a loan. Interest accrues daily until it is repaid.
    #[poise::command(slash_command, prefix_command, rename = "take")]
    pub async fn loan_take(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Amount to borrow"] amount: i64,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let taken = loan::take_loan(eco, user_id, amount).await?;

        ctx.say(format!(
            "📝 Loan of **{}** approved. Due <t:{}:D> • {:.1}% interest per day.",
            format_pb(taken.principal),
            taken.due_date.timestamp(),
            eco.config.loan.daily_interest_rate * 100.0
        ))
        .await?;
        Ok(())
    }

    /// Repays part or all of your active loan.
    #[poise::command(slash_command, prefix_command, rename = "repay")]
    pub async fn loan_repay(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Amount to repay"] amount: i64,
    ) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let repayment = loan::repay(eco, user_id, amount).await?;

        let message = if repayment.closed {
            format!(
                "🎉 Paid **{}** and cleared your loan! Wallet: **{}**",
                format_pb(repayment.paid),
                format_pb(repayment.wallet_balance)
            )
        } else {
            format!(
                "📝 Paid **{}**. Still owed: **{}** • Wallet: **{}**",
                format_pb(repayment.paid),
                format_pb(repayment.remaining),
                format_pb(repayment.wallet_balance)
            )
        };
        ctx.say(message).await?;
        Ok(())
    }

    /// Shows your active loan and past loans.
    #[poise::command(slash_command, prefix_command, rename = "status")]
    pub async fn loan_status(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let eco = &ctx.data().economy;
        let user_id = user_key(ctx.author().id)?;
        let loans = loan::history(eco, user_id).await?;

        if loans.is_empty() {
            ctx.say("📝 You have never taken a loan.").await?;
            return Ok(());
        }

        let now = Utc::now();
        let mut description = String::new();
        for entry in loans.iter().take(10) {
            if entry.is_active {
                let overdue = if now > entry.due_date { " ⚠️ overdue" } else { "" };
                writeln!(
                    description,
                    "**Active:** {} owed of {} borrowed (interest {}) • due <t:{}:D>{overdue}",
                    format_pb(entry.remaining_debt),
                    format_pb(entry.principal),
                    format_pb(entry.interest_accumulated),
                    entry.due_date.timestamp()
                )?;
            } else {
                writeln!(
                    description,
                    "Repaid: {} borrowed <t:{}:D>",
                    format_pb(entry.principal),
                    entry.loan_date.timestamp()
                )?;
            }
        }

        let embed = serenity::CreateEmbed::default()
            .title("📝 Your loans")
            .color(0x00E6_7E22)
            .description(description);
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

//! Public bank - the shared pool fed by taxes, fees and game losses.
//!
//! Players in need can withdraw from it within limits that depend on their debt level; every
//! withdrawal becomes debt owed back to the bank.

use crate::{
    config::database::PUBLIC_BANK_ID,
    core::{
        Economy,
        cooldown::{self, CooldownKind},
        debt::{self, DebtLevel},
        ledger::{self, Posting, TransactionKind},
    },
    entities::{PublicBank, PublicBankWithdrawal, public_bank, public_bank_withdrawal},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, info, instrument};

/// Outcome of a successful withdrawal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawal {
    /// Amount credited to the wallet
    pub amount: i64,
    /// Public bank balance afterwards
    pub remaining_balance: i64,
    /// Player wallet afterwards
    pub wallet_balance: i64,
    /// Player debt afterwards
    pub total_debt: i64,
    /// Debt level after the withdrawal
    pub debt_level: DebtLevel,
}

/// Adds funds to the public bank. Non-positive amounts are ignored.
pub async fn credit<C>(conn: &C, amount: i64, source: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    if amount <= 0 {
        return Ok(());
    }

    PublicBank::update_many()
        .col_expr(
            public_bank::Column::Balance,
            Expr::col(public_bank::Column::Balance).add(amount),
        )
        .col_expr(
            public_bank::Column::TotalDeposited,
            Expr::col(public_bank::Column::TotalDeposited).add(amount),
        )
        .col_expr(public_bank::Column::LastActivity, Expr::value(Utc::now()))
        .filter(public_bank::Column::Id.eq(PUBLIC_BANK_ID))
        .exec(conn)
        .await?;

    debug!(amount, source, "public bank credited");
    Ok(())
}

/// Current public bank row.
pub async fn stats<C>(conn: &C) -> Result<public_bank::Model>
where
    C: ConnectionTrait,
{
    PublicBank::find_by_id(PUBLIC_BANK_ID)
        .one(conn)
        .await?
        .ok_or_else(|| Error::not_found("Public bank"))
}

/// Sum withdrawn by a user since `since`.
async fn withdrawn_since<C>(conn: &C, user_id: i64, since: DateTime<Utc>) -> Result<i64>
where
    C: ConnectionTrait,
{
    let rows = PublicBankWithdrawal::find()
        .filter(public_bank_withdrawal::Column::UserId.eq(user_id))
        .filter(public_bank_withdrawal::Column::CreatedAt.gt(since))
        .all(conn)
        .await?;
    Ok(rows.iter().map(|r| r.amount).sum())
}

/// Withdraws from the public bank into a player's wallet, creating matching debt.
#[instrument(skip(eco))]
pub async fn withdraw(eco: &Economy, user_id: i64, amount: i64) -> Result<Withdrawal> {
    let cfg = &eco.config.public_bank;
    if amount < cfg.withdraw_min || amount > cfg.withdraw_max {
        return Err(Error::rule(format!(
            "You can withdraw between {} and {} PB at a time",
            cfg.withdraw_min, cfg.withdraw_max
        )));
    }

    let _locks = eco.locks.acquire(&[user_id]).await;
    let now = Utc::now();
    let txn = eco.db.begin().await?;

    cooldown::ensure_ready(&txn, user_id, CooldownKind::PublicBankWithdraw, now).await?;

    let status = debt::status(&txn, &eco.config.debt, user_id, now).await?;
    let level = status.effective_level();
    let rules = *level.rules(&eco.config.debt);
    if amount > rules.max_withdraw {
        return Err(Error::LimitExceeded {
            message: format!(
                "Your debt level ({}) limits withdrawals to {} PB",
                level.label(),
                rules.max_withdraw
            ),
        });
    }

    let already = withdrawn_since(&txn, user_id, now - Duration::hours(24)).await?;
    if already + amount > cfg.daily_limit {
        return Err(Error::LimitExceeded {
            message: format!(
                "Daily public bank limit reached: {} PB left today",
                (cfg.daily_limit - already).max(0)
            ),
        });
    }

    let bank = PublicBank::find_by_id(PUBLIC_BANK_ID)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Public bank"))?;
    if bank.balance < amount {
        return Err(Error::rule(format!(
            "The public bank only holds {} PB",
            bank.balance
        )));
    }

    PublicBank::update_many()
        .col_expr(
            public_bank::Column::Balance,
            Expr::col(public_bank::Column::Balance).sub(amount),
        )
        .col_expr(
            public_bank::Column::TotalWithdrawn,
            Expr::col(public_bank::Column::TotalWithdrawn).add(amount),
        )
        .col_expr(public_bank::Column::LastActivity, Expr::value(now))
        .filter(public_bank::Column::Id.eq(PUBLIC_BANK_ID))
        .exec(&txn)
        .await?;
    let remaining_balance = bank.balance - amount;

    let change = ledger::post(
        &txn,
        Posting::credit(
            user_id,
            amount,
            TransactionKind::PublicBankWithdraw,
            "Public bank withdrawal",
        ),
    )
    .await?;

    public_bank_withdrawal::ActiveModel {
        user_id: Set(user_id),
        amount: Set(amount),
        remaining_balance: Set(remaining_balance),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let debt_row = debt::add_debt(&txn, &eco.config.debt, user_id, amount, now).await?;

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    let cooldown_secs = (cfg.cooldown_secs as f64 * rules.cooldown_factor).round() as i64;
    cooldown::start(
        &txn,
        user_id,
        CooldownKind::PublicBankWithdraw,
        cooldown_secs,
        now,
    )
    .await?;

    txn.commit().await?;
    info!(user_id, amount, remaining_balance, "public bank withdrawal");

    Ok(Withdrawal {
        amount,
        remaining_balance,
        wallet_balance: change.after,
        total_debt: debt_row.total_debt,
        debt_level: DebtLevel::from_debt(debt_row.total_debt, &eco.config.debt),
    })
}

/// Empties the public bank and its withdrawal history (economy reset).
pub async fn reset<C>(conn: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    PublicBankWithdrawal::delete_many().exec(conn).await?;
    PublicBank::update_many()
        .col_expr(public_bank::Column::Balance, Expr::value(0_i64))
        .col_expr(public_bank::Column::TotalDeposited, Expr::value(0_i64))
        .col_expr(public_bank::Column::TotalWithdrawn, Expr::value(0_i64))
        .col_expr(public_bank::Column::LastActivity, Expr::value(Utc::now()))
        .filter(public_bank::Column::Id.eq(PUBLIC_BANK_ID))
        .exec(conn)
        .await?;
    Ok(())
}

//! Debt owed to the public bank.
//!
//! Debt is created by public bank withdrawals and repaid manually with `paydebt` or a couple of
//! PrissBucks at a time from message rewards. Its size sets a level that restricts further
//! withdrawals; a new debtor gets a grace period during which they count as green.

use crate::{
    config::economy::{DebtConfig, DebtLevelRules},
    core::{
        Economy, fraction_of,
        ledger::{self, Posting, TransactionKind},
        public_bank,
    },
    entities::{Debt, debt},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{QuerySelect, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Debt severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebtLevel {
    /// Small or no debt
    Green,
    /// Moderate debt
    Yellow,
    /// Heavy debt
    Red,
}

impl DebtLevel {
    /// Level for a debt total.
    #[must_use]
    pub const fn from_debt(total_debt: i64, cfg: &DebtConfig) -> Self {
        if total_debt < cfg.yellow_threshold {
            Self::Green
        } else if total_debt < cfg.red_threshold {
            Self::Yellow
        } else {
            Self::Red
        }
    }

    /// Withdrawal cap, cooldown factor and interest rate for this level.
    #[must_use]
    pub const fn rules(self, cfg: &DebtConfig) -> &DebtLevelRules {
        match self {
            Self::Green => &cfg.green,
            Self::Yellow => &cfg.yellow,
            Self::Red => &cfg.red,
        }
    }

    /// Value stored in `public_bank_debts.debt_level`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Green => 0,
            Self::Yellow => 1,
            Self::Red => 2,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Green => "🟢 Green",
            Self::Yellow => "🟡 Yellow",
            Self::Red => "🔴 Red",
        }
    }
}

/// A player's debt situation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebtStatus {
    /// Outstanding debt
    pub total_debt: i64,
    /// Level from the debt total alone
    pub level: DebtLevel,
    /// End of the grace period, if one is running
    pub grace_end: Option<DateTime<Utc>>,
}

impl DebtStatus {
    /// Level used for restrictions: green while the grace period runs.
    #[must_use]
    pub fn effective_level(&self) -> DebtLevel {
        if self.grace_end.is_some() {
            DebtLevel::Green
        } else {
            self.level
        }
    }
}

/// Outcome of a manual repayment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebtPayment {
    /// Amount actually repaid
    pub paid: i64,
    /// Debt left afterwards
    pub remaining: i64,
    /// Wallet afterwards
    pub wallet_balance: i64,
}

/// Aggregate debt figures for admins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebtStats {
    /// Users with debt
    pub debtors: u64,
    /// Sum of all debts
    pub total_debt: i64,
    #[allow(missing_docs)]
    pub green: u64,
    #[allow(missing_docs)]
    pub yellow: u64,
    #[allow(missing_docs)]
    pub red: u64,
}

/// Reads a user's debt situation at `now`.
pub async fn status<C>(
    conn: &C,
    cfg: &DebtConfig,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<DebtStatus>
where
    C: ConnectionTrait,
{
    let row = Debt::find_by_id(user_id).one(conn).await?;
    let (total_debt, grace_end) = row.map_or((0, None), |r| (r.total_debt, r.grace_end));

    Ok(DebtStatus {
        total_debt,
        level: DebtLevel::from_debt(total_debt, cfg),
        grace_end: grace_end.filter(|end| *end > now && total_debt > 0),
    })
}

/// Adds debt. Starting from zero debt opens a new grace period.
pub async fn add_debt<C>(
    conn: &C,
    cfg: &DebtConfig,
    user_id: i64,
    amount: i64,
    now: DateTime<Utc>,
) -> Result<debt::Model>
where
    C: ConnectionTrait,
{
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }

    let existing = Debt::find_by_id(user_id).lock_exclusive().one(conn).await?;
    let grace = now + Duration::days(cfg.grace_days);

    match existing {
        Some(row) => {
            let starts_fresh = row.total_debt <= 0;
            let total = row.total_debt + amount;
            let mut active: debt::ActiveModel = row.into();
            active.total_debt = Set(total);
            active.debt_level = Set(DebtLevel::from_debt(total, cfg).as_i32());
            if starts_fresh {
                active.grace_end = Set(Some(grace));
                active.last_interest = Set(Some(now));
            }
            active.update(conn).await.map_err(Into::into)
        }
        None => debt::ActiveModel {
            user_id: Set(user_id),
            total_debt: Set(amount),
            debt_level: Set(DebtLevel::from_debt(amount, cfg).as_i32()),
            last_payment: Set(None),
            grace_end: Set(Some(grace)),
            last_interest: Set(Some(now)),
            created_at: Set(now),
        }
        .insert(conn)
        .await
        .map_err(Into::into),
    }
}

/// Lowers a debt by `amount` (already collected by the caller). Returns the debt left.
async fn reduce_debt<C>(
    conn: &C,
    cfg: &DebtConfig,
    row: debt::Model,
    amount: i64,
    now: DateTime<Utc>,
) -> Result<i64>
where
    C: ConnectionTrait,
{
    let remaining = (row.total_debt - amount).max(0);
    let mut active: debt::ActiveModel = row.into();
    active.total_debt = Set(remaining);
    active.debt_level = Set(DebtLevel::from_debt(remaining, cfg).as_i32());
    active.last_payment = Set(Some(now));
    active.update(conn).await?;
    Ok(remaining)
}

/// Repays up to `amount` of debt from the wallet. The money returns to the public bank.
#[instrument(skip(eco))]
pub async fn pay_debt(eco: &Economy, user_id: i64, amount: i64) -> Result<DebtPayment> {
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }

    let _locks = eco.locks.acquire(&[user_id]).await;
    let now = Utc::now();
    let txn = eco.db.begin().await?;

    let row = Debt::find_by_id(user_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .filter(|r| r.total_debt > 0)
        .ok_or_else(|| Error::rule("You have no debt to repay"))?;

    let paid = amount.min(row.total_debt);
    let change = ledger::post(
        &txn,
        Posting::debit(user_id, paid, TransactionKind::DebtPayment, "Public bank debt repayment"),
    )
    .await?;
    public_bank::credit(&txn, paid, "debt_payment").await?;
    let remaining = reduce_debt(&txn, &eco.config.debt, row, paid, now).await?;

    txn.commit().await?;
    info!(user_id, paid, remaining, "debt repaid");

    Ok(DebtPayment {
        paid,
        remaining,
        wallet_balance: change.after,
    })
}

/// Takes up to the configured per-message amount from the wallet towards the debt.
///
/// Runs inside the caller's transaction; returns the amount repaid.
pub async fn auto_repay<C>(conn: &C, cfg: &DebtConfig, user_id: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    let Some(row) = Debt::find_by_id(user_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .filter(|r| r.total_debt > 0)
    else {
        return Ok(0);
    };

    let wanted = cfg.auto_repay_per_message.min(row.total_debt);
    if wanted <= 0 {
        return Ok(0);
    }

    let change = ledger::post(
        conn,
        Posting::debit(user_id, wanted, TransactionKind::DebtAutoRepay, "Automatic debt repayment")
            .clamped(),
    )
    .await?;
    let paid = -change.applied();
    if paid > 0 {
        public_bank::credit(conn, paid, "debt_auto_repay").await?;
        reduce_debt(conn, cfg, row, paid, Utc::now()).await?;
    }
    Ok(paid)
}

/// Applies one day of interest to every debt whose last charge is at least a day old.
///
/// Debtors in their grace period accrue nothing. Returns the number of debts charged.
#[instrument(skip(eco))]
pub async fn accrue_interest(eco: &Economy, now: DateTime<Utc>) -> Result<u64> {
    let cfg = &eco.config.debt;
    let txn = eco.db.begin().await?;
    let debts = Debt::find()
        .filter(debt::Column::TotalDebt.gt(0))
        .lock_exclusive()
        .all(&txn)
        .await?;

    let mut charged = 0;
    for row in debts {
        let due = row
            .last_interest
            .is_none_or(|last| now - last >= Duration::hours(24));
        if !due {
            continue;
        }

        let in_grace = row.grace_end.is_some_and(|end| end > now);
        let level = DebtLevel::from_debt(row.total_debt, cfg);
        let interest = if in_grace {
            0
        } else {
            fraction_of(row.total_debt, level.rules(cfg).daily_interest_rate)
        };

        let total = row.total_debt + interest;
        let mut active: debt::ActiveModel = row.into();
        active.total_debt = Set(total);
        active.debt_level = Set(DebtLevel::from_debt(total, cfg).as_i32());
        active.last_interest = Set(Some(now));
        active.update(&txn).await?;

        if interest > 0 {
            charged += 1;
        }
    }

    txn.commit().await?;
    if charged > 0 {
        info!(charged, "debt interest applied");
    }
    Ok(charged)
}

/// Aggregate figures over all outstanding debts.
pub async fn stats<C>(conn: &C, cfg: &DebtConfig) -> Result<DebtStats>
where
    C: ConnectionTrait,
{
    let debts = Debt::find()
        .filter(debt::Column::TotalDebt.gt(0))
        .all(conn)
        .await?;

    Ok(debts.iter().fold(DebtStats::default(), |mut acc, row| {
        acc.debtors += 1;
        acc.total_debt += row.total_debt;
        match DebtLevel::from_debt(row.total_debt, cfg) {
            DebtLevel::Green => acc.green += 1,
            DebtLevel::Yellow => acc.yellow += 1,
            DebtLevel::Red => acc.red += 1,
        }
        acc
    }))
}

/// Forgives a user's debt. Returns whether there was a row to delete.
pub async fn reset<C>(conn: &C, user_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = Debt::delete_by_id(user_id).exec(conn).await?;
    Ok(result.rows_affected > 0)
}

/// Forgives every debt (economy reset).
pub async fn reset_all<C>(conn: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    Debt::delete_many().exec(conn).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_levels_from_thresholds() {
        let cfg = DebtConfig::default();
        assert_eq!(DebtLevel::from_debt(0, &cfg), DebtLevel::Green);
        assert_eq!(DebtLevel::from_debt(1_999, &cfg), DebtLevel::Green);
        assert_eq!(DebtLevel::from_debt(2_000, &cfg), DebtLevel::Yellow);
        assert_eq!(DebtLevel::from_debt(5_000, &cfg), DebtLevel::Red);
        assert_eq!(DebtLevel::Red.rules(&cfg).max_withdraw, 200);
    }

    #[test]
    fn test_level_rules_come_from_config() -> Result<()> {
        let cfg = crate::config::economy::parse_config(
            "[debt]\n\
             yellow = { max_withdraw = 300, cooldown_factor = 3.0, daily_interest_rate = 0.01 }\n",
        )?
        .debt;
        let yellow = DebtLevel::Yellow.rules(&cfg);
        assert_eq!(yellow.max_withdraw, 300);
        assert!((yellow.cooldown_factor - 3.0).abs() < f64::EPSILON);
        assert_eq!(DebtLevel::Green.rules(&cfg).max_withdraw, 1_000);
        Ok(())
    }

    #[tokio::test]
    async fn test_grace_period_counts_as_green() -> Result<()> {
        let eco = setup_economy().await?;
        let cfg = &eco.config.debt;
        let now = Utc::now();

        add_debt(&eco.db, cfg, 1, 6_000, now).await?;
        let during = status(&eco.db, cfg, 1, now).await?;
        assert_eq!(during.level, DebtLevel::Red);
        assert_eq!(during.effective_level(), DebtLevel::Green);

        let after = status(&eco.db, cfg, 1, now + Duration::days(8)).await?;
        assert_eq!(after.effective_level(), DebtLevel::Red);
        Ok(())
    }

    #[tokio::test]
    async fn test_pay_debt_partial_and_capped() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 1_000).await?;
        add_debt(&eco.db, &eco.config.debt, 1, 300, Utc::now()).await?;

        let first = pay_debt(&eco, 1, 100).await?;
        assert_eq!(first.paid, 100);
        assert_eq!(first.remaining, 200);

        let second = pay_debt(&eco, 1, 500).await?;
        assert_eq!(second.paid, 200);
        assert_eq!(second.remaining, 0);
        assert_eq!(second.wallet_balance, 700);

        assert_eq!(public_bank::stats(&eco.db).await?.balance, 300);
        assert!(matches!(pay_debt(&eco, 1, 10).await, Err(Error::Rule { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_pay_debt_needs_wallet() -> Result<()> {
        let eco = setup_economy().await?;
        add_debt(&eco.db, &eco.config.debt, 1, 300, Utc::now()).await?;

        let result = pay_debt(&eco, 1, 100).await;
        assert!(matches!(result, Err(Error::InsufficientFunds { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_auto_repay_takes_small_amount() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 1).await?;
        add_debt(&eco.db, &eco.config.debt, 1, 10, Utc::now()).await?;

        let paid = auto_repay(&eco.db, &eco.config.debt, 1).await?;
        assert_eq!(paid, 1);
        assert_eq!(status(&eco.db, &eco.config.debt, 1, Utc::now()).await?.total_debt, 9);

        assert_eq!(auto_repay(&eco.db, &eco.config.debt, 2).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_interest_after_grace() -> Result<()> {
        let eco = setup_economy().await?;
        let cfg = &eco.config.debt;
        let start = Utc::now();
        add_debt(&eco.db, cfg, 1, 10_000, start).await?;

        // still in grace
        assert_eq!(accrue_interest(&eco, start + Duration::days(1)).await?, 0);

        let later = start + Duration::days(9);
        assert_eq!(accrue_interest(&eco, later).await?, 1);
        assert_eq!(status(&eco.db, cfg, 1, later).await?.total_debt, 10_050);

        // not again on the same day
        assert_eq!(accrue_interest(&eco, later + Duration::hours(1)).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_stats_and_reset() -> Result<()> {
        let eco = setup_economy().await?;
        let cfg = &eco.config.debt;
        add_debt(&eco.db, cfg, 1, 100, Utc::now()).await?;
        add_debt(&eco.db, cfg, 2, 3_000, Utc::now()).await?;

        let s = stats(&eco.db, cfg).await?;
        assert_eq!(s.debtors, 2);
        assert_eq!(s.total_debt, 3_100);
        assert_eq!((s.green, s.yellow, s.red), (1, 1, 0));

        assert!(reset(&eco.db, 1).await?);
        assert!(!reset(&eco.db, 1).await?);
        Ok(())
    }
}

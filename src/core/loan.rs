//! Personal loans.
//!
//! A player can hold one active loan. Interest is charged once per elapsed day on the remaining
//! debt, with an extra penalty once the loan is past due. [`spawn_interest_job`] runs the daily
//! accrual (and debt interest) in the background.

use crate::{
    core::{
        Economy, debt, fraction_of,
        ledger::{self, Posting, TransactionKind},
    },
    entities::{Loan, loan},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// How often the background job wakes up.
const INTEREST_JOB_PERIOD: std::time::Duration = std::time::Duration::from_secs(3600);

/// Outcome of a repayment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanRepayment {
    /// Amount actually repaid
    pub paid: i64,
    /// Debt left on the loan
    pub remaining: i64,
    /// Whether this payment closed the loan
    pub closed: bool,
    /// Wallet afterwards
    pub wallet_balance: i64,
}

/// The active loan of a user, if any.
pub async fn active_loan<C>(conn: &C, user_id: i64) -> Result<Option<loan::Model>>
where
    C: ConnectionTrait,
{
    Loan::find()
        .filter(loan::Column::UserId.eq(user_id))
        .filter(loan::Column::IsActive.eq(true))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Borrows `amount` PrissBucks, credited immediately.
#[instrument(skip(eco))]
pub async fn take_loan(eco: &Economy, user_id: i64, amount: i64) -> Result<loan::Model> {
    let cfg = &eco.config.loan;
    if amount <= 0 || amount > cfg.max_amount {
        return Err(Error::rule(format!(
            "Loans range from 1 to {} PB",
            cfg.max_amount
        )));
    }

    let _locks = eco.locks.acquire(&[user_id]).await;
    let now = Utc::now();
    let txn = eco.db.begin().await?;

    if active_loan(&txn, user_id).await?.is_some() {
        return Err(Error::rule("You already have an active loan"));
    }

    let created = loan::ActiveModel {
        user_id: Set(user_id),
        principal: Set(amount),
        remaining_debt: Set(amount),
        interest_accumulated: Set(0),
        loan_date: Set(now),
        due_date: Set(now + Duration::days(cfg.duration_days)),
        last_interest_calculation: Set(now),
        is_active: Set(true),
        repaid_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    ledger::post(
        &txn,
        Posting::credit(user_id, amount, TransactionKind::LoanTaken, "Loan granted"),
    )
    .await?;

    txn.commit().await?;
    info!(user_id, amount, "loan granted");
    Ok(created)
}

/// Repays up to `amount` of the active loan. The wallet must cover the payment.
#[instrument(skip(eco))]
pub async fn repay(eco: &Economy, user_id: i64, amount: i64) -> Result<LoanRepayment> {
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }

    let _locks = eco.locks.acquire(&[user_id]).await;
    let now = Utc::now();
    let txn = eco.db.begin().await?;

    let current = Loan::find()
        .filter(loan::Column::UserId.eq(user_id))
        .filter(loan::Column::IsActive.eq(true))
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| Error::rule("You have no active loan"))?;

    let paid = amount.min(current.remaining_debt);
    let change = ledger::post(
        &txn,
        Posting::debit(user_id, paid, TransactionKind::LoanRepayment, "Loan repayment"),
    )
    .await?;

    let remaining = current.remaining_debt - paid;
    let closed = remaining == 0;
    let mut active: loan::ActiveModel = current.into();
    active.remaining_debt = Set(remaining);
    if closed {
        active.is_active = Set(false);
        active.repaid_at = Set(Some(now));
    }
    active.update(&txn).await?;

    txn.commit().await?;
    info!(user_id, paid, remaining, "loan repayment");

    Ok(LoanRepayment {
        paid,
        remaining,
        closed,
        wallet_balance: change.after,
    })
}

/// Interest owed for one day on a loan.
#[must_use]
pub fn daily_interest(
    remaining: i64,
    overdue: bool,
    cfg: &crate::config::economy::LoanConfig,
) -> i64 {
    let interest = fraction_of(remaining, cfg.daily_interest_rate);
    let penalty = if overdue {
        fraction_of(remaining, cfg.overdue_penalty_rate)
    } else {
        0
    };
    interest + penalty
}

/// Applies interest to every active loan, once per full day since the last calculation.
///
/// Returns the number of loans that accrued interest.
#[instrument(skip(eco))]
pub async fn accrue_interest(eco: &Economy, now: DateTime<Utc>) -> Result<u64> {
    let cfg = &eco.config.loan;
    let txn = eco.db.begin().await?;
    let loans = Loan::find()
        .filter(loan::Column::IsActive.eq(true))
        .lock_exclusive()
        .all(&txn)
        .await?;

    let mut charged = 0;
    for current in loans {
        let days = (now - current.last_interest_calculation).num_days();
        if days < 1 {
            continue;
        }

        let mut remaining = current.remaining_debt;
        let mut added = 0;
        for day in 1..=days {
            let at = current.last_interest_calculation + Duration::days(day);
            let interest = daily_interest(remaining, at > current.due_date, cfg);
            remaining += interest;
            added += interest;
        }

        let mut active: loan::ActiveModel = current.clone().into();
        active.remaining_debt = Set(remaining);
        active.interest_accumulated = Set(current.interest_accumulated + added);
        active.last_interest_calculation =
            Set(current.last_interest_calculation + Duration::days(days));
        active.update(&txn).await?;
        charged += 1;
    }

    txn.commit().await?;
    if charged > 0 {
        info!(charged, "loan interest applied");
    }
    Ok(charged)
}

/// Loan history of a user, newest first.
pub async fn history(eco: &Economy, user_id: i64) -> Result<Vec<loan::Model>> {
    Loan::find()
        .filter(loan::Column::UserId.eq(user_id))
        .order_by_desc(loan::Column::Id)
        .limit(10)
        .all(&eco.db)
        .await
        .map_err(Into::into)
}

/// Deletes every loan (economy reset).
pub async fn reset_all<C>(conn: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    Loan::delete_many().exec(conn).await?;
    Ok(())
}

/// Runs loan and debt interest every hour until the runtime shuts down.
pub fn spawn_interest_job(eco: Arc<Economy>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(INTEREST_JOB_PERIOD);
        loop {
            ticker.tick().await;
            let now = Utc::now();
            if let Err(e) = accrue_interest(&eco, now).await {
                error!("Loan interest job failed: {e}");
            }
            if let Err(e) = debt::accrue_interest(&eco, now).await {
                error!("Debt interest job failed: {e}");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_take_and_repay_loan() -> Result<()> {
        let eco = setup_economy().await?;

        let taken = take_loan(&eco, 1, 1_000).await?;
        assert_eq!(taken.remaining_debt, 1_000);
        assert_eq!(ledger::balance_of(&eco.db, 1).await?, 1_000);

        let second = take_loan(&eco, 1, 10).await;
        assert!(matches!(second, Err(Error::Rule { .. })));

        let partial = repay(&eco, 1, 400).await?;
        assert_eq!(partial.remaining, 600);
        assert!(!partial.closed);

        let rest = repay(&eco, 1, 5_000).await?;
        assert_eq!(rest.paid, 600);
        assert!(rest.closed);
        assert_eq!(rest.wallet_balance, 0);

        assert!(active_loan(&eco.db, 1).await?.is_none());
        let past = history(&eco, 1).await?;
        assert!(past[0].repaid_at.is_some());

        // a new loan is allowed once the previous one is repaid
        take_loan(&eco, 1, 10).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_loan_limits() -> Result<()> {
        let eco = setup_economy().await?;
        assert!(matches!(take_loan(&eco, 1, 0).await, Err(Error::Rule { .. })));
        assert!(matches!(take_loan(&eco, 1, 20_001).await, Err(Error::Rule { .. })));
        assert!(matches!(repay(&eco, 1, 10).await, Err(Error::Rule { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_repay_requires_wallet() -> Result<()> {
        let eco = setup_economy().await?;
        take_loan(&eco, 1, 1_000).await?;
        crate::core::economy::admin_remove(&eco, 1, 1_000).await?;

        let result = repay(&eco, 1, 100).await;
        assert!(matches!(result, Err(Error::InsufficientFunds { .. })));
        Ok(())
    }

    #[test]
    fn test_daily_interest_with_penalty() {
        let cfg = crate::config::economy::LoanConfig::default();
        assert_eq!(daily_interest(1_000, false, &cfg), 20);
        assert_eq!(daily_interest(1_000, true, &cfg), 120);
    }

    #[tokio::test]
    async fn test_interest_accrues_per_day() -> Result<()> {
        let eco = setup_economy().await?;
        let taken = take_loan(&eco, 1, 1_000).await?;
        let start = taken.last_interest_calculation;

        assert_eq!(accrue_interest(&eco, start + Duration::hours(23)).await?, 0);

        assert_eq!(accrue_interest(&eco, start + Duration::hours(49)).await?, 1);
        let current = active_loan(&eco.db, 1).await?.unwrap();
        // 1000 -> 1020 -> 1040
        assert_eq!(current.remaining_debt, 1_040);
        assert_eq!(current.interest_accumulated, 40);
        assert_eq!(current.last_interest_calculation, start + Duration::days(2));
        Ok(())
    }

    #[tokio::test]
    async fn test_overdue_penalty() -> Result<()> {
        let eco = setup_economy().await?;
        let taken = take_loan(&eco, 1, 1_000).await?;

        let mut active: loan::ActiveModel = taken.clone().into();
        active.due_date = Set(taken.loan_date);
        active.update(&eco.db).await?;

        accrue_interest(&eco, taken.loan_date + Duration::days(1)).await?;
        let current = active_loan(&eco.db, 1).await?.unwrap();
        assert_eq!(current.remaining_debt, 1_120);
        Ok(())
    }
}

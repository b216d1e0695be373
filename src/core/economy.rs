//! Wallet basics - balance, daily reward, transfers, leaderboard and admin tools.

use crate::{
    config::economy::{DailyConfig, TransferConfig},
    core::{
        Economy, bank,
        cooldown::{self, CooldownKind},
        debt, heist,
        ledger::{self, Posting, TransactionKind},
        loan, public_bank, rounded_fraction_of,
    },
    entities::{TransactionLog, User, UserPurchase, user},
    errors::{Error, Result},
};
use chrono::{Duration, Utc};
use rand::Rng;
use sea_orm::{QueryOrder, QuerySelect, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{info, instrument, warn};

/// Pre-rolled daily reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyRoll {
    /// Base reward
    pub base: i64,
    /// Extra reward when the bonus triggered
    pub bonus: Option<i64>,
}

impl DailyRoll {
    /// Rolls a daily reward with the thread RNG.
    #[must_use]
    pub fn random(cfg: &DailyConfig) -> Self {
        let mut rng = rand::thread_rng();
        let base = rng.gen_range(cfg.min..=cfg.max);
        let bonus = rng
            .gen_bool(cfg.bonus_chance.clamp(0.0, 1.0))
            .then(|| rng.gen_range(cfg.bonus_min..=cfg.bonus_max));
        Self { base, bonus }
    }

    /// Total credited.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.base + self.bonus.unwrap_or(0)
    }
}

/// Outcome of a daily claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyReward {
    #[allow(missing_docs)]
    pub roll: DailyRoll,
    /// Wallet afterwards
    pub balance: i64,
}

/// Outcome of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    /// Amount received by the recipient
    pub amount: i64,
    /// Tax paid by the sender on top of the amount
    pub tax: i64,
    /// Sender wallet afterwards
    pub sender_balance: i64,
    /// Recipient wallet afterwards
    pub recipient_balance: i64,
}

/// Transfer tax: a rounded percentage, at least 1 PB.
#[must_use]
pub fn transfer_tax(amount: i64, cfg: &TransferConfig) -> i64 {
    rounded_fraction_of(amount, cfg.tax_rate).max(1)
}

/// Current wallet balance (creates the wallet).
pub async fn balance(eco: &Economy, user_id: i64) -> Result<i64> {
    Ok(ledger::ensure_user(&eco.db, user_id).await?.balance)
}

/// Claims the daily reward.
#[instrument(skip(eco))]
pub async fn daily(eco: &Economy, user_id: i64, roll: DailyRoll) -> Result<DailyReward> {
    let cfg = &eco.config.daily;
    let _locks = eco.locks.acquire(&[user_id]).await;
    let now = Utc::now();
    let txn = eco.db.begin().await?;

    let wallet = ledger::lock_user(&txn, user_id).await?;
    if let Some(remaining_secs) = wallet
        .last_daily
        .and_then(|last| cooldown::seconds_left(last + Duration::seconds(cfg.cooldown_secs), now))
    {
        return Err(Error::OnCooldown { remaining_secs });
    }

    let mut change = ledger::post(
        &txn,
        Posting::credit(user_id, roll.base, TransactionKind::Daily, "Daily reward"),
    )
    .await?;
    if let Some(bonus) = roll.bonus {
        change = ledger::post(
            &txn,
            Posting::credit(user_id, bonus, TransactionKind::DailyBonus, "Daily bonus"),
        )
        .await?;
    }

    User::update_many()
        .col_expr(user::Column::LastDaily, Expr::value(Some(now)))
        .filter(user::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;
    info!(user_id, total = roll.total(), "daily claimed");
    Ok(DailyReward {
        roll,
        balance: change.after,
    })
}

/// Sends PrissBucks to another player. The sender pays the tax on top of the amount.
#[instrument(skip(eco))]
pub async fn transfer(eco: &Economy, from: i64, to: i64, amount: i64) -> Result<Transfer> {
    let cfg = &eco.config.transfer;
    if from == to {
        return Err(Error::rule("You cannot send PrissBucks to yourself"));
    }
    if amount < cfg.min || amount > cfg.max {
        return Err(Error::InvalidAmount { amount });
    }
    let tax = transfer_tax(amount, cfg);

    let _locks = eco.locks.acquire(&[from, to]).await;
    let now = Utc::now();
    let txn = eco.db.begin().await?;

    cooldown::ensure_ready(&txn, from, CooldownKind::Transfer, now).await?;

    let sender = ledger::lock_user(&txn, from).await?;
    ledger::lock_user(&txn, to).await?;
    if sender.balance < amount + tax {
        return Err(Error::InsufficientFunds {
            current: sender.balance,
            required: amount + tax,
        });
    }

    ledger::post(
        &txn,
        Posting::debit(from, amount, TransactionKind::TransferSent, "Transfer sent")
            .with_related(to),
    )
    .await?;
    let sender_change = ledger::post(
        &txn,
        Posting::debit(from, tax, TransactionKind::TransferTax, "Transfer tax"),
    )
    .await?;
    let recipient_change = ledger::post(
        &txn,
        Posting::credit(to, amount, TransactionKind::TransferReceived, "Transfer received")
            .with_related(from),
    )
    .await?;
    public_bank::credit(&txn, tax, "transfer_tax").await?;
    cooldown::start(&txn, from, CooldownKind::Transfer, cfg.cooldown_secs, now).await?;

    txn.commit().await?;
    info!(from, to, amount, tax, "transfer completed");

    Ok(Transfer {
        amount,
        tax,
        sender_balance: sender_change.after,
        recipient_balance: recipient_change.after,
    })
}

/// Richest wallets, capped at the configured maximum.
pub async fn leaderboard(eco: &Economy, limit: u64) -> Result<Vec<user::Model>> {
    User::find()
        .filter(user::Column::Balance.gt(0))
        .order_by_desc(user::Column::Balance)
        .order_by_asc(user::Column::UserId)
        .limit(limit.clamp(1, eco.config.leaderboard.max_entries))
        .all(&eco.db)
        .await
        .map_err(Into::into)
}

/// Credits a wallet (admin).
#[instrument(skip(eco))]
pub async fn admin_add(eco: &Economy, user_id: i64, amount: i64) -> Result<i64> {
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }
    let _locks = eco.locks.acquire(&[user_id]).await;
    let txn = eco.db.begin().await?;
    let change = ledger::post(
        &txn,
        Posting::credit(user_id, amount, TransactionKind::AdminAdd, "Added by an administrator"),
    )
    .await?;
    txn.commit().await?;
    Ok(change.after)
}

/// Debits a wallet down to at most zero (admin). Returns the new balance.
#[instrument(skip(eco))]
pub async fn admin_remove(eco: &Economy, user_id: i64, amount: i64) -> Result<i64> {
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }
    let _locks = eco.locks.acquire(&[user_id]).await;
    let txn = eco.db.begin().await?;
    let change = ledger::post(
        &txn,
        Posting::debit(
            user_id,
            amount,
            TransactionKind::AdminRemove,
            "Removed by an administrator",
        )
        .clamped(),
    )
    .await?;
    txn.commit().await?;
    Ok(change.after)
}

/// Wipes the economy: balances, dailies, logs, purchases, cooldowns, banks, loans, debts and
/// heist records.
///
/// Shop items, clans, pets, unlocked zones, XP and activity counts are kept.
#[instrument(skip(eco))]
pub async fn reset_economy(eco: &Economy) -> Result<()> {
    let txn = eco.db.begin().await?;

    User::update_many()
        .col_expr(user::Column::Balance, Expr::value(0_i64))
        .col_expr(
            user::Column::LastDaily,
            Expr::value(Option::<chrono::DateTime<Utc>>::None),
        )
        .exec(&txn)
        .await?;
    TransactionLog::delete_many().exec(&txn).await?;
    UserPurchase::delete_many().exec(&txn).await?;
    cooldown::clear_all(&txn).await?;
    bank::reset_all(&txn).await?;
    loan::reset_all(&txn).await?;
    debt::reset_all(&txn).await?;
    heist::reset_all(&txn).await?;
    public_bank::reset(&txn).await?;

    txn.commit().await?;
    warn!("economy reset");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn roll(base: i64, bonus: Option<i64>) -> DailyRoll {
        DailyRoll { base, bonus }
    }

    #[test]
    fn test_daily_roll_within_bounds() {
        let cfg = DailyConfig::default();
        for _ in 0..200 {
            let r = DailyRoll::random(&cfg);
            assert!((cfg.min..=cfg.max).contains(&r.base));
            if let Some(b) = r.bonus {
                assert!((cfg.bonus_min..=cfg.bonus_max).contains(&b));
            }
        }
    }

    #[test]
    fn test_transfer_tax() {
        let cfg = TransferConfig::default();
        assert_eq!(transfer_tax(1, &cfg), 1);
        assert_eq!(transfer_tax(1_000, &cfg), 50);
    }

    #[tokio::test]
    async fn test_daily_once_per_day() -> Result<()> {
        let eco = setup_economy().await?;

        let first = daily(&eco, 1, roll(100, Some(60))).await?;
        assert_eq!(first.balance, 160);

        let second = daily(&eco, 1, roll(100, None)).await;
        assert!(matches!(second, Err(Error::OnCooldown { .. })));
        assert_eq!(balance(&eco, 1).await?, 160);

        let logs = ledger::recent_logs(&eco.db, 1, 10).await?;
        let kinds: Vec<_> = logs.iter().map(|l| l.transaction_type.as_str()).collect();
        assert_eq!(kinds, vec!["daily_bonus", "daily"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_moves_amount_and_tax() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 2_000).await?;

        let t = transfer(&eco, 1, 2, 1_000).await?;
        assert_eq!(t.tax, 50);
        assert_eq!(t.sender_balance, 950);
        assert_eq!(t.recipient_balance, 1_000);
        assert_eq!(public_bank::stats(&eco.db).await?.balance, 50);

        // cooldown on the sender
        let again = transfer(&eco, 1, 2, 10).await;
        assert!(matches!(again, Err(Error::OnCooldown { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_rules() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 100).await?;

        assert!(matches!(transfer(&eco, 1, 1, 10).await, Err(Error::Rule { .. })));
        assert!(matches!(transfer(&eco, 1, 2, 0).await, Err(Error::InvalidAmount { .. })));
        assert!(matches!(
            transfer(&eco, 1, 2, 100_001).await,
            Err(Error::InvalidAmount { .. })
        ));

        // 100 + 5 tax does not fit in 100
        let result = transfer(&eco, 1, 2, 100).await;
        assert!(matches!(
            result,
            Err(Error::InsufficientFunds {
                current: 100,
                required: 105
            })
        ));
        assert_eq!(balance(&eco, 2).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_leaderboard_order_and_cap() -> Result<()> {
        let eco = setup_economy().await?;
        for (user, amount) in [(1, 10), (2, 300), (3, 50)] {
            fund(&eco.db, user, amount).await?;
        }
        ledger::ensure_user(&eco.db, 4).await?;

        let top = leaderboard(&eco, 100).await?;
        let ids: Vec<i64> = top.iter().map(|u| u.user_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        assert_eq!(leaderboard(&eco, 2).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_admin_add_remove() -> Result<()> {
        let eco = setup_economy().await?;
        assert_eq!(admin_add(&eco, 1, 500).await?, 500);
        assert_eq!(admin_remove(&eco, 1, 200).await?, 300);
        assert_eq!(admin_remove(&eco, 1, 1_000).await?, 0);
        assert!(admin_add(&eco, 1, 0).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_economy() -> Result<()> {
        let eco = setup_economy().await?;
        daily(&eco, 1, roll(100, None)).await?;
        public_bank::credit(&eco.db, 500, "test").await?;

        reset_economy(&eco).await?;

        assert_eq!(balance(&eco, 1).await?, 0);
        assert!(ledger::recent_logs(&eco.db, 1, 10).await?.is_empty());
        assert_eq!(public_bank::stats(&eco.db).await?.balance, 0);
        // daily is available again
        daily(&eco, 1, roll(50, None)).await?;
        Ok(())
    }
}

//! Bank heists: stake a target amount on a 1-100 roll.
//!
//! The odds grow with the robber's wallet and shrink with the size of the target. Winnings
//! are minted; losses are taken from the wallet (never below zero) and paid into the public
//! bank. Attempts are limited per UTC day on top of the cooldown.

use crate::{
    config::economy::HeistConfig,
    core::{
        Economy,
        cooldown::{self, CooldownKind},
        fraction_of,
        ledger::{self, Posting, TransactionKind},
        public_bank,
    },
    entities::{HeistRecord, heist_record},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use rand::Rng;
use sea_orm::{QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{info, instrument};

/// How a heist ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum HeistOutcome {
    CriticalSuccess,
    Success,
    Failure,
    CriticalFailure,
}

impl HeistOutcome {
    /// Whether the robber got away with money.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::CriticalSuccess | Self::Success)
    }

    /// Payout or penalty multiplier applied to the target.
    #[must_use]
    pub const fn multiplier(self, cfg: &HeistConfig) -> f64 {
        match self {
            Self::CriticalSuccess => cfg.critical_success_multiplier,
            Self::Success => cfg.success_multiplier,
            Self::Failure => cfg.failure_penalty_rate,
            Self::CriticalFailure => cfg.critical_failure_penalty_rate,
        }
    }
}

/// Result of a heist
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeistResult {
    #[allow(missing_docs)]
    pub outcome: HeistOutcome,
    /// Success chance the roll was compared against, in percent
    pub chance: f64,
    /// PrissBucks won
    pub won: i64,
    /// PrissBucks actually lost
    pub lost: i64,
    /// Wallet afterwards
    pub balance: i64,
    /// Attempts used today, this one included
    pub attempts_today: i32,
}

impl HeistResult {
    /// Wallet change, positive on a win.
    #[must_use]
    pub const fn net(&self) -> i64 {
        self.won - self.lost
    }
}

/// A player's heist availability and history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeistStatus {
    /// Seconds until the next heist, if cooling down
    pub cooldown_secs: Option<i64>,
    /// Attempts used today
    pub attempts_today: i32,
    /// Attempts allowed per day
    pub max_daily: i32,
    /// Lifetime counters, once the player has attempted a heist
    pub record: Option<heist_record::Model>,
}

impl HeistStatus {
    /// Whether a heist can be attempted right now.
    #[must_use]
    pub const fn can_attempt(&self) -> bool {
        self.cooldown_secs.is_none() && self.attempts_today < self.max_daily
    }
}

/// Server-wide heist counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub struct HeistTotals {
    pub players: i64,
    pub heists: i64,
    pub successes: i64,
    pub won: i64,
    pub lost: i64,
}

/// Rolls 1-100 with the thread RNG.
#[must_use]
pub fn roll() -> i64 {
    rand::thread_rng().gen_range(1..=100)
}

/// Success chance in percent for a target `amount` with `balance` in the wallet.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn success_chance(cfg: &HeistConfig, balance: i64, amount: i64) -> f64 {
    let wealth = (balance as f64 / cfg.wealth_reference.max(1) as f64).min(cfg.max_wealth_factor);
    let difficulty = (amount as f64 / cfg.difficulty_amount.max(1) as f64).min(1.0);
    cfg.success_base_rate * wealth * difficulty.mul_add(-cfg.difficulty_weight, 1.0)
}

/// Maps a 1-100 roll to an outcome. The top `critical_failure_rate` rolls always fail hard;
/// a successful roll at or below `critical_success_rate` is a critical success.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn resolve(cfg: &HeistConfig, chance: f64, roll: i64) -> HeistOutcome {
    if roll > 100 - cfg.critical_failure_rate {
        HeistOutcome::CriticalFailure
    } else if (roll as f64) <= chance {
        if roll <= cfg.critical_success_rate {
            HeistOutcome::CriticalSuccess
        } else {
            HeistOutcome::Success
        }
    } else {
        HeistOutcome::Failure
    }
}

fn attempts_on(record: &heist_record::Model, now: DateTime<Utc>) -> i32 {
    if record.window_start.date_naive() == now.date_naive() {
        record.attempts_today
    } else {
        0
    }
}

async fn lock_record<C>(conn: &C, user_id: i64, now: DateTime<Utc>) -> Result<heist_record::Model>
where
    C: ConnectionTrait,
{
    if let Some(record) = HeistRecord::find_by_id(user_id)
        .lock_exclusive()
        .one(conn)
        .await?
    {
        return Ok(record);
    }

    heist_record::ActiveModel {
        user_id: Set(user_id),
        attempts_today: Set(0),
        window_start: Set(now),
        total_heists: Set(0),
        successes: Set(0),
        total_won: Set(0),
        total_lost: Set(0),
        last_heist_at: Set(None),
    }
    .insert(conn)
    .await
    .map_err(Into::into)
}

/// Attempts a heist on `amount` with a pre-rolled 1-100 `roll`.
#[instrument(skip(eco))]
pub async fn attempt(eco: &Economy, user_id: i64, amount: i64, roll: i64) -> Result<HeistResult> {
    let cfg = &eco.config.heist;
    if !(cfg.min_amount..=cfg.max_amount).contains(&amount) {
        return Err(Error::InvalidAmount { amount });
    }

    let _locks = eco.locks.acquire(&[user_id]).await;
    let now = Utc::now();
    let txn = eco.db.begin().await?;

    cooldown::ensure_ready(&txn, user_id, CooldownKind::Heist, now).await?;
    let record = lock_record(&txn, user_id, now).await?;
    let attempts_today = attempts_on(&record, now);
    if attempts_today >= cfg.max_daily {
        return Err(Error::LimitExceeded {
            message: format!(
                "You already attempted {attempts_today}/{} heists today",
                cfg.max_daily
            ),
        });
    }

    let wallet = ledger::lock_user(&txn, user_id).await?;
    if wallet.balance < cfg.min_balance {
        return Err(Error::InsufficientFunds {
            current: wallet.balance,
            required: cfg.min_balance,
        });
    }

    let chance = success_chance(cfg, wallet.balance, amount);
    let outcome = resolve(cfg, chance, roll);
    let stake = fraction_of(amount, outcome.multiplier(cfg));

    let (won, lost, balance) = if outcome.is_success() {
        let change = ledger::post(
            &txn,
            Posting::credit(user_id, stake, TransactionKind::HeistWin, "Bank heist loot"),
        )
        .await?;
        (stake, 0, change.after)
    } else {
        let change = ledger::post(
            &txn,
            Posting::debit(user_id, stake, TransactionKind::HeistLoss, "Failed bank heist")
                .clamped(),
        )
        .await?;
        let lost = -change.applied();
        public_bank::credit(&txn, lost, "heist_loss").await?;
        (0, lost, change.after)
    };

    let attempts_today = attempts_today + 1;
    heist_record::ActiveModel {
        attempts_today: Set(attempts_today),
        window_start: Set(now),
        total_heists: Set(record.total_heists + 1),
        successes: Set(record.successes + i64::from(outcome.is_success())),
        total_won: Set(record.total_won + won),
        total_lost: Set(record.total_lost + lost),
        last_heist_at: Set(Some(now)),
        ..record.into()
    }
    .update(&txn)
    .await?;

    cooldown::start(&txn, user_id, CooldownKind::Heist, cfg.cooldown_secs, now).await?;
    txn.commit().await?;

    info!(user_id, amount, roll, chance, ?outcome, won, lost, "bank heist");
    Ok(HeistResult {
        outcome,
        chance,
        won,
        lost,
        balance,
        attempts_today,
    })
}

/// Cooldown, attempts left today and lifetime counters of a player.
pub async fn status(eco: &Economy, user_id: i64, now: DateTime<Utc>) -> Result<HeistStatus> {
    let record = HeistRecord::find_by_id(user_id).one(&eco.db).await?;
    Ok(HeistStatus {
        cooldown_secs: cooldown::remaining(&eco.db, user_id, CooldownKind::Heist, now).await?,
        attempts_today: record.as_ref().map_or(0, |r| attempts_on(r, now)),
        max_daily: eco.config.heist.max_daily,
        record,
    })
}

/// Counters summed over every player.
pub async fn totals(eco: &Economy) -> Result<HeistTotals> {
    let records = HeistRecord::find().all(&eco.db).await?;
    Ok(records
        .iter()
        .fold(HeistTotals::default(), |acc, r| HeistTotals {
            players: acc.players + 1,
            heists: acc.heists + r.total_heists,
            successes: acc.successes + r.successes,
            won: acc.won + r.total_won,
            lost: acc.lost + r.total_lost,
        }))
}

/// Clears a player's heist cooldown and today's attempts (admin).
#[instrument(skip(eco))]
pub async fn reset_player(eco: &Economy, user_id: i64) -> Result<()> {
    let txn = eco.db.begin().await?;
    cooldown::clear(&txn, user_id, CooldownKind::Heist).await?;
    HeistRecord::update_many()
        .col_expr(heist_record::Column::AttemptsToday, Expr::value(0))
        .filter(heist_record::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    txn.commit().await?;
    info!(user_id, "heist limits reset");
    Ok(())
}

/// Deletes every heist record (economy reset).
pub async fn reset_all<C>(conn: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    HeistRecord::delete_many().exec(conn).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use chrono::Duration;

    #[test]
    fn test_success_chance() {
        let cfg = HeistConfig::default();
        assert!((success_chance(&cfg, 50_000, 10_000) - 28.0).abs() < 1e-9);
        // wealth bonus is capped, small targets are not penalised much
        assert!((success_chance(&cfg, 1_000_000, 100) - 47.856).abs() < 1e-9);
        assert_eq!(success_chance(&cfg, 0, 100), 0.0);
    }

    #[test]
    fn test_resolve_bands() {
        let cfg = HeistConfig::default();
        assert_eq!(resolve(&cfg, 28.0, 1), HeistOutcome::CriticalSuccess);
        assert_eq!(resolve(&cfg, 28.0, 5), HeistOutcome::CriticalSuccess);
        assert_eq!(resolve(&cfg, 28.0, 6), HeistOutcome::Success);
        assert_eq!(resolve(&cfg, 28.0, 28), HeistOutcome::Success);
        assert_eq!(resolve(&cfg, 28.0, 29), HeistOutcome::Failure);
        assert_eq!(resolve(&cfg, 28.0, 90), HeistOutcome::Failure);
        assert_eq!(resolve(&cfg, 28.0, 91), HeistOutcome::CriticalFailure);
        // a tiny chance never turns a low roll into a win
        assert_eq!(resolve(&cfg, 0.5, 1), HeistOutcome::Failure);
    }

    #[tokio::test]
    async fn test_successful_heist_mints_loot() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 50_000).await?;

        let result = attempt(&eco, 1, 10_000, 20).await?;
        assert_eq!(result.outcome, HeistOutcome::Success);
        assert_eq!(result.won, 15_000);
        assert_eq!(result.balance, 65_000);
        assert_eq!(result.attempts_today, 1);
        assert_eq!(public_bank::stats(&eco.db).await?.balance, 0);

        let again = attempt(&eco, 1, 10_000, 20).await;
        assert!(matches!(again, Err(Error::OnCooldown { .. })));

        let status = status(&eco, 1, Utc::now()).await?;
        assert!(!status.can_attempt());
        let record = status.record.unwrap();
        assert_eq!((record.total_heists, record.successes, record.total_won), (1, 1, 15_000));
        Ok(())
    }

    #[tokio::test]
    async fn test_critical_success_triples() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 50_000).await?;

        let result = attempt(&eco, 1, 1_000, 3).await?;
        assert_eq!(result.outcome, HeistOutcome::CriticalSuccess);
        assert_eq!(result.net(), 3_000);
        Ok(())
    }

    #[tokio::test]
    async fn test_critical_failure_clamped_into_public_bank() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 1_000).await?;

        let result = attempt(&eco, 1, 1_000, 100).await?;
        assert_eq!(result.outcome, HeistOutcome::CriticalFailure);
        // 1.2x the target, but only the wallet can be taken
        assert_eq!(result.lost, 1_000);
        assert_eq!(result.balance, 0);
        assert_eq!(public_bank::stats(&eco.db).await?.balance, 1_000);
        Ok(())
    }

    #[tokio::test]
    async fn test_entry_requirements() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 499).await?;

        assert!(matches!(attempt(&eco, 1, 99, 50).await, Err(Error::InvalidAmount { .. })));
        assert!(matches!(attempt(&eco, 1, 50_001, 50).await, Err(Error::InvalidAmount { .. })));
        assert!(matches!(
            attempt(&eco, 1, 100, 50).await,
            Err(Error::InsufficientFunds { current: 499, required: 500 })
        ));
        // a refused heist does not start the cooldown
        assert_eq!(status(&eco, 1, Utc::now()).await?.cooldown_secs, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_daily_limit_and_reset() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 10_000).await?;
        let now = Utc::now();

        heist_record::ActiveModel {
            user_id: Set(1),
            attempts_today: Set(5),
            window_start: Set(now),
            total_heists: Set(5),
            successes: Set(0),
            total_won: Set(0),
            total_lost: Set(0),
            last_heist_at: Set(Some(now)),
        }
        .insert(&eco.db)
        .await?;
        assert!(matches!(attempt(&eco, 1, 100, 50).await, Err(Error::LimitExceeded { .. })));

        reset_player(&eco, 1).await?;
        let result = attempt(&eco, 1, 100, 50).await?;
        assert_eq!(result.attempts_today, 1);
        assert_eq!(result.outcome, HeistOutcome::Failure);
        assert_eq!(result.lost, 70);

        // yesterday's attempts do not count
        let mut active: heist_record::ActiveModel =
            HeistRecord::find_by_id(1).one(&eco.db).await?.unwrap().into();
        active.attempts_today = Set(5);
        active.window_start = Set(now - Duration::days(1));
        active.update(&eco.db).await?;
        cooldown::clear(&eco.db, 1, CooldownKind::Heist).await?;
        assert_eq!(attempt(&eco, 1, 100, 50).await?.attempts_today, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_totals() -> Result<()> {
        let eco = setup_economy().await?;
        assert_eq!(totals(&eco).await?, HeistTotals::default());

        fund(&eco.db, 1, 50_000).await?;
        fund(&eco.db, 2, 1_000).await?;
        attempt(&eco, 1, 10_000, 20).await?;
        attempt(&eco, 2, 100, 50).await?;

        let totals = totals(&eco).await?;
        assert_eq!(totals.players, 2);
        assert_eq!(totals.heists, 2);
        assert_eq!(totals.successes, 1);
        assert_eq!(totals.won, 15_000);
        assert_eq!(totals.lost, 70);
        Ok(())
    }
}

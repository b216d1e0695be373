//! Persistent per-user cooldowns.
//!
//! Cooldowns live in the `cooldowns` table so they survive restarts. A row whose `expires_at`
//! is in the past is ignored and simply overwritten by the next [`start`].

use crate::{
    core::{Economy, ledger},
    entities::{Cooldown, cooldown},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::OnConflict};

/// Actions guarded by a cooldown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum CooldownKind {
    Transfer,
    Roulette,
    Rps,
    Steal,
    PublicBankWithdraw,
    MessageReward,
    Heist,
}

impl CooldownKind {
    /// Value stored in `cooldowns.cooldown_type`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Roulette => "roulette",
            Self::Rps => "rps",
            Self::Steal => "steal",
            Self::PublicBankWithdraw => "public_bank_withdraw",
            Self::MessageReward => "message_reward",
            Self::Heist => "heist",
        }
    }

    /// Name shown to players.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Transfer => "Transfer",
            Self::Roulette => "Roulette",
            Self::Rps => "Rock-paper-scissors",
            Self::Steal => "Steal",
            Self::PublicBankWithdraw => "Public bank withdrawal",
            Self::MessageReward => "Message reward",
            Self::Heist => "Bank heist",
        }
    }

    /// Every kind, in display order.
    pub const ALL: [Self; 7] = [
        Self::Transfer,
        Self::Roulette,
        Self::Rps,
        Self::Steal,
        Self::Heist,
        Self::PublicBankWithdraw,
        Self::MessageReward,
    ];

    fn from_stored(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

/// A running cooldown, as listed by [`overview`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveCooldown {
    /// Display name of the action
    pub action: &'static str,
    #[allow(missing_docs)]
    pub remaining_secs: i64,
}

/// Seconds left on a cooldown, or `None` when the action is available.
pub async fn remaining<C>(
    conn: &C,
    user_id: i64,
    kind: CooldownKind,
    now: DateTime<Utc>,
) -> Result<Option<i64>>
where
    C: ConnectionTrait,
{
    let row = Cooldown::find_by_id((user_id, kind.as_str().to_string()))
        .one(conn)
        .await?;

    Ok(row.and_then(|r| seconds_left(r.expires_at, now)))
}

/// Whole seconds until `expires_at`, rounded up so a partly elapsed second still counts.
pub(crate) fn seconds_left(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<i64> {
    let millis = (expires_at - now).num_milliseconds();
    (millis > 0).then(|| (millis + 999) / 1_000)
}

/// Fails with [`Error::OnCooldown`] while the cooldown runs.
pub async fn ensure_ready<C>(
    conn: &C,
    user_id: i64,
    kind: CooldownKind,
    now: DateTime<Utc>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    match remaining(conn, user_id, kind, now).await? {
        Some(remaining_secs) => Err(Error::OnCooldown { remaining_secs }),
        None => Ok(()),
    }
}

/// Starts (or restarts) a cooldown of `secs` seconds.
pub async fn start<C>(
    conn: &C,
    user_id: i64,
    kind: CooldownKind,
    secs: i64,
    now: DateTime<Utc>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    if secs <= 0 {
        return Ok(());
    }

    let row = cooldown::ActiveModel {
        user_id: Set(user_id),
        cooldown_type: Set(kind.as_str().to_string()),
        last_used: Set(now),
        expires_at: Set(now + Duration::seconds(secs)),
    };

    Cooldown::insert(row)
        .on_conflict(
            OnConflict::columns([cooldown::Column::UserId, cooldown::Column::CooldownType])
                .update_columns([cooldown::Column::LastUsed, cooldown::Column::ExpiresAt])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    Ok(())
}

/// Every cooldown still running for a user, daily reward included, shortest first.
pub async fn overview(
    eco: &Economy,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<ActiveCooldown>> {
    let wallet = ledger::ensure_user(&eco.db, user_id).await?;
    let daily = wallet
        .last_daily
        .map(|last| last + Duration::seconds(eco.config.daily.cooldown_secs))
        .and_then(|ready_at| seconds_left(ready_at, now))
        .map(|remaining_secs| ActiveCooldown {
            action: "Daily reward",
            remaining_secs,
        });

    let rows = Cooldown::find()
        .filter(cooldown::Column::UserId.eq(user_id))
        .filter(cooldown::Column::ExpiresAt.gt(now))
        .order_by_asc(cooldown::Column::ExpiresAt)
        .all(&eco.db)
        .await?;

    let mut active: Vec<ActiveCooldown> = rows
        .into_iter()
        .filter_map(|row| {
            let kind = CooldownKind::from_stored(&row.cooldown_type)?;
            Some(ActiveCooldown {
                action: kind.label(),
                remaining_secs: seconds_left(row.expires_at, now)?,
            })
        })
        .chain(daily)
        .collect();
    active.sort_by_key(|c| c.remaining_secs);
    Ok(active)
}

/// Cancels one cooldown. Returns whether one was running.
pub async fn clear<C>(conn: &C, user_id: i64, kind: CooldownKind) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = Cooldown::delete_by_id((user_id, kind.as_str().to_string()))
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Removes every cooldown (economy reset).
pub async fn clear_all<C>(conn: &C) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = Cooldown::delete_many().exec(conn).await?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_cooldown_lifecycle() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();

        assert_eq!(remaining(&db, 1, CooldownKind::Steal, now).await?, None);

        start(&db, 1, CooldownKind::Steal, 60, now).await?;
        let left = remaining(&db, 1, CooldownKind::Steal, now).await?;
        assert_eq!(left, Some(60));

        let result = ensure_ready(&db, 1, CooldownKind::Steal, now).await;
        assert!(matches!(result, Err(Error::OnCooldown { remaining_secs: 60 })));

        // other kinds and users are unaffected
        ensure_ready(&db, 1, CooldownKind::Roulette, now).await?;
        ensure_ready(&db, 2, CooldownKind::Steal, now).await?;

        let later = now + Duration::seconds(61);
        ensure_ready(&db, 1, CooldownKind::Steal, later).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_partial_second_still_blocks() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();

        start(&db, 1, CooldownKind::Steal, 1, now).await?;
        let almost = now + Duration::milliseconds(100);
        assert_eq!(remaining(&db, 1, CooldownKind::Steal, almost).await?, Some(1));
        assert!(ensure_ready(&db, 1, CooldownKind::Steal, almost).await.is_err());

        let expired = now + Duration::seconds(1);
        assert_eq!(remaining(&db, 1, CooldownKind::Steal, expired).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_restart_overwrites_expiry() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();

        start(&db, 1, CooldownKind::Rps, 10, now).await?;
        start(&db, 1, CooldownKind::Rps, 100, now).await?;
        assert_eq!(remaining(&db, 1, CooldownKind::Rps, now).await?, Some(100));

        assert!(clear(&db, 1, CooldownKind::Rps).await?);
        assert!(!clear(&db, 1, CooldownKind::Rps).await?);
        start(&db, 1, CooldownKind::Rps, 100, now).await?;
        assert_eq!(clear_all(&db).await?, 1);
        assert_eq!(remaining(&db, 1, CooldownKind::Rps, now).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_overview_lists_running_cooldowns() -> Result<()> {
        let eco = setup_economy().await?;
        let now = Utc::now();
        assert!(overview(&eco, 1, now).await?.is_empty());

        start(&eco.db, 1, CooldownKind::Heist, 7_200, now).await?;
        start(&eco.db, 1, CooldownKind::Roulette, 4, now).await?;
        start(&eco.db, 1, CooldownKind::Transfer, 5, now - Duration::seconds(10)).await?;
        start(&eco.db, 2, CooldownKind::Steal, 60, now).await?;
        crate::core::economy::daily(
            &eco,
            1,
            crate::core::economy::DailyRoll {
                base: 100,
                bonus: None,
            },
        )
        .await?;

        let listed = overview(&eco, 1, now).await?;
        let actions: Vec<&str> = listed.iter().map(|c| c.action).collect();
        assert_eq!(actions, ["Roulette", "Bank heist", "Daily reward"]);
        assert_eq!(listed[0].remaining_secs, 4);
        assert!(listed[2].remaining_secs > 86_000);
        Ok(())
    }
}

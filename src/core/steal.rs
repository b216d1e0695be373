//! Stealing from other players' wallets.
//!
//! Bank balances are safe; only the wallet is exposed. A purchased defense blocks one attempt.
//! Blocked and failed thieves pay their fine to the public bank.

use crate::{
    core::{
        Economy,
        cooldown::{self, CooldownKind},
        fraction_of,
        ledger::{self, Posting, TransactionKind},
        public_bank,
    },
    entities::{User, user},
    errors::{Error, Result},
};
use chrono::Utc;
use rand::Rng;
use sea_orm::{TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{info, instrument};

/// How an attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StealOutcome {
    /// The target's defense stopped the thief, who paid a fine to the public bank
    Blocked {
        /// Fine actually paid
        fine: i64,
    },
    /// PrissBucks moved from the target to the thief
    Success {
        /// Amount stolen
        amount: i64,
    },
    /// The thief was caught and fined into the public bank
    Failed {
        /// Penalty actually paid
        penalty: i64,
    },
}

/// Result of an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StealResult {
    #[allow(missing_docs)]
    pub outcome: StealOutcome,
    /// Thief wallet afterwards
    pub thief_balance: i64,
    /// Target wallet afterwards
    pub target_balance: i64,
}

/// Rolls whether an attempt succeeds.
#[must_use]
pub fn roll_success(success_rate: f64) -> bool {
    rand::thread_rng().gen_bool(success_rate.clamp(0.0, 1.0))
}

/// Tries to steal from `target_id`. `success` is the pre-rolled attempt result; it is ignored
/// when the target is defended.
#[instrument(skip(eco))]
pub async fn attempt(
    eco: &Economy,
    thief_id: i64,
    target_id: i64,
    success: bool,
) -> Result<StealResult> {
    let cfg = &eco.config.steal;
    if thief_id == target_id {
        return Err(Error::rule("You cannot steal from yourself"));
    }

    let _locks = eco.locks.acquire(&[thief_id, target_id]).await;
    let now = Utc::now();
    let txn = eco.db.begin().await?;

    cooldown::ensure_ready(&txn, thief_id, CooldownKind::Steal, now).await?;
    let thief = ledger::lock_user(&txn, thief_id).await?;
    let target = ledger::lock_user(&txn, target_id).await?;
    if target.balance <= 0 {
        return Err(Error::rule("Their wallet is empty"));
    }

    let stake = fraction_of(target.balance, cfg.steal_fraction).max(1);
    let (outcome, thief_balance, target_balance) = if target.has_defense {
        User::update_many()
            .col_expr(user::Column::HasDefense, Expr::value(false))
            .filter(user::Column::UserId.eq(target_id))
            .exec(&txn)
            .await?;

        let fine = fraction_of(stake, cfg.fail_penalty_fraction).max(1);
        let change = ledger::post(
            &txn,
            Posting::debit(thief_id, fine, TransactionKind::StealBlocked, "Stopped by a defense")
                .with_related(target_id)
                .clamped(),
        )
        .await?;
        let fine = -change.applied();
        public_bank::credit(&txn, fine, "steal_blocked").await?;
        (StealOutcome::Blocked { fine }, change.after, target.balance)
    } else if success {
        let lost = ledger::post(
            &txn,
            Posting::debit(target_id, stake, TransactionKind::StealLoss, "Robbed")
                .with_related(thief_id),
        )
        .await?;
        let gained = ledger::post(
            &txn,
            Posting::credit(thief_id, stake, TransactionKind::StealSuccess, "Successful theft")
                .with_related(target_id),
        )
        .await?;
        (StealOutcome::Success { amount: stake }, gained.after, lost.after)
    } else {
        let penalty = fraction_of(stake, cfg.fail_penalty_fraction).max(1);
        let paid = ledger::post(
            &txn,
            Posting::debit(thief_id, penalty, TransactionKind::StealFail, "Caught stealing")
                .with_related(target_id)
                .clamped(),
        )
        .await?;
        let penalty = -paid.applied();
        public_bank::credit(&txn, penalty, "steal_fail").await?;
        (StealOutcome::Failed { penalty }, paid.after, target.balance)
    };

    cooldown::start(&txn, thief_id, CooldownKind::Steal, cfg.cooldown_secs, now).await?;
    txn.commit().await?;
    info!(thief_id, target_id, ?outcome, before = thief.balance, "steal attempt");

    Ok(StealResult {
        outcome,
        thief_balance,
        target_balance,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    async fn give_defense(eco: &Economy, user_id: i64) -> Result<()> {
        User::update_many()
            .col_expr(user::Column::HasDefense, Expr::value(true))
            .filter(user::Column::UserId.eq(user_id))
            .exec(&eco.db)
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_successful_steal() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 2, 1_000).await?;

        let result = attempt(&eco, 1, 2, true).await?;
        assert_eq!(result.outcome, StealOutcome::Success { amount: 250 });
        assert_eq!(result.thief_balance, 250);
        assert_eq!(result.target_balance, 750);

        let again = attempt(&eco, 1, 2, true).await;
        assert!(matches!(again, Err(Error::OnCooldown { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_steal_fines_into_public_bank() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 1_000).await?;
        fund(&eco.db, 2, 1_000).await?;

        let result = attempt(&eco, 1, 2, false).await?;
        assert_eq!(result.outcome, StealOutcome::Failed { penalty: 125 });
        assert_eq!(result.thief_balance, 875);
        assert_eq!(result.target_balance, 1_000);
        assert_eq!(ledger::balance_of(&eco.db, 2).await?, 1_000);
        assert_eq!(public_bank::stats(&eco.db).await?.balance, 125);
        Ok(())
    }

    #[tokio::test]
    async fn test_penalty_clamped_to_thief_wallet() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 40).await?;
        fund(&eco.db, 2, 1_000).await?;

        let result = attempt(&eco, 1, 2, false).await?;
        assert_eq!(result.outcome, StealOutcome::Failed { penalty: 40 });
        assert_eq!(result.thief_balance, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_defense_blocks_once() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 1_000).await?;
        fund(&eco.db, 2, 1_000).await?;
        give_defense(&eco, 2).await?;

        let result = attempt(&eco, 1, 2, true).await?;
        assert_eq!(result.outcome, StealOutcome::Blocked { fine: 125 });
        assert_eq!(result.target_balance, 1_000);
        assert_eq!(public_bank::stats(&eco.db).await?.balance, 125);
        assert!(!ledger::ensure_user(&eco.db, 2).await?.has_defense);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_targets() -> Result<()> {
        let eco = setup_economy().await?;
        assert!(matches!(attempt(&eco, 1, 1, true).await, Err(Error::Rule { .. })));
        assert!(matches!(attempt(&eco, 1, 2, true).await, Err(Error::Rule { .. })));
        Ok(())
    }
}

//! Passive rewards for chatting: a little PB, debt auto-repayment and XP.

use crate::{
    config::economy::RewardConfig,
    core::{
        Economy, clan,
        cooldown::{self, CooldownKind},
        debt, fraction_of,
        ledger::{self, Posting, TransactionKind},
        xp::{self, XpGain},
    },
    errors::Result,
};
use chrono::Utc;
use sea_orm::TransactionTrait;
use tracing::debug;

/// What a message earned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageReward {
    /// PrissBucks credited (0 while the PB cooldown runs)
    pub pb: i64,
    /// PrissBucks taken back towards public bank debt
    pub debt_repaid: i64,
    /// XP awarded, if the XP cooldown allowed it
    pub xp: Option<XpGain>,
}

/// Whether a message qualifies for rewards.
#[must_use]
pub fn is_rewardable(
    author_is_bot: bool,
    in_guild: bool,
    content: &str,
    prefix: &str,
    cfg: &RewardConfig,
) -> bool {
    let content = content.trim();
    !author_is_bot
        && in_guild
        && !(!prefix.is_empty() && content.starts_with(prefix))
        && content.chars().count() >= cfg.min_length
}

/// PB per message after the clan boost, at least 1.
#[must_use]
pub fn boosted_pb(base: i64, multiplier: f64) -> i64 {
    fraction_of(base, multiplier).max(1)
}

/// Rewards a qualifying message. Returns `None` when both cooldowns are still running.
pub async fn reward_message(eco: &Economy, user_id: i64) -> Result<Option<MessageReward>> {
    let cfg = &eco.config;
    let _locks = eco.locks.acquire(&[user_id]).await;
    let now = Utc::now();
    let txn = eco.db.begin().await?;

    let mut reward = MessageReward::default();
    let pb_ready = cooldown::remaining(&txn, user_id, CooldownKind::MessageReward, now)
        .await?
        .is_none();

    if pb_ready {
        let multiplier = clan::boost_multiplier_for(&txn, user_id).await?;
        let pb = boosted_pb(cfg.rewards.pb_per_message, multiplier);
        ledger::post(
            &txn,
            Posting::credit(user_id, pb, TransactionKind::MessageReward, "Chat reward"),
        )
        .await?;
        cooldown::start(
            &txn,
            user_id,
            CooldownKind::MessageReward,
            cfg.rewards.cooldown_secs,
            now,
        )
        .await?;

        reward.pb = pb;
        reward.debt_repaid = debt::auto_repay(&txn, &cfg.debt, user_id).await?;
    }

    reward.xp = xp::award_message_xp(&txn, &cfg.xp, user_id, now).await?;
    txn.commit().await?;

    if !pb_ready && reward.xp.is_none() {
        return Ok(None);
    }
    debug!(user_id, ?reward, "message rewarded");
    Ok(Some(reward))
}

//! Experience, levels and XP boost tiers.
//!
//! Levels follow a geometric curve: level 1 needs `base_requirement` XP to leave, and every
//! following level needs `requirement_growth` times more (rounded down).

use crate::{
    config::economy::XpConfig,
    core::Economy,
    entities::{UserXp, user_xp},
    errors::Result,
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{PaginatorTrait, QueryOrder, QuerySelect, Set, prelude::*, sea_query::OnConflict};
use std::{fmt, str::FromStr};

/// XP boost tiers sold as shop roles, from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[allow(missing_docs, clippy::upper_case_acronyms)]
pub enum BoostTier {
    E,
    D,
    C,
    B,
    A,
    S,
    SS,
    SSS,
}

impl BoostTier {
    /// All tiers in ascending order.
    pub const ALL: [Self; 8] = [
        Self::E,
        Self::D,
        Self::C,
        Self::B,
        Self::A,
        Self::S,
        Self::SS,
        Self::SSS,
    ];

    /// Extra XP fraction granted by the tier.
    #[must_use]
    pub const fn boost(self) -> f64 {
        match self {
            Self::E => 0.05,
            Self::D => 0.10,
            Self::C => 0.20,
            Self::B => 0.35,
            Self::A => 0.50,
            Self::S => 0.75,
            Self::SS => 0.90,
            Self::SSS => 1.0,
        }
    }

    /// Suggested shop price of the tier role.
    #[must_use]
    pub const fn suggested_price(self) -> i64 {
        match self {
            Self::E => 1_000,
            Self::D => 2_000,
            Self::C => 3_500,
            Self::B => 5_000,
            Self::A => 7_500,
            Self::S => 10_000,
            Self::SS => 15_000,
            Self::SSS => 20_000,
        }
    }

    /// Stored name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::E => "E",
            Self::D => "D",
            Self::C => "C",
            Self::B => "B",
            Self::A => "A",
            Self::S => "S",
            Self::SS => "SS",
            Self::SSS => "SSS",
        }
    }
}

impl fmt::Display for BoostTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoostTier {
    type Err = crate::errors::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| crate::errors::Error::rule(format!("Unknown XP tier `{s}`")))
    }
}

/// Where a total XP amount sits on the level curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelProgress {
    /// Current level, starting at 1
    pub level: i32,
    /// XP earned inside the current level
    pub xp_into_level: i64,
    /// XP the current level requires to reach the next
    pub xp_for_next: i64,
}

/// Computes the level reached with `total_xp`.
#[must_use]
pub fn compute_level(total_xp: i64, cfg: &XpConfig) -> LevelProgress {
    let mut level = 1;
    let mut remaining = total_xp.max(0);
    let mut requirement = cfg.base_requirement.max(1);

    while remaining >= requirement {
        remaining -= requirement;
        level += 1;
        requirement = super::fraction_of(requirement, cfg.requirement_growth).max(requirement);
    }

    LevelProgress {
        level,
        xp_into_level: remaining,
        xp_for_next: requirement,
    }
}

/// Message XP after the tier boost, rounded down.
#[must_use]
pub fn boosted_xp(base: i64, tier: Option<BoostTier>) -> i64 {
    tier.map_or(base, |t| super::fraction_of(base, 1.0 + t.boost()))
}

/// XP awarded for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XpGain {
    /// XP added
    pub gained: i64,
    /// Lifetime XP afterwards
    pub total_xp: i64,
    /// Level afterwards
    pub level: i32,
    /// Whether the message crossed a level boundary
    pub leveled_up: bool,
}

async fn ensure_row<C>(conn: &C, user_id: i64) -> Result<user_xp::Model>
where
    C: ConnectionTrait,
{
    UserXp::insert(user_xp::ActiveModel {
        user_id: Set(user_id),
        total_xp: Set(0),
        level: Set(1),
        boost_tier: Set(None),
        last_message_at: Set(None),
    })
    .on_conflict(
        OnConflict::column(user_xp::Column::UserId)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    UserXp::find_by_id(user_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| crate::errors::Error::not_found("XP profile"))
}

/// Awards message XP unless the XP cooldown is still running (then returns `None`).
pub async fn award_message_xp<C>(
    conn: &C,
    cfg: &XpConfig,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<Option<XpGain>>
where
    C: ConnectionTrait,
{
    let row = ensure_row(conn, user_id).await?;
    if row
        .last_message_at
        .is_some_and(|last| now - last < Duration::seconds(cfg.cooldown_secs))
    {
        return Ok(None);
    }

    let tier = row.boost_tier.as_deref().and_then(|t| t.parse().ok());
    let gained = boosted_xp(cfg.per_message, tier);
    let total_xp = row.total_xp + gained;
    let level = compute_level(total_xp, cfg).level;
    let leveled_up = level > row.level;

    let mut active: user_xp::ActiveModel = row.into();
    active.total_xp = Set(total_xp);
    active.level = Set(level);
    active.last_message_at = Set(Some(now));
    active.update(conn).await?;

    Ok(Some(XpGain {
        gained,
        total_xp,
        level,
        leveled_up,
    }))
}

/// Grants a boost tier, keeping the strongest one owned.
pub async fn grant_boost_tier<C>(conn: &C, user_id: i64, tier: BoostTier) -> Result<BoostTier>
where
    C: ConnectionTrait,
{
    let row = ensure_row(conn, user_id).await?;
    let current: Option<BoostTier> = row.boost_tier.as_deref().and_then(|t| t.parse().ok());
    let best = current.map_or(tier, |c| c.max(tier));

    let mut active: user_xp::ActiveModel = row.into();
    active.boost_tier = Set(Some(best.as_str().to_string()));
    active.update(conn).await?;
    Ok(best)
}

/// Current level of a user; players without XP are level 1.
pub async fn level_of<C>(conn: &C, cfg: &XpConfig, user_id: i64) -> Result<i32>
where
    C: ConnectionTrait,
{
    let total_xp = UserXp::find_by_id(user_id)
        .one(conn)
        .await?
        .map_or(0, |row| row.total_xp);
    Ok(compute_level(total_xp, cfg).level)
}

/// A user's XP profile with level progress and leaderboard position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rank {
    #[allow(missing_docs)]
    pub profile: user_xp::Model,
    #[allow(missing_docs)]
    pub progress: LevelProgress,
    /// 1-based position by total XP
    pub position: u64,
}

/// XP profile of a user.
pub async fn rank(eco: &Economy, user_id: i64) -> Result<Rank> {
    let profile = ensure_row(&eco.db, user_id).await?;
    let ahead = UserXp::find()
        .filter(user_xp::Column::TotalXp.gt(profile.total_xp))
        .count(&eco.db)
        .await?;

    Ok(Rank {
        progress: compute_level(profile.total_xp, &eco.config.xp),
        profile,
        position: ahead + 1,
    })
}

/// Users with the most XP.
pub async fn leaderboard(eco: &Economy, limit: u64) -> Result<Vec<user_xp::Model>> {
    UserXp::find()
        .filter(user_xp::Column::TotalXp.gt(0))
        .order_by_desc(user_xp::Column::TotalXp)
        .limit(limit.clamp(1, eco.config.leaderboard.max_entries))
        .all(&eco.db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_compute_level_curve() {
        let cfg = XpConfig::default();
        assert_eq!(compute_level(0, &cfg).level, 1);
        assert_eq!(compute_level(149, &cfg).level, 1);

        let two = compute_level(150, &cfg);
        assert_eq!(two.level, 2);
        assert_eq!(two.xp_into_level, 0);
        // floor(150 * 1.35)
        assert_eq!(two.xp_for_next, 202);

        let three = compute_level(150 + 202 + 5, &cfg);
        assert_eq!(three.level, 3);
        assert_eq!(three.xp_into_level, 5);
        assert_eq!(three.xp_for_next, 272);
    }

    #[test]
    fn test_boost_tiers() {
        assert_eq!(boosted_xp(10, None), 10);
        assert_eq!(boosted_xp(10, Some(BoostTier::E)), 10);
        assert_eq!(boosted_xp(10, Some(BoostTier::B)), 13);
        assert_eq!(boosted_xp(10, Some(BoostTier::SSS)), 20);
        assert_eq!("ss".parse::<BoostTier>().unwrap(), BoostTier::SS);
        assert!("Z".parse::<BoostTier>().is_err());
        assert!(BoostTier::SSS > BoostTier::S);
    }

    #[tokio::test]
    async fn test_award_respects_cooldown() -> Result<()> {
        let eco = setup_economy().await?;
        let cfg = &eco.config.xp;
        let now = Utc::now();

        let first = award_message_xp(&eco.db, cfg, 1, now).await?.unwrap();
        assert_eq!(first.gained, 10);
        assert!(award_message_xp(&eco.db, cfg, 1, now + Duration::seconds(30)).await?.is_none());

        let later = award_message_xp(&eco.db, cfg, 1, now + Duration::seconds(61)).await?;
        assert_eq!(later.unwrap().total_xp, 20);
        Ok(())
    }

    #[tokio::test]
    async fn test_level_up_and_boost() -> Result<()> {
        let eco = setup_economy().await?;
        let cfg = XpConfig {
            per_message: 100,
            ..XpConfig::default()
        };
        let now = Utc::now();

        grant_boost_tier(&eco.db, 1, BoostTier::A).await?;
        // a weaker tier does not replace a stronger one
        assert_eq!(grant_boost_tier(&eco.db, 1, BoostTier::E).await?, BoostTier::A);

        let gain = award_message_xp(&eco.db, &cfg, 1, now).await?.unwrap();
        assert_eq!(gain.gained, 150);
        assert!(gain.leveled_up);
        assert_eq!(gain.level, 2);

        let r = rank(&eco, 1).await?;
        assert_eq!(r.position, 1);
        assert_eq!(r.progress.level, 2);
        Ok(())
    }
}

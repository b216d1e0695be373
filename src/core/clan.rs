//! Clans: membership, upgrades and the PB boost shared by members.
//!
//! Joining and upgrading cost PrissBucks. Everything a member pays is added to their
//! `contribution` and to the clan's `total_investment`, which ranks the clan leaderboard.

use crate::{
    config::economy::ClanConfig,
    core::{
        Economy,
        ledger::{self, Posting, TransactionKind},
    },
    entities::{Clan, ClanMember, clan, clan_member},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    PaginatorTrait, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr,
};
use tracing::{info, instrument};

const LEADER: &str = "leader";
const MEMBER: &str = "member";

/// What happened when a member left
#[derive(Debug, Clone, PartialEq)]
pub enum LeaveOutcome {
    /// A regular member left
    Left {
        /// Clan name
        clan: String,
    },
    /// The leader left and leadership moved to the top contributor
    LeadershipTransferred {
        /// Clan name
        clan: String,
        /// New leader
        new_leader: i64,
    },
    /// The last member left and the clan was deleted
    Disbanded {
        /// Clan name
        clan: String,
    },
}

/// A clan with its members, biggest contributors first.
#[derive(Debug, Clone, PartialEq)]
pub struct ClanProfile {
    #[allow(missing_docs)]
    pub clan: clan::Model,
    #[allow(missing_docs)]
    pub members: Vec<clan_member::Model>,
    /// Member limit at the current capacity level
    pub capacity: u64,
}

/// Which upgrade to buy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upgrade {
    /// More member slots (leader only)
    Capacity,
    /// Higher PB boost (any member)
    Boost,
}

/// Outcome of an upgrade
#[derive(Debug, Clone, PartialEq)]
pub struct UpgradeResult {
    #[allow(missing_docs)]
    pub clan: clan::Model,
    /// PrissBucks spent
    pub cost: i64,
    /// Wallet afterwards
    pub balance: i64,
}

/// Trims and checks a clan name.
pub fn validate_name(name: &str, cfg: &ClanConfig) -> Result<String> {
    let name = name.trim();
    let len = name.chars().count();
    if len < cfg.name_min_length || len > cfg.name_max_length {
        return Err(Error::rule(format!(
            "Clan names are {} to {} characters long",
            cfg.name_min_length, cfg.name_max_length
        )));
    }
    Ok(name.to_string())
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Member limit of a clan.
#[must_use]
pub fn capacity(clan: &clan::Model, cfg: &ClanConfig) -> u64 {
    let level = u64::try_from(clan.capacity_level).unwrap_or(0);
    cfg.base_capacity + level * cfg.capacity_per_level
}

/// PB multiplier for a boost level.
#[must_use]
pub fn boost_multiplier(boost_level: i32, cfg: &ClanConfig) -> f64 {
    cfg.boost_increment.mul_add(f64::from(boost_level), 1.0)
}

/// Membership and clan of a user, if any.
pub async fn user_clan<C>(
    conn: &C,
    user_id: i64,
) -> Result<Option<(clan_member::Model, clan::Model)>>
where
    C: ConnectionTrait,
{
    let found = ClanMember::find_by_id(user_id)
        .find_also_related(Clan)
        .one(conn)
        .await?;
    Ok(found.and_then(|(member, clan)| clan.map(|c| (member, c))))
}

/// PB multiplier of the user's clan, 1.0 without a clan.
pub async fn boost_multiplier_for<C>(conn: &C, user_id: i64) -> Result<f64>
where
    C: ConnectionTrait,
{
    Ok(user_clan(conn, user_id)
        .await?
        .map_or(1.0, |(_, clan)| clan.pb_boost_multiplier))
}

async fn find_by_name<C>(conn: &C, name: &str) -> Result<clan::Model>
where
    C: ConnectionTrait,
{
    Clan::find()
        .filter(clan::Column::NameKey.eq(name_key(name)))
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| Error::not_found(format!("Clan `{}`", name.trim())))
}

async fn member_count<C>(conn: &C, clan_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    Ok(ClanMember::find()
        .filter(clan_member::Column::ClanId.eq(clan_id))
        .count(conn)
        .await?)
}

/// Re-reads a clan row under an exclusive lock.
async fn lock_clan<C>(conn: &C, clan_id: i64) -> Result<clan::Model>
where
    C: ConnectionTrait,
{
    Clan::find_by_id(clan_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| Error::not_found("Clan"))
}

/// Adds `amount` to the member's contribution and the clan's investment.
async fn invest<C>(conn: &C, user_id: i64, clan_id: i64, amount: i64) -> Result<clan::Model>
where
    C: ConnectionTrait,
{
    ClanMember::update_many()
        .col_expr(
            clan_member::Column::Contribution,
            Expr::col(clan_member::Column::Contribution).add(amount),
        )
        .filter(clan_member::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    Clan::update_many()
        .col_expr(
            clan::Column::TotalInvestment,
            Expr::col(clan::Column::TotalInvestment).add(amount),
        )
        .filter(clan::Column::Id.eq(clan_id))
        .exec(conn)
        .await?;
    lock_clan(conn, clan_id).await
}

/// Founds a clan. The founder becomes its leader.
#[instrument(skip(eco))]
pub async fn create(eco: &Economy, user_id: i64, name: &str) -> Result<clan::Model> {
    let cfg = &eco.config.clan;
    let name = validate_name(name, cfg)?;

    let _locks = eco.locks.acquire(&[user_id]).await;
    let now = Utc::now();
    let txn = eco.db.begin().await?;

    if user_clan(&txn, user_id).await?.is_some() {
        return Err(Error::rule("You are already in a clan"));
    }
    if Clan::find()
        .filter(clan::Column::NameKey.eq(name_key(&name)))
        .one(&txn)
        .await?
        .is_some()
    {
        return Err(Error::rule(format!("The name `{name}` is taken")));
    }

    ledger::post(
        &txn,
        Posting::debit(
            user_id,
            cfg.create_cost,
            TransactionKind::ClanCreate,
            format!("Founded clan {name}"),
        ),
    )
    .await?;

    let clan = clan::ActiveModel {
        name_key: Set(name_key(&name)),
        name: Set(name),
        owner_id: Set(user_id),
        capacity_level: Set(0),
        boost_level: Set(0),
        pb_boost_multiplier: Set(1.0),
        total_investment: Set(cfg.create_cost),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    clan_member::ActiveModel {
        user_id: Set(user_id),
        clan_id: Set(clan.id),
        role: Set(LEADER.to_string()),
        contribution: Set(cfg.create_cost),
        joined_at: Set(now),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(user_id, clan_id = clan.id, "clan created");
    Ok(clan)
}

/// Joins a clan by name.
#[instrument(skip(eco))]
pub async fn join(eco: &Economy, user_id: i64, name: &str) -> Result<clan::Model> {
    let cfg = &eco.config.clan;
    let _locks = eco.locks.acquire(&[user_id]).await;
    let txn = eco.db.begin().await?;

    if user_clan(&txn, user_id).await?.is_some() {
        return Err(Error::rule("You are already in a clan"));
    }
    let clan = find_by_name(&txn, name).await?;
    let limit = capacity(&clan, cfg);
    if member_count(&txn, clan.id).await? >= limit {
        return Err(Error::LimitExceeded {
            message: format!("{} is full ({limit} members)", clan.name),
        });
    }

    ledger::post(
        &txn,
        Posting::debit(
            user_id,
            cfg.join_cost,
            TransactionKind::ClanJoin,
            format!("Joined clan {}", clan.name),
        ),
    )
    .await?;

    let member = clan_member::ActiveModel {
        user_id: Set(user_id),
        clan_id: Set(clan.id),
        role: Set(MEMBER.to_string()),
        contribution: Set(0),
        joined_at: Set(Utc::now()),
    }
    .insert(&txn)
    .await?;
    let clan = invest(&txn, member.user_id, clan.id, cfg.join_cost).await?;

    txn.commit().await?;
    info!(user_id, clan_id = clan.id, "joined clan");
    Ok(clan)
}

/// Leaves the current clan.
#[instrument(skip(eco))]
pub async fn leave(eco: &Economy, user_id: i64) -> Result<LeaveOutcome> {
    let _locks = eco.locks.acquire(&[user_id]).await;
    let txn = eco.db.begin().await?;

    let (member, clan) = user_clan(&txn, user_id)
        .await?
        .ok_or_else(|| Error::rule("You are not in a clan"))?;
    ClanMember::delete_by_id(user_id).exec(&txn).await?;

    let outcome = if member.role == LEADER {
        let successor = ClanMember::find()
            .filter(clan_member::Column::ClanId.eq(clan.id))
            .order_by_desc(clan_member::Column::Contribution)
            .order_by_asc(clan_member::Column::JoinedAt)
            .one(&txn)
            .await?;

        match successor {
            Some(next) => {
                let new_leader = next.user_id;
                let mut promoted: clan_member::ActiveModel = next.into();
                promoted.role = Set(LEADER.to_string());
                promoted.update(&txn).await?;

                let name = clan.name.clone();
                let mut c: clan::ActiveModel = clan.into();
                c.owner_id = Set(new_leader);
                c.update(&txn).await?;
                LeaveOutcome::LeadershipTransferred {
                    clan: name,
                    new_leader,
                }
            }
            None => {
                Clan::delete_by_id(clan.id).exec(&txn).await?;
                LeaveOutcome::Disbanded { clan: clan.name }
            }
        }
    } else {
        LeaveOutcome::Left { clan: clan.name }
    };

    txn.commit().await?;
    info!(user_id, ?outcome, "left clan");
    Ok(outcome)
}

/// Removes a member from the leader's clan.
#[instrument(skip(eco))]
pub async fn kick(eco: &Economy, leader_id: i64, target_id: i64) -> Result<()> {
    if leader_id == target_id {
        return Err(Error::rule("Use leave to quit your own clan"));
    }
    let txn = eco.db.begin().await?;

    let (member, clan) = user_clan(&txn, leader_id)
        .await?
        .ok_or_else(|| Error::rule("You are not in a clan"))?;
    if member.role != LEADER {
        return Err(Error::rule("Only the clan leader can kick members"));
    }
    let removed = ClanMember::delete_many()
        .filter(clan_member::Column::UserId.eq(target_id))
        .filter(clan_member::Column::ClanId.eq(clan.id))
        .exec(&txn)
        .await?;
    if removed.rows_affected == 0 {
        return Err(Error::not_found("That member"));
    }

    txn.commit().await?;
    info!(leader_id, target_id, clan_id = clan.id, "member kicked");
    Ok(())
}

/// Buys the next capacity or boost level for the user's clan.
#[instrument(skip(eco))]
pub async fn upgrade(eco: &Economy, user_id: i64, upgrade: Upgrade) -> Result<UpgradeResult> {
    let cfg = &eco.config.clan;
    let _locks = eco.locks.acquire(&[user_id]).await;
    let txn = eco.db.begin().await?;

    let (member, clan) = user_clan(&txn, user_id)
        .await?
        .ok_or_else(|| Error::rule("You are not in a clan"))?;
    let clan = lock_clan(&txn, clan.id).await?;

    let (level, costs) = match upgrade {
        Upgrade::Capacity => {
            if member.role != LEADER {
                return Err(Error::rule("Only the clan leader can buy capacity upgrades"));
            }
            (clan.capacity_level, &cfg.capacity_upgrade_costs)
        }
        Upgrade::Boost => (clan.boost_level, &cfg.boost_costs),
    };
    let cost = usize::try_from(level)
        .ok()
        .and_then(|l| costs.get(l).copied())
        .ok_or_else(|| Error::rule("This upgrade is already at its maximum level"))?;

    let change = ledger::post(
        &txn,
        Posting::debit(
            user_id,
            cost,
            TransactionKind::ClanUpgrade,
            format!("Clan {} upgrade", clan.name),
        ),
    )
    .await?;

    let mut c: clan::ActiveModel = clan.into();
    match upgrade {
        Upgrade::Capacity => c.capacity_level = Set(level + 1),
        Upgrade::Boost => {
            c.boost_level = Set(level + 1);
            c.pb_boost_multiplier = Set(boost_multiplier(level + 1, cfg));
        }
    }
    let clan = c.update(&txn).await?;
    let clan = invest(&txn, member.user_id, clan.id, cost).await?;

    txn.commit().await?;
    info!(user_id, clan_id = clan.id, ?upgrade, cost, "clan upgraded");

    Ok(UpgradeResult {
        clan,
        cost,
        balance: change.after,
    })
}

/// Profile of a clan by name, or of the user's own clan.
pub async fn profile(eco: &Economy, user_id: i64, name: Option<&str>) -> Result<ClanProfile> {
    let clan = match name {
        Some(name) => find_by_name(&eco.db, name).await?,
        None => {
            user_clan(&eco.db, user_id)
                .await?
                .ok_or_else(|| Error::rule("You are not in a clan"))?
                .1
        }
    };
    let members = ClanMember::find()
        .filter(clan_member::Column::ClanId.eq(clan.id))
        .order_by_desc(clan_member::Column::Contribution)
        .order_by_asc(clan_member::Column::JoinedAt)
        .all(&eco.db)
        .await?;

    Ok(ClanProfile {
        capacity: capacity(&clan, &eco.config.clan),
        clan,
        members,
    })
}

/// Clans ranked by total investment.
pub async fn leaderboard(eco: &Economy, limit: u64) -> Result<Vec<clan::Model>> {
    Clan::find()
        .order_by_desc(clan::Column::TotalInvestment)
        .order_by_asc(clan::Column::Id)
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
    fn test_name_rules() {
        let cfg = ClanConfig::default();
        assert_eq!(validate_name("  Wolves ", &cfg).unwrap(), "Wolves");
        assert!(validate_name("ab", &cfg).is_err());
        assert!(validate_name(&"x".repeat(25), &cfg).is_err());
    }

    #[test]
    fn test_boost_multiplier_steps() {
        let cfg = ClanConfig::default();
        assert!((boost_multiplier(0, &cfg) - 1.0).abs() < f64::EPSILON);
        assert!((boost_multiplier(3, &cfg) - 1.15).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_create_and_join() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 6_000).await?;
        fund(&eco.db, 2, 1_500).await?;

        let clan = create(&eco, 1, "Wolves").await?;
        assert_eq!(clan.owner_id, 1);
        assert_eq!(ledger::balance_of(&eco.db, 1).await?, 1_000);

        // names are unique regardless of case
        fund(&eco.db, 3, 6_000).await?;
        assert!(matches!(create(&eco, 3, "wolves").await, Err(Error::Rule { .. })));

        let joined = join(&eco, 2, "WOLVES").await?;
        assert_eq!(joined.total_investment, 6_000);
        assert_eq!(ledger::balance_of(&eco.db, 2).await?, 500);

        assert!(matches!(join(&eco, 2, "Wolves").await, Err(Error::Rule { .. })));
        assert!(matches!(create(&eco, 1, "Bears").await, Err(Error::Rule { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_join_respects_capacity() -> Result<()> {
        let mut eco = setup_economy().await?;
        std::sync::Arc::make_mut(&mut eco.config).clan.base_capacity = 2;
        fund(&eco.db, 1, 5_000).await?;
        create(&eco, 1, "Tiny").await?;

        fund(&eco.db, 2, 1_000).await?;
        join(&eco, 2, "Tiny").await?;

        fund(&eco.db, 3, 1_000).await?;
        assert!(matches!(join(&eco, 3, "Tiny").await, Err(Error::LimitExceeded { .. })));
        assert_eq!(ledger::balance_of(&eco.db, 3).await?, 1_000);
        Ok(())
    }

    #[tokio::test]
    async fn test_leader_leaving_hands_over() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 5_000).await?;
        fund(&eco.db, 2, 1_000).await?;
        fund(&eco.db, 3, 8_500).await?;
        create(&eco, 1, "Wolves").await?;
        join(&eco, 2, "Wolves").await?;
        join(&eco, 3, "Wolves").await?;
        upgrade(&eco, 3, Upgrade::Boost).await?;

        let outcome = leave(&eco, 1).await?;
        assert_eq!(
            outcome,
            LeaveOutcome::LeadershipTransferred {
                clan: "Wolves".to_string(),
                new_leader: 3
            }
        );
        let profile = profile(&eco, 3, None).await?;
        assert_eq!(profile.clan.owner_id, 3);
        assert_eq!(profile.members.len(), 2);
        assert_eq!(profile.members[0].role, "leader");

        leave(&eco, 2).await?;
        assert!(matches!(leave(&eco, 3).await?, LeaveOutcome::Disbanded { .. }));
        assert!(Clan::find().all(&eco.db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_upgrades_and_boost() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 100_000).await?;
        fund(&eco.db, 2, 20_000).await?;
        create(&eco, 1, "Wolves").await?;
        join(&eco, 2, "Wolves").await?;

        assert!(matches!(
            upgrade(&eco, 2, Upgrade::Capacity).await,
            Err(Error::Rule { .. })
        ));
        let boosted = upgrade(&eco, 2, Upgrade::Boost).await?;
        assert_eq!(boosted.cost, 7_500);
        assert!((boost_multiplier_for(&eco.db, 1).await? - 1.05).abs() < 1e-9);

        for _ in 0..3 {
            upgrade(&eco, 1, Upgrade::Capacity).await?;
        }
        assert!(matches!(
            upgrade(&eco, 1, Upgrade::Capacity).await,
            Err(Error::Rule { .. })
        ));
        let p = profile(&eco, 1, Some("wolves")).await?;
        assert_eq!(p.capacity, 25);
        assert_eq!(p.clan.total_investment, 5_000 + 1_000 + 7_500 + 35_000);

        assert!((boost_multiplier_for(&eco.db, 99).await? - 1.0).abs() < f64::EPSILON);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_boosts_each_buy_a_level() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 30_000).await?;
        fund(&eco.db, 2, 20_000).await?;
        create(&eco, 1, "Wolves").await?;
        join(&eco, 2, "Wolves").await?;

        let (a, b) = tokio::join!(
            upgrade(&eco, 1, Upgrade::Boost),
            upgrade(&eco, 2, Upgrade::Boost)
        );
        let mut costs = [a?.cost, b?.cost];
        costs.sort_unstable();
        assert_eq!(costs, [7_500, 15_000]);

        let p = profile(&eco, 1, None).await?;
        assert_eq!(p.clan.boost_level, 2);
        assert_eq!(p.clan.total_investment, 5_000 + 1_000 + 7_500 + 15_000);
        let contributed: i64 = p.members.iter().map(|m| m.contribution).sum();
        assert_eq!(contributed, p.clan.total_investment);
        Ok(())
    }

    #[tokio::test]
    async fn test_kick_and_leaderboard() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 5_000).await?;
        fund(&eco.db, 2, 1_000).await?;
        fund(&eco.db, 3, 6_000).await?;
        create(&eco, 1, "Wolves").await?;
        join(&eco, 2, "Wolves").await?;
        create(&eco, 3, "Bears").await?;

        assert!(matches!(kick(&eco, 2, 1).await, Err(Error::Rule { .. })));
        assert!(matches!(kick(&eco, 1, 3).await, Err(Error::NotFound { .. })));
        kick(&eco, 1, 2).await?;
        assert!(user_clan(&eco.db, 2).await?.is_none());

        let top = leaderboard(&eco, 10).await?;
        assert_eq!(top[0].name, "Wolves");
        assert_eq!(top.len(), 2);
        Ok(())
    }
}

//! Message activity per guild member.

use crate::{
    core::Economy,
    entities::{UserActivity, user_activity},
    errors::Result,
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    PaginatorTrait, QueryOrder, QuerySelect, Set, prelude::*,
    sea_query::{Expr, OnConflict},
};

/// Activity summary of a guild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuildOverview {
    /// Messages counted over all members
    pub total_messages: i64,
    /// Members who spoke within the active window
    pub active_members: u64,
    /// Members with at least one counted message
    pub tracked_members: u64,
    /// Length of the active window
    pub window_days: i64,
}

/// One member's activity and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberActivity {
    #[allow(missing_docs)]
    pub activity: user_activity::Model,
    /// 1-based position by message count
    pub rank: u64,
    /// Members ranked in the guild
    pub total_tracked: u64,
}

/// Counts one message. The upsert increments in place so concurrent messages are not lost.
pub async fn record_message<C>(
    conn: &C,
    guild_id: i64,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    UserActivity::insert(user_activity::ActiveModel {
        guild_id: Set(guild_id),
        user_id: Set(user_id),
        message_count: Set(1),
        last_message_at: Set(now),
    })
    .on_conflict(
        OnConflict::columns([user_activity::Column::GuildId, user_activity::Column::UserId])
            .value(
                user_activity::Column::MessageCount,
                Expr::col((UserActivity, user_activity::Column::MessageCount)).add(1),
            )
            .update_column(user_activity::Column::LastMessageAt)
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;
    Ok(())
}

/// Message totals and active members of a guild.
pub async fn overview(eco: &Economy, guild_id: i64, now: DateTime<Utc>) -> Result<GuildOverview> {
    let window_days = eco.config.activity.active_window_days;
    let active_since = now - Duration::days(window_days);

    let counts: Vec<i64> = UserActivity::find()
        .select_only()
        .column(user_activity::Column::MessageCount)
        .filter(user_activity::Column::GuildId.eq(guild_id))
        .into_tuple()
        .all(&eco.db)
        .await?;
    let active_members = UserActivity::find()
        .filter(user_activity::Column::GuildId.eq(guild_id))
        .filter(user_activity::Column::LastMessageAt.gte(active_since))
        .count(&eco.db)
        .await?;

    Ok(GuildOverview {
        total_messages: counts.iter().sum(),
        active_members,
        tracked_members: u64::try_from(counts.len())?,
        window_days,
    })
}

/// Most active members, most recent first on ties. `limit` is clamped to 1..=50.
pub async fn top(eco: &Economy, guild_id: i64, limit: u64) -> Result<Vec<user_activity::Model>> {
    UserActivity::find()
        .filter(user_activity::Column::GuildId.eq(guild_id))
        .order_by_desc(user_activity::Column::MessageCount)
        .order_by_desc(user_activity::Column::LastMessageAt)
        .limit(limit.clamp(1, 50))
        .all(&eco.db)
        .await
        .map_err(Into::into)
}

/// A member's activity with rank, or `None` if they never spoke.
pub async fn member(eco: &Economy, guild_id: i64, user_id: i64) -> Result<Option<MemberActivity>> {
    let Some(activity) = UserActivity::find_by_id((guild_id, user_id))
        .one(&eco.db)
        .await?
    else {
        return Ok(None);
    };

    let in_guild = UserActivity::find().filter(user_activity::Column::GuildId.eq(guild_id));
    let ahead = in_guild
        .clone()
        .filter(user_activity::Column::MessageCount.gt(activity.message_count))
        .count(&eco.db)
        .await?;
    let total_tracked = in_guild.count(&eco.db).await?;

    Ok(Some(MemberActivity {
        activity,
        rank: ahead + 1,
        total_tracked,
    }))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    const GUILD: i64 = 100;

    async fn speak(eco: &Economy, user_id: i64, times: usize, at: DateTime<Utc>) -> Result<()> {
        for _ in 0..times {
            record_message(&eco.db, GUILD, user_id, at).await?;
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_record_message_counts() -> Result<()> {
        let eco = setup_economy().await?;
        let now = Utc::now();
        speak(&eco, 1, 3, now - Duration::minutes(5)).await?;
        record_message(&eco.db, GUILD, 1, now).await?;
        // another guild is tracked separately
        record_message(&eco.db, GUILD + 1, 1, now).await?;

        let row = UserActivity::find_by_id((GUILD, 1)).one(&eco.db).await?.unwrap();
        assert_eq!(row.message_count, 4);
        assert_eq!(row.last_message_at, now);
        Ok(())
    }

    #[tokio::test]
    async fn test_overview_window() -> Result<()> {
        let eco = setup_economy().await?;
        let now = Utc::now();
        speak(&eco, 1, 5, now).await?;
        speak(&eco, 2, 2, now - Duration::days(3)).await?;
        speak(&eco, 3, 9, now - Duration::days(8)).await?;

        let overview = overview(&eco, GUILD, now).await?;
        assert_eq!(overview.total_messages, 16);
        assert_eq!(overview.tracked_members, 3);
        assert_eq!(overview.active_members, 2);

        let empty = super::overview(&eco, GUILD + 1, now).await?;
        assert_eq!((empty.total_messages, empty.tracked_members), (0, 0));
        Ok(())
    }

    #[tokio::test]
    async fn test_top_and_member_rank() -> Result<()> {
        let eco = setup_economy().await?;
        let now = Utc::now();
        speak(&eco, 1, 2, now - Duration::hours(1)).await?;
        speak(&eco, 2, 5, now).await?;
        speak(&eco, 3, 2, now).await?;

        let ranking: Vec<i64> = top(&eco, GUILD, 10).await?.iter().map(|r| r.user_id).collect();
        assert_eq!(ranking, [2, 3, 1]);
        assert_eq!(top(&eco, GUILD, 0).await?.len(), 1);

        let details = member(&eco, GUILD, 1).await?.unwrap();
        assert_eq!(details.rank, 2);
        assert_eq!(details.total_tracked, 3);
        assert_eq!(member(&eco, GUILD, 1).await?.unwrap().activity.message_count, 2);
        assert!(member(&eco, GUILD, 4).await?.is_none());
        Ok(())
    }
}

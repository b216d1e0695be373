//! Heist record entity - per-user heist counters and daily attempt window.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Heist record database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "heist_stats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    /// Attempts made since `window_start`
    pub attempts_today: i32,
    /// UTC midnight of the day `attempts_today` counts
    pub window_start: DateTimeUtc,
    pub total_heists: i64,
    pub successes: i64,
    /// PrissBucks won over all heists
    pub total_won: i64,
    /// PrissBucks lost over all heists
    pub total_lost: i64,
    pub last_heist_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

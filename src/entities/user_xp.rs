//! XP entity - experience earned by chatting.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User XP database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_xp")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    /// Lifetime XP
    pub total_xp: i64,
    /// Cached level derived from `total_xp`
    pub level: i32,
    /// Highest XP boost tier owned
    pub boost_tier: Option<String>,
    pub last_message_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

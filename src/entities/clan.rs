//! Clan entity.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Clan database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "clans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name as chosen by the founder
    pub name: String,
    /// Lowercased name, enforces case-insensitive uniqueness
    #[sea_orm(unique)]
    pub name_key: String,
    /// Current leader
    pub owner_id: i64,
    pub capacity_level: i32,
    pub boost_level: i32,
    /// Multiplier applied to members' message and pet income
    pub pb_boost_multiplier: f64,
    /// PrissBucks ever spent on the clan
    pub total_investment: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One clan has many members
    #[sea_orm(has_many = "super::clan_member::Entity")]
    Members,
}

impl Related<super::clan_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

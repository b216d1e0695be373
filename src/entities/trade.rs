//! Trade entity - a PB and pet exchange between two players.
//!
//! `status` moves from `"pending"` to `"completed"` or `"cancelled"`.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Trade database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trades")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub initiator_id: i64,
    pub partner_id: i64,
    /// PrissBucks offered by the initiator
    pub initiator_pb: i64,
    /// PrissBucks offered by the partner
    pub partner_pb: i64,
    pub initiator_confirmed: bool,
    pub partner_confirmed: bool,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::trade_pet::Entity")]
    Pets,
}

impl Related<super::trade_pet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

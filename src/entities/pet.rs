//! Pet catalog entity, synced from configuration at startup.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pet catalog database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub name: String,
    pub rarity: String,
    pub base_income_per_hour: i64,
    /// Relative egg weight
    pub drop_rate: f64,
    pub is_huge: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_pet::Entity")]
    UserPets,
}

impl Related<super::user_pet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserPets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

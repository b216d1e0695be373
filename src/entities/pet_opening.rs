//! Pet opening entity - one row per hatched egg, kept for drop statistics.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Egg opening database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pet_openings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    /// Catalog pet that hatched
    pub pet_id: i64,
    /// Egg that was opened
    pub egg_slug: String,
    pub is_gold: bool,
    pub opened_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

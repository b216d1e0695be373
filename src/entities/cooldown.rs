//! Cooldown entity - per-user, per-action cooldown expiry.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cooldown database model, keyed by (`user_id`, `cooldown_type`)
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cooldowns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub cooldown_type: String,
    pub last_used: DateTimeUtc,
    pub expires_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

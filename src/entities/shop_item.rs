//! Shop item entity - things players can buy with PrissBucks.
//!
//! `kind` is one of `"role"`, `"timeout_token"` or `"defense"`; the optional columns only
//! apply to the matching kind.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Shop item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shop_items")]
pub struct Model {
    /// Unique identifier for the item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    #[sea_orm(unique)]
    pub name: String,
    /// Short description shown in the shop
    pub description: String,
    /// Base price before tax
    pub price: i64,
    /// Item kind
    pub kind: String,
    /// Discord role granted by role items
    pub role_id: Option<i64>,
    /// XP boost tier granted by role items (`"E"` .. `"SSS"`)
    pub xp_tier: Option<String>,
    /// Number of timeout tokens granted
    pub token_amount: Option<i64>,
    /// Inactive items are hidden and cannot be bought
    pub is_active: bool,
    /// When the item was added
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One item has many purchases
    #[sea_orm(has_many = "super::user_purchase::Entity")]
    Purchases,
}

impl Related<super::user_purchase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchases.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

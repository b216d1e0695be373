//! Purchase entity - one row per shop purchase.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Purchase database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_purchases")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Buyer
    pub user_id: i64,
    /// Purchased item
    pub item_id: i64,
    /// Total charged, tax included
    pub price_paid: i64,
    /// Tax part of `price_paid`
    pub tax_paid: i64,
    pub purchased_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each purchase refers to one shop item
    #[sea_orm(
        belongs_to = "super::shop_item::Entity",
        from = "Column::ItemId",
        to = "super::shop_item::Column::Id"
    )]
    ShopItem,
}

impl Related<super::shop_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShopItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

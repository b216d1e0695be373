//! Public bank entity - a single shared row (id 1) collecting taxes, fees and game losses.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Public bank database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "public_bank")]
pub struct Model {
    /// Always 1
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    /// Funds available for withdrawals
    pub balance: i64,
    /// Everything ever credited
    pub total_deposited: i64,
    /// Everything ever withdrawn by players
    pub total_withdrawn: i64,
    pub last_activity: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

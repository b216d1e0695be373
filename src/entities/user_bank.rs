//! Private bank account entity.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Private bank account database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_bank")]
pub struct Model {
    /// Account owner
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    /// Money stored in the bank
    pub balance: i64,
    /// Net amount ever deposited
    pub total_deposited: i64,
    /// Amount ever withdrawn
    pub total_withdrawn: i64,
    /// Deposit taxes and maintenance fees paid
    pub total_fees_paid: i64,
    /// Gross amount deposited since `last_deposit_reset`
    pub daily_deposit: i64,
    /// Start of the current deposit window
    pub last_deposit_reset: DateTimeUtc,
    /// Last time a maintenance fee was charged
    pub last_fee_payment: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

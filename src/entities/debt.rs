//! Debt entity - what a player owes the public bank.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Public bank debt database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "public_bank_debts")]
pub struct Model {
    /// Debtor
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    /// Outstanding debt
    pub total_debt: i64,
    /// 0 green, 1 yellow, 2 red
    pub debt_level: i32,
    pub last_payment: Option<DateTimeUtc>,
    /// While in the future, the debtor is treated as green
    pub grace_end: Option<DateTimeUtc>,
    /// Last time daily interest was applied
    pub last_interest: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

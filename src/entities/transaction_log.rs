//! Transaction log entity - one row per wallet balance change.
//!
//! `balance_after - balance_before` always equals `amount`.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction log database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Wallet owner
    pub user_id: i64,
    /// See `core::ledger::TransactionKind`
    pub transaction_type: String,
    /// Applied amount (positive credit, negative debit)
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub description: String,
    /// Counterparty for transfers, games and trades
    pub related_user_id: Option<i64>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

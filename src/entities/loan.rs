//! Loan entity - personal loans with daily interest.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Loan database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_loans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Borrower
    pub user_id: i64,
    /// Amount originally borrowed
    pub principal: i64,
    /// What is still owed, interest included
    pub remaining_debt: i64,
    /// Interest and penalties added so far
    pub interest_accumulated: i64,
    pub loan_date: DateTimeUtc,
    pub due_date: DateTimeUtc,
    pub last_interest_calculation: DateTimeUtc,
    /// Only one active loan per user
    pub is_active: bool,
    pub repaid_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

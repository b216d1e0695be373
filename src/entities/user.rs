//! User entity - one wallet per Discord user.
//!
//! Rows are created lazily the first time a user touches the economy.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User wallet database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Discord user ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    /// Wallet balance in PrissBucks, never negative
    pub balance: i64,
    /// Last time the daily reward was claimed
    pub last_daily: Option<DateTimeUtc>,
    /// Start of the current pet income window
    pub pet_last_claim: Option<DateTimeUtc>,
    /// Whether a purchased defense protects the wallet from the next steal
    pub has_defense: bool,
    /// Timeout tokens bought in the shop
    pub timeout_tokens: i64,
    /// When the wallet was created
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

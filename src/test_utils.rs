//! Shared test utilities for `EcoBot`.
//!
//! This module provides helpers for setting up in-memory databases and funding wallets
//! without going through gameplay.

use crate::{
    config::EconomyConfig,
    core::{
        Economy,
        ledger::{self, Posting, TransactionKind},
        pet,
    },
    errors::Result,
};
use sea_orm::{DatabaseConnection, TransactionTrait};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates an [`Economy`] over a fresh in-memory database with the default tuning.
pub async fn setup_economy() -> Result<Economy> {
    let db = setup_test_db().await?;
    Ok(Economy::new(db, EconomyConfig::default()))
}

/// Same as [`setup_economy`], with the default pet catalog synced.
pub async fn setup_pet_economy() -> Result<Economy> {
    let eco = setup_economy().await?;
    pet::sync_catalog(&eco.db, &eco.config.pets).await?;
    Ok(eco)
}

/// Credits `amount` to a wallet as an admin grant. Returns the new balance.
///
/// # Arguments
/// * `db` - Database connection
/// * `user_id` - Wallet owner
/// * `amount` - PrissBucks to add
pub async fn fund(db: &DatabaseConnection, user_id: i64, amount: i64) -> Result<i64> {
    let txn = db.begin().await?;
    let change = ledger::post(
        &txn,
        Posting::credit(user_id, amount, TransactionKind::AdminAdd, "Test funds"),
    )
    .await?;
    txn.commit().await?;
    Ok(change.after)
}

//! Database configuration module for `EcoBot`.
//!
//! This module opens the `SeaORM` connection (`PostgreSQL` in production, `SQLite` for local runs
//! and tests) and creates every table from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust models.

use crate::entities::{
    Clan, ClanMember, Cooldown, Debt, HeistRecord, Loan, Pet, PetOpening, PublicBank,
    PublicBankWithdrawal, ShopItem, Trade, TradePet, TransactionLog, User, UserActivity,
    UserBank, UserPet, UserPurchase, UserXp, UserZone, public_bank,
};
use crate::errors::Result;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, Set,
    sea_query::TableCreateStatement,
};
use tracing::info;

/// Primary key of the public bank singleton row.
pub const PUBLIC_BANK_ID: i32 = 1;

/// Opens a connection pool for the given `SeaORM` URL.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates all necessary database tables using `SeaORM`'s schema generation from entity
/// definitions, then seeds the public bank row.
///
/// Safe to run at every startup: tables are created with `IF NOT EXISTS`.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut tables: Vec<TableCreateStatement> = vec![
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(ShopItem),
        schema.create_table_from_entity(UserPurchase),
        schema.create_table_from_entity(UserBank),
        schema.create_table_from_entity(PublicBank),
        schema.create_table_from_entity(PublicBankWithdrawal),
        schema.create_table_from_entity(Debt),
        schema.create_table_from_entity(Loan),
        schema.create_table_from_entity(UserXp),
        schema.create_table_from_entity(Cooldown),
        schema.create_table_from_entity(TransactionLog),
        schema.create_table_from_entity(Clan),
        schema.create_table_from_entity(ClanMember),
        schema.create_table_from_entity(Pet),
        schema.create_table_from_entity(UserPet),
        schema.create_table_from_entity(Trade),
        schema.create_table_from_entity(TradePet),
        schema.create_table_from_entity(UserZone),
        schema.create_table_from_entity(PetOpening),
        schema.create_table_from_entity(HeistRecord),
        schema.create_table_from_entity(UserActivity),
    ];

    for table in &mut tables {
        table.if_not_exists();
        db.execute(builder.build(&*table)).await?;
    }

    seed_public_bank(db).await?;
    info!("Database schema ready ({} tables)", tables.len());
    Ok(())
}

async fn seed_public_bank(db: &DatabaseConnection) -> Result<()> {
    if PublicBank::find_by_id(PUBLIC_BANK_ID).one(db).await?.is_none() {
        public_bank::ActiveModel {
            id: Set(PUBLIC_BANK_ID),
            balance: Set(0),
            total_deposited: Set(0),
            total_withdrawn: Set(0),
            last_activity: Set(chrono::Utc::now()),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{transaction_log, user};
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = create_connection("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<user::Model> = User::find().limit(1).all(&db).await?;
        let _: Vec<transaction_log::Model> = TransactionLog::find().limit(1).all(&db).await?;
        let bank = PublicBank::find_by_id(PUBLIC_BANK_ID).one(&db).await?;
        assert_eq!(bank.map(|b| b.balance), Some(0));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = create_connection("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;

        let banks = PublicBank::find().all(&db).await?;
        assert_eq!(banks.len(), 1);
        Ok(())
    }
}

//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod clan;
pub mod clan_member;
pub mod cooldown;
pub mod debt;
pub mod heist_record;
pub mod loan;
pub mod pet;
pub mod pet_opening;
pub mod public_bank;
pub mod public_bank_withdrawal;
pub mod shop_item;
pub mod trade;
pub mod trade_pet;
pub mod transaction_log;
pub mod user;
pub mod user_activity;
pub mod user_bank;
pub mod user_pet;
pub mod user_purchase;
pub mod user_xp;
pub mod user_zone;

// Re-export entity types under table-like names
pub use clan::Entity as Clan;
pub use clan_member::Entity as ClanMember;
pub use cooldown::Entity as Cooldown;
pub use debt::Entity as Debt;
pub use heist_record::Entity as HeistRecord;
pub use loan::Entity as Loan;
pub use pet::Entity as Pet;
pub use pet_opening::Entity as PetOpening;
pub use public_bank::Entity as PublicBank;
pub use public_bank_withdrawal::Entity as PublicBankWithdrawal;
pub use shop_item::Entity as ShopItem;
pub use trade::Entity as Trade;
pub use trade_pet::Entity as TradePet;
pub use transaction_log::Entity as TransactionLog;
pub use user::Entity as User;
pub use user_activity::Entity as UserActivity;
pub use user_bank::Entity as UserBank;
pub use user_pet::Entity as UserPet;
pub use user_purchase::Entity as UserPurchase;
pub use user_xp::Entity as UserXp;
pub use user_zone::Entity as UserZone;

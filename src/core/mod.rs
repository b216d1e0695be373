//! Core business logic - framework-agnostic economy operations.
//!
//! Every operation takes an [`Economy`] (or a bare connection for helpers that run inside an
//! existing database transaction) and returns a typed result the bot layer turns into a reply.

/// Message activity statistics
pub mod activity;
/// Private bank accounts
pub mod bank;
/// Clans, membership and upgrades
pub mod clan;
/// Persistent cooldowns
pub mod cooldown;
/// Public bank debt and debt levels
pub mod debt;
/// Wallet basics: daily, transfers, leaderboard, admin tools
pub mod economy;
/// Bank heists
pub mod heist;
/// Paginated transaction history
pub mod history;
/// Balance mutation and transaction log
pub mod ledger;
/// Personal loans and interest
pub mod loan;
/// Pet eggs, equipment and income
pub mod pet;
/// Shared public bank
pub mod public_bank;
/// Passive message rewards
pub mod rewards;
/// Roulette
pub mod roulette;
/// Rock-paper-scissors duels
pub mod rps;
/// Shop items and purchases
pub mod shop;
/// Stealing from other players
pub mod steal;
/// Player-to-player trades
pub mod trade;
/// Experience, levels and boost tiers
pub mod xp;

use crate::config::EconomyConfig;
use ledger::UserLocks;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Handle shared by every economy operation.
#[derive(Debug)]
pub struct Economy {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Tuning parameters
    pub config: Arc<EconomyConfig>,
    /// Per-user locks for wallet mutations
    pub locks: UserLocks,
}

impl Economy {
    /// Creates a new economy handle.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: EconomyConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
            locks: UserLocks::new(),
        }
    }
}

/// `amount * rate`, rounded down.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn fraction_of(amount: i64, rate: f64) -> i64 {
    (amount as f64 * rate).floor() as i64
}

/// `amount * rate`, rounded half to even.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn rounded_fraction_of(amount: i64, rate: f64) -> i64 {
    (amount as f64 * rate).round_ties_even() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_helpers() {
        assert_eq!(fraction_of(999, 0.02), 19);
        assert_eq!(fraction_of(10, 0.25), 2);
        assert_eq!(rounded_fraction_of(1000, 0.05), 50);
        assert_eq!(rounded_fraction_of(1234, 0.05), 62);
        assert_eq!(rounded_fraction_of(7, 0.05), 0);
    }
}

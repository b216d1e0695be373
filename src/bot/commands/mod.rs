//! Discord command implementations organized by feature.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Admin-only economy management
pub mod admin;
/// Private bank, public bank, debt and loans
pub mod bank;
/// Roulette, rock-paper-scissors, stealing and bank heists
pub mod casino;
/// Clan management
pub mod clan;
/// Wallet basics: balance, daily, give, leaderboard, history
pub mod economy;
/// General utility commands
pub mod general;
/// Pet eggs and zones, equipment, income and statistics
pub mod pets;
/// Shop browsing and purchases
pub mod shop;
/// Message activity statistics
pub mod stats;
/// Player-to-player trades
pub mod trade;
/// Experience and ranks
pub mod xp;

// Export commands
pub use admin::*;
pub use bank::*;
pub use casino::*;
pub use clan::*;
pub use economy::*;
pub use general::*;
pub use pets::*;
pub use shop::*;
pub use stats::*;
pub use trade::*;
pub use xp::*;

use crate::{bot::BotData, errors::Error};

/// Every command the bot registers.
#[must_use]
pub fn all() -> Vec<poise::Command<BotData, Error>> {
    vec![
        ping(),
        help(),
        balance(),
        daily(),
        give(),
        leaderboard(),
        history(),
        cooldowns(),
        shop(),
        buy(),
        inventory(),
        bank(),
        publicbank(),
        paydebt(),
        debt(),
        loan(),
        roulette(),
        rps(),
        steal(),
        heist(),
        heistinfo(),
        clan(),
        pets(),
        trade(),
        xp(),
        topactive(),
        mystats(),
        serverstats(),
        admin(),
    ]
}

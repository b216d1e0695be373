//! European roulette.
//!
//! The spin is rolled by the caller so the outcome can be fixed in tests. Settlement is posted
//! as a single net movement: a win credits the profit, a loss debits the stake.

use crate::{
    core::{
        Economy,
        cooldown::{self, CooldownKind},
        ledger::{self, Posting, TransactionKind},
        public_bank,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use rand::Rng;
use sea_orm::TransactionTrait;
use std::{fmt, str::FromStr};
use tracing::{info, instrument};

/// Red pockets of a European wheel.
pub const RED_NUMBERS: [u8; 18] = [
    1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
];

/// Highest pocket on the wheel.
pub const MAX_POCKET: u8 = 36;

/// Pocket colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Color {
    Green,
    Red,
    Black,
}

impl Color {
    /// Colour of a pocket.
    #[must_use]
    pub fn of(pocket: u8) -> Self {
        if pocket == 0 {
            Self::Green
        } else if RED_NUMBERS.contains(&pocket) {
            Self::Red
        } else {
            Self::Black
        }
    }

    /// Emoji shown in replies.
    #[must_use]
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Green => "🟢",
            Self::Red => "🔴",
            Self::Black => "⚫",
        }
    }
}

/// What the player bets on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bet {
    /// Any red pocket
    Red,
    /// Any black pocket
    Black,
    /// Even pockets, zero excluded
    Even,
    /// Odd pockets
    Odd,
    /// 1 to 18
    Low,
    /// 19 to 36
    High,
    /// A single pocket
    Number(u8),
}

impl Bet {
    /// Total payout multiplier on a win, stake included.
    #[must_use]
    pub const fn multiplier(self) -> i64 {
        match self {
            Self::Number(_) => 36,
            _ => 2,
        }
    }

    /// Whether the bet wins on `pocket`.
    #[must_use]
    pub fn wins(self, pocket: u8) -> bool {
        if pocket == 0 {
            return self == Self::Number(0);
        }
        match self {
            Self::Red => Color::of(pocket) == Color::Red,
            Self::Black => Color::of(pocket) == Color::Black,
            Self::Even => pocket % 2 == 0,
            Self::Odd => pocket % 2 == 1,
            Self::Low => pocket <= 18,
            Self::High => pocket >= 19,
            Self::Number(n) => n == pocket,
        }
    }
}

impl fmt::Display for Bet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Red => f.write_str("red"),
            Self::Black => f.write_str("black"),
            Self::Even => f.write_str("even"),
            Self::Odd => f.write_str("odd"),
            Self::Low => f.write_str("low"),
            Self::High => f.write_str("high"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for Bet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "red" | "r" => Ok(Self::Red),
            "black" | "b" => Ok(Self::Black),
            "even" => Ok(Self::Even),
            "odd" => Ok(Self::Odd),
            "low" | "1-18" => Ok(Self::Low),
            "high" | "19-36" => Ok(Self::High),
            other => other
                .parse::<u8>()
                .ok()
                .filter(|n| *n <= MAX_POCKET)
                .map(Self::Number)
                .ok_or_else(|| {
                    Error::rule(
                        "Bet on red, black, even, odd, low, high or a number from 0 to 36",
                    )
                }),
        }
    }
}

/// Spins the wheel with the thread RNG.
#[must_use]
pub fn spin() -> u8 {
    rand::thread_rng().gen_range(0..=MAX_POCKET)
}

/// Outcome of a spin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinResult {
    #[allow(missing_docs)]
    pub bet: Bet,
    /// Pocket the ball landed in
    pub pocket: u8,
    #[allow(missing_docs)]
    pub won: bool,
    /// Net wallet change: profit on a win, minus the stake on a loss
    pub net: i64,
    /// Wallet afterwards
    pub balance: i64,
}

/// Plays one round with a pre-rolled `pocket`.
#[instrument(skip(eco))]
pub async fn play(
    eco: &Economy,
    user_id: i64,
    bet: Bet,
    amount: i64,
    pocket: u8,
) -> Result<SpinResult> {
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }

    let _locks = eco.locks.acquire(&[user_id]).await;
    let now = Utc::now();
    let txn = eco.db.begin().await?;

    cooldown::ensure_ready(&txn, user_id, CooldownKind::Roulette, now).await?;
    let wallet = ledger::lock_user(&txn, user_id).await?;
    if wallet.balance < amount {
        return Err(Error::InsufficientFunds {
            current: wallet.balance,
            required: amount,
        });
    }

    let won = bet.wins(pocket);
    let posting = if won {
        let profit = amount
            .checked_mul(bet.multiplier() - 1)
            .ok_or(Error::InvalidAmount { amount })?;
        Posting::credit(
            user_id,
            profit,
            TransactionKind::RouletteWin,
            format!("Roulette win on {bet} ({pocket})"),
        )
    } else {
        Posting::debit(
            user_id,
            amount,
            TransactionKind::RouletteLoss,
            format!("Roulette loss on {bet} ({pocket})"),
        )
    };
    let change = ledger::post(&txn, posting).await?;
    if !won {
        public_bank::credit(&txn, amount, "roulette").await?;
    }
    cooldown::start(
        &txn,
        user_id,
        CooldownKind::Roulette,
        eco.config.casino.roulette_cooldown_secs,
        now,
    )
    .await?;

    txn.commit().await?;
    info!(user_id, %bet, pocket, won, "roulette spin");

    Ok(SpinResult {
        bet,
        pocket,
        won,
        net: change.applied(),
        balance: change.after,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_bet_parsing() {
        assert_eq!("RED".parse::<Bet>().unwrap(), Bet::Red);
        assert_eq!("19-36".parse::<Bet>().unwrap(), Bet::High);
        assert_eq!("0".parse::<Bet>().unwrap(), Bet::Number(0));
        assert_eq!("36".parse::<Bet>().unwrap(), Bet::Number(36));
        assert!("37".parse::<Bet>().is_err());
        assert!("green".parse::<Bet>().is_err());
    }

    #[test]
    fn test_zero_loses_outside_bets() {
        for bet in [Bet::Red, Bet::Black, Bet::Even, Bet::Odd, Bet::Low, Bet::High] {
            assert!(!bet.wins(0), "{bet} should lose on zero");
        }
        assert!(Bet::Number(0).wins(0));
    }

    #[test]
    fn test_wheel_layout() {
        assert_eq!(Color::of(1), Color::Red);
        assert_eq!(Color::of(2), Color::Black);
        assert_eq!(Color::of(19), Color::Red);
        assert_eq!(Color::of(20), Color::Black);
        assert!(Bet::Even.wins(2));
        assert!(Bet::Low.wins(18));
        assert!(Bet::High.wins(19));
        assert_eq!((1..=36).filter(|p| Bet::Red.wins(*p)).count(), 18);
    }

    #[tokio::test]
    async fn test_win_credits_profit() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 100).await?;

        let result = play(&eco, 1, Bet::Red, 50, 1).await?;
        assert!(result.won);
        assert_eq!(result.net, 50);
        assert_eq!(result.balance, 150);
        Ok(())
    }

    #[tokio::test]
    async fn test_straight_number_pays_36x() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 10).await?;

        let result = play(&eco, 1, Bet::Number(17), 10, 17).await?;
        assert_eq!(result.balance, 360);
        Ok(())
    }

    #[tokio::test]
    async fn test_loss_feeds_public_bank_and_cooldown() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 100).await?;

        let result = play(&eco, 1, Bet::Black, 40, 0).await?;
        assert!(!result.won);
        assert_eq!(result.balance, 60);
        assert_eq!(public_bank::stats(&eco.db).await?.balance, 40);

        let again = play(&eco, 1, Bet::Black, 10, 2).await;
        assert!(matches!(again, Err(Error::OnCooldown { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_stake_must_be_covered() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 10).await?;

        // a winning spin still needs the stake up front
        let result = play(&eco, 1, Bet::Red, 20, 1).await;
        assert!(matches!(result, Err(Error::InsufficientFunds { current: 10, .. })));
        assert!(matches!(play(&eco, 1, Bet::Red, 0, 1).await, Err(Error::InvalidAmount { .. })));
        Ok(())
    }
}

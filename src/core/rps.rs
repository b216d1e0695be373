//! Rock-paper-scissors duels for PrissBucks.
//!
//! Open challenges live in process memory only and expire after a few minutes. Nothing is
//! debited until the opponent accepts.

use crate::{
    core::{
        Economy,
        cooldown::{self, CooldownKind},
        ledger::{self, Posting, TransactionKind},
        public_bank,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::TransactionTrait;
use std::{
    collections::HashMap,
    fmt,
    str::FromStr,
    sync::{Mutex, PoisonError},
};
use tracing::{info, instrument};

/// A hand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

impl Move {
    /// Whether `self` beats `other`.
    #[must_use]
    pub const fn beats(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Rock, Self::Scissors) | (Self::Paper, Self::Rock) | (Self::Scissors, Self::Paper)
        )
    }

    /// Emoji shown in replies.
    #[must_use]
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Rock => "🪨",
            Self::Paper => "📄",
            Self::Scissors => "✂️",
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rock => "rock",
            Self::Paper => "paper",
            Self::Scissors => "scissors",
        })
    }
}

impl FromStr for Move {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rock" | "r" => Ok(Self::Rock),
            "paper" | "p" => Ok(Self::Paper),
            "scissors" | "s" => Ok(Self::Scissors),
            _ => Err(Error::rule("Pick rock, paper or scissors")),
        }
    }
}

/// An open challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge {
    #[allow(missing_docs)]
    pub challenger: i64,
    #[allow(missing_docs)]
    pub opponent: i64,
    /// Stake each player puts up
    pub amount: i64,
    /// Hidden move of the challenger
    pub challenger_move: Move,
    #[allow(missing_docs)]
    pub created_at: DateTime<Utc>,
}

impl Challenge {
    fn is_expired(&self, now: DateTime<Utc>, expiry_secs: i64) -> bool {
        now - self.created_at >= Duration::seconds(expiry_secs)
    }
}

/// Pending challenges keyed by `(challenger, opponent)`.
#[derive(Debug, Default)]
pub struct RpsTable {
    pending: Mutex<HashMap<(i64, i64), Challenge>>,
}

impl RpsTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut HashMap<(i64, i64), Challenge>) -> T) -> T {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut pending)
    }

    /// Drops expired challenges and returns how many were removed.
    pub fn prune(&self, now: DateTime<Utc>, expiry_secs: i64) -> usize {
        self.with(|pending| {
            let before = pending.len();
            pending.retain(|_, c| !c.is_expired(now, expiry_secs));
            before - pending.len()
        })
    }

    /// Live challenges waiting for `opponent`.
    pub fn pending_for(
        &self,
        opponent: i64,
        now: DateTime<Utc>,
        expiry_secs: i64,
    ) -> Vec<Challenge> {
        self.prune(now, expiry_secs);
        self.with(|pending| {
            pending
                .values()
                .filter(|c| c.opponent == opponent)
                .copied()
                .collect()
        })
    }
}

/// Result of a duel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    #[allow(missing_docs)]
    ChallengerWins,
    #[allow(missing_docs)]
    OpponentWins,
    /// Both stakes go to the public bank
    Tie,
}

/// Settles a pair of moves.
#[must_use]
pub const fn judge(challenger: Move, opponent: Move) -> Outcome {
    if challenger.beats(opponent) {
        Outcome::ChallengerWins
    } else if opponent.beats(challenger) {
        Outcome::OpponentWins
    } else {
        Outcome::Tie
    }
}

/// A settled duel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duel {
    #[allow(missing_docs)]
    pub challenge: Challenge,
    #[allow(missing_docs)]
    pub opponent_move: Move,
    #[allow(missing_docs)]
    pub outcome: Outcome,
    /// Challenger wallet afterwards
    pub challenger_balance: i64,
    /// Opponent wallet afterwards
    pub opponent_balance: i64,
}

/// Opens (or replaces) a challenge against `opponent`.
#[instrument(skip(eco, table))]
pub async fn challenge(
    eco: &Economy,
    table: &RpsTable,
    challenger: i64,
    opponent: i64,
    amount: i64,
    challenger_move: Move,
) -> Result<Challenge> {
    if challenger == opponent {
        return Err(Error::rule("You cannot challenge yourself"));
    }
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }

    let now = Utc::now();
    cooldown::ensure_ready(&eco.db, challenger, CooldownKind::Rps, now).await?;
    let current = ledger::balance_of(&eco.db, challenger).await?;
    if current < amount {
        return Err(Error::InsufficientFunds {
            current,
            required: amount,
        });
    }

    let created = Challenge {
        challenger,
        opponent,
        amount,
        challenger_move,
        created_at: now,
    };
    table.with(|pending| {
        pending.insert((challenger, opponent), created);
    });
    info!(challenger, opponent, amount, "rps challenge opened");
    Ok(created)
}

/// Accepts the challenge `challenger` sent to `opponent` and settles it.
#[instrument(skip(eco, table))]
pub async fn accept(
    eco: &Economy,
    table: &RpsTable,
    opponent: i64,
    challenger: i64,
    opponent_move: Move,
) -> Result<Duel> {
    let cfg = &eco.config.casino;
    let now = Utc::now();
    table.prune(now, cfg.rps_expiry_secs);
    let found = table
        .with(|pending| pending.get(&(challenger, opponent)).copied())
        .ok_or_else(|| Error::not_found("Challenge"))?;

    let _locks = eco.locks.acquire(&[challenger, opponent]).await;
    let txn = eco.db.begin().await?;

    cooldown::ensure_ready(&txn, opponent, CooldownKind::Rps, now).await?;
    for user_id in [challenger, opponent] {
        let wallet = ledger::lock_user(&txn, user_id).await?;
        if wallet.balance < found.amount {
            return Err(Error::InsufficientFunds {
                current: wallet.balance,
                required: found.amount,
            });
        }
    }

    let amount = found.amount;
    let outcome = judge(found.challenger_move, opponent_move);
    let (challenger_change, opponent_change) = match outcome {
        Outcome::ChallengerWins | Outcome::OpponentWins => {
            let (winner, loser) = if outcome == Outcome::ChallengerWins {
                (challenger, opponent)
            } else {
                (opponent, challenger)
            };
            let lost = ledger::post(
                &txn,
                Posting::debit(
                    loser,
                    amount,
                    TransactionKind::RpsLoss,
                    "Lost a rock-paper-scissors duel",
                )
                .with_related(winner),
            )
            .await?;
            let won = ledger::post(
                &txn,
                Posting::credit(
                    winner,
                    amount,
                    TransactionKind::RpsWin,
                    "Won a rock-paper-scissors duel",
                )
                .with_related(loser),
            )
            .await?;
            if winner == challenger { (won, lost) } else { (lost, won) }
        }
        Outcome::Tie => {
            let mut changes = Vec::with_capacity(2);
            for (user_id, other) in [(challenger, opponent), (opponent, challenger)] {
                changes.push(
                    ledger::post(
                        &txn,
                        Posting::debit(
                            user_id,
                            amount,
                            TransactionKind::RpsTie,
                            "Rock-paper-scissors tie",
                        )
                        .with_related(other),
                    )
                    .await?,
                );
            }
            public_bank::credit(&txn, amount * 2, "rps_tie").await?;
            (changes[0], changes[1])
        }
    };

    for user_id in [challenger, opponent] {
        cooldown::start(&txn, user_id, CooldownKind::Rps, cfg.rps_cooldown_secs, now).await?;
    }
    txn.commit().await?;

    table.with(|pending| {
        pending.remove(&(challenger, opponent));
    });
    info!(challenger, opponent, ?outcome, amount, "rps duel settled");

    Ok(Duel {
        challenge: found,
        opponent_move,
        outcome,
        challenger_balance: challenger_change.after,
        opponent_balance: opponent_change.after,
    })
}

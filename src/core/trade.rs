//! Player-to-player trades of PrissBucks and pets.
//!
//! A trade stays `pending` while both sides build their offers. Any change to an offer clears
//! both confirmations; once both participants have confirmed the same offers, everything is
//! swapped in one database transaction.

use crate::{
    core::{
        Economy,
        ledger::{self, Posting, TransactionKind},
        pet::pets_in_pending_trades,
    },
    entities::{Trade, TradePet, UserPet, trade, trade_pet, user_pet},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    Condition, DatabaseTransaction, JoinType, PaginatorTrait, QueryOrder, QuerySelect,
    RelationTrait, Set, TransactionTrait, prelude::*,
};
use tracing::{info, instrument};

/// Status of a trade still being negotiated.
pub const PENDING: &str = "pending";
/// Status of a settled trade.
pub const COMPLETED: &str = "completed";
/// Status of an abandoned trade.
pub const CANCELLED: &str = "cancelled";

/// A trade with the pets offered in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeDetails {
    #[allow(missing_docs)]
    pub trade: trade::Model,
    #[allow(missing_docs)]
    pub pets: Vec<trade_pet::Model>,
}

/// What a confirmation led to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Still waiting for the other participant
    Waiting(trade::Model),
    /// Both confirmed and the exchange went through
    Completed(TradeDetails),
}

/// Trading record of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TradeStats {
    #[allow(missing_docs)]
    pub completed: u64,
    #[allow(missing_docs)]
    pub cancelled: u64,
    /// PrissBucks given away in completed trades
    pub pb_sent: i64,
    /// PrissBucks received in completed trades
    pub pb_received: i64,
    /// Pets given away in completed trades
    pub pets_sent: u64,
    /// Pets received in completed trades
    pub pets_received: u64,
}

/// Latest pending trade a user takes part in.
pub async fn find_pending(eco: &Economy, user_id: i64) -> Result<Option<trade::Model>> {
    Trade::find()
        .filter(trade::Column::Status.eq(PENDING))
        .filter(
            trade::Column::InitiatorId
                .eq(user_id)
                .or(trade::Column::PartnerId.eq(user_id)),
        )
        .order_by_desc(trade::Column::Id)
        .one(&eco.db)
        .await
        .map_err(Into::into)
}

/// A trade and its pets.
pub async fn details(eco: &Economy, trade_id: i64) -> Result<TradeDetails> {
    let trade = Trade::find_by_id(trade_id)
        .one(&eco.db)
        .await?
        .ok_or_else(|| Error::not_found(format!("Trade #{trade_id}")))?;
    let pets = trade_pets(&eco.db, trade_id).await?;
    Ok(TradeDetails { trade, pets })
}

async fn trade_pets<C>(conn: &C, trade_id: i64) -> Result<Vec<trade_pet::Model>>
where
    C: ConnectionTrait,
{
    TradePet::find()
        .filter(trade_pet::Column::TradeId.eq(trade_id))
        .order_by_asc(trade_pet::Column::Id)
        .all(conn)
        .await
        .map_err(Into::into)
}

/// Opens a trade with `partner_id`.
#[instrument(skip(eco))]
pub async fn create(eco: &Economy, initiator_id: i64, partner_id: i64) -> Result<trade::Model> {
    if initiator_id == partner_id {
        return Err(Error::rule("You cannot trade with yourself"));
    }

    let _locks = eco.locks.acquire(&[initiator_id, partner_id]).await;
    let txn = eco.db.begin().await?;

    let existing = Trade::find()
        .filter(trade::Column::Status.eq(PENDING))
        .filter(
            Condition::any()
                .add(
                    trade::Column::InitiatorId
                        .eq(initiator_id)
                        .and(trade::Column::PartnerId.eq(partner_id)),
                )
                .add(
                    trade::Column::InitiatorId
                        .eq(partner_id)
                        .and(trade::Column::PartnerId.eq(initiator_id)),
                ),
        )
        .count(&txn)
        .await?;
    if existing > 0 {
        return Err(Error::rule("You already have a pending trade with this player"));
    }

    let created = trade::ActiveModel {
        initiator_id: Set(initiator_id),
        partner_id: Set(partner_id),
        initiator_pb: Set(0),
        partner_pb: Set(0),
        initiator_confirmed: Set(false),
        partner_confirmed: Set(false),
        status: Set(PENDING.to_string()),
        created_at: Set(Utc::now()),
        completed_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(trade_id = created.id, initiator_id, partner_id, "trade opened");
    Ok(created)
}

/// Reads a pending trade inside `txn`, checking that `user_id` takes part in it.
async fn pending_for_update(
    txn: &DatabaseTransaction,
    trade_id: i64,
    user_id: i64,
) -> Result<trade::Model> {
    let trade = Trade::find_by_id(trade_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| Error::not_found(format!("Trade #{trade_id}")))?;
    if trade.initiator_id != user_id && trade.partner_id != user_id {
        return Err(Error::rule("You are not part of this trade"));
    }
    if trade.status != PENDING {
        return Err(Error::rule(format!("This trade is already {}", trade.status)));
    }
    Ok(trade)
}

/// Participants of a trade, for lock ordering.
async fn participants(eco: &Economy, trade_id: i64) -> Result<[i64; 2]> {
    let trade = Trade::find_by_id(trade_id)
        .one(&eco.db)
        .await?
        .ok_or_else(|| Error::not_found(format!("Trade #{trade_id}")))?;
    Ok([trade.initiator_id, trade.partner_id])
}

/// Clears both confirmations after an offer changed.
async fn touch(txn: &DatabaseTransaction, trade: trade::Model) -> Result<trade::Model> {
    let mut active: trade::ActiveModel = trade.into();
    active.initiator_confirmed = Set(false);
    active.partner_confirmed = Set(false);
    Ok(active.update(txn).await?)
}

/// Sets how many PrissBucks `user_id` puts into the trade.
#[instrument(skip(eco))]
pub async fn set_pb_offer(
    eco: &Economy,
    trade_id: i64,
    user_id: i64,
    amount: i64,
) -> Result<trade::Model> {
    if amount < 0 {
        return Err(Error::InvalidAmount { amount });
    }
    let _locks = eco.locks.acquire(&participants(eco, trade_id).await?).await;
    let txn = eco.db.begin().await?;

    let trade = pending_for_update(&txn, trade_id, user_id).await?;
    let current = ledger::balance_of(&txn, user_id).await?;
    if current < amount {
        return Err(Error::InsufficientFunds {
            current,
            required: amount,
        });
    }

    let mut active: trade::ActiveModel = trade.clone().into();
    if trade.initiator_id == user_id {
        active.initiator_pb = Set(amount);
    } else {
        active.partner_pb = Set(amount);
    }
    let trade = touch(&txn, active.update(&txn).await?).await?;

    txn.commit().await?;
    Ok(trade)
}

/// Puts one of `user_id`'s pets into the trade.
#[instrument(skip(eco))]
pub async fn add_pet(
    eco: &Economy,
    trade_id: i64,
    user_id: i64,
    user_pet_id: i64,
) -> Result<TradeDetails> {
    let _locks = eco.locks.acquire(&participants(eco, trade_id).await?).await;
    let txn = eco.db.begin().await?;

    let trade = pending_for_update(&txn, trade_id, user_id).await?;
    let owned = UserPet::find_by_id(user_pet_id)
        .filter(user_pet::Column::UserId.eq(user_id))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found(format!("Pet #{user_pet_id}")))?;
    if owned.is_active {
        return Err(Error::rule("Unequip the pet before trading it"));
    }
    if pets_in_pending_trades(&txn, user_id).await?.contains(&owned.id) {
        return Err(Error::rule("That pet is already offered in a pending trade"));
    }

    trade_pet::ActiveModel {
        trade_id: Set(trade.id),
        user_pet_id: Set(owned.id),
        owner_id: Set(user_id),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    let trade = touch(&txn, trade).await?;
    let pets = trade_pets(&txn, trade.id).await?;

    txn.commit().await?;
    Ok(TradeDetails { trade, pets })
}

/// Takes one of `user_id`'s pets back out of the trade.
#[instrument(skip(eco))]
pub async fn remove_pet(
    eco: &Economy,
    trade_id: i64,
    user_id: i64,
    user_pet_id: i64,
) -> Result<TradeDetails> {
    let _locks = eco.locks.acquire(&participants(eco, trade_id).await?).await;
    let txn = eco.db.begin().await?;

    let trade = pending_for_update(&txn, trade_id, user_id).await?;
    let removed = TradePet::delete_many()
        .filter(trade_pet::Column::TradeId.eq(trade.id))
        .filter(trade_pet::Column::UserPetId.eq(user_pet_id))
        .filter(trade_pet::Column::OwnerId.eq(user_id))
        .exec(&txn)
        .await?;
    if removed.rows_affected == 0 {
        return Err(Error::not_found(format!("Pet #{user_pet_id} in this trade")));
    }
    let trade = touch(&txn, trade).await?;
    let pets = trade_pets(&txn, trade.id).await?;

    txn.commit().await?;
    Ok(TradeDetails { trade, pets })
}

/// Swaps PB and pets. The caller holds both user locks and passes a pending trade.
async fn settle(txn: &DatabaseTransaction, trade: trade::Model) -> Result<TradeDetails> {
    let (a, b) = (trade.initiator_id, trade.partner_id);

    for (user_id, offer) in [(a, trade.initiator_pb), (b, trade.partner_pb)] {
        let wallet = ledger::lock_user(txn, user_id).await?;
        if wallet.balance < offer {
            return Err(Error::InsufficientFunds {
                current: wallet.balance,
                required: offer,
            });
        }
    }

    for (from, to, offer) in [(a, b, trade.initiator_pb), (b, a, trade.partner_pb)] {
        if offer == 0 {
            continue;
        }
        ledger::post(
            txn,
            Posting::debit(from, offer, TransactionKind::TradeSend, format!("Trade #{}", trade.id))
                .with_related(to),
        )
        .await?;
        ledger::post(
            txn,
            Posting::credit(
                to,
                offer,
                TransactionKind::TradeReceive,
                format!("Trade #{}", trade.id),
            )
            .with_related(from),
        )
        .await?;
    }

    let pets = trade_pets(txn, trade.id).await?;
    for offered in &pets {
        let owned = UserPet::find_by_id(offered.user_pet_id)
            .filter(user_pet::Column::UserId.eq(offered.owner_id))
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or_else(|| {
                Error::rule(format!("Pet #{} is no longer available", offered.user_pet_id))
            })?;
        if owned.is_active {
            return Err(Error::rule(format!("Pet #{} is equipped", owned.id)));
        }
        let receiver = if offered.owner_id == a { b } else { a };
        let mut active: user_pet::ActiveModel = owned.into();
        active.user_id = Set(receiver);
        active.is_active = Set(false);
        active.update(txn).await?;
    }

    let mut active: trade::ActiveModel = trade.into();
    active.status = Set(COMPLETED.to_string());
    active.completed_at = Set(Some(Utc::now()));
    let trade = active.update(txn).await?;

    info!(trade_id = trade.id, pets = pets.len(), "trade completed");
    Ok(TradeDetails { trade, pets })
}

/// Confirms the current offers. The second confirmation completes the trade.
#[instrument(skip(eco))]
pub async fn confirm(eco: &Economy, trade_id: i64, user_id: i64) -> Result<ConfirmOutcome> {
    let _locks = eco.locks.acquire(&participants(eco, trade_id).await?).await;
    let txn = eco.db.begin().await?;

    let trade = pending_for_update(&txn, trade_id, user_id).await?;
    let mut active: trade::ActiveModel = trade.clone().into();
    if trade.initiator_id == user_id {
        active.initiator_confirmed = Set(true);
    } else {
        active.partner_confirmed = Set(true);
    }
    let trade = active.update(&txn).await?;

    let outcome = if trade.initiator_confirmed && trade.partner_confirmed {
        ConfirmOutcome::Completed(settle(&txn, trade).await?)
    } else {
        ConfirmOutcome::Waiting(trade)
    };
    txn.commit().await?;
    Ok(outcome)
}

/// Completes a trade both participants already confirmed.
#[instrument(skip(eco))]
pub async fn finalize(eco: &Economy, trade_id: i64, user_id: i64) -> Result<TradeDetails> {
    let _locks = eco.locks.acquire(&participants(eco, trade_id).await?).await;
    let txn = eco.db.begin().await?;

    let trade = pending_for_update(&txn, trade_id, user_id).await?;
    if !(trade.initiator_confirmed && trade.partner_confirmed) {
        return Err(Error::rule("Both players must confirm the trade first"));
    }
    let done = settle(&txn, trade).await?;
    txn.commit().await?;
    Ok(done)
}

/// Abandons a pending trade. Offered pets simply stay with their owners.
#[instrument(skip(eco))]
pub async fn cancel(eco: &Economy, trade_id: i64, user_id: i64) -> Result<trade::Model> {
    let txn = eco.db.begin().await?;
    let trade = pending_for_update(&txn, trade_id, user_id).await?;

    let mut active: trade::ActiveModel = trade.into();
    active.status = Set(CANCELLED.to_string());
    active.completed_at = Set(Some(Utc::now()));
    let trade = active.update(&txn).await?;

    txn.commit().await?;
    info!(trade_id, user_id, "trade cancelled");
    Ok(trade)
}

/// Finished trades of a user, newest first.
pub async fn history(eco: &Economy, user_id: i64, limit: u64) -> Result<Vec<trade::Model>> {
    Trade::find()
        .filter(trade::Column::Status.ne(PENDING))
        .filter(
            trade::Column::InitiatorId
                .eq(user_id)
                .or(trade::Column::PartnerId.eq(user_id)),
        )
        .order_by_desc(trade::Column::Id)
        .limit(limit.clamp(1, eco.config.leaderboard.max_entries))
        .all(&eco.db)
        .await
        .map_err(Into::into)
}

/// Totals over a user's finished trades.
pub async fn stats(eco: &Economy, user_id: i64) -> Result<TradeStats> {
    let trades = Trade::find()
        .filter(trade::Column::Status.ne(PENDING))
        .filter(
            trade::Column::InitiatorId
                .eq(user_id)
                .or(trade::Column::PartnerId.eq(user_id)),
        )
        .all(&eco.db)
        .await?;

    let mut stats = TradeStats::default();
    for t in &trades {
        if t.status == CANCELLED {
            stats.cancelled += 1;
            continue;
        }
        stats.completed += 1;
        let (sent, received) = if t.initiator_id == user_id {
            (t.initiator_pb, t.partner_pb)
        } else {
            (t.partner_pb, t.initiator_pb)
        };
        stats.pb_sent += sent;
        stats.pb_received += received;
    }

    let completed_pets = TradePet::find()
        .join(JoinType::InnerJoin, trade_pet::Relation::Trade.def())
        .filter(trade::Column::Status.eq(COMPLETED))
        .filter(
            trade::Column::InitiatorId
                .eq(user_id)
                .or(trade::Column::PartnerId.eq(user_id)),
        )
        .all(&eco.db)
        .await?;
    for p in completed_pets {
        if p.owner_id == user_id {
            stats.pets_sent += 1;
        } else {
            stats.pets_received += 1;
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::{core::pet, test_utils::*};

    async fn hatch(eco: &Economy, user_id: i64) -> Result<i64> {
        fund(&eco.db, user_id, 500).await?;
        let roll = pet::EggRoll { index: 0, gold: false };
        Ok(pet::open_egg(eco, user_id, "basic", roll).await?.pet.owned.id)
    }

    #[tokio::test]
    async fn test_full_trade() -> Result<()> {
        let eco = setup_pet_economy().await?;
        let pet_of_1 = hatch(&eco, 1).await?;
        fund(&eco.db, 2, 300).await?;

        let t = create(&eco, 1, 2).await?;
        add_pet(&eco, t.id, 1, pet_of_1).await?;
        set_pb_offer(&eco, t.id, 2, 300).await?;

        assert!(matches!(confirm(&eco, t.id, 1).await?, ConfirmOutcome::Waiting(_)));
        let ConfirmOutcome::Completed(done) = confirm(&eco, t.id, 2).await? else {
            panic!("trade should complete after both confirmations");
        };
        assert_eq!(done.trade.status, COMPLETED);

        assert_eq!(ledger::balance_of(&eco.db, 1).await?, 300);
        assert_eq!(ledger::balance_of(&eco.db, 2).await?, 0);
        let moved = UserPet::find_by_id(pet_of_1).one(&eco.db).await?.unwrap();
        assert_eq!(moved.user_id, 2);

        let s1 = stats(&eco, 1).await?;
        assert_eq!(s1.completed, 1);
        assert_eq!(s1.pb_received, 300);
        assert_eq!(s1.pets_sent, 1);
        assert_eq!(stats(&eco, 2).await?.pets_received, 1);
        assert_eq!(history(&eco, 2, 10).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_offer_change_resets_confirmations() -> Result<()> {
        let eco = setup_pet_economy().await?;
        fund(&eco.db, 1, 100).await?;
        let t = create(&eco, 1, 2).await?;

        confirm(&eco, t.id, 1).await?;
        let changed = set_pb_offer(&eco, t.id, 1, 50).await?;
        assert!(!changed.initiator_confirmed);

        assert!(matches!(finalize(&eco, t.id, 1).await, Err(Error::Rule { .. })));
        confirm(&eco, t.id, 1).await?;
        assert!(matches!(confirm(&eco, t.id, 2).await?, ConfirmOutcome::Completed(_)));
        assert_eq!(ledger::balance_of(&eco.db, 2).await?, 50);
        Ok(())
    }

    #[tokio::test]
    async fn test_trade_rules() -> Result<()> {
        let eco = setup_pet_economy().await?;
        let pet_of_1 = hatch(&eco, 1).await?;

        assert!(matches!(create(&eco, 1, 1).await, Err(Error::Rule { .. })));
        let t = create(&eco, 1, 2).await?;
        assert!(matches!(create(&eco, 2, 1).await, Err(Error::Rule { .. })));

        // outsiders and other people's pets are refused
        assert!(matches!(set_pb_offer(&eco, t.id, 3, 0).await, Err(Error::Rule { .. })));
        assert!(matches!(add_pet(&eco, t.id, 2, pet_of_1).await, Err(Error::NotFound { .. })));
        assert!(matches!(
            set_pb_offer(&eco, t.id, 2, 10).await,
            Err(Error::InsufficientFunds { .. })
        ));

        pet::equip(&eco, 1, pet_of_1).await?;
        assert!(matches!(add_pet(&eco, t.id, 1, pet_of_1).await, Err(Error::Rule { .. })));
        pet::equip(&eco, 1, pet_of_1).await?;

        add_pet(&eco, t.id, 1, pet_of_1).await?;
        assert!(matches!(add_pet(&eco, t.id, 1, pet_of_1).await, Err(Error::Rule { .. })));
        // a pet in a pending trade cannot be equipped
        assert!(matches!(pet::equip(&eco, 1, pet_of_1).await, Err(Error::Rule { .. })));

        let details = remove_pet(&eco, t.id, 1, pet_of_1).await?;
        assert!(details.pets.is_empty());

        let cancelled = cancel(&eco, t.id, 2).await?;
        assert_eq!(cancelled.status, CANCELLED);
        assert!(matches!(confirm(&eco, t.id, 1).await, Err(Error::Rule { .. })));
        assert_eq!(stats(&eco, 1).await?.cancelled, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_settlement_rechecks_balances() -> Result<()> {
        let eco = setup_pet_economy().await?;
        fund(&eco.db, 1, 100).await?;
        let t = create(&eco, 1, 2).await?;
        set_pb_offer(&eco, t.id, 1, 100).await?;
        confirm(&eco, t.id, 2).await?;

        crate::core::economy::admin_remove(&eco, 1, 60).await?;
        assert!(matches!(
            confirm(&eco, t.id, 1).await,
            Err(Error::InsufficientFunds { .. })
        ));
        assert_eq!(find_pending(&eco, 1).await?.unwrap().id, t.id);
        Ok(())
    }
}

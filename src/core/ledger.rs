//! Ledger - the only place where wallet balances change.
//!
//! Every feature moves PrissBucks through [`post`], inside the caller's database transaction.
//! A posting locks the wallet row, applies the amount with an atomic guarded update and appends
//! a `transaction_logs` row, so a wallet never goes negative and every change is logged with its
//! before and after balance.
//!
//! [`UserLocks`] adds process-local mutual exclusion on top of the row locks. Multi-user
//! operations acquire their locks through [`UserLocks::acquire`], which always locks in ascending
//! user id order.

use crate::{
    entities::{TransactionLog, User, transaction_log, user},
    errors::{Error, Result},
};
use sea_orm::{
    QuerySelect, Set,
    prelude::*,
    sea_query::{Expr, OnConflict},
};
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

/// Once the lock map grows past this many entries, idle entries are dropped.
const LOCK_MAP_PRUNE_THRESHOLD: usize = 1024;

/// Process-local per-user async locks.
#[derive(Debug, Default)]
pub struct UserLocks {
    inner: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

/// Guards returned by [`UserLocks::acquire`]; the locks are released on drop.
#[must_use = "locks are released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LockSet {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl UserLocks {
    /// Creates an empty lock map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks every given user, deduplicated and in ascending id order.
    pub async fn acquire(&self, user_ids: &[i64]) -> LockSet {
        let mut ids = user_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mutexes: Vec<_> = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            if map.len() > LOCK_MAP_PRUNE_THRESHOLD {
                map.retain(|_, m| Arc::strong_count(m) > 1);
            }
            ids.iter()
                .map(|id| Arc::clone(map.entry(*id).or_default()))
                .collect()
        };

        let mut guards = Vec::with_capacity(mutexes.len());
        for mutex in mutexes {
            guards.push(mutex.lock_owned().await);
        }
        LockSet { _guards: guards }
    }

    /// Number of users currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no user has ever been locked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Every kind of wallet movement recorded in `transaction_logs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum TransactionKind {
    Daily,
    DailyBonus,
    MessageReward,
    TransferSent,
    TransferReceived,
    TransferTax,
    ShopPurchase,
    BankDeposit,
    BankWithdraw,
    PublicBankWithdraw,
    DebtPayment,
    DebtAutoRepay,
    LoanTaken,
    LoanRepayment,
    RouletteWin,
    RouletteLoss,
    RpsWin,
    RpsLoss,
    RpsTie,
    StealSuccess,
    StealLoss,
    StealFail,
    StealBlocked,
    HeistWin,
    HeistLoss,
    ClanCreate,
    ClanJoin,
    ClanUpgrade,
    PetEgg,
    ZoneUnlock,
    PetIncome,
    TradeSend,
    TradeReceive,
    AdminAdd,
    AdminRemove,
}

impl TransactionKind {
    /// Value stored in `transaction_logs.transaction_type`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::DailyBonus => "daily_bonus",
            Self::MessageReward => "message_reward",
            Self::TransferSent => "transfer_sent",
            Self::TransferReceived => "transfer_received",
            Self::TransferTax => "transfer_tax",
            Self::ShopPurchase => "shop_purchase",
            Self::BankDeposit => "bank_deposit",
            Self::BankWithdraw => "bank_withdraw",
            Self::PublicBankWithdraw => "public_bank_withdraw",
            Self::DebtPayment => "debt_payment",
            Self::DebtAutoRepay => "debt_auto_repay",
            Self::LoanTaken => "loan_taken",
            Self::LoanRepayment => "loan_repayment",
            Self::RouletteWin => "roulette_win",
            Self::RouletteLoss => "roulette_loss",
            Self::RpsWin => "rps_win",
            Self::RpsLoss => "rps_loss",
            Self::RpsTie => "rps_tie",
            Self::StealSuccess => "steal_success",
            Self::StealLoss => "steal_loss",
            Self::StealFail => "steal_fail",
            Self::StealBlocked => "steal_blocked",
            Self::HeistWin => "heist_win",
            Self::HeistLoss => "heist_loss",
            Self::ClanCreate => "clan_create",
            Self::ClanJoin => "clan_join",
            Self::ClanUpgrade => "clan_upgrade",
            Self::PetEgg => "pet_egg",
            Self::ZoneUnlock => "zone_unlock",
            Self::PetIncome => "pet_income",
            Self::TradeSend => "trade_send",
            Self::TradeReceive => "trade_receive",
            Self::AdminAdd => "admin_add",
            Self::AdminRemove => "admin_remove",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do when a debit exceeds the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverdraftPolicy {
    /// Fail with [`Error::InsufficientFunds`]
    Reject,
    /// Take whatever is left, down to zero
    Clamp,
}

/// A single requested wallet movement.
#[derive(Debug, Clone)]
pub struct Posting {
    /// Wallet owner
    pub user_id: i64,
    /// Positive credit or negative debit
    pub amount: i64,
    /// Log type
    pub kind: TransactionKind,
    /// Human-readable log description
    pub description: String,
    /// Counterparty, if any
    pub related_user_id: Option<i64>,
    /// Behaviour when the debit exceeds the balance
    pub policy: OverdraftPolicy,
}

impl Posting {
    /// Adds `amount` to the wallet.
    pub fn credit(
        user_id: i64,
        amount: i64,
        kind: TransactionKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            amount,
            kind,
            description: description.into(),
            related_user_id: None,
            policy: OverdraftPolicy::Reject,
        }
    }

    /// Removes `amount` from the wallet, failing if the wallet cannot cover it.
    pub fn debit(
        user_id: i64,
        amount: i64,
        kind: TransactionKind,
        description: impl Into<String>,
    ) -> Self {
        Self::credit(user_id, -amount, kind, description)
    }

    /// Records the counterparty of the movement.
    #[must_use]
    pub fn with_related(mut self, related_user_id: i64) -> Self {
        self.related_user_id = Some(related_user_id);
        self
    }

    /// Takes at most the current balance instead of failing.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.policy = OverdraftPolicy::Clamp;
        self
    }
}

/// Result of a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChange {
    /// Wallet owner
    pub user_id: i64,
    /// Balance before the posting
    pub before: i64,
    /// Balance after the posting
    pub after: i64,
}

impl BalanceChange {
    /// Amount actually applied (differs from the request when clamped).
    #[must_use]
    pub const fn applied(&self) -> i64 {
        self.after - self.before
    }
}

/// Creates the wallet row if it does not exist yet and returns it.
pub async fn ensure_user<C>(conn: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let row = user::ActiveModel {
        user_id: Set(user_id),
        balance: Set(0),
        last_daily: Set(None),
        pet_last_claim: Set(None),
        has_defense: Set(false),
        timeout_tokens: Set(0),
        created_at: Set(chrono::Utc::now()),
    };

    User::insert(row)
        .on_conflict(
            OnConflict::column(user::Column::UserId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    User::find_by_id(user_id)
        .one(conn)
        .await?
        .ok_or_else(|| Error::not_found(format!("Wallet of user {user_id}")))
}

/// Reads a wallet with an exclusive row lock, creating it if needed.
pub async fn lock_user<C>(conn: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    ensure_user(conn, user_id).await?;
    User::find_by_id(user_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| Error::not_found(format!("Wallet of user {user_id}")))
}

/// Current wallet balance, 0 for unknown users.
pub async fn balance_of<C>(conn: &C, user_id: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    Ok(User::find_by_id(user_id)
        .one(conn)
        .await?
        .map_or(0, |u| u.balance))
}

/// Applies a posting and logs it. Must run inside a database transaction.
///
/// A zero amount (or a clamped debit on an empty wallet) changes nothing and writes no log.
pub async fn post<C>(conn: &C, posting: Posting) -> Result<BalanceChange>
where
    C: ConnectionTrait,
{
    let wallet = lock_user(conn, posting.user_id).await?;
    let before = wallet.balance;

    let target = before
        .checked_add(posting.amount)
        .ok_or(Error::InvalidAmount {
            amount: posting.amount,
        })?;
    let after = match (target < 0, posting.policy) {
        (false, _) => target,
        (true, OverdraftPolicy::Clamp) => 0,
        (true, OverdraftPolicy::Reject) => {
            return Err(Error::InsufficientFunds {
                current: before,
                required: -posting.amount,
            });
        }
    };
    let applied = after - before;

    if applied == 0 {
        return Ok(BalanceChange {
            user_id: posting.user_id,
            before,
            after,
        });
    }

    // balance = balance + applied, only while the result stays non-negative
    let updated = User::update_many()
        .col_expr(
            user::Column::Balance,
            Expr::col(user::Column::Balance).add(applied),
        )
        .filter(user::Column::UserId.eq(posting.user_id))
        .filter(user::Column::Balance.gte(-applied))
        .exec(conn)
        .await?;

    if updated.rows_affected != 1 {
        return Err(Error::InsufficientFunds {
            current: before,
            required: -applied,
        });
    }

    transaction_log::ActiveModel {
        user_id: Set(posting.user_id),
        transaction_type: Set(posting.kind.as_str().to_string()),
        amount: Set(applied),
        balance_before: Set(before),
        balance_after: Set(after),
        description: Set(posting.description),
        related_user_id: Set(posting.related_user_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    debug!(
        user_id = posting.user_id,
        kind = %posting.kind,
        applied,
        after,
        "wallet updated"
    );

    Ok(BalanceChange {
        user_id: posting.user_id,
        before,
        after,
    })
}

/// Latest log rows for a user, newest first.
pub async fn recent_logs<C>(
    conn: &C,
    user_id: i64,
    limit: u64,
) -> Result<Vec<transaction_log::Model>>
where
    C: ConnectionTrait,
{
    use sea_orm::QueryOrder;

    TransactionLog::find()
        .filter(transaction_log::Column::UserId.eq(user_id))
        .order_by_desc(transaction_log::Column::Id)
        .limit(limit)
        .all(conn)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase, TransactionTrait};
    use std::time::Duration;

    #[tokio::test]
    async fn test_credit_creates_wallet_and_logs() -> Result<()> {
        let db = setup_test_db().await?;

        let txn = db.begin().await?;
        let change = post(
            &txn,
            Posting::credit(1, 100, TransactionKind::AdminAdd, "seed"),
        )
        .await?;
        txn.commit().await?;

        assert_eq!(change.before, 0);
        assert_eq!(change.after, 100);
        assert_eq!(balance_of(&db, 1).await?, 100);

        let logs = recent_logs(&db, 1, 10).await?;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].transaction_type, "admin_add");
        assert_eq!(logs[0].balance_after - logs[0].balance_before, logs[0].amount);
        Ok(())
    }

    #[tokio::test]
    async fn test_debit_rejects_overdraft() -> Result<()> {
        let db = setup_test_db().await?;
        fund(&db, 1, 30).await?;

        let txn = db.begin().await?;
        let result = post(
            &txn,
            Posting::debit(1, 50, TransactionKind::ShopPurchase, "too expensive"),
        )
        .await;
        txn.rollback().await?;

        assert!(matches!(
            result,
            Err(Error::InsufficientFunds {
                current: 30,
                required: 50
            })
        ));
        assert_eq!(balance_of(&db, 1).await?, 30);
        assert_eq!(recent_logs(&db, 1, 10).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_clamped_debit_stops_at_zero() -> Result<()> {
        let db = setup_test_db().await?;
        fund(&db, 1, 30).await?;

        let txn = db.begin().await?;
        let change = post(
            &txn,
            Posting::debit(1, 50, TransactionKind::AdminRemove, "penalty").clamped(),
        )
        .await?;
        txn.commit().await?;

        assert_eq!(change.applied(), -30);
        assert_eq!(balance_of(&db, 1).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_posting_writes_nothing() -> Result<()> {
        let db = setup_test_db().await?;

        let txn = db.begin().await?;
        let change = post(&txn, Posting::credit(7, 0, TransactionKind::Daily, "")).await?;
        txn.commit().await?;

        assert_eq!(change.applied(), 0);
        assert!(recent_logs(&db, 7, 10).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_related_user_recorded() -> Result<()> {
        let db = setup_test_db().await?;

        let txn = db.begin().await?;
        post(
            &txn,
            Posting::credit(1, 5, TransactionKind::TransferReceived, "gift").with_related(2),
        )
        .await?;
        txn.commit().await?;

        let logs = recent_logs(&db, 1, 1).await?;
        assert_eq!(logs[0].related_user_id, Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_user_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let first = ensure_user(&db, 42).await?;
        let second = ensure_user(&db, 42).await?;
        assert_eq!(first, second);
        assert_eq!(first.balance, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_database_error_propagates() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_errors([sea_orm::DbErr::Custom("disk full".to_string())])
            .into_connection();

        let result = ensure_user(&db, 1).await;
        assert!(matches!(result, Err(Error::Database(_))));
    }

    #[tokio::test]
    async fn test_user_locks_serialize_same_user() {
        let locks = Arc::new(UserLocks::new());
        let held = locks.acquire(&[2, 1, 2]).await;
        assert_eq!(locks.len(), 2);

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(&[1]).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(held);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_transaction_kind_strings() {
        assert_eq!(TransactionKind::TransferSent.as_str(), "transfer_sent");
        assert_eq!(TransactionKind::StealBlocked.to_string(), "steal_blocked");
    }
}

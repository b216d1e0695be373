//! Private bank accounts.
//!
//! Money in the bank cannot be stolen or gambled. Deposits are taxed and capped per day, and
//! accounts above a threshold pay a daily maintenance fee. Taxes and fees go to the public bank.

use crate::{
    config::economy::BankConfig,
    core::{
        Economy, fraction_of,
        ledger::{self, Posting, TransactionKind},
        public_bank,
    },
    entities::{UserBank, user_bank},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{QuerySelect, Set, TransactionTrait, prelude::*, sea_query::OnConflict};
use tracing::{info, instrument};

/// Outcome of a deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deposit {
    /// Amount taken from the wallet
    pub gross: i64,
    /// Tax sent to the public bank
    pub tax: i64,
    /// Amount credited to the bank account
    pub net: i64,
    /// Maintenance fee charged before the deposit, if any
    pub maintenance_fee: i64,
    /// Bank balance afterwards
    pub bank_balance: i64,
    /// Wallet afterwards
    pub wallet_balance: i64,
}

/// Outcome of a withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankWithdrawal {
    /// Amount moved to the wallet
    pub amount: i64,
    /// Maintenance fee charged before the withdrawal, if any
    pub maintenance_fee: i64,
    /// Bank balance afterwards
    pub bank_balance: i64,
    /// Wallet afterwards
    pub wallet_balance: i64,
}

/// Tax on a deposit: a percentage, at least 1 PB.
#[must_use]
pub fn deposit_tax(amount: i64, cfg: &BankConfig) -> i64 {
    fraction_of(amount, cfg.deposit_tax_rate).max(1)
}

async fn lock_account<C>(conn: &C, user_id: i64, now: DateTime<Utc>) -> Result<user_bank::Model>
where
    C: ConnectionTrait,
{
    let row = user_bank::ActiveModel {
        user_id: Set(user_id),
        balance: Set(0),
        total_deposited: Set(0),
        total_withdrawn: Set(0),
        total_fees_paid: Set(0),
        daily_deposit: Set(0),
        last_deposit_reset: Set(now),
        last_fee_payment: Set(None),
        created_at: Set(now),
    };
    UserBank::insert(row)
        .on_conflict(
            OnConflict::column(user_bank::Column::UserId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    UserBank::find_by_id(user_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| Error::not_found("Bank account"))
}

/// Charges the daily maintenance fee if it is due. Returns the updated account and the fee.
async fn charge_maintenance<C>(
    conn: &C,
    cfg: &BankConfig,
    account: user_bank::Model,
    now: DateTime<Utc>,
) -> Result<(user_bank::Model, i64)>
where
    C: ConnectionTrait,
{
    let due = account
        .last_fee_payment
        .is_none_or(|last| now - last >= Duration::seconds(cfg.fee_interval_secs));
    if account.balance <= cfg.maintenance_threshold || !due {
        return Ok((account, 0));
    }

    let fee = fraction_of(account.balance, cfg.maintenance_fee_rate)
        .max(1)
        .min(account.balance);
    let user_id = account.user_id;
    let mut active: user_bank::ActiveModel = account.clone().into();
    active.balance = Set(account.balance - fee);
    active.total_fees_paid = Set(account.total_fees_paid + fee);
    active.last_fee_payment = Set(Some(now));
    let updated = active.update(conn).await?;

    public_bank::credit(conn, fee, "bank_maintenance").await?;
    info!(user_id, fee, "bank maintenance fee charged");
    Ok((updated, fee))
}

/// Resets the deposit counter when the UTC day changed.
fn roll_deposit_window(
    account: &mut user_bank::ActiveModel,
    current: &user_bank::Model,
    now: DateTime<Utc>,
) -> i64 {
    if current.last_deposit_reset.date_naive() == now.date_naive() {
        current.daily_deposit
    } else {
        account.daily_deposit = Set(0);
        account.last_deposit_reset = Set(now);
        0
    }
}

/// Shows an account, charging the maintenance fee first if it is due.
#[instrument(skip(eco))]
pub async fn account(eco: &Economy, user_id: i64) -> Result<user_bank::Model> {
    let _locks = eco.locks.acquire(&[user_id]).await;
    let now = Utc::now();
    let txn = eco.db.begin().await?;
    let account = lock_account(&txn, user_id, now).await?;
    let (account, _) = charge_maintenance(&txn, &eco.config.bank, account, now).await?;
    txn.commit().await?;
    Ok(account)
}

/// Moves PrissBucks from the wallet into the bank.
#[instrument(skip(eco))]
pub async fn deposit(eco: &Economy, user_id: i64, amount: i64) -> Result<Deposit> {
    let cfg = &eco.config.bank;
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }
    let tax = deposit_tax(amount, cfg);
    let net = amount - tax;
    if net <= 0 {
        return Err(Error::rule("That amount is too small once the deposit tax is paid"));
    }

    let _locks = eco.locks.acquire(&[user_id]).await;
    let now = Utc::now();
    let txn = eco.db.begin().await?;

    let account = lock_account(&txn, user_id, now).await?;
    let (account, maintenance_fee) = charge_maintenance(&txn, cfg, account, now).await?;

    if account.balance + net > cfg.max_balance {
        return Err(Error::LimitExceeded {
            message: format!(
                "Your bank can hold at most {} PB ({} PB free)",
                cfg.max_balance,
                (cfg.max_balance - account.balance).max(0)
            ),
        });
    }

    let mut active: user_bank::ActiveModel = account.clone().into();
    let deposited_today = roll_deposit_window(&mut active, &account, now);
    if deposited_today + amount > cfg.daily_deposit_limit {
        return Err(Error::LimitExceeded {
            message: format!(
                "Daily deposit limit of {} PB reached ({} PB left today)",
                cfg.daily_deposit_limit,
                (cfg.daily_deposit_limit - deposited_today).max(0)
            ),
        });
    }

    let change = ledger::post(
        &txn,
        Posting::debit(user_id, amount, TransactionKind::BankDeposit, "Deposit to private bank"),
    )
    .await?;

    active.balance = Set(account.balance + net);
    active.total_deposited = Set(account.total_deposited + net);
    active.total_fees_paid = Set(account.total_fees_paid + tax);
    active.daily_deposit = Set(deposited_today + amount);
    let updated = active.update(&txn).await?;

    public_bank::credit(&txn, tax, "bank_deposit_tax").await?;
    txn.commit().await?;

    Ok(Deposit {
        gross: amount,
        tax,
        net,
        maintenance_fee,
        bank_balance: updated.balance,
        wallet_balance: change.after,
    })
}

/// Moves PrissBucks from the bank back into the wallet.
#[instrument(skip(eco))]
pub async fn withdraw(eco: &Economy, user_id: i64, amount: i64) -> Result<BankWithdrawal> {
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }

    let _locks = eco.locks.acquire(&[user_id]).await;
    let now = Utc::now();
    let txn = eco.db.begin().await?;

    let account = lock_account(&txn, user_id, now).await?;
    let (account, maintenance_fee) =
        charge_maintenance(&txn, &eco.config.bank, account, now).await?;
    if account.balance < amount {
        return Err(Error::InsufficientFunds {
            current: account.balance,
            required: amount,
        });
    }

    let mut active: user_bank::ActiveModel = account.clone().into();
    active.balance = Set(account.balance - amount);
    active.total_withdrawn = Set(account.total_withdrawn + amount);
    let updated = active.update(&txn).await?;

    let change = ledger::post(
        &txn,
        Posting::credit(
            user_id,
            amount,
            TransactionKind::BankWithdraw,
            "Withdrawal from private bank",
        ),
    )
    .await?;
    txn.commit().await?;

    Ok(BankWithdrawal {
        amount,
        maintenance_fee,
        bank_balance: updated.balance,
        wallet_balance: change.after,
    })
}

/// Deletes every bank account (economy reset).
pub async fn reset_all<C>(conn: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    UserBank::delete_many().exec(conn).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_deposit_tax_minimum() {
        let cfg = BankConfig::default();
        assert_eq!(deposit_tax(10, &cfg), 1);
        assert_eq!(deposit_tax(1_000, &cfg), 20);
    }

    #[tokio::test]
    async fn test_deposit_and_withdraw() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 1_000).await?;

        let dep = deposit(&eco, 1, 500).await?;
        assert_eq!(dep.tax, 10);
        assert_eq!(dep.net, 490);
        assert_eq!(dep.bank_balance, 490);
        assert_eq!(dep.wallet_balance, 500);
        assert_eq!(public_bank::stats(&eco.db).await?.balance, 10);

        let wd = withdraw(&eco, 1, 90).await?;
        assert_eq!(wd.bank_balance, 400);
        assert_eq!(wd.wallet_balance, 590);

        let too_much = withdraw(&eco, 1, 401).await;
        assert!(matches!(too_much, Err(Error::InsufficientFunds { current: 400, .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_deposit_needs_wallet_funds() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 100).await?;

        let result = deposit(&eco, 1, 200).await;
        assert!(matches!(result, Err(Error::InsufficientFunds { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_daily_deposit_limit() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 20_000).await?;

        deposit(&eco, 1, 15_000).await?;
        let result = deposit(&eco, 1, 1).await;
        assert!(matches!(result, Err(Error::Rule { .. } | Error::LimitExceeded { .. })));
        let result = deposit(&eco, 1, 100).await;
        assert!(matches!(result, Err(Error::LimitExceeded { .. })));
        Ok(())
    }

    /// Overwrites an account's balance and marks the fee as paid now.
    async fn set_bank_balance(eco: &Economy, user_id: i64, balance: i64) -> Result<()> {
        let acc = account(eco, user_id).await?;
        let mut active: user_bank::ActiveModel = acc.into();
        active.balance = Set(balance);
        active.last_fee_payment = Set(Some(Utc::now()));
        active.update(&eco.db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_deposit_respects_max_balance() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 2_000).await?;
        set_bank_balance(&eco, 1, 99_500).await?;

        // 1000 nets 980, which would overflow the 100 000 cap
        let over = deposit(&eco, 1, 1_000).await;
        assert!(matches!(over, Err(Error::LimitExceeded { .. })));
        assert_eq!(ledger::balance_of(&eco.db, 1).await?, 2_000);

        let ok = deposit(&eco, 1, 500).await?;
        assert_eq!(ok.bank_balance, 99_990);
        Ok(())
    }

    #[tokio::test]
    async fn test_deposit_window_resets_next_day() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 20_000).await?;
        deposit(&eco, 1, 15_000).await?;
        assert!(matches!(deposit(&eco, 1, 100).await, Err(Error::LimitExceeded { .. })));

        // pretend the counter was last reset yesterday
        let acc = account(&eco, 1).await?;
        let mut active: user_bank::ActiveModel = acc.into();
        active.last_deposit_reset = Set(Utc::now() - Duration::days(1));
        active.last_fee_payment = Set(Some(Utc::now()));
        active.update(&eco.db).await?;

        deposit(&eco, 1, 100).await?;
        let acc = account(&eco, 1).await?;
        assert_eq!(acc.daily_deposit, 100);
        assert_eq!(acc.last_deposit_reset.date_naive(), Utc::now().date_naive());
        Ok(())
    }

    #[tokio::test]
    async fn test_maintenance_fee_once_per_day() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 2_000).await?;
        deposit(&eco, 1, 1_000).await?; // 980 in the bank

        // first view charges the fee because none was ever paid
        let acc = account(&eco, 1).await?;
        assert_eq!(acc.balance, 980 - 19);
        assert_eq!(acc.total_fees_paid, 20 + 19);

        let again = account(&eco, 1).await?;
        assert_eq!(again.balance, 961);

        // pretend the last fee was two days ago
        let mut active: user_bank::ActiveModel = again.into();
        active.last_fee_payment = Set(Some(Utc::now() - Duration::days(2)));
        active.update(&eco.db).await?;

        let charged = account(&eco, 1).await?;
        assert_eq!(charged.balance, 961 - 19);
        Ok(())
    }

    #[tokio::test]
    async fn test_small_accounts_pay_no_fee() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 1_000).await?;
        deposit(&eco, 1, 300).await?;

        let acc = account(&eco, 1).await?;
        assert_eq!(acc.balance, 294);
        assert_eq!(acc.last_fee_payment, None);
        Ok(())
    }
}

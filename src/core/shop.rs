//! Shop items and purchases.

use crate::{
    core::{
        Economy,
        ledger::{self, Posting, TransactionKind},
        public_bank, rounded_fraction_of,
        xp::{self, BoostTier},
    },
    entities::{ShopItem, User, UserPurchase, shop_item, user, user_purchase},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr,
};
use std::{fmt, str::FromStr};
use tracing::{info, instrument};

/// What an item does once bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// Discord role, optionally carrying an XP boost tier
    Role,
    /// Timeout tokens
    TimeoutToken,
    /// One-shot protection against stealing
    Defense,
}

impl ItemKind {
    /// Stored name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::TimeoutToken => "timeout_token",
            Self::Defense => "defense",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "role" => Ok(Self::Role),
            "timeout_token" | "token" => Ok(Self::TimeoutToken),
            "defense" => Ok(Self::Defense),
            other => Err(Error::rule(format!("Unknown item kind `{other}`"))),
        }
    }
}

/// Fields of a new shop item.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct NewItem {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub kind: ItemKind,
    pub role_id: Option<i64>,
    pub xp_tier: Option<BoostTier>,
    pub token_amount: Option<i64>,
}

/// One page of the shop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopPage {
    /// Items on this page
    pub items: Vec<shop_item::Model>,
    /// 1-based page number actually shown
    pub page: u64,
    /// Number of pages, at least 1
    pub total_pages: u64,
}

/// Outcome of a purchase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    /// Item bought
    pub item: shop_item::Model,
    /// Tax paid on top of the price
    pub tax: i64,
    /// Wallet afterwards
    pub balance: i64,
    /// Discord role the bot should assign
    pub role_id: Option<i64>,
    /// Boost tier now held, for role items with a tier
    pub xp_tier: Option<BoostTier>,
}

/// Shop tax: a rounded percentage of the price.
#[must_use]
pub fn purchase_tax(price: i64, rate: f64) -> i64 {
    rounded_fraction_of(price, rate)
}

/// Active items, `items_per_page` at a time. Out-of-range pages show the last page.
pub async fn list_items(eco: &Economy, page: u64) -> Result<ShopPage> {
    let per_page = eco.config.shop.items_per_page.max(1);
    let paginator = ShopItem::find()
        .filter(shop_item::Column::IsActive.eq(true))
        .order_by_asc(shop_item::Column::Price)
        .order_by_asc(shop_item::Column::Id)
        .paginate(&eco.db, per_page);

    let total_pages = paginator.num_pages().await?.max(1);
    let page = page.clamp(1, total_pages);
    let items = paginator.fetch_page(page - 1).await?;

    Ok(ShopPage {
        items,
        page,
        total_pages,
    })
}

/// Finds an active item by id.
pub async fn find_item<C>(conn: &C, item_id: i64) -> Result<shop_item::Model>
where
    C: ConnectionTrait,
{
    ShopItem::find_by_id(item_id)
        .filter(shop_item::Column::IsActive.eq(true))
        .one(conn)
        .await?
        .ok_or_else(|| Error::not_found(format!("Item #{item_id}")))
}

/// Active item names starting with `partial`, for autocomplete.
pub async fn item_names(eco: &Economy, partial: &str) -> Result<Vec<(i64, String)>> {
    let items = ShopItem::find()
        .filter(shop_item::Column::IsActive.eq(true))
        .order_by_asc(shop_item::Column::Name)
        .all(&eco.db)
        .await?;

    let needle = partial.to_lowercase();
    Ok(items
        .into_iter()
        .filter(|item| item.name.to_lowercase().contains(&needle))
        .map(|item| (item.id, item.name))
        .collect())
}

/// Adds an item to the shop (admin).
#[instrument(skip(eco))]
pub async fn add_item(eco: &Economy, item: NewItem) -> Result<shop_item::Model> {
    let name = item.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::rule("Item name cannot be empty"));
    }
    if item.price <= 0 {
        return Err(Error::InvalidAmount { amount: item.price });
    }
    if item.kind == ItemKind::TimeoutToken && item.token_amount.is_none_or(|n| n <= 0) {
        return Err(Error::rule("Timeout token items need a positive token amount"));
    }
    if ShopItem::find()
        .filter(shop_item::Column::Name.eq(&name))
        .one(&eco.db)
        .await?
        .is_some()
    {
        return Err(Error::rule(format!("An item named `{name}` already exists")));
    }

    let created = shop_item::ActiveModel {
        name: Set(name),
        description: Set(item.description),
        price: Set(item.price),
        kind: Set(item.kind.as_str().to_string()),
        role_id: Set(item.role_id),
        xp_tier: Set(item.xp_tier.map(|t| t.as_str().to_string())),
        token_amount: Set(item.token_amount),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&eco.db)
    .await?;

    info!(item_id = created.id, name = %created.name, "shop item added");
    Ok(created)
}

/// Hides an item from the shop (admin). Past purchases keep referring to it.
#[instrument(skip(eco))]
pub async fn deactivate_item(eco: &Economy, item_id: i64) -> Result<shop_item::Model> {
    let item = find_item(&eco.db, item_id).await?;
    let mut active: shop_item::ActiveModel = item.into();
    active.is_active = Set(false);
    Ok(active.update(&eco.db).await?)
}

/// Buys an item: charges price plus tax and applies the item's effect.
#[instrument(skip(eco))]
pub async fn purchase(eco: &Economy, user_id: i64, item_id: i64) -> Result<Purchase> {
    let _locks = eco.locks.acquire(&[user_id]).await;
    let txn = eco.db.begin().await?;

    let item = find_item(&txn, item_id).await?;
    let kind: ItemKind = item.kind.parse()?;
    let tax = purchase_tax(item.price, eco.config.shop.tax_rate);

    let change = ledger::post(
        &txn,
        Posting::debit(
            user_id,
            item.price + tax,
            TransactionKind::ShopPurchase,
            format!("Bought {}", item.name),
        ),
    )
    .await?;

    user_purchase::ActiveModel {
        user_id: Set(user_id),
        item_id: Set(item.id),
        price_paid: Set(item.price + tax),
        tax_paid: Set(tax),
        purchased_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut xp_tier = None;
    let to_public_bank = match kind {
        ItemKind::Role => {
            if let Some(tier) = item.xp_tier.as_deref() {
                let tier: BoostTier = tier.parse()?;
                xp_tier = Some(xp::grant_boost_tier(&txn, user_id, tier).await?);
            }
            tax + item.price
        }
        ItemKind::TimeoutToken => {
            User::update_many()
                .col_expr(
                    user::Column::TimeoutTokens,
                    Expr::col(user::Column::TimeoutTokens).add(item.token_amount.unwrap_or(0)),
                )
                .filter(user::Column::UserId.eq(user_id))
                .exec(&txn)
                .await?;
            tax
        }
        ItemKind::Defense => {
            User::update_many()
                .col_expr(user::Column::HasDefense, Expr::value(true))
                .filter(user::Column::UserId.eq(user_id))
                .exec(&txn)
                .await?;
            tax
        }
    };
    public_bank::credit(&txn, to_public_bank, "shop_purchase").await?;

    txn.commit().await?;
    info!(user_id, item_id, tax, "item purchased");

    Ok(Purchase {
        role_id: item.role_id,
        item,
        tax,
        balance: change.after,
        xp_tier,
    })
}

/// Purchases of a user with their items, newest first.
pub async fn inventory(
    eco: &Economy,
    user_id: i64,
) -> Result<Vec<(user_purchase::Model, Option<shop_item::Model>)>> {
    UserPurchase::find()
        .filter(user_purchase::Column::UserId.eq(user_id))
        .order_by_desc(user_purchase::Column::Id)
        .find_also_related(ShopItem)
        .all(&eco.db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn item(name: &str, price: i64, kind: ItemKind) -> NewItem {
        NewItem {
            name: name.to_string(),
            description: format!("{name} for testing"),
            price,
            kind,
            role_id: None,
            xp_tier: None,
            token_amount: (kind == ItemKind::TimeoutToken).then_some(3),
        }
    }

    #[test]
    fn test_purchase_tax_rounding() {
        assert_eq!(purchase_tax(1_000, 0.05), 50);
        assert_eq!(purchase_tax(5, 0.05), 0);
        assert_eq!(purchase_tax(47, 0.05), 2);
    }

    #[tokio::test]
    async fn test_list_items_paginates_active_only() -> Result<()> {
        let eco = setup_economy().await?;
        for i in 1..=7 {
            add_item(&eco, item(&format!("Item {i}"), i * 100, ItemKind::Defense)).await?;
        }
        let hidden = add_item(&eco, item("Hidden", 1, ItemKind::Defense)).await?;
        deactivate_item(&eco, hidden.id).await?;

        let first = list_items(&eco, 1).await?;
        assert_eq!(first.total_pages, 2);
        assert_eq!(first.items.len(), 5);
        assert_eq!(first.items[0].name, "Item 1");

        let last = list_items(&eco, 99).await?;
        assert_eq!(last.page, 2);
        assert_eq!(last.items.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_role_purchase_grants_tier() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 2_000).await?;
        let role = add_item(
            &eco,
            NewItem {
                role_id: Some(42),
                xp_tier: Some(BoostTier::C),
                ..item("C Tier", 1_000, ItemKind::Role)
            },
        )
        .await?;

        let bought = purchase(&eco, 1, role.id).await?;
        assert_eq!(bought.tax, 50);
        assert_eq!(bought.balance, 950);
        assert_eq!(bought.role_id, Some(42));
        assert_eq!(bought.xp_tier, Some(BoostTier::C));
        // price and tax both go to the public bank for roles
        assert_eq!(public_bank::stats(&eco.db).await?.balance, 1_050);

        let inv = inventory(&eco, 1).await?;
        assert_eq!(inv.len(), 1);
        assert_eq!(inv[0].1.as_ref().unwrap().name, "C Tier");
        assert_eq!(inv[0].0.price_paid, 1_050);
        assert_eq!(inv[0].0.tax_paid, 50);
        Ok(())
    }

    #[tokio::test]
    async fn test_token_and_defense_effects() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 1_000).await?;
        let tokens = add_item(&eco, item("Tokens", 100, ItemKind::TimeoutToken)).await?;
        let shield = add_item(&eco, item("Shield", 200, ItemKind::Defense)).await?;

        purchase(&eco, 1, tokens.id).await?;
        purchase(&eco, 1, shield.id).await?;

        let wallet = ledger::ensure_user(&eco.db, 1).await?;
        assert_eq!(wallet.timeout_tokens, 3);
        assert!(wallet.has_defense);
        assert_eq!(wallet.balance, 1_000 - 105 - 210);
        assert_eq!(public_bank::stats(&eco.db).await?.balance, 15);
        Ok(())
    }

    #[tokio::test]
    async fn test_purchase_failures() -> Result<()> {
        let eco = setup_economy().await?;
        fund(&eco.db, 1, 100).await?;
        let shield = add_item(&eco, item("Shield", 100, ItemKind::Defense)).await?;

        // 100 + 5 tax is more than the wallet holds
        assert!(matches!(
            purchase(&eco, 1, shield.id).await,
            Err(Error::InsufficientFunds { .. })
        ));
        assert!(matches!(purchase(&eco, 1, 999).await, Err(Error::NotFound { .. })));
        assert!(UserPurchase::find().all(&eco.db).await?.is_empty());

        assert!(add_item(&eco, item("Shield", 5, ItemKind::Defense)).await.is_err());
        Ok(())
    }
}

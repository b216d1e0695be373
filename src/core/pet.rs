//! Pets: eggs and zones, equipment slots, passive income and gold fusion.
//!
//! The catalog is defined in configuration and mirrored into the `pets` table at startup.
//! Each egg belongs to a zone; zones with an entry cost are paid for once, on the first egg
//! opened there, and may require an XP level.
//! Income accrues per hour for equipped pets and is paid out on [`claim`]; fractions of a PB
//! are not lost, the claim timer only advances by the time that was actually paid for.

use crate::{
    config::economy::{EggDefinition, PetConfig, ZoneDefinition},
    core::{
        Economy, clan, fraction_of,
        ledger::{self, Posting, TransactionKind},
        trade, xp,
    },
    entities::{
        Pet, PetOpening, TradePet, User, UserPet, UserZone, pet, pet_opening,
        trade as trade_entity, trade_pet, user, user_pet, user_zone,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use rand::{
    Rng,
    distributions::{Distribution, WeightedIndex},
};
use sea_orm::{
    JoinType, PaginatorTrait, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
    prelude::*, sea_query::{Expr, OnConflict},
};
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument, warn};

/// Pre-rolled egg result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EggRoll {
    /// Index into the configured catalog
    pub index: usize,
    /// Whether the gold roll succeeded (ignored for huge pets)
    pub gold: bool,
}

impl EggRoll {
    /// Rolls `egg` with the thread RNG, weighted by its drop table.
    pub fn random(cfg: &PetConfig, egg: &EggDefinition) -> Result<Self> {
        let table = cfg.drop_table(egg);
        let weights =
            WeightedIndex::new(table.iter().map(|(_, weight)| *weight)).map_err(|e| {
                Error::Config {
                    message: format!("Invalid drop rates for {}: {e}", egg.name),
                }
            })?;
        let mut rng = rand::thread_rng();
        Ok(Self {
            index: table[weights.sample(&mut rng)].0,
            gold: rng.gen_bool(cfg.gold_chance.clamp(0.0, 1.0)),
        })
    }
}

/// Finds the egg named by a player, or the default egg when none is given.
pub fn resolve_egg<'a>(cfg: &'a PetConfig, name: Option<&str>) -> Result<&'a EggDefinition> {
    let key = name.map_or(cfg.default_egg.as_str(), str::trim);
    let key = if key.is_empty() { cfg.default_egg.as_str() } else { key };
    cfg.egg(key)
        .ok_or_else(|| Error::not_found(format!("Egg `{key}`")))
}

/// A hatched egg
#[derive(Debug, Clone, PartialEq)]
pub struct Hatch {
    #[allow(missing_docs)]
    pub pet: OwnedPet,
    /// Display name of the egg
    pub egg: String,
    /// Price paid for the egg
    pub price: i64,
    /// Zone name and entry cost, when this opening unlocked it
    pub zone_unlocked: Option<(String, i64)>,
}

/// A zone as seen by one player
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneAccess<'a> {
    #[allow(missing_docs)]
    pub zone: &'a ZoneDefinition,
    /// Eggs sold in the zone
    pub eggs: Vec<&'a EggDefinition>,
    /// Entry cost paid, or the zone is free
    pub paid: bool,
    /// The player's level is high enough
    pub meets_level: bool,
}

impl ZoneAccess<'_> {
    /// Whether eggs can be opened without paying or levelling first.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.paid && self.meets_level
    }
}

/// One catalog entry of a player's pet index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    #[allow(missing_docs)]
    pub pet: pet::Model,
    /// Whether the player owns at least one copy
    pub owned: bool,
}

/// Drop statistics of one catalog pet
#[derive(Debug, Clone, PartialEq)]
pub struct DropStat {
    #[allow(missing_docs)]
    pub name: String,
    /// Times it hatched
    pub obtained: u64,
    /// Share of all openings, in percent
    pub actual_pct: f64,
    /// Share expected from the catalog drop rates, in percent
    pub expected_pct: f64,
}

/// Server-wide hatching statistics
#[derive(Debug, Clone, PartialEq)]
pub struct PetStats {
    /// Eggs opened
    pub total_openings: u64,
    /// Per catalog pet, in catalog order
    pub drops: Vec<DropStat>,
    /// Huge pets currently owned
    pub huge_owned: u64,
    /// Gold pets currently owned
    pub gold_owned: u64,
}

/// An owned pet with its catalog entry and current hourly income.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedPet {
    #[allow(missing_docs)]
    pub owned: user_pet::Model,
    #[allow(missing_docs)]
    pub pet: pet::Model,
    /// PB per hour while equipped
    pub income_per_hour: i64,
}

/// Result of toggling a pet
#[derive(Debug, Clone, PartialEq)]
pub struct EquipResult {
    #[allow(missing_docs)]
    pub pet: OwnedPet,
    /// `true` when the pet is now equipped
    pub activated: bool,
    /// Equipped pets afterwards
    pub active_count: u64,
}

/// A pet income payout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    /// PB credited, clan bonus included
    pub amount: i64,
    /// Part of `amount` that came from the clan boost
    pub clan_bonus: i64,
    /// Seconds since the previous claim
    pub elapsed_secs: i64,
    /// Equipped pets that earned
    pub pets: usize,
    /// Wallet afterwards
    pub balance: i64,
}

/// Mirrors the configured catalog into the `pets` table. Returns the number of definitions.
pub async fn sync_catalog<C>(conn: &C, cfg: &PetConfig) -> Result<usize>
where
    C: ConnectionTrait,
{
    for def in &cfg.catalog {
        Pet::insert(pet::ActiveModel {
            name: Set(def.name.clone()),
            rarity: Set(def.rarity.clone()),
            base_income_per_hour: Set(def.base_income_per_hour),
            drop_rate: Set(def.drop_rate),
            is_huge: Set(def.is_huge),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(pet::Column::Name)
                .update_columns([
                    pet::Column::Rarity,
                    pet::Column::BaseIncomePerHour,
                    pet::Column::DropRate,
                    pet::Column::IsHuge,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    }
    info!(pets = cfg.catalog.len(), "pet catalog synced");
    Ok(cfg.catalog.len())
}

/// Hourly income of a non-huge pet.
#[must_use]
pub fn regular_income(pet: &pet::Model, is_gold: bool, cfg: &PetConfig) -> i64 {
    if is_gold {
        pet.base_income_per_hour * cfg.gold_multiplier
    } else {
        pet.base_income_per_hour
    }
}

/// Hourly income of a huge pet, based on the owner's best regular pet.
#[must_use]
pub fn huge_income(best_regular: i64, cfg: &PetConfig) -> i64 {
    cfg.huge_min_income
        .max(best_regular.max(0) * cfg.huge_multiplier.max(1))
}

fn with_income(rows: Vec<(user_pet::Model, Option<pet::Model>)>, cfg: &PetConfig) -> Vec<OwnedPet> {
    let rows: Vec<_> = rows
        .into_iter()
        .filter_map(|(owned, pet)| pet.map(|p| (owned, p)))
        .collect();
    let best_regular = rows
        .iter()
        .filter(|(owned, _)| !owned.is_huge)
        .map(|(owned, pet)| regular_income(pet, owned.is_gold, cfg))
        .max()
        .unwrap_or(0);

    rows.into_iter()
        .map(|(owned, pet)| {
            let income_per_hour = if owned.is_huge {
                huge_income(best_regular, cfg)
            } else {
                regular_income(&pet, owned.is_gold, cfg)
            };
            OwnedPet {
                owned,
                pet,
                income_per_hour,
            }
        })
        .collect()
}

async fn owned_pets<C>(conn: &C, cfg: &PetConfig, user_id: i64) -> Result<Vec<OwnedPet>>
where
    C: ConnectionTrait,
{
    let rows = UserPet::find()
        .filter(user_pet::Column::UserId.eq(user_id))
        .order_by_asc(user_pet::Column::Id)
        .find_also_related(Pet)
        .all(conn)
        .await?;
    Ok(with_income(rows, cfg))
}

/// Owned pet ids currently offered in a pending trade.
pub(crate) async fn pets_in_pending_trades<C>(conn: &C, user_id: i64) -> Result<HashSet<i64>>
where
    C: ConnectionTrait,
{
    let rows = TradePet::find()
        .join(JoinType::InnerJoin, trade_pet::Relation::Trade.def())
        .filter(trade_pet::Column::OwnerId.eq(user_id))
        .filter(trade_entity::Column::Status.eq(trade::PENDING))
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(|r| r.user_pet_id).collect())
}

/// Every pet a user owns, equipped first, then by income.
pub async fn inventory(eco: &Economy, user_id: i64) -> Result<Vec<OwnedPet>> {
    let mut pets = owned_pets(&eco.db, &eco.config.pets, user_id).await?;
    pets.sort_by(|a, b| {
        b.owned
            .is_active
            .cmp(&a.owned.is_active)
            .then(b.income_per_hour.cmp(&a.income_per_hour))
            .then(a.owned.id.cmp(&b.owned.id))
    });
    Ok(pets)
}

/// Catalog names containing `partial`, for autocomplete.
pub async fn pet_names(eco: &Economy, partial: &str) -> Result<Vec<String>> {
    let needle = partial.to_lowercase();
    Ok(Pet::find()
        .order_by_asc(pet::Column::Name)
        .all(&eco.db)
        .await?
        .into_iter()
        .map(|p| p.name)
        .filter(|name| name.to_lowercase().contains(&needle))
        .collect())
}

async fn zone_paid<C>(conn: &C, user_id: i64, zone: &ZoneDefinition) -> Result<bool>
where
    C: ConnectionTrait,
{
    if zone.entry_cost <= 0 {
        return Ok(true);
    }
    Ok(UserZone::find_by_id((user_id, zone.slug.clone()))
        .one(conn)
        .await?
        .is_some())
}

/// Zones in configuration order with their eggs and the player's access.
pub async fn egg_overview(eco: &Economy, user_id: i64) -> Result<Vec<ZoneAccess<'_>>> {
    let cfg = &eco.config.pets;
    let level = xp::level_of(&eco.db, &eco.config.xp, user_id).await?;

    let mut zones = Vec::with_capacity(cfg.zones.len());
    for zone in &cfg.zones {
        zones.push(ZoneAccess {
            zone,
            eggs: cfg.eggs.iter().filter(|egg| egg.zone == zone.slug).collect(),
            paid: zone_paid(&eco.db, user_id, zone).await?,
            meets_level: level >= zone.level_required,
        });
    }
    Ok(zones)
}

/// Egg slugs and names containing `partial`, for autocomplete.
#[must_use]
pub fn egg_names(cfg: &PetConfig, partial: &str) -> Vec<String> {
    let needle = partial.to_lowercase();
    cfg.eggs
        .iter()
        .filter(|egg| {
            egg.slug.contains(&needle) || egg.name.to_lowercase().contains(&needle)
        })
        .map(|egg| egg.slug.clone())
        .collect()
}

/// Buys and hatches an egg with a pre-rolled result.
///
/// The first egg opened in a paid zone also pays its entry cost; a zone that was paid for stays
/// open even if the level requirement is raised later.
#[instrument(skip(eco))]
pub async fn open_egg(eco: &Economy, user_id: i64, egg_key: &str, roll: EggRoll) -> Result<Hatch> {
    let cfg = &eco.config.pets;
    let egg = resolve_egg(cfg, Some(egg_key))?;
    let zone = cfg
        .zone(&egg.zone)
        .ok_or_else(|| Error::not_found(format!("Zone `{}`", egg.zone)))?;
    if !cfg.drop_table(egg).iter().any(|(index, _)| *index == roll.index) {
        return Err(Error::rule(format!("That pet does not hatch from a {}", egg.name)));
    }
    let def = cfg
        .catalog
        .get(roll.index)
        .ok_or_else(|| Error::not_found("Pet definition"))?;

    let _locks = eco.locks.acquire(&[user_id]).await;
    let now = Utc::now();
    let txn = eco.db.begin().await?;

    let pet = Pet::find()
        .filter(pet::Column::Name.eq(&def.name))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found(format!("Pet {}", def.name)))?;

    let zone_unlocked = if zone_paid(&txn, user_id, zone).await? && zone.entry_cost > 0 {
        None
    } else {
        let level = xp::level_of(&txn, &eco.config.xp, user_id).await?;
        if level < zone.level_required {
            return Err(Error::rule(format!(
                "Reach level {} to explore {}",
                zone.level_required, zone.name
            )));
        }
        if zone.entry_cost > 0 {
            ledger::post(
                &txn,
                Posting::debit(
                    user_id,
                    zone.entry_cost,
                    TransactionKind::ZoneUnlock,
                    format!("Unlocked {}", zone.name),
                ),
            )
            .await?;
            user_zone::ActiveModel {
                user_id: Set(user_id),
                zone_slug: Set(zone.slug.clone()),
                unlocked_at: Set(now),
            }
            .insert(&txn)
            .await?;
            Some((zone.name.clone(), zone.entry_cost))
        } else {
            None
        }
    };

    ledger::post(
        &txn,
        Posting::debit(
            user_id,
            egg.price,
            TransactionKind::PetEgg,
            format!("Opened a {}", egg.name),
        ),
    )
    .await?;

    let is_gold = !pet.is_huge && roll.gold;
    let owned = user_pet::ActiveModel {
        user_id: Set(user_id),
        pet_id: Set(pet.id),
        is_active: Set(false),
        is_huge: Set(pet.is_huge),
        is_gold: Set(is_gold),
        acquired_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    pet_opening::ActiveModel {
        user_id: Set(user_id),
        pet_id: Set(pet.id),
        egg_slug: Set(egg.slug.clone()),
        is_gold: Set(is_gold),
        opened_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let hatched = owned_pets(&txn, cfg, user_id)
        .await?
        .into_iter()
        .find(|p| p.owned.id == owned.id)
        .ok_or_else(|| Error::not_found("Hatched pet"))?;
    txn.commit().await?;

    if let Some((zone_name, cost)) = &zone_unlocked {
        info!(user_id, zone = %zone_name, cost, "zone unlocked");
    }
    if hatched.owned.is_huge {
        warn!(user_id, egg = %egg.slug, pet = %hatched.pet.name, "huge pet hatched");
    } else {
        info!(user_id, egg = %egg.slug, pet = %hatched.pet.name, gold = is_gold, "egg opened");
    }
    Ok(Hatch {
        pet: hatched,
        egg: egg.name.clone(),
        price: egg.price,
        zone_unlocked,
    })
}

/// The whole catalog, marking the pets a player has owned copies of.
pub async fn pet_index(eco: &Economy, user_id: i64) -> Result<Vec<IndexEntry>> {
    let owned: HashSet<i64> = UserPet::find()
        .filter(user_pet::Column::UserId.eq(user_id))
        .all(&eco.db)
        .await?
        .into_iter()
        .map(|p| p.pet_id)
        .collect();

    Ok(Pet::find()
        .order_by_asc(pet::Column::Id)
        .all(&eco.db)
        .await?
        .into_iter()
        .map(|pet| IndexEntry {
            owned: owned.contains(&pet.id),
            pet,
        })
        .collect())
}

/// Openings per pet compared with the catalog drop rates.
#[allow(clippy::cast_precision_loss)]
pub async fn pet_stats(eco: &Economy) -> Result<PetStats> {
    let cfg = &eco.config.pets;
    let openings: Vec<i64> = PetOpening::find()
        .select_only()
        .column(pet_opening::Column::PetId)
        .into_tuple()
        .all(&eco.db)
        .await?;
    let mut per_pet: HashMap<i64, u64> = HashMap::new();
    for pet_id in &openings {
        *per_pet.entry(*pet_id).or_default() += 1;
    }
    let total_openings = u64::try_from(openings.len())?;

    let weight_sum: f64 = cfg.catalog.iter().map(|p| p.drop_rate.max(0.0)).sum();
    let catalog = Pet::find().all(&eco.db).await?;
    let drops = cfg
        .catalog
        .iter()
        .map(|def| {
            let obtained = catalog
                .iter()
                .find(|p| p.name == def.name)
                .and_then(|p| per_pet.get(&p.id).copied())
                .unwrap_or(0);
            let actual_pct = if total_openings == 0 {
                0.0
            } else {
                obtained as f64 / total_openings as f64 * 100.0
            };
            DropStat {
                name: def.name.clone(),
                obtained,
                actual_pct,
                expected_pct: def.drop_rate.max(0.0) / weight_sum * 100.0,
            }
        })
        .collect();

    Ok(PetStats {
        total_openings,
        drops,
        huge_owned: UserPet::find()
            .filter(user_pet::Column::IsHuge.eq(true))
            .count(&eco.db)
            .await?,
        gold_owned: UserPet::find()
            .filter(user_pet::Column::IsGold.eq(true))
            .count(&eco.db)
            .await?,
    })
}

/// Equips or unequips a pet. Changing equipment restarts the income timer.
#[instrument(skip(eco))]
pub async fn equip(eco: &Economy, user_id: i64, user_pet_id: i64) -> Result<EquipResult> {
    let cfg = &eco.config.pets;
    let _locks = eco.locks.acquire(&[user_id]).await;
    let txn = eco.db.begin().await?;

    let owned = UserPet::find_by_id(user_pet_id)
        .filter(user_pet::Column::UserId.eq(user_id))
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found(format!("Pet #{user_pet_id}")))?;

    let active_count = UserPet::find()
        .filter(user_pet::Column::UserId.eq(user_id))
        .filter(user_pet::Column::IsActive.eq(true))
        .count(&txn)
        .await?;

    let activated = !owned.is_active;
    let active_count = if activated {
        if active_count >= cfg.base_slots {
            return Err(Error::LimitExceeded {
                message: format!("You can equip at most {} pets", cfg.base_slots),
            });
        }
        if pets_in_pending_trades(&txn, user_id).await?.contains(&owned.id) {
            return Err(Error::rule("That pet is offered in a pending trade"));
        }
        active_count + 1
    } else {
        active_count.saturating_sub(1)
    };

    let mut active: user_pet::ActiveModel = owned.into();
    active.is_active = Set(activated);
    active.update(&txn).await?;

    ledger::ensure_user(&txn, user_id).await?;
    User::update_many()
        .col_expr(user::Column::PetLastClaim, Expr::value(Some(Utc::now())))
        .filter(user::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;

    let pet = owned_pets(&txn, cfg, user_id)
        .await?
        .into_iter()
        .find(|p| p.owned.id == user_pet_id)
        .ok_or_else(|| Error::not_found(format!("Pet #{user_pet_id}")))?;
    txn.commit().await?;

    Ok(EquipResult {
        pet,
        activated,
        active_count,
    })
}

/// Pays out income earned by equipped pets since the last claim.
#[instrument(skip(eco))]
pub async fn claim(eco: &Economy, user_id: i64, now: DateTime<Utc>) -> Result<Claim> {
    let cfg = &eco.config.pets;
    let _locks = eco.locks.acquire(&[user_id]).await;
    let txn = eco.db.begin().await?;

    let wallet = ledger::lock_user(&txn, user_id).await?;
    let equipped: Vec<OwnedPet> = owned_pets(&txn, cfg, user_id)
        .await?
        .into_iter()
        .filter(|p| p.owned.is_active)
        .collect();
    if equipped.is_empty() {
        return Err(Error::rule("Equip a pet before claiming income"));
    }

    let set_claim = |at: DateTime<Utc>| {
        User::update_many()
            .col_expr(user::Column::PetLastClaim, Expr::value(Some(at)))
            .filter(user::Column::UserId.eq(user_id))
    };

    let elapsed_secs = wallet
        .pet_last_claim
        .map_or(0, |last| (now - last).num_seconds());
    let hourly: i64 = equipped.iter().map(|p| p.income_per_hour).sum();
    let nothing = Claim {
        amount: 0,
        clan_bonus: 0,
        elapsed_secs: elapsed_secs.max(0),
        pets: equipped.len(),
        balance: wallet.balance,
    };

    let Some(last) = wallet.pet_last_claim.filter(|_| elapsed_secs > 0 && hourly > 0) else {
        set_claim(now).exec(&txn).await?;
        txn.commit().await?;
        return Ok(nothing);
    };

    // whole PB earned, and the time those PB took
    let raw = i64::try_from(i128::from(hourly) * i128::from(elapsed_secs) / 3600)?;
    if raw <= 0 {
        txn.commit().await?;
        return Ok(nothing);
    }
    let consumed_secs = i64::try_from(i128::from(raw) * 3600 / i128::from(hourly))?;
    let next_claim = (last + Duration::seconds(consumed_secs)).min(now);

    let multiplier = clan::boost_multiplier_for(&txn, user_id).await?.max(1.0);
    let amount = fraction_of(raw, multiplier).max(raw);
    let clan_bonus = amount - raw;

    let description = if clan_bonus > 0 {
        format!("Pet income ({} pets) + clan boost", equipped.len())
    } else {
        format!("Pet income ({} pets)", equipped.len())
    };
    let change = ledger::post(
        &txn,
        Posting::credit(user_id, amount, TransactionKind::PetIncome, description),
    )
    .await?;
    set_claim(next_claim).exec(&txn).await?;
    txn.commit().await?;

    info!(user_id, amount, clan_bonus, "pet income claimed");
    Ok(Claim {
        amount,
        clan_bonus,
        elapsed_secs,
        pets: equipped.len(),
        balance: change.after,
    })
}

/// Fuses identical regular copies into one gold copy.
///
/// Only unequipped, non-gold copies that are not offered in a pending trade are used, oldest
/// first. Returns the new pet and the number of copies consumed.
#[instrument(skip(eco))]
pub async fn goldify(eco: &Economy, user_id: i64, pet_name: &str) -> Result<(OwnedPet, u64)> {
    let cfg = &eco.config.pets;
    let _locks = eco.locks.acquire(&[user_id]).await;
    let txn = eco.db.begin().await?;

    let wanted = pet_name.trim();
    let pet = Pet::find()
        .all(&txn)
        .await?
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(wanted))
        .ok_or_else(|| Error::not_found(format!("Pet `{wanted}`")))?;
    if pet.is_huge {
        return Err(Error::rule("Huge pets cannot become gold"));
    }

    let in_trade = pets_in_pending_trades(&txn, user_id).await?;
    let required = usize::try_from(cfg.gold_combine_required)?;
    let candidates: Vec<i64> = UserPet::find()
        .filter(user_pet::Column::UserId.eq(user_id))
        .filter(user_pet::Column::PetId.eq(pet.id))
        .filter(user_pet::Column::IsGold.eq(false))
        .filter(user_pet::Column::IsActive.eq(false))
        .order_by_asc(user_pet::Column::Id)
        .lock_exclusive()
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| p.id)
        .filter(|id| !in_trade.contains(id))
        .take(required)
        .collect();

    if candidates.len() < required {
        return Err(Error::rule(format!(
            "You need {required} unequipped copies of {} that are not in a trade",
            pet.name
        )));
    }

    UserPet::delete_many()
        .filter(user_pet::Column::Id.is_in(candidates))
        .exec(&txn)
        .await?;
    let gold = user_pet::ActiveModel {
        user_id: Set(user_id),
        pet_id: Set(pet.id),
        is_active: Set(false),
        is_huge: Set(false),
        is_gold: Set(true),
        acquired_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let created = owned_pets(&txn, cfg, user_id)
        .await?
        .into_iter()
        .find(|p| p.owned.id == gold.id)
        .ok_or_else(|| Error::not_found("Gold pet"))?;
    txn.commit().await?;

    info!(user_id, pet = %pet.name, "gold pet created");
    Ok((created, cfg.gold_combine_required))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    const SHELLY: EggRoll = EggRoll { index: 0, gold: false };
    const LEON: EggRoll = EggRoll { index: 4, gold: false };
    const HUGE: EggRoll = EggRoll { index: 5, gold: true };

    async fn hatch(eco: &Economy, user_id: i64, roll: EggRoll) -> Result<OwnedPet> {
        Ok(open_egg(eco, user_id, "basic", roll).await?.pet)
    }

    async fn reach_level(eco: &Economy, user_id: i64, total_xp: i64) -> Result<()> {
        crate::entities::user_xp::ActiveModel {
            user_id: Set(user_id),
            total_xp: Set(total_xp),
            level: Set(xp::compute_level(total_xp, &eco.config.xp).level),
            boost_tier: Set(None),
            last_message_at: Set(None),
        }
        .insert(&eco.db)
        .await?;
        Ok(())
    }

    async fn set_last_claim(eco: &Economy, user_id: i64, at: DateTime<Utc>) -> Result<()> {
        User::update_many()
            .col_expr(user::Column::PetLastClaim, Expr::value(Some(at)))
            .filter(user::Column::UserId.eq(user_id))
            .exec(&eco.db)
            .await?;
        Ok(())
    }

    #[test]
    fn test_egg_roll_within_drop_table() {
        let cfg = PetConfig::default();
        let basic = resolve_egg(&cfg, None).unwrap();
        let desert = resolve_egg(&cfg, Some("Desert Egg")).unwrap();
        for _ in 0..100 {
            assert!(EggRoll::random(&cfg, basic).unwrap().index < cfg.catalog.len());
            // Shelly never hatches from a desert egg
            assert_ne!(EggRoll::random(&cfg, desert).unwrap().index, 0);
        }
        let empty = PetConfig {
            catalog: Vec::new(),
            ..PetConfig::default()
        };
        assert!(matches!(EggRoll::random(&empty, basic), Err(Error::Config { .. })));
        assert!(matches!(resolve_egg(&cfg, Some("golden")), Err(Error::NotFound { .. })));
        assert_eq!(egg_names(&cfg, "DES"), ["desert"]);
    }

    #[test]
    fn test_huge_income_floor() {
        let cfg = PetConfig::default();
        assert_eq!(huge_income(0, &cfg), 500);
        assert_eq!(huge_income(400, &cfg), 800);
    }

    #[tokio::test]
    async fn test_open_egg_charges_price() -> Result<()> {
        let eco = setup_pet_economy().await?;
        fund(&eco.db, 1, 600).await?;

        let opened = open_egg(&eco, 1, "basic", EggRoll { index: 1, gold: true }).await?;
        assert_eq!((opened.egg.as_str(), opened.price), ("Basic Egg", 500));
        assert_eq!(opened.zone_unlocked, None);
        let hatched = opened.pet;
        assert_eq!(hatched.pet.name, "Colt");
        assert!(hatched.owned.is_gold);
        assert_eq!(hatched.income_per_hour, 75);
        assert_eq!(ledger::balance_of(&eco.db, 1).await?, 100);

        assert!(matches!(
            hatch(&eco, 1, SHELLY).await,
            Err(Error::InsufficientFunds { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_huge_pets_are_never_gold() -> Result<()> {
        let eco = setup_pet_economy().await?;
        fund(&eco.db, 1, 1_000).await?;
        hatch(&eco, 1, LEON).await?;

        let huge = hatch(&eco, 1, HUGE).await?;
        assert!(huge.owned.is_huge);
        assert!(!huge.owned.is_gold);
        // twice the best regular pet
        assert_eq!(huge.income_per_hour, 800);
        Ok(())
    }

    #[tokio::test]
    async fn test_equip_slots() -> Result<()> {
        let eco = setup_pet_economy().await?;
        fund(&eco.db, 1, 2_500).await?;
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(hatch(&eco, 1, SHELLY).await?.owned.id);
        }

        for id in &ids[..4] {
            assert!(equip(&eco, 1, *id).await?.activated);
        }
        assert!(matches!(equip(&eco, 1, ids[4]).await, Err(Error::LimitExceeded { .. })));

        let off = equip(&eco, 1, ids[0]).await?;
        assert!(!off.activated);
        assert_eq!(off.active_count, 3);
        assert!(equip(&eco, 1, ids[4]).await?.activated);

        assert!(matches!(equip(&eco, 2, ids[0]).await, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_claim_pays_whole_hours_and_keeps_remainder() -> Result<()> {
        let eco = setup_pet_economy().await?;
        fund(&eco.db, 1, 500).await?;
        let shelly = hatch(&eco, 1, SHELLY).await?;
        equip(&eco, 1, shelly.owned.id).await?;

        let start = Utc::now() - Duration::hours(3);
        set_last_claim(&eco, 1, start).await?;

        // 10 PB/h for 3h15m: 32 PB, timer moves forward by the 3h12m those PB took
        let now = start + Duration::minutes(195);
        let paid = claim(&eco, 1, now).await?;
        assert_eq!(paid.amount, 32);
        assert_eq!(paid.balance, 32);

        let wallet = ledger::ensure_user(&eco.db, 1).await?;
        assert_eq!(wallet.pet_last_claim, Some(start + Duration::minutes(192)));
        Ok(())
    }

    #[tokio::test]
    async fn test_claim_requires_equipped_pet() -> Result<()> {
        let eco = setup_pet_economy().await?;
        assert!(matches!(claim(&eco, 1, Utc::now()).await, Err(Error::Rule { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_goldify_consumes_copies() -> Result<()> {
        let eco = setup_pet_economy().await?;
        fund(&eco.db, 1, 3_000).await?;
        let mut ids = Vec::new();
        for _ in 0..6 {
            ids.push(hatch(&eco, 1, SHELLY).await?.owned.id);
        }
        equip(&eco, 1, ids[0]).await?;

        let (gold, consumed) = goldify(&eco, 1, "shelly").await?;
        assert_eq!(consumed, 5);
        assert!(gold.owned.is_gold);
        assert_eq!(gold.income_per_hour, 30);

        let left = inventory(&eco, 1).await?;
        assert_eq!(left.len(), 2);
        // the equipped copy was kept
        assert!(left.iter().any(|p| p.owned.id == ids[0]));

        assert!(matches!(goldify(&eco, 1, "Shelly").await, Err(Error::Rule { .. })));
        assert!(matches!(goldify(&eco, 1, "Huge Shelly").await, Err(Error::Rule { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_paid_zone_unlocks_once() -> Result<()> {
        let eco = setup_pet_economy().await?;
        let colt = EggRoll { index: 1, gold: false };
        fund(&eco.db, 1, 30_000).await?;

        let too_low = open_egg(&eco, 1, "desert", colt).await;
        assert!(matches!(too_low, Err(Error::Rule { .. })));

        reach_level(&eco, 1, 1_000_000).await?;
        let first = open_egg(&eco, 1, "desert", colt).await?;
        assert_eq!(first.zone_unlocked, Some(("Scorching Desert".to_string(), 25_000)));
        assert_eq!(ledger::balance_of(&eco.db, 1).await?, 2_500);

        let second = open_egg(&eco, 1, "DESERT", colt).await?;
        assert_eq!(second.zone_unlocked, None);
        assert_eq!(ledger::balance_of(&eco.db, 1).await?, 0);

        let shelly = open_egg(&eco, 1, "desert", SHELLY).await;
        assert!(matches!(shelly, Err(Error::Rule { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_zone_unlock_rolls_back_without_egg_money() -> Result<()> {
        let eco = setup_pet_economy().await?;
        reach_level(&eco, 1, 1_000_000).await?;
        fund(&eco.db, 1, 26_000).await?;

        let result = open_egg(&eco, 1, "desert", EggRoll { index: 2, gold: false }).await;
        assert!(matches!(result, Err(Error::InsufficientFunds { .. })));
        assert_eq!(ledger::balance_of(&eco.db, 1).await?, 26_000);

        let zones = egg_overview(&eco, 1).await?;
        assert_eq!(zones.len(), 2);
        assert!(zones[0].is_open());
        assert!(!zones[1].paid);
        assert!(zones[1].meets_level);
        assert_eq!(zones[1].eggs[0].slug, "desert");
        Ok(())
    }

    #[tokio::test]
    async fn test_index_and_stats() -> Result<()> {
        let eco = setup_pet_economy().await?;
        fund(&eco.db, 1, 1_500).await?;
        hatch(&eco, 1, SHELLY).await?;
        hatch(&eco, 1, SHELLY).await?;
        hatch(&eco, 1, EggRoll { index: 1, gold: true }).await?;

        let index = pet_index(&eco, 1).await?;
        let owned: Vec<&str> = index
            .iter()
            .filter(|e| e.owned)
            .map(|e| e.pet.name.as_str())
            .collect();
        assert_eq!(index.len(), 6);
        assert_eq!(owned, ["Shelly", "Colt"]);
        assert!(pet_index(&eco, 2).await?.iter().all(|e| !e.owned));

        let stats = pet_stats(&eco).await?;
        assert_eq!(stats.total_openings, 3);
        assert_eq!(stats.drops[0].obtained, 2);
        assert!((stats.drops[0].actual_pct - 200.0 / 3.0).abs() < 1e-9);
        assert!((stats.drops[0].expected_pct - 50.0).abs() < 1e-9);
        assert_eq!(stats.drops[4].obtained, 0);
        assert_eq!((stats.gold_owned, stats.huge_owned), (1, 0));
        Ok(())
    }
}

//! Economy tuning loaded from config.toml
//!
//! Every table and field is optional: anything missing falls back to the defaults below,
//! which are the values the bot has always run with. A malformed file is still an error.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// All tunable economy parameters
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EconomyConfig {
    /// Daily reward
    pub daily: DailyConfig,
    /// Player-to-player transfers
    pub transfer: TransferConfig,
    /// Shop pricing
    pub shop: ShopConfig,
    /// Private bank accounts
    pub bank: BankConfig,
    /// Shared public bank
    pub public_bank: PublicBankConfig,
    /// Public bank debt levels
    pub debt: DebtConfig,
    /// Personal loans
    pub loan: LoanConfig,
    /// Experience and levels
    pub xp: XpConfig,
    /// Passive message rewards
    pub rewards: RewardConfig,
    /// Roulette and rock-paper-scissors
    pub casino: CasinoConfig,
    /// Stealing from other players
    pub steal: StealConfig,
    /// Bank heists
    pub heist: HeistConfig,
    /// Clans
    pub clan: ClanConfig,
    /// Pets and eggs
    pub pets: PetConfig,
    /// Leaderboards
    pub leaderboard: LeaderboardConfig,
    /// Message activity statistics
    pub activity: ActivityConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct DailyConfig {
    pub min: i64,
    pub max: i64,
    pub bonus_chance: f64,
    pub bonus_min: i64,
    pub bonus_max: i64,
    pub cooldown_secs: i64,
}

impl Default for DailyConfig {
    fn default() -> Self {
        Self {
            min: 50,
            max: 150,
            bonus_chance: 0.10,
            bonus_min: 50,
            bonus_max: 200,
            cooldown_secs: 86_400,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct TransferConfig {
    pub min: i64,
    pub max: i64,
    pub tax_rate: f64,
    pub cooldown_secs: i64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            min: 1,
            max: 100_000,
            tax_rate: 0.05,
            cooldown_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ShopConfig {
    pub tax_rate: f64,
    pub items_per_page: u64,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            tax_rate: 0.05,
            items_per_page: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct BankConfig {
    pub max_balance: i64,
    pub daily_deposit_limit: i64,
    pub deposit_tax_rate: f64,
    pub maintenance_fee_rate: f64,
    /// Accounts at or below this balance pay no maintenance fee
    pub maintenance_threshold: i64,
    pub fee_interval_secs: i64,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            max_balance: 100_000,
            daily_deposit_limit: 15_000,
            deposit_tax_rate: 0.02,
            maintenance_fee_rate: 0.02,
            maintenance_threshold: 500,
            fee_interval_secs: 86_400,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct PublicBankConfig {
    pub withdraw_min: i64,
    pub withdraw_max: i64,
    pub daily_limit: i64,
    pub cooldown_secs: i64,
}

impl Default for PublicBankConfig {
    fn default() -> Self {
        Self {
            withdraw_min: 50,
            withdraw_max: 1_000,
            daily_limit: 2_000,
            cooldown_secs: 1_800,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct DebtConfig {
    pub yellow_threshold: i64,
    pub red_threshold: i64,
    pub grace_days: i64,
    pub auto_repay_per_message: i64,
    pub green: DebtLevelRules,
    pub yellow: DebtLevelRules,
    pub red: DebtLevelRules,
}

impl Default for DebtConfig {
    fn default() -> Self {
        Self {
            yellow_threshold: 2_000,
            red_threshold: 5_000,
            grace_days: 7,
            auto_repay_per_message: 2,
            green: DebtLevelRules {
                max_withdraw: 1_000,
                cooldown_factor: 1.0,
                daily_interest_rate: 0.0,
            },
            yellow: DebtLevelRules {
                max_withdraw: 500,
                cooldown_factor: 1.5,
                daily_interest_rate: 0.002,
            },
            red: DebtLevelRules {
                max_withdraw: 200,
                cooldown_factor: 2.0,
                daily_interest_rate: 0.005,
            },
        }
    }
}

/// Restrictions attached to one debt level.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DebtLevelRules {
    /// Largest single public bank withdrawal
    pub max_withdraw: i64,
    /// Multiplier applied to the public bank cooldown
    pub cooldown_factor: f64,
    /// Interest charged per day on the whole debt
    pub daily_interest_rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct LoanConfig {
    pub max_amount: i64,
    pub daily_interest_rate: f64,
    pub overdue_penalty_rate: f64,
    pub duration_days: i64,
}

impl Default for LoanConfig {
    fn default() -> Self {
        Self {
            max_amount: 20_000,
            daily_interest_rate: 0.02,
            overdue_penalty_rate: 0.10,
            duration_days: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct XpConfig {
    pub per_message: i64,
    pub cooldown_secs: i64,
    pub base_requirement: i64,
    pub requirement_growth: f64,
}

impl Default for XpConfig {
    fn default() -> Self {
        Self {
            per_message: 10,
            cooldown_secs: 60,
            base_requirement: 150,
            requirement_growth: 1.35,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct RewardConfig {
    pub pb_per_message: i64,
    pub cooldown_secs: i64,
    pub min_length: usize,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            pb_per_message: 1,
            cooldown_secs: 20,
            min_length: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct CasinoConfig {
    pub roulette_cooldown_secs: i64,
    pub rps_cooldown_secs: i64,
    pub rps_expiry_secs: i64,
}

impl Default for CasinoConfig {
    fn default() -> Self {
        Self {
            roulette_cooldown_secs: 4,
            rps_cooldown_secs: 10,
            rps_expiry_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct StealConfig {
    pub cooldown_secs: i64,
    pub success_rate: f64,
    pub steal_fraction: f64,
    pub fail_penalty_fraction: f64,
}

impl Default for StealConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 1_800,
            success_rate: 0.5,
            steal_fraction: 0.25,
            fail_penalty_fraction: 0.5,
        }
    }
}

/// Bank heist odds and payouts. Rates ending in `_rate` are percentages of a 1-100 roll.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct HeistConfig {
    pub min_amount: i64,
    pub max_amount: i64,
    pub success_base_rate: f64,
    pub critical_success_rate: i64,
    pub critical_failure_rate: i64,
    pub success_multiplier: f64,
    pub critical_success_multiplier: f64,
    pub failure_penalty_rate: f64,
    pub critical_failure_penalty_rate: f64,
    pub cooldown_secs: i64,
    /// Wallet needed before attempting
    pub min_balance: i64,
    /// Attempts allowed per UTC day
    pub max_daily: i32,
    /// Wallet at which the wealth factor reaches 1.0
    pub wealth_reference: i64,
    pub max_wealth_factor: f64,
    /// Target at which the difficulty penalty is fully applied
    pub difficulty_amount: i64,
    pub difficulty_weight: f64,
}

impl Default for HeistConfig {
    fn default() -> Self {
        Self {
            min_amount: 100,
            max_amount: 50_000,
            success_base_rate: 40.0,
            critical_success_rate: 5,
            critical_failure_rate: 10,
            success_multiplier: 1.5,
            critical_success_multiplier: 3.0,
            failure_penalty_rate: 0.7,
            critical_failure_penalty_rate: 1.2,
            cooldown_secs: 7_200,
            min_balance: 500,
            max_daily: 5,
            wealth_reference: 50_000,
            max_wealth_factor: 1.2,
            difficulty_amount: 10_000,
            difficulty_weight: 0.3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ClanConfig {
    pub name_min_length: usize,
    pub name_max_length: usize,
    pub create_cost: i64,
    pub join_cost: i64,
    pub base_capacity: u64,
    pub capacity_per_level: u64,
    /// Cost of each capacity level, in order; its length is the maximum level
    pub capacity_upgrade_costs: Vec<i64>,
    /// Cost of each PB boost level, in order; its length is the maximum level
    pub boost_costs: Vec<i64>,
    pub boost_increment: f64,
}

impl Default for ClanConfig {
    fn default() -> Self {
        Self {
            name_min_length: 3,
            name_max_length: 24,
            create_cost: 5_000,
            join_cost: 1_000,
            base_capacity: 10,
            capacity_per_level: 5,
            capacity_upgrade_costs: vec![5_000, 10_000, 20_000],
            boost_costs: vec![7_500, 15_000, 30_000],
            boost_increment: 0.05,
        }
    }
}

/// One entry of the pet catalog
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[allow(missing_docs)]
pub struct PetDefinition {
    pub name: String,
    pub rarity: String,
    pub base_income_per_hour: i64,
    /// Relative weight when opening an egg
    pub drop_rate: f64,
    #[serde(default)]
    pub is_huge: bool,
}

impl PetDefinition {
    fn new(name: &str, rarity: &str, income: i64, drop_rate: f64, is_huge: bool) -> Self {
        Self {
            name: name.to_string(),
            rarity: rarity.to_string(),
            base_income_per_hour: income,
            drop_rate,
            is_huge,
        }
    }
}

/// A pet zone. Eggs of a zone with an entry cost can only be opened once it is unlocked.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[allow(missing_docs)]
pub struct ZoneDefinition {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub entry_cost: i64,
    /// XP level needed to enter
    #[serde(default = "first_level")]
    pub level_required: i32,
}

const fn first_level() -> i32 {
    1
}

/// One weighted entry of an egg's drop table
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[allow(missing_docs)]
pub struct EggDrop {
    pub pet: String,
    pub weight: f64,
}

/// An egg that can be bought and hatched
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[allow(missing_docs)]
pub struct EggDefinition {
    pub slug: String,
    pub name: String,
    pub price: i64,
    /// Slug of the zone selling this egg
    pub zone: String,
    /// Drop table; empty means every catalog pet at its `drop_rate`
    #[serde(default)]
    pub drops: Vec<EggDrop>,
}

impl ZoneDefinition {
    fn new(slug: &str, name: &str, entry_cost: i64, level_required: i32) -> Self {
        Self {
            slug: slug.to_string(),
            name: name.to_string(),
            entry_cost,
            level_required,
        }
    }
}

impl EggDefinition {
    fn new(slug: &str, name: &str, price: i64, zone: &str, drops: &[(&str, f64)]) -> Self {
        Self {
            slug: slug.to_string(),
            name: name.to_string(),
            price,
            zone: zone.to_string(),
            drops: drops
                .iter()
                .map(|(pet, weight)| EggDrop {
                    pet: (*pet).to_string(),
                    weight: *weight,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct PetConfig {
    pub base_slots: u64,
    pub gold_chance: f64,
    pub gold_multiplier: i64,
    pub gold_combine_required: u64,
    pub huge_min_income: i64,
    pub huge_multiplier: i64,
    /// Egg opened when none is named
    pub default_egg: String,
    pub catalog: Vec<PetDefinition>,
    pub zones: Vec<ZoneDefinition>,
    pub eggs: Vec<EggDefinition>,
}

impl PetConfig {
    /// Finds an egg by slug or name, case-insensitively.
    #[must_use]
    pub fn egg(&self, key: &str) -> Option<&EggDefinition> {
        let key = key.trim();
        self.eggs
            .iter()
            .find(|egg| egg.slug.eq_ignore_ascii_case(key) || egg.name.eq_ignore_ascii_case(key))
    }

    /// Finds a zone by slug.
    #[must_use]
    pub fn zone(&self, slug: &str) -> Option<&ZoneDefinition> {
        self.zones.iter().find(|zone| zone.slug == slug)
    }

    /// Catalog indices and weights an egg can hatch.
    #[must_use]
    pub fn drop_table(&self, egg: &EggDefinition) -> Vec<(usize, f64)> {
        if egg.drops.is_empty() {
            return self
                .catalog
                .iter()
                .enumerate()
                .map(|(index, pet)| (index, pet.drop_rate))
                .collect();
        }
        egg.drops
            .iter()
            .filter_map(|drop| {
                let index = self.catalog.iter().position(|pet| pet.name == drop.pet)?;
                Some((index, drop.weight))
            })
            .collect()
    }
}

impl Default for PetConfig {
    fn default() -> Self {
        Self {
            base_slots: 4,
            gold_chance: 0.02,
            gold_multiplier: 3,
            gold_combine_required: 5,
            huge_min_income: 500,
            huge_multiplier: 2,
            default_egg: "basic".to_string(),
            catalog: vec![
                PetDefinition::new("Shelly", "Common", 10, 50.0, false),
                PetDefinition::new("Colt", "Uncommon", 25, 30.0, false),
                PetDefinition::new("Bull", "Rare", 60, 14.0, false),
                PetDefinition::new("Spike", "Epic", 150, 5.0, false),
                PetDefinition::new("Leon", "Legendary", 400, 0.99, false),
                PetDefinition::new("Huge Shelly", "Huge", 0, 0.01, true),
            ],
            zones: vec![
                ZoneDefinition::new("starter", "Starter Meadow", 0, 1),
                ZoneDefinition::new("desert", "Scorching Desert", 25_000, 10),
            ],
            eggs: vec![
                EggDefinition::new("basic", "Basic Egg", 500, "starter", &[]),
                EggDefinition::new(
                    "desert",
                    "Desert Egg",
                    2_500,
                    "desert",
                    &[
                        ("Colt", 55.0),
                        ("Bull", 30.0),
                        ("Spike", 12.0),
                        ("Leon", 2.9),
                        ("Huge Shelly", 0.1),
                    ],
                ),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct LeaderboardConfig {
    pub max_entries: u64,
    pub history_page_size: u64,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            max_entries: 20,
            history_page_size: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ActivityConfig {
    /// Members who spoke within this many days count as active
    pub active_window_days: i64,
    /// Default length of the most-active ranking
    pub top_limit: u64,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            active_window_days: 7,
            top_limit: 10,
        }
    }
}

/// Loads the economy configuration from a TOML file.
///
/// A missing file yields the defaults; an unreadable or malformed one is an error.
///
/// # Errors
/// Returns [`Error::Config`] if the file cannot be read or parsed, or fails validation.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EconomyConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::warn!("{} not found, using default economy settings", path.display());
        return Ok(EconomyConfig::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    parse_config(&contents)
}

/// Parses and validates economy configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<EconomyConfig> {
    let config: EconomyConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.validate()?;
    Ok(config)
}

impl EconomyConfig {
    /// Rejects settings the game logic cannot work with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| {
            Err(Error::Config {
                message: message.to_string(),
            })
        };

        if self.daily.min > self.daily.max || self.daily.bonus_min > self.daily.bonus_max {
            return invalid("daily ranges must have min <= max");
        }
        if self.transfer.min < 1 || self.transfer.min > self.transfer.max {
            return invalid("transfer limits must satisfy 1 <= min <= max");
        }
        if self.public_bank.withdraw_min > self.public_bank.withdraw_max {
            return invalid("public bank withdraw_min must not exceed withdraw_max");
        }
        if self.debt.yellow_threshold > self.debt.red_threshold {
            return invalid("debt yellow_threshold must not exceed red_threshold");
        }
        for rules in [&self.debt.green, &self.debt.yellow, &self.debt.red] {
            if rules.max_withdraw < 0
                || rules.cooldown_factor < 0.0
                || rules.daily_interest_rate < 0.0
            {
                return invalid("debt level rules must not be negative");
            }
        }
        if self.heist.min_amount < 1 || self.heist.min_amount > self.heist.max_amount {
            return invalid("heist limits must satisfy 1 <= min_amount <= max_amount");
        }
        if self.heist.critical_success_rate + self.heist.critical_failure_rate > 100 {
            return invalid("heist critical rates must fit in a 1-100 roll");
        }
        if self.xp.base_requirement <= 0 || self.xp.requirement_growth < 1.0 {
            return invalid("xp requirement must be positive and non-decreasing");
        }
        self.pets.validate()?;
        Ok(())
    }
}

impl PetConfig {
    fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(Error::Config { message });

        if self.catalog.iter().all(|pet| pet.drop_rate <= 0.0) {
            return invalid("pet catalog needs at least one pet with a positive drop rate".into());
        }
        if self.egg(&self.default_egg).is_none() {
            return invalid(format!("default egg `{}` is not defined", self.default_egg));
        }
        for egg in &self.eggs {
            if self.zone(&egg.zone).is_none() {
                return invalid(format!("egg `{}` sells in unknown zone `{}`", egg.slug, egg.zone));
            }
            if let Some(drop) = egg
                .drops
                .iter()
                .find(|drop| !self.catalog.iter().any(|pet| pet.name == drop.pet))
            {
                return invalid(format!("egg `{}` drops unknown pet `{}`", egg.slug, drop.pet));
            }
            if self.drop_table(egg).iter().all(|(_, weight)| *weight <= 0.0) {
                return invalid(format!("egg `{}` has no positive drop weight", egg.slug));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.daily.min, 50);
        assert_eq!(config.transfer.max, 100_000);
        assert_eq!(config.bank.daily_deposit_limit, 15_000);
        assert_eq!(config.leaderboard.max_entries, 20);
        assert_eq!(config.pets.catalog.len(), 6);
    }

    #[test]
    fn test_partial_table_keeps_other_defaults() {
        let config = parse_config(
            r"
            [transfer]
            tax_rate = 0.1

            [clan]
            create_cost = 42
            ",
        )
        .unwrap();
        assert_eq!(config.transfer.tax_rate, 0.1);
        assert_eq!(config.transfer.min, 1);
        assert_eq!(config.clan.create_cost, 42);
        assert_eq!(config.clan.join_cost, 1_000);
    }

    #[test]
    fn test_custom_pet_catalog() {
        let config = parse_config(
            r#"
            [pets]
            default_egg = "crow"
            zones = [{ slug = "roost", name = "Roost" }]

            [[pets.catalog]]
            name = "Crow"
            rarity = "Mythic"
            base_income_per_hour = 900
            drop_rate = 1.0

            [[pets.eggs]]
            slug = "crow"
            name = "Crow Egg"
            price = 42
            zone = "roost"
            "#,
        )
        .unwrap();
        assert_eq!(config.pets.catalog.len(), 1);
        assert!(!config.pets.catalog[0].is_huge);
        assert_eq!(config.pets.zones[0].level_required, 1);
        assert_eq!(config.pets.egg("Crow Egg").map(|e| e.price), Some(42));
    }

    #[test]
    fn test_egg_drops_must_exist_in_catalog() {
        let result = parse_config(
            r#"
            [[pets.catalog]]
            name = "Crow"
            rarity = "Mythic"
            base_income_per_hour = 900
            drop_rate = 1.0
            "#,
        );
        // the default desert egg still drops Colt
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_default_drop_tables() {
        let pets = PetConfig::default();
        let basic = pets.egg("basic").unwrap();
        assert_eq!(pets.drop_table(basic).len(), 6);

        let desert = pets.egg("DESERT").unwrap();
        let table = pets.drop_table(desert);
        assert_eq!(table.first(), Some(&(1, 55.0)));
        assert!(table.iter().all(|(index, _)| *index > 0));
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let result = parse_config("[daily]\nmin = 500\nmax = 10\n");
        assert!(matches!(result, Err(Error::Config { .. })));

        let result = parse_config("[transfer]\nmin = 0\n");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_malformed_toml_is_error() {
        let result = parse_config("[daily\nmin = ");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_missing_file_returns_defaults() {
        let config = load_config("/definitely/not/here/config.toml").unwrap();
        assert_eq!(config.steal.cooldown_secs, 1_800);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let shipped = parse_config(include_str!("../../config.toml")).unwrap();
        let defaults = EconomyConfig::default();
        assert_eq!(shipped.daily.max, defaults.daily.max);
        assert_eq!(shipped.clan.boost_costs, defaults.clan.boost_costs);
        assert_eq!(shipped.pets.catalog, defaults.pets.catalog);
        assert_eq!(shipped.loan.daily_interest_rate, defaults.loan.daily_interest_rate);
        assert_eq!(shipped.debt.red, defaults.debt.red);
        assert_eq!(shipped.debt.yellow, defaults.debt.yellow);
        assert_eq!(shipped.pets.eggs, defaults.pets.eggs);
        assert_eq!(shipped.pets.zones, defaults.pets.zones);
        assert_eq!(shipped.heist.max_daily, defaults.heist.max_daily);
        assert_eq!(shipped.activity.top_limit, defaults.activity.top_limit);
    }
}

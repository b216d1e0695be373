//! Process settings read from environment variables (and `.env`).

use crate::errors::{Error, Result};

/// Default `SQLite` database used when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/ecobot.sqlite?mode=rwc";

/// Default prefix for text commands.
pub const DEFAULT_PREFIX: &str = "e!";

/// Runtime settings that are not part of the economy tuning
#[derive(Debug, Clone)]
pub struct Settings {
    /// Discord bot token
    pub token: String,
    /// sea-orm connection string (`postgres://...` or `sqlite://...`)
    pub database_url: String,
    /// Prefix for text commands
    pub prefix: String,
    /// Discord user allowed to run admin commands regardless of guild permissions
    pub owner_id: Option<u64>,
    /// Path of the economy TOML file
    pub config_path: String,
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    /// Returns an error if `DISCORD_TOKEN` is missing or `OWNER_ID` is not a number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("DISCORD_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(Error::EnvVar(std::env::VarError::NotPresent))?;

        let owner_id = lookup("OWNER_ID")
            .filter(|v| !v.trim().is_empty())
            .map(|v| {
                v.trim().parse::<u64>().map_err(|e| Error::Config {
                    message: format!("OWNER_ID must be a Discord user id: {e}"),
                })
            })
            .transpose()?;

        Ok(Self {
            token,
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            prefix: lookup("COMMAND_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            owner_id,
            config_path: lookup("ECOBOT_CONFIG").unwrap_or_else(|| "config.toml".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let settings = Settings::from_lookup(lookup_from(&[("DISCORD_TOKEN", "abc")])).unwrap();
        assert_eq!(settings.token, "abc");
        assert_eq!(settings.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(settings.prefix, "e!");
        assert_eq!(settings.owner_id, None);
        assert_eq!(settings.config_path, "config.toml");
    }

    #[test]
    fn test_missing_token_is_error() {
        let result = Settings::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(Error::EnvVar(_))));
    }

    #[test]
    fn test_owner_id_parsed() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("DISCORD_TOKEN", "abc"),
            ("OWNER_ID", " 1234 "),
            ("COMMAND_PREFIX", "!"),
        ]))
        .unwrap();
        assert_eq!(settings.owner_id, Some(1234));
        assert_eq!(settings.prefix, "!");

        let bad = Settings::from_lookup(lookup_from(&[
            ("DISCORD_TOKEN", "abc"),
            ("OWNER_ID", "me"),
        ]));
        assert!(matches!(bad, Err(Error::Config { .. })));
    }
}

//! Error types shared by the core logic and the Discord layer.
//!
//! Variants that describe a refused action (insufficient funds, cooldowns, limits, rule checks)
//! are shown to the user verbatim. Everything else is logged and replaced by a generic message.

use thiserror::Error;

/// All errors produced by `EcoBot`.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// An amount was zero, negative, or outside the accepted range
    #[error("Invalid amount: {amount} PB")]
    InvalidAmount {
        /// The rejected amount
        amount: i64,
    },

    /// The wallet (or account) does not hold enough PrissBucks
    #[error("Insufficient funds: you have {current} PB but {required} PB are required")]
    InsufficientFunds {
        /// Balance at the time of the check
        current: i64,
        /// Amount the operation needed
        required: i64,
    },

    /// The action is still on cooldown
    #[error("Slow down! Try again in {}", format_duration(*remaining_secs))]
    OnCooldown {
        /// Seconds until the action is available again
        remaining_secs: i64,
    },

    /// A daily or capacity limit was reached
    #[error("{message}")]
    LimitExceeded {
        /// Description of the exceeded limit
        message: String,
    },

    /// A referenced entity does not exist
    #[error("{what} not found")]
    NotFound {
        /// Human readable name of the missing thing
        what: String,
    },

    /// A business rule refused the action
    #[error("{message}")]
    Rule {
        /// Explanation shown to the user
        message: String,
    },

    /// Database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Missing or malformed environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Formatting a response failed
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// Integer conversion failed
    #[error("Conversion error: {0}")]
    Conversion(#[from] std::num::TryFromIntError),

    /// Serenity/Poise framework error
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

impl Error {
    /// Builds a [`Error::Rule`] from anything displayable.
    pub fn rule(message: impl Into<String>) -> Self {
        Self::Rule {
            message: message.into(),
        }
    }

    /// Builds a [`Error::NotFound`] for the named thing.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Whether the message can be shown to the user as-is.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount { .. }
                | Self::InsufficientFunds { .. }
                | Self::OnCooldown { .. }
                | Self::LimitExceeded { .. }
                | Self::NotFound { .. }
                | Self::Rule { .. }
        )
    }
}

/// Formats a number of seconds as `1h 2m 3s`, dropping leading zero units.
#[must_use]
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(5), "5s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(3723), "1h 2m 3s");
        assert_eq!(format_duration(-4), "0s");
    }

    #[test]
    fn test_user_facing_classification() {
        assert!(Error::rule("nope").is_user_facing());
        assert!(Error::OnCooldown { remaining_secs: 3 }.is_user_facing());
        assert!(!Error::Config { message: "x".into() }.is_user_facing());
        assert!(
            !Error::Database(sea_orm::DbErr::Custom("boom".into())).is_user_facing()
        );
    }

    #[test]
    fn test_cooldown_message() {
        let err = Error::OnCooldown { remaining_secs: 90 };
        assert_eq!(err.to_string(), "Slow down! Try again in 1m 30s");
    }
}

/// Database connection and schema creation
pub mod database;

/// Economy tuning loaded from config.toml
pub mod economy;

/// Token, database URL and other environment settings
pub mod settings;

pub use economy::EconomyConfig;
pub use settings::Settings;

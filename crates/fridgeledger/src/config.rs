//! Ledger configuration.

use chrono_tz::Tz;
use fridgeledger_store::{LedgerError, Store, DEFAULT_SHELF_LIFE_DAYS};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Database location used when none is given.
pub const DEFAULT_DB_PATH: &str = "./data/inventory.db";

/// Timezone used to resolve "today" and zoned timestamps when none is given.
pub const DEFAULT_TIMEZONE: Tz = Tz::Asia__Shanghai;

/// Errors building a [`Config`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Not an IANA timezone name.
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),
    /// A shelf life of zero days.
    #[error("default shelf life must be at least one day")]
    ZeroShelfLife,
}

/// Where the ledger lives and how dates are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path of the SQLite database file.
    pub db_path: PathBuf,
    /// Timezone for "today" and for zoned date inputs.
    pub timezone: Tz,
    /// Shelf life registered for names stocked without any expiry.
    pub default_shelf_life_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            timezone: DEFAULT_TIMEZONE,
            default_shelf_life_days: DEFAULT_SHELF_LIFE_DAYS,
        }
    }
}

impl Config {
    /// Start from the defaults.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Open the configured ledger, creating the database if needed.
    pub fn open_store(&self) -> Result<Store, LedgerError> {
        debug!(
            db = %self.db_path.display(),
            tz = %self.timezone,
            fallback_days = self.default_shelf_life_days,
            "opening ledger"
        );
        Store::open(&self.db_path, self.timezone)?
            .with_fallback_shelf_life(self.default_shelf_life_days)
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the database path.
    #[must_use]
    pub fn db_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.db_path = path.as_ref().to_path_buf();
        self
    }

    /// Set the timezone.
    #[must_use]
    pub fn timezone(mut self, tz: Tz) -> Self {
        self.config.timezone = tz;
        self
    }

    /// Set the timezone from an IANA name such as `Europe/Berlin`.
    pub fn timezone_name(self, name: &str) -> Result<Self, ConfigError> {
        let tz = parse_timezone(name)?;
        Ok(self.timezone(tz))
    }

    /// Set the fallback shelf life in days.
    pub fn default_shelf_life_days(mut self, days: u32) -> Result<Self, ConfigError> {
        if days == 0 {
            return Err(ConfigError::ZeroShelfLife);
        }
        self.config.default_shelf_life_days = days;
        Ok(self)
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Config {
        self.config
    }
}

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ConfigError::UnknownTimezone(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::builder().build();
        assert_eq!(config.db_path, PathBuf::from("./data/inventory.db"));
        assert_eq!(config.timezone, Tz::Asia__Shanghai);
        assert_eq!(config.default_shelf_life_days, 7);
    }

    #[test]
    fn test_builder_overrides() {
        let config = Config::builder()
            .db_path("/tmp/fridge.db")
            .timezone_name("Europe/Berlin")
            .unwrap()
            .default_shelf_life_days(3)
            .unwrap()
            .build();
        assert_eq!(config.db_path, PathBuf::from("/tmp/fridge.db"));
        assert_eq!(config.timezone, Tz::Europe__Berlin);
        assert_eq!(config.default_shelf_life_days, 3);
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let err = Config::builder().timezone_name("Mars/Olympus").unwrap_err();
        assert_eq!(err, ConfigError::UnknownTimezone("Mars/Olympus".to_string()));
    }

    #[test]
    fn test_zero_shelf_life_rejected() {
        assert_eq!(
            Config::builder().default_shelf_life_days(0).unwrap_err(),
            ConfigError::ZeroShelfLife
        );
    }

    #[test]
    fn test_open_store_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("inventory.db");
        let config = Config::builder().db_path(&path).build();

        let store = config.open_store().unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        assert!(path.exists());
    }
}

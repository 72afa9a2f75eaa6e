use crate::core::{DbError, Result};
use std::path::{Path, PathBuf};

pub const SNAPSHOT_ENV: &str = "BLOGDB_SNAPSHOT";
pub const BCRYPT_COST_ENV: &str = "BLOGDB_BCRYPT_COST";

/// Work factors accepted by bcrypt.
const PASSWORD_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

/// Database configuration
///
/// Defaults to a purely in-memory store and `bcrypt::DEFAULT_COST`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Snapshot file restored on open and rewritten on every commit
    pub snapshot_path: Option<PathBuf>,

    /// bcrypt work factor for new passwords
    pub password_cost: u32,
}

impl DbConfig {
    pub fn new() -> Self {
        Self {
            snapshot_path: None,
            password_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Build a configuration from `BLOGDB_SNAPSHOT` and `BLOGDB_BCRYPT_COST`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::new();
        if let Some(path) = lookup(SNAPSHOT_ENV).filter(|p| !p.is_empty()) {
            config = config.snapshot_path(path);
        }
        if let Some(raw) = lookup(BCRYPT_COST_ENV) {
            let cost = raw.trim().parse::<u32>().map_err(|_| {
                DbError::InvariantViolation(format!("{} must be an integer, got '{}'", BCRYPT_COST_ENV, raw))
            })?;
            config = config.password_cost(cost);
        }
        config.validate()?;
        Ok(config)
    }

    /// Set the snapshot file
    pub fn snapshot_path(mut self, path: impl AsRef<Path>) -> Self {
        self.snapshot_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the bcrypt cost
    pub fn password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !PASSWORD_COST_RANGE.contains(&self.password_cost) {
            return Err(DbError::InvariantViolation(format!(
                "bcrypt cost must be between {} and {}, got {}",
                PASSWORD_COST_RANGE.start(),
                PASSWORD_COST_RANGE.end(),
                self.password_cost
            )));
        }
        Ok(())
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DbConfig::default();
        assert!(config.snapshot_path.is_none());
        assert_eq!(config.password_cost, bcrypt::DEFAULT_COST);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_and_validation() {
        let config = DbConfig::new().snapshot_path("/tmp/blog.snapshot").password_cost(4);
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/tmp/blog.snapshot")));
        assert!(config.validate().is_ok());
        assert!(DbConfig::new().password_cost(2).validate().is_err());
    }

    #[test]
    fn test_from_lookup() {
        let config = DbConfig::from_lookup(|key| match key {
            SNAPSHOT_ENV => Some("data/blog.snapshot".to_string()),
            BCRYPT_COST_ENV => Some("5".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.snapshot_path, Some(PathBuf::from("data/blog.snapshot")));
        assert_eq!(config.password_cost, 5);

        let err = DbConfig::from_lookup(|key| (key == BCRYPT_COST_ENV).then(|| "fast".to_string()));
        assert!(err.is_err());
        assert_eq!(DbConfig::from_lookup(|_| None).unwrap(), DbConfig::new());
    }
}

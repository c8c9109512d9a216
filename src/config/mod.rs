use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    core::{
        retry::RetryPolicy,
        status_cache::CacheSettings,
        utils::{ensure_dir, PathResolver},
    },
    domain::WeekSplit,
    errors::{LedgerError, Result},
};

const TMP_SUFFIX: &str = "tmp";

/// Tunables for the attendance engine, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Attempts per ledger write before reporting a failure.
    pub retry_attempts: u32,
    /// Delay before the second attempt; doubled for each one after.
    pub retry_backoff_ms: u64,
    pub cache_capacity: u64,
    pub cache_ttl_secs: u64,
    /// Transport fare paid per credited day.
    pub daily_fare: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    pub week_split: WeekSplit,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_backoff_ms: 25,
            cache_capacity: 50_000,
            cache_ttl_secs: 3600,
            daily_fare: Decimal::ZERO,
            data_dir: None,
            week_split: WeekSplit::MondayStart,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.retry_attempts == 0 {
            return Err(LedgerError::Config(
                "retry_attempts must be at least 1".into(),
            ));
        }
        if self.cache_capacity == 0 {
            return Err(LedgerError::Config(
                "cache_capacity must be at least 1".into(),
            ));
        }
        if self.daily_fare.is_sign_negative() {
            return Err(LedgerError::Config(format!(
                "daily_fare must not be negative, got {}",
                self.daily_fare
            )));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            capacity: self.cache_capacity,
            time_to_live: Duration::from_secs(self.cache_ttl_secs),
        }
    }
}

/// Loads and saves [`EngineConfig`] under the application data directory.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(PathResolver::base_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        let config_dir = PathResolver::config_dir_in(&base);
        ensure_dir(&config_dir).map_err(config_io)?;
        Ok(Self {
            path: PathResolver::config_file_in(&base),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns defaults when no config file has been written yet.
    pub fn load(&self) -> Result<EngineConfig> {
        if !self.path.exists() {
            return Ok(EngineConfig::default());
        }
        let data = fs::read_to_string(&self.path).map_err(config_io)?;
        let config: EngineConfig =
            serde_json::from_str(&data).map_err(|err| LedgerError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &EngineConfig) -> Result<()> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config)
            .map_err(|err| LedgerError::Config(err.to_string()))?;
        let mut tmp = self.path.clone();
        tmp.set_extension(format!("json.{TMP_SUFFIX}"));
        let mut file = File::create(&tmp).map_err(config_io)?;
        file.write_all(json.as_bytes()).map_err(config_io)?;
        file.flush().map_err(config_io)?;
        fs::rename(&tmp, &self.path).map_err(config_io)?;
        Ok(())
    }
}

fn config_io(err: std::io::Error) -> LedgerError {
    LedgerError::Config(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).unwrap();
        assert_eq!(manager.load().unwrap(), EngineConfig::default());
    }

    #[test]
    fn save_then_load_keeps_overrides() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).unwrap();
        let config = EngineConfig {
            retry_attempts: 5,
            daily_fare: dec!(12.50),
            week_split: WeekSplit::IsoWeek,
            ..EngineConfig::default()
        };
        manager.save(&config).unwrap();
        assert_eq!(manager.load().unwrap(), config);
        assert!(manager.path().ends_with("config/config.json"));
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).unwrap();
        fs::write(manager.path(), r#"{ "retry_attempts": 7 }"#).unwrap();
        let config = manager.load().unwrap();
        assert_eq!(config.retry_attempts, 7);
        assert_eq!(config.cache_capacity, EngineConfig::default().cache_capacity);
    }

    #[test]
    fn rejects_zero_attempts() {
        let config = EngineConfig {
            retry_attempts: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(LedgerError::Config(_))));
    }
}

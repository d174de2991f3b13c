use crate::models::{ApiKey, CompanyNumber};
use crate::paths::AppDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

const CURRENT_CONFIG_VERSION: u32 = 1;

/// Default poll interval: twice a day. The registry updates slowly and rate
/// limits aggressively.
pub const DEFAULT_UPDATE_INTERVAL_MINUTES: u64 = 720;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_config_version")]
    pub config_version: u32,
    /// One entry per watched company.
    #[serde(default, rename = "watch")]
    pub watches: Vec<WatchConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            watches: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

/// A single watched company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    pub company_number: CompanyNumber,
    /// Inline API key. When absent the key is read from the OS keyring.
    #[serde(default)]
    pub api_key: Option<ApiKey>,
    #[serde(default = "default_update_interval")]
    pub update_interval_minutes: u64,
}

impl WatchConfig {
    pub fn new(company_number: CompanyNumber) -> Self {
        Self {
            company_number,
            api_key: None,
            update_interval_minutes: default_update_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    #[serde(default = "default_max_log_files")]
    pub max_log_files: usize,
    #[serde(default = "default_stdout_enabled")]
    pub stdout: bool,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_log_files: default_max_log_files(),
            stdout: default_stdout_enabled(),
            file_name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("config validation failed: {0}")]
    Validation(ValidationError),
    #[error("failed to prepare configuration directories: {0}")]
    Directories(#[from] crate::paths::DirsError),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("unsupported config_version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("company {company_number} is configured more than once")]
    DuplicateWatch { company_number: CompanyNumber },
    #[error("update interval for {company_number} must be at least 1 minute")]
    IntervalTooShort { company_number: CompanyNumber },
}

impl Config {
    pub fn load_or_default(dirs: &AppDirs) -> Result<Self, ConfigError> {
        dirs.ensure_exists()?;
        let path = Self::config_path(dirs);
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        config.validate().map_err(ConfigError::Validation)?;
        Ok(config)
    }

    pub fn config_path(dirs: &AppDirs) -> PathBuf {
        dirs.config_dir().join("config.toml")
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.config_version != CURRENT_CONFIG_VERSION {
            return Err(ValidationError::UnsupportedVersion {
                found: self.config_version,
                expected: CURRENT_CONFIG_VERSION,
            });
        }

        // Company numbers are normalized on deserialization, so equality here
        // catches "ab123" vs "AB123 " duplicates too.
        let mut seen = HashSet::new();
        for watch in &self.watches {
            if watch.update_interval_minutes < 1 {
                return Err(ValidationError::IntervalTooShort {
                    company_number: watch.company_number.clone(),
                });
            }
            if !seen.insert(&watch.company_number) {
                return Err(ValidationError::DuplicateWatch {
                    company_number: watch.company_number.clone(),
                });
            }
        }
        Ok(())
    }

    /// Finds the watch entry for a company, if configured.
    pub fn watch(&self, company_number: &CompanyNumber) -> Option<&WatchConfig> {
        self.watches
            .iter()
            .find(|watch| &watch.company_number == company_number)
    }
}

fn default_config_version() -> u32 {
    CURRENT_CONFIG_VERSION
}

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL_MINUTES
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_max_log_files() -> usize {
    7
}

fn default_stdout_enabled() -> bool {
    true
}

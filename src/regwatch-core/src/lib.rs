pub mod config;
pub mod logging;
pub mod models;
pub mod paths;
pub mod redact;
pub mod registry;
pub mod secrets;
pub mod sensors;

pub use config::{Config, ConfigError, LogLevel, LoggingConfig, ValidationError, WatchConfig};
pub use logging::{init_logging, LoggingError, LoggingGuard};
pub use models::{ApiKey, CompanyNumber, CompanySnapshot};
pub use paths::{AppDirs, DirsError};
pub use registry::{FetchError, FetchResult, RegistrySource};

pub const APP_NAME: &str = "regwatch";
pub const APP_AUTHOR: &str = "Regwatch";
pub const APP_QUALIFIER: &str = "io";

// Required by Companies House developer guidelines.
pub const ATTRIBUTION: &str = "Data provided by Companies House";

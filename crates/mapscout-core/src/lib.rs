pub mod app_config;
pub mod config;
pub mod records;

pub use app_config::{AppConfig, RandomRange, SessionConfig};
pub use config::{load_app_config, load_app_config_from_env};
pub use records::{PlaceRecord, PlaceRow, NOT_AVAILABLE};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

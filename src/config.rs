//! Configuration management for Elidune circulation

use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use validator::Validate;

use crate::error::AppResult;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `json` or `pretty`
    pub format: String,
}

/// Circulation rules applied by the engine
#[derive(Debug, Deserialize, Clone, Validate)]
#[serde(default)]
pub struct CirculationConfig {
    /// Loan duration when a checkout does not give a due date
    #[validate(range(min = 1, max = 365))]
    pub default_loan_duration_days: u32,
    #[validate(range(min = 1, max = 365))]
    pub extension_duration_days: u32,
    #[validate(range(max = 50))]
    pub max_extensions: u32,
    /// How far ahead to look for an open day before keeping a due date as is
    #[validate(range(min = 1, max = 3650))]
    pub open_day_horizon_days: u32,
    /// Upper bound on cascaded steps drained for one action
    #[validate(range(min = 1, max = 100))]
    pub max_cascade_steps: u32,
}

#[derive(Debug, Deserialize, Clone, Default, Validate)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    #[validate(nested)]
    pub circulation: CirculationConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> AppResult<Self> {
        // A .env file is optional
        dotenvy::dotenv().ok();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (e.g. ELIDUNE_CIRCULATION_CIRCULATION__MAX_EXTENSIONS)
            .add_source(
                Environment::with_prefix("ELIDUNE_CIRCULATION")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("logging.level", env::var("LOG_LEVEL").ok())?
            .build()?;

        Self::from_config(config)
    }

    /// Deserialize and validate an already-built configuration
    pub fn from_config(config: Config) -> AppResult<Self> {
        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for CirculationConfig {
    fn default() -> Self {
        Self {
            default_loan_duration_days: 21,
            extension_duration_days: 21,
            max_extensions: 2,
            open_day_horizon_days: 365,
            max_cascade_steps: 16,
        }
    }
}

//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config.toml
//! structure.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::domain::controller::DEFAULT_MAX_STEP_DELTA_BPS;
use crate::domain::ledger::DEFAULT_MIN_RELEASE_INTERVAL_SECS;
use crate::domain::validator::{DEFAULT_MAX_WEIGHT_BPS, DEFAULT_MIN_WEIGHT_BPS, WHOLE_BPS};
use crate::domain::{AllocationPolicy, WeightPolicy};

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub engine: EngineSection,
    pub allocation: AllocationSection,
    #[serde(rename = "yield")]
    pub yield_release: YieldSection,
    #[serde(default)]
    pub venues: Vec<VenueSection>,
    #[serde(default)]
    pub recommender: RecommenderSection,
    pub logging: LoggingSection,
}

/// Engine / service section
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Identity authorized for weight updates, rebalances, and recipient
    /// changes
    pub admin_id: String,
    /// Seconds between allocation service ticks
    pub poll_interval_secs: u64,
}

/// Allocation policy section
#[derive(Debug, Clone, Deserialize)]
pub struct AllocationSection {
    /// Diversification ceiling per venue in basis points (8000 = 80%)
    #[serde(default = "default_max_weight_bps")]
    pub max_weight_bps: u16,
    /// Minimum participation floor per venue in basis points (500 = 5%)
    #[serde(default = "default_min_weight_bps")]
    pub min_weight_bps: u16,
    /// Whether the participation floor is enforced
    #[serde(default = "default_true")]
    pub enforce_min_weight: bool,
    /// Maximum per-step weight change in basis points (2000 = 20 points)
    #[serde(default = "default_max_step_delta_bps")]
    pub max_step_delta_bps: u16,
}

/// Yield release section
#[derive(Debug, Clone, Deserialize)]
pub struct YieldSection {
    /// Identity receiving released yield
    pub recipient: String,
    /// Minimum seconds between successful releases
    #[serde(default = "default_release_interval")]
    pub min_release_interval_secs: u64,
}

/// Per-venue section (order here fixes the rebalance order)
#[derive(Debug, Clone, Deserialize)]
pub struct VenueSection {
    pub name: String,
    /// Simulated annual yield rate as a decimal fraction (0.05 = 5%)
    pub annual_rate: f64,
    /// Add +/-10% noise to the reported rate
    #[serde(default)]
    pub jitter: bool,
}

/// Recommendation service section (optional)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RecommenderSection {
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the allocation service
    #[serde(default)]
    pub api_url: String,
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

fn default_max_weight_bps() -> u16 {
    DEFAULT_MAX_WEIGHT_BPS
}

fn default_min_weight_bps() -> u16 {
    DEFAULT_MIN_WEIGHT_BPS
}

fn default_max_step_delta_bps() -> u16 {
    DEFAULT_MAX_STEP_DELTA_BPS
}

fn default_release_interval() -> u64 {
    DEFAULT_MIN_RELEASE_INTERVAL_SECS
}

fn default_true() -> bool {
    true
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.admin_id.is_empty() {
            return Err(ConfigError::ValidationError(
                "admin_id must not be empty".to_string(),
            ));
        }

        if self.engine.poll_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_secs must be > 0".to_string(),
            ));
        }

        if self.venues.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one venue must be configured".to_string(),
            ));
        }

        if self.allocation.max_weight_bps > WHOLE_BPS {
            return Err(ConfigError::ValidationError(format!(
                "max_weight_bps must be <= {}, got {}",
                WHOLE_BPS, self.allocation.max_weight_bps
            )));
        }

        if self.allocation.min_weight_bps > self.allocation.max_weight_bps {
            return Err(ConfigError::ValidationError(format!(
                "min_weight_bps {} exceeds max_weight_bps {}",
                self.allocation.min_weight_bps, self.allocation.max_weight_bps
            )));
        }

        if self.allocation.enforce_min_weight
            && self.allocation.min_weight_bps as u32 * self.venues.len() as u32
                > WHOLE_BPS as u32
        {
            return Err(ConfigError::ValidationError(format!(
                "min_weight_bps {} across {} venues cannot sum to {}",
                self.allocation.min_weight_bps,
                self.venues.len(),
                WHOLE_BPS
            )));
        }

        if self.allocation.max_step_delta_bps == 0 {
            return Err(ConfigError::ValidationError(
                "max_step_delta_bps must be > 0".to_string(),
            ));
        }

        if self.yield_release.recipient.is_empty() {
            return Err(ConfigError::ValidationError(
                "yield recipient must not be empty".to_string(),
            ));
        }

        for venue in &self.venues {
            if venue.name.is_empty() {
                return Err(ConfigError::ValidationError(
                    "venue name must not be empty".to_string(),
                ));
            }
            if !(0.0..=10.0).contains(&venue.annual_rate) {
                return Err(ConfigError::ValidationError(format!(
                    "venue '{}' annual_rate {} out of range",
                    venue.name, venue.annual_rate
                )));
            }
        }

        if self.recommender.enabled && self.recommender.api_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "recommender.api_url required when recommender is enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Allocation policy derived from the config bounds.
    pub fn allocation_policy(&self) -> AllocationPolicy {
        AllocationPolicy {
            weights: WeightPolicy {
                max_weight_bps: self.allocation.max_weight_bps,
                min_weight_bps: self.allocation.min_weight_bps,
                enforce_min_weight: self.allocation.enforce_min_weight,
            },
            max_step_delta_bps: self.allocation.max_step_delta_bps,
        }
    }
}

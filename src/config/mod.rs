//! Configuration management for couponbase
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::SourceId;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Coupon source locations
    pub sources: SourcesConfig,

    /// Ingestion pipeline configuration
    pub ingest: IngestConfig,

    /// Coupon rule and discount configuration
    pub validator: ValidatorConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Locations of the three coupon sources
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Path of source 1 (`-` for stdin)
    pub source1: PathBuf,

    /// Path of source 2
    pub source2: PathBuf,

    /// Path of source 3
    pub source3: PathBuf,
}

/// Ingestion pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Distribution channel capacity per load
    pub channel_capacity: usize,

    /// Membership workers per load
    pub workers: usize,

    /// Registry lock shards
    pub shards: usize,

    /// Load the three sources concurrently
    pub parallel_sources: bool,
}

/// Coupon rule and discount configuration
///
/// The source count of a valid code is fixed at two and cannot be configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidatorConfig {
    /// Shortest accepted code, in characters
    pub min_length: usize,

    /// Longest accepted code, in characters
    pub max_length: usize,

    /// Fraction of the subtotal discounted for a valid coupon
    pub discount_rate: Decimal,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl SourcesConfig {
    /// Source id and path pairs in load order
    pub fn locators(&self) -> [(SourceId, PathBuf); 3] {
        [
            (SourceId::One, self.source1.clone()),
            (SourceId::Two, self.source2.clone()),
            (SourceId::Three, self.source3.clone()),
        ]
    }

    /// Path configured for one source
    pub fn path_of(&self, source: SourceId) -> &Path {
        match source {
            SourceId::One => &self.source1,
            SourceId::Two => &self.source2,
            SourceId::Three => &self.source3,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            source1: PathBuf::from("couponbase1"),
            source2: PathBuf::from("couponbase2"),
            source3: PathBuf::from("couponbase3"),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 100,
            workers: 3,
            shards: crate::registry::DEFAULT_SHARDS,
            parallel_sources: false,
        }
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 10,
            discount_rate: Decimal::new(10, 2),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let sources = SourcesConfig {
            source1: std::env::var("COUPONBASE_SOURCE_1")
                .map(PathBuf::from)
                .unwrap_or(defaults.sources.source1),
            source2: std::env::var("COUPONBASE_SOURCE_2")
                .map(PathBuf::from)
                .unwrap_or(defaults.sources.source2),
            source3: std::env::var("COUPONBASE_SOURCE_3")
                .map(PathBuf::from)
                .unwrap_or(defaults.sources.source3),
        };

        let ingest = IngestConfig {
            channel_capacity: env_parse("COUPONBASE_CHANNEL_CAPACITY")
                .unwrap_or(defaults.ingest.channel_capacity),
            workers: env_parse("COUPONBASE_WORKERS").unwrap_or(defaults.ingest.workers),
            shards: env_parse("COUPONBASE_SHARDS").unwrap_or(defaults.ingest.shards),
            parallel_sources: env_parse("COUPONBASE_PARALLEL_SOURCES")
                .unwrap_or(defaults.ingest.parallel_sources),
        };

        let discount_rate = match std::env::var("COUPONBASE_DISCOUNT_RATE") {
            Ok(raw) => raw
                .parse::<Decimal>()
                .with_context(|| format!("Invalid COUPONBASE_DISCOUNT_RATE: {raw}"))?,
            Err(_) => defaults.validator.discount_rate,
        };

        let validator = ValidatorConfig {
            min_length: env_parse("COUPONBASE_MIN_LENGTH").unwrap_or(defaults.validator.min_length),
            max_length: env_parse("COUPONBASE_MAX_LENGTH").unwrap_or(defaults.validator.max_length),
            discount_rate,
        };

        let logging = LoggingConfig {
            level: std::env::var("COUPONBASE_LOG_LEVEL").unwrap_or(defaults.logging.level),
            format: std::env::var("COUPONBASE_LOG_FORMAT").unwrap_or(defaults.logging.format),
        };

        Ok(Self {
            sources,
            ingest,
            validator,
            logging,
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.ingest.channel_capacity == 0 {
            anyhow::bail!("channel_capacity must be greater than 0");
        }

        if self.ingest.workers == 0 {
            anyhow::bail!("workers must be greater than 0");
        }

        if self.ingest.shards == 0 {
            anyhow::bail!("shards must be greater than 0");
        }

        if self.validator.min_length == 0 || self.validator.min_length > self.validator.max_length {
            anyhow::bail!(
                "coupon length bounds must satisfy 1 <= min_length <= max_length (got {}..={})",
                self.validator.min_length,
                self.validator.max_length
            );
        }

        if self.validator.discount_rate < Decimal::ZERO || self.validator.discount_rate > Decimal::ONE {
            anyhow::bail!("discount_rate must be between 0 and 1");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("log format must be 'text' or 'json'");
        }

        Ok(())
    }
}

//! Configuration loading and typed config structures.
//!
//! The canonical configuration lives in `cellblock-config.yaml`. Every
//! section and field is optional; missing values fall back to the defaults
//! below, which match the live server's tuning (30 tracked damage per
//! attacker, 6 base splash damage, damage-descending credit order).

use std::path::Path;

use cellblock_types::RankingStrategy;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The file parsed but a value is out of range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CellBlockConfig {
    /// Damage accumulation and ranking.
    #[serde(default)]
    pub damage: DamageConfig,

    /// Splash potion scoring.
    #[serde(default)]
    pub potion: PotionConfig,

    /// Periodic decay applied by the engine.
    #[serde(default)]
    pub decay: DecayConfig,

    /// Engine tick pacing.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CellBlockConfig {
    /// Load and validate configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.damage.max_damage <= Decimal::ZERO {
            return Err(invalid(format!(
                "damage.max_damage must be positive, got {}",
                self.damage.max_damage
            )));
        }
        if self.potion.base_damage < Decimal::ZERO {
            return Err(invalid(format!(
                "potion.base_damage must not be negative, got {}",
                self.potion.base_damage
            )));
        }
        if self.decay.rate < Decimal::ZERO {
            return Err(invalid(format!(
                "decay.rate must not be negative, got {}",
                self.decay.rate
            )));
        }
        if self.engine.tick_length_ms == 0 {
            return Err(invalid("engine.tick_length_ms must be positive".to_owned()));
        }
        Ok(())
    }
}

fn invalid(reason: String) -> ConfigError {
    ConfigError::Invalid { reason }
}

/// Damage accumulation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DamageConfig {
    /// Most damage a single attacker can have on record against one victim.
    #[serde(default = "default_max_damage")]
    pub max_damage: Decimal,

    /// Order used when no strategy is passed to the query.
    #[serde(default)]
    pub ranking: RankingStrategy,
}

impl Default for DamageConfig {
    fn default() -> Self {
        Self {
            max_damage: default_max_damage(),
            ranking: RankingStrategy::default(),
        }
    }
}

/// Splash potion settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PotionConfig {
    /// Damage credited for a full-intensity hit by a plain harmful potion.
    #[serde(default = "default_potion_damage")]
    pub base_damage: Decimal,
}

impl Default for PotionConfig {
    fn default() -> Self {
        Self {
            base_damage: default_potion_damage(),
        }
    }
}

/// Decay settings. The core never schedules decay itself; these values are
/// read by whatever drives it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DecayConfig {
    /// Damage removed from every record per decay pass.
    #[serde(default = "default_decay_rate")]
    pub rate: Decimal,

    /// Ticks between decay passes. Zero disables decay.
    #[serde(default = "default_decay_interval_ticks")]
    pub interval_ticks: u64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            rate: default_decay_rate(),
            interval_ticks: default_decay_interval_ticks(),
        }
    }
}

/// Engine pacing and simulated time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Real-time milliseconds between ticks. Zero replays as fast as
    /// possible; simulated time is unaffected.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Simulated milliseconds each tick advances the clock. Must be positive.
    #[serde(default = "default_tick_length_ms")]
    pub tick_length_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            tick_length_ms: default_tick_length_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_max_damage() -> Decimal {
    Decimal::from(30_u32)
}

fn default_potion_damage() -> Decimal {
    Decimal::from(6_u32)
}

fn default_decay_rate() -> Decimal {
    Decimal::ONE
}

const fn default_decay_interval_ticks() -> u64 {
    20
}

const fn default_tick_interval_ms() -> u64 {
    50
}

const fn default_tick_length_ms() -> u64 {
    50
}

fn default_log_level() -> String {
    "info".to_owned()
}

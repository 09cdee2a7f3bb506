//! Damage attribution core for `CellBlock`.
//!
//! This crate decides who gets credit when a player is hurt. Every hit is
//! credited to a single responsible player and accumulated per victim, per
//! attacker, with a cap, a timestamp, and optional decay. Credit can then be
//! handed out most-damage-first or most-recent-first.
//!
//! # Modules
//!
//! - [`clock`] -- [`Clock`] trait, wall clock, and manual clock for tests.
//! - [`config`] -- Configuration loading from `cellblock-config.yaml`.
//! - [`error`] -- [`DamageError`] for registry operations.
//! - [`log`] -- [`DamageLog`]: all damage against one victim and its orders.
//! - [`manager`] -- [`DamageManager`]: the victim registry and public API.
//! - [`oracle`] -- Presence and tag questions answered by the host.
//! - [`record`] -- [`DamageRecord`]: one attacker's running total.
//!
//! The manager is internally synchronized and meant to be shared as
//! `Arc<DamageManager>` between whichever threads dispatch game events.

pub mod clock;
pub mod config;
pub mod error;
pub mod log;
pub mod manager;
pub mod oracle;
pub mod record;

// Re-export primary types at crate root for convenience.
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    CellBlockConfig, ConfigError, DamageConfig, DecayConfig, EngineConfig, LoggingConfig, PotionConfig,
};
pub use error::{DamageError, IdentityRole};
pub use log::DamageLog;
pub use manager::{DamageManager, DecaySummary};
pub use oracle::{AlwaysPresent, NeverTagged, PlayerRoster, PresenceOracle, TagOracle, TagRegistry};
pub use record::DamageRecord;

//! Shared type definitions for `CellBlock` damage attribution.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for players and other entities
//! - [`enums`] -- Ranking strategy and potion effect enumerations
//! - [`events`] -- Combat events and damage sources forwarded by the host

pub mod enums;
pub mod events;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use enums::{PotionEffect, RankingStrategy};
pub use events::{Actor, CombatEvent, DamageSource, SplashTarget};
pub use ids::{EntityId, PlayerId};

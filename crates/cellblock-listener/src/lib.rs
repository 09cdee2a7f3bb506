//! Combat event handling for `CellBlock` damage attribution.
//!
//! This crate sits between the host runtime and `cellblock-core`. It works
//! out which player is behind each hit and feeds the damage registry.
//!
//! # Modules
//!
//! - [`attribution`] -- Resolving projectiles and owned creatures to players
//! - [`listener`] -- [`DamageListener`]: death, quit, damage, and splash handling
//! - [`potion`] -- Splash potion damage scoring

pub mod attribution;
pub mod listener;
pub mod potion;

// Re-export primary types at crate root for convenience.
pub use attribution::resolve_damager;
pub use listener::{DamageListener, IgnoreReason, ListenerOutcome};

//! Resolving a damage source to the player responsible for it.
//!
//! Credit always goes to a player. A tamed creature's bite is credited to
//! its owner and an arrow to whoever loosed it; if the chain ends anywhere
//! other than a player, nobody is credited and the hit must not be
//! recorded.

use cellblock_types::{Actor, DamageSource, PlayerId};

/// Find the player to credit for a hit from `source`.
///
/// Returns `None` for environmental damage and for creatures or projectiles
/// without a player behind them. Pure: nothing is looked up or mutated.
pub fn resolve_damager(source: &DamageSource) -> Option<PlayerId> {
    match *source {
        DamageSource::Player(player) => Some(player),
        DamageSource::OwnedAgent { owner, .. } => owner.and_then(Actor::player),
        DamageSource::Projectile { shooter, .. } => shooter.and_then(Actor::player),
        DamageSource::Environment => None,
    }
}

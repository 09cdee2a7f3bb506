//! Combat events forwarded by the host runtime.
//!
//! The host's event dispatch is out of reach of the attribution crates; an
//! adapter converts each host callback into a [`CombatEvent`] and hands it
//! to the listener. Damage sources are a closed set of variants, each
//! carrying exactly what is needed to find the responsible player.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::PotionEffect;
use crate::ids::{EntityId, PlayerId};

/// Any living thing in the world: a player or something else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// A connected or recently connected player.
    Player(PlayerId),
    /// A mob, creature, dispenser, or other non-player entity.
    NonPlayer(EntityId),
}

impl Actor {
    /// The player identity, if this actor is a player.
    pub const fn player(self) -> Option<PlayerId> {
        match self {
            Self::Player(id) => Some(id),
            Self::NonPlayer(_) => None,
        }
    }
}

/// The entity that directly dealt a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageSource {
    /// The player struck the victim directly.
    Player(PlayerId),
    /// A controllable creature (tamed wolf and the like).
    OwnedAgent {
        /// The creature itself.
        agent: EntityId,
        /// Whoever controls the creature, if anyone.
        owner: Option<Actor>,
    },
    /// An arrow, snowball, trident, or other launched entity.
    Projectile {
        /// The projectile itself.
        projectile: EntityId,
        /// Whoever launched the projectile, if known.
        shooter: Option<Actor>,
    },
    /// Fire, fall, drowning, hostile mobs: nobody to credit.
    Environment,
}

/// A single entity caught in a potion splash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplashTarget {
    /// The affected entity.
    pub entity: Actor,
    /// Host-computed intensity in `0..=1` (distance falloff).
    pub intensity: Decimal,
}

/// A combat-relevant event from the host runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CombatEvent {
    /// An entity died.
    EntityDied {
        /// The entity that died.
        entity: Actor,
    },
    /// A player disconnected.
    PlayerQuit {
        /// The player that left.
        player: PlayerId,
    },
    /// An entity took damage from another entity.
    EntityDamaged {
        /// The entity that took damage.
        victim: Actor,
        /// What dealt the damage.
        source: DamageSource,
        /// Final damage after the host's armor and effect math.
        amount: Decimal,
    },
    /// A thrown potion burst and touched one or more entities.
    PotionSplash {
        /// Whoever threw the potion, if known.
        shooter: Option<Actor>,
        /// Effects carried by the potion.
        effects: Vec<PotionEffect>,
        /// Upgraded or extended potions count double.
        amplified: bool,
        /// Every entity caught in the splash.
        targets: Vec<SplashTarget>,
    },
}

//! Turning host combat events into attribution updates.
//!
//! The host's event adapter forwards each [`CombatEvent`] to
//! [`DamageListener::handle`]. The listener decides what the event means for
//! attribution:
//!
//! - a player death hands out credit and then wipes the victim's history,
//! - a disconnect wipes history unless the player is combat-tagged,
//! - a hit is credited to the resolved player, if there is one,
//! - a harmful splash is credited to its thrower for every player it reaches.

use std::sync::Arc;

use cellblock_core::{DamageError, DamageManager, PotionConfig, TagOracle};
use cellblock_types::{Actor, CombatEvent, DamageSource, PlayerId, PotionEffect, SplashTarget};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::attribution::resolve_damager;
use crate::potion;

/// Why an event left attribution untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Only players are tracked as victims.
    NonPlayerVictim,
    /// No player stands behind the damage.
    Unattributed,
    /// The player hurt themselves.
    SelfInflicted,
    /// The potion carried no harmful effect.
    HarmlessPotion,
    /// Nothing positive was left to record.
    NoDamage,
}

/// What [`DamageListener::handle`] did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerOutcome {
    /// Damage was recorded against these victims.
    Recorded {
        /// Every victim that received a record, in target order.
        victims: Vec<PlayerId>,
    },
    /// A player died; credit was handed out and their history cleared.
    Credited {
        /// The player that died.
        victim: PlayerId,
        /// Online attackers in credit order. The first one gets the kill.
        credited: Vec<PlayerId>,
    },
    /// A player left and their history was cleared.
    Cleared {
        /// The player that left.
        player: PlayerId,
    },
    /// A tagged player left; their history was kept.
    Preserved {
        /// The player that left.
        player: PlayerId,
    },
    /// Nothing changed.
    Ignored(IgnoreReason),
}

/// Routes combat events into a [`DamageManager`].
#[derive(Debug)]
pub struct DamageListener {
    manager: Arc<DamageManager>,
    tags: Arc<dyn TagOracle>,
    potion: PotionConfig,
}

impl DamageListener {
    /// Create a listener feeding `manager`.
    pub fn new(manager: Arc<DamageManager>, tags: Arc<dyn TagOracle>, potion: PotionConfig) -> Self {
        Self {
            manager,
            tags,
            potion,
        }
    }

    /// The registry this listener writes to.
    pub const fn manager(&self) -> &Arc<DamageManager> {
        &self.manager
    }

    /// Apply one combat event.
    ///
    /// # Errors
    ///
    /// Propagates [`DamageError`] from the manager: a nil identity in the
    /// event, or a poisoned registry lock.
    pub fn handle(&self, event: &CombatEvent) -> Result<ListenerOutcome, DamageError> {
        match event {
            CombatEvent::EntityDied { entity } => self.on_entity_died(*entity),
            CombatEvent::PlayerQuit { player } => self.on_player_quit(*player),
            CombatEvent::EntityDamaged {
                victim,
                source,
                amount,
            } => self.on_entity_damaged(*victim, source, *amount),
            CombatEvent::PotionSplash {
                shooter,
                effects,
                amplified,
                targets,
            } => self.on_potion_splash(*shooter, effects, *amplified, targets),
        }
    }

    fn on_entity_died(&self, entity: Actor) -> Result<ListenerOutcome, DamageError> {
        let Some(victim) = entity.player() else {
            return Ok(ListenerOutcome::Ignored(IgnoreReason::NonPlayerVictim));
        };

        let credited = self.manager.ordered_damagers(victim)?;
        self.manager.clear_damage(victim)?;

        if credited.is_empty() {
            debug!(%victim, "Death with no creditable attacker");
        } else {
            info!(
                %victim,
                killer = ?credited.first(),
                assists = credited.len().saturating_sub(1),
                "Kill credited"
            );
        }
        Ok(ListenerOutcome::Credited { victim, credited })
    }

    fn on_player_quit(&self, player: PlayerId) -> Result<ListenerOutcome, DamageError> {
        if self.tags.is_tagged(player) {
            debug!(%player, "Tagged player left, keeping damage history");
            return Ok(ListenerOutcome::Preserved { player });
        }

        self.manager.clear_damage(player)?;
        Ok(ListenerOutcome::Cleared { player })
    }

    fn on_entity_damaged(
        &self,
        victim: Actor,
        source: &DamageSource,
        amount: Decimal,
    ) -> Result<ListenerOutcome, DamageError> {
        let Some(victim) = victim.player() else {
            return Ok(ListenerOutcome::Ignored(IgnoreReason::NonPlayerVictim));
        };
        let Some(attacker) = resolve_damager(source) else {
            debug!(%victim, ?source, "Unattributed damage");
            return Ok(ListenerOutcome::Ignored(IgnoreReason::Unattributed));
        };
        if attacker == victim {
            return Ok(ListenerOutcome::Ignored(IgnoreReason::SelfInflicted));
        }
        if amount <= Decimal::ZERO {
            return Ok(ListenerOutcome::Ignored(IgnoreReason::NoDamage));
        }

        self.manager.add_damage(victim, attacker, amount)?;
        Ok(ListenerOutcome::Recorded {
            victims: vec![victim],
        })
    }

    /// Credit the thrower of a harmful splash once per affected player.
    ///
    /// The host lists the thrower among the affected entities when the
    /// splash lands on themselves. That target is skipped: a player never
    /// accumulates damage against themselves, matching how self-inflicted
    /// direct hits are ignored.
    fn on_potion_splash(
        &self,
        shooter: Option<Actor>,
        effects: &[PotionEffect],
        amplified: bool,
        targets: &[SplashTarget],
    ) -> Result<ListenerOutcome, DamageError> {
        let Some(thrower) = shooter.and_then(Actor::player) else {
            return Ok(ListenerOutcome::Ignored(IgnoreReason::Unattributed));
        };
        if !potion::is_harmful(effects) {
            return Ok(ListenerOutcome::Ignored(IgnoreReason::HarmlessPotion));
        }

        let mut victims = Vec::new();
        for target in targets {
            let Some(victim) = target.entity.player() else {
                continue;
            };
            if victim == thrower {
                continue;
            }
            let damage = potion::splash_damage(effects, amplified, target.intensity, &self.potion);
            if damage <= Decimal::ZERO {
                continue;
            }
            self.manager.add_damage(victim, thrower, damage)?;
            victims.push(victim);
        }

        if victims.is_empty() {
            return Ok(ListenerOutcome::Ignored(IgnoreReason::NoDamage));
        }
        debug!(%thrower, hit = victims.len(), "Splash damage recorded");
        Ok(ListenerOutcome::Recorded { victims })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cellblock_core::{AlwaysPresent, DamageConfig, ManualClock, TagRegistry};
    use cellblock_types::EntityId;
    use rust_decimal_macros::dec;

    use super::*;

    struct Fixture {
        listener: DamageListener,
        tags: Arc<TagRegistry>,
    }

    fn fixture() -> Fixture {
        let manager = Arc::new(DamageManager::new(
            DamageConfig::default(),
            Arc::new(ManualClock::at_millis(0)),
            Arc::new(AlwaysPresent),
        ));
        let tags = Arc::new(TagRegistry::new());
        let listener = DamageListener::new(
            manager,
            Arc::clone(&tags) as Arc<dyn TagOracle>,
            PotionConfig::default(),
        );
        Fixture { listener, tags }
    }

    fn hit(victim: PlayerId, attacker: PlayerId, amount: Decimal) -> CombatEvent {
        CombatEvent::EntityDamaged {
            victim: Actor::Player(victim),
            source: DamageSource::Player(attacker),
            amount,
        }
    }

    #[test]
    fn direct_hit_is_recorded() {
        let fx = fixture();
        let (victim, attacker) = (PlayerId::new(), PlayerId::new());

        let outcome = fx.listener.handle(&hit(victim, attacker, dec!(4))).unwrap();
        assert_eq!(outcome, ListenerOutcome::Recorded { victims: vec![victim] });
        assert_eq!(fx.listener.manager().damage_from(victim, attacker).unwrap(), Some(dec!(4)));
    }

    #[test]
    fn non_player_victims_are_not_tracked() {
        let fx = fixture();
        let event = CombatEvent::EntityDamaged {
            victim: Actor::NonPlayer(EntityId::new()),
            source: DamageSource::Player(PlayerId::new()),
            amount: dec!(5),
        };
        assert_eq!(
            fx.listener.handle(&event).unwrap(),
            ListenerOutcome::Ignored(IgnoreReason::NonPlayerVictim)
        );
        assert_eq!(fx.listener.manager().tracked_victims().unwrap(), 0);
    }

    #[test]
    fn environment_and_self_damage_are_ignored() {
        let fx = fixture();
        let victim = PlayerId::new();
        let fall = CombatEvent::EntityDamaged {
            victim: Actor::Player(victim),
            source: DamageSource::Environment,
            amount: dec!(3),
        };
        assert_eq!(
            fx.listener.handle(&fall).unwrap(),
            ListenerOutcome::Ignored(IgnoreReason::Unattributed)
        );
        assert_eq!(
            fx.listener.handle(&hit(victim, victim, dec!(3))).unwrap(),
            ListenerOutcome::Ignored(IgnoreReason::SelfInflicted)
        );
        assert_eq!(fx.listener.manager().tracked_victims().unwrap(), 0);
    }

    #[test]
    fn death_credits_then_clears() {
        let fx = fixture();
        let (victim, a, b) = (PlayerId::new(), PlayerId::new(), PlayerId::new());
        fx.listener.handle(&hit(victim, a, dec!(10))).unwrap();
        fx.listener.handle(&hit(victim, b, dec!(25))).unwrap();

        let outcome = fx
            .listener
            .handle(&CombatEvent::EntityDied {
                entity: Actor::Player(victim),
            })
            .unwrap();
        assert_eq!(
            outcome,
            ListenerOutcome::Credited {
                victim,
                credited: vec![b, a]
            }
        );
        assert!(!fx.listener.manager().is_tracked(victim).unwrap());
    }

    #[test]
    fn quit_clears_unless_tagged() {
        let fx = fixture();
        let (victim, attacker) = (PlayerId::new(), PlayerId::new());
        fx.listener.handle(&hit(victim, attacker, dec!(8))).unwrap();

        fx.tags.tag(victim);
        let quit = CombatEvent::PlayerQuit { player: victim };
        assert_eq!(
            fx.listener.handle(&quit).unwrap(),
            ListenerOutcome::Preserved { player: victim }
        );
        assert!(fx.listener.manager().is_tracked(victim).unwrap());

        fx.tags.untag(victim);
        assert_eq!(
            fx.listener.handle(&quit).unwrap(),
            ListenerOutcome::Cleared { player: victim }
        );
        assert!(!fx.listener.manager().is_tracked(victim).unwrap());
    }

    #[test]
    fn splash_credits_thrower_for_each_player_target() {
        let fx = fixture();
        let (thrower, near, far) = (PlayerId::new(), PlayerId::new(), PlayerId::new());
        let event = CombatEvent::PotionSplash {
            shooter: Some(Actor::Player(thrower)),
            effects: vec![PotionEffect::Harm],
            amplified: true,
            targets: vec![
                SplashTarget {
                    entity: Actor::Player(near),
                    intensity: dec!(1),
                },
                SplashTarget {
                    entity: Actor::Player(far),
                    intensity: dec!(0.25),
                },
                SplashTarget {
                    entity: Actor::NonPlayer(EntityId::new()),
                    intensity: dec!(1),
                },
                SplashTarget {
                    entity: Actor::Player(thrower),
                    intensity: dec!(1),
                },
            ],
        };

        let outcome = fx.listener.handle(&event).unwrap();
        assert_eq!(outcome, ListenerOutcome::Recorded { victims: vec![near, far] });
        let manager = fx.listener.manager();
        assert_eq!(manager.damage_from(near, thrower).unwrap(), Some(dec!(12)));
        assert_eq!(manager.damage_from(far, thrower).unwrap(), Some(dec!(3)));
        assert!(!manager.is_tracked(thrower).unwrap());
    }

    #[test]
    fn harmless_or_unowned_splash_is_ignored() {
        let fx = fixture();
        let target = SplashTarget {
            entity: Actor::Player(PlayerId::new()),
            intensity: dec!(1),
        };
        let healing = CombatEvent::PotionSplash {
            shooter: Some(Actor::Player(PlayerId::new())),
            effects: vec![PotionEffect::Heal],
            amplified: false,
            targets: vec![target],
        };
        let dispensed = CombatEvent::PotionSplash {
            shooter: Some(Actor::NonPlayer(EntityId::new())),
            effects: vec![PotionEffect::Poison],
            amplified: false,
            targets: vec![target],
        };
        assert_eq!(
            fx.listener.handle(&healing).unwrap(),
            ListenerOutcome::Ignored(IgnoreReason::HarmlessPotion)
        );
        assert_eq!(
            fx.listener.handle(&dispensed).unwrap(),
            ListenerOutcome::Ignored(IgnoreReason::Unattributed)
        );
    }

    #[test]
    fn nil_identity_in_event_is_an_error() {
        let fx = fixture();
        let result = fx.listener.handle(&hit(PlayerId::nil(), PlayerId::new(), dec!(1)));
        assert!(matches!(result, Err(DamageError::InvalidIdentity { .. })));
    }
}

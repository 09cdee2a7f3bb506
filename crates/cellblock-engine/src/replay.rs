//! Tick-by-tick scenario replay.
//!
//! The replay owns the simulated world around the damage registry: a manual
//! clock advanced one tick length per tick, the online roster, and the
//! combat tag set. Simulated time never depends on real-time pacing. Each tick it applies the steps scheduled for it and, on
//! every `decay.interval_ticks`-th tick, runs a registry-wide decay pass.

use std::sync::Arc;
use std::time::Duration;

use cellblock_core::{
    CellBlockConfig, Clock, DamageManager, DecayConfig, ManualClock, PlayerRoster, PresenceOracle,
    TagOracle, TagRegistry,
};
use cellblock_listener::{DamageListener, ListenerOutcome};
use cellblock_types::{CombatEvent, PlayerId};
use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::error::EngineError;
use crate::scenario::{ScenarioAction, ScenarioStep};

/// Credit handed out for one death.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillReport {
    /// Tick of the death.
    pub tick: u64,
    /// The player that died.
    pub victim: PlayerId,
    /// Online attackers in credit order.
    pub credited: Vec<PlayerId>,
}

/// What a replay did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Last tick simulated.
    pub ticks: u64,
    /// Combat events handed to the listener.
    pub events: usize,
    /// Events that changed attribution.
    pub applied: usize,
    /// Every player death, in order.
    pub kills: Vec<KillReport>,
    /// Decay passes run.
    pub decay_passes: u64,
    /// Victims removed by decay.
    pub pruned: usize,
    /// Victims still tracked at the end.
    pub tracked_victims: usize,
}

/// The simulated world a scenario runs in.
#[derive(Debug)]
pub struct Replay {
    clock: Arc<ManualClock>,
    roster: Arc<PlayerRoster>,
    tags: Arc<TagRegistry>,
    listener: DamageListener,
    decay: DecayConfig,
    tick_length: TimeDelta,
}

impl Replay {
    /// Build a world from `config` with its clock frozen at `start`.
    pub fn new(config: &CellBlockConfig, start: DateTime<Utc>) -> Self {
        let clock = Arc::new(ManualClock::starting_at(start));
        let roster = Arc::new(PlayerRoster::new());
        let tags = Arc::new(TagRegistry::new());

        let manager = Arc::new(DamageManager::new(
            config.damage.clone(),
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::clone(&roster) as Arc<dyn PresenceOracle>,
        ));
        let listener = DamageListener::new(
            manager,
            Arc::clone(&tags) as Arc<dyn TagOracle>,
            config.potion.clone(),
        );

        // A zero length would freeze simulated time; never go below 1 ms.
        let tick_length = i64::try_from(config.engine.tick_length_ms.max(1))
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .unwrap_or(TimeDelta::MAX);

        Self {
            clock,
            roster,
            tags,
            listener,
            decay: config.decay.clone(),
            tick_length,
        }
    }

    /// The registry being driven.
    pub fn manager(&self) -> &DamageManager {
        self.listener.manager()
    }

    /// Simulated time.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run `steps` to completion.
    ///
    /// With `pacing` set, each tick waits for the next beat of a
    /// `tokio::time::interval` of that period; otherwise ticks run back to
    /// back. Either way the clock advances one tick length per tick.
    ///
    /// # Errors
    ///
    /// Propagates [`EngineError::Damage`] from the registry.
    pub async fn run(
        &self,
        steps: &[ScenarioStep],
        pacing: Option<Duration>,
    ) -> Result<ReplaySummary, EngineError> {
        let last_tick = steps.last().map_or(0, |step| step.tick);
        let mut pacer = pacing.filter(|period| !period.is_zero()).map(|period| {
            let mut pacer = tokio::time::interval(period);
            pacer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            pacer
        });

        info!(
            steps = steps.len(),
            last_tick,
            tick_length_ms = self.tick_length.num_milliseconds(),
            paced = pacer.is_some(),
            "Replay starting"
        );

        let mut summary = ReplaySummary::default();
        let mut pending = steps.iter().peekable();

        for tick in 0..=last_tick {
            if tick > 0 {
                if let Some(pacer) = pacer.as_mut() {
                    pacer.tick().await;
                }
                self.clock.advance(self.tick_length);
            }

            while let Some(step) = pending.next_if(|step| step.tick == tick) {
                self.apply(tick, &step.action, &mut summary)?;
            }

            if tick > 0 {
                self.decay_if_due(tick, &mut summary)?;
            }
            summary.ticks = tick;
        }

        summary.tracked_victims = self.manager().tracked_victims()?;
        Ok(summary)
    }

    fn apply(
        &self,
        tick: u64,
        action: &ScenarioAction,
        summary: &mut ReplaySummary,
    ) -> Result<(), EngineError> {
        match action {
            ScenarioAction::Join { player } => {
                self.roster.join(*player);
                debug!(tick, %player, "Player joined");
            }
            ScenarioAction::Leave { player } => {
                self.roster.leave(*player);
                debug!(tick, %player, "Player left");
            }
            ScenarioAction::Tag { player } => {
                self.tags.tag(*player);
                debug!(tick, %player, "Player tagged");
            }
            ScenarioAction::Untag { player } => {
                self.tags.untag(*player);
                debug!(tick, %player, "Player untagged");
            }
            ScenarioAction::Event { event } => self.dispatch(tick, event, summary)?,
        }
        Ok(())
    }

    fn dispatch(
        &self,
        tick: u64,
        event: &CombatEvent,
        summary: &mut ReplaySummary,
    ) -> Result<(), EngineError> {
        summary.events = summary.events.saturating_add(1);
        let outcome = self.listener.handle(event)?;

        if let CombatEvent::PlayerQuit { player } = event {
            self.roster.leave(*player);
        }

        match outcome {
            ListenerOutcome::Ignored(reason) => {
                debug!(tick, ?reason, "Event ignored");
            }
            ListenerOutcome::Credited { victim, credited } => {
                info!(tick, %victim, ?credited, "Death credit");
                summary.applied = summary.applied.saturating_add(1);
                summary.kills.push(KillReport {
                    tick,
                    victim,
                    credited,
                });
            }
            ListenerOutcome::Recorded { .. }
            | ListenerOutcome::Cleared { .. }
            | ListenerOutcome::Preserved { .. } => {
                summary.applied = summary.applied.saturating_add(1);
            }
        }
        Ok(())
    }

    fn decay_if_due(&self, tick: u64, summary: &mut ReplaySummary) -> Result<(), EngineError> {
        // checked_rem is None for a zero interval, which disables decay.
        if tick.checked_rem(self.decay.interval_ticks) != Some(0) {
            return Ok(());
        }

        let pass = self.manager().decay_all(self.decay.rate)?;
        summary.decay_passes = summary.decay_passes.saturating_add(1);
        summary.pruned = summary.pruned.saturating_add(pass.pruned.len());
        debug!(
            tick,
            remaining = pass.remaining,
            pruned = pass.pruned.len(),
            "Decay pass"
        );
        Ok(())
    }
}

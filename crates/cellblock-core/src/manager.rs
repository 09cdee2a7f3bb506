//! The process-wide attribution registry.
//!
//! [`DamageManager`] maps each victim to their [`DamageLog`] and is the only
//! owner of logs and records; callers get ids and copies back, never
//! references. One instance is constructed per server session and shared
//! via `Arc`.
//!
//! # Locking
//!
//! The victim map sits behind an [`RwLock`] and every log behind its own
//! [`Mutex`]:
//!
//! - Recording and queries take the map **read** lock, then the victim's log
//!   lock. Hits on different victims proceed in parallel; hits on the same
//!   victim serialize on that victim's log.
//! - Creating a log, clearing, and decay take the map **write** lock.
//!
//! The read lock is held for the whole of a recording, so decay can never
//! prune a log out from under a hit that is being written to it.
//!
//! Logs are pruned eagerly: a victim is tracked only while at least one
//! attacker has damage on record.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

use cellblock_types::{PlayerId, RankingStrategy};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::DamageConfig;
use crate::error::{DamageError, IdentityRole};
use crate::log::DamageLog;
use crate::oracle::PresenceOracle;
use crate::record::DamageRecord;

/// Outcome of a registry-wide decay pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecaySummary {
    /// Victims still tracked after the pass.
    pub remaining: usize,
    /// Victims whose logs emptied and were removed, in id order.
    pub pruned: Vec<PlayerId>,
}

/// Registry of damage logs, one per victim.
#[derive(Debug)]
pub struct DamageManager {
    config: DamageConfig,
    clock: Arc<dyn Clock>,
    presence: Arc<dyn PresenceOracle>,
    logs: RwLock<BTreeMap<PlayerId, Mutex<DamageLog>>>,
}

impl DamageManager {
    /// Create an empty registry.
    pub fn new(
        config: DamageConfig,
        clock: Arc<dyn Clock>,
        presence: Arc<dyn PresenceOracle>,
    ) -> Self {
        Self {
            config,
            clock,
            presence,
            logs: RwLock::new(BTreeMap::new()),
        }
    }

    /// The damage settings this registry was built with.
    pub const fn config(&self) -> &DamageConfig {
        &self.config
    }

    /// Record that `attacker` dealt `amount` damage to `victim`.
    ///
    /// Non-positive amounts, and any amount under a non-positive cap, are a
    /// no-op. The attacker's total against this victim is capped at the
    /// configured maximum and stamped with the clock's current time. A hit
    /// whose clock read is overtaken by a racing hit keeps the later stamp.
    ///
    /// # Errors
    ///
    /// [`DamageError::InvalidIdentity`] if either id is nil,
    /// [`DamageError::LockPoisoned`] if a registry lock is poisoned.
    pub fn add_damage(
        &self,
        victim: PlayerId,
        attacker: PlayerId,
        amount: Decimal,
    ) -> Result<(), DamageError> {
        validate(victim, IdentityRole::Victim)?;
        validate(attacker, IdentityRole::Attacker)?;

        let max_damage = self.config.max_damage;
        if amount <= Decimal::ZERO || max_damage <= Decimal::ZERO {
            debug!(%victim, %attacker, %amount, %max_damage, "Ignoring non-positive damage");
            return Ok(());
        }

        let now = self.clock.now();

        // Fast path: the victim already has a log.
        {
            let logs = self
                .logs
                .read()
                .map_err(|_err| DamageError::poisoned("recording damage"))?;
            if let Some(log) = logs.get(&victim) {
                let mut log = log
                    .lock()
                    .map_err(|_err| DamageError::poisoned("recording damage"))?;
                let total = log.record_damage(attacker, amount, max_damage, now);
                debug!(%victim, %attacker, %amount, total = ?total, "Damage recorded");
                return Ok(());
            }
        }

        let mut logs = self
            .logs
            .write()
            .map_err(|_err| DamageError::poisoned("creating damage log"))?;
        let log = logs
            .entry(victim)
            .or_insert_with(|| Mutex::new(DamageLog::new(victim)))
            .get_mut()
            .map_err(|_err| DamageError::poisoned("creating damage log"))?;
        let total = log.record_damage(attacker, amount, max_damage, now);
        debug!(%victim, %attacker, %amount, total = ?total, "Damage log created");
        Ok(())
    }

    /// Attackers to credit for `victim`, in the configured default order.
    ///
    /// # Errors
    ///
    /// See [`ordered_damagers_by`](Self::ordered_damagers_by).
    pub fn ordered_damagers(&self, victim: PlayerId) -> Result<Vec<PlayerId>, DamageError> {
        self.ordered_damagers_by(victim, self.config.ranking)
    }

    /// Attackers to credit for `victim`, ordered by `strategy`.
    ///
    /// Only attackers the presence oracle reports as online are returned.
    /// An untracked victim yields an empty list.
    ///
    /// # Errors
    ///
    /// [`DamageError::InvalidIdentity`] if `victim` is nil,
    /// [`DamageError::LockPoisoned`] if a registry lock is poisoned.
    pub fn ordered_damagers_by(
        &self,
        victim: PlayerId,
        strategy: RankingStrategy,
    ) -> Result<Vec<PlayerId>, DamageError> {
        validate(victim, IdentityRole::Victim)?;

        let ranked = self.with_log(victim, "ranking damagers", |log| log.ranked(strategy))?;
        let Some(ranked) = ranked else {
            return Ok(Vec::new());
        };

        // The oracle is consulted outside the registry locks.
        Ok(ranked
            .into_iter()
            .filter(|attacker| self.presence.is_present(*attacker))
            .collect())
    }

    /// Forget all damage dealt to `victim`.
    ///
    /// Returns whether the victim was tracked. Clearing an untracked victim
    /// is not an error.
    ///
    /// # Errors
    ///
    /// [`DamageError::InvalidIdentity`] if `victim` is nil,
    /// [`DamageError::LockPoisoned`] if the registry lock is poisoned.
    pub fn clear_damage(&self, victim: PlayerId) -> Result<bool, DamageError> {
        validate(victim, IdentityRole::Victim)?;

        let mut logs = self
            .logs
            .write()
            .map_err(|_err| DamageError::poisoned("clearing damage"))?;
        let removed = logs.remove(&victim).is_some();
        if removed {
            debug!(%victim, "Damage log cleared");
        }
        Ok(removed)
    }

    /// Decay every tracked log by `rate`, removing logs that empty out.
    ///
    /// Records that survive are stamped with the clock's current time.
    /// Non-positive rates change nothing.
    ///
    /// # Errors
    ///
    /// [`DamageError::LockPoisoned`] if a registry lock is poisoned.
    pub fn decay_all(&self, rate: Decimal) -> Result<DecaySummary, DamageError> {
        let now = self.clock.now();
        let mut logs = self
            .logs
            .write()
            .map_err(|_err| DamageError::poisoned("decaying damage"))?;

        if rate <= Decimal::ZERO {
            return Ok(DecaySummary {
                remaining: logs.len(),
                pruned: Vec::new(),
            });
        }

        let mut pruned = Vec::new();
        for (victim, log) in &mut *logs {
            let log = log
                .get_mut()
                .map_err(|_err| DamageError::poisoned("decaying damage"))?;
            if !log.decay_damage(rate, now) {
                pruned.push(*victim);
            }
        }
        for victim in &pruned {
            logs.remove(victim);
        }

        debug!(%rate, remaining = logs.len(), pruned = pruned.len(), "Damage decayed");
        Ok(DecaySummary {
            remaining: logs.len(),
            pruned,
        })
    }

    /// Decay a single victim's log by `rate`.
    ///
    /// Returns whether the victim still has damagers on record; the log is
    /// removed when it empties. An untracked victim returns `false`.
    ///
    /// # Errors
    ///
    /// [`DamageError::InvalidIdentity`] if `victim` is nil,
    /// [`DamageError::LockPoisoned`] if a registry lock is poisoned.
    pub fn decay_victim(&self, victim: PlayerId, rate: Decimal) -> Result<bool, DamageError> {
        validate(victim, IdentityRole::Victim)?;

        let now = self.clock.now();
        let mut logs = self
            .logs
            .write()
            .map_err(|_err| DamageError::poisoned("decaying damage"))?;
        let Some(log) = logs.get_mut(&victim) else {
            return Ok(false);
        };
        let still_damaged = log
            .get_mut()
            .map_err(|_err| DamageError::poisoned("decaying damage"))?
            .decay_damage(rate, now);
        if !still_damaged {
            logs.remove(&victim);
            debug!(%victim, "Damage log decayed away");
        }
        Ok(still_damaged)
    }

    /// Damage `attacker` currently has on record against `victim`.
    ///
    /// # Errors
    ///
    /// [`DamageError::InvalidIdentity`] if either id is nil,
    /// [`DamageError::LockPoisoned`] if a registry lock is poisoned.
    pub fn damage_from(
        &self,
        victim: PlayerId,
        attacker: PlayerId,
    ) -> Result<Option<Decimal>, DamageError> {
        validate(victim, IdentityRole::Victim)?;
        validate(attacker, IdentityRole::Attacker)?;

        let amount = self.with_log(victim, "reading damage", |log| {
            log.record(attacker).map(DamageRecord::amount)
        })?;
        Ok(amount.flatten())
    }

    /// Copies of every record against `victim`, ordered by `strategy`.
    ///
    /// Unlike [`ordered_damagers_by`](Self::ordered_damagers_by) this does
    /// not filter by presence.
    ///
    /// # Errors
    ///
    /// [`DamageError::InvalidIdentity`] if `victim` is nil,
    /// [`DamageError::LockPoisoned`] if a registry lock is poisoned.
    pub fn records(
        &self,
        victim: PlayerId,
        strategy: RankingStrategy,
    ) -> Result<Vec<DamageRecord>, DamageError> {
        validate(victim, IdentityRole::Victim)?;

        let records = self.with_log(victim, "reading damage", |log| {
            log.ranked_records(strategy)
                .into_iter()
                .cloned()
                .collect::<Vec<_>>()
        })?;
        Ok(records.unwrap_or_default())
    }

    /// Whether `victim` has any damage on record.
    ///
    /// # Errors
    ///
    /// [`DamageError::InvalidIdentity`] if `victim` is nil,
    /// [`DamageError::LockPoisoned`] if the registry lock is poisoned.
    pub fn is_tracked(&self, victim: PlayerId) -> Result<bool, DamageError> {
        validate(victim, IdentityRole::Victim)?;

        let logs = self
            .logs
            .read()
            .map_err(|_err| DamageError::poisoned("reading damage"))?;
        Ok(logs.contains_key(&victim))
    }

    /// Number of victims with damage on record.
    ///
    /// # Errors
    ///
    /// [`DamageError::LockPoisoned`] if the registry lock is poisoned.
    pub fn tracked_victims(&self) -> Result<usize, DamageError> {
        let logs = self
            .logs
            .read()
            .map_err(|_err| DamageError::poisoned("reading damage"))?;
        Ok(logs.len())
    }

    /// Run `read` against the victim's log under the read and log locks.
    ///
    /// Returns `Ok(None)` when the victim is untracked.
    fn with_log<T>(
        &self,
        victim: PlayerId,
        operation: &'static str,
        read: impl FnOnce(&DamageLog) -> T,
    ) -> Result<Option<T>, DamageError> {
        let logs = self
            .logs
            .read()
            .map_err(|_err| DamageError::poisoned(operation))?;
        let Some(log) = logs.get(&victim) else {
            return Ok(None);
        };
        let log = log.lock().map_err(|_err| DamageError::poisoned(operation))?;
        Ok(Some(read(&*log)))
    }
}

/// Reject the nil identity before it can become a map key.
fn validate(id: PlayerId, role: IdentityRole) -> Result<(), DamageError> {
    if id.is_nil() {
        warn!(%role, "Rejected nil identity");
        return Err(DamageError::InvalidIdentity { role });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::thread;

    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::mpsc;

    use chrono::{DateTime, TimeDelta, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use super::*;
    use crate::clock::ManualClock;
    use crate::oracle::{AlwaysPresent, PlayerRoster};

    fn player(n: u128) -> PlayerId {
        PlayerId(Uuid::from_u128(n))
    }

    fn manager_with(clock: &Arc<ManualClock>) -> DamageManager {
        DamageManager::new(
            DamageConfig::default(),
            Arc::clone(clock) as Arc<dyn Clock>,
            Arc::new(AlwaysPresent),
        )
    }

    fn manager() -> DamageManager {
        manager_with(&Arc::new(ManualClock::at_millis(0)))
    }

    #[test]
    fn untracked_victim_reads_empty() {
        let manager = manager();
        assert!(manager.ordered_damagers(player(1)).unwrap().is_empty());
        assert!(manager.records(player(1), RankingStrategy::MostDamage).unwrap().is_empty());
        assert_eq!(manager.damage_from(player(1), player(2)).unwrap(), None);
        assert!(!manager.is_tracked(player(1)).unwrap());
    }

    #[test]
    fn damage_sorted_by_default() {
        let manager = manager();
        let (v, a, b) = (player(1), player(2), player(3));

        manager.add_damage(v, a, dec!(10)).unwrap();
        manager.add_damage(v, b, dec!(25)).unwrap();
        manager.add_damage(v, a, dec!(5)).unwrap();

        assert_eq!(manager.damage_from(v, a).unwrap(), Some(dec!(15)));
        assert_eq!(manager.ordered_damagers(v).unwrap(), vec![b, a]);
    }

    #[test]
    fn explicit_strategy_overrides_default() {
        let clock = Arc::new(ManualClock::at_millis(0));
        let manager = manager_with(&clock);
        let (v, a, b) = (player(1), player(2), player(3));

        manager.add_damage(v, a, dec!(20)).unwrap();
        clock.advance(TimeDelta::milliseconds(10));
        manager.add_damage(v, b, dec!(1)).unwrap();

        assert_eq!(
            manager.ordered_damagers_by(v, RankingStrategy::MostRecent).unwrap(),
            vec![b, a]
        );
        assert_eq!(
            manager.ordered_damagers_by(v, RankingStrategy::MostDamage).unwrap(),
            vec![a, b]
        );
    }

    #[test]
    fn configured_ranking_is_the_default_query() {
        let clock = Arc::new(ManualClock::at_millis(0));
        let config = DamageConfig {
            ranking: RankingStrategy::MostRecent,
            ..DamageConfig::default()
        };
        let manager = DamageManager::new(
            config,
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::new(AlwaysPresent),
        );
        let (v, a, b) = (player(1), player(2), player(3));

        manager.add_damage(v, a, dec!(20)).unwrap();
        clock.advance(TimeDelta::milliseconds(10));
        manager.add_damage(v, b, dec!(1)).unwrap();

        assert_eq!(manager.ordered_damagers(v).unwrap(), vec![b, a]);
    }

    #[test]
    fn single_hit_is_capped() {
        let manager = manager();
        manager.add_damage(player(1), player(2), dec!(40)).unwrap();
        assert_eq!(manager.damage_from(player(1), player(2)).unwrap(), Some(dec!(30)));
    }

    #[test]
    fn non_positive_damage_creates_nothing() {
        let manager = manager();
        manager.add_damage(player(1), player(2), Decimal::ZERO).unwrap();
        manager.add_damage(player(1), player(2), dec!(-4)).unwrap();
        assert_eq!(manager.tracked_victims().unwrap(), 0);
    }

    #[test]
    fn nil_identities_are_rejected() {
        let manager = manager();
        assert_eq!(
            manager.add_damage(PlayerId::nil(), player(2), dec!(1)),
            Err(DamageError::InvalidIdentity {
                role: IdentityRole::Victim
            })
        );
        assert_eq!(
            manager.add_damage(player(1), PlayerId::nil(), dec!(1)),
            Err(DamageError::InvalidIdentity {
                role: IdentityRole::Attacker
            })
        );
        assert!(manager.ordered_damagers(PlayerId::nil()).is_err());
        assert!(manager.clear_damage(PlayerId::nil()).is_err());
        assert_eq!(
            manager.is_tracked(PlayerId::nil()),
            Err(DamageError::InvalidIdentity {
                role: IdentityRole::Victim
            })
        );
        assert_eq!(manager.tracked_victims().unwrap(), 0);
    }

    #[test]
    fn clear_is_idempotent_and_resets_history() {
        let manager = manager();
        let (v, a) = (player(1), player(2));

        manager.add_damage(v, a, dec!(25)).unwrap();
        assert!(manager.clear_damage(v).unwrap());
        assert!(!manager.clear_damage(v).unwrap());
        assert!(manager.ordered_damagers(v).unwrap().is_empty());

        manager.add_damage(v, a, dec!(10)).unwrap();
        assert_eq!(manager.damage_from(v, a).unwrap(), Some(dec!(10)));
    }

    #[test]
    fn decay_prunes_emptied_logs() {
        let manager = manager();
        let (v, w, a) = (player(1), player(2), player(3));

        manager.add_damage(v, a, dec!(10)).unwrap();
        manager.add_damage(w, a, dec!(30)).unwrap();

        let summary = manager.decay_all(dec!(15)).unwrap();
        assert_eq!(summary.pruned, vec![v]);
        assert_eq!(summary.remaining, 1);
        assert!(manager.ordered_damagers(v).unwrap().is_empty());
        assert!(!manager.is_tracked(v).unwrap());
        assert_eq!(manager.damage_from(w, a).unwrap(), Some(dec!(15)));
    }

    #[test]
    fn zero_rate_decay_is_a_no_op() {
        let manager = manager();
        manager.add_damage(player(1), player(2), dec!(3)).unwrap();
        let summary = manager.decay_all(Decimal::ZERO).unwrap();
        assert_eq!(summary, DecaySummary { remaining: 1, pruned: Vec::new() });
        assert_eq!(manager.damage_from(player(1), player(2)).unwrap(), Some(dec!(3)));
    }

    #[test]
    fn decay_victim_reports_remaining_damage() {
        let manager = manager();
        let (v, a) = (player(1), player(2));
        manager.add_damage(v, a, dec!(10)).unwrap();

        assert!(manager.decay_victim(v, dec!(4)).unwrap());
        assert_eq!(manager.damage_from(v, a).unwrap(), Some(dec!(6)));
        assert!(!manager.decay_victim(v, dec!(6)).unwrap());
        assert!(!manager.is_tracked(v).unwrap());
        assert!(!manager.decay_victim(v, dec!(1)).unwrap());
    }

    #[test]
    fn offline_attackers_are_filtered() {
        let roster = Arc::new(PlayerRoster::new());
        let manager = DamageManager::new(
            DamageConfig::default(),
            Arc::new(ManualClock::at_millis(0)),
            Arc::clone(&roster) as Arc<dyn PresenceOracle>,
        );
        let (v, a, b) = (player(1), player(2), player(3));
        roster.join(b);

        manager.add_damage(v, a, dec!(20)).unwrap();
        manager.add_damage(v, b, dec!(5)).unwrap();

        assert_eq!(manager.ordered_damagers(v).unwrap(), vec![b]);
        roster.join(a);
        assert_eq!(manager.ordered_damagers(v).unwrap(), vec![a, b]);
        // Records are kept regardless of presence.
        assert_eq!(manager.records(v, RankingStrategy::MostDamage).unwrap().len(), 2);
    }

    #[test]
    fn records_are_stamped_by_the_clock() {
        let clock = Arc::new(ManualClock::at_millis(1_000));
        let manager = manager_with(&clock);
        manager.add_damage(player(1), player(2), dec!(1)).unwrap();
        clock.advance(TimeDelta::milliseconds(500));
        manager.add_damage(player(1), player(3), dec!(1)).unwrap();

        let records = manager.records(player(1), RankingStrategy::MostRecent).unwrap();
        let stamps: Vec<i64> = records
            .iter()
            .map(|record| record.last_updated().timestamp_millis())
            .collect();
        assert_eq!(stamps, vec![1_500, 1_000]);
    }

    #[test]
    fn decay_restamps_surviving_records() {
        let clock = Arc::new(ManualClock::at_millis(1_000));
        let manager = manager_with(&clock);
        manager.add_damage(player(1), player(2), dec!(10)).unwrap();
        clock.advance(TimeDelta::milliseconds(250));

        manager.decay_all(dec!(1)).unwrap();
        let records = manager.records(player(1), RankingStrategy::MostRecent).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].last_updated().timestamp_millis(), 1_250);
        assert_eq!(records[0].amount(), dec!(9));
    }

    #[test]
    fn concurrent_hits_on_one_victim_all_land() {
        let manager = Arc::new(DamageManager::new(
            DamageConfig {
                max_damage: dec!(100000),
                ..DamageConfig::default()
            },
            Arc::new(ManualClock::at_millis(0)),
            Arc::new(AlwaysPresent),
        ));
        let victim = player(1);

        let handles: Vec<_> = (0..8_u128)
            .map(|n| {
                let manager = Arc::clone(&manager);
                thread::spawn(move || {
                    for _ in 0..100 {
                        manager.add_damage(victim, player(10 + n), dec!(1)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let records = manager.records(victim, RankingStrategy::MostDamage).unwrap();
        assert_eq!(records.len(), 8);
        assert!(records.iter().all(|record| record.amount() == dec!(100)));
    }

    /// Blocks the first `now()` caller until released, then reports an
    /// earlier time than every later caller sees.
    #[derive(Debug)]
    struct GatedClock {
        calls: AtomicUsize,
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl Clock for GatedClock {
        fn now(&self) -> DateTime<Utc> {
            let millis = if self.calls.fetch_add(1, AtomicOrdering::SeqCst) == 0 {
                self.entered.lock().unwrap().send(()).unwrap();
                self.release.lock().unwrap().recv().unwrap();
                100
            } else {
                200
            };
            DateTime::from_timestamp_millis(millis).unwrap()
        }
    }

    #[test]
    fn slow_clock_read_cannot_rewind_a_later_hit() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let clock = Arc::new(GatedClock {
            calls: AtomicUsize::new(0),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        let manager = Arc::new(DamageManager::new(
            DamageConfig::default(),
            clock,
            Arc::new(AlwaysPresent),
        ));
        let (v, a) = (player(1), player(2));

        let slow = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.add_damage(v, a, dec!(1)).unwrap())
        };
        entered_rx.recv().unwrap();
        manager.add_damage(v, a, dec!(1)).unwrap();
        release_tx.send(()).unwrap();
        slow.join().unwrap();

        let records = manager.records(v, RankingStrategy::MostRecent).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount(), dec!(2));
        assert_eq!(records[0].last_updated().timestamp_millis(), 200);
    }

    #[test]
    fn records_serialize_for_reporting() {
        let manager = manager();
        manager.add_damage(player(1), player(2), dec!(2.5)).unwrap();
        let records = manager.records(player(1), RankingStrategy::MostDamage).unwrap();
        let json = serde_json::to_value(&records).unwrap();
        assert_eq!(json[0]["amount"], "2.5");
    }
}

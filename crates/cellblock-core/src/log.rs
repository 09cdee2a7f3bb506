//! Per-victim damage history and its two credit orders.
//!
//! A [`DamageLog`] owns one [`DamageRecord`] per attacker. Orders are
//! computed fresh on every call; a victim only ever has a handful of
//! attackers, so there is no cached ranking to keep in sync.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use cellblock_types::{PlayerId, RankingStrategy};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::record::DamageRecord;

/// All damage dealt to one victim, keyed by attacker.
///
/// Invariant: no record in the log has a zero amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamageLog {
    victim: PlayerId,
    records: BTreeMap<PlayerId, DamageRecord>,
}

impl DamageLog {
    /// Create an empty log for `victim`.
    pub const fn new(victim: PlayerId) -> Self {
        Self {
            victim,
            records: BTreeMap::new(),
        }
    }

    /// The tracked victim.
    pub const fn victim(&self) -> PlayerId {
        self.victim
    }

    /// Number of attackers with damage on record.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no attacker has damage on record.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The record for one attacker, if any.
    pub fn record(&self, attacker: PlayerId) -> Option<&DamageRecord> {
        self.records.get(&attacker)
    }

    /// All records in attacker-id order.
    pub fn records(&self) -> impl Iterator<Item = &DamageRecord> {
        self.records.values()
    }

    /// Credit `amount` to `attacker`, capping their total at `max_amount`.
    ///
    /// Non-positive amounts are ignored. Returns the attacker's new total,
    /// or `None` when nothing was recorded.
    pub fn record_damage(
        &mut self,
        attacker: PlayerId,
        amount: Decimal,
        max_amount: Decimal,
        now: DateTime<Utc>,
    ) -> Option<Decimal> {
        if amount <= Decimal::ZERO {
            return None;
        }

        let record = self
            .records
            .entry(attacker)
            .or_insert_with(|| DamageRecord::new(attacker, now));
        let total = record.record_damage(amount, max_amount, now);

        // A non-positive cap would leave an expired record behind.
        if total <= Decimal::ZERO {
            self.records.remove(&attacker);
            return None;
        }
        Some(total)
    }

    /// Remove `rate` damage from every attacker, dropping expired records.
    ///
    /// Returns `true` while any attacker remains, so the owner knows whether
    /// the log itself can be discarded. Surviving records are stamped with
    /// `now`. Non-positive rates change nothing.
    pub fn decay_damage(&mut self, rate: Decimal, now: DateTime<Utc>) -> bool {
        if rate > Decimal::ZERO {
            self.records.retain(|_, record| record.decay_damage(rate, now));
        }
        !self.records.is_empty()
    }

    /// Attackers ordered most recently updated first.
    pub fn time_sorted_damagers(&self) -> Vec<PlayerId> {
        self.ranked(RankingStrategy::MostRecent)
    }

    /// Attackers ordered largest damage first.
    pub fn damage_sorted_damagers(&self) -> Vec<PlayerId> {
        self.ranked(RankingStrategy::MostDamage)
    }

    /// Attackers in the order given by `strategy`.
    pub fn ranked(&self, strategy: RankingStrategy) -> Vec<PlayerId> {
        self.ranked_records(strategy)
            .into_iter()
            .map(DamageRecord::attacker)
            .collect()
    }

    /// Records in the order given by `strategy`.
    ///
    /// Equal keys fall back to ascending attacker id.
    pub fn ranked_records(&self, strategy: RankingStrategy) -> Vec<&DamageRecord> {
        let mut ranked: Vec<&DamageRecord> = self.records.values().collect();
        ranked.sort_by(|a, b| compare(strategy, a, b));
        ranked
    }
}

fn compare(strategy: RankingStrategy, a: &DamageRecord, b: &DamageRecord) -> Ordering {
    let primary = match strategy {
        RankingStrategy::MostRecent => b.last_updated().cmp(&a.last_updated()),
        RankingStrategy::MostDamage => b.amount().cmp(&a.amount()),
    };
    primary.then_with(|| a.attacker().cmp(&b.attacker()))
}

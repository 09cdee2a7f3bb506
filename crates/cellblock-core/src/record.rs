//! Damage credited to one attacker against one victim.

use cellblock_types::PlayerId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Accumulated damage from a single attacker.
///
/// The amount only grows on hits (up to the cap) and only shrinks through
/// decay. A record whose amount reaches zero is expired; the owning
/// [`DamageLog`](crate::log::DamageLog) drops it immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DamageRecord {
    attacker: PlayerId,
    amount: Decimal,
    last_updated: DateTime<Utc>,
}

impl DamageRecord {
    /// Create an empty record for `attacker`, stamped at `now`.
    pub const fn new(attacker: PlayerId, now: DateTime<Utc>) -> Self {
        Self {
            attacker,
            amount: Decimal::ZERO,
            last_updated: now,
        }
    }

    /// The credited attacker.
    pub const fn attacker(&self) -> PlayerId {
        self.attacker
    }

    /// Damage currently on record.
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Time of the most recent hit, or of the last decay pass it survived.
    pub const fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Whether nothing is left on record.
    pub fn is_expired(&self) -> bool {
        self.amount <= Decimal::ZERO
    }

    /// Add a hit and mark the time.
    ///
    /// The cap applies to the running total, so a single hit larger than
    /// `max_amount` still lands exactly on the cap. Returns the new total.
    ///
    /// The stamp never moves backwards: a `now` older than the current stamp
    /// (a caller that read the clock before a racing hit landed) keeps the
    /// later time.
    pub fn record_damage(
        &mut self,
        amount: Decimal,
        max_amount: Decimal,
        now: DateTime<Utc>,
    ) -> Decimal {
        self.amount = self.amount.saturating_add(amount).min(max_amount);
        self.last_updated = self.last_updated.max(now);
        self.amount
    }

    /// Remove `rate` damage, flooring at zero.
    ///
    /// Returns `true` while damage remains. A record that survives is
    /// stamped with `now`; an expired one keeps its last hit time.
    pub fn decay_damage(&mut self, rate: Decimal, now: DateTime<Utc>) -> bool {
        self.amount = self.amount.saturating_sub(rate).max(Decimal::ZERO);
        if self.is_expired() {
            return false;
        }
        self.last_updated = self.last_updated.max(now);
        true
    }
}

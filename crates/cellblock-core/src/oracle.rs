//! Host-side questions the damage core needs answered.
//!
//! The core never looks players up itself. The host supplies a
//! [`PresenceOracle`] (is this attacker still around to be credited?) and a
//! [`TagOracle`] (is this victim combat-tagged, so their history must
//! survive a disconnect?). Set-backed implementations are provided for
//! hosts that track presence and tags by event, and for tests.

use std::collections::BTreeSet;
use std::sync::RwLock;

use cellblock_types::PlayerId;

/// Answers whether a player is currently present and creditable.
pub trait PresenceOracle: core::fmt::Debug + Send + Sync {
    /// Whether `player` is online right now.
    fn is_present(&self, player: PlayerId) -> bool;
}

/// Answers whether a player is combat-tagged.
pub trait TagOracle: core::fmt::Debug + Send + Sync {
    /// Whether `player` is tagged and must keep attribution on disconnect.
    fn is_tagged(&self, player: PlayerId) -> bool;
}

/// Presence oracle that treats every player as online.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysPresent;

impl PresenceOracle for AlwaysPresent {
    fn is_present(&self, _player: PlayerId) -> bool {
        true
    }
}

/// Tag oracle under which nobody is ever tagged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverTagged;

impl TagOracle for NeverTagged {
    fn is_tagged(&self, _player: PlayerId) -> bool {
        false
    }
}

/// Thread-safe set of player ids.
///
/// A poisoned lock reads as "not a member" and ignores writes, so a panic
/// elsewhere can only cause a player to go uncredited.
#[derive(Debug, Default)]
struct PlayerSet {
    members: RwLock<BTreeSet<PlayerId>>,
}

impl PlayerSet {
    fn insert(&self, player: PlayerId) -> bool {
        let Ok(mut members) = self.members.write() else {
            return false;
        };
        members.insert(player)
    }

    fn remove(&self, player: PlayerId) -> bool {
        let Ok(mut members) = self.members.write() else {
            return false;
        };
        members.remove(&player)
    }

    fn contains(&self, player: PlayerId) -> bool {
        let Ok(members) = self.members.read() else {
            return false;
        };
        members.contains(&player)
    }

    fn len(&self) -> usize {
        let Ok(members) = self.members.read() else {
            return 0;
        };
        members.len()
    }
}

/// Online players, maintained from join and quit events.
#[derive(Debug, Default)]
pub struct PlayerRoster {
    online: PlayerSet,
}

impl PlayerRoster {
    /// Create an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a player online. Returns `false` if they already were.
    pub fn join(&self, player: PlayerId) -> bool {
        self.online.insert(player)
    }

    /// Mark a player offline. Returns `false` if they were not online.
    pub fn leave(&self, player: PlayerId) -> bool {
        self.online.remove(player)
    }

    /// Number of players online.
    pub fn online_count(&self) -> usize {
        self.online.len()
    }
}

impl PresenceOracle for PlayerRoster {
    fn is_present(&self, player: PlayerId) -> bool {
        self.online.contains(player)
    }
}

/// Combat-tagged players.
#[derive(Debug, Default)]
pub struct TagRegistry {
    tagged: PlayerSet,
}

impl TagRegistry {
    /// Create a registry with nobody tagged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag a player. Returns `false` if they already were tagged.
    pub fn tag(&self, player: PlayerId) -> bool {
        self.tagged.insert(player)
    }

    /// Remove a player's tag. Returns `false` if they were not tagged.
    pub fn untag(&self, player: PlayerId) -> bool {
        self.tagged.remove(player)
    }
}

impl TagOracle for TagRegistry {
    fn is_tagged(&self, player: PlayerId) -> bool {
        self.tagged.contains(player)
    }
}

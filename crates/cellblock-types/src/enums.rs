//! Enumeration types shared across the attribution crates.

use serde::{Deserialize, Serialize};

/// How a victim's damagers are ordered when credit is handed out.
///
/// Both orders break ties by ascending attacker id so the result never
/// depends on map iteration or sort stability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingStrategy {
    /// Most recently updated record first.
    MostRecent,
    /// Largest accumulated damage first. Production default.
    #[default]
    MostDamage,
}

impl core::fmt::Display for RankingStrategy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MostRecent => write!(f, "most_recent"),
            Self::MostDamage => write!(f, "most_damage"),
        }
    }
}

/// A status effect carried by a thrown potion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PotionEffect {
    /// Instant damage.
    Harm,
    /// Damage over time.
    Poison,
    /// Reduced melee damage.
    Weakness,
    /// Slowed movement.
    Slowness,
    /// Instant healing.
    Heal,
    /// Healing over time.
    Regeneration,
    /// Increased movement speed.
    Speed,
    /// Any effect the host does not classify.
    Other,
}

impl PotionEffect {
    /// Whether a splash carrying this effect counts as an attack.
    pub const fn is_harmful(self) -> bool {
        matches!(self, Self::Harm | Self::Poison | Self::Weakness)
    }
}

//! Error types for the damage registry.
//!
//! Steady-state operations are total: non-positive damage is a no-op and
//! unknown victims read as empty. Only two things are errors -- passing the
//! empty (nil) identity, and finding a registry lock poisoned by a panic on
//! another thread.

/// Which argument of a damage operation carried the bad identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityRole {
    /// The entity taking damage.
    Victim,
    /// The entity being credited.
    Attacker,
}

impl core::fmt::Display for IdentityRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Victim => write!(f, "victim"),
            Self::Attacker => write!(f, "attacker"),
        }
    }
}

/// Errors returned by [`DamageManager`](crate::manager::DamageManager).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DamageError {
    /// The nil identity was passed where a real player is required.
    #[error("invalid {role} identity: the nil id cannot be tracked")]
    InvalidIdentity {
        /// The argument that was nil.
        role: IdentityRole,
    },

    /// A registry or log lock was poisoned by a panicking thread.
    #[error("damage registry lock poisoned while {operation}")]
    LockPoisoned {
        /// What the registry was doing when it found the poisoned lock.
        operation: &'static str,
    },
}

impl DamageError {
    /// Build a [`DamageError::LockPoisoned`] for the given operation.
    pub const fn poisoned(operation: &'static str) -> Self {
        Self::LockPoisoned { operation }
    }
}

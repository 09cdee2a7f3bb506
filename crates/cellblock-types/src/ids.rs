//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Players and non-player entities get distinct ID types so a projectile or
//! a tamed creature can never be credited with damage by accident. The nil
//! UUID is reserved as the "empty" identity and is rejected by the damage
//! manager rather than used as a sentinel key.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// The empty identity. Never valid as a damage key.
            pub const fn nil() -> Self {
                Self(Uuid::nil())
            }

            /// Whether this is the empty identity.
            pub const fn is_nil(&self) -> bool {
                self.0.is_nil()
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Stable identity of a player. Victims and credited attackers are
    /// always players.
    PlayerId
}

define_id! {
    /// Stable identity of a non-player entity (projectile, tamed creature,
    /// hostile mob).
    EntityId
}

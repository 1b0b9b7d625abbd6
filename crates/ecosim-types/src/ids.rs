//! Type-safe identifier wrappers.
//!
//! Identifiers are sequential integers handed out by the engine in spawn
//! order. They are never derived from wall-clock time or OS entropy, so a
//! replay from the same seed hands out the same identifiers.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around `u64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident, $prefix:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Create an identifier from its raw sequence number.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Return the inner sequence number.
            pub const fn into_inner(self) -> u64 {
                self.0
            }

            /// Return the identifier that follows this one.
            pub const fn next(self) -> Self {
                Self(self.0.saturating_add(1))
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}-{:03}", $prefix, self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for an agent within one simulation run.
    AgentId, "agent"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_is_sequential() {
        let id = AgentId::new(7);
        assert_eq!(id.next(), AgentId::new(8));
    }

    #[test]
    fn next_saturates() {
        let id = AgentId::new(u64::MAX);
        assert_eq!(id.next(), id);
    }

    #[test]
    fn display_is_zero_padded() {
        assert_eq!(AgentId::new(4).to_string(), "agent-004");
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&AgentId::new(12)).ok();
        assert_eq!(json.as_deref(), Some("12"));
    }
}

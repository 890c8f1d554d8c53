//! Type-safe identifier wrappers around `u64` counters.
//!
//! Every institution in the engine has a strongly-typed ID to prevent
//! accidental mixing of identifiers at compile time. IDs are allocated
//! sequentially by the engine (never randomly), so replaying the same seed
//! and tick sequence reproduces the same IDs.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Generates a newtype wrapper around `u64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident, $prefix:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub u64);

        impl $name {
            /// Wrap a raw counter value.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Return the inner counter value.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
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
    /// Unique identifier for a totem.
    TotemId, "totem"
}

define_id! {
    /// Unique identifier for a taboo zone.
    TabooId, "taboo"
}

define_id! {
    /// Unique identifier for a ritual bound to a totem.
    RitualId, "ritual"
}

define_id! {
    /// Unique identifier for a tribe (one per dominant agent type).
    TribeId, "tribe"
}

define_id! {
    /// Unique identifier for a justice case opened against a taboo.
    CaseId, "case"
}

/// Monotonic allocator shared by every institution kind.
///
/// A single counter keeps IDs unique across kinds, which makes chronicle
/// messages unambiguous ("totem-3" and "taboo-3" never coexist).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Create an allocator whose first ID is 1.
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Return the next raw ID and advance the counter.
    pub const fn next_raw(&mut self) -> u64 {
        let raw = if self.next == 0 { 1 } else { self.next };
        self.next = raw.saturating_add(1);
        raw
    }

    /// Allocate a [`TotemId`].
    pub const fn totem(&mut self) -> TotemId {
        TotemId(self.next_raw())
    }

    /// Allocate a [`TabooId`].
    pub const fn taboo(&mut self) -> TabooId {
        TabooId(self.next_raw())
    }

    /// Allocate a [`RitualId`].
    pub const fn ritual(&mut self) -> RitualId {
        RitualId(self.next_raw())
    }

    /// Allocate a [`TribeId`].
    pub const fn tribe(&mut self) -> TribeId {
        TribeId(self.next_raw())
    }

    /// Allocate a [`CaseId`].
    pub const fn case(&mut self) -> CaseId {
        CaseId(self.next_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_starts_at_one_and_never_repeats() {
        let mut ids = IdAllocator::new();
        let totem = ids.totem();
        let taboo = ids.taboo();
        let ritual = ids.ritual();
        assert_eq!(totem.get(), 1);
        assert_eq!(taboo.get(), 2);
        assert_eq!(ritual.get(), 3);
    }

    #[test]
    fn default_allocator_skips_zero() {
        let mut ids = IdAllocator::default();
        assert_eq!(ids.next_raw(), 1);
        assert_eq!(ids.next_raw(), 2);
    }

    #[test]
    fn display_includes_kind_prefix() {
        assert_eq!(TotemId::new(7).to_string(), "totem-7");
        assert_eq!(CaseId::new(2).to_string(), "case-2");
    }
}

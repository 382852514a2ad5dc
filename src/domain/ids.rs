//! Typed entity identifiers and their allocator.
//!
//! Ids are assigned once at construction and never change. The allocator is
//! an explicit value owned by the caller rather than hidden process-global
//! state, so tests stay independent of creation order across runs. Counters
//! are atomic; a strictly increasing unique value per entity kind is
//! guaranteed even if entities are created from several threads.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub(crate) u64);

        impl $name {
            /// Raw numeric value of this id.
            pub fn raw(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

entity_id!(
    /// Identifier of a [`crate::domain::Bus`].
    BusId
);
entity_id!(
    /// Identifier of a [`crate::domain::Panel`].
    PanelId
);
entity_id!(
    /// Identifier of a [`crate::domain::Line`].
    LineId
);
entity_id!(
    /// Identifier of a [`crate::domain::LineType`].
    LineTypeId
);
entity_id!(
    /// Identifier of a [`crate::domain::Path`].
    PathId
);
entity_id!(
    /// Identifier of a [`crate::grid::Grid`].
    GridId
);

/// Hands out strictly increasing ids, one counter per entity kind.
#[derive(Debug, Default)]
pub struct IdAllocator {
    bus: AtomicU64,
    panel: AtomicU64,
    line: AtomicU64,
    line_type: AtomicU64,
    path: AtomicU64,
    grid: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_bus(&self) -> BusId {
        BusId(self.bus.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_panel(&self) -> PanelId {
        PanelId(self.panel.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_line(&self) -> LineId {
        LineId(self.line.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_line_type(&self) -> LineTypeId {
        LineTypeId(self.line_type.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_path(&self) -> PathId {
        PathId(self.path.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_grid(&self) -> GridId {
        GridId(self.grid.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_increase_per_kind() {
        let ids = IdAllocator::new();
        assert_eq!(ids.next_bus().raw(), 0);
        assert_eq!(ids.next_bus().raw(), 1);
        // Counters are independent per kind.
        assert_eq!(ids.next_line().raw(), 0);
        assert_eq!(ids.next_bus().raw(), 2);
    }

    #[test]
    fn separate_allocators_are_independent() {
        let a = IdAllocator::new();
        let b = IdAllocator::new();
        a.next_bus();
        assert_eq!(b.next_bus().raw(), 0);
    }

    #[test]
    fn display_names_the_kind() {
        let ids = IdAllocator::new();
        assert_eq!(ids.next_path().to_string(), "PathId#0");
    }
}

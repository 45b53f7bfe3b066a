//! Stable definition identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for generating unique IDs
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A stable identifier for an effect definition.
///
/// Effect pools are partitioned by this id, so an edited copy of a
/// definition must keep the id of the definition it replaces.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefinitionId(pub u64);

impl DefinitionId {
    /// Create a new unique DefinitionId
    pub fn new() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a DefinitionId from a raw value (for deserialization/testing)
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Set the counter to at least the given value (for loading definition files)
    pub fn ensure_counter_above(value: u64) {
        let mut current = NEXT_ID.load(Ordering::Relaxed);
        while current <= value {
            match NEXT_ID.compare_exchange_weak(
                current,
                value + 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(c) => current = c,
            }
        }
    }
}

impl Default for DefinitionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DefinitionId({})", self.0)
    }
}

impl fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_generation() {
        let id1 = DefinitionId::new();
        let id2 = DefinitionId::new();
        assert_ne!(id1, id2);
        assert!(id2.0 > id1.0);
    }

    #[test]
    fn test_from_raw() {
        let id = DefinitionId::from_raw(42);
        assert_eq!(id.raw(), 42);
    }

    #[test]
    fn test_ensure_counter_above() {
        DefinitionId::ensure_counter_above(10_000);
        let id = DefinitionId::new();
        assert!(id.0 > 10_000);
    }
}

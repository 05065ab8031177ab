//! The items being sorted.

use crate::error::SortError;
use std::fmt;
use std::time::Duration;

/// A named item carrying a non-negative sort key.
///
/// Entities are plain values: two entities with the same name and key are
/// equal, and duplicates are sorted independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entity {
    name: String,
    sort_key: u64,
}

impl Entity {
    pub fn new(name: impl Into<String>, sort_key: u64) -> Self {
        Self {
            name: name.into(),
            sort_key,
        }
    }

    /// Build an entity from an untrusted signed key.
    ///
    /// Negative keys have no meaningful delay and are rejected. Zero is
    /// accepted and emits immediately.
    pub fn try_new(name: impl Into<String>, key: i64) -> Result<Self, SortError> {
        let name = name.into();
        match u64::try_from(key) {
            Ok(sort_key) => Ok(Self { name, sort_key }),
            Err(_) => Err(SortError::InvalidKey { name, key }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sort_key(&self) -> u64 {
        self.sort_key
    }

    /// How long this entity's worker sleeps: `sort_key` multiples of `unit`.
    ///
    /// Saturates at [`Duration::MAX`] instead of overflowing.
    pub fn delay(&self, unit: Duration) -> Duration {
        let key = u32::try_from(self.sort_key).unwrap_or(u32::MAX);
        if u64::from(key) == self.sort_key {
            unit.checked_mul(key).unwrap_or(Duration::MAX)
        } else {
            // Keys beyond u32 go through nanoseconds.
            let nanos = unit.as_nanos().saturating_mul(u128::from(self.sort_key));
            u64::try_from(nanos)
                .map(Duration::from_nanos)
                .unwrap_or(Duration::MAX)
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.sort_key)
    }
}

/// Validate a sequence of `(name, key)` pairs into entities.
///
/// Stops at the first negative key.
pub fn entities_from_pairs<I, S>(pairs: I) -> Result<Vec<Entity>, SortError>
where
    I: IntoIterator<Item = (S, i64)>,
    S: Into<String>,
{
    pairs
        .into_iter()
        .map(|(name, key)| Entity::try_new(name, key))
        .collect()
}

//! Unique identifiers for scriptflow entities.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a tracker instance.
///
/// Only used to correlate log lines and snapshots; step identity is the
/// caller-supplied step id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackerId(Ulid);

impl TrackerId {
    /// Generate a new TrackerId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for TrackerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrackerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for TrackerId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_id_roundtrips_through_display() {
        let id = TrackerId::new();
        let parsed: TrackerId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_tracker_ids_are_distinct() {
        assert_ne!(TrackerId::new(), TrackerId::new());
    }
}

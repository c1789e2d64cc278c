//! Build identifiers.
//!
//! Every successful or attempted bundle gets a fresh id. Ids are seeded from
//! wall-clock milliseconds so they stay unique across restarts, and strictly
//! increase within a process even if the clock stalls or steps back.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Opaque build generation identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildId(u64);

impl BuildId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BuildId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Monotonic source of build ids.
#[derive(Debug)]
pub struct BuildIdSource {
    last: AtomicU64,
}

impl BuildIdSource {
    /// Seed from the current wall clock.
    pub fn from_clock() -> Self {
        Self::starting_after(BuildId(now_millis().saturating_sub(1)))
    }

    /// Next id will be strictly greater than `last`.
    pub const fn starting_after(last: BuildId) -> Self {
        Self {
            last: AtomicU64::new(last.0),
        }
    }

    /// Issue the next id: the wall clock if it moved forward, otherwise `last + 1`.
    pub fn next(&self) -> BuildId {
        let now = now_millis();
        let prev = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        BuildId(now.max(prev + 1))
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_strictly_increase() {
        let source = BuildIdSource::from_clock();
        let mut prev = source.next();
        for _ in 0..1000 {
            let id = source.next();
            assert!(id > prev);
            prev = id;
        }
    }

    #[test]
    fn test_clock_behind_seed() {
        let far_future = BuildId::new(u64::MAX / 2);
        let source = BuildIdSource::starting_after(far_future);
        assert_eq!(source.next(), BuildId::new(u64::MAX / 2 + 1));
        assert_eq!(source.next(), BuildId::new(u64::MAX / 2 + 2));
    }

    #[test]
    fn test_display_roundtrip() {
        let id = BuildId::new(1_729_000_000_123);
        assert_eq!(id.to_string().parse::<BuildId>().unwrap(), id);
    }
}

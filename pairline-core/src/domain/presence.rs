use crate::domain::participant::normalize;
use crate::domain::{ParticipantId, Preferences, Timestamp};
use instant::{Duration, Instant};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Periodic announcement that a participant is searching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceBeacon {
    pub participant_id: ParticipantId,
    pub language: Option<String>,
    pub interests: Vec<String>,
    pub timestamp: Timestamp,
}

impl PresenceBeacon {
    pub fn new(participant_id: ParticipantId, preferences: &Preferences) -> Self {
        Self {
            participant_id,
            language: preferences.language.clone(),
            interests: preferences.interests.clone(),
            timestamp: Timestamp::now(),
        }
    }
}

/// Check whether remote attributes satisfy the local filters
///
/// The language filter passes when unset locally or equal (case-insensitive).
/// Interests pass when the local list is empty or the lists intersect.
pub fn is_compatible(local: &Preferences, language: Option<&str>, interests: &[String]) -> bool {
    let language_ok = match (&local.language, language) {
        (None, _) => true,
        (Some(wanted), Some(theirs)) => *wanted == normalize(theirs),
        (Some(_), None) => false,
    };

    let interests_ok = local.interests.is_empty()
        || interests
            .iter()
            .map(|i| normalize(i))
            .any(|i| local.interests.contains(&i));

    language_ok && interests_ok
}

/// Recently observed searchers, expired on every searching tick
#[derive(Debug, Default)]
pub struct PresenceDirectory {
    entries: HashMap<ParticipantId, (PresenceBeacon, Instant)>,
}

impl PresenceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a beacon, stamped with the local receive time
    pub fn observe(&mut self, beacon: PresenceBeacon, now: Instant) {
        self.entries.insert(beacon.participant_id, (beacon, now));
    }

    /// Drop beacons older than `ttl`, returning how many were removed
    pub fn expire(&mut self, now: Instant, ttl: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, (_, seen)| now.saturating_duration_since(*seen) < ttl);
        before - self.entries.len()
    }

    pub fn forget(&mut self, id: &ParticipantId) {
        self.entries.remove(id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Beacons with the local time they were last seen
    pub fn entries(&self) -> impl Iterator<Item = (&PresenceBeacon, Instant)> {
        self.entries.values().map(|(beacon, seen)| (beacon, *seen))
    }
}

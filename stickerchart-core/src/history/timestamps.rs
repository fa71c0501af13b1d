//! Timestamp resolution for sticker events.
//!
//! A sticker's position in history comes from, in order:
//! 1. the authoritative modification time reported by the sync layer,
//! 2. a fallback timestamp already handed out for the sticker,
//! 3. a fresh fallback: the anchor plus one step per newly seen sticker.
//!
//! Fallbacks must not move between recomputations, otherwise history
//! visibly reorders while the user looks at it.

use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeSet, HashMap};

use crate::types::StickerEvent;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert nanoseconds since the Unix epoch to a timestamp.
///
/// Returns `None` for zero or negative values, which the sync layer uses
/// for "not yet known".
pub fn timestamp_from_nanos(nanos: i64) -> Option<DateTime<Utc>> {
    if nanos <= 0 {
        return None;
    }
    DateTime::from_timestamp(
        nanos.div_euclid(NANOS_PER_SECOND),
        nanos.rem_euclid(NANOS_PER_SECOND) as u32,
    )
}

/// In-memory table of fallback timestamps, keyed by sticker id.
///
/// Entries only grow while their sticker stays in the observed set; ids
/// that leave the set are pruned and get a fresh value if they return.
#[derive(Debug, Clone)]
pub struct FallbackTimestamps {
    step: Duration,
    anchor: DateTime<Utc>,
    issued_since_anchor: i32,
    observed: BTreeSet<String>,
    assigned: HashMap<String, DateTime<Utc>>,
}

impl FallbackTimestamps {
    /// Create an empty table handing out timestamps `step` apart.
    pub fn new(step: Duration, now: DateTime<Utc>) -> Self {
        Self {
            step,
            anchor: now,
            issued_since_anchor: 0,
            observed: BTreeSet::new(),
            assigned: HashMap::new(),
        }
    }

    /// Reconcile with the current sticker set.
    ///
    /// When the set differs from the last one observed, the anchor moves to
    /// `now` and entries for departed stickers are dropped. Returns whether
    /// the set changed.
    pub fn observe<'a, I>(&mut self, ids: I, now: DateTime<Utc>) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let current: BTreeSet<String> = ids.into_iter().map(str::to_string).collect();
        if current == self.observed {
            return false;
        }

        let before = self.assigned.len();
        self.assigned.retain(|id, _| current.contains(id));
        let pruned = before - self.assigned.len();
        if pruned > 0 {
            tracing::trace!(pruned, "Pruned fallback timestamps");
        }

        self.observed = current;
        self.anchor = now;
        self.issued_since_anchor = 0;
        true
    }

    /// Previously assigned fallback for `id`, if any
    pub fn get(&self, id: &str) -> Option<DateTime<Utc>> {
        self.assigned.get(id).copied()
    }

    /// Existing fallback for `id`, or a new one one step past the last.
    pub fn get_or_assign(&mut self, id: &str) -> DateTime<Utc> {
        if let Some(ts) = self.get(id) {
            return ts;
        }
        // Saturate at the far end of the calendar rather than overflow
        let ts = self
            .step
            .checked_mul(self.issued_since_anchor)
            .and_then(|offset| self.anchor.checked_add_signed(offset))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.issued_since_anchor = self.issued_since_anchor.saturating_add(1);
        self.assigned.insert(id.to_string(), ts);
        ts
    }

    /// Number of fallback timestamps currently held
    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    /// Whether no fallback timestamps are held
    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}

/// The authoritative time for a sticker, if the sync layer has one.
///
/// The refreshed modification-time table wins over the value carried on
/// the event itself; both must be positive to count.
pub fn authoritative_timestamp(
    event: &StickerEvent,
    modification_times: &HashMap<String, i64>,
) -> Option<DateTime<Utc>> {
    modification_times
        .get(&event.id)
        .copied()
        .and_then(timestamp_from_nanos)
        .or_else(|| event.server_modification_time.and_then(timestamp_from_nanos))
}

/// Resolve the timestamp a sticker sorts by, assigning a fallback if needed.
pub fn resolve_timestamp(
    event: &StickerEvent,
    modification_times: &HashMap<String, i64>,
    fallbacks: &mut FallbackTimestamps,
) -> DateTime<Utc> {
    authoritative_timestamp(event, modification_times)
        .unwrap_or_else(|| fallbacks.get_or_assign(&event.id))
}

//! The 15 minute booking grid.
//!
//! Grid points are measured on the absolute instant (seconds since the Unix
//! epoch), so a timestamp keeps its grid alignment regardless of the offset it
//! is expressed in, as long as that offset is itself a multiple of 15 minutes.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde::{Serialize, Serializer};

pub const SLOT_MINUTES: i64 = 15;

const SLOT_NANOS: i128 = SLOT_MINUTES as i128 * 60 * 1_000_000_000;

/// Length of a single bookable slot.
pub fn slot_length() -> TimeDelta {
    TimeDelta::minutes(SLOT_MINUTES)
}

fn offset_into_slot<Tz: TimeZone>(t: &DateTime<Tz>) -> i128 {
    let nanos = t.timestamp() as i128 * 1_000_000_000 + t.timestamp_subsec_nanos() as i128;
    nanos.rem_euclid(SLOT_NANOS)
}

/// Round `t` up to the next grid point. Grid points are returned unchanged and
/// the time zone of the input is preserved.
///
/// At the very end of chrono's representable range, where the next grid point
/// does not exist, the previous grid point is returned instead.
pub fn quantize<Tz: TimeZone>(t: &DateTime<Tz>) -> DateTime<Tz> {
    let offset = offset_into_slot(t);
    if offset == 0 {
        return t.clone();
    }
    // offset < SLOT_NANOS, always fits in i64
    let up = TimeDelta::nanoseconds((SLOT_NANOS - offset) as i64);
    let down = TimeDelta::nanoseconds(offset as i64);
    t.clone()
        .checked_add_signed(up)
        .unwrap_or_else(|| t.clone() - down)
}

pub fn is_quantized<Tz: TimeZone>(t: &DateTime<Tz>) -> bool {
    offset_into_slot(t) == 0
}

/// Slot starts inside `[start, end)`, each followed by a full slot before `end`.
///
/// The iterator is cheap to clone, so the same sequence can be walked any
/// number of times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotIter {
    next: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl SlotIter {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            next: quantize(&start),
            end,
        }
    }
}

impl Iterator for SlotIter {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        let slot_end = self.next.checked_add_signed(slot_length())?;
        if slot_end > self.end {
            return None;
        }
        let current = self.next;
        self.next = slot_end;
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end - self.next).num_minutes().max(0) / SLOT_MINUTES;
        let remaining = remaining as usize;
        (remaining, Some(remaining))
    }
}

impl Serialize for SlotIter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.clone())
    }
}

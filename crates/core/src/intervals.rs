//! Half-open time ranges and the set operations the availability engine
//! is built from.
//!
//! Every list-producing function returns a *normalized* list: sorted by
//! start, with no two ranges overlapping or touching.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// TimeRange
// ---------------------------------------------------------------------------

/// A non-empty half-open range `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeRange {
    /// Build a range, rejecting empty or inverted bounds.
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, CoreError> {
        Self::from_bounds(start, end).ok_or_else(|| {
            CoreError::Validation(format!("Time range end ({end}) must be after start ({start})"))
        })
    }

    /// Build a range, returning `None` when `end <= start`.
    pub fn from_bounds(start: Timestamp, end: Timestamp) -> Option<Self> {
        (end > start).then_some(Self { start, end })
    }

    /// Build a range starting at `start` lasting `minutes`.
    pub fn from_minutes(start: Timestamp, minutes: i64) -> Option<Self> {
        Self::from_bounds(start, start + Duration::minutes(minutes))
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    /// True when both ranges share at least one instant.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, instant: Timestamp) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn contains_range(&self, other: &TimeRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn intersect(&self, other: &TimeRange) -> Option<TimeRange> {
        Self::from_bounds(self.start.max(other.start), self.end.min(other.end))
    }

    /// Grow the range by `before` at the start and `after` at the end.
    pub fn expand(&self, before: Duration, after: Duration) -> TimeRange {
        TimeRange {
            start: self.start - before,
            end: self.end + after,
        }
    }

    /// Move both bounds by `delta`.
    pub fn shift(&self, delta: Duration) -> TimeRange {
        TimeRange {
            start: self.start + delta,
            end: self.end + delta,
        }
    }
}

// ---------------------------------------------------------------------------
// Set operations
// ---------------------------------------------------------------------------

/// Sort and merge overlapping or adjacent ranges.
pub fn normalize(mut ranges: Vec<TimeRange>) -> Vec<TimeRange> {
    ranges.sort();
    let mut merged: Vec<TimeRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => {
                last.end = last.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// Remove every instant covered by `cuts` from `ranges`.
pub fn subtract(ranges: &[TimeRange], cuts: &[TimeRange]) -> Vec<TimeRange> {
    let cuts = normalize(cuts.to_vec());
    let mut out = Vec::new();

    for range in normalize(ranges.to_vec()) {
        let mut cursor = range.start;
        for cut in cuts.iter().filter(|c| c.overlaps(&range)) {
            if cut.start > cursor {
                out.push(TimeRange {
                    start: cursor,
                    end: cut.start,
                });
            }
            cursor = cursor.max(cut.end);
            if cursor >= range.end {
                break;
            }
        }
        if cursor < range.end {
            out.push(TimeRange {
                start: cursor,
                end: range.end,
            });
        }
    }
    out
}

/// Instants covered by both `a` and `b`.
pub fn intersect_all(a: &[TimeRange], b: &[TimeRange]) -> Vec<TimeRange> {
    let a = normalize(a.to_vec());
    let b = normalize(b.to_vec());
    let (mut i, mut j) = (0, 0);
    let mut out = Vec::new();

    while i < a.len() && j < b.len() {
        if let Some(common) = a[i].intersect(&b[j]) {
            out.push(common);
        }
        if a[i].end <= b[j].end {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

/// Sum of the durations of `ranges` (assumed normalized).
pub fn total_duration(ranges: &[TimeRange]) -> Duration {
    ranges
        .iter()
        .fold(Duration::zero(), |acc, r| acc + r.duration())
}

/// The range in `ranges` that fully contains `target`, if any.
pub fn find_containing(ranges: &[TimeRange], target: &TimeRange) -> Option<TimeRange> {
    ranges.iter().copied().find(|r| r.contains_range(target))
}

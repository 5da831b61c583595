//! Blocking windows and the lookahead conflict test.
//!
//! Both the blocking window and the lookahead window are closed intervals:
//! an event that ends exactly at `now`, or starts exactly at `now + margin`,
//! IS a conflict. This differs from meeting-style overlap where touching
//! intervals are compatible.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A closed interval `[start, end]` during which promotions are suspended.
///
/// `start > end` is representable; such a window is evaluated as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BlockWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Inclusive point containment: `start <= instant <= end`.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        within(instant, self.start, self.end)
    }

    /// Whether this window conflicts with the lookahead `[from, to]`.
    ///
    /// A conflict is any of four inclusive point-containment checks:
    ///
    /// 1. `from` lies in `[start, end]` (already blocked)
    /// 2. `to` lies in `[start, end]` (blocked by the time the margin elapses)
    /// 3. `start` lies in `[from, to]` (block begins inside the lookahead)
    /// 4. `end` lies in `[from, to]` (block ends inside the lookahead)
    ///
    /// For `start <= end` and `from <= to` this agrees with [`Self::overlaps`].
    pub fn happens_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.contains(from)
            || self.contains(to)
            || within(self.start, from, to)
            || within(self.end, from, to)
    }

    /// Closed-interval overlap: `start <= to && end >= from`.
    pub fn overlaps(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.start <= to && self.end >= from
    }
}

fn within(instant: DateTime<Utc>, lower: DateTime<Utc>, upper: DateTime<Utc>) -> bool {
    lower <= instant && instant <= upper
}

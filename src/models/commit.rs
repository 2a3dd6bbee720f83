//! Commit-level value types shared by both history strategies.

use chrono::{DateTime, FixedOffset, TimeZone};

use super::ChangedPathEntry;

/// Committer timestamp with the committer's timezone offset preserved.
pub type CommitTime = DateTime<FixedOffset>;

/// Builds a `CommitTime` from Unix seconds and an offset in minutes east of UTC.
///
/// Returns `None` when the offset is out of range or the instant is not
/// representable.
pub fn commit_time(seconds: i64, offset_minutes: i32) -> Option<CommitTime> {
    let offset = FixedOffset::east_opt(offset_minutes.checked_mul(60)?)?;
    offset.timestamp_opt(seconds, 0).single()
}

/// One commit as seen by the resolution loop.
///
/// Produced by a `HistoryWalker` and dropped at the end of the loop iteration
/// that consumed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub time: CommitTime,
    /// `None` when the history producer does not report parents.
    pub parent_count: Option<usize>,
    /// Paths touched by this commit, deletions already removed.
    pub changes: Vec<ChangedPathEntry>,
}

impl CommitRecord {
    pub fn new(time: CommitTime, parent_count: Option<usize>, changes: Vec<ChangedPathEntry>) -> Self {
        Self {
            time,
            parent_count,
            changes,
        }
    }
}

//! Run report returned to the caller.
//!
//! - `ResolutionOutcome`: which paths got which time, and which never matched
//! - `ApplyStats`: what the filesystem side actually did
//! - `IoFailure`: one path whose stat or set-times failed

use std::collections::BTreeMap;

use serde::Serialize;

use super::CommitTime;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct IoFailure {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ApplyStats {
    /// Files whose times were set.
    pub written: usize,
    /// Files that already carried the right time.
    pub unchanged: usize,
    pub failed: Vec<IoFailure>,
}

impl ApplyStats {
    pub fn merge(&mut self, other: ApplyStats) {
        self.written += other.written;
        self.unchanged += other.unchanged;
        self.failed.extend(other.failed);
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ResolutionOutcome {
    /// Paths matched by a commit, with that commit's time.
    pub resolved: BTreeMap<String, CommitTime>,
    /// Paths never matched that received `fallback_time`.
    pub fallback: Vec<String>,
    pub fallback_time: Option<CommitTime>,
    /// Paths never matched and left untouched because no commit was visited.
    pub unresolved: Vec<String>,
    pub commits_visited: usize,
    pub apply: ApplyStats,
}

impl ResolutionOutcome {
    /// Every path no visited commit matched, whether or not it got the fallback.
    pub fn unmatched(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self
            .fallback
            .iter()
            .chain(self.unresolved.iter())
            .map(String::as_str)
            .collect();
        paths.sort_unstable();
        paths
    }

    pub fn is_complete(&self) -> bool {
        self.fallback.is_empty() && self.unresolved.is_empty()
    }
}

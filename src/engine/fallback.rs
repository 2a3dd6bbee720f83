//! Handles targets no visited commit matched.
//!
//! They get the time of the last commit the walk saw (the oldest one, for a
//! newest-first walk). With no commit seen at all they are left alone. Either
//! way they are reported: a target that never matches usually means the file
//! list and the history disagree.

use crate::diagnostics::Diagnostics;
use crate::engine::applier::{ApplyJob, TimestampApplier};
use crate::engine::path_set::PathSet;
use crate::models::CommitTime;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fallback {
    /// Unmatched paths, sorted.
    pub paths: Vec<String>,
    /// Time applied to `paths`, if any history was seen.
    pub time: Option<CommitTime>,
}

pub fn assign(
    path_set: &PathSet,
    last_seen: Option<CommitTime>,
    applier: &mut TimestampApplier,
    diagnostics: &dyn Diagnostics,
) -> Fallback {
    let mut paths: Vec<String> = path_set.unresolved().map(str::to_string).collect();
    if paths.is_empty() {
        return Fallback::default();
    }
    paths.sort_unstable();

    match last_seen {
        Some(time) => {
            diagnostics.warn(format!(
                "{} file(s) not found in commit history, using {}",
                paths.len(),
                time.to_rfc3339()
            ));
            for path in &paths {
                diagnostics.warn(format!("file not found: {}", path));
                applier.submit(ApplyJob {
                    path: path.clone(),
                    time,
                });
            }
        }
        None => diagnostics.warn(format!(
            "{} file(s) left untouched: no commit was visited",
            paths.len()
        )),
    }

    Fallback {
        paths,
        time: last_seen,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingDiagnostics;
    use crate::models::commit_time;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn applies_last_seen_time_to_leftovers() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        let sink = Arc::new(CollectingDiagnostics::new());
        let mut applier = TimestampApplier::inline(dir.path(), sink.clone());

        let mut set = PathSet::seed(["a.txt", "b.txt", "c.txt"]).unwrap();
        let t = commit_time(500, 0).unwrap();
        set.resolve("c.txt", t);

        let fallback = assign(&set, Some(t), &mut applier, sink.as_ref());
        assert_eq!(fallback.paths, vec!["a.txt", "b.txt"]);
        assert_eq!(fallback.time, Some(t));
        assert_eq!(applier.finish().written, 2);
    }

    #[test]
    fn without_history_nothing_is_written() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        let sink = Arc::new(CollectingDiagnostics::new());
        let mut applier = TimestampApplier::inline(dir.path(), sink.clone());
        let set = PathSet::seed(["a.txt"]).unwrap();

        let fallback = assign(&set, None, &mut applier, sink.as_ref());
        assert_eq!(fallback.paths, vec!["a.txt"]);
        assert_eq!(fallback.time, None);
        let stats = applier.finish();
        assert_eq!(stats.written + stats.unchanged, 0);
    }
}

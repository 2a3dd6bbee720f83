//! The resolution loop.
//!
//! Pulls commits newest first, resolves every still-open target a commit
//! touched to that commit's time, and stops pulling the moment nothing is
//! left open. The first commit to touch a path wins, which on a newest-first
//! walk is the latest change to it.
//!
//! States: `Running` → `Draining` (walker closed, fallback assigned, apply
//! workers joined) → `Finished`.

use std::sync::Arc;

use indicatif::ProgressBar;

use crate::diagnostics::Diagnostics;
use crate::engine::applier::{ApplyJob, TimestampApplier};
use crate::engine::fallback::{self, Fallback};
use crate::engine::path_set::PathSet;
use crate::error::Result;
use crate::git::history::HistoryWalker;
use crate::models::{CommitRecord, CommitTime, ResolutionOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Draining,
    Finished,
}

pub struct ResolutionLoop {
    path_set: PathSet,
    applier: TimestampApplier,
    diagnostics: Arc<dyn Diagnostics>,
    progress: ProgressBar,
    state: LoopState,
    last_seen: Option<CommitTime>,
    commits_visited: usize,
}

impl ResolutionLoop {
    pub fn new(path_set: PathSet, applier: TimestampApplier, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            path_set,
            applier,
            diagnostics,
            progress: ProgressBar::hidden(),
            state: LoopState::Running,
            last_seen: None,
            commits_visited: 0,
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Drives `walker` to completion or early termination.
    ///
    /// The walker is always closed and every queued apply job is finished
    /// before this returns, also when the walk fails. A failed walk skips
    /// the fallback since the history it saw is incomplete.
    pub fn run<W: HistoryWalker + ?Sized>(mut self, walker: &mut W) -> Result<ResolutionOutcome> {
        self.progress.set_length(self.path_set.len() as u64);
        if self.path_set.is_empty() {
            self.transition(LoopState::Draining);
        }

        let walked = self.walk(walker);

        if self.state == LoopState::Running {
            self.transition(LoopState::Draining);
        }
        let closed = walker.close();

        let fallback = match walked {
            Ok(()) => fallback::assign(
                &self.path_set,
                self.last_seen,
                &mut self.applier,
                self.diagnostics.as_ref(),
            ),
            Err(_) => Fallback::default(),
        };

        let ResolutionLoop {
            path_set,
            applier,
            diagnostics,
            progress,
            commits_visited,
            ..
        } = self;
        let apply = applier.finish();
        progress.finish_and_clear();
        diagnostics.debug(format!("resolution loop: {:?}", LoopState::Finished));

        walked?;
        closed?;

        let resolved = path_set
            .resolved()
            .map(|(path, time)| (path.to_string(), time))
            .collect();
        let (fallback_paths, unresolved) = match fallback.time {
            Some(_) => (fallback.paths, Vec::new()),
            None => (Vec::new(), fallback.paths),
        };

        Ok(ResolutionOutcome {
            resolved,
            fallback: fallback_paths,
            fallback_time: fallback.time,
            unresolved,
            commits_visited,
            apply,
        })
    }

    fn walk<W: HistoryWalker + ?Sized>(&mut self, walker: &mut W) -> Result<()> {
        while self.state == LoopState::Running {
            let Some(record) = walker.next_commit()? else {
                self.diagnostics.debug(format!(
                    "history exhausted after {} commit(s), {} path(s) open",
                    self.commits_visited,
                    self.path_set.unresolved_count()
                ));
                return Ok(());
            };
            self.visit(record);

            if self.path_set.is_empty() {
                self.diagnostics.debug(format!(
                    "all paths resolved after {} commit(s)",
                    self.commits_visited
                ));
                self.transition(LoopState::Draining);
            }
        }
        Ok(())
    }

    fn visit(&mut self, record: CommitRecord) {
        self.commits_visited += 1;
        let time = record.time;
        let mut matched = 0u64;

        for change in record.changes {
            if !change.kind.touches() {
                continue;
            }
            if self.path_set.resolve(&change.path, time) {
                self.applier.submit(ApplyJob {
                    path: change.path,
                    time,
                });
                matched += 1;
            }
        }

        self.last_seen = Some(time);
        self.progress.inc(matched);
    }

    fn transition(&mut self, next: LoopState) {
        self.diagnostics
            .debug(format!("resolution loop: {:?} -> {:?}", self.state, next));
        self.state = next;
    }
}

use git2::{Repository, Revwalk, Sort};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::git::diff::{DiffResolver, MergeParents};
use crate::models::{CommitRecord, CommitTime, commit_time};

/// Source of commits for the resolution loop.
///
/// Implementations own their cursor (a revwalk, or a child process and its
/// pipe) and release it in `close` or on drop, whichever comes first.
pub trait HistoryWalker {
    /// Next commit in traversal order, `None` once history is exhausted.
    fn next_commit(&mut self) -> Result<Option<CommitRecord>>;

    /// Stops the walk early and releases the cursor. Idempotent.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<W: HistoryWalker + ?Sized> HistoryWalker for Box<W> {
    fn next_commit(&mut self) -> Result<Option<CommitRecord>> {
        (**self).next_commit()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalkOrder {
    /// Newest committer time first.
    #[default]
    Time,
    /// Whatever order the backend produces natively.
    Native,
}

/// Optional `[since, until]` bound on committer time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub since: Option<CommitTime>,
    pub until: Option<CommitTime>,
}

impl TimeWindow {
    fn too_new(&self, time: &CommitTime) -> bool {
        self.until.is_some_and(|until| *time > until)
    }

    fn too_old(&self, time: &CommitTime) -> bool {
        self.since.is_some_and(|since| *time < since)
    }
}

/// In-process walk over decoded commit objects, starting at HEAD.
pub struct RevWalker<'repo> {
    repo: &'repo Repository,
    revwalk: Option<Revwalk<'repo>>,
    resolver: DiffResolver<'repo>,
    order: WalkOrder,
    window: TimeWindow,
}

impl<'repo> RevWalker<'repo> {
    pub fn new(
        repo: &'repo Repository,
        resolver: DiffResolver<'repo>,
        order: WalkOrder,
        window: TimeWindow,
    ) -> Result<Self> {
        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(match order {
            WalkOrder::Time => Sort::TIME,
            WalkOrder::Native => Sort::NONE,
        })?;
        revwalk
            .push_head()
            .map_err(|e| AppError::HeadNotFound(e.message().to_string()))?;
        if resolver.merge_policy() == MergeParents::First {
            revwalk.simplify_first_parent()?;
        }

        Ok(Self {
            repo,
            revwalk: Some(revwalk),
            resolver,
            order,
            window,
        })
    }
}

impl HistoryWalker for RevWalker<'_> {
    fn next_commit(&mut self) -> Result<Option<CommitRecord>> {
        loop {
            let next = match self.revwalk.as_mut() {
                Some(revwalk) => revwalk.next(),
                None => return Ok(None),
            };
            let Some(oid) = next else {
                self.revwalk = None;
                return Ok(None);
            };

            let commit = self.repo.find_commit(oid?)?;
            let when = commit.time();
            let Some(time) = commit_time(when.seconds(), when.offset_minutes())
                .or_else(|| commit_time(when.seconds(), 0))
            else {
                continue;
            };

            if self.window.too_new(&time) {
                continue;
            }
            if self.window.too_old(&time) {
                if self.order == WalkOrder::Time {
                    self.revwalk = None;
                    return Ok(None);
                }
                continue;
            }

            let changes = self.resolver.changed_paths(&commit);
            return Ok(Some(CommitRecord::new(time, Some(commit.parent_count()), changes)));
        }
    }

    fn close(&mut self) -> Result<()> {
        self.revwalk = None;
        Ok(())
    }
}

/// Replays a fixed list of records. Handy for driving the loop without a repository.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ReplayWalker {
    records: std::collections::VecDeque<CommitRecord>,
    pulled: usize,
    closed: bool,
}

#[cfg(test)]
impl ReplayWalker {
    pub fn new(records: impl IntoIterator<Item = CommitRecord>) -> Self {
        Self {
            records: records.into_iter().collect(),
            pulled: 0,
            closed: false,
        }
    }

    /// How many records the consumer actually pulled.
    pub fn pulled(&self) -> usize {
        self.pulled
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
impl HistoryWalker for ReplayWalker {
    fn next_commit(&mut self) -> Result<Option<CommitRecord>> {
        if self.closed {
            return Ok(None);
        }
        let record = self.records.pop_front();
        if record.is_some() {
            self.pulled += 1;
        }
        Ok(record)
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.records.clear();
        Ok(())
    }
}

use std::collections::HashSet;
use std::sync::Arc;

use git2::{Commit, Delta, DiffDelta, DiffOptions, Repository, Tree};
use serde::Deserialize;

use crate::diagnostics::Diagnostics;
use crate::models::{ChangeKind, ChangedPathEntry};

/// Which parents of a merge commit are diffed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeParents {
    /// Union of the diffs against every parent.
    #[default]
    All,
    /// Only the first parent. Cheaper, but a merge that resolved a conflict
    /// on the second side's file is not seen as touching it.
    First,
}

/// Computes the paths a commit touched relative to its parent(s).
pub struct DiffResolver<'repo> {
    repo: &'repo Repository,
    merge_parents: MergeParents,
    ignore_submodules: bool,
    diagnostics: Arc<dyn Diagnostics>,
}

impl<'repo> DiffResolver<'repo> {
    pub fn new(repo: &'repo Repository, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            repo,
            merge_parents: MergeParents::All,
            ignore_submodules: true,
            diagnostics,
        }
    }

    pub fn merge_parents(mut self, merge_parents: MergeParents) -> Self {
        self.merge_parents = merge_parents;
        self
    }

    pub fn merge_policy(&self) -> MergeParents {
        self.merge_parents
    }

    pub fn ignore_submodules(mut self, ignore: bool) -> Self {
        self.ignore_submodules = ignore;
        self
    }

    /// Changed paths of `commit`, deletions excluded, each path at most once.
    ///
    /// A root commit reports its whole tree as added. A parent whose tree or
    /// diff cannot be computed is skipped with a warning; the other parents
    /// still contribute.
    pub fn changed_paths(&self, commit: &Commit<'_>) -> Vec<ChangedPathEntry> {
        let tree = match commit.tree() {
            Ok(t) => t,
            Err(e) => {
                self.diagnostics
                    .warn(format!("commit {}: cannot read tree: {}", commit.id(), e));
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let mut changes = Vec::new();

        if commit.parent_count() == 0 {
            self.collect(None, &tree, &mut seen, &mut changes);
            return changes;
        }

        let parents = match self.merge_parents {
            MergeParents::All => commit.parent_count(),
            MergeParents::First => 1,
        };

        for i in 0..parents {
            let parent_tree = commit.parent(i).and_then(|p| p.tree());
            match parent_tree {
                Ok(parent_tree) => self.collect(Some(&parent_tree), &tree, &mut seen, &mut changes),
                Err(e) => self.diagnostics.warn(format!(
                    "commit {}: skipping parent {}: {}",
                    commit.id(),
                    i,
                    e
                )),
            }
        }

        changes
    }

    fn collect(
        &self,
        old: Option<&Tree<'_>>,
        new: &Tree<'_>,
        seen: &mut HashSet<String>,
        changes: &mut Vec<ChangedPathEntry>,
    ) {
        let mut opts = DiffOptions::new();
        opts.ignore_submodules(self.ignore_submodules);

        let diff = match self.repo.diff_tree_to_tree(old, Some(new), Some(&mut opts)) {
            Ok(d) => d,
            Err(e) => {
                self.diagnostics
                    .warn(format!("tree {}: diff failed: {}", new.id(), e));
                return;
            }
        };

        for delta in diff.deltas() {
            let Some(kind) = change_kind(delta.status()) else {
                continue;
            };
            if !kind.touches() {
                continue;
            }
            let Some(path) = path_of_record(&delta) else {
                continue;
            };
            if seen.insert(path.clone()) {
                changes.push(ChangedPathEntry::new(path, kind));
            }
        }
    }
}

pub fn change_kind(status: Delta) -> Option<ChangeKind> {
    match status {
        Delta::Added => Some(ChangeKind::Added),
        Delta::Deleted => Some(ChangeKind::Deleted),
        Delta::Modified => Some(ChangeKind::Modified),
        Delta::Renamed => Some(ChangeKind::Renamed),
        Delta::Copied => Some(ChangeKind::Copied),
        Delta::Typechange => Some(ChangeKind::TypeChanged),
        _ => None,
    }
}

/// Destination path, or the source path when the delta has no destination.
fn path_of_record(delta: &DiffDelta<'_>) -> Option<String> {
    delta
        .new_file()
        .path()
        .or_else(|| delta.old_file().path())
        .and_then(|p| p.to_str())
        .map(|p| p.to_string())
}

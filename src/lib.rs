//! Sets the modification time of every tracked file in a git working tree to
//! the time of the last commit that touched it.
//!
//! History is walked newest first against a shrinking set of target paths;
//! the walk stops as soon as every target has been matched, so the cost
//! depends on how far back the oldest file was last changed rather than on
//! the size of the history.
//!
//! Two history sources are available:
//! - `Strategy::Revwalk`: in-process walk over decoded commits with git2 diffs
//! - `Strategy::Log`: streams and tokenizes the output of an external `git log`
//!
//! ## Entry point
//! `use_commit_times(&SyncOptions, diagnostics)` returns a `ResolutionOutcome`
//! describing which paths were resolved, which got the fallback time, and
//! what the filesystem side did.

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod git;
pub mod models;

use std::path::PathBuf;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;

use diagnostics::Diagnostics;
use engine::{PathSet, ResolutionLoop, TimestampApplier};
use error::Result;
use git::{
    DiffResolver, GitRepository, HistoryWalker, LogOptions, LogWalker, MergeParents, RevWalker,
    TimeWindow, WalkOrder,
};
use models::ResolutionOutcome;

/// Which history source feeds the resolution loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// External `git log`, streamed.
    #[default]
    Log,
    /// In-process git2 revwalk.
    Revwalk,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Any directory inside the working tree.
    pub repo: PathBuf,
    /// Explicit targets relative to the repository root. Empty means every
    /// tracked file at HEAD.
    pub paths: Vec<String>,
    pub strategy: Strategy,
    pub order: WalkOrder,
    pub merge_parents: MergeParents,
    pub window: TimeWindow,
    /// Apply workers. Zero applies on the traversal thread.
    pub jobs: usize,
    pub queue_capacity: usize,
    pub progress: bool,
    pub git_program: String,
    pub ignore_submodules: bool,
}

impl SyncOptions {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        let jobs = default_jobs();
        Self {
            repo: repo.into(),
            paths: Vec::new(),
            strategy: Strategy::default(),
            order: WalkOrder::default(),
            merge_parents: MergeParents::default(),
            window: TimeWindow::default(),
            jobs,
            queue_capacity: jobs * 16,
            progress: false,
            git_program: "git".to_string(),
            ignore_submodules: true,
        }
    }
}

pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Synchronizes file mtimes in the working tree at `options.repo` with commit history.
///
/// Fatal problems (no repository, unborn HEAD, untracked explicit target,
/// a failing `git log`) come back as `Err`. Per-path problems are reported
/// through `diagnostics` and collected in the outcome.
pub fn use_commit_times(
    options: &SyncOptions,
    diagnostics: Arc<dyn Diagnostics>,
) -> Result<ResolutionOutcome> {
    let repository = GitRepository::open(&options.repo)?;
    let workdir = repository.workdir()?;

    let targets = if options.paths.is_empty() {
        repository.tracked_files()?
    } else {
        repository.verify_tracked(options.paths.as_slice())?
    };
    let path_set = PathSet::seed(targets)?;
    diagnostics.info(format!(
        "{} target file(s) in {}",
        path_set.len(),
        workdir.display()
    ));
    if path_set.is_empty() {
        return Ok(ResolutionOutcome::default());
    }

    let mut walker: Box<dyn HistoryWalker + '_> = match options.strategy {
        Strategy::Revwalk => {
            let resolver = DiffResolver::new(&repository.repo, Arc::clone(&diagnostics))
                .merge_parents(options.merge_parents)
                .ignore_submodules(options.ignore_submodules);
            Box::new(RevWalker::new(
                &repository.repo,
                resolver,
                options.order,
                options.window,
            )?)
        }
        Strategy::Log => {
            let log_options = LogOptions {
                program: options.git_program.clone(),
                workdir: workdir.clone(),
                order: options.order,
                window: options.window,
                merge_parents: options.merge_parents,
            };
            Box::new(LogWalker::spawn(&log_options, Arc::clone(&diagnostics))?)
        }
    };

    let applier = TimestampApplier::pooled(
        workdir,
        options.jobs,
        options.queue_capacity,
        Arc::clone(&diagnostics),
    )?;

    let mut resolution = ResolutionLoop::new(path_set, applier, diagnostics);
    if options.progress {
        resolution = resolution.with_progress(progress_bar());
    }
    resolution.run(walker.as_mut())
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template("{spinner} [{elapsed}] {wide_bar} {pos}/{len} files")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

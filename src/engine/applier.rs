//! Writes resolved commit times onto files in the working tree.
//!
//! `TimestampApplier::pooled` hands jobs to a fixed set of worker threads
//! through a bounded channel: a slow filesystem blocks the traversal thread
//! in `submit` instead of letting the queue grow. `finish` closes the channel
//! and joins every worker, so all submitted jobs are done when it returns.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded};
use filetime::FileTime;

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::models::{ApplyStats, CommitTime, IoFailure};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyJob {
    pub path: String,
    pub time: CommitTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    Written,
    Unchanged,
    Failed(String),
}

/// Sets atime and mtime of `workdir/job.path` to `job.time` unless the mtime
/// already matches to the second.
pub fn apply_one(workdir: &Path, job: &ApplyJob) -> ApplyResult {
    let full = workdir.join(&job.path);
    let meta = match fs::symlink_metadata(&full) {
        Ok(m) => m,
        Err(e) => return ApplyResult::Failed(format!("cannot stat: {}", e)),
    };

    let target = FileTime::from_unix_time(job.time.timestamp(), 0);
    if FileTime::from_last_modification_time(&meta) == target {
        return ApplyResult::Unchanged;
    }

    let set = if meta.file_type().is_symlink() {
        filetime::set_symlink_file_times(&full, target, target)
    } else {
        filetime::set_file_times(&full, target, target)
    };
    match set {
        Ok(()) => ApplyResult::Written,
        Err(e) => ApplyResult::Failed(format!("cannot set times: {}", e)),
    }
}

fn record(stats: &mut ApplyStats, job: ApplyJob, result: ApplyResult, diagnostics: &dyn Diagnostics) {
    match result {
        ApplyResult::Written => {
            diagnostics.debug(format!("{} -> {}", job.path, job.time.to_rfc3339()));
            stats.written += 1;
        }
        ApplyResult::Unchanged => stats.unchanged += 1,
        ApplyResult::Failed(error) => {
            diagnostics.warn(format!("{}: {}", job.path, error));
            stats.failed.push(IoFailure {
                path: job.path,
                error,
            });
        }
    }
}

enum Mode {
    Inline(ApplyStats),
    Pooled {
        sender: Sender<ApplyJob>,
        workers: Vec<JoinHandle<ApplyStats>>,
        // Jobs that could not be queued because every worker died.
        overflow: ApplyStats,
    },
}

pub struct TimestampApplier {
    workdir: Arc<PathBuf>,
    diagnostics: Arc<dyn Diagnostics>,
    mode: Mode,
}

impl TimestampApplier {
    /// Applies each job on the calling thread as it is submitted.
    pub fn inline(workdir: impl Into<PathBuf>, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            workdir: Arc::new(workdir.into()),
            diagnostics,
            mode: Mode::Inline(ApplyStats::default()),
        }
    }

    /// Spawns `workers` threads draining a queue of at most `capacity` jobs.
    /// Zero workers falls back to `inline`.
    pub fn pooled(
        workdir: impl Into<PathBuf>,
        workers: usize,
        capacity: usize,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Result<Self> {
        let workdir = Arc::new(workdir.into());
        if workers == 0 {
            return Ok(Self {
                workdir,
                diagnostics,
                mode: Mode::Inline(ApplyStats::default()),
            });
        }

        let (sender, receiver) = bounded::<ApplyJob>(capacity.max(1));
        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            let receiver = receiver.clone();
            let workdir = Arc::clone(&workdir);
            let diagnostics = Arc::clone(&diagnostics);
            let handle = thread::Builder::new()
                .name(format!("apply-{}", i))
                .spawn(move || worker(&workdir, receiver, diagnostics.as_ref()))?;
            handles.push(handle);
        }

        Ok(Self {
            workdir,
            diagnostics,
            mode: Mode::Pooled {
                sender,
                workers: handles,
                overflow: ApplyStats::default(),
            },
        })
    }

    pub fn is_pooled(&self) -> bool {
        matches!(self.mode, Mode::Pooled { .. })
    }

    /// Queues (or, inline, performs) one job. Blocks while the queue is full.
    pub fn submit(&mut self, job: ApplyJob) {
        match &mut self.mode {
            Mode::Inline(stats) => {
                let result = apply_one(&self.workdir, &job);
                record(stats, job, result, self.diagnostics.as_ref());
            }
            Mode::Pooled {
                sender, overflow, ..
            } => {
                if let Err(returned) = sender.send(job) {
                    let job = returned.into_inner();
                    let result = apply_one(&self.workdir, &job);
                    record(overflow, job, result, self.diagnostics.as_ref());
                }
            }
        }
    }

    /// Closes the queue, waits for every worker and returns the merged stats.
    pub fn finish(self) -> ApplyStats {
        match self.mode {
            Mode::Inline(stats) => stats,
            Mode::Pooled {
                sender,
                workers,
                mut overflow,
            } => {
                drop(sender);
                for handle in workers {
                    match handle.join() {
                        Ok(stats) => overflow.merge(stats),
                        Err(_) => self.diagnostics.error("an apply worker panicked"),
                    }
                }
                overflow
            }
        }
    }
}

fn worker(workdir: &Path, receiver: Receiver<ApplyJob>, diagnostics: &dyn Diagnostics) -> ApplyStats {
    let mut stats = ApplyStats::default();
    for job in receiver.iter() {
        let result = apply_one(workdir, &job);
        record(&mut stats, job, result, diagnostics);
    }
    stats
}

//! History walk over the streamed output of an external `git log`.
//!
//! The child runs with `-m --name-status -z --pretty=raw`, so every commit
//! shows up as a header block followed by a NUL-separated list of the paths
//! it changed and how. A merge is listed once per parent; consecutive blocks
//! with the same commit id are folded into one record, so a merge counts as
//! one visited commit with the union of its per-parent changes.
//!
//! Output is read in fixed-size chunks and tokenized as it arrives; the whole
//! history is never buffered. `close` kills and reaps the child, which is how
//! the loop stops a multi-gigabyte log as soon as the last target path is
//! resolved.

use std::collections::HashSet;
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::sync::Arc;

use crate::diagnostics::Diagnostics;
use crate::error::{AppError, Result};
use crate::git::diff::MergeParents;
use crate::git::history::{HistoryWalker, TimeWindow, WalkOrder};
use crate::git::raw_log::{Next, RawLogTokenizer, Token};
use crate::models::{ChangedPathEntry, CommitRecord, CommitTime};

const READ_CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct LogOptions {
    pub program: String,
    pub workdir: PathBuf,
    pub order: WalkOrder,
    pub window: TimeWindow,
    pub merge_parents: MergeParents,
}

impl LogOptions {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            program: "git".to_string(),
            workdir: workdir.into(),
            order: WalkOrder::Time,
            window: TimeWindow::default(),
            merge_parents: MergeParents::All,
        }
    }

    /// Arguments passed to the history producer.
    ///
    /// Rename detection is off at the source so the listed names are always
    /// whole paths. No `--diff-filter`: git would drop every commit whose
    /// filtered diff is empty, and each commit has to reach the loop.
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "-c",
            "diff.renames=false",
            "log",
            "-m",
            "-r",
            "--root",
            "--name-status",
            "--no-renames",
            "--no-color",
            "--pretty=raw",
            "-z",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        if self.order == WalkOrder::Time {
            args.push("--date-order".to_string());
        }
        if self.merge_parents == MergeParents::First {
            args.push("--first-parent".to_string());
        }
        if let Some(since) = self.window.since {
            args.push(format!("--since={}", since.to_rfc3339()));
        }
        if let Some(until) = self.window.until {
            args.push(format!("--until={}", until.to_rfc3339()));
        }
        args
    }
}

/// A commit whose blocks are still being read.
struct OpenCommit {
    id: String,
    time: Option<CommitTime>,
    changes: Vec<ChangedPathEntry>,
    seen: HashSet<String>,
}

impl OpenCommit {
    fn new(id: String) -> Self {
        Self {
            id,
            time: None,
            changes: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Adds one block's changes. Deletions are dropped; a path touched
    /// against several parents is kept once.
    fn extend(&mut self, entries: Vec<ChangedPathEntry>) {
        for entry in entries {
            if entry.kind.touches() && self.seen.insert(entry.path.clone()) {
                self.changes.push(entry);
            }
        }
    }
}

pub struct LogWalker {
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    tokenizer: RawLogTokenizer,
    open: Option<OpenCommit>,
    chunk: Vec<u8>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl LogWalker {
    pub fn spawn(options: &LogOptions, diagnostics: Arc<dyn Diagnostics>) -> Result<Self> {
        let args = options.args();
        diagnostics.debug(format!("running {} {}", options.program, args.join(" ")));

        let mut child = Command::new(&options.program)
            .args(&args)
            .current_dir(&options.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                AppError::HistoryProducer(format!("failed to start {}: {}", options.program, e))
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            AppError::HistoryProducer("child stdout was not captured".to_string())
        })?;

        Ok(Self {
            child: Some(child),
            stdout: Some(stdout),
            tokenizer: RawLogTokenizer::new(),
            open: None,
            chunk: vec![0; READ_CHUNK],
            diagnostics,
        })
    }

    /// Reads the next chunk into the tokenizer. Returns false at end of stream.
    fn fill(&mut self) -> Result<bool> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(false);
        };
        loop {
            match stdout.read(&mut self.chunk) {
                Ok(0) => return Ok(false),
                Ok(n) => {
                    self.tokenizer.feed(&self.chunk[..n]);
                    return Ok(true);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Waits for a child that ran to completion and checks its exit status.
    fn reap(&mut self) -> Result<()> {
        self.stdout = None;
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let stderr = read_stderr(child.stderr.take());
        let status = child.wait()?;
        if !status.success() {
            return Err(AppError::HistoryProducer(format!(
                "git log exited with {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn seal(&self, commit: OpenCommit) -> Option<CommitRecord> {
        match commit.time {
            Some(time) => Some(CommitRecord::new(time, None, commit.changes)),
            None => {
                self.diagnostics
                    .warn(format!("commit {} has no committer line, skipped", commit.id));
                None
            }
        }
    }
}

impl HistoryWalker for LogWalker {
    fn next_commit(&mut self) -> Result<Option<CommitRecord>> {
        loop {
            match self.tokenizer.next_token() {
                Next::Ready(Token::Commit(id)) => {
                    // Another parent side of the merge being read.
                    if self.open.as_ref().is_some_and(|open| open.id == id) {
                        continue;
                    }
                    if let Some(done) = self.open.replace(OpenCommit::new(id)) {
                        if let Some(record) = self.seal(done) {
                            return Ok(Some(record));
                        }
                    }
                }
                Next::Ready(Token::Timestamp(time)) => match self.open.as_mut() {
                    Some(open) => open.time = Some(time),
                    None => self.diagnostics.warn("committer line before any commit header"),
                },
                Next::Ready(Token::FileList(entries)) => match self.open.as_mut() {
                    Some(open) => open.extend(entries),
                    None => self.diagnostics.warn(format!(
                        "{} path(s) listed before any commit header",
                        entries.len()
                    )),
                },
                Next::NeedMore => {
                    if !self.fill()? {
                        self.tokenizer.finish();
                    }
                }
                Next::Eof => {
                    if let Some(done) = self.open.take() {
                        if let Some(record) = self.seal(done) {
                            return Ok(Some(record));
                        }
                    }
                    self.reap()?;
                    return Ok(None);
                }
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.stdout = None;
        self.open = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                // Already exited on its own.
                if e.kind() != ErrorKind::InvalidInput {
                    self.diagnostics.warn(format!("cannot kill git log: {}", e));
                }
            }
            child.wait()?;
        }
        Ok(())
    }
}

impl Drop for LogWalker {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            self.diagnostics.warn(format!("cannot release git log: {}", e));
        }
    }
}

fn read_stderr(stderr: Option<ChildStderr>) -> String {
    let mut out = String::new();
    if let Some(mut stderr) = stderr {
        let _ = stderr.read_to_string(&mut out);
    }
    out
}

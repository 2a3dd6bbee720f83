//! Application error types.
//!
//! Everything here is fatal for a run. Per-commit and per-path problems are
//! reported through `Diagnostics` and accumulated in `ResolutionOutcome`
//! instead of surfacing as an `AppError`.
//!
//! - `RepoNotFound`, `BareRepository`, `HeadNotFound` → repository cannot be used
//! - `HistoryProducer` → the external `git log` could not be started or failed
//! - `InvalidPath`, `PathNotTracked` → bad target list
//! - `Config`, `InvalidDate` → bad settings

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("Repository has no working tree: {0}")]
    BareRepository(String),

    #[error("HEAD cannot be resolved: {0}")]
    HeadNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path is not tracked at HEAD: {0}")]
    PathNotTracked(String),

    #[error("History producer failed: {0}")]
    HistoryProducer(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

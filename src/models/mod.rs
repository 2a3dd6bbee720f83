//! Value types shared between the git layer and the engine.
//!
//! - `commit`: CommitTime, CommitRecord
//! - `diff`: ChangeKind, ChangedPathEntry
//! - `outcome`: ResolutionOutcome, ApplyStats, IoFailure

pub mod commit;
pub mod diff;
pub mod outcome;

pub use commit::*;
pub use diff::*;
pub use outcome::*;

pub mod diff;
pub mod history;
pub mod log_stream;
pub mod raw_log;
pub mod repository;

pub use diff::{DiffResolver, MergeParents};
pub use history::{HistoryWalker, RevWalker, TimeWindow, WalkOrder};
pub use log_stream::{LogOptions, LogWalker};
pub use repository::GitRepository;

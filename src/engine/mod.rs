pub mod applier;
pub mod fallback;
pub mod path_set;
pub mod resolve;

pub use applier::{ApplyJob, ApplyResult, TimestampApplier, apply_one};
pub use path_set::PathSet;
pub use resolve::{LoopState, ResolutionLoop};

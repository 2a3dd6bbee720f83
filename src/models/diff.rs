//! Path-level change types produced by `DiffResolver` and the raw log parser.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
    Renamed,
    Copied,
    TypeChanged,
}

impl ChangeKind {
    /// Whether this change counts as the commit that last set the file.
    ///
    /// A deletion cannot give a path a "last touched" time; the path stays
    /// unresolved for an older commit or the fallback.
    pub fn touches(self) -> bool {
        !matches!(self, ChangeKind::Deleted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangedPathEntry {
    pub path: String,
    pub kind: ChangeKind,
}

impl ChangedPathEntry {
    pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

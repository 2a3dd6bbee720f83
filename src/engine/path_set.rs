//! The shrinking worklist of target paths.
//!
//! Only the traversal thread touches a `PathSet`. Apply jobs are handed to
//! workers by value, so nothing here needs a lock.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::CommitTime;

#[derive(Debug, Default)]
pub struct PathSet {
    slots: HashMap<String, Option<CommitTime>>,
    unresolved: usize,
}

impl PathSet {
    /// Creates a set with every path unresolved. Duplicates collapse.
    pub fn seed<I, S>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut slots = HashMap::new();
        for path in paths {
            let path = path.into();
            validate(&path)?;
            slots.insert(path, None);
        }
        let unresolved = slots.len();
        Ok(Self { slots, unresolved })
    }

    /// Marks `path` resolved at `time` if it is a target and still unresolved.
    pub fn resolve(&mut self, path: &str, time: CommitTime) -> bool {
        match self.slots.get_mut(path) {
            Some(slot) if slot.is_none() => {
                *slot = Some(time);
                self.unresolved -= 1;
                true
            }
            _ => false,
        }
    }

    /// True once nothing is left to resolve.
    pub fn is_empty(&self) -> bool {
        self.unresolved == 0
    }

    pub fn unresolved_count(&self) -> usize {
        self.unresolved
    }

    /// Total number of targets, resolved or not.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &str> + '_ {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.is_none())
            .map(|(path, _)| path.as_str())
    }

    pub fn resolved(&self) -> impl Iterator<Item = (&str, CommitTime)> + '_ {
        self.slots
            .iter()
            .filter_map(|(path, slot)| slot.map(|time| (path.as_str(), time)))
    }

    pub fn resolved_time(&self, path: &str) -> Option<CommitTime> {
        self.slots.get(path).copied().flatten()
    }
}

fn validate(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(AppError::InvalidPath("empty path".to_string()));
    }
    if path.starts_with('/') || path.starts_with('\\') || Path::new(path).is_absolute() {
        return Err(AppError::InvalidPath(format!("{} is absolute", path)));
    }
    Ok(())
}

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use filetime::FileTime;
use git2::build::CheckoutBuilder;
use git2::{Commit, Index, IndexEntry, IndexTime, Oid, Repository, Signature, Time};
use rstest::fixture;
use tempfile::TempDir;

/// Committer offset used for every commit, in minutes east of UTC.
pub const OFFSET_MINUTES: i32 = 120;

/// A throw-away repository whose commits are built from explicit snapshots
/// with controlled committer times.
pub struct TestRepo {
    pub dir: TempDir,
    pub repo: Repository,
}

#[fixture]
pub fn test_repo() -> TestRepo {
    TestRepo::new()
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let repo = Repository::init(dir.path()).expect("Failed to init repository");
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Commits a tree holding exactly `files` (path, content) on top of `parents`.
    pub fn commit(&self, files: &[(&str, &str)], parents: &[Oid], secs: i64) -> Oid {
        let mut index = Index::new().expect("Failed to create index");
        for (path, content) in files {
            let blob = self.repo.blob(content.as_bytes()).expect("Failed to write blob");
            index
                .add(&IndexEntry {
                    ctime: IndexTime::new(0, 0),
                    mtime: IndexTime::new(0, 0),
                    dev: 0,
                    ino: 0,
                    mode: 0o100644,
                    uid: 0,
                    gid: 0,
                    file_size: content.len() as u32,
                    id: blob,
                    flags: 0,
                    flags_extended: 0,
                    path: path.as_bytes().to_vec(),
                })
                .expect("Failed to stage entry");
        }
        let tree_id = index.write_tree_to(&self.repo).expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");
        let sig = Signature::new("Test", "test@test.com", &Time::new(secs, OFFSET_MINUTES))
            .expect("Failed to build signature");
        let parents: Vec<Commit> = parents
            .iter()
            .map(|p| self.repo.find_commit(*p).expect("Failed to find parent"))
            .collect();
        let parent_refs: Vec<&Commit> = parents.iter().collect();
        self.repo
            .commit(None, &sig, &sig, "msg", &tree, &parent_refs)
            .expect("Failed to commit")
    }

    /// Linear history: each step is a full snapshot committed at its time.
    pub fn linear(&self, steps: &[(&[(&str, &str)], i64)]) -> Oid {
        let mut parent: Option<Oid> = None;
        for (files, secs) in steps {
            let parents: Vec<Oid> = parent.into_iter().collect();
            parent = Some(self.commit(files, &parents, *secs));
        }
        parent.expect("at least one step")
    }

    /// Points `main` and HEAD at `tip` and checks the tree out.
    pub fn finish(&self, tip: Oid) {
        self.repo
            .reference("refs/heads/main", tip, true, "test tip")
            .expect("Failed to update branch");
        self.repo
            .set_head("refs/heads/main")
            .expect("Failed to set HEAD");
        self.repo
            .checkout_head(Some(CheckoutBuilder::new().force()))
            .expect("Failed to check out HEAD");
    }

    pub fn mtime(&self, path: &str) -> i64 {
        let meta = fs::symlink_metadata(self.path().join(path)).expect("Failed to stat");
        FileTime::from_last_modification_time(&meta).unix_seconds()
    }
}

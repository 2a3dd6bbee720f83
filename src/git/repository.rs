use git2::{Commit, ObjectType, Repository, TreeWalkMode, TreeWalkResult};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

pub struct GitRepository {
    pub repo: Repository,
    pub path: String,
}

impl GitRepository {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let repo = Repository::discover(&path).map_err(|_| AppError::RepoNotFound(path_str.clone()))?;

        Ok(Self {
            repo,
            path: path_str,
        })
    }

    /// Root of the working tree. Bare repositories have none and cannot be synced.
    pub fn workdir(&self) -> Result<PathBuf> {
        self.repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| AppError::BareRepository(self.path.clone()))
    }

    pub fn head_commit(&self) -> Result<Commit<'_>> {
        let head = self
            .repo
            .head()
            .map_err(|e| AppError::HeadNotFound(e.message().to_string()))?;
        head.peel_to_commit()
            .map_err(|e| AppError::HeadNotFound(e.message().to_string()))
    }

    /// Every blob path in the HEAD tree, `/`-separated and relative to the root.
    ///
    /// Submodule gitlinks are skipped; symlinks are included.
    pub fn tracked_files(&self) -> Result<Vec<String>> {
        let tree = self.head_commit()?.tree()?;
        let mut files = Vec::new();

        tree.walk(TreeWalkMode::PreOrder, |dir, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    files.push(format!("{}{}", dir, name));
                }
            }
            TreeWalkResult::Ok
        })?;

        Ok(files)
    }

    /// Normalizes explicit targets and checks each one names a blob at HEAD.
    pub fn verify_tracked<S: AsRef<str>>(&self, paths: &[S]) -> Result<Vec<String>> {
        let tree = self.head_commit()?.tree()?;
        let mut verified = Vec::with_capacity(paths.len());

        for path in paths {
            let normalized = normalize(path.as_ref());
            let entry = tree
                .get_path(Path::new(&normalized))
                .map_err(|_| AppError::PathNotTracked(normalized.clone()))?;
            if entry.kind() != Some(ObjectType::Blob) {
                return Err(AppError::PathNotTracked(normalized));
            }
            verified.push(normalized);
        }

        Ok(verified)
    }
}

fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut trimmed = path.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn repo_with(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Test", "test@test.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[])
            .unwrap();
        dir
    }

    #[test]
    fn tracked_files_lists_nested_blobs() {
        let dir = repo_with(&[("a.txt", "a"), ("src/lib.rs", "x"), ("src/deep/mod.rs", "y")]);
        let repo = GitRepository::open(dir.path()).unwrap();
        let mut files = repo.tracked_files().unwrap();
        files.sort();
        assert_eq!(files, vec!["a.txt", "src/deep/mod.rs", "src/lib.rs"]);
    }

    #[test]
    fn open_discovers_from_subdirectory() {
        let dir = repo_with(&[("src/lib.rs", "x")]);
        let repo = GitRepository::open(dir.path().join("src")).unwrap();
        let workdir = repo.workdir().unwrap();
        assert_eq!(
            fs::canonicalize(workdir).unwrap(),
            fs::canonicalize(dir.path()).unwrap()
        );
    }

    #[test]
    fn verify_tracked_normalizes_and_rejects_unknown() {
        let dir = repo_with(&[("src/lib.rs", "x")]);
        let repo = GitRepository::open(dir.path()).unwrap();
        assert_eq!(repo.verify_tracked(&["./src/lib.rs"]).unwrap(), vec!["src/lib.rs"]);
        assert!(matches!(
            repo.verify_tracked(&["nope.txt"]),
            Err(AppError::PathNotTracked(_))
        ));
        assert!(matches!(
            repo.verify_tracked(&["src"]),
            Err(AppError::PathNotTracked(_))
        ));
    }

    #[test]
    fn unborn_head_is_reported() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let repo = GitRepository::open(dir.path()).unwrap();
        assert!(matches!(repo.tracked_files(), Err(AppError::HeadNotFound(_))));
    }
}

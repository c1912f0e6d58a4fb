//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use git2::{Oid, Repository, Signature};

/// Get the path to test fixtures directory.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Get the path to a Gemini response fixture.
pub fn response_fixture(name: &str) -> PathBuf {
    fixtures_dir().join("responses").join(name)
}

/// Read a fixture file as a string.
pub fn read_fixture(path: PathBuf) -> String {
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {:?}: {}", path, e))
}

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository with a committer identity configured.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");
        {
            let mut config = repo.config().expect("Failed to open repo config");
            config
                .set_str("user.name", "Test User")
                .expect("Failed to set user.name");
            config
                .set_str("user.email", "test@example.com")
                .expect("Failed to set user.email");
        }
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn signature(&self) -> Signature<'_> {
        Signature::now("Test User", "test@example.com").expect("Failed to create signature")
    }

    /// Write a file in the working tree, creating parent directories.
    pub fn write(&self, name: &str, content: impl AsRef<[u8]>) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Stage a file (`git add <name>`).
    pub fn stage(&self, name: &str) {
        let mut index = self.repo.index().expect("Failed to get index");
        index.add_path(Path::new(name)).expect("Failed to add file");
        index.write().expect("Failed to write index");
    }

    /// Remove a file from the index and working tree (`git rm <name>`).
    pub fn stage_removal(&self, name: &str) {
        std::fs::remove_file(self.dir.path().join(name)).expect("Failed to remove file");
        let mut index = self.repo.index().expect("Failed to get index");
        index
            .remove_path(Path::new(name))
            .expect("Failed to remove from index");
        index.write().expect("Failed to write index");
    }

    /// Rename a file and stage both sides (`git mv <from> <to>`).
    pub fn stage_rename(&self, from: &str, to: &str) {
        std::fs::rename(self.dir.path().join(from), self.dir.path().join(to))
            .expect("Failed to rename file");
        let mut index = self.repo.index().expect("Failed to get index");
        index
            .remove_path(Path::new(from))
            .expect("Failed to remove old path");
        index.add_path(Path::new(to)).expect("Failed to add new path");
        index.write().expect("Failed to write index");
    }

    /// Write and stage a file in one step.
    pub fn write_and_stage(&self, name: &str, content: impl AsRef<[u8]>) {
        self.write(name, content);
        self.stage(name);
    }

    /// Commit whatever is staged. Returns the commit OID.
    pub fn commit_staged(&self, message: &str) -> Oid {
        let sig = self.signature();
        let mut index = self.repo.index().expect("Failed to get index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    /// Write, stage, and commit a single file.
    pub fn commit_file(&self, name: &str, content: impl AsRef<[u8]>, message: &str) -> Oid {
        self.write_and_stage(name, content);
        self.commit_staged(message)
    }
}

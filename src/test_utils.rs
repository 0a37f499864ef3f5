//! Test utilities for creating temporary remotes and forks.

use crate::{fork::Fork, remote::Remote};
use git2::{Oid, Repository, Signature};
use std::path::PathBuf;
use tempfile::TempDir;

/// A temporary bare repository standing in for a hosted remote.
pub struct TestRemote {
    pub dir: TempDir,
    pub branch: String,
}

impl TestRemote {
    /// Create an empty bare repository whose HEAD points at `branch`.
    pub fn new(branch: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let repo = Repository::init_bare(dir.path()).expect("Failed to init bare repo");
        repo.set_head(&format!("refs/heads/{}", branch))
            .expect("Failed to set HEAD");

        Self {
            dir,
            branch: branch.to_string(),
        }
    }

    /// Create a bare repository with an initial commit on `branch`.
    pub fn with_initial_commit(branch: &str) -> Self {
        let remote = Self::new(branch);
        remote.commit("Initial commit", &[("README.md", "# Test Repo\n")]);
        remote
    }

    /// Create a bare repository holding the same history as `other`, i.e. a mirror.
    pub fn mirror_of(other: &TestRemote) -> Self {
        let remote = Self::new(&other.branch);
        let repo = remote.repo();
        repo.remote_anonymous(&other.url())
            .expect("Failed to create anonymous remote")
            .fetch(&["+refs/heads/*:refs/heads/*"], None, None)
            .expect("Failed to mirror remote");
        remote
    }

    /// Get the git2 repository
    pub fn repo(&self) -> Repository {
        Repository::open_bare(self.dir.path()).expect("Failed to open repo")
    }

    /// The URL (a local path) of the remote.
    pub fn url(&self) -> String {
        self.dir.path().to_string_lossy().to_string()
    }

    /// Builds a [Remote] descriptor for this repository.
    pub fn remote(&self, name: &str) -> Remote {
        Remote::new(name, self.branch.as_str(), self.url(), "test", "secret")
    }

    /// The commit `branch` points at.
    pub fn tip(&self) -> Oid {
        self.repo()
            .refname_to_id(&format!("refs/heads/{}", self.branch))
            .expect("Failed to resolve branch")
    }

    /// Commit top-level `files` on top of the current tip of `branch`.
    pub fn commit(&self, message: &str, files: &[(&str, &str)]) -> Oid {
        let repo = self.repo();
        let refname = format!("refs/heads/{}", self.branch);

        let parent = repo
            .find_reference(&refname)
            .ok()
            .and_then(|r| r.peel_to_commit().ok());
        let base_tree = parent.as_ref().map(|c| c.tree().expect("Failed to get tree"));

        let mut builder = repo
            .treebuilder(base_tree.as_ref())
            .expect("Failed to create tree builder");
        for &(name, content) in files {
            let blob = repo.blob(content.as_bytes()).expect("Failed to write blob");
            builder
                .insert(name, blob, 0o100644)
                .expect("Failed to insert blob");
        }
        let tree_oid = builder.write().expect("Failed to write tree");
        let tree = repo.find_tree(tree_oid).expect("Failed to find tree");

        let sig = Signature::now("Test User", "test@example.com").expect("Failed to sign");
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        repo.commit(Some(&refname), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }
}

/// Two mirrored remotes sharing an initial commit, plus a directory to hold the fork.
pub struct TestFork {
    pub a: TestRemote,
    pub b: TestRemote,
    pub dir: TempDir,
}

impl TestFork {
    pub fn new() -> Self {
        let a = TestRemote::with_initial_commit("master");
        let b = TestRemote::mirror_of(&a);

        Self {
            a,
            b,
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// The path the fork repository is bootstrapped at.
    pub fn path(&self) -> PathBuf {
        self.dir.path().join("fork")
    }

    pub fn remote_a(&self) -> Remote {
        self.a.remote("github")
    }

    pub fn remote_b(&self) -> Remote {
        self.b.remote("gitlab")
    }

    /// Bootstrap the fork over both remotes.
    pub fn bootstrap(&self) -> Fork {
        Fork::bootstrap(self.path(), self.remote_a(), self.remote_b())
            .expect("Failed to bootstrap fork")
    }
}

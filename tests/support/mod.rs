//! Shared fixtures for integration tests.
//!
//! A [`Workspace`] holds two bare "remotes" (`upstream`, `origin`), a seed
//! clone used to publish commits upstream as another developer would, and
//! the working clone the code under test runs in.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use gitferry::git::Git;

pub const AUTHOR: &str = "Test User <test@example.com>";

/// Run a git command in `dir` and return its stdout.
pub fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "Test User")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test User")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8(output.stdout).unwrap()
}

fn configure(dir: &Path) {
    run_git(dir, &["config", "user.email", "test@example.com"]);
    run_git(dir, &["config", "user.name", "Test User"]);
    run_git(dir, &["config", "commit.gpgsign", "false"]);
    run_git(dir, &["config", "core.editor", "true"]);
}

/// Two remotes plus a working clone.
pub struct Workspace {
    root: TempDir,
}

impl Workspace {
    /// `main` and `dev` at one initial commit, published to both remotes
    /// and checked out locally (on `main`).
    pub fn new() -> Self {
        let root = TempDir::new().expect("failed to create temp dir");
        let path = root.path();

        run_git(path, &["init", "--bare", "-b", "main", "upstream.git"]);
        run_git(path, &["init", "--bare", "-b", "main", "origin.git"]);

        run_git(path, &["clone", "upstream.git", "seed"]);
        let seed = path.join("seed");
        configure(&seed);
        std::fs::write(seed.join("README.md"), "# Test Repo\n").unwrap();
        run_git(&seed, &["add", "README.md"]);
        run_git(&seed, &["commit", "-m", "Initial commit"]);
        run_git(&seed, &["branch", "dev"]);
        run_git(&seed, &["push", "origin", "main", "dev"]);
        run_git(&seed, &["push", "../origin.git", "main", "dev"]);

        run_git(path, &["clone", "--origin", "upstream", "upstream.git", "work"]);
        let work = path.join("work");
        configure(&work);
        run_git(&work, &["remote", "add", "origin", "../origin.git"]);
        run_git(&work, &["fetch", "origin"]);
        run_git(&work, &["branch", "dev", "upstream/dev"]);

        Self { root }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// The working clone.
    pub fn work(&self) -> PathBuf {
        self.root.path().join("work")
    }

    pub fn seed(&self) -> PathBuf {
        self.root.path().join("seed")
    }

    pub fn upstream(&self) -> PathBuf {
        self.root.path().join("upstream.git")
    }

    pub fn origin(&self) -> PathBuf {
        self.root.path().join("origin.git")
    }

    pub fn git(&self) -> Git {
        Git::open(&self.work()).expect("failed to open work tree")
    }

    /// Create `branch` upstream from `from`.
    pub fn upstream_branch(&self, branch: &str, from: &str) {
        let seed = self.seed();
        run_git(&seed, &["fetch", "origin"]);
        run_git(&seed, &["branch", "--force", branch, &format!("origin/{}", from)]);
        run_git(&seed, &["push", "origin", branch]);
    }

    /// Commit a file on `branch` upstream.
    pub fn commit_upstream(&self, branch: &str, file: &str, message: &str) -> String {
        self.commit_upstream_as(branch, file, message, AUTHOR)
    }

    /// Commit a file on `branch` upstream with a specific author.
    pub fn commit_upstream_as(&self, branch: &str, file: &str, message: &str, author: &str) -> String {
        let seed = self.seed();
        run_git(&seed, &["fetch", "origin"]);
        run_git(&seed, &["checkout", "-B", branch, &format!("origin/{}", branch)]);
        std::fs::write(seed.join(file), format!("{}\n", message)).unwrap();
        run_git(&seed, &["add", file]);
        run_git(&seed, &["commit", "-m", message, "--author", author]);
        run_git(&seed, &["push", "origin", branch]);
        rev(&seed, "HEAD")
    }

    /// Commit a file on local `branch` in the working clone, then return
    /// to the branch that was checked out.
    pub fn commit_local(&self, branch: &str, file: &str, message: &str) -> String {
        let work = self.work();
        let previous = current_branch(&work);
        run_git(&work, &["checkout", branch]);
        std::fs::write(work.join(file), format!("{}\n", message)).unwrap();
        run_git(&work, &["add", file]);
        run_git(&work, &["commit", "-m", message]);
        let oid = rev(&work, "HEAD");
        run_git(&work, &["checkout", &previous]);
        oid
    }

    /// Local branches of the working clone.
    pub fn local_branches(&self) -> Vec<String> {
        run_git(&self.work(), &["branch", "--format=%(refname:short)"])
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn temp_branches(&self) -> Vec<String> {
        self.local_branches()
            .into_iter()
            .filter(|b| b.starts_with("ferry-tmp/"))
            .collect()
    }
}

/// Resolve `rev` in the repository at `dir` (bare or not).
pub fn rev(dir: &Path, rev: &str) -> String {
    run_git(dir, &["rev-parse", rev]).trim().to_string()
}

pub fn current_branch(dir: &Path) -> String {
    run_git(dir, &["rev-parse", "--abbrev-ref", "HEAD"])
        .trim()
        .to_string()
}

/// Number of commits in `range`.
pub fn count(dir: &Path, range: &str) -> usize {
    run_git(dir, &["rev-list", "--count", range])
        .trim()
        .parse()
        .unwrap()
}

/// Whether the external `patch` utility is installed.
pub fn has_patch_utility() -> bool {
    Command::new("patch")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

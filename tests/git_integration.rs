//! Integration tests for the Git interface.
//!
//! These tests use real git repositories created via tempfile to verify
//! that the production `Git` port behaves as the engine expects.

mod support;

use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;

use gitferry::core::types::{RefSpec, SyncStatus};
use gitferry::git::{Git, GitError, GitPort};

use support::{count, current_branch, rev, run_git, Workspace};

// =============================================================================
// Repository Opening Tests
// =============================================================================

#[test]
fn open_valid_repository() {
    let ws = Workspace::new();
    assert!(Git::open(&ws.work()).is_ok());
}

#[test]
fn open_from_subdirectory() {
    let ws = Workspace::new();
    let subdir = ws.work().join("subdir");
    std::fs::create_dir(&subdir).unwrap();
    let git = Git::open(&subdir).unwrap();
    assert_eq!(
        git.work_dir().canonicalize().unwrap(),
        ws.work().canonicalize().unwrap()
    );
}

#[test]
fn open_outside_repository_fails() {
    let dir = TempDir::new().unwrap();
    let err = Git::open(dir.path()).unwrap_err();
    assert!(matches!(err, GitError::NotARepo { .. }));
}

#[test]
fn open_bare_repository_fails() {
    let ws = Workspace::new();
    let err = Git::open(&ws.upstream()).unwrap_err();
    assert!(matches!(err, GitError::BareRepo | GitError::NotARepo { .. }));
}

// =============================================================================
// Branch and State Queries
// =============================================================================

#[test]
fn current_branch_and_detached_head() {
    let ws = Workspace::new();
    let git = ws.git();
    assert_eq!(git.current_branch().unwrap().unwrap().as_str(), "main");

    run_git(&ws.work(), &["checkout", "--detach"]);
    assert_eq!(git.current_branch().unwrap(), None);
}

#[test]
fn guard_working_tree_ready_detects_changes() {
    let ws = Workspace::new();
    let git = ws.git();
    assert!(git.guard_working_tree_ready().is_ok());

    // Untracked files are fine.
    std::fs::write(ws.work().join("notes.txt"), "scratch").unwrap();
    assert!(git.guard_working_tree_ready().is_ok());

    std::fs::write(ws.work().join("README.md"), "changed").unwrap();
    assert!(matches!(
        git.guard_working_tree_ready(),
        Err(GitError::DirtyWorktree { .. })
    ));
}

#[test]
fn guard_branch_exists() {
    let ws = Workspace::new();
    let git = ws.git();
    assert!(git.guard_branch_exists("dev").is_ok());
    assert!(matches!(
        git.guard_branch_exists("nope"),
        Err(GitError::BranchNotFound { .. })
    ));
}

#[test]
fn guard_remote_branch_exists() {
    let ws = Workspace::new();
    let git = ws.git();
    assert!(git.guard_remote_branch_exists("upstream", "dev").is_ok());
    assert!(matches!(
        git.guard_remote_branch_exists("upstream", "nope"),
        Err(GitError::RemoteBranchNotFound { .. })
    ));
}

#[test]
fn remote_diff_status_covers_all_states() {
    let ws = Workspace::new();
    let git = ws.git();
    let status = || {
        git.remote_update("upstream").unwrap();
        git.remote_diff_status("upstream", "dev", "dev").unwrap()
    };

    assert_eq!(status(), SyncStatus::UpToDate);

    ws.commit_upstream("dev", "a.txt", "upstream change");
    assert_eq!(status(), SyncStatus::NeedPull);

    ws.commit_local("dev", "b.txt", "local change");
    assert_eq!(status(), SyncStatus::Diverged);

    run_git(&ws.work(), &["branch", "--force", "dev", "upstream/dev"]);
    ws.commit_local("dev", "c.txt", "local only");
    assert_eq!(status(), SyncStatus::NeedPush);
}

#[test]
fn rev_parse_and_merge_base() {
    let ws = Workspace::new();
    let git = ws.git();
    let base = rev(&ws.work(), "main");
    ws.commit_local("dev", "a.txt", "on dev");

    assert_eq!(git.rev_parse("main").unwrap().as_str(), base);
    assert_eq!(git.merge_base("main", "dev").unwrap().as_str(), base);
    assert!(matches!(
        git.rev_parse("no-such-ref"),
        Err(GitError::RefNotFound { .. })
    ));
}

// =============================================================================
// Mutations
// =============================================================================

#[test]
fn create_temp_branch_is_unused_and_not_created() {
    let ws = Workspace::new();
    let git = ws.git();
    let a = git.create_temp_branch("release/1.0").unwrap();
    let b = git.create_temp_branch("release/1.0").unwrap();

    assert!(a.as_str().starts_with("ferry-tmp/release-1-0-"));
    assert_ne!(a, b);
    assert!(ws.temp_branches().is_empty());
}

#[test]
fn checkout_creates_branch() {
    let ws = Workspace::new();
    let git = ws.git();
    git.checkout("upstream/dev", false).unwrap();
    git.checkout("ferry-tmp/dev-1", true).unwrap();
    assert_eq!(current_branch(&ws.work()), "ferry-tmp/dev-1");
}

#[test]
fn merge_branch_creates_merge_commit() {
    let ws = Workspace::new();
    let git = ws.git();
    ws.commit_local("dev", "a.txt", "on dev");

    let oid = git.merge_branch("main", "dev", "Merge dev", false).unwrap();

    assert_eq!(current_branch(&ws.work()), "main");
    assert_eq!(oid.as_str(), rev(&ws.work(), "main"));
    assert_eq!(rev(&ws.work(), "main^2"), rev(&ws.work(), "dev"));
    let subject = run_git(&ws.work(), &["log", "-1", "--format=%s"]);
    assert_eq!(subject.trim(), "Merge dev");
}

#[test]
fn merge_branch_fast_forward_only() {
    let ws = Workspace::new();
    let git = ws.git();
    let tip = ws.commit_local("dev", "a.txt", "on dev");

    let oid = git.merge_branch("main", "dev", "unused", true).unwrap();
    assert_eq!(oid.as_str(), tip);

    ws.commit_local("main", "b.txt", "on main");
    ws.commit_local("dev", "c.txt", "more dev");
    assert!(git.merge_branch("main", "dev", "unused", true).is_err());
}

#[test]
fn merge_branch_with_log_lists_commits() {
    let ws = Workspace::new();
    let git = ws.git();
    ws.commit_local("dev", "a.txt", "first fix");
    ws.commit_local("dev", "b.txt", "second fix");

    git.merge_branch_with_log("main", "dev", "Merge dev into main", "upstream/dev")
        .unwrap();

    let body = run_git(&ws.work(), &["log", "-1", "--format=%B"]);
    assert!(body.starts_with("Merge dev into main\n\nCommits from upstream/dev:\n"));
    let first = body.find("first fix").unwrap();
    let second = body.find("second fix").unwrap();
    assert!(first < second);
}

#[test]
fn squash_single_author() {
    let ws = Workspace::new();
    let git = ws.git();
    ws.commit_local("dev", "a.txt", "part one");
    ws.commit_local("dev", "b.txt", "part two");

    git.squash_commits("main", "dev", false).unwrap();

    assert_eq!(count(&ws.work(), "main..dev"), 1);
    let subject = run_git(&ws.work(), &["log", "-1", "--format=%s", "dev"]);
    assert_eq!(subject.trim(), "part one");
    assert!(ws.work().join("b.txt").exists());
}

#[test]
fn squash_refuses_multiple_authors() {
    let ws = Workspace::new();
    let git = ws.git();
    ws.commit_upstream_as("dev", "a.txt", "by alice", "Alice <alice@example.com>");
    ws.commit_upstream_as("dev", "b.txt", "by bob", "Bob <bob@example.com>");
    git.remote_update("upstream").unwrap();
    let before = rev(&ws.work(), "upstream/dev");

    let err = git.squash_commits("main", "upstream/dev", false).unwrap_err();
    match err {
        GitError::MultipleAuthors { authors } => assert_eq!(authors.len(), 2),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(rev(&ws.work(), "upstream/dev"), before);
}

#[test]
fn squash_single_commit_is_noop() {
    let ws = Workspace::new();
    let git = ws.git();
    let tip = ws.commit_local("dev", "a.txt", "only one");
    git.squash_commits("main", "dev", false).unwrap();
    assert_eq!(rev(&ws.work(), "dev"), tip);
}

#[test]
fn reset_hard_and_delete_branch() {
    let ws = Workspace::new();
    let git = ws.git();
    ws.commit_local("dev", "a.txt", "local");
    git.checkout("dev", false).unwrap();
    git.reset_hard("upstream/dev").unwrap();
    assert_eq!(rev(&ws.work(), "dev"), rev(&ws.work(), "upstream/dev"));

    git.checkout("main", false).unwrap();
    git.delete_branch("dev").unwrap();
    assert!(!ws.local_branches().contains(&"dev".to_string()));
}

#[test]
fn commit_all_stages_everything() {
    let ws = Workspace::new();
    let git = ws.git();
    std::fs::write(ws.work().join("new.txt"), "new").unwrap();
    std::fs::write(ws.work().join("README.md"), "changed").unwrap();

    let oid = git.commit_all("Add and change").unwrap();

    assert_eq!(oid.as_str(), rev(&ws.work(), "HEAD"));
    assert!(git.guard_working_tree_ready().is_ok());
    let files = run_git(&ws.work(), &["show", "--name-only", "--format=", "HEAD"]);
    assert!(files.contains("new.txt") && files.contains("README.md"));
}

#[test]
fn push_to_remote_publishes_refspec() {
    let ws = Workspace::new();
    let git = ws.git();
    let tip = ws.commit_local("dev", "a.txt", "to publish");

    let spec = RefSpec::new("dev", "published").unwrap();
    git.push_to_remote("origin", &spec, false).unwrap();

    assert_eq!(rev(&ws.origin(), "refs/heads/published"), tip);
}

#[test]
fn add_remote_tolerates_existing() {
    let ws = Workspace::new();
    let git = ws.git();
    let url = ws.origin().to_string_lossy().into_owned();
    git.add_remote("mirror", &url).unwrap();
    git.add_remote("mirror", &url).unwrap();
    let remotes = run_git(&ws.work(), &["remote"]);
    assert!(remotes.lines().any(|r| r == "mirror"));
}

#[test]
fn run_command_failure_carries_stderr() {
    let ws = Workspace::new();
    let git = ws.git();
    match git.run_command(&["checkout", "no-such-branch"]) {
        Err(GitError::Process {
            stderr, exit_code, ..
        }) => {
            assert!(!stderr.is_empty());
            assert_ne!(exit_code, Some(0));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn timeout_is_applied() {
    let ws = Workspace::new();
    let git = ws.git().with_timeout(Duration::from_secs(30));
    assert!(git.run_command(&["status"]).is_ok());
}

#[test]
fn apply_patch_with_strip_level() {
    if !support::has_patch_utility() {
        return;
    }
    let ws = Workspace::new();
    let git = ws.git();
    let patch = ws.root().join("fix.patch");
    std::fs::write(
        &patch,
        "--- a/README.md\n+++ b/README.md\n@@ -1 +1 @@\n-# Test Repo\n+# Patched Repo\n",
    )
    .unwrap();

    git.apply_patch(&patch, 1).unwrap();

    let readme = std::fs::read_to_string(ws.work().join("README.md")).unwrap();
    assert_eq!(readme, "# Patched Repo\n");
    assert!(git.apply_patch(Path::new("/nonexistent.patch"), 1).is_err());
}

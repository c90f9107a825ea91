use crate::cli::{Cli, Commands, HookCommand, WorkspaceCommand};
use crate::commands::input_message;
use crate::config::Config;
use crate::context::copy_context;
use crate::context_info::{
    branch_status_summary, directory_snapshot, parse_pr_view, render_context_info,
};
use crate::error::WorkspaceError;
use crate::git::{
    branch_exists, common_root_from_git_common_dir, parse_git_worktree_porcelain,
    parse_left_right_count, parse_numstat_line, repo_root, repo_root_from,
    summarize_porcelain_status,
};
use crate::hook::{AutoCommit, auto_commit, edit_commit_message, parse_hook_input};
use crate::init::{
    FileStatus, InitOptions, InitReport, InitTarget, configure_mcp, default_mcp_servers, install,
    install_settings, splice_repository_index,
};
use crate::manager::{AheadBehind, WorkspaceManager};
use crate::notify::{
    Notification, last_assistant_text, notification_line, osascript_source,
    terminal_notifier_args,
};
use crate::process::run_capture;
use crate::settings_merge::merge_settings;
use crate::ui::{CommandResult, OutputMode, format_table};
use crate::workspace::{sanitize_workspace_name, workspaces_from_porcelain};
use clap::Parser;
use serde_json::json;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex as StdMutex, OnceLock as StdOnceLock};
use tempfile::TempDir;

fn cwd_lock() -> &'static StdMutex<()> {
    static LOCK: StdOnceLock<StdMutex<()>> = StdOnceLock::new();
    LOCK.get_or_init(|| StdMutex::new(()))
}

struct CwdReset(PathBuf);

impl Drop for CwdReset {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.0);
    }
}

fn run_git_checked(cwd: &Path, args: &[&str]) -> String {
    let output = run_capture("git", args, Some(cwd)).expect("run git command");
    assert!(
        output.status.success(),
        "git {:?} failed\nstdout:\n{}\nstderr:\n{}",
        args,
        output.stdout,
        output.stderr
    );
    output.stdout
}

fn init_test_repo(root: &Path) -> PathBuf {
    let repo = root.join("repo");
    fs::create_dir_all(&repo).expect("mkdir repo");
    run_git_checked(&repo, &["init"]);
    run_git_checked(&repo, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    run_git_checked(&repo, &["config", "user.email", "test@example.com"]);
    run_git_checked(&repo, &["config", "user.name", "Test User"]);
    run_git_checked(&repo, &["config", "commit.gpgsign", "false"]);
    fs::write(repo.join("README.md"), "hello\n").expect("write README");
    run_git_checked(&repo, &["add", "README.md"]);
    run_git_checked(&repo, &["commit", "-m", "init"]);
    repo
}

struct Fixture {
    _temp: TempDir,
    repo: PathBuf,
    home: PathBuf,
    manager: WorkspaceManager,
}

fn fixture() -> Fixture {
    let temp = TempDir::new().expect("tempdir");
    let repo = init_test_repo(temp.path());
    let home = temp.path().join("home");
    fs::create_dir_all(&home).expect("mkdir home");
    let manager = WorkspaceManager::with_home(&repo, &home).expect("manager");
    Fixture {
        _temp: temp,
        repo,
        home,
        manager,
    }
}

fn last_commit_subject(dir: &Path) -> String {
    run_git_checked(dir, &["log", "-1", "--format=%s"])
        .trim()
        .to_string()
}

#[test]
fn test_sanitize_workspace_name_examples() {
    assert_eq!(sanitize_workspace_name("feature/auth-api"), "feature-auth-api");
    assert_eq!(sanitize_workspace_name("feat/BS 123_new"), "feat-BS-123-new");
    assert_eq!(sanitize_workspace_name("fix\\windows//path"), "fix-windows-path");
    assert_eq!(sanitize_workspace_name("/leading/"), "leading");
    assert_eq!(sanitize_workspace_name("release-1.2.3"), "release-1.2.3");
    assert_eq!(sanitize_workspace_name("wip: emoji 🚀"), "wip-emoji");
    assert_eq!(sanitize_workspace_name("a--b"), "a--b");
    assert_eq!(sanitize_workspace_name("a - b"), "a---b");
}

#[test]
fn test_sanitize_workspace_name_properties() {
    for input in [
        "feature/auth-api",
        "a//b\\\\c",
        "  spaced   out  ",
        "__under__scored__",
        "-dash-/-dash-",
        "x/y z_w",
    ] {
        let name = sanitize_workspace_name(input);
        assert!(!name.contains('/'), "{name}");
        assert!(!name.contains('\\'), "{name}");
        assert!(!name.chars().any(char::is_whitespace), "{name}");
        assert!(!name.starts_with('-') && !name.ends_with('-'), "{name}");
        assert!(
            name.chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '.'),
            "{name}"
        );
        assert_eq!(sanitize_workspace_name(&name), name, "not idempotent");
    }
}

#[test]
fn test_parse_git_worktree_porcelain() {
    let raw = "worktree /repo
HEAD 0123456789abcdef0123456789abcdef01234567
branch refs/heads/main

worktree /home/u/.claude/workspaces/repo/feature-x
HEAD abcdefabcdefabcdefabcdefabcdefabcdefabcd
branch refs/heads/feature/x

worktree /tmp/detached
HEAD 1111111111111111111111111111111111111111
detached

worktree /tmp/odd
HEAD 2222222222222222222222222222222222222222
branch refs/remotes/origin/odd";

    let entries = parse_git_worktree_porcelain(raw);
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].path, PathBuf::from("/repo"));
    assert_eq!(entries[0].commit, "01234567");
    assert_eq!(entries[0].branch.as_deref(), Some("main"));
    assert_eq!(entries[1].branch.as_deref(), Some("feature/x"));
    assert_eq!(entries[2].branch, None);
    assert_eq!(entries[2].commit, "11111111");
    assert_eq!(entries[3].branch.as_deref(), Some("refs/remotes/origin/odd"));
}

#[test]
fn test_workspaces_from_porcelain_marks_first_entry_main() {
    let raw = "worktree /repo\nHEAD aaaaaaaaaaaa\nbranch refs/heads/main\n\nworktree /home/u/.claude/workspaces/repo/x\nHEAD bbbbbbbbbbbb\nbranch refs/heads/x\n\n";
    let workspaces = workspaces_from_porcelain(
        raw,
        Path::new("/repo"),
        Path::new("/home/u/.claude/workspaces/repo"),
    );
    assert_eq!(workspaces.len(), 2);
    assert!(workspaces[0].is_main);
    assert!(!workspaces[1].is_main);
    assert!(!workspaces[0].is_managed());
    assert!(workspaces[1].is_managed());
    assert_eq!(workspaces[1].repo_root, PathBuf::from("/repo"));
}

#[test]
fn test_summarize_porcelain_status() {
    assert_eq!(summarize_porcelain_status(""), (true, "Clean".to_string()));
    assert_eq!(
        summarize_porcelain_status("?? new.txt\n"),
        (false, "1 untracked".to_string())
    );
    assert_eq!(
        summarize_porcelain_status(" M a.rs\nMM b.rs\nA  c.rs\n?? d.rs\n?? e.rs\n"),
        (false, "4 modified, 2 untracked".to_string())
    );
}

#[test]
fn test_parse_left_right_count() {
    assert_eq!(parse_left_right_count("3\t5\n"), Some((3, 5)));
    assert_eq!(parse_left_right_count("0 0"), Some((0, 0)));
    assert_eq!(parse_left_right_count("x 1"), None);
    assert_eq!(parse_left_right_count("1"), None);
}

#[test]
fn test_parse_numstat_line() {
    assert_eq!(
        parse_numstat_line("12\t3\tsrc/lib.rs"),
        Some((Some(12), Some(3)))
    );
    assert_eq!(parse_numstat_line("-\t-\timage.png"), Some((None, None)));
    assert_eq!(parse_numstat_line(""), None);
}

#[test]
fn test_common_root_from_git_common_dir_normalizes() {
    let root = common_root_from_git_common_dir(Path::new("/nonexistent/repo/sub/../.git"))
        .expect("root");
    assert_eq!(root, PathBuf::from("/nonexistent/repo"));
    assert_eq!(common_root_from_git_common_dir(Path::new("")), None);
}

#[test]
fn test_repo_root_from_linked_worktree_is_main_checkout() {
    let temp = TempDir::new().expect("tempdir");
    let repo = init_test_repo(temp.path());
    let worktree = temp.path().join("linked");
    run_git_checked(
        &repo,
        &[
            "worktree",
            "add",
            "-b",
            "linked",
            worktree.to_string_lossy().as_ref(),
        ],
    );

    let root = repo_root_from(&worktree).expect("repo root");
    assert_eq!(
        root.canonicalize().expect("canonical root"),
        repo.canonicalize().expect("canonical repo")
    );
}

#[test]
fn test_repo_root_uses_current_directory() {
    let _cwd_guard = cwd_lock().lock().expect("lock cwd");
    let temp = TempDir::new().expect("tempdir");
    let repo = init_test_repo(temp.path());
    let nested = repo.join("src").join("deep");
    fs::create_dir_all(&nested).expect("mkdir nested");

    let _reset = CwdReset(env::current_dir().expect("cwd"));
    env::set_current_dir(&nested).expect("set cwd");
    let root = repo_root().expect("repo root");
    assert_eq!(
        root.canonicalize().expect("canonical root"),
        repo.canonicalize().expect("canonical repo")
    );
}

#[test]
fn test_manager_outside_repository_is_not_in_git_repo() {
    let temp = TempDir::new().expect("tempdir");
    let err = WorkspaceManager::with_home(temp.path(), temp.path()).expect_err("not a repo");
    assert!(matches!(err, WorkspaceError::NotInGitRepo));
    assert_eq!(err.kind(), "not_in_git_repo");
    assert!(err.hint().is_some());
}

#[test]
fn test_create_and_get_workspace_round_trip() {
    let fx = fixture();
    let created = fx
        .manager
        .create_workspace("feature/auth-api", None)
        .expect("create workspace");

    let expected = fx
        .home
        .join(".claude")
        .join("workspaces")
        .join("repo")
        .join("feature-auth-api");
    assert_eq!(
        created.path.canonicalize().expect("canonical created"),
        expected.canonicalize().expect("canonical expected")
    );
    assert_eq!(created.branch.as_deref(), Some("feature/auth-api"));
    assert_eq!(created.commit.len(), 8);
    assert!(created.is_managed());
    assert!(!created.is_main);

    let fetched = fx
        .manager
        .get_workspace("feature/auth-api")
        .expect("get workspace");
    assert_eq!(fetched.path, created.path);
    assert_eq!(fetched.commit, created.commit);

    let all = fx.manager.list_workspaces(false);
    assert_eq!(all.len(), 2);
    assert!(all[0].is_main);
    assert_eq!(all.iter().filter(|ws| ws.is_main).count(), 1);
    assert_eq!(fx.manager.list_workspaces(true).len(), 1);
}

#[test]
fn test_get_missing_workspace_is_not_found() {
    let fx = fixture();
    let err = fx.manager.get_workspace("nope").expect_err("missing");
    assert!(matches!(err, WorkspaceError::WorkspaceNotFound { ref branch } if branch == "nope"));
    assert_eq!(err.to_string(), "No workspace found for branch: nope");
}

#[test]
fn test_create_workspace_detects_collisions() {
    let fx = fixture();

    let err = fx
        .manager
        .create_workspace("main", None)
        .expect_err("main is checked out");
    match err {
        WorkspaceError::BranchInUse { branch, path } => {
            assert_eq!(branch, "main");
            assert_eq!(
                path.canonicalize().expect("canonical path"),
                fx.repo.canonicalize().expect("canonical repo")
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let occupied = fx.manager.managed_base().join("taken");
    fs::create_dir_all(&occupied).expect("mkdir occupied");
    let err = fx
        .manager
        .create_workspace("taken", None)
        .expect_err("path exists");
    assert!(matches!(err, WorkspaceError::WorkspaceExists { ref path } if *path == occupied));
}

#[test]
fn test_create_workspace_attaches_existing_branch() {
    let fx = fixture();
    run_git_checked(&fx.repo, &["branch", "existing"]);
    let head = run_git_checked(&fx.repo, &["rev-parse", "--short=8", "existing"]);

    let workspace = fx
        .manager
        .create_workspace("existing", Some("ignored-base"))
        .expect("attach existing branch");
    assert_eq!(workspace.branch.as_deref(), Some("existing"));
    assert_eq!(workspace.commit, head.trim());
}

#[test]
fn test_create_workspace_from_base() {
    let fx = fixture();
    let first = run_git_checked(&fx.repo, &["rev-parse", "--short=8", "HEAD"]);
    fs::write(fx.repo.join("later.txt"), "later\n").expect("write later");
    run_git_checked(&fx.repo, &["add", "later.txt"]);
    run_git_checked(&fx.repo, &["commit", "-m", "later"]);

    let workspace = fx
        .manager
        .create_workspace("from-first", Some(first.trim()))
        .expect("create from base");
    assert_eq!(workspace.commit, first.trim());
    assert!(!workspace.path.join("later.txt").exists());
}

#[test]
fn test_distinct_hyphen_runs_get_distinct_workspaces() {
    let fx = fixture();
    let single = fx.manager.create_workspace("fix-1", None).expect("create fix-1");
    let double = fx
        .manager
        .create_workspace("fix--1", None)
        .expect("create fix--1");
    assert_ne!(single.path, double.path);
    assert_eq!(
        double.path.file_name().map(|name| name.to_string_lossy().to_string()),
        Some("fix--1".to_string())
    );
}

#[test]
fn test_create_workspace_defaults_to_invoking_branch() {
    let fx = fixture();
    let feature = fx.repo.parent().expect("temp root").join("feature-checkout");
    run_git_checked(
        &fx.repo,
        &[
            "worktree",
            "add",
            "-b",
            "feature/base",
            feature.to_string_lossy().as_ref(),
        ],
    );
    fs::write(feature.join("feature.txt"), "feature\n").expect("write feature");
    run_git_checked(&feature, &["add", "feature.txt"]);
    run_git_checked(&feature, &["commit", "-m", "feature work"]);
    let feature_head = run_git_checked(&feature, &["rev-parse", "--short=8", "HEAD"]);
    let main_head = run_git_checked(&fx.repo, &["rev-parse", "--short=8", "HEAD"]);
    assert_ne!(feature_head, main_head);

    let manager = WorkspaceManager::with_home(&feature, &fx.home).expect("manager");
    let child = manager
        .create_workspace("child", None)
        .expect("create from feature checkout");
    assert_eq!(child.commit, feature_head.trim());
    assert!(child.path.join("feature.txt").is_file());
}

#[test]
fn test_remote_only_branch_attaches_and_tracks_origin() {
    let fx = fixture();
    let origin = fx.repo.parent().expect("temp root").join("origin.git");
    run_git_checked(
        &fx.repo,
        &[
            "clone",
            "--bare",
            fx.repo.to_string_lossy().as_ref(),
            origin.to_string_lossy().as_ref(),
        ],
    );
    run_git_checked(
        &fx.repo,
        &["remote", "add", "origin", origin.to_string_lossy().as_ref()],
    );
    run_git_checked(&fx.repo, &["push", "origin", "main:remote-only"]);
    run_git_checked(&fx.repo, &["fetch", "origin"]);

    assert!(branch_exists(&fx.repo, "remote-only"));
    assert!(!branch_exists(&fx.repo, "nowhere"));
    let local = run_capture(
        "git",
        &["show-ref", "--verify", "--quiet", "refs/heads/remote-only"],
        Some(&fx.repo),
    )
    .expect("run git show-ref");
    assert!(!local.status.success());

    let workspace = fx
        .manager
        .create_workspace("remote-only", None)
        .expect("attach remote branch");
    assert_eq!(workspace.branch.as_deref(), Some("remote-only"));

    let status = fx.manager.workspace_status(&workspace);
    assert_eq!(
        status.ahead_behind,
        Some(AheadBehind {
            ahead: 0,
            behind: 0
        })
    );

    fs::write(workspace.path.join("local.txt"), "local\n").expect("write local");
    run_git_checked(&workspace.path, &["add", "local.txt"]);
    run_git_checked(&workspace.path, &["commit", "-m", "local work"]);

    let status = fx.manager.workspace_status(&workspace);
    assert!(status.is_clean);
    assert_eq!(
        status.ahead_behind,
        Some(AheadBehind {
            ahead: 1,
            behind: 0
        })
    );
}

#[test]
fn test_create_workspace_bad_base_reports_git_error() {
    let fx = fixture();
    let err = fx
        .manager
        .create_workspace("broken", Some("no-such-revision"))
        .expect_err("bad base");
    match err {
        WorkspaceError::Workspace(message) => {
            assert!(message.starts_with("Failed to create worktree:"), "{message}")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_workspace_cleanliness_end_to_end() {
    let fx = fixture();
    let workspace = fx
        .manager
        .create_workspace("status-check", None)
        .expect("create workspace");
    assert_eq!(workspace.is_clean(), (true, "Clean".to_string()));

    fs::write(workspace.path.join("scratch.txt"), "tmp\n").expect("write scratch");
    assert_eq!(workspace.is_clean(), (false, "1 untracked".to_string()));

    fs::remove_file(workspace.path.join("scratch.txt")).expect("remove scratch");
    fs::write(workspace.path.join("README.md"), "changed\n").expect("modify README");
    assert_eq!(workspace.is_clean(), (false, "1 modified".to_string()));

    let status = fx.manager.workspace_status(&workspace);
    assert!(!status.is_clean);
    assert_eq!(status.status, "1 modified");
    assert_eq!(status.ahead_behind, None);
}

#[test]
fn test_delete_workspace_refuses_dirty_then_forces() {
    let fx = fixture();
    let workspace = fx
        .manager
        .create_workspace("dirty", None)
        .expect("create workspace");
    fs::write(workspace.path.join("untracked.txt"), "x\n").expect("write untracked");

    let err = fx
        .manager
        .delete_workspace("dirty", false)
        .expect_err("dirty delete");
    assert_eq!(
        err.to_string(),
        "Workspace has uncommitted changes (1 untracked). Use --force to remove anyway."
    );
    assert!(workspace.path.exists());

    fx.manager
        .delete_workspace("dirty", true)
        .expect("forced delete");
    assert!(!workspace.path.exists());
    assert!(!fx.manager.managed_base().exists());
    assert!(matches!(
        fx.manager.get_workspace("dirty"),
        Err(WorkspaceError::WorkspaceNotFound { .. })
    ));
}

#[test]
fn test_delete_keeps_parent_with_other_workspaces() {
    let fx = fixture();
    fx.manager.create_workspace("one", None).expect("create one");
    fx.manager.create_workspace("two", None).expect("create two");

    fx.manager.delete_workspace("one", false).expect("delete one");
    assert!(fx.manager.managed_base().exists());
    assert!(fx.manager.get_workspace("two").is_ok());
}

#[test]
fn test_clean_workspaces_removes_only_clean() {
    let fx = fixture();
    fx.manager.create_workspace("clean-one", None).expect("create clean");
    let dirty = fx
        .manager
        .create_workspace("dirty-one", None)
        .expect("create dirty");
    fs::write(dirty.path.join("wip.txt"), "wip\n").expect("write wip");

    let removed = fx.manager.clean_workspaces(true);
    assert_eq!(removed, vec!["clean-one".to_string()]);
    assert!(fx.manager.get_workspace("dirty-one").is_ok());
    assert!(fx.manager.get_workspace("clean-one").is_err());
    assert!(fx.manager.get_workspace("main").is_ok());
}

#[test]
fn test_clean_workspaces_without_check_forces_all_managed() {
    let fx = fixture();
    let dirty = fx
        .manager
        .create_workspace("dirty-two", None)
        .expect("create dirty");
    fs::write(dirty.path.join("wip.txt"), "wip\n").expect("write wip");

    let removed = fx.manager.clean_workspaces(false);
    assert_eq!(removed, vec!["dirty-two".to_string()]);
    assert_eq!(fx.manager.list_workspaces(false).len(), 1);
}

#[test]
fn test_workspace_diff_against_main() {
    let fx = fixture();
    let workspace = fx
        .manager
        .create_workspace("diffing", None)
        .expect("create workspace");
    fs::write(workspace.path.join("feature.txt"), "feature\n").expect("write feature");
    run_git_checked(&workspace.path, &["add", "feature.txt"]);
    run_git_checked(&workspace.path, &["commit", "-m", "feature"]);

    let diff = fx
        .manager
        .workspace_diff(&workspace, "main")
        .expect("diff");
    assert!(diff.contains("feature.txt"), "{diff}");
    assert!(diff.contains("+feature"), "{diff}");

    let err = fx
        .manager
        .workspace_diff(&workspace, "no-such-target")
        .expect_err("bad target");
    assert!(err.to_string().starts_with("Failed to get diff:"));
}

#[test]
fn test_copy_context_is_idempotent() {
    let fx = fixture();
    fs::create_dir_all(fx.repo.join(".claude")).expect("mkdir .claude");
    fs::write(fx.repo.join(".claude/settings.local.json"), "{}\n").expect("write settings");
    fs::write(fx.repo.join("CLAUDE.md"), "# local\n").expect("write CLAUDE.md");

    let workspace = fx
        .manager
        .create_workspace("with-context", None)
        .expect("create workspace");

    let first = copy_context(&workspace, &fx.repo).expect("first copy");
    assert_eq!(
        first,
        vec![
            ".claude/settings.local.json".to_string(),
            "CLAUDE.md".to_string()
        ]
    );
    assert_eq!(
        fs::read_to_string(workspace.path.join("CLAUDE.md")).expect("read copy"),
        "# local\n"
    );

    fs::write(workspace.path.join("CLAUDE.md"), "# edited\n").expect("edit copy");
    let second = copy_context(&workspace, &fx.repo).expect("second copy");
    assert!(second.is_empty());
    assert_eq!(
        fs::read_to_string(workspace.path.join("CLAUDE.md")).expect("read copy"),
        "# edited\n"
    );
}

#[test]
fn test_copy_context_skips_missing_sources() {
    let fx = fixture();
    let workspace = fx
        .manager
        .create_workspace("no-context", None)
        .expect("create workspace");
    let copied = copy_context(&workspace, &fx.repo).expect("copy");
    assert!(copied.is_empty());
}

#[test]
fn test_merge_settings() {
    let base = json!({
        "model": "sonnet",
        "permissions": {"allow": ["Bash(ls)", "Read"], "deny": ["Bash(rm)"]},
        "hooks": {"Stop": [{"command": "a"}]},
        "mixed": {"nested": true}
    });
    let overlay = json!({
        "model": "opus",
        "permissions": {"allow": ["Read", "Write"]},
        "hooks": {"Stop": [{"command": "b"}]},
        "mixed": "scalar",
        "new": 1
    });

    let merged = merge_settings(&base, &overlay);
    assert_eq!(
        merged,
        json!({
            "model": "opus",
            "permissions": {"allow": ["Bash(ls)", "Read", "Write"], "deny": ["Bash(rm)"]},
            "hooks": {"Stop": [{"command": "a"}, {"command": "b"}]},
            "mixed": "scalar",
            "new": 1
        })
    );
}

#[test]
fn test_configure_mcp_only_adds_missing_servers() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join(".mcp.json");
    let servers = default_mcp_servers();

    assert_eq!(
        configure_mcp(&path, &servers).expect("create"),
        FileStatus::Created
    );
    assert_eq!(
        configure_mcp(&path, &servers).expect("rerun"),
        FileStatus::Skipped
    );

    fs::write(
        &path,
        r#"{"mcpServers": {"context7": {"type": "stdio", "command": "ctx"}, "mine": {"url": "x"}}}"#,
    )
    .expect("write custom");
    assert_eq!(
        configure_mcp(&path, &servers).expect("merge"),
        FileStatus::Merged
    );
    let config: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("parse");
    assert_eq!(config["mcpServers"]["context7"]["type"], "stdio");
    assert_eq!(config["mcpServers"]["mine"]["url"], "x");
    assert_eq!(config["mcpServers"]["linear"]["type"], "sse");
}

#[test]
fn test_install_settings_statuses() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join(".claude").join("settings.json");
    let template = r#"{"permissions": {"allow": ["Read"]}}"#;

    assert_eq!(
        install_settings(&path, template, false).expect("create"),
        FileStatus::Created
    );
    fs::write(&path, r#"{"permissions": {"allow": ["Bash(ls)"]}, "model": "opus"}"#)
        .expect("write existing");
    assert_eq!(
        install_settings(&path, template, false).expect("merge"),
        FileStatus::Merged
    );
    let merged: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("parse");
    assert_eq!(merged["permissions"]["allow"], json!(["Bash(ls)", "Read"]));
    assert_eq!(merged["model"], "opus");

    assert_eq!(
        install_settings(&path, template, true).expect("overwrite"),
        FileStatus::Overwritten
    );
    let overwritten: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("parse");
    assert_eq!(overwritten, json!({"permissions": {"allow": ["Read"]}}));
}

#[test]
fn test_install_project_templates_twice() {
    let temp = TempDir::new().expect("tempdir");
    let target = InitTarget::project(temp.path());
    let options = InitOptions {
        force: false,
        index: false,
    };
    let config = Config::default();

    let first = install(&target, options, &config, OutputMode::Json).expect("first install");
    assert_eq!(first.installed.len(), 7, "{first:?}");
    assert!(first.installed.contains(&".claude/agents/code-reviewer.md".to_string()));
    assert!(first.installed.contains(&".claude/skills/workspace".to_string()));
    assert!(temp.path().join(".claude/skills/commit/SKILL.md").is_file());
    assert!(temp.path().join(".mcp.json").is_file());
    assert_eq!(
        first.summary(),
        "Initialized Claude Code configuration (7 installed)"
    );

    let second = install(&target, options, &config, OutputMode::Json).expect("second install");
    assert!(second.installed.is_empty());
    assert_eq!(second.merged, vec![".claude/settings.json".to_string()]);
    assert_eq!(second.skipped.len(), 6);
    assert_eq!(
        second.summary(),
        "Initialized Claude Code configuration (1 merged, 6 skipped)"
    );

    let forced = install(
        &target,
        InitOptions {
            force: true,
            index: false,
        },
        &config,
        OutputMode::Json,
    )
    .expect("forced install");
    assert_eq!(forced.overwritten.len(), 6);
    assert_eq!(forced.skipped, vec![".mcp.json".to_string()]);
}

#[test]
fn test_install_global_uses_claude_dir_directly() {
    let temp = TempDir::new().expect("tempdir");
    let target = InitTarget::global(temp.path());
    let report = install(
        &target,
        InitOptions::default(),
        &Config::default(),
        OutputMode::Json,
    )
    .expect("global install");
    assert!(report.installed.contains(&"agents/researcher.md".to_string()));
    assert!(temp.path().join(".claude/CLAUDE.md").is_file());
    assert!(temp.path().join(".claude/settings.json").is_file());
    assert!(!temp.path().join(".claude/.claude").exists());
}

#[test]
fn test_init_report_detailed_listing() {
    let mut report = InitReport::default();
    report.track("CLAUDE.md".to_string(), FileStatus::Created);
    report.track(".claude/settings.json".to_string(), FileStatus::Merged);
    report.indexed = true;
    let detailed = report.detailed();
    assert!(detailed.starts_with("Initialized Claude Code configuration"));
    assert!(detailed.contains("  Installed 1 file(s):\n    • CLAUDE.md"));
    assert!(detailed.contains("  Merged 1 file(s):\n    • .claude/settings.json"));
    assert!(detailed.ends_with("Repository indexed with Claude CLI"));
    assert_eq!(InitReport::default().summary(), "Initialized Claude Code configuration (nothing to do)");
}

#[test]
fn test_splice_repository_index() {
    let content = "# Title\n<!-- REPOSITORY_INDEX_START -->\nold\n<!-- REPOSITORY_INDEX_END -->\nrest\n";
    let updated = splice_repository_index(content, "### Overview\nnew\n").expect("markers");
    assert_eq!(
        updated,
        "# Title\n<!-- REPOSITORY_INDEX_START -->\n### Overview\nnew\n<!-- REPOSITORY_INDEX_END -->\nrest\n"
    );
    assert_eq!(splice_repository_index("no markers", "x"), None);
}

#[test]
fn test_cli_parses_workspace_commands() {
    let cli = Cli::try_parse_from([
        "claudectl",
        "workspace",
        "create",
        "feat/x",
        "--base",
        "develop",
    ])
    .expect("parse create");
    match cli.command {
        Commands::Workspace(WorkspaceCommand::Create { branch, base }) => {
            assert_eq!(branch, "feat/x");
            assert_eq!(base.as_deref(), Some("develop"));
        }
        other => panic!("unexpected command: {other:?}"),
    }

    let cli = Cli::try_parse_from(["claudectl", "workspace", "list", "--json"]).expect("parse list");
    assert!(cli.json);
    assert!(matches!(
        cli.command,
        Commands::Workspace(WorkspaceCommand::List)
    ));

    let cli = Cli::try_parse_from(["claudectl", "-j", "workspace", "diff", "b", "-t", "develop"])
        .expect("parse diff");
    assert!(cli.json);
    match cli.command {
        Commands::Workspace(WorkspaceCommand::Diff { branch, target }) => {
            assert_eq!(branch, "b");
            assert_eq!(target.as_deref(), Some("develop"));
        }
        other => panic!("unexpected command: {other:?}"),
    }

    let cli = Cli::try_parse_from(["claudectl", "workspace", "delete", "b", "-f"])
        .expect("parse delete");
    assert!(matches!(
        cli.command,
        Commands::Workspace(WorkspaceCommand::Delete { force: true, .. })
    ));
}

#[test]
fn test_cli_parses_init_and_hooks() {
    let cli = Cli::try_parse_from(["claudectl", "init", "-g", "-f", "--no-index", "-v"])
        .expect("parse init");
    assert!(cli.verbose);
    match cli.command {
        Commands::Init(args) => {
            assert!(args.global && args.force && args.no_index);
        }
        other => panic!("unexpected command: {other:?}"),
    }

    let cli = Cli::try_parse_from(["claudectl", "hook", "notify-input", "hello"])
        .expect("parse hook");
    match cli.command {
        Commands::Hook(HookCommand::NotifyInput { message }) => {
            assert_eq!(message.as_deref(), Some("hello"));
        }
        other => panic!("unexpected command: {other:?}"),
    }

    assert!(Cli::try_parse_from(["claudectl", "hook", "context-info"]).is_ok());
    assert!(Cli::try_parse_from(["claudectl", "workspace", "create"]).is_err());
}

#[test]
fn test_parse_hook_input() {
    let input = parse_hook_input(
        r#"{"session_id": "s1", "tool_input": {"file_path": "/tmp/a.rs", "old_string": "x"}, "extra": 1}"#,
    )
    .expect("valid input");
    assert_eq!(input.session_id.as_deref(), Some("s1"));
    assert_eq!(input.file_path(), Some("/tmp/a.rs"));

    assert!(parse_hook_input("not json").is_none());
    assert!(parse_hook_input("   ").is_none());
    let empty = parse_hook_input("{}").expect("empty object");
    assert_eq!(empty.file_path(), None);
    assert_eq!(empty.message(), None);
}

#[test]
fn test_input_message_priority() {
    let with_message = parse_hook_input(r#"{"message": "Pick a file"}"#);
    assert_eq!(input_message(with_message.as_ref(), Some("arg")), "Pick a file");

    let permission = parse_hook_input(r#"{"notification_type": "permission_prompt"}"#);
    assert_eq!(input_message(permission.as_ref(), Some("arg")), "Permission required");

    assert_eq!(input_message(None, Some("arg")), "arg");
    assert_eq!(
        input_message(None, None),
        "Claude needs your input to continue"
    );
}

#[test]
fn test_edit_commit_message_sizes() {
    assert_eq!(
        edit_commit_message("a.rs", 3),
        "Update a.rs: minor changes (3 lines)"
    );
    assert_eq!(
        edit_commit_message("a.rs", 10),
        "Update a.rs: moderate changes (10 lines)"
    );
    assert_eq!(
        edit_commit_message("a.rs", 50),
        "Update a.rs: major changes (50 lines)"
    );
}

#[test]
fn test_auto_commit_on_feature_branch() {
    let temp = TempDir::new().expect("tempdir");
    let repo = init_test_repo(temp.path());
    let worktree = temp.path().join("feature");
    run_git_checked(
        &repo,
        &[
            "worktree",
            "add",
            "-b",
            "feature/auto",
            worktree.to_string_lossy().as_ref(),
        ],
    );

    let readme = worktree.join("README.md");
    fs::write(&readme, "hello\none\ntwo\nthree\n").expect("edit README");
    fs::write(worktree.join("other.txt"), "untouched\n").expect("write other");
    assert!(auto_commit(&readme, AutoCommit::Edit).expect("commit edit"));
    assert_eq!(
        last_commit_subject(&worktree),
        "Update README.md: minor changes (3 lines)"
    );
    let status = run_git_checked(&worktree, &["status", "--porcelain"]);
    assert_eq!(status.trim(), "?? other.txt");

    assert!(!auto_commit(&readme, AutoCommit::Edit).expect("nothing to commit"));

    let new_file = worktree.join("src").join("new.rs");
    fs::create_dir_all(new_file.parent().expect("parent")).expect("mkdir src");
    fs::write(&new_file, "fn main() {}\n").expect("write new file");
    assert!(auto_commit(&new_file, AutoCommit::NewFile).expect("commit new file"));
    assert_eq!(last_commit_subject(&worktree), "Add new file: new.rs");
}

#[test]
fn test_auto_commit_skips_main_branch() {
    let temp = TempDir::new().expect("tempdir");
    let repo = init_test_repo(temp.path());
    let readme = repo.join("README.md");
    fs::write(&readme, "changed on main\n").expect("edit README");

    assert!(!auto_commit(&readme, AutoCommit::Edit).expect("skip main"));
    assert_eq!(last_commit_subject(&repo), "init");

    let outside = temp.path().join("loose.txt");
    fs::write(&outside, "x\n").expect("write loose");
    assert!(!auto_commit(&outside, AutoCommit::NewFile).expect("outside repo"));
}

#[test]
fn test_last_assistant_text_and_notification_line() {
    let temp = TempDir::new().expect("tempdir");
    let transcript = temp.path().join("session.jsonl");
    let lines = [
        r#"{"type":"user","message":{"content":[{"type":"text","text":"hi"}]}}"#,
        r#"{"type":"assistant","message":{"content":[{"type":"text","text":"first"}]}}"#,
        "not json at all",
        "",
        r###"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"Edit"},{"type":"text","text":"## **Done**: fixed `parse` in *two* places\nmore detail"}]}}"###,
        r#"{"type":"user","message":{"content":["thanks"]}}"#,
    ];
    fs::write(&transcript, lines.join("\n")).expect("write transcript");

    let text = last_assistant_text(&transcript)
        .expect("read transcript")
        .expect("assistant text");
    assert!(text.starts_with("## **Done**"));
    assert_eq!(
        notification_line(&text, 200).as_deref(),
        Some("Done: fixed parse in two places")
    );

    let long = "x".repeat(250);
    let truncated = notification_line(&long, 200).expect("line");
    assert_eq!(truncated.chars().count(), 200);
    assert!(truncated.ends_with("..."));
    assert_eq!(notification_line("   \n", 200), None);
}

#[test]
fn test_notification_backends_arguments() {
    let notification =
        Notification::for_project("❌", "proj", "said \"no\"").with_sound("Basso");
    assert_eq!(notification.title, "❌ Claude Code");

    let args = terminal_notifier_args(&notification);
    assert_eq!(
        args,
        vec![
            "-title",
            "❌ Claude Code",
            "-subtitle",
            "proj",
            "-message",
            "said \"no\"",
            "-sender",
            "com.anthropic.claudefordesktop",
            "-sound",
            "Basso",
            "-group",
            "claude-code-proj",
        ]
    );

    assert_eq!(
        osascript_source(&notification),
        "display notification \"said \\\"no\\\"\" with title \"❌ Claude Code\" subtitle \"proj\" sound name \"Basso\""
    );
}

#[test]
fn test_branch_status_summary() {
    assert_eq!(branch_status_summary(""), "clean");
    assert_eq!(
        branch_status_summary("M  a\n M b\nMM c\n?? d\n"),
        "2 staged, 2 modified, 1 untracked"
    );
}

#[test]
fn test_parse_pr_view() {
    let open = r#"{
        "number": 42,
        "title": "Add workspaces",
        "state": "OPEN",
        "url": "https://example.com/pr/42",
        "reviewDecision": "CHANGES_REQUESTED",
        "statusCheckRollup": [
            {"status": "COMPLETED", "conclusion": "SUCCESS"},
            {"status": "COMPLETED", "conclusion": "FAILURE"},
            {"status": "IN_PROGRESS", "conclusion": ""}
        ]
    }"#;
    let pr = parse_pr_view(open).expect("open pr");
    assert_eq!(pr.number, 42);
    assert_eq!(
        pr.render(),
        "PR #42: Add workspaces (changes requested, checks: 1 failing)"
    );

    let pending = r#"{"number": 7, "title": "WIP", "state": "OPEN", "reviewDecision": "",
        "statusCheckRollup": [{"status": "IN_PROGRESS", "conclusion": ""}, {"conclusion": "SUCCESS"}]}"#;
    assert_eq!(
        parse_pr_view(pending).expect("pending").render(),
        "PR #7: WIP (checks: 1 pending)"
    );

    let merged = r#"{"number": 1, "title": "Old", "state": "MERGED"}"#;
    assert_eq!(parse_pr_view(merged), None);
    assert_eq!(parse_pr_view("garbage"), None);
}

#[test]
fn test_directory_snapshot() {
    let temp = TempDir::new().expect("tempdir");
    let dir = temp.path();
    fs::write(dir.join("main.rs"), "").expect("write main.rs");
    fs::write(dir.join("Cargo.toml"), "").expect("write Cargo.toml");
    fs::write(dir.join("notes.txt"), "").expect("write notes");
    fs::create_dir_all(dir.join("src")).expect("mkdir src");
    fs::create_dir_all(dir.join(".hidden")).expect("mkdir hidden");

    assert_eq!(
        directory_snapshot(dir, 15),
        vec!["Cargo.toml", "main.rs", "src/"]
    );

    for index in 0..20 {
        fs::write(dir.join(format!("m{index:02}.py")), "").expect("write py");
    }
    let snapshot = directory_snapshot(dir, 15);
    assert_eq!(snapshot.len(), 15);
    assert!(snapshot.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(!snapshot.contains(&"src/".to_string()));
}

#[test]
fn test_render_context_info_lists_workspaces() {
    let fx = fixture();
    let workspace = fx
        .manager
        .create_workspace("feature/ctx", None)
        .expect("create workspace");
    fs::write(workspace.path.join("wip.txt"), "wip\n").expect("write wip");
    let config = Config {
        pr_timeout_secs: 1,
        ..Config::default()
    };

    let from_repo = render_context_info(&fx.repo, Some(&fx.home), &config);
    let lines: Vec<&str> = from_repo.lines().collect();
    assert_eq!(lines.first(), Some(&"<context-refresh>"));
    assert_eq!(lines.last(), Some(&"</context-refresh>"));
    assert!(lines.contains(&"Branch: main (clean)"), "{from_repo}");
    assert!(lines.contains(&"Git Branches:"), "{from_repo}");
    assert!(lines.contains(&"  main: clean"), "{from_repo}");
    assert!(lines.contains(&"  feature/ctx: dirty"), "{from_repo}");
    assert!(lines.contains(&"Workspaces:"), "{from_repo}");
    assert!(lines.contains(&"  feature/ctx (1 untracked)"), "{from_repo}");
    assert!(!from_repo.contains("Current Workspace"), "{from_repo}");

    let from_workspace = render_context_info(&workspace.path, Some(&fx.home), &config);
    assert!(
        from_workspace.contains("Current Workspace: feature/ctx (1 untracked)"),
        "{from_workspace}"
    );
    assert!(
        from_workspace.contains("Branch: feature/ctx (1 untracked)"),
        "{from_workspace}"
    );
}

#[test]
fn test_config_from_toml() {
    let config = Config::from_toml(
        "claude_bin = \"   \"\ndiff_target = \"develop\"\npr_timeout_secs = 2\n",
    )
    .expect("parse config");
    assert_eq!(config.claude_bin, "claude");
    assert_eq!(config.diff_target, "develop");
    assert_eq!(config.pr_timeout_secs, 2);
    assert_eq!(config.index_timeout_secs, 90);
    assert_eq!(Config::from_toml("").expect("empty"), Config::default());

    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("config.toml");
    fs::write(&path, "claude_bin = [").expect("write bad config");
    let err = Config::load_from(&path).expect_err("invalid toml");
    assert!(format!("{err:#}").contains("failed to parse config file"));
}

#[test]
fn test_command_result_json_shape() {
    let result = CommandResult::ok("Deleted workspace for branch: x").with("branch", "x");
    assert_eq!(
        serde_json::to_string(&result.to_json()).expect("serialize"),
        r#"{"success":true,"message":"Deleted workspace for branch: x","branch":"x"}"#
    );

    let data = CommandResult::data().with("diff", "");
    assert_eq!(data.to_json(), json!({"success": true, "diff": ""}));
    assert_eq!(
        CommandResult::failure("nope").to_json(),
        json!({"success": false, "message": "nope"})
    );
}

#[test]
fn test_format_table_aligns_columns() {
    let table = format_table(
        &["Branch", "Status"],
        &[
            vec!["feature/long-name".to_string(), "Clean".to_string()],
            vec!["x".to_string(), "1 modified".to_string()],
        ],
    );
    assert_eq!(
        table,
        "Branch             Status\n-----------------  ----------\nfeature/long-name  Clean\nx                  1 modified\n"
    );
}

#[test]
fn test_workspace_error_messages_and_kinds() {
    let exists = WorkspaceError::WorkspaceExists {
        path: PathBuf::from("/w/x"),
    };
    assert_eq!(exists.to_string(), "Workspace already exists: /w/x");
    assert_eq!(exists.kind(), "workspace_exists");

    let in_use = WorkspaceError::BranchInUse {
        branch: "main".to_string(),
        path: PathBuf::from("/repo"),
    };
    assert_eq!(
        in_use.to_string(),
        "Branch 'main' is already checked out at: /repo"
    );
    assert_eq!(in_use.kind(), "branch_in_use");
    assert_eq!(
        WorkspaceError::Workspace("boom".to_string()).kind(),
        "workspace_error"
    );
}

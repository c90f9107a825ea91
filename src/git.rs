use crate::constants::{ORIGIN_REMOTE, SHORT_COMMIT_LEN, STATUS_CLEAN};
use crate::error::{WorkspaceError, WorkspaceResult};
use crate::process::{best_error_line, path_to_str, run_capture, stderr_text};
use anyhow::{Context, Result, bail};
use std::env;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Repository root for the current directory.
pub(crate) fn repo_root() -> WorkspaceResult<PathBuf> {
    let cwd = env::current_dir().map_err(|_| WorkspaceError::NotInGitRepo)?;
    repo_root_from(&cwd)
}

/// Repository root as seen from `dir`.
///
/// Resolved through the shared git directory, so a linked worktree reports the
/// main checkout rather than itself.
pub(crate) fn repo_root_from(dir: &Path) -> WorkspaceResult<PathBuf> {
    let output = run_capture(
        "git",
        &["rev-parse", "--path-format=absolute", "--git-common-dir"],
        Some(dir),
    )
    .map_err(|err| {
        debug!("git rev-parse failed to start: {err:#}");
        WorkspaceError::NotInGitRepo
    })?;
    if !output.status.success() {
        debug!(
            dir = %dir.display(),
            "not a git repository: {}",
            best_error_line(&output.stderr)
        );
        return Err(WorkspaceError::NotInGitRepo);
    }
    let common_dir = PathBuf::from(output.stdout.trim());
    common_root_from_git_common_dir(&common_dir).ok_or(WorkspaceError::NotInGitRepo)
}

pub(crate) fn common_root_from_git_common_dir(common_dir: &Path) -> Option<PathBuf> {
    if common_dir.as_os_str().is_empty() {
        return None;
    }
    let normalized = common_dir
        .canonicalize()
        .unwrap_or_else(|_| normalize_lexically(common_dir));
    normalized.parent().map(Path::to_path_buf)
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

pub(crate) fn repo_name(repo_root: &Path) -> String {
    repo_root
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Branch checked out in `dir`, or `None` when HEAD is detached.
pub(crate) fn current_branch(dir: &Path) -> Option<String> {
    let output = run_capture("git", &["symbolic-ref", "--quiet", "--short", "HEAD"], Some(dir)).ok()?;
    if !output.status.success() {
        return None;
    }
    let branch = output.stdout.trim();
    if branch.is_empty() {
        return None;
    }
    Some(branch.to_string())
}

/// Top level of the worktree that contains `dir` (not the shared repo root).
pub(crate) fn worktree_toplevel(dir: &Path) -> Option<PathBuf> {
    let output = run_capture(
        "git",
        &["rev-parse", "--path-format=absolute", "--show-toplevel"],
        Some(dir),
    )
    .ok()?;
    if !output.status.success() {
        return None;
    }
    let path = output.stdout.trim();
    if path.is_empty() {
        return None;
    }
    Some(PathBuf::from(path))
}

fn ref_exists(repo_root: &Path, reference: &str) -> bool {
    run_capture(
        "git",
        &["show-ref", "--verify", "--quiet", reference],
        Some(repo_root),
    )
    .map(|output| output.status.success())
    .unwrap_or(false)
}

pub(crate) fn has_remote(repo_root: &Path, remote: &str) -> bool {
    run_capture("git", &["remote"], Some(repo_root))
        .map(|output| {
            output.status.success() && output.stdout.lines().any(|line| line.trim() == remote)
        })
        .unwrap_or(false)
}

/// True when `branch` exists locally or as a remote-tracking branch of `origin`.
pub(crate) fn branch_exists(repo_root: &Path, branch: &str) -> bool {
    if ref_exists(repo_root, &format!("refs/heads/{branch}")) {
        return true;
    }
    has_remote(repo_root, ORIGIN_REMOTE)
        && ref_exists(
            repo_root,
            &format!("refs/remotes/{ORIGIN_REMOTE}/{branch}"),
        )
}

pub(crate) fn local_branches(dir: &Path) -> Vec<String> {
    let output = match run_capture(
        "git",
        &["for-each-ref", "--format=%(refname:short)", "refs/heads"],
        Some(dir),
    ) {
        Ok(output) if output.status.success() => output,
        _ => return Vec::new(),
    };
    output
        .stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn status_porcelain(worktree_path: &Path) -> Result<String> {
    let output = run_capture(
        "git",
        &["status", "--porcelain", "--untracked-files=all"],
        Some(worktree_path),
    )?;
    if !output.status.success() {
        bail!("{}", best_error_line(&output.stderr));
    }
    Ok(output.stdout)
}

/// Cleanliness of the worktree at `worktree_path` as `(is_clean, status)`.
pub(crate) fn is_worktree_clean(worktree_path: &Path) -> (bool, String) {
    match status_porcelain(worktree_path) {
        Ok(raw) => summarize_porcelain_status(&raw),
        Err(err) => (false, format!("Failed to check status: {err:#}")),
    }
}

/// Staged and unstaged entries both count as modified, so a file changed in
/// the index and again in the tree counts twice.
pub(crate) fn summarize_porcelain_status(raw: &str) -> (bool, String) {
    let mut modified = 0usize;
    let mut untracked = 0usize;
    for line in raw.lines() {
        let bytes = line.as_bytes();
        if bytes.len() < 2 {
            continue;
        }
        if &bytes[..2] == b"??" {
            untracked += 1;
            continue;
        }
        if &bytes[..2] == b"!!" {
            continue;
        }
        modified += usize::from(bytes[0] != b' ') + usize::from(bytes[1] != b' ');
    }

    let mut parts = Vec::new();
    if modified > 0 {
        parts.push(format!("{modified} modified"));
    }
    if untracked > 0 {
        parts.push(format!("{untracked} untracked"));
    }
    if parts.is_empty() {
        (true, STATUS_CLEAN.to_string())
    } else {
        (false, parts.join(", "))
    }
}

pub(crate) fn list_worktrees_porcelain(repo_root: &Path) -> Result<String> {
    let output = run_capture("git", &["worktree", "list", "--porcelain"], Some(repo_root))
        .context("failed to list git worktrees")?;
    if !output.status.success() {
        bail!(
            "failed to list git worktrees: {}",
            best_error_line(&output.stderr)
        );
    }
    Ok(output.stdout)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GitWorktreeEntry {
    pub(crate) path: PathBuf,
    pub(crate) commit: String,
    pub(crate) branch: Option<String>,
}

#[derive(Default)]
struct PendingEntry {
    path: Option<PathBuf>,
    commit: Option<String>,
    branch: Option<String>,
    seen_any: bool,
}

impl PendingEntry {
    fn flush_into(&mut self, entries: &mut Vec<GitWorktreeEntry>) {
        let pending = std::mem::take(self);
        if !pending.seen_any {
            return;
        }
        entries.push(GitWorktreeEntry {
            path: pending.path.unwrap_or_default(),
            commit: pending.commit.unwrap_or_default(),
            branch: pending.branch,
        });
    }
}

/// Parses `git worktree list --porcelain` into entries, preserving git's order.
pub(crate) fn parse_git_worktree_porcelain(raw: &str) -> Vec<GitWorktreeEntry> {
    let mut entries = Vec::new();
    let mut current = PendingEntry::default();

    for line in raw.lines() {
        if line.is_empty() {
            current.flush_into(&mut entries);
            continue;
        }
        current.seen_any = true;

        if let Some(value) = line.strip_prefix("worktree ") {
            current.path = Some(PathBuf::from(value));
        } else if let Some(value) = line.strip_prefix("HEAD ") {
            current.commit = Some(value.trim().chars().take(SHORT_COMMIT_LEN).collect());
        } else if let Some(value) = line.strip_prefix("branch ") {
            let reference = value.trim();
            let branch = reference.strip_prefix("refs/heads/").unwrap_or(reference);
            current.branch = Some(branch.to_string());
        }
    }

    current.flush_into(&mut entries);
    entries
}

/// Adds a worktree at `path`.
///
/// With `new_branch_base` set, `branch` is created from that revision;
/// otherwise the existing `branch` is checked out.
pub(crate) fn add_worktree(
    repo_root: &Path,
    path: &Path,
    branch: &str,
    new_branch_base: Option<&str>,
) -> WorkspaceResult<()> {
    let path_str = path_to_str(path).map_err(|err| WorkspaceError::Workspace(err.to_string()))?;
    let args: Vec<&str> = match new_branch_base {
        Some(base) => vec!["worktree", "add", "-b", branch, path_str, base],
        None => vec!["worktree", "add", path_str, branch],
    };
    let output = run_capture("git", &args, Some(repo_root))
        .map_err(|err| WorkspaceError::Workspace(format!("Failed to create worktree: {err:#}")))?;
    if !output.status.success() {
        return Err(WorkspaceError::Workspace(format!(
            "Failed to create worktree: {}",
            stderr_text(&output.stderr)
        )));
    }
    Ok(())
}

pub(crate) fn remove_worktree(repo_root: &Path, path: &Path, force: bool) -> WorkspaceResult<()> {
    let path_str = path_to_str(path).map_err(|err| WorkspaceError::Workspace(err.to_string()))?;
    let mut args = vec!["worktree", "remove"];
    if force {
        args.push("--force");
    }
    args.push(path_str);
    let output = run_capture("git", &args, Some(repo_root))
        .map_err(|err| WorkspaceError::Workspace(format!("Failed to remove worktree: {err:#}")))?;
    if !output.status.success() {
        return Err(WorkspaceError::Workspace(format!(
            "Failed to remove worktree: {}",
            stderr_text(&output.stderr)
        )));
    }
    Ok(())
}

/// Commits on `HEAD` vs `origin/<branch>` as `(ahead, behind)`.
pub(crate) fn ahead_behind(worktree_path: &Path, branch: &str) -> Option<(usize, usize)> {
    let range = format!("{ORIGIN_REMOTE}/{branch}...HEAD");
    let output = run_capture(
        "git",
        &["rev-list", "--left-right", "--count", &range],
        Some(worktree_path),
    )
    .ok()?;
    if !output.status.success() {
        debug!(branch, "no ahead/behind data: {}", best_error_line(&output.stderr));
        return None;
    }
    let (behind, ahead) = parse_left_right_count(&output.stdout)?;
    Some((ahead, behind))
}

/// Parses `rev-list --left-right --count` output into `(left, right)`.
pub(crate) fn parse_left_right_count(raw: &str) -> Option<(usize, usize)> {
    let mut parts = raw.split_whitespace();
    let left = parts.next()?.parse().ok()?;
    let right = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((left, right))
}

pub(crate) fn diff_against(worktree_path: &Path, target: &str) -> WorkspaceResult<String> {
    let range = format!("{target}...HEAD");
    let output = run_capture("git", &["diff", &range], Some(worktree_path))
        .map_err(|err| WorkspaceError::Workspace(format!("Failed to get diff: {err:#}")))?;
    if !output.status.success() {
        return Err(WorkspaceError::Workspace(format!(
            "Failed to get diff: {}",
            stderr_text(&output.stderr)
        )));
    }
    Ok(output.stdout)
}

pub(crate) fn stage_path(worktree: &Path, rel_path: &str) -> Result<()> {
    let output = run_capture("git", &["add", "--", rel_path], Some(worktree))?;
    if !output.status.success() {
        bail!("git add failed: {}", best_error_line(&output.stderr));
    }
    Ok(())
}

/// Staged line counts for `rel_path` as `(added, deleted)`.
///
/// `Ok(None)` means nothing is staged for the path; `Some((None, None))` is a
/// binary change.
pub(crate) fn staged_numstat(
    worktree: &Path,
    rel_path: &str,
) -> Result<Option<(Option<usize>, Option<usize>)>> {
    let output = run_capture(
        "git",
        &["diff", "--cached", "--numstat", "--", rel_path],
        Some(worktree),
    )?;
    if !output.status.success() {
        bail!("git diff --cached failed: {}", best_error_line(&output.stderr));
    }
    Ok(output.stdout.lines().find_map(parse_numstat_line))
}

pub(crate) fn parse_numstat_line(line: &str) -> Option<(Option<usize>, Option<usize>)> {
    let mut fields = line.split('\t');
    let added = fields.next()?.trim();
    let deleted = fields.next()?.trim();
    fields.next()?;
    Some((added.parse().ok(), deleted.parse().ok()))
}

/// Commits only `rel_path`, leaving anything else in the index untouched.
pub(crate) fn commit_path(worktree: &Path, rel_path: &str, message: &str) -> Result<()> {
    let output = run_capture(
        "git",
        &["commit", "--quiet", "-m", message, "--", rel_path],
        Some(worktree),
    )?;
    if !output.status.success() {
        bail!("git commit failed: {}", best_error_line(&output.stderr));
    }
    Ok(())
}

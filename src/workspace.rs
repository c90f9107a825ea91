use crate::constants::{CLAUDE_DIR, WORKSPACES_DIR};
use crate::git::{
    GitWorktreeEntry, is_worktree_clean, list_worktrees_porcelain, parse_git_worktree_porcelain,
    repo_name,
};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

static PATH_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[/\\]+").expect("static regex is valid"));
static SPACING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_\s]+").expect("static regex is valid"));
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\-.]").expect("static regex is valid"));

/// A git worktree as seen by `git worktree list`, recomputed on every query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Workspace {
    pub(crate) path: PathBuf,
    pub(crate) branch: Option<String>,
    pub(crate) commit: String,
    pub(crate) is_main: bool,
    pub(crate) repo_root: PathBuf,
    managed_root: PathBuf,
}

#[derive(Debug, Serialize)]
pub(crate) struct WorkspaceJson {
    pub(crate) path: String,
    pub(crate) branch: Option<String>,
    pub(crate) commit: String,
    pub(crate) is_main: bool,
    pub(crate) is_managed: bool,
    pub(crate) is_clean: bool,
    pub(crate) status: String,
}

impl Workspace {
    pub(crate) fn from_entry(
        entry: GitWorktreeEntry,
        is_main: bool,
        repo_root: &Path,
        managed_root: &Path,
    ) -> Self {
        Self {
            path: entry.path,
            branch: entry.branch,
            commit: entry.commit,
            is_main,
            repo_root: repo_root.to_path_buf(),
            managed_root: managed_root.to_path_buf(),
        }
    }

    /// True when the worktree lives under this repository's managed directory.
    pub(crate) fn is_managed(&self) -> bool {
        path_is_within_dir(&self.path, &self.managed_root)
    }

    pub(crate) fn is_clean(&self) -> (bool, String) {
        is_worktree_clean(&self.path)
    }

    pub(crate) fn display_branch(&self) -> &str {
        self.branch.as_deref().unwrap_or("(detached)")
    }

    pub(crate) fn to_json(&self) -> WorkspaceJson {
        let (is_clean, status) = self.is_clean();
        WorkspaceJson {
            path: self.path.display().to_string(),
            branch: self.branch.clone(),
            commit: self.commit.clone(),
            is_main: self.is_main,
            is_managed: self.is_managed(),
            is_clean,
            status,
        }
    }
}

/// Turns a branch name into a single directory component.
///
/// `feature/auth-api` becomes `feature-auth-api`; `feat/BS 123_new` becomes
/// `feat-BS-123-new`.
pub(crate) fn sanitize_workspace_name(branch: &str) -> String {
    let value = PATH_SEPARATORS.replace_all(branch, "-");
    let value = SPACING.replace_all(&value, "-");
    let value = DISALLOWED.replace_all(&value, "");
    value.trim_matches('-').to_string()
}

/// `<home>/.claude/workspaces/<repo-name>`.
pub(crate) fn managed_base(home: &Path, repo_root: &Path) -> PathBuf {
    home.join(CLAUDE_DIR)
        .join(WORKSPACES_DIR)
        .join(repo_name(repo_root))
}

pub(crate) fn workspace_path(managed_base: &Path, branch: &str) -> PathBuf {
    managed_base.join(sanitize_workspace_name(branch))
}

pub(crate) fn workspaces_from_porcelain(
    raw: &str,
    repo_root: &Path,
    managed_base: &Path,
) -> Vec<Workspace> {
    parse_git_worktree_porcelain(raw)
        .into_iter()
        .enumerate()
        .map(|(index, entry)| Workspace::from_entry(entry, index == 0, repo_root, managed_base))
        .collect()
}

/// Every worktree of the repository in git's order; empty when git fails.
pub(crate) fn discover_workspaces(repo_root: &Path, managed_base: &Path) -> Vec<Workspace> {
    match list_worktrees_porcelain(repo_root) {
        Ok(raw) => workspaces_from_porcelain(&raw, repo_root, managed_base),
        Err(err) => {
            debug!("workspace discovery failed: {err:#}");
            Vec::new()
        }
    }
}

pub(crate) fn find_workspace_by_branch(
    branch: &str,
    repo_root: &Path,
    managed_base: &Path,
) -> Option<Workspace> {
    discover_workspaces(repo_root, managed_base)
        .into_iter()
        .find(|workspace| workspace.branch.as_deref() == Some(branch))
}

pub(crate) fn path_is_within_dir(path: &Path, dir: &Path) -> bool {
    if path.starts_with(dir) {
        return true;
    }
    match (path.canonicalize(), dir.canonicalize()) {
        (Ok(canonical_path), Ok(canonical_dir)) => canonical_path.starts_with(canonical_dir),
        _ => false,
    }
}

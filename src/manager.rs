use crate::constants::DEFAULT_WORKSPACE_REVISION;
use crate::error::{WorkspaceError, WorkspaceResult};
use crate::git::{
    add_worktree, ahead_behind, branch_exists, current_branch, diff_against, remove_worktree,
    repo_root_from,
};
use crate::workspace::{
    Workspace, discover_workspaces, find_workspace_by_branch, managed_base, workspace_path,
};
use serde::Serialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct AheadBehind {
    pub(crate) ahead: usize,
    pub(crate) behind: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct WorkspaceStatus {
    pub(crate) is_clean: bool,
    pub(crate) status: String,
    pub(crate) ahead_behind: Option<AheadBehind>,
}

/// Workspace lifecycle for one repository.
///
/// Holds the resolved repository root, the directory it was invoked from and
/// the managed base directory; every query rediscovers worktrees from git.
#[derive(Debug, Clone)]
pub(crate) struct WorkspaceManager {
    repo_root: PathBuf,
    invocation_dir: PathBuf,
    managed_base: PathBuf,
}

impl WorkspaceManager {
    pub(crate) fn new() -> WorkspaceResult<Self> {
        let cwd = env::current_dir().map_err(|_| WorkspaceError::NotInGitRepo)?;
        let home = dirs::home_dir().ok_or_else(|| {
            WorkspaceError::Workspace("Could not determine home directory".to_string())
        })?;
        Self::with_home(&cwd, &home)
    }

    /// Manager for the repository containing `dir`, rooted at an explicit home.
    pub(crate) fn with_home(dir: &Path, home: &Path) -> WorkspaceResult<Self> {
        let repo_root = repo_root_from(dir)?;
        Ok(Self::from_parts(repo_root, dir, home))
    }

    fn from_parts(repo_root: PathBuf, invocation_dir: &Path, home: &Path) -> Self {
        let managed_base = managed_base(home, &repo_root);
        debug!(
            repo_root = %repo_root.display(),
            managed_base = %managed_base.display(),
            "workspace manager ready"
        );
        Self {
            repo_root,
            invocation_dir: invocation_dir.to_path_buf(),
            managed_base,
        }
    }

    pub(crate) fn managed_base(&self) -> &Path {
        &self.managed_base
    }

    pub(crate) fn list_workspaces(&self, managed_only: bool) -> Vec<Workspace> {
        let workspaces = discover_workspaces(&self.repo_root, &self.managed_base);
        if !managed_only {
            return workspaces;
        }
        workspaces
            .into_iter()
            .filter(|workspace| workspace.is_managed() && !workspace.is_main)
            .collect()
    }

    pub(crate) fn get_workspace(&self, branch: &str) -> WorkspaceResult<Workspace> {
        find_workspace_by_branch(branch, &self.repo_root, &self.managed_base).ok_or_else(|| {
            WorkspaceError::WorkspaceNotFound {
                branch: branch.to_string(),
            }
        })
    }

    /// Creates a managed worktree for `branch`.
    ///
    /// An existing local or `origin` branch is checked out; otherwise a new
    /// branch is cut from `base`, the branch checked out where the manager
    /// was invoked, or `HEAD`.
    pub(crate) fn create_workspace(
        &self,
        branch: &str,
        base: Option<&str>,
    ) -> WorkspaceResult<Workspace> {
        let path = workspace_path(&self.managed_base, branch);
        if path.exists() {
            return Err(WorkspaceError::WorkspaceExists { path });
        }
        if let Some(existing) = find_workspace_by_branch(branch, &self.repo_root, &self.managed_base)
        {
            return Err(WorkspaceError::BranchInUse {
                branch: branch.to_string(),
                path: existing.path,
            });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                WorkspaceError::Workspace(format!(
                    "Failed to create workspace directory {}: {err}",
                    parent.display()
                ))
            })?;
        }

        if branch_exists(&self.repo_root, branch) {
            info!(branch, path = %path.display(), "attaching existing branch");
            add_worktree(&self.repo_root, &path, branch, None)?;
        } else {
            let start = match base {
                Some(base) => base.to_string(),
                None => current_branch(&self.invocation_dir)
                    .unwrap_or_else(|| DEFAULT_WORKSPACE_REVISION.to_string()),
            };
            info!(branch, base = %start, path = %path.display(), "creating branch");
            add_worktree(&self.repo_root, &path, branch, Some(&start))?;
        }

        find_workspace_by_branch(branch, &self.repo_root, &self.managed_base).ok_or_else(|| {
            WorkspaceError::Workspace("Workspace created but could not be found".to_string())
        })
    }

    pub(crate) fn delete_workspace(&self, branch: &str, force: bool) -> WorkspaceResult<()> {
        let workspace = self.get_workspace(branch)?;
        if !force {
            let (clean, status) = workspace.is_clean();
            if !clean {
                return Err(WorkspaceError::Workspace(format!(
                    "Workspace has uncommitted changes ({status}). Use --force to remove anyway."
                )));
            }
        }

        remove_worktree(&self.repo_root, &workspace.path, force)?;
        info!(branch, path = %workspace.path.display(), "removed workspace");

        // Managed parents only: an unmanaged worktree's parent is not ours to
        // touch. Only empties go; a failure just means siblings remain.
        if workspace.is_managed()
            && let Some(parent) = workspace.path.parent()
            && let Err(err) = fs::remove_dir(parent)
        {
            debug!(parent = %parent.display(), "kept workspace parent: {err}");
        }
        Ok(())
    }

    /// Removes managed workspaces and returns the branches that went away.
    ///
    /// With `check_merged` only clean workspaces are removed; without it every
    /// managed workspace is force-removed. Failures are logged and skipped.
    pub(crate) fn clean_workspaces(&self, check_merged: bool) -> Vec<String> {
        let mut removed = Vec::new();
        for workspace in self.list_workspaces(true) {
            let Some(branch) = workspace.branch.clone() else {
                continue;
            };
            if check_merged && !workspace.is_clean().0 {
                debug!(branch, "skipping dirty workspace");
                continue;
            }
            match self.delete_workspace(&branch, !check_merged) {
                Ok(()) => removed.push(branch),
                Err(err) => warn!(branch, "failed to clean workspace: {err}"),
            }
        }
        removed
    }

    pub(crate) fn workspace_status(&self, workspace: &Workspace) -> WorkspaceStatus {
        let (is_clean, status) = workspace.is_clean();
        let ahead_behind = workspace
            .branch
            .as_deref()
            .and_then(|branch| ahead_behind(&workspace.path, branch))
            .map(|(ahead, behind)| AheadBehind { ahead, behind });
        WorkspaceStatus {
            is_clean,
            status,
            ahead_behind,
        }
    }

    pub(crate) fn workspace_diff(
        &self,
        workspace: &Workspace,
        target: &str,
    ) -> WorkspaceResult<String> {
        diff_against(&workspace.path, target)
    }
}

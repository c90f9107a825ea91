use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by workspace operations.
///
/// The CLI boundary matches on these variants to pick the rendering and exit
/// code; everything else travels as `anyhow::Error`.
#[derive(Debug, Error)]
pub(crate) enum WorkspaceError {
    #[error("Not in a git repository")]
    NotInGitRepo,

    #[error("Workspace already exists: {}", path.display())]
    WorkspaceExists { path: PathBuf },

    #[error("Branch '{branch}' is already checked out at: {}", path.display())]
    BranchInUse { branch: String, path: PathBuf },

    #[error("No workspace found for branch: {branch}")]
    WorkspaceNotFound { branch: String },

    #[error("{0}")]
    Workspace(String),
}

impl WorkspaceError {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::NotInGitRepo => "not_in_git_repo",
            Self::WorkspaceExists { .. } => "workspace_exists",
            Self::BranchInUse { .. } => "branch_in_use",
            Self::WorkspaceNotFound { .. } => "workspace_not_found",
            Self::Workspace(_) => "workspace_error",
        }
    }

    /// Follow-up advice shown under the message in human mode.
    pub(crate) fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NotInGitRepo => {
                Some("Run from inside a git repository, or use `claudectl init --global`")
            }
            Self::WorkspaceExists { .. } => {
                Some("Open it with `claudectl workspace open <branch>` or delete it first")
            }
            _ => None,
        }
    }
}

pub(crate) type WorkspaceResult<T> = std::result::Result<T, WorkspaceError>;

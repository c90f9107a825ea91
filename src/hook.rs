use crate::constants::{BINARY_CHANGE_LINES, COMMIT_MINOR_LINES, COMMIT_MODERATE_LINES};
use crate::git::{commit_path, current_branch, stage_path, staged_numstat, worktree_toplevel};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// JSON payload the assistant pipes to hook commands.
#[derive(Debug, Default, Clone, Deserialize)]
pub(crate) struct HookInput {
    #[serde(default)]
    pub(crate) session_id: Option<String>,
    #[serde(default)]
    pub(crate) tool_input: Option<ToolInput>,
    #[serde(default)]
    pub(crate) transcript_path: Option<String>,
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) notification_type: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub(crate) struct ToolInput {
    #[serde(default)]
    pub(crate) file_path: Option<String>,
}

impl HookInput {
    pub(crate) fn file_path(&self) -> Option<&str> {
        self.tool_input
            .as_ref()
            .and_then(|input| input.file_path.as_deref())
            .filter(|path| !path.is_empty())
    }

    pub(crate) fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|message| !message.is_empty())
    }

    pub(crate) fn transcript_path(&self) -> Option<&str> {
        self.transcript_path
            .as_deref()
            .filter(|path| !path.is_empty())
    }
}

/// Parses hook input; anything that is not a JSON object reads as absent.
pub(crate) fn parse_hook_input(raw: &str) -> Option<HookInput> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<HookInput>(trimmed) {
        Ok(input) => Some(input),
        Err(err) => {
            debug!("ignoring malformed hook input: {err}");
            None
        }
    }
}

/// Reads hook input from stdin unless stdin is an interactive terminal.
pub(crate) fn read_hook_input() -> Option<HookInput> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return None;
    }
    let mut raw = String::new();
    if let Err(err) = stdin.read_to_string(&mut raw) {
        debug!("failed to read hook input: {err}");
        return None;
    }
    let input = parse_hook_input(&raw)?;
    if let Some(session) = &input.session_id {
        debug!(session, "hook input received");
    }
    Some(input)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AutoCommit {
    Edit,
    NewFile,
}

pub(crate) fn is_protected_branch(branch: &str) -> bool {
    branch == "main" || branch == "master"
}

pub(crate) fn change_size(lines: usize) -> &'static str {
    if lines < COMMIT_MINOR_LINES {
        "minor"
    } else if lines < COMMIT_MODERATE_LINES {
        "moderate"
    } else {
        "major"
    }
}

pub(crate) fn edit_commit_message(file_name: &str, lines: usize) -> String {
    format!(
        "Update {file_name}: {} changes ({lines} lines)",
        change_size(lines)
    )
}

pub(crate) fn new_file_commit_message(file_name: &str) -> String {
    format!("Add new file: {file_name}")
}

/// Commits `file_path` on its own when it sits on a feature branch.
///
/// Returns `Ok(false)` when the file is outside a repository, the branch is
/// `main`/`master`/detached, or nothing was staged.
pub(crate) fn auto_commit(file_path: &Path, kind: AutoCommit) -> Result<bool> {
    let absolute = absolute_path(file_path)?;
    let Some(search_dir) = absolute.parent() else {
        return Ok(false);
    };
    let Some(worktree) = worktree_toplevel(search_dir) else {
        debug!(file = %absolute.display(), "not inside a git worktree");
        return Ok(false);
    };
    let Some(branch) = current_branch(&worktree) else {
        debug!("detached HEAD, not committing");
        return Ok(false);
    };
    if is_protected_branch(&branch) {
        debug!(branch, "protected branch, not committing");
        return Ok(false);
    }

    let Some(rel) = relative_to_worktree(&absolute, &worktree) else {
        return Ok(false);
    };
    stage_path(&worktree, &rel)?;
    let Some((added, deleted)) = staged_numstat(&worktree, &rel)? else {
        debug!(file = rel, "no staged change");
        return Ok(false);
    };

    let file_name = absolute
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| rel.clone());
    let message = match kind {
        AutoCommit::Edit => {
            let lines = match (added, deleted) {
                (Some(added), Some(deleted)) => added.max(deleted),
                _ => BINARY_CHANGE_LINES,
            };
            edit_commit_message(&file_name, lines)
        }
        AutoCommit::NewFile => new_file_commit_message(&file_name),
    };

    commit_path(&worktree, &rel, &message)?;
    debug!(branch, message, "auto-committed");
    Ok(true)
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().context("failed to read current directory")?;
    Ok(cwd.join(path))
}

fn relative_to_worktree(file: &Path, worktree: &Path) -> Option<String> {
    if let Ok(rel) = file.strip_prefix(worktree) {
        return Some(rel.to_string_lossy().to_string());
    }
    let canonical_worktree = worktree.canonicalize().ok()?;
    let canonical_parent = file.parent()?.canonicalize().ok()?;
    let rel_parent = canonical_parent.strip_prefix(&canonical_worktree).ok()?;
    Some(rel_parent.join(file.file_name()?).to_string_lossy().to_string())
}

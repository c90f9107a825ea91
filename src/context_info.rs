use crate::config::Config;
use crate::constants::{SNAPSHOT_MAX_FILES, SNAPSHOT_SHOWN_FILES};
use crate::git::{current_branch, local_branches, status_porcelain};
use crate::hook::is_protected_branch;
use crate::manager::WorkspaceManager;
use crate::process::{best_error_line, run_capture_with_timeout};
use crate::workspace::{Workspace, path_is_within_dir};
use glob::Pattern;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::debug;

const PRIORITY_PATTERNS: &[&str] = &[
    "*.py",
    "*.ts",
    "*.tsx",
    "*.js",
    "*.jsx",
    "*.go",
    "*.rs",
    "*.rb",
    "*.java",
    "Makefile",
    "justfile",
    "package.json",
    "pyproject.toml",
    "Cargo.toml",
    "go.mod",
    "Gemfile",
];

/// Builds the `<context-refresh>` block injected before each prompt.
///
/// Every section is optional and silently dropped when its data is missing.
pub(crate) fn render_context_info(cwd: &Path, home: Option<&Path>, config: &Config) -> String {
    let mut lines = vec!["<context-refresh>".to_string(), format!("Path: {}", cwd.display())];

    let workspaces = home
        .and_then(|home| WorkspaceManager::with_home(cwd, home).ok())
        .map(|manager| manager.list_workspaces(false))
        .unwrap_or_default();
    let managed: Vec<&Workspace> = workspaces
        .iter()
        .filter(|workspace| workspace.is_managed() && !workspace.is_main)
        .collect();

    if let Some(current) = managed
        .iter()
        .find(|workspace| path_is_within_dir(cwd, &workspace.path))
    {
        let (_, status) = current.is_clean();
        lines.push(format!(
            "Current Workspace: {} ({status})",
            current.display_branch()
        ));
    }

    let branch = current_branch(cwd);
    if let Some(branch) = &branch {
        match status_porcelain(cwd) {
            Ok(raw) => lines.push(format!("Branch: {branch} ({})", branch_status_summary(&raw))),
            Err(_) => lines.push(format!("Branch: {branch}")),
        }
    }

    let branches = local_branches(cwd);
    if !branches.is_empty() {
        lines.push("Git Branches:".to_string());
        for name in &branches {
            lines.push(format!("  {name}: {}", branch_cleanliness(name, &workspaces)));
        }
    }

    if !managed.is_empty() {
        lines.push("Workspaces:".to_string());
        for workspace in &managed {
            let (_, status) = workspace.is_clean();
            lines.push(format!("  {} ({status})", workspace.display_branch()));
        }
    }

    if let Some(branch) = &branch
        && !is_protected_branch(branch)
        && let Some(pr) = pull_request_status(cwd, config)
    {
        lines.push(pr.render());
    }

    let files = directory_snapshot(cwd, SNAPSHOT_MAX_FILES);
    if !files.is_empty() {
        let dir_name = cwd
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        lines.push(format!("Directory: {dir_name}/"));
        let shown = files.len().min(SNAPSHOT_SHOWN_FILES);
        lines.push(format!("  {}", files[..shown].join(", ")));
        if files.len() > SNAPSHOT_SHOWN_FILES {
            lines.push(format!("  ... and {} more", files.len() - SNAPSHOT_SHOWN_FILES));
        }
    }

    lines.push("</context-refresh>".to_string());
    lines.join("\n")
}

/// Cleanliness of a branch as seen by the worktree that has it checked out.
fn branch_cleanliness(branch: &str, workspaces: &[Workspace]) -> &'static str {
    match workspaces
        .iter()
        .find(|workspace| workspace.branch.as_deref() == Some(branch))
    {
        Some(workspace) if workspace.is_clean().0 => "clean",
        Some(_) => "dirty",
        None => "unknown",
    }
}

/// `clean`, or counts of staged, modified and untracked entries.
pub(crate) fn branch_status_summary(raw: &str) -> String {
    let mut staged = 0usize;
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
        if bytes[0] != b' ' {
            staged += 1;
        }
        if bytes[1] != b' ' {
            modified += 1;
        }
    }

    let parts: Vec<String> = [(staged, "staged"), (modified, "modified"), (untracked, "untracked")]
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, label)| format!("{count} {label}"))
        .collect();
    if parts.is_empty() {
        "clean".to_string()
    } else {
        parts.join(", ")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrView {
    number: u64,
    title: String,
    state: String,
    #[serde(default)]
    review_decision: Option<String>,
    #[serde(default)]
    status_check_rollup: Option<Vec<CheckRun>>,
}

#[derive(Debug, Deserialize)]
struct CheckRun {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    conclusion: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

impl CheckRun {
    fn outcome(&self) -> Option<&str> {
        self.conclusion
            .as_deref()
            .or(self.state.as_deref())
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PrStatus {
    pub(crate) number: u64,
    pub(crate) title: String,
    pub(crate) review: Option<String>,
    pub(crate) checks: Option<String>,
}

impl PrStatus {
    pub(crate) fn render(&self) -> String {
        let mut line = format!("PR #{}: {}", self.number, self.title);
        let mut details = Vec::new();
        if let Some(review) = &self.review {
            details.push(review.to_lowercase().replace('_', " "));
        }
        if let Some(checks) = &self.checks {
            details.push(format!("checks: {checks}"));
        }
        if !details.is_empty() {
            line.push_str(&format!(" ({})", details.join(", ")));
        }
        line
    }
}

fn pull_request_status(cwd: &Path, config: &Config) -> Option<PrStatus> {
    let output = match run_capture_with_timeout(
        "gh",
        &[
            "pr",
            "view",
            "--json",
            "number,title,state,url,reviewDecision,statusCheckRollup",
        ],
        Some(cwd),
        config.pr_timeout(),
    ) {
        Ok(Some(output)) => output,
        Ok(None) => {
            debug!("gh pr view timed out");
            return None;
        }
        Err(err) => {
            debug!("gh unavailable: {err:#}");
            return None;
        }
    };
    if !output.status.success() {
        debug!("no pull request: {}", best_error_line(&output.stderr));
        return None;
    }
    parse_pr_view(&output.stdout)
}

/// Open pull request details from `gh pr view --json` output.
pub(crate) fn parse_pr_view(raw: &str) -> Option<PrStatus> {
    let view: PrView = match serde_json::from_str(raw) {
        Ok(view) => view,
        Err(err) => {
            debug!("unexpected gh output: {err}");
            return None;
        }
    };
    if view.state != "OPEN" {
        return None;
    }
    Some(PrStatus {
        number: view.number,
        title: view.title,
        review: view.review_decision.filter(|value| !value.is_empty()),
        checks: view
            .status_check_rollup
            .as_deref()
            .and_then(summarize_checks),
    })
}

fn summarize_checks(checks: &[CheckRun]) -> Option<String> {
    let mut passed = 0usize;
    let mut failed = 0usize;
    let mut pending = 0usize;
    for check in checks {
        match check.outcome() {
            Some("SUCCESS") => passed += 1,
            Some("FAILURE") | Some("ERROR") => failed += 1,
            None | Some("PENDING") => pending += 1,
            Some(_) if check.status.as_deref() == Some("IN_PROGRESS") => pending += 1,
            Some(_) => {}
        }
    }
    if failed > 0 {
        Some(format!("{failed} failing"))
    } else if pending > 0 {
        Some(format!("{pending} pending"))
    } else if passed > 0 {
        Some(format!("{passed} passed"))
    } else {
        None
    }
}

/// Notable files and top-level directories of `dir`, sorted, at most `max`.
pub(crate) fn directory_snapshot(dir: &Path, max: usize) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(dir = %dir.display(), "cannot read directory: {err}");
            return Vec::new();
        }
    };

    let mut files = BTreeSet::new();
    let mut dirs = BTreeSet::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if !name.starts_with('.') {
                dirs.insert(format!("{name}/"));
            }
        } else {
            files.insert(name);
        }
    }

    let mut picked: Vec<String> = Vec::new();
    for pattern in PRIORITY_PATTERNS {
        let Ok(pattern) = Pattern::new(pattern) else {
            continue;
        };
        for name in &files {
            if picked.len() >= max {
                break;
            }
            if pattern.matches(name) && !picked.contains(name) {
                picked.push(name.clone());
            }
        }
    }
    for dir in dirs {
        if picked.len() >= max {
            break;
        }
        picked.push(dir);
    }

    picked.sort();
    picked
}

use crate::config::Config;
use crate::constants::{USER_CLAUDE_CONFIG, VERSION_TIMEOUT_SECS};
use crate::process::{best_error_line, find_in_path, run_capture_with_timeout, run_stream};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

pub(crate) fn repository_index_prompt() -> &'static str {
    "Analyze this repository and provide a concise overview:
- Main purpose and key technologies
- Directory structure (2-3 levels max)
- Entry points and main files
- Build/run commands (check for package.json scripts, Makefile targets, Justfile recipes, etc.)
- Available scripts and automation tools

Format as clean markdown starting at heading level 3 (###), keep it brief (under 500 words)."
}

/// Arguments for an interactive session, with the user's MCP servers when
/// `~/.claude.json` exists.
pub(crate) fn build_session_args(home: Option<&Path>) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(home) = home {
        let mcp_config = home.join(USER_CLAUDE_CONFIG);
        if mcp_config.is_file() {
            args.push("--mcp-config".to_string());
            args.push(mcp_config.display().to_string());
        }
    }
    args
}

/// Runs the assistant in `workspace_path` attached to this terminal.
pub(crate) fn launch_session(config: &Config, workspace_path: &Path) -> Result<()> {
    let home = dirs::home_dir();
    let args = build_session_args(home.as_deref());
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    run_stream(&config.claude_bin, &arg_refs, Some(workspace_path))
        .with_context(|| format!("failed while running `{}`", config.claude_bin))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ClaudeInfo {
    pub(crate) installed: bool,
    pub(crate) version: Option<String>,
    pub(crate) path: Option<String>,
}

pub(crate) fn claude_info(config: &Config) -> ClaudeInfo {
    let Some(path) = find_in_path(&config.claude_bin) else {
        return ClaudeInfo {
            installed: false,
            version: None,
            path: None,
        };
    };

    let version = match run_capture_with_timeout(
        &config.claude_bin,
        &["--version"],
        None,
        Duration::from_secs(VERSION_TIMEOUT_SECS),
    ) {
        Ok(Some(output)) if output.status.success() => {
            Some(output.stdout.trim().to_string()).filter(|value| !value.is_empty())
        }
        Ok(Some(output)) => {
            debug!("version query failed: {}", best_error_line(&output.stderr));
            None
        }
        Ok(None) => {
            debug!("version query timed out");
            None
        }
        Err(err) => {
            debug!("version query failed: {err:#}");
            None
        }
    };

    ClaudeInfo {
        installed: true,
        version,
        path: Some(path.display().to_string()),
    }
}

/// Asks the assistant for a repository overview; `None` on any failure.
pub(crate) fn generate_repository_index(config: &Config, repo_root: &Path) -> Option<String> {
    if find_in_path(&config.claude_bin).is_none() {
        debug!(bin = %config.claude_bin, "assistant not on PATH, skipping index");
        return None;
    }
    let output = match run_capture_with_timeout(
        &config.claude_bin,
        &[
            "--print",
            "--output-format",
            "text",
            repository_index_prompt(),
        ],
        Some(repo_root),
        config.index_timeout(),
    ) {
        Ok(Some(output)) => output,
        Ok(None) => {
            warn!("repository indexing timed out");
            return None;
        }
        Err(err) => {
            warn!("repository indexing failed: {err:#}");
            return None;
        }
    };
    if !output.status.success() {
        warn!(
            "repository indexing failed: {}",
            best_error_line(&output.stderr)
        );
        return None;
    }
    let index = output.stdout.trim();
    if index.is_empty() {
        return None;
    }
    Some(index.to_string())
}

use crate::claude::generate_repository_index;
use crate::config::Config;
use crate::constants::{CLAUDE_DIR, REPOSITORY_INDEX_END, REPOSITORY_INDEX_START};
use crate::settings_merge::merge_settings;
use crate::ui::{OutputMode, progress};
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub(crate) struct Template {
    pub(crate) path: &'static str,
    pub(crate) contents: &'static str,
}

pub(crate) const CLAUDE_MD: &str = include_str!("../templates/CLAUDE.md");
pub(crate) const SETTINGS_JSON: &str = include_str!("../templates/settings.json");

pub(crate) const AGENTS: &[Template] = &[
    Template {
        path: "code-reviewer.md",
        contents: include_str!("../templates/agents/code-reviewer.md"),
    },
    Template {
        path: "researcher.md",
        contents: include_str!("../templates/agents/researcher.md"),
    },
];

/// Skill files keyed by `<skill>/<file>`; each skill directory installs as a unit.
pub(crate) const SKILLS: &[Template] = &[
    Template {
        path: "commit/SKILL.md",
        contents: include_str!("../templates/skills/commit/SKILL.md"),
    },
    Template {
        path: "workspace/SKILL.md",
        contents: include_str!("../templates/skills/workspace/SKILL.md"),
    },
];

pub(crate) const MCP_CONFIG_FILE: &str = ".mcp.json";

pub(crate) fn default_mcp_servers() -> Value {
    json!({
        "context7": {
            "type": "http",
            "url": "https://mcp.context7.com/mcp"
        },
        "linear": {
            "type": "sse",
            "url": "https://mcp.linear.app/sse"
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FileStatus {
    Created,
    Skipped,
    Overwritten,
    Merged,
}

/// Where templates go.
///
/// A project keeps `CLAUDE.md` at its root and the rest under `.claude/`; the
/// global install writes everything straight into `~/.claude`.
#[derive(Debug, Clone)]
pub(crate) struct InitTarget {
    pub(crate) root: PathBuf,
    pub(crate) config_dir: PathBuf,
}

impl InitTarget {
    pub(crate) fn project(repo_root: &Path) -> Self {
        Self {
            root: repo_root.to_path_buf(),
            config_dir: repo_root.join(CLAUDE_DIR),
        }
    }

    pub(crate) fn global(home: &Path) -> Self {
        let dir = home.join(CLAUDE_DIR);
        Self {
            root: dir.clone(),
            config_dir: dir,
        }
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct InitReport {
    pub(crate) installed: Vec<String>,
    pub(crate) skipped: Vec<String>,
    pub(crate) overwritten: Vec<String>,
    pub(crate) merged: Vec<String>,
    #[serde(skip)]
    pub(crate) indexed: bool,
}

impl InitReport {
    pub(crate) fn track(&mut self, path: String, status: FileStatus) {
        match status {
            FileStatus::Created => self.installed.push(path),
            FileStatus::Skipped => self.skipped.push(path),
            FileStatus::Overwritten => self.overwritten.push(path),
            FileStatus::Merged => self.merged.push(path),
        }
    }

    pub(crate) fn summary(&self) -> String {
        let mut parts = Vec::new();
        for (count, label) in [
            (self.installed.len(), "installed"),
            (self.overwritten.len(), "overwritten"),
            (self.merged.len(), "merged"),
            (self.skipped.len(), "skipped"),
        ] {
            if count > 0 {
                parts.push(format!("{count} {label}"));
            }
        }
        let summary = if parts.is_empty() {
            "nothing to do".to_string()
        } else {
            parts.join(", ")
        };
        format!("Initialized Claude Code configuration ({summary})")
    }

    pub(crate) fn detailed(&self) -> String {
        let mut lines = vec!["Initialized Claude Code configuration".to_string()];
        for (files, label) in [
            (&self.installed, "Installed"),
            (&self.overwritten, "Overwritten"),
            (&self.merged, "Merged"),
            (&self.skipped, "Skipped existing"),
        ] {
            if files.is_empty() {
                continue;
            }
            lines.push(format!("  {label} {} file(s):", files.len()));
            lines.extend(files.iter().map(|file| format!("    • {file}")));
        }
        if self.indexed {
            lines.push("  Repository indexed with Claude CLI".to_string());
        }
        lines.join("\n")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct InitOptions {
    pub(crate) force: bool,
    pub(crate) index: bool,
}

pub(crate) fn install(
    target: &InitTarget,
    options: InitOptions,
    config: &Config,
    mode: OutputMode,
) -> Result<InitReport> {
    let mut report = InitReport::default();

    progress(mode, "init: installing CLAUDE.md");
    let claude_md = target.root.join("CLAUDE.md");
    let status = install_file(&claude_md, CLAUDE_MD, options.force)?;
    report.track(target.relative(&claude_md), status);

    progress(mode, "init: installing agents");
    let agents_dir = target.config_dir.join("agents");
    for template in AGENTS {
        let dest = agents_dir.join(template.path);
        let status = install_file(&dest, template.contents, options.force)?;
        report.track(target.relative(&dest), status);
    }

    progress(mode, "init: installing skills");
    let skills_dir = target.config_dir.join("skills");
    for (skill, status) in install_skills(&skills_dir, options.force)? {
        report.track(target.relative(&skills_dir.join(skill)), status);
    }

    progress(mode, "init: configuring settings");
    let settings = target.config_dir.join("settings.json");
    let status = install_settings(&settings, SETTINGS_JSON, options.force)?;
    report.track(target.relative(&settings), status);

    progress(mode, "init: configuring MCP servers");
    let mcp = target.root.join(MCP_CONFIG_FILE);
    let status = configure_mcp(&mcp, &default_mcp_servers())?;
    report.track(target.relative(&mcp), status);

    if options.index {
        progress(mode, "init: indexing repository with Claude CLI");
        report.indexed = index_repository(config, &target.root, &claude_md);
    }

    Ok(report)
}

pub(crate) fn install_file(dest: &Path, contents: &str, force: bool) -> Result<FileStatus> {
    let status = if dest.exists() {
        if !force {
            debug!(path = %dest.display(), "keeping existing file");
            return Ok(FileStatus::Skipped);
        }
        FileStatus::Overwritten
    } else {
        FileStatus::Created
    };
    write_with_parents(dest, contents)?;
    Ok(status)
}

/// Installs each skill directory whole; an existing directory is skipped
/// unless `force` is set.
pub(crate) fn install_skills(skills_dir: &Path, force: bool) -> Result<Vec<(String, FileStatus)>> {
    let names: BTreeSet<&str> = SKILLS
        .iter()
        .filter_map(|template| template.path.split('/').next())
        .collect();

    let mut results = Vec::new();
    for name in names {
        let skill_dir = skills_dir.join(name);
        let status = if skill_dir.exists() {
            if !force {
                results.push((name.to_string(), FileStatus::Skipped));
                continue;
            }
            FileStatus::Overwritten
        } else {
            FileStatus::Created
        };
        let prefix = format!("{name}/");
        for template in SKILLS {
            if let Some(rel) = template.path.strip_prefix(&prefix) {
                write_with_parents(&skill_dir.join(rel), template.contents)?;
            }
        }
        results.push((name.to_string(), status));
    }
    Ok(results)
}

/// Writes `template` to `dest`, merging into an existing file unless forced.
pub(crate) fn install_settings(dest: &Path, template: &str, force: bool) -> Result<FileStatus> {
    let new_settings: Value =
        serde_json::from_str(template).context("embedded settings template is not valid JSON")?;

    if !dest.exists() {
        write_json(dest, &new_settings)?;
        return Ok(FileStatus::Created);
    }
    if force {
        write_json(dest, &new_settings)?;
        return Ok(FileStatus::Overwritten);
    }

    let existing = read_json(dest)?;
    write_json(dest, &merge_settings(&existing, &new_settings))?;
    Ok(FileStatus::Merged)
}

/// Adds any of `servers` missing from `mcpServers`. Existing entries are
/// never replaced.
pub(crate) fn configure_mcp(dest: &Path, servers: &Value) -> Result<FileStatus> {
    let Some(servers) = servers.as_object() else {
        return Ok(FileStatus::Skipped);
    };

    if !dest.exists() {
        write_json(dest, &json!({ "mcpServers": servers }))?;
        return Ok(FileStatus::Created);
    }

    let mut config = read_json(dest)?;
    let Some(root) = config.as_object_mut() else {
        debug!(path = %dest.display(), "MCP config is not an object, leaving it alone");
        return Ok(FileStatus::Skipped);
    };
    let entry = root
        .entry("mcpServers")
        .or_insert_with(|| Value::Object(Default::default()));
    let Some(existing) = entry.as_object_mut() else {
        debug!(path = %dest.display(), "mcpServers is not an object, leaving it alone");
        return Ok(FileStatus::Skipped);
    };

    let mut added = 0usize;
    for (name, server) in servers {
        if existing.contains_key(name) {
            continue;
        }
        existing.insert(name.clone(), server.clone());
        added += 1;
    }
    if added == 0 {
        return Ok(FileStatus::Skipped);
    }
    write_json(dest, &config)?;
    Ok(FileStatus::Merged)
}

fn index_repository(config: &Config, repo_root: &Path, claude_md: &Path) -> bool {
    let Some(index) = generate_repository_index(config, repo_root) else {
        return false;
    };
    match insert_repository_index(claude_md, &index) {
        Ok(inserted) => {
            if inserted {
                info!("repository index written to {}", claude_md.display());
            }
            inserted
        }
        Err(err) => {
            debug!("failed to write repository index: {err:#}");
            false
        }
    }
}

pub(crate) fn insert_repository_index(claude_md: &Path, index: &str) -> Result<bool> {
    if !claude_md.exists() {
        return Ok(false);
    }
    let content = fs::read_to_string(claude_md)
        .with_context(|| format!("failed to read {}", claude_md.display()))?;
    let Some(updated) = splice_repository_index(&content, index) else {
        return Ok(false);
    };
    fs::write(claude_md, updated)
        .with_context(|| format!("failed to write {}", claude_md.display()))?;
    Ok(true)
}

/// Replaces whatever sits between the index markers with `index`.
pub(crate) fn splice_repository_index(content: &str, index: &str) -> Option<String> {
    let start = content.find(REPOSITORY_INDEX_START)? + REPOSITORY_INDEX_START.len();
    let end = content[start..].find(REPOSITORY_INDEX_END)? + start;
    Some(format!(
        "{}\n{}\n{}",
        &content[..start],
        index.trim(),
        &content[end..]
    ))
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');
    write_with_parents(path, &body)
}

fn write_with_parents(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

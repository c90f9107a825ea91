use crate::constants::{APP_NAME, NOTIFY_MESSAGE_MAX_CHARS, NOTIFY_SENDER};
use crate::process::{best_error_line, find_in_path, run_capture};
use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("static regex is valid"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.+?)\*").expect("static regex is valid"));
static CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`(.+?)`").expect("static regex is valid"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#+\s*").expect("static regex is valid"));

const TERMINAL_NOTIFIER: &str = "terminal-notifier";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Backend {
    TerminalNotifier,
    OsaScript,
}

impl Backend {
    pub(crate) fn detect() -> Self {
        if find_in_path(TERMINAL_NOTIFIER).is_some() {
            Self::TerminalNotifier
        } else {
            Self::OsaScript
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TerminalNotifier => write!(f, "terminal-notifier"),
            Self::OsaScript => write!(f, "osascript fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Notification {
    pub(crate) title: String,
    pub(crate) subtitle: String,
    pub(crate) message: String,
    pub(crate) sound: Option<String>,
    pub(crate) group: Option<String>,
}

impl Notification {
    /// A notification titled `<icon> Claude Code`, grouped per project.
    pub(crate) fn for_project(icon: &str, project: &str, message: impl Into<String>) -> Self {
        Self {
            title: format!("{icon} {APP_NAME}"),
            subtitle: project.to_string(),
            message: message.into(),
            sound: None,
            group: Some(format!("claude-code-{project}")),
        }
    }

    pub(crate) fn with_sound(mut self, sound: &str) -> Self {
        self.sound = Some(sound.to_string());
        self
    }
}

pub(crate) fn terminal_notifier_args(notification: &Notification) -> Vec<String> {
    let mut args = vec![
        "-title".to_string(),
        notification.title.clone(),
        "-subtitle".to_string(),
        notification.subtitle.clone(),
        "-message".to_string(),
        notification.message.clone(),
        "-sender".to_string(),
        NOTIFY_SENDER.to_string(),
    ];
    if let Some(sound) = &notification.sound {
        args.push("-sound".to_string());
        args.push(sound.clone());
    }
    if let Some(group) = &notification.group {
        args.push("-group".to_string());
        args.push(group.clone());
    }
    args
}

pub(crate) fn osascript_source(notification: &Notification) -> String {
    let sound = notification
        .sound
        .as_deref()
        .map(|sound| format!(" sound name \"{}\"", applescript_escape(sound)))
        .unwrap_or_default();
    format!(
        "display notification \"{}\" with title \"{}\" subtitle \"{}\"{sound}",
        applescript_escape(&notification.message),
        applescript_escape(&notification.title),
        applescript_escape(&notification.subtitle),
    )
}

fn applescript_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

pub(crate) fn send(backend: Backend, notification: &Notification) -> Result<()> {
    let output = match backend {
        Backend::TerminalNotifier => {
            let args = terminal_notifier_args(notification);
            let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
            run_capture(TERMINAL_NOTIFIER, &arg_refs, None)?
        }
        Backend::OsaScript => {
            let script = osascript_source(notification);
            run_capture("osascript", &["-e", &script], None)?
        }
    };
    if !output.status.success() {
        bail!(
            "{backend} failed: {}",
            best_error_line(&output.stderr)
        );
    }
    Ok(())
}

/// Sends `notification`, logging instead of failing.
pub(crate) fn send_best_effort(notification: &Notification) -> Backend {
    let backend = Backend::detect();
    if let Err(err) = send(backend, notification) {
        debug!("notification not delivered: {err:#}");
    }
    backend
}

pub(crate) fn project_name() -> String {
    env::current_dir()
        .ok()
        .and_then(|cwd| cwd.file_name().map(|name| name.to_string_lossy().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub(crate) fn clock_time() -> String {
    chrono::Local::now().format("%-I:%M %p").to_string()
}

#[derive(Debug, Deserialize)]
struct TranscriptEntry {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<TranscriptMessage>,
}

#[derive(Debug, Deserialize)]
struct TranscriptMessage {
    #[serde(default)]
    content: Vec<serde_json::Value>,
}

/// Last assistant text in a JSONL transcript, reduced to a notification line.
pub(crate) fn final_response(transcript_path: &Path) -> Option<String> {
    let path = expand_home(transcript_path);
    match last_assistant_text(&path) {
        Ok(text) => text.and_then(|text| notification_line(&text, NOTIFY_MESSAGE_MAX_CHARS)),
        Err(err) => {
            debug!(path = %path.display(), "could not read transcript: {err:#}");
            None
        }
    }
}

fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

pub(crate) fn last_assistant_text(path: &Path) -> Result<Option<String>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut last = None;
    for line in BufReader::new(file).lines() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(entry) = serde_json::from_str::<TranscriptEntry>(line) else {
            continue;
        };
        if entry.kind.as_deref() != Some("assistant") {
            continue;
        }
        let Some(message) = entry.message else {
            continue;
        };
        for block in message.content {
            match block {
                serde_json::Value::String(text) => last = Some(text),
                serde_json::Value::Object(block)
                    if block.get("type").and_then(serde_json::Value::as_str) == Some("text") =>
                {
                    let text = block
                        .get("text")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or_default();
                    last = Some(text.to_string());
                }
                _ => {}
            }
        }
    }
    Ok(last)
}

/// First line of `text` without markdown emphasis, truncated to `max_chars`.
pub(crate) fn notification_line(text: &str, max_chars: usize) -> Option<String> {
    let first = text.trim().lines().next()?;
    let line = BOLD.replace_all(first, "$1");
    let line = ITALIC.replace_all(&line, "$1");
    let line = CODE.replace_all(&line, "$1");
    let line = HEADING.replace(&line, "").to_string();
    if line.is_empty() {
        return None;
    }
    if line.chars().count() <= max_chars {
        return Some(line);
    }
    let head: String = line.chars().take(max_chars.saturating_sub(3)).collect();
    Some(format!("{head}..."))
}

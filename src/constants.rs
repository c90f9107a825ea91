pub(crate) const DEFAULT_CLAUDE_BIN: &str = "claude";
pub(crate) const DEFAULT_DIFF_TARGET: &str = "main";
pub(crate) const DEFAULT_WORKSPACE_REVISION: &str = "HEAD";
pub(crate) const ORIGIN_REMOTE: &str = "origin";

pub(crate) const CLAUDE_DIR: &str = ".claude";
pub(crate) const WORKSPACES_DIR: &str = "workspaces";
pub(crate) const USER_CLAUDE_CONFIG: &str = ".claude.json";

pub(crate) const CONTEXT_FILES: &[&str] = &[".claude/settings.local.json", "CLAUDE.md"];

pub(crate) const SHORT_COMMIT_LEN: usize = 8;
pub(crate) const STATUS_CLEAN: &str = "Clean";

pub(crate) const PR_TIMEOUT_SECS: u64 = 5;
pub(crate) const INDEX_TIMEOUT_SECS: u64 = 90;
pub(crate) const VERSION_TIMEOUT_SECS: u64 = 10;
pub(crate) const TIMEOUT_POLL_MILLIS: u64 = 25;

pub(crate) const APP_NAME: &str = "Claude Code";
pub(crate) const NOTIFY_SENDER: &str = "com.anthropic.claudefordesktop";
pub(crate) const NOTIFY_ERROR_SOUND: &str = "Basso";
pub(crate) const NOTIFY_MESSAGE_MAX_CHARS: usize = 200;

pub(crate) const COMMIT_MINOR_LINES: usize = 10;
pub(crate) const COMMIT_MODERATE_LINES: usize = 50;
pub(crate) const BINARY_CHANGE_LINES: usize = 10;

pub(crate) const SNAPSHOT_MAX_FILES: usize = 15;
pub(crate) const SNAPSHOT_SHOWN_FILES: usize = 10;

pub(crate) const REPOSITORY_INDEX_START: &str = "<!-- REPOSITORY_INDEX_START -->";
pub(crate) const REPOSITORY_INDEX_END: &str = "<!-- REPOSITORY_INDEX_END -->";

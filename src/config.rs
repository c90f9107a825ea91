use crate::constants::{DEFAULT_CLAUDE_BIN, DEFAULT_DIFF_TARGET, INDEX_TIMEOUT_SECS, PR_TIMEOUT_SECS};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize, Default)]
struct PartialConfig {
    claude_bin: Option<String>,
    diff_target: Option<String>,
    pr_timeout_secs: Option<u64>,
    index_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Config {
    pub(crate) claude_bin: String,
    pub(crate) diff_target: String,
    pub(crate) pr_timeout_secs: u64,
    pub(crate) index_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            claude_bin: DEFAULT_CLAUDE_BIN.to_string(),
            diff_target: DEFAULT_DIFF_TARGET.to_string(),
            pr_timeout_secs: PR_TIMEOUT_SECS,
            index_timeout_secs: INDEX_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub(crate) fn load() -> Result<Self> {
        for path in config_paths() {
            if !path.exists() {
                continue;
            }
            return Self::load_from(&path);
        }
        Ok(Self::default())
    }

    pub(crate) fn load_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    pub(crate) fn from_toml(raw: &str) -> Result<Self> {
        let parsed: PartialConfig = toml::from_str(raw)?;
        let mut config = Self::default();
        if let Some(claude_bin) = parsed.claude_bin
            && !claude_bin.trim().is_empty()
        {
            config.claude_bin = claude_bin.trim().to_string();
        }
        if let Some(diff_target) = parsed.diff_target
            && !diff_target.trim().is_empty()
        {
            config.diff_target = diff_target.trim().to_string();
        }
        if let Some(secs) = parsed.pr_timeout_secs {
            config.pr_timeout_secs = secs;
        }
        if let Some(secs) = parsed.index_timeout_secs {
            config.index_timeout_secs = secs;
        }
        Ok(config)
    }

    pub(crate) fn pr_timeout(&self) -> Duration {
        Duration::from_secs(self.pr_timeout_secs)
    }

    pub(crate) fn index_timeout(&self) -> Duration {
        Duration::from_secs(self.index_timeout_secs)
    }
}

fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("claudectl").join("config.toml"));
    }
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".claudectl.toml"));
    }
    paths
}

use crate::constants::CONTEXT_FILES;
use crate::workspace::Workspace;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Copies untracked assistant files from `source_root` into a fresh workspace.
///
/// Existing destination files are never overwritten. Returns the relative
/// paths that were copied.
pub(crate) fn copy_context(workspace: &Workspace, source_root: &Path) -> Result<Vec<String>> {
    copy_context_into(&workspace.path, source_root)
}

pub(crate) fn copy_context_into(dest_root: &Path, source_root: &Path) -> Result<Vec<String>> {
    let mut copied = Vec::new();
    for rel in CONTEXT_FILES {
        let src = source_root.join(rel);
        let dst = dest_root.join(rel);
        if !src.is_file() {
            continue;
        }
        if dst.exists() {
            debug!(file = rel, "context file already present");
            continue;
        }
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::copy(&src, &dst).with_context(|| {
            format!("failed to copy {} to {}", src.display(), dst.display())
        })?;
        copied.push((*rel).to_string());
    }
    Ok(copied)
}

// src/vcs/mod.rs

//! Version-control precondition consulted before every pipeline run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{self, VroomifyError};
use crate::fs::FileSystem;

/// Answers whether a rebase is currently in progress.
pub trait RebaseGuard: Send + Sync {
    fn rebase_in_progress(&self) -> Result<bool>;
}

/// Rebase detection for a git repository.
///
/// git keeps `rebase-merge/` (interactive and merge-based rebases) or
/// `rebase-apply/` (`git am` style) inside the git directory while a rebase
/// is stopped.
#[derive(Clone)]
pub struct GitRebaseGuard {
    git_dir: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl fmt::Debug for GitRebaseGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitRebaseGuard")
            .field("git_dir", &self.git_dir)
            .finish_non_exhaustive()
    }
}

impl GitRebaseGuard {
    pub fn new(git_dir: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            git_dir: git_dir.into(),
            fs,
        }
    }

    /// Locate the git directory of the repository containing `root`.
    ///
    /// Failing to find one is fatal for the watcher as a whole.
    pub async fn discover(root: &Path, fs: Arc<dyn FileSystem>) -> errors::Result<Self> {
        let output = Command::new("git")
            .args(["rev-parse", "--absolute-git-dir"])
            .current_dir(root)
            .output()
            .await
            .map_err(|e| {
                VroomifyError::RepositoryNotFound(format!("{} (could not run git: {e})", root.display()))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VroomifyError::RepositoryNotFound(format!(
                "{} ({})",
                root.display(),
                stderr.trim()
            )));
        }

        let git_dir = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if git_dir.is_empty() {
            return Err(VroomifyError::RepositoryNotFound(root.display().to_string()));
        }

        info!(git_dir = %git_dir, "found git repository");
        Ok(Self::new(git_dir, fs))
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }
}

impl RebaseGuard for GitRebaseGuard {
    fn rebase_in_progress(&self) -> Result<bool> {
        let in_progress = ["rebase-merge", "rebase-apply"]
            .iter()
            .any(|marker| self.fs.is_dir(&self.git_dir.join(marker)));
        debug!(in_progress, "checked rebase state");
        Ok(in_progress)
    }
}

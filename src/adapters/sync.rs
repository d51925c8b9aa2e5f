//! Shared-state synchronization through a git working copy.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::domain::models::SyncConfig;
use crate::domain::ports::StoreSync;

/// Pulls and pushes the state directory's git repository.
///
/// Failures are logged and reported as `false`; they never stop a tick.
pub struct GitSync {
    repo_dir: String,
    remote: String,
    branch: String,
}

impl GitSync {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            repo_dir: config.repo_dir.clone(),
            remote: config.remote.clone(),
            branch: config.branch.clone(),
        }
    }

    /// Run one git command; `Some(stdout)` on a zero exit.
    async fn git(&self, args: &[&str]) -> Option<String> {
        let output = Command::new("git")
            .current_dir(&self.repo_dir)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {
                Some(String::from_utf8_lossy(&out.stdout).into_owned())
            }
            Ok(out) => {
                tracing::warn!(
                    command = %args.join(" "),
                    stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                    "git command failed"
                );
                None
            }
            Err(e) => {
                tracing::warn!(command = %args.join(" "), error = %e, "Failed to run git");
                None
            }
        }
    }
}

#[async_trait]
impl StoreSync for GitSync {
    async fn pull(&self) -> bool {
        let ok = self
            .git(&["pull", "--rebase", &self.remote, &self.branch])
            .await
            .is_some();
        tracing::debug!(ok, "State pull");
        ok
    }

    async fn push(&self) -> bool {
        if self.git(&["add", "-A"]).await.is_none() {
            return false;
        }

        let Some(status) = self.git(&["status", "--porcelain"]).await else {
            return false;
        };
        if !status.trim().is_empty() {
            let message = format!("edgewise: state update {}", chrono::Utc::now().to_rfc3339());
            if self.git(&["commit", "-m", &message]).await.is_none() {
                return false;
            }
        }

        let ok = self
            .git(&["push", &self.remote, &self.branch])
            .await
            .is_some();
        tracing::debug!(ok, "State push");
        ok
    }
}

/// Sync that does nothing. Used when sync is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSync;

#[async_trait]
impl StoreSync for NoopSync {
    async fn pull(&self) -> bool {
        true
    }

    async fn push(&self) -> bool {
        true
    }
}

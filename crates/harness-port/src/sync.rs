//! Clone-or-pull of the source repository via the `git` binary.

use std::path::Path;
use std::process::Command;

use crate::error::{PortError, Result};

/// Captured output of a successful git invocation.
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run `git <args>` in `cwd`, failing on spawn errors and non-zero exit.
pub fn run_git(cwd: &Path, args: &[&str]) -> Result<GitOutput> {
    let command = args.first().copied().unwrap_or("").to_string();
    let output = Command::new("git")
        .current_dir(cwd)
        .args(args)
        .output()
        .map_err(|e| PortError::Sync {
            command: command.clone(),
            message: format!("failed to execute git: {e}"),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if output.status.success() {
        return Ok(GitOutput { stdout, stderr });
    }
    let code = output.status.code().unwrap_or(-1);
    let detail = if stderr.is_empty() { stdout } else { stderr };
    Err(PortError::Sync {
        command,
        message: format!("exit code {code}: {detail}"),
    })
}

/// What `sync_repository` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Cloned,
    Pulled,
    /// Pull failed; the existing checkout is used as-is.
    Stale,
}

/// Clone `url` into `repo_dir` if absent, otherwise pull.
///
/// A failed clone is fatal. A failed pull is logged and the run continues
/// with whatever is already on disk.
pub fn sync_repository(url: &str, repo_dir: &Path) -> Result<SyncOutcome> {
    if !repo_dir.exists() {
        tracing::info!("cloning {} into '{}'", url, repo_dir.display());
        let parent = match repo_dir.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(|e| PortError::io(parent, e))?;
        let target = repo_dir
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| repo_dir.to_string_lossy());
        run_git(parent, &["clone", url, target.as_ref()])?;
        tracing::info!("clone complete");
        return Ok(SyncOutcome::Cloned);
    }

    tracing::info!("pulling latest changes in '{}'", repo_dir.display());
    match run_git(repo_dir, &["pull"]) {
        Ok(out) => {
            tracing::info!("pull complete");
            if !out.stdout.is_empty() {
                tracing::debug!("git pull: {}", out.stdout);
            }
            if !out.stderr.is_empty() {
                tracing::debug!("git pull (stderr): {}", out.stderr);
            }
            Ok(SyncOutcome::Pulled)
        }
        Err(e) => {
            tracing::warn!("error pulling latest changes: {}", e);
            Ok(SyncOutcome::Stale)
        }
    }
}

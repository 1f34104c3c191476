//! Git collaborator
//!
//! Clones a repository into a destination root, checks out a ref and returns
//! the requested subdirectory of the working tree.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{PlugwrightError, Result};

pub trait GitFetcher {
    /// Clone `url` into `destination`, check out `git_ref` when given and
    /// return `destination/subdir`.
    fn clone_and_checkout(
        &self,
        url: &str,
        destination: &Path,
        git_ref: Option<&str>,
        subdir: &str,
    ) -> Result<PathBuf>;
}

/// Shells out to the `git` binary
#[derive(Debug, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, args: &[&str], cwd: Option<&Path>) -> Result<()> {
        let mut cmd = Command::new("git");
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .map_err(|e| PlugwrightError::Git(format!("failed to run git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PlugwrightError::Git(format!(
                "git {} failed: {}",
                args.first().copied().unwrap_or_default(),
                stderr.trim()
            )));
        }

        Ok(())
    }
}

impl GitFetcher for GitCli {
    fn clone_and_checkout(
        &self,
        url: &str,
        destination: &Path,
        git_ref: Option<&str>,
        subdir: &str,
    ) -> Result<PathBuf> {
        fs::create_dir_all(destination.parent().unwrap_or(destination))?;

        let dest = destination.to_string_lossy();
        match git_ref {
            // A ref may be a commit, so clone fully before checking out
            Some(r) => {
                self.run(&["clone", url, &dest], None)?;
                self.run(&["checkout", r], Some(destination))?;
            }
            None => self.run(&["clone", "--depth", "1", url, &dest], None)?,
        }
        tracing::debug!(%url, git_ref = git_ref.unwrap_or("HEAD"), "cloned repository");

        let checkout = destination.join(subdir);
        if !checkout.is_dir() {
            return Err(PlugwrightError::SourceMissing { path: checkout });
        }
        Ok(checkout)
    }
}

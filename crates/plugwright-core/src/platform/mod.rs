//! Platform abstraction for native project trees
//!
//! A [`PlatformProject`] owns one platform's directory under
//! `<project>/platforms/<id>`. Platform-specific munging (manifest
//! attributes, resources, web assets) lives in each implementation; plugin
//! file installation and its exact-inverse uninstall are shared here.

pub mod android;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::document::XmlDocument;
use crate::error::{PlugwrightError, Result};
use crate::fs_util;
use crate::ledger::{compute_file_hash, Mutation};
use crate::plugin::PluginDescriptor;
use crate::project::ProjectConfig;

pub use android::{AndroidProject, OrientationPolicy};

/// Directory under the project root holding platform projects
pub const PLATFORMS_DIR: &str = "platforms";

/// Target platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Android,
}

impl Platform {
    /// Get platform name for display
    pub fn name(&self) -> &'static str {
        match self {
            Self::Android => "Android",
        }
    }

    /// Get short identifier
    pub fn id(&self) -> &'static str {
        match self {
            Self::Android => "android",
        }
    }

    /// Get all supported platforms
    pub fn all() -> &'static [Platform] {
        &[Platform::Android]
    }

    /// Platform project rooted under `project_root`
    pub fn project(&self, project_root: &Path) -> Box<dyn PlatformProject> {
        match self {
            Self::Android => Box::new(AndroidProject::new(project_root)),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Platform {
    type Err = PlugwrightError;

    fn from_str(s: &str) -> Result<Self> {
        Platform::all()
            .iter()
            .copied()
            .find(|p| p.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| PlugwrightError::UnknownPlatform {
                name: s.to_string(),
            })
    }
}

/// Outcome of reversing an install. Individual failures are logged and
/// counted, never raised.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UninstallReport {
    pub removed_files: usize,
    pub removed_dirs: usize,
    pub reverted_patches: usize,
    /// Targets that were already gone
    pub missing: Vec<PathBuf>,
    /// Files removed even though their content changed since install
    pub modified: Vec<PathBuf>,
    /// Files left in place because they do not match the plugin's content
    pub kept: Vec<PathBuf>,
    /// Targets whose removal failed
    pub failed: Vec<PathBuf>,
}

pub trait PlatformProject {
    fn platform(&self) -> Platform;

    /// Platform project root, `<project>/platforms/<id>`
    fn root(&self) -> &Path;

    /// Directories the uninstall cascade must never remove
    fn protected_dirs(&self) -> Vec<PathBuf>;

    /// Write project configuration (name, id, version, preferences, splash
    /// images) into the native project files
    fn update_from_config(&self, config: &ProjectConfig) -> Result<()>;

    /// Replace the platform copy of the web assets with the project's
    fn update_web_assets(&self) -> Result<()>;

    /// Merge platform overrides over the synced web assets. Returns the
    /// number of files written (zero when there is no overrides directory).
    fn apply_overrides(&self) -> Result<usize>;

    /// Remove version-control artifacts from the synced web assets
    fn housekeeping(&self) -> Result<usize>;

    fn run_full_update(&self, config: &ProjectConfig) -> Result<()> {
        self.update_from_config(config)?;
        self.update_web_assets()?;
        let overridden = self.apply_overrides()?;
        let cleaned = self.housekeeping()?;
        tracing::info!(
            platform = %self.platform(),
            overridden,
            cleaned,
            "platform project updated"
        );
        Ok(())
    }

    /// Copy (or link) the descriptor's files and apply its document patches
    /// for this platform. Every change is pushed to `journal` as soon as it
    /// is made, so a failure leaves an accurate record of what was applied.
    fn install_plugin(
        &self,
        descriptor: &PluginDescriptor,
        link: bool,
        journal: &mut Vec<Mutation>,
    ) -> Result<()> {
        let root = self.root();
        let platform = self.platform().id();

        for file in descriptor.files_for(platform) {
            let src = descriptor.directory.join(&file.source);
            if !src.is_file() {
                return Err(PlugwrightError::SourceMissing { path: src });
            }
            let dst = root.join(&file.target);
            if fs::symlink_metadata(&dst).is_ok() {
                return Err(PlugwrightError::TargetExists { path: dst });
            }

            for dir in fs_util::missing_ancestors(&dst, root) {
                fs::create_dir(&dir)?;
                journal.push(Mutation::DirectoryCreated {
                    path: relative_to(&dir, root),
                });
            }

            if link {
                fs_util::symlink_file(&fs::canonicalize(&src)?, &dst)?;
                journal.push(Mutation::FileLinked {
                    src: file.source.clone(),
                    dst: file.target.clone(),
                });
            } else {
                fs::copy(&src, &dst)?;
                journal.push(Mutation::FileCopied {
                    src: file.source.clone(),
                    dst: file.target.clone(),
                    sha256: compute_file_hash(&dst)?,
                });
            }
            tracing::debug!(file = %file.target.display(), link, "installed plugin file");
        }

        for patch in descriptor.edits_for(platform) {
            let path = root.join(&patch.file);
            if !path.is_file() {
                return Err(PlugwrightError::DocumentPatch {
                    file: patch.file.clone(),
                    message: "document does not exist".to_string(),
                });
            }
            let mut doc = XmlDocument::load(&path)?;
            if doc.apply_patch(patch)? {
                doc.save(&path)?;
                journal.push(Mutation::DocumentPatched {
                    file: patch.file.clone(),
                    patch: patch.clone(),
                });
            }
        }

        Ok(())
    }

    /// Mutations an install of `descriptor` would record, for reversing an
    /// install that has no ledger entry. Content hashes are taken from the
    /// plugin's own source files; unreadable sources get an empty hash.
    fn planned_mutations(&self, descriptor: &PluginDescriptor) -> Vec<Mutation> {
        let platform = self.platform().id();
        let files = descriptor.files_for(platform).map(|f| Mutation::FileCopied {
            src: f.source.clone(),
            dst: f.target.clone(),
            sha256: compute_file_hash(&descriptor.directory.join(&f.source)).unwrap_or_default(),
        });
        let edits = descriptor
            .edits_for(platform)
            .map(|p| Mutation::DocumentPatched {
                file: p.file.clone(),
                patch: p.clone(),
            });
        files.chain(edits).collect()
    }

    /// Undo a recorded install in reverse order. Missing targets are
    /// tolerated; every directory emptied by a removal is removed up to the
    /// protected roots.
    fn uninstall_plugin(&self, mutations: &[Mutation]) -> UninstallReport {
        reverse_mutations(self.root(), &self.protected_dirs(), mutations, Ownership::Recorded)
    }

    /// Undo an install known only from `descriptor`. Files whose content
    /// does not match the plugin's source are left in place.
    fn uninstall_planned(&self, descriptor: &PluginDescriptor) -> UninstallReport {
        let mutations = self.planned_mutations(descriptor);
        reverse_mutations(self.root(), &self.protected_dirs(), &mutations, Ownership::Planned)
    }
}

/// Where a mutation list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ownership {
    /// Journaled while installing; every file in it was created by us
    Recorded,
    /// Derived from a descriptor; a file is ours only if its content matches
    Planned,
}

fn reverse_mutations(
    root: &Path,
    protected: &[PathBuf],
    mutations: &[Mutation],
    ownership: Ownership,
) -> UninstallReport {
    let mut report = UninstallReport::default();

    for mutation in mutations.iter().rev() {
        match mutation {
            Mutation::FileCopied { dst, sha256, .. } => {
                let path = root.join(dst);
                if fs::symlink_metadata(&path).is_err() {
                    report.missing.push(dst.clone());
                    continue;
                }
                let current = compute_file_hash(&path).ok();
                match ownership {
                    Ownership::Planned
                        if sha256.is_empty() || current.as_deref() != Some(sha256.as_str()) =>
                    {
                        tracing::warn!(
                            file = %dst.display(),
                            "keeping file not installed by this plugin"
                        );
                        report.kept.push(dst.clone());
                        continue;
                    }
                    Ownership::Recorded
                        if !sha256.is_empty()
                            && current.as_deref().is_some_and(|c| c != sha256.as_str()) =>
                    {
                        tracing::warn!(
                            file = %dst.display(),
                            "removing file modified since install"
                        );
                        report.modified.push(dst.clone());
                    }
                    _ => {}
                }
                remove_file(&path, dst, root, protected, &mut report);
            }
            Mutation::FileLinked { dst, .. } => {
                let path = root.join(dst);
                if fs::symlink_metadata(&path).is_err() {
                    report.missing.push(dst.clone());
                    continue;
                }
                remove_file(&path, dst, root, protected, &mut report);
            }
            Mutation::DirectoryCreated { path } => {
                let dir = root.join(path);
                if !dir.is_dir() {
                    continue;
                }
                report.removed_dirs += fs_util::remove_empty_ancestors(&dir, root, protected).len();
            }
            Mutation::DocumentPatched { file, patch } => {
                let path = root.join(file);
                let reverted = XmlDocument::load(&path).and_then(|mut doc| {
                    let removed = doc.revert_patch(patch);
                    if removed > 0 {
                        doc.save(&path)?;
                    }
                    Ok(removed)
                });
                match reverted {
                    Ok(removed) => report.reverted_patches += removed,
                    Err(e) if !path.exists() => {
                        tracing::warn!(file = %file.display(), "patched document missing: {}", e);
                        report.missing.push(file.clone());
                    }
                    Err(e) => {
                        tracing::warn!(file = %file.display(), "failed to revert patch: {}", e);
                        report.failed.push(file.clone());
                    }
                }
            }
        }
    }

    report
}

fn remove_file(
    path: &Path,
    relative: &Path,
    root: &Path,
    protected: &[PathBuf],
    report: &mut UninstallReport,
) {
    if let Err(e) = fs_util::remove_path(path) {
        tracing::warn!(file = %relative.display(), "failed to remove: {}", e);
        report.failed.push(relative.to_path_buf());
        return;
    }
    report.removed_files += 1;
    if let Some(parent) = path.parent() {
        report.removed_dirs += fs_util::remove_empty_ancestors(parent, root, protected).len();
    }
}

fn relative_to(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

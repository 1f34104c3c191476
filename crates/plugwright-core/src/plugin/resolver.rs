//! Source Resolver
//!
//! Turns a parsed reference into a local source directory plus provenance.
//! Non-git precedence: existing local path, then the local plugin index,
//! then the registry (unless disabled). Registry results are never linkable.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{PlugwrightError, Result};
use crate::plugin::git::GitFetcher;
use crate::plugin::index::LocalPluginIndex;
use crate::plugin::registry::RegistryClient;
use crate::plugin::types::{FetchOptions, PluginReference, ProvenanceSource, Resolution};

pub struct SourceResolver {
    index: LocalPluginIndex,
    registry: Option<Box<dyn RegistryClient>>,
    git: Box<dyn GitFetcher>,
    scratch_root: PathBuf,
}

impl SourceResolver {
    pub fn new(
        index: LocalPluginIndex,
        registry: Option<Box<dyn RegistryClient>>,
        git: Box<dyn GitFetcher>,
    ) -> Self {
        Self {
            index,
            registry,
            git,
            scratch_root: std::env::temp_dir(),
        }
    }

    /// Directory under which git clones are made (system temp by default)
    pub fn with_scratch_root(mut self, scratch_root: PathBuf) -> Self {
        self.scratch_root = scratch_root;
        self
    }

    pub fn index(&self) -> &LocalPluginIndex {
        &self.index
    }

    pub fn resolve(
        &self,
        reference: &PluginReference,
        options: &FetchOptions,
    ) -> Result<Resolution> {
        match reference {
            PluginReference::GitSource {
                url,
                git_ref,
                subdir,
            } => {
                if options.link {
                    return Err(PlugwrightError::UnsupportedOperation {
                        message: format!("--link is not supported for git sources ({})", url),
                    });
                }
                self.resolve_git(url, git_ref.as_deref(), subdir)
            }
            PluginReference::LocalPath { path } => {
                let raw = path.to_string_lossy();
                self.resolve_non_git(&raw, &raw, options)
            }
            PluginReference::RegistryId { id, .. } => {
                self.resolve_non_git(&reference.to_string(), id, options)
            }
        }
    }

    fn resolve_git(&self, url: &str, git_ref: Option<&str>, subdir: &str) -> Result<Resolution> {
        let scratch = self
            .scratch_root
            .join(format!("plugwright-git-{}", Uuid::new_v4()));

        let source_dir = match self
            .git
            .clone_and_checkout(url, &scratch, git_ref, subdir)
        {
            Ok(dir) => dir,
            Err(e) => {
                let _ = fs::remove_dir_all(&scratch);
                return Err(e);
            }
        };

        Ok(Resolution {
            source_dir,
            provenance: ProvenanceSource::Git {
                url: url.to_string(),
                subdir: subdir.to_string(),
                git_ref: git_ref.map(str::to_string),
            },
            linkable: false,
            scratch_dir: Some(scratch),
        })
    }

    fn resolve_non_git(
        &self,
        raw: &str,
        lookup_id: &str,
        options: &FetchOptions,
    ) -> Result<Resolution> {
        let candidate = Path::new(raw).join(&options.subdir);
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "resolved to local path");
            return Ok(Resolution {
                source_dir: candidate,
                provenance: ProvenanceSource::Local {
                    path: raw.to_string(),
                    subdir: options.subdir.clone(),
                },
                linkable: true,
                scratch_dir: None,
            });
        }

        if let Some(descriptor) = self.index.resolve(lookup_id, &options.search_path) {
            tracing::debug!(
                id = %lookup_id,
                path = %descriptor.directory.display(),
                "resolved from search path"
            );
            return Ok(Resolution {
                source_dir: descriptor.directory.clone(),
                provenance: ProvenanceSource::Local {
                    path: descriptor.directory.to_string_lossy().to_string(),
                    subdir: ".".to_string(),
                },
                linkable: true,
                scratch_dir: None,
            });
        }

        if options.no_registry {
            return Err(PlugwrightError::NotFound {
                reference: raw.to_string(),
            });
        }

        let Some(registry) = &self.registry else {
            return Err(PlugwrightError::NotFound {
                reference: raw.to_string(),
            });
        };

        let source_dir = registry.fetch(&[raw.to_string()])?;
        tracing::debug!(%raw, path = %source_dir.display(), "resolved from registry");
        Ok(Resolution {
            source_dir,
            provenance: ProvenanceSource::Registry {
                id: raw.to_string(),
            },
            linkable: false,
            scratch_dir: None,
        })
    }
}

//! Plugin Registry
//!
//! The registry collaborator fetches a plugin by `id[@version]` into a local
//! directory. Transport is the implementor's concern; failures surface as
//! `NotFound` or `Network`.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PlugwrightError, Result};
use crate::plugin::descriptor::PluginDescriptor;
use crate::plugin::reference::split_id_version;

/// Fetch-by-id-and-version collaborator
pub trait RegistryClient {
    /// Fetch the first of `identifiers` (each `id` or `id@version`) and
    /// return the local directory holding it.
    fn fetch(&self, identifiers: &[String]) -> Result<PathBuf>;
}

/// Registry backed by a directory laid out as `<root>/<id>/<version>/`
pub struct DirectoryRegistry {
    root: PathBuf,
}

impl DirectoryRegistry {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Versions published for `id`, highest first
    pub fn versions(&self, id: &str) -> Result<Vec<String>> {
        let dir = self.root.join(id);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.path().is_dir() && PluginDescriptor::exists_in(&entry.path()) {
                versions.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        versions.sort_by(|a, b| compare_versions(b, a));
        Ok(versions)
    }

    fn lookup(&self, identifier: &str) -> Result<Option<PathBuf>> {
        let (id, version) = split_id_version(identifier);
        let chosen = match version {
            Some(v) => Some(v.to_string()),
            None => self.versions(id)?.into_iter().next(),
        };

        Ok(chosen
            .map(|v| self.root.join(id).join(v))
            .filter(|p| PluginDescriptor::exists_in(p)))
    }
}

impl RegistryClient for DirectoryRegistry {
    fn fetch(&self, identifiers: &[String]) -> Result<PathBuf> {
        if !self.root.is_dir() {
            return Err(PlugwrightError::Network(format!(
                "registry directory unavailable: {}",
                self.root.display()
            )));
        }

        for identifier in identifiers {
            if let Some(dir) = self.lookup(identifier)? {
                tracing::debug!(%identifier, path = %dir.display(), "registry hit");
                return Ok(dir);
            }
        }

        Err(PlugwrightError::NotFound {
            reference: identifiers.join(", "),
        })
    }
}

/// Compare dotted versions numerically where both components are numbers,
/// lexically otherwise.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split(['.', '-']);
    let mut right = b.split(['.', '-']);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(l), Some(r)) => {
                let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(l), Ok(r)) => l.cmp(&r),
                    _ => l.cmp(r),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

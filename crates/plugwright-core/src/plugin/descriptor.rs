//! Plugin Descriptor
//!
//! Parses a plugin's `plugin.json` manifest. A descriptor is immutable once
//! loaded; callers re-read it from disk rather than mutate it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::document::DocumentPatch;
use crate::error::{PlugwrightError, Result};
use crate::plugin::reference;
use crate::plugin::types::{FetchOptions, PluginReference};

/// Manifest file name inside a plugin directory
pub const MANIFEST_FILE: &str = "plugin.json";

#[derive(Debug, Deserialize)]
struct RawManifest {
    id: String,
    version: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    platforms: BTreeMap<String, RawPlatform>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPlatform {
    #[serde(default)]
    files: Vec<RawFile>,
    #[serde(default)]
    edits: Vec<DocumentPatch>,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    src: String,
    target: String,
}

/// A file the plugin copies into a platform project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredFile {
    /// Path relative to the plugin directory
    pub source: PathBuf,
    /// Path relative to the platform project root
    pub target: PathBuf,
    pub platform: String,
}

/// A structured-document edit scoped to one platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEdit {
    pub platform: String,
    pub patch: DocumentPatch,
}

/// Parsed plugin manifest
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    pub id: String,
    pub version: String,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Directory the manifest was read from
    pub directory: PathBuf,
    pub declared_files: Vec<DeclaredFile>,
    pub config_edits: Vec<ConfigEdit>,
    pub dependencies: Vec<PluginReference>,
}

impl PluginDescriptor {
    /// Path of the manifest inside `dir`
    pub fn manifest_path(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE)
    }

    /// Whether `dir` contains a plugin manifest
    pub fn exists_in(dir: &Path) -> bool {
        Self::manifest_path(dir).is_file()
    }

    /// Load the descriptor from `dir/plugin.json`
    pub fn load(dir: &Path) -> Result<Self> {
        let path = Self::manifest_path(dir);
        if !path.is_file() {
            return Err(PlugwrightError::ManifestNotFound {
                path: dir.to_path_buf(),
            });
        }

        let content = fs::read_to_string(&path)?;
        let raw: RawManifest =
            serde_json::from_str(&content).map_err(|e| PlugwrightError::ManifestParse {
                path: path.clone(),
                message: e.to_string(),
            })?;

        if raw.id.trim().is_empty() {
            return Err(PlugwrightError::ManifestParse {
                path,
                message: "plugin id must not be empty".to_string(),
            });
        }

        let mut declared_files = Vec::new();
        let mut config_edits = Vec::new();
        for (platform, spec) in raw.platforms {
            for file in spec.files {
                let source = PathBuf::from(&file.src);
                let target = resolve_target(&file.src, &file.target);
                declared_files.push(DeclaredFile {
                    source,
                    target,
                    platform: platform.clone(),
                });
            }
            for patch in spec.edits {
                config_edits.push(ConfigEdit {
                    platform: platform.clone(),
                    patch,
                });
            }
        }

        let mut dependencies = Vec::new();
        for dep in &raw.dependencies {
            let mut options = FetchOptions::default();
            let parsed = match reference::parse(dep, &mut options)? {
                PluginReference::LocalPath { path } if path.is_relative() => {
                    PluginReference::LocalPath {
                        path: dir.join(path),
                    }
                }
                other => other,
            };
            dependencies.push(parsed);
        }

        Ok(Self {
            id: raw.id,
            version: raw.version,
            name: raw.name,
            description: raw.description,
            directory: dir.to_path_buf(),
            declared_files,
            config_edits,
            dependencies,
        })
    }

    /// `id@version`
    pub fn identity(&self) -> String {
        format!("{}@{}", self.id, self.version)
    }

    pub fn files_for<'a>(&'a self, platform: &'a str) -> impl Iterator<Item = &'a DeclaredFile> {
        self.declared_files
            .iter()
            .filter(move |f| f.platform == platform)
    }

    pub fn edits_for<'a>(&'a self, platform: &'a str) -> impl Iterator<Item = &'a DocumentPatch> {
        self.config_edits
            .iter()
            .filter(move |e| e.platform == platform)
            .map(|e| &e.patch)
    }
}

/// A target ending in a separator names a directory; the source file name
/// is appended.
fn resolve_target(src: &str, target: &str) -> PathBuf {
    if target.ends_with('/') || target.ends_with('\\') {
        let file_name = Path::new(src)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_default();
        PathBuf::from(target.trim_end_matches(['/', '\\'])).join(file_name)
    } else {
        PathBuf::from(target)
    }
}

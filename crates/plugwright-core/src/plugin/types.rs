//! Plugin source type definitions
//!
//! Types shared by the reference parser, resolver, materializer and fetcher.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default subdirectory inside a plugin source
pub const DEFAULT_SUBDIR: &str = ".";

/// A parsed plugin reference. Produced once by the reference parser and
/// matched exhaustively downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginReference {
    /// Git repository with optional ref and subdirectory
    GitSource {
        url: String,
        git_ref: Option<String>,
        subdir: String,
    },
    /// Filesystem path (relative or absolute)
    LocalPath { path: PathBuf },
    /// Bare identifier, optionally `id@version`
    RegistryId {
        id: String,
        version_spec: Option<String>,
    },
}

impl PluginReference {
    /// Whether this reference points at a git repository
    pub fn is_git(&self) -> bool {
        matches!(self, Self::GitSource { .. })
    }

    /// Expected identity for a registry reference (`id` or `id@version`)
    pub fn expected_id(&self) -> Option<String> {
        match self {
            Self::RegistryId {
                id,
                version_spec: Some(version),
            } => Some(format!("{}@{}", id, version)),
            Self::RegistryId { id, .. } => Some(id.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for PluginReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GitSource {
                url,
                git_ref,
                subdir,
            } => {
                write!(f, "{}", url)?;
                let has_subdir = subdir != DEFAULT_SUBDIR && !subdir.is_empty();
                if git_ref.is_some() || has_subdir {
                    write!(f, "#{}", git_ref.as_deref().unwrap_or(""))?;
                    if has_subdir {
                        write!(f, ":{}", subdir)?;
                    }
                }
                Ok(())
            }
            Self::LocalPath { path } => write!(f, "{}", path.display()),
            Self::RegistryId {
                id,
                version_spec: Some(version),
            } => write!(f, "{}@{}", id, version),
            Self::RegistryId { id, .. } => write!(f, "{}", id),
        }
    }
}

/// Options controlling how a reference is fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Install by symlink instead of copy (rejected for git sources)
    pub link: bool,
    /// Subdirectory of the source that holds the plugin
    pub subdir: String,
    /// Git ref (branch, tag or commit)
    pub git_ref: Option<String>,
    /// Directories scanned by the local plugin index, in order
    pub search_path: Vec<PathBuf>,
    /// Disable the registry fallback
    pub no_registry: bool,
    /// Expected identity, `id` or `id@version`
    pub expected_id: Option<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            link: false,
            subdir: DEFAULT_SUBDIR.to_string(),
            git_ref: None,
            search_path: Vec::new(),
            no_registry: false,
            expected_id: None,
        }
    }
}

/// How a materialized plugin was obtained
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProvenanceSource {
    Git {
        url: String,
        subdir: String,
        #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
        git_ref: Option<String>,
    },
    Local {
        path: String,
        subdir: String,
    },
    Registry {
        id: String,
    },
}

impl ProvenanceSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Git { .. } => SourceKind::Git,
            Self::Local { .. } => SourceKind::Local,
            Self::Registry { .. } => SourceKind::Registry,
        }
    }
}

/// Source kind of a provenance record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Git,
    Local,
    Registry,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Git => write!(f, "git"),
            Self::Local => write!(f, "local"),
            Self::Registry => write!(f, "registry"),
        }
    }
}

/// Persisted record of where a materialized plugin came from.
/// Diagnostics only; never consulted for identity checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub source: ProvenanceSource,
    pub fetched_at: String,
}

impl ProvenanceRecord {
    pub fn new(source: ProvenanceSource) -> Self {
        Self {
            source,
            fetched_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Output of the source resolver
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Directory holding the plugin source
    pub source_dir: PathBuf,
    /// Where the source came from
    pub provenance: ProvenanceSource,
    /// Whether the source may be symlinked instead of copied
    pub linkable: bool,
    /// Temporary directory to remove once the source has been materialized
    pub scratch_dir: Option<PathBuf>,
}

/// A plugin placed in the store by the fetch pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPlugin {
    /// Store entry, `<plugins_dir>/<id>`
    pub directory: PathBuf,
    /// Whether the entry links to its source instead of holding a copy
    pub linked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_reference_display_with_fragment() {
        let reference = PluginReference::GitSource {
            url: "https://example.com/camera.git".to_string(),
            git_ref: Some("v2".to_string()),
            subdir: "plugin".to_string(),
        };
        assert_eq!(
            reference.to_string(),
            "https://example.com/camera.git#v2:plugin"
        );
    }

    #[test]
    fn test_git_reference_display_without_fragment() {
        let reference = PluginReference::GitSource {
            url: "https://example.com/camera.git".to_string(),
            git_ref: None,
            subdir: DEFAULT_SUBDIR.to_string(),
        };
        assert_eq!(reference.to_string(), "https://example.com/camera.git");
    }

    #[test]
    fn test_registry_expected_id() {
        let reference = PluginReference::RegistryId {
            id: "org.example.camera".to_string(),
            version_spec: Some("1.2.3".to_string()),
        };
        assert_eq!(
            reference.expected_id().as_deref(),
            Some("org.example.camera@1.2.3")
        );
        assert!(!reference.is_git());
    }

    #[test]
    fn test_provenance_serialization() {
        let record = ProvenanceRecord {
            source: ProvenanceSource::Git {
                url: "https://example.com/x.git".to_string(),
                subdir: ".".to_string(),
                git_ref: Some("main".to_string()),
            },
            fetched_at: "2025-01-01T00:00:00+00:00".to_string(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""type":"git""#));
        assert!(json.contains(r#""ref":"main""#));
        assert!(json.contains(r#""fetched_at":"2025-01-01T00:00:00+00:00""#));

        let parsed: ProvenanceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
        assert_eq!(parsed.source.kind(), SourceKind::Git);
    }
}

//! Installed Plugin Ledger
//!
//! Per-project record of which plugins are installed on which platform and
//! the exact mutations each install performed, in order. Uninstall replays
//! these in reverse instead of re-deriving them from the plugin descriptor.
//!
//! Stored as JSON at `<project>/plugins/installed_plugins.json`. Paths in
//! mutations are relative to the platform project root.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::document::DocumentPatch;
use crate::error::{PlugwrightError, Result};

const LEDGER_FILE: &str = "installed_plugins.json";
const LEDGER_VERSION: u32 = 1;

/// A single reversible change made to a platform project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Mutation {
    /// File copied from the plugin; `src` is relative to the plugin directory
    FileCopied {
        src: PathBuf,
        dst: PathBuf,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        sha256: String,
    },
    FileLinked {
        src: PathBuf,
        dst: PathBuf,
    },
    DirectoryCreated {
        path: PathBuf,
    },
    DocumentPatched {
        file: PathBuf,
        patch: DocumentPatch,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallStatus {
    Complete,
    /// Install failed midway; mutations lists what was applied before the failure
    Partial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationRecord {
    pub id: String,
    pub version: String,
    pub platform: String,
    pub status: InstallStatus,
    pub installed_at: String,
    #[serde(default)]
    pub mutations: Vec<Mutation>,
}

impl InstallationRecord {
    pub fn new(
        id: &str,
        version: &str,
        platform: &str,
        status: InstallStatus,
        mutations: Vec<Mutation>,
    ) -> Self {
        Self {
            id: id.to_string(),
            version: version.to_string(),
            platform: platform.to_string(),
            status,
            installed_at: Utc::now().to_rfc3339(),
            mutations,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == InstallStatus::Complete
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    /// platform -> plugin id -> record
    #[serde(default)]
    records: BTreeMap<String, BTreeMap<String, InstallationRecord>>,
}

impl Default for LedgerFile {
    fn default() -> Self {
        Self {
            version: LEDGER_VERSION,
            records: BTreeMap::new(),
        }
    }
}

pub struct InstalledPluginLedger {
    path: PathBuf,
    file: LedgerFile,
}

impl InstalledPluginLedger {
    /// Load the ledger kept in `plugins_dir`. A missing file is an empty ledger.
    pub fn load(plugins_dir: &Path) -> Result<Self> {
        let path = plugins_dir.join(LEDGER_FILE);
        let file = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content).map_err(|e| PlugwrightError::ConfigParse {
                path: path.clone(),
                message: e.to_string(),
            })?
        } else {
            LedgerFile::default()
        };
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.file)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Store (or replace) a record and persist immediately
    pub fn record(&mut self, record: InstallationRecord) -> Result<()> {
        tracing::debug!(
            id = %record.id,
            platform = %record.platform,
            status = ?record.status,
            mutations = record.mutations.len(),
            "recording installation"
        );
        self.file
            .records
            .entry(record.platform.clone())
            .or_default()
            .insert(record.id.clone(), record);
        self.save()
    }

    pub fn get(&self, id: &str, platform: &str) -> Option<&InstallationRecord> {
        self.file.records.get(platform).and_then(|m| m.get(id))
    }

    /// Mutations recorded for an install, in the order they were applied
    pub fn mutations_for(&self, id: &str, platform: &str) -> Option<&[Mutation]> {
        self.get(id, platform).map(|r| r.mutations.as_slice())
    }

    /// True only for a complete install
    pub fn is_installed(&self, id: &str, platform: &str) -> bool {
        self.get(id, platform).is_some_and(InstallationRecord::is_complete)
    }

    /// Whether any platform still has a record for `id`
    pub fn installed_anywhere(&self, id: &str) -> bool {
        self.file.records.values().any(|m| m.contains_key(id))
    }

    /// Remove a record and persist. Returns the removed record.
    pub fn clear(&mut self, id: &str, platform: &str) -> Result<Option<InstallationRecord>> {
        let removed = self
            .file
            .records
            .get_mut(platform)
            .and_then(|m| m.remove(id));
        if removed.is_some() {
            self.file.records.retain(|_, m| !m.is_empty());
            self.save()?;
        }
        Ok(removed)
    }

    /// Records for one platform, sorted by id
    pub fn list(&self, platform: &str) -> Vec<&InstallationRecord> {
        self.file
            .records
            .get(platform)
            .map(|m| m.values().collect())
            .unwrap_or_default()
    }
}

/// SHA-256 of a file's content, hex encoded
pub fn compute_file_hash(path: &Path) -> io::Result<String> {
    let content = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(hex::encode(hasher.finalize()))
}

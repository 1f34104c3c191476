//! Plugin Materializer
//!
//! Places a resolved source tree into the project's plugin store under its
//! canonical id, replacing whatever was there, and records provenance in
//! `<plugins_dir>/fetch.json`.
//!
//! Materializing the same id concurrently is not supported.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PlugwrightError, Result};
use crate::fs_util;
use crate::plugin::descriptor::PluginDescriptor;
use crate::plugin::types::{ProvenanceRecord, ProvenanceSource};

const PROVENANCE_FILE: &str = "fetch.json";

/// Provenance records of a plugin store, keyed by plugin id
pub struct ProvenanceStore {
    plugins_dir: PathBuf,
}

impl ProvenanceStore {
    pub fn new(plugins_dir: &Path) -> Self {
        Self {
            plugins_dir: plugins_dir.to_path_buf(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.plugins_dir.join(PROVENANCE_FILE)
    }

    pub fn load(&self) -> Result<BTreeMap<String, ProvenanceRecord>> {
        let path = self.path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| PlugwrightError::ConfigParse {
            path,
            message: e.to_string(),
        })
    }

    fn save(&self, records: &BTreeMap<String, ProvenanceRecord>) -> Result<()> {
        fs::create_dir_all(&self.plugins_dir)?;
        let content = serde_json::to_string_pretty(records)?;
        fs::write(self.path(), content)?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<ProvenanceRecord>> {
        Ok(self.load()?.remove(id))
    }

    pub fn record(&self, id: &str, record: ProvenanceRecord) -> Result<()> {
        let mut records = self.load()?;
        records.insert(id.to_string(), record);
        self.save(&records)
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        let mut records = self.load()?;
        if records.remove(id).is_some() {
            self.save(&records)?;
        }
        Ok(())
    }
}

pub struct Materializer {
    plugins_dir: PathBuf,
}

impl Materializer {
    pub fn new(plugins_dir: PathBuf) -> Self {
        Self { plugins_dir }
    }

    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    pub fn provenance(&self) -> ProvenanceStore {
        ProvenanceStore::new(&self.plugins_dir)
    }

    /// Copy (or link) `source_dir` to `<plugins_dir>/<id>` and return it.
    /// Any previous contents at the destination are removed first.
    ///
    /// A source that already is the store entry is kept in place. A source
    /// that contains the store entry (or lies inside it) can only be linked.
    pub fn materialize(
        &self,
        source_dir: &Path,
        link: bool,
        provenance: ProvenanceSource,
    ) -> Result<PathBuf> {
        let descriptor = PluginDescriptor::load(source_dir)?;
        let final_dir = self.plugins_dir.join(&descriptor.id);

        fs::create_dir_all(&self.plugins_dir)?;
        let source = fs::canonicalize(source_dir)?;
        let entry = fs::canonicalize(&self.plugins_dir)?.join(&descriptor.id);

        if source == entry {
            tracing::debug!(id = %descriptor.id, "plugin source already in store");
        } else {
            if entry.starts_with(&source) && !link {
                return Err(PlugwrightError::UnsupportedOperation {
                    message: format!(
                        "cannot copy {} into its own subdirectory {}",
                        source.display(),
                        final_dir.display()
                    ),
                });
            }
            if source.starts_with(&entry) {
                return Err(PlugwrightError::UnsupportedOperation {
                    message: format!(
                        "source {} lies inside store entry {}",
                        source.display(),
                        final_dir.display()
                    ),
                });
            }

            fs_util::remove_path(&final_dir)?;
            if link {
                fs_util::symlink_dir(&source, &final_dir)?;
            } else {
                fs_util::copy_dir_recursive(&source, &final_dir)?;
            }
        }

        self.provenance()
            .record(&descriptor.id, ProvenanceRecord::new(provenance))?;

        tracing::info!(
            id = %descriptor.id,
            version = %descriptor.version,
            link,
            path = %final_dir.display(),
            "materialized plugin"
        );
        Ok(final_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::resolver::tests::write_plugin;
    use tempfile::TempDir;

    fn local_source(path: &Path) -> ProvenanceSource {
        ProvenanceSource::Local {
            path: path.to_string_lossy().to_string(),
            subdir: ".".to_string(),
        }
    }

    fn list_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().strip_prefix(dir).unwrap().to_path_buf())
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_materialize_copies_under_id() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("camera-src");
        write_plugin(&source, "org.example.camera", "1.0.0");
        fs::create_dir_all(source.join("www")).unwrap();
        fs::write(source.join("www/camera.js"), "js").unwrap();

        let materializer = Materializer::new(temp.path().join("plugins"));
        let final_dir = materializer
            .materialize(&source, false, local_source(&source))
            .unwrap();

        assert_eq!(final_dir, temp.path().join("plugins/org.example.camera"));
        assert!(final_dir.join("www/camera.js").is_file());
        assert!(!final_dir.is_symlink());
    }

    #[test]
    fn test_materialize_is_destructive_idempotent() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("camera-src");
        write_plugin(&source, "camera", "1.0.0");
        fs::write(source.join("a.txt"), "a").unwrap();

        let materializer = Materializer::new(temp.path().join("plugins"));
        let first = materializer
            .materialize(&source, false, local_source(&source))
            .unwrap();
        let first_files = list_files(&first);

        fs::write(first.join("leftover.txt"), "stale").unwrap();

        let second = materializer
            .materialize(&source, false, local_source(&source))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(list_files(&second), first_files);
        assert!(!second.join("leftover.txt").exists());
    }

    #[test]
    fn test_materialize_from_store_entry_keeps_contents() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("geo-src");
        write_plugin(&source, "geo", "1.0.0");
        fs::write(source.join("Geo.java"), "class Geo {}").unwrap();

        let materializer = Materializer::new(temp.path().join("plugins"));
        let stored = materializer
            .materialize(&source, false, local_source(&source))
            .unwrap();

        let again = materializer
            .materialize(&stored, false, local_source(&stored))
            .unwrap();
        assert_eq!(again, stored);
        assert!(again.join("plugin.json").is_file());
        assert_eq!(
            fs::read_to_string(again.join("Geo.java")).unwrap(),
            "class Geo {}"
        );
    }

    #[test]
    fn test_materialize_source_containing_store_fails() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("app");
        write_plugin(&source, "app", "1.0.0");
        fs::write(source.join("App.java"), "class App {}").unwrap();

        let materializer = Materializer::new(source.join("plugins"));
        let err = materializer
            .materialize(&source, false, local_source(&source))
            .unwrap_err();
        assert!(matches!(err, PlugwrightError::UnsupportedOperation { .. }));
        assert!(source.join("App.java").is_file());
        assert!(!source.join("plugins/app").exists());
    }

    #[test]
    fn test_materialize_source_inside_store_entry_fails() {
        let temp = TempDir::new().unwrap();
        let plugins = temp.path().join("plugins");
        let nested = plugins.join("geo/nested");
        write_plugin(&nested, "geo", "1.0.0");

        let materializer = Materializer::new(plugins);
        let err = materializer
            .materialize(&nested, false, local_source(&nested))
            .unwrap_err();
        assert!(matches!(err, PlugwrightError::UnsupportedOperation { .. }));
        assert!(nested.join("plugin.json").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_materialize_link() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("camera-src");
        write_plugin(&source, "camera", "1.0.0");

        let materializer = Materializer::new(temp.path().join("plugins"));
        let final_dir = materializer
            .materialize(&source, true, local_source(&source))
            .unwrap();
        assert!(final_dir.is_symlink());
        assert!(final_dir.join("plugin.json").is_file());
    }

    #[test]
    fn test_provenance_round_trip() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("camera-src");
        write_plugin(&source, "camera", "1.0.0");

        let provenance = ProvenanceSource::Git {
            url: "https://example.com/camera.git".to_string(),
            subdir: "plugin".to_string(),
            git_ref: Some("v1".to_string()),
        };
        let materializer = Materializer::new(temp.path().join("plugins"));
        materializer
            .materialize(&source, false, provenance.clone())
            .unwrap();

        let record = materializer.provenance().get("camera").unwrap().unwrap();
        assert_eq!(record.source, provenance);

        materializer.provenance().remove("camera").unwrap();
        assert!(materializer.provenance().get("camera").unwrap().is_none());
    }

    #[test]
    fn test_materialize_without_manifest_fails() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("empty");
        fs::create_dir_all(&source).unwrap();

        let materializer = Materializer::new(temp.path().join("plugins"));
        let err = materializer
            .materialize(&source, false, local_source(&source))
            .unwrap_err();
        assert!(matches!(err, PlugwrightError::ManifestNotFound { .. }));
    }
}

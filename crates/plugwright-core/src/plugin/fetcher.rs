//! Plugin Fetcher
//!
//! Runs the fetch pipeline: parse the reference, resolve it to a source
//! directory, materialize it into the plugin store, then verify identity.
//! Each step completes before the next starts.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::plugin::materializer::Materializer;
use crate::plugin::reference;
use crate::plugin::resolver::SourceResolver;
use crate::plugin::types::{FetchOptions, FetchedPlugin, PluginReference};
use crate::plugin::verifier;

pub struct PluginFetcher {
    resolver: SourceResolver,
    materializer: Materializer,
}

impl PluginFetcher {
    pub fn new(resolver: SourceResolver, plugins_dir: PathBuf) -> Self {
        Self {
            resolver,
            materializer: Materializer::new(plugins_dir),
        }
    }

    pub fn plugins_dir(&self) -> &Path {
        self.materializer.plugins_dir()
    }

    pub fn resolver(&self) -> &SourceResolver {
        &self.resolver
    }

    pub fn materializer(&self) -> &Materializer {
        &self.materializer
    }

    /// Fetch a raw reference string into the plugin store
    pub fn fetch(&self, raw: &str, options: &FetchOptions) -> Result<PathBuf> {
        let mut options = options.clone();
        let reference = reference::parse(raw, &mut options)?;
        Ok(self.fetch_reference(&reference, &options)?.directory)
    }

    /// Fetch an already-parsed reference into the plugin store
    pub fn fetch_reference(
        &self,
        reference: &PluginReference,
        options: &FetchOptions,
    ) -> Result<FetchedPlugin> {
        tracing::debug!(%reference, "fetching plugin");
        let resolution = self.resolver.resolve(reference, options)?;
        let link = options.link && resolution.linkable;

        let materialized = self.materializer.materialize(
            &resolution.source_dir,
            link,
            resolution.provenance.clone(),
        );
        if let Some(scratch) = &resolution.scratch_dir {
            let _ = fs::remove_dir_all(scratch);
        }
        let final_dir = materialized?;

        let expected = options
            .expected_id
            .clone()
            .or_else(|| reference.expected_id());
        verifier::verify(expected.as_deref(), &final_dir)?;

        Ok(FetchedPlugin {
            directory: final_dir,
            linked: link,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlugwrightError;
    use crate::plugin::index::LocalPluginIndex;
    use crate::plugin::resolver::tests::{write_plugin, FakeGit, FakeRegistry};
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    struct Env {
        temp: TempDir,
        fetcher: PluginFetcher,
        git_calls: Rc<RefCell<Vec<(String, Option<String>, String)>>>,
    }

    fn env() -> Env {
        let temp = TempDir::new().unwrap();
        write_plugin(
            &temp.path().join("repo/plugins/camera"),
            "org.example.camera",
            "1.0.0",
        );
        write_plugin(&temp.path().join("registry/geo"), "geo", "2.1.0");

        let git_calls = Rc::new(RefCell::new(Vec::new()));
        let resolver = SourceResolver::new(
            LocalPluginIndex::new(),
            Some(Box::new(FakeRegistry {
                root: temp.path().join("registry"),
                calls: Rc::new(RefCell::new(Vec::new())),
            })),
            Box::new(FakeGit {
                fixture: temp.path().join("repo"),
                calls: git_calls.clone(),
            }),
        )
        .with_scratch_root(temp.path().join("scratch"));

        let fetcher = PluginFetcher::new(resolver, temp.path().join("project/plugins"));
        Env {
            temp,
            fetcher,
            git_calls,
        }
    }

    #[test]
    fn test_fetch_git_with_fragment() {
        let env = env();
        let dir = env
            .fetcher
            .fetch(
                "https://example.com/camera.git#v1.0:plugins/camera",
                &FetchOptions::default(),
            )
            .unwrap();

        assert_eq!(
            dir,
            env.temp.path().join("project/plugins/org.example.camera")
        );
        assert!(dir.join("plugin.json").is_file());
        assert_eq!(
            env.git_calls.borrow()[0],
            (
                "https://example.com/camera.git".to_string(),
                Some("v1.0".to_string()),
                "plugins/camera".to_string()
            )
        );
        // Scratch clone is cleaned up
        let scratch = env.temp.path().join("scratch");
        assert!(fs::read_dir(&scratch).map(|mut d| d.next().is_none()).unwrap_or(true));
    }

    #[test]
    fn test_fetch_git_with_link_fails() {
        let env = env();
        let options = FetchOptions {
            link: true,
            ..FetchOptions::default()
        };
        let err = env
            .fetcher
            .fetch("https://example.com/camera.git", &options)
            .unwrap_err();
        assert!(matches!(err, PlugwrightError::UnsupportedOperation { .. }));
        assert!(env.git_calls.borrow().is_empty());
    }

    #[test]
    fn test_fetch_local_path_verifies_expected_id() {
        let env = env();
        let source = env.temp.path().join("repo/plugins/camera");
        let options = FetchOptions {
            expected_id: Some("org.example.other".to_string()),
            ..FetchOptions::default()
        };

        let err = env
            .fetcher
            .fetch(&source.to_string_lossy(), &options)
            .unwrap_err();
        assert!(matches!(err, PlugwrightError::IdentityMismatch { .. }));
    }

    #[test]
    fn test_fetch_registry_version_mismatch() {
        let env = env();
        let err = env
            .fetcher
            .fetch("geo@3.0.0", &FetchOptions::default())
            .unwrap_err();
        // The fake registry ignores the version and serves 2.1.0
        assert!(matches!(err, PlugwrightError::IdentityMismatch { .. }));
    }

    #[test]
    fn test_fetch_registry_copies_even_when_link_requested() {
        let env = env();
        let options = FetchOptions {
            link: true,
            ..FetchOptions::default()
        };
        let fetched = env
            .fetcher
            .fetch_reference(
                &PluginReference::RegistryId {
                    id: "geo".to_string(),
                    version_spec: None,
                },
                &options,
            )
            .unwrap();
        assert!(!fetched.linked);
        assert!(!fetched.directory.is_symlink());
        assert!(fetched.directory.join("plugin.json").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_fetch_local_path_reports_link() {
        let env = env();
        let source = env.temp.path().join("repo/plugins/camera");
        let options = FetchOptions {
            link: true,
            ..FetchOptions::default()
        };
        let fetched = env
            .fetcher
            .fetch_reference(
                &PluginReference::LocalPath {
                    path: source.clone(),
                },
                &options,
            )
            .unwrap();
        assert!(fetched.linked);
        assert!(fetched.directory.is_symlink());
    }
}

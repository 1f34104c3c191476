//! Local Plugin Index
//!
//! Maps plugin ids to descriptors found directly beneath the search-path
//! directories. The index is built at most once per instance. A later
//! lookup with a different search path is answered from the index built
//! first; it is never rebuilt. Callers that change search paths mid-run
//! must construct a new index.
//!
//! Concurrent first use is the caller's responsibility: build the index
//! (see [`LocalPluginIndex::build`]) before issuing parallel installs.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;

use crate::plugin::descriptor::PluginDescriptor;

/// Outcome of a build request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexBuild {
    /// The index was built by this call
    Built,
    /// The index already existed; the given search path was ignored
    AlreadyBuilt,
}

#[derive(Debug)]
struct BuiltIndex {
    search_path: Vec<PathBuf>,
    plugins: HashMap<String, PluginDescriptor>,
}

/// Built-once cache of plugins available on the local search path
#[derive(Debug, Default)]
pub struct LocalPluginIndex {
    inner: OnceCell<BuiltIndex>,
}

impl LocalPluginIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the index has been built
    pub fn is_built(&self) -> bool {
        self.inner.get().is_some()
    }

    /// Search path the index was built from, if built
    pub fn built_from(&self) -> Option<&[PathBuf]> {
        self.inner.get().map(|i| i.search_path.as_slice())
    }

    /// Build the index from `search_path` unless it is already built
    pub fn build(&self, search_path: &[PathBuf]) -> IndexBuild {
        let mut built_now = false;
        self.inner.get_or_init(|| {
            built_now = true;
            scan(search_path)
        });

        if built_now {
            IndexBuild::Built
        } else {
            tracing::debug!("local plugin index already built; search path ignored");
            IndexBuild::AlreadyBuilt
        }
    }

    /// Look up `id`, building the index from `search_path` on first use
    pub fn resolve(&self, id: &str, search_path: &[PathBuf]) -> Option<&PluginDescriptor> {
        self.build(search_path);
        self.inner.get().and_then(|i| i.plugins.get(id))
    }

    /// Number of indexed plugins (0 before the first build)
    pub fn len(&self) -> usize {
        self.inner.get().map_or(0, |i| i.plugins.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn scan(search_path: &[PathBuf]) -> BuiltIndex {
    let mut plugins = HashMap::new();

    for dir in search_path {
        for plugin_dir in plugin_dirs(dir) {
            match PluginDescriptor::load(&plugin_dir) {
                Ok(descriptor) => {
                    tracing::debug!(
                        id = %descriptor.id,
                        path = %plugin_dir.display(),
                        "indexed local plugin"
                    );
                    // Later search-path entries win
                    plugins.insert(descriptor.id.clone(), descriptor);
                }
                Err(e) => {
                    tracing::debug!(path = %plugin_dir.display(), "skipping unreadable plugin: {}", e);
                }
            }
        }
    }

    BuiltIndex {
        search_path: search_path.to_vec(),
        plugins,
    }
}

/// Immediate subdirectories of `dir` that hold a plugin manifest, sorted
/// by name for a stable scan order.
fn plugin_dirs(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir() && PluginDescriptor::exists_in(p))
        .collect();
    dirs.sort();
    dirs
}

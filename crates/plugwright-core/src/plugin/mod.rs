//! Plugin Module
//!
//! Everything between a raw plugin reference and a verified directory in
//! the project's plugin store.
//!
//! - `reference`: parse `url#ref:subdir`, local paths and `id@version`
//! - `resolver`: turn a reference into a source directory (git, local, registry)
//! - `materializer`: place the source under `<plugins>/<id>` and record provenance
//! - `verifier`: check the materialized id (and version) against the request
//! - `fetcher`: the pipeline tying the above together

pub mod descriptor;
pub mod fetcher;
pub mod git;
pub mod index;
pub mod materializer;
pub mod reference;
pub mod registry;
pub mod resolver;
pub mod types;
pub mod verifier;

// Re-exports
pub use descriptor::{ConfigEdit, DeclaredFile, PluginDescriptor, MANIFEST_FILE};
pub use fetcher::PluginFetcher;
pub use git::{GitCli, GitFetcher};
pub use index::{IndexBuild, LocalPluginIndex};
pub use materializer::{Materializer, ProvenanceStore};
pub use reference::{parse_fragment, split_id_version, FragmentDelta};
pub use registry::{DirectoryRegistry, RegistryClient};
pub use resolver::SourceResolver;
pub use types::{
    FetchOptions, FetchedPlugin, PluginReference, ProvenanceRecord, ProvenanceSource, Resolution,
    SourceKind, DEFAULT_SUBDIR,
};
pub use verifier::verify;

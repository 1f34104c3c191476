pub mod config;
pub mod document;
pub mod error;
pub mod fs_util;
pub mod ledger;
pub mod manager;
pub mod platform;
pub mod plugin;
pub mod project;

pub use config::{Config, FetchConfig};
pub use document::{DocumentPatch, XmlDocument, XmlElement, XmlNode};
pub use error::{PlugwrightError, Result};
pub use ledger::{InstallStatus, InstallationRecord, InstalledPluginLedger, Mutation};
pub use manager::{InstallOutcome, PluginManager, PLUGINS_DIR};
pub use platform::{
    AndroidProject, OrientationPolicy, Platform, PlatformProject, UninstallReport,
};
pub use plugin::{
    DirectoryRegistry, FetchOptions, FetchedPlugin, GitCli, GitFetcher, IndexBuild,
    LocalPluginIndex, Materializer, PluginDescriptor, PluginFetcher, PluginReference,
    ProvenanceRecord, ProvenanceSource, ProvenanceStore, RegistryClient, SourceKind,
    SourceResolver,
};
pub use project::{AppInfo, PlatformConfig, ProjectConfig, SplashImage};

//! Plugin Manager
//!
//! Top-level orchestrator for one project: fetches plugins into
//! `<project>/plugins`, installs them into platform projects while
//! recording every mutation in the ledger, and reverses them on uninstall.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{PlugwrightError, Result};
use crate::fs_util;
use crate::ledger::{InstallStatus, InstallationRecord, InstalledPluginLedger};
use crate::platform::{Platform, UninstallReport};
use crate::plugin::{
    reference, DirectoryRegistry, FetchOptions, GitCli, LocalPluginIndex, PluginDescriptor,
    PluginFetcher, PluginReference, RegistryClient, SourceResolver,
};
use crate::project::ProjectConfig;

/// Plugin store directory under the project root
pub const PLUGINS_DIR: &str = "plugins";

/// Plugins handled by one install call, dependencies first
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub installed: Vec<String>,
    /// Already installed for the platform; left as is
    pub skipped: Vec<String>,
}

pub struct PluginManager {
    project_root: PathBuf,
    fetcher: PluginFetcher,
}

impl PluginManager {
    pub fn new(project_root: &Path, resolver: SourceResolver) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            fetcher: PluginFetcher::new(resolver, project_root.join(PLUGINS_DIR)),
        }
    }

    /// Manager wired with the git CLI, the configured registry directory
    /// and a local index built from the configured search path
    pub fn from_config(project_root: &Path, config: &Config) -> Self {
        let index = LocalPluginIndex::new();
        index.build(&config.fetch.search_path);

        let registry = config
            .fetch
            .registry_dir
            .clone()
            .map(|dir| Box::new(DirectoryRegistry::new(dir)) as Box<dyn RegistryClient>);

        let resolver = SourceResolver::new(index, registry, Box::new(GitCli::new()));
        Self::new(project_root, resolver)
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn plugins_dir(&self) -> &Path {
        self.fetcher.plugins_dir()
    }

    pub fn fetcher(&self) -> &PluginFetcher {
        &self.fetcher
    }

    pub fn ledger(&self) -> Result<InstalledPluginLedger> {
        InstalledPluginLedger::load(self.plugins_dir())
    }

    /// Fetch a plugin into the store without installing it
    pub fn fetch(&self, raw: &str, options: &FetchOptions) -> Result<PathBuf> {
        let dir = self.fetcher.fetch(raw, options)?;
        tracing::info!(reference = %raw, path = %dir.display(), "fetched plugin");
        Ok(dir)
    }

    /// Fetch and install a plugin (and its dependencies) for `platform`
    pub fn install(
        &self,
        raw: &str,
        platform: Platform,
        options: &FetchOptions,
    ) -> Result<InstallOutcome> {
        let mut options = options.clone();
        let reference = reference::parse(raw, &mut options)?;

        let mut visited = HashSet::new();
        let mut outcome = InstallOutcome::default();
        self.install_reference(&reference, platform, &options, &mut visited, &mut outcome)?;
        Ok(outcome)
    }

    fn install_reference(
        &self,
        reference: &PluginReference,
        platform: Platform,
        options: &FetchOptions,
        visited: &mut HashSet<String>,
        outcome: &mut InstallOutcome,
    ) -> Result<()> {
        let fetched = self.fetcher.fetch_reference(reference, options)?;
        let descriptor = PluginDescriptor::load(&fetched.directory)?;
        if !visited.insert(descriptor.id.clone()) {
            return Ok(());
        }

        for dependency in &descriptor.dependencies {
            if let PluginReference::RegistryId { id, .. } = dependency {
                if self.ledger()?.is_installed(id, platform.id()) {
                    tracing::debug!(dependency = %id, "dependency already installed");
                    continue;
                }
            }
            let dep_options = FetchOptions {
                link: options.link,
                search_path: options.search_path.clone(),
                no_registry: options.no_registry,
                ..FetchOptions::default()
            };
            self.install_reference(dependency, platform, &dep_options, visited, outcome)?;
        }

        // Platform files are linked only when the store entry itself is
        self.install_descriptor(&descriptor, platform, fetched.linked, outcome)
    }

    fn install_descriptor(
        &self,
        descriptor: &PluginDescriptor,
        platform: Platform,
        link: bool,
        outcome: &mut InstallOutcome,
    ) -> Result<()> {
        let mut ledger = self.ledger()?;
        let project = platform.project(&self.project_root);

        if let Some(record) = ledger.get(&descriptor.id, platform.id()).cloned() {
            if record.is_complete() {
                tracing::info!(id = %descriptor.id, %platform, "plugin already installed");
                outcome.skipped.push(descriptor.id.clone());
                return Ok(());
            }
            tracing::info!(id = %descriptor.id, %platform, "unwinding partial install");
            project.uninstall_plugin(&record.mutations);
            ledger.clear(&descriptor.id, platform.id())?;
        }

        let mut journal = Vec::new();
        let result = project.install_plugin(descriptor, link, &mut journal);
        let status = match result {
            Ok(()) => InstallStatus::Complete,
            Err(_) => InstallStatus::Partial,
        };
        ledger.record(InstallationRecord::new(
            &descriptor.id,
            &descriptor.version,
            platform.id(),
            status,
            journal,
        ))?;
        result?;

        tracing::info!(
            id = %descriptor.id,
            version = %descriptor.version,
            %platform,
            "installed plugin"
        );
        outcome.installed.push(descriptor.id.clone());
        Ok(())
    }

    /// Reverse an install. Uses the ledger record when there is one and
    /// otherwise derives the inverse from the plugin's descriptor. The
    /// plugin is removed from the store once no platform uses it.
    pub fn uninstall(&self, id: &str, platform: Platform) -> Result<UninstallReport> {
        let mut ledger = self.ledger()?;
        let project = platform.project(&self.project_root);
        let plugin_dir = self.plugins_dir().join(id);

        let report = match ledger.get(id, platform.id()) {
            Some(record) => project.uninstall_plugin(&record.mutations),
            None if PluginDescriptor::exists_in(&plugin_dir) => {
                let descriptor = PluginDescriptor::load(&plugin_dir)?;
                tracing::debug!(%id, "no ledger record; deriving uninstall from descriptor");
                project.uninstall_planned(&descriptor)
            }
            None => {
                return Err(PlugwrightError::NotInstalled {
                    id: id.to_string(),
                    platform: platform.id().to_string(),
                })
            }
        };
        ledger.clear(id, platform.id())?;

        if !ledger.installed_anywhere(id) {
            fs_util::remove_path(&plugin_dir)?;
            self.fetcher.materializer().provenance().remove(id)?;
        }

        tracing::info!(
            %id,
            %platform,
            removed_files = report.removed_files,
            missing = report.missing.len(),
            "uninstalled plugin"
        );
        Ok(report)
    }

    /// Write project configuration and web assets into a platform project
    pub fn prepare(&self, platform: Platform) -> Result<()> {
        let config = ProjectConfig::load(&self.project_root)?;
        platform.project(&self.project_root).run_full_update(&config)
    }

    /// Ledger records for `platform`, sorted by id
    pub fn list(&self, platform: Platform) -> Result<Vec<InstallationRecord>> {
        Ok(self
            .ledger()?
            .list(platform.id())
            .into_iter()
            .cloned()
            .collect())
    }
}

//! Android platform project
//!
//! Layout under `<project>/platforms/android`:
//!
//! - `AndroidManifest.xml`: package, version and activity declarations
//! - `res/values/strings.xml`: `app_name`
//! - `res/xml/config.xml`: plugin registry (`<plugin name value>`)
//! - `res/drawable-<density>/screen.png`: splash images
//! - `assets/www`: synced from `<project>/www`, overrides from
//!   `<project>/merges/android`

use std::fs;
use std::path::{Path, PathBuf};

use crate::document::{XmlDocument, XmlElement};
use crate::error::{PlugwrightError, Result};
use crate::fs_util;
use crate::platform::{Platform, PlatformProject, PLATFORMS_DIR};
use crate::project::ProjectConfig;

const MANIFEST: &str = "AndroidManifest.xml";
const STRINGS: &str = "res/values/strings.xml";
const CONFIG_XML: &str = "res/xml/config.xml";
const WWW: &str = "assets/www";
const ACTIVITY_PATH: &str = "manifest/application/activity";
const ORIENTATION_ATTR: &str = "android:screenOrientation";

/// Source roots the uninstall cascade stops at
const PROTECTED: &[&str] = &["src", "res", "assets", WWW, "libs"];

/// How the `orientation` preference maps onto activity declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationPolicy {
    /// `default`: drop the attribute and let the system decide
    SystemDefault,
    Portrait,
    Landscape,
    /// Absent or unrecognized: leave whatever is there
    Unchanged,
}

impl OrientationPolicy {
    pub fn from_preference(value: Option<&str>) -> Self {
        match value {
            Some("default") => Self::SystemDefault,
            Some("portrait") => Self::Portrait,
            Some("landscape") => Self::Landscape,
            _ => Self::Unchanged,
        }
    }

    pub fn apply(&self, activity: &mut XmlElement) {
        match self {
            Self::SystemDefault => {
                activity.remove_attribute(ORIENTATION_ATTR);
            }
            Self::Portrait => activity.set_attribute(ORIENTATION_ATTR, "portrait"),
            Self::Landscape => activity.set_attribute(ORIENTATION_ATTR, "landscape"),
            Self::Unchanged => {}
        }
    }
}

pub struct AndroidProject {
    project_root: PathBuf,
    root: PathBuf,
}

impl AndroidProject {
    pub fn new(project_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            root: project_root
                .join(PLATFORMS_DIR)
                .join(Platform::Android.id()),
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST)
    }

    pub fn strings_path(&self) -> PathBuf {
        self.root.join(STRINGS)
    }

    pub fn config_xml_path(&self) -> PathBuf {
        self.root.join(CONFIG_XML)
    }

    pub fn www_dir(&self) -> PathBuf {
        self.root.join(WWW)
    }

    /// Project-level web assets shared by all platforms
    pub fn source_www_dir(&self) -> PathBuf {
        self.project_root.join("www")
    }

    pub fn overrides_dir(&self) -> PathBuf {
        self.project_root.join("merges").join(Platform::Android.id())
    }

    fn update_app_name(&self, name: &str) -> Result<()> {
        let path = self.strings_path();
        let mut doc = if path.exists() {
            XmlDocument::load(&path)?
        } else {
            XmlDocument {
                prolog: Vec::new(),
                root: XmlElement::new("resources"),
            }
        };

        match doc.root.find_child_mut("string", "name", "app_name") {
            Some(element) => element.set_text(name),
            None => {
                let mut element = XmlElement::new("string").with_attribute("name", "app_name");
                element.set_text(name);
                doc.root.add_child(element);
            }
        }
        doc.save(&path)
    }

    fn update_manifest(&self, config: &ProjectConfig) -> Result<()> {
        let path = self.manifest_path();
        if !path.exists() {
            return Err(PlugwrightError::SourceMissing { path });
        }
        let mut doc = XmlDocument::load(&path)?;
        let platform = Platform::Android.id();

        doc.root.set_attribute("package", &config.app.id);
        doc.root
            .set_attribute("android:versionName", &config.app.version);
        if let Some(code) = config.platform(platform).and_then(|p| p.version_code) {
            doc.root
                .set_attribute("android:versionCode", &code.to_string());
        }

        let policy =
            OrientationPolicy::from_preference(config.preference_for(platform, "orientation"));
        doc.for_each_at_path_mut(ACTIVITY_PATH, |activity| policy.apply(activity));

        doc.save(&path)
    }

    fn copy_splash_images(&self, config: &ProjectConfig) -> Result<usize> {
        let mut copied = 0;
        for splash in config.splash_images(Platform::Android.id()) {
            let src = self.project_root.join(&splash.src);
            if !src.is_file() {
                tracing::warn!(src = %splash.src.display(), "splash image not found, skipping");
                continue;
            }
            let dir = self
                .root
                .join("res")
                .join(format!("drawable-{}", splash.density));
            fs::create_dir_all(&dir)?;
            fs::copy(&src, dir.join("screen.png"))?;
            copied += 1;
        }
        Ok(copied)
    }
}

impl PlatformProject for AndroidProject {
    fn platform(&self) -> Platform {
        Platform::Android
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn protected_dirs(&self) -> Vec<PathBuf> {
        std::iter::once(self.root.clone())
            .chain(PROTECTED.iter().map(|dir| self.root.join(dir)))
            .collect()
    }

    fn update_from_config(&self, config: &ProjectConfig) -> Result<()> {
        self.update_app_name(&config.app.name)?;
        self.update_manifest(config)?;
        let splash = self.copy_splash_images(config)?;
        tracing::debug!(
            package = %config.app.id,
            version = %config.app.version,
            splash,
            "wrote project config to android project"
        );
        Ok(())
    }

    fn update_web_assets(&self) -> Result<()> {
        let source = self.source_www_dir();
        if !source.is_dir() {
            return Err(PlugwrightError::SourceMissing { path: source });
        }
        let www = self.www_dir();
        fs_util::remove_path(&www)?;
        fs_util::copy_dir_recursive(&source, &www)?;
        Ok(())
    }

    fn apply_overrides(&self) -> Result<usize> {
        let overrides = self.overrides_dir();
        if !overrides.is_dir() {
            return Ok(0);
        }
        Ok(fs_util::merge_dir(&overrides, &self.www_dir())?)
    }

    fn housekeeping(&self) -> Result<usize> {
        let www = self.www_dir();
        if !www.is_dir() {
            return Ok(0);
        }
        Ok(fs_util::remove_vcs_artifacts(&www)?)
    }
}

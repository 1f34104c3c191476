//! Project configuration (`<project>/app.toml`)
//!
//! ```toml
//! [app]
//! id = "com.example.hello"
//! version = "1.2.0"
//! name = "Hello"
//!
//! [preferences]
//! orientation = "portrait"
//!
//! [platforms.android]
//! version_code = 120
//!
//! [[platforms.android.splash]]
//! src = "res/screen/android/splash-land-hdpi.png"
//! density = "land-hdpi"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PlugwrightError, Result};

pub const PROJECT_FILE: &str = "app.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub app: AppInfo,
    #[serde(default)]
    pub preferences: BTreeMap<String, String>,
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppInfo {
    pub id: String,
    pub version: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_code: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub splash: Vec<SplashImage>,
    /// Platform-scoped preferences, taking precedence over `[preferences]`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub preferences: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplashImage {
    /// Path relative to the project root
    pub src: PathBuf,
    /// Density qualifier, e.g. `hdpi` or `land-xhdpi`
    pub density: String,
}

impl ProjectConfig {
    pub fn path(project_root: &Path) -> PathBuf {
        project_root.join(PROJECT_FILE)
    }

    pub fn load(project_root: &Path) -> Result<Self> {
        let path = Self::path(project_root);
        if !path.exists() {
            return Err(PlugwrightError::SourceMissing { path });
        }

        let content = fs::read_to_string(&path)?;
        toml::from_str(&content).map_err(|e| PlugwrightError::ConfigParse {
            path,
            message: e.to_string(),
        })
    }

    /// Global preference value
    pub fn preference(&self, name: &str) -> Option<&str> {
        self.preferences.get(name).map(String::as_str)
    }

    /// Preference value as seen by `platform`: platform-scoped first, then global
    pub fn preference_for(&self, platform: &str, name: &str) -> Option<&str> {
        self.platform(platform)
            .and_then(|p| p.preferences.get(name))
            .map(String::as_str)
            .or_else(|| self.preference(name))
    }

    pub fn platform(&self, name: &str) -> Option<&PlatformConfig> {
        self.platforms.get(name)
    }

    pub fn splash_images(&self, platform: &str) -> &[SplashImage] {
        self.platform(platform)
            .map(|p| p.splash.as_slice())
            .unwrap_or_default()
    }
}

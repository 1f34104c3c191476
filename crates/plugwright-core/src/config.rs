use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PlugwrightError, Result};
use crate::plugin::FetchOptions;

const CONFIG_FILE: &str = "config.toml";
const BASE_DIR_NAME: &str = ".plugwright";

/// Default config template with rich comments
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# plugwright configuration file
# Location: ~/.plugwright/config.toml

[fetch]
# Directories scanned for local plugin sources, in order.
# Each immediate subdirectory holding a plugin.json is indexed by its id.
# Later entries win when two directories provide the same id.
# Example: search_path = ["~/src/plugins", "/opt/shared-plugins"]
search_path = []

# Never fall back to the registry when a plugin is not found locally
no_registry = false

# Directory serving as the plugin registry (<registry_dir>/<id>/<version>/)
# Example: registry_dir = "/opt/plugin-registry"

# Symlink local plugin sources instead of copying them
link = false
"#;

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Fetch-related configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FetchConfig {
    #[serde(default)]
    pub search_path: Vec<PathBuf>,

    #[serde(default)]
    pub no_registry: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_dir: Option<PathBuf>,

    #[serde(default)]
    pub link: bool,
}

impl Config {
    /// Load config from base directory
    pub fn load(base_dir: &Path) -> Result<Self> {
        let path = base_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let mut config: Config =
            toml::from_str(&content).map_err(|e| PlugwrightError::ConfigParse {
                path: path.clone(),
                message: e.to_string(),
            })?;

        config.fetch.search_path = config
            .fetch
            .search_path
            .iter()
            .map(|p| expand_home(p))
            .collect::<Result<_>>()?;
        config.fetch.registry_dir = config
            .fetch
            .registry_dir
            .as_deref()
            .map(expand_home)
            .transpose()?;

        Ok(config)
    }

    /// Save config to base directory
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        let path = base_dir.join(CONFIG_FILE);
        fs::create_dir_all(base_dir)?;

        let content = toml::to_string_pretty(self).map_err(|e| PlugwrightError::ConfigParse {
            path: path.clone(),
            message: e.to_string(),
        })?;

        fs::write(&path, content)?;
        Ok(())
    }

    pub fn path(base_dir: &Path) -> PathBuf {
        base_dir.join(CONFIG_FILE)
    }

    /// Default base directory, `~/.plugwright`
    pub fn default_base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(PlugwrightError::HomeNotFound)?;
        Ok(home.join(BASE_DIR_NAME))
    }

    /// Initialize config with default template (rich comments)
    pub fn init(base_dir: &Path) -> Result<PathBuf> {
        let path = base_dir.join(CONFIG_FILE);
        fs::create_dir_all(base_dir)?;

        if !path.exists() {
            fs::write(&path, DEFAULT_CONFIG_TEMPLATE)?;
        }

        Ok(path)
    }

    /// Get a config value by dot-notation key
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "fetch.search_path" => Some(format!("{:?}", self.fetch.search_path)),
            "fetch.no_registry" => Some(self.fetch.no_registry.to_string()),
            "fetch.registry_dir" => Some(
                self.fetch
                    .registry_dir
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            ),
            "fetch.link" => Some(self.fetch.link.to_string()),
            _ => None,
        }
    }

    /// Set a config value by dot-notation key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "fetch.search_path" => {
                self.fetch.search_path = parse_string_list(value)?
                    .into_iter()
                    .map(PathBuf::from)
                    .collect();
            }
            "fetch.no_registry" => self.fetch.no_registry = parse_bool(key, value)?,
            "fetch.registry_dir" => {
                let trimmed = value.trim();
                self.fetch.registry_dir = if trimmed.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(trimmed))
                };
            }
            "fetch.link" => self.fetch.link = parse_bool(key, value)?,
            _ => {
                return Err(PlugwrightError::ConfigKeyNotFound {
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    /// List all config keys with their current values
    pub fn list(&self) -> Vec<(String, String)> {
        ["fetch.search_path", "fetch.no_registry", "fetch.registry_dir", "fetch.link"]
            .iter()
            .filter_map(|key| self.get(key).map(|v| (key.to_string(), v)))
            .collect()
    }

    /// Fetch options seeded from this config
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            link: self.fetch.link,
            search_path: self.fetch.search_path.clone(),
            no_registry: self.fetch.no_registry,
            ..FetchOptions::default()
        }
    }
}

fn expand_home(path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = dirs::home_dir().ok_or(PlugwrightError::HomeNotFound)?;
            Ok(home.join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        other => Err(PlugwrightError::ConfigParse {
            path: PathBuf::from(CONFIG_FILE),
            message: format!("{} expects a boolean, got '{}'", key, other),
        }),
    }
}

/// Parse a comma-separated or JSON-like list string
fn parse_string_list(value: &str) -> Result<Vec<String>> {
    let trimmed = value.trim();
    let inner = if trimmed.starts_with('[') && trimmed.ends_with(']') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };

    Ok(inner
        .split(',')
        .map(|s| s.trim().trim_matches('"').trim_matches('\'').to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_string_list_comma() {
        let result = parse_string_list("/a/plugins,/b/plugins").unwrap();
        assert_eq!(result, vec!["/a/plugins", "/b/plugins"]);
    }

    #[test]
    fn test_parse_string_list_json() {
        let result = parse_string_list(r#"["/a", "/b"]"#).unwrap();
        assert_eq!(result, vec!["/a", "/b"]);
        assert!(parse_string_list("[]").unwrap().is_empty());
    }

    #[test]
    fn test_config_get_set() {
        let mut config = Config::default();

        config.set("fetch.search_path", "/a,/b").unwrap();
        config.set("fetch.no_registry", "yes").unwrap();
        config.set("fetch.registry_dir", "/srv/registry").unwrap();
        assert_eq!(
            config.fetch.search_path,
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
        assert!(config.fetch.no_registry);
        assert_eq!(config.get("fetch.registry_dir").unwrap(), "/srv/registry");

        config.set("fetch.registry_dir", "").unwrap();
        assert!(config.fetch.registry_dir.is_none());

        assert!(config.set("fetch.link", "maybe").is_err());
        assert!(matches!(
            config.set("fetch.unknown", "x"),
            Err(PlugwrightError::ConfigKeyNotFound { .. })
        ));
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.fetch.link = true;
        config.fetch.search_path = vec![PathBuf::from("/plugins")];
        config.save(temp.path()).unwrap();

        let loaded = Config::load(temp.path()).unwrap();
        assert!(loaded.fetch.link);
        assert_eq!(loaded.fetch.search_path, vec![PathBuf::from("/plugins")]);
        assert_eq!(loaded.list().len(), 4);
    }

    #[test]
    fn test_init_template_parses() {
        let temp = TempDir::new().unwrap();
        let path = Config::init(temp.path()).unwrap();
        assert!(path.exists());

        let config = Config::load(temp.path()).unwrap();
        assert!(config.fetch.search_path.is_empty());
        assert!(!config.fetch.no_registry);
        assert!(config.fetch.registry_dir.is_none());
    }

    #[test]
    fn test_expand_home() {
        let plain = Path::new("/opt/plugins");
        assert_eq!(expand_home(plain).unwrap(), plain);

        match dirs::home_dir() {
            Some(home) => {
                assert_eq!(
                    expand_home(Path::new("~/plugins")).unwrap(),
                    home.join("plugins")
                );
                assert_eq!(Config::default_base_dir().unwrap(), home.join(".plugwright"));
            }
            None => {
                assert!(matches!(
                    expand_home(Path::new("~/plugins")),
                    Err(PlugwrightError::HomeNotFound)
                ));
                assert!(matches!(
                    Config::default_base_dir(),
                    Err(PlugwrightError::HomeNotFound)
                ));
            }
        }
    }

    #[test]
    fn test_fetch_options_from_config() {
        let mut config = Config::default();
        config.fetch.no_registry = true;
        config.fetch.search_path = vec![PathBuf::from("/plugins")];

        let options = config.fetch_options();
        assert!(options.no_registry);
        assert!(!options.link);
        assert_eq!(options.subdir, ".");
        assert_eq!(options.search_path, vec![PathBuf::from("/plugins")]);
    }
}

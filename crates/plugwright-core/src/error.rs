use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlugwrightError {
    #[error("Unsupported operation: {message}")]
    UnsupportedOperation { message: String },

    #[error("Plugin not found: {reference}")]
    NotFound { reference: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Plugin identity mismatch: expected '{expected}', found '{actual}'")]
    IdentityMismatch { expected: String, actual: String },

    #[error("Failed to patch {file}: {message}")]
    DocumentPatch { file: PathBuf, message: String },

    #[error("Invalid plugin reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("Plugin manifest not found in {path}")]
    ManifestNotFound { path: PathBuf },

    #[error("Failed to parse plugin manifest {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    #[error("Failed to parse XML document {path}: {message}")]
    XmlParse { path: PathBuf, message: String },

    #[error("Failed to parse config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Unknown config key: {key}")]
    ConfigKeyNotFound { key: String },

    #[error("Unknown platform: {name}")]
    UnknownPlatform { name: String },

    #[error("Plugin '{id}' is not installed for {platform}")]
    NotInstalled { id: String, platform: String },

    #[error("Install target already exists: {path}")]
    TargetExists { path: PathBuf },

    #[error("Source path does not exist: {path}")]
    SourceMissing { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Home directory not found")]
    HomeNotFound,

    #[error("Git error: {0}")]
    Git(String),
}

pub type Result<T> = std::result::Result<T, PlugwrightError>;

impl PlugwrightError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } | Self::NotInstalled { .. } => 2,
            Self::UnsupportedOperation { .. } => 3,
            Self::IdentityMismatch { .. } => 4,
            Self::InvalidReference { .. } => 5,
            Self::DocumentPatch { .. } | Self::TargetExists { .. } => 6,
            Self::Network(_) | Self::Git(_) => 7,
            _ => 1,
        }
    }
}

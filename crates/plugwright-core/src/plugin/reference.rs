//! Plugin Reference Parser
//!
//! Turns a raw reference string into a [`PluginReference`] in two phases:
//! `parse_fragment` strips a trailing `#ref[:subdir]` fragment, then
//! `classify` decides between git, local path and registry id.

use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{PlugwrightError, Result};
use crate::plugin::types::{FetchOptions, PluginReference};

/// Options carried by a `#ref[:subdir]` fragment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentDelta {
    pub git_ref: Option<String>,
    pub subdir: Option<String>,
}

impl FragmentDelta {
    pub fn is_empty(&self) -> bool {
        self.git_ref.is_none() && self.subdir.is_none()
    }

    /// Write the fragment's values into fetch options
    pub fn apply(&self, options: &mut FetchOptions) {
        if let Some(git_ref) = &self.git_ref {
            options.git_ref = Some(git_ref.clone());
        }
        if let Some(subdir) = &self.subdir {
            options.subdir = subdir.clone();
        }
    }
}

/// Strip a trailing `#ref[:subdir]` fragment.
///
/// Returns the truncated reference and the options the fragment carried.
/// Parsing an already-truncated reference yields it unchanged with an
/// empty delta. A reference with more than one `#` is rejected.
pub fn parse_fragment(raw: &str) -> Result<(String, FragmentDelta)> {
    let Some((head, fragment)) = raw.split_once('#') else {
        return Ok((raw.to_string(), FragmentDelta::default()));
    };

    if fragment.contains('#') {
        return Err(PlugwrightError::InvalidReference {
            reference: raw.to_string(),
            reason: "a reference may contain at most one '#' fragment".to_string(),
        });
    }
    if head.is_empty() {
        return Err(PlugwrightError::InvalidReference {
            reference: raw.to_string(),
            reason: "nothing before the '#' fragment".to_string(),
        });
    }

    let (git_ref, subdir) = match fragment.split_once(':') {
        Some((git_ref, subdir)) => (git_ref, Some(subdir)),
        None => (fragment, None),
    };

    let delta = FragmentDelta {
        git_ref: Some(git_ref)
            .filter(|r| !r.is_empty())
            .map(str::to_string),
        subdir: subdir.map(normalize_subdir).filter(|s| !s.is_empty()),
    };

    Ok((head.to_string(), delta))
}

/// Classify a fragment-free reference.
pub fn classify(reference: &str, options: &FetchOptions) -> PluginReference {
    if is_network_url(reference) {
        return PluginReference::GitSource {
            url: reference.to_string(),
            git_ref: options.git_ref.clone(),
            subdir: normalize_subdir(&options.subdir),
        };
    }

    if looks_like_path(reference) {
        return PluginReference::LocalPath {
            path: PathBuf::from(reference),
        };
    }

    let (id, version_spec) = split_id_version(reference);
    PluginReference::RegistryId {
        id: id.to_string(),
        version_spec: version_spec.map(str::to_string),
    }
}

/// Parse a raw reference, updating `options` with any fragment values.
pub fn parse(raw: &str, options: &mut FetchOptions) -> Result<PluginReference> {
    let (truncated, delta) = parse_fragment(raw.trim())?;
    delta.apply(options);
    Ok(classify(&truncated, options))
}

/// Split `id@version`. A leading `@` belongs to the id (scoped names).
pub fn split_id_version(reference: &str) -> (&str, Option<&str>) {
    match reference.rsplit_once('@') {
        Some((id, version)) if !id.is_empty() && !version.is_empty() => (id, Some(version)),
        _ => (reference, None),
    }
}

/// Strip leading and trailing path separators; an empty result means ".".
pub fn normalize_subdir(subdir: &str) -> String {
    let trimmed = subdir.trim_matches(|c| c == '/' || c == '\\');
    if trimmed.is_empty() {
        ".".to_string()
    } else {
        trimmed.to_string()
    }
}

/// A URL with a network-style scheme: not `file:`, not a drive letter.
fn is_network_url(reference: &str) -> bool {
    match Url::parse(reference) {
        Ok(url) => url.scheme().len() > 1 && url.scheme() != "file",
        Err(_) => false,
    }
}

fn looks_like_path(reference: &str) -> bool {
    reference.contains('/')
        || reference.contains('\\')
        || reference.starts_with('.')
        || reference.starts_with('~')
        || Path::new(reference).is_absolute()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fragment_with_ref_and_subdir() {
        let (truncated, delta) =
            parse_fragment("https://example.com/camera.git#v2.0:/plugins/camera/").unwrap();
        assert_eq!(truncated, "https://example.com/camera.git");
        assert_eq!(delta.git_ref.as_deref(), Some("v2.0"));
        assert_eq!(delta.subdir.as_deref(), Some("plugins/camera"));
    }

    #[test]
    fn test_parse_fragment_ref_only() {
        let (_, delta) = parse_fragment("https://example.com/camera.git#main").unwrap();
        assert_eq!(delta.git_ref.as_deref(), Some("main"));
        assert!(delta.subdir.is_none());
    }

    #[test]
    fn test_parse_fragment_is_idempotent() {
        let (truncated, _) = parse_fragment("https://example.com/camera.git#main:sub").unwrap();
        let (again, delta) = parse_fragment(&truncated).unwrap();
        assert_eq!(again, truncated);
        assert!(delta.is_empty());
    }

    #[test]
    fn test_parse_fragment_rejects_two_fragments() {
        let err = parse_fragment("https://example.com/camera.git#a#b").unwrap_err();
        assert!(matches!(err, PlugwrightError::InvalidReference { .. }));
    }

    #[test]
    fn test_fragment_equivalent_to_explicit_options() {
        let mut from_fragment = FetchOptions::default();
        let a = parse("https://example.com/camera.git#v1:sub/dir", &mut from_fragment).unwrap();

        let mut explicit = FetchOptions {
            git_ref: Some("v1".to_string()),
            subdir: "sub/dir".to_string(),
            ..FetchOptions::default()
        };
        let b = parse("https://example.com/camera.git", &mut explicit).unwrap();

        assert_eq!(a, b);
        assert_eq!(from_fragment, explicit);
    }

    #[test]
    fn test_classify_git_url() {
        let reference = classify("https://github.com/org/plugin.git", &FetchOptions::default());
        assert!(reference.is_git());
    }

    #[test]
    fn test_classify_drive_letter_is_not_git() {
        let reference = classify("C:\\plugins\\camera", &FetchOptions::default());
        assert!(matches!(reference, PluginReference::LocalPath { .. }));
    }

    #[test]
    fn test_classify_file_url_is_not_git() {
        let reference = classify("file:///tmp/camera", &FetchOptions::default());
        assert!(!reference.is_git());
    }

    #[test]
    fn test_classify_registry_id_with_version() {
        let reference = classify("org.example.camera@1.2.3", &FetchOptions::default());
        assert_eq!(
            reference,
            PluginReference::RegistryId {
                id: "org.example.camera".to_string(),
                version_spec: Some("1.2.3".to_string()),
            }
        );
    }

    #[test]
    fn test_classify_relative_path() {
        let reference = classify("./plugins/camera", &FetchOptions::default());
        assert_eq!(
            reference,
            PluginReference::LocalPath {
                path: PathBuf::from("./plugins/camera")
            }
        );
    }

    #[test]
    fn test_normalize_subdir() {
        assert_eq!(normalize_subdir("/a/b/"), "a/b");
        assert_eq!(normalize_subdir("\\a\\"), "a");
        assert_eq!(normalize_subdir("/"), ".");
    }
}

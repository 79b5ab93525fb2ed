//! # Handler Manifests
//!
//! A handler directory holds one TOML manifest per enabled handler:
//!
//! ```toml
//! handler = "start"    # catalog name, required
//! priority = 6         # optional override
//! enabled = true       # optional, defaults to true
//!
//! [settings]           # optional, passed to the factory
//! greeting = "hello"
//! ```
//!
//! Manifests are discovered in sorted filename order, which is also the
//! tie-break order for equal priorities.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::catalog::HandlerSettings;
use super::DiscoveryError;
use crate::constants::HANDLER_MANIFEST_EXTENSION;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerManifest {
    pub handler: String,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub settings: HandlerSettings,
}

fn default_enabled() -> bool {
    true
}

impl HandlerManifest {
    pub fn from_path(path: &Path) -> Result<Self, DiscoveryError> {
        let content =
            fs::read_to_string(path).map_err(|e| DiscoveryError::unreadable(path, e.to_string()))?;
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self, DiscoveryError> {
        let manifest: Self =
            toml::from_str(content).map_err(|e| DiscoveryError::invalid_manifest(path, e.to_string()))?;
        if manifest.handler.trim().is_empty() {
            return Err(DiscoveryError::invalid_manifest(path, "handler name is empty"));
        }
        Ok(manifest)
    }
}

/// Manifest paths in `directory`, sorted by filename.
pub fn discover_manifests(directory: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let entries =
        fs::read_dir(directory).map_err(|e| DiscoveryError::unreadable(directory, e.to_string()))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(HANDLER_MANIFEST_EXTENSION)
        })
        .collect();
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_manifest() {
        let manifest = HandlerManifest::parse(
            Path::new("start.toml"),
            r#"
            handler = "start"
            priority = 3
            enabled = false

            [settings]
            greeting = "hi"
            "#,
        )
        .unwrap();

        assert_eq!(manifest.handler, "start");
        assert_eq!(manifest.priority, Some(3));
        assert!(!manifest.enabled);
        assert_eq!(manifest.settings["greeting"].as_str(), Some("hi"));
    }

    #[test]
    fn test_defaults() {
        let manifest = HandlerManifest::parse(Path::new("t.toml"), r#"handler = "trace""#).unwrap();
        assert_eq!(manifest.priority, None);
        assert!(manifest.enabled);
        assert!(manifest.settings.is_empty());
    }

    #[test]
    fn test_invalid_manifests() {
        for content in ["priority = 1", "handler = \"\"", "handler = 5", "handler = \"x\"\nbogus = 1"] {
            let err = HandlerManifest::parse(Path::new("bad.toml"), content).unwrap_err();
            assert!(
                matches!(err, DiscoveryError::InvalidManifest { .. }),
                "{content:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_discovery_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["20-b.toml", "10-a.toml", "readme.md", "30-c.toml.bak"] {
            fs::write(dir.path().join(name), "handler = \"x\"").unwrap();
        }
        fs::create_dir(dir.path().join("nested.toml")).unwrap();

        let names: Vec<String> = discover_manifests(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["10-a.toml", "20-b.toml"]);
    }
}

//! Loader manifest parsing (classkit.toml)

use crate::inventory::{Inventory, DEFAULT_EXTENSION};
use crate::ClassResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during manifest parsing
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Failed to read manifest file
    #[error("Failed to read manifest file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse manifest: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid manifest: {0}")]
    ValidationError(String),
}

/// Loader manifest (classkit.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoaderManifest {
    /// Loader settings
    #[serde(default)]
    pub loader: LoaderSettings,

    /// Namespace prefix -> directory
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
}

/// `[loader]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoaderSettings {
    /// Declaration file extension
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Base directory for names without a registered prefix
    #[serde(default)]
    pub root: String,

    /// Allow synchronous loading fallbacks
    #[serde(default = "default_sync")]
    pub sync: bool,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            root: String::new(),
            sync: default_sync(),
        }
    }
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

fn default_sync() -> bool {
    true
}

impl LoaderManifest {
    /// Parse a manifest from a file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a manifest from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ManifestError> {
        let mut manifest: LoaderManifest = toml::from_str(content)?;
        manifest.validate()?;
        manifest.loader.extension = manifest
            .loader
            .extension
            .trim_start_matches('.')
            .to_string();
        Ok(manifest)
    }

    /// Validate the manifest
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.loader.extension.trim_start_matches('.').is_empty() {
            return Err(ManifestError::ValidationError(
                "loader.extension cannot be empty".to_string(),
            ));
        }
        for (prefix, dir) in &self.paths {
            if prefix.trim().is_empty() {
                return Err(ManifestError::ValidationError(
                    "path prefixes cannot be empty".to_string(),
                ));
            }
            if prefix.starts_with('.') || prefix.ends_with('.') {
                return Err(ManifestError::ValidationError(format!(
                    "Invalid path prefix: {}",
                    prefix
                )));
            }
            if dir.trim().is_empty() {
                return Err(ManifestError::ValidationError(format!(
                    "Path for prefix {} cannot be empty",
                    prefix
                )));
            }
        }
        Ok(())
    }

    /// Write manifest to a file
    pub fn to_file(&self, path: &Path) -> Result<(), ManifestError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ManifestError::ValidationError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Copy paths, root and extension into an inventory
    pub fn apply(&self, inventory: &mut Inventory) -> ClassResult<()> {
        inventory.set_extension(&self.loader.extension);
        inventory.set_root(&self.loader.root);
        for (prefix, dir) in &self.paths {
            inventory.set_path(prefix, dir)?;
        }
        Ok(())
    }
}

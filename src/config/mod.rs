//! Configuration system for gh-app-auth
//!
//! Loads credential profiles from a TOML or YAML file and validates them
//! before anything else is allowed to use them.

mod entry;
mod types;

pub use entry::*;
pub use types::*;

use crate::paths::{expand_path, PathError};
use crate::router::CredentialResolver;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// Default configuration location, relative to the home directory
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/gh/extensions/gh-app-auth/config.yml";

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Path(#[from] PathError),
}

/// Where the configuration comes from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    /// An explicit file chosen by the caller
    Path(PathBuf),
    /// [`DEFAULT_CONFIG_PATH`]
    #[default]
    Default,
}

impl ConfigSource {
    /// Build a source from an optional caller-supplied path
    pub fn from_option(path: Option<PathBuf>) -> Self {
        path.map_or(ConfigSource::Default, ConfigSource::Path)
    }

    /// Resolve the source to an absolute file path
    pub fn path(&self) -> Result<PathBuf, PathError> {
        match self {
            ConfigSource::Path(path) => {
                let raw = path
                    .to_str()
                    .ok_or_else(|| PathError::NotUnicode(path.clone()))?;
                expand_path(raw)
            }
            ConfigSource::Default => expand_path(DEFAULT_CONFIG_PATH),
        }
    }
}

/// On-disk configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Pick the format from a file extension; anything but `.toml` is YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// A validated set of credential profiles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Schema revision; only its presence is checked
    pub version: String,
    /// GitHub Apps first, then personal access tokens, each in file order
    pub entries: Vec<CredentialEntry>,
}

impl Config {
    /// Load and validate configuration from a source
    pub async fn load(source: &ConfigSource) -> Result<Self, ConfigError> {
        let path = source.path()?;

        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }

        debug!(path = %path.display(), "Loading configuration");
        let content = fs::read_to_string(&path).await?;
        let config = Self::parse(&content, ConfigFormat::from_path(&path))?;
        debug!(entries = config.entries.len(), "Configuration loaded");

        Ok(config)
    }

    /// Parse and validate configuration from a string
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let raw: RawConfig = match format {
            ConfigFormat::Toml => {
                toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?
            }
            // An empty YAML document is `null`, not an empty mapping
            ConfigFormat::Yaml if content.trim().is_empty() => RawConfig::default(),
            ConfigFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?,
        };

        let config = Self::from(raw);
        config.validate()?;
        Ok(config)
    }

    /// Check every structural invariant, stopping at the first violation.
    ///
    /// Order: version, entry list, then each entry in order. Entry errors are
    /// prefixed with the list and index the entry was declared at.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version.is_empty() {
            return Err(ValidationError::MissingVersion);
        }

        if self.entries.is_empty() {
            return Err(ValidationError::NoEntries);
        }

        let mut apps = 0;
        let mut pats = 0;
        let mut seen = HashSet::new();

        for entry in &self.entries {
            let counter = match entry.kind {
                CredentialKind::GitHubApp(_) => &mut apps,
                CredentialKind::Pat(_) => &mut pats,
            };
            let path = format!("{}[{}]", entry.kind.section(), counter);
            *counter += 1;

            entry
                .validate()
                .and_then(|()| {
                    if seen.insert(entry.name.as_str()) {
                        Ok(())
                    } else {
                        Err(ValidationError::DuplicateName(entry.name.clone()))
                    }
                })
                .map_err(|error| ValidationError::Entry {
                    path,
                    error: Box::new(error),
                })?;
        }

        Ok(())
    }

    /// All entries ordered by priority (highest first), ties broken by name
    pub fn by_priority(&self) -> Vec<&CredentialEntry> {
        crate::router::by_priority(self.entries.iter())
    }

    /// A resolver over this configuration's entries
    pub fn resolver(&self) -> CredentialResolver<'_> {
        CredentialResolver::new(&self.entries)
    }
}

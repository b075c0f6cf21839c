//! Raw configuration types for TOML and YAML parsing
//!
//! Every field is optional here so that a structurally incomplete file still
//! parses; the validator then reports exactly which rule it breaks.

use super::*;
use serde::Deserialize;

/// Raw configuration as parsed from disk
#[derive(Debug, Default, Deserialize)]
pub struct RawConfig {
    pub version: Option<String>,
    #[serde(default)]
    pub github_apps: Vec<RawGitHubApp>,
    #[serde(default)]
    pub pats: Vec<RawPat>,
}

#[derive(Debug, Deserialize)]
pub struct RawGitHubApp {
    pub name: Option<String>,
    pub app_id: Option<i64>,
    pub installation_id: Option<i64>,
    pub private_key_path: Option<String>,
    pub private_key_source: Option<SecretSource>,
    #[serde(default)]
    pub patterns: Vec<String>,
    pub priority: Option<i64>,
}

impl From<RawGitHubApp> for CredentialEntry {
    fn from(raw: RawGitHubApp) -> Self {
        Self {
            name: raw.name.unwrap_or_default(),
            patterns: raw.patterns,
            priority: raw.priority.unwrap_or_default(),
            kind: CredentialKind::GitHubApp(GitHubApp {
                app_id: raw.app_id.unwrap_or_default(),
                installation_id: raw.installation_id.unwrap_or_default(),
                private_key_path: raw.private_key_path,
                private_key_source: raw.private_key_source,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawPat {
    pub name: Option<String>,
    pub token_path: Option<String>,
    pub token_source: Option<SecretSource>,
    pub username: Option<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
    pub priority: Option<i64>,
}

impl From<RawPat> for CredentialEntry {
    fn from(raw: RawPat) -> Self {
        Self {
            name: raw.name.unwrap_or_default(),
            patterns: raw.patterns,
            priority: raw.priority.unwrap_or_default(),
            kind: CredentialKind::Pat(PersonalAccessToken {
                token_path: raw.token_path,
                token_source: raw.token_source,
                username: raw.username,
            }),
        }
    }
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        let entries = raw
            .github_apps
            .into_iter()
            .map(CredentialEntry::from)
            .chain(raw.pats.into_iter().map(CredentialEntry::from))
            .collect();

        Self {
            version: raw.version.unwrap_or_default(),
            entries,
        }
    }
}

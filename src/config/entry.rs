//! Credential entries and their structural validation

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Username git should send alongside an installation or personal token
pub const TOKEN_USERNAME: &str = "x-access-token";

/// A structural configuration error.
///
/// The `Display` output is the user-facing message and is stable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("version is required")]
    MissingVersion,

    #[error("at least one github_app or pat is required")]
    NoEntries,

    #[error("name is required")]
    MissingName,

    #[error("app_id must be positive")]
    NonPositiveAppId,

    #[error("installation_id cannot be negative")]
    NegativeInstallationId,

    #[error("{path_field} or {source_field} is required")]
    MissingSecret {
        path_field: &'static str,
        source_field: &'static str,
    },

    #[error("{path_field} and {source_field} are mutually exclusive")]
    ConflictingSecret {
        path_field: &'static str,
        source_field: &'static str,
    },

    #[error("at least one pattern is required")]
    NoPatterns,

    #[error("patterns[{0}] cannot be empty")]
    EmptyPattern(usize),

    #[error("name \"{0}\" is already used by another entry")]
    DuplicateName(String),

    /// An entry-level error, addressed by the list and index it came from
    #[error("{path}: {error}")]
    Entry {
        path: String,
        error: Box<ValidationError>,
    },
}

/// Where key or token material lives when it is not a plain file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecretSource {
    /// Read from an environment variable
    Env { var: String },
    /// Held by the OS keyring under the entry's name
    Keyring,
}

/// A GitHub App credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitHubApp {
    pub app_id: i64,
    /// `0` means the installation is discovered at runtime
    pub installation_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_source: Option<SecretSource>,
}

impl GitHubApp {
    /// Whether the installation id has to be discovered at runtime
    pub fn auto_detects_installation(&self) -> bool {
        self.installation_id == 0
    }
}

/// A personal access token credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonalAccessToken {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_source: Option<SecretSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl PersonalAccessToken {
    /// Username to present to git, defaulting to [`TOKEN_USERNAME`]
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(TOKEN_USERNAME)
    }
}

/// Variant-specific part of a credential entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CredentialKind {
    #[serde(rename = "github_app")]
    GitHubApp(GitHubApp),
    #[serde(rename = "pat")]
    Pat(PersonalAccessToken),
}

impl CredentialKind {
    /// Name of the configuration list this kind of entry is declared in
    pub fn section(&self) -> &'static str {
        match self {
            CredentialKind::GitHubApp(_) => "github_apps",
            CredentialKind::Pat(_) => "pats",
        }
    }
}

impl std::fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialKind::GitHubApp(_) => write!(f, "github_app"),
            CredentialKind::Pat(_) => write!(f, "pat"),
        }
    }
}

/// A credential profile: identity, applicability patterns and priority,
/// plus the variant payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialEntry {
    pub name: String,
    pub patterns: Vec<String>,
    pub priority: i64,
    #[serde(flatten)]
    pub kind: CredentialKind,
}

impl CredentialEntry {
    /// Create a GitHub App entry
    pub fn github_app(name: impl Into<String>, app: GitHubApp) -> Self {
        Self {
            name: name.into(),
            patterns: Vec::new(),
            priority: 0,
            kind: CredentialKind::GitHubApp(app),
        }
    }

    /// Create a personal access token entry
    pub fn pat(name: impl Into<String>, pat: PersonalAccessToken) -> Self {
        Self {
            name: name.into(),
            patterns: Vec::new(),
            priority: 0,
            kind: CredentialKind::Pat(pat),
        }
    }

    /// Add a pattern
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Check the entry's structural invariants, stopping at the first violation.
    ///
    /// Order: name, app id, installation id, key/token source, pattern list,
    /// individual patterns.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::MissingName);
        }

        match &self.kind {
            CredentialKind::GitHubApp(app) => {
                if app.app_id <= 0 {
                    return Err(ValidationError::NonPositiveAppId);
                }
                if app.installation_id < 0 {
                    return Err(ValidationError::NegativeInstallationId);
                }
                exactly_one(
                    app.private_key_path.as_deref(),
                    app.private_key_source.as_ref(),
                    "private_key_path",
                    "private_key_source",
                )?;
            }
            CredentialKind::Pat(pat) => {
                exactly_one(
                    pat.token_path.as_deref(),
                    pat.token_source.as_ref(),
                    "token_path",
                    "token_source",
                )?;
            }
        }

        if self.patterns.is_empty() {
            return Err(ValidationError::NoPatterns);
        }

        if let Some(index) = self.patterns.iter().position(|p| p.is_empty()) {
            return Err(ValidationError::EmptyPattern(index));
        }

        Ok(())
    }
}

/// An empty path counts as absent.
fn exactly_one(
    path: Option<&str>,
    source: Option<&SecretSource>,
    path_field: &'static str,
    source_field: &'static str,
) -> Result<(), ValidationError> {
    let has_path = path.is_some_and(|p| !p.is_empty());
    match (has_path, source.is_some()) {
        (true, false) | (false, true) => Ok(()),
        (false, false) => Err(ValidationError::MissingSecret {
            path_field,
            source_field,
        }),
        (true, true) => Err(ValidationError::ConflictingSecret {
            path_field,
            source_field,
        }),
    }
}

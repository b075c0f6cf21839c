//! Token issuance boundary
//!
//! Minting an installation token (signing the app JWT, exchanging it with
//! GitHub, discovering the installation) happens outside this crate. This
//! module defines what an issuer is handed and what it must give back.

use crate::config::{GitHubApp, SecretSource};
use crate::paths::{expand_path, PathError};
use crate::Secret;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

/// Token issuance errors
#[derive(Error, Debug)]
pub enum IssueError {
    #[error("Invalid app credential '{entry}': {reason}")]
    InvalidRequest { entry: String, reason: String },

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("Token issuance failed: {0}")]
    Failed(String),
}

/// Which installation of the app to mint a token for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Installation {
    /// A configured installation id
    Id(u64),
    /// Look the installation up for the target repository at runtime
    AutoDetect,
}

impl std::fmt::Display for Installation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Installation::Id(id) => write!(f, "{}", id),
            Installation::AutoDetect => write!(f, "auto-detect"),
        }
    }
}

/// Where the app's private key can be found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// Absolute path to a key file
    Path(PathBuf),
    /// Name of an environment variable holding the key
    Env(String),
    /// OS keyring item stored under the entry's name
    Keyring { entry: String },
}

impl std::fmt::Display for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyMaterial::Path(path) => write!(f, "{}", path.display()),
            KeyMaterial::Env(var) => write!(f, "env:{}", var),
            KeyMaterial::Keyring { entry } => write!(f, "keyring:{}", entry),
        }
    }
}

/// Everything an issuer needs to mint a token for one GitHub App entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppTokenRequest {
    /// Name of the configuration entry
    pub entry: String,
    pub app_id: u64,
    pub installation: Installation,
    pub private_key: KeyMaterial,
    /// Repository the token is for, used for installation discovery
    pub target: Option<String>,
}

impl AppTokenRequest {
    /// Build a request from a validated app entry, expanding its key path
    pub fn from_app(entry: &str, app: &GitHubApp) -> Result<Self, IssueError> {
        let invalid = |reason: &str| IssueError::InvalidRequest {
            entry: entry.to_string(),
            reason: reason.to_string(),
        };

        let app_id = u64::try_from(app.app_id)
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| invalid("app_id must be positive"))?;

        let installation = match u64::try_from(app.installation_id) {
            Ok(0) => Installation::AutoDetect,
            Ok(id) => Installation::Id(id),
            Err(_) => return Err(invalid("installation_id cannot be negative")),
        };

        let private_key = match (&app.private_key_path, &app.private_key_source) {
            (Some(path), None) if !path.is_empty() => KeyMaterial::Path(expand_path(path)?),
            (None, Some(SecretSource::Env { var })) => KeyMaterial::Env(var.clone()),
            (None, Some(SecretSource::Keyring)) => KeyMaterial::Keyring {
                entry: entry.to_string(),
            },
            _ => {
                return Err(invalid(
                    "exactly one of private_key_path or private_key_source is required",
                ))
            }
        };

        Ok(Self {
            entry: entry.to_string(),
            app_id,
            installation,
            private_key,
            target: None,
        })
    }

    /// Attach the repository the token is requested for
    pub fn for_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// A token handed back by an issuer
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: Secret,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Create a token without a known expiry
    pub fn new(token: impl Into<Secret>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    /// Set the expiry
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// Mints installation tokens for GitHub App entries
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Obtain a token for the given app and installation
    async fn issue(&self, request: &AppTokenRequest) -> Result<AccessToken, IssueError>;
}

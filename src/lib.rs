//! gh-app-auth - GitHub App credential routing for git
//!
//! Picks the GitHub App (or personal access token) that should authenticate
//! a given repository. Profiles are declared in a configuration file, each
//! with glob patterns and a priority; the highest-priority matching profile
//! wins, with ties broken by name.
//!
//! ```
//! use gh_app_auth::config::{Config, ConfigFormat};
//!
//! let config = Config::parse(
//!     r#"
//! version = "1"
//!
//! [[github_apps]]
//! name = "acme"
//! app_id = 123456
//! private_key_path = "~/.config/gh-app-auth/acme.pem"
//! patterns = ["github.com/acme/*"]
//! priority = 10
//! "#,
//!     ConfigFormat::Toml,
//! )
//! .unwrap();
//!
//! let entry = config.resolver().best("github.com/acme/widgets").unwrap();
//! assert_eq!(entry.name, "acme");
//! ```

pub mod config;
pub mod helper;
pub mod issuer;
pub mod paths;
pub mod router;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Core error types for gh-app-auth
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("{0}")]
    Validation(#[from] config::ValidationError),

    #[error("{0}")]
    Router(#[from] router::RouterError),

    #[error("Path error: {0}")]
    Path(#[from] paths::PathError),

    #[error("Token error: {0}")]
    Issue(#[from] issuer::IssueError),

    #[error("Credential helper error: {0}")]
    Helper(#[from] helper::HelperError),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

/// A token or key value that is never printed by `Debug`
#[derive(Debug, Clone)]
pub struct Secret(SecretString);

impl Secret {
    /// Create a new secret from a string
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// Expose the secret value
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl From<String> for Secret {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Secret {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("ghs_supersecret");
        assert_eq!(secret.expose(), "ghs_supersecret");
        assert!(!format!("{:?}", secret).contains("ghs_supersecret"));
    }

    #[test]
    fn test_errors_display_verbatim() {
        let err = AuthError::from(config::ValidationError::MissingVersion);
        assert_eq!(err.to_string(), "version is required");

        let err = AuthError::from(router::RouterError::NoMatch("github.com/x/y".to_string()));
        assert_eq!(err.to_string(), "no credential entry matches 'github.com/x/y'");

        let err = AuthError::from(config::ConfigError::NotFound("/nope/config.yml".into()));
        assert_eq!(
            err.to_string(),
            "Configuration error: Configuration file not found: /nope/config.yml"
        );
    }
}

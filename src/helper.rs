//! git credential-helper protocol
//!
//! git writes `key=value` lines describing the remote it needs credentials
//! for and reads the same format back. See `gitcredentials(7)`.

use crate::config::{Config, CredentialKind, PersonalAccessToken, SecretSource, TOKEN_USERNAME};
use crate::issuer::{AppTokenRequest, IssueError, TokenIssuer};
use crate::paths::{expand_path, PathError};
use crate::router::RouterError;
use crate::Secret;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// Credential helper errors
#[derive(Error, Debug)]
pub enum HelperError {
    #[error(
        "no gh-app-auth credential matches '{0}'; add a pattern for it or let git fall back to another credential helper"
    )]
    NoMatch(String),

    #[error("credential request has neither host nor url")]
    MissingTarget,

    #[error("unknown credential operation: {0}")]
    UnknownOperation(String),

    #[error("entry '{entry}': token source '{source_kind}' is not supported by the credential helper")]
    UnsupportedSource {
        entry: String,
        source_kind: &'static str,
    },

    #[error("entry '{entry}': failed to read token from {path}: {source}")]
    TokenFile {
        entry: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("entry '{entry}': environment variable {var} is not set")]
    TokenEnv { entry: String, var: String },

    #[error("entry '{entry}': token_path or token_source is required")]
    MissingTokenSource { entry: String },

    #[error("entry '{entry}': token is empty")]
    EmptyToken { entry: String },

    #[error(transparent)]
    Issue(#[from] IssueError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RouterError> for HelperError {
    fn from(err: RouterError) -> Self {
        match err {
            RouterError::NoMatch(target) => HelperError::NoMatch(target),
        }
    }
}

/// Operation git asks the helper to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Get,
    Store,
    Erase,
}

impl FromStr for Operation {
    type Err = HelperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get" => Ok(Operation::Get),
            "store" => Ok(Operation::Store),
            "erase" => Ok(Operation::Erase),
            other => Err(HelperError::UnknownOperation(other.to_string())),
        }
    }
}

/// Attributes git sends with a credential request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelperRequest {
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub path: Option<String>,
    pub username: Option<String>,
    pub url: Option<String>,
}

impl HelperRequest {
    /// Parse request attributes up to the first blank line.
    ///
    /// Lines without `=` and unknown keys are ignored.
    pub fn parse(input: &str) -> Self {
        let mut request = Self::default();
        for line in input.lines() {
            if line.is_empty() {
                break;
            }
            request.apply(line);
        }
        request
    }

    /// Read a request from an async reader, stopping at a blank line or EOF
    pub async fn read_from<R>(reader: &mut R) -> Result<Self, HelperError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut request = Self::default();
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                break;
            }
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                break;
            }
            request.apply(line);
        }
        Ok(request)
    }

    fn apply(&mut self, line: &str) {
        let Some((key, value)) = line.split_once('=') else {
            return;
        };
        let slot = match key {
            "protocol" => &mut self.protocol,
            "host" => &mut self.host,
            "path" => &mut self.path,
            "username" => &mut self.username,
            "url" => &mut self.url,
            _ => return,
        };
        *slot = Some(value.to_string());
    }

    /// The repository identifier to route on, e.g. `github.com/org/repo`.
    ///
    /// Built from `host` and `path` when a host is given, otherwise from `url`.
    ///
    /// git only sends `path` for HTTP remotes when `credential.useHttpPath` is
    /// enabled. Without it the target is the bare host (`github.com`), which
    /// per-organization patterns such as `github.com/org/*` never match:
    ///
    /// ```text
    /// git config --global credential.https://github.com.useHttpPath true
    /// ```
    pub fn target(&self) -> Result<String, HelperError> {
        if let Some(host) = self.host.as_deref().filter(|h| !h.is_empty()) {
            let joined = match self.path.as_deref().filter(|p| !p.is_empty()) {
                Some(path) => format!("{}/{}", host, path.trim_start_matches('/')),
                None => host.to_string(),
            };
            return Ok(normalize_target(&joined));
        }

        self.url
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(normalize_target)
            .ok_or(HelperError::MissingTarget)
    }
}

/// Reduce a remote URL to `host/owner/repo` form.
///
/// Strips the scheme, any user-info, trailing slashes and a `.git` suffix.
/// scp-style remotes (`git@github.com:org/repo.git`) are accepted too.
pub fn normalize_target(remote: &str) -> String {
    let (rest, had_scheme) = match remote.split_once("://") {
        Some((_, rest)) => (rest, true),
        None => (remote, false),
    };

    let authority_end = rest.find('/').unwrap_or(rest.len());
    let rest = match rest[..authority_end].rfind('@') {
        Some(at) => &rest[at + 1..],
        None => rest,
    };

    let mut target = rest.to_string();
    if !had_scheme {
        let first_slash = target.find('/').unwrap_or(target.len());
        if let Some(colon) = target[..first_slash].find(':') {
            target.replace_range(colon..=colon, "/");
        }
    }

    let trimmed = target.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    trimmed.trim_end_matches('/').to_string()
}

/// Credentials returned to git
#[derive(Debug, Clone)]
pub struct HelperResponse {
    pub username: String,
    pub password: Secret,
    /// Unix timestamp after which git should discard the password
    pub password_expiry_utc: Option<i64>,
}

impl HelperResponse {
    /// Render in credential-helper wire format
    pub fn to_protocol(&self) -> String {
        let mut out = format!(
            "username={}\npassword={}\n",
            self.username,
            self.password.expose()
        );
        if let Some(expiry) = self.password_expiry_utc {
            out.push_str(&format!("password_expiry_utc={}\n", expiry));
        }
        out
    }

    /// Write the response to an async writer
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<(), HelperError>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(self.to_protocol().as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Answers git credential requests from a validated configuration.
///
/// Routing needs the repository path; see [`HelperRequest::target`].
pub struct CredentialHelper<'a, I> {
    config: &'a Config,
    issuer: I,
}

impl<'a, I: TokenIssuer> CredentialHelper<'a, I> {
    /// Create a helper over a configuration and a token issuer
    pub fn new(config: &'a Config, issuer: I) -> Self {
        Self { config, issuer }
    }

    /// Handle one operation.
    ///
    /// `get` yields credentials; `store` and `erase` are accepted and yield
    /// nothing, since tokens are never persisted here.
    pub async fn handle(
        &self,
        operation: Operation,
        request: &HelperRequest,
    ) -> Result<Option<HelperResponse>, HelperError> {
        match operation {
            Operation::Get => self.get(request).await.map(Some),
            Operation::Store | Operation::Erase => {
                debug!(?operation, "Ignoring credential operation");
                Ok(None)
            }
        }
    }

    async fn get(&self, request: &HelperRequest) -> Result<HelperResponse, HelperError> {
        let target = request.target()?;
        let entry = self.config.resolver().best(&target)?;
        info!(repo = %target, entry = %entry.name, kind = %entry.kind, "Resolved credential");

        match &entry.kind {
            CredentialKind::GitHubApp(app) => {
                let token_request =
                    AppTokenRequest::from_app(&entry.name, app)?.for_target(&target);
                let token = self.issuer.issue(&token_request).await?;
                Ok(HelperResponse {
                    username: TOKEN_USERNAME.to_string(),
                    password: token.token,
                    password_expiry_utc: token.expires_at.map(|t| t.timestamp()),
                })
            }
            CredentialKind::Pat(pat) => Ok(HelperResponse {
                username: pat.username().to_string(),
                password: read_pat(&entry.name, pat).await?,
                password_expiry_utc: None,
            }),
        }
    }
}

async fn read_pat(entry: &str, pat: &PersonalAccessToken) -> Result<Secret, HelperError> {
    let raw = match (&pat.token_path, &pat.token_source) {
        (Some(path), _) if !path.is_empty() => {
            let path = expand_path(path)?;
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| HelperError::TokenFile {
                    entry: entry.to_string(),
                    path,
                    source,
                })?
        }
        (_, Some(SecretSource::Env { var })) => {
            std::env::var(var).map_err(|_| HelperError::TokenEnv {
                entry: entry.to_string(),
                var: var.clone(),
            })?
        }
        (_, Some(SecretSource::Keyring)) => {
            return Err(HelperError::UnsupportedSource {
                entry: entry.to_string(),
                source_kind: "keyring",
            })
        }
        _ => {
            return Err(HelperError::MissingTokenSource {
                entry: entry.to_string(),
            })
        }
    };

    let token = raw.trim();
    if token.is_empty() {
        return Err(HelperError::EmptyToken {
            entry: entry.to_string(),
        });
    }
    Ok(Secret::new(token))
}

//! Integration tests for the credential helper
//!
//! Tests the full flow: git request -> resolver -> token issuer -> response

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use gh_app_auth::config::{Config, ConfigFormat};
use gh_app_auth::helper::{CredentialHelper, HelperError, HelperRequest, Operation};
use gh_app_auth::issuer::{
    AccessToken, AppTokenRequest, Installation, IssueError, KeyMaterial, TokenIssuer,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tempfile::tempdir;

/// Issuer that records requests and hands out a fixed token
#[derive(Default, Clone)]
struct RecordingIssuer {
    requests: Arc<Mutex<Vec<AppTokenRequest>>>,
}

#[async_trait]
impl TokenIssuer for RecordingIssuer {
    async fn issue(&self, request: &AppTokenRequest) -> Result<AccessToken, IssueError> {
        self.requests.lock().push(request.clone());
        Ok(AccessToken::new(format!("ghs_{}", request.app_id))
            .with_expiry(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()))
    }
}

/// Issuer that always fails
struct FailingIssuer;

#[async_trait]
impl TokenIssuer for FailingIssuer {
    async fn issue(&self, _request: &AppTokenRequest) -> Result<AccessToken, IssueError> {
        Err(IssueError::Failed("installation not found".to_string()))
    }
}

fn config(extra: &str) -> Config {
    let content = format!(
        r#"
version = "1"

[[github_apps]]
name = "org-app"
app_id = 1001
installation_id = 0
private_key_path = "/keys/org.pem"
patterns = ["github.com/org/*"]
priority = 10
{}
"#,
        extra
    );
    Config::parse(&content, ConfigFormat::Toml).unwrap()
}

fn request(path: &str) -> HelperRequest {
    HelperRequest::parse(&format!("protocol=https\nhost=github.com\npath={}\n", path))
}

/// App entries go through the issuer and come back as x-access-token credentials
#[tokio::test]
async fn test_get_app_token() {
    let config = config("");
    let issuer = RecordingIssuer::default();
    let helper = CredentialHelper::new(&config, issuer.clone());

    let response = helper
        .handle(Operation::Get, &request("org/repo.git"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        response.to_protocol(),
        "username=x-access-token\npassword=ghs_1001\npassword_expiry_utc=1893456000\n"
    );

    let requests = issuer.requests.lock();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].entry, "org-app");
    assert_eq!(requests[0].installation, Installation::AutoDetect);
    assert_eq!(requests[0].target.as_deref(), Some("github.com/org/repo"));
    assert!(matches!(requests[0].private_key, KeyMaterial::Path(_)));
}

/// A miss is reported distinctly so git can fall back
#[tokio::test]
async fn test_get_no_match() {
    let config = config("");
    let issuer = RecordingIssuer::default();
    let helper = CredentialHelper::new(&config, issuer.clone());

    let err = helper
        .handle(Operation::Get, &request("other/repo"))
        .await
        .unwrap_err();

    match err {
        HelperError::NoMatch(target) => assert_eq!(target, "github.com/other/repo"),
        other => panic!("unexpected error: {}", other),
    }
    assert!(issuer.requests.lock().is_empty());
}

/// store and erase never touch the issuer
#[tokio::test]
async fn test_store_and_erase_are_noops() {
    let config = config("");
    let issuer = RecordingIssuer::default();
    let helper = CredentialHelper::new(&config, issuer.clone());

    for op in [Operation::Store, Operation::Erase] {
        let response = helper.handle(op, &request("org/repo")).await.unwrap();
        assert!(response.is_none());
    }
    assert!(issuer.requests.lock().is_empty());
}

/// PAT entries read their token from a file
#[tokio::test]
async fn test_get_pat_from_file() {
    let dir = tempdir().unwrap();
    let token_path = dir.path().join("token");
    tokio::fs::write(&token_path, "ghp_filetoken\n").await.unwrap();

    let config = config(&format!(
        r#"
[[pats]]
name = "personal"
token_path = "{}"
username = "octocat"
patterns = ["github.com/*"]
"#,
        token_path.display().to_string().replace('\\', "\\\\")
    ));
    let helper = CredentialHelper::new(&config, FailingIssuer);

    let response = helper
        .handle(Operation::Get, &request("someone/else"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        response.to_protocol(),
        "username=octocat\npassword=ghp_filetoken\n"
    );
}

/// PAT entries read their token from an environment variable
#[tokio::test]
async fn test_get_pat_from_env() {
    std::env::set_var("GH_APP_AUTH_TEST_PAT_FROM_ENV", "  ghp_envtoken\n");
    let config = config(
        r#"
[[pats]]
name = "ci"
token_source = { type = "env", var = "GH_APP_AUTH_TEST_PAT_FROM_ENV" }
patterns = ["github.com/*"]
"#,
    );
    let helper = CredentialHelper::new(&config, FailingIssuer);

    let response = helper
        .handle(Operation::Get, &request("someone/else"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        response.to_protocol(),
        "username=x-access-token\npassword=ghp_envtoken\n"
    );
}

/// An unset token variable names the entry and the variable
#[tokio::test]
async fn test_pat_env_unset() {
    std::env::remove_var("GH_APP_AUTH_TEST_PAT_UNSET");
    let config = config(
        r#"
[[pats]]
name = "ci"
token_source = { type = "env", var = "GH_APP_AUTH_TEST_PAT_UNSET" }
patterns = ["github.com/*"]
"#,
    );
    let helper = CredentialHelper::new(&config, FailingIssuer);

    let err = helper
        .handle(Operation::Get, &request("someone/else"))
        .await
        .unwrap_err();
    match err {
        HelperError::TokenEnv { entry, var } => {
            assert_eq!(entry, "ci");
            assert_eq!(var, "GH_APP_AUTH_TEST_PAT_UNSET");
        }
        other => panic!("unexpected error: {}", other),
    }
}

/// A missing token file is reported with its path
#[tokio::test]
async fn test_pat_token_file_missing() {
    let dir = tempdir().unwrap();
    let token_path = dir.path().join("absent-token");

    let config = config(&format!(
        r#"
[[pats]]
name = "personal"
token_path = "{}"
patterns = ["github.com/*"]
"#,
        token_path.display().to_string().replace('\\', "\\\\")
    ));
    let helper = CredentialHelper::new(&config, FailingIssuer);

    let err = helper
        .handle(Operation::Get, &request("someone/else"))
        .await
        .unwrap_err();
    match err {
        HelperError::TokenFile { entry, path, .. } => {
            assert_eq!(entry, "personal");
            assert_eq!(path, token_path);
        }
        other => panic!("unexpected error: {}", other),
    }
}

/// A token file holding only whitespace is rejected
#[tokio::test]
async fn test_pat_token_file_blank() {
    let dir = tempdir().unwrap();
    let token_path = dir.path().join("token");
    tokio::fs::write(&token_path, "  \n\t\n").await.unwrap();

    let config = config(&format!(
        r#"
[[pats]]
name = "personal"
token_path = "{}"
patterns = ["github.com/*"]
"#,
        token_path.display().to_string().replace('\\', "\\\\")
    ));
    let helper = CredentialHelper::new(&config, FailingIssuer);

    let err = helper
        .handle(Operation::Get, &request("someone/else"))
        .await
        .unwrap_err();
    assert!(matches!(err, HelperError::EmptyToken { entry } if entry == "personal"));
}

/// Keyring-held PATs are rejected with a specific error
#[tokio::test]
async fn test_pat_keyring_unsupported() {
    let config = config(
        r#"
[[pats]]
name = "vault"
token_source = { type = "keyring" }
patterns = ["github.com/*"]
"#,
    );
    let helper = CredentialHelper::new(&config, FailingIssuer);

    let err = helper
        .handle(Operation::Get, &request("someone/else"))
        .await
        .unwrap_err();
    assert!(matches!(err, HelperError::UnsupportedSource { .. }));
}

/// Issuer failures propagate unchanged
#[tokio::test]
async fn test_issuer_failure_propagates() {
    let config = config("");
    let helper = CredentialHelper::new(&config, FailingIssuer);

    let err = helper
        .handle(Operation::Get, &request("org/repo"))
        .await
        .unwrap_err();
    assert!(matches!(err, HelperError::Issue(IssueError::Failed(_))));
}

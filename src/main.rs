//! gh-app-auth CLI - GitHub App credential routing for git
//!
//! Run `gh-app-auth --help` for usage information.

use clap::{Parser, Subcommand};
use gh_app_auth::config::{
    Config, ConfigError, ConfigSource, CredentialEntry, CredentialKind, SecretSource,
};
use gh_app_auth::helper::normalize_target;
use gh_app_auth::issuer::AppTokenRequest;
use gh_app_auth::AuthError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable that overrides the configuration path
const CONFIG_ENV: &str = "GH_APP_AUTH_CONFIG";

type CliResult = Result<(), AuthError>;

#[derive(Parser)]
#[command(
    name = "gh-app-auth",
    about = "Route git credentials to the right GitHub App for each repository",
    version
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show configuration file location and content
    Config {
        /// Show only the config file path
        #[arg(short, long)]
        path: bool,

        /// Show the config file content
        #[arg(short, long)]
        show: bool,
    },

    /// List configured credentials by priority
    List {
        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Check the configuration and report the first problem found
    Validate,

    /// Show which credential would be used for a repository
    Resolve {
        /// Repository, e.g. github.com/org/repo or a clone URL
        target: String,

        /// Show every matching credential in resolution order
        #[arg(short, long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is reserved for command output
    let log_level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    let source = ConfigSource::from_option(cli.config);

    let result = match cli.command {
        Commands::Config { path, show } => show_config(&source, path, show).await,
        Commands::List { format } => list_credentials(&source, format).await,
        Commands::Validate => validate_config(&source).await,
        Commands::Resolve { target, all } => resolve_target(&source, target, all).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Show the configuration path, its status, or its content
async fn show_config(source: &ConfigSource, path_only: bool, show_content: bool) -> CliResult {
    let config_path = source.path()?;

    if path_only {
        println!("{}", config_path.display());
        return Ok(());
    }

    let exists = config_path.exists();

    if !show_content {
        println!("Configuration file: {}", config_path.display());
        if std::env::var_os(CONFIG_ENV).is_some() {
            println!("   (set via {} environment variable)", CONFIG_ENV);
        }
        if exists {
            println!("   Status: exists");
        } else {
            println!("   Status: not found");
        }
        return Ok(());
    }

    if !exists {
        return Err(ConfigError::NotFound(config_path).into());
    }

    let content = tokio::fs::read_to_string(&config_path)
        .await
        .map_err(ConfigError::from)?;
    println!("# Configuration file: {}", config_path.display());
    println!("---");
    print!("{}", content);

    Ok(())
}

/// List configured credentials by priority
async fn list_credentials(source: &ConfigSource, format: String) -> CliResult {
    let config = Config::load(source).await?;
    let entries = config.by_priority();

    match format.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&entries)?;
            println!("{}", json);
        }
        _ => {
            println!(
                "{:<24} {:<11} {:>8} {:<10} {:<14} {}",
                "NAME", "TYPE", "PRIORITY", "APP_ID", "INSTALLATION", "PATTERNS"
            );
            println!("{}", "-".repeat(90));
            for entry in entries {
                let (app_id, installation) = match &entry.kind {
                    CredentialKind::GitHubApp(app) => (
                        app.app_id.to_string(),
                        if app.auto_detects_installation() {
                            "auto-detect".to_string()
                        } else {
                            app.installation_id.to_string()
                        },
                    ),
                    CredentialKind::Pat(_) => ("-".to_string(), "-".to_string()),
                };
                println!(
                    "{:<24} {:<11} {:>8} {:<10} {:<14} {}",
                    entry.name,
                    entry.kind,
                    entry.priority,
                    app_id,
                    installation,
                    entry.patterns.join(", ")
                );
            }
        }
    }

    Ok(())
}

/// Load and validate the configuration
async fn validate_config(source: &ConfigSource) -> CliResult {
    let config = Config::load(source).await?;

    let apps = config
        .entries
        .iter()
        .filter(|e| matches!(e.kind, CredentialKind::GitHubApp(_)))
        .count();
    let pats = config.entries.len() - apps;

    println!(
        "Configuration is valid: {} GitHub App(s), {} personal access token(s)",
        apps, pats
    );
    Ok(())
}

/// Show which credential applies to a repository
async fn resolve_target(source: &ConfigSource, target: String, all: bool) -> CliResult {
    let config = Config::load(source).await?;
    let target = normalize_target(&target);
    debug!(repo = %target, "Resolving credential");

    let resolver = config.resolver();

    if all {
        let matches = resolver.resolve(&target);
        if matches.is_empty() {
            // Surface the same miss as the single-entry path
            resolver.best(&target)?;
        }
        for (rank, entry) in matches.into_iter().enumerate() {
            println!(
                "{}. {} ({}, priority {})",
                rank + 1,
                entry.name,
                entry.kind,
                entry.priority
            );
        }
        return Ok(());
    }

    let entry = resolver.best(&target)?;
    describe_entry(entry, &target)
}

fn describe_entry(entry: &CredentialEntry, target: &str) -> CliResult {
    println!("Repository:   {}", target);
    println!("Credential:   {}", entry.name);
    println!("Type:         {}", entry.kind);
    println!("Priority:     {}", entry.priority);
    if let Some(pattern) = entry
        .patterns
        .iter()
        .find(|p| gh_app_auth::router::pattern_matches(p, target))
    {
        println!("Matched:      {}", pattern);
    }

    match &entry.kind {
        CredentialKind::GitHubApp(app) => {
            let request = AppTokenRequest::from_app(&entry.name, app)?;
            println!("App ID:       {}", request.app_id);
            println!("Installation: {}", request.installation);
            println!("Private key:  {}", request.private_key);
        }
        CredentialKind::Pat(pat) => {
            println!("Username:     {}", pat.username());
            let token = match (&pat.token_path, &pat.token_source) {
                (Some(path), _) => path.clone(),
                (None, Some(SecretSource::Env { var })) => format!("env:{}", var),
                (None, Some(SecretSource::Keyring)) => "keyring".to_string(),
                (None, None) => "-".to_string(),
            };
            println!("Token:        {}", token);
        }
    }

    Ok(())
}

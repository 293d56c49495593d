//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable
//! overrides. The configuration file path defaults to `config.yaml` but can
//! be specified via `-f` flag or `ACCESSCTL_CONFIG` environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources
//! override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `ACCESSCTL_` override YAML values
//!
//! For nested config values, use double underscores in environment
//! variables. For example, `ACCESSCTL_AUTH__TOKEN__EXPIRY=30m` sets the
//! `auth.token.expiry` field.
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! ACCESSCTL_PORT=8080
//!
//! # Point the store somewhere else
//! ACCESSCTL_DATABASE__PATH=/var/lib/accessctl/accessctl.db
//!
//! # Override nested values
//! ACCESSCTL_AUTH__ALLOW_REGISTRATION=false
//! ACCESSCTL_SECRET_KEY=change-me
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "ACCESSCTL_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment
/// variables. All fields have sensible defaults defined in the `Default`
/// implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Embedded database configuration
    pub database: DatabaseConfig,
    /// Email address for the initial admin user (created on first startup)
    pub admin_email: String,
    /// Password for the initial admin user (optional, can be set via environment)
    pub admin_password: Option<String>,
    /// Secret key for token signing (required for production)
    pub secret_key: Option<String>,
    /// Authentication configuration
    pub auth: AuthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database: DatabaseConfig::default(),
            admin_email: "admin@example.com".to_string(),
            admin_password: None,
            secret_key: None,
            auth: AuthConfig::default(),
        }
    }
}

/// Embedded SQLite database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Path of the database file; created on first start if missing
    pub path: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "accessctl.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Whether self-service registration is open
    pub allow_registration: bool,
    /// Password length policy for registration and password changes
    pub password: PasswordConfig,
    /// Bearer token issuance/validation settings
    pub token: TokenConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            allow_registration: true,
            password: PasswordConfig::default(),
            token: TokenConfig::default(),
        }
    }
}

/// Password length policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordConfig {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
        }
    }
}

/// Bearer token settings shared by the issuer and the validator.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokenConfig {
    /// `iss` claim stamped into and required from every token
    pub issuer: String,
    /// `aud` claim stamped into and required from every token
    pub audience: String,
    /// Token lifetime; expiry is an absolute UTC timestamp, no sliding window
    #[serde(with = "humantime_serde")]
    pub expiry: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: "accessctl".to_string(),
            audience: "accessctl-api".to_string(),
            expiry: Duration::from_secs(3600), // 1 hour
        }
    }
}

impl Config {
    /// Load configuration from the YAML file and `ACCESSCTL_`-prefixed
    /// environment variables.
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        // ACCESSCTL_CONFIG belongs to Args, not to the config schema
        Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("ACCESSCTL_").ignore(&["config"]).split("__"))
            .extract()
    }
}

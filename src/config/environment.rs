// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses env vars into a typed ServerConfig with sane local defaults
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Environment-based configuration management for production deployment

use crate::constants::{cookies, ttl};
use anyhow::{bail, Result};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

/// Deployment environment; drives cookie attributes and secret policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development: cookies without Secure/SameSite=Strict
    #[default]
    Local,
    Production,
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Local,
        }
    }

    /// Whether browser cookies should carry Secure + SameSite=Strict
    #[must_use]
    pub const fn strict_cookies(&self) -> bool {
        !matches!(self, Self::Local)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Signing secrets and lifetimes for the token authority
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Secret for the access-token family (access, verification, initial-login)
    pub access_secret: String,
    /// Distinct secret for refresh tokens
    pub refresh_secret: String,
    /// Access token lifetime in seconds
    pub access_ttl_secs: u64,
    /// Refresh token lifetime in seconds
    pub refresh_ttl_secs: u64,
    /// Magic-link / verification token lifetime in seconds
    pub ephemeral_ttl_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_secret: generate_secret(),
            refresh_secret: generate_secret(),
            access_ttl_secs: ttl::ACCESS_TOKEN_SECS,
            refresh_ttl_secs: ttl::REFRESH_TOKEN_SECS,
            ephemeral_ttl_secs: ttl::EPHEMERAL_TOKEN_SECS,
        }
    }
}

/// Cookie naming configuration
#[derive(Debug, Clone)]
pub struct CookieConfig {
    /// Prefix for all four auth cookie names
    pub prefix: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            prefix: cookies::DEFAULT_PREFIX.to_owned(),
        }
    }
}

/// Credentials for one OAuth provider
#[derive(Debug, Clone)]
pub struct OAuthProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl OAuthProviderConfig {
    /// Read `<PREFIX>_CLIENT_ID` / `<PREFIX>_CLIENT_SECRET` / `<PREFIX>_REDIRECT_URI`
    ///
    /// Returns `None` when the provider is not configured at all.
    fn from_env(prefix: &str, default_redirect: &str) -> Option<Self> {
        let client_id = env::var(format!("{prefix}_CLIENT_ID")).ok()?;
        let client_secret = env::var(format!("{prefix}_CLIENT_SECRET")).ok()?;
        let redirect_uri = env::var(format!("{prefix}_REDIRECT_URI"))
            .unwrap_or_else(|_| default_redirect.to_owned());
        Some(Self {
            client_id,
            client_secret,
            redirect_uri,
        })
    }
}

/// All configured OAuth providers; unset providers are simply not registered
#[derive(Debug, Clone, Default)]
pub struct OAuthConfig {
    pub google: Option<OAuthProviderConfig>,
    pub github: Option<OAuthProviderConfig>,
}

/// Top-level server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// Deployment environment
    pub environment: Environment,
    /// Base URL used when assembling magic links and OAuth redirects
    pub public_base_url: String,
    /// Token authority configuration
    pub tokens: TokenConfig,
    /// Cookie naming
    pub cookies: CookieConfig,
    /// Redis URL for the ephemeral store; in-memory backend when unset
    pub redis_url: Option<String>,
    /// OAuth provider credentials
    pub oauth: OAuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8087,
            environment: Environment::default(),
            public_base_url: "http://localhost:8087".to_owned(),
            tokens: TokenConfig::default(),
            cookies: CookieConfig::default(),
            redis_url: None,
            oauth: OAuthConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a value fails to parse, or if a signing secret is
    /// missing in the production environment.
    pub fn from_env() -> Result<Self> {
        let environment = Environment::from_str_or_default(
            &env::var("ENVIRONMENT").unwrap_or_default(),
        );

        let http_port = parse_env_or("HTTP_PORT", 8087)?;
        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{http_port}"));

        let tokens = TokenConfig {
            access_secret: secret_from_env("AMS_ACCESS_SECRET", &environment)?,
            refresh_secret: secret_from_env("AMS_REFRESH_SECRET", &environment)?,
            access_ttl_secs: parse_env_or("ACCESS_TOKEN_TTL_SECS", ttl::ACCESS_TOKEN_SECS)?,
            refresh_ttl_secs: parse_env_or("REFRESH_TOKEN_TTL_SECS", ttl::REFRESH_TOKEN_SECS)?,
            ephemeral_ttl_secs: parse_env_or(
                "EPHEMERAL_TOKEN_TTL_SECS",
                ttl::EPHEMERAL_TOKEN_SECS,
            )?,
        };

        let cookie_prefix =
            env::var("COOKIE_PREFIX").unwrap_or_else(|_| cookies::DEFAULT_PREFIX.to_owned());

        let oauth = OAuthConfig {
            google: OAuthProviderConfig::from_env(
                "GOOGLE",
                &format!("{public_base_url}/api/v1/ams/oauth/google/callback"),
            ),
            github: OAuthProviderConfig::from_env(
                "GITHUB",
                &format!("{public_base_url}/api/v1/ams/oauth/github/callback"),
            ),
        };

        Ok(Self {
            http_port,
            environment,
            public_base_url,
            tokens,
            cookies: CookieConfig {
                prefix: cookie_prefix,
            },
            redis_url: env::var("REDIS_URL").ok(),
            oauth,
        })
    }

    /// One-line startup summary with secrets elided
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "port={} env={} store={} oauth=[{}{}] base_url={}",
            self.http_port,
            self.environment,
            if self.redis_url.is_some() {
                "redis"
            } else {
                "memory"
            },
            if self.oauth.google.is_some() {
                "google "
            } else {
                ""
            },
            if self.oauth.github.is_some() {
                "github"
            } else {
                ""
            },
            self.public_base_url,
        )
    }
}

/// Parse an env var into `T`, falling back to `default` when unset
fn parse_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => Ok(value),
            Err(e) => bail!("invalid {key}={raw}: {e}"),
        },
        Err(_) => Ok(default),
    }
}

/// Fetch a signing secret, generating an ephemeral one outside production
fn secret_from_env(key: &str, environment: &Environment) -> Result<String> {
    match env::var(key) {
        Ok(secret) if !secret.is_empty() => Ok(secret),
        _ => {
            if *environment == Environment::Production {
                bail!("{key} must be set in the production environment");
            }
            warn!("{key} not set; generating an ephemeral signing secret");
            Ok(generate_secret())
        }
    }
}

/// Generate a random 64-character signing secret
fn generate_secret() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            Environment::from_str_or_default("production"),
            Environment::Production
        );
        assert_eq!(Environment::from_str_or_default("PROD"), Environment::Production);
        assert_eq!(Environment::from_str_or_default("test"), Environment::Testing);
        assert_eq!(Environment::from_str_or_default(""), Environment::Local);
    }

    #[test]
    fn test_strict_cookies_per_environment() {
        assert!(!Environment::Local.strict_cookies());
        assert!(Environment::Production.strict_cookies());
        assert!(Environment::Testing.strict_cookies());
    }

    #[test]
    fn test_generated_secrets_differ() {
        let config = TokenConfig::default();
        assert_eq!(config.access_secret.len(), 64);
        assert_ne!(config.access_secret, config.refresh_secret);
    }

    #[test]
    fn test_summary_elides_secrets() {
        let config = ServerConfig::default();
        let summary = config.summary();
        assert!(!summary.contains(&config.tokens.access_secret));
        assert!(summary.contains("store=memory"));
    }
}

//! Server configuration.
//!
//! Settings resolve in layers, later ones winning: built-in defaults, an
//! optional YAML file, then environment variables. The binary applies its
//! command-line flags on top.

use crate::error::Result;
use crate::gantt::DEFAULT_DATA_FILE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default listen address.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3025;

/// Origins allowed by CORS when none are configured (the editor's dev servers).
pub const DEFAULT_CORS_ORIGINS: [&str; 3] =
    ["http://localhost:5173", "http://localhost:5174", "http://localhost:5175"];

/// Default session cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "gantt_auth";

/// Default session lifetime in days.
pub const DEFAULT_COOKIE_MAX_AGE_DAYS: u64 = 30;

/// Authentication settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Name of the session cookie.
    pub cookie_name: String,
    /// HMAC key for signing session cookies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie_secret: Option<String>,
    /// Stored password hash, `salt:hex`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Session lifetime in days.
    pub cookie_max_age_days: u64,
    /// Whether to mark the session cookie `Secure`.
    pub secure_cookies: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_secret: None,
            password_hash: None,
            cookie_max_age_days: DEFAULT_COOKIE_MAX_AGE_DAYS,
            secure_cookies: false,
        }
    }
}

impl AuthConfig {
    /// Whether login can succeed at all.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.cookie_secret.is_some() && self.password_hash.is_some()
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("cookie_name", &self.cookie_name)
            .field("cookie_secret", &self.cookie_secret.as_ref().map(|_| "<redacted>"))
            .field("password_hash", &self.password_hash.as_ref().map(|_| "<redacted>"))
            .field("cookie_max_age_days", &self.cookie_max_age_days)
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

/// Complete server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Path of the JSON data file.
    pub data_path: PathBuf,
    /// Listen address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Origins allowed to make credentialed cross-origin requests.
    pub cors_origins: Vec<String>,
    /// Deployment environment name; `production` enables secure cookies.
    pub environment: String,
    /// Authentication settings.
    pub auth: AuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_FILE),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(ToString::to_string).collect(),
            environment: "development".to_string(),
            auth: AuthConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Resolve the configuration: defaults, then `file` if given, then the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `file` is given but cannot be read or parsed.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::load_from(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Load a YAML file; keys it omits keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yaml::from_str(&content)?;
        config.sync_secure_cookies();
        Ok(config)
    }

    /// Overlay settings from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay settings from `lookup`, which maps a variable name to its value.
    ///
    /// Empty values are ignored. Malformed numbers keep the current value
    /// and log a warning.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = var("DATA_PATH") {
            self.data_path = PathBuf::from(path);
        }
        if let Some(host) = var("HOST") {
            self.host = host;
        }
        if let Some(port) = var("PORT") {
            self.port = parse_number("PORT", &port, self.port);
        }
        if let Some(origins) = var("CORS_ORIGIN") {
            self.cors_origins = split_origins(&origins);
        }
        if let Some(environment) = var("APP_ENV") {
            self.environment = environment;
        }
        if let Some(name) = var("AUTH_COOKIE_NAME") {
            self.auth.cookie_name = name;
        }
        if let Some(secret) = var("AUTH_COOKIE_SECRET") {
            self.auth.cookie_secret = Some(secret);
        }
        if let Some(hash) = var("AUTH_PASSWORD_HASH") {
            self.auth.password_hash = Some(hash);
        }
        if let Some(days) = var("AUTH_COOKIE_MAX_AGE_DAYS") {
            self.auth.cookie_max_age_days =
                parse_number("AUTH_COOKIE_MAX_AGE_DAYS", &days, self.auth.cookie_max_age_days);
        }
        self.sync_secure_cookies();
    }

    /// Whether this is a production deployment.
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// The `host:port` string to bind.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Log the effective configuration at startup.
    pub fn log(&self) {
        tracing::info!(
            data_path = %self.data_path.display(),
            bind = %self.bind_addr(),
            environment = %self.environment,
            cors_origins = ?self.cors_origins,
            "server configuration"
        );
        if !self.auth.is_configured() {
            tracing::warn!(
                "AUTH_PASSWORD_HASH or AUTH_COOKIE_SECRET not set; logins will be refused"
            );
        }
    }

    fn sync_secure_cookies(&mut self) {
        if self.is_production() {
            self.auth.secure_cookies = true;
        }
    }
}

fn parse_number<T: std::str::FromStr + Copy + std::fmt::Display>(
    key: &str,
    raw: &str,
    current: T,
) -> T {
    raw.trim().parse().unwrap_or_else(|_| {
        tracing::warn!(key, value = raw, fallback = %current, "ignoring malformed number");
        current
    })
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|origin| !origin.is_empty()).map(String::from).collect()
}

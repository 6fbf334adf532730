use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::password::{CustomPolicyConfig, PasswordPolicy};

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "PHOTOSHARE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Longest accepted session lifetime, one year
pub const MAX_TIMEOUT_MINUTES: i64 = 60 * 24 * 365;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub photos: PhotosConfig,
    pub admin: AdminConfig,
    #[serde(default)]
    pub password: Option<PasswordConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret_key: String,
    pub timeout_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotosConfig {
    pub directory: String,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

fn default_max_upload_mb() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub default_login: String,
    pub default_password: String,
}

/// Password policy selection. `mode` is one of
/// no-validation, easy, medium, restrict, custom.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub mode: String,
    #[serde(default)]
    pub custom: Option<CustomPolicyConfig>,
}

impl Config {
    /// Reads the file named by `PHOTOSHARE_CONFIG`, or `config.json`
    pub fn from_env() -> Result<Self, ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let secret_override = std::env::var("JWT_SECRET").ok();
        Self::load(&path, secret_override)
    }

    /// Loads and validates a config file. A non-empty `secret_override`
    /// replaces the signing key from the file.
    #[instrument(skip(secret_override), fields(path = %path.as_ref().display()))]
    pub fn load(
        path: impl AsRef<Path>,
        secret_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mut config = Self::parse(&raw)?;
        if let Some(secret) = secret_override.filter(|s| !s.is_empty()) {
            info!("Using JWT secret from environment");
            config.jwt.secret_key = secret;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret_key.is_empty() {
            return Err(ConfigError::Invalid("jwt.secret_key must not be empty".to_string()));
        }
        if self.jwt.timeout_minutes <= 0 {
            return Err(ConfigError::Invalid(
                "jwt.timeout_minutes must be positive".to_string(),
            ));
        }
        if self.jwt.timeout_minutes > MAX_TIMEOUT_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "jwt.timeout_minutes must be at most {}",
                MAX_TIMEOUT_MINUTES
            )));
        }
        if self.photos.directory.is_empty() {
            return Err(ConfigError::Invalid("photos.directory must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Session lifetime, clamped to the accepted range for unvalidated configs
    pub fn session_timeout(&self) -> chrono::Duration {
        let minutes = self.jwt.timeout_minutes.clamp(0, MAX_TIMEOUT_MINUTES);
        chrono::Duration::try_minutes(minutes).unwrap_or_else(chrono::Duration::zero)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.photos.max_upload_mb.saturating_mul(1024 * 1024)
    }

    /// Policy for registrations. No password block means no validation.
    pub fn password_policy(&self) -> PasswordPolicy {
        match &self.password {
            Some(cfg) => PasswordPolicy::from_name(&cfg.mode, cfg.custom.as_ref()),
            None => {
                warn!("No password policy configured, registrations are not validated");
                PasswordPolicy::NoValidation
            }
        }
    }
}

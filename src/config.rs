//! Application configuration
//!
//! Loaded from a TOML file (default `~/.config/warehouse-auth/config.toml`).
//! Every section has defaults so a partial or missing file still yields a
//! usable configuration. `JWT_SECRET` and `DATABASE_URL` override the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{LockoutPolicy, PasswordPolicy};
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::infrastructure::DatabaseConfig;
use crate::shared::InfraError;

/// Env var naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "WAREHOUSE_AUTH_CONFIG";

const APP_DIR: &str = "warehouse-auth";

/// `~/.config/warehouse-auth/config.toml`, or `./config.toml` when no
/// config directory is known.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.toml")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSection,
    pub security: SecurityConfig,
    pub mail: MailConfig,
    pub admin: AdminConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds to wait for in-flight requests on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout: 30,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        let defaults = DatabaseConfig::default();
        Self {
            url: defaults.url,
            max_connections: defaults.max_connections,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub lockout_enabled: bool,
    pub max_failed_attempts: i32,
    pub lockout_minutes: i64,
    pub password: PasswordPolicy,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("lockout_enabled", &self.lockout_enabled)
            .field("max_failed_attempts", &self.max_failed_attempts)
            .field("lockout_minutes", &self.lockout_minutes)
            .field("password", &self.password)
            .finish()
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        let lockout = LockoutPolicy::default();
        Self {
            jwt_secret: "super-secret-key-change-in-production".to_string(),
            jwt_issuer: "warehouse-auth".to_string(),
            jwt_audience: "warehouse-bridge".to_string(),
            lockout_enabled: lockout.enabled,
            max_failed_attempts: lockout.max_failed_attempts,
            lockout_minutes: lockout.lockout_minutes,
            password: PasswordPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub from: String,
    pub subject: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: "no-reply@warehouse.local".to_string(),
            subject: crate::application::identity::confirmation::CONFIRMATION_SUBJECT.to_string(),
        }
    }
}

/// Account seeded on first start when the users table is empty
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            email: "admin@warehouse.local".to_string(),
            password: "Admin123!".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl AppConfig {
    /// Read the file at `path` and apply env overrides.
    ///
    /// A missing file is not an error: defaults are used instead.
    pub fn load(path: &Path) -> Result<Self, InfraError> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| InfraError::Config(format!("{}: {}", path.display(), e)))?;
            Self::from_toml(&raw)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, InfraError> {
        toml::from_str(raw).map_err(|e| InfraError::Config(e.to_string()))
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            if !secret.is_empty() {
                self.security.jwt_secret = secret;
            }
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                self.database.url = url;
            }
        }
    }

    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig {
            secret: self.security.jwt_secret.clone(),
            issuer: self.security.jwt_issuer.clone(),
            audience: self.security.jwt_audience.clone(),
        }
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
        }
    }

    pub fn lockout_policy(&self) -> LockoutPolicy {
        LockoutPolicy {
            enabled: self.security.lockout_enabled,
            max_failed_attempts: self.security.max_failed_attempts,
            lockout_minutes: self.security.lockout_minutes,
        }
    }

    pub fn password_policy(&self) -> PasswordPolicy {
        self.security.password.clone()
    }
}

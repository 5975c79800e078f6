use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// Secrets shorter than this are accepted but logged as weak.
pub const MIN_RECOMMENDED_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidOverride { key: &'static str, value: String },

    #[error("JWT signing secret is not configured (set auth.jwt_secret or JWT_SECRET)")]
    MissingJwtSecret,

    #[error("Database URL is not configured (set database.url or DATABASE_URL)")]
    MissingDatabaseUrl,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Super-admin credentials, consumed only by `--seed`
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Deadline for read-only store operations
    pub read_timeout_secs: u64,
    /// Deadline for mutations (registration, role administration)
    pub write_timeout_secs: u64,
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            acquire_timeout_secs: 5,
            read_timeout_secs: 5,
            write_timeout_secs: 15,
            run_migrations: true,
        }
    }
}

impl DatabaseConfig {
    pub fn deadlines(&self) -> Deadlines {
        Deadlines {
            read: Duration::from_secs(self.read_timeout_secs),
            write: Duration::from_secs(self.write_timeout_secs),
        }
    }
}

/// Per-request deadlines applied around store calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    pub read: Duration,
    pub write: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        DatabaseConfig::default().deadlines()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: Option<String>,
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub super_admin_email: Option<String>,
    #[serde(default)]
    pub super_admin_password: Option<String>,
}

impl AppConfig {
    /// Load `config/{env}.yaml`, apply environment overrides and validate.
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;
        let mut config = Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: config_path,
            source,
        })?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Overlay values from the environment (or any lookup, for tests).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidOverride {
                    key: "PORT",
                    value: port,
                })?;
        }
        if let Some(email) = lookup("SUPER_ADMIN_EMAIL") {
            self.bootstrap.super_admin_email = Some(email);
        }
        if let Some(pass) = lookup("SUPER_ADMIN_PASS") {
            self.bootstrap.super_admin_password = Some(pass);
        }
        Ok(())
    }

    /// Refuse to start without a signing secret or a database.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.jwt_secret()?;
        self.database_url()?;
        Ok(())
    }

    pub fn jwt_secret(&self) -> Result<&str, ConfigError> {
        match self.auth.jwt_secret.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() => Ok(secret),
            _ => Err(ConfigError::MissingJwtSecret),
        }
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        match self.database.url.as_deref() {
            Some(url) if !url.trim().is_empty() => Ok(url),
            _ => Err(ConfigError::MissingDatabaseUrl),
        }
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.token_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const DEV_YAML: &str = r#"
log_level: info
log_dir: ./logs
log_file: shop.log
use_json: false
rotation: daily
server:
  host: 0.0.0.0
  port: 8080
database:
  max_connections: 4
  acquire_timeout_secs: 5
  read_timeout_secs: 5
  write_timeout_secs: 15
  run_migrations: true
auth:
  token_ttl_secs: 3600
"#;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_missing_secret_fails_validation() {
        let mut config = AppConfig::from_yaml(DEV_YAML).unwrap();
        config
            .apply_overrides(|_| None)
            .expect("no overrides to apply");
        config.database.url = Some("postgres://localhost/shop".into());

        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingJwtSecret)
        ));
    }

    #[test]
    fn test_blank_secret_is_rejected() {
        let mut config = AppConfig::from_yaml(DEV_YAML).unwrap();
        config.auth.jwt_secret = Some("   ".into());
        assert!(matches!(
            config.jwt_secret(),
            Err(ConfigError::MissingJwtSecret)
        ));
    }

    #[test]
    fn test_env_overrides_apply() {
        let vars = env(&[
            ("DATABASE_URL", "postgres://u:p@db/shop"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("PORT", "9090"),
            ("SUPER_ADMIN_EMAIL", "root@example.com"),
        ]);
        let mut config = AppConfig::from_yaml(DEV_YAML).unwrap();
        config.apply_overrides(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.database_url().unwrap(), "postgres://u:p@db/shop");
        assert!(config.validate().is_ok());
        assert_eq!(
            config.bootstrap.super_admin_email.as_deref(),
            Some("root@example.com")
        );
        assert!(config.bootstrap.super_admin_password.is_none());
    }

    #[test]
    fn test_bad_port_override() {
        let vars = env(&[("PORT", "eighty")]);
        let mut config = AppConfig::from_yaml(DEV_YAML).unwrap();
        let err = config.apply_overrides(|k| vars.get(k).cloned());
        assert!(matches!(
            err,
            Err(ConfigError::InvalidOverride { key: "PORT", .. })
        ));
    }

    #[test]
    fn test_deadlines_from_config() {
        let config = AppConfig::from_yaml(DEV_YAML).unwrap();
        let d = config.database.deadlines();
        assert_eq!(d.read, Duration::from_secs(5));
        assert_eq!(d.write, Duration::from_secs(15));
        assert_eq!(config.token_ttl(), Duration::from_secs(3600));
    }
}

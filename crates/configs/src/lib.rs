//! # configs
//!
//! Layered runtime settings. Sources, later ones winning:
//!
//! 1. built-in defaults
//! 2. `config/default.toml` (optional)
//! 3. `config/{HUNTBOARD_ENV}.toml` (optional, `HUNTBOARD_ENV` defaults to `development`)
//! 4. environment variables such as `HUNTBOARD__DATABASE__URL`
//!
//! A `.env` file is loaded into the environment first.

use std::net::SocketAddr;

use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

const ENV_PREFIX: &str = "HUNTBOARD";
const MIN_JWT_SECRET_BYTES: usize = 32;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub redis: RedisSettings,
    pub forum: ForumConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub request_timeout_secs: u64,
    pub body_limit_bytes: usize,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// Without a URL the server keeps everything in memory.
    pub url: Option<SecretString>,
    pub max_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    /// Enables JWT access tokens when set; opaque in-memory sessions otherwise.
    pub jwt_secret: Option<SecretString>,
    pub issuer: String,
    pub audience: String,
    pub token_ttl_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct RedisSettings {
    pub url: Option<SecretString>,
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ForumConfig {
    pub edit_window_minutes: i64,
    pub threads_page_size: u32,
    pub posts_page_size: u32,
}

impl Settings {
    /// Loads `.env`, the config files and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(err) if err.not_found() => {}
            Err(err) => warn!(error = %err, "ignoring unreadable .env"),
        }
        let env = std::env::var("HUNTBOARD_ENV").unwrap_or_else(|_| "development".to_string());

        let config = defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;
        Self::from_config(config)
    }

    /// Defaults overlaid with a TOML document; no files or environment.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config = defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let forum = &self.forum;
        if forum.edit_window_minutes <= 0 {
            return Err(ConfigError::Invalid(
                "forum.edit_window_minutes must be positive".into(),
            ));
        }
        for (name, size) in [
            ("forum.threads_page_size", forum.threads_page_size),
            ("forum.posts_page_size", forum.posts_page_size),
        ] {
            if !(1..=100).contains(&size) {
                return Err(ConfigError::Invalid(format!("{name} must be between 1 and 100")));
            }
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be positive".into(),
            ));
        }
        if self.auth.token_ttl_secs == 0 {
            return Err(ConfigError::Invalid("auth.token_ttl_secs must be positive".into()));
        }
        if let Some(secret) = &self.auth.jwt_secret {
            if secret.expose_secret().len() < MIN_JWT_SECRET_BYTES {
                return Err(ConfigError::Invalid(format!(
                    "auth.jwt_secret must be at least {MIN_JWT_SECRET_BYTES} bytes"
                )));
            }
        }
        Ok(())
    }
}

fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    Ok(Config::builder()
        .set_default("server.addr", "0.0.0.0:8080")?
        .set_default("server.request_timeout_secs", 30)?
        .set_default("server.body_limit_bytes", 256 * 1024)?
        .set_default("database.max_connections", 10)?
        .set_default("database.run_migrations", true)?
        .set_default("auth.issuer", "huntboard")?
        .set_default("auth.audience", "huntboard-web")?
        .set_default("auth.token_ttl_secs", 7 * 24 * 3600)?
        .set_default("redis.cache_ttl_secs", 300)?
        .set_default("forum.edit_window_minutes", 15)?
        .set_default("forum.threads_page_size", 20)?
        .set_default("forum.posts_page_size", 20)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete_and_valid() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.server.addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(settings.forum.edit_window_minutes, 15);
        assert_eq!(settings.forum.threads_page_size, 20);
        assert!(settings.database.url.is_none());
        assert!(settings.auth.jwt_secret.is_none());
    }

    #[test]
    fn toml_overrides_defaults() {
        let settings = Settings::from_toml(
            r#"
            [database]
            url = "postgres://forum@localhost/forum"
            [forum]
            edit_window_minutes = 30
            "#,
        )
        .unwrap();
        assert_eq!(settings.forum.edit_window_minutes, 30);
        assert_eq!(
            settings.database.url.unwrap().expose_secret(),
            "postgres://forum@localhost/forum"
        );
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let err = Settings::from_toml("[auth]\njwt_secret = \"short\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("jwt_secret")));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert!(Settings::from_toml("[forum]\nposts_page_size = 0").is_err());
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let settings = Settings::from_toml(
            "[auth]\njwt_secret = \"0123456789abcdef0123456789abcdef\"",
        )
        .unwrap();
        assert!(!format!("{settings:?}").contains("0123456789abcdef"));
    }
}

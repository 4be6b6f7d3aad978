//! Configuration management

use std::time::Duration;

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

use crate::constants::{
    DEFAULT_EXPIRATION_SECS, DEFAULT_OP_TIMEOUT_MS, DEFAULT_SESSION_COOKIE, DEFAULT_SESSION_URL,
    DEFAULT_TOKEN_LENGTH,
};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub session: SessionSettings,
    pub cookie: CookieSettings,
    #[serde(default)]
    pub accounts: Vec<AccountSettings>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub env: String,
    pub host: String,
    pub port: u16,
    pub name: String,
}

/// Session manager settings: backend address, token entropy and TTLs.
#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    /// `redis://...` or `memory://` for the in-process backend.
    pub url: String,
    /// Random bytes drawn per token (before base64 encoding).
    pub token_length: usize,
    /// Default lifetime of expiring sessions.
    pub expiration_secs: u64,
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

impl SessionSettings {
    pub fn expiration(&self) -> Duration {
        Duration::from_secs(self.expiration_secs)
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_SESSION_URL.to_string(),
            token_length: DEFAULT_TOKEN_LENGTH,
            expiration_secs: DEFAULT_EXPIRATION_SECS,
            op_timeout_ms: DEFAULT_OP_TIMEOUT_MS,
        }
    }
}

fn default_op_timeout_ms() -> u64 {
    DEFAULT_OP_TIMEOUT_MS
}

#[derive(Debug, Deserialize, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_SESSION_COOKIE.to_string(),
            secure: false,
        }
    }
}

/// Login accepted by the config-backed authenticator.
#[derive(Debug, Deserialize, Clone)]
pub struct AccountSettings {
    pub user_id: i64,
    pub login: String,
    /// Argon2 PHC string.
    pub password_hash: String,
}

impl AppConfig {
    /// Loads defaults, `config/default`, `config/{APP_ENV}`, the optional file
    /// named by `APP_CONFIG`, then `APP__SECTION__KEY` variables. `PORT` and
    /// `REDIS_URL` win over everything else.
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let mut builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false));

        if let Ok(path) = std::env::var("APP_CONFIG") {
            builder = builder.add_source(File::with_name(&path).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("app.env", Some(env))?
            .set_override_option("app.port", std::env::var("PORT").ok())?
            .set_override_option("session.url", std::env::var("REDIS_URL").ok())?
            .build()?;
        config.try_deserialize()
    }

    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("app.env", "development")?
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 8080)?
            .set_default("app.name", "sbweb")?
            .set_default("session.url", DEFAULT_SESSION_URL)?
            .set_default("session.token_length", DEFAULT_TOKEN_LENGTH as i64)?
            .set_default("session.expiration_secs", DEFAULT_EXPIRATION_SECS as i64)?
            .set_default("session.op_timeout_ms", DEFAULT_OP_TIMEOUT_MS as i64)?
            .set_default("cookie.name", DEFAULT_SESSION_COOKIE)?
            .set_default("cookie.secure", false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_defaults_deserialize() {
        let config: AppConfig = AppConfig::defaults()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.app.port, 8080);
        assert_eq!(config.session.url, DEFAULT_SESSION_URL);
        assert_eq!(config.session.token_length, DEFAULT_TOKEN_LENGTH);
        assert_eq!(config.session.expiration(), Duration::from_secs(86_400));
        assert_eq!(config.cookie.name, "session_id");
        assert!(config.accounts.is_empty());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let toml = r#"
            [session]
            url = "memory://"
            token_length = 16
            expiration_secs = 60

            [[accounts]]
            user_id = 15
            login = "aaa@eee.ru"
            password_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaA"
        "#;

        let config: AppConfig = AppConfig::defaults()
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.session.url, "memory://");
        assert_eq!(config.session.token_length, 16);
        assert_eq!(config.session.op_timeout(), Duration::from_millis(DEFAULT_OP_TIMEOUT_MS));
        assert_eq!(config.accounts.len(), 1);
        assert_eq!(config.accounts[0].user_id, 15);
    }
}

//! Application settings.
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file (`settings.toml` unless overridden), then `BUDGET__`-prefixed
//! environment variables such as `BUDGET__STORAGE__MODE=json`.
use config::{
    Config, ConfigError, Environment, File,
    builder::{ConfigBuilder, DefaultState},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct RateLimit {
    pub enabled: bool,
    pub requests: u32,
    pub period_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub rate_limit: RateLimit,
}

impl Server {
    pub fn config(&self) -> server::ServerConfig {
        server::ServerConfig {
            cors_origins: self.cors_origins.clone(),
            rate_limit: self.rate_limit.enabled.then_some(server::RateLimitConfig {
                requests: self.rate_limit.requests,
                period_secs: self.rate_limit.period_secs,
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    Database,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
    pub mode: StorageMode,
    pub database_url: String,
    pub json_dir: String,
    pub seed_defaults: bool,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub storage: Storage,
}

impl Settings {
    /// Load settings from `file` (extension optional, may be missing) and
    /// the environment.
    pub fn new(file: &str) -> Result<Self, ConfigError> {
        defaults()?
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("BUDGET")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("app.level", "info")?
        .set_default("server.bind", "127.0.0.1")?
        .set_default("server.port", 3000)?
        .set_default("server.cors_origins", Vec::<String>::new())?
        .set_default("server.rate_limit.enabled", false)?
        .set_default("server.rate_limit.requests", 100)?
        .set_default("server.rate_limit.period_secs", 60)?
        .set_default("storage.mode", "database")?
        .set_default("storage.database_url", "sqlite:./budget_tracker.db?mode=rwc")?
        .set_default("storage.json_dir", "./data")?
        .set_default("storage.seed_defaults", true)
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn from_toml(toml: &str) -> Settings {
        defaults()
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn defaults_apply_without_file() {
        let settings = from_toml("");
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.storage.mode, StorageMode::Database);
        assert!(settings.storage.seed_defaults);
        assert!(settings.server.cors_origins.is_empty());
        assert_eq!(settings.server.config().rate_limit, None);
    }

    #[test]
    fn file_overrides_defaults() {
        let settings = from_toml(
            r#"
            [server]
            port = 8080
            cors_origins = ["http://localhost:5173"]

            [server.rate_limit]
            enabled = true
            requests = 10

            [storage]
            mode = "json"
            json_dir = "/tmp/budget"
            "#,
        );
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.storage.mode, StorageMode::Json);
        assert_eq!(settings.storage.json_dir, "/tmp/budget");

        let config = settings.server.config();
        assert_eq!(config.cors_origins, vec!["http://localhost:5173".to_string()]);
        assert_eq!(
            config.rate_limit,
            Some(server::RateLimitConfig {
                requests: 10,
                period_secs: 60,
            })
        );
    }

    #[test]
    fn unknown_storage_mode_is_rejected() {
        let result = defaults()
            .unwrap()
            .add_source(File::from_str("[storage]\nmode = \"cloud\"", FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize::<Settings>();
        assert!(result.is_err());
    }
}

//! Runtime configuration from the environment (`.env` included) and an
//! optional `config.toml`.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::Level;

pub const DEV_API_URL: &str = "http://localhost:5000";
pub const PROD_API_URL: &str = "https://todo-pro-api.onrender.com";
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown environment `{0}` (expected development or production)")]
    InvalidEnvironment(String),
    #[error("unknown log level `{0}`")]
    InvalidLogLevel(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn build_default() -> Environment {
        if cfg!(debug_assertions) {
            Environment::Development
        } else {
            Environment::Production
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }
}

// Shape of config.toml; every key is optional.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub environment: Option<String>,
    pub token_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub environment: Environment,
    pub token_path: Option<PathBuf>,
    pub log_level: Level,
    pub log_file: Option<PathBuf>,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("todo-pro").join("config.toml"))
}

pub fn default_log_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("todo-pro").join("todo-pro.log"))
}

/// Explicit override first, then the per-environment default.
pub fn resolve_api_url(override_url: Option<&str>, environment: Environment) -> String {
    let url = match override_url.map(str::trim).filter(|url| !url.is_empty()) {
        Some(url) => url,
        None => match environment {
            Environment::Development => DEV_API_URL,
            Environment::Production => PROD_API_URL,
        },
    };
    url.trim_end_matches('/').to_string()
}

impl Config {
    /// Reads `config.toml` (if present) and the process environment.
    ///
    /// Environment variables win over the file:
    /// - `TODO_API_URL`: API base URL override
    /// - `TODO_ENV`: `development` or `production`
    /// - `TODO_TOKEN_PATH`: where the session token is kept
    /// - `TODO_LOG`: `error`, `warn`, `info` (default), `debug`, `trace`
    /// - `TODO_LOG_FILE`: log destination
    pub fn load() -> Result<Config, ConfigError> {
        let file = match default_config_path() {
            Some(path) => read_file_config(&path)?,
            None => FileConfig::default(),
        };
        Config::from_sources(file, |key| std::env::var(key).ok())
    }

    pub fn from_sources(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Config, ConfigError> {
        let environment = match env("TODO_ENV").or(file.environment) {
            Some(raw) => raw.parse()?,
            None => Environment::build_default(),
        };

        let api_url = resolve_api_url(env("TODO_API_URL").or(file.api_url).as_deref(), environment);

        let log_level = match env("TODO_LOG").or(file.log_level) {
            Some(raw) => {
                Level::from_str(raw.trim()).map_err(|_| ConfigError::InvalidLogLevel(raw))?
            }
            None => Level::INFO,
        };

        Ok(Config {
            api_url,
            environment,
            token_path: env("TODO_TOKEN_PATH").map(PathBuf::from).or(file.token_path),
            log_level,
            log_file: env("TODO_LOG_FILE").map(PathBuf::from).or(file.log_file),
        })
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(toml::from_str(&raw)?),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(FileConfig::default()),
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_resolve_prefers_override() {
        assert_eq!(
            resolve_api_url(Some("https://api.example.test/"), Environment::Production),
            "https://api.example.test"
        );
    }

    #[test]
    fn test_resolve_falls_back_per_environment() {
        assert_eq!(resolve_api_url(None, Environment::Development), DEV_API_URL);
        assert_eq!(resolve_api_url(Some("   "), Environment::Production), PROD_API_URL);
    }

    #[test]
    fn test_env_wins_over_file() {
        let file = FileConfig {
            api_url: Some("http://file.test".into()),
            environment: Some("production".into()),
            log_level: Some("warn".into()),
            ..FileConfig::default()
        };
        let cfg = Config::from_sources(
            file,
            env_from(&[("TODO_API_URL", "http://env.test"), ("TODO_LOG", "debug")]),
        )
        .unwrap();
        assert_eq!(cfg.api_url, "http://env.test");
        assert_eq!(cfg.environment, Environment::Production);
        assert_eq!(cfg.log_level, Level::DEBUG);
    }

    #[test]
    fn test_production_without_override_uses_hardcoded_default() {
        let cfg =
            Config::from_sources(FileConfig::default(), env_from(&[("TODO_ENV", "prod")])).unwrap();
        assert_eq!(cfg.api_url, PROD_API_URL);
        assert_eq!(cfg.log_level, Level::INFO);
        assert_eq!(cfg.token_path, None);
    }

    #[test]
    fn test_rejects_unknown_environment() {
        let err = Config::from_sources(FileConfig::default(), env_from(&[("TODO_ENV", "staging")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvironment(name) if name == "staging"));
    }

    #[test]
    fn test_file_config_parses_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "api_url = \"http://toml.test\"\ntoken_path = \"/tmp/todo-token\"\n",
        )
        .unwrap();
        let file = read_file_config(&path).unwrap();
        assert_eq!(file.api_url.as_deref(), Some("http://toml.test"));
        assert_eq!(file.token_path, Some(PathBuf::from("/tmp/todo-token")));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let file = read_file_config(&dir.path().join("absent.toml")).unwrap();
        assert!(file.api_url.is_none());
    }
}
